pub const BOS_DESCRIPTOR_TYPE: u8 = 0x0F;
pub const BOS_HEADER_LENGTH: usize = 5;
pub const DEVICE_CAPABILITY_DESCRIPTOR_TYPE: u8 = 0x10;
pub const PLATFORM_DEV_CAPABILITY_TYPE: u8 = 0x05;
/// bLength, bDescriptorType, bDevCapabilityType, bReserved and the 16 byte UUID.
pub const PLATFORM_CAPABILITY_HEADER_LENGTH: usize = 20;
pub const WEBUSB_CAPABILITY_DATA_LENGTH: usize = 4;
pub const MS_OS_20_CAPABILITY_DATA_LENGTH: usize = 8;

/// Canonical form of {3408b638-09a9-47a0-8bfd-a0768815b665}.
pub const WEBUSB_PLATFORM_UUID: &str = "3408b638-09a9-47a0-8bfd-a0768815b665";
/// Canonical form of {d8dd60df-4589-4cc7-9cd2-659d9e648a9f}.
pub const MS_OS_20_PLATFORM_UUID: &str = "d8dd60df-4589-4cc7-9cd2-659d9e648a9f";

/// Windows 8.1, the only version MS OS 2.0 descriptors are defined for.
pub const MS_OS_20_WINDOWS_VERSION: u32 = 0x0603_0000;

pub const GET_DESCRIPTOR_REQUEST: u8 = 0x06;
pub const GET_URL_REQUEST: u16 = 0x02;
pub const WEBUSB_URL_DESCRIPTOR_TYPE: u8 = 0x03;
pub const URL_DESCRIPTOR_MIN_LENGTH: usize = 3;
pub const URL_SCHEME_HTTP: u8 = 0;
pub const URL_SCHEME_HTTPS: u8 = 1;
pub const URL_SCHEME_NONE: u8 = 255;

pub const MS_OS_20_DESCRIPTOR_INDEX: u16 = 0x07;
pub const MS_OS_20_DEFAULT_VENDOR_CODE: u8 = 0x02;
pub const MS_OS_20_SET_HEADER_DESCRIPTOR: u16 = 0x00;
pub const MS_OS_20_SUBSET_HEADER_CONFIGURATION: u16 = 0x01;
pub const MS_OS_20_SUBSET_HEADER_FUNCTION: u16 = 0x02;
pub const MS_OS_20_FEATURE_COMPATIBLE_ID: u16 = 0x03;
pub const MS_OS_20_FEATURE_REG_PROPERTY: u16 = 0x04;
pub const MS_OS_20_FEATURE_MIN_RESUME_TIME: u16 = 0x05;
pub const MS_OS_20_FEATURE_MODEL_ID: u16 = 0x06;
pub const MS_OS_20_FEATURE_CCGP_DEVICE: u16 = 0x07;
pub const MS_OS_20_FEATURE_VENDOR_REVISION: u16 = 0x08;

pub const REG_SZ: u16 = 1;
pub const REG_MULTI_SZ: u16 = 7;
