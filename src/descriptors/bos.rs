use serde::Serialize;

use crate::constants::*;
use crate::descriptors::get_u16;
use crate::descriptors::get_u32;
use crate::report::Report;
use crate::uuid::format_uuid;
use crate::uuid::uuid_matches;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BosHeader {
  pub length: u8,
  pub descriptor_type: u8,
  pub total_length: u16,
  pub num_device_caps: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapability {
  /// Offset of the record within the BOS buffer.
  pub offset: usize,
  pub length: u8,
  pub descriptor_type: u8,
  pub capability_type: u8,
  /// Set when the record is a platform capability whose fixed header fits
  /// the buffer.
  pub platform: Option<PlatformCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCapability {
  pub reserved: u8,
  pub uuid: String,
  pub kind: PlatformKind,
}

/// Platform capabilities are told apart by UUID. The payload is `None` when
/// the record is too short to carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformKind {
  WebUsb(Option<WebUsbCapability>),
  MsOs20(Option<MsOs20Capability>),
  Unknown,
}

// https://wicg.github.io/webusb/#webusb-platform-capability-descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebUsbCapability {
  pub bcd_version: u16,
  pub vendor_code: u8,
  pub landing_page: u8,
}

impl WebUsbCapability {
  /// A URL descriptor can only be requested with a usable vendor code and a
  /// landing page index.
  pub fn has_landing_page(&self) -> bool {
    self.vendor_code != 0 && self.landing_page != 0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsOs20Capability {
  pub windows_version: u32,
  pub descriptor_set_total_length: u16,
  pub vendor_code: u8,
  pub alt_enum_code: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BosAnalysis {
  pub header: Option<BosHeader>,
  pub capabilities: Vec<DeviceCapability>,
  pub report: Report,
}

impl BosAnalysis {
  fn platform_kinds(&self) -> impl Iterator<Item = &PlatformKind> {
    self
      .capabilities
      .iter()
      .filter_map(|c| c.platform.as_ref())
      .map(|p| &p.kind)
  }

  /// First decoded WebUSB platform capability.
  pub fn webusb(&self) -> Option<&WebUsbCapability> {
    self.platform_kinds().find_map(|kind| match kind {
      PlatformKind::WebUsb(capability) => capability.as_ref(),
      _ => None,
    })
  }

  /// First decoded MS OS 2.0 platform capability.
  pub fn ms_os_20(&self) -> Option<&MsOs20Capability> {
    self.platform_kinds().find_map(|kind| match kind {
      PlatformKind::MsOs20(capability) => capability.as_ref(),
      _ => None,
    })
  }
}

// https://www.usb.org/document-library/usb-32-revision-11-june-2022 9.6.2
pub fn decode_bos(bytes: &[u8]) -> BosAnalysis {
  let length = bytes.len();
  let mut report = Report::new();
  report.info(0, format!("Total BOS length: {} bytes", length));

  if length < BOS_HEADER_LENGTH {
    report.error(
      0,
      format!(
        "BOS descriptor too short ({} bytes, minimum {})",
        length, BOS_HEADER_LENGTH
      ),
    );
    return BosAnalysis {
      header: None,
      capabilities: Vec::new(),
      report,
    };
  }

  let header = BosHeader {
    length: bytes[0],
    descriptor_type: bytes[1],
    total_length: u16::from_le_bytes([bytes[2], bytes[3]]),
    num_device_caps: bytes[4],
  };

  report.info(0, "BOS Header:");
  report.info(1, format!("bLength: {}", header.length));
  report.info(
    1,
    format!(
      "bDescriptorType: 0x{:02x} ({})",
      header.descriptor_type,
      if header.descriptor_type == BOS_DESCRIPTOR_TYPE {
        "BOS"
      } else {
        "UNKNOWN"
      }
    ),
  );
  report.info(1, format!("wTotalLength: {}", header.total_length));
  report.info(1, format!("bNumDeviceCaps: {}", header.num_device_caps));

  if header.descriptor_type != BOS_DESCRIPTOR_TYPE {
    report.error(0, "Invalid BOS descriptor type");
  }

  if header.total_length as usize != length {
    report.warning(
      0,
      format!(
        "BOS total length mismatch (reported={}, actual={})",
        header.total_length, length
      ),
    );
  }

  // The header's own bLength locates the first capability, even when it is
  // not 5.
  let mut offset = header.length as usize;
  let mut capabilities = Vec::new();

  while offset < length && capabilities.len() < header.num_device_caps as usize
  {
    if offset + 3 > length {
      report.error(
        0,
        format!("Truncated device capability at offset {}", offset),
      );
      break;
    }

    let cap_length = bytes[offset];
    let descriptor_type = bytes[offset + 1];
    let capability_type = bytes[offset + 2];

    report.info(
      0,
      format!(
        "Device Capability {} (offset {}):",
        capabilities.len(),
        offset
      ),
    );
    report.info(1, format!("bLength: {}", cap_length));
    report.info(
      1,
      format!(
        "bDescriptorType: 0x{:02x} ({})",
        descriptor_type,
        if descriptor_type == DEVICE_CAPABILITY_DESCRIPTOR_TYPE {
          "DEVICE_CAPABILITY"
        } else {
          "UNKNOWN"
        }
      ),
    );
    report.info(1, format!("bDevCapabilityType: 0x{:02x}", capability_type));

    let platform = if capability_type == PLATFORM_DEV_CAPABILITY_TYPE
      && offset + PLATFORM_CAPABILITY_HEADER_LENGTH <= length
    {
      Some(decode_platform(bytes, offset, cap_length, &mut report))
    } else {
      report.info(
        1,
        format!("Non-Platform Capability (type 0x{:02x})", capability_type),
      );
      None
    };

    capabilities.push(DeviceCapability {
      offset,
      length: cap_length,
      descriptor_type,
      capability_type,
      platform,
    });

    // A zero bLength would never advance the walk.
    if cap_length == 0 {
      report.error(
        0,
        format!("Zero length device capability at offset {}", offset),
      );
      break;
    }

    offset += cap_length as usize;
  }

  BosAnalysis {
    header: Some(header),
    capabilities,
    report,
  }
}

/// Decodes the platform capability starting at `offset`. The caller has
/// checked that the 20 byte fixed header fits the buffer.
fn decode_platform(
  bytes: &[u8],
  offset: usize,
  cap_length: u8,
  report: &mut Report,
) -> PlatformCapability {
  let reserved = bytes[offset + 3];
  let mut raw_uuid = [0u8; 16];
  raw_uuid.copy_from_slice(
    &bytes[offset + 4..offset + PLATFORM_CAPABILITY_HEADER_LENGTH],
  );
  let uuid = format_uuid(&raw_uuid);

  report.info(1, "Platform Capability:");
  report.info(2, format!("bReserved: {}", reserved));
  report.info(2, format!("UUID: {}", uuid));

  let kind = if uuid_matches(&uuid, WEBUSB_PLATFORM_UUID) {
    report.info(2, "Type: WebUSB Platform Capability");
    PlatformKind::WebUsb(decode_webusb_capability(
      bytes, offset, cap_length, report,
    ))
  } else if uuid_matches(&uuid, MS_OS_20_PLATFORM_UUID) {
    report.info(2, "Type: MS OS 2.0 Platform Capability");
    PlatformKind::MsOs20(decode_ms_os_20_capability(
      bytes, offset, cap_length, report,
    ))
  } else {
    report.info(2, "Type: Unknown Platform Capability");
    PlatformKind::Unknown
  };

  PlatformCapability {
    reserved,
    uuid,
    kind,
  }
}

/// Capability-specific data following the platform header, when the record
/// declares at least `needed` bytes of it.
fn capability_data<'a>(
  bytes: &'a [u8],
  offset: usize,
  cap_length: u8,
  needed: usize,
  report: &mut Report,
) -> Option<&'a [u8]> {
  if (cap_length as usize) < PLATFORM_CAPABILITY_HEADER_LENGTH + needed {
    return None;
  }

  let start = offset + PLATFORM_CAPABILITY_HEADER_LENGTH;
  let data = bytes.get(start..start + needed);
  if data.is_none() {
    report.error(
      2,
      format!(
        "Capability data truncated (bLength={}, buffer ends at {})",
        cap_length,
        bytes.len()
      ),
    );
  }
  data
}

fn decode_webusb_capability(
  bytes: &[u8],
  offset: usize,
  cap_length: u8,
  report: &mut Report,
) -> Option<WebUsbCapability> {
  let data = capability_data(
    bytes,
    offset,
    cap_length,
    WEBUSB_CAPABILITY_DATA_LENGTH,
    report,
  )?;

  let capability = WebUsbCapability {
    bcd_version: get_u16(data, 0)?,
    vendor_code: data[2],
    landing_page: data[3],
  };

  report.info(2, "WebUSB Data:");
  report.info(3, format!("bcdVersion: 0x{:04x}", capability.bcd_version));
  report.info(3, format!("bVendorCode: 0x{:02x}", capability.vendor_code));
  report.info(
    3,
    format!(
      "iLandingPage: {} ({})",
      capability.landing_page,
      // Only the first string is labelled, any non-zero index is still
      // fetched.
      if capability.landing_page == 1 {
        "Present"
      } else {
        "Not Present"
      }
    ),
  );

  if capability.vendor_code == 0 {
    report.warning(3, "WebUSB vendor code is 0 (invalid)");
  }

  Some(capability)
}

// https://learn.microsoft.com/en-us/windows-hardware/drivers/usbcon/microsoft-os-2-0-descriptors-specification
fn decode_ms_os_20_capability(
  bytes: &[u8],
  offset: usize,
  cap_length: u8,
  report: &mut Report,
) -> Option<MsOs20Capability> {
  let data = capability_data(
    bytes,
    offset,
    cap_length,
    MS_OS_20_CAPABILITY_DATA_LENGTH,
    report,
  )?;

  let capability = MsOs20Capability {
    windows_version: get_u32(data, 0)?,
    descriptor_set_total_length: get_u16(data, 4)?,
    vendor_code: data[6],
    alt_enum_code: data[7],
  };

  report.info(2, "MS OS 2.0 Data:");
  report.info(
    3,
    format!("dwWindowsVersion: 0x{:08x}", capability.windows_version),
  );
  report.info(
    3,
    format!(
      "wMSOSDescriptorSetTotalLength: {}",
      capability.descriptor_set_total_length
    ),
  );
  report.info(3, format!("bMS_VendorCode: 0x{:02x}", capability.vendor_code));
  report.info(3, format!("bAltEnumCode: {}", capability.alt_enum_code));

  if capability.windows_version != MS_OS_20_WINDOWS_VERSION {
    report.warning(
      3,
      format!(
        "Unusual Windows version 0x{:08x} (expected 0x{:08x})",
        capability.windows_version, MS_OS_20_WINDOWS_VERSION
      ),
    );
  }

  Some(capability)
}

#[cfg(test)]
mod tests {
  use super::decode_bos;
  use super::PlatformKind;
  use crate::report::Severity;

  const CONTAINER_ID: [u8; 20] = [
    0x14, 0x10, 0x04, 0x00, 0x2A, 0xF9, 0xF6, 0xC2, 0x98, 0x10, 0x2B, 0x49,
    0x8E, 0x64, 0xFF, 0x01, 0x0C, 0x7F, 0x94, 0xE1,
  ];

  fn webusb_capability(vendor_code: u8, landing_page: u8) -> Vec<u8> {
    vec![
      0x18, 0x10, 0x05, 0x00, 0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09, 0xA0, 0x47,
      0x8B, 0xFD, 0xA0, 0x76, 0x88, 0x15, 0xB6, 0x65, 0x00, 0x01, vendor_code,
      landing_page,
    ]
  }

  fn ms_os_20_capability(windows_version: [u8; 4]) -> Vec<u8> {
    let mut capability = vec![
      0x1C, 0x10, 0x05, 0x00, 0xDF, 0x60, 0xDD, 0xD8, 0x89, 0x45, 0xC7, 0x4C,
      0x9C, 0xD2, 0x65, 0x9D, 0x9E, 0x64, 0x8A, 0x9F,
    ];
    capability.extend_from_slice(&windows_version);
    capability.extend_from_slice(&[0xB2, 0x00, 0x01, 0x00]);
    capability
  }

  fn bos(capabilities: &[&[u8]]) -> Vec<u8> {
    let total: usize =
      5 + capabilities.iter().map(|c| c.len()).sum::<usize>();
    let mut bytes = vec![
      0x05,
      0x0F,
      total as u8,
      (total >> 8) as u8,
      capabilities.len() as u8,
    ];
    for capability in capabilities {
      bytes.extend_from_slice(capability);
    }
    bytes
  }

  #[test]
  fn test_decode_bos() {
    let bytes = bos(&[
      &CONTAINER_ID,
      &webusb_capability(0x42, 0x01),
      &ms_os_20_capability([0x00, 0x00, 0x03, 0x06]),
    ]);
    let analysis = decode_bos(&bytes);

    assert_eq!(analysis.report.error_count(), 0);
    assert_eq!(analysis.report.warning_count(), 0);
    assert_eq!(analysis.capabilities.len(), 3);

    let header = analysis.header.as_ref().unwrap();
    assert_eq!(header.total_length, 0x4D);
    assert_eq!(header.num_device_caps, 3);

    assert_eq!(analysis.capabilities[0].capability_type, 0x04);
    assert!(analysis.capabilities[0].platform.is_none());
    assert_eq!(analysis.capabilities[1].offset, 25);

    let webusb = analysis.webusb().unwrap();
    assert_eq!(webusb.bcd_version, 0x0100);
    assert_eq!(webusb.vendor_code, 0x42);
    assert_eq!(webusb.landing_page, 0x01);
    assert!(webusb.has_landing_page());

    let ms_os_20 = analysis.ms_os_20().unwrap();
    assert_eq!(ms_os_20.windows_version, 0x0603_0000);
    assert_eq!(ms_os_20.descriptor_set_total_length, 0xB2);
    assert_eq!(ms_os_20.vendor_code, 0x01);
    assert_eq!(ms_os_20.alt_enum_code, 0x00);
  }

  #[test]
  fn test_too_short() {
    for length in 0..5 {
      let analysis = decode_bos(&[0x05, 0x0F, 0x05, 0x00][..length.min(4)]);
      assert_eq!(analysis.report.error_count(), 1);
      assert!(analysis.header.is_none());
      assert!(analysis.capabilities.is_empty());
      assert!(!analysis
        .report
        .findings()
        .iter()
        .any(|f| f.message.starts_with("Device Capability")));
    }
  }

  #[test]
  fn test_webusb_zero_vendor_code() {
    let analysis = decode_bos(&bos(&[&webusb_capability(0x00, 0x01)]));

    assert_eq!(analysis.report.error_count(), 0);
    assert_eq!(analysis.report.warning_count(), 1);
    let warning = analysis.report.warnings().next().unwrap();
    assert!(warning.message.contains("vendor code"));
    assert!(!analysis.webusb().unwrap().has_landing_page());
  }

  #[test]
  fn test_unusual_windows_version() {
    let analysis =
      decode_bos(&bos(&[&ms_os_20_capability([0x00, 0x00, 0x00, 0x0A])]));

    assert_eq!(analysis.report.error_count(), 0);
    assert_eq!(analysis.report.warning_count(), 1);
    assert_eq!(analysis.ms_os_20().unwrap().windows_version, 0x0A00_0000);
  }

  #[test]
  fn test_header_mismatches_are_not_fatal() {
    let mut bytes = bos(&[&webusb_capability(0x42, 0x01)]);
    // bDescriptorType
    bytes[1] = 0x02;
    // wTotalLength
    bytes[2] = 0x40;
    let analysis = decode_bos(&bytes);

    assert_eq!(analysis.report.error_count(), 1);
    assert_eq!(analysis.report.warning_count(), 1);
    assert_eq!(analysis.webusb().unwrap().vendor_code, 0x42);
  }

  #[test]
  fn test_unknown_platform_capability() {
    let mut capability = webusb_capability(0x42, 0x01);
    capability[4] = 0x00;
    let analysis = decode_bos(&bos(&[&capability]));

    assert!(analysis.report.is_well_formed());
    let platform = analysis.capabilities[0].platform.as_ref().unwrap();
    assert_eq!(platform.kind, PlatformKind::Unknown);
    assert!(analysis.webusb().is_none());
  }

  #[test]
  fn test_landing_page_label() {
    let label = |landing_page| {
      decode_bos(&bos(&[&webusb_capability(0x42, landing_page)]))
        .report
        .findings()
        .iter()
        .find(|f| f.message.starts_with("iLandingPage"))
        .map(|f| f.message.clone())
    };
    assert_eq!(label(1).as_deref(), Some("iLandingPage: 1 (Present)"));
    assert_eq!(label(2).as_deref(), Some("iLandingPage: 2 (Not Present)"));
    assert_eq!(label(0).as_deref(), Some("iLandingPage: 0 (Not Present)"));

    let analysis = decode_bos(&bos(&[&webusb_capability(0x42, 2)]));
    assert!(analysis.webusb().unwrap().has_landing_page());
  }

  #[test]
  fn test_platform_header_beyond_buffer_is_not_platform() {
    // Platform capability type, but only 10 of the 20 header bytes.
    let capability =
      [0x0A, 0x10, 0x05, 0x00, 0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09];
    let analysis = decode_bos(&bos(&[&capability]));

    assert_eq!(analysis.report.error_count(), 0);
    assert_eq!(analysis.capabilities.len(), 1);
    assert_eq!(analysis.capabilities[0].capability_type, 0x05);
    assert!(analysis.capabilities[0].platform.is_none());
    assert!(analysis
      .report
      .findings()
      .iter()
      .any(|f| f.message == "Non-Platform Capability (type 0x05)"));
  }

  #[test]
  fn test_short_platform_record_has_no_payload() {
    let mut capability = webusb_capability(0x42, 0x01);
    capability[0] = 20;
    capability.truncate(20);
    let analysis = decode_bos(&bos(&[&capability]));

    assert!(analysis.report.is_well_formed());
    let platform = analysis.capabilities[0].platform.as_ref().unwrap();
    assert_eq!(platform.kind, PlatformKind::WebUsb(None));
  }

  #[test]
  fn test_platform_payload_beyond_buffer() {
    let mut bytes = bos(&[&webusb_capability(0x42, 0x01)]);
    bytes.truncate(bytes.len() - 2);
    bytes[2] = bytes.len() as u8;
    let analysis = decode_bos(&bytes);

    assert_eq!(analysis.report.error_count(), 1);
    assert!(analysis.webusb().is_none());
  }

  #[test]
  fn test_truncated_capability() {
    let mut bytes = bos(&[&CONTAINER_ID]);
    bytes[4] = 2;
    bytes.extend_from_slice(&[0x03, 0x10]);
    bytes[2] = bytes.len() as u8;
    let analysis = decode_bos(&bytes);

    assert_eq!(analysis.report.error_count(), 1);
    assert_eq!(analysis.capabilities.len(), 1);
    let error = analysis.report.errors().next().unwrap();
    assert_eq!(error.message, "Truncated device capability at offset 25");
  }

  #[test]
  fn test_zero_length_capability_stops_walk() {
    let mut zero = CONTAINER_ID;
    zero[0] = 0;
    let bytes = bos(&[&zero, &webusb_capability(0x42, 0x01)]);
    let analysis = decode_bos(&bytes);

    assert_eq!(analysis.report.error_count(), 1);
    assert_eq!(analysis.capabilities.len(), 1);
    assert!(analysis.webusb().is_none());
  }

  #[test]
  fn test_walk_stops_at_num_device_caps() {
    let mut bytes = bos(&[&CONTAINER_ID, &webusb_capability(0x42, 0x01)]);
    bytes[4] = 1;
    let analysis = decode_bos(&bytes);

    assert!(analysis.report.is_well_formed());
    assert_eq!(analysis.capabilities.len(), 1);
  }

  #[test]
  fn test_nested_depth() {
    let analysis = decode_bos(&bos(&[&webusb_capability(0x00, 0x01)]));
    let warning = analysis
      .report
      .findings()
      .iter()
      .find(|f| f.severity == Severity::Warning)
      .unwrap();
    assert_eq!(warning.depth, 3);
  }

  #[test]
  fn test_idempotent() {
    let bytes = bos(&[&CONTAINER_ID, &webusb_capability(0x00, 0x01)]);
    assert_eq!(decode_bos(&bytes), decode_bos(&bytes));
  }
}
