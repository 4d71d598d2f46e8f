use std::time::Duration;

use crate::constants::MS_OS_20_DESCRIPTOR_INDEX;
use crate::Error;
use crate::Result;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Which device to talk to and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub vendor_id: u16,
  pub product_id: u16,
  pub timeout: Duration,
  /// Size of the buffer handed to every control transfer.
  pub buffer_size: usize,
  /// Overrides the vendor code used for the MS OS 2.0 request. Without it the
  /// code advertised in the BOS descriptor is used, then the default 0x02.
  pub ms_os_vendor_code: Option<u8>,
  pub ms_os_descriptor_index: u16,
  /// Detach a kernel driver bound to interface 0 before the first request.
  pub detach_kernel_driver: bool,
}

impl Config {
  pub fn new(vendor_id: u16, product_id: u16) -> Self {
    Config {
      vendor_id,
      product_id,
      timeout: DEFAULT_TIMEOUT,
      buffer_size: DEFAULT_BUFFER_SIZE,
      ms_os_vendor_code: None,
      ms_os_descriptor_index: MS_OS_20_DESCRIPTOR_INDEX,
      detach_kernel_driver: true,
    }
  }
}

fn parse_number(value: &str) -> Option<u64> {
  let value = value.trim();
  match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
    Some(hex) => u64::from_str_radix(hex, 16).ok(),
    None => value.parse().ok(),
  }
}

/// Parses a vendor or product ID given in hex (`0x361d`) or decimal
/// (`13917`). Zero is rejected.
pub fn parse_id(value: &str) -> Result<u16> {
  match parse_number(value) {
    Some(id) if id != 0 && id <= u16::MAX as u64 => Ok(id as u16),
    _ => Err(Error::InvalidArgument(value.to_string())),
  }
}

/// Parses a single byte request code in hex or decimal.
pub fn parse_code(value: &str) -> Result<u8> {
  match parse_number(value) {
    Some(code) if code <= u8::MAX as u64 => Ok(code as u8),
    _ => Err(Error::InvalidArgument(value.to_string())),
  }
}
