//! Decoders for the BOS, WebUSB URL and MS OS 2.0 descriptor formats.
//!
//! Every decoder takes the bytes actually received from the device and
//! returns its findings as data. Nothing here panics on malformed input and
//! nothing is read before its offset has been checked against the buffer.

mod bos;
mod msos20;
mod webusb;

pub use bos::decode_bos;
pub use bos::BosAnalysis;
pub use bos::BosHeader;
pub use bos::DeviceCapability;
pub use bos::MsOs20Capability;
pub use bos::PlatformCapability;
pub use bos::PlatformKind;
pub use bos::WebUsbCapability;
pub use msos20::decode_ms_os_20;
pub use msos20::MsOs20Analysis;
pub use msos20::MsOs20Descriptor;
pub use msos20::MsOs20Record;
pub use webusb::decode_webusb_url;
pub use webusb::UrlAnalysis;
pub use webusb::UrlScheme;
pub use webusb::WebUsbUrl;

/// Reads a little-endian u16 at `at`, `None` when it does not fit.
pub(crate) fn get_u16(bytes: &[u8], at: usize) -> Option<u16> {
  let field = bytes.get(at..at.checked_add(2)?)?;
  Some(u16::from_le_bytes([field[0], field[1]]))
}

/// Reads a little-endian u32 at `at`, `None` when it does not fit.
pub(crate) fn get_u32(bytes: &[u8], at: usize) -> Option<u32> {
  let field = bytes.get(at..at.checked_add(4)?)?;
  Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Fixed-width ASCII field, cut at the first NUL.
pub(crate) fn ascii_field(bytes: &[u8]) -> String {
  bytes
    .iter()
    .take_while(|&&b| b != 0)
    .map(|&b| b as char)
    .collect()
}

/// Renders UTF-16LE text the way registry properties are shown: printable
/// ASCII code units verbatim, `?` for anything else, stopping at a NUL.
///
/// Returns the rendered text and how many printable characters it holds.
pub(crate) fn utf16_ascii(bytes: &[u8]) -> (String, usize) {
  let mut text = String::new();
  let mut printable = 0;
  for unit in bytes.chunks_exact(2) {
    match u16::from_le_bytes([unit[0], unit[1]]) {
      0 => break,
      unit @ 0x20..=0x7E => {
        text.push(unit as u8 as char);
        printable += 1;
      }
      _ => text.push('?'),
    }
  }
  (text, printable)
}

/// Byte span covered by a NUL-terminated UTF-16LE string of `length` bytes,
/// excluding the terminating code unit.
pub(crate) fn without_terminator(length: usize) -> usize {
  (length.saturating_sub(2) + 1) / 2 * 2
}
