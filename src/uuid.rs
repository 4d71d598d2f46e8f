use std::fmt::Write;

/// Formats a platform capability UUID in its canonical textual form.
///
/// The first three groups are stored little-endian on the wire (DWORD, WORD,
/// WORD), the last 8 bytes are in network order.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
  let mut uuid = format!(
    "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-",
    bytes[3],
    bytes[2],
    bytes[1],
    bytes[0],
    bytes[5],
    bytes[4],
    bytes[7],
    bytes[6],
    bytes[8],
    bytes[9],
  );
  for byte in &bytes[10..] {
    // Writing to a String cannot fail.
    let _ = write!(uuid, "{:02x}", byte);
  }
  uuid
}

/// Case-insensitive comparison against one of the known UUID constants.
pub fn uuid_matches(uuid: &str, known: &str) -> bool {
  uuid.eq_ignore_ascii_case(known)
}

#[cfg(test)]
mod tests {
  use super::format_uuid;
  use super::uuid_matches;
  use crate::constants::MS_OS_20_PLATFORM_UUID;
  use crate::constants::WEBUSB_PLATFORM_UUID;

  #[test]
  fn test_webusb_uuid() {
    let uuid = format_uuid(&[
      0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09, 0xA0, 0x47, 0x8B, 0xFD, 0xA0, 0x76,
      0x88, 0x15, 0xB6, 0x65,
    ]);
    assert_eq!(uuid, "3408b638-09a9-47a0-8bfd-a0768815b665");
    assert_eq!(uuid, WEBUSB_PLATFORM_UUID);
  }

  #[test]
  fn test_ms_os_20_uuid() {
    let uuid = format_uuid(&[
      0xDF, 0x60, 0xDD, 0xD8, 0x89, 0x45, 0xC7, 0x4C, 0x9C, 0xD2, 0x65, 0x9D,
      0x9E, 0x64, 0x8A, 0x9F,
    ]);
    assert_eq!(uuid, MS_OS_20_PLATFORM_UUID);
  }

  #[test]
  fn test_uuid_matches_ignores_case() {
    assert!(uuid_matches(
      "3408B638-09A9-47A0-8BFD-A0768815B665",
      WEBUSB_PLATFORM_UUID
    ));
    assert!(!uuid_matches(MS_OS_20_PLATFORM_UUID, WEBUSB_PLATFORM_UUID));
  }
}
