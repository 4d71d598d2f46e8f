//! Runs the whole analysis over descriptors captured from a WebUSB device
//! that binds to WinUSB on Windows.

use usb_descriptor_analyzer::analyze;
use usb_descriptor_analyzer::analyzer::Fetched;
use usb_descriptor_analyzer::descriptors::MsOs20Descriptor;
use usb_descriptor_analyzer::render::Renderer;
use usb_descriptor_analyzer::Config;
use usb_descriptor_analyzer::DescriptorSource;
use usb_descriptor_analyzer::Error;
use usb_descriptor_analyzer::Result;
use usb_descriptor_analyzer::Severity;

const BOS: &[u8] = &[
  // BOS descriptor.
  0x05, 0x0F, 0x39, 0x00, 0x02,
  // WebUSB Platform Capability descriptor.
  0x18, 0x10, 0x05, 0x00, 0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09, 0xA0, 0x47, 0x8B,
  0xFD, 0xA0, 0x76, 0x88, 0x15, 0xB6, 0x65, 0x00, 0x01, 0x01, 0x01,
  // Microsoft OS 2.0 Platform Capability descriptor.
  0x1C, 0x10, 0x05, 0x00, 0xDF, 0x60, 0xDD, 0xD8, 0x89, 0x45, 0xC7, 0x4C, 0x9C,
  0xD2, 0x65, 0x9D, 0x9E, 0x64, 0x8A, 0x9F, 0x00, 0x00, 0x03, 0x06, 0xAA, 0x00,
  0x02, 0x00,
];

const URL: &[u8] = &[
  0x23, 0x03, 0x01, b'w', b'e', b'b', b'u', b's', b'b', b'.', b'g', b'i', b't',
  b'h', b'u', b'b', b'.', b'i', b'o', b'/', b'a', b'r', b'd', b'u', b'i', b'n',
  b'o', b'/', b'd', b'e', b'm', b'o', b's', b'/', b'x',
];

fn utf16(text: &str) -> Vec<u8> {
  text
    .encode_utf16()
    .chain(std::iter::once(0))
    .flat_map(|unit| unit.to_le_bytes().to_vec())
    .collect()
}

/// Set header, function subset for interface 2, WINUSB compatible ID and a
/// DeviceInterfaceGUIDs registry property.
fn ms_os_20_set() -> Vec<u8> {
  let name = utf16("DeviceInterfaceGUIDs");
  let mut data = utf16("{9D32F82C-1FB2-4486-8501-B6145B5BA336}");
  data.extend_from_slice(&[0, 0]);
  let property_length = 8 + name.len() + 2 + data.len();

  let mut property = (property_length as u16).to_le_bytes().to_vec();
  property.extend_from_slice(&[0x04, 0x00, 0x07, 0x00]);
  property.extend_from_slice(&(name.len() as u16).to_le_bytes());
  property.extend_from_slice(&name);
  property.extend_from_slice(&(data.len() as u16).to_le_bytes());
  property.extend_from_slice(&data);

  let compatible_id = [
    0x14, 0x00, 0x03, 0x00, b'W', b'I', b'N', b'U', b'S', b'B', 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
  ];
  let subset_length = 8 + compatible_id.len() + property.len();
  let total_length = 10 + subset_length;

  let mut set = vec![0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x06];
  set.extend_from_slice(&(total_length as u16).to_le_bytes());
  set.extend_from_slice(&[0x08, 0x00, 0x02, 0x00, 0x02, 0x00]);
  set.extend_from_slice(&(subset_length as u16).to_le_bytes());
  set.extend_from_slice(&compatible_id);
  set.extend_from_slice(&property);
  set
}

struct Captured {
  ms_os_20: Vec<u8>,
}

impl DescriptorSource for Captured {
  fn read_bos(&mut self) -> Result<Vec<u8>> {
    Ok(BOS.to_vec())
  }

  fn read_webusb_url(
    &mut self,
    vendor_code: u8,
    landing_page: u8,
  ) -> Result<Vec<u8>> {
    assert_eq!((vendor_code, landing_page), (0x01, 0x01));
    Ok(URL.to_vec())
  }

  fn read_ms_os_20(&mut self, vendor_code: u8, index: u16) -> Result<Vec<u8>> {
    // A real device stalls; any error will do here.
    if vendor_code != 0x02 || index != 7 {
      return Err(Error::NotFound {
        vendor_id: 0x2341,
        product_id: 0x8036,
      });
    }
    Ok(self.ms_os_20.clone())
  }
}

#[test]
fn test_captured_device_is_well_formed() {
  let set = ms_os_20_set();
  assert_eq!(set.len(), 0xAA);

  let mut device = Captured { ms_os_20: set };
  let analysis = analyze(&mut device, &Config::new(0x2341, 0x8036));

  let bos = analysis.bos.analysis().unwrap();
  assert!(bos.report.is_well_formed());
  assert_eq!(bos.ms_os_20().unwrap().descriptor_set_total_length, 0xAA);

  assert_eq!(
    analysis.webusb_url.analysis().unwrap().url(),
    Some("https://webusb.github.io/arduino/demos/x")
  );

  let ms_os_20 = analysis.ms_os_20.analysis().unwrap();
  assert!(ms_os_20.report.is_well_formed(), "{:?}", ms_os_20.report);
  assert_eq!(ms_os_20.records.len(), 4);
  assert_eq!(ms_os_20.compatible_ids().collect::<Vec<_>>(), vec!["WINUSB"]);
  match &ms_os_20.records[3].descriptor {
    Some(MsOs20Descriptor::RegistryProperty { name, data, .. }) => {
      assert_eq!(name.as_deref(), Some("DeviceInterfaceGUIDs"));
      assert_eq!(
        data.as_deref(),
        Some("{9D32F82C-1FB2-4486-8501-B6145B5BA336}")
      );
    }
    other => panic!("unexpected descriptor {:?}", other),
  }
  assert!(analysis.success());

  let text = Renderer::new(false).analysis(&analysis);
  assert!(text.contains("SUCCESS: BOS descriptor retrieved (57 bytes)"));
  assert!(text.contains("URL: https://webusb.github.io/arduino/demos/x"));
  assert!(text.contains("✓ BOS descriptor appears to be well-formed"));
  assert!(text.contains("✓ Descriptor appears to be well-formed"));
}

#[test]
fn test_truncated_transfer_is_reported_not_fatal() {
  let mut set = ms_os_20_set();
  set.truncate(64);
  let mut device = Captured { ms_os_20: set };
  let analysis = analyze(&mut device, &Config::new(0x2341, 0x8036));

  let ms_os_20 = analysis.ms_os_20.analysis().unwrap();
  // The set header total no longer matches. Both the function subset and
  // the registry property run past the end of the transfer.
  assert_eq!(ms_os_20.report.warning_count(), 1);
  assert_eq!(ms_os_20.report.error_count(), 2);
  assert!(ms_os_20
    .report
    .findings()
    .iter()
    .any(|f| f.severity == Severity::Error
      && f.message.starts_with("Descriptor extends beyond buffer")));
  assert!(analysis.success());
}

#[test]
fn test_wrong_vendor_code_fails_request() {
  let mut device = Captured {
    ms_os_20: ms_os_20_set(),
  };
  let mut config = Config::new(0x2341, 0x8036);
  config.ms_os_vendor_code = Some(0x05);
  let analysis = analyze(&mut device, &config);

  assert!(matches!(analysis.ms_os_20, Fetched::Failed { .. }));
  assert!(!analysis.success());
  let text = Renderer::new(false).analysis(&analysis);
  assert!(text.contains("ERROR: Failed to get MS OS 2.0 descriptor"));
}
