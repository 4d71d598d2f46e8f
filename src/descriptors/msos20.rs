use serde::Serialize;

use crate::constants::*;
use crate::descriptors::ascii_field;
use crate::descriptors::get_u16;
use crate::descriptors::get_u32;
use crate::descriptors::utf16_ascii;
use crate::descriptors::without_terminator;
use crate::report::Report;

/// A sub-descriptor of an MS OS 2.0 descriptor set.
// https://learn.microsoft.com/en-us/windows-hardware/drivers/usbcon/microsoft-os-2-0-descriptors-specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MsOs20Descriptor {
  #[serde(rename_all = "camelCase")]
  SetHeader {
    windows_version: u32,
    total_length: u16,
  },
  #[serde(rename_all = "camelCase")]
  ConfigurationSubset {
    configuration_value: u8,
    reserved: u8,
    total_length: u16,
  },
  #[serde(rename_all = "camelCase")]
  FunctionSubset {
    first_interface: u8,
    reserved: u8,
    subset_length: u16,
  },
  #[serde(rename_all = "camelCase")]
  CompatibleId {
    compatible_id: String,
    sub_compatible_id: String,
  },
  #[serde(rename_all = "camelCase")]
  RegistryProperty {
    data_type: u16,
    name_length: u16,
    /// Rendered name, absent when the name length is invalid.
    name: Option<String>,
    data_length: Option<u16>,
    /// Rendered data, absent when empty or out of bounds.
    data: Option<String>,
  },
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsOs20Record {
  pub offset: usize,
  pub length: u16,
  pub descriptor_type: u16,
  /// `None` when `length` is too short for the fixed fields of the type.
  pub descriptor: Option<MsOs20Descriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsOs20Analysis {
  pub records: Vec<MsOs20Record>,
  pub report: Report,
}

impl MsOs20Analysis {
  pub fn compatible_ids(&self) -> impl Iterator<Item = &str> {
    self.records.iter().filter_map(|r| match &r.descriptor {
      Some(MsOs20Descriptor::CompatibleId { compatible_id, .. }) => {
        Some(compatible_id.as_str())
      }
      _ => None,
    })
  }
}

/// Names of feature descriptors this tool recognises but does not decode.
fn undecoded_feature(descriptor_type: u16) -> Option<&'static str> {
  match descriptor_type {
    MS_OS_20_FEATURE_MIN_RESUME_TIME => Some("Min Resume Time"),
    MS_OS_20_FEATURE_MODEL_ID => Some("Model ID"),
    MS_OS_20_FEATURE_CCGP_DEVICE => Some("CCGP Device"),
    MS_OS_20_FEATURE_VENDOR_REVISION => Some("Vendor Revision"),
    _ => None,
  }
}

pub fn decode_ms_os_20(bytes: &[u8]) -> MsOs20Analysis {
  let length = bytes.len();
  let mut report = Report::new();
  let mut records = Vec::new();
  report.info(0, format!("Total descriptor length: {} bytes", length));

  let mut offset = 0;
  while offset < length {
    let (w_length, descriptor_type) =
      match (get_u16(bytes, offset), get_u16(bytes, offset + 2)) {
        (Some(w_length), Some(descriptor_type)) => (w_length, descriptor_type),
        _ => {
          report.error(
            0,
            format!(
              "Truncated descriptor at offset {} (need 4 bytes, have {})",
              offset,
              length - offset
            ),
          );
          break;
        }
      };

    if w_length == 0 {
      report.error(0, format!("Zero length descriptor at offset {}", offset));
      break;
    }

    if w_length < 4 {
      report.error(
        0,
        format!(
          "Invalid descriptor length {} at offset {} (minimum is 4)",
          w_length, offset
        ),
      );
      break;
    }

    if offset + w_length as usize > length {
      report.error(
        0,
        format!(
          "Descriptor extends beyond buffer (offset={}, len={}, buffer={})",
          offset, w_length, length
        ),
      );
      break;
    }

    // Bounds of the whole record are established from here on.
    let record = &bytes[offset..offset + w_length as usize];
    let descriptor = match descriptor_type {
      MS_OS_20_SET_HEADER_DESCRIPTOR => {
        set_header(record, offset, length, &mut report)
      }
      MS_OS_20_SUBSET_HEADER_CONFIGURATION => {
        configuration_subset(record, offset, length, &mut report)
      }
      MS_OS_20_SUBSET_HEADER_FUNCTION => {
        function_subset(record, offset, length, &mut report)
      }
      MS_OS_20_FEATURE_COMPATIBLE_ID => {
        compatible_id(record, offset, &mut report)
      }
      MS_OS_20_FEATURE_REG_PROPERTY => {
        registry_property(bytes, offset, w_length, &mut report)
      }
      other => {
        let message = match undecoded_feature(other) {
          Some(name) => format!(
            "Offset {}: Unknown Descriptor Type 0x{:04x} ({} feature, not decoded, len={})",
            offset, other, name, w_length
          ),
          None => format!(
            "Offset {}: Unknown Descriptor Type 0x{:04x} (len={})",
            offset, other, w_length
          ),
        };
        // Unlike the length checks above, the walk goes on.
        report.error(0, message);
        Some(MsOs20Descriptor::Unknown)
      }
    };

    records.push(MsOs20Record {
      offset,
      length: w_length,
      descriptor_type,
      descriptor,
    });

    offset += w_length as usize;
  }

  MsOs20Analysis { records, report }
}

fn too_short(
  report: &mut Report,
  name: &str,
  offset: usize,
  w_length: usize,
  expected: usize,
) -> Option<MsOs20Descriptor> {
  report.error(
    0,
    format!(
      "Offset {}: {} too short (len={}, expected={})",
      offset, name, w_length, expected
    ),
  );
  None
}

fn set_header(
  record: &[u8],
  offset: usize,
  length: usize,
  report: &mut Report,
) -> Option<MsOs20Descriptor> {
  if record.len() < 10 {
    return too_short(report, "Set Header", offset, record.len(), 10);
  }

  let windows_version = get_u32(record, 4)?;
  let total_length = get_u16(record, 8)?;
  report.info(
    0,
    format!(
      "Offset {}: Set Header (len={}, winver=0x{:08x}, total={})",
      offset,
      record.len(),
      windows_version,
      total_length
    ),
  );

  if total_length as usize != length {
    report.warning(
      1,
      format!(
        "Total length mismatch (reported={}, actual={})",
        total_length, length
      ),
    );
  }

  if offset != 0 {
    report.warning(1, format!("Set Header not at beginning (offset={})", offset));
  }

  if windows_version != MS_OS_20_WINDOWS_VERSION {
    report.warning(
      1,
      format!(
        "Unusual Windows version 0x{:08x} (expected 0x{:08x} for Windows 8.1)",
        windows_version, MS_OS_20_WINDOWS_VERSION
      ),
    );
  }

  Some(MsOs20Descriptor::SetHeader {
    windows_version,
    total_length,
  })
}

fn configuration_subset(
  record: &[u8],
  offset: usize,
  length: usize,
  report: &mut Report,
) -> Option<MsOs20Descriptor> {
  if record.len() < 8 {
    return too_short(
      report,
      "Configuration Subset Header",
      offset,
      record.len(),
      8,
    );
  }

  let configuration_value = record[4];
  let reserved = record[5];
  let total_length = get_u16(record, 6)?;
  report.info(
    0,
    format!(
      "Offset {}: Configuration Subset Header (len={}, config={}, total={})",
      offset,
      record.len(),
      configuration_value,
      total_length
    ),
  );

  if reserved != 0 {
    report.warning(1, format!("Reserved field not zero (value={})", reserved));
  }

  if offset + total_length as usize > length {
    report.error(1, "Configuration subset extends beyond buffer");
  }

  Some(MsOs20Descriptor::ConfigurationSubset {
    configuration_value,
    reserved,
    total_length,
  })
}

fn function_subset(
  record: &[u8],
  offset: usize,
  length: usize,
  report: &mut Report,
) -> Option<MsOs20Descriptor> {
  if record.len() < 8 {
    return too_short(
      report,
      "Function Subset Header",
      offset,
      record.len(),
      8,
    );
  }

  let first_interface = record[4];
  let reserved = record[5];
  let subset_length = get_u16(record, 6)?;
  report.info(
    0,
    format!(
      "Offset {}: Function Subset Header (len={}, interface={}, subset={})",
      offset,
      record.len(),
      first_interface,
      subset_length
    ),
  );

  if reserved != 0 {
    report.warning(1, format!("Reserved field not zero (value={})", reserved));
  }

  if offset + subset_length as usize > length {
    report.error(1, "Function subset extends beyond buffer");
  }

  if (subset_length as usize) < record.len() {
    report.error(1, "Function subset length smaller than header length");
  }

  Some(MsOs20Descriptor::FunctionSubset {
    first_interface,
    reserved,
    subset_length,
  })
}

fn compatible_id(
  record: &[u8],
  offset: usize,
  report: &mut Report,
) -> Option<MsOs20Descriptor> {
  if record.len() < 20 {
    return too_short(
      report,
      "Compatible ID Feature",
      offset,
      record.len(),
      20,
    );
  }

  let compatible = &record[4..12];
  let compatible_id = ascii_field(compatible);
  let sub_compatible_id = ascii_field(&record[12..20]);
  report.info(
    0,
    format!(
      "Offset {}: Compatible ID Feature (len={}, compat='{}', subcompat='{}')",
      offset,
      record.len(),
      compatible_id,
      sub_compatible_id
    ),
  );

  if &compatible[..6] != b"WINUSB" {
    report.warning(1, "Compatible ID is not 'WINUSB'");
  }

  if compatible[6] != 0 || compatible[7] != 0 {
    report.warning(1, "Compatible ID not properly null-terminated");
  }

  Some(MsOs20Descriptor::CompatibleId {
    compatible_id,
    sub_compatible_id,
  })
}

/// The name and data of a registry property are sized inline, so unlike the
/// other records this one is checked against the whole buffer.
fn registry_property(
  bytes: &[u8],
  offset: usize,
  w_length: u16,
  report: &mut Report,
) -> Option<MsOs20Descriptor> {
  let length = bytes.len();
  if w_length < 8 {
    return too_short(
      report,
      "Registry Property Feature",
      offset,
      w_length as usize,
      8,
    );
  }

  let data_type = get_u16(bytes, offset + 4)?;
  let name_length = get_u16(bytes, offset + 6)?;
  report.info(
    0,
    format!(
      "Offset {}: Registry Property Feature (len={}, datatype={}, namelen={})",
      offset, w_length, data_type, name_length
    ),
  );

  if data_type != REG_SZ && data_type != REG_MULTI_SZ {
    report.warning(
      1,
      format!(
        "Unusual property data type {} (1=REG_SZ, 7=REG_MULTI_SZ)",
        data_type
      ),
    );
  }

  let mut property = MsOs20Descriptor::RegistryProperty {
    data_type,
    name_length,
    name: None,
    data_length: None,
    data: None,
  };

  let name_start = offset + 8;
  let name_end = name_start + name_length as usize;
  // UTF-16LE with a terminator: even and non-empty.
  if name_length == 0 || name_length % 2 != 0 {
    report.error(1, "Invalid property name length (must be even and >0)");
    return Some(property);
  }
  if name_end > length {
    report.error(1, "Property name extends beyond descriptor");
    return Some(property);
  }

  let (name, printable) = utf16_ascii(
    &bytes[name_start..name_start + without_terminator(name_length as usize)],
  );
  report.info(1, format!("Property Name: {}", name));
  if printable == 0 {
    report.warning(1, "Empty property name");
  }

  let data_length = match get_u16(bytes, name_end) {
    Some(data_length) => data_length,
    None => {
      report.error(1, "Property data length field beyond descriptor");
      set_registry_fields(&mut property, Some(name), None, None);
      return Some(property);
    }
  };
  report.info(1, format!("Property Data Length: {}", data_length));

  let expected = 8 + name_length as usize + 2 + data_length as usize;
  if expected != w_length as usize {
    report.error(
      1,
      format!(
        "Length mismatch (calculated={}, reported={})",
        expected, w_length
      ),
    );
  }

  let data_start = name_end + 2;
  let data = if data_start + data_length as usize > length {
    report.error(1, "Property data extends beyond descriptor");
    None
  } else if data_length > 0 {
    let (data, _) = utf16_ascii(
      &bytes[data_start..data_start + without_terminator(data_length as usize)],
    );
    report.info(1, format!("Property Data: {}", data));
    Some(data)
  } else {
    None
  };

  set_registry_fields(&mut property, Some(name), Some(data_length), data);
  Some(property)
}

fn set_registry_fields(
  property: &mut MsOs20Descriptor,
  rendered_name: Option<String>,
  rendered_data_length: Option<u16>,
  rendered_data: Option<String>,
) {
  if let MsOs20Descriptor::RegistryProperty {
    name,
    data_length,
    data,
    ..
  } = property
  {
    *name = rendered_name;
    *data_length = rendered_data_length;
    *data = rendered_data;
  }
}
