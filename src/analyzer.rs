use log::debug;
use log::info;

use serde::Serialize;
use serde::Serializer;

use crate::backend::DescriptorSource;
use crate::config::Config;
use crate::constants::MS_OS_20_DEFAULT_VENDOR_CODE;
use crate::descriptors::decode_bos;
use crate::descriptors::decode_ms_os_20;
use crate::descriptors::decode_webusb_url;
use crate::descriptors::BosAnalysis;
use crate::descriptors::MsOs20Analysis;
use crate::descriptors::UrlAnalysis;
use crate::Error;
use crate::Result;

/// Outcome of fetching and decoding one descriptor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Fetched<T> {
  Decoded {
    raw: Vec<u8>,
    analysis: T,
  },
  /// Not requested.
  Skipped { reason: String },
  /// The request succeeded but returned no bytes.
  Empty,
  Failed {
    #[serde(serialize_with = "display")]
    error: Error,
  },
}

fn display<S: Serializer>(
  error: &Error,
  serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
  serializer.collect_str(error)
}

impl<T> Fetched<T> {
  fn from_response(response: Result<Vec<u8>>, decode: fn(&[u8]) -> T) -> Self {
    match response {
      Ok(raw) if raw.is_empty() => Fetched::Empty,
      Ok(raw) => {
        let analysis = decode(&raw);
        Fetched::Decoded { raw, analysis }
      }
      Err(error) => Fetched::Failed { error },
    }
  }

  pub fn analysis(&self) -> Option<&T> {
    match self {
      Fetched::Decoded { analysis, .. } => Some(analysis),
      _ => None,
    }
  }

  pub fn raw(&self) -> Option<&[u8]> {
    match self {
      Fetched::Decoded { raw, .. } => Some(raw),
      _ => None,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
  pub bos: Fetched<BosAnalysis>,
  pub webusb_url: Fetched<UrlAnalysis>,
  /// Vendor code the MS OS 2.0 descriptor set was requested with.
  pub ms_os_vendor_code: u8,
  pub ms_os_20: Fetched<MsOs20Analysis>,
}

impl Analysis {
  /// Whether the MS OS 2.0 descriptor set could be read at all.
  pub fn success(&self) -> bool {
    self.ms_os_20.analysis().is_some()
  }
}

/// Reads the BOS, WebUSB URL and MS OS 2.0 descriptors from `source` and
/// decodes each of them.
///
/// The URL is only requested when the BOS advertises a WebUSB capability
/// with a vendor code and a landing page.
pub fn analyze<S: DescriptorSource + ?Sized>(
  source: &mut S,
  config: &Config,
) -> Analysis {
  let bos = Fetched::from_response(source.read_bos(), decode_bos);
  let bos_analysis = bos.analysis();

  let webusb_url = match bos_analysis.and_then(|b| b.webusb()) {
    Some(capability) if capability.has_landing_page() => {
      info!(
        "fetching WebUSB URL (vendor code 0x{:02x}, landing page {})",
        capability.vendor_code, capability.landing_page
      );
      Fetched::from_response(
        source
          .read_webusb_url(capability.vendor_code, capability.landing_page),
        decode_webusb_url,
      )
    }
    Some(_) => Fetched::Skipped {
      reason: "WebUSB capability has no vendor code or landing page"
        .to_string(),
    },
    None => Fetched::Skipped {
      reason: "No WebUSB capability found in BOS descriptor".to_string(),
    },
  };

  let ms_os_vendor_code = config
    .ms_os_vendor_code
    .or_else(|| bos_analysis.and_then(|b| b.ms_os_20()).map(|c| c.vendor_code))
    .unwrap_or(MS_OS_20_DEFAULT_VENDOR_CODE);
  debug!(
    "requesting MS OS 2.0 descriptor set with vendor code 0x{:02x}",
    ms_os_vendor_code
  );
  let ms_os_20 = Fetched::from_response(
    source.read_ms_os_20(ms_os_vendor_code, config.ms_os_descriptor_index),
    decode_ms_os_20,
  );

  Analysis {
    bos,
    webusb_url,
    ms_os_vendor_code,
    ms_os_20,
  }
}
