use serde::Serialize;

use crate::constants::*;
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlScheme {
  Http,
  Https,
  /// The URL carries its own scheme.
  None,
  Unknown(u8),
}

impl UrlScheme {
  pub fn from_raw(scheme: u8) -> Self {
    match scheme {
      URL_SCHEME_HTTP => UrlScheme::Http,
      URL_SCHEME_HTTPS => UrlScheme::Https,
      URL_SCHEME_NONE => UrlScheme::None,
      other => UrlScheme::Unknown(other),
    }
  }

  pub fn prefix(&self) -> &'static str {
    match self {
      UrlScheme::Http => "http://",
      UrlScheme::Https => "https://",
      UrlScheme::None => "",
      UrlScheme::Unknown(_) => "unknown://",
    }
  }

  fn label(&self) -> &'static str {
    match self {
      UrlScheme::Http => "HTTP",
      UrlScheme::Https => "HTTPS",
      UrlScheme::None => "None",
      UrlScheme::Unknown(_) => "Unknown",
    }
  }
}

// http://wicg.github.io/webusb/#dfn-url-descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebUsbUrl {
  pub length: u8,
  pub descriptor_type: u8,
  pub scheme: UrlScheme,
  /// Scheme prefix plus the raw URL bytes. Absent when the buffer holds
  /// nothing past the fixed header.
  pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysis {
  pub descriptor: Option<WebUsbUrl>,
  pub report: Report,
}

impl UrlAnalysis {
  pub fn url(&self) -> Option<&str> {
    self.descriptor.as_ref()?.url.as_deref()
  }
}

pub fn decode_webusb_url(bytes: &[u8]) -> UrlAnalysis {
  let length = bytes.len();
  let mut report = Report::new();
  report.info(0, format!("Length: {} bytes", length));

  if length < URL_DESCRIPTOR_MIN_LENGTH {
    report.error(0, "WebUSB URL descriptor too short");
    return UrlAnalysis {
      descriptor: None,
      report,
    };
  }

  let b_length = bytes[0];
  let descriptor_type = bytes[1];
  let scheme = UrlScheme::from_raw(bytes[2]);

  report.info(0, format!("bLength: {}", b_length));
  // A foreign descriptor type is noted, not counted.
  report.info(
    0,
    format!(
      "bDescriptorType: {} ({})",
      descriptor_type,
      if descriptor_type == WEBUSB_URL_DESCRIPTOR_TYPE {
        "WebUSB URL"
      } else {
        "UNKNOWN"
      }
    ),
  );
  report.info(0, format!("bScheme: {} ({})", bytes[2], scheme.label()));

  let url = if length > URL_DESCRIPTOR_MIN_LENGTH {
    let end = length.min(b_length as usize).max(URL_DESCRIPTOR_MIN_LENGTH);
    let mut url = String::from(scheme.prefix());
    url.extend(bytes[URL_DESCRIPTOR_MIN_LENGTH..end].iter().map(|&b| b as char));
    report.info(0, format!("URL: {}", url));
    Some(url)
  } else {
    None
  };

  UrlAnalysis {
    descriptor: Some(WebUsbUrl {
      length: b_length,
      descriptor_type,
      scheme,
      url,
    }),
    report,
  }
}
