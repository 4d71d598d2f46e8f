//! Validates and decodes the USB descriptors a WebUSB or WinUSB device
//! advertises: the Binary Object Store with its platform capabilities, the
//! WebUSB landing page URL and the MS OS 2.0 descriptor set.
//!
//! The decoders in [`descriptors`] only look at bytes and return what they
//! observe as a [`Report`]; fetching the bytes from a device lives in
//! [`device`] behind the [`DescriptorSource`] trait.

#[cfg(feature = "libusb")]
pub use rusb;

pub mod analyzer;
pub mod backend;
pub mod config;
pub mod constants;
pub mod descriptors;
#[cfg(feature = "libusb")]
pub mod device;
pub mod render;
pub mod report;
pub mod uuid;

pub use crate::analyzer::analyze;
pub use crate::analyzer::Analysis;
pub use crate::backend::DescriptorSource;
pub use crate::config::Config;
pub use crate::descriptors::decode_bos;
pub use crate::descriptors::decode_ms_os_20;
pub use crate::descriptors::decode_webusb_url;
pub use crate::report::Finding;
pub use crate::report::Report;
pub use crate::report::Severity;
pub use crate::report::Verdict;
pub use crate::uuid::format_uuid;

/// Failures outside the decoders: talking to the device and reading the
/// command line. Malformed descriptors are never an `Error`, they end up in a
/// [`Report`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
  #[cfg(feature = "libusb")]
  #[error("USB error: {0}")]
  Usb(#[from] rusb::Error),
  #[error("device {vendor_id:04x}:{product_id:04x} not found")]
  NotFound { vendor_id: u16, product_id: u16 },
  #[error("invalid value '{0}' (must be a valid hex or decimal number)")]
  InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  /// What a failed request most likely means for the device.
  pub fn hint(&self) -> Option<&'static str> {
    match self {
      #[cfg(feature = "libusb")]
      Error::Usb(err) => match err {
        rusb::Error::Pipe => {
          Some("device returned STALL, the request is not supported")
        }
        rusb::Error::Timeout => {
          Some("request timed out, the device may be unresponsive")
        }
        rusb::Error::NoDevice => {
          Some("device was disconnected during the request")
        }
        rusb::Error::Access => Some("access denied, try running with sudo"),
        rusb::Error::NotSupported => Some(
          "control transfer not supported by the device or host controller",
        ),
        _ => None,
      },
      Error::NotFound { .. } => Some(
        "make sure the device is connected and powered, you have permission to access USB devices and the VID:PID values are correct (check with lsusb)",
      ),
      Error::InvalidArgument(_) => None,
    }
  }

  /// Whether the device rejected the request with a STALL handshake.
  pub fn is_stall(&self) -> bool {
    match self {
      #[cfg(feature = "libusb")]
      Error::Usb(rusb::Error::Pipe) => true,
      _ => false,
    }
  }
}
