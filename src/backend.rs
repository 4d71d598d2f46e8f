use crate::Result;

/// Supplies raw descriptor bytes to the decoders.
///
/// Every method returns exactly the bytes received, which may be fewer than
/// the transport asked for. Implemented over libusb by
/// [`crate::device::UsbDevice`]; anything else (captured dumps, tests) can
/// stand in for a device.
pub trait DescriptorSource {
  /// Standard GET_DESCRIPTOR request for the BOS descriptor.
  fn read_bos(&mut self) -> Result<Vec<u8>>;

  /// WebUSB GET_URL vendor request for the landing page URL descriptor.
  fn read_webusb_url(
    &mut self,
    vendor_code: u8,
    landing_page: u8,
  ) -> Result<Vec<u8>>;

  /// MS OS 2.0 vendor request for the descriptor set.
  fn read_ms_os_20(&mut self, vendor_code: u8, index: u16) -> Result<Vec<u8>>;
}
