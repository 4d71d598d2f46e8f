use log::debug;
use log::info;
use log::warn;

use rusb::UsbContext;

use std::time::Duration;

use crate::backend::DescriptorSource;
use crate::config::Config;
use crate::constants::BOS_DESCRIPTOR_TYPE;
use crate::constants::GET_DESCRIPTOR_REQUEST;
use crate::constants::GET_URL_REQUEST;
use crate::Error;
use crate::Result;

/// A device opened by VID/PID, read with blocking control transfers.
pub struct UsbDevice {
  device_handle: rusb::DeviceHandle<rusb::Context>,
  timeout: Duration,
  buffer_size: usize,
}

impl UsbDevice {
  pub fn open(config: &Config) -> Result<Self> {
    let context = rusb::Context::new()?;
    let mut device_handle = context
      .open_device_with_vid_pid(config.vendor_id, config.product_id)
      .ok_or(Error::NotFound {
        vendor_id: config.vendor_id,
        product_id: config.product_id,
      })?;
    info!(
      "opened device {:04x}:{:04x}",
      config.vendor_id, config.product_id
    );

    if config.detach_kernel_driver {
      detach_kernel_driver(&mut device_handle);
    }

    Ok(UsbDevice {
      device_handle,
      timeout: config.timeout,
      buffer_size: config.buffer_size,
    })
  }

  fn read_control(
    &mut self,
    request_type: rusb::RequestType,
    request: u8,
    value: u16,
    index: u16,
  ) -> Result<Vec<u8>> {
    let request_type = rusb::request_type(
      rusb::Direction::In,
      request_type,
      rusb::Recipient::Device,
    );
    let mut buffer = vec![0; self.buffer_size];

    debug!(
      "control transfer bmRequestType=0x{:02x} bRequest=0x{:02x} wValue=0x{:04x} wIndex=0x{:04x} wLength={}",
      request_type, request, value, index, self.buffer_size
    );
    let length = self.device_handle.read_control(
      request_type,
      request,
      value,
      index,
      &mut buffer,
      self.timeout,
    )?;
    debug!("received {} bytes", length);

    buffer.truncate(length);
    Ok(buffer)
  }
}

/// Frees interface 0 from a kernel driver. Failing to do so is not fatal:
/// the requests below target the device, not the interface.
fn detach_kernel_driver(device_handle: &mut rusb::DeviceHandle<rusb::Context>) {
  match device_handle.kernel_driver_active(0) {
    Ok(true) => {
      info!("kernel driver is active on interface 0, detaching");
      match device_handle.detach_kernel_driver(0) {
        Ok(()) | Err(rusb::Error::NotFound) => {}
        Err(err) => warn!("could not detach kernel driver: {}", err),
      }
    }
    Ok(false) => {}
    Err(err) => debug!("kernel driver state unavailable: {}", err),
  }
}

impl DescriptorSource for UsbDevice {
  fn read_bos(&mut self) -> Result<Vec<u8>> {
    self.read_control(
      rusb::RequestType::Standard,
      GET_DESCRIPTOR_REQUEST,
      (BOS_DESCRIPTOR_TYPE as u16) << 8,
      0,
    )
  }

  // https://wicg.github.io/webusb/#get-url
  fn read_webusb_url(
    &mut self,
    vendor_code: u8,
    landing_page: u8,
  ) -> Result<Vec<u8>> {
    self.read_control(
      rusb::RequestType::Vendor,
      vendor_code,
      landing_page as u16,
      GET_URL_REQUEST,
    )
  }

  fn read_ms_os_20(&mut self, vendor_code: u8, index: u16) -> Result<Vec<u8>> {
    self.read_control(rusb::RequestType::Vendor, vendor_code, 0, index)
  }
}
