use clap::Parser;

use log::LevelFilter;

use std::process::ExitCode;
use std::time::Duration;

use usb_descriptor_analyzer::analyze;
use usb_descriptor_analyzer::config::parse_code;
use usb_descriptor_analyzer::config::parse_id;
use usb_descriptor_analyzer::config::Config;
use usb_descriptor_analyzer::config::DEFAULT_BUFFER_SIZE;
use usb_descriptor_analyzer::device::UsbDevice;
use usb_descriptor_analyzer::render::Renderer;

#[derive(Parser, Debug)]
#[command(name = "usb-descriptor-analyzer")]
#[command(
  version,
  about = "Fetch and validate the BOS, WebUSB URL and MS OS 2.0 descriptors of a USB device"
)]
#[command(after_help = "EXAMPLES:
    usb-descriptor-analyzer 0x361d 0x0202
    usb-descriptor-analyzer 13917 514")]
struct Args {
  /// Vendor ID, hex (0x361d) or decimal
  #[arg(value_parser = parse_id)]
  vid: u16,

  /// Product ID, hex (0x0202) or decimal
  #[arg(value_parser = parse_id)]
  pid: u16,

  /// Control transfer timeout in milliseconds
  #[arg(long, value_name = "MS", default_value_t = 5000)]
  timeout_ms: u64,

  /// Buffer size for every control transfer
  #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_SIZE)]
  buffer_size: usize,

  /// Vendor code for the MS OS 2.0 request, instead of the one in the BOS
  #[arg(long, value_name = "CODE", value_parser = parse_code)]
  ms_os_vendor_code: Option<u8>,

  /// Leave a kernel driver bound to interface 0 alone
  #[arg(long)]
  no_detach: bool,

  /// Print the analysis as JSON
  #[arg(long)]
  json: bool,

  /// Disable coloured output
  #[arg(long)]
  no_color: bool,

  /// More logging (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

impl Args {
  fn config(&self) -> Config {
    let mut config = Config::new(self.vid, self.pid);
    config.timeout = Duration::from_millis(self.timeout_ms);
    config.buffer_size = self.buffer_size;
    config.ms_os_vendor_code = self.ms_os_vendor_code;
    config.detach_kernel_driver = !self.no_detach;
    config
  }
}

fn main() -> ExitCode {
  let args = Args::parse();

  let level = match args.verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .init();

  let config = args.config();
  let renderer = Renderer::new(!args.no_color);

  if !args.json {
    println!(
      "Looking for USB device {:04x}:{:04x}",
      config.vendor_id, config.product_id
    );
  }

  let mut device = match UsbDevice::open(&config) {
    Ok(device) => device,
    Err(err) => {
      eprintln!("ERROR: {}", err);
      if let Some(hint) = err.hint() {
        eprintln!("{}", hint);
      }
      return ExitCode::FAILURE;
    }
  };

  if !args.json {
    println!("Device opened successfully\n");
  }
  let analysis = analyze(&mut device, &config);

  if args.json {
    match serde_json::to_string_pretty(&analysis) {
      Ok(json) => println!("{}", json),
      Err(err) => {
        eprintln!("ERROR: could not serialize analysis: {}", err);
        return ExitCode::FAILURE;
      }
    }
  } else {
    print!("{}", renderer.analysis(&analysis));
  }

  if analysis.success() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  }
}
