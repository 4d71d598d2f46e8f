//! Console presentation of analyses. Nothing here changes a verdict, it only
//! lays findings out with indentation and colour.

use crossterm::style::Stylize;

use std::fmt::Write;

use crate::analyzer::Analysis;
use crate::analyzer::Fetched;
use crate::descriptors::BosAnalysis;
use crate::descriptors::MsOs20Analysis;
use crate::descriptors::UrlAnalysis;
use crate::report::Report;
use crate::report::Severity;
use crate::report::Verdict;
use crate::Error;

/// Descriptor sets shorter than a Set Header are likely cut off.
const MS_OS_20_MIN_EXPECTED_LENGTH: usize = 10;

fn bos_failure_hint(_: &Error) -> Option<&'static str> {
  Some("Device may not support BOS descriptors (USB 2.0 device?)")
}

fn webusb_url_failure_hint(error: &Error) -> Option<&'static str> {
  if error.is_stall() {
    Some("This may indicate no landing page is configured")
  } else {
    None
  }
}

fn ms_os_20_failure_hint(error: &Error) -> Option<&'static str> {
  if error.is_stall() {
    Some("Device returned STALL, it likely does not support MS OS 2.0 descriptors")
  } else {
    None
  }
}

/// Lowercase hex, 16 bytes per line.
pub fn hex_dump(bytes: &[u8]) -> String {
  let mut dump = String::new();
  for line in bytes.chunks(16) {
    for byte in line {
      let _ = write!(dump, "{:02x} ", byte);
    }
    dump.push('\n');
  }
  dump
}

pub struct Renderer {
  color: bool,
}

impl Renderer {
  pub fn new(color: bool) -> Self {
    Renderer { color }
  }

  fn paint(&self, severity: Severity, text: String) -> String {
    if !self.color {
      return text;
    }
    match severity {
      Severity::Info => text,
      Severity::Warning => text.dark_yellow().to_string(),
      Severity::Error => text.red().to_string(),
    }
  }

  fn findings(&self, out: &mut String, report: &Report) {
    for finding in report.findings() {
      let indent = "  ".repeat(finding.depth as usize);
      let text = match finding.severity {
        Severity::Info => finding.message.clone(),
        Severity::Warning => format!("WARNING: {}", finding.message),
        Severity::Error => format!("ERROR: {}", finding.message),
      };
      let _ = writeln!(out, "{}{}", indent, self.paint(finding.severity, text));
    }
  }

  fn verdict(&self, out: &mut String, subject: &str, report: &Report) {
    let verdict = report.verdict();
    let (mark, severity) = match verdict {
      Verdict::WellFormed => ("✓", Severity::Info),
      Verdict::Warnings(_) => ("⚠", Severity::Warning),
      Verdict::Errors { .. } => ("✗", Severity::Error),
    };
    let line = format!("{} {} {}", mark, subject, verdict);
    let _ = writeln!(out, "{}", self.paint(severity, line));
  }

  pub fn bos(&self, analysis: &BosAnalysis) -> String {
    let mut out = String::from("=== BOS Descriptor Analysis ===\n");
    self.findings(&mut out, &analysis.report);
    out.push_str("\n=== BOS Summary ===\n");
    let _ = writeln!(
      out,
      "Parsed {} device capabilities, {} errors, {} warnings",
      analysis.capabilities.len(),
      analysis.report.error_count(),
      analysis.report.warning_count()
    );
    self.verdict(&mut out, "BOS descriptor", &analysis.report);
    out
  }

  pub fn webusb_url(&self, analysis: &UrlAnalysis) -> String {
    let mut out = String::from("=== WebUSB URL Descriptor ===\n");
    self.findings(&mut out, &analysis.report);
    out
  }

  pub fn ms_os_20(&self, analysis: &MsOs20Analysis) -> String {
    let mut out = String::from("=== MS OS 2.0 Descriptor Analysis ===\n");
    self.findings(&mut out, &analysis.report);
    out.push_str("\n=== Summary ===\n");
    let _ = writeln!(
      out,
      "Parsing completed: {} errors, {} warnings",
      analysis.report.error_count(),
      analysis.report.warning_count()
    );
    self.verdict(&mut out, "Descriptor", &analysis.report);
    out
  }

  fn fetched<T>(
    &self,
    out: &mut String,
    name: &str,
    fetched: &Fetched<T>,
    failure_hint: fn(&Error) -> Option<&'static str>,
    decoded: impl Fn(&T) -> String,
  ) {
    match fetched {
      Fetched::Decoded { raw, analysis } => {
        let _ = writeln!(
          out,
          "SUCCESS: {} retrieved ({} bytes)\n",
          name,
          raw.len()
        );
        let _ = writeln!(out, "Raw data:\n{}", hex_dump(raw));
        out.push_str(&decoded(analysis));
      }
      Fetched::Skipped { reason } => {
        let _ = writeln!(out, "INFO: {}", reason);
      }
      Fetched::Empty => {
        let line = format!("WARNING: Device returned 0 bytes for {}", name);
        let _ = writeln!(out, "{}", self.paint(Severity::Warning, line));
      }
      Fetched::Failed { error } => {
        let line = format!("ERROR: Failed to get {}: {}", name, error);
        let _ = writeln!(out, "{}", self.paint(Severity::Error, line));
        // The request-specific hint says more than the error alone.
        if let Some(hint) = failure_hint(error).or_else(|| error.hint()) {
          let _ = writeln!(out, "  {}", hint);
        }
      }
    }
    out.push('\n');
  }

  pub fn analysis(&self, analysis: &Analysis) -> String {
    let mut out = String::from("=== Fetching BOS Descriptor ===\n");
    self.fetched(
      &mut out,
      "BOS descriptor",
      &analysis.bos,
      bos_failure_hint,
      |a| self.bos(a),
    );

    if !matches!(analysis.webusb_url, Fetched::Skipped { .. }) {
      out.push_str("=== Fetching WebUSB URL ===\n");
    }
    self.fetched(
      &mut out,
      "WebUSB URL descriptor",
      &analysis.webusb_url,
      webusb_url_failure_hint,
      |a| self.webusb_url(a),
    );

    out.push_str("=== Fetching MS OS 2.0 Descriptor ===\n");
    let _ = writeln!(
      out,
      "Using MS OS 2.0 vendor code: 0x{:02x}",
      analysis.ms_os_vendor_code
    );
    if let Some(raw) = analysis.ms_os_20.raw() {
      if raw.len() < MS_OS_20_MIN_EXPECTED_LENGTH {
        let line = format!(
          "WARNING: Descriptor very short ({} bytes), may be truncated",
          raw.len()
        );
        let _ = writeln!(out, "{}", self.paint(Severity::Warning, line));
      }
    }
    self.fetched(
      &mut out,
      "MS OS 2.0 descriptor",
      &analysis.ms_os_20,
      ms_os_20_failure_hint,
      |a| self.ms_os_20(a),
    );
    out
  }
}
