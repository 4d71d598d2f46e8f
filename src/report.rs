use serde::Serialize;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Warning,
  Error,
}

/// A single observation made while walking a descriptor.
///
/// `depth` is the nesting level of the record the finding belongs to, so a
/// renderer can indent capability payloads below their capability header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
  pub severity: Severity,
  pub depth: u8,
  pub message: String,
}

/// Ordered findings of one decode call plus their error/warning counters.
///
/// The counters are only ever bumped together with a pushed finding, so they
/// always agree with `findings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
  error_count: usize,
  warning_count: usize,
  findings: Vec<Finding>,
}

impl Report {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn info(&mut self, depth: u8, message: impl Into<String>) {
    self.push(Severity::Info, depth, message.into());
  }

  pub(crate) fn warning(&mut self, depth: u8, message: impl Into<String>) {
    self.warning_count += 1;
    self.push(Severity::Warning, depth, message.into());
  }

  pub(crate) fn error(&mut self, depth: u8, message: impl Into<String>) {
    self.error_count += 1;
    self.push(Severity::Error, depth, message.into());
  }

  fn push(&mut self, severity: Severity, depth: u8, message: String) {
    self.findings.push(Finding {
      severity,
      depth,
      message,
    });
  }

  pub fn error_count(&self) -> usize {
    self.error_count
  }

  pub fn warning_count(&self) -> usize {
    self.warning_count
  }

  pub fn findings(&self) -> &[Finding] {
    &self.findings
  }

  pub fn errors(&self) -> impl Iterator<Item = &Finding> {
    self.with_severity(Severity::Error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
    self.with_severity(Severity::Warning)
  }

  fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
    self.findings.iter().filter(move |f| f.severity == severity)
  }

  pub fn is_well_formed(&self) -> bool {
    self.verdict() == Verdict::WellFormed
  }

  pub fn verdict(&self) -> Verdict {
    match (self.error_count, self.warning_count) {
      (0, 0) => Verdict::WellFormed,
      (0, warnings) => Verdict::Warnings(warnings),
      (errors, warnings) => Verdict::Errors { errors, warnings },
    }
  }
}

/// Severity classification printed at the end of every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  WellFormed,
  Warnings(usize),
  Errors { errors: usize, warnings: usize },
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Verdict::WellFormed => write!(f, "appears to be well-formed"),
      Verdict::Warnings(warnings) => {
        write!(f, "is valid but has {} warning(s)", warnings)
      }
      Verdict::Errors { errors, warnings } => {
        write!(f, "has {} error(s) and {} warning(s)", errors, warnings)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::Report;
  use super::Severity;
  use super::Verdict;

  #[test]
  fn test_counters_follow_findings() {
    let mut report = Report::new();
    report.info(0, "header");
    report.warning(1, "odd");
    report.error(1, "broken");
    report.warning(2, "odd again");

    assert_eq!(report.error_count(), 1);
    assert_eq!(report.warning_count(), 2);
    assert_eq!(report.findings().len(), 4);
    assert_eq!(report.errors().count(), 1);
    assert_eq!(report.warnings().count(), 2);
    assert_eq!(report.findings()[2].severity, Severity::Error);
    assert_eq!(report.findings()[2].depth, 1);
  }

  #[test]
  fn test_verdict() {
    let mut report = Report::new();
    report.info(0, "fine");
    assert_eq!(report.verdict(), Verdict::WellFormed);
    assert!(report.is_well_formed());

    report.warning(0, "hm");
    assert_eq!(report.verdict(), Verdict::Warnings(1));
    assert_eq!(report.verdict().to_string(), "is valid but has 1 warning(s)");

    report.error(0, "no");
    assert_eq!(
      report.verdict(),
      Verdict::Errors {
        errors: 1,
        warnings: 1
      }
    );
    assert!(!report.is_well_formed());
  }
}
