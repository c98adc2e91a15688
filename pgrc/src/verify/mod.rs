//! Opens and shorts verification of DSPF artifacts
//!
//! Works purely on the text: the file is parsed back into per-net node sets and
//! resistor edges, then checked for floating instance pins (per net) and for
//! points claimed by more than one net (global).

pub mod opens;
pub mod report;
pub mod shorts;

pub use report::{
    NetOpenResult, ShortLocation, VerificationReport, VerificationStats, VerificationStatus,
    SHORTS_SHOWN,
};
pub use shorts::SpatialIndex;

use std::path::Path;

use rayon::prelude::*;

use crate::core::PgrcError;
use crate::dspf::{DspfParser, ParsedDspf};

/// Default size limit for checked files
pub const DEFAULT_MAX_FILE_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// Run the per-net connectivity check
    pub check_opens: bool,
    /// Files larger than this are skipped with a warning; `None` checks everything
    pub max_file_bytes: Option<u64>,
    /// Parse and check nets on the rayon pool
    pub parallel: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_opens: true,
            max_file_bytes: Some(DEFAULT_MAX_FILE_BYTES),
            parallel: true,
        }
    }
}

pub struct Verifier {
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    fn parser(&self) -> DspfParser {
        DspfParser::new(self.options.parallel)
    }

    /// Verify a DSPF file, honoring the size limit
    pub fn verify_file(&self, path: &Path) -> Result<VerificationReport, PgrcError> {
        if let Some(limit) = self.options.max_file_bytes {
            let size = std::fs::metadata(path)
                .map_err(|source| PgrcError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .len();
            if size > limit {
                let reason = format!(
                    "file size {:.1} MB exceeds the {:.1} MB check limit",
                    size as f64 / (1024.0 * 1024.0),
                    limit as f64 / (1024.0 * 1024.0)
                );
                tracing::warn!("Skipping DSPF check of {}: {}", path.display(), reason);
                return Ok(VerificationReport::skipped(path.to_path_buf(), reason));
            }
        }

        tracing::info!("Verifying {}", path.display());
        let parsed = self.parser().parse_file(path)?;
        let mut report = self.verify_parsed(&parsed);
        report.file = Some(path.to_path_buf());
        Ok(report)
    }

    /// Verify DSPF text held in memory
    pub fn verify_str(&self, content: &str) -> Result<VerificationReport, PgrcError> {
        let parsed = self.parser().parse_str(content)?;
        Ok(self.verify_parsed(&parsed))
    }

    pub fn verify_parsed(&self, parsed: &ParsedDspf) -> VerificationReport {
        let opens = if self.options.check_opens {
            if self.options.parallel {
                parsed.nets.par_iter().map(|(_, net)| opens::check_net(net)).collect()
            } else {
                parsed.nets.values().map(opens::check_net).collect()
            }
        } else {
            tracing::debug!("Open check disabled");
            Vec::new()
        };

        let shorts = shorts::find_shorts(parsed.nets.values());

        let mut stats = VerificationStats {
            nets: parsed.nets.len(),
            ..Default::default()
        };
        for net in parsed.nets.values() {
            stats.nodes += net.nodes.len();
            stats.resistors += net.resistors.len();
            stats.capacitors += net.capacitors;
            stats.ports += net.ports.len();
            stats.instance_pins += net.instance_pins.len();
        }

        let report = VerificationReport::new(
            parsed.design.clone(),
            self.options.check_opens,
            opens,
            shorts,
            stats,
        );
        if report.passed() {
            tracing::info!("Verification passed: {} nets", report.stats.nets);
        } else {
            tracing::warn!(
                "Verification failed: {} floating pins, {} shorts",
                report.stats.floating_pins,
                report.stats.shorts
            );
        }
        report
    }
}
