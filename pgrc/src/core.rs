//! Core flow shared by the CLI and library users.
//! Loads layouts, extracts, writes DSPF and verifies the written artifacts.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::dspf::{DspfParseError, DspfWriter, WriterOptions};
use crate::extract::{ExtractOptions, ExtractStats, Extraction, Extractor};
use crate::layout::Layout;
use crate::verify::{VerificationReport, Verifier, VerifyOptions};

#[derive(Debug, thiserror::Error)]
pub enum PgrcError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Parse error: {0}")]
    Parse(#[from] DspfParseError),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid layout {}: {source}", .path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Options for a full extract, write and verify run.
#[derive(Clone, Debug)]
pub struct FlowOptions {
    pub extract: ExtractOptions,
    pub writer: WriterOptions,
    pub verify: VerifyOptions,
    /// Directory receiving `output_<design>.dspf`, created when missing
    pub output_dir: PathBuf,
    /// Verify the written file
    pub verify_output: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            writer: WriterOptions::default(),
            verify: VerifyOptions::default(),
            output_dir: PathBuf::from("reports"),
            verify_output: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowResult {
    pub dspf: PathBuf,
    pub extraction: ExtractStats,
    /// `None` when verification was turned off
    pub verification: Option<VerificationReport>,
    pub timings: FlowTimings,
}

/// Wall-clock time spent in each flow stage
#[derive(Debug, Clone, Default)]
pub struct FlowTimings {
    pub extract: Duration,
    pub write: Duration,
    pub verify: Option<Duration>,
}

impl FlowResult {
    /// False only when the verifier ran and found defects
    pub fn passed(&self) -> bool {
        self.verification.as_ref().map_or(true, |r| !r.failed())
    }
}

/// Recursively discover DSPF files in a directory.
pub fn discover_dspf_files(dir: &Path) -> Result<Vec<PathBuf>, PgrcError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), PgrcError> {
    if depth > 20 {
        return Ok(());
    }
    let io_err = |source| PgrcError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "target" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.is_file() {
            if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                if ext.eq_ignore_ascii_case("dspf") || ext.eq_ignore_ascii_case("spf") {
                    files.push(path);
                }
            }
        }
    }
    Ok(())
}

/// File name the flow writes for a design.
pub fn dspf_file_name(design: &str) -> String {
    format!("output_{}.dspf", design)
}

/// Core API used by the CLI.
pub struct PgrcCore;

impl PgrcCore {
    pub fn load_layout(path: &Path) -> Result<Layout, PgrcError> {
        let layout = Layout::load(path)?;
        tracing::info!(
            "Loaded layout '{}' from {}: {} nets",
            layout.design,
            path.display(),
            layout.nets.len()
        );
        Ok(layout)
    }

    pub fn extract_layout(layout: &Layout, options: ExtractOptions) -> Result<Extraction, PgrcError> {
        let extractor = Extractor::for_layout(layout, options)?;
        Ok(extractor.extract_layout(layout))
    }

    pub fn write_dspf(
        extraction: &Extraction,
        path: &Path,
        options: WriterOptions,
    ) -> Result<(), PgrcError> {
        DspfWriter::new(options).write_file(path, extraction)
    }

    pub fn verify_file(path: &Path, options: VerifyOptions) -> Result<VerificationReport, PgrcError> {
        Verifier::new(options).verify_file(path)
    }

    /// Verify several files; an error in one file does not stop the others.
    pub fn verify_files(
        paths: &[PathBuf],
        options: VerifyOptions,
    ) -> Vec<(PathBuf, Result<VerificationReport, PgrcError>)> {
        let verifier = Verifier::new(options);
        paths
            .iter()
            .map(|path| {
                let result = verifier.verify_file(path);
                if let Err(e) = &result {
                    tracing::warn!("Failed to verify {}: {}", path.display(), e);
                }
                (path.clone(), result)
            })
            .collect()
    }

    pub fn verify_directory(
        dir: &Path,
        options: VerifyOptions,
    ) -> Result<Vec<(PathBuf, Result<VerificationReport, PgrcError>)>, PgrcError> {
        let files = discover_dspf_files(dir)?;
        tracing::info!("Found {} DSPF files under {}", files.len(), dir.display());
        Ok(Self::verify_files(&files, options))
    }

    /// Load, extract, write `output_<design>.dspf` and verify it.
    pub fn run_flow(layout_path: &Path, options: FlowOptions) -> Result<FlowResult, PgrcError> {
        let layout = Self::load_layout(layout_path)?;

        let start = Instant::now();
        let extraction = Self::extract_layout(&layout, options.extract)?;
        let mut timings = FlowTimings {
            extract: start.elapsed(),
            ..Default::default()
        };
        tracing::info!("RC extraction took {:.2?}", timings.extract);

        std::fs::create_dir_all(&options.output_dir).map_err(|source| PgrcError::Io {
            path: options.output_dir.clone(),
            source,
        })?;
        let design = options
            .writer
            .design_name
            .clone()
            .unwrap_or_else(|| extraction.design.clone());
        let dspf = options.output_dir.join(dspf_file_name(&design));

        let start = Instant::now();
        Self::write_dspf(&extraction, &dspf, options.writer)?;
        timings.write = start.elapsed();
        tracing::info!("DSPF write took {:.2?}", timings.write);

        let verification = if options.verify_output {
            let start = Instant::now();
            let report = Self::verify_file(&dspf, options.verify)?;
            let elapsed = start.elapsed();
            tracing::info!("DSPF verification took {:.2?}", elapsed);
            timings.verify = Some(elapsed);
            Some(report)
        } else {
            None
        };

        Ok(FlowResult {
            dspf,
            extraction: extraction.stats(),
            verification,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_dspf_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dspf"), ".ENDS\n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.SPF"), ".ENDS\n").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden").join("c.dspf"), ".ENDS\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_dspf_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.dspf"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = PgrcCore::load_layout(Path::new("/nonexistent/layout.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/layout.json"));
    }

    #[test]
    fn test_verify_files_continues_after_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.dspf");
        let good = dir.path().join("good.dspf");
        std::fs::write(&bad, "*|NET VDD 0PF\n").unwrap();
        std::fs::write(&good, ".SUBCKT TOP VDD\n*|NET VDD 0PF\n.ENDS\n").unwrap();

        let results = PgrcCore::verify_files(&[bad, good], VerifyOptions::default());
        assert!(results[0].1.is_err());
        assert!(results[1].1.as_ref().unwrap().passed());
    }
}
