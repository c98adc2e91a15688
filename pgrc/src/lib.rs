//! pgrc - power-grid RC extraction library
//!
//! Turns power/ground net geometry into a resistor/capacitor network, writes it
//! as a DSPF parasitic netlist and checks the written file for opens (floating
//! instance pins) and shorts (points claimed by two nets).
//!
//! # Quick Start
//!
//! ```no_run
//! use pgrc::{FlowOptions, PgrcCore};
//! use std::path::Path;
//!
//! let result = PgrcCore::run_flow(Path::new("layout.json"), FlowOptions::default()).unwrap();
//! println!("wrote {}", result.dspf.display());
//!
//! if let Some(report) = &result.verification {
//!     print!("{}", report.render_human());
//! }
//! ```
//!
//! # Features
//!
//! - **Extraction**: wire fracturing at contacts and a maximum segment length,
//!   via cut resistors, lumped area capacitance, pin/port renaming
//! - **DSPF output**: deterministic, buffered, rendered per net in parallel
//! - **Verification**: BFS connectivity from ports, coordinate-based short
//!   detection, human and JSON reports

pub mod core;
pub mod dspf;
pub mod extract;
pub mod layout;
pub mod tech;
pub mod verify;

// Re-export main types
pub use core::{
    discover_dspf_files, dspf_file_name, FlowOptions, FlowResult, FlowTimings, PgrcCore, PgrcError,
};
pub use dspf::{DspfParseError, DspfParser, DspfWriter, ParsedDspf, WriterOptions};
pub use extract::{ExtractOptions, ExtractStats, Extraction, Extractor, NetGraph};
pub use layout::{Layout, NetGeometry, Orientation};
pub use tech::{TechConfig, Technology};
pub use verify::{VerificationReport, VerificationStatus, Verifier, VerifyOptions};

/// Load and extract a layout file with default options (convenience wrapper).
pub fn extract_file(path: &std::path::Path) -> Result<Extraction, PgrcError> {
    let layout = PgrcCore::load_layout(path)?;
    PgrcCore::extract_layout(&layout, ExtractOptions::default())
}

/// Verify a DSPF file with default options (convenience wrapper).
pub fn verify_file(path: &std::path::Path) -> Result<VerificationReport, PgrcError> {
    PgrcCore::verify_file(path, VerifyOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ExtractOptions, Extraction, FlowOptions, FlowResult, Layout, PgrcCore, PgrcError,
        VerificationReport, VerifyOptions, WriterOptions,
    };
}
