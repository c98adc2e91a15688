//! DSPF serialization
//!
//! [`DspfWriter`] turns an [`Extraction`](crate::extract::Extraction) into
//! deterministic DSPF text; [`DspfParser`] reads that text back for the
//! verifier.

pub mod naming;
pub mod parser;
pub mod writer;

pub use naming::{coordinate_name, decode_coordinate_name, SpatialKey};
pub use parser::{DspfParseError, DspfParser, InstanceConnection, ParsedDspf, ParsedNet};
pub use writer::{DspfWriter, WriterOptions, INSTANCE_MASTER};
