//! Simple flow example: extract a layout, write DSPF and verify it.

use pgrc::prelude::*;
use std::path::{Path, PathBuf};

fn main() -> Result<(), PgrcError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/grid_layout.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_flow [path/to/layout.json]");
        std::process::exit(1);
    }

    let options = FlowOptions {
        output_dir: PathBuf::from("reports"),
        ..Default::default()
    };
    let result = PgrcCore::run_flow(path, options)?;

    println!("Wrote {}", result.dspf.display());
    println!(
        "{} nets, {} nodes, {} resistors, {} capacitors",
        result.extraction.nets,
        result.extraction.nodes,
        result.extraction.resistors,
        result.extraction.capacitors
    );

    if let Some(report) = &result.verification {
        println!();
        print!("{}", report.render_human());
    }

    if !result.passed() {
        std::process::exit(1);
    }
    Ok(())
}
