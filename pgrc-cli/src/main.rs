//! pgrc CLI - power-grid RC extraction and DSPF verification from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pgrc::{
    dspf_file_name, ExtractOptions, ExtractStats, FlowOptions, PgrcCore, PgrcError,
    VerificationReport, VerifyOptions, WriterOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgrc")]
#[command(about = "Power-grid RC extraction and DSPF open/short verification", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a JSON layout and write a DSPF file
    Extract {
        /// Path to the JSON layout file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Output file (default: reports/output_<design>.dspf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Output format for the summary
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Check DSPF files for opens and shorts
    Verify {
        /// DSPF files or directories to search
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        verify: VerifyArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Extract, write and verify in one go
    Run {
        /// Path to the JSON layout file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Directory for the DSPF output
        #[arg(long, value_name = "DIR", default_value = "reports")]
        out_dir: PathBuf,

        /// Write the DSPF without verifying it
        #[arg(long)]
        no_verify: bool,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        verify: VerifyArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Longest wire a single resistor may stand for, in microns
    #[arg(long, value_name = "UM", default_value_t = 20.0)]
    max_segment_um: f64,

    /// Subcircuit name (default: the layout's design name)
    #[arg(long)]
    design: Option<String>,

    /// Ground net written on capacitors
    #[arg(long, default_value = "VSS")]
    ground_net: String,

    /// Run single-threaded
    #[arg(long)]
    serial: bool,
}

impl ExtractArgs {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_segment_um: self.max_segment_um,
            parallel: !self.serial,
            ..Default::default()
        }
    }

    fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            design_name: self.design.clone(),
            ground_net: self.ground_net.clone(),
            parallel: !self.serial,
        }
    }
}

#[derive(clap::Args)]
struct VerifyArgs {
    /// Skip the connectivity (open) check
    #[arg(long)]
    skip_opens: bool,

    /// Skip files larger than this many MB (0 checks everything)
    #[arg(long, value_name = "MB", default_value_t = 500)]
    max_check_mb: u64,
}

impl VerifyArgs {
    fn options(&self, parallel: bool) -> VerifyOptions {
        VerifyOptions {
            check_opens: !self.skip_opens,
            max_file_bytes: (self.max_check_mb > 0).then(|| self.max_check_mb * 1024 * 1024),
            parallel,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("pgrc-cli {}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Extract {
            layout,
            output,
            extract,
            format,
        } => handle_extract(&layout, output, &extract, &format),
        Commands::Verify {
            paths,
            verify,
            format,
        } => handle_verify(&paths, &verify, &format),
        Commands::Run {
            layout,
            out_dir,
            no_verify,
            extract,
            verify,
            format,
        } => handle_run(&layout, out_dir, no_verify, &extract, &verify, &format),
    };

    let exit_code = match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_extract(
    layout_path: &Path,
    output: Option<PathBuf>,
    args: &ExtractArgs,
    format: &OutputFormat,
) -> Result<bool> {
    let layout = PgrcCore::load_layout(layout_path)?;
    let extraction = PgrcCore::extract_layout(&layout, args.extract_options())
        .with_context(|| format!("extracting {}", layout_path.display()))?;

    let output = match output {
        Some(path) => path,
        None => {
            let dir = PathBuf::from("reports");
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            let design = args.design.as_deref().unwrap_or(&extraction.design);
            dir.join(dspf_file_name(design))
        }
    };
    PgrcCore::write_dspf(&extraction, &output, args.writer_options())?;

    let stats = extraction.stats();
    match format {
        OutputFormat::Human => {
            println!("Wrote {}", output.display());
            print_extract_stats(&stats);
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "dspf": output.display().to_string(),
                "extraction": stats,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(true)
}

fn handle_verify(paths: &[PathBuf], args: &VerifyArgs, format: &OutputFormat) -> Result<bool> {
    let options = args.options(true);
    let mut results: Vec<(PathBuf, Result<VerificationReport, PgrcError>)> = Vec::new();
    for path in paths {
        if path.is_dir() {
            results.extend(PgrcCore::verify_directory(path, options.clone())?);
        } else {
            results.extend(PgrcCore::verify_files(&[path.clone()], options.clone()));
        }
    }

    if results.is_empty() {
        anyhow::bail!("no DSPF files found");
    }

    let passed = results
        .iter()
        .all(|(_, r)| r.as_ref().map_or(false, |report| !report.failed()));
    match format {
        OutputFormat::Human => output_human(&results),
        OutputFormat::Json => output_json(&results)?,
    }
    Ok(passed)
}

fn handle_run(
    layout: &Path,
    out_dir: PathBuf,
    no_verify: bool,
    extract: &ExtractArgs,
    verify: &VerifyArgs,
    format: &OutputFormat,
) -> Result<bool> {
    let options = FlowOptions {
        extract: extract.extract_options(),
        writer: extract.writer_options(),
        verify: verify.options(!extract.serial),
        output_dir: out_dir,
        verify_output: !no_verify,
    };
    let result = PgrcCore::run_flow(layout, options)
        .with_context(|| format!("running flow for {}", layout.display()))?;

    match format {
        OutputFormat::Human => {
            println!("Wrote {}", result.dspf.display());
            print_extract_stats(&result.extraction);
            println!(
                "  Time:        extract {:.2?}, write {:.2?}",
                result.timings.extract, result.timings.write
            );
            if let Some(report) = &result.verification {
                println!();
                print!("{}", report.render_human());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "dspf": result.dspf.display().to_string(),
                "extraction": result.extraction,
                "verification": result.verification,
                "passed": result.passed(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(result.passed())
}

fn print_extract_stats(stats: &ExtractStats) {
    println!("  Nets:        {}", stats.nets);
    println!("  Nodes:       {}", stats.nodes);
    println!("  Resistors:   {}", stats.resistors);
    println!("  Capacitors:  {}", stats.capacitors);
    println!("  Pins/ports:  {}/{}", stats.instance_pins, stats.ports);
    if stats.unbound_contacts > 0 || stats.rename_conflicts > 0 {
        println!(
            "  Unbound contacts: {}, rename conflicts: {}",
            stats.unbound_contacts, stats.rename_conflicts
        );
    }
    if stats.warnings.total() > 0 {
        println!(
            "  Warnings: {} degenerate widths, {} zero-length wires, {} dangling vias",
            stats.warnings.degenerate_widths,
            stats.warnings.zero_length_wires,
            stats.warnings.dangling_vias
        );
    }
}

fn output_human(results: &[(PathBuf, Result<VerificationReport, PgrcError>)]) {
    for (path, result) in results {
        match result {
            Ok(report) => print!("{}", report.render_human()),
            Err(e) => println!("ERROR {}: {}", path.display(), e),
        }
        println!();
    }

    let failed = results
        .iter()
        .filter(|(_, r)| r.as_ref().map_or(true, |report| report.failed()))
        .count();
    println!("Summary: {} files, {} failed", results.len(), failed);
}

fn output_json(results: &[(PathBuf, Result<VerificationReport, PgrcError>)]) -> Result<()> {
    let output = serde_json::json!({
        "results": results.iter().map(|(path, result)| match result {
            Ok(report) => serde_json::json!({
                "file": path.display().to_string(),
                "report": report,
            }),
            Err(e) => serde_json::json!({
                "file": path.display().to_string(),
                "error": e.to_string(),
            }),
        }).collect::<Vec<_>>(),
        "summary": {
            "total_files": results.len(),
            "passed": results.iter().filter(|(_, r)| matches!(r, Ok(report) if report.passed())).count(),
            "failed": results.iter().filter(|(_, r)| r.as_ref().map_or(true, |report| report.failed())).count(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
