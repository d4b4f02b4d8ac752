//! rdfcon CLI - convert delimited tabular data to RDF
//!
//! Reads a YAML conversion specification (following its imports), converts
//! the input file it names and writes Turtle or TriG next to it.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use rdfcon::{logging, ConvertOptions, Converter};

#[derive(Parser)]
#[command(name = "rdfcon")]
#[command(
    version,
    about = "Convert delimited tabular data to RDF using YAML conversion specifications",
    long_about = None
)]
struct Cli {
    /// Path to the conversion specification
    spec: PathBuf,

    /// Only convert the first N records
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Output directory (overrides RDFCON_OUTDIR and the specification's outdir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open the specification editor
    #[arg(long)]
    ui: bool,

    /// Increase verbosity (-v debug, -vv trace, -vvv also prints the merged specification)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.ui {
        return Err("the specification editor is not available in this build".into());
    }

    let converter = logging::scoped(cli.verbose, || Converter::from_spec_file(&cli.spec))?;

    let log_path = converter.log_path(cli.output.as_deref());
    let log_file = logging::open_log_file(&log_path)
        .map_err(|e| format!("cannot create log file {}: {}", log_path.display(), e))?;
    logging::init(cli.verbose, Some(log_file));
    tracing::debug!("Logging warnings to {}", log_path.display());

    if cli.verbose >= 3 {
        print!("{}", converter.spec().to_yaml()?);
    }

    let options = ConvertOptions {
        limit: cli.limit,
        output_dir: cli.output,
    };
    let summary = converter.run(&options)?;

    for chunk in &summary.chunks {
        println!("{}", chunk.path.display());
    }
    Ok(())
}
