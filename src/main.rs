//! dropfix CLI
//!
//! Corrects dropouts in a TBC capture, optionally using other captures of
//! the same disc as replacement sources.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use dropfix_lib::pool::{default_threads, CorrectorConfig, CorrectorPool, FrameSource, TbcWriter};
use dropfix_lib::tbc::TbcSource;
use dropfix_lib::{init, Config};

#[derive(Parser)]
#[command(name = "dropfix")]
#[command(about = "Multi-source dropout correction for TBC captures", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Reverse the field order of every source
    #[arg(short, long)]
    reverse: bool,

    /// Widen every dropout before correcting it
    #[arg(short, long)]
    over_correct: bool,

    /// Only take replacements from the dropout's own field
    #[arg(short, long)]
    intra: bool,

    /// Number of worker threads (default: available cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Input TBC files (the first is corrected) followed by the output TBC ('-' for stdout)
    #[arg(required = true, num_args = 2..)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init(Config {
        verbose: cli.verbose,
        debug: cli.debug,
    })?;

    info!("dropfix v{}", dropfix_lib::VERSION);

    let Some((output, inputs)) = cli.files.split_last() else {
        bail!("An input and an output file are required");
    };
    check_paths(inputs, output)?;

    let mut sources: Vec<Box<dyn FrameSource>> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let source = TbcSource::open(input)
            .with_context(|| format!("Failed to open input {}", input.display()))?;
        sources.push(Box::new(source));
    }

    let config = CorrectorConfig::new()
        .with_reverse(cli.reverse)
        .with_intra_field(cli.intra)
        .with_over_correct(cli.over_correct)
        .with_threads(cli.threads.unwrap_or_else(default_threads));

    let writer: Box<dyn Write + Send> = if is_stdout(output) {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(output)
            .with_context(|| format!("Failed to create output {}", output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let pool = CorrectorPool::new(sources, TbcWriter::new(writer), config)?;
    let report = pool.process().context("Dropout correction failed")?;

    if !is_stdout(output) {
        copy_metadata(&inputs[0], output)?;
    }

    info!(
        "Wrote {} frames, {} dropouts left uncorrected",
        report.frames_written, report.uncorrected
    );
    Ok(())
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn check_paths(inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    if inputs.is_empty() {
        bail!("At least one input file is required");
    }
    for input in inputs {
        if is_stdout(input) {
            bail!("Inputs must be files; '-' is only valid as the output");
        }
        if input == output {
            bail!("Input {} is also the output file", input.display());
        }
    }
    Ok(())
}

/// The corrected file keeps the field layout of the primary input
fn copy_metadata(input: &Path, output: &Path) -> anyhow::Result<()> {
    let from = dropfix_lib::tbc::metadata_path(input);
    let to = dropfix_lib::tbc::metadata_path(output);
    fs::copy(&from, &to)
        .with_context(|| format!("Failed to copy metadata to {}", to.display()))?;
    Ok(())
}
