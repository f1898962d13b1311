use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Decompile compiled scripts, or re-format source text.
#[derive(Parser)]
#[command(name = "ember", version)]
struct Args {
    /// Input file: compiled bytecode, or source text with --format.
    input: PathBuf,

    /// Output file; stdout when omitted.
    output: Option<PathBuf>,

    /// Treat the input as source text and pretty-print it.
    #[arg(long)]
    format: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let text = if args.format {
        ember::format(&data).context("failed to format source")?
    } else {
        ember::decompile(&data).context("failed to decompile bytecode")?
    };

    match &args.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", text),
    }

    Ok(())
}
