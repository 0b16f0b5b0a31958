//! Binary entry point for the gravel sharding CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gravel::{
    EmptyCodec, EmptyProcessor, F32Codec, F32Processor, Sharder, SharderConfig, U32Codec,
    U32Processor,
};

#[derive(Parser, Debug)]
#[command(
    name = "gravel",
    version,
    about = "Edge-list sharder for out-of-core graph engines",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shard a tab-separated edge list into the engine's on-disk layout.
    Shard(ShardCmd),
}

#[derive(clap::Args, Debug)]
struct ShardCmd {
    /// Input edge list; `-` reads standard input.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Base filename for every output artifact (defaults to the input path).
    #[arg(long, value_name = "BASE")]
    base: Option<String>,

    /// Number of shards to produce.
    #[arg(long, short = 's', value_name = "P")]
    shards: usize,

    /// Edge-value payload carried per edge.
    #[arg(long, value_enum, default_value_t = ValueTypeArg::None)]
    value_type: ValueTypeArg,

    /// Force the sparse degree-file format.
    #[arg(long)]
    sparse_degrees: bool,

    /// RAM budget for the degree accumulator, in bytes.
    #[arg(long, value_name = "BYTES")]
    memory_budget: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ValueTypeArg {
    None,
    F32,
    U32,
}

fn main() {
    install_tracing_subscriber();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        let mut cause = err.source();
        while let Some(inner) = cause {
            eprintln!("  caused by: {inner}");
            cause = inner.source();
        }
        std::process::exit(1);
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Shard(cmd) => run_shard(cmd),
    }
}

fn run_shard(cmd: ShardCmd) -> Result<(), Box<dyn Error>> {
    let base = match &cmd.base {
        Some(base) => base.clone(),
        None => cmd
            .input
            .to_str()
            .ok_or("input path is not valid UTF-8; pass --base")?
            .to_owned(),
    };

    let mut config = SharderConfig::default();
    config.force_sparse_degrees = cmd.sparse_degrees;
    if let Some(budget) = cmd.memory_budget {
        config.memory_budget = budget;
    }

    let input: Box<dyn BufRead> = if cmd.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&cmd.input)?))
    };

    match cmd.value_type {
        ValueTypeArg::None => {
            let sharder =
                Sharder::with_config(&base, cmd.shards, EmptyProcessor::default(), EmptyCodec, config)?;
            report(sharder.shard_from_reader(input)?.num_edges, &base);
        }
        ValueTypeArg::F32 => {
            let sharder =
                Sharder::with_config(&base, cmd.shards, F32Processor::default(), F32Codec, config)?;
            report(sharder.shard_from_reader(input)?.num_edges, &base);
        }
        ValueTypeArg::U32 => {
            let sharder =
                Sharder::with_config(&base, cmd.shards, U32Processor::default(), U32Codec, config)?;
            report(sharder.shard_from_reader(input)?.num_edges, &base);
        }
    }
    Ok(())
}

fn report(num_edges: u64, base: &str) {
    println!("Sharded {num_edges} edges under {base}");
}
