// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Workbench
//!
//! Poke at the containers from the command line: watch a vector grow and spill, load a file the
//! way the renderer loads shaders, or try a format string.
//!
//! ## Usage
//!
//! ```text
//! workbench growth --pushes 20 --inline 4
//! workbench read shaders/tri.spv --align 16
//! workbench format "% of %" 3 60
//! ```
//!
//! (Try --help)

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use keel_lib::{
    self as keel,
    config::Config,
    console, file,
    prelude::*,
    vector::{StorageMode, Tracked},
};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(about = "Inspect SboVector growth, file loading and wide string formatting.", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// TOML file with `[log]` and `[workbench]` tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, thiserror::Error)]
enum WorkbenchError {
    #[error("Unhandled error: {0}")]
    Unhandled(#[from] keel::KeelError),
}

impl From<VectorError> for WorkbenchError {
    fn from(e: VectorError) -> Self {
        WorkbenchError::Unhandled(e.into())
    }
}

fn main() -> Result<(), WorkbenchError> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).map_err(keel::KeelError::from)?;
    console::init(config.log_level);

    match args.command {
        None => unreachable!(),
        Some(Command::Growth(a)) => cmd_growth(a, &config)?,
        Some(Command::Read(a)) => cmd_read(a, &config)?,
        Some(Command::Format(a)) => cmd_format(a)?,
    }

    Ok(())
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push elements and report capacity, storage mode and live heap blocks
    Growth(GrowthArgs),
    /// Read a file into a vector and pad it to a block size
    Read(ReadArgs),
    /// Format a wide string with `%` placeholders
    Format(FormatArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum InlineChoice {
    /// No inline storage
    #[value(name = "0")]
    Zero,
    #[value(name = "4")]
    Four,
    /// The default threshold
    #[value(name = "16")]
    Sixteen,
}

#[derive(clap::Args, Debug)]
struct GrowthArgs {
    /// Number of pushes, defaults to the config value
    #[arg(long)]
    pushes: Option<usize>,
    /// Inline threshold
    #[arg(long, value_enum, default_value = "16")]
    inline: InlineChoice,
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    path: PathBuf,
    /// Block size in bytes, defaults to the config value
    #[arg(long)]
    align: Option<usize>,
    /// Also decode as native-endian words
    #[arg(long)]
    words: bool,
}

#[derive(clap::Args, Debug)]
struct FormatArgs {
    fmt: String,
    args: Vec<String>,
}

fn mode(m: StorageMode) -> &'static str {
    match m {
        StorageMode::Inline => "inline",
        StorageMode::Heap => "heap",
    }
}

fn cmd_growth(args: GrowthArgs, config: &Config) -> Result<(), WorkbenchError> {
    let pushes = args.pushes.unwrap_or(config.pushes);
    match args.inline {
        InlineChoice::Zero => growth::<0>(pushes),
        InlineChoice::Four => growth::<4>(pushes),
        InlineChoice::Sixteen => growth::<16>(pushes),
    }
}

fn growth<const N: usize>(pushes: usize) -> Result<(), WorkbenchError> {
    let alloc = Tracked::new();
    let mut v: SboVector<u64, N, Tracked> = SboVector::new_in(alloc.clone());

    println!("inline threshold {N}");
    println!("{:>6} {:>6} {:>8} {:>6}", "len", "cap", "mode", "live");
    for i in 0..pushes {
        v.push_back(i as u64)?;
        println!(
            "{:>6} {:>6} {:>8} {:>6}",
            v.len(),
            v.capacity(),
            mode(v.storage_mode()),
            alloc.stats().live()
        );
    }

    v.shrink()?;
    println!(
        "shrink {:>6} {:>8} {:>6}",
        v.capacity(),
        mode(v.storage_mode()),
        alloc.stats().live()
    );
    println!(
        "allocations {} reallocations {} releases {}",
        alloc.stats().allocations(),
        alloc.stats().reallocations(),
        alloc.stats().releases()
    );
    Ok(())
}

fn cmd_read(args: ReadArgs, config: &Config) -> Result<(), WorkbenchError> {
    let block = args.align.unwrap_or(config.align);
    if block == 0 {
        return Err(keel::KeelError::Config(keel::config::ConfigError::Invalid(
            "--align must be positive".into(),
        ))
        .into());
    }

    let mut bytes = file::read_all_bytes(&args.path).map_err(keel::KeelError::from)?;
    let read = bytes.len();
    bytes.align(block, 0)?;
    println!(
        "{}: {read} bytes, {} after aligning to {block}, capacity {} ({})",
        args.path.display(),
        bytes.len(),
        bytes.capacity(),
        mode(bytes.storage_mode())
    );

    if args.words {
        let words = file::read_words(&args.path).map_err(keel::KeelError::from)?;
        print!("{} words:", words.len());
        for w in words.iter().take(8) {
            print!(" {w:08x}");
        }
        if words.len() > 8 {
            print!(" ...");
        }
        println!();
    }
    Ok(())
}

fn cmd_format(args: FormatArgs) -> Result<(), WorkbenchError> {
    let refs: Vec<&dyn AppendWide> = args.args.iter().map(|a| a as &dyn AppendWide).collect();
    let s = WideString::format(&args.fmt, &refs)?;
    println!("{s}");
    println!("{} units", s.length());
    Ok(())
}
