//! shardscan CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser as ClapParser, Subcommand};

use shardscan_scan::{process_jobs, ParserRegistry, ScanConfig, UnpackDirectory};

/// shardscan - recursive binary-analysis scan engine
#[derive(ClapParser)]
#[command(name = "shardscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the classification cascade over a file and print the resulting
    /// unpack tree
    Scan(ScanArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Input file to scan
    path: PathBuf,

    /// Directory carved children and info records are written under
    /// (defaults to the input file's parent directory)
    #[arg(long)]
    unpack_root: Option<PathBuf>,

    /// Number of worker threads (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    shardscan_scan::logging::init_default();
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => cmd_scan(args),
    }
}

fn cmd_scan(args: ScanArgs) -> anyhow::Result<()> {
    let abs_path = args
        .path
        .canonicalize()
        .with_context(|| format!("could not resolve input path {:?}", args.path))?;

    let unpack_root = match args.unpack_root {
        Some(root) => root,
        None => abs_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let rel_path = abs_path
        .strip_prefix(&unpack_root)
        .with_context(|| format!("{abs_path:?} is not under unpack root {unpack_root:?}"))?
        .to_path_buf();

    let mut config = ScanConfig::new(unpack_root);
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }

    let registry = Arc::new(ParserRegistry::new());
    let roots = process_jobs(registry, &config, vec![rel_path])?;

    let trees: Vec<_> = roots.iter().map(tree_to_json).collect();
    println!("{}", serde_json::to_string_pretty(&trees)?);

    Ok(())
}

fn tree_to_json(ud: &UnpackDirectory) -> serde_json::Value {
    serde_json::json!({
        "path": ud.file_path,
        "size": ud.size,
        "scanned": ud.is_scanned(),
        "info": ud.info,
        "children": ud.extracted_files.iter().map(tree_to_json).collect::<Vec<_>>(),
    })
}
