use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docrag_cli::{ingest, init_tracing, query, serve, split_file};
use docrag_core::config::Config;
use docrag_core::types::Chunk;

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Split Markdown documents into retrieval chunks and serve them")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (default: current directory)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split one Markdown file and print the chunk dump
    Split {
        file: PathBuf,

        /// Title of the leading segment (default: file stem)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Split all configured sources and write them to the store
    Ingest {
        /// Stop after this many documents
        #[arg(short, long)]
        limit: Option<usize>,

        /// Documents split in parallel
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
    },

    /// Query the store
    Query {
        text: String,

        #[arg(short, long)]
        project: Option<String>,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// Run the retrieval gateway
    Serve,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config_dir {
        Some(dir) => Config::load_from(dir)?,
        None => Config::load()?,
    };
    let settings = config.settings()?;

    match cli.command {
        Commands::Split { file, title } => {
            let chunks = split_file(&settings, &file, title.as_deref())?;
            print!("{}", Chunk::dump(&chunks));
        }
        Commands::Ingest { limit, workers } => {
            let report = ingest(&config, &settings, limit, workers)?;
            println!("ingested {} documents ({} chunks), {} failed", report.documents, report.chunks, report.failed);
        }
        Commands::Query { text, project, top_k } => {
            let results = query(&config, &settings, &text, project, top_k)?;
            for (rank, r) in results.iter().enumerate() {
                println!("----- #{} {:.4} {} / {} -----", rank + 1, r.score, r.doc_project, r.title);
                println!("{}", r.body.trim_end());
            }
            if results.is_empty() {
                println!("no results");
            }
        }
        Commands::Serve => serve(&config, &settings)?,
    }
    Ok(())
}
