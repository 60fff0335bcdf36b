use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "relbatch", version)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send the operations in a JSON file to the authorization service.
    Write(WriteArgs),
    /// Show how a JSON file would be deduplicated and chunked.
    Plan {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub store_id: Option<String>,

    #[arg(long)]
    pub model_id: Option<String>,

    #[arg(long, conflicts_with = "non_transactional")]
    pub transactional: bool,

    #[arg(long)]
    pub non_transactional: bool,

    #[arg(long)]
    pub stop_on_first_error: bool,

    /// Run against an in-memory store instead of the configured endpoint.
    #[arg(long)]
    pub dry_run: bool,
}

impl WriteArgs {
    /// `None` when neither mode flag was given.
    pub fn transactional_override(&self) -> Option<bool> {
        if self.transactional {
            Some(true)
        } else if self.non_transactional {
            Some(false)
        } else {
            None
        }
    }
}
