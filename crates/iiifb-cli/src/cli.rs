use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "iiifb", about = "Preservation-to-IIIF manifest ingest worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow the activity stream and publish manifests until signalled.
    Run,
    /// Apply the job-store schema and exit.
    Migrate,
}
