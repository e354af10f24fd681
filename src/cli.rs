use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opds-fulfill")]
#[command(about = "Inspect and run OPDS acquisition fulfillment", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every acquisition path and whether this build accepts it
    Paths(PathsArgs),
    /// Fulfill a book with the built-in subtasks
    Fulfill(FulfillArgs),
}

#[derive(clap::Args, Debug)]
pub struct PathsArgs {
    /// JSON file with one acquisition or an array of acquisitions
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct FulfillArgs {
    /// JSON file with one acquisition or an array of acquisitions
    pub file: PathBuf,

    /// Identifier of the book being fulfilled
    #[arg(long)]
    pub book_id: String,

    /// Account identifier passed to subtasks
    #[arg(long, default_value = "anonymous")]
    pub account: String,

    /// Overrides fulfillment.work_dir from the configuration
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}
