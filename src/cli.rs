//! Command-line interface for ustar

use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ustar")]
#[command(about = "ustar - create, update, list and extract USTAR archives", long_about = None)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["create", "append", "list", "update", "extract"]),
))]
pub struct Cli {
    /// Create a new archive
    #[arg(short = 'c')]
    pub create: bool,

    /// Append files to the end of an existing archive
    #[arg(short = 'a')]
    pub append: bool,

    /// List the names stored in an archive
    #[arg(short = 't')]
    pub list: bool,

    /// Append new copies of files that are already in the archive
    #[arg(short = 'u')]
    pub update: bool,

    /// Extract every file from an archive
    #[arg(short = 'x')]
    pub extract: bool,

    /// Archive file
    #[arg(short = 'f', value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Extract beneath DIR instead of at the stored names
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Check every header checksum while reading
    #[arg(long)]
    pub verify: bool,

    /// Owner name stored in new headers instead of the resolved one
    #[arg(long, value_name = "NAME")]
    pub owner: Option<String>,

    /// Group name stored in new headers instead of the resolved one
    #[arg(long, value_name = "NAME")]
    pub group: Option<String>,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Files to archive
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Append,
    List,
    Update,
    Extract,
}

impl Cli {
    pub fn operation(&self) -> Operation {
        if self.create {
            Operation::Create
        } else if self.append {
            Operation::Append
        } else if self.list {
            Operation::List
        } else if self.update {
            Operation::Update
        } else {
            Operation::Extract
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
