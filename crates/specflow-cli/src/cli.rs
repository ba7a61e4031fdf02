//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "specflow",
    version,
    about = "File-based coordination for specification-driven pipelines"
)]
pub struct Cli {
    /// Directory holding specification documents.
    #[arg(long, global = true, default_value = "specs")]
    pub spec_dir: PathBuf,

    /// Directory holding status records.
    #[arg(long, global = true, default_value = "state")]
    pub state_dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log errors only.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored specifications of one kind.
    List {
        /// Specification kind: source or derived.
        #[arg(long, default_value = "source")]
        kind: String,
    },

    /// Print one stored specification as JSON.
    Show {
        /// Document name.
        name: String,
        #[arg(long, default_value = "source")]
        kind: String,
    },

    /// Validate and save a specification from a YAML file.
    Save {
        /// Document name; must match the name inside the file.
        name: String,
        #[arg(long, default_value = "source")]
        kind: String,
        /// YAML file to read the document from.
        #[arg(long)]
        file: PathBuf,
        /// Replace an existing document of the same name.
        #[arg(long)]
        force: bool,
    },

    /// Validate a stored document by name, or a YAML file.
    Validate {
        /// Stored document name (omit when passing --file).
        name: Option<String>,
        #[arg(long, default_value = "source")]
        kind: String,
        /// Validate this file instead of a stored document.
        #[arg(long, conflicts_with = "name")]
        file: Option<PathBuf>,
    },

    /// Print the JSON schema for a specification kind.
    Schema {
        #[arg(long, default_value = "source")]
        kind: String,
    },

    /// Delete a stored specification.
    Delete {
        name: String,
        #[arg(long, default_value = "source")]
        kind: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// List status records, optionally filtered by subject prefix.
    Status {
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Announce intent to start a unit of work.
    Begin {
        /// Subject to create a record for.
        subject: String,
        /// Input file the work depends on (repeatable).
        #[arg(long = "input")]
        inputs: Vec<String>,
        /// Downstream subject that becomes eligible on completion
        /// (repeatable).
        #[arg(long = "next")]
        next: Vec<String>,
        /// Create the record directly in in_progress.
        #[arg(long)]
        active: bool,
    },

    /// Update a subject's status record.
    Update {
        subject: String,
        /// New status: pending, in_progress, completed, or failed.
        #[arg(long)]
        status: String,
        /// Output file produced (repeatable; replaces the stored list).
        #[arg(long = "output")]
        outputs: Vec<String>,
        /// Error message (repeatable; replaces the stored list).
        #[arg(long = "error")]
        errors: Vec<String>,
        /// Downstream subject that becomes eligible on completion
        /// (repeatable; replaces the stored list).
        #[arg(long = "next")]
        next: Vec<String>,
    },

    /// Reset a subject's record to pending.
    Reset { subject: String },

    /// Report which subjects of a derived specification can start now.
    Ready {
        /// Derived specification name.
        #[arg(long)]
        name: String,
    },

    /// Scan for stale, corrupt, or inconsistent records; repair with --apply.
    Recover {
        /// Staleness threshold in seconds.
        #[arg(long)]
        threshold: Option<i64>,
        /// Repair the anomalies instead of only reporting them.
        #[arg(long)]
        apply: bool,
    },

    /// Poll a directory once and report file changes since the cursor.
    Watch {
        /// Directory to observe.
        dir: PathBuf,
        /// Resume cursor: only report files modified after this RFC 3339
        /// timestamp.
        #[arg(long)]
        since: Option<String>,
    },

    /// Write the aggregate workflow snapshot.
    Snapshot,
}
