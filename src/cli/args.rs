use crate::access::Role;
use crate::filter::{PageSize, SearchField, StatusFilter};
use crate::receipt::PrintMode;
use crate::utils::config::BackendKind;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cert-registry")]
#[command(version = "1.0.0")]
#[command(about = "Track certificates and their delivery to receivers")]
#[command(long_about = None)]
pub struct Cli {
    /// Config file path (default: ~/.config/cert-registry/config.yaml)
    #[arg(long, env = "CERT_REGISTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage backend, overrides the config file
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Access role, overrides the config file
    #[arg(long)]
    pub role: Option<Role>,

    /// Enable verbose logging (repeat for more verbosity: -v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw tab-separated values (no formatting)
    #[arg(short, long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List certificates, filtered and paginated
    List {
        /// Case-insensitive search term
        #[arg(long, short = 's')]
        search: Option<String>,
        /// Field the search term applies to: all, no, description, part_no, serial_no
        #[arg(long, default_value = "all")]
        field: SearchField,
        /// Delivery status: all, pending, delivered
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Rows per page: 10, 25, 50, 100 or all (default from config)
        #[arg(long)]
        page_size: Option<PageSize>,
        /// Columns to display (comma-separated): id,no,description,part_no,serial_no,status,
        /// created,delivered,receiver,position,delivery_date. Use +column to append to defaults.
        #[arg(long)]
        columns: Option<String>,
    },
    /// Show total, delivered and pending counts
    Stats,
    /// Add a new certificate
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Edit a certificate's fields; delivery state is kept
    Edit {
        /// Certificate id
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete a certificate
    Delete {
        /// Certificate id
        id: String,
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Record delivery of one or more certificates
    Deliver {
        /// Certificate ids (one id is a single delivery, more is a bulk delivery)
        ids: Vec<String>,
        /// Select every pending certificate instead of listing ids
        #[arg(long, conflicts_with = "ids")]
        all_pending: bool,
        #[command(flatten)]
        receiver: ReceiverArgs,
    },
    /// Mark a delivered certificate as pending again
    UndoDelivery {
        /// Certificate id
        id: String,
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Import certificates from a CSV file
    Import {
        /// CSV file path
        file: PathBuf,
    },
    /// Export certificates to CSV (all when no ids are given)
    Export {
        /// Certificate ids to export
        ids: Vec<String>,
        /// Output directory (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Write an empty import template
    Template {
        /// Output directory (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Render delivery receipts for printing
    Print {
        /// Certificate ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Receipt layout: single, separate, combined
        #[arg(long, default_value = "combined")]
        mode: PrintMode,
    },
    /// Generate shell completion scripts
    Completion {
        #[command(subcommand)]
        command: CompletionCommands,
    },
    /// Internal completion helpers (hidden)
    #[command(hide = true)]
    CompletionHelper {
        #[command(subcommand)]
        command: CompletionHelperCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct FieldArgs {
    /// Certificate number
    #[arg(long)]
    pub no: String,
    #[arg(long)]
    pub description: String,
    #[arg(long, default_value = "")]
    pub part_no: String,
    #[arg(long, default_value = "")]
    pub serial_no: String,
    /// Free-text status (default: New)
    #[arg(long, default_value = "")]
    pub status: String,
}

/// Fields left out keep their current value
#[derive(clap::Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(long)]
    pub no: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub part_no: Option<String>,
    #[arg(long)]
    pub serial_no: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReceiverArgs {
    /// Name of the person receiving the certificates
    #[arg(long)]
    pub receiver_name: String,
    #[arg(long, default_value = "")]
    pub position: String,
    #[arg(long, default_value = "")]
    pub signature: String,
    /// Delivery date, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Subcommand)]
pub enum CompletionCommands {
    /// Generate bash completion script
    Bash,
    /// Generate zsh completion script
    Zsh,
    /// Generate fish completion script
    Fish,
    /// Generate PowerShell completion script
    PowerShell,
}

impl CompletionCommands {
    pub fn shell(&self) -> Shell {
        match self {
            CompletionCommands::Bash => Shell::Bash,
            CompletionCommands::Zsh => Shell::Zsh,
            CompletionCommands::Fish => Shell::Fish,
            CompletionCommands::PowerShell => Shell::PowerShell,
        }
    }
}

#[derive(Subcommand)]
pub enum CompletionHelperCommands {
    /// List certificate ids for completion
    Ids,
    /// List column names for completion
    Columns,
}
