use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sprig", about = concat!("sprig v", env!("CARGO_PKG_VERSION"), " - a hierarchical to-do list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Run against a different data directory
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    Add(AddArgs),
    /// List tasks as a tree
    List,
    /// Toggle a task's completion (cascades to parents/children)
    Toggle(IdArg),
    /// Delete a task and its subtasks
    Delete(IdArg),
    /// Change a task's text
    Edit(EditArgs),
    /// Set or clear a task's deadline
    Deadline(DeadlineArgs),
    /// Move old completed tasks into the archive now
    Archive,
    /// Show archived tasks
    Archived,
    /// Clear the archive
    ClearArchive,
    /// Export all tasks to a backup file
    Export(ExportArgs),
    /// Import tasks from a backup file (replaces current data)
    Import(ImportArgs),
    /// Show or change settings
    Settings(SettingsArgs),
    /// Show sync and connection state
    Status,
    /// Store the remote store's connection settings
    Remote(RemoteArgs),
    /// Connect to the remote store and run a sync
    Sync,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Parent task id (or unique prefix)
    #[arg(long)]
    pub parent: Option<String>,
    /// Deadline: RFC 3339, or YYYY-MM-DD for end of that day
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// Task id (or unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id (or unique prefix)
    pub id: String,
    /// New task text
    pub text: String,
}

#[derive(Args)]
pub struct DeadlineArgs {
    /// Task id (or unique prefix)
    pub id: String,
    /// Deadline: RFC 3339, or YYYY-MM-DD; omit to clear
    pub when: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Target file, or a directory for a timestamped default name
    pub path: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Backup file to import
    pub path: String,
}

#[derive(Args)]
pub struct RemoteArgs {
    #[arg(long)]
    pub host: String,
    #[arg(long, default_value_t = 3306)]
    pub port: u16,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub database: String,
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Days a completed task ages before archival
    #[arg(long)]
    pub archive_days: Option<u32>,
    /// Auto-sync interval: <N>m, <N>h, or 0 to disable
    #[arg(long)]
    pub auto_sync: Option<String>,
}
