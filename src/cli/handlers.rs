use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::app::Session;
use crate::cli::commands::{Cli, Commands};
use crate::io::file_store::JsonFileStore;
use crate::io::journal::Journal;
use crate::model::todo::{Todo, TodoList, TreeNode};
use crate::ops::cascade::DeleteOutcome;
use crate::ops::transfer::{self, ImportOutcome};
use crate::port::{Confirmer, Decision, RemoteConfig, SyncTransport, TransportError};
use crate::sync::{ConnectionStatus, SyncStatus};
use crate::util::time::{Urgency, classify_deadline, parse_deadline};

/// Terminal confirmation prompt. `--yes` answers everything
/// affirmatively, for scripts.
pub struct StdinConfirmer {
    pub assume_yes: bool,
}

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, message: &str) -> Decision {
        if self.assume_yes {
            return Decision::Confirmed;
        }
        eprint!("{message} [y/N] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => Decision::Cancelled,
            Ok(_) => {
                let answer = line.trim().to_ascii_lowercase();
                if answer == "y" || answer == "yes" {
                    Decision::Confirmed
                } else {
                    Decision::Declined
                }
            }
        }
    }
}

/// Placeholder transport for builds without a remote driver. Reaching
/// for the remote reports an explanatory failure; with no stored
/// configuration the coordinator never gets this far.
pub struct NoRemote;

impl SyncTransport for NoRemote {
    fn test_connection(&mut self, _config: &RemoteConfig) -> Result<bool, TransportError> {
        Err(TransportError(
            "no remote transport is built into this binary".into(),
        ))
    }

    fn connect(&mut self, _config: &RemoteConfig) -> Result<(), TransportError> {
        Err(TransportError(
            "no remote transport is built into this binary".into(),
        ))
    }

    fn ensure_schema(&mut self) -> Result<String, TransportError> {
        Err(TransportError(
            "no remote transport is built into this binary".into(),
        ))
    }

    fn run_sync(&mut self) -> Result<crate::port::SyncReport, TransportError> {
        Err(TransportError(
            "no remote transport is built into this binary".into(),
        ))
    }
}

type CliSession = Session<JsonFileStore, StdinConfirmer, NoRemote>;

/// Entry point for all commands.
pub fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let data_dir = match &cli.data_dir {
        Some(dir) => PathBuf::from(dir),
        None => JsonFileStore::default_dir()?,
    };
    let store = JsonFileStore::new(&data_dir);
    let journal = Journal::new(&data_dir);
    let confirmer = StdinConfirmer {
        assume_yes: cli.yes,
    };
    let mut session = Session::new(store, confirmer, NoRemote).with_journal(journal);
    session.load();

    let result = run_command(&mut session, &cli, &data_dir);

    // Mutation commands leave a debounced save pending; flush it.
    session.shutdown();
    if let Some(error) = session.last_error() {
        return Err(error.to_string().into());
    }
    result
}

fn run_command(
    session: &mut CliSession,
    cli: &Cli,
    data_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Commands::Add(args) => {
            let deadline = args
                .deadline
                .as_deref()
                .map(|s| parse_deadline(s).ok_or(format!("invalid deadline: {s}")))
                .transpose()?;
            let parent = args
                .parent
                .as_deref()
                .map(|p| resolve_id(session.todos(), p))
                .transpose()?;
            let id = session.add(&args.text, parent.as_deref(), deadline)?;
            println!("added {id}");
        }
        Commands::List => {
            if cli.json {
                let tree = session.todos().tree();
                let nodes: Vec<TaskJson<'_>> = tree.iter().map(TaskJson::from_node).collect();
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else if session.todos().data.is_empty() {
                println!("no tasks");
            } else {
                let mut out = String::new();
                for node in session.todos().tree() {
                    render_node(&node, 0, &mut out);
                }
                print!("{out}");
            }
        }
        Commands::Toggle(args) => {
            let id = resolve_id(session.todos(), &args.id)?;
            session.toggle(&id)?;
            let state = if session.todos().find(&id).is_some_and(|t| t.completed) {
                "done"
            } else {
                "not done"
            };
            println!("{id} is now {state}");
        }
        Commands::Delete(args) => {
            let id = resolve_id(session.todos(), &args.id)?;
            match session.delete(&id)? {
                DeleteOutcome::Deleted(count) => println!("deleted {count} task(s)"),
                DeleteOutcome::Aborted => println!("delete cancelled"),
            }
        }
        Commands::Edit(args) => {
            let id = resolve_id(session.todos(), &args.id)?;
            session.update_text(&id, &args.text)?;
            println!("updated {id}");
        }
        Commands::Deadline(args) => {
            let id = resolve_id(session.todos(), &args.id)?;
            let deadline = args
                .when
                .as_deref()
                .map(|s| parse_deadline(s).ok_or(format!("invalid deadline: {s}")))
                .transpose()?;
            session.set_deadline(&id, deadline)?;
            println!("updated {id}");
        }
        Commands::Archive => {
            let moved = session.archive_now()?;
            println!("archived {moved} task(s)");
        }
        Commands::Archived => {
            let archive = session.load_archive()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&archive)?);
            } else if archive.todos.is_empty() {
                println!("archive is empty");
            } else {
                for todo in &archive.todos {
                    println!("[x] {}  {}", short_id(&todo.id), todo.text);
                }
            }
        }
        Commands::ClearArchive => {
            session.clear_archive()?;
            println!("archive cleared");
        }
        Commands::Export(args) => {
            let path = export_path(args.path.as_deref());
            let json = session.export_json();
            fs::write(&path, json).map_err(|e| format!("could not write {}: {e}", path.display()))?;
            println!("exported to {}", path.display());
        }
        Commands::Import(args) => {
            let text = fs::read_to_string(&args.path)
                .map_err(|e| format!("could not read {}: {e}", args.path))?;
            match session.import(&text)? {
                ImportOutcome::Imported(count) => println!("imported {count} task(s)"),
                ImportOutcome::Aborted => println!("import cancelled"),
            }
        }
        Commands::Settings(args) => {
            if let Some(days) = args.archive_days {
                session.set_archive_days(days)?;
            }
            if let Some(spec) = &args.auto_sync {
                session.set_auto_sync(spec)?;
            }
            let settings = session.settings();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(settings)?);
            } else {
                println!("archive-days: {}", settings.archive_days);
                println!("auto-sync:    {}", settings.auto_sync);
            }
        }
        Commands::Status => {
            let status = StatusJson {
                data_dir: data_dir.display().to_string(),
                tasks: session.todos().data.len(),
                completed: session
                    .todos()
                    .data
                    .iter()
                    .filter(|t| t.completed)
                    .count(),
                source: format!("{:?}", session.todos().source).to_lowercase(),
                error: session.last_error().map(str::to_string),
                remote_configured: session.has_remote_config(),
                sync: session.sync_status(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("data dir:  {}", status.data_dir);
                println!("tasks:     {} ({} completed)", status.tasks, status.completed);
                println!("remote:    {}", if status.remote_configured { "configured" } else { "not configured" });
                println!("sync:      {:?}, auto {}", status.sync.status, status.sync.auto_sync);
                if let Some(last) = status.sync.last_sync {
                    println!("last sync: {last}");
                }
                if let Some(error) = &status.error {
                    println!("error:     {error}");
                }
            }
        }
        Commands::Remote(args) => {
            session.set_remote_config(RemoteConfig {
                host: args.host.clone(),
                port: args.port,
                username: args.username.clone(),
                password: args.password.clone(),
                database: args.database.clone(),
            })?;
            println!("remote configuration stored");
        }
        Commands::Sync => {
            match session.connect() {
                ConnectionStatus::Connected => {
                    let report = session.sync_now()?;
                    println!("{}", report.message);
                }
                ConnectionStatus::NoConfig => {
                    return Err("no remote configuration stored".into());
                }
                status => {
                    let detail = session
                        .sync_status()
                        .error
                        .unwrap_or_else(|| format!("{status:?}").to_lowercase());
                    return Err(format!("could not connect: {detail}").into());
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TaskJson<'a> {
    #[serde(flatten)]
    todo: &'a Todo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TaskJson<'a>>,
}

impl<'a> TaskJson<'a> {
    fn from_node(node: &TreeNode<'a>) -> Self {
        TaskJson {
            todo: node.todo,
            children: node.children.iter().map(TaskJson::from_node).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusJson {
    data_dir: String,
    tasks: usize,
    completed: usize,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    remote_configured: bool,
    sync: SyncStatus,
}

fn render_node(node: &TreeNode<'_>, depth: usize, out: &mut String) {
    let todo = node.todo;
    let checkbox = if todo.completed { "[x]" } else { "[ ]" };
    let marker = match todo.deadline {
        Some(deadline) if !todo.completed => match classify_deadline(deadline, Utc::now()) {
            Urgency::Urgent => " !!",
            Urgency::Warning => " !",
            Urgency::Normal => "",
        },
        _ => "",
    };
    out.push_str(&format!(
        "{}{} {}  {}{}\n",
        "  ".repeat(depth),
        checkbox,
        short_id(&todo.id),
        todo.text,
        marker
    ));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Ids are UUIDs; the first block is plenty for display.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

/// Resolve a user-supplied id or unique prefix against the collection.
fn resolve_id(list: &TodoList, input: &str) -> Result<String, String> {
    if list.contains(input) {
        return Ok(input.to_string());
    }
    let matches: Vec<&str> = list
        .data
        .iter()
        .map(|t| t.id.as_str())
        .filter(|id| id.starts_with(input))
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => Err(format!("no task matches id {input}")),
        _ => Err(format!("ambiguous id {input}: {} matches", matches.len())),
    }
}

fn export_path(arg: Option<&str>) -> PathBuf {
    let default_name = transfer::default_export_filename(Utc::now());
    match arg {
        None => PathBuf::from(default_name),
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_dir() {
                path.join(default_name)
            } else {
                path
            }
        }
    }
}
