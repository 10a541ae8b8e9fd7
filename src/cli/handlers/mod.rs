mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::json_store::JsonStore;
use crate::io::retry::{RetryPolicy, Retrying};
use crate::model::config::Config;
use crate::model::deadline::{Deadline, parse_date, parse_time};
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskKind, TaskPatch};
use crate::ops::task_ops::{Completion, Engine, EngineError};
use crate::util::clock::{Clock, FixedClock, SystemClock};

/// Name of the data directory holding `store.json` and `config.toml`
pub const DATA_DIR: &str = ".taskline";

type CliResult = Result<(), Box<dyn std::error::Error>>;
type CliEngine = Engine<Retrying<JsonStore>>;

/// Errors raised by the CLI layer itself
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("not a taskline directory: no .taskline/ found (run `tl init`)")]
    NotInitialized,
    #[error("cannot resolve -C path '{path}': {source}")]
    BadProjectDir {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid --now value: {0} (expected YYYY-MM-DDTHH:MM)")]
    BadNow(String),
    #[error("{0}")]
    Usage(String),
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CliResult {
    let json = cli.json;
    let start = start_dir(cli.project_dir.as_deref())?;

    if let Commands::Init = cli.command {
        return cmd_init(&start);
    }

    let data_dir = discover_data_dir(&start).ok_or(CliError::NotInitialized)?;
    let config = config_io::read_config(&data_dir)?;
    let clock = make_clock(cli.now.as_deref())?;
    let mut engine = open_engine(&data_dir, &config, clock)?;

    match cli.command {
        Commands::Init => Ok(()),

        // Write commands
        Commands::Add(args) => cmd_add(&mut engine, args, json),
        Commands::Done(args) => cmd_done(&mut engine, &args.id, json),
        Commands::Edit(args) => cmd_edit(&mut engine, args, json),
        Commands::Rm(args) => cmd_rm(&mut engine, &args.id),

        // Views
        Commands::Today => print_tasks(&engine, engine.today_view(), json),
        Commands::Missed => print_tasks(&engine, engine.missed_view(), json),
        Commands::Open => print_tasks(&engine, engine.open_view(), json),
        Commands::Archive => print_tasks(&engine, engine.archive_view(), json),
        Commands::Ls(args) => print_tasks(&engine, engine.list_view(args.list), json),

        // Lists
        Commands::Lists => cmd_lists(&engine, json),
        Commands::List(cmd) => cmd_list(&mut engine, cmd.action, json),
    }
}

/// The log filter from the data directory's config, if one can be found.
pub fn configured_log_filter(project_dir: Option<&str>) -> Option<String> {
    let start = start_dir(project_dir).ok()?;
    let data_dir = discover_data_dir(&start)?;
    config_io::read_config(&data_dir)
        .ok()
        .map(|config| config.log.filter)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_dir(project_dir: Option<&str>) -> Result<PathBuf, CliError> {
    match project_dir {
        Some(dir) => std::fs::canonicalize(dir).map_err(|e| CliError::BadProjectDir {
            path: dir.to_string(),
            source: e,
        }),
        None => std::env::current_dir().map_err(|e| CliError::BadProjectDir {
            path: ".".to_string(),
            source: e,
        }),
    }
}

/// Walk up from `start` looking for a `.taskline/` directory.
fn discover_data_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DATA_DIR))
        .find(|candidate| candidate.is_dir())
}

fn make_clock(now: Option<&str>) -> Result<Box<dyn Clock>, CliError> {
    match now {
        None => Ok(Box::new(SystemClock)),
        Some(raw) => {
            let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .map_err(|_| CliError::BadNow(raw.to_string()))?;
            Ok(Box::new(FixedClock::new(parsed)))
        }
    }
}

fn open_engine(
    data_dir: &Path,
    config: &Config,
    clock: Box<dyn Clock>,
) -> Result<CliEngine, EngineError> {
    let store = Retrying::new(
        JsonStore::open(data_dir),
        RetryPolicy::from_config(&config.store),
    );
    Engine::open(store, clock, config)
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tasks(engine: &CliEngine, tasks: Vec<&Task>, json: bool) -> CliResult {
    let now = engine.clock().now();
    if json {
        let out: Vec<TaskJson> = tasks.iter().map(|t| task_to_json(t, now)).collect();
        return print_json(&out);
    }
    if tasks.is_empty() {
        println!("no tasks");
    }
    for task in tasks {
        println!("{}", format_task_line(task, now));
    }
    Ok(())
}

/// Deadline for a new task. `--at` or `--repeat` without `--due` means today.
fn new_deadline(args: &AddArgs, today: NaiveDate) -> Result<Option<Deadline>, Box<dyn std::error::Error>> {
    if args.due.is_none() && args.at.is_none() && args.repeat.is_none() {
        return Ok(None);
    }
    let date = match &args.due {
        Some(raw) => parse_date(raw)?,
        None => today,
    };
    let time = match &args.at {
        Some(raw) => parse_time(raw)?,
        None => None,
    };
    Ok(Some(Deadline {
        date,
        time,
        recurring: args.repeat.filter(|r| r.is_recurring()),
    }))
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(engine: &mut CliEngine, args: AddArgs, json: bool) -> CliResult {
    let deadline = new_deadline(&args, engine.clock().today())?;
    let mut draft = Task::draft(args.text, args.list.unwrap_or(ListId::UNSORTED));
    draft.deadline = deadline;
    draft.description = args.note;
    if args.reminder {
        draft.kind = TaskKind::Reminder;
    }

    let created = engine.create_task(draft)?;
    if json {
        return print_json(&task_to_json(&created, engine.clock().now()));
    }
    println!("added {}", created.id);
    Ok(())
}

fn cmd_done(engine: &mut CliEngine, id: &str, json: bool) -> CliResult {
    let outcome = engine.toggle_complete(id)?;
    let now = engine.clock().now();

    if json {
        let out = match &outcome {
            Completion::Completed(task) => CompletionJson {
                action: "completed",
                task: task_to_json(task, now),
                next: None,
            },
            Completion::Recurred { completed, next } => CompletionJson {
                action: "completed",
                task: task_to_json(completed, now),
                next: Some(task_to_json(next, now)),
            },
            Completion::Reopened(task) => CompletionJson {
                action: "reopened",
                task: task_to_json(task, now),
                next: None,
            },
        };
        return print_json(&out);
    }

    match outcome {
        Completion::Completed(task) => println!("completed {}", task.id),
        Completion::Recurred { completed, next } => {
            println!("completed {}", completed.id);
            let due = next
                .deadline
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            println!("next {} due {}", next.id, due);
        }
        Completion::Reopened(task) => println!("reopened {}", task.id),
    }
    Ok(())
}

fn cmd_edit(engine: &mut CliEngine, args: EditArgs, json: bool) -> CliResult {
    let task = engine
        .task(&args.id)
        .cloned()
        .ok_or_else(|| EngineError::NotFound(format!("task {}", args.id)))?;

    let mut patch = TaskPatch::default();
    if let Some(text) = args.text {
        patch = patch.text(text);
    }
    if let Some(list) = args.list {
        patch = patch.list(list);
    }

    if args.clear_deadline {
        patch = patch.clear_deadline();
    } else if args.due.is_some() || args.at.is_some() || args.repeat.is_some() {
        let current = task.deadline.as_ref();
        let date = match &args.due {
            Some(raw) => parse_date(raw)?,
            None => current.map(|d| d.date).ok_or_else(|| {
                CliError::Usage(format!("{} has no deadline; pass --due", task.id))
            })?,
        };
        let mut deadline = Deadline {
            date,
            time: current.and_then(|d| d.time),
            recurring: current.and_then(|d| d.recurring),
        };
        if let Some(raw) = &args.at {
            deadline.time = parse_time(raw)?;
        }
        if let Some(policy) = args.repeat {
            deadline.recurring = Some(policy).filter(|r| r.is_recurring());
        }
        patch = patch.deadline(deadline);
    }

    if let Some(note) = args.note {
        patch.description = Some(Some(note));
    } else if args.clear_note {
        patch.description = Some(None);
    }

    if patch.is_empty() {
        return Err(CliError::Usage("nothing to change".into()).into());
    }

    let updated = engine.update_task(&args.id, &patch)?;
    if json {
        return print_json(&task_to_json(&updated, engine.clock().now()));
    }
    println!("updated {}", updated.id);
    Ok(())
}

fn cmd_rm(engine: &mut CliEngine, id: &str) -> CliResult {
    engine.delete_task(id)?;
    println!("deleted {}", id);
    Ok(())
}

// ---------------------------------------------------------------------------
// List commands
// ---------------------------------------------------------------------------

fn open_count(engine: &CliEngine, list: ListId) -> usize {
    engine
        .list_view(list)
        .iter()
        .filter(|t| !t.completed)
        .count()
}

fn cmd_lists(engine: &CliEngine, json: bool) -> CliResult {
    if json {
        let out: Vec<ListJson> = engine
            .lists()
            .iter()
            .map(|l| list_to_json(l, open_count(engine, l.id)))
            .collect();
        return print_json(&out);
    }
    println!(
        "{:>4}  unsorted  ({} open)",
        ListId::UNSORTED.0,
        open_count(engine, ListId::UNSORTED)
    );
    for list in engine.lists() {
        println!("{}", format_list_line(list, open_count(engine, list.id)));
    }
    Ok(())
}

fn cmd_list(engine: &mut CliEngine, action: ListAction, json: bool) -> CliResult {
    match action {
        ListAction::Add {
            name,
            color,
            shared,
        } => {
            let mut draft = List::draft(name);
            draft.color = color.unwrap_or_default();
            draft.is_shared = shared;
            let created = engine.create_list(draft)?;
            if json {
                return print_json(&list_to_json(&created, 0));
            }
            println!("created list {} ({})", created.id.0, created.name);
        }
        ListAction::Rename { id, name } => {
            let patch = ListPatch {
                name: Some(name),
                ..Default::default()
            };
            let updated = engine.update_list(id, &patch)?;
            println!("renamed list {} to {}", updated.id.0, updated.name);
        }
        ListAction::Rm { id } => {
            let moved = engine.delete_list(id)?;
            println!("deleted list {}; moved {} task(s) to unsorted", id.0, moved);
        }
    }
    Ok(())
}
