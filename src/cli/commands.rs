use clap::{Args, Parser, Subcommand};

use crate::model::deadline::Recurrence;
use crate::model::list::ListId;

#[derive(Parser)]
#[command(name = "tl", about = concat!("taskline v", env!("CARGO_PKG_VERSION"), " - tasks, deadlines and repeats"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Treat this local time as "now" (YYYY-MM-DDTHH:MM)
    #[arg(long, global = true, hide = true)]
    pub now: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .taskline data directory here
    Init,
    /// Add a task
    Add(AddArgs),
    /// Toggle a task between open and completed
    Done(IdArg),
    /// Change a task's text, list or deadline
    Edit(EditArgs),
    /// Permanently delete a task
    Rm(IdArg),
    /// Tasks due today
    Today,
    /// Open tasks whose deadline has passed
    Missed,
    /// Every open task
    Open,
    /// Completed tasks
    Archive,
    /// Tasks on one list
    Ls(LsArgs),
    /// Show all lists
    Lists,
    /// List management
    List(ListCmd),
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// List ID (default: unsorted)
    #[arg(long)]
    pub list: Option<ListId>,
    /// Due date (YYYY-MM-DD); defaults to today when --at or --repeat is given
    #[arg(long)]
    pub due: Option<String>,
    /// Time of day the task is due (HH:MM)
    #[arg(long)]
    pub at: Option<String>,
    /// Repeat policy: daily, weekly, weekday or monthly
    #[arg(long)]
    pub repeat: Option<Recurrence>,
    /// Longer description
    #[arg(long)]
    pub note: Option<String>,
    /// Mark as a reminder rather than a task
    #[arg(long)]
    pub reminder: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New text
    #[arg(long)]
    pub text: Option<String>,
    /// Move to another list
    #[arg(long)]
    pub list: Option<ListId>,
    /// New due date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "clear_deadline")]
    pub due: Option<String>,
    /// New time of day (HH:MM); an empty value removes the time
    #[arg(long, conflicts_with = "clear_deadline")]
    pub at: Option<String>,
    /// New repeat policy (use "none" to stop repeating)
    #[arg(long, conflicts_with = "clear_deadline")]
    pub repeat: Option<Recurrence>,
    /// Remove the deadline entirely
    #[arg(long)]
    pub clear_deadline: bool,
    /// New description
    #[arg(long, conflicts_with = "clear_note")]
    pub note: Option<String>,
    /// Remove the description
    #[arg(long)]
    pub clear_note: bool,
}

#[derive(Args)]
pub struct LsArgs {
    /// List ID, or "unsorted" / "archive"
    pub list: ListId,
}

#[derive(Args)]
pub struct ListCmd {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Create a list
    Add {
        /// List name
        name: String,
        /// Display color (e.g. "#44DDFF")
        #[arg(long)]
        color: Option<String>,
        /// Mark the list as shared
        #[arg(long)]
        shared: bool,
    },
    /// Rename a list
    Rename {
        /// List ID
        id: ListId,
        /// New name
        name: String,
    },
    /// Delete a list; its tasks move to unsorted
    Rm {
        /// List ID
        id: ListId,
    },
}
