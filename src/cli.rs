use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pinboard", version, about = "Free-form terminal task board")]
pub struct Cli {
    /// Log level: trace, debug, info, warn, error or off
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project task store in the current directory
    Init,
    /// List tasks, back to front
    List,
    /// Add a new task
    Add {
        /// Markdown text of the task
        text: String,
        /// Vertical position in percent of the viewport height (0-200)
        #[arg(long)]
        top: Option<f64>,
        /// Horizontal position in percent of the viewport width (0-100)
        #[arg(long)]
        left: Option<f64>,
        /// Card color (red, orange, yellow, green, blue, indigo, purple, white, black)
        #[arg(long)]
        color: Option<String>,
    },
    /// Edit an existing task
    Edit {
        /// Task id to edit
        task_id: String,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New color
        #[arg(long)]
        color: Option<String>,
        /// New vertical position
        #[arg(long)]
        top: Option<f64>,
        /// New horizontal position
        #[arg(long)]
        left: Option<f64>,
    },
    /// Delete a task
    Delete {
        /// Task id to delete
        task_id: String,
    },
    /// Bring a task to the front of the stack
    Front {
        /// Task id to raise
        task_id: String,
    },
    /// Export all tasks as JSON (ids are not exported)
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Import tasks from a JSON export; every record becomes a new task
    Import {
        /// Source file
        path: PathBuf,
    },
    /// Launch the interactive board
    Tui,
}
