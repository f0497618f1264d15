mod board;
mod cli;
mod commands;
mod config;
mod drag;
mod edit;
mod logging;
mod model;
mod position;
mod render;
mod scroll;
mod selection;
mod store;
mod transfer;
mod ui;
mod zorder;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let settings = config::Settings::load()?;
    let level = args
        .log_level
        .clone()
        .or_else(|| settings.log_level.clone())
        .unwrap_or_else(|| logging::default_log_level().to_string());
    let _logger = logging::init_logging(&level, &config::log_dir()?)?;

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List => commands::list(),
        cli::Command::Add {
            text,
            top,
            left,
            color,
        } => commands::add(text, top, left, color),
        cli::Command::Edit {
            task_id,
            text,
            color,
            top,
            left,
        } => commands::edit(task_id, text, color, top, left),
        cli::Command::Delete { task_id } => commands::delete(task_id),
        cli::Command::Front { task_id } => commands::front(task_id),
        cli::Command::Export { path } => commands::export(&path),
        cli::Command::Import { path } => commands::import(&path),
        cli::Command::Tui => commands::tui(&settings),
    }
}
