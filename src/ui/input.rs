//! Command parsing and dispatch.
//!
//! Item numbers are 1-based as shown on screen.

use std::str::FromStr;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::mpsc;

use super::helpers::{
    activate, spawn_detail_toggle, spawn_page_fetch, spawn_removal_persist, spawn_toggle_persist,
};
use super::loop_runner::Action;
use super::render::HELP_TEXT;
use crate::app::{App, AppEvent, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Jobs,
    Bookmarks,
    Next,
    Refresh,
    Retry,
    Open(usize),
    /// Item number on a list screen; `None` on the details screen.
    Toggle(Option<usize>),
    Remove(usize),
    Back,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("'{0}' needs an item number")]
    MissingNumber(&'static str),
    #[error("Invalid item number '{0}'")]
    InvalidNumber(String),
}

fn item_number(name: &'static str, arg: Option<&str>) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingNumber(name))?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::InvalidNumber(arg.to_string())),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parses `open 3`, `toggle`, `q` and friends. Numbers become 0-based.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or("").to_ascii_lowercase();
        let arg = words.next();

        let command = match name.as_str() {
            "jobs" | "j" => Command::Jobs,
            "bookmarks" | "b" => Command::Bookmarks,
            "next" | "n" => Command::Next,
            "refresh" | "r" => Command::Refresh,
            "retry" => Command::Retry,
            "open" | "o" => Command::Open(item_number("open", arg)?),
            "toggle" | "t" => match arg {
                Some(_) => Command::Toggle(Some(item_number("toggle", arg)?)),
                None => Command::Toggle(None),
            },
            "remove" | "rm" => Command::Remove(item_number("remove", arg)?),
            "back" => Command::Back,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Handle one line of input.
pub fn handle_input(
    app: &mut App,
    line: &str,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if line.trim().is_empty() {
        return Ok(Action::Continue);
    }
    match line.parse::<Command>() {
        Ok(command) => handle_command(app, command, event_tx),
        Err(e) => {
            app.set_status(e.to_string());
            Ok(Action::Continue)
        }
    }
}

pub fn handle_command(
    app: &mut App,
    command: Command,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    tracing::debug!(?command, screen = ?app.screen, "Handling command");
    match command {
        Command::Quit => return Ok(Action::Quit),

        Command::Help => app.set_status(HELP_TEXT),

        Command::Jobs => {
            app.details = None;
            activate(app, Screen::Jobs, event_tx);
        }

        Command::Bookmarks => {
            app.details = None;
            activate(app, Screen::Bookmarks, event_tx);
        }

        Command::Next => {
            if app.screen != Screen::Jobs {
                app.set_status("'next' works on the jobs screen");
            } else if let Some(request) = app.jobs.feed_mut().next_page() {
                spawn_page_fetch(app, request, event_tx);
            } else {
                app.set_status("Already loading");
            }
        }

        Command::Refresh => {
            if app.screen == Screen::Bookmarks {
                activate(app, Screen::Bookmarks, event_tx);
            } else {
                let request = app.jobs.feed_mut().refresh();
                spawn_page_fetch(app, request, event_tx);
                // The bookmark mirror is re-read alongside the feed
                activate(app, Screen::Jobs, event_tx);
                app.details = None;
            }
        }

        Command::Retry => match app.jobs.feed_mut().retry() {
            Some(request) => spawn_page_fetch(app, request, event_tx),
            None => app.set_status("Nothing to retry"),
        },

        Command::Open(index) => {
            if app.open_details(index).is_some() {
                // Flag is re-derived from the store on every entry
                activate(app, Screen::Details, event_tx);
            } else {
                app.set_status(format!("No item {}", index + 1));
            }
        }

        Command::Toggle(index) => handle_toggle(app, index, event_tx),

        Command::Remove(index) => {
            if app.screen != Screen::Bookmarks {
                app.set_status("'remove' works on the bookmarks screen");
            } else {
                match app.bookmarks.begin_remove(index) {
                    Some(removal) => spawn_removal_persist(app, removal, event_tx),
                    None => app.set_status(format!("No item {}", index + 1)),
                }
            }
        }

        Command::Back => {
            if app.screen == Screen::Details {
                let screen = app.close_details();
                activate(app, screen, event_tx);
            } else if app.screen == Screen::Bookmarks {
                activate(app, Screen::Jobs, event_tx);
            }
        }
    }
    app.needs_redraw = true;
    Ok(Action::Continue)
}

/// Optimistic toggle for the current screen; the write runs in the background.
fn handle_toggle(app: &mut App, index: Option<usize>, event_tx: &mpsc::Sender<AppEvent>) {
    match (app.screen, index) {
        (Screen::Details, _) => {
            let started = app
                .details
                .as_mut()
                .map(|details| details.begin_toggle())
                .unwrap_or(false);
            if started {
                spawn_detail_toggle(app, event_tx);
            } else {
                app.set_status("Still saving...");
            }
        }
        (Screen::Jobs, Some(index)) => match app.jobs.begin_toggle(index) {
            Some(toggle) => spawn_toggle_persist(app, toggle, event_tx),
            None if app.jobs.posting(index).is_some() => app.set_status("Still saving..."),
            None => app.set_status(format!("No item {}", index + 1)),
        },
        (Screen::Bookmarks, Some(index)) => match app.bookmarks.begin_remove(index) {
            Some(removal) => spawn_removal_persist(app, removal, event_tx),
            None => app.set_status(format!("No item {}", index + 1)),
        },
        (_, None) => app.set_status(CommandError::MissingNumber("toggle").to_string()),
    }
}
