//! Line-oriented interactive shell.
//!
//! - `loop_runner` - main event loop (`run`)
//! - `input` - command parsing and dispatch
//! - `events` - background task event processing
//! - `render` - plain-text screens
//! - `helpers` - background task spawning

mod events;
mod helpers;
mod input;
mod loop_runner;
mod render;

pub use events::handle_app_event;
pub use input::{handle_command, handle_input, Command, CommandError};
pub use loop_runner::{run, Action};
pub use render::{phone_link, render, render_bookmarks, render_details, render_jobs};
