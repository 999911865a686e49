//! Main event loop for the interactive shell.
//!
//! Multiplexes stdin lines, background task events and shutdown signals.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::handle_app_event;
use super::helpers::{activate, spawn_page_fetch};
use super::input::handle_input;
use super::render::render;
use crate::app::{App, AppEvent, Screen};

/// Result of handling a command.
pub enum Action {
    /// Keep reading commands.
    Continue,
    /// Exit the shell.
    Quit,
}

const PROMPT: &str = "> ";

/// Runs the interactive shell until `quit`, end of input or a signal.
///
/// Loads page 1 and the bookmark mirror on start. Uses `tokio::select!` over:
/// - **Signals**: SIGTERM/SIGINT end the loop (Unix only)
/// - **Stdin**: one command per line
/// - **Background tasks**: `AppEvent`s from page fetches and bookmark writes
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    let request = app.jobs.feed_mut().fetch_page();
    spawn_page_fetch(app, request, &event_tx);
    activate(app, Screen::Jobs, &event_tx);

    loop {
        // Drain pending events so results show before the next prompt
        while let Ok(event) = event_rx.try_recv() {
            handle_app_event(app, event);
        }
        flush_screen(app, &mut stdout).await?;

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            line = lines.next_line() => {
                match line? {
                    Some(line) => match handle_input(app, &line, &event_tx) {
                        Ok(Action::Quit) => break,
                        Ok(Action::Continue) => {}
                        Err(e) => app.set_status(format!("Error: {e}")),
                    },
                    None => {
                        tracing::info!("End of input, shutting down");
                        break;
                    }
                }
            }

            Some(event) = event_rx.recv() => {
                handle_app_event(app, event);
            }
        }
    }

    Ok(())
}

/// Print the screen if it changed, then any status message and the prompt.
async fn flush_screen<W: AsyncWrite + Unpin>(app: &mut App, out: &mut W) -> Result<()> {
    let mut buf = String::new();
    if app.needs_redraw {
        buf.push_str(&render(app));
        app.needs_redraw = false;
    }
    if let Some(status) = app.take_status() {
        buf.push_str(&status);
        buf.push('\n');
    }
    if buf.is_empty() {
        return Ok(());
    }
    buf.push_str(PROMPT);
    out.write_all(buf.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
