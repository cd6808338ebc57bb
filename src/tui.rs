//! Full-screen terminal chat client
//!
//! The event loop draws a frame, then waits for either terminal input or a
//! request outcome. All conversation changes go through [`App::dispatch`].

mod app;
pub mod markdown;
mod terminal;
mod ui;

use crate::client::CompletionClient;
use crate::config::ClientConfig;
use crate::conversation::{ChatContext, Event};
use app::App;
use std::io;
use std::sync::Arc;
use terminal::{EventHandler, Tui};
use tokio::sync::mpsc;

/// Run the chat client until the user quits
pub async fn run(config: &ClientConfig, client: Arc<dyn CompletionClient>) -> io::Result<()> {
    let (mut app, mut outcomes) = App::new(
        client,
        ChatContext::new(config.clear_policy),
        config.request_timeout,
    );
    app.gateway_label.clone_from(&config.gateway_url);

    terminal::install_panic_hook();
    let mut tui = terminal::init()?;
    let mut events = EventHandler::new();

    let result = event_loop(&mut tui, &mut app, &mut events, &mut outcomes).await;

    app.quit();
    terminal::restore()?;
    result
}

async fn event_loop(
    tui: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    outcomes: &mut mpsc::UnboundedReceiver<Event>,
) -> io::Result<()> {
    while !app.should_quit {
        tui.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            Some(event) = events.next() => app.handle_terminal_event(event),
            Some(outcome) = outcomes.recv() => app.on_outcome(outcome),
            else => break,
        }
    }
    Ok(())
}
