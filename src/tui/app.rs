//! Client runtime: owns the conversation state and executes effects

use super::terminal::TermEvent;
use crate::api::ChatRequest;
use crate::client::{complete_with_deadline, CompletionClient};
use crate::conversation::{transition, ChatContext, ChatState, Effect, Event};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const WHEEL_STEP: u16 = 3;

/// Which control receives Enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Send,
    Clear,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Input => Self::Send,
            Self::Send => Self::Clear,
            Self::Clear => Self::Input,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Input => Self::Clear,
            Self::Send => Self::Input,
            Self::Clear => Self::Send,
        }
    }
}

/// Transcript scroll position
///
/// While `follow` is set the view sticks to the newest line. Scrolling up
/// releases it; reaching the bottom again, or any new turn, restores it.
#[derive(Debug, Clone, Copy)]
pub struct Scroll {
    pub offset: u16,
    pub follow: bool,
    max_offset: u16,
    page: u16,
}

impl Default for Scroll {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
            max_offset: 0,
            page: 1,
        }
    }
}

impl Scroll {
    /// Record the rendered size and settle the offset
    pub fn fit(&mut self, content_lines: u16, viewport: u16) {
        self.max_offset = content_lines.saturating_sub(viewport);
        self.page = viewport.max(1);
        if self.follow || self.offset > self.max_offset {
            self.offset = self.max_offset;
        }
    }

    fn up(&mut self, lines: u16) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    fn down(&mut self, lines: u16) {
        self.offset = self.offset.saturating_add(lines).min(self.max_offset);
        if self.offset == self.max_offset {
            self.follow = true;
        }
    }
}

pub struct App {
    state: ChatState,
    context: ChatContext,
    client: Arc<dyn CompletionClient>,
    outcomes: mpsc::UnboundedSender<Event>,
    timeout: Duration,
    in_flight: Option<CancellationToken>,
    pub input: String,
    pub focus: Focus,
    pub scroll: Scroll,
    pub gateway_label: String,
    pub tick: usize,
    pub should_quit: bool,
}

impl App {
    /// Create the app plus the receiver on which request outcomes arrive
    pub fn new(
        client: Arc<dyn CompletionClient>,
        context: ChatContext,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Self {
            state: ChatState::new(),
            context,
            client,
            outcomes: tx,
            timeout,
            in_flight: None,
            input: String::new(),
            focus: Focus::Input,
            scroll: Scroll::default(),
            gateway_label: String::new(),
            tick: 0,
            should_quit: false,
        };
        (app, rx)
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Feed an event through the state machine and run its effects.
    /// Rejected events leave everything untouched.
    pub fn dispatch(&mut self, event: Event) {
        match transition(&self.state, &self.context, event) {
            Ok(result) => {
                self.state = result.new_state;
                for effect in result.effects {
                    self.execute(effect);
                }
            }
            Err(e) => tracing::debug!(reason = %e, "Event ignored"),
        }
    }

    /// A request finished, failed or was cancelled
    pub fn on_outcome(&mut self, event: Event) {
        self.in_flight = None;
        self.dispatch(event);
    }

    /// Stop the loop and abandon any request in flight
    pub fn quit(&mut self) {
        self.should_quit = true;
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ClearInput => self.input.clear(),
            Effect::ScrollToBottom => self.scroll.follow = true,
            Effect::LogFailure { message } => {
                tracing::warn!(error = %message, "Chat request failed");
            }
            Effect::SendToGateway { message, history } => {
                let cancel = CancellationToken::new();
                self.in_flight = Some(cancel.clone());

                let client = Arc::clone(&self.client);
                let outcomes = self.outcomes.clone();
                let timeout = self.timeout;
                let request = ChatRequest { message, history };
                tracing::info!(history_turns = request.history.len(), "Sending chat request");

                tokio::spawn(async move {
                    let event =
                        match complete_with_deadline(client.as_ref(), &request, &cancel, timeout)
                            .await
                        {
                            Ok(text) => Event::ReplyReceived { text },
                            Err(e) => Event::RequestFailed {
                                message: e.to_string(),
                            },
                        };
                    // The receiver is gone once the app has shut down
                    let _ = outcomes.send(event);
                });
            }
        }
    }

    pub fn handle_terminal_event(&mut self, event: TermEvent) {
        match event {
            TermEvent::Key(key) => self.handle_key(key),
            TermEvent::Mouse(mouse) => self.handle_mouse(mouse),
            TermEvent::Tick => self.tick = self.tick.wrapping_add(1),
            TermEvent::Resize => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        if self.state.is_confirming_clear() {
            match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => self.dispatch(Event::ClearConfirmed),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => self.dispatch(Event::ClearCancelled),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Char('s') if ctrl => self.submit(),
            KeyCode::Char('l') if ctrl => self.dispatch(Event::ClearRequested),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::PageUp => self.scroll.up(self.scroll.page),
            KeyCode::PageDown => self.scroll.down(self.scroll.page),
            KeyCode::Enter => match self.focus {
                Focus::Input | Focus::Send => self.submit(),
                Focus::Clear => self.dispatch(Event::ClearRequested),
            },
            KeyCode::Backspace => {
                self.focus = Focus::Input;
                self.input.pop();
            }
            KeyCode::Char(c) if !ctrl => {
                self.focus = Focus::Input;
                self.input.push(c);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll.up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.scroll.down(WHEEL_STEP),
            _ => {}
        }
    }

    fn submit(&mut self) {
        let text = self.input.clone();
        self.dispatch(Event::Submit { text });
    }
}
