//! Main event loop and send orchestration.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::conversation::{ConversationState, Message};
use crate::events::SendOutcome;
use crate::gemini::{ChatError, GeminiClient};
use crate::ui::commands::{SlashCommand, help_text, parse_slash_command};
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::history::ChatHistory;

/// The chat application: one conversation, one session client, at most one
/// send in flight.
///
/// The client is owned directly by the app. A send snapshots everything the
/// request needs before spawning, so the spawned task shares nothing with
/// the event loop and resets stay instant while a reply is pending.
pub struct ChatApp {
    conversation: ConversationState,
    composer: Composer,
    client: GeminiClient,
    /// Receiver for the pending send, if one is in flight.
    outcome_rx: Option<mpsc::Receiver<SendOutcome>>,
    /// User text of the in-flight send, committed to the session transcript
    /// when the reply lands.
    pending_turn: Option<String>,
    last_revision: u64,
    should_quit: bool,
    model: String,
}

impl ChatApp {
    pub fn new(config: &Config) -> Self {
        Self {
            conversation: ConversationState::new(),
            composer: Composer::new(),
            client: GeminiClient::new(config),
            outcome_rx: None,
            pending_turn: None,
            last_revision: 0,
            should_quit: false,
            model: config.model.clone(),
        }
    }

    /// Run until the user quits.
    pub async fn run(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let tick = Duration::from_millis(50);

        while !self.should_quit {
            self.poll_outcome();

            if self.conversation.revision() != self.last_revision {
                self.last_revision = self.conversation.revision();
                tracing::trace!(revision = self.last_revision, "conversation changed");
            }

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(tick)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Paste(text) => {
                        if !self.conversation.is_loading() {
                            self.composer.insert_str(&text);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Drain the pending send outcome, if any arrived.
    fn poll_outcome(&mut self) {
        let Some(rx) = self.outcome_rx.as_mut() else {
            return;
        };

        match rx.try_recv() {
            Ok(outcome) => {
                if let (SendOutcome::Reply(reply), Some(text)) =
                    (&outcome, self.pending_turn.as_deref())
                {
                    self.client.commit_reply(text, reply);
                }
                self.conversation.finish_send(outcome);
                self.outcome_rx = None;
                self.pending_turn = None;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                // The task died without reporting; still produce exactly one
                // follow-up message for the send.
                self.conversation.finish_send(SendOutcome::Failed(ChatError::RemoteFailure(
                    "reply channel closed before a response arrived".to_string(),
                )));
                self.outcome_rx = None;
                self.pending_turn = None;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Esc {
            self.should_quit = true;
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('n') => {
                    self.new_chat();
                    return;
                }
                _ => {}
            }
        }

        // The composer is disabled while a reply is pending; quitting and
        // Ctrl+N above stay live.
        if self.conversation.is_loading() {
            return;
        }

        if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
            if let Some(command) = parse_slash_command(&text) {
                self.run_command(command);
            } else {
                self.start_send(text);
            }
        }
    }

    fn run_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::New => self.new_chat(),
            SlashCommand::Help => self.conversation.push(Message::model(help_text())),
            SlashCommand::Quit => self.should_quit = true,
        }
    }

    /// Spawn the send and keep the receiver; the loop picks the outcome up.
    fn start_send(&mut self, text: String) {
        if !self.conversation.begin_send(&text) {
            return;
        }

        let pending = match self.client.prepare_send(&text) {
            Ok(pending) => pending,
            Err(err) => {
                self.conversation.finish_send(SendOutcome::Failed(err));
                return;
            }
        };

        let (tx, rx) = mpsc::channel(1);
        self.outcome_rx = Some(rx);
        self.pending_turn = Some(text);

        tokio::spawn(async move {
            let outcome = match pending.execute().await {
                Ok(reply) => SendOutcome::Reply(reply),
                Err(err) => SendOutcome::Failed(err),
            };
            let _ = tx.send(outcome).await;
        });
    }

    /// Discard the session and start over with a fresh greeting. A reply
    /// still in flight is dropped with its channel and never committed.
    fn new_chat(&mut self) {
        self.client.reset();
        self.outcome_rx = None;
        self.pending_turn = None;
        self.conversation.reset();
    }

    fn render(&self, frame: &mut Frame) {
        let banner = self.conversation.banner_error();

        let mut constraints = vec![Constraint::Length(1), Constraint::Min(5)];
        if banner.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(4));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(frame.size());

        self.render_header(frame, chunks[0]);
        frame.render_widget(ChatHistory::new(&self.conversation), chunks[1]);

        if let Some(error) = banner {
            let line = Line::from(vec![Span::styled(
                format!(" {error}"),
                Style::default().fg(Color::White).bg(Color::Red),
            )]);
            frame.render_widget(Paragraph::new(line), chunks[2]);
        }

        let composer_area = chunks[chunks.len() - 1];
        self.composer
            .render(composer_area, frame.buffer_mut(), self.conversation.is_loading());
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled("Gemini", Style::default().fg(Color::Blue)),
            Span::raw(" Flash Chat — "),
            Span::styled(self.model.clone(), Style::default().fg(Color::DarkGray)),
            Span::raw("   "),
            Span::styled("/new /help /quit", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MessageRole, RESET_GREETING};
    use tokio::net::TcpListener;

    fn test_app() -> ChatApp {
        ChatApp::new(&Config::default())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn slash_new_resets_conversation_and_session() {
        let mut app = test_app();
        app.conversation.push(Message::user("hi"));
        app.conversation.push(Message::model("hello"));

        app.run_command(SlashCommand::New);

        assert_eq!(app.conversation.messages().len(), 1);
        assert_eq!(app.conversation.messages()[0].text, RESET_GREETING);
        assert!(app.client.session_id().is_none());
    }

    #[tokio::test]
    async fn slash_help_appends_a_help_message() {
        let mut app = test_app();
        app.run_command(SlashCommand::Help);

        let last = app.conversation.messages().last().expect("help message");
        assert_eq!(last.role, MessageRole::Model);
        assert!(last.text.contains("/new"));
    }

    #[tokio::test]
    async fn quit_command_stops_the_loop() {
        let mut app = test_app();
        app.run_command(SlashCommand::Quit);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn escape_quits() {
        let mut app = test_app();
        app.handle_key(press(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn send_without_credential_yields_one_error_message() {
        let mut app = test_app();
        app.start_send("hello".to_string());

        // The credential check fails before anything is spawned.
        assert!(app.outcome_rx.is_none());
        assert!(!app.conversation.is_loading());
        let last = app.conversation.messages().last().expect("error message");
        assert_eq!(last.role, MessageRole::Error);
        assert!(last.text.contains("not configured"));
    }

    #[tokio::test]
    async fn disconnected_channel_still_finishes_the_send() {
        let mut app = test_app();
        assert!(app.conversation.begin_send("hello"));

        let (tx, rx) = mpsc::channel::<SendOutcome>(1);
        app.outcome_rx = Some(rx);
        drop(tx);

        app.poll_outcome();
        assert!(!app.conversation.is_loading());
        let last = app.conversation.messages().last().expect("error message");
        assert_eq!(last.role, MessageRole::Error);
    }

    #[tokio::test]
    async fn composer_ignores_typing_while_a_reply_is_pending() {
        let mut app = test_app();
        assert!(app.conversation.begin_send("hello"));

        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.composer.content(), "");
    }

    #[tokio::test]
    async fn new_chat_during_an_inflight_send_is_immediate() {
        // A server that accepts connections but never answers keeps the
        // spawned request pending for as long as the test cares to look.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => held.push(stream),
                    Err(_) => break,
                }
            }
        });

        let mut config = Config::default();
        config.api_key = Some("test-key".to_string());
        config.base_url = format!("http://{addr}/v1beta");
        let mut app = ChatApp::new(&config);

        app.start_send("hello".to_string());
        assert!(app.conversation.is_loading());
        assert!(app.client.session_id().is_some());

        // Reset must not wait on the stuck request.
        app.new_chat();
        assert!(!app.conversation.is_loading());
        assert_eq!(app.conversation.messages().len(), 1);
        assert_eq!(app.conversation.messages()[0].text, RESET_GREETING);
        assert!(app.client.session_id().is_none());

        // Whatever the abandoned send eventually produces has nowhere to
        // land; the fresh conversation stays untouched.
        app.poll_outcome();
        assert_eq!(app.conversation.messages().len(), 1);
    }
}
