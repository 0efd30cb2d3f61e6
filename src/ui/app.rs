//! Application shell: terminal lifecycle and the single-threaded event loop.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc;
use tracing::info;

use crate::client::{ChatClient, StreamEvent};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::ui::commands::{self, SlashCommand};
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::history::History;

/// Run the interactive chat session until the user quits.
pub async fn run(config: Config) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = App::new(config).run(&mut terminal).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")
}

struct App {
    config: Config,
    client: ChatClient,
    conversation: Conversation,
    composer: Composer,
    stream_rx: Option<mpsc::Receiver<StreamEvent>>,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(config: Config) -> Self {
        let client = ChatClient::new(&config);
        Self {
            config,
            client,
            conversation: Conversation::new(),
            composer: Composer::new("Type a message and press Enter..."),
            stream_rx: None,
            status: None,
            should_quit: false,
        }
    }

    async fn run(mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        info!(server = %self.config.server_url, "session started");

        while !self.should_quit {
            self.drain_stream_events();
            terminal.draw(|frame| self.draw(frame))?;

            // Short poll keeps the redraw cadence while chunks arrive.
            if event::poll(Duration::from_millis(50)).context("Failed to poll for input")? {
                if let Event::Key(key) = event::read().context("Failed to read input")? {
                    self.handle_key(key).await?;
                }
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.size());

        frame.render_widget(
            History::new(self.conversation.messages(), self.conversation.is_streaming()),
            chunks[0],
        );
        frame.render_widget(&self.composer, chunks[1]);
        frame.render_widget(self.status_line(), chunks[2]);
    }

    fn status_line(&self) -> Paragraph<'_> {
        let text = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(
                status.clone(),
                Style::default().fg(Color::Yellow),
            )])
        } else if self.conversation.is_busy() {
            Line::from(vec![Span::styled(
                "waiting for reply...",
                Style::default().fg(Color::Green),
            )])
        } else if self.config.ui.show_thread_id {
            let thread = self.conversation.thread_id().unwrap_or("(new)");
            Line::from(vec![Span::styled(
                format!("thread: {thread}"),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            Line::from("")
        };
        Paragraph::new(text)
    }

    /// Pull everything the transport has delivered so far; called once per
    /// tick so chunks render in arrival order without blocking input.
    fn drain_stream_events(&mut self) {
        let mut finished = false;

        if let Some(rx) = self.stream_rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        finished =
                            matches!(event, StreamEvent::Done { .. } | StreamEvent::Error(_));
                        self.conversation.apply(event);
                        if finished {
                            break;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        // The transport task went away without a terminal
                        // event; treat it as a failed exchange.
                        self.conversation
                            .apply(StreamEvent::Error("stream closed unexpectedly".to_string()));
                        finished = true;
                        break;
                    }
                }
            }
        }

        if finished {
            self.stream_rx = None;
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => self.handle_submit(input).await?,
            ComposerResult::None => {}
        }
        Ok(())
    }

    async fn handle_submit(&mut self, input: String) -> Result<()> {
        if let Some(command) = commands::parse_slash_command(&input) {
            self.handle_command(command);
            return Ok(());
        }

        match self.conversation.submit(&input) {
            Some(request) => {
                self.status = None;
                let rx = self.client.stream(request).await?;
                self.stream_rx = Some(rx);
            }
            None => {
                if self.conversation.is_busy() {
                    // Keep the typed text so nothing is lost.
                    self.composer.set_content(&input);
                    self.status =
                        Some("still streaming the previous reply, hang on".to_string());
                }
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::New => {
                self.conversation.reset_thread();
                self.status = Some("started a new thread".to_string());
            }
            SlashCommand::Help => {
                self.status = Some(commands::get_help_text());
            }
            SlashCommand::Quit => {
                self.should_quit = true;
            }
        }
    }
}
