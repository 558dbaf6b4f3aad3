use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::mpsc;

use super::panel::ServerConfigPanel;
use super::shortcut::{shortcut_label, GlobalShortcut, ShortcutNotice};
use super::terminal;
use super::theme::{Theme, ThemeProvider};
use mcp_config_lib::{McpRegistry, Settings};

/// Commands delivered from outside the key-routing path, e.g. the shortcut
/// callback. Drained once per loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    Open,
}

pub struct App {
    pub panel: ServerConfigPanel,
    shortcut: GlobalShortcut,
    notice: ShortcutNotice,
    theme: Theme,
    commands: mpsc::UnboundedReceiver<PanelCommand>,
    command_tx: mpsc::UnboundedSender<PanelCommand>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        registry: Arc<McpRegistry>,
        themes: Option<&ThemeProvider>,
        settings: &Settings,
    ) -> Self {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let mut panel = ServerConfigPanel::new(themes);
        panel.bind_registry(registry);

        let theme = themes
            .map(|provider| Theme::from_palette(&provider.colors()))
            .unwrap_or_default();

        Self {
            panel,
            shortcut: GlobalShortcut::new(),
            notice: ShortcutNotice::new(settings.show_shortcut_notice),
            theme,
            commands,
            command_tx,
            should_quit: false,
        }
    }

    /// Sender half for [`PanelCommand`]s, used to wire the shortcut callback.
    pub fn command_sender(&self) -> mpsc::UnboundedSender<PanelCommand> {
        self.command_tx.clone()
    }

    pub fn set_shortcut_callback(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.shortcut.set_callback(callback);
    }

    pub fn register_shortcut(&mut self, now: Instant) {
        if self.shortcut.register() {
            self.notice.schedule(now);
        }
    }

    /// Per-loop housekeeping: queued commands, test results, notice timing.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                PanelCommand::Open => self.panel.open(),
            }
        }
        self.panel.poll_test_events();
        self.notice.tick(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.notice.is_visible() {
            self.notice.dismiss();
        }

        if self.panel.visible {
            self.panel.handle_key(key.code);
            return;
        }

        if self.shortcut.handle_key(&key) {
            return;
        }

        if key.code == KeyCode::Char('q') {
            self.should_quit = true;
        }
    }

    pub fn teardown(&mut self) {
        self.shortcut.unregister();
        self.notice.dismiss();
        self.panel.teardown();
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(frame.area());

        let header = Paragraph::new(format!(" MCP Config TUI v{}", env!("CARGO_PKG_VERSION")))
            .style(self.theme.title)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, chunks[0]);

        let body = Paragraph::new(format!(
            "Remote MCP tool servers are managed from the configuration panel.\n\n\
             Press {} to open it.",
            shortcut_label()
        ))
        .style(self.theme.normal)
        .block(Block::default().borders(Borders::ALL).title("Home"));
        frame.render_widget(body, chunks[1]);

        let hints = format!("{}:Server Config  q:Quit", shortcut_label());
        frame.render_widget(Paragraph::new(hints).style(self.theme.inactive), chunks[2]);

        self.panel.render(frame);
        self.render_notice(frame);
    }

    fn render_notice(&self, frame: &mut Frame) {
        if !self.notice.is_visible() {
            return;
        }

        let screen = frame.area();
        let width = 46.min(screen.width);
        let height = 5.min(screen.height);
        let area = Rect::new(
            screen.right().saturating_sub(width + 1),
            screen.bottom().saturating_sub(height + 1),
            width,
            height,
        );
        frame.render_widget(Clear, area);

        let text = format!(
            "Press {} to configure MCP servers\nPress Esc to close the settings",
            shortcut_label()
        );
        let notice = Paragraph::new(text).style(self.theme.normal).block(
            Block::default()
                .title("MCP Tools Enabled")
                .borders(Borders::ALL)
                .style(self.theme.info),
        );
        frame.render_widget(notice, area);
    }
}

pub async fn run(
    registry: Arc<McpRegistry>,
    themes: ThemeProvider,
    settings: Settings,
) -> Result<()> {
    let mut terminal = terminal::init()?;
    let mut app = App::new(registry, Some(&themes), &settings);

    // Default shortcut wiring: fire-and-forget open command.
    let opener = app.command_sender();
    app.set_shortcut_callback(Box::new(move || {
        let _ = opener.send(PanelCommand::Open);
    }));
    app.register_shortcut(Instant::now());

    loop {
        app.tick(Instant::now());
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.teardown();
    terminal::restore(&mut terminal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use crossterm::event::{KeyEventState, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use mcp_config_lib::Database;

    fn test_app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("servers.db")).unwrap();
        let registry =
            Arc::new(McpRegistry::new(Arc::new(db), StdDuration::from_secs(10)).unwrap());
        let app = App::new(registry, None, &Settings::default());
        (dir, app)
    }

    fn wire_shortcut(app: &mut App) {
        let opener = app.command_sender();
        app.set_shortcut_callback(Box::new(move || {
            let _ = opener.send(PanelCommand::Open);
        }));
        app.register_shortcut(Instant::now());
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn shortcut_opens_panel_via_command() {
        let (_dir, mut app) = test_app();
        wire_shortcut(&mut app);

        app.handle_key(press(KeyCode::Char('m'), KeyModifiers::CONTROL));
        assert!(!app.panel.visible);

        app.tick(Instant::now());
        assert!(app.panel.visible);
    }

    #[test]
    fn quit_only_when_panel_closed() {
        let (_dir, mut app) = test_app();
        wire_shortcut(&mut app);

        app.handle_key(press(KeyCode::Char('m'), KeyModifiers::CONTROL));
        app.tick(Instant::now());

        // 'q' inside the panel closes it, not the app.
        app.handle_key(press(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.panel.visible);
        assert!(!app.should_quit);

        app.handle_key(press(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(app.should_quit);
    }

    #[test]
    fn teardown_is_idempotent_and_disables_shortcut() {
        let (_dir, mut app) = test_app();
        wire_shortcut(&mut app);

        app.teardown();
        app.teardown();

        app.handle_key(press(KeyCode::Char('m'), KeyModifiers::CONTROL));
        app.tick(Instant::now());
        assert!(!app.panel.visible);
    }

    #[test]
    fn renders_home_screen() {
        let (_dir, mut app) = test_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("MCP Config TUI"));
        assert!(text.contains("to open it"));
    }
}
