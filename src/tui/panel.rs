use std::sync::Arc;

use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};

use super::shortcut::shortcut_label;
use super::theme::{Palette, Theme, ThemeProvider};
use super::views::{ServerForm, ServersView, View};
use super::{centered_fixed, centered_rect};
use mcp_config_lib::{test_all, McpRegistry, ServerConfig, TestOutcome};

/// Progress and result messages from a spawned connection-test run.
#[derive(Debug)]
pub enum TestEvent {
    Testing(String),
    Finished(Vec<TestOutcome>),
}

/// Modal panel for managing the server list.
///
/// At most one instance is open at a time: `open` closes any previous one
/// before building the next. All nested surfaces (form, delete confirmation,
/// test report) live inside the OPEN state and reset on close.
pub struct ServerConfigPanel {
    registry: Option<Arc<McpRegistry>>,
    theme_rx: Option<watch::Receiver<Palette>>,
    theme: Theme,
    pub visible: bool,
    list: ServersView,
    form: ServerForm,
    confirm_delete: Option<String>,
    testing: bool,
    test_progress: Option<String>,
    test_rx: Option<mpsc::UnboundedReceiver<TestEvent>>,
    report: Option<Vec<String>>,
}

impl ServerConfigPanel {
    pub fn new(themes: Option<&ThemeProvider>) -> Self {
        let theme_rx = match themes {
            Some(provider) => Some(provider.subscribe()),
            None => {
                log::warn!("🎨 No theme provider available, falling back to the dark palette");
                None
            }
        };

        Self {
            registry: None,
            theme_rx,
            theme: Theme::default(),
            visible: false,
            list: ServersView::new(),
            form: ServerForm::new(),
            confirm_delete: None,
            testing: false,
            test_progress: None,
            test_rx: None,
            report: None,
        }
    }

    pub fn bind_registry(&mut self, registry: Arc<McpRegistry>) {
        self.registry = Some(registry);
    }

    /// Open the panel, closing any existing instance first.
    pub fn open(&mut self) {
        let Some(registry) = self.registry.clone() else {
            log::error!("📡 Server config panel: no registry bound");
            return;
        };

        if self.visible {
            self.close();
        }

        // Palette snapshot: theme changes while open apply on the next open.
        self.theme = match &self.theme_rx {
            Some(rx) => Theme::from_palette(&rx.borrow()),
            None => Theme::default(),
        };

        self.visible = true;
        self.list.refresh(&registry);
    }

    /// No-op when nothing is open. Dropping the test receiver means results
    /// from a still-running test task are discarded, never delivered.
    pub fn close(&mut self) {
        self.visible = false;
        self.form.close();
        self.confirm_delete = None;
        self.report = None;
        self.testing = false;
        self.test_progress = None;
        self.test_rx = None;
    }

    /// Release everything; safe to call any number of times.
    pub fn teardown(&mut self) {
        self.close();
        self.theme_rx = None;
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        if self.report.is_some() {
            if matches!(key, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                self.report = None;
            }
            return;
        }

        if let Some(id) = self.confirm_delete.take() {
            if matches!(key, KeyCode::Char('y') | KeyCode::Char('Y')) {
                if let Some(registry) = self.registry.clone() {
                    if let Err(e) = registry.remove(&id) {
                        log::error!("✗ Failed to delete server {id}: {e}");
                    }
                    self.list.refresh(&registry);
                }
            }
            return;
        }

        if self.form.visible {
            if let Some(registry) = self.registry.clone() {
                if self.form.handle_key(key, &registry) {
                    self.list.refresh(&registry);
                }
            }
            return;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.close(),
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('a') => self.form.open_add(),
            KeyCode::Char('e') => {
                if let Some(server) = self.list.selected().cloned() {
                    self.form.open_edit(&server);
                }
            }
            KeyCode::Char('d') => {
                self.confirm_delete = self.list.selected().map(|s| s.id.clone());
            }
            KeyCode::Char('t') => self.start_tests(),
            _ => self.list.handle_key(key),
        }
    }

    fn toggle_selected(&mut self) {
        let Some(registry) = self.registry.clone() else {
            return;
        };
        let Some((id, enabled)) = self.list.selected().map(|s| (s.id.clone(), s.enabled)) else {
            return;
        };
        if let Err(e) = registry.set_status(&id, !enabled) {
            log::error!("✗ Failed to toggle server {id}: {e}");
        }
        self.list.refresh(&registry);
    }

    /// Kick off a sequential test run over the enabled servers on a
    /// background task. Ignored while a run is already active.
    fn start_tests(&mut self) {
        if self.testing {
            return;
        }
        let Some(registry) = self.registry.clone() else {
            return;
        };

        let servers: Vec<ServerConfig> = self
            .list
            .servers()
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();

        let (tx, rx) = mpsc::unbounded_channel();
        self.testing = true;
        self.test_progress = Some("Testing...".to_string());
        self.test_rx = Some(rx);

        tokio::spawn(async move {
            let progress = tx.clone();
            let outcomes = test_all(registry.as_ref(), &servers, |id| {
                let _ = progress.send(TestEvent::Testing(id.to_string()));
            })
            .await;
            // The panel may have closed in the meantime; a dead channel
            // just drops the results.
            let _ = tx.send(TestEvent::Finished(outcomes));
        });
    }

    /// Drain pending test events. Called on every loop tick.
    pub fn poll_test_events(&mut self) {
        let Some(rx) = self.test_rx.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(TestEvent::Testing(id)) => {
                    self.test_progress = Some(format!("Testing {id}..."));
                }
                Ok(TestEvent::Finished(outcomes)) => {
                    self.testing = false;
                    self.test_progress = None;
                    self.test_rx = None;
                    let mut lines: Vec<String> =
                        outcomes.iter().map(TestOutcome::summary_line).collect();
                    if lines.is_empty() {
                        lines.push("No enabled servers to test.".to_string());
                    }
                    self.report = Some(lines);
                    return;
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    // Test task went away without a result; restore the
                    // idle state regardless.
                    self.testing = false;
                    self.test_progress = None;
                    self.test_rx = None;
                    return;
                }
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        if !self.visible {
            return;
        }

        let area = centered_rect(80, 80, frame.area());
        frame.render_widget(Clear, area);

        let title = format!(" MCP Server Configuration  [{}] ", shortcut_label());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(self.theme.border);
        frame.render_widget(block, area);

        let inner = area.inner(Margin::new(2, 1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // Server list
                Constraint::Length(1), // Test progress
                Constraint::Length(1), // Hints
            ])
            .split(inner);

        self.list.render(frame, chunks[0], &self.theme);

        if let Some(progress) = &self.test_progress {
            let p = Paragraph::new(progress.as_str()).style(self.theme.highlight);
            frame.render_widget(p, chunks[1]);
        }

        let hints = if self.testing {
            "↑↓:Select  Space:Toggle  a:Add  e:Edit  d:Delete  Esc:Close".to_string()
        } else {
            "↑↓:Select  Space:Toggle  a:Add  e:Edit  d:Delete  t:Test All  Esc:Close".to_string()
        };
        frame.render_widget(
            Paragraph::new(hints).style(self.theme.inactive),
            chunks[2],
        );

        self.form.render(frame, &self.theme);
        self.render_confirm(frame);
        self.render_report(frame);
    }

    fn render_confirm(&self, frame: &mut Frame) {
        let Some(id) = &self.confirm_delete else {
            return;
        };
        let area = centered_fixed(50, 5, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title("Delete Server")
            .borders(Borders::ALL)
            .style(self.theme.error);
        frame.render_widget(block, area);

        let inner = area.inner(Margin::new(2, 1));
        let text = format!("Delete server \"{id}\"?  y:Confirm  n:Cancel");
        frame.render_widget(Paragraph::new(text).style(self.theme.normal), inner);
    }

    fn render_report(&self, frame: &mut Frame) {
        let Some(lines) = &self.report else {
            return;
        };
        let height = (lines.len() as u16 + 4).min(frame.area().height);
        let area = centered_fixed(70, height, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title("Connection Test Results")
            .borders(Borders::ALL)
            .style(self.theme.border);
        frame.render_widget(block, area);

        let inner = area.inner(Margin::new(2, 1));
        let mut text: Vec<Line> = lines
            .iter()
            .map(|line| {
                let style = if line.starts_with('✓') {
                    self.theme.success
                } else if line.starts_with('✗') {
                    self.theme.error
                } else {
                    self.theme.normal
                };
                Line::styled(line.as_str(), style)
            })
            .collect();
        text.push(Line::styled("", self.theme.normal));
        text.push(Line::styled("Esc:Close", self.theme.inactive));
        frame.render_widget(Paragraph::new(text), inner);
    }

    #[cfg(test)]
    fn attach_test_channel(&mut self) -> mpsc::UnboundedSender<TestEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.testing = true;
        self.test_progress = Some("Testing...".to_string());
        self.test_rx = Some(rx);
        tx
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use mcp_config_lib::Database;

    fn registry_with(servers: &[(&str, bool)]) -> (tempfile::TempDir, Arc<McpRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("servers.db")).unwrap();
        for (id, enabled) in servers {
            db.upsert_server(&ServerConfig {
                id: id.to_string(),
                url: format!("https://{id}.example.com/mcp"),
                api_key: None,
                enabled: *enabled,
            })
            .unwrap();
        }
        let registry = McpRegistry::new(Arc::new(db), Duration::from_secs(10)).unwrap();
        (dir, Arc::new(registry))
    }

    fn open_panel(servers: &[(&str, bool)]) -> (tempfile::TempDir, Arc<McpRegistry>, ServerConfigPanel) {
        let (dir, registry) = registry_with(servers);
        let mut panel = ServerConfigPanel::new(None);
        panel.bind_registry(registry.clone());
        panel.open();
        (dir, registry, panel)
    }

    fn rendered(panel: &mut ServerConfigPanel) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| panel.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn open_without_registry_aborts() {
        let mut panel = ServerConfigPanel::new(None);
        panel.open();
        assert!(!panel.visible);
    }

    #[test]
    fn open_twice_keeps_single_instance() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        panel.handle_key(KeyCode::Char('a'));
        assert!(panel.form.visible);

        // Re-opening closes the first instance, so nested state resets.
        panel.open();
        assert!(panel.visible);
        assert!(!panel.form.visible);
    }

    #[test]
    fn escape_closes_panel() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        panel.handle_key(KeyCode::Esc);
        assert!(!panel.visible);
    }

    #[test]
    fn toggle_flips_only_selected_entry() {
        let (_dir, registry, mut panel) = open_panel(&[("alpha", true), ("beta", true)]);

        panel.handle_key(KeyCode::Char(' '));

        let servers = registry.servers().unwrap();
        assert!(!servers["alpha"].enabled);
        assert!(servers["beta"].enabled);
    }

    #[test]
    fn delete_requires_confirmation() {
        let (_dir, registry, mut panel) = open_panel(&[("alpha", true)]);

        panel.handle_key(KeyCode::Char('d'));
        panel.handle_key(KeyCode::Char('n'));
        assert_eq!(registry.servers().unwrap().len(), 1);

        panel.handle_key(KeyCode::Char('d'));
        panel.handle_key(KeyCode::Char('y'));
        assert!(registry.servers().unwrap().is_empty());
    }

    #[test]
    fn renders_entries_and_modal_chrome() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true), ("beta", false)]);
        let text = rendered(&mut panel);
        assert!(text.contains("MCP Server Configuration"));
        assert!(text.contains("alpha"));
        assert!(text.contains("beta"));
    }

    #[test]
    fn edit_opens_form_prefilled() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        panel.handle_key(KeyCode::Char('e'));
        assert!(panel.form.visible);

        let text = rendered(&mut panel);
        assert!(text.contains("Edit MCP Server"));
        assert!(text.contains("(locked)"));
    }

    #[tokio::test]
    async fn test_key_is_inert_while_testing() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        let _tx = panel.attach_test_channel();
        assert!(panel.testing);

        // A second 't' must not replace the active run's channel.
        panel.handle_key(KeyCode::Char('t'));
        assert!(panel.test_rx.is_some());
        assert!(panel.testing);
    }

    #[tokio::test]
    async fn test_events_drive_progress_and_report() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        let tx = panel.attach_test_channel();

        tx.send(TestEvent::Testing("alpha".to_string())).unwrap();
        panel.poll_test_events();
        assert_eq!(panel.test_progress.as_deref(), Some("Testing alpha..."));

        tx.send(TestEvent::Finished(vec![
            TestOutcome::Passed {
                id: "alpha".to_string(),
                tools: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            },
            TestOutcome::Failed {
                id: "beta".to_string(),
                message: "timeout".to_string(),
            },
        ]))
        .unwrap();
        panel.poll_test_events();

        assert!(!panel.testing);
        let report = panel.report.as_ref().unwrap();
        assert!(report[0].contains("3 tools"));
        assert!(report[1].contains("timeout"));

        let text = rendered(&mut panel);
        assert!(text.contains("Connection Test Results"));
    }

    #[tokio::test]
    async fn results_after_close_are_discarded() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        let tx = panel.attach_test_channel();

        panel.close();
        // The receiver is gone; delivery fails quietly instead of buffering.
        assert!(tx.send(TestEvent::Finished(Vec::new())).is_err());

        panel.poll_test_events();
        panel.open();
        assert!(panel.report.is_none());
        assert!(!panel.testing);
    }

    #[tokio::test]
    async fn dead_test_task_restores_idle_state() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        let tx = panel.attach_test_channel();
        drop(tx);

        panel.poll_test_events();
        assert!(!panel.testing);
        assert!(panel.test_rx.is_none());
    }

    #[test]
    fn teardown_is_idempotent() {
        let (_dir, _registry, mut panel) = open_panel(&[("alpha", true)]);
        panel.teardown();
        panel.teardown();
        assert!(!panel.visible);
        assert!(panel.theme_rx.is_none());
    }
}
