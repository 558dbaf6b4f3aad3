use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use url::Url;

use super::Theme;
use crate::tui::centered_fixed;
use crate::tui::widgets::TextInput;
use mcp_config_lib::{McpRegistry, ServerConfig};

#[derive(Clone, Copy, PartialEq)]
pub enum FormMode {
    Add,
    Edit,
}

#[derive(Clone, Copy, PartialEq)]
enum FormField {
    Id,
    Url,
    ApiKey,
    Enabled,
}

impl FormField {
    /// The id identifies the server and is locked once created, so edit
    /// mode skips it during navigation.
    fn next(&self, locked_id: bool) -> Self {
        let next = match self {
            Self::Id => Self::Url,
            Self::Url => Self::ApiKey,
            Self::ApiKey => Self::Enabled,
            Self::Enabled => Self::Id,
        };
        if locked_id && next == Self::Id {
            Self::Url
        } else {
            next
        }
    }

    fn prev(&self, locked_id: bool) -> Self {
        let prev = match self {
            Self::Id => Self::Enabled,
            Self::Url => Self::Id,
            Self::ApiKey => Self::Url,
            Self::Enabled => Self::ApiKey,
        };
        if locked_id && prev == Self::Id {
            Self::Enabled
        } else {
            prev
        }
    }
}

/// Add/edit form rendered as a popup inside the config panel.
pub struct ServerForm {
    pub mode: FormMode,
    pub visible: bool,
    edit_id: Option<String>,
    active_field: FormField,
    id: TextInput,
    url: TextInput,
    api_key: TextInput,
    enabled: bool,
    pub message: Option<String>,
}

impl ServerForm {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Add,
            visible: false,
            edit_id: None,
            active_field: FormField::Id,
            id: TextInput::new("Server ID"),
            url: TextInput::new("Server URL"),
            api_key: TextInput::new("API Key").masked(),
            enabled: true,
            message: None,
        }
    }

    pub fn open_add(&mut self) {
        self.mode = FormMode::Add;
        self.visible = true;
        self.edit_id = None;
        self.active_field = FormField::Id;
        self.id.clear();
        self.url = TextInput::with_value("Server URL", "https://");
        self.api_key = TextInput::new("API Key").masked();
        self.enabled = true;
        self.message = None;
    }

    pub fn open_edit(&mut self, server: &ServerConfig) {
        self.mode = FormMode::Edit;
        self.visible = true;
        self.edit_id = Some(server.id.clone());
        self.active_field = FormField::Url;
        self.id = TextInput::with_value("Server ID", &server.id);
        self.url = TextInput::with_value("Server URL", &server.url);
        self.api_key =
            TextInput::with_value("API Key", server.api_key.as_deref().unwrap_or("")).masked();
        self.enabled = server.enabled;
        self.message = None;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.message = None;
    }

    fn id_locked(&self) -> bool {
        self.mode == FormMode::Edit
    }

    fn active_input(&mut self) -> Option<&mut TextInput> {
        match self.active_field {
            FormField::Id => Some(&mut self.id),
            FormField::Url => Some(&mut self.url),
            FormField::ApiKey => Some(&mut self.api_key),
            FormField::Enabled => None,
        }
    }

    /// Returns true when a save went through and the list should refresh.
    pub fn handle_key(&mut self, key: KeyCode, registry: &McpRegistry) -> bool {
        match key {
            KeyCode::Esc => {
                self.close();
                false
            }
            KeyCode::Tab | KeyCode::Down => {
                self.active_field = self.active_field.next(self.id_locked());
                false
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.active_field = self.active_field.prev(self.id_locked());
                false
            }
            KeyCode::Enter => self.submit(registry),
            KeyCode::Char(' ') if self.active_field == FormField::Enabled => {
                self.enabled = !self.enabled;
                false
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.active_input() {
                    input.insert(c);
                }
                false
            }
            KeyCode::Backspace => {
                if let Some(input) = self.active_input() {
                    input.backspace();
                }
                false
            }
            KeyCode::Delete => {
                if let Some(input) = self.active_input() {
                    input.delete();
                }
                false
            }
            KeyCode::Left => {
                if let Some(input) = self.active_input() {
                    input.move_left();
                }
                false
            }
            KeyCode::Right => {
                if let Some(input) = self.active_input() {
                    input.move_right();
                }
                false
            }
            KeyCode::Home => {
                if let Some(input) = self.active_input() {
                    input.home();
                }
                false
            }
            KeyCode::End => {
                if let Some(input) = self.active_input() {
                    input.end();
                }
                false
            }
            _ => false,
        }
    }

    fn submit(&mut self, registry: &McpRegistry) -> bool {
        // Edit never rewrites the identity, whatever the id input holds.
        let id = match &self.edit_id {
            Some(id) => id.clone(),
            None => self.id.value.trim().to_string(),
        };
        let url = self.url.value.trim().to_string();
        let api_key = self.api_key.value.trim().to_string();

        if id.is_empty() || url.is_empty() {
            self.message = Some("Server ID and URL are required.".to_string());
            return false;
        }
        if Url::parse(&url).is_err() {
            self.message =
                Some("Enter a valid URL with protocol (e.g. https://example.com/mcp)".to_string());
            return false;
        }

        let config = ServerConfig {
            id,
            url,
            api_key: (!api_key.is_empty()).then_some(api_key),
            enabled: self.enabled,
        };

        match registry.upsert(&config) {
            Ok(()) => {
                self.close();
                true
            }
            Err(e) => {
                log::error!("✗ Failed to save server {}: {e}", config.id);
                self.message = Some(format!("Save failed: {e}"));
                false
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, theme: &Theme) {
        if !self.visible {
            return;
        }

        let area = centered_fixed(60, 14, frame.area());
        frame.render_widget(Clear, area);

        let title = match self.mode {
            FormMode::Add => "Add MCP Server",
            FormMode::Edit => "Edit MCP Server",
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(theme.border);
        frame.render_widget(block, area);

        let inner = area.inner(Margin::new(2, 1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
            ])
            .split(inner);

        self.render_input(frame, chunks[0], &self.id, FormField::Id, theme);
        self.render_input(frame, chunks[1], &self.url, FormField::Url, theme);
        self.render_input(frame, chunks[2], &self.api_key, FormField::ApiKey, theme);

        let is_active = self.active_field == FormField::Enabled;
        let checkbox = format!("[{}] Enabled", if self.enabled { "x" } else { " " });
        let style = if is_active { theme.selected } else { theme.normal };
        frame.render_widget(Paragraph::new(checkbox).style(style), chunks[3]);

        if let Some(msg) = &self.message {
            let p = Paragraph::new(msg.as_str()).style(theme.error);
            frame.render_widget(p, chunks[4]);
        }

        let hints = Paragraph::new("Tab/↑↓:Navigate  Space:Toggle  Enter:Save  Esc:Cancel")
            .style(theme.inactive);
        frame.render_widget(hints, chunks[5]);
    }

    fn render_input(
        &self,
        frame: &mut Frame,
        area: Rect,
        input: &TextInput,
        field: FormField,
        theme: &Theme,
    ) {
        let locked = field == FormField::Id && self.id_locked();
        let is_active = self.active_field == field;
        let style = if locked {
            theme.inactive
        } else if is_active {
            theme.selected
        } else {
            theme.normal
        };

        let suffix = if locked { " (locked)" } else { "" };
        let text = format!("{}: {}{}", input.label, input.display(is_active), suffix);
        frame.render_widget(Paragraph::new(text).style(style), area);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use mcp_config_lib::Database;

    fn registry() -> (tempfile::TempDir, McpRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("servers.db")).unwrap();
        let registry = McpRegistry::new(Arc::new(db), Duration::from_secs(10)).unwrap();
        (dir, registry)
    }

    fn type_into(form: &mut ServerForm, registry: &McpRegistry, text: &str) {
        for c in text.chars() {
            form.handle_key(KeyCode::Char(c), registry);
        }
    }

    #[test]
    fn rejects_empty_url() {
        let (_dir, registry) = registry();
        let mut form = ServerForm::new();
        form.open_add();
        type_into(&mut form, &registry, "alpha");
        form.handle_key(KeyCode::Tab, &registry);
        for _ in 0.."https://".len() {
            form.handle_key(KeyCode::Backspace, &registry);
        }

        assert!(!form.handle_key(KeyCode::Enter, &registry));
        assert_eq!(
            form.message.as_deref(),
            Some("Server ID and URL are required.")
        );
        assert!(form.visible);
        assert!(registry.servers().unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_url() {
        let (_dir, registry) = registry();
        let mut form = ServerForm::new();
        form.open_add();
        type_into(&mut form, &registry, "alpha");
        form.handle_key(KeyCode::Tab, &registry);
        for _ in 0.."https://".len() {
            form.handle_key(KeyCode::Backspace, &registry);
        }
        type_into(&mut form, &registry, "not-a-url");

        assert!(!form.handle_key(KeyCode::Enter, &registry));
        assert!(form.message.as_deref().unwrap_or("").contains("valid URL"));
        assert!(registry.servers().unwrap().is_empty());
    }

    #[test]
    fn accepts_valid_url_and_persists() {
        let (_dir, registry) = registry();
        let mut form = ServerForm::new();
        form.open_add();
        type_into(&mut form, &registry, "alpha");
        form.handle_key(KeyCode::Tab, &registry);
        type_into(&mut form, &registry, "example.com/mcp");
        form.handle_key(KeyCode::Tab, &registry);
        type_into(&mut form, &registry, "  sk-key  ");

        assert!(form.handle_key(KeyCode::Enter, &registry));
        assert!(!form.visible);

        let servers = registry.servers().unwrap();
        let server = &servers["alpha"];
        assert_eq!(server.url, "https://example.com/mcp");
        assert_eq!(server.api_key.as_deref(), Some("sk-key"));
        assert!(server.enabled);
    }

    #[test]
    fn enabled_defaults_true_and_toggles() {
        let (_dir, registry) = registry();
        let mut form = ServerForm::new();
        form.open_add();
        type_into(&mut form, &registry, "alpha");
        form.handle_key(KeyCode::Tab, &registry);
        type_into(&mut form, &registry, "example.com/mcp");
        form.handle_key(KeyCode::Tab, &registry);
        form.handle_key(KeyCode::Tab, &registry);
        form.handle_key(KeyCode::Char(' '), &registry);

        assert!(form.handle_key(KeyCode::Enter, &registry));
        assert!(!registry.servers().unwrap()["alpha"].enabled);
    }

    #[test]
    fn edit_never_changes_id() {
        let (_dir, registry) = registry();
        registry
            .upsert(&ServerConfig {
                id: "alpha".to_string(),
                url: "https://a.example.com/mcp".to_string(),
                api_key: None,
                enabled: true,
            })
            .unwrap();

        let mut form = ServerForm::new();
        let existing = registry.servers().unwrap()["alpha"].clone();
        form.open_edit(&existing);

        // Force text into the (locked) id input behind the navigation guard.
        form.id.insert('X');
        type_into(&mut form, &registry, "2");

        assert!(form.handle_key(KeyCode::Enter, &registry));

        let servers = registry.servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert!(servers.contains_key("alpha"));
        assert_eq!(servers["alpha"].url, "https://a.example.com/mcp2");
    }

    #[test]
    fn cancel_leaves_registry_untouched() {
        let (_dir, registry) = registry();
        let mut form = ServerForm::new();
        form.open_add();
        type_into(&mut form, &registry, "alpha");

        form.handle_key(KeyCode::Esc, &registry);
        assert!(!form.visible);
        assert!(registry.servers().unwrap().is_empty());
    }
}
