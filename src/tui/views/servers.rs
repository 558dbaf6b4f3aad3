use crossterm::event::KeyCode;
use indexmap::IndexMap;
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

use super::{Theme, View};
use mcp_config_lib::{McpRegistry, ServerConfig};

/// Ordered server list inside the config panel.
pub struct ServersView {
    servers: IndexMap<String, ServerConfig>,
    table_state: TableState,
}

impl ServersView {
    pub fn new() -> Self {
        Self {
            servers: IndexMap::new(),
            table_state: TableState::default(),
        }
    }

    pub fn refresh(&mut self, registry: &McpRegistry) {
        self.servers = registry.servers().unwrap_or_default();

        // Keep the selection valid across mutations.
        if self.servers.is_empty() {
            self.table_state.select(None);
        } else {
            match self.table_state.selected() {
                None => self.table_state.select(Some(0)),
                Some(i) if i >= self.servers.len() => {
                    self.table_state.select(Some(self.servers.len() - 1));
                }
                Some(_) => {}
            }
        }
    }

    pub fn servers(&self) -> &IndexMap<String, ServerConfig> {
        &self.servers
    }

    pub fn selected(&self) -> Option<&ServerConfig> {
        let i = self.table_state.selected()?;
        let (_, server) = self.servers.get_index(i)?;
        Some(server)
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            _ => {}
        }
    }

    fn select_prev(&mut self) {
        if self.servers.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn select_next(&mut self) {
        if self.servers.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(self.servers.len() - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }
}

impl View for ServersView {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if self.servers.is_empty() {
            let empty = Paragraph::new("No servers configured.").style(theme.inactive);
            frame.render_widget(empty, area);
            return;
        }

        let header = Row::new(vec!["ID", "URL", "Status"]).style(theme.title);

        let rows: Vec<Row> = self
            .servers
            .values()
            .map(|server| {
                let (marker, style) = if server.enabled {
                    ("● Enabled", theme.success)
                } else {
                    ("○ Disabled", theme.error)
                };
                Row::new(vec![
                    Cell::from(server.id.as_str()),
                    Cell::from(server.url.as_str()),
                    Cell::from(marker).style(style),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(25),
                Constraint::Percentage(55),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .highlight_style(theme.selected)
        .highlight_symbol("> ");

        frame.render_stateful_widget(table, area, &mut self.table_state);
    }
}
