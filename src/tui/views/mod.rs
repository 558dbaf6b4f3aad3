mod server_form;
mod servers;

pub use server_form::{FormMode, ServerForm};
pub use servers::ServersView;

use ratatui::prelude::*;

use super::theme::Theme;

pub trait View {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);
}
