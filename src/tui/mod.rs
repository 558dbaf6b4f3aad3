mod app;
pub mod panel;
mod shortcut;
mod terminal;
pub mod theme;
pub mod views;
pub mod widgets;

pub use app::run;

use ratatui::prelude::Rect;

/// Rect centered in `r`, sized as percentages of it.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    let height = r.height * percent_y / 100;
    let x = (r.width.saturating_sub(width)) / 2;
    let y = (r.height.saturating_sub(height)) / 2;
    Rect::new(r.x + x, r.y + y, width, height)
}

/// Rect centered in `r` with a fixed height and percentage width.
pub(crate) fn centered_fixed(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    let height = height.min(r.height);
    let x = (r.width.saturating_sub(width)) / 2;
    let y = (r.height.saturating_sub(height)) / 2;
    Rect::new(r.x + x, r.y + y, width, height)
}
