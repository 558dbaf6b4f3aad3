use ratatui::style::{Color, Modifier, Style};
use tokio::sync::watch;

/// Flat mapping of semantic color names, replaced wholesale on theme change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub primary: Color,
    pub accent: Color,
    pub success: Color,
    pub danger: Color,
    pub info: Color,
    pub text: Color,
    pub text_secondary: Color,
    pub border: Color,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            primary: Color::Cyan,
            accent: Color::Yellow,
            success: Color::Green,
            danger: Color::Red,
            info: Color::Blue,
            text: Color::White,
            text_secondary: Color::DarkGray,
            border: Color::Gray,
        }
    }

    pub fn light() -> Self {
        Self {
            primary: Color::Blue,
            accent: Color::Magenta,
            success: Color::Green,
            danger: Color::Red,
            info: Color::Cyan,
            text: Color::Black,
            text_secondary: Color::Gray,
            border: Color::DarkGray,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

/// Ratatui styles derived from a palette snapshot.
pub struct Theme {
    pub title: Style,
    pub selected: Style,
    pub normal: Style,
    pub highlight: Style,
    pub inactive: Style,
    pub success: Style,
    pub error: Style,
    pub border: Style,
    pub info: Style,
}

impl Theme {
    pub fn from_palette(palette: &Palette) -> Self {
        Self {
            title: Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
            selected: Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
            normal: Style::default().fg(palette.text),
            highlight: Style::default().fg(palette.success),
            inactive: Style::default().fg(palette.text_secondary),
            success: Style::default().fg(palette.success),
            error: Style::default().fg(palette.danger),
            border: Style::default().fg(palette.border),
            info: Style::default().fg(palette.info),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_palette(&Palette::default())
    }
}

/// Live source of the active palette.
///
/// Subscribers get a `watch` receiver; the panel reads the latest value when
/// it opens, so palette changes apply on the next open rather than recoloring
/// an already-open panel.
pub struct ThemeProvider {
    tx: watch::Sender<Palette>,
}

impl ThemeProvider {
    pub fn new(palette: Palette) -> Self {
        let (tx, _rx) = watch::channel(palette);
        Self { tx }
    }

    pub fn colors(&self) -> Palette {
        self.tx.borrow().clone()
    }

    pub fn set_palette(&self, palette: Palette) {
        self.tx.send_replace(palette);
    }

    pub fn subscribe(&self) -> watch::Receiver<Palette> {
        self.tx.subscribe()
    }
}
