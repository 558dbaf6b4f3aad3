use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Delay before the one-time notice appears after shortcut registration.
const NOTICE_DELAY: Duration = Duration::from_secs(5);
/// How long the notice stays up before auto-dismissing.
const NOTICE_DURATION: Duration = Duration::from_secs(8);

/// Human-readable name of the panel shortcut on this platform.
pub fn shortcut_label() -> &'static str {
    if cfg!(target_os = "macos") {
        "Control+M"
    } else {
        "Ctrl+M"
    }
}

fn matches_shortcut(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('m') | KeyCode::Char('M'))
}

/// Application-wide open-panel shortcut.
///
/// There is exactly one of these per app; registering again replaces the
/// stored callback binding rather than stacking a second handler.
pub struct GlobalShortcut {
    callback: Option<Box<dyn FnMut() + Send>>,
    registered: bool,
}

impl GlobalShortcut {
    pub fn new() -> Self {
        Self {
            callback: None,
            registered: false,
        }
    }

    pub fn set_callback(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.callback = Some(callback);
    }

    /// Activate the shortcut. Fails (logged, no panic) when no callback has
    /// been set yet.
    pub fn register(&mut self) -> bool {
        if self.callback.is_none() {
            log::error!("📡 No callback set for the server config shortcut");
            return false;
        }
        self.registered = true;
        log::info!("📡 Keyboard shortcut registered: {}", shortcut_label());
        true
    }

    pub fn unregister(&mut self) {
        self.registered = false;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Fire the callback when the key matches. Returns true when the key
    /// was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.registered || !matches_shortcut(key) {
            return false;
        }
        if let Some(callback) = &mut self.callback {
            callback();
        }
        true
    }
}

/// One-time transient notice describing the shortcut.
///
/// Scheduled shortly after registration, auto-dismissed after a few seconds,
/// dismissible early by any key. Instants are passed in for testability.
pub struct ShortcutNotice {
    enabled: bool,
    fired: bool,
    show_at: Option<Instant>,
    hide_at: Option<Instant>,
    visible: bool,
}

impl ShortcutNotice {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fired: false,
            show_at: None,
            hide_at: None,
            visible: false,
        }
    }

    /// Arm the notice; only the first call after construction has an effect.
    pub fn schedule(&mut self, now: Instant) {
        if !self.enabled || self.fired {
            return;
        }
        self.fired = true;
        self.show_at = Some(now + NOTICE_DELAY);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(at) = self.show_at {
            if now >= at {
                self.show_at = None;
                self.visible = true;
                self.hide_at = Some(now + NOTICE_DURATION);
            }
        }
        if let Some(at) = self.hide_at {
            if now >= at {
                self.hide_at = None;
                self.visible = false;
            }
        }
    }

    pub fn dismiss(&mut self) {
        self.show_at = None;
        self.hide_at = None;
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
