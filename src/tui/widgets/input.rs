/// Single-line text editor with a byte-offset cursor kept on char
/// boundaries.
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
    pub label: String,
    /// Render the value masked when the input is not active (secrets).
    pub masked: bool,
}

impl TextInput {
    pub fn new(label: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            label: label.to_string(),
            masked: false,
        }
    }

    pub fn with_value(label: &str, value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
            label: label.to_string(),
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn insert(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Value as shown in the form: cursor bar when active, masked when the
    /// input holds a secret and is not being edited.
    pub fn display(&self, active: bool) -> String {
        if active {
            format!("{}│{}", &self.value[..self.cursor], &self.value[self.cursor..])
        } else if self.masked && !self.value.is_empty() {
            mask_secret(&self.value)
        } else {
            self.value.clone()
        }
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}
