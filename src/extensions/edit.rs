//! Inline text editing inside a node.

use egui::Key;

use crate::host::KeyInput;

/// Result of feeding a key to an [`EditSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The key changed the buffer or the cursor.
    Edited,
    /// The user asked to keep the edit.
    Commit,
    /// The user asked to throw the edit away.
    Cancel,
    /// The key means nothing to the editor.
    Unhandled,
}

/// A text buffer with a cursor, counted in characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditSession<T> {
    pub target: T,
    buffer: String,
    cursor: usize,
    multiline: bool,
}

impl<T> EditSession<T> {
    /// Starts editing `text` with the cursor at the end.
    pub fn new(target: T, text: &str) -> Self {
        Self {
            target,
            buffer: text.to_string(),
            cursor: text.chars().count(),
            multiline: false,
        }
    }

    /// Allow Shift+Enter to insert line breaks.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn into_text(self) -> String {
        self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The buffer up to the cursor, for placing the caret.
    pub fn text_before_cursor(&self) -> &str {
        &self.buffer[..self.byte_offset(self.cursor)]
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(chars)
            .map_or(self.buffer.len(), |(i, _)| i)
    }

    pub fn insert(&mut self, text: &str) {
        let text: String = text
            .chars()
            .filter(|c| !c.is_control() || (self.multiline && *c == '\n'))
            .collect();
        let at = self.byte_offset(self.cursor);
        self.buffer.insert_str(at, &text);
        self.cursor += text.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_offset(self.cursor - 1);
            self.buffer.remove(at);
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_offset(self.cursor);
            self.buffer.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    /// Applies one keyboard event.
    pub fn handle(&mut self, input: &KeyInput) -> EditOutcome {
        match input {
            KeyInput::Text(text) => {
                self.insert(text);
                EditOutcome::Edited
            }
            KeyInput::Key { key, modifiers } => match key {
                Key::Enter if modifiers.shift && self.multiline => {
                    self.insert("\n");
                    EditOutcome::Edited
                }
                Key::Enter => EditOutcome::Commit,
                Key::Escape => EditOutcome::Cancel,
                Key::Backspace => {
                    self.backspace();
                    EditOutcome::Edited
                }
                Key::Delete => {
                    self.delete();
                    EditOutcome::Edited
                }
                Key::ArrowLeft => {
                    self.left();
                    EditOutcome::Edited
                }
                Key::ArrowRight => {
                    self.right();
                    EditOutcome::Edited
                }
                Key::Home => {
                    self.home();
                    EditOutcome::Edited
                }
                Key::End => {
                    self.end();
                    EditOutcome::Edited
                }
                _ => EditOutcome::Unhandled,
            },
        }
    }
}
