use crate::model::TaskId;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const SOFT_BREAK: &str = "  \n";
const HTML_BREAK: &str = "<br>\n";
const COMMENT_OPEN: &str = "<comment>";
const COMMENT_CLOSE: &str = "</comment>";

/// Inline text editing for one card. Holds the pre-edit text so a cancel
/// restores it byte for byte.
#[derive(Debug, Clone)]
pub struct EditSession {
    task_id: TaskId,
    snapshot: String,
    buffer: TextBuffer,
    height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Continue,
    /// Text committed while the field stays open.
    Applied(String),
    /// Edits discarded; carries the restored text.
    Cancelled(String),
}

#[derive(Debug, Clone)]
pub struct TextBuffer {
    value: String,
    cursor: usize,
}

impl EditSession {
    /// `height` is the card's rendered height in rows; the edit field uses it.
    pub fn begin(task_id: TaskId, text: &str, height: u16) -> Self {
        EditSession {
            task_id,
            snapshot: text.to_string(),
            buffer: TextBuffer::new(text),
            height,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.buffer.value
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn with_caret(&self) -> String {
        self.buffer.with_caret()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return EditOutcome::Cancelled(self.snapshot.clone()),
            KeyCode::Tab => return EditOutcome::Applied(self.buffer.value.clone()),
            KeyCode::Enter if ctrl && key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.buffer.append_comment_block();
            }
            // Without key disambiguation a terminal sends Ctrl+Enter as Ctrl+J.
            KeyCode::Enter | KeyCode::Char('j') if ctrl => {
                let br = if key.modifiers.contains(KeyModifiers::ALT) {
                    HTML_BREAK
                } else {
                    SOFT_BREAK
                };
                self.buffer.insert_str(br);
            }
            KeyCode::Enter => self.buffer.insert_char('\n'),
            KeyCode::Backspace => self.buffer.backspace(),
            KeyCode::Delete => self.buffer.delete(),
            KeyCode::Left => self.buffer.move_left(),
            KeyCode::Right => self.buffer.move_right(),
            KeyCode::Up => self.buffer.move_up(),
            KeyCode::Down => self.buffer.move_down(),
            KeyCode::Home => self.buffer.line_start(),
            KeyCode::End => self.buffer.line_end(),
            KeyCode::Char(ch) if !ctrl => self.buffer.insert_char(ch),
            _ => {}
        }
        EditOutcome::Continue
    }

    /// Focus left the field: the current contents become the task text.
    pub fn blur(self) -> (TaskId, String) {
        (self.task_id, self.buffer.value)
    }

    pub fn cancel(self) -> (TaskId, String) {
        (self.task_id, self.snapshot)
    }
}

impl TextBuffer {
    pub fn new(value: &str) -> Self {
        TextBuffer {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn line_start(&mut self) {
        let (line_starts, line_idx, _) = line_state(&self.value, self.cursor);
        self.cursor = line_starts[line_idx];
    }

    fn line_end(&mut self) {
        self.cursor = self.value[self.cursor..]
            .find('\n')
            .map(|idx| self.cursor + idx)
            .unwrap_or(self.value.len());
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn delete(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        let next = next_boundary(self.cursor, &self.value);
        self.value.drain(self.cursor..next);
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn insert_str(&mut self, s: &str) {
        self.value.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    /// Appends an empty hover comment and parks the cursor inside it.
    fn append_comment_block(&mut self) {
        self.value.push_str("\n\n");
        self.value.push_str(COMMENT_OPEN);
        self.value.push_str("\n\n");
        self.value.push_str(COMMENT_CLOSE);
        self.cursor = self.value.len() - COMMENT_CLOSE.len() - 1;
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}
