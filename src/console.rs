//! The console host: output buffering with 80-column greedy word-wrap, and
//! the score-delta splice that rewrites a bracketed status message into the
//! transcript just before a trailing `>` prompt.

use std::io::{self, Write};

const WRAP_COLUMN: usize = 80;

pub struct Console {
    buffer: String,
}

impl Console {
    pub fn new() -> Console {
        Console { buffer: String::new() }
    }

    /// Append text to the pending output buffer without flushing.
    pub fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn new_line(&mut self) {
        self.buffer.push('\n');
    }

    /// Greedy word-wrap the buffer to `WRAP_COLUMN`, write it to stdout, and
    /// clear it. Called before `sread`, at `quit`, and at process exit.
    pub fn flush(&mut self) {
        self.flush_with_score_splice(None);
    }

    /// Same as `flush`, but when `score_message` is present and the wrapped
    /// output ends in a bare `>` prompt, splices `[score_message]` onto its
    /// own line just before that prompt. If the output does not end with a
    /// bare `>`, the message is silently dropped.
    pub fn flush_with_score_splice(&mut self, score_message: Option<&str>) {
        if self.buffer.is_empty() && score_message.is_none() {
            return;
        }
        let wrapped = word_wrap(&self.buffer, WRAP_COLUMN);
        let out = match score_message {
            Some(msg) => splice_score_message(&wrapped, msg),
            None => wrapped,
        };
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(out.as_bytes());
        let _ = lock.flush();
        self.buffer.clear();
    }

    pub fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Greedy word-wrap: break only at whitespace, never mid-word, preserving
/// any explicit newlines already in `text`.
fn word_wrap(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut col = 0;
        for (j, word) in line.split(' ').enumerate() {
            if j > 0 {
                if col + 1 + word.len() > width && col > 0 {
                    out.push('\n');
                    col = 0;
                } else {
                    out.push(' ');
                    col += 1;
                }
            }
            out.push_str(word);
            col += word.len();
        }
    }
    out
}

/// If `wrapped` ends with a bare `>` prompt (possibly preceded by a space),
/// insert `[message]` on its own line immediately before it. Otherwise
/// return `wrapped` unchanged.
fn splice_score_message(wrapped: &str, message: &str) -> String {
    let trimmed_end = wrapped.trim_end_matches(' ');
    if let Some(prefix) = trimmed_end.strip_suffix('>') {
        format!("{prefix}[{message}]\n>")
    } else {
        wrapped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_wrap_breaks_at_whitespace_only() {
        let text = "the quick brown fox jumps over the lazy dog and then keeps running";
        let wrapped = word_wrap(text, 20);
        for line in wrapped.split('\n') {
            assert!(line.len() <= 20, "line too long: {line:?}");
        }
        assert_eq!(wrapped.replace('\n', " "), text);
    }

    #[test]
    fn splice_inserts_before_bare_prompt() {
        let out = splice_score_message("Look around.\n>", "Score: 10");
        assert_eq!(out, "Look around.\n[Score: 10]\n>");
    }

    #[test]
    fn splice_is_dropped_when_no_bare_prompt() {
        let out = splice_score_message("Look around.\n", "Score: 10");
        assert_eq!(out, "Look around.\n");
    }
}
