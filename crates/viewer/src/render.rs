use std::fmt::Write;

use thread::{ScrollViewport, ThreadEntry};

/// A terminal redraws from the top every time, so there is no offset to keep.
#[derive(Default)]
pub struct Terminal {
    offset: f64,
}

impl ScrollViewport for Terminal {
    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn scroll_to(&mut self, offset: f64) {
        self.offset = offset;
    }
}

pub fn render(subject: &str, entries: &[ThreadEntry]) -> String {
    let mut out = String::new();
    let total: usize = entries.iter().map(|e| 1 + e.reply_count).sum();
    let _ = writeln!(out, "== {} ({} comments) ==", subject, total);
    if entries.is_empty() {
        let _ = writeln!(out, "No comments yet.");
    }
    for entry in entries {
        write_entry(&mut out, entry, 0);
        for reply in &entry.replies {
            write_entry(&mut out, reply, 1);
        }
        if entry.reply_count > 0 && !entry.expanded {
            let _ = writeln!(out, "  ({} hidden replies)", entry.reply_count);
        }
    }
    out
}

fn write_entry(out: &mut String, entry: &ThreadEntry, depth: usize) {
    let indent = "  ".repeat(depth);
    let c = &entry.comment;
    let mine = if entry.is_own { " (you)" } else { "" };
    let _ = writeln!(
        out,
        "{indent}{}{mine} · {}",
        c.author_username,
        c.display_date()
    );
    for line in c.content.lines() {
        let _ = writeln!(out, "{indent}  {line}");
    }
}
