/*!
format.rs

Rendering primitives for the human output paths.

Goals:
  - Centralize style decisions (NO_COLOR, COLUMNS/LINES detection).
  - Keep zero non-std dependencies; degrade gracefully without ANSI.
  - Page long stdout through $PAGER so interactive results stay scrollable.

Public API:
  - StyleOptions::detect() -> StyleOptions
  - color(role, text, &StyleOptions) -> String
  - table(headers, rows, &StyleOptions) -> String
  - wrap_text(s, max_width) -> Vec<String>
  - escape_control(s) -> String
  - page(content, &StyleOptions) -> io::Result<()>

JSON output paths do not use these helpers, keeping machine output clean.
*/

use std::borrow::Cow;
use std::io::{self, IsTerminal, Write};
use std::process::{Command, Stdio};

/* ---- Style Options ---- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
    pub term_height: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none();

        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 200))
            .unwrap_or(80);

        let term_height = std::env::var("LINES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|h| h.clamp(10, 100))
            .unwrap_or(24);

        StyleOptions {
            use_color,
            term_width,
            term_height,
        }
    }
}

/* ---- Color ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Heading,
    Accent,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Heading => "1",
        Role::Accent => "36",
        Role::Error => "31",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/* ---- Table ---- */

/// Two-space separated columns, header underlined with dashes, shrunk from
/// the widest column when the terminal is narrower than the content.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let gutter = (cols - 1) * 2;
    let mut total: usize = widths.iter().sum::<usize>() + gutter;
    while total > style.term_width {
        let Some((widest, _)) = widths
            .iter()
            .enumerate()
            .max_by_key(|(_, w)| **w)
            .filter(|(_, w)| **w > 8)
        else {
            break;
        };
        widths[widest] -= 1;
        total -= 1;
    }

    let mut out = String::new();
    for (i, h) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(&color(Role::Heading, cell_fit(h, widths[i]), style));
    }
    out.push('\n');
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(&color(Role::Dim, "-".repeat(*w), style));
    }
    for row in rows {
        out.push('\n');
        for c in 0..cols {
            if c > 0 {
                out.push_str("  ");
            }
            let raw = row.get(c).map(String::as_str).unwrap_or("");
            out.push_str(&cell_fit(raw, widths[c]));
        }
    }
    out
}

fn cell_fit(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    if width <= 1 {
        return "…".to_string();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

/* ---- Text Helpers ---- */

/// Greedy word wrap. Words longer than the width get their own line.
pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Neutralize terminal control characters in untrusted display text.
pub fn escape_control(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '\x1b' {
                "\\e".to_string()
            } else if c.is_control() && c != '\n' && c != '\t' {
                format!("\\x{:02x}", c as u32)
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if t.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* ---- Paging ---- */

/// Write content to stdout, through `$PAGER` (default `less`) when the
/// output is a terminal and too tall to fit. Pager spawn failures fall back
/// to a plain write.
pub fn page(content: &str, style: &StyleOptions) -> io::Result<()> {
    let mut stdout = io::stdout();
    let needs_pager =
        stdout.is_terminal() && content.lines().count() + 1 >= style.term_height;
    if !needs_pager {
        return write_plain(&mut stdout, content);
    }

    let pager = std::env::var("PAGER")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "less".to_string());
    let parts = shell_words::split(&pager).unwrap_or_else(|_| vec![pager.clone()]);
    let Some((program, pager_args)) = parts.split_first() else {
        return write_plain(&mut stdout, content);
    };

    let mut command = Command::new(program);
    command.args(pager_args);
    if program == "less" && pager_args.is_empty() {
        command.args(["-R", "-F", "-X"]);
    }
    command.stdin(Stdio::piped());

    match command.spawn() {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                // The pager may quit early; a broken pipe here is not an error.
                let _ = stdin.write_all(content.as_bytes());
            }
            drop(child.stdin.take());
            let _ = child.wait();
            Ok(())
        }
        Err(_) => write_plain(&mut stdout, content),
    }
}

fn write_plain(out: &mut impl Write, content: &str) -> io::Result<()> {
    out.write_all(content.as_bytes())?;
    if !content.is_empty() && !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/* ---- Tests ---- */
