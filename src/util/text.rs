use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Placeholder shown for a missing posting attribute.
pub const NOT_SPECIFIED: &str = "Not specified";

const ELLIPSIS: &str = "...";

/// Terminal-safe rendering of server-provided text.
///
/// Drops C0 controls (except tab and newline), DEL, and whole ANSI CSI/OSC
/// escape sequences so posting data cannot move the cursor or retitle the
/// terminal. Clean input is returned borrowed.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameters run until a final byte in '@'..='~'
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    // Terminated by BEL or ESC '\'
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_unsafe(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_unsafe(c: char) -> bool {
    (c.is_ascii_control() && c != '\t' && c != '\n') || c == '\x1b'
}

/// Sanitized value, or [`NOT_SPECIFIED`] when absent or empty.
///
/// Whitespace-only values are shown as they are.
pub fn or_not_specified(value: Option<&str>) -> Cow<'_, str> {
    match value {
        Some(v) if !v.is_empty() => sanitize(v),
        _ => Cow::Borrowed(NOT_SPECIFIED),
    }
}

/// Cut `s` to at most `max_width` terminal columns, ending in `...` when cut.
///
/// Wide characters are never split. Widths of 3 or fewer get no ellipsis.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let ellipsis_width = ELLIPSIS.len();
    let (budget, suffix) = if max_width > ellipsis_width {
        (max_width - ellipsis_width, ELLIPSIS)
    } else {
        (max_width, "")
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}
