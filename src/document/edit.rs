//! Splice planning for attribute edits

use std::ops::Range;

use super::{CallExpr, Value};

const DEFAULT_INDENT: &str = "    ";
const DEFAULT_SEPARATOR: &str = " = ";

/// Compute the byte range to replace and its replacement text for setting
/// `name = value` on `call`.
pub(crate) fn plan(src: &str, call: &CallExpr, name: &str, value: &Value) -> (Range<usize>, String) {
    let rendered = render(value);

    if let Some(arg) = call.attr(name) {
        return (arg.value_span.clone(), rendered);
    }

    let separator = call
        .args
        .iter()
        .rev()
        .find_map(|a| a.separator.as_deref())
        .unwrap_or(DEFAULT_SEPARATOR);
    let attr = format!("{name}{separator}{rendered}");

    let nl = newline(src, call);
    let Some(last) = call.args.last() else {
        let at = call.open_paren + 1;
        return if call.multiline {
            (at..at, format!("{nl}{DEFAULT_INDENT}{attr},"))
        } else {
            (at..at, attr)
        };
    };

    if !call.multiline {
        return match call.trailing_comma {
            Some(comma) => (comma..comma, format!(" {attr},")),
            None => (last.span.end..last.span.end, format!(", {attr}")),
        };
    }

    let indent = line_indent(src, last.span.start).unwrap_or(DEFAULT_INDENT);
    match call.trailing_comma {
        Some(comma) => {
            // After any comment that trails the comma on its line.
            let at = line_end(src, comma, call.close_paren).unwrap_or(comma);
            (at..at, format!("{nl}{indent}{attr},"))
        }
        None => match line_end(src, last.span.end, call.close_paren) {
            // The comma goes after the value; a trailing comment stays on its line.
            Some(eol) => {
                let rest = &src[last.span.end..eol];
                (last.span.end..eol, format!(",{rest}{nl}{indent}{attr}"))
            }
            None => (last.span.end..last.span.end, format!(",{nl}{indent}{attr}")),
        },
    }
}

/// Line break used inside `call`.
fn newline(src: &str, call: &CallExpr) -> &'static str {
    if src[call.open_paren..call.close_paren].contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// End of the line holding `from`, before its line break, if that break
/// comes before `limit`.
fn line_end(src: &str, from: usize, limit: usize) -> Option<usize> {
    let at = from + src[from..limit].find('\n')?;
    Some(if src[..at].ends_with('\r') { at - 1 } else { at })
}

/// Whitespace before `offset` when nothing else precedes it on its line.
fn line_indent(src: &str, offset: usize) -> Option<&str> {
    let line_start = src[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &src[line_start..offset];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}

pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::StringList(items) => {
            let items: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Other(raw) => raw.clone(),
    }
}

/// Double-quoted string literal.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x80 => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
