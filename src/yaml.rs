//! Minimal YAML writer for the documents this crate builds.
//!
//! Walks a `serde_json::Value` (insertion-ordered, see the `preserve_order`
//! feature) and writes block-style YAML. Not a general YAML serializer:
//! there are no anchors, multi-line scalars or flow collections beyond `[]`
//! and `{}` for empty ones.
//!
//! Rules:
//! - null values are omitted entirely
//! - a map inside a sequence starts on the `- ` line, its other keys are
//!   indented to line up under the first one
//! - strings that YAML would misread (containing `:`, `#`, `-` or a control
//!   character, empty, number-like, boolean-like, or starting with an
//!   indicator character) are double-quoted
//! - under a `rules` key only, a string item starting with `#` is written as
//!   a YAML comment line, not as an item

use std::fmt::Write;

use serde_json::{Map, Value};

const INDENT: &str = "  ";

/// Characters that change meaning at the start of a plain scalar
const INDICATORS: &[char] = &[
    '[', ']', '{', '}', ',', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`', '?',
];

/// Sequence whose `#` items are comments rather than values
const COMMENT_KEY: &str = "rules";

const RESERVED_WORDS: &[&str] = &["true", "false", "null", "~", "yes", "no", "on", "off"];

/// Render `value` as YAML.
pub fn to_yaml(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Null => {}
        Value::Object(map) => write_map(&mut out, map, 0),
        Value::Array(items) => write_seq(&mut out, items, 0, false),
        scalar => {
            out.push_str(&scalar_to_string(scalar));
            out.push('\n');
        }
    }
    out
}

fn write_map(out: &mut String, map: &Map<String, Value>, indent: usize) {
    let pad = INDENT.repeat(indent);
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) if items.is_empty() => {
                let _ = writeln!(out, "{}{}: []", pad, key);
            }
            Value::Array(items) => {
                let _ = writeln!(out, "{}{}:", pad, key);
                write_seq(out, items, indent + 1, key == COMMENT_KEY);
            }
            Value::Object(inner) if inner.is_empty() => {
                let _ = writeln!(out, "{}{}: {{}}", pad, key);
            }
            Value::Object(inner) => {
                let _ = writeln!(out, "{}{}:", pad, key);
                write_map(out, inner, indent + 1);
            }
            scalar => {
                let _ = writeln!(out, "{}{}: {}", pad, key, scalar_to_string(scalar));
            }
        }
    }
}

fn write_seq(out: &mut String, items: &[Value], indent: usize, comments: bool) {
    let pad = INDENT.repeat(indent);
    for item in items {
        match item {
            Value::Null => {}
            Value::String(s) if comments && s.starts_with('#') && !s.contains('\n') => {
                let _ = writeln!(out, "{}{}", pad, s);
            }
            Value::Object(inner) => {
                let mut nested = String::new();
                write_map(&mut nested, inner, indent + 1);
                if nested.is_empty() {
                    let _ = writeln!(out, "{}- {{}}", pad);
                    continue;
                }
                // First key moves onto the dash line, the rest already sit
                // at the column right after "- ".
                let inner_pad = INDENT.repeat(indent + 1);
                let _ = write!(out, "{}- ", pad);
                out.push_str(nested.strip_prefix(inner_pad.as_str()).unwrap_or(&nested));
            }
            Value::Array(inner) if inner.is_empty() => {
                let _ = writeln!(out, "{}- []", pad);
            }
            Value::Array(inner) => {
                let _ = writeln!(out, "{}-", pad);
                write_seq(out, inner, indent + 1, false);
            }
            scalar => {
                let _ = writeln!(out, "{}- {}", pad, scalar_to_string(scalar));
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) if needs_quotes(s) => quote(s),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.contains(':')
        || s.contains('#')
        || s.contains('-')
        || s.starts_with(INDICATORS)
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.chars().any(char::is_control)
        || RESERVED_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w))
        || s.parse::<f64>().is_ok()
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
