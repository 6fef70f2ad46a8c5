//! Reader for Java-style `.properties` text.
//!
//! Supports `#`/`!` comments, `=`/`:`/whitespace separators, backslash line
//! continuations and the usual escapes (`\t`, `\n`, `\r`, `\f`, `\uXXXX`).
//! Later duplicates replace earlier ones.

use std::collections::BTreeMap;
use std::path::Path;

/// Parsed key/value pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Parse properties text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            entries.insert(key, value);
        }
        Self { entries }
    }

    /// Read and parse a properties file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\x0c')
}

/// Join continued physical lines and drop comments and blank lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in text.lines() {
        let line = raw.trim_start_matches(is_blank);
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        let trailing = line.chars().rev().take_while(|ch| *ch == '\\').count();
        if trailing % 2 == 1 {
            current.push_str(line.strip_suffix('\\').unwrap_or(line));
            continuing = true;
            continue;
        }
        current.push_str(line);
        lines.push(std::mem::take(&mut current));
        continuing = false;
    }
    if continuing && !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a logical line into an unescaped key and value.
fn split_entry(line: &str) -> (String, String) {
    let mut escaped = false;
    let mut separator = None;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == '=' || ch == ':' || is_blank(ch) {
            separator = Some((idx, ch));
            break;
        }
    }

    let Some((idx, sep)) = separator else {
        return (unescape(line), String::new());
    };
    let (key, rest) = line.split_at(idx);
    let rest = rest.strip_prefix(sep).unwrap_or(rest);
    let mut value = rest.trim_start_matches(is_blank);
    if is_blank(sep) {
        if let Some(stripped) = value.strip_prefix(['=', ':']) {
            value = stripped.trim_start_matches(is_blank);
        }
    }
    (unescape(key), unescape(value))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&hex),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
