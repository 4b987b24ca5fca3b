// src/outcome/summary.rs

//! Parser for the counts mapping printed on summary lines.
//!
//! The toolkit prints a Python-style literal such as
//! `{'pointsource': {'created': 3, 'updated': 0}, 'area': {'created': 1, 'updated': 2}}`.
//! Anything that does not have exactly that shape is rejected, so a stray
//! brace in a log message never turns into a bogus summary.

use std::sync::LazyLock;

use regex::Regex;

use crate::outcome::CountsByEntity;
use crate::types::EntityCounts;

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([^'"]+)['"]\s*:\s*\{([^{}]*)\}"#).expect("valid entry regex")
});

static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*['"](created|updated)['"]\s*:\s*(\d+)\s*$"#).expect("valid count regex")
});

/// The `{...}` literal at the end of `line`, if the line ends with one.
///
/// Braces are matched from the end, so text before the literal may contain
/// braces of its own.
pub fn trailing_mapping(line: &str) -> Option<&str> {
    let line = line.trim_end();
    if !line.ends_with('}') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in line.char_indices().rev() {
        match c {
            '}' => depth += 1,
            '{' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&line[i..]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a counts mapping literal.
pub fn parse_mapping_literal(literal: &str) -> Option<CountsByEntity> {
    let body = literal
        .trim()
        .strip_prefix('{')?
        .strip_suffix('}')?;

    let mut counts = CountsByEntity::new();
    let mut cursor = 0;
    for caps in ENTRY.captures_iter(body) {
        let whole = caps.get(0)?;
        if !is_separator(&body[cursor..whole.start()]) {
            return None;
        }
        cursor = whole.end();

        let entity = caps.get(1)?.as_str().trim().to_string();
        let entry = parse_counts(caps.get(2)?.as_str())?;
        counts.insert(entity, entry);
    }
    if !is_separator(&body[cursor..]) {
        return None;
    }
    Some(counts)
}

fn is_separator(gap: &str) -> bool {
    gap.chars().all(|c| c.is_whitespace() || c == ',')
}

fn parse_counts(inner: &str) -> Option<EntityCounts> {
    let mut counts = EntityCounts::default();
    let mut seen = false;
    for pair in inner.split(',').filter(|p| !p.trim().is_empty()) {
        let caps = COUNT.captures(pair)?;
        let value: u64 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(1)?.as_str() {
            "created" => counts.created = value,
            _ => counts.updated = value,
        }
        seen = true;
    }
    seen.then_some(counts)
}
