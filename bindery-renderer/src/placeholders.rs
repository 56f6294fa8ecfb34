//! Placeholder discovery in template document XML.
//!
//! Recognised markers (the engine's own syntax):
//!
//! | Marker                         | Contributes                  |
//! |--------------------------------|------------------------------|
//! | `{{ name }}`                   | `name`                       |
//! | `{{ invoice.total }}`          | `invoice`                    |
//! | `{{ name \| upper }}`          | `name`                       |
//! | `{% for item in items %}`      | `items` (binds `item`)       |
//! | `{% if premium %}` / `{% elif %}` | names used in the condition |
//!
//! Names bound by `for` are loop-locals and excluded from the result, so a
//! placeholder that only occurs inside a loop body counts as present through
//! its loop source. The scan runs over the raw document XML: a marker split
//! across XML runs is not recognised here, and the render engine cannot
//! substitute it either.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Engine keywords and builtins that never name a placeholder.
const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "true", "false", "loop"];

fn var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{-?\s*([A-Za-z_][A-Za-z0-9_]*)").expect("variable pattern compiles")
    })
}

fn for_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\{%-?\s*for\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s+in\s+([A-Za-z_][A-Za-z0-9_]*)",
        )
        .expect("for pattern compiles")
    })
}

fn if_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{%-?\s*(?:if|elif)\s+([^%]*?)\s*-?%\}").expect("if pattern compiles")
    })
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("ident pattern compiles"))
}

/// Scan document XML for placeholder roots. Returns a sorted set.
pub fn scan(document_xml: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut locals = BTreeSet::new();

    for caps in for_re().captures_iter(document_xml) {
        locals.insert(caps[1].to_string());
        if let Some(second) = caps.get(2) {
            locals.insert(second.as_str().to_string());
        }
        found.insert(caps[3].to_string());
    }

    for caps in var_re().captures_iter(document_xml) {
        found.insert(caps[1].to_string());
    }

    for caps in if_re().captures_iter(document_xml) {
        collect_condition_idents(&caps[1], &mut found);
    }

    found.retain(|name| !locals.contains(name) && !RESERVED.contains(&name.as_str()));
    found
}

/// Pull root identifiers out of an `if`/`elif` condition, skipping keywords,
/// attribute accesses (`item.done` contributes `item` via the leading match),
/// and quoted literals.
fn collect_condition_idents(condition: &str, out: &mut BTreeSet<String>) {
    for m in ident_re().find_iter(condition) {
        let preceding = condition[..m.start()].chars().next_back();
        if matches!(preceding, Some('.') | Some('"') | Some('\'')) {
            continue;
        }
        let token = m.as_str();
        if RESERVED.contains(&token) {
            continue;
        }
        out.insert(token.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
