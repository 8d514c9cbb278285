//! Library link placeholders in bytecode templates.
//!
//! The compiler leaves spans of the form `__LibraryName___…` (two leading
//! underscores, the library name, underscore padding) inside a bytecode
//! template wherever a library address must be filled in before the
//! template is deployable.

use std::collections::{BTreeMap, BTreeSet};

struct Placeholder {
    start: usize,
    end: usize,
    name: String,
}

/// Scan a template for placeholder spans, left to right.
fn placeholders(template: &str) -> Vec<Placeholder> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'_' && bytes[i + 1] == b'_' {
            let name_start = i + 2;
            let mut j = name_start;
            while j < bytes.len() && bytes[j] != b'_' {
                j += 1;
            }
            // A span needs a nonempty name and at least one padding
            // underscore after it.
            if j > name_start && j < bytes.len() && bytes[j] == b'_' {
                let mut end = j;
                while end < bytes.len() && bytes[end] == b'_' {
                    end += 1;
                }
                found.push(Placeholder {
                    start: i,
                    end,
                    name: template[name_start..j].to_string(),
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }

    found
}

/// Substitute every placeholder whose name has an entry in `links` with
/// the linked address (any `0x` prefix stripped). Spans without a link
/// entry are left in place.
pub fn resolve(template: &str, links: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;

    for span in placeholders(template) {
        out.push_str(&template[cursor..span.start]);
        match links.get(&span.name) {
            Some(address) => out.push_str(address.strip_prefix("0x").unwrap_or(address)),
            None => out.push_str(&template[span.start..span.end]),
        }
        cursor = span.end;
    }

    out.push_str(&template[cursor..]);
    out
}

/// The distinct placeholder names still present after substitution,
/// deduplicated and sorted. An empty set means the template is deployable.
pub fn unresolved(template: &str, links: &BTreeMap<String, String>) -> BTreeSet<String> {
    placeholders(&resolve(template, links))
        .into_iter()
        .map(|span| span.name)
        .collect()
}
