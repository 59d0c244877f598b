//! File directives embedded in free-text instructions.
//!
//! Instructions are untrusted. Whatever path they name is handed to the
//! worker as-is (after scope-prefix normalization); containment is the
//! resolver's job, not this parser's.

use regex::Regex;
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(read_file|read|cat|list_files|ls|list|write_file)[ \t]+([^\s,;]+)")
        .expect("directive pattern is valid")
});

const TRIM_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '\'', '`'];
const TRIM_LEADING: &[char] = &['(', '"', '\'', '`'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Read { path: String },
    List { path: String },
    Write { path: String, content: String },
}

impl Directive {
    pub fn path(&self) -> &str {
        match self {
            Directive::Read { path } | Directive::List { path } | Directive::Write { path, .. } => {
                path
            }
        }
    }
}

/// Extract directives in the order they appear.
///
/// A directive is a verb followed by a path-like token (one containing `/` or
/// `.`). `write_file <path>` takes the rest of its line as content.
pub fn extract_directives(instruction: &str, scope: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    for captures in DIRECTIVE.captures_iter(instruction) {
        let (Some(verb), Some(raw_path)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Some(path) = clean_path_token(raw_path.as_str()) else {
            continue;
        };
        let path = normalize_scope_path(&path, scope);

        let directive = match verb.as_str().to_ascii_lowercase().as_str() {
            "read_file" | "read" | "cat" => Directive::Read { path },
            "list_files" | "ls" | "list" => Directive::List { path },
            _ => {
                let rest = &instruction[raw_path.end()..];
                let content = rest.lines().next().unwrap_or("").trim().to_string();
                Directive::Write { path, content }
            }
        };
        directives.push(directive);
    }
    directives
}

/// `.` and `..` survive the trailing-punctuation trim so that traversal
/// attempts still reach the resolver.
fn clean_path_token(token: &str) -> Option<String> {
    let trimmed = token
        .trim_start_matches(TRIM_LEADING)
        .trim_end_matches(|c| c != '.' && TRIM_TRAILING.contains(&c));
    let trimmed = if matches!(trimmed, "." | "..") {
        trimmed
    } else {
        trimmed.trim_end_matches(TRIM_TRAILING)
    };
    if trimmed.is_empty() || !(trimmed.contains('/') || trimmed.contains('.')) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Map references to the agent's own scope onto the virtual root.
///
/// `/<scope>/x` becomes `x` and `/<scope>` becomes `.`; every other path,
/// including other scopes' prefixes, is returned unchanged.
pub fn normalize_scope_path(path: &str, scope: &str) -> String {
    let prefix = format!("/{scope}");
    match path.strip_prefix(&prefix) {
        Some("") | Some("/") => ".".to_string(),
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path.to_string(),
    }
}
