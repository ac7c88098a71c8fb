//! Path pattern matching and target substitution.
//!
//! # Responsibilities
//! - Compile `/users/{id}` style patterns into anchored regexes
//! - Extract placeholder values from a matching path
//! - Substitute captured values into target URLs
//!
//! # Design Decisions
//! - Literal text is escaped; each `{name}` becomes a capture that excludes `/`
//! - Patterns are anchored at both ends (no prefix matching)
//! - Path matching is case-sensitive
//! - Unresolved placeholders in targets are left intact

use std::collections::HashMap;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("unclosed placeholder")]
    UnclosedPlaceholder,

    #[error("invalid placeholder name '{0}'")]
    InvalidPlaceholder(String),

    #[error("placeholder '{0}' declared twice")]
    DuplicatePlaceholder(String),

    #[error("regex compilation failed: {0}")]
    Regex(String),
}

/// A compiled route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    regex: Regex,
    variables: Vec<String>,
}

impl PathPattern {
    /// Compile a pattern such as `/users/{id}/posts/{postId}`.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let mut regex_src = String::from("^");
        let mut variables: Vec<String> = Vec::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            regex_src.push_str(&regex::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or(PatternError::UnclosedPlaceholder)?;
            let name = &after[..close];

            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(PatternError::InvalidPlaceholder(name.to_string()));
            }
            if variables.iter().any(|v| v == name) {
                return Err(PatternError::DuplicatePlaceholder(name.to_string()));
            }

            variables.push(name.to_string());
            regex_src.push_str("([^/]+)");
            rest = &after[close + 1..];
        }
        regex_src.push_str(&regex::escape(rest));
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| PatternError::Regex(e.to_string()))?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
            variables,
        })
    }

    /// The pattern as written in the config.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in declaration order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Returns placeholder values if `path` matches, `None` otherwise.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let values = self
            .variables
            .iter()
            .enumerate()
            .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Some(values)
    }
}

/// Replace each `{name}` in `target` with its captured value.
///
/// Single left-to-right pass: inserted values are never scanned again, and
/// placeholders without a value are kept as written.
pub fn substitute(target: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(target.len());
    let mut rest = target;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        match tail.find(|c: char| c == '{' || c == '}') {
            Some(end) if tail.as_bytes()[end] == b'}' => {
                let name = &tail[..end];
                match variables.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &tail[end + 1..];
            }
            // Unclosed, or another `{` opens first.
            _ => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
