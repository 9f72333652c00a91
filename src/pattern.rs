//! Shell-style wildcard filters.
//!
//! A pattern is translated into an anchored regular expression:
//!
//! | glob      | regex              |
//! |-----------|--------------------|
//! | `*`       | `.*`               |
//! | `?`       | `.`                |
//! | `[!a-z]`  | `[^a-z]`           |
//! | `/`, `\`  | `[/\\]` on Windows |
//!
//! Everything else is matched literally. A pattern must match the whole
//! candidate, never a substring of it.

use std::fmt;

use regex::Regex;

/// How path separators inside a pattern are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `/` only; `\` is an ordinary character.
    Unix,
    /// `/` and `\` are interchangeable separators.
    Windows,
}

impl PathStyle {
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
}

/// A compiled wildcard filter.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
}

#[derive(Clone)]
enum Matcher {
    Regex(Regex),
    /// The translated expression was rejected; compare the raw text instead.
    Literal(String),
}

impl Pattern {
    /// Compile with the separator rules of the current platform.
    pub fn compile(pattern: &str) -> Self {
        Self::compile_with(pattern, PathStyle::native())
    }

    /// Compile with explicit separator rules. Never fails.
    pub fn compile_with(pattern: &str, style: PathStyle) -> Self {
        let matcher = match Regex::new(&translate(pattern, style)) {
            Ok(re) => Matcher::Regex(re),
            Err(e) => {
                crate::debug!("pattern"; "`{}` matched literally: {}", pattern, e);
                Matcher::Literal(pattern.to_string())
            }
        };
        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    /// Whole-string match.
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(path),
            Matcher::Literal(text) => text == path,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// True if any of `patterns` matches `path`.
pub fn any_match(patterns: &[Pattern], path: &str) -> bool {
    patterns.iter().any(|p| p.matches(path))
}

fn translate(pattern: &str, style: PathStyle) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '/' | '\\' if style == PathStyle::Windows => out.push_str(r"[/\\]"),
            '[' => match class_end(&chars, i).and_then(|end| {
                let class = translate_class(&chars[i + 1..end], style)?;
                Some((end, class))
            }) {
                Some((end, class)) => {
                    out.push_str(&class);
                    i = end;
                }
                None => {
                    // Unterminated or invalid class: the rest is plain text.
                    for &c in &chars[i..] {
                        push_literal(&mut out, c, style);
                    }
                    break;
                }
            },
            c => push_literal(&mut out, c, style),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `open`.
///
/// A `]` directly after `[` or `[!` belongs to the class.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if matches!(chars.get(j), Some('!' | '^')) {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|offset| j + offset)
}

/// Regex class for a bracket body, or `None` if the regex engine rejects it
/// (a reversed range like `[z-a]`).
fn translate_class(body: &[char], style: PathStyle) -> Option<String> {
    let mut class = String::new();
    push_class(&mut class, body, style);
    match Regex::new(&class) {
        Ok(_) => Some(class),
        Err(e) => {
            crate::debug!("pattern"; "class `{}` matched literally: {}", class, e);
            None
        }
    }
}

fn push_class(out: &mut String, body: &[char], style: PathStyle) {
    out.push('[');
    for (idx, &c) in body.iter().enumerate() {
        match c {
            '!' | '^' if idx == 0 => out.push('^'),
            '/' | '\\' if style == PathStyle::Windows => out.push_str(r"/\\"),
            '\\' | '[' | ']' | '&' | '~' | '^' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push(']');
}

fn push_literal(out: &mut String, c: char, style: PathStyle) {
    if style == PathStyle::Windows && matches!(c, '/' | '\\') {
        out.push_str(r"[/\\]");
        return;
    }
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}
