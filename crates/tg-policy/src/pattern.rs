// pattern.rs: Glob matching for paths, domains, and commands.
//
// Two pattern languages share one wildcard primitive:
//
//   - Path patterns are segment-aware. `*` matches within one segment,
//     `**` (a whole segment on its own) matches zero or more segments.
//   - Domain and command patterns are whole-string. `*` matches any run
//     of characters, `/` and `.` included.
//
// There are no character classes, `?`, or escapes. Patterns are compiled
// once when the PolicyStore is built; matching never allocates per
// pattern character.

use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path};

/// Match `text` against `pattern` where `*` matches any run of characters.
///
/// Iterative with single-star backtracking, so the worst case is
/// O(pattern × text) rather than exponential.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            // Let the last star swallow one more character and retry.
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `**`: zero or more whole segments.
    Recursive,
    /// A single segment, possibly containing `*`.
    Glob(String),
}

/// A compiled, absolute, segment-aware path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile an absolute path pattern such as `/ws/src/**/*.rs`.
    ///
    /// Relative patterns must be anchored by the caller (the store joins
    /// them onto the workspace) before compiling.
    pub fn new(pattern: &str) -> Result<Self, String> {
        if pattern.trim().is_empty() {
            return Err("pattern is empty".to_string());
        }
        if !pattern.starts_with('/') {
            return Err("path pattern must be absolute".to_string());
        }

        let mut segments = Vec::new();
        for part in pattern.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err("'..' is not allowed in path patterns".to_string()),
                "**" => {
                    // Consecutive `**` segments are equivalent to one.
                    if segments.last() != Some(&Segment::Recursive) {
                        segments.push(Segment::Recursive);
                    }
                }
                p if p.contains("**") => {
                    return Err("'**' must be a whole path segment".to_string());
                }
                p => segments.push(Segment::Glob(p.to_string())),
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written (after workspace anchoring).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check an absolute, already-normalized path against this pattern.
    ///
    /// Relative paths never match.
    pub fn matches(&self, path: &Path) -> bool {
        if !path.has_root() {
            return false;
        }
        let parts: Vec<Cow<'_, str>> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect();
        match_segments(&self.segments, &parts)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_segments(pattern: &[Segment], path: &[Cow<'_, str>]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Recursive, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((head, tail)) => wildcard_match(glob, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DomainKind {
    /// `*.example.com`: any subdomain, and `example.com` itself.
    Subdomains(String),
    /// Any other pattern containing `*`.
    Wildcard(String),
    /// A literal host; only an exact match counts.
    Exact(String),
}

/// A compiled domain pattern. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern {
    raw: String,
    kind: DomainKind,
}

impl DomainPattern {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let normalized = normalize_domain(pattern);
        if normalized.is_empty() {
            return Err("pattern is empty".to_string());
        }
        if normalized.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err("domain patterns cannot contain whitespace or '/'".to_string());
        }

        let kind = if let Some(base) = normalized.strip_prefix("*.") {
            if base.is_empty() || base.contains('*') {
                DomainKind::Wildcard(normalized.clone())
            } else {
                DomainKind::Subdomains(base.to_string())
            }
        } else if normalized.contains('*') {
            DomainKind::Wildcard(normalized.clone())
        } else {
            DomainKind::Exact(normalized.clone())
        };

        Ok(Self {
            raw: pattern.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check a domain that has already been through [`normalize_domain`].
    pub fn matches(&self, domain: &str) -> bool {
        match &self.kind {
            DomainKind::Exact(host) => host == domain,
            DomainKind::Subdomains(base) => {
                domain == base
                    || domain
                        .strip_suffix(base.as_str())
                        .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
            }
            DomainKind::Wildcard(glob) => wildcard_match(glob, domain),
        }
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Lowercase a host and drop the trailing root dot (`Example.COM.` → `example.com`).
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// A compiled whole-string command pattern. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern {
    raw: String,
}

impl CommandPattern {
    pub fn new(pattern: &str) -> Result<Self, String> {
        if pattern.trim().is_empty() {
            return Err("pattern is empty".to_string());
        }
        Ok(Self {
            raw: pattern.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match the entire command string. No tokenization is performed, so
    /// `ls *` also matches `ls; rm -rf /` unless a deny pattern such as
    /// `*;*` catches it first.
    pub fn matches(&self, command: &str) -> bool {
        wildcard_match(&self.raw, command)
    }
}

impl fmt::Display for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
