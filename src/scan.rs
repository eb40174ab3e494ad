use anyhow::{Result, bail};
use regex::Regex;

/// Marker token looked for in file content when none is configured.
pub const DEFAULT_MARKER_TOKEN: &str = "agent";

/// Character that turns a marker into a fire-now trigger when it immediately
/// precedes the token (e.g. `!agent`).
pub const DEFAULT_TRIGGER_PREFIX: char = '!';

/// Compiled marker matching rules for one watch session.
///
/// A line is a marker line when it contains the token anywhere,
/// case-insensitive and word-boundary-delimited (so a token of `agent`
/// matches `// AGENT fix this` but not `reagent`). The same token
/// immediately preceded by the trigger prefix marks the line as a trigger.
#[derive(Debug, Clone)]
pub struct MarkerSpec {
    token: String,
    trigger_prefix: char,
    marker_re: Regex,
    trigger_re: Regex,
}

impl MarkerSpec {
    pub fn new(token: &str, trigger_prefix: char) -> Result<Self> {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!(
                "marker token must be a non-empty word (letters, digits, underscore), got {token:?}"
            );
        }
        let escaped = regex::escape(token);
        let prefix = regex::escape(&trigger_prefix.to_string());
        let marker_re = Regex::new(&format!(r"(?i)\b{escaped}\b"))?;
        let trigger_re = Regex::new(&format!(r"(?i){prefix}{escaped}\b"))?;
        Ok(Self {
            token: token.to_string(),
            trigger_prefix,
            marker_re,
            trigger_re,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn trigger_prefix(&self) -> char {
        self.trigger_prefix
    }
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TOKEN, DEFAULT_TRIGGER_PREFIX)
            .expect("default marker token is a valid word")
    }
}

/// All marker lines found in one file, coalesced into a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScan {
    /// 1-based line number of the first marker line.
    pub line: usize,
    /// Raw text of every marker line, in file order.
    pub lines: Vec<String>,
    /// True if any of the marker lines carries the trigger prefix.
    pub has_trigger: bool,
}

/// Scan file content for marker lines.
///
/// Yields at most one group per file: the minimum marker line number, every
/// raw marker line in order, and whether any of them is a trigger. A passive
/// marker elsewhere in a file that also contains a trigger line is swept into
/// the same group. Returns None when no line matches.
pub fn scan_markers(content: &str, spec: &MarkerSpec) -> Option<MarkerScan> {
    let mut line = 0usize;
    let mut lines = Vec::new();
    let mut has_trigger = false;

    for (idx, raw) in content.lines().enumerate() {
        if !spec.marker_re.is_match(raw) {
            continue;
        }
        if lines.is_empty() {
            line = idx + 1;
        }
        lines.push(raw.to_string());
        if spec.trigger_re.is_match(raw) {
            has_trigger = true;
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(MarkerScan {
            line,
            lines,
            has_trigger,
        })
    }
}
