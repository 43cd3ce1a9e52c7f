//! Line-oriented processing of build output: ANSI stripping, `make`'s
//! "Entering directory" tracking, and diagnostic regex extraction.
//!
//! Ported from the original's `foundry-build-progress.c` line filter, which
//! every line of PTY output passes through before being handed to a
//! diagnostic consumer.

use regex::Regex;

const ENTERING_DIRECTORY_PREFIX: &str = "Entering directory '";

/// Strip ANSI/terminal color escape sequences from `line`, in place
/// conceptually but returning a new `String`.
///
/// Follows the original's `filter_color_codes` byte-for-byte: a sequence
/// starts at either a literal `ESC` (`0x1b`) byte or the two-byte `\` `e`
/// spelling, optionally followed by `[`, and continues consuming digits,
/// spaces, and `;` until the first byte that doesn't belong to the escape.
pub fn strip_ansi_colors(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let is_esc_byte = bytes[i] == 0x1b;
        let is_backslash_e = bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'e';
        if is_esc_byte || is_backslash_e {
            i += if is_backslash_e { 2 } else { 1 };
            if i < bytes.len() && bytes[i] == b'[' {
                i += 1;
            }
            while i < bytes.len() {
                let b = bytes[i];
                if b.is_ascii_digit() || b == b' ' || b == b';' {
                    i += 1;
                } else {
                    break;
                }
            }
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// If `line` contains `make`'s "Entering directory '<dir>'" marker, return
/// the captured directory (empty string means "leaving," i.e. revert to the
/// top-level directory).
///
/// Follows `extract_directory_change`: the marker may appear anywhere in the
/// line, but the line's last byte must be the closing `'` for the match to
/// count.
pub fn extract_directory_change(line: &str) -> Option<&str> {
    if !line.ends_with('\'') {
        return None;
    }
    let start = line.find(ENTERING_DIRECTORY_PREFIX)?;
    let capture_start = start + ENTERING_DIRECTORY_PREFIX.len();
    line.get(capture_start..line.len() - 1)
}

/// Tracks the "current directory" implied by a stream of `make`-style build
/// output, for resolving relative paths in diagnostics.
#[derive(Debug, Default)]
pub struct DirectoryTracker {
    top_dir: Option<String>,
    current_dir: Option<String>,
}

impl DirectoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of (already color-stripped) output, updating the
    /// tracked directory if it's an "Entering directory" line.
    pub fn observe(&mut self, line: &str) {
        let Some(captured) = extract_directory_change(line) else {
            return;
        };
        if captured.is_empty() {
            self.current_dir = self.top_dir.clone();
            return;
        }
        if self.top_dir.is_none() {
            self.top_dir = Some(captured.to_string());
        }
        self.current_dir = Some(captured.to_string());
    }

    pub fn current_dir(&self) -> Option<&str> {
        self.current_dir.as_deref()
    }
}

/// A single diagnostic-looking match extracted from a build output line.
#[derive(Debug, Clone)]
pub struct DiagnosticMatch {
    pub line: String,
    pub captures: Vec<Option<String>>,
}

/// Runs a line through every configured regex, returning the first match.
///
/// This is plumbing only: extraction and notification, with no concrete
/// diagnostic renderer, matching the inactive branch of the original's line
/// filter (it calls `create_diagnostic` inside an `#if 0`). Consumers
/// outside this crate are expected to turn a [`DiagnosticMatch`] into
/// whatever diagnostic representation they use.
pub fn match_diagnostic(patterns: &[Regex], line: &str) -> Option<DiagnosticMatch> {
    for re in patterns {
        if let Some(caps) = re.captures(line) {
            return Some(DiagnosticMatch {
                line: line.to_string(),
                captures: caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect(),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_escape_byte_sequences() {
        let colored = "\x1b[31merror\x1b[0m: failed";
        assert_eq!(strip_ansi_colors(colored), "error: failed");
    }

    #[test]
    fn strips_backslash_e_sequences() {
        let colored = "\\e[1mbold\\e[0m";
        assert_eq!(strip_ansi_colors(colored), "bold");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(strip_ansi_colors("no escapes here"), "no escapes here");
    }

    #[test]
    fn extracts_entering_directory() {
        let line = "make[1]: Entering directory '/home/user/project/build'";
        assert_eq!(
            extract_directory_change(line),
            Some("/home/user/project/build")
        );
    }

    #[test]
    fn rejects_line_not_ending_in_quote() {
        let line = "Entering directory '/tmp' because reasons";
        assert_eq!(extract_directory_change(line), None);
    }

    #[test]
    fn directory_tracker_resets_on_empty_capture() {
        let mut tracker = DirectoryTracker::new();
        tracker.observe("make: Entering directory '/top'");
        tracker.observe("make: Entering directory '/top/sub'");
        assert_eq!(tracker.current_dir(), Some("/top/sub"));
        tracker.observe("make: Entering directory ''");
        assert_eq!(tracker.current_dir(), Some("/top"));
    }

    #[test]
    fn match_diagnostic_returns_first_match() {
        let patterns = vec![Regex::new(r"^(\S+):(\d+): error: (.*)$").unwrap()];
        let m = match_diagnostic(&patterns, "main.c:42: error: missing semicolon").unwrap();
        assert_eq!(m.captures[0].as_deref(), Some("main.c"));
        assert_eq!(m.captures[1].as_deref(), Some("42"));
    }
}
