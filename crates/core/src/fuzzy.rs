//! `FuzzyIndex`: an inverted character-position index supporting
//! subsequence fuzzy matching and match highlighting.
//!
//! Ported from the original's `foundry-fuzzy-index.c`: strings are appended
//! to a single heap, each character records the set of (string id, byte
//! position) pairs it appears at, and matching a query walks the query's
//! characters left to right, backtracking the match cursor within a
//! candidate string when a later character can't be found after the current
//! position.

use std::collections::{HashMap, HashSet};

/// A single indexed entry, keyed by an opaque `u32` id assigned in
/// insertion order.
struct Entry<V> {
    text: String,
    value: Option<V>,
}

/// An append-only, tombstoning inverted index over inserted strings,
/// supporting fuzzy subsequence search and `<b>`-highlighted results.
pub struct FuzzyIndex<V> {
    entries: Vec<Entry<V>>,
    /// char -> sorted list of (entry id, byte position) where that char
    /// occurs, case-folded to lowercase at index time (queries are matched
    /// case-insensitively, as the original does via `g_unichar_tolower`).
    positions: HashMap<char, Vec<(u32, u32)>>,
    tombstones: HashSet<u32>,
}

impl<V> Default for FuzzyIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub id: u32,
    pub score: f32,
    /// Byte positions of matched characters, for [`FuzzyIndex::highlight`].
    pub positions: Vec<u32>,
}

impl<V> FuzzyIndex<V> {
    pub fn new() -> Self {
        FuzzyIndex {
            entries: Vec::new(),
            positions: HashMap::new(),
            tombstones: HashSet::new(),
        }
    }

    /// Insert `text` with an associated `value`, returning its id.
    pub fn insert(&mut self, text: impl Into<String>, value: V) -> u32 {
        let text = text.into();
        let id = self.entries.len() as u32;
        for (byte_pos, ch) in text.char_indices() {
            let folded = ch.to_lowercase().next().unwrap_or(ch);
            self.positions
                .entry(folded)
                .or_default()
                .push((id, byte_pos as u32));
        }
        self.entries.push(Entry {
            text,
            value: Some(value),
        });
        id
    }

    /// Tombstone every id whose indexed text equals `key` exactly.
    /// Tombstoned entries are skipped by `query` but their character-position
    /// entries are left in place, matching the original's append-only,
    /// never-compacted design.
    pub fn remove(&mut self, key: &str) {
        for (id, entry) in self.entries.iter().enumerate() {
            if entry.text == key {
                self.tombstones.insert(id as u32);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<(&str, &V)> {
        if self.tombstones.contains(&id) {
            return None;
        }
        self.entries
            .get(id as usize)
            .and_then(|e| e.value.as_ref().map(|v| (e.text.as_str(), v)))
    }

    /// Fuzzy-match `needle` against every indexed string, returning matches
    /// sorted by descending score, ties broken by ascending key. `0` for
    /// `max_matches` means unlimited; any other value truncates the sorted
    /// result to that many entries.
    pub fn query(&self, needle: &str, max_matches: usize) -> Vec<FuzzyMatch> {
        let chars: Vec<char> = needle.chars().map(|c| c.to_lowercase().next().unwrap_or(c)).collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut results = if chars.len() == 1 {
            // Single-character fast path: score is 1/(len+position) for
            // every string containing that character, matching the
            // original.
            let mut results = Vec::new();
            if let Some(hits) = self.positions.get(&chars[0]) {
                let mut best: HashMap<u32, (u32, f32)> = HashMap::new();
                for &(id, pos) in hits {
                    if self.tombstones.contains(&id) {
                        continue;
                    }
                    let len = self.entries[id as usize].text.len() as f32;
                    let score = 1.0 / (len + pos as f32);
                    let entry = best.entry(id).or_insert((pos, score));
                    if score > entry.1 {
                        *entry = (pos, score);
                    }
                }
                for (id, (pos, score)) in best {
                    results.push(FuzzyMatch {
                        id,
                        score,
                        positions: vec![pos],
                    });
                }
            }
            results
        } else {
            let candidate_ids: HashSet<u32> = match self.positions.get(&chars[0]) {
                Some(hits) => hits
                    .iter()
                    .map(|(id, _)| *id)
                    .filter(|id| !self.tombstones.contains(id))
                    .collect(),
                None => return Vec::new(),
            };

            let mut results = Vec::new();
            for id in candidate_ids {
                let text = &self.entries[id as usize].text;
                if let Some((score, positions)) = Self::do_match(text, &chars) {
                    results.push(FuzzyMatch { id, score, positions });
                }
            }
            results
        };

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap()
                .then_with(|| self.entries[a.id as usize].text.cmp(&self.entries[b.id as usize].text))
        });
        if max_matches != 0 {
            results.truncate(max_matches);
        }
        results
    }

    /// Recursive backtracking subsequence match against `haystack`,
    /// mirroring the original's `do_match`: attempt to match each needle
    /// character at the earliest possible position after the previous
    /// match, rolling the cursor back and retrying from an earlier branch
    /// point when a later character can't be found at all.
    fn do_match(haystack: &str, needle: &[char]) -> Option<(f32, Vec<u32>)> {
        let hay_chars: Vec<(u32, char)> = haystack
            .char_indices()
            .map(|(i, c)| (i as u32, c.to_lowercase().next().unwrap_or(c)))
            .collect();

        fn recurse(
            hay: &[(u32, char)],
            needle: &[char],
            hay_start: usize,
            needle_idx: usize,
            positions: &mut Vec<u32>,
        ) -> bool {
            if needle_idx == needle.len() {
                return true;
            }
            let target = needle[needle_idx];
            let mut pos = hay_start;
            while pos < hay.len() {
                if hay[pos].1 == target {
                    positions.push(hay[pos].0);
                    if recurse(hay, needle, pos + 1, needle_idx + 1, positions) {
                        return true;
                    }
                    positions.pop();
                }
                pos += 1;
            }
            false
        }

        let mut positions = Vec::new();
        if !recurse(&hay_chars, needle, 0, 0, &mut positions) {
            return None;
        }

        let span = positions.last().copied().unwrap_or(0) - positions.first().copied().unwrap_or(0) + 1;
        let final_score = (needle.len() as f32) / (span.max(1) as f32);
        Some((final_score, positions))
    }

    /// Wrap contiguous runs of `haystack` that match the next character of
    /// `needle` (as a greedy left-to-right subsequence scan, independent of
    /// any prior `query`) in `<b>`/`</b>`, escaping `&`, `<`, and `>`
    /// elsewhere so the result is safe to embed in markup-aware UI. Matching
    /// is case-insensitive unless `case_sensitive` is set.
    pub fn highlight(haystack: &str, needle: &str, case_sensitive: bool) -> String {
        let fold = |c: char| {
            if case_sensitive {
                c
            } else {
                c.to_lowercase().next().unwrap_or(c)
            }
        };
        let needle_chars: Vec<char> = needle.chars().map(fold).collect();

        let mut out = String::with_capacity(haystack.len() + 16);
        let mut needle_idx = 0;
        let mut in_run = false;

        for ch in haystack.chars() {
            let matched = needle_idx < needle_chars.len() && fold(ch) == needle_chars[needle_idx];

            if matched && !in_run {
                out.push_str("<b>");
                in_run = true;
            } else if !matched && in_run {
                out.push_str("</b>");
                in_run = false;
            }

            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                other => out.push(other),
            }

            if matched {
                needle_idx += 1;
            }
        }
        if in_run {
            out.push_str("</b>");
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len() - self.tombstones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
