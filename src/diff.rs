//! Staged-diff mapping
//!
//! Parses the unified diff of the staged change set and answers one question:
//! which new-file line numbers does this commit actually introduce?

use std::collections::{BTreeSet, HashMap};

/// Staged line numbers for a single file, in new-file coordinates (1-based).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedLines {
    pub lines: BTreeSet<usize>,
    /// False when a hunk header failed to parse and line numbers came from a
    /// best-effort running counter. Degraded files never produce actionable
    /// issues downstream.
    pub exact: bool,
}

impl StagedLines {
    fn new() -> Self {
        Self { lines: BTreeSet::new(), exact: true }
    }
}

/// Map from file path to the lines this commit adds to it.
///
/// Built once per invocation from the staged diff; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct StagedChangeMap {
    files: HashMap<String, StagedLines>,
}

impl StagedChangeMap {
    pub fn get(&self, file: &str) -> Option<&StagedLines> {
        self.files.get(file)
    }

    /// Whether `line` of `file` is part of the staged change and was mapped
    /// from real hunk coordinates.
    pub fn is_staged(&self, file: &str, line: usize) -> bool {
        self.files
            .get(file)
            .map(|s| s.exact && s.lines.contains(&line))
            .unwrap_or(false)
    }

    /// Paths touched by the diff, in arbitrary order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Build a [`StagedChangeMap`] from unified diff text.
///
/// Scans line by line: a `+++ b/...` marker starts a file block, a hunk header
/// `@@ -a,b +c,d @@` resets the new-file counter to `c`, additions are recorded
/// and advance the counter, context lines advance it, removals do not. A
/// malformed or missing hunk header drops the file to a best-effort counter
/// starting at 1 and marks it non-exact.
pub fn map_staged_lines(diff: &str) -> StagedChangeMap {
    let mut map = StagedChangeMap::default();
    let mut current: Option<String> = None;
    let mut counter: usize = 1;
    let mut in_hunk = false;

    for line in diff.lines() {
        if line.starts_with("diff ") {
            current = None;
            in_hunk = false;
            continue;
        }
        if line.starts_with("--- ") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            let path = rest.trim_start_matches("b/");
            let path = match path.find('\t') {
                Some(tab) => &path[..tab],
                None => path,
            };
            if path == "/dev/null" {
                current = None;
            } else {
                current = Some(path.to_string());
                map.files.entry(path.to_string()).or_insert_with(StagedLines::new);
            }
            counter = 1;
            in_hunk = false;
            continue;
        }

        let Some(file) = current.as_deref() else { continue };

        if line.starts_with("@@ ") {
            match parse_hunk_header(line) {
                Ok(new_start) => {
                    counter = new_start;
                }
                Err(err) => {
                    eprintln!("  Warning: {} in {}; falling back to line counter", err, file);
                    if let Some(entry) = map.files.get_mut(file) {
                        entry.exact = false;
                    }
                    counter = 1;
                }
            }
            in_hunk = true;
            continue;
        }

        if line.starts_with('\\') {
            // "\ No newline at end of file" occupies no line position
            continue;
        }

        if line.starts_with('+') {
            if !in_hunk {
                // Addition before any hunk header: header was missing, degrade
                eprintln!(
                    "  Warning: addition outside any hunk in {}; line numbers are best-effort",
                    file
                );
                if let Some(entry) = map.files.get_mut(file) {
                    entry.exact = false;
                }
                in_hunk = true;
            }
            if let Some(entry) = map.files.get_mut(file) {
                entry.lines.insert(counter);
            }
            counter += 1;
        } else if line.starts_with('-') {
            // Removal occupies no position in the new file
        } else if in_hunk && (line.starts_with(' ') || line.is_empty()) {
            counter += 1;
        }
    }

    map
}

/// Parse `@@ -old_start,old_count +new_start,new_count @@`, returning the
/// new-file start line.
fn parse_hunk_header(header: &str) -> Result<usize, String> {
    let parts: Vec<&str> = header.split_whitespace().collect();
    if parts.len() < 4 || parts[0] != "@@" || !parts[2].starts_with('+') {
        return Err(format!("invalid hunk header: {}", header));
    }
    let (start, _count) = parse_range(parts[2].trim_start_matches('+'))?;
    Ok(start)
}

/// Parse a range like "10,5" or "10" into (start, count)
fn parse_range(s: &str) -> Result<(usize, usize), String> {
    if let Some(comma) = s.find(',') {
        let start: usize = s[..comma].parse().map_err(|_| format!("invalid start: {}", s))?;
        let count: usize = s[comma + 1..].parse().map_err(|_| format!("invalid count: {}", s))?;
        Ok((start, count))
    } else {
        let start: usize = s.parse().map_err(|_| format!("invalid line number: {}", s))?;
        Ok((start, 1))
    }
}
