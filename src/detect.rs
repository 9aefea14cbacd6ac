//! Issue detection
//!
//! Evaluates the rule catalogue against full file content, then uses the
//! staged-change map to decide which matches belong to this commit. Scanning
//! the whole file keeps whole-file context available (declared identifiers);
//! restricting actionability to staged lines keeps the guard from ever
//! proposing changes to code the developer did not touch.

use std::collections::HashSet;

use regex::Regex;

use crate::diff::StagedLines;
use crate::rules::{Rule, Severity};

/// A single rule match on a line of a file.
///
/// `actionable` means the line is part of the staged change (with exact hunk
/// coordinates) and the severity is high or critical. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub rule_id: String,
    pub file: String,
    pub line: usize,
    pub severity: Severity,
    pub message: String,
    pub matched_text: String,
    pub actionable: bool,
}

/// Scan `content` with every rule, producing issues in (line, rule) order.
///
/// Blank lines and pure comment lines are skipped. Rules marked
/// `requires_undeclared` are suppressed when their captured identifier is
/// declared anywhere in the file.
pub fn detect_issues(
    file: &str,
    content: &str,
    staged: Option<&StagedLines>,
    rules: &[Rule],
) -> Vec<Issue> {
    let declared = declared_identifiers(content);
    let mut issues = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if is_trivial_line(line) {
            continue;
        }

        for rule in rules {
            let Some(m) = rule.pattern.find(line) else { continue };

            if rule.requires_undeclared {
                match rule.pattern.captures(line).and_then(|c| c.get(1)) {
                    Some(ident) if !declared.contains(ident.as_str()) => {}
                    _ => continue,
                }
            }

            let in_commit = staged
                .map(|s| s.exact && s.lines.contains(&line_no))
                .unwrap_or(false);

            issues.push(Issue {
                rule_id: rule.id.clone(),
                file: file.to_string(),
                line: line_no,
                severity: rule.severity,
                message: rule.message.clone(),
                matched_text: m.as_str().to_string(),
                actionable: in_commit && rule.severity.is_actionable(),
            });
        }
    }

    issues
}

/// Blank or pure-comment lines carry no detectable code.
fn is_trivial_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

/// Extract every identifier the file declares: `var`/`let`/`const`
/// declarators, function names and their parameter lists, and catch-clause
/// bindings. Used to suppress false "undeclared identifier" matches.
pub fn declared_identifiers(content: &str) -> HashSet<String> {
    // Patterns are rebuilt per call; file scans happen once per session so
    // this is not on a hot path.
    let decl = Regex::new(r"\b(?:var|let|const)\s+([^;\n]+)").expect("declaration pattern");
    let func = Regex::new(r"\bfunction\s*([A-Za-z_$][\w$]*)?\s*\(([^)]*)\)").expect("function pattern");
    let arrow = Regex::new(r"\(([^)]*)\)\s*=>").expect("arrow pattern");
    let catch = Regex::new(r"\bcatch\s*\(\s*([A-Za-z_$][\w$]*)").expect("catch pattern");
    let import = Regex::new(r"\bimport\s*\{([^}]*)\}").expect("import pattern");

    let mut declared = HashSet::new();

    for caps in decl.captures_iter(content) {
        insert_declarators(&mut declared, &caps[1]);
    }
    for caps in func.captures_iter(content) {
        if let Some(name) = caps.get(1) {
            declared.insert(name.as_str().to_string());
        }
        insert_params(&mut declared, &caps[2]);
    }
    for caps in arrow.captures_iter(content) {
        insert_params(&mut declared, &caps[1]);
    }
    for caps in catch.captures_iter(content) {
        declared.insert(caps[1].to_string());
    }
    for caps in import.captures_iter(content) {
        for name in caps[1].split(',') {
            // "orig as alias" declares the alias
            let name = name.rsplit(" as ").next().unwrap_or(name);
            let name = name.trim();
            if !name.is_empty() {
                declared.insert(name.to_string());
            }
        }
    }

    declared
}

/// Walk a declarator list like `a = f(x, y), b = 2`: split on commas outside
/// any parentheses, brackets, or string literal, then take each segment's
/// leading identifier. Initializer internals (call arguments, array elements)
/// never count as declarators.
fn insert_declarators(declared: &mut HashSet<String>, list: &str) {
    let head = Regex::new(r"^\s*([A-Za-z_$][\w$]*)").expect("declarator pattern");
    let mut insert_segment = |segment: &str| {
        if let Some(caps) = head.captures(segment) {
            declared.insert(caps[1].to_string());
        }
    };

    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in list.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    insert_segment(&list[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    insert_segment(&list[start..]);
}

fn insert_params(declared: &mut HashSet<String>, params: &str) {
    for param in params.split(',') {
        // strip defaults and type annotations
        let name = param.split(['=', ':']).next().unwrap_or("");
        let name = name.trim().trim_start_matches("...").trim();
        if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            declared.insert(name.to_string());
        }
    }
}
