//! Guard session driver
//!
//! One invocation end to end: staged diff -> staged-line map -> per-file
//! detection, synthesis, confirmation, and application -> re-stage -> commit.
//! Per-file failures are contained; only the cancel policy blocks the commit.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::apply::FileTransaction;
use crate::config::GuardConfig;
use crate::confirm::Confirmer;
use crate::detect::{declared_identifiers, detect_issues, Issue};
use crate::diff::map_staged_lines;
use crate::fix::{synthesize_fix, Fix};
use crate::git_ops;
use crate::rules::{default_rules, Rule};
use crate::{editor, review};

/// Final disposition of one guard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Commit may proceed (exit 0)
    Proceed,
    /// Commit is blocked (exit non-zero)
    Blocked,
}

/// Run the guard against the staged change set of `repo_path`.
///
/// `check_only` reports issues without writing anything.
pub fn run_guard(repo_path: &Path, config: &GuardConfig, check_only: bool) -> Result<Disposition> {
    let diff = git_ops::staged_diff(repo_path)?;
    if diff.trim().is_empty() {
        eprintln!("  Nothing staged; nothing to guard.");
        return Ok(Disposition::Proceed);
    }

    let map = map_staged_lines(&diff);
    if map.is_empty() {
        return Ok(Disposition::Proceed);
    }

    let rules = default_rules()?;
    let confirmer = Confirmer::new(config);

    if review::is_available() {
        if let Some(feedback) = review::review_diff(&diff) {
            println!("\n  Remote review:\n{}\n", indent(&feedback));
        }
    }

    let mut paths: Vec<String> = map.paths().map(|p| p.to_string()).collect();
    paths.sort();

    let mut modified: Vec<String> = Vec::new();
    let mut opened_editor = false;
    let mut blocked = false;

    for path in &paths {
        let full = repo_path.join(path);
        let content = match fs::read_to_string(&full) {
            Ok(content) => content,
            Err(err) => {
                eprintln!("  Warning: skipping {}: {}", path, err);
                continue;
            }
        };

        let issues = detect_issues(path, &content, map.get(path), &rules);
        if issues.is_empty() {
            continue;
        }

        report_issues(path, &issues);

        if config.auto_open_editor && !opened_editor {
            if let Some(first) = issues.iter().find(|i| i.actionable) {
                opened_editor = editor::open_at(&full, first.line);
            }
        }

        let fixes = synthesize_all(&issues, &rules, &content);
        if fixes.is_empty() {
            continue;
        }

        if check_only {
            println!("  {} fix(es) available for {} (check mode, not applied)", fixes.len(), path);
            continue;
        }

        match review_and_apply(&full, path, &fixes, &confirmer, config) {
            Ok(FileDisposition::Kept) => modified.push(path.clone()),
            Ok(FileDisposition::Declined) => {}
            Ok(FileDisposition::Aborted) => {
                blocked = true;
                break;
            }
            Err(err) => {
                // File-local failure: leave it unmodified, move on
                eprintln!("  Warning: could not apply fixes to {}: {}", path, err);
            }
        }
    }

    if blocked {
        eprintln!("  Commit blocked by cancel policy.");
        return Ok(Disposition::Blocked);
    }

    if !modified.is_empty() && !check_only {
        recommit(repo_path, &modified);
    }

    Ok(Disposition::Proceed)
}

enum FileDisposition {
    /// Fixes applied and kept
    Kept,
    /// All fixes declined; file restored byte-for-byte
    Declined,
    /// Cancel policy fired; stop the run
    Aborted,
}

/// Apply the file's fixes under a transaction, show the result, and let the
/// confirmation controller decide whether to keep or restore.
fn review_and_apply(
    full: &Path,
    path: &str,
    fixes: &[Fix],
    confirmer: &Confirmer,
    config: &GuardConfig,
) -> Result<FileDisposition> {
    let txn = FileTransaction::begin(full)?;
    let applied = match txn.apply_fixes(fixes) {
        Ok(n) => n,
        Err(err) => {
            txn.abort()?;
            return Err(err);
        }
    };
    if applied == 0 {
        txn.abort()?;
        return Ok(FileDisposition::Declined);
    }

    if config.show_fix_diff {
        for fix in fixes {
            print_fix(fix);
        }
    }

    let prompt = format!("  Keep {} fix(es) in {}?", applied, path);
    let resolved = confirmer.confirm(&prompt, true);

    if resolved.abort {
        txn.abort()?;
        return Ok(FileDisposition::Aborted);
    }
    if resolved.inspect {
        txn.abort()?;
        return review_fixes_individually(full, fixes, confirmer, config);
    }
    if resolved.decision.accepted {
        txn.commit()?;
        return Ok(FileDisposition::Kept);
    }

    txn.abort()?;
    Ok(FileDisposition::Declined)
}

/// Per-fix review: each fix gets its own bounded confirmation, then the
/// accepted subset is applied in one pass.
fn review_fixes_individually(
    full: &Path,
    fixes: &[Fix],
    confirmer: &Confirmer,
    config: &GuardConfig,
) -> Result<FileDisposition> {
    let mut accepted: Vec<Fix> = Vec::new();

    for fix in fixes {
        if config.show_fix_diff {
            print_fix(fix);
        }
        let resolved = confirmer.confirm(&format!("  Apply fix at line {}?", fix.line), false);
        if resolved.abort {
            return Ok(FileDisposition::Aborted);
        }
        if resolved.decision.accepted {
            accepted.push(fix.clone());
        }
    }

    if accepted.is_empty() {
        return Ok(FileDisposition::Declined);
    }

    let txn = FileTransaction::begin(full)?;
    match txn.apply_fixes(&accepted) {
        Ok(n) if n > 0 => {
            txn.commit()?;
            Ok(FileDisposition::Kept)
        }
        Ok(_) => {
            txn.abort()?;
            Ok(FileDisposition::Declined)
        }
        Err(err) => {
            txn.abort()?;
            Err(err)
        }
    }
}

/// Synthesize fixes for every actionable issue in the file. At most one fix
/// per issue; issues with no safe rewrite stay informational.
fn synthesize_all(issues: &[Issue], rules: &[Rule], content: &str) -> Vec<Fix> {
    let declared: HashSet<String> = declared_identifiers(content);
    let lines: Vec<&str> = content.lines().collect();
    let mut fixes = Vec::new();

    for issue in issues.iter().filter(|i| i.actionable) {
        let Some(rule) = rules.iter().find(|r| r.id == issue.rule_id) else { continue };
        let Some(line_text) = lines.get(issue.line - 1) else { continue };
        if let Some(fix) = synthesize_fix(issue, rule, line_text, &declared) {
            fixes.push(fix);
        }
    }

    fixes
}

fn report_issues(path: &str, issues: &[Issue]) {
    println!("\n  {}", path);
    for issue in issues {
        let note = if issue.actionable { "" } else { "  (not part of this commit)" };
        println!(
            "    {} line {:>4}  [{}] {}{}",
            issue.severity.icon(),
            issue.line,
            issue.severity.as_str(),
            issue.message,
            note
        );
    }
}

fn print_fix(fix: &Fix) {
    println!("    line {}:", fix.line);
    for line in fix.original_text.lines() {
        println!("      - {}", line);
    }
    for line in fix.replacement_text.lines() {
        println!("      + {}", line);
    }
}

/// Re-stage every modified file and commit. libgit2 runs no hooks, so this
/// cannot re-enter the guard. A failed commit is reported and left for the
/// user; the fixes stay staged.
fn recommit(repo_path: &Path, modified: &[String]) {
    for path in modified {
        if let Err(err) = git_ops::stage_file(repo_path, path) {
            eprintln!("  Warning: failed to re-stage {}: {}", path, err);
        }
    }

    let branch = git_ops::current_branch(repo_path).unwrap_or_else(|_| "detached".to_string());
    let message = git_ops::recommit_message(&branch, modified.len());

    match git_ops::commit_staged(repo_path, &message) {
        Ok(oid) => println!("\n  Committed {} file(s) as {} ({})", modified.len(), &oid[..8.min(oid.len())], message),
        Err(err) => {
            eprintln!("  Warning: commit failed: {}", err);
            eprintln!("  Your files are fixed and staged; commit manually when ready.");
        }
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("    {}", l)).collect::<Vec<_>>().join("\n")
}
