//! Git operations for the guard-and-recommit workflow
//!
//! Staged-diff extraction, re-staging, and the final commit. Commits go
//! through libgit2, which never executes hooks, so the guard cannot trigger
//! its own pre-commit integration point again.

use anyhow::{Context, Result};
use git2::{DiffFormat, DiffOptions, Repository, Signature};
use regex::Regex;
use std::path::Path;

/// Unified diff text of everything currently staged (index vs. HEAD).
///
/// Returns an empty string for an empty stage. On an unborn branch the whole
/// index counts as staged.
pub fn staged_diff(repo_path: &Path) -> Result<String> {
    let repo = Repository::open(repo_path).context("failed to open repository")?;

    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("failed to resolve HEAD tree")?),
        Err(_) => None, // unborn branch: no commits yet
    };

    let mut opts = DiffOptions::new();
    opts.context_lines(3);
    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
        .context("failed to diff index against HEAD")?;

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if matches!(origin, '+' | '-' | ' ') {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("failed to render staged diff")?;

    Ok(text)
}

/// Current branch shorthand, or "detached".
pub fn current_branch(repo_path: &Path) -> Result<String> {
    let repo = Repository::open(repo_path)?;
    let head = repo.head().context("failed to get HEAD")?;
    Ok(head.shorthand().unwrap_or("detached").to_string())
}

/// Stage a specific file
pub fn stage_file(repo_path: &Path, file_path: &str) -> Result<()> {
    let repo = Repository::open(repo_path)?;
    let mut index = repo.index()?;

    index.add_path(Path::new(file_path))?;
    index.write()?;

    Ok(())
}

/// Commit staged changes.
///
/// libgit2 performs the commit object write directly and runs no hooks, which
/// is the re-entrancy bypass this tool needs.
pub fn commit_staged(repo_path: &Path, message: &str) -> Result<String> {
    let repo = Repository::open(repo_path)?;
    let mut index = repo.index()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit()?],
        Err(_) => vec![], // initial commit
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    // Get author info from git config
    let config = repo.config()?;
    let name = config.get_string("user.name").unwrap_or_else(|_| "commitguard".to_string());
    let email = config.get_string("user.email").unwrap_or_else(|_| "commitguard@local".to_string());

    let sig = Signature::now(&name, &email)?;

    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;

    Ok(oid.to_string())
}

/// Extract a ticket token (JIRA-style `ABC-123`) from a branch name.
pub fn ticket_from_branch(branch: &str) -> Option<String> {
    let pattern = Regex::new(r"[A-Z][A-Z0-9]+-\d+").expect("ticket pattern");
    pattern.find(branch).map(|m| m.as_str().to_string())
}

/// Synthesize the recommit message: ticket token (or a generic token) plus a
/// count of modified files.
pub fn recommit_message(branch: &str, file_count: usize) -> String {
    let token = ticket_from_branch(branch).unwrap_or_else(|| "chore".to_string());
    format!(
        "{}: apply {} guard fix{} before commit",
        token,
        file_count,
        if file_count == 1 { "" } else { "es" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_extracted_from_branch() {
        assert_eq!(ticket_from_branch("feature/PROJ-142-add-login"), Some("PROJ-142".to_string()));
        assert_eq!(ticket_from_branch("bugfix/ABC-7"), Some("ABC-7".to_string()));
        assert_eq!(ticket_from_branch("main"), None);
    }

    #[test]
    fn test_recommit_message_shape() {
        assert_eq!(
            recommit_message("feature/PROJ-142-login", 2),
            "PROJ-142: apply 2 guard fixes before commit"
        );
        assert_eq!(recommit_message("main", 1), "chore: apply 1 guard fix before commit");
    }
}
