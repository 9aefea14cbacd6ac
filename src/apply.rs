//! Fix application with backup and rollback
//!
//! A [`FileTransaction`] snapshots a file before its first write and restores
//! it byte-for-byte if the session rejects the changes. Writes go through a
//! temp file and rename so a failure never leaves a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::fix::Fix;

/// Record of one live backup. Exactly one exists per modified file per
/// session; removed when the file's disposition is finalized.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub file: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Scoped begin/commit/abort wrapper around one file's fix application.
///
/// Dropping an unfinalized transaction restores the original content, so
/// every exit path (including early returns and panics during review) leaves
/// the file as it was.
#[derive(Debug)]
pub struct FileTransaction {
    record: BackupRecord,
    finalized: bool,
}

impl FileTransaction {
    /// Snapshot `path` to a sibling `<name>.orig` backup.
    pub fn begin(path: &Path) -> Result<Self> {
        let mut backup_name = path
            .file_name()
            .context("backup target has no file name")?
            .to_os_string();
        backup_name.push(".orig");
        let backup_path = path.with_file_name(backup_name);

        fs::copy(path, &backup_path)
            .with_context(|| format!("failed to back up {}", path.display()))?;

        Ok(Self {
            record: BackupRecord {
                file: path.to_path_buf(),
                backup_path,
                created_at: Utc::now(),
            },
            finalized: false,
        })
    }

    pub fn record(&self) -> &BackupRecord {
        &self.record
    }

    /// Apply `fixes` to the file, descending by line number, one exact
    /// substring replacement each (first occurrence only). Returns how many
    /// fixes matched and were applied.
    ///
    /// The whole result is written atomically; a fix whose original text is
    /// no longer present is skipped with a warning.
    pub fn apply_fixes(&self, fixes: &[Fix]) -> Result<usize> {
        let mut content = fs::read_to_string(&self.record.file)
            .with_context(|| format!("failed to read {}", self.record.file.display()))?;

        let mut ordered: Vec<&Fix> = fixes.iter().collect();
        ordered.sort_by(|a, b| b.line.cmp(&a.line));

        let mut applied = 0;
        for fix in ordered {
            if content.contains(&fix.original_text) {
                content = content.replacen(&fix.original_text, &fix.replacement_text, 1);
                applied += 1;
            } else {
                eprintln!(
                    "  Warning: fix target not found at {}:{}; skipping",
                    fix.file, fix.line
                );
            }
        }

        write_atomic(&self.record.file, &content)?;
        Ok(applied)
    }

    /// Keep the applied fixes and discard the backup.
    pub fn commit(mut self) -> Result<()> {
        fs::remove_file(&self.record.backup_path)
            .with_context(|| format!("failed to remove backup {}", self.record.backup_path.display()))?;
        self.finalized = true;
        Ok(())
    }

    /// Restore the pre-session content and discard the backup.
    pub fn abort(mut self) -> Result<()> {
        fs::copy(&self.record.backup_path, &self.record.file)
            .with_context(|| format!("failed to restore {}", self.record.file.display()))?;
        fs::remove_file(&self.record.backup_path).with_context(|| {
            format!("failed to remove backup {}", self.record.backup_path.display())
        })?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for FileTransaction {
    fn drop(&mut self) {
        if !self.finalized && self.record.backup_path.exists() {
            let _ = fs::copy(&self.record.backup_path, &self.record.file);
            let _ = fs::remove_file(&self.record.backup_path);
        }
    }
}

/// Write via temp file + rename so the target is never half-written. The
/// temp name appends to the full file name (`app.js` -> `app.js.tmp`) so it
/// can never collide with a sibling that merely shares the stem.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .context("write target has no file name")?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fix(file: &str, line: usize, original: &str, replacement: &str) -> Fix {
        Fix {
            file: file.to_string(),
            line,
            original_text: original.to_string(),
            replacement_text: replacement.to_string(),
        }
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_apply_then_commit() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.js", "var x = 1;\nconsole.log(x);\n");

        let txn = FileTransaction::begin(&path).unwrap();
        let backup = txn.record().backup_path.clone();
        assert!(backup.exists());

        let applied = txn
            .apply_fixes(&[fix("a.js", 1, "var x = 1;", "let x = 1;")])
            .unwrap();
        assert_eq!(applied, 1);
        txn.commit().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("let x = 1;"));
        assert!(!content.contains("var x = 1;"));
        assert!(!backup.exists());
    }

    #[test]
    fn test_abort_restores_byte_identical() {
        let dir = TempDir::new().unwrap();
        let original = "var x = 1;\nconsole.log(x);\n";
        let path = write_file(&dir, "a.js", original);

        let txn = FileTransaction::begin(&path).unwrap();
        txn.apply_fixes(&[fix("a.js", 1, "var x = 1;", "let x = 1;")]).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("let x"));

        txn.abort().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        assert!(!path.with_file_name("a.js.orig").exists());
    }

    #[test]
    fn test_drop_without_finalize_restores() {
        let dir = TempDir::new().unwrap();
        let original = "one\ntwo\n";
        let path = write_file(&dir, "a.js", original);

        {
            let txn = FileTransaction::begin(&path).unwrap();
            txn.apply_fixes(&[fix("a.js", 1, "one", "ONE")]).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_descending_order_survives_insertion_fix() {
        // A declaration insertion at line 8 must not break a later fix at
        // line 20: descending application touches line 20 first, and the
        // line-8 fix replaces by substring, not position.
        let dir = TempDir::new().unwrap();
        let mut content = String::new();
        for i in 1..=25 {
            match i {
                8 => content.push_str("items.push(x);\n"),
                20 => content.push_str("var flag = true;\n"),
                _ => content.push_str(&format!("line{}();\n", i)),
            }
        }
        let path = write_file(&dir, "a.js", &content);

        let txn = FileTransaction::begin(&path).unwrap();
        let applied = txn
            .apply_fixes(&[
                fix("a.js", 8, "items.push(x);", "let items = [];\nitems.push(x);"),
                fix("a.js", 20, "var flag = true;", "let flag = true;"),
            ])
            .unwrap();
        assert_eq!(applied, 2);
        txn.commit().unwrap();

        let result = fs::read_to_string(&path).unwrap();
        assert!(result.contains("let items = [];\nitems.push(x);"));
        assert!(result.contains("let flag = true;"));
        assert!(!result.contains("var flag"));
    }

    #[test]
    fn test_missing_target_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.js", "unchanged\n");

        let txn = FileTransaction::begin(&path).unwrap();
        let applied = txn
            .apply_fixes(&[fix("a.js", 1, "no such text", "replacement")])
            .unwrap();
        assert_eq!(applied, 0);
        txn.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "unchanged\n");
    }

    #[test]
    fn test_temp_file_never_clobbers_stem_sibling() {
        // Writing app.js must not touch an unrelated app.tmp next to it
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "app.js", "var x = 1;\n");
        let sibling = write_file(&dir, "app.tmp", "keep me\n");

        let txn = FileTransaction::begin(&path).unwrap();
        txn.apply_fixes(&[fix("app.js", 1, "var x = 1;", "let x = 1;")]).unwrap();
        txn.commit().unwrap();

        assert_eq!(fs::read_to_string(&sibling).unwrap(), "keep me\n");
        assert!(fs::read_to_string(&path).unwrap().contains("let x = 1;"));
        assert!(!dir.path().join("app.js.tmp").exists());
    }

    #[test]
    fn test_first_occurrence_only() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.js", "dup();\ndup();\n");

        let txn = FileTransaction::begin(&path).unwrap();
        txn.apply_fixes(&[fix("a.js", 1, "dup();", "fixed();")]).unwrap();
        txn.commit().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fixed();\ndup();\n");
    }
}
