//! Editor integration
//!
//! Locates a usable editor and opens it at a file:line location. This is a
//! collaborator at the edge of the guard: probing is bounded by a short
//! timeout. GUI editors detach; terminal editors run to completion, since
//! they own the tty until the user exits.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// The editor command to use: `$VISUAL`, then `$EDITOR`, then VS Code if its
/// CLI responds to a version probe.
pub fn editor_command() -> Option<String> {
    if let Ok(visual) = std::env::var("VISUAL") {
        if !visual.trim().is_empty() {
            return Some(visual);
        }
    }
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.trim().is_empty() {
            return Some(editor);
        }
    }
    if probe("code") {
        return Some("code".to_string());
    }
    None
}

/// Open the editor at `path:line`. Returns false when no editor is available
/// or launching fails; the guard continues either way.
///
/// VS Code detaches and returns immediately. A terminal editor takes over
/// the tty, so we wait for it to exit before resuming our own prompt.
pub fn open_at(path: &Path, line: usize) -> bool {
    let Some(editor) = editor_command() else { return false };

    if editor == "code" || editor.ends_with("/code") {
        Command::new(&editor)
            .arg("--goto")
            .arg(format!("{}:{}", path.display(), line))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .is_ok()
    } else {
        // vi-style editors accept +line
        Command::new(&editor)
            .arg(format!("+{}", line))
            .arg(path)
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Check that `bin --version` answers within the probe timeout.
fn probe(bin: &str) -> bool {
    let child = Command::new(bin)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let Ok(mut child) = child else { return false };

    let deadline = Instant::now() + PROBE_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(_) => return false,
        }
    }
}
