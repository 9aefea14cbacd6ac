//! Guard configuration
//!
//! A single immutable snapshot of the `AI_*` environment variables, taken at
//! startup and threaded explicitly into the confirmation controller and the
//! session driver. Nothing reads ambient process state after this.

/// What a timed-out or non-interactive confirmation resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultOnCancel {
    /// Reject and block the commit entirely
    #[default]
    Cancel,
    /// Reject the fixes but let the commit proceed
    Skip,
    /// Accept and apply every pending fix
    AutoApply,
}

impl DefaultOnCancel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultOnCancel::Cancel => "cancel",
            DefaultOnCancel::Skip => "skip",
            DefaultOnCancel::AutoApply => "auto-apply",
        }
    }
}

impl std::str::FromStr for DefaultOnCancel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(DefaultOnCancel::Cancel),
            "skip" => Ok(DefaultOnCancel::Skip),
            "auto-apply" => Ok(DefaultOnCancel::AutoApply),
            other => Err(format!("unknown default-on-cancel policy: {}", other)),
        }
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Open the editor at the first actionable issue location
    pub auto_open_editor: bool,
    /// Print literal before/after text for each fix
    pub show_fix_diff: bool,
    /// Fallback when a confirmation cannot be completed
    pub default_on_cancel: DefaultOnCancel,
    /// Prompt timeout in milliseconds; 0 waits indefinitely
    pub prompt_timeout_ms: u64,
    /// Prompt even when the session is not a terminal
    pub force_interactive: bool,
    /// Deterministic answer for automated runs; bypasses all prompting
    pub simulate_response: Option<bool>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            auto_open_editor: false,
            show_fix_diff: true,
            default_on_cancel: DefaultOnCancel::Cancel,
            prompt_timeout_ms: 30_000,
            force_interactive: false,
            simulate_response: None,
        }
    }
}

impl GuardConfig {
    /// Snapshot configuration from the environment.
    ///
    /// Unset or unparsable values fall back to defaults with a warning; a bad
    /// variable should never abort the guard.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_on_cancel = match std::env::var("AI_DEFAULT_ON_CANCEL") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                eprintln!("  Warning: {}; using '{}'", err, defaults.default_on_cancel.as_str());
                defaults.default_on_cancel
            }),
            Err(_) => defaults.default_on_cancel,
        };

        let prompt_timeout_ms = match std::env::var("AI_PROMPT_TIMEOUT_MS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                eprintln!("  Warning: invalid AI_PROMPT_TIMEOUT_MS '{}'; using {}", raw, defaults.prompt_timeout_ms);
                defaults.prompt_timeout_ms
            }),
            Err(_) => defaults.prompt_timeout_ms,
        };

        Self {
            auto_open_editor: env_flag("AI_AUTO_OPEN_EDITOR", defaults.auto_open_editor),
            show_fix_diff: env_flag("AI_SHOW_FIX_DIFF", defaults.show_fix_diff),
            default_on_cancel,
            prompt_timeout_ms,
            force_interactive: env_flag("AI_FORCE_INTERACTIVE", defaults.force_interactive),
            simulate_response: std::env::var("AI_SIMULATE_RESPONSE").ok().and_then(|v| parse_bool(&v)),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name).ok().and_then(|v| parse_bool(&v)).unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" | "accept" => Some(true),
        "0" | "false" | "no" | "n" | "off" | "reject" => Some(false),
        _ => None,
    }
}
