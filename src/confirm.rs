//! Interactive confirmation with bounded waits
//!
//! Every review unit (a file's fix set, or one fix) moves through
//! Pending -> Accepted | Rejected | TimedOut. A timed-out or non-interactive
//! wait resolves through the configured default-on-cancel policy; prompting
//! never hangs a headless session.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::config::{DefaultOnCancel, GuardConfig};

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    User,
    TimeoutDefault,
    NonInteractiveDefault,
}

/// Terminal decision for one review unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewDecision {
    pub accepted: bool,
    pub source: DecisionSource,
}

/// Result of asking the user about one review unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub decision: ReviewDecision,
    /// User asked to review the unit's fixes one by one
    pub inspect: bool,
    /// The cancel policy fired: stop the whole run and block the commit
    pub abort: bool,
}

/// What the bounded key wait produced before policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Accepted,
    Rejected,
    Inspect,
    TimedOut,
}

/// Confirmation controller. Holds the immutable run configuration; all waits
/// are bounded by `prompt_timeout_ms` (0 = wait indefinitely).
pub struct Confirmer<'a> {
    config: &'a GuardConfig,
}

impl<'a> Confirmer<'a> {
    pub fn new(config: &'a GuardConfig) -> Self {
        Self { config }
    }

    /// Ask about one review unit.
    ///
    /// Resolution order: a configured simulation value answers immediately;
    /// an interactive (or forced) session prompts with a bounded wait; a
    /// non-interactive session resolves straight to the timeout path. The
    /// timeout path applies the default-on-cancel policy.
    pub fn confirm(&self, prompt: &str, allow_inspect: bool) -> Resolved {
        if let Some(answer) = self.config.simulate_response {
            return Resolved {
                decision: ReviewDecision {
                    accepted: answer,
                    source: DecisionSource::NonInteractiveDefault,
                },
                inspect: false,
                abort: false,
            };
        }

        let interactive = io::stdin().is_terminal() || self.config.force_interactive;
        let outcome = if interactive {
            self.prompt_with_timeout(prompt, allow_inspect)
        } else {
            WaitOutcome::TimedOut
        };

        match outcome {
            WaitOutcome::Accepted => Resolved {
                decision: ReviewDecision { accepted: true, source: DecisionSource::User },
                inspect: false,
                abort: false,
            },
            WaitOutcome::Rejected => Resolved {
                decision: ReviewDecision { accepted: false, source: DecisionSource::User },
                inspect: false,
                abort: false,
            },
            WaitOutcome::Inspect => Resolved {
                decision: ReviewDecision { accepted: false, source: DecisionSource::User },
                inspect: true,
                abort: false,
            },
            WaitOutcome::TimedOut => resolve_timeout(self.config.default_on_cancel, interactive),
        }
    }

    /// Race user input against the timeout: single deterministic winner.
    fn prompt_with_timeout(&self, prompt: &str, allow_inspect: bool) -> WaitOutcome {
        let keys = if allow_inspect { "[y]es / [n]o / [i]nspect" } else { "[y]es / [n]o" };
        eprint!("{} {} ", prompt, keys);
        let _ = io::stderr().flush();

        let outcome = self.wait_for_key(allow_inspect);
        eprintln!();
        outcome
    }

    fn wait_for_key(&self, allow_inspect: bool) -> WaitOutcome {
        if enable_raw_mode().is_err() {
            // No usable terminal after all; fall through to the timeout path
            return WaitOutcome::TimedOut;
        }

        let deadline = if self.config.prompt_timeout_ms == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_millis(self.config.prompt_timeout_ms))
        };

        let outcome = loop {
            let wait = match deadline {
                Some(d) => match d.checked_duration_since(Instant::now()) {
                    Some(left) => left.min(Duration::from_millis(250)),
                    None => break WaitOutcome::TimedOut,
                },
                None => Duration::from_millis(250),
            };

            match event::poll(wait) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                            break WaitOutcome::Accepted
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
                            break WaitOutcome::Rejected
                        }
                        KeyCode::Char('i') | KeyCode::Char('I') if allow_inspect => {
                            break WaitOutcome::Inspect
                        }
                        _ => {}
                    },
                    Ok(_) => {}
                    Err(_) => break WaitOutcome::TimedOut,
                },
                Ok(false) => {}
                Err(_) => break WaitOutcome::TimedOut,
            }
        };

        let _ = disable_raw_mode();
        outcome
    }
}

/// Map a timed-out (or never-started) wait through the cancel policy.
fn resolve_timeout(policy: DefaultOnCancel, was_interactive: bool) -> Resolved {
    let source = if was_interactive {
        DecisionSource::TimeoutDefault
    } else {
        DecisionSource::NonInteractiveDefault
    };
    match policy {
        DefaultOnCancel::AutoApply => Resolved {
            decision: ReviewDecision { accepted: true, source },
            inspect: false,
            abort: false,
        },
        DefaultOnCancel::Skip => Resolved {
            decision: ReviewDecision { accepted: false, source },
            inspect: false,
            abort: false,
        },
        DefaultOnCancel::Cancel => Resolved {
            decision: ReviewDecision { accepted: false, source },
            inspect: false,
            abort: true,
        },
    }
}
