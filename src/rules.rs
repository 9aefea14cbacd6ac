//! Detection rule model
//!
//! Rules are read-only configuration: a pattern, a severity, a message, and an
//! optional rewrite strategy drawn from a small closed set. The built-in
//! catalogue targets JavaScript/TypeScript sources.

use anyhow::{Context, Result};
use regex::Regex;

/// How bad a match is. Only Critical and High matches are eligible for
/// automatic rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "●",
            Severity::High => "●",
            Severity::Medium => "○",
            Severity::Low => "·",
        }
    }

    /// Severe enough to become an auto-fix candidate
    pub fn is_actionable(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Rewrite strategy for a rule, dispatched by the fix synthesizer.
///
/// A closed set of behaviors rather than arbitrary code: every rule either
/// maps to one of these or produces informational matches only.
#[derive(Debug, Clone)]
pub enum RewriteStrategy {
    /// Literal token substitution on the matched line (`var ` -> `let `)
    ReplaceToken { from: String, to: String },
    /// Regex capture re-emitted through a `$n` template; applied only when the
    /// line contains exactly one unambiguous match
    RewriteCall { find: Regex, template: String },
    /// Prefix the line with a comment marker instead of deleting it
    CommentOut,
    /// Prepend a declaration for the flagged identifier, with a default value
    /// inferred from how the line uses it
    InsertDeclaration,
}

/// A single detection rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub pattern: Regex,
    pub severity: Severity,
    pub message: String,
    pub strategy: Option<RewriteStrategy>,
    /// When true, the detector only flags a match if the first capture group
    /// names an identifier with no declaration anywhere in the file.
    pub requires_undeclared: bool,
}

impl Rule {
    pub fn new(id: &str, pattern: &str, severity: Severity, message: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).with_context(|| format!("invalid pattern for rule '{}'", id))?;
        Ok(Self {
            id: id.to_string(),
            pattern,
            severity,
            message: message.to_string(),
            strategy: None,
            requires_undeclared: false,
        })
    }

    pub fn with_strategy(mut self, strategy: RewriteStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn undeclared_only(mut self) -> Self {
        self.requires_undeclared = true;
        self
    }
}

/// The built-in rule catalogue.
///
/// Intentionally small: only patterns with a high signal-to-noise ratio on
/// staged JS/TS code. Callers can substitute their own list; everything
/// downstream treats rules as opaque configuration.
pub fn default_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::new(
            "empty-catch",
            r"catch\s*\(\s*\w+\s*\)\s*\{\s*\}",
            Severity::High,
            "Empty catch block swallows errors",
        )?
        .with_strategy(RewriteStrategy::RewriteCall {
            find: Regex::new(r"catch\s*\(\s*(\w+)\s*\)\s*\{\s*\}").context("empty-catch rewrite")?,
            template: "catch ($1) { console.error($1); }".to_string(),
        }),
        Rule::new(
            "hardcoded-credential",
            r#"(?i)[\w$]*(?:token|secret|password|api_?key)[\w$]*\s*[:=]\s*["'][^"']+["']"#,
            Severity::Critical,
            "Possible hardcoded credential",
        )?,
        Rule::new(
            "debug-print",
            r"console\.(?:log|debug)\s*\(",
            Severity::High,
            "Debug output statement left in code",
        )?
        .with_strategy(RewriteStrategy::CommentOut),
        Rule::new(
            "legacy-var",
            r"^\s*var\s+\w+",
            Severity::High,
            "Legacy 'var' declaration; prefer 'let'",
        )?
        .with_strategy(RewriteStrategy::ReplaceToken {
            from: "var ".to_string(),
            to: "let ".to_string(),
        }),
        Rule::new(
            "deprecated-buffer",
            r"new\s+Buffer\s*\(",
            Severity::High,
            "Deprecated Buffer constructor; use Buffer.from",
        )?
        .with_strategy(RewriteStrategy::RewriteCall {
            find: Regex::new(r"new\s+Buffer\s*\(([^)]*)\)").context("deprecated-buffer rewrite")?,
            template: "Buffer.from($1)".to_string(),
        }),
        Rule::new(
            "undeclared-assignment",
            r"^\s*([A-Za-z_$][\w$]*)\s*(?:=[^=]|\+=|-=|\+\+|\.push\b)",
            Severity::High,
            "Assignment to a possibly undeclared identifier",
        )?
        .with_strategy(RewriteStrategy::InsertDeclaration)
        .undeclared_only(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parsing() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("low".parse::<Severity>().unwrap(), Severity::Low);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_only_high_and_critical_are_actionable() {
        assert!(Severity::Critical.is_actionable());
        assert!(Severity::High.is_actionable());
        assert!(!Severity::Medium.is_actionable());
        assert!(!Severity::Low.is_actionable());
    }

    #[test]
    fn test_default_rules_compile() {
        let rules = default_rules().unwrap();
        assert!(rules.len() >= 5);
        assert!(rules.iter().any(|r| r.id == "empty-catch"));
    }

    #[test]
    fn test_empty_catch_matches() {
        let rules = default_rules().unwrap();
        let rule = rules.iter().find(|r| r.id == "empty-catch").unwrap();
        assert!(rule.pattern.is_match("} catch (e) {}"));
        assert!(!rule.pattern.is_match("} catch (e) { handle(e); }"));
    }

    #[test]
    fn test_credential_rule_matches_assignments() {
        let rules = default_rules().unwrap();
        let rule = rules.iter().find(|r| r.id == "hardcoded-credential").unwrap();
        assert!(rule.pattern.is_match(r#"const userToken = "abc123";"#));
        assert!(rule.pattern.is_match(r#"apiKey: 'sk-999'"#));
        assert!(!rule.pattern.is_match("const token = readToken();"));
    }
}
