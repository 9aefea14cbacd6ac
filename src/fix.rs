//! Fix synthesis
//!
//! Turns an actionable issue into a literal original-text -> replacement-text
//! pair via the rule's rewrite strategy. Declines whenever no safe rewrite
//! exists; an issue without a fix stays visible to the user but is never
//! applied automatically.

use std::collections::HashSet;

use crate::detect::Issue;
use crate::rules::{RewriteStrategy, Rule};

/// A literal line-level replacement derived from one actionable issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub file: String,
    pub line: usize,
    pub original_text: String,
    pub replacement_text: String,
}

/// Synthesize a fix for `issue` using `rule`'s strategy.
///
/// `line_text` is the full text of the flagged line; `declared` is the
/// whole-file declared-identifier set, consulted so a declaration insertion
/// never duplicates an existing declaration. Returns `None` when the strategy
/// does not apply or the rewrite would be a no-op.
pub fn synthesize_fix(
    issue: &Issue,
    rule: &Rule,
    line_text: &str,
    declared: &HashSet<String>,
) -> Option<Fix> {
    let strategy = rule.strategy.as_ref()?;

    let replacement = match strategy {
        RewriteStrategy::ReplaceToken { from, to } => {
            if !line_text.contains(from.as_str()) {
                return None;
            }
            line_text.replacen(from.as_str(), to.as_str(), 1)
        }
        RewriteStrategy::RewriteCall { find, template } => {
            // Only rewrite an unambiguous single match on the line
            if find.find_iter(line_text).count() != 1 {
                return None;
            }
            find.replace(line_text, template.as_str()).into_owned()
        }
        RewriteStrategy::CommentOut => {
            let indent_len = line_text.len() - line_text.trim_start().len();
            let (indent, rest) = line_text.split_at(indent_len);
            format!("{}// {}", indent, rest)
        }
        RewriteStrategy::InsertDeclaration => {
            let ident = rule
                .pattern
                .captures(line_text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())?;
            if declared.contains(&ident) {
                return None;
            }
            let value = default_value_for(&ident, line_text);
            let indent_len = line_text.len() - line_text.trim_start().len();
            let indent = &line_text[..indent_len];
            format!("{}let {} = {};\n{}", indent, ident, value, line_text)
        }
    };

    if replacement == line_text {
        return None;
    }

    Some(Fix {
        file: issue.file.clone(),
        line: issue.line,
        original_text: line_text.to_string(),
        replacement_text: replacement,
    })
}

/// Pick an initial value from how the flagged line uses the identifier:
/// collection-like usage gets an empty array, arithmetic gets zero, string
/// concatenation gets an empty string.
fn default_value_for(ident: &str, line_text: &str) -> &'static str {
    let after = line_text
        .split_once(ident)
        .map(|(_, rest)| rest)
        .unwrap_or(line_text);

    if after.trim_start().starts_with(".push")
        || after.trim_start().starts_with(".pop")
        || after.trim_start().starts_with('[')
    {
        "[]"
    } else if after.contains("++")
        || after.contains("+= ")
            && after
                .split("+=")
                .nth(1)
                .map(|rhs| rhs.trim_start().starts_with(|c: char| c.is_ascii_digit()))
                .unwrap_or(false)
        || after.contains("-=")
        || after.contains("*=")
        || after.contains("/=")
    {
        "0"
    } else if after.contains('\'') || after.contains('"') || after.contains('`') {
        "''"
    } else {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{default_rules, Severity};

    fn issue_at(file: &str, line: usize, matched: &str, severity: Severity) -> Issue {
        Issue {
            rule_id: String::new(),
            file: file.to_string(),
            line,
            severity,
            message: String::new(),
            matched_text: matched.to_string(),
            actionable: true,
        }
    }

    fn rule(id: &str) -> Rule {
        default_rules()
            .unwrap()
            .into_iter()
            .find(|r| r.id == id)
            .unwrap()
    }

    #[test]
    fn test_empty_catch_gains_logging() {
        let line = "try { run(); } catch (e) {}";
        let issue = issue_at("a.js", 12, "catch (e) {}", Severity::High);
        let fix = synthesize_fix(&issue, &rule("empty-catch"), line, &HashSet::new()).unwrap();
        assert_eq!(fix.replacement_text, "try { run(); } catch (e) { console.error(e); }");
        assert_eq!(fix.original_text, line);
    }

    #[test]
    fn test_var_rewritten_to_let() {
        let line = "  var count = 0;";
        let issue = issue_at("a.js", 3, "  var count", Severity::High);
        let fix = synthesize_fix(&issue, &rule("legacy-var"), line, &HashSet::new()).unwrap();
        assert_eq!(fix.replacement_text, "  let count = 0;");
    }

    #[test]
    fn test_debug_print_commented_out_preserving_indent() {
        let line = "    console.log(user);";
        let issue = issue_at("a.js", 7, "console.log(", Severity::High);
        let fix = synthesize_fix(&issue, &rule("debug-print"), line, &HashSet::new()).unwrap();
        assert_eq!(fix.replacement_text, "    // console.log(user);");
    }

    #[test]
    fn test_buffer_call_reshaped() {
        let line = "const b = new Buffer(data);";
        let issue = issue_at("a.js", 1, "new Buffer(", Severity::High);
        let fix = synthesize_fix(&issue, &rule("deprecated-buffer"), line, &HashSet::new()).unwrap();
        assert_eq!(fix.replacement_text, "const b = Buffer.from(data);");
    }

    #[test]
    fn test_ambiguous_call_rewrite_declined() {
        let line = "use(new Buffer(a), new Buffer(b));";
        let issue = issue_at("a.js", 1, "new Buffer(", Severity::High);
        assert!(synthesize_fix(&issue, &rule("deprecated-buffer"), line, &HashSet::new()).is_none());
    }

    #[test]
    fn test_declaration_inserted_for_collection_usage() {
        let line = "  results.push(item);";
        let issue = issue_at("a.js", 8, "results.push", Severity::High);
        let fix = synthesize_fix(&issue, &rule("undeclared-assignment"), line, &HashSet::new()).unwrap();
        assert_eq!(fix.replacement_text, "  let results = [];\n  results.push(item);");
    }

    #[test]
    fn test_declaration_value_matches_usage() {
        let arithmetic = "total += 5;";
        let issue = issue_at("a.js", 1, "total", Severity::High);
        let fix =
            synthesize_fix(&issue, &rule("undeclared-assignment"), arithmetic, &HashSet::new()).unwrap();
        assert!(fix.replacement_text.starts_with("let total = 0;"));

        let stringy = "name = first + ' ' + last;";
        let issue = issue_at("a.js", 2, "name", Severity::High);
        let fix =
            synthesize_fix(&issue, &rule("undeclared-assignment"), stringy, &HashSet::new()).unwrap();
        assert!(fix.replacement_text.starts_with("let name = '';"));
    }

    #[test]
    fn test_declaration_skipped_when_already_declared() {
        let line = "results.push(item);";
        let issue = issue_at("a.js", 8, "results.push", Severity::High);
        let declared: HashSet<String> = ["results".to_string()].into_iter().collect();
        assert!(synthesize_fix(&issue, &rule("undeclared-assignment"), line, &declared).is_none());
    }

    #[test]
    fn test_declaration_skipped_for_comma_list_declarator() {
        // `b` is declared with an initializer after a comma; inserting
        // `let b = 0;` here would duplicate the declaration
        let content = "let a = 1, b = 2;\nb += 3;\n";
        let declared = crate::detect::declared_identifiers(content);
        let issue = issue_at("a.js", 2, "b", Severity::High);
        assert!(synthesize_fix(&issue, &rule("undeclared-assignment"), "b += 3;", &declared).is_none());
    }

    #[test]
    fn test_rule_without_strategy_yields_nothing() {
        let line = "const apiKey = \"sk-123\";";
        let issue = issue_at("a.js", 1, "apiKey = \"sk-123\"", Severity::Critical);
        assert!(synthesize_fix(&issue, &rule("hardcoded-credential"), line, &HashSet::new()).is_none());
    }
}
