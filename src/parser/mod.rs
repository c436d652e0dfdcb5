//! # Statement Dispatcher
//!
//! Ordered trial-parsing of model statements. Each statement is offered to
//! specialized recognizers in a fixed order; the first to claim it wins.
//! A recognizer reports one of three outcomes:
//!
//! - `NotMine` - the statement has a different shape, try the next one;
//! - `Accepted` - recognized and recorded in the repository;
//! - `Rejected` - recognized but invalid, with a message.
//!
//! The distinction between `NotMine` and `Rejected` is load-bearing: only
//! the final "unknown statement type" of an all-`NotMine` run, or an
//! explicit rejection, becomes user-visible.

pub mod constraint;
pub mod decl;
pub mod expression;
pub mod linearize;
pub mod preprocess;

use crate::config::LimitsConfig;
use crate::model::ModelRepository;

/// Outcome of offering a statement to one recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The statement has a different shape; the dispatcher moves on.
    NotMine,
    /// Recognized and recorded.
    Accepted,
    /// Recognized but invalid.
    Rejected(String),
}

impl Recognition {
    pub fn is_final(&self) -> bool {
        !matches!(self, Recognition::NotMine)
    }
}

/// Offer a statement to every recognizer in dispatch order. `line` is the
/// statement's origin, carried into templates for per-instance diagnostics.
pub fn dispatch_statement(
    text: &str,
    line: usize,
    repo: &mut ModelRepository,
    limits: &LimitsConfig,
) -> Recognition {
    let recognizers: &[fn(&str, usize, &mut ModelRepository, &LimitsConfig) -> Recognition] = &[
        decl::recognize_multidim_parameter,
        decl::recognize_parameter,
        decl::recognize_index_set,
        decl::recognize_dvar,
        decl::recognize_var,
        decl::recognize_primitive_set,
        decl::recognize_tuple_set,
        decl::recognize_set_comprehension,
        decl::recognize_dexpr,
        decl::recognize_constraint_forward_decl,
        constraint::recognize_template,
        constraint::recognize_scalar_constraint,
        constraint::recognize_objective,
    ];
    for recognize in recognizers {
        let outcome = recognize(text, line, repo, limits);
        if outcome.is_final() {
            return outcome;
        }
    }
    Recognition::Rejected("unknown statement type".to_string())
}

// ============================================================================
// Shared string utilities
// ============================================================================

/// Identifier syntax shared by every entity kind.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split by comma at depth 0, respecting parens, brackets, braces, angle
/// keys, and strings.
pub fn split_top_level_commas(input: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' | '[' | '{' | '<' if !in_string => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' | '>' if !in_string => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 && !in_string => {
                result.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        result.push(current.trim().to_string());
    }
    result
}

/// Find the one top-level relational operator of a constraint body.
/// Returns `(lhs, op_token, rhs)`. Errors on zero or duplicate operators,
/// and flags a single `=` as assignment syntax.
pub fn split_relational(text: &str) -> Result<Option<(String, String, String)>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut found: Option<(usize, usize, String)> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if in_string {
            i += 1;
            continue;
        }
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '<' | '>' | '=' | '≤' | '≥' if depth == 0 => {
                let (token, width) = if c == '≤' || c == '≥' {
                    (c.to_string(), 1)
                } else if chars.get(i + 1) == Some(&'=') {
                    (format!("{c}="), 2)
                } else if c == '=' {
                    return Err("'=' is assignment; use '==' for equality".to_string());
                } else {
                    (c.to_string(), 1)
                };
                if found.is_some() {
                    return Err("duplicate relational operator in constraint".to_string());
                }
                found = Some((i, i + width, token));
                i += width;
                continue;
            }
            '!' if depth == 0 && chars.get(i + 1) == Some(&'=') => {
                return Err("'!=' is not a valid constraint operator".to_string());
            }
            _ => {}
        }
        i += 1;
    }
    Ok(found.map(|(start, end, token)| {
        let lhs: String = chars[..start].iter().collect();
        let rhs: String = chars[end..].iter().collect();
        (lhs.trim().to_string(), token, rhs.trim().to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("x"));
        assert!(is_identifier("total_cost"));
        assert!(is_identifier("N1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("_x"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_split_top_level_commas_respects_nesting() {
        let parts = split_top_level_commas("a, f(b, c), d[1,2], <e, f>");
        assert_eq!(parts, vec!["a", "f(b, c)", "d[1,2]", "<e, f>"]);
    }

    #[test]
    fn test_split_relational_basic() {
        let (lhs, op, rhs) = split_relational("x + y <= 10").unwrap().unwrap();
        assert_eq!(lhs, "x + y");
        assert_eq!(op, "<=");
        assert_eq!(rhs, "10");
    }

    #[test]
    fn test_split_relational_ignores_nested() {
        let (lhs, op, rhs) = split_relational("sum(i in I : i < 2) x[i] == 1")
            .unwrap()
            .unwrap();
        assert_eq!(lhs, "sum(i in I : i < 2) x[i]");
        assert_eq!(op, "==");
        assert_eq!(rhs, "1");
    }

    #[test]
    fn test_split_relational_flags_assignment() {
        let err = split_relational("x + y = 10").unwrap_err();
        assert!(err.contains("assignment"));
    }

    #[test]
    fn test_split_relational_flags_duplicates() {
        let err = split_relational("1 <= x <= 10").unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_split_relational_none() {
        assert!(split_relational("x + y").unwrap().is_none());
    }
}
