//! Textual preprocessors run before constraint parsing.
//!
//! Two passes, in order:
//!
//! 1. **Summation expander** - rewrites `sum(i in S [: filter]) BODY` over
//!    the resolved set, substituting the iterator into `BODY` per element
//!    and emitting `(t1+t2+...+tn)` (`0` for an empty set). Substitution
//!    collapses decision-variable references to canonical scalar names
//!    (`x[3]` to `x3`) and keeps brackets on parameters and tuple sets
//!    (`cap[3]`).
//! 2. **Parentheses distributor** - rewrites `k * (a + b)` and
//!    `(a + b) * k` into distributed form so the linearizer consumes plain
//!    sums. `k` must be a single-term scalar; other shapes are untouched.

use crate::expr::{Binding, EvalContext};
use crate::model::ModelRepository;
use crate::parser::expression::{parse_expression, parse_iterator_specs};
use regex::Regex;

/// Expand every textual `sum(...)` in `text` over the current repository.
/// `max_rounds` bounds the rewrite loop against runaway nesting.
pub fn expand_summations(
    text: &str,
    repo: &ModelRepository,
    max_rounds: usize,
) -> Result<String, String> {
    let mut current = text.to_string();
    for _ in 0..max_rounds {
        match expand_first_summation(&current, repo)? {
            Some(rewritten) => current = rewritten,
            None => return Ok(current),
        }
    }
    Err(format!(
        "summation expansion did not terminate within {max_rounds} rounds"
    ))
}

/// Expand the leftmost expandable `sum(...)`; `None` when none remain.
fn expand_first_summation(
    text: &str,
    repo: &ModelRepository,
) -> Result<Option<String>, String> {
    let chars: Vec<char> = text.chars().collect();
    let Some(start) = find_sum_keyword(&chars) else {
        return Ok(None);
    };
    let open = skip_ws_from(&chars, start + 3);
    if chars.get(open) != Some(&'(') {
        return Err("expected '(' after sum".to_string());
    }
    let close =
        matching_paren(&chars, open).ok_or_else(|| "unbalanced parentheses in sum".to_string())?;
    let header: String = chars[open + 1..close].iter().collect();
    let specs = parse_iterator_specs(&header, repo, &[])?;

    let body_start = skip_ws_from(&chars, close + 1);
    let body_end = operand_end(&chars, body_start);
    if body_end <= body_start {
        return Err("sum(...) has an empty body".to_string());
    }
    let body: String = chars[body_start..body_end].iter().collect();

    // Tuple-bound iterators cannot be substituted textually; the structural
    // Sum node in the expression tree covers those, so leave the text alone.
    for spec in &specs {
        let elements = repo.iterate_set(&spec.set).map_err(|e| e.to_string())?;
        if elements
            .iter()
            .any(|b| matches!(b, Binding::Tuple(_)))
        {
            return Ok(None);
        }
    }

    let mut terms = Vec::new();
    walk_bindings(&specs, repo, &EvalContext::new(), 0, &body, &mut terms)?;

    let expansion = if terms.is_empty() {
        "0".to_string()
    } else {
        format!("({})", terms.join("+"))
    };

    let mut out: String = chars[..start].iter().collect();
    out.push_str(&expansion);
    out.extend(&chars[body_end..]);
    Ok(Some(out))
}

fn walk_bindings(
    specs: &[crate::expr::IteratorSpec],
    repo: &ModelRepository,
    ctx: &EvalContext,
    depth: usize,
    body: &str,
    terms: &mut Vec<String>,
) -> Result<(), String> {
    if depth == specs.len() {
        let mut term = body.to_string();
        for spec in specs {
            if let Some(binding) = ctx.get(&spec.var) {
                term = substitute_iterator(&term, &spec.var, binding, repo);
            }
        }
        terms.push(term.trim().to_string());
        return Ok(());
    }
    let spec = &specs[depth];
    for binding in repo.iterate_set(&spec.set).map_err(|e| e.to_string())? {
        let inner = ctx.bind(&spec.var, binding);
        if let Some(filter) = &spec.filter {
            let keep = filter
                .evaluate(&inner, repo)
                .map_err(|e| e.to_string())?
                .is_truthy();
            if !keep {
                continue;
            }
        }
        walk_bindings(specs, repo, &inner, depth + 1, body, terms)?;
    }
    Ok(())
}

/// Substitute one iterator binding into body text. Bracketed references to
/// decision variables collapse to canonical names; parameter and tuple-set
/// references keep their brackets with the value substituted; bare
/// occurrences become the literal value.
pub fn substitute_iterator(
    body: &str,
    var: &str,
    binding: &Binding,
    repo: &ModelRepository,
) -> String {
    let rendered = match binding {
        Binding::Num(v) => v.to_string(),
        Binding::Str(s) => format!("\"{s}\""),
        Binding::Tuple(_) => return body.to_string(),
    };
    let word = Regex::new(&format!(r"\b{}\b", regex::escape(var))).expect("valid regex");

    // Pass 1: bracketed references.
    let bracketed = Regex::new(r"([A-Za-z][A-Za-z0-9_]*)\s*\[([^\[\]]*)\]").expect("valid regex");
    let step1 = bracketed.replace_all(body, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        let index_text = word.replace_all(&caps[2], rendered.as_str());
        if repo.is_decision_variable(name) {
            if let Some(values) = fold_index_list(&index_text, repo) {
                return crate::model::canonical_name(name, &values);
            }
        } else if let Some(values) = fold_index_list(&index_text, repo) {
            let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
            return format!("{name}[{}]", parts.join(","));
        }
        format!("{name}[{index_text}]")
    });

    // Pass 2: bare occurrences outside brackets.
    word.replace_all(&step1, rendered.as_str()).into_owned()
}

/// Fold a comma-separated index list to integers, if every part is a
/// constant arithmetic expression.
fn fold_index_list(index_text: &str, repo: &ModelRepository) -> Option<Vec<i64>> {
    let mut values = Vec::new();
    for part in index_text.split(',') {
        let expr = parse_expression(part.trim(), repo, &[]).ok()?;
        let value = expr.evaluate(&EvalContext::new(), repo).ok()?;
        values.push(value.as_i64()?);
    }
    Some(values)
}

/// Find `sum` at a word boundary followed (after whitespace) by `(`.
fn find_sum_keyword(chars: &[char]) -> Option<usize> {
    let mut in_string = false;
    let mut i = 0;
    while i + 3 <= chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if !in_string
            && chars[i..i + 3] == ['s', 'u', 'm']
            && (i == 0 || !is_ident_char(chars[i - 1]))
            && chars.get(i + 3).map_or(false, |&c| !is_ident_char(c))
        {
            let open = skip_ws_from(chars, i + 3);
            if chars.get(open) == Some(&'(') {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_ws_from(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string {
            if c == '(' {
                depth += 1;
            } else if c == ')' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// End of the operand starting at `start`: the first top-level `+`, `-`,
/// relational operator, `,` or closing bracket that terminates it.
/// Parentheses and brackets are balance-tracked; a sign directly after an
/// operator or at the start belongs to the operand.
fn operand_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut expect_operand = true;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            expect_operand = false;
            i += 1;
            continue;
        }
        if in_string {
            i += 1;
            continue;
        }
        match c {
            '(' | '[' => {
                depth += 1;
                expect_operand = true;
            }
            ')' | ']' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
                expect_operand = false;
            }
            '+' | '-' if depth == 0 => {
                if !expect_operand {
                    return i;
                }
                expect_operand = true;
            }
            '<' | '>' | '=' | '!' if depth == 0 => return i,
            ',' | '?' | ':' if depth == 0 => return i,
            '*' | '/' => expect_operand = true,
            c if c.is_whitespace() => {}
            _ => expect_operand = false,
        }
        i += 1;
    }
    chars.len()
}

/// Distribute single-term factors over parenthesized sums:
/// `k * (a + b)` and `(a + b) * k` become `k*a + k*b`.
pub fn distribute_parentheses(text: &str) -> String {
    // The trailing ([^*]|$) and the '*'-free lead class keep chained
    // products like `2*(x+y)*3` untouched; only plain k*(sum) shapes fire.
    let prefix = Regex::new(
        r"(^|[^A-Za-z0-9_.\]])([A-Za-z0-9_.]+(?:\[[^\[\]]*\])?)\s*\*\s*\(([^()]+)\)([^*]|$)",
    )
    .expect("valid regex");
    let suffix =
        Regex::new(r"(^|[^A-Za-z0-9_\]*])\(([^()]+)\)\s*\*\s*([A-Za-z0-9_.]+(?:\[[^\[\]]*\])?)")
            .expect("valid regex");

    let mut current = text.to_string();
    for _ in 0..64 {
        let mut changed = false;

        let next = prefix.replace_all(&current, |caps: &regex::Captures<'_>| {
            let lead = &caps[1];
            let factor = &caps[2];
            let inner = &caps[3];
            let trail = &caps[4];
            match distribute(factor, inner) {
                Some(expanded) => {
                    changed = true;
                    format!("{lead}{expanded}{trail}")
                }
                None => caps[0].to_string(),
            }
        });
        current = next.into_owned();
        if changed {
            continue;
        }

        let next = suffix.replace_all(&current, |caps: &regex::Captures<'_>| {
            let lead = &caps[1];
            let inner = &caps[2];
            let factor = &caps[3];
            match distribute(factor, inner) {
                Some(expanded) => {
                    changed = true;
                    format!("{lead}{expanded}")
                }
                None => caps[0].to_string(),
            }
        });
        current = next.into_owned();
        if !changed {
            break;
        }
    }
    current
}

/// `k` distributed over the `+`/`-` separated terms of `inner`; `None` when
/// `inner` is a single term (nothing to do).
fn distribute(factor: &str, inner: &str) -> Option<String> {
    let terms = split_terms(inner);
    if terms.len() < 2 {
        return None;
    }
    let mut out = String::new();
    for (sign, term) in terms {
        if out.is_empty() {
            if sign < 0 {
                out.push('-');
            }
        } else {
            out.push_str(if sign < 0 { " - " } else { " + " });
        }
        out.push_str(&format!("{}*{}", factor, term.trim()));
    }
    Some(out)
}

/// Split an expression without parentheses into signed top-level terms.
fn split_terms(inner: &str) -> Vec<(i32, String)> {
    let chars: Vec<char> = inner.chars().collect();
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut sign = 1;
    let mut depth = 0i32;
    let mut expect_operand = true;
    for &c in &chars {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
                expect_operand = true;
            }
            ']' => {
                depth -= 1;
                current.push(c);
                expect_operand = false;
            }
            '+' | '-' if depth == 0 && !expect_operand => {
                if !current.trim().is_empty() {
                    terms.push((sign, current.trim().to_string()));
                }
                current = String::new();
                sign = if c == '-' { -1 } else { 1 };
                expect_operand = true;
            }
            c if c.is_whitespace() => current.push(c),
            _ => {
                current.push(c);
                expect_operand = matches!(c, '*' | '/');
            }
        }
    }
    if !current.trim().is_empty() {
        terms.push((sign, current.trim().to_string()));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionVariable, IndexSet, ModelRepository, Parameter, VarShape};
    use crate::value::ValueType;

    fn repo() -> ModelRepository {
        let mut repo = ModelRepository::new();
        repo.add_index_set(IndexSet::new("I", 1, 3).unwrap());
        repo.add_parameter(Parameter::indexed_param(
            "cap",
            ValueType::Float,
            vec!["I".into()],
            true,
        ));
        repo.add_indexed_variable(DecisionVariable {
            name: "x".into(),
            vtype: ValueType::Float,
            shape: VarShape::OneDim("I".into()),
            lower: None,
            upper: None,
        });
        repo
    }

    #[test]
    fn test_expand_simple_sum() {
        let repo = repo();
        let out = expand_summations("sum(i in I) x[i]", &repo, 100).unwrap();
        assert_eq!(out, "(x1+x2+x3)");
    }

    #[test]
    fn test_expand_sum_keeps_parameter_brackets() {
        let repo = repo();
        let out = expand_summations("sum(i in I) cap[i]*x[i]", &repo, 100).unwrap();
        assert_eq!(out, "(cap[1]*x1+cap[2]*x2+cap[3]*x3)");
    }

    #[test]
    fn test_expand_sum_with_filter() {
        let repo = repo();
        let out = expand_summations("sum(i in I : i != 2) x[i]", &repo, 100).unwrap();
        assert_eq!(out, "(x1+x3)");
    }

    #[test]
    fn test_expand_sum_body_stops_at_operator() {
        let repo = repo();
        let out = expand_summations("sum(i in I) x[i] <= 10", &repo, 100).unwrap();
        assert_eq!(out, "(x1+x2+x3) <= 10");
    }

    #[test]
    fn test_expand_empty_set_gives_zero() {
        let mut repo = repo();
        repo.add_primitive_set(crate::model::PrimitiveSet::new(
            "E",
            ValueType::Int,
            false,
        ));
        let out = expand_summations("sum(i in E) x[i] <= 4", &repo, 100).unwrap();
        assert_eq!(out, "0 <= 4");
    }

    #[test]
    fn test_expand_arithmetic_index() {
        let repo = repo();
        let out = expand_summations("sum(i in I : i < 3) x[i+1]", &repo, 100).unwrap();
        assert_eq!(out, "(x2+x3)");
    }

    #[test]
    fn test_distribute_prefix_factor() {
        assert_eq!(distribute_parentheses("2 * (x + y)"), "2*x + 2*y");
    }

    #[test]
    fn test_distribute_suffix_factor() {
        assert_eq!(distribute_parentheses("(x + y) * 3"), "3*x + 3*y");
    }

    #[test]
    fn test_distribute_keeps_single_term() {
        assert_eq!(distribute_parentheses("2 * (x)"), "2 * (x)");
    }

    #[test]
    fn test_distribute_handles_minus() {
        assert_eq!(distribute_parentheses("2 * (x - y)"), "2*x - 2*y");
    }

    #[test]
    fn test_distribute_ignores_function_call_parens() {
        let text = "item(arcs, 1)*2";
        // `item(...)` is preceded by an identifier char, so the suffix
        // pattern must not fire on its argument list.
        assert_eq!(distribute_parentheses(text), text);
    }

    #[test]
    fn test_distribute_leaves_chained_products() {
        let text = "2*(x + y)*3";
        assert_eq!(distribute_parentheses(text), text);
    }
}
