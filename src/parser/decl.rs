//! Declaration recognizers: parameters, index sets, decision variables,
//! primitive sets, tuple sets, set comprehensions, and decision
//! expressions.
//!
//! Every recognizer follows the dispatcher protocol: `NotMine` when the
//! statement has a different shape, `Rejected` when the shape matches but
//! the content is invalid.

use crate::config::LimitsConfig;
use crate::data;
use crate::expr::Expr;
use crate::model::{
    ComputedSet, DecisionExpression, DecisionVariable, IndexSet, ModelRepository, Parameter,
    PrimitiveSet, TupleField, TupleSchema, TupleSet, VarShape,
};
use crate::parser::expression::{parse_expression, parse_iterator_specs};
use crate::parser::{is_identifier, split_top_level_commas, Recognition};
use crate::value::ValueType;
use regex::Regex;

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword)
        .map_or(false, |rest| rest.chars().next().map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_'))
}

fn starts_with_type_keyword(text: &str) -> bool {
    ["int", "float", "string", "bool"]
        .iter()
        .any(|kw| starts_with_keyword(text, kw))
}

fn known_set(repo: &ModelRepository, name: &str) -> bool {
    repo.is_set(name)
}

// ============================================================================
// Parameters
// ============================================================================

/// `type name[S1][S2]... = ...;` - external parameter with two or more
/// bracket-per-dimension index sets.
pub fn recognize_multidim_parameter(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    let re = Regex::new(
        r"^(int|float|string|bool)\s+([A-Za-z][A-Za-z0-9_]*)\s*((?:\[[^\[\]]+\]\s*){2,})=\s*(.+)$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    let vtype = ValueType::parse(&caps[1]).expect("matched type keyword");
    let name = caps[2].to_string();
    let value = caps[4].trim();

    let bracket = Regex::new(r"\[([^\[\]]+)\]").expect("valid regex");
    let mut sets = Vec::new();
    for group in bracket.captures_iter(&caps[3]) {
        let set = group[1].trim().to_string();
        if !is_identifier(&set) {
            return Recognition::Rejected(format!("bad index set name '{set}'"));
        }
        if !known_set(repo, &set) {
            return Recognition::Rejected(format!("unknown index set '{set}'"));
        }
        sets.push(set);
    }

    if value != "..." {
        return Recognition::Rejected(
            "multi-dimensional parameters are bound from data files; expected '...'".to_string(),
        );
    }
    repo.add_parameter(Parameter::indexed_param(name, vtype, sets, true));
    Recognition::Accepted
}

/// `type name = expr;`, `type name[S] = ...;`, `type name[S1,S2] = ...;`
pub fn recognize_parameter(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if !starts_with_type_keyword(text) {
        return Recognition::NotMine;
    }
    let re = Regex::new(
        r"^(int|float|string|bool)\s+([A-Za-z][A-Za-z0-9_]*)\s*(?:\[([^\[\]]*)\])?\s*=\s*(.+)$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::Rejected(
            "parameter declaration requires '= value' or '= ...'".to_string(),
        );
    };
    let vtype = ValueType::parse(&caps[1]).expect("matched type keyword");
    let name = caps[2].to_string();
    let value = caps[4].trim().to_string();

    let mut sets = Vec::new();
    if let Some(index_group) = caps.get(3) {
        for set in split_top_level_commas(index_group.as_str()) {
            if !is_identifier(&set) {
                return Recognition::Rejected(format!("bad index set name '{set}'"));
            }
            if !known_set(repo, &set) {
                return Recognition::Rejected(format!("unknown index set '{set}'"));
            }
            sets.push(set);
        }
        if sets.is_empty() {
            return Recognition::Rejected(format!("empty index list on parameter '{name}'"));
        }
    }

    let external = value == "...";
    let param = if sets.is_empty() {
        Parameter::scalar_param(name.clone(), vtype, external)
    } else {
        Parameter::indexed_param(name.clone(), vtype, sets, external)
    };
    repo.add_parameter(param);

    if !external {
        if let Err(e) = data::assign_parameter(repo, &name, &value) {
            return Recognition::Rejected(e);
        }
    }
    Recognition::Accepted
}

// ============================================================================
// Index sets
// ============================================================================

/// `range N = a..b;` where `a`, `b` are integer literals or previously
/// declared integer parameters.
pub fn recognize_index_set(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if !starts_with_keyword(text, "range") {
        return Recognition::NotMine;
    }
    let re = Regex::new(r"^range\s+([A-Za-z][A-Za-z0-9_]*)\s*=\s*(.+?)\s*\.\.\s*(.+)$")
        .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::Rejected("range declaration must be 'range N = a..b'".to_string());
    };
    let name = caps[1].to_string();
    let start = match eval_int_bound(&caps[2], repo) {
        Ok(v) => v,
        Err(e) => return Recognition::Rejected(e),
    };
    let end = match eval_int_bound(&caps[3], repo) {
        Ok(v) => v,
        Err(e) => return Recognition::Rejected(e),
    };
    match IndexSet::new(name, start, end) {
        Ok(set) => {
            repo.add_index_set(set);
            Recognition::Accepted
        }
        Err(e) => Recognition::Rejected(e),
    }
}

fn eval_int_bound(text: &str, repo: &ModelRepository) -> Result<i64, String> {
    let expr = parse_expression(text.trim(), repo, &[])?;
    let value = expr
        .evaluate(&crate::expr::EvalContext::new(), repo)
        .map_err(|e| e.to_string())?;
    value
        .as_i64()
        .ok_or_else(|| format!("range bound '{text}' is not an integer"))
}

// ============================================================================
// Decision variables
// ============================================================================

/// `dvar type name [indices] [bounds];`
pub fn recognize_dvar(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if !starts_with_keyword(text, "dvar") {
        return Recognition::NotMine;
    }
    recognize_variable_decl(text, "dvar", repo)
}

/// `var type name[...] [in lo..hi];` - legacy form.
pub fn recognize_var(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if !starts_with_keyword(text, "var") {
        return Recognition::NotMine;
    }
    recognize_variable_decl(text, "var", repo)
}

fn recognize_variable_decl(
    text: &str,
    keyword: &str,
    repo: &mut ModelRepository,
) -> Recognition {
    let re = Regex::new(&format!(
        r"^{keyword}\s+(int|float|bool|boolean)(\+?)\s+([A-Za-z][A-Za-z0-9_]*)\s*(?:\[([^\[\]]*)\])?\s*(?:in\s+(.+?)\s*\.\.\s*(.+))?$"
    ))
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::Rejected(format!(
            "malformed {keyword} declaration; expected '{keyword} type name [indices] [in lo..hi]'"
        ));
    };
    let vtype = match &caps[1] {
        "int" => ValueType::Int,
        "float" => ValueType::Float,
        _ => ValueType::Bool,
    };
    let non_negative = !caps[2].is_empty();
    let name = caps[3].to_string();

    let shape = match caps.get(4) {
        None => VarShape::Scalar,
        Some(index_group) => {
            let sets = split_top_level_commas(index_group.as_str());
            for set in &sets {
                if repo.index_set(set).is_none() {
                    return Recognition::Rejected(format!("unknown index set '{set}'"));
                }
            }
            match sets.len() {
                1 => VarShape::OneDim(sets[0].clone()),
                2 => VarShape::TwoDim(sets[0].clone(), sets[1].clone()),
                n => {
                    return Recognition::Rejected(format!(
                        "decision variables support one or two dimensions, got {n}"
                    ))
                }
            }
        }
    };

    let mut lower = if non_negative {
        Some(Expr::Number(0.0))
    } else {
        None
    };
    let mut upper = None;
    if let (Some(lo), Some(hi)) = (caps.get(5), caps.get(6)) {
        lower = match parse_expression(lo.as_str().trim(), repo, &[]) {
            Ok(e) => Some(e),
            Err(e) => return Recognition::Rejected(format!("bad lower bound: {e}")),
        };
        upper = match parse_expression(hi.as_str().trim(), repo, &[]) {
            Ok(e) => Some(e),
            Err(e) => return Recognition::Rejected(format!("bad upper bound: {e}")),
        };
    }

    repo.add_indexed_variable(DecisionVariable {
        name,
        vtype,
        shape,
        lower,
        upper,
    });
    Recognition::Accepted
}

// ============================================================================
// Sets
// ============================================================================

/// `{int|float|string} name = {...};` or `... = ...;` (external).
pub fn recognize_primitive_set(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    let re = Regex::new(
        r"^\{\s*(int|float|string)\s*\}\s+([A-Za-z][A-Za-z0-9_]*)\s*(?:=\s*(.+))?$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    let element_type = ValueType::parse(&caps[1]).expect("matched type keyword");
    let name = caps[2].to_string();

    match caps.get(3).map(|m| m.as_str().trim()) {
        None | Some("...") => {
            repo.add_primitive_set(PrimitiveSet::new(name, element_type, true));
            Recognition::Accepted
        }
        Some(value) if value.starts_with('{') => {
            repo.add_primitive_set(PrimitiveSet::new(name.clone(), element_type, false));
            match data::assign_primitive_set(repo, &name, value) {
                Ok(()) => Recognition::Accepted,
                Err(e) => Recognition::Rejected(e),
            }
        }
        Some(other) => {
            Recognition::Rejected(format!("bad value '{other}' for set '{name}'"))
        }
    }
}

/// `{Schema} name [= {<...>, ...} | ...];` with optional `[I]` family index.
pub fn recognize_tuple_set(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    let re = Regex::new(
        r"^\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\s+([A-Za-z][A-Za-z0-9_]*)\s*(?:\[\s*([A-Za-z][A-Za-z0-9_]*)\s*\])?\s*(?:=\s*(.+))?$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    // `{Schema} name = { body | iters }` is a comprehension, not a literal.
    if let Some(value) = caps.get(4) {
        if has_top_level_pipe(value.as_str()) {
            return Recognition::NotMine;
        }
    }
    let schema = caps[1].to_string();
    let name = caps[2].to_string();
    let index_set = caps.get(3).map(|m| m.as_str().to_string());

    // A missing schema aborts this set's creation, not the parse.
    if repo.tuple_schema(&schema).is_none() {
        return Recognition::Rejected(format!("unknown tuple schema '{schema}'"));
    }
    if let Some(index) = &index_set {
        if repo.index_set(index).is_none() {
            return Recognition::Rejected(format!("unknown index set '{index}'"));
        }
    }

    match caps.get(4).map(|m| m.as_str().trim()) {
        None | Some("...") => {
            repo.add_tuple_set(TupleSet::new(name, schema, true, index_set));
            Recognition::Accepted
        }
        Some(value) if value.starts_with('{') => {
            repo.add_tuple_set(TupleSet::new(name.clone(), schema, false, index_set));
            match data::assign_tuple_set(repo, &name, value, None) {
                Ok(()) => Recognition::Accepted,
                Err(e) => Recognition::Rejected(e),
            }
        }
        Some(other) => Recognition::Rejected(format!("bad value '{other}' for '{name}'")),
    }
}

/// `{Schema} name = { body | iter1, iter2, ... : filter };`
pub fn recognize_set_comprehension(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    let re = Regex::new(
        r"^\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\s+([A-Za-z][A-Za-z0-9_]*)\s*=\s*\{(.+)\}$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    let content = caps[3].trim();
    let Some(pipe) = top_level_pipe_position(content) else {
        return Recognition::NotMine;
    };
    let schema = caps[1].to_string();
    let name = caps[2].to_string();
    if repo.tuple_schema(&schema).is_none() {
        return Recognition::Rejected(format!("unknown tuple schema '{schema}'"));
    }

    let body_text = content[..pipe].trim();
    let iter_text = content[pipe + 1..].trim();
    let iterators = match parse_iterator_specs(iter_text, repo, &[]) {
        Ok(specs) => specs,
        Err(e) => return Recognition::Rejected(e),
    };
    let scope: Vec<String> = iterators.iter().map(|s| s.var.clone()).collect();
    let body = match parse_expression(body_text, repo, &scope) {
        Ok(expr) => expr,
        Err(e) => return Recognition::Rejected(e),
    };
    repo.add_computed_set(ComputedSet {
        name,
        schema,
        body,
        iterators,
    });
    Recognition::Accepted
}

fn has_top_level_pipe(text: &str) -> bool {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'));
    match inner {
        Some(content) => top_level_pipe_position(content).is_some(),
        None => false,
    }
}

fn top_level_pipe_position(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' | '{' | '<' if !in_string => depth += 1,
            ')' | ']' | '}' | '>' if !in_string => depth -= 1,
            '|' if !in_string && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Decision expressions
// ============================================================================

/// `dexpr type name [iters]? = expr;`
pub fn recognize_dexpr(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if !starts_with_keyword(text, "dexpr") {
        return Recognition::NotMine;
    }
    let re = Regex::new(
        r"^dexpr\s+(int|float|bool)\s+([A-Za-z][A-Za-z0-9_]*)\s*(?:\[([^\[\]]*)\])?\s*=\s*(.+)$",
    )
    .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::Rejected(
            "malformed dexpr; expected 'dexpr type name = expr'".to_string(),
        );
    };
    let vtype = ValueType::parse(&caps[1]).expect("matched type keyword");
    let name = caps[2].to_string();

    let iterators = match caps.get(3) {
        Some(group) => match parse_iterator_specs(group.as_str(), repo, &[]) {
            Ok(specs) => specs,
            Err(e) => return Recognition::Rejected(e),
        },
        None => Vec::new(),
    };
    let scope: Vec<String> = iterators.iter().map(|s| s.var.clone()).collect();
    let body = match parse_expression(caps[4].trim(), repo, &scope) {
        Ok(expr) => expr,
        Err(e) => return Recognition::Rejected(e),
    };
    repo.add_dexpr(DecisionExpression {
        name,
        vtype,
        iterators,
        body,
    });
    Recognition::Accepted
}

/// `constraint c[I];` forward declarations are recognized and skipped.
pub fn recognize_constraint_forward_decl(
    text: &str,
    _line: usize,
    _repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if starts_with_keyword(text, "constraint") {
        return Recognition::Accepted;
    }
    Recognition::NotMine
}

// ============================================================================
// Tuple schemas (from extracted blocks)
// ============================================================================

/// Parse the body of a `tuple Name { ... }` block: `[key] type name;` per
/// field.
pub fn parse_tuple_schema(name: &str, body: &str) -> Result<TupleSchema, String> {
    if !is_identifier(name) {
        return Err(format!("bad tuple schema name '{name}'"));
    }
    let mut fields: Vec<TupleField> = Vec::new();
    for part in body.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let (is_key, rest) = match tokens.first() {
            Some(&"key") => (true, &tokens[1..]),
            _ => (false, &tokens[..]),
        };
        let &[type_token, field_name] = rest else {
            return Err(format!(
                "bad field '{part}' in tuple '{name}'; expected '[key] type name'"
            ));
        };
        let ftype = ValueType::parse(type_token)
            .ok_or_else(|| format!("unknown field type '{type_token}' in tuple '{name}'"))?;
        if !is_identifier(field_name) {
            return Err(format!("bad field name '{field_name}' in tuple '{name}'"));
        }
        if fields.iter().any(|f| f.name == *field_name) {
            return Err(format!(
                "duplicate field '{field_name}' in tuple '{name}'"
            ));
        }
        fields.push(TupleField {
            name: (*field_name).to_string(),
            ftype,
            is_key,
        });
    }
    if fields.is_empty() {
        return Err(format!("tuple '{name}' has no fields"));
    }
    Ok(TupleSchema {
        name: name.to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamShape;
    use crate::value::Value;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn dispatch(text: &str, repo: &mut ModelRepository) -> Recognition {
        crate::parser::dispatch_statement(text, 1, repo, &limits())
    }

    #[test]
    fn test_scalar_parameter_inline_value() {
        let mut repo = ModelRepository::new();
        assert_eq!(dispatch("int n = 3", &mut repo), Recognition::Accepted);
        assert_eq!(repo.parameter("n").unwrap().scalar(), Some(&Value::Int(3)));
    }

    #[test]
    fn test_parameter_value_from_expression() {
        let mut repo = ModelRepository::new();
        dispatch("int n = 3", &mut repo);
        assert_eq!(dispatch("int m = 2*n + 1", &mut repo), Recognition::Accepted);
        assert_eq!(repo.parameter("m").unwrap().scalar(), Some(&Value::Int(7)));
    }

    #[test]
    fn test_external_parameter() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..3", &mut repo);
        assert_eq!(dispatch("float cap[I] = ...", &mut repo), Recognition::Accepted);
        let p = repo.parameter("cap").unwrap();
        assert!(p.external);
        assert!(!p.is_bound());
    }

    #[test]
    fn test_inline_vector_parameter() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..3", &mut repo);
        assert_eq!(
            dispatch("float cap[I] = [5, 7, 9]", &mut repo),
            Recognition::Accepted
        );
        assert!(repo.parameter("cap").unwrap().is_bound());
    }

    #[test]
    fn test_multidim_parameter() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..2", &mut repo);
        dispatch("range J = 1..2", &mut repo);
        dispatch("range K = 1..2", &mut repo);
        assert_eq!(
            dispatch("float w[I][J][K] = ...", &mut repo),
            Recognition::Accepted
        );
        let p = repo.parameter("w").unwrap();
        assert_eq!(p.shape, ParamShape::Indexed(vec!["I".into(), "J".into(), "K".into()]));
    }

    #[test]
    fn test_range_with_parameter_bound() {
        let mut repo = ModelRepository::new();
        dispatch("int n = 3", &mut repo);
        assert_eq!(dispatch("range I = 1..n", &mut repo), Recognition::Accepted);
        assert_eq!(repo.index_set("I").unwrap().end, 3);
    }

    #[test]
    fn test_range_reversed_rejected() {
        let mut repo = ModelRepository::new();
        let outcome = dispatch("range I = 5..2", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(_)));
    }

    #[test]
    fn test_dvar_nonnegative_float() {
        let mut repo = ModelRepository::new();
        assert_eq!(dispatch("dvar float+ x", &mut repo), Recognition::Accepted);
        let v = repo.variable("x").unwrap();
        assert_eq!(v.vtype, ValueType::Float);
        assert_eq!(v.lower, Some(Expr::Number(0.0)));
    }

    #[test]
    fn test_dvar_indexed_with_bounds() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..3", &mut repo);
        assert_eq!(
            dispatch("dvar int y[I] in 0..10", &mut repo),
            Recognition::Accepted
        );
        let v = repo.variable("y").unwrap();
        assert_eq!(v.shape, VarShape::OneDim("I".into()));
        assert!(v.upper.is_some());
    }

    #[test]
    fn test_legacy_var_form() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..2", &mut repo);
        assert_eq!(
            dispatch("var float z[I] in 0..5", &mut repo),
            Recognition::Accepted
        );
        assert!(repo.variable("z").is_some());
    }

    #[test]
    fn test_primitive_set_inline() {
        let mut repo = ModelRepository::new();
        assert_eq!(
            dispatch("{string} Cities = {\"A\", \"B\"}", &mut repo),
            Recognition::Accepted
        );
        assert_eq!(repo.primitive_set("Cities").unwrap().len(), 2);
    }

    #[test]
    fn test_tuple_set_requires_schema() {
        let mut repo = ModelRepository::new();
        let outcome = dispatch("{Arc} arcs = ...", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(ref m) if m.contains("unknown tuple schema")));
    }

    #[test]
    fn test_tuple_set_inline_literal() {
        let mut repo = ModelRepository::new();
        repo.add_tuple_schema(
            parse_tuple_schema("Arc", "key string id; string from;").unwrap(),
        );
        assert_eq!(
            dispatch("{Arc} arcs = {<\"a\",\"N1\">, <\"b\",\"N2\">}", &mut repo),
            Recognition::Accepted
        );
        assert_eq!(repo.tuple_set("arcs").unwrap().len(), 2);
    }

    #[test]
    fn test_set_comprehension() {
        let mut repo = ModelRepository::new();
        repo.add_tuple_schema(
            parse_tuple_schema("Arc", "key string id; string from;").unwrap(),
        );
        dispatch("{Arc} arcs = {<\"a\",\"N1\">, <\"b\",\"N2\">, <\"c\",\"N1\">}", &mut repo);
        assert_eq!(
            dispatch(
                "{Arc} fromN1 = { a | a in arcs : a.from == \"N1\" }",
                &mut repo
            ),
            Recognition::Accepted
        );
        let materialized = repo
            .computed_set("fromN1")
            .unwrap()
            .materialize(&repo)
            .unwrap();
        assert_eq!(materialized.len(), 2);
    }

    #[test]
    fn test_dexpr_scalar() {
        let mut repo = ModelRepository::new();
        dispatch("dvar float+ x", &mut repo);
        dispatch("dvar float+ y", &mut repo);
        assert_eq!(
            dispatch("dexpr float profit = 3*x + 5*y", &mut repo),
            Recognition::Accepted
        );
        assert!(repo.dexpr("profit").is_some());
    }

    #[test]
    fn test_dexpr_indexed() {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..3", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        assert_eq!(
            dispatch("dexpr float load[i in I] = 2*x[i]", &mut repo),
            Recognition::Accepted
        );
        assert_eq!(repo.dexpr("load").unwrap().iterators.len(), 1);
    }

    #[test]
    fn test_constraint_forward_decl_skipped() {
        let mut repo = ModelRepository::new();
        assert_eq!(
            dispatch("constraint c[I]", &mut repo),
            Recognition::Accepted
        );
        assert!(repo.equations().is_empty());
    }

    #[test]
    fn test_tuple_schema_duplicate_field() {
        let err = parse_tuple_schema("Arc", "key string id; string id;").unwrap_err();
        assert!(err.contains("duplicate field"));
    }

    #[test]
    fn test_unknown_statement() {
        let mut repo = ModelRepository::new();
        let outcome = dispatch("frobnicate the model", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(ref m) if m.contains("unknown statement")));
    }
}
