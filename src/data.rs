//! # Data-File Binder
//!
//! Binds `.dat` statements into declarations marked external. Accepted
//! forms:
//!
//! - `name = value;` scalar, type-checked against the declaration
//! - `name[i] = value;` / `name[i,j] = value;` single-slot, range-checked
//! - `name = [v1, v2, ...];` vector, count must equal the index set size
//! - `name = [[...],[...]];` matrix for 2-d parameters
//! - `name = {v1, v2, ...};` primitive set literal
//! - `name = {<f1,f2,...>, ...};` tuple set literal
//!
//! Vector and matrix element lists split by comma when any top-level comma
//! is present, otherwise by whitespace. Strings are double-quoted; numeric
//! parsing always uses a period as the decimal point.

use crate::expr::EvalContext;
use crate::model::{ModelRepository, ParamShape, TupleInstance};
use crate::parser::expression::parse_expression;
use crate::parser::split_top_level_commas;
use crate::value::{IndexKey, Value};

/// Bind one data statement into the repository.
pub fn bind_data_statement(text: &str, repo: &mut ModelRepository) -> Result<(), String> {
    let text = text.trim();
    check_brackets(text)?;

    // Indexed form: name[indices] = value
    if let Some((name, indices, value)) = split_indexed_assignment(text)? {
        return bind_indexed(repo, &name, &indices, &value);
    }

    // Plain form: name = value
    let eq = top_level_eq(text).ok_or_else(|| format!("not an assignment: '{text}'"))?;
    let name = text[..eq].trim();
    let value = text[eq + 1..].trim();
    if !crate::parser::is_identifier(name) {
        return Err(format!("bad name '{name}' in data statement"));
    }
    if value.is_empty() {
        return Err(format!("missing value for '{name}'"));
    }

    if repo.is_parameter(name) {
        return assign_parameter(repo, name, value);
    }
    if repo.primitive_set(name).is_some() {
        return assign_primitive_set(repo, name, value);
    }
    if repo.tuple_set(name).is_some() {
        return assign_tuple_set(repo, name, value, None);
    }
    Err(format!("unknown name '{name}'"))
}

/// Assign a value text to a declared parameter: scalar expression, vector
/// literal, or matrix literal, according to the declared shape. Shared with
/// the model-file parameter recognizer for inline values.
pub fn assign_parameter(
    repo: &mut ModelRepository,
    name: &str,
    value: &str,
) -> Result<(), String> {
    let shape = repo
        .parameter(name)
        .ok_or_else(|| format!("unknown parameter '{name}'"))?
        .shape
        .clone();
    match &shape {
        ParamShape::Scalar => {
            let parsed = parse_value(value, repo)?;
            repo.parameter_mut(name)
                .ok_or_else(|| format!("unknown parameter '{name}'"))?
                .set_scalar(parsed)
        }
        ParamShape::Indexed(sets) if sets.len() == 1 => {
            if !value.starts_with('[') {
                return Err(format!(
                    "parameter '{name}' is indexed; expected a [v1, v2, ...] vector"
                ));
            }
            assign_vector(repo, name, &sets[0], value)
        }
        ParamShape::Indexed(sets) if sets.len() == 2 => {
            if !value.starts_with("[[") && !value.trim_start_matches('[').trim_start().starts_with('[') {
                return Err(format!(
                    "parameter '{name}' is 2-indexed; expected a [[...],[...]] matrix"
                ));
            }
            assign_matrix(repo, name, &sets[0], &sets[1], value)
        }
        ParamShape::Indexed(_) => Err(format!(
            "parameter '{name}' has more than two dimensions; bind slots individually"
        )),
    }
}

fn bind_indexed(
    repo: &mut ModelRepository,
    name: &str,
    index_text: &str,
    value: &str,
) -> Result<(), String> {
    // A tuple-set family group: arcs[2] = {<...>, ...}
    if repo.tuple_set(name).is_some() {
        let index: i64 = index_text
            .trim()
            .parse()
            .map_err(|_| format!("bad group index '{index_text}' for '{name}'"))?;
        return assign_tuple_set(repo, name, value, Some(index));
    }

    let shape = repo
        .parameter(name)
        .ok_or_else(|| format!("unknown name '{name}'"))?
        .shape
        .clone();
    let sets = match &shape {
        ParamShape::Scalar => {
            return Err(format!("parameter '{name}' is scalar, not indexed"))
        }
        ParamShape::Indexed(sets) => sets.clone(),
    };
    let parts = split_top_level_commas(index_text);
    if parts.len() != sets.len() {
        return Err(format!(
            "parameter '{name}' has {} dimension(s), got {} index value(s)",
            sets.len(),
            parts.len()
        ));
    }
    let mut key = Vec::with_capacity(parts.len());
    for (part, set) in parts.iter().zip(&sets) {
        let index_value = parse_value(part, repo)?;
        check_index_in_set(repo, set, &index_value, name)?;
        key.push(IndexKey::from_value(&index_value).ok_or_else(|| {
            format!("bad index '{part}' for parameter '{name}'")
        })?);
    }
    let parsed = parse_value(value, repo)?;
    repo.parameter_mut(name)
        .ok_or_else(|| format!("unknown name '{name}'"))?
        .set_at(key, parsed)
}

fn assign_vector(
    repo: &mut ModelRepository,
    name: &str,
    set: &str,
    value: &str,
) -> Result<(), String> {
    let inner = strip_brackets(value)
        .ok_or_else(|| format!("unbalanced brackets in value of '{name}'"))?;
    let items = split_values(inner);
    let keys = set_keys(repo, set)?;
    if items.len() != keys.len() {
        return Err(format!(
            "parameter '{name}' is indexed by '{set}' with {} element(s), got {} value(s)",
            keys.len(),
            items.len()
        ));
    }
    for (key, item) in keys.into_iter().zip(items) {
        let parsed = parse_value(&item, repo)?;
        repo.parameter_mut(name)
            .ok_or_else(|| format!("unknown name '{name}'"))?
            .set_at(vec![key], parsed)?;
    }
    Ok(())
}

fn assign_matrix(
    repo: &mut ModelRepository,
    name: &str,
    first: &str,
    second: &str,
    value: &str,
) -> Result<(), String> {
    let inner = strip_brackets(value)
        .ok_or_else(|| format!("unbalanced brackets in value of '{name}'"))?;
    let rows = split_top_level_commas(inner);
    let outer_keys = set_keys(repo, first)?;
    let inner_keys = set_keys(repo, second)?;
    if rows.len() != outer_keys.len() {
        return Err(format!(
            "matrix for '{name}' has {} row(s), index set '{first}' has {} element(s)",
            rows.len(),
            outer_keys.len()
        ));
    }
    for (outer, row) in outer_keys.iter().zip(rows) {
        let row_inner = strip_brackets(row.trim())
            .ok_or_else(|| format!("matrix row of '{name}' is not bracketed: '{row}'"))?;
        let items = split_values(row_inner);
        if items.len() != inner_keys.len() {
            return Err(format!(
                "matrix row for '{name}' has {} value(s), index set '{second}' has {} element(s)",
                items.len(),
                inner_keys.len()
            ));
        }
        for (inner_key, item) in inner_keys.iter().zip(items) {
            let parsed = parse_value(&item, repo)?;
            repo.parameter_mut(name)
                .ok_or_else(|| format!("unknown name '{name}'"))?
                .set_at(vec![outer.clone(), inner_key.clone()], parsed)?;
        }
    }
    Ok(())
}

pub(crate) fn assign_primitive_set(
    repo: &mut ModelRepository,
    name: &str,
    value: &str,
) -> Result<(), String> {
    let inner = strip_braces(value)
        .ok_or_else(|| format!("expected a {{...}} literal for set '{name}'"))?;
    let items = split_values(inner);
    let set = repo
        .primitive_set_mut(name)
        .ok_or_else(|| format!("unknown set '{name}'"))?;
    set.clear_elements();
    for item in items {
        let parsed = Value::parse_literal(&item)
            .ok_or_else(|| format!("bad literal '{item}' in set '{name}'"))?;
        set.add_element(parsed)?;
    }
    Ok(())
}

/// Parse and bind a tuple-set literal `{<...>, <...>}`, optionally into one
/// group of an indexed family.
pub fn assign_tuple_set(
    repo: &mut ModelRepository,
    name: &str,
    value: &str,
    group: Option<i64>,
) -> Result<(), String> {
    let schema_name = repo
        .tuple_set(name)
        .ok_or_else(|| format!("unknown tuple set '{name}'"))?
        .schema
        .clone();
    let schema = repo
        .tuple_schema(&schema_name)
        .ok_or_else(|| format!("unknown tuple schema '{schema_name}'"))?
        .clone();

    let inner = strip_braces(value)
        .ok_or_else(|| format!("expected a {{<...>, ...}} literal for '{name}'"))?;
    let mut instances = Vec::new();
    for item in split_top_level_commas(inner) {
        let item = item.trim();
        let fields = item
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(|| format!("tuple literal '{item}' must be <...> in '{name}'"))?;
        let parts = split_top_level_commas(fields);
        if parts.len() != schema.arity() {
            return Err(format!(
                "tuple literal has {} field(s), schema '{}' has {}",
                parts.len(),
                schema.name,
                schema.arity()
            ));
        }
        let mut values = Vec::with_capacity(parts.len());
        for (part, field) in parts.iter().zip(&schema.fields) {
            let mut parsed = Value::parse_literal(part)
                .ok_or_else(|| format!("bad literal '{part}' in tuple for '{name}'"))?;
            if field.ftype == crate::value::ValueType::Float {
                if let Value::Int(v) = parsed {
                    parsed = Value::Float(v as f64);
                }
            }
            if !parsed.conforms_to(field.ftype) {
                return Err(format!(
                    "field '{}' of '{}' is {}, got {}",
                    field.name,
                    schema.name,
                    field.ftype,
                    parsed.value_type()
                ));
            }
            values.push(parsed);
        }
        instances.push(TupleInstance {
            schema: schema.name.clone(),
            values,
        });
    }

    let set = repo
        .tuple_set_mut(name)
        .ok_or_else(|| format!("unknown tuple set '{name}'"))?;
    if group.is_none() {
        set.clear_instances();
    }
    for instance in instances {
        match group {
            Some(index) => set.add_instance_at(index, instance, &schema)?,
            None => set.add_instance(instance, &schema)?,
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a value token: literal first, constant expression fallback (so a
/// model file can write `float c = 2*n;`).
fn parse_value(text: &str, repo: &ModelRepository) -> Result<Value, String> {
    let text = text.trim();
    if let Some(value) = Value::parse_literal(text) {
        return Ok(value);
    }
    let expr = parse_expression(text, repo, &[])?;
    let value = expr
        .evaluate(&EvalContext::new(), repo)
        .map_err(|e| e.to_string())?;
    // Fold integral floats back to ints so int slots accept them.
    if let Value::Float(v) = value {
        if v.fract() == 0.0 {
            return Ok(Value::Int(v as i64));
        }
    }
    Ok(value)
}

/// Split a value list by comma when any top-level comma exists, otherwise by
/// whitespace.
pub fn split_values(input: &str) -> Vec<String> {
    let has_comma = {
        let mut depth = 0i32;
        let mut in_string = false;
        let mut found = false;
        for c in input.chars() {
            match c {
                '"' => in_string = !in_string,
                '[' | '(' | '{' | '<' if !in_string => depth += 1,
                ']' | ')' | '}' | '>' if !in_string => depth -= 1,
                ',' if !in_string && depth == 0 => {
                    found = true;
                    break;
                }
                _ => {}
            }
        }
        found
    };
    if has_comma {
        return split_top_level_commas(input);
    }
    // Whitespace mode, quotes kept intact.
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in input.chars() {
        if c == '"' {
            in_string = !in_string;
            current.push(c);
        } else if c.is_whitespace() && !in_string {
            if !current.is_empty() {
                result.push(current.clone());
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Index keys of a set, in its deterministic order.
fn set_keys(repo: &ModelRepository, set: &str) -> Result<Vec<IndexKey>, String> {
    if let Some(index) = repo.index_set(set) {
        return Ok(index.elements().map(IndexKey::Int).collect());
    }
    if let Some(prim) = repo.primitive_set(set) {
        return prim
            .elements()
            .iter()
            .map(|v| {
                IndexKey::from_value(v)
                    .ok_or_else(|| format!("set '{set}' element {v} cannot index a parameter"))
            })
            .collect();
    }
    Err(format!("unknown index set '{set}'"))
}

fn check_index_in_set(
    repo: &ModelRepository,
    set: &str,
    index: &Value,
    param: &str,
) -> Result<(), String> {
    if let Some(range) = repo.index_set(set) {
        let v = index
            .as_i64()
            .ok_or_else(|| format!("index of '{param}' must be an integer"))?;
        if !range.contains(v) {
            return Err(format!(
                "index {v} of '{param}' is outside {}..{}",
                range.start, range.end
            ));
        }
        return Ok(());
    }
    if let Some(prim) = repo.primitive_set(set) {
        if !prim.contains(index) {
            return Err(format!("index {index} of '{param}' is not in set '{set}'"));
        }
        return Ok(());
    }
    Err(format!("unknown index set '{set}'"))
}

fn split_indexed_assignment(text: &str) -> Result<Option<(String, String, String)>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i == 0 {
        return Ok(None);
    }
    let name: String = chars[..i].iter().collect();
    let mut j = i;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if chars.get(j) != Some(&'[') {
        return Ok(None);
    }
    let mut depth = 0i32;
    let open = j;
    let mut close = None;
    for (k, &c) in chars.iter().enumerate().skip(open) {
        if c == '[' {
            depth += 1;
        } else if c == ']' {
            depth -= 1;
            if depth == 0 {
                close = Some(k);
                break;
            }
        }
    }
    let close = close.ok_or_else(|| format!("unbalanced brackets in '{text}'"))?;
    let indices: String = chars[open + 1..close].iter().collect();
    let rest: String = chars[close + 1..].iter().collect();
    let rest = rest.trim();
    let Some(value) = rest.strip_prefix('=') else {
        // Something else, e.g. a vector value `x = [..]` caught elsewhere.
        return Ok(None);
    };
    Ok(Some((name, indices, value.trim().to_string())))
}

fn top_level_eq(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '[' | '{' | '(' | '<' if !in_string => depth += 1,
            ']' | '}' | ')' | '>' if !in_string => depth -= 1,
            '=' if !in_string && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn check_brackets(text: &str) -> Result<(), String> {
    let mut square = 0i32;
    let mut brace = 0i32;
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '"' => in_string = !in_string,
            '[' if !in_string => square += 1,
            ']' if !in_string => square -= 1,
            '{' if !in_string => brace += 1,
            '}' if !in_string => brace -= 1,
            _ => {}
        }
        if square < 0 || brace < 0 {
            return Err(format!("unbalanced brackets in '{text}'"));
        }
    }
    if square != 0 || brace != 0 {
        return Err(format!("unbalanced brackets in '{text}'"));
    }
    Ok(())
}

fn strip_brackets(text: &str) -> Option<&str> {
    text.trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
}

fn strip_braces(text: &str) -> Option<&str> {
    text.trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        IndexSet, ModelRepository, Parameter, PrimitiveSet, TupleField, TupleSchema, TupleSet,
    };
    use crate::value::ValueType;

    fn repo() -> ModelRepository {
        let mut repo = ModelRepository::new();
        repo.add_index_set(IndexSet::new("I", 1, 3).unwrap());
        repo.add_index_set(IndexSet::new("J", 1, 2).unwrap());
        repo.add_parameter(Parameter::scalar_param("n", ValueType::Int, true));
        repo.add_parameter(Parameter::indexed_param(
            "cap",
            ValueType::Float,
            vec!["I".into()],
            true,
        ));
        repo.add_parameter(Parameter::indexed_param(
            "cost",
            ValueType::Float,
            vec!["I".into(), "J".into()],
            true,
        ));
        repo.add_primitive_set(PrimitiveSet::new("Names", ValueType::String, true));
        repo.add_tuple_schema(TupleSchema {
            name: "Arc".into(),
            fields: vec![
                TupleField {
                    name: "id".into(),
                    ftype: ValueType::String,
                    is_key: true,
                },
                TupleField {
                    name: "weight".into(),
                    ftype: ValueType::Float,
                    is_key: false,
                },
            ],
        });
        repo.add_tuple_set(TupleSet::new("arcs", "Arc", true, None));
        repo
    }

    #[test]
    fn test_scalar_binding() {
        let mut repo = repo();
        bind_data_statement("n = 5", &mut repo).unwrap();
        assert_eq!(repo.parameter("n").unwrap().scalar(), Some(&Value::Int(5)));
    }

    #[test]
    fn test_scalar_type_mismatch() {
        let mut repo = repo();
        let err = bind_data_statement("n = \"five\"", &mut repo).unwrap_err();
        assert!(err.contains("type mismatch"));
    }

    #[test]
    fn test_single_index_binding_with_range_check() {
        let mut repo = repo();
        bind_data_statement("cap[2] = 7.5", &mut repo).unwrap();
        assert_eq!(
            repo.parameter("cap").unwrap().at(&[IndexKey::Int(2)]),
            Some(&Value::Float(7.5))
        );
        let err = bind_data_statement("cap[9] = 1", &mut repo).unwrap_err();
        assert!(err.contains("outside"));
    }

    #[test]
    fn test_vector_binding_comma_mode() {
        let mut repo = repo();
        bind_data_statement("cap = [5, 7, 9]", &mut repo).unwrap();
        assert_eq!(
            repo.parameter("cap").unwrap().at(&[IndexKey::Int(3)]),
            Some(&Value::Float(9.0))
        );
    }

    #[test]
    fn test_vector_binding_whitespace_mode() {
        let mut repo = repo();
        bind_data_statement("cap = [5 7 9]", &mut repo).unwrap();
        assert_eq!(
            repo.parameter("cap").unwrap().at(&[IndexKey::Int(1)]),
            Some(&Value::Float(5.0))
        );
    }

    #[test]
    fn test_vector_count_mismatch() {
        let mut repo = repo();
        let err = bind_data_statement("cap = [5, 7]", &mut repo).unwrap_err();
        assert!(err.contains("3 element(s)"));
    }

    #[test]
    fn test_matrix_binding() {
        let mut repo = repo();
        bind_data_statement("cost = [[1, 2], [3, 4], [5, 6]]", &mut repo).unwrap();
        assert_eq!(
            repo.parameter("cost")
                .unwrap()
                .at(&[IndexKey::Int(3), IndexKey::Int(2)]),
            Some(&Value::Float(6.0))
        );
    }

    #[test]
    fn test_matrix_row_count_mismatch() {
        let mut repo = repo();
        let err = bind_data_statement("cost = [[1, 2], [3, 4]]", &mut repo).unwrap_err();
        assert!(err.contains("row(s)"));
    }

    #[test]
    fn test_primitive_set_literal() {
        let mut repo = repo();
        bind_data_statement("Names = {\"A\", \"B\"}", &mut repo).unwrap();
        let set = repo.primitive_set("Names").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::Str("A".into())));
    }

    #[test]
    fn test_tuple_set_literal() {
        let mut repo = repo();
        bind_data_statement("arcs = {<\"a\", 1.5>, <\"b\", 2.0>}", &mut repo).unwrap();
        let set = repo.tuple_set("arcs").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let mut repo = repo();
        let err = bind_data_statement("arcs = {<\"a\">}", &mut repo).unwrap_err();
        assert!(err.contains("field(s)"));
    }

    #[test]
    fn test_unknown_name() {
        let mut repo = repo();
        let err = bind_data_statement("ghost = 1", &mut repo).unwrap_err();
        assert!(err.contains("unknown name"));
    }

    #[test]
    fn test_unbalanced_brackets() {
        let mut repo = repo();
        let err = bind_data_statement("cap = [5, 7, 9", &mut repo).unwrap_err();
        assert!(err.contains("unbalanced"));
    }

    #[test]
    fn test_binding_is_commutative_across_parameters() {
        let mut a = repo();
        bind_data_statement("n = 5", &mut a).unwrap();
        bind_data_statement("cap = [5, 7, 9]", &mut a).unwrap();

        let mut b = repo();
        bind_data_statement("cap = [5, 7, 9]", &mut b).unwrap();
        bind_data_statement("n = 5", &mut b).unwrap();

        assert_eq!(
            a.parameter("n").unwrap().scalar(),
            b.parameter("n").unwrap().scalar()
        );
        assert_eq!(
            a.parameter("cap").unwrap().at(&[IndexKey::Int(2)]),
            b.parameter("cap").unwrap().at(&[IndexKey::Int(2)])
        );
    }
}
