//! # Expression Tree
//!
//! Tagged expression model for algebraic model source. Trees may contain
//! deferred references (parameters, indexed parameters, tuple field
//! accesses, iterator variables, `item()` lookups, conditionals,
//! summations) and are evaluable under an iterator binding context once
//! external data is bound.
//!
//! Decision-variable leaves are coefficient carriers: evaluating one in a
//! numeric context is an error, and only the linearizer consumes them.

use crate::model::tuples::TupleInstance;
use crate::model::ModelRepository;
use crate::value::{IndexKey, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Evaluation failure. Accumulated as diagnostics by callers, never thrown
/// across component boundaries.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("parameter '{0}' is not bound")]
    UnboundParameter(String),

    #[error("parameter '{name}' has no value at index [{key}]")]
    MissingIndex { name: String, key: String },

    #[error("decision variable '{0}' used in a numeric context")]
    DecisionVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("non-numeric value in arithmetic: {0}")]
    NonNumeric(String),

    #[error("unknown set '{0}'")]
    UnknownSet(String),

    #[error("unknown tuple schema '{0}'")]
    UnknownSchema(String),

    #[error("tuple '{tuple}' has no field '{field}'")]
    NoSuchField { tuple: String, field: String },

    #[error("no instance of '{set}' matches key <{key}>")]
    ItemNotFound { set: String, key: String },

    #[error("iterator '{0}' is not bound")]
    UnboundIterator(String),

    #[error("set '{set}' has no element at position {index}")]
    IndexOutOfRange { set: String, index: i64 },

    #[error("{0}")]
    TypeMismatch(String),
}

/// Binary operators: arithmetic plus the comparisons used in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// One iterator of a quantifier, summation, or comprehension:
/// `var in set` with an optional `: filter` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorSpec {
    pub var: String,
    pub set: String,
    pub filter: Option<Expr>,
}

/// A value bound to an iterator variable during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Num(i64),
    Str(String),
    Tuple(TupleInstance),
}

/// Immutable-style mapping from iterator variable to bound value. Binding a
/// new iterator clones the map explicitly; dropping the clone pops the frame.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    bindings: std::collections::HashMap<String, Binding>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext::default()
    }

    /// A new context with one more binding. The receiver is unchanged.
    pub fn bind(&self, var: &str, binding: Binding) -> EvalContext {
        let mut next = self.clone();
        next.bindings.insert(var.to_string(), binding);
        next
    }

    pub fn get(&self, var: &str) -> Option<&Binding> {
        self.bindings.get(var)
    }

    pub fn get_int(&self, var: &str) -> Option<i64> {
        match self.bindings.get(var) {
            Some(Binding::Num(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The expression tree. Trees exclusively own their children; entities are
/// referenced by name and resolved against the repository at evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal, used in predicates and tuple keys.
    Str(String),
    /// Iterator variable, symbolic until bound by an `EvalContext`.
    Iter(String),
    /// Scalar parameter reference.
    Param(String),
    /// Parameter at fixed or iterator-bound indices.
    IndexedParam { name: String, indices: Vec<Expr> },
    /// Scalar decision variable leaf (coefficient carrier).
    Var(String),
    /// Decision variable at indices; resolves to a canonical scalar name.
    IndexedVar { name: String, indices: Vec<Expr> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// Multi-iterator summation; per-iterator filters prune the walk.
    Sum {
        iterators: Vec<IteratorSpec>,
        body: Box<Expr>,
    },
    /// `iter.field` where `iter` is bound to a tuple instance.
    TupleField { base: String, field: String },
    /// `S[index].field` positional access into a tuple set.
    IndexedTupleField {
        set: String,
        index: Box<Expr>,
        field: String,
    },
    /// `cond ? then : else` (also produced by `if/else` syntax).
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `item(S, <key>)` - a tuple value, consumable only via field access.
    Item { set: String, key: Box<Expr> },
    /// `item(S, <key>).field`.
    ItemField {
        set: String,
        key: Box<Expr>,
        field: String,
    },
    /// `<e1, e2, ...>` anonymous tuple key.
    TupleKey(Vec<Expr>),
    /// Reference to a named decision expression.
    DexprRef { name: String, indices: Vec<Expr> },
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn binary_add(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinOp::Add, left, right)
    }

    pub fn binary_mul(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinOp::Mul, left, right)
    }

    pub fn neg(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnOp::Neg,
            operand: Box::new(operand),
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate to a scalar value under the given iterator bindings.
    pub fn evaluate(&self, ctx: &EvalContext, repo: &ModelRepository) -> Result<Value, EvalError> {
        match self {
            Expr::Number(v) => Ok(Value::Float(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Iter(var) => match ctx.get(var) {
                Some(Binding::Num(v)) => Ok(Value::Int(*v)),
                Some(Binding::Str(s)) => Ok(Value::Str(s.clone())),
                Some(Binding::Tuple(_)) => Err(EvalError::TypeMismatch(format!(
                    "iterator '{var}' is bound to a tuple, not a scalar"
                ))),
                None => Err(EvalError::UnboundIterator(var.clone())),
            },
            Expr::Param(name) => {
                let param = repo
                    .parameter(name)
                    .ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))?;
                param
                    .scalar()
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundParameter(name.clone()))
            }
            Expr::IndexedParam { name, indices } => {
                let param = repo
                    .parameter(name)
                    .ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))?;
                let mut key = Vec::with_capacity(indices.len());
                for index in indices {
                    let value = index.evaluate(ctx, repo)?;
                    key.push(IndexKey::from_value(&value).ok_or_else(|| {
                        EvalError::TypeMismatch(format!(
                            "index of '{name}' must be an integer or string, got {value}"
                        ))
                    })?);
                }
                param.at(&key).cloned().ok_or_else(|| {
                    let rendered: Vec<String> = key.iter().map(ToString::to_string).collect();
                    EvalError::MissingIndex {
                        name: name.clone(),
                        key: rendered.join(","),
                    }
                })
            }
            Expr::Var(name) | Expr::IndexedVar { name, .. } => {
                Err(EvalError::DecisionVariable(name.clone()))
            }
            Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, ctx, repo),
            Expr::Unary { op, operand } => match op {
                UnOp::Neg => {
                    let v = operand.evaluate_numeric(ctx, repo)?;
                    Ok(Value::Float(-v))
                }
                UnOp::Not => {
                    let v = operand.evaluate(ctx, repo)?;
                    Ok(Value::Bool(!v.is_truthy()))
                }
            },
            Expr::Sum { iterators, body } => {
                let mut total = 0.0;
                sum_walk(iterators, body, ctx, repo, 0, &mut total)?;
                Ok(Value::Float(total))
            }
            Expr::TupleField { base, field } => match ctx.get(base) {
                Some(Binding::Tuple(instance)) => tuple_field(instance, field, repo),
                Some(_) => Err(EvalError::TypeMismatch(format!(
                    "'{base}' is not bound to a tuple"
                ))),
                None => Err(EvalError::UnknownIdentifier(base.clone())),
            },
            Expr::IndexedTupleField { set, index, field } => {
                let position = index.evaluate(ctx, repo)?.as_i64().ok_or_else(|| {
                    EvalError::TypeMismatch(format!("index of '{set}' must be an integer"))
                })?;
                let instance = lookup_positional(set, position, repo)?;
                tuple_field(&instance, field, repo)
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if cond.evaluate(ctx, repo)?.is_truthy() {
                    then_expr.evaluate(ctx, repo)
                } else {
                    else_expr.evaluate(ctx, repo)
                }
            }
            Expr::Item { set, .. } => Err(EvalError::TypeMismatch(format!(
                "item({set}, ...) is a tuple value; access a field of it"
            ))),
            Expr::ItemField { set, key, field } => {
                let instance = item_lookup(set, key, ctx, repo)?;
                tuple_field(&instance, field, repo)
            }
            Expr::TupleKey(_) => Err(EvalError::TypeMismatch(
                "tuple key used outside item()".to_string(),
            )),
            Expr::DexprRef { name, indices } => {
                let dexpr = repo
                    .dexpr(name)
                    .ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))?;
                // Fresh context: the host's iterators are erased, only the
                // dexpr's own declared iterators are bound.
                let mut fresh = EvalContext::new();
                for (spec, index) in dexpr.iterators.iter().zip(indices) {
                    let value = index.evaluate(ctx, repo)?.as_i64().ok_or_else(|| {
                        EvalError::TypeMismatch(format!("index of dexpr '{name}' must be an integer"))
                    })?;
                    fresh = fresh.bind(&spec.var, Binding::Num(value));
                }
                dexpr.body.evaluate(&fresh, repo)
            }
        }
    }

    /// Evaluate and demand a numeric result.
    pub fn evaluate_numeric(
        &self,
        ctx: &EvalContext,
        repo: &ModelRepository,
    ) -> Result<f64, EvalError> {
        let value = self.evaluate(ctx, repo)?;
        value
            .as_f64()
            .ok_or_else(|| EvalError::NonNumeric(value.to_string()))
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Constant-fold. Sub-expressions that cannot be folded are left
    /// unchanged; the operation never fails.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Binary { op, left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expr::Number(l), Expr::Number(r)) = (&left, &right) {
                    let truth = |b: bool| if b { 1.0 } else { 0.0 };
                    let folded = match op {
                        BinOp::Add => Some(l + r),
                        BinOp::Sub => Some(l - r),
                        BinOp::Mul => Some(l * r),
                        BinOp::Div => {
                            if *r == 0.0 {
                                None
                            } else {
                                Some(l / r)
                            }
                        }
                        BinOp::Eq => Some(truth(l == r)),
                        BinOp::Ne => Some(truth(l != r)),
                        BinOp::Lt => Some(truth(l < r)),
                        BinOp::Le => Some(truth(l <= r)),
                        BinOp::Gt => Some(truth(l > r)),
                        BinOp::Ge => Some(truth(l >= r)),
                    };
                    if let Some(v) = folded {
                        return Expr::Number(v);
                    }
                }
                Expr::binary(*op, left, right)
            }
            Expr::Unary { op, operand } => {
                let operand = operand.simplify();
                match (op, &operand) {
                    (UnOp::Neg, Expr::Number(v)) => Expr::Number(-v),
                    (UnOp::Not, Expr::Number(v)) => {
                        Expr::Number(if *v == 0.0 { 1.0 } else { 0.0 })
                    }
                    _ => Expr::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                }
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = cond.simplify();
                if let Expr::Number(v) = cond {
                    return if v != 0.0 {
                        then_expr.simplify()
                    } else {
                        else_expr.simplify()
                    };
                }
                Expr::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr.simplify()),
                    else_expr: Box::new(else_expr.simplify()),
                }
            }
            Expr::Sum { iterators, body } => Expr::Sum {
                iterators: iterators.clone(),
                body: Box::new(body.simplify()),
            },
            Expr::IndexedParam { name, indices } => Expr::IndexedParam {
                name: name.clone(),
                indices: indices.iter().map(Expr::simplify).collect(),
            },
            Expr::IndexedVar { name, indices } => Expr::IndexedVar {
                name: name.clone(),
                indices: indices.iter().map(Expr::simplify).collect(),
            },
            other => other.clone(),
        }
    }

    /// The set of scalar decision-variable names referenced by this tree
    /// after index resolution. Best-effort: unresolvable indexed references
    /// contribute their base name.
    pub fn walk_variables(
        &self,
        ctx: &EvalContext,
        repo: &ModelRepository,
    ) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_variables(ctx, repo, &mut out);
        out
    }

    fn collect_variables(
        &self,
        ctx: &EvalContext,
        repo: &ModelRepository,
        out: &mut HashSet<String>,
    ) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::IndexedVar { name, indices } => {
                let mut resolved = Vec::with_capacity(indices.len());
                for index in indices {
                    match index.evaluate(ctx, repo).ok().and_then(|v| v.as_i64()) {
                        Some(v) => resolved.push(v),
                        None => {
                            out.insert(name.clone());
                            return;
                        }
                    }
                }
                out.insert(crate::model::canonical_name(name, &resolved));
            }
            Expr::Binary { left, right, .. } => {
                left.collect_variables(ctx, repo, out);
                right.collect_variables(ctx, repo, out);
            }
            Expr::Unary { operand, .. } => operand.collect_variables(ctx, repo, out),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.collect_variables(ctx, repo, out);
                then_expr.collect_variables(ctx, repo, out);
                else_expr.collect_variables(ctx, repo, out);
            }
            Expr::Sum { iterators, body } => {
                let _ = sum_collect(iterators, body, ctx, repo, 0, out);
            }
            Expr::DexprRef { name, .. } => {
                if let Some(dexpr) = repo.dexpr(name) {
                    dexpr.body.collect_variables(&EvalContext::new(), repo, out);
                }
            }
            _ => {}
        }
    }
}

fn evaluate_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
) -> Result<Value, EvalError> {
    if op.is_comparison() {
        let l = left.evaluate(ctx, repo)?;
        let r = right.evaluate(ctx, repo)?;
        // String operands compare by equality only; everything else is
        // numeric comparison.
        if let (Value::Str(a), Value::Str(b)) = (&l, &r) {
            return match op {
                BinOp::Eq => Ok(Value::Bool(a == b)),
                BinOp::Ne => Ok(Value::Bool(a != b)),
                _ => Err(EvalError::TypeMismatch(format!(
                    "strings support only == and !=, not {}",
                    op.as_str()
                ))),
            };
        }
        let a = l.as_f64().ok_or_else(|| EvalError::NonNumeric(l.to_string()))?;
        let b = r.as_f64().ok_or_else(|| EvalError::NonNumeric(r.to_string()))?;
        let result = match op {
            BinOp::Eq => a == b,
            BinOp::Ne => a != b,
            BinOp::Lt => a < b,
            BinOp::Le => a <= b,
            BinOp::Gt => a > b,
            BinOp::Ge => a >= b,
            _ => unreachable!(),
        };
        return Ok(Value::Bool(result));
    }

    let a = left.evaluate_numeric(ctx, repo)?;
    let b = right.evaluate_numeric(ctx, repo)?;
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        _ => unreachable!(),
    };
    Ok(Value::Float(result))
}

fn sum_walk(
    iterators: &[IteratorSpec],
    body: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
    depth: usize,
    total: &mut f64,
) -> Result<(), EvalError> {
    if depth == iterators.len() {
        *total += body.evaluate_numeric(ctx, repo)?;
        return Ok(());
    }
    let spec = &iterators[depth];
    for binding in repo.iterate_set(&spec.set)? {
        let inner = ctx.bind(&spec.var, binding);
        if let Some(filter) = &spec.filter {
            if !filter.evaluate(&inner, repo)?.is_truthy() {
                continue;
            }
        }
        sum_walk(iterators, body, &inner, repo, depth + 1, total)?;
    }
    Ok(())
}

fn sum_collect(
    iterators: &[IteratorSpec],
    body: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
    depth: usize,
    out: &mut HashSet<String>,
) -> Result<(), EvalError> {
    if depth == iterators.len() {
        body.collect_variables(ctx, repo, out);
        return Ok(());
    }
    let spec = &iterators[depth];
    for binding in repo.iterate_set(&spec.set)? {
        let inner = ctx.bind(&spec.var, binding);
        if let Some(filter) = &spec.filter {
            if !filter.evaluate(&inner, repo)?.is_truthy() {
                continue;
            }
        }
        sum_collect(iterators, body, &inner, repo, depth + 1, out)?;
    }
    Ok(())
}

fn tuple_field(
    instance: &TupleInstance,
    field: &str,
    repo: &ModelRepository,
) -> Result<Value, EvalError> {
    let schema = repo
        .tuple_schema(&instance.schema)
        .ok_or_else(|| EvalError::UnknownSchema(instance.schema.clone()))?;
    instance
        .field(schema, field)
        .cloned()
        .ok_or_else(|| EvalError::NoSuchField {
            tuple: instance.schema.clone(),
            field: field.to_string(),
        })
}

fn lookup_positional(
    set: &str,
    position: i64,
    repo: &ModelRepository,
) -> Result<TupleInstance, EvalError> {
    if let Some(tuples) = repo.tuple_set(set) {
        return tuples
            .instance_at(position)
            .cloned()
            .ok_or(EvalError::IndexOutOfRange {
                set: set.to_string(),
                index: position,
            });
    }
    if let Some(computed) = repo.computed_set(set) {
        let instances = computed.materialize(repo)?;
        if position >= 1 {
            if let Some(instance) = instances.get(position as usize - 1) {
                return Ok(instance.clone());
            }
        }
        return Err(EvalError::IndexOutOfRange {
            set: set.to_string(),
            index: position,
        });
    }
    Err(EvalError::UnknownSet(set.to_string()))
}

fn item_lookup(
    set: &str,
    key: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
) -> Result<TupleInstance, EvalError> {
    let parts: Vec<&Expr> = match key {
        Expr::TupleKey(inner) => inner.iter().collect(),
        single => vec![single],
    };
    let mut keys = Vec::with_capacity(parts.len());
    for part in parts {
        let value = part.evaluate(ctx, repo)?;
        keys.push(IndexKey::from_value(&value).ok_or_else(|| {
            EvalError::TypeMismatch(format!("key of item({set}, ...) must be scalar, got {value}"))
        })?);
    }
    let tuples = repo
        .tuple_set(set)
        .ok_or_else(|| EvalError::UnknownSet(set.to_string()))?;
    let schema = repo
        .tuple_schema(&tuples.schema)
        .ok_or_else(|| EvalError::UnknownSchema(tuples.schema.clone()))?;
    tuples.find_by_key(&keys, schema).cloned().ok_or_else(|| {
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        EvalError::ItemNotFound {
            set: set.to_string(),
            key: rendered.join(","),
        }
    })
}

// ============================================================================
// Rendering
// ============================================================================

fn fmt_number(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        write!(f, "{}", v as i64)
    } else {
        write!(f, "{v}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => fmt_number(*v, f),
            Expr::Str(s) => write!(f, "\"{s}\""),
            Expr::Iter(v) | Expr::Param(v) | Expr::Var(v) => f.write_str(v),
            Expr::IndexedParam { name, indices } | Expr::IndexedVar { name, indices } => {
                let parts: Vec<String> = indices.iter().map(ToString::to_string).collect();
                write!(f, "{}[{}]", name, parts.join(","))
            }
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.as_str(), right)
            }
            Expr::Unary { op, operand } => match op {
                UnOp::Neg => write!(f, "-{operand}"),
                UnOp::Not => write!(f, "!{operand}"),
            },
            Expr::Sum { iterators, body } => {
                let parts: Vec<String> = iterators
                    .iter()
                    .map(|spec| match &spec.filter {
                        Some(filter) => format!("{} in {} : {}", spec.var, spec.set, filter),
                        None => format!("{} in {}", spec.var, spec.set),
                    })
                    .collect();
                write!(f, "sum({}) {}", parts.join(", "), body)
            }
            Expr::TupleField { base, field } => write!(f, "{base}.{field}"),
            Expr::IndexedTupleField { set, index, field } => {
                write!(f, "{set}[{index}].{field}")
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({cond} ? {then_expr} : {else_expr})"),
            Expr::Item { set, key } => write!(f, "item({set}, {key})"),
            Expr::ItemField { set, key, field } => write!(f, "item({set}, {key}).{field}"),
            Expr::TupleKey(parts) => {
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "<{}>", rendered.join(","))
            }
            Expr::DexprRef { name, indices } => {
                if indices.is_empty() {
                    f.write_str(name)
                } else {
                    let parts: Vec<String> = indices.iter().map(ToString::to_string).collect();
                    write!(f, "{}[{}]", name, parts.join(","))
                }
            }
        }
    }
}
