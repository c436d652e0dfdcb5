//! Linearization of expression trees into `sum(c_j * x_j) OP k` form.
//!
//! Each side of a constraint is parsed into an `Expr`, then traversed
//! collecting per-variable coefficient trees and aggregating constants. The
//! right-hand side contributes negated coefficients; the constant is
//! `rhs_constant - lhs_constant`. Coefficients stay as expression trees so
//! parameters bound later resolve at read time.

use crate::expr::{BinOp, Binding, EvalContext, Expr, UnOp};
use crate::model::{canonical_name, LinearForm, ModelRepository};

/// Linearize `lhs OP rhs` under the given iterator bindings.
pub fn linearize_constraint(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
) -> Result<LinearForm, String> {
    let mut collector = Collector {
        repo,
        form: LinearForm::new(),
        constant: Expr::Number(0.0),
    };
    collector.collect(lhs, &Expr::Number(1.0), ctx)?;
    collector.collect(rhs, &Expr::Number(-1.0), ctx)?;

    let mut form = collector.form;
    // Accumulated constant is lhs - rhs; the canonical k sits on the other
    // side of the operator.
    form.constant = Expr::neg(collector.constant).simplify();

    match form.all_zero() {
        Some(true) => match form.constant.simplify() {
            Expr::Number(k) if k == 0.0 => {
                Err("constraint reduces to a tautology (0 == 0)".to_string())
            }
            Expr::Number(_) => {
                Err("constraint reduces to a contradiction".to_string())
            }
            _ => Err("constraint contains no decision variables".to_string()),
        },
        _ => Ok(form),
    }
}

/// Linearize a single expression (objective or dexpr body). The constant is
/// the expression's own constant part, not negated.
pub fn linearize_expression(
    expr: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
) -> Result<LinearForm, String> {
    let mut collector = Collector {
        repo,
        form: LinearForm::new(),
        constant: Expr::Number(0.0),
    };
    collector.collect(expr, &Expr::Number(1.0), ctx)?;
    let mut form = collector.form;
    form.constant = collector.constant.simplify();
    Ok(form)
}

/// Whether a tree carries any decision-variable leaf. Decision-expression
/// references count: they exist to carry variables.
pub fn contains_variable(expr: &Expr, repo: &ModelRepository) -> bool {
    match expr {
        Expr::Var(_) | Expr::IndexedVar { .. } => true,
        Expr::DexprRef { name, .. } => repo
            .dexpr(name)
            .map_or(true, |d| contains_variable(&d.body, repo)),
        Expr::Binary { left, right, .. } => {
            contains_variable(left, repo) || contains_variable(right, repo)
        }
        Expr::Unary { operand, .. } => contains_variable(operand, repo),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            contains_variable(cond, repo)
                || contains_variable(then_expr, repo)
                || contains_variable(else_expr, repo)
        }
        Expr::Sum { body, .. } => contains_variable(body, repo),
        _ => false,
    }
}

/// Substitute bound iterators throughout a tree: bare iterators become
/// literals, tuple field accesses on bound iterators resolve to values, and
/// indices recurse. Unbound iterators are left symbolic. Inner summations
/// shadow their own iterator names.
pub fn resolve_iterators(
    expr: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
) -> Result<Expr, String> {
    resolve_shadowed(expr, ctx, repo, &mut Vec::new())
}

fn resolve_shadowed(
    expr: &Expr,
    ctx: &EvalContext,
    repo: &ModelRepository,
    shadow: &mut Vec<String>,
) -> Result<Expr, String> {
    let resolved = match expr {
        Expr::Iter(var) => {
            if shadow.contains(var) {
                expr.clone()
            } else {
                match ctx.get(var) {
                    Some(Binding::Num(v)) => Expr::Number(*v as f64),
                    Some(Binding::Str(s)) => Expr::Str(s.clone()),
                    Some(Binding::Tuple(_)) => {
                        return Err(format!("iterator '{var}' is a tuple in a scalar position"))
                    }
                    None => expr.clone(),
                }
            }
        }
        Expr::TupleField { base, field } => {
            if shadow.contains(base) {
                expr.clone()
            } else {
                match ctx.get(base) {
                    Some(Binding::Tuple(_)) => {
                        let value = expr.evaluate(ctx, repo).map_err(|e| e.to_string())?;
                        value_to_literal(&value)
                    }
                    _ => expr.clone(),
                }
            }
        }
        Expr::IndexedParam { name, indices } => Expr::IndexedParam {
            name: name.clone(),
            indices: resolve_all(indices, ctx, repo, shadow)?,
        },
        Expr::IndexedVar { name, indices } => Expr::IndexedVar {
            name: name.clone(),
            indices: resolve_all(indices, ctx, repo, shadow)?,
        },
        Expr::IndexedTupleField { set, index, field } => Expr::IndexedTupleField {
            set: set.clone(),
            index: Box::new(resolve_shadowed(index, ctx, repo, shadow)?),
            field: field.clone(),
        },
        Expr::Binary { op, left, right } => Expr::binary(
            *op,
            resolve_shadowed(left, ctx, repo, shadow)?,
            resolve_shadowed(right, ctx, repo, shadow)?,
        ),
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(resolve_shadowed(operand, ctx, repo, shadow)?),
        },
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => Expr::Conditional {
            cond: Box::new(resolve_shadowed(cond, ctx, repo, shadow)?),
            then_expr: Box::new(resolve_shadowed(then_expr, ctx, repo, shadow)?),
            else_expr: Box::new(resolve_shadowed(else_expr, ctx, repo, shadow)?),
        },
        Expr::Sum { iterators, body } => {
            let before = shadow.len();
            let mut specs = Vec::with_capacity(iterators.len());
            for spec in iterators {
                // The filter of an iterator may reference earlier iterators
                // of the same sum, which are shadowed, plus outer bindings.
                let filter = match &spec.filter {
                    Some(f) => Some(resolve_shadowed(f, ctx, repo, shadow)?),
                    None => None,
                };
                shadow.push(spec.var.clone());
                specs.push(crate::expr::IteratorSpec {
                    var: spec.var.clone(),
                    set: spec.set.clone(),
                    filter,
                });
            }
            let body = resolve_shadowed(body, ctx, repo, shadow)?;
            shadow.truncate(before);
            Expr::Sum {
                iterators: specs,
                body: Box::new(body),
            }
        }
        Expr::Item { set, key } => Expr::Item {
            set: set.clone(),
            key: Box::new(resolve_shadowed(key, ctx, repo, shadow)?),
        },
        Expr::ItemField { set, key, field } => Expr::ItemField {
            set: set.clone(),
            key: Box::new(resolve_shadowed(key, ctx, repo, shadow)?),
            field: field.clone(),
        },
        Expr::TupleKey(parts) => Expr::TupleKey(resolve_all(parts, ctx, repo, shadow)?),
        Expr::DexprRef { name, indices } => Expr::DexprRef {
            name: name.clone(),
            indices: resolve_all(indices, ctx, repo, shadow)?,
        },
        Expr::Number(_) | Expr::Str(_) | Expr::Param(_) | Expr::Var(_) => expr.clone(),
    };
    Ok(resolved)
}

fn resolve_all(
    exprs: &[Expr],
    ctx: &EvalContext,
    repo: &ModelRepository,
    shadow: &mut Vec<String>,
) -> Result<Vec<Expr>, String> {
    exprs
        .iter()
        .map(|e| resolve_shadowed(e, ctx, repo, shadow))
        .collect()
}

fn value_to_literal(value: &crate::value::Value) -> Expr {
    match value {
        crate::value::Value::Str(s) => Expr::Str(s.clone()),
        other => Expr::Number(other.as_f64().unwrap_or(0.0)),
    }
}

struct Collector<'a> {
    repo: &'a ModelRepository,
    form: LinearForm,
    constant: Expr,
}

impl Collector<'_> {
    fn collect(&mut self, expr: &Expr, mult: &Expr, ctx: &EvalContext) -> Result<(), String> {
        match expr {
            Expr::Var(name) => {
                self.form.add_term(name, mult.clone());
                Ok(())
            }
            Expr::IndexedVar { name, indices } => {
                let mut resolved = Vec::with_capacity(indices.len());
                for index in indices {
                    let value = index
                        .evaluate(ctx, self.repo)
                        .map_err(|e| format!("cannot resolve index of '{name}': {e}"))?;
                    let v = value.as_i64().ok_or_else(|| {
                        format!("index of '{name}' must be an integer, got {value}")
                    })?;
                    resolved.push(v);
                }
                self.form.add_term(&canonical_name(name, &resolved), mult.clone());
                Ok(())
            }
            Expr::Binary { op, left, right } => match op {
                BinOp::Add => {
                    self.collect(left, mult, ctx)?;
                    self.collect(right, mult, ctx)
                }
                BinOp::Sub => {
                    self.collect(left, mult, ctx)?;
                    let negated = Expr::binary_mul(Expr::Number(-1.0), mult.clone()).simplify();
                    self.collect(right, &negated, ctx)
                }
                BinOp::Mul => {
                    let left_has = contains_variable(left, self.repo);
                    let right_has = contains_variable(right, self.repo);
                    match (left_has, right_has) {
                        (true, true) => Err(
                            "nonlinear term: product of two decision-variable expressions"
                                .to_string(),
                        ),
                        (true, false) => {
                            let factor = resolve_iterators(right, ctx, self.repo)?;
                            let scaled = Expr::binary_mul(mult.clone(), factor).simplify();
                            self.collect(left, &scaled, ctx)
                        }
                        (false, true) => {
                            let factor = resolve_iterators(left, ctx, self.repo)?;
                            let scaled = Expr::binary_mul(mult.clone(), factor).simplify();
                            self.collect(right, &scaled, ctx)
                        }
                        (false, false) => self.constant_contribution(expr, mult, ctx),
                    }
                }
                BinOp::Div => {
                    if contains_variable(right, self.repo) {
                        return Err(
                            "nonlinear term: decision variable in a divisor".to_string()
                        );
                    }
                    if contains_variable(left, self.repo) {
                        let divisor = resolve_iterators(right, ctx, self.repo)?;
                        let scaled =
                            Expr::binary(BinOp::Div, mult.clone(), divisor).simplify();
                        self.collect(left, &scaled, ctx)
                    } else {
                        self.constant_contribution(expr, mult, ctx)
                    }
                }
                _ => Err(format!(
                    "unexpected relational operator '{}' inside expression",
                    op.as_str()
                )),
            },
            Expr::Unary { op, operand } => match op {
                UnOp::Neg => {
                    let negated = Expr::binary_mul(Expr::Number(-1.0), mult.clone()).simplify();
                    self.collect(operand, &negated, ctx)
                }
                UnOp::Not => {
                    if contains_variable(operand, self.repo) {
                        Err("logical not applied to a decision variable".to_string())
                    } else {
                        self.constant_contribution(expr, mult, ctx)
                    }
                }
            },
            Expr::Sum { iterators, body } => {
                self.collect_sum(iterators, body, mult, ctx, 0)
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if contains_variable(then_expr, self.repo)
                    || contains_variable(else_expr, self.repo)
                {
                    if contains_variable(cond, self.repo) {
                        return Err(
                            "conditional on a decision variable is not linear".to_string()
                        );
                    }
                    let taken = cond
                        .evaluate(ctx, self.repo)
                        .map_err(|e| format!("cannot evaluate condition: {e}"))?;
                    if taken.is_truthy() {
                        self.collect(then_expr, mult, ctx)
                    } else {
                        self.collect(else_expr, mult, ctx)
                    }
                } else {
                    self.constant_contribution(expr, mult, ctx)
                }
            }
            Expr::DexprRef { name, indices } => {
                let dexpr = self
                    .repo
                    .dexpr(name)
                    .ok_or_else(|| format!("unknown decision expression '{name}'"))?
                    .clone();
                if indices.len() != dexpr.iterators.len() {
                    return Err(format!(
                        "decision expression '{name}' takes {} index value(s), got {}",
                        dexpr.iterators.len(),
                        indices.len()
                    ));
                }
                // Fresh context: only the dexpr's declared iterators bound.
                let mut fresh = EvalContext::new();
                for (spec, index) in dexpr.iterators.iter().zip(indices) {
                    let value = index
                        .evaluate(ctx, self.repo)
                        .map_err(|e| format!("cannot resolve index of '{name}': {e}"))?;
                    let v = value.as_i64().ok_or_else(|| {
                        format!("index of '{name}' must be an integer, got {value}")
                    })?;
                    fresh = fresh.bind(&spec.var, Binding::Num(v));
                }
                self.collect(&dexpr.body, mult, &fresh)
            }
            // Everything else is a constant (possibly deferred) contribution.
            _ => self.constant_contribution(expr, mult, ctx),
        }
    }

    fn collect_sum(
        &mut self,
        iterators: &[crate::expr::IteratorSpec],
        body: &Expr,
        mult: &Expr,
        ctx: &EvalContext,
        depth: usize,
    ) -> Result<(), String> {
        if depth == iterators.len() {
            return self.collect(body, mult, ctx);
        }
        let spec = &iterators[depth];
        let elements = self
            .repo
            .iterate_set(&spec.set)
            .map_err(|e| e.to_string())?;
        for binding in elements {
            let inner = ctx.bind(&spec.var, binding);
            if let Some(filter) = &spec.filter {
                let keep = filter
                    .evaluate(&inner, self.repo)
                    .map_err(|e| e.to_string())?
                    .is_truthy();
                if !keep {
                    continue;
                }
            }
            self.collect_sum(iterators, body, mult, &inner, depth + 1)?;
        }
        Ok(())
    }

    fn constant_contribution(
        &mut self,
        expr: &Expr,
        mult: &Expr,
        ctx: &EvalContext,
    ) -> Result<(), String> {
        let resolved = resolve_iterators(expr, ctx, self.repo)?;
        let scaled = Expr::binary_mul(mult.clone(), resolved);
        self.constant = Expr::binary_add(self.constant.clone(), scaled).simplify();
        Ok(())
    }
}
