//! Property-based tests (proptest) for the invariants of the front-end:
//! simplify idempotence, coefficient aggregation, expansion counts, and
//! data-binding commutativity.

use proptest::prelude::*;

use optmodel::expr::{BinOp, Expr, UnOp};
use optmodel::{Config, ModelSession};

// ============================================================================
// Expression generators
// ============================================================================

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-100i32..100).prop_map(|v| Expr::Number(f64::from(v))),
        "[a-d]".prop_map(Expr::Param),
        "[x-z]".prop_map(Expr::Var),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (
                prop_oneof![
                    Just(BinOp::Add),
                    Just(BinOp::Sub),
                    Just(BinOp::Mul),
                    Just(BinOp::Div)
                ],
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, left, right)| Expr::binary(op, left, right)),
            inner.clone().prop_map(|operand| Expr::Unary {
                op: UnOp::Neg,
                operand: Box::new(operand),
            }),
            (inner.clone(), inner.clone(), inner).prop_map(|(c, t, e)| Expr::Conditional {
                cond: Box::new(c),
                then_expr: Box::new(t),
                else_expr: Box::new(e),
            }),
        ]
    })
}

proptest! {
    /// simplify() is idempotent: a second pass changes nothing.
    #[test]
    fn simplify_is_idempotent(expr in arb_expr()) {
        let once = expr.simplify();
        prop_assert_eq!(once.simplify(), once);
    }

    /// Coefficient aggregation: `k1*y + k2*y + ... OP c` yields one entry
    /// with the summed coefficient.
    #[test]
    fn coefficients_aggregate(coeffs in proptest::collection::vec(1i32..20, 1..6)) {
        let total: i32 = coeffs.iter().sum();
        let body: Vec<String> = coeffs.iter().map(|k| format!("{k}*y")).collect();
        let model = format!("dvar float+ y;\nc: {} <= 10;", body.join(" + "));

        let mut session = ModelSession::new(Config::default());
        session.compile(&model, None);
        prop_assert!(!session.has_errors(), "{}", session.diagnostics.render());

        let eq = &session.repository.equations()[0];
        prop_assert_eq!(eq.form.terms().len(), 1);
        let coeff = eq.form.coefficient_value("y", &session.repository).unwrap();
        prop_assert_eq!(coeff, f64::from(total));
    }

    /// Expanding an unfiltered template over `[a..b]` yields exactly
    /// `b - a + 1` scalar constraints.
    #[test]
    fn expansion_count_matches_range(start in 1i64..20, len in 0i64..15) {
        let end = start + len;
        let model = format!(
            "range I = {start}..{end};\n\
             dvar float+ x[I];\n\
             forall(i in I) x[i] <= 1;"
        );
        let mut session = ModelSession::new(Config::default());
        session.compile(&model, None);
        prop_assert!(!session.has_errors(), "{}", session.diagnostics.render());
        prop_assert_eq!(session.repository.equations().len(), (len + 1) as usize);
    }

    /// Two-dimensional unfiltered expansion yields |I| * |J| constraints.
    #[test]
    fn two_dim_expansion_is_product(n in 1i64..6, m in 1i64..6) {
        let model = format!(
            "range I = 1..{n};\nrange J = 1..{m};\n\
             dvar float+ f[I,J];\n\
             forall(i in I, j in J) f[i,j] <= 1;"
        );
        let mut session = ModelSession::new(Config::default());
        session.compile(&model, None);
        prop_assert!(!session.has_errors(), "{}", session.diagnostics.render());
        prop_assert_eq!(session.repository.equations().len(), (n * m) as usize);
    }

    /// Binding independent parameters commutes.
    #[test]
    fn binding_order_is_commutative(a in -1000i64..1000, b in -1000i64..1000) {
        const MODEL: &str = "int a = ...;\nint b = ...;\ndvar float+ x;\nc: x <= 1;";

        let mut first = ModelSession::new(Config::default());
        first.compile(MODEL, Some(&format!("a = {a};\nb = {b};")));
        let mut second = ModelSession::new(Config::default());
        second.compile(MODEL, Some(&format!("b = {b};\na = {a};")));

        prop_assert!(!first.has_errors());
        prop_assert!(!second.has_errors());
        for name in ["a", "b"] {
            prop_assert_eq!(
                first.repository.parameter(name).unwrap().scalar(),
                second.repository.parameter(name).unwrap().scalar()
            );
        }
    }
}
