//! Recursive-descent expression parser.
//!
//! Builds `Expr` trees with the precedence ladder (lowest to highest):
//! ternary, comparison, additive, multiplicative, unary, call/postfix.
//! Parentheses override. Implicit multiplication is forbidden except for a
//! numeric literal directly followed by an identifier (`2x` reads as
//! `2 * x`); two consecutive identifiers are a diagnostic.
//!
//! Identifiers are classified against the repository at parse time:
//! iterator variable in lexical scope, then parameter, then decision
//! expression, then decision variable; unknown names become variable
//! placeholders validated later.

use crate::expr::{BinOp, Expr, IteratorSpec, UnOp};
use crate::model::ModelRepository;

/// Words that terminate an operand rather than start a new one.
const RESERVED: &[&str] = &["in", "else", "then"];

pub struct ExprParser<'a> {
    chars: Vec<char>,
    pos: usize,
    repo: &'a ModelRepository,
    /// Iterator variables in lexical scope, innermost last.
    scope: Vec<String>,
}

/// Parse a complete expression; trailing input is an error.
pub fn parse_expression(
    text: &str,
    repo: &ModelRepository,
    scope: &[String],
) -> Result<Expr, String> {
    let mut parser = ExprParser::new(text, repo, scope);
    let expr = parser.parse_ternary()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(format!(
            "unexpected input after expression: '{}'",
            parser.rest().trim()
        ));
    }
    Ok(expr)
}

/// Parse a comma-separated iterator list `v in S [: filter], ...`.
/// Filters see the outer scope plus every iterator declared before them,
/// including their own.
pub fn parse_iterator_specs(
    text: &str,
    repo: &ModelRepository,
    scope: &[String],
) -> Result<Vec<IteratorSpec>, String> {
    let mut parser = ExprParser::new(text, repo, scope);
    let specs = parser.parse_iterators(None)?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(format!(
            "unexpected input after iterators: '{}'",
            parser.rest().trim()
        ));
    }
    Ok(specs)
}

impl<'a> ExprParser<'a> {
    fn new(text: &str, repo: &'a ModelRepository, scope: &[String]) -> Self {
        ExprParser {
            chars: text.chars().collect(),
            pos: 0,
            repo,
            scope: scope.to_vec(),
        }
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!(
                "expected '{}' but found '{}'",
                expected,
                self.rest().trim()
            ))
        }
    }

    /// Peek the identifier starting at the cursor, without consuming.
    fn peek_ident(&self) -> Option<String> {
        let mut i = self.pos;
        while i < self.chars.len() && self.chars[i].is_whitespace() {
            i += 1;
        }
        if i >= self.chars.len() || !self.chars[i].is_ascii_alphabetic() {
            return None;
        }
        let mut name = String::new();
        while i < self.chars.len()
            && (self.chars[i].is_ascii_alphanumeric() || self.chars[i] == '_')
        {
            name.push(self.chars[i]);
            i += 1;
        }
        Some(name)
    }

    fn read_ident(&mut self) -> Option<String> {
        self.skip_ws();
        let name = self.peek_ident()?;
        self.pos += name.chars().count();
        Some(name)
    }

    /// Try to consume a relational operator token.
    fn eat_relop(&mut self) -> Option<BinOp> {
        self.skip_ws();
        let two: String = self.chars[self.pos..].iter().take(2).collect();
        match two.as_str() {
            "==" => {
                self.pos += 2;
                return Some(BinOp::Eq);
            }
            "!=" => {
                self.pos += 2;
                return Some(BinOp::Ne);
            }
            "<=" => {
                self.pos += 2;
                return Some(BinOp::Le);
            }
            ">=" => {
                self.pos += 2;
                return Some(BinOp::Ge);
            }
            _ => {}
        }
        match self.peek() {
            Some('≤') => {
                self.pos += 1;
                Some(BinOp::Le)
            }
            Some('≥') => {
                self.pos += 1;
                Some(BinOp::Ge)
            }
            Some('<') => {
                self.pos += 1;
                Some(BinOp::Lt)
            }
            Some('>') => {
                self.pos += 1;
                Some(BinOp::Gt)
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Precedence ladder
    // ------------------------------------------------------------------

    pub fn parse_ternary(&mut self) -> Result<Expr, String> {
        let cond = self.parse_comparison()?;
        if self.eat('?') {
            let then_expr = self.parse_ternary()?;
            self.expect(':')?;
            let else_expr = self.parse_ternary()?;
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }
        Ok(cond)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_additive()?;
        self.skip_ws();
        // A single '=' is assignment syntax, not equality.
        if self.peek() == Some('=')
            && self.chars.get(self.pos + 1) != Some(&'=')
        {
            return Err("'=' is assignment; use '==' for equality".to_string());
        }
        // '<' opening a tuple key was already consumed in a primary, so a
        // relational operator here really is one.
        if let Some(op) = self.eat_relop() {
            let rhs = self.parse_additive()?;
            self.skip_ws();
            if self.eat_relop().is_some() {
                return Err("duplicate relational operator in expression".to_string());
            }
            return Ok(Expr::binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let rhs = self.parse_term()?;
                    expr = Expr::binary(BinOp::Add, expr, rhs);
                }
                Some('-') => {
                    self.pos += 1;
                    let rhs = self.parse_term()?;
                    expr = Expr::binary(BinOp::Sub, expr, rhs);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_unary()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    expr = Expr::binary(BinOp::Mul, expr, rhs);
                }
                Some('/') => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    expr = Expr::binary(BinOp::Div, expr, rhs);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some('!') if self.chars.get(self.pos + 1) != Some(&'=') => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(),
        }
    }

    // ------------------------------------------------------------------
    // Primaries and postfix forms
    // ------------------------------------------------------------------

    fn parse_primary(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("unexpected end of expression".to_string()),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_ternary()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('"') => self.parse_string(),
            Some('<') => self.parse_tuple_key(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_identifier(),
            Some(c) => Err(format!("unexpected character '{c}' in expression")),
        }
    }

    fn parse_string(&mut self) -> Result<Expr, String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some(c) => out.push(c),
                None => return Err("unterminated string literal".to_string()),
            }
        }
        Ok(Expr::Str(out))
    }

    fn parse_number(&mut self) -> Result<Expr, String> {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or_default());
        }
        if self.peek() == Some('.')
            && matches!(self.chars.get(self.pos + 1), Some(c) if c.is_ascii_digit())
        {
            text.push(self.bump().unwrap_or_default());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().unwrap_or_default());
            }
        }
        let value: f64 = text
            .parse()
            .map_err(|_| format!("bad numeric literal '{text}'"))?;
        let number = Expr::Number(value);
        // Whitelisted implicit multiplication: literal directly followed by
        // an identifier is a coefficient on a variable.
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            let factor = self.parse_identifier()?;
            return Ok(Expr::binary_mul(number, factor));
        }
        Ok(number)
    }

    fn parse_tuple_key(&mut self) -> Result<Expr, String> {
        self.expect('<')?;
        let mut parts = Vec::new();
        loop {
            parts.push(self.parse_additive()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err("expected ',' or '>' in tuple key".to_string()),
            }
        }
        Ok(Expr::TupleKey(parts))
    }

    fn parse_identifier(&mut self) -> Result<Expr, String> {
        let name = self
            .read_ident()
            .ok_or_else(|| "expected identifier".to_string())?;

        let expr = match name.as_str() {
            "sum" => self.parse_sum()?,
            "item" => self.parse_item()?,
            "if" => self.parse_if()?,
            _ => self.parse_reference(name)?,
        };

        // Two operands with no operator in between is the classic typo;
        // reserved words terminate the operand instead.
        if let Some(next) = self.peek_ident() {
            if !RESERVED.contains(&next.as_str()) {
                return Err(format!(
                    "consecutive identifiers '{expr}' and '{next}' without operator; did you mean {expr} * {next}?"
                ));
            }
        }
        Ok(expr)
    }

    fn parse_sum(&mut self) -> Result<Expr, String> {
        self.expect('(')?;
        let before = self.scope.len();
        let iterators = self.parse_iterators(Some(')'))?;
        self.expect(')')?;
        let body = self.parse_term()?;
        self.scope.truncate(before);
        Ok(Expr::Sum {
            iterators,
            body: Box::new(body),
        })
    }

    fn parse_item(&mut self) -> Result<Expr, String> {
        self.expect('(')?;
        let set = self
            .read_ident()
            .ok_or_else(|| "item() expects a tuple set name".to_string())?;
        self.expect(',')?;
        let key = self.parse_ternary()?;
        self.expect(')')?;
        if self.eat('.') {
            let field = self
                .read_ident()
                .ok_or_else(|| "expected field name after '.'".to_string())?;
            return Ok(Expr::ItemField {
                set,
                key: Box::new(key),
                field,
            });
        }
        Ok(Expr::Item {
            set,
            key: Box::new(key),
        })
    }

    fn parse_if(&mut self) -> Result<Expr, String> {
        self.expect('(')?;
        let cond = self.parse_ternary()?;
        self.expect(')')?;
        // Optional 'then' keyword, mandatory 'else'.
        if self.peek_ident().as_deref() == Some("then") {
            self.read_ident();
        }
        let then_expr = self.parse_ternary()?;
        match self.read_ident().as_deref() {
            Some("else") => {}
            _ => return Err("if-expression requires an else branch".to_string()),
        }
        let else_expr = self.parse_ternary()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// Classify a plain or indexed identifier reference.
    fn parse_reference(&mut self, name: String) -> Result<Expr, String> {
        self.skip_ws();
        if self.peek() == Some('[') {
            self.pos += 1;
            let mut indices = Vec::new();
            loop {
                indices.push(self.parse_additive()?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => {
                        self.pos += 1;
                    }
                    Some(']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(format!("expected ',' or ']' in index of '{name}'")),
                }
            }
            if self.eat('.') {
                let field = self
                    .read_ident()
                    .ok_or_else(|| "expected field name after '.'".to_string())?;
                if indices.len() != 1 {
                    return Err(format!(
                        "positional tuple access '{name}[...]' takes one index"
                    ));
                }
                return Ok(Expr::IndexedTupleField {
                    set: name,
                    index: Box::new(indices.remove(0)),
                    field,
                });
            }
            if self.repo.is_decision_variable(&name) {
                return Ok(Expr::IndexedVar { name, indices });
            }
            if self.repo.is_parameter(&name) {
                return Ok(Expr::IndexedParam { name, indices });
            }
            if self.repo.is_dexpr(&name) {
                return Ok(Expr::DexprRef { name, indices });
            }
            if self.repo.is_tuple_set(&name) {
                return Err(format!(
                    "tuple set '{name}' indexed without a field access"
                ));
            }
            // Unknown: decision-variable placeholder, validated later.
            return Ok(Expr::IndexedVar { name, indices });
        }

        if self.eat('.') {
            let field = self
                .read_ident()
                .ok_or_else(|| "expected field name after '.'".to_string())?;
            return Ok(Expr::TupleField { base: name, field });
        }

        // Resolution order: iterator, parameter, dexpr, variable, placeholder.
        if self.scope.iter().any(|v| v == &name) {
            return Ok(Expr::Iter(name));
        }
        if self.repo.is_parameter(&name) {
            return Ok(Expr::Param(name));
        }
        if self.repo.is_dexpr(&name) {
            return Ok(Expr::DexprRef {
                name,
                indices: vec![],
            });
        }
        Ok(Expr::Var(name))
    }

    // ------------------------------------------------------------------
    // Iterator lists
    // ------------------------------------------------------------------

    /// Parse `v in S [: filter]` items separated by commas, stopping before
    /// `close` (or end of input). Each parsed variable enters scope so later
    /// filters can reference it.
    fn parse_iterators(&mut self, close: Option<char>) -> Result<Vec<IteratorSpec>, String> {
        let mut specs = Vec::new();
        loop {
            let var = self
                .read_ident()
                .ok_or_else(|| "expected iterator variable".to_string())?;
            match self.read_ident().as_deref() {
                Some("in") => {}
                _ => return Err(format!("expected 'in' after iterator '{var}'")),
            }
            let set = self
                .read_ident()
                .ok_or_else(|| format!("expected set name after '{var} in'"))?;
            self.scope.push(var.clone());
            let mut filter = None;
            self.skip_ws();
            if self.peek() == Some(':') {
                self.pos += 1;
                filter = Some(self.parse_ternary()?);
            }
            specs.push(IteratorSpec { var, set, filter });
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(c) if Some(c) == close => break,
                None if close.is_none() => break,
                _ => {
                    return Err(format!(
                        "expected ',' or end of iterator list, found '{}'",
                        self.rest().trim()
                    ))
                }
            }
        }
        Ok(specs)
    }
}
