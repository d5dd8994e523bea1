//! Expression evaluation
//!
//! `$`-scalars hold expression source. Before evaluation the resolver
//! rewrites every embedded `@id` reference to a generated binding name and
//! hands the bindings to an [`Evaluator`]. The built-in evaluator covers
//! literals, arithmetic, comparison, boolean logic, string concatenation,
//! container indexing, and `len(...)`; embedders needing a richer language
//! install their own.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::instantiate::Resolved;
use crate::value::Value;

/// Pluggable expression evaluator
pub trait Evaluator: Send + Sync {
    /// Evaluate `source` with `bindings` holding the resolved values of the
    /// rewritten `@id` references.
    fn eval(&self, source: &str, bindings: &IndexMap<String, Resolved>) -> Result<Resolved>;
}

/// The built-in evaluator
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

impl Evaluator for DefaultEvaluator {
    fn eval(&self, source: &str, bindings: &IndexMap<String, Resolved>) -> Result<Resolved> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expr()?;
        parser.expect_eof()?;
        eval_expr(&expr, bindings)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Name(String),
    True,
    False,
    Null,
    Not,
    And,
    Or,
    Len,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            '&' if bytes.get(i + 1) == Some(&b'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if bytes.get(i + 1) == Some(&b'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '\'' | '"' => {
                let (s, next) = scan_string(source, i, c)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '0'..='9' => {
                let (tok, next) = scan_number(source, i)?;
                tokens.push(tok);
                i = next;
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(match &source[start..i] {
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "null" | "None" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "len" => Token::Len,
                    name => Token::Name(name.to_string()),
                });
            }
            other => {
                return Err(Error::expression(
                    "",
                    format!("Unsupported character '{}' in expression", other),
                ));
            }
        }
    }
    Ok(tokens)
}

fn scan_string(source: &str, start: usize, quote: char) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut chars = source[start + 1..].char_indices();
    while let Some((off, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, esc @ ('\\' | '\'' | '"'))) => out.push(esc),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => {
                    return Err(Error::expression(
                        "",
                        format!("Unknown escape '\\{}' in string literal", other),
                    ))
                }
                None => break,
            }
        } else if c == quote {
            return Ok((out, start + 1 + off + c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    Err(Error::expression("", "Unterminated string literal"))
}

fn scan_number(source: &str, start: usize) -> Result<(Token, usize)> {
    let bytes = source.as_bytes();
    let mut i = start;
    let mut is_float = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())
    {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    let text = &source[start..i];
    let tok = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| Error::expression("", format!("Invalid number '{}'", text)))?,
        )
    } else {
        Token::Integer(
            text.parse()
                .map_err(|_| Error::expression("", format!("Invalid number '{}'", text)))?,
        )
    };
    Ok((tok, i))
}

#[derive(Debug, Clone)]
enum Expr {
    Lit(Value),
    Name(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Len(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token) -> Result<()> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(Error::expression(
                "",
                format!("Expected {:?}, found {:?}", tok, self.peek()),
            ))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(Error::expression(
                "",
                format!("Unexpected {:?} after expression", tok),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Neg(Box::new(self.parse_unary()?)))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::LBracket) {
            let index = self.parse_expr()?;
            self.expect(Token::RBracket)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Integer(i)) => Ok(Expr::Lit(Value::Integer(i))),
            Some(Token::Float(f)) => Ok(Expr::Lit(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Lit(Value::String(s))),
            Some(Token::True) => Ok(Expr::Lit(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Lit(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Lit(Value::Null)),
            Some(Token::Name(name)) => Ok(Expr::Name(name)),
            Some(Token::Len) => {
                self.expect(Token::LParen)?;
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Len(Box::new(inner)))
            }
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(Error::expression(
                "",
                format!("Expected a value, found {:?}", other),
            )),
        }
    }
}

fn eval_expr(expr: &Expr, bindings: &IndexMap<String, Resolved>) -> Result<Resolved> {
    match expr {
        Expr::Lit(v) => Ok(Resolved::Value(v.clone())),
        Expr::Name(name) => bindings.get(name).cloned().ok_or_else(|| {
            Error::expression("", format!("Unknown name '{}' in expression", name))
        }),
        Expr::Neg(inner) => match eval_expr(inner, bindings)? {
            Resolved::Value(Value::Integer(i)) => Ok(Value::Integer(-i).into()),
            Resolved::Value(Value::Float(f)) => Ok(Value::Float(-f).into()),
            other => Err(Error::expression(
                "",
                format!("Cannot negate {}", other.to_display_string()),
            )),
        },
        Expr::Not(inner) => {
            let truthy = eval_expr(inner, bindings)?
                .truthy()
                .map_err(|e| Error::expression("", e.cause.unwrap_or_default()))?;
            Ok(Value::Bool(!truthy).into())
        }
        Expr::Binary(BinOp::And, left, right) => {
            // Short-circuit
            if !truthy(&eval_expr(left, bindings)?)? {
                return Ok(Value::Bool(false).into());
            }
            Ok(Value::Bool(truthy(&eval_expr(right, bindings)?)?).into())
        }
        Expr::Binary(BinOp::Or, left, right) => {
            if truthy(&eval_expr(left, bindings)?)? {
                return Ok(Value::Bool(true).into());
            }
            Ok(Value::Bool(truthy(&eval_expr(right, bindings)?)?).into())
        }
        Expr::Binary(op, left, right) => {
            let l = eval_expr(left, bindings)?;
            let r = eval_expr(right, bindings)?;
            eval_binary(*op, &l, &r)
        }
        Expr::Index(target, index) => {
            let target = eval_expr(target, bindings)?;
            let index = eval_expr(index, bindings)?;
            eval_index(&target, &index)
        }
        Expr::Len(inner) => match eval_expr(inner, bindings)? {
            Resolved::Value(Value::String(s)) => Ok(Value::Integer(s.chars().count() as i64).into()),
            Resolved::Value(Value::Sequence(s)) => Ok(Value::Integer(s.len() as i64).into()),
            Resolved::Value(Value::Mapping(m)) => Ok(Value::Integer(m.len() as i64).into()),
            Resolved::Sequence(s) => Ok(Value::Integer(s.len() as i64).into()),
            Resolved::Mapping(m) => Ok(Value::Integer(m.len() as i64).into()),
            other => Err(Error::expression(
                "",
                format!("len() is undefined for a {}", type_of(&other)),
            )),
        },
    }
}

fn truthy(r: &Resolved) -> Result<bool> {
    r.truthy()
        .map_err(|e| Error::expression("", e.cause.unwrap_or_default()))
}

fn type_of(r: &Resolved) -> &'static str {
    match r {
        Resolved::Value(v) => v.type_name(),
        Resolved::Sequence(_) => "sequence",
        Resolved::Mapping(_) => "mapping",
        Resolved::Instance(_) => "instance",
        Resolved::Callable(_) => "callable",
    }
}

fn eval_binary(op: BinOp, l: &Resolved, r: &Resolved) -> Result<Resolved> {
    use Value::*;

    if matches!(op, BinOp::Eq | BinOp::Ne) {
        let equal = match (l.as_value(), r.as_value()) {
            (Some(Integer(a)), Some(Float(b))) | (Some(Float(b)), Some(Integer(a))) => {
                *a as f64 == *b
            }
            _ => l == r,
        };
        return Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }).into());
    }

    let (lv, rv) = match (l.as_value(), r.as_value()) {
        (Some(lv), Some(rv)) => (lv, rv),
        _ => {
            return Err(Error::expression(
                "",
                format!("Operator undefined for {} and {}", type_of(l), type_of(r)),
            ))
        }
    };

    match (op, lv, rv) {
        (BinOp::Add, String(a), String(b)) => Ok(Value::String(format!("{}{}", a, b)).into()),
        (BinOp::Add, Sequence(a), Sequence(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::Sequence(out).into())
        }
        (BinOp::Add, Integer(a), Integer(b)) => checked_int(a.checked_add(*b)),
        (BinOp::Sub, Integer(a), Integer(b)) => checked_int(a.checked_sub(*b)),
        (BinOp::Mul, Integer(a), Integer(b)) => checked_int(a.checked_mul(*b)),
        (BinOp::Rem, Integer(a), Integer(b)) => {
            if *b == 0 {
                Err(Error::expression("", "Modulo by zero"))
            } else {
                Ok(Value::Integer(a.rem_euclid(*b)).into())
            }
        }
        (BinOp::Div, _, _) if num(rv) == Some(0.0) => Err(Error::expression("", "Division by zero")),
        (op, lv, rv) => {
            let (a, b) = match (num(lv), num(rv)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    if matches!(op, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge) {
                        if let (String(a), String(b)) = (lv, rv) {
                            return Ok(Value::Bool(compare(op, a.cmp(b))).into());
                        }
                    }
                    return Err(Error::expression(
                        "",
                        format!(
                            "Operator undefined for {} and {}",
                            lv.type_name(),
                            rv.type_name()
                        ),
                    ));
                }
            };
            match op {
                BinOp::Add => Ok(Value::Float(a + b).into()),
                BinOp::Sub => Ok(Value::Float(a - b).into()),
                BinOp::Mul => Ok(Value::Float(a * b).into()),
                BinOp::Div => Ok(Value::Float(a / b).into()),
                BinOp::Rem => Ok(Value::Float(a.rem_euclid(b)).into()),
                BinOp::Lt => Ok(Value::Bool(a < b).into()),
                BinOp::Le => Ok(Value::Bool(a <= b).into()),
                BinOp::Gt => Ok(Value::Bool(a > b).into()),
                BinOp::Ge => Ok(Value::Bool(a >= b).into()),
                BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => unreachable!(),
            }
        }
    }
}

fn checked_int(result: Option<i64>) -> Result<Resolved> {
    result
        .map(|i| Value::Integer(i).into())
        .ok_or_else(|| Error::expression("", "Integer overflow"))
}

fn num(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn compare(op: BinOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinOp::Lt => ordering == Less,
        BinOp::Le => ordering != Greater,
        BinOp::Gt => ordering == Greater,
        BinOp::Ge => ordering != Less,
        _ => false,
    }
}

fn eval_index(target: &Resolved, index: &Resolved) -> Result<Resolved> {
    match target {
        Resolved::Value(Value::Sequence(seq)) => {
            let i = seq_index(index, seq.len())?;
            Ok(Resolved::Value(seq[i].clone()))
        }
        Resolved::Sequence(seq) => {
            let i = seq_index(index, seq.len())?;
            Ok(seq[i].clone())
        }
        Resolved::Value(Value::Mapping(map)) => {
            let key = map_key(index)?;
            map.get(&key)
                .cloned()
                .map(Resolved::Value)
                .ok_or_else(|| Error::expression("", format!("Key '{}' not in mapping", key)))
        }
        Resolved::Mapping(map) => {
            let key = map_key(index)?;
            map.get(&key)
                .cloned()
                .ok_or_else(|| Error::expression("", format!("Key '{}' not in mapping", key)))
        }
        other => Err(Error::expression(
            "",
            format!("Cannot index a {}", type_of(other)),
        )),
    }
}

fn seq_index(index: &Resolved, len: usize) -> Result<usize> {
    let raw = index
        .as_value()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::expression("", "Sequence index must be an integer"))?;
    let i = if raw < 0 { raw + len as i64 } else { raw };
    if i < 0 || i as usize >= len {
        return Err(Error::expression(
            "",
            format!("Index {} out of range for length {}", raw, len),
        ));
    }
    Ok(i as usize)
}

fn map_key(index: &Resolved) -> Result<String> {
    match index.as_value() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Integer(i)) => Ok(i.to_string()),
        _ => Err(Error::expression("", "Mapping key must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> Resolved {
        DefaultEvaluator.eval(source, &IndexMap::new()).unwrap()
    }

    fn eval_with(source: &str, bindings: &[(&str, Resolved)]) -> Resolved {
        let map: IndexMap<String, Resolved> = bindings
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        DefaultEvaluator.eval(source, &map).unwrap()
    }

    fn int(i: i64) -> Resolved {
        Resolved::Value(Value::Integer(i))
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), int(7));
        assert_eq!(eval("(1 + 2) * 3"), int(9));
        assert_eq!(eval("10 % 3"), int(1));
        assert_eq!(eval("-2 * 3"), int(-6));
    }

    #[test]
    fn test_division_yields_float() {
        assert_eq!(eval("7 / 2"), Resolved::Value(Value::Float(3.5)));
    }

    #[test]
    fn test_division_by_zero() {
        let err = DefaultEvaluator.eval("1 / 0", &IndexMap::new()).unwrap_err();
        assert!(err.to_string().contains("Division by zero"));
    }

    #[test]
    fn test_float_arithmetic() {
        assert_eq!(eval("0.5 + 1"), Resolved::Value(Value::Float(1.5)));
        assert_eq!(eval("2 * 1.5"), Resolved::Value(Value::Float(3.0)));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            eval("'ab' + \"cd\""),
            Resolved::Value(Value::String("abcd".into()))
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 < 2"), Resolved::Value(Value::Bool(true)));
        assert_eq!(eval("2 <= 2"), Resolved::Value(Value::Bool(true)));
        assert_eq!(eval("1 == 1.0"), Resolved::Value(Value::Bool(true)));
        assert_eq!(eval("1 != 2"), Resolved::Value(Value::Bool(true)));
        assert_eq!(eval("'a' < 'b'"), Resolved::Value(Value::Bool(true)));
    }

    #[test]
    fn test_boolean_logic() {
        assert_eq!(eval("true && false"), Resolved::Value(Value::Bool(false)));
        assert_eq!(eval("true or false"), Resolved::Value(Value::Bool(true)));
        assert_eq!(eval("not true"), Resolved::Value(Value::Bool(false)));
        assert_eq!(eval("!false"), Resolved::Value(Value::Bool(true)));
    }

    #[test]
    fn test_short_circuit() {
        // The right side would fail on evaluation; it must not run
        let bindings = [("x", int(0))];
        assert_eq!(
            eval_with("false && x['k']", &bindings),
            Resolved::Value(Value::Bool(false))
        );
    }

    #[test]
    fn test_bindings() {
        assert_eq!(eval_with("__ref0 * 2 + 1", &[("__ref0", int(3))]), int(7));
    }

    #[test]
    fn test_unknown_name() {
        let err = DefaultEvaluator
            .eval("mystery + 1", &IndexMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_single_binding_preserves_native_value() {
        let seq = Resolved::Value(Value::Sequence(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(eval_with("__ref0", &[("__ref0", seq.clone())]), seq);
    }

    #[test]
    fn test_indexing() {
        let seq = Resolved::Value(Value::Sequence(vec![
            Value::Integer(10),
            Value::Integer(20),
        ]));
        assert_eq!(eval_with("xs[1]", &[("xs", seq.clone())]), int(20));
        assert_eq!(eval_with("xs[-1]", &[("xs", seq)]), int(20));

        let mut m = IndexMap::new();
        m.insert("k".to_string(), Value::Integer(5));
        let map = Resolved::Value(Value::Mapping(m));
        assert_eq!(eval_with("m['k']", &[("m", map)]), int(5));
    }

    #[test]
    fn test_index_out_of_range() {
        let seq = Resolved::Value(Value::Sequence(vec![Value::Integer(1)]));
        let map: IndexMap<String, Resolved> = [("xs".to_string(), seq)].into_iter().collect();
        assert!(DefaultEvaluator.eval("xs[3]", &map).is_err());
    }

    #[test]
    fn test_len() {
        let seq = Resolved::Value(Value::Sequence(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(eval_with("len(xs)", &[("xs", seq)]), int(2));
        assert_eq!(
            eval_with("len(s)", &[("s", Resolved::Value(Value::String("abc".into())))]),
            int(3)
        );
    }

    #[test]
    fn test_method_call_is_unsupported() {
        let err = DefaultEvaluator
            .eval("x.norm()", &IndexMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported character '.'"));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(DefaultEvaluator.eval("1 2", &IndexMap::new()).is_err());
    }

    #[test]
    fn test_empty_expression() {
        assert!(DefaultEvaluator.eval("", &IndexMap::new()).is_err());
    }

    #[test]
    fn test_sequence_concat() {
        let a = Resolved::Value(Value::Sequence(vec![Value::Integer(1)]));
        let b = Resolved::Value(Value::Sequence(vec![Value::Integer(2)]));
        assert_eq!(
            eval_with("a + b", &[("a", a), ("b", b)]),
            Resolved::Value(Value::Sequence(vec![Value::Integer(1), Value::Integer(2)]))
        );
    }
}
