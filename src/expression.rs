//! Formulas over quantity names, e.g. `"timer_particles/n_particles"`.

//! A formula is compiled once into an `Operation`: an expression tree
//! whose leaves refer to the quantities it uses, plus the same formula
//! with every quantity replaced by its unit (for axis labels). The
//! tree is evaluated element-wise against the per-process arrays of
//! one record.

//! Quantity names are matched as whole words, longest names first,
//! so that `n` never matches inside `n_total`. Everything else in a
//! formula must be a number, one of `+ - * / **`, parentheses, or one
//! of the unary functions `sqrt`, `log10`, `log`, `exp` and `abs`;
//! any other name is rejected at compile time.

use std::collections::BTreeMap;

use itertools::Itertools;
use kstring::KString;
use ndarray::{Array1, ArrayView1, Zip};
use regex::Regex;

use crate::quantity::{QuantityCatalog, UnitClass, UnknownUnitClass};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("unknown quantity {name:?} in formula {formula:?}")]
    UnknownQuantity { name: String, formula: String },
    #[error(transparent)]
    UnknownUnitClass(#[from] UnknownUnitClass),
    #[error("syntax error in formula {formula:?} at byte {position}: {message}")]
    Syntax {
        formula: String,
        position: usize,
        message: String,
    },
    #[error("empty formula")]
    Empty,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("quantity {0:?} is missing")]
    MissingQuantity(KString),
    #[error("cannot combine arrays of {left} and {right} values")]
    ShapeMismatch { left: usize, right: usize },
}

/// Access to the per-process arrays of the quantities of one record.
pub trait QuantityLookup {
    fn quantity(&self, name: &str) -> Option<ArrayView1<'_, f64>>;
}

impl QuantityLookup for BTreeMap<KString, Array1<f64>> {
    fn quantity(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.get(name).map(|values| values.view())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn function(self) -> fn(f64, f64) -> f64 {
        match self {
            BinOp::Add => |x, y| x + y,
            BinOp::Sub => |x, y| x - y,
            BinOp::Mul => |x, y| x * y,
            BinOp::Div => |x, y| x / y,
            BinOp::Pow => f64::powf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Log10,
    Ln,
    Exp,
    Abs,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Function::Sqrt),
            "log10" => Some(Function::Log10),
            "log" => Some(Function::Ln),
            "exp" => Some(Function::Exp),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    fn function(self) -> fn(f64) -> f64 {
        match self {
            Function::Sqrt => f64::sqrt,
            Function::Log10 => f64::log10,
            Function::Ln => f64::ln,
            Function::Exp => f64::exp,
            Function::Abs => f64::abs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    /// Index into `Operation::quantities()`
    Quantity(usize),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

enum Value {
    Scalar(f64),
    Array(Array1<f64>),
}

impl Value {
    fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(x)),
            Value::Array(xs) => Value::Array(xs.mapv_into(f)),
        }
    }

    fn combine(self, op: BinOp, other: Value) -> Result<Value, EvalError> {
        let f = op.function();
        Ok(match (self, other) {
            (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(f(x, y)),
            (Value::Array(xs), Value::Scalar(y)) => Value::Array(xs.mapv_into(|x| f(x, y))),
            (Value::Scalar(x), Value::Array(ys)) => Value::Array(ys.mapv_into(|y| f(x, y))),
            (Value::Array(xs), Value::Array(ys)) => {
                if xs.len() != ys.len() {
                    return Err(EvalError::ShapeMismatch {
                        left: xs.len(),
                        right: ys.len(),
                    });
                }
                Value::Array(Zip::from(&xs).and(&ys).map_collect(|&x, &y| f(x, y)))
            }
        })
    }
}

impl Expr {
    fn eval(&self, slots: &[ArrayView1<'_, f64>]) -> Result<Value, EvalError> {
        Ok(match self {
            Expr::Literal(x) => Value::Scalar(*x),
            Expr::Quantity(i) => Value::Array(slots[*i].to_owned()),
            Expr::Neg(e) => e.eval(slots)?.map(|x| -x),
            Expr::Binary(op, a, b) => a.eval(slots)?.combine(*op, b.eval(slots)?)?,
            Expr::Call(function, e) => e.eval(slots)?.map(function.function()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'f> {
    Number(f64),
    Quantity(usize),
    Ident(&'f str),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy)]
struct Lexeme<'f> {
    token: Token<'f>,
    start: usize,
}

/// A match of a quantity name in the formula.
struct QuantitySpan<'c> {
    start: usize,
    end: usize,
    name: &'c KString,
}

fn find_quantities<'c>(formula: &str, catalog: &'c QuantityCatalog) -> Vec<QuantitySpan<'c>> {
    let names = catalog.longest_first();
    if names.is_empty() {
        return Vec::new();
    }
    // The regex engine prefers earlier alternatives at the same
    // position, thus the longest name wins.
    let alternation = names.iter().map(|name| regex::escape(name)).join("|");
    let re = Regex::new(&format!(r"\b(?:{alternation})\b"))
        .expect("escaped quantity names always form a valid regex");
    re.find_iter(formula)
        .map(|m| {
            let name = names
                .iter()
                .copied()
                .find(|name| name.as_str() == m.as_str())
                .expect("matched text is one of the alternatives");
            QuantitySpan {
                start: m.start(),
                end: m.end(),
                name,
            }
        })
        .collect()
}

fn syntax_error(formula: &str, position: usize, message: impl Into<String>) -> CompileError {
    CompileError::Syntax {
        formula: formula.into(),
        position,
        message: message.into(),
    }
}

fn lex<'f>(
    formula: &'f str,
    spans: &[QuantitySpan<'_>],
    used: &[KString],
) -> Result<Vec<Lexeme<'f>>, CompileError> {
    let bytes = formula.as_bytes();
    let mut spans = spans.iter().peekable();
    let mut lexemes = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        if let Some(span) = spans.next_if(|span| span.start == pos) {
            let slot = used
                .iter()
                .position(|name| name == span.name)
                .expect("all matched names are in `used`");
            lexemes.push(Lexeme {
                token: Token::Quantity(slot),
                start,
            });
            pos = span.end;
            continue;
        }

        let token = match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'*' => {
                if bytes.get(pos + 1) == Some(&b'*') {
                    pos += 1;
                    Token::StarStar
                } else {
                    Token::Star
                }
            }
            b'0'..=b'9' | b'.' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                    pos += 1;
                }
                // Exponent, only if digits follow
                if matches!(bytes.get(pos), Some(b'e' | b'E')) {
                    let mut p = pos + 1;
                    if matches!(bytes.get(p), Some(b'+' | b'-')) {
                        p += 1;
                    }
                    if bytes.get(p).map_or(false, |b| b.is_ascii_digit()) {
                        pos = p;
                        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                            pos += 1;
                        }
                    }
                }
                let text = &formula[start..pos];
                let x: f64 = text
                    .parse()
                    .map_err(|e| syntax_error(formula, start, format!("number {text:?}: {e}")))?;
                lexemes.push(Lexeme {
                    token: Token::Number(x),
                    start,
                });
                continue;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let next_span = spans.peek().map_or(bytes.len(), |span| span.start);
                while pos < next_span && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                lexemes.push(Lexeme {
                    token: Token::Ident(&formula[start..pos]),
                    start,
                });
                continue;
            }
            _ => {
                let c = formula[pos..].chars().next().expect("pos < len");
                return Err(syntax_error(
                    formula,
                    pos,
                    format!("unexpected character {c:?}"),
                ));
            }
        };
        pos += 1;
        lexemes.push(Lexeme { token, start });
    }
    Ok(lexemes)
}

/// Recursive descent, with Python's precedence rules:
///
/// ```text
/// expr  := term (('+' | '-') term)*
/// term  := unary (('*' | '/') unary)*
/// unary := ('-' | '+') unary | power
/// power := atom ('**' unary)?
/// atom  := number | quantity | function '(' expr ')' | '(' expr ')'
/// ```
struct Parser<'f, 'l> {
    formula: &'f str,
    lexemes: &'l [Lexeme<'f>],
    pos: usize,
}

impl<'f, 'l> Parser<'f, 'l> {
    fn peek(&self) -> Option<Token<'f>> {
        self.lexemes.get(self.pos).map(|l| l.token)
    }

    fn position(&self) -> usize {
        self.lexemes
            .get(self.pos)
            .map_or(self.formula.len(), |l| l.start)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        syntax_error(self.formula, self.position(), message)
    }

    fn expect(&mut self, token: Token<'f>, what: &str) -> Result<(), CompileError> {
        if self.peek() == Some(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn parse(mut self) -> Result<Expr, CompileError> {
        let expr = self.expr()?;
        if self.pos < self.lexemes.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::Binary(op, lhs.into(), self.term()?.into());
        }
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::Binary(op, lhs.into(), self.unary()?.into());
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(self.unary()?.into()))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, CompileError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::StarStar) {
            self.pos += 1;
            let exponent = self.unary()?;
            Ok(Expr::Binary(BinOp::Pow, base.into(), exponent.into()))
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> Result<Expr, CompileError> {
        let token = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of formula"))?;
        self.pos += 1;
        match token {
            Token::Number(x) => Ok(Expr::Literal(x)),
            Token::Quantity(slot) => Ok(Expr::Quantity(slot)),
            Token::Ident(name) => {
                let function = Function::from_name(name)
                    .filter(|_| self.peek() == Some(Token::LParen))
                    .ok_or_else(|| CompileError::UnknownQuantity {
                        name: name.into(),
                        formula: self.formula.into(),
                    })?;
                self.expect(Token::LParen, "'('")?;
                let argument = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::Call(function, argument.into()))
            }
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected a number, quantity, function or '('"))
            }
        }
    }
}

/// A compiled formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    formula: String,
    expr: Expr,
    quantities: Vec<KString>,
    unit_expr: String,
}

impl Operation {
    pub fn compile(formula: &str, catalog: &QuantityCatalog) -> Result<Self, CompileError> {
        if formula.trim().is_empty() {
            return Err(CompileError::Empty);
        }

        let spans = find_quantities(formula, catalog);
        let quantities: Vec<KString> = catalog
            .longest_first()
            .into_iter()
            .filter(|name| spans.iter().any(|span| span.name == *name))
            .cloned()
            .collect();
        let units = quantities
            .iter()
            .map(|name| UnitClass::of_name(name))
            .collect::<Result<Vec<_>, _>>()?;

        let lexemes = lex(formula, &spans, &quantities)?;
        let expr = Parser {
            formula,
            lexemes: &lexemes,
            pos: 0,
        }
        .parse()?;

        let mut unit_expr = String::with_capacity(formula.len());
        let mut last = 0;
        for span in &spans {
            unit_expr.push_str(&formula[last..span.start]);
            let slot = quantities
                .iter()
                .position(|name| name == span.name)
                .expect("all matched names are in `quantities`");
            unit_expr.push_str(units[slot].unit_str());
            last = span.end;
        }
        unit_expr.push_str(&formula[last..]);

        Ok(Self {
            formula: formula.into(),
            expr,
            quantities,
            unit_expr,
        })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The quantities used in the formula, longest name first.
    pub fn quantities(&self) -> &[KString] {
        &self.quantities
    }

    /// The formula with each quantity replaced by its unit, e.g.
    /// `"seconds/1"`.
    pub fn unit_expr(&self) -> &str {
        &self.unit_expr
    }

    /// Evaluate element-wise over the quantities from `lookup`. A
    /// formula that does not involve any quantity gives `len` copies
    /// of its value.
    pub fn evaluate(
        &self,
        lookup: &impl QuantityLookup,
        len: usize,
    ) -> Result<Array1<f64>, EvalError> {
        let slots = self
            .quantities
            .iter()
            .map(|name| {
                lookup
                    .quantity(name)
                    .ok_or_else(|| EvalError::MissingQuantity(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match self.expr.eval(&slots)? {
            Value::Scalar(x) => Array1::from_elem(len, x),
            Value::Array(xs) => xs,
        })
    }
}
