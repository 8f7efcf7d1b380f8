use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::asm::lexer::{Token, TokenKind};

/// Resolves symbol names while an expression is evaluated.
pub trait EvalContext {
    fn lookup(&self, name: &str) -> Option<i64>;
}

impl EvalContext for HashMap<String, i64> {
    fn lookup(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// A parsed operand, evaluated once symbols are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Bytes(Vec<u8>),
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Undefined name {0}")]
    Undefined(String),
    #[error("Division by zero")]
    DivideByZero,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Negative shift count")]
    NegativeShift,
    #[error("Negative exponent")]
    NegativeExponent,
    #[error("String used where a number is expected")]
    NotANumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    fn at(position: usize, message: impl Into<String>) -> Self {
        ParseError {
            position,
            message: message.into(),
        }
    }
}

impl Expr {
    /// Parses a whole operand. Every token must be consumed.
    pub fn parse(tokens: &[Token]) -> Result<Expr, ParseError> {
        let mut parser = Parser { tokens, at: 0 };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(ParseError::at(
                token.start,
                format!("Unexpected '{}' in expression", token.text),
            )),
        }
    }

    pub fn eval(&self, ctx: &dyn EvalContext) -> Result<Value, EvalError> {
        match self {
            Expr::Bytes(bytes) => Ok(Value::Bytes(bytes.clone())),
            _ => self.eval_int(ctx).map(Value::Int),
        }
    }

    pub fn eval_int(&self, ctx: &dyn EvalContext) -> Result<i64, EvalError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Bytes(_) => Err(EvalError::NotANumber),
            Expr::Symbol(name) => ctx
                .lookup(name)
                .ok_or_else(|| EvalError::Undefined(name.clone())),
            Expr::Unary(op, operand) => {
                let a = operand.eval_int(ctx)?;
                match op {
                    UnaryOp::Neg => a.checked_neg().ok_or(EvalError::Overflow),
                    UnaryOp::Plus => Ok(a),
                    UnaryOp::Not => Ok(!a),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval_int(ctx)?;
                let b = rhs.eval_int(ctx)?;
                apply(*op, a, b)
            }
        }
    }
}

fn apply(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    use BinaryOp::*;
    match op {
        Or => Ok(a | b),
        Xor => Ok(a ^ b),
        And => Ok(a & b),
        Shl => {
            if b < 0 {
                return Err(EvalError::NegativeShift);
            }
            if a == 0 {
                return Ok(0);
            }
            if b >= 63 {
                return Err(EvalError::Overflow);
            }
            let shifted = a << b;
            if shifted >> b != a {
                return Err(EvalError::Overflow);
            }
            Ok(shifted)
        }
        Shr => {
            if b < 0 {
                return Err(EvalError::NegativeShift);
            }
            Ok(a >> b.min(63))
        }
        Add => a.checked_add(b).ok_or(EvalError::Overflow),
        Sub => a.checked_sub(b).ok_or(EvalError::Overflow),
        Mul => a.checked_mul(b).ok_or(EvalError::Overflow),
        Div => {
            if b == 0 {
                return Err(EvalError::DivideByZero);
            }
            a.checked_div(b).ok_or(EvalError::Overflow)
        }
        Rem => {
            if b == 0 {
                return Err(EvalError::DivideByZero);
            }
            // The result takes the sign of the divisor.
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            if r != 0 && (r < 0) != (b < 0) {
                Ok(r + b)
            } else {
                Ok(r)
            }
        }
        Pow => {
            if b < 0 {
                return Err(EvalError::NegativeExponent);
            }
            if b > u32::MAX as i64 {
                return match a {
                    0 | 1 => Ok(a),
                    _ => Err(EvalError::Overflow),
                };
            }
            a.checked_pow(b as u32).ok_or(EvalError::Overflow)
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    at: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.at)
    }

    fn next_operator(&mut self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let token = self.peek()?;
        if token.kind != TokenKind::Operator {
            return None;
        }
        let op = ops
            .iter()
            .find(|(text, _)| token.text == *text)
            .map(|&(_, op)| op)?;
        self.at += 1;
        Some(op)
    }

    fn binary<F>(&mut self, ops: &[(&str, BinaryOp)], operand: F) -> Result<Expr, ParseError>
    where
        F: Fn(&mut Self) -> Result<Expr, ParseError>,
    {
        let mut lhs = operand(self)?;
        while let Some(op) = self.next_operator(ops) {
            let rhs = operand(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[("|", BinaryOp::Or)], Self::xor)
    }

    fn xor(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[("^", BinaryOp::Xor)], Self::and)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[("&", BinaryOp::And)], Self::shift)
    }

    fn shift(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[("<", BinaryOp::Shl), (">", BinaryOp::Shr)], Self::sum)
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::term)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(token) if token.kind == TokenKind::Operator => match token.text.as_str() {
                "-" => Some(UnaryOp::Neg),
                "+" => Some(UnaryOp::Plus),
                "~" => Some(UnaryOp::Not),
                _ => None,
            },
            _ => None,
        };
        match op {
            Some(op) => {
                self.at += 1;
                Ok(Expr::Unary(op, Box::new(self.unary()?)))
            }
            None => self.power(),
        }
    }

    // `!` binds tighter than a unary sign on its left but accepts one on
    // its right, so -2!2 is -(2!2) and 2!-1 parses.
    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if self.next_operator(&[("!", BinaryOp::Pow)]).is_some() {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let token = match self.peek() {
            Some(token) => token,
            None => {
                let end = self.tokens.last().map_or(0, |t| t.start + t.text.len());
                return Err(ParseError::at(end, "Expression ends too soon"));
            }
        };
        self.at += 1;

        match token.kind {
            TokenKind::Decimal => number(token, &token.text, 10),
            TokenKind::Hex => number(token, &token.text[1..], 16),
            TokenKind::Octal => number(token, &token.text[1..], 8),
            TokenKind::Binary => number(token, &token.text[1..].replace('.', "0"), 2),
            TokenKind::Str => Ok(Expr::Bytes(token.text.to_uppercase().into_bytes())),
            TokenKind::Word => Ok(Expr::Symbol(token.text.clone())),
            TokenKind::Operator if token.text == "(" => {
                let inner = self.or()?;
                match self.peek() {
                    Some(close) if close.kind == TokenKind::Operator && close.text == ")" => {
                        self.at += 1;
                        Ok(inner)
                    }
                    Some(other) => Err(ParseError::at(other.start, "Expected ')'")),
                    None => Err(ParseError::at(token.start, "Unbalanced '('")),
                }
            }
            _ => Err(ParseError::at(
                token.start,
                format!("Unexpected '{}' in expression", token.text),
            )),
        }
    }
}

fn number(token: &Token, digits: &str, radix: u32) -> Result<Expr, ParseError> {
    i64::from_str_radix(digits, radix)
        .map(Expr::Number)
        .map_err(|_| ParseError::at(token.start, format!("Invalid number '{}'", token.text)))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Bytes(bytes) => write!(f, "'{}'", String::from_utf8_lossy(bytes)),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Unary(op, operand) => {
                let op = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "~",
                };
                write!(f, "{}{}", op, operand)
            }
            Expr::Binary(op, lhs, rhs) => {
                use BinaryOp::*;
                let op = match op {
                    Or => "|",
                    Xor => "^",
                    And => "&",
                    Shl => "<",
                    Shr => ">",
                    Add => "+",
                    Sub => "-",
                    Mul => "*",
                    Div => "/",
                    Rem => "%",
                    Pow => "!",
                };
                write!(f, "({}{}{})", lhs, op, rhs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::lexer::tokenize;

    fn parse(text: &str) -> Expr {
        Expr::parse(&tokenize(text).unwrap()).unwrap()
    }

    fn eval(text: &str) -> Result<i64, EvalError> {
        let symbols: HashMap<String, i64> =
            vec![("START".to_string(), 0x200), ("TEN".to_string(), 10)]
                .into_iter()
                .collect();
        parse(text).eval_int(&symbols)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("010"), Ok(10));
        assert_eq!(eval("#fF"), Ok(255));
        assert_eq!(eval("@17"), Ok(15));
        assert_eq!(eval("$1..1"), Ok(9));
        let empty: HashMap<String, i64> = HashMap::new();
        assert_eq!(parse("'ab'").eval(&empty), Ok(Value::Bytes(b"AB".to_vec())));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1+2*3"), Ok(7));
        assert_eq!(eval("(1+2)*3"), Ok(9));
        assert_eq!(eval("1<4|1"), Ok(17));
        assert_eq!(eval("#F0&#3C^#FF"), Ok(0xCF));
        assert_eq!(eval("2!3!2"), Ok(512));
        assert_eq!(eval("-2!2"), Ok(-4));
        assert_eq!(eval("~0"), Ok(-1));
        assert_eq!(eval("start+ten*2"), Ok(0x214));
    }

    #[test]
    fn test_division() {
        assert_eq!(eval("7/2"), Ok(3));
        assert_eq!(eval("-7/2"), Ok(-3));
        assert_eq!(eval("7%3"), Ok(1));
        assert_eq!(eval("-7%3"), Ok(2));
        assert_eq!(eval("7%-3"), Ok(-2));
        assert_eq!(eval("1/0"), Err(EvalError::DivideByZero));
        assert_eq!(eval("1%0"), Err(EvalError::DivideByZero));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("later+1"), Err(EvalError::Undefined("LATER".to_string())));
        assert_eq!(eval("1<-1"), Err(EvalError::NegativeShift));
        assert_eq!(eval("2!-1"), Err(EvalError::NegativeExponent));
        assert_eq!(eval("2!64"), Err(EvalError::Overflow));
        assert_eq!(eval("#40000000 * #40000000 * 8"), Err(EvalError::Overflow));
        let empty: HashMap<String, i64> = HashMap::new();
        assert_eq!(parse("'a'+1").eval_int(&empty), Err(EvalError::NotANumber));
    }

    #[test]
    fn test_parse_errors() {
        let tokens = tokenize("1 + ").unwrap();
        assert_eq!(Expr::parse(&tokens).unwrap_err().position, 3);
        let tokens = tokenize("(1 + 2").unwrap();
        assert!(Expr::parse(&tokens).is_err());
        let tokens = tokenize("1 2").unwrap();
        assert_eq!(Expr::parse(&tokens).unwrap_err().position, 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(parse("a+b*2").to_string(), "(A+(B*2))");
    }
}
