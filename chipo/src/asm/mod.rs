mod assembler;
mod expr;
mod lexer;
mod statement;

use std::fmt;

use thiserror::Error;

pub use assembler::{assemble, SymbolTable};
pub use expr::{BinaryOp, EvalContext, EvalError, Expr, ParseError, UnaryOp, Value};
pub use lexer::{tokenize, LexError, Token, TokenKind};
pub use statement::{Form, NextPc, Operand, Statement, REG_DT, REG_I, REG_ST};

/// Where and why one source line failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: usize,
    /// Column of the offending text, 0 when unknown.
    pub position: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position > 0 {
            write!(f, "line {}:{}: {}", self.line, self.position, self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{syntax_errors} syntax errors, {expression_errors} expression errors")]
pub struct AssemblyError {
    pub syntax_errors: usize,
    pub expression_errors: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Recognizes every line of `source`, one statement per line.
pub fn parse(source: &str) -> Vec<Statement> {
    source.lines().map(Statement::phase_one).collect()
}

/// Renders assembled statements as `address  bytes  source` lines.
pub fn listing(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|statement| {
            let address = match statement.pc {
                Some(pc) if statement.form.is_some() => format!("{:04X}", pc),
                _ => "    ".to_string(),
            };
            let bytes = statement
                .value
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}  {:<12}{}", address, bytes, statement.text)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
