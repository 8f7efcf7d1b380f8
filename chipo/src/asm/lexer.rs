use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `name:` at the start of a line. The token text is the bare name.
    Label,
    Directive,
    Opcode,
    VReg,
    IReg,
    KReg,
    DtReg,
    StReg,
    Comma,
    Decimal,
    Hex,
    Octal,
    Binary,
    /// Text between the quotes, with `''` already collapsed to `'`.
    Str,
    Operator,
    Word,
}

impl TokenKind {
    /// Whether the token can appear inside an operand expression.
    pub fn is_expression(self) -> bool {
        use TokenKind::*;
        matches!(self, Decimal | Hex | Octal | Binary | Str | Operator | Word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str, start: usize) -> Self {
        let text = match kind {
            TokenKind::Str => text.to_string(),
            _ => text.to_uppercase(),
        };
        Token { kind, text, start }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized text '{text}' at column {position}")]
pub struct LexError {
    pub position: usize,
    pub text: String,
}

lazy_static! {
    static ref TOKEN: Regex = Regex::new(concat!(
        r"(?i)",
        r"(?P<label>^\s*[A-Z_][A-Z0-9_]*\s*:)",
        r"|(?P<white>\s+)",
        r"|(?P<directive>(?:DA|DB|DW|DS|EQU|ORG)\b|=)",
        r"|(?P<opcode>(?:ADD|AND|CALL|CLS|DRAW|EXIT|HIGH|JP|LDC|LDH|LDM|LD|LOW|OR|RET|RND",
        r"|SCD|SCL|SCR|SE|SHL|SHR|SKP|SKNP|SNE|STD|STM|SUBN|SUB|XOR)\b)",
        r"|(?P<vreg>V[0-9A-F]\b)",
        r"|(?P<ireg>I\b)",
        r"|(?P<kreg>K\b)",
        r"|(?P<dtreg>DT\b)",
        r"|(?P<streg>ST\b)",
        r"|(?P<comma>,)",
        r"|(?P<decimal>[0-9]+\b)",
        r"|(?P<hex>#[0-9A-F]+\b)",
        r"|(?P<octal>@[0-7]+\b)",
        r"|(?P<binary>\$[01.]+)",
        r"|(?P<string>'[^']*')",
        r"|(?P<operator>[()+\-~!<>*/&|^%])",
        r"|(?P<word>[A-Z_][A-Z0-9_]*)",
        r"|(?P<comment>;.*$)",
        r"|(?P<garbage>.+$)",
    ))
    .unwrap();
}

const GROUPS: [(&str, Option<TokenKind>); 19] = [
    ("label", Some(TokenKind::Label)),
    ("white", None),
    ("directive", Some(TokenKind::Directive)),
    ("opcode", Some(TokenKind::Opcode)),
    ("vreg", Some(TokenKind::VReg)),
    ("ireg", Some(TokenKind::IReg)),
    ("kreg", Some(TokenKind::KReg)),
    ("dtreg", Some(TokenKind::DtReg)),
    ("streg", Some(TokenKind::StReg)),
    ("comma", Some(TokenKind::Comma)),
    ("decimal", Some(TokenKind::Decimal)),
    ("hex", Some(TokenKind::Hex)),
    ("octal", Some(TokenKind::Octal)),
    ("binary", Some(TokenKind::Binary)),
    ("string", Some(TokenKind::Str)),
    ("operator", Some(TokenKind::Operator)),
    ("word", Some(TokenKind::Word)),
    ("comment", None),
    ("garbage", None),
];

fn matched_group<'t>(caps: &Captures<'t>) -> Option<(&'static str, Option<TokenKind>, regex::Match<'t>)> {
    GROUPS
        .iter()
        .find_map(|&(name, kind)| caps.name(name).map(|m| (name, kind, m)))
}

/// Splits one source line into tokens. Whitespace and comments are dropped.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens: Vec<Token> = vec![];
    let mut string_end = None;

    for caps in TOKEN.captures_iter(line) {
        let (name, kind, m) = match matched_group(&caps) {
            Some(found) => found,
            None => continue,
        };
        if name == "garbage" {
            return Err(LexError {
                position: m.start(),
                text: m.as_str().to_string(),
            });
        }
        let kind = match kind {
            Some(kind) => kind,
            None => continue,
        };

        match kind {
            TokenKind::Label => {
                let text = m.as_str();
                let name = text.trim().trim_end_matches(':').trim_end();
                let start = m.start() + (text.len() - text.trim_start().len());
                tokens.push(Token::new(kind, name, start));
            }
            TokenKind::Str => {
                let body = &m.as_str()[1..m.as_str().len() - 1];
                // 'MA''AM' lexes as two abutting strings.
                match tokens.last_mut() {
                    Some(last) if string_end == Some(m.start()) => {
                        last.text.push('\'');
                        last.text.push_str(body);
                    }
                    _ => tokens.push(Token::new(kind, body, m.start())),
                }
                string_end = Some(m.end());
            }
            _ => tokens.push(Token::new(kind, m.as_str(), m.start())),
        }
    }

    Ok(tokens)
}
