use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::RegexSet;

use crate::asm::expr::Expr;
use crate::asm::lexer::{tokenize, Token, TokenKind};
use crate::emu::Addr;

pub const REG_I: u8 = 16;
pub const REG_DT: u8 = 17;
pub const REG_ST: u8 = 18;

/// Grammatical form of a statement, named after its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    AddI,
    AddR,
    AddB,
    And,
    Call,
    Cls,
    Da,
    Db,
    Draw,
    Ds,
    Dw,
    Equ,
    Exit,
    High,
    JpAdr,
    JpxAdr,
    LdC,
    LdH,
    LdI,
    LdK,
    LdM,
    LdRB,
    LdRR,
    LdRT,
    LdSR,
    LdTR,
    Low,
    Or,
    Org,
    Ret,
    Rnd,
    Scd,
    Scl,
    Scr,
    SeB,
    SeR,
    Shl,
    Shr,
    Skp,
    Sknp,
    SneB,
    SneR,
    Std,
    Stm,
    Sub,
    SubN,
    Xor,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{:?}", self).to_uppercase())
    }
}

/// How a statement moves the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPc {
    Advance(usize),
    /// DS. The size is filled in by the first assembly pass.
    Reserve(Option<usize>),
    /// ORG. The target is filled in by the first assembly pass.
    Origin(Option<Addr>),
}

/// One operand expression and the column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub expr: Expr,
    pub position: usize,
}

/// Everything known about one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// Lexical or grammatical failure, fixed once the line is recognized.
    pub text_error: bool,
    /// Failure found while assembling; reset by `init_assembly`.
    pub expr_error: bool,
    /// Column of the error, 0 when unknown.
    pub error_pos: usize,
    pub error_msg: String,
    /// `None` for blank, comment-only and label-only lines.
    pub form: Option<Form>,
    pub defined_name: Option<String>,
    pub defined_value: Option<i64>,
    pub next_pc: NextPc,
    pub reg_1: Option<u8>,
    pub reg_2: Option<u8>,
    pub expressions: Vec<Operand>,
    /// Bytes emitted by the last successful pass two.
    pub value: Vec<u8>,
    pub pc: Option<Addr>,
}

lazy_static! {
    static ref INVARIANT_FORMS: HashMap<&'static str, Form> = {
        use Form::*;
        vec![
            ("ADDI,R", AddI),
            ("ADDR,R", AddR),
            ("ANDR,R", And),
            ("CLS", Cls),
            ("EXIT", Exit),
            ("HIGH", High),
            ("LDCI,R", LdC),
            ("LDHI,R", LdH),
            ("LDMR", LdM),
            ("LDR,K", LdK),
            ("LDR,R", LdRR),
            ("LDR,T", LdRT),
            ("LDS,R", LdSR),
            ("LDT,R", LdTR),
            ("LOW", Low),
            ("ORR,R", Or),
            ("RET", Ret),
            ("SCL", Scl),
            ("SCR", Scr),
            ("SER,R", SeR),
            ("SHLR", Shl),
            ("SHLR,R", Shl),
            ("SHRR", Shr),
            ("SHRR,R", Shr),
            ("SKNPR", Sknp),
            ("SKPR", Skp),
            ("SNER,R", SneR),
            ("STDR", Std),
            ("STMR", Stm),
            ("SUBNR,R", SubN),
            ("SUBR,R", Sub),
            ("XORR,R", Xor),
        ]
        .into_iter()
        .collect()
    };
    static ref PATTERN_FORMS: (RegexSet, Vec<Form>) = {
        use Form::*;
        let rules = [
            (r"^ADDR,V+$", AddB),
            (r"^CALLV+$", Call),
            (r"^DAZ$", Da),
            (r"^DBV+(,V+)*$", Db),
            (r"^DRAWR,R,V+$", Draw),
            (r"^DSV+$", Ds),
            (r"^DWV+(,V+)*$", Dw),
            (r"^EQUV+$", Equ),
            (r"^JPV+$", JpAdr),
            (r"^JPR,V+$", JpxAdr),
            (r"^LDI,V+$", LdI),
            (r"^LDR,V+$", LdRB),
            (r"^ORGV+$", Org),
            (r"^RNDR,V+$", Rnd),
            (r"^SCDV+$", Scd),
            (r"^SER,V+$", SeB),
            (r"^SNER,V+$", SneB),
        ];
        let set = RegexSet::new(rules.iter().map(|(pattern, _)| *pattern)).unwrap();
        (set, rules.iter().map(|&(_, form)| form).collect())
    };
}

fn classify(signature: &str) -> Option<Form> {
    if let Some(form) = INVARIANT_FORMS.get(signature) {
        return Some(*form);
    }
    let (set, forms) = &*PATTERN_FORMS;
    set.matches(signature).iter().next().map(|i| forms[i])
}

fn signature_code(token: &Token) -> &str {
    match token.kind {
        TokenKind::Opcode | TokenKind::Directive => &token.text,
        TokenKind::VReg => "R",
        TokenKind::IReg => "I",
        TokenKind::KReg => "K",
        TokenKind::DtReg => "T",
        TokenKind::StReg => "S",
        TokenKind::Comma => ",",
        TokenKind::Str => "Z",
        _ => "V",
    }
}

fn register_code(token: &Token) -> Option<u8> {
    match token.kind {
        TokenKind::VReg => u8::from_str_radix(&token.text[1..], 16).ok(),
        TokenKind::IReg => Some(REG_I),
        TokenKind::DtReg => Some(REG_DT),
        TokenKind::StReg => Some(REG_ST),
        _ => None,
    }
}

impl Statement {
    fn new(text: &str) -> Self {
        Statement {
            text: text.to_string(),
            text_error: false,
            expr_error: false,
            error_pos: 0,
            error_msg: String::new(),
            form: None,
            defined_name: None,
            defined_value: None,
            next_pc: NextPc::Advance(0),
            reg_1: None,
            reg_2: None,
            expressions: vec![],
            value: vec![],
            pc: None,
        }
    }

    /// Recognizes one line of source. Failures are recorded on the
    /// returned statement rather than returned.
    pub fn phase_one(text: &str) -> Statement {
        let mut statement = Statement::new(text);
        if let Err((position, message)) = statement.recognize() {
            statement.text_error = true;
            statement.error_pos = position;
            statement.error_msg = message;
        }
        statement
    }

    pub fn is_valid(&self) -> bool {
        !self.text_error && !self.expr_error
    }

    /// Clears everything a previous assembly run left behind.
    pub fn init_assembly(&mut self) {
        self.expr_error = false;
        if !self.text_error {
            self.error_pos = 0;
            self.error_msg.clear();
        }
        self.defined_value = None;
        self.value.clear();
        self.pc = None;
        self.next_pc = match self.next_pc {
            NextPc::Reserve(_) => NextPc::Reserve(None),
            NextPc::Origin(_) => NextPc::Origin(None),
            advance => advance,
        };
    }

    pub fn set_expr_error(&mut self, position: usize, message: impl Into<String>) {
        self.expr_error = true;
        self.error_pos = position;
        self.error_msg = message.into();
    }

    /// Column of operand `index`, or 0.
    pub fn operand_position(&self, index: usize) -> usize {
        self.expressions.get(index).map_or(0, |op| op.position)
    }

    fn recognize(&mut self) -> Result<(), (usize, String)> {
        let mut tokens = tokenize(&self.text)
            .map_err(|err| (err.position, format!("Unrecognized text '{}'", err.text)))?;

        if tokens.first().map(|t| t.kind) == Some(TokenKind::Label) {
            self.defined_name = Some(tokens.remove(0).text);
        } else if tokens.len() >= 2
            && matches!(tokens[0].kind, TokenKind::Word | TokenKind::Opcode)
            && tokens[1].kind == TokenKind::Directive
            && (tokens[1].text == "EQU" || tokens[1].text == "=")
        {
            self.defined_name = Some(tokens.remove(0).text);
            tokens[0].text = "EQU".to_string();
        }

        if tokens.is_empty() {
            return Ok(());
        }
        // Only the leading mnemonic is an opcode; `call sub` names a label.
        for token in tokens.iter_mut().skip(1) {
            if token.kind == TokenKind::Opcode {
                token.kind = TokenKind::Word;
            }
        }

        let mut signature = String::new();
        let mut groups: Vec<Vec<Token>> = vec![];
        let mut pending: Vec<Token> = vec![];
        for token in tokens.iter() {
            signature.push_str(signature_code(token));
            if let Some(code) = register_code(token) {
                if self.reg_1.is_none() {
                    self.reg_1 = Some(code);
                } else if self.reg_2.is_none() {
                    self.reg_2 = Some(code);
                } else {
                    return Err((token.start, "Invalid register operand".to_string()));
                }
            } else if token.kind == TokenKind::Comma {
                if !pending.is_empty() {
                    groups.push(std::mem::take(&mut pending));
                }
            } else if token.kind.is_expression() {
                pending.push(token.clone());
            }
        }
        if !pending.is_empty() {
            groups.push(pending);
        }

        let form = match classify(&signature) {
            Some(form) => form,
            None => return Err((0, "Statement does not make sense".to_string())),
        };
        if form == Form::JpxAdr && self.reg_1 != Some(0) {
            return Err((tokens[1].start, "Only V0 can offset a jump".to_string()));
        }
        if form == Form::Equ && self.defined_name.is_none() {
            return Err((tokens[0].start, "EQU needs a name to define".to_string()));
        }
        if (form == Form::Shr || form == Form::Shl) && self.reg_2.is_none() {
            self.reg_2 = self.reg_1;
        }
        self.form = Some(form);

        for group in groups.iter() {
            let expr = Expr::parse(group).map_err(|err| (group[0].start, err.message))?;
            self.expressions.push(Operand {
                expr,
                position: group[0].start,
            });
        }

        self.next_pc = match form {
            Form::Db => NextPc::Advance(self.expressions.len()),
            Form::Dw => NextPc::Advance(2 * self.expressions.len()),
            Form::Da => match &self.expressions[0].expr {
                Expr::Bytes(bytes) => NextPc::Advance(bytes.len()),
                _ => NextPc::Advance(0),
            },
            Form::Equ => NextPc::Advance(0),
            Form::Ds => NextPc::Reserve(None),
            Form::Org => NextPc::Origin(None),
            _ => NextPc::Advance(2),
        };
        Ok(())
    }
}
