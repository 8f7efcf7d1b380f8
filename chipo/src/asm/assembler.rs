use std::collections::HashMap;

use tracing::{debug, trace};

use crate::asm::expr::{EvalContext, EvalError, Value};
use crate::asm::statement::{Form, NextPc, Statement};
use crate::asm::{AssemblyError, Diagnostic};
use crate::emu::{Addr, Instruction, Vx, MEMORY_SIZE, PROGRAM_START};

const LAST_ADDRESS: usize = MEMORY_SIZE - 1;

/// Names bound during one assembly run.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, i64>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn define(&mut self, name: &str, value: i64) {
        self.symbols.insert(name.to_string(), value);
    }
}

impl EvalContext for SymbolTable {
    fn lookup(&self, name: &str) -> Option<i64> {
        self.get(name)
    }
}

type StatementResult<T> = std::result::Result<T, (usize, String)>;

fn range_error(value: i64) -> String {
    format!("Inappropriate expression value {}", value)
}

/// Evaluates operand `index` and checks it lies in `min..=max`.
fn evaluate(
    statement: &Statement,
    index: usize,
    symbols: &SymbolTable,
    min: i64,
    max: i64,
) -> StatementResult<i64> {
    let position = statement.operand_position(index);
    let operand = statement
        .expressions
        .get(index)
        .ok_or_else(|| (position, "Missing operand".to_string()))?;
    let value = operand
        .expr
        .eval_int(symbols)
        .map_err(|err| (position, err.to_string()))?;
    if value < min || value > max {
        return Err((position, range_error(value)));
    }
    Ok(value)
}

fn register(reg: Option<u8>) -> StatementResult<Vx> {
    match reg {
        Some(vx) if vx < 16 => Ok(vx as Vx),
        _ => Err((0, "Invalid register operand".to_string())),
    }
}

struct Assembler<'s> {
    statements: &'s mut [Statement],
    symbols: SymbolTable,
    syntax_errors: usize,
    expression_errors: usize,
}

impl<'s> Assembler<'s> {
    fn fail(&mut self, index: usize, (position, message): (usize, String)) {
        trace!(line = index + 1, position, %message, "expression error");
        self.statements[index].set_expr_error(position, message);
        self.expression_errors += 1;
    }

    fn errors(&self) -> usize {
        self.syntax_errors + self.expression_errors
    }

    fn bind(&mut self, index: usize, name: &str, value: i64) {
        self.symbols.define(name, value);
        self.statements[index].defined_value = Some(value);
    }

    /// Binds names and lays out the program counter.
    fn pass_one(&mut self) {
        let mut pc = PROGRAM_START as usize;
        let mut deferred = vec![];

        for index in 0..self.statements.len() {
            let statement = &self.statements[index];
            if statement.text_error {
                self.syntax_errors += 1;
                continue;
            }

            if let Some(name) = statement.defined_name.clone() {
                if self.symbols.contains(&name) {
                    self.fail(index, (0, format!("Duplicate name {}", name)));
                } else if statement.form == Some(Form::Equ) {
                    match statement.expressions[0].expr.eval_int(&self.symbols) {
                        Ok(value) if (0..=0xFFFF).contains(&value) => {
                            self.bind(index, &name, value)
                        }
                        Ok(value) => self.fail(index, (0, range_error(value))),
                        Err(EvalError::Undefined(_)) => deferred.push(index),
                        Err(err) => self.fail(index, (0, err.to_string())),
                    }
                } else {
                    self.bind(index, &name, pc as i64);
                }
            }

            let statement = &self.statements[index];
            let next_pc = statement.next_pc;
            match next_pc {
                NextPc::Advance(length) => pc += length,
                NextPc::Reserve(_) => {
                    let room = (MEMORY_SIZE - pc.min(MEMORY_SIZE)) as i64;
                    match evaluate(statement, 0, &self.symbols, 0, room) {
                        Ok(length) => {
                            self.statements[index].next_pc = NextPc::Reserve(Some(length as usize));
                            pc += length as usize;
                        }
                        Err(err) => self.fail(index, err),
                    }
                }
                NextPc::Origin(_) => {
                    match evaluate(statement, 0, &self.symbols, PROGRAM_START as i64, LAST_ADDRESS as i64) {
                        Ok(origin) => {
                            self.statements[index].next_pc = NextPc::Origin(Some(origin as Addr));
                            pc = origin as usize;
                        }
                        Err(err) => self.fail(index, err),
                    }
                }
            }

            if pc > LAST_ADDRESS {
                self.fail(
                    index,
                    (0, "Assembly too large, off the end of memory".to_string()),
                );
                break;
            }
        }

        if self.errors() > 0 {
            return;
        }

        // Later equates are usually what earlier ones wait on.
        for &index in deferred.iter().rev() {
            let statement = &self.statements[index];
            let name = match statement.defined_name.clone() {
                Some(name) => name,
                None => continue,
            };
            if self.symbols.contains(&name) {
                self.fail(index, (0, format!("Duplicate name {}", name)));
                continue;
            }
            match evaluate(statement, 0, &self.symbols, 0, 0xFFFF) {
                Ok(value) => self.bind(index, &name, value),
                Err(err) => self.fail(index, err),
            }
        }

        debug!(symbols = self.symbols.len(), pc, "pass one complete");
    }

    /// Encodes every statement into `image`. Returns the end of the
    /// highest byte written or reserved.
    fn pass_two(&mut self, image: &mut [u8]) -> usize {
        let mut pc = PROGRAM_START as usize;
        let mut top = pc;

        for index in 0..self.statements.len() {
            let statement = &self.statements[index];
            let next_pc = statement.next_pc;
            let encoded = match (statement.form, next_pc) {
                (Some(Form::Equ), _) | (None, _) => None,
                (Some(form), NextPc::Advance(_)) => Some(encode(statement, form, &self.symbols)),
                _ => None,
            };

            if let NextPc::Origin(Some(origin)) = next_pc {
                pc = origin as usize;
            }
            self.statements[index].pc = Some(pc as Addr);

            match (next_pc, encoded) {
                (NextPc::Reserve(length), _) => {
                    pc += length.unwrap_or(0);
                    top = top.max(pc);
                }
                (_, Some(Ok(bytes))) => {
                    let end = pc + bytes.len();
                    if end > MEMORY_SIZE {
                        self.fail(index, (0, "Assembly too large, off the end of memory".to_string()));
                        break;
                    }
                    image[pc..end].copy_from_slice(&bytes);
                    self.statements[index].value = bytes;
                    pc = end;
                    top = top.max(end);
                }
                (NextPc::Advance(length), Some(Err(err))) => {
                    pc += length;
                    self.fail(index, err);
                }
                _ => {}
            }
        }

        debug!(top, "pass two complete");
        top
    }

    fn failure(&self) -> AssemblyError {
        let diagnostics = self
            .statements
            .iter()
            .enumerate()
            .filter(|(_, statement)| !statement.is_valid())
            .map(|(index, statement)| Diagnostic {
                line: index + 1,
                position: statement.error_pos,
                message: statement.error_msg.clone(),
            })
            .collect();
        AssemblyError {
            syntax_errors: self.syntax_errors,
            expression_errors: self.expression_errors,
            diagnostics,
        }
    }
}

fn encode(statement: &Statement, form: Form, symbols: &SymbolTable) -> StatementResult<Vec<u8>> {
    use Form::*;
    use Instruction as I;

    let byte = |index| evaluate(statement, index, symbols, 0, 0xFF).map(|v| v as u8);
    let nybble = |index| evaluate(statement, index, symbols, 0, 0xF).map(|v| v as u8);
    let address = |index| {
        evaluate(statement, index, symbols, PROGRAM_START as i64, LAST_ADDRESS as i64)
            .map(|v| v as Addr)
    };
    let r1 = || register(statement.reg_1);
    let r2 = || register(statement.reg_2);

    let instruction = match form {
        Cls => I::DisplayClear,
        Ret => I::Return,
        Exit => I::Exit,
        High => I::HighRes,
        Low => I::LowRes,
        Scl => I::ScrollLeft,
        Scr => I::ScrollRight,
        Scd => I::ScrollDown(nybble(0)?),
        Call => I::Call(address(0)?),
        JpAdr => I::GoTo(address(0)?),
        JpxAdr => I::Jump(address(0)?),
        LdI => I::SetAddr(address(0)?),
        AddI => I::AddToI(r2()?),
        AddR => I::AddRg(r1()?, r2()?),
        AddB => I::Add(r1()?, byte(0)?),
        And => I::And(r1()?, r2()?),
        Or => I::Or(r1()?, r2()?),
        Xor => I::Xor(r1()?, r2()?),
        Sub => I::Sub(r1()?, r2()?),
        SubN => I::SubSelf(r1()?, r2()?),
        Shr => I::RightShift(r1()?, r2()?),
        Shl => I::LeftShift(r1()?, r2()?),
        LdRB => I::Set(r1()?, byte(0)?),
        LdRR => I::SetRg(r1()?, r2()?),
        LdRT => I::GetTimer(r1()?),
        LdTR => I::SetTimer(r2()?),
        LdSR => I::SetSoundTimer(r2()?),
        LdK => I::GetKeyOp(r1()?),
        LdC => I::FontLoad(r2()?),
        LdH => I::HighFontLoad(r2()?),
        LdM => I::MemLoad(r1()?),
        Stm => I::MemDump(r1()?),
        Std => I::BCD(r1()?),
        Rnd => I::Rand(r1()?, byte(0)?),
        Draw => I::Disp(r1()?, r2()?, nybble(0)?),
        SeB => I::IfEq(r1()?, byte(0)?),
        SeR => I::IfEqRg(r1()?, r2()?),
        SneB => I::IfNeq(r1()?, byte(0)?),
        SneR => I::IfNeqRg(r1()?, r2()?),
        Skp => I::KeyOpEq(r1()?),
        Sknp => I::KeyOpNeq(r1()?),
        Db => {
            return (0..statement.expressions.len()).map(byte).collect();
        }
        Dw => {
            let mut bytes = Vec::with_capacity(2 * statement.expressions.len());
            for index in 0..statement.expressions.len() {
                let word = evaluate(statement, index, symbols, 0, 0xFFFF)?;
                bytes.push((word >> 8) as u8);
                bytes.push(word as u8);
            }
            return Ok(bytes);
        }
        Da => {
            let position = statement.operand_position(0);
            return match statement.expressions.get(0).map(|op| op.expr.eval(symbols)) {
                Some(Ok(Value::Bytes(bytes))) => Ok(bytes),
                Some(Err(err)) => Err((position, err.to_string())),
                _ => Err((position, "DA needs a string".to_string())),
            };
        }
        Equ | Org | Ds => return Ok(vec![]),
    };

    let word = instruction.to_bin();
    Ok(vec![(word >> 8) as u8, word as u8])
}

/// Assembles `statements` into the image that loads at `PROGRAM_START`.
///
/// A fresh symbol table is built on every call. On failure each offending
/// statement carries its own message and the returned error counts them.
pub fn assemble(statements: &mut [Statement]) -> Result<Vec<u8>, AssemblyError> {
    for statement in statements.iter_mut() {
        statement.init_assembly();
    }

    let mut assembler = Assembler {
        statements,
        symbols: SymbolTable::new(),
        syntax_errors: 0,
        expression_errors: 0,
    };

    assembler.pass_one();
    if assembler.errors() > 0 {
        debug!(
            syntax = assembler.syntax_errors,
            expression = assembler.expression_errors,
            "assembly failed in pass one"
        );
        return Err(assembler.failure());
    }

    let mut image = vec![0u8; MEMORY_SIZE];
    let top = assembler.pass_two(&mut image);
    if assembler.errors() > 0 {
        debug!(expression = assembler.expression_errors, "assembly failed in pass two");
        return Err(assembler.failure());
    }

    Ok(image[PROGRAM_START as usize..top].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::parse;

    fn build(source: &str) -> Result<Vec<u8>, AssemblyError> {
        let mut statements = parse(source);
        assemble(&mut statements)
    }

    #[test]
    fn test_range() {
        assert_eq!(build("ld v0, 255").unwrap(), vec![0x60, 0xFF]);
        let err = build("ld v0, 256").unwrap_err();
        assert_eq!(err.expression_errors, 1);
        assert_eq!(err.diagnostics[0].message, "Inappropriate expression value 256");
        assert_eq!(err.diagnostics[0].position, 7);
        assert!(build("jp #100").is_err());
        assert!(build("draw v0, v1, 16").is_err());
    }

    #[test]
    fn test_forward_reference() {
        let image = build("call sub\nexit\nsub: ret").unwrap();
        assert_eq!(image, vec![0x22, 0x04, 0x00, 0xFD, 0x00, 0xEE]);
    }

    #[test]
    fn test_org_rejects_forward_reference() {
        let mut statements = parse("org later\nlater: cls");
        let err = assemble(&mut statements).unwrap_err();
        assert_eq!(err.expression_errors, 1);
        assert_eq!(statements[0].error_msg, "Undefined name LATER");
        assert!(statements[0].expr_error);
    }

    #[test]
    fn test_equate_chain() {
        let source = "a equ b + 1\nb equ c * 2\nc equ end - #200\ncls\nend:";
        let mut statements = parse(source);
        assert_eq!(assemble(&mut statements).unwrap(), vec![0x00, 0xE0]);
        assert_eq!(statements[2].defined_value, Some(2));
        assert_eq!(statements[1].defined_value, Some(4));
        assert_eq!(statements[0].defined_value, Some(5));
    }

    #[test]
    fn test_equate_hard_error() {
        let err = build("a equ 1/0").unwrap_err();
        assert_eq!(err.diagnostics[0].message, "Division by zero");
    }

    #[test]
    fn test_duplicate_name() {
        let err = build("x: cls\nx: cls").unwrap_err();
        assert_eq!(err.expression_errors, 1);
        assert_eq!(err.diagnostics[0].line, 2);
        assert_eq!(err.diagnostics[0].message, "Duplicate name X");
    }

    #[test]
    fn test_syntax_errors_are_counted() {
        let err = build("cls\nbogus v1\nld v1, ?").unwrap_err();
        assert_eq!(err.syntax_errors, 2);
        assert_eq!(err.expression_errors, 0);
    }

    #[test]
    fn test_errors_accumulate_in_pass_two() {
        let err = build("ld v0, 300\nld v1, 2\nld v2, nowhere").unwrap_err();
        assert_eq!(err.expression_errors, 2);
        let lines: Vec<usize> = err.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn test_data_directives() {
        let image = build("db 1, 2, #FF\ndw #1234\nda 'Hi'").unwrap();
        assert_eq!(image, vec![1, 2, 0xFF, 0x12, 0x34, b'H', b'I']);
    }

    #[test]
    fn test_ds_and_org() {
        let mut statements = parse("cls\nds 4\nafter: org #210\nhere: ret");
        let image = assemble(&mut statements).unwrap();
        assert_eq!(image.len(), 0x12);
        assert_eq!(&image[..2], &[0x00, 0xE0]);
        assert_eq!(&image[0x10..], &[0x00, 0xEE]);
        assert_eq!(statements[2].defined_value, Some(0x206));
        assert_eq!(statements[3].defined_value, Some(0x210));
        assert_eq!(statements[3].pc, Some(0x210));

        let image = build("cls\nds 6").unwrap();
        assert_eq!(image.len(), 8);
    }

    #[test]
    fn test_too_large() {
        let err = build("ds 3000\nds 584").unwrap_err();
        assert_eq!(err.diagnostics[0].line, 2);
        assert_eq!(
            err.diagnostics[0].message,
            "Assembly too large, off the end of memory"
        );
    }

    #[test]
    fn test_idempotent() {
        let source = "start: ld i, sprite\n draw v0, v1, 2\n jp start\nsprite: db #C0, #C0";
        let mut statements = parse(source);
        let first = assemble(&mut statements).unwrap();
        let second = assemble(&mut statements).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![0xA2, 0x06, 0xD0, 0x12, 0x12, 0x00, 0xC0, 0xC0]);
    }
}
