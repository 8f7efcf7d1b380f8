use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::emu::{Addr, Frontend, Instruction, Instruction::*, Screen, Val, Vx};
use crate::error::{ChipoError, Result};

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: Addr = 0x200;
/// Largest image that fits between `PROGRAM_START` and the end of memory.
pub const MAX_IMAGE_LEN: usize = MEMORY_SIZE - PROGRAM_START as usize;
/// The COSMAC VIP kept 12 levels of return addresses.
pub const MAX_CALL_DEPTH: usize = 12;

pub const LOW_FONT_BASE: Addr = 0x000;
pub const LOW_FONT_WIDTH: Addr = 5;
pub const HIGH_FONT_BASE: Addr = 0x050;
pub const HIGH_FONT_WIDTH: Addr = 10;

const FONT_5X4: [Val; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

const FONT_8X10: [Val; 160] = [
    0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, // 0
    0x00, 0x08, 0x38, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, // 1
    0x00, 0x38, 0x44, 0x04, 0x08, 0x10, 0x20, 0x44, 0x7C, 0x00, // 2
    0x00, 0x38, 0x44, 0x04, 0x18, 0x04, 0x04, 0x44, 0x38, 0x00, // 3
    0x00, 0x0C, 0x14, 0x24, 0x24, 0x7E, 0x04, 0x04, 0x0E, 0x00, // 4
    0x00, 0x3E, 0x20, 0x20, 0x3C, 0x02, 0x02, 0x42, 0x3C, 0x00, // 5
    0x00, 0x0E, 0x10, 0x20, 0x3C, 0x22, 0x22, 0x22, 0x1C, 0x00, // 6
    0x00, 0x7E, 0x42, 0x02, 0x04, 0x04, 0x08, 0x08, 0x08, 0x00, // 7
    0x00, 0x3C, 0x42, 0x42, 0x3C, 0x42, 0x42, 0x42, 0x3C, 0x00, // 8
    0x00, 0x3C, 0x42, 0x42, 0x42, 0x3E, 0x02, 0x04, 0x78, 0x00, // 9
    0x00, 0x18, 0x08, 0x14, 0x14, 0x14, 0x1C, 0x22, 0x77, 0x00, // A
    0x00, 0x7C, 0x22, 0x22, 0x3C, 0x22, 0x22, 0x22, 0x7C, 0x00, // B
    0x00, 0x1E, 0x22, 0x40, 0x40, 0x40, 0x40, 0x22, 0x1C, 0x00, // C
    0x00, 0x78, 0x24, 0x22, 0x22, 0x22, 0x22, 0x24, 0x78, 0x00, // D
    0x00, 0x7E, 0x22, 0x28, 0x38, 0x28, 0x20, 0x22, 0x7E, 0x00, // E
    0x00, 0x7E, 0x22, 0x28, 0x38, 0x28, 0x20, 0x20, 0x70, 0x00, // F
];

/// A runtime fault. The step that raised it has been abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("Undefined instruction {instr:04X} at {pc:04X}")]
    UndefinedInstruction { instr: u16, pc: Addr },
    #[error("Subroutine call but stack is full {instr:04X} at {pc:04X}")]
    StackFull { instr: u16, pc: Addr },
    #[error("Return but empty call stack {instr:04X} at {pc:04X}")]
    EmptyStack { instr: u16, pc: Addr },
    #[error("Reference to invalid memory address in {instr:04X} at {pc:04X}")]
    BadAddress { instr: u16, pc: Addr },
}

/// Outcome of a step that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Continue,
    /// Fx0A found no key down; PC was left on the instruction.
    WaitingForKey,
    /// PC has reached a breakpoint. Nothing at that address has run.
    Breakpoint(Addr),
    /// 00FD was executed at the given address.
    Exit(Addr),
}

impl ProgramState {
    pub fn is_stop(&self) -> bool {
        matches!(self, ProgramState::Breakpoint(_) | ProgramState::Exit(_))
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramState::Continue => f.write_str("Running"),
            ProgramState::WaitingForKey => f.write_str("Waiting for a key"),
            ProgramState::Breakpoint(pc) => write!(f, "Breakpoint at {:04X}", pc),
            ProgramState::Exit(pc) => write!(f, "Emulator termination 00FD at {:04X}", pc),
        }
    }
}

enum Flow {
    Next(Addr),
    Wait,
    Exit,
}

pub struct Proc<F: Frontend = Screen> {
    memory: [Val; MEMORY_SIZE],
    rg: [Val; 16],
    i: Addr,
    delay_rg: Val,
    sound_rg: Val,
    pc: Addr,
    stack: Vec<Addr>,
    high_res: bool,
    breakpoints: HashSet<Addr>,
    reset_callbacks: Vec<Box<dyn FnMut()>>,
    /// Set whenever memory is written; viewers clear it once refreshed.
    pub memory_changed: bool,
    frontend: F,
}

impl Proc<Screen> {
    pub fn binary(blob: &[u8]) -> Result<Self> {
        Proc::with_frontend(Screen::default(), blob)
    }
}

impl<F: Frontend> Proc<F> {
    pub fn with_frontend(frontend: F, blob: &[u8]) -> Result<Self> {
        let mut proc = Proc {
            memory: [0; MEMORY_SIZE],
            rg: [0; 16],
            i: 0,
            delay_rg: 0,
            sound_rg: 0,
            pc: PROGRAM_START,
            stack: Vec::with_capacity(MAX_CALL_DEPTH),
            high_res: false,
            breakpoints: HashSet::new(),
            reset_callbacks: vec![],
            memory_changed: true,
            frontend,
        };
        proc.reset(Some(blob))?;
        Ok(proc)
    }

    /// Returns the machine to power-on state, optionally loading `image` at
    /// `PROGRAM_START`. Breakpoints are cleared too.
    pub fn reset(&mut self, image: Option<&[u8]>) -> Result<()> {
        let image = image.unwrap_or(&[]);
        if image.len() > MAX_IMAGE_LEN {
            return Err(ChipoError::ImageTooLarge(image.len()));
        }

        self.stack.clear();
        self.breakpoints.clear();
        self.rg = [0; 16];
        self.i = 0;
        self.delay_rg = 0;
        self.sound_rg = 0;
        self.pc = PROGRAM_START;
        self.high_res = false;
        self.frontend.set_mode(false);
        self.frontend.sound(false);

        self.memory = [0; MEMORY_SIZE];
        let low = LOW_FONT_BASE as usize;
        let high = HIGH_FONT_BASE as usize;
        self.memory[low..low + FONT_5X4.len()].copy_from_slice(&FONT_5X4);
        self.memory[high..high + FONT_8X10.len()].copy_from_slice(&FONT_8X10);
        let start = PROGRAM_START as usize;
        self.memory[start..start + image.len()].copy_from_slice(image);
        self.memory_changed = true;
        debug!(len = image.len(), "machine reset");

        for callback in self.reset_callbacks.iter_mut() {
            callback();
        }
        Ok(())
    }

    /// Registers `callback` to run at the end of every `reset`.
    pub fn reset_notify<C>(&mut self, callback: C)
    where
        C: FnMut() + 'static,
    {
        self.reset_callbacks.push(Box::new(callback));
    }

    /// Executes the instruction at PC.
    pub fn step(&mut self) -> Result<ProgramState> {
        let pc = self.pc;
        let instr = self.fetch(pc)?;
        let inst = Instruction::decode(instr).map_err(|_| {
            debug!("undefined instruction {:04X} at {:04X}", instr, pc);
            Fault::UndefinedInstruction { instr, pc }
        })?;
        trace!("{:04X}: {:04X} {}", pc, instr, inst);

        match self.execute(inst, instr, pc)? {
            Flow::Wait => Ok(ProgramState::WaitingForKey),
            Flow::Exit => Ok(ProgramState::Exit(pc)),
            Flow::Next(next) => {
                self.pc = next;
                if self.breakpoints.contains(&next) {
                    Ok(ProgramState::Breakpoint(next))
                } else {
                    Ok(ProgramState::Continue)
                }
            }
        }
    }

    /// Steps until something other than `Continue` happens or `max_steps`
    /// instructions have run.
    pub fn run(&mut self, max_steps: usize) -> Result<ProgramState> {
        for _ in 0..max_steps {
            match self.step()? {
                ProgramState::Continue => {}
                state => return Ok(state),
            }
        }
        Ok(ProgramState::Continue)
    }

    /// One 60 Hz tick of the delay and sound timers.
    pub fn tick(&mut self) {
        if self.delay_rg > 0 {
            self.delay_rg -= 1;
        }
        if self.sound_rg > 0 {
            self.sound_rg -= 1;
            if self.sound_rg == 0 {
                self.frontend.sound(false);
            }
        }
    }

    pub fn add_breakpoint(&mut self, addr: Addr) {
        self.breakpoints.insert(addr);
    }

    pub fn remove_breakpoint(&mut self, addr: Addr) -> bool {
        self.breakpoints.remove(&addr)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Addr> {
        self.breakpoints.iter()
    }

    pub fn pc(&self) -> Addr {
        self.pc
    }

    pub fn i(&self) -> Addr {
        self.i
    }

    pub fn set_i(&mut self, i: Addr) {
        self.i = i & 0x0FFF;
    }

    pub fn v(&self, vx: Vx) -> Val {
        self.rg[vx & 0xF]
    }

    pub fn set_v(&mut self, vx: Vx, val: Val) {
        self.rg[vx & 0xF] = val;
    }

    pub fn registers(&self) -> &[Val; 16] {
        &self.rg
    }

    pub fn delay_timer(&self) -> Val {
        self.delay_rg
    }

    pub fn sound_timer(&self) -> Val {
        self.sound_rg
    }

    pub fn should_buzz(&self) -> bool {
        self.sound_rg > 0
    }

    pub fn is_high_res(&self) -> bool {
        self.high_res
    }

    pub fn memory(&self) -> &[Val] {
        &self.memory
    }

    pub fn write_memory(&mut self, addr: Addr, bytes: &[Val]) -> Result<()> {
        let start = addr as usize;
        let end = start + bytes.len();
        if end > MEMORY_SIZE {
            return Err(Fault::BadAddress { instr: 0, pc: self.pc }.into());
        }
        self.memory[start..end].copy_from_slice(bytes);
        self.memory_changed = true;
        Ok(())
    }

    pub fn call_stack(&self) -> &[Addr] {
        &self.stack
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    fn fetch(&self, pc: Addr) -> std::result::Result<u16, Fault> {
        let at = pc as usize;
        if at + 1 >= MEMORY_SIZE {
            return Err(Fault::BadAddress { instr: 0, pc });
        }
        Ok(((self.memory[at] as u16) << 8) | self.memory[at + 1] as u16)
    }

    fn scroll_columns(&self) -> usize {
        if self.high_res {
            4
        } else {
            2
        }
    }

    fn skip_if(&self, condition: bool, pc: Addr) -> Flow {
        Flow::Next(if condition { pc + 4 } else { pc + 2 })
    }

    fn execute(&mut self, inst: Instruction, instr: u16, pc: Addr) -> std::result::Result<Flow, Fault> {
        let next = pc + 2;
        let bad_address = Fault::BadAddress { instr, pc };

        let flow = match inst {
            ScrollDown(n) => {
                self.frontend.scroll_down(n as usize);
                Flow::Next(next)
            }
            DisplayClear => {
                self.frontend.clear();
                Flow::Next(next)
            }
            Return => match self.stack.pop() {
                Some(addr) => Flow::Next(addr),
                None => return Err(Fault::EmptyStack { instr, pc }),
            },
            ScrollRight => {
                self.frontend.scroll_right(self.scroll_columns());
                Flow::Next(next)
            }
            ScrollLeft => {
                self.frontend.scroll_left(self.scroll_columns());
                Flow::Next(next)
            }
            Exit => Flow::Exit,
            LowRes | HighRes => {
                self.high_res = inst == HighRes;
                self.frontend.set_mode(self.high_res);
                Flow::Next(next)
            }
            GoTo(addr) => {
                if addr < PROGRAM_START || addr == 0x0FFF {
                    return Err(bad_address);
                }
                Flow::Next(addr)
            }
            Call(addr) => {
                if self.stack.len() >= MAX_CALL_DEPTH {
                    return Err(Fault::StackFull { instr, pc });
                }
                self.stack.push(next);
                Flow::Next(addr)
            }
            IfEq(vx, val) => self.skip_if(self.rg[vx] == val, pc),
            IfNeq(vx, val) => self.skip_if(self.rg[vx] != val, pc),
            IfEqRg(vx, vy) => self.skip_if(self.rg[vx] == self.rg[vy], pc),
            IfNeqRg(vx, vy) => self.skip_if(self.rg[vx] != self.rg[vy], pc),
            Set(vx, val) => {
                self.rg[vx] = val;
                Flow::Next(next)
            }
            Add(vx, val) => {
                // No carry into VF, unlike 8xy4.
                self.rg[vx] = self.rg[vx].wrapping_add(val);
                Flow::Next(next)
            }
            SetRg(vx, vy) => {
                self.rg[vx] = self.rg[vy];
                Flow::Next(next)
            }
            Or(vx, vy) => {
                self.rg[vx] |= self.rg[vy];
                Flow::Next(next)
            }
            And(vx, vy) => {
                self.rg[vx] &= self.rg[vy];
                Flow::Next(next)
            }
            Xor(vx, vy) => {
                self.rg[vx] ^= self.rg[vy];
                Flow::Next(next)
            }
            AddRg(vx, vy) => {
                let (val, overflow) = self.rg[vx].overflowing_add(self.rg[vy]);
                self.rg[0xF] = overflow as Val;
                self.rg[vx] = val;
                Flow::Next(next)
            }
            Sub(vx, vy) => {
                let (val, borrow) = self.rg[vx].overflowing_sub(self.rg[vy]);
                self.rg[0xF] = !borrow as Val;
                self.rg[vx] = val;
                Flow::Next(next)
            }
            SubSelf(vx, vy) => {
                let (val, borrow) = self.rg[vy].overflowing_sub(self.rg[vx]);
                self.rg[0xF] = !borrow as Val;
                self.rg[vx] = val;
                Flow::Next(next)
            }
            RightShift(vx, vy) => {
                let val = self.rg[vy];
                self.rg[0xF] = val & 0x01;
                self.rg[vx] = val >> 1;
                Flow::Next(next)
            }
            LeftShift(vx, vy) => {
                let val = self.rg[vy];
                self.rg[0xF] = val >> 7;
                self.rg[vx] = val << 1;
                Flow::Next(next)
            }
            SetAddr(addr) => {
                self.i = addr;
                Flow::Next(next)
            }
            Jump(addr) => {
                let target = self.rg[0] as Addr + addr;
                if target <= 0x01FF || target >= 0x0FFE {
                    return Err(bad_address);
                }
                Flow::Next(target)
            }
            Rand(vx, val) => {
                self.rg[vx] = rand::thread_rng().gen::<Val>() & val;
                Flow::Next(next)
            }
            Disp(vx, vy, n) => {
                let count = if n == 0 { 32 } else { n as usize };
                let start = self.i as usize;
                if start + count > MEMORY_SIZE {
                    return Err(bad_address);
                }
                let hit = self.frontend.draw_sprite(
                    self.rg[vx],
                    self.rg[vy],
                    &self.memory[start..start + count],
                );
                self.rg[0xF] = hit as Val;
                Flow::Next(next)
            }
            KeyOpEq(vx) => {
                let key = self.rg[vx] & 0x0F;
                self.skip_if(self.frontend.key_currently_down() == Some(key), pc)
            }
            KeyOpNeq(vx) => {
                let key = self.rg[vx] & 0x0F;
                self.skip_if(self.frontend.key_currently_down() != Some(key), pc)
            }
            GetTimer(vx) => {
                self.rg[vx] = self.delay_rg;
                Flow::Next(next)
            }
            GetKeyOp(vx) => match self.frontend.key_currently_down() {
                Some(key) => {
                    self.rg[vx] = key;
                    Flow::Next(next)
                }
                None => Flow::Wait,
            },
            SetTimer(vx) => {
                self.delay_rg = self.rg[vx];
                Flow::Next(next)
            }
            SetSoundTimer(vx) => {
                self.sound_rg = self.rg[vx];
                self.frontend.sound(self.sound_rg != 0);
                Flow::Next(next)
            }
            AddToI(vx) => {
                self.i = (self.i + self.rg[vx] as Addr) & 0x0FFF;
                Flow::Next(next)
            }
            FontLoad(vx) => {
                self.i = LOW_FONT_BASE + LOW_FONT_WIDTH * (self.rg[vx] & 0x0F) as Addr;
                Flow::Next(next)
            }
            HighFontLoad(vx) => {
                self.i = HIGH_FONT_BASE + HIGH_FONT_WIDTH * (self.rg[vx] & 0x0F) as Addr;
                Flow::Next(next)
            }
            BCD(vx) => {
                let at = self.i as usize;
                if at + 2 >= MEMORY_SIZE {
                    return Err(bad_address);
                }
                let val = self.rg[vx];
                self.memory[at] = val / 100;
                self.memory[at + 1] = (val / 10) % 10;
                self.memory[at + 2] = val % 10;
                self.memory_changed = true;
                Flow::Next(next)
            }
            MemDump(vx) => {
                let at = self.i as usize;
                if at + vx >= MEMORY_SIZE {
                    return Err(bad_address);
                }
                self.memory[at..=at + vx].copy_from_slice(&self.rg[..=vx]);
                self.i = (self.i + vx as Addr + 1) & 0x0FFF;
                self.memory_changed = true;
                Flow::Next(next)
            }
            MemLoad(vx) => {
                let at = self.i as usize;
                if at + vx >= MEMORY_SIZE {
                    return Err(bad_address);
                }
                self.rg[..=vx].copy_from_slice(&self.memory[at..=at + vx]);
                self.i = (self.i + vx as Addr + 1) & 0x0FFF;
                Flow::Next(next)
            }
        };
        Ok(flow)
    }
}

impl<F: Frontend> fmt::Debug for Proc<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proc")
            .field("pc", &self.pc)
            .field("i", &self.i)
            .field("rg", &self.rg)
            .field("delay_rg", &self.delay_rg)
            .field("sound_rg", &self.sound_rg)
            .field("stack", &self.stack)
            .field("high_res", &self.high_res)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    fn exec(prg: &str) -> Proc {
        let binary = compile(&format!("{}\n exit", prg)).unwrap();
        let mut proc = Proc::binary(&binary).unwrap();

        while let Ok(ProgramState::Continue) = proc.step() {}

        proc
    }

    #[test]
    fn test_add() {
        let proc = exec(
            r#"
    ld v0, 10
    ld v1, 10
    add v0, v1
            "#,
        );

        assert_eq!(proc.rg[0], 20);
        assert_eq!(proc.rg[0xF], 0);
    }

    #[test]
    fn test_add_immediate_has_no_carry() {
        let proc = exec(
            r#"
    ld vf, 7
    ld v0, #FF
    add v0, 2
            "#,
        );

        assert_eq!(proc.rg[0], 1);
        assert_eq!(proc.rg[0xF], 7);
    }

    #[test]
    fn test_and() {
        let proc = exec(
            r#"
    ld v0, #FF
    ld v1, #0F
    and v0, v1
            "#,
        );

        assert_eq!(proc.rg[0], 0x0F);
    }

    #[test]
    fn test_or() {
        let proc = exec(
            r#"
    ld v0, #F0
    ld v1, #0F
    or v0, v1
            "#,
        );

        assert_eq!(proc.rg[0], 0xFF);
    }

    #[test]
    fn test_set_addr() {
        let proc = exec("ld i, #FFF");

        assert_eq!(proc.i, 0xFFF);
    }

    #[test]
    fn test_is_equal() {
        let proc = exec(
            r#"
    ld v0, 1
    ld v1, 1
    se v0, v1
    ld v0, 10
    "#,
        );

        assert_eq!(proc.rg[0], 1);
    }

    #[test]
    fn test_is_not_equal() {
        let proc = exec(
            r#"
    ld v0, 1
    ld v1, 1
    sne v0, v1
    ld v0, 10
    "#,
        );

        assert_eq!(proc.rg[0], 10);
    }

    #[test]
    fn test_skip_is_equal() {
        let proc = exec(
            r#"
    ld v0, 1
    ld v1, 2
    se v0, v1
    ld v0, 10
    "#,
        );

        assert_eq!(proc.rg[0], 10);
    }

    #[test]
    fn test_skip_is_not_equal() {
        let proc = exec(
            r#"
    ld v0, 1
    ld v1, 2
    sne v0, v1
    ld v0, 10
    "#,
        );

        assert_eq!(proc.rg[0], 1);
    }

    #[test]
    fn test_bcd() {
        let proc = exec(
            r#"
    ld v0, 123
    ld i, digits
    std v0
    ldm v2
    jp done
digits: ds 3
done:
    "#,
        );

        assert_eq!(proc.rg[0], 1);
        assert_eq!(proc.rg[1], 2);
        assert_eq!(proc.rg[2], 3);
    }

    #[test]
    fn test_store_and_load_advance_i() {
        let proc = exec(
            r#"
    ld v0, 1
    ld v1, 2
    ld i, buf
    stm v1
    ld i, buf
    ldm v0
    jp done
buf: ds 4
done:
    "#,
        );

        assert_eq!(proc.rg[0], 1);
        let buf = proc.pc as usize - 4;
        assert_eq!(&proc.memory[buf..buf + 2], &[1, 2]);
        assert_eq!(proc.i as usize, buf + 1);
    }

    #[test]
    fn test_font_load() {
        let proc = exec(
            r#"
    ld v0, 2
    ldc i, v0
    "#,
        );

        assert_eq!(proc.i, 10);

        let proc = exec(
            r#"
    ld v0, #12
    ldh i, v0
    "#,
        );

        assert_eq!(proc.i, 0x50 + 20);
    }

    #[test]
    fn test_call() {
        let proc = exec(
            r#"
    call addr
    jp done

addr:
    ld v0, 5
    ret
done:
    "#,
        );

        assert_eq!(proc.rg[0], 5);
        assert!(proc.stack.is_empty());
    }

    #[test]
    fn test_jump() {
        let proc = exec(
            r#"
    jp addr
done:
    exit

addr:
    ld v0, 5
    jp done
    "#,
        );

        assert_eq!(proc.rg[0], 5);
    }

    #[test]
    fn test_sub() {
        let proc = exec(
            r#"
    ld v0, 10
    ld v1, 5
    sub v0, v1
    "#,
        );

        assert_eq!(proc.rg[0], 5);
        assert_eq!(proc.rg[0xF], 1);

        let proc = exec(
            r#"
    ld v0, 10
    ld v1, 5
    sub v1, v0
    "#,
        );

        assert_eq!(proc.rg[0], 10);
        assert_eq!(proc.rg[1], 251);
        assert_eq!(proc.rg[0xF], 0);
    }

    #[test]
    fn test_shifts() {
        let proc = exec(
            r#"
    ld v1, #81
    shr v0, v1
    "#,
        );

        assert_eq!(proc.rg[0], 0x40);
        assert_eq!(proc.rg[0xF], 1);

        let proc = exec(
            r#"
    ld v2, #81
    shl v2
    "#,
        );

        assert_eq!(proc.rg[2], 0x02);
        assert_eq!(proc.rg[0xF], 1);
    }

    #[test]
    fn test_draw_collision() {
        let proc = exec(
            r#"
    ld i, sprite
    draw v0, v0, 1
    draw v0, v0, 1
    jp done
sprite: db #80
done:
    "#,
        );

        assert_eq!(proc.rg[0xF], 1);
        assert!(proc.frontend().pixels().iter().all(|&p| !p));
    }

    #[test]
    fn test_reset_notify() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut proc = Proc::binary(&[]).unwrap();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        proc.reset_notify(move || seen.set(seen.get() + 1));
        proc.add_breakpoint(0x204);
        proc.reset(Some(&[0x00, 0xE0])).unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(proc.breakpoints().count(), 0);
        assert_eq!(proc.memory()[0x200..0x202], [0x00, 0xE0]);
        assert_eq!(proc.memory()[0x50..0x53], [0x00, 0x3C, 0x42]);
    }

    #[test]
    fn test_image_too_large() {
        let blob = vec![0u8; MAX_IMAGE_LEN + 1];
        assert!(matches!(
            Proc::binary(&blob),
            Err(ChipoError::ImageTooLarge(len)) if len == MAX_IMAGE_LEN + 1
        ));
        assert!(Proc::binary(&blob[1..]).is_ok());
    }

    #[test]
    fn test_tick() {
        let mut proc = Proc::binary(&[0x60, 0x02, 0xF0, 0x18, 0xF0, 0x15]).unwrap();
        proc.run(3).unwrap();
        assert!(proc.frontend().is_buzzing());
        assert_eq!(proc.delay_timer(), 2);
        proc.tick();
        assert!(proc.frontend().is_buzzing());
        proc.tick();
        assert!(!proc.frontend().is_buzzing());
        assert_eq!(proc.sound_timer(), 0);
        assert_eq!(proc.delay_timer(), 0);
        proc.tick();
        assert_eq!(proc.delay_timer(), 0);
    }
}
