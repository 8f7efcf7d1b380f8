use crate::error::{ChipoError, Result};

pub type Addr = u16;
pub type Vx = usize;
pub type Val = u8;

/// One decoded CHIP-8/SCHIP instruction word.
///
/// `decode` and `to_bin` are exact inverses: every word `decode` accepts
/// encodes back to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ScrollDown(Val),
    DisplayClear,
    Return,
    ScrollRight,
    ScrollLeft,
    Exit,
    LowRes,
    HighRes,
    GoTo(Addr),
    Call(Addr),
    IfEq(Vx, Val),
    IfNeq(Vx, Val),
    IfEqRg(Vx, Vx),
    Set(Vx, Val),
    Add(Vx, Val),
    SetRg(Vx, Vx),
    Or(Vx, Vx),
    And(Vx, Vx),
    Xor(Vx, Vx),
    AddRg(Vx, Vx),
    Sub(Vx, Vx),
    RightShift(Vx, Vx),
    SubSelf(Vx, Vx),
    LeftShift(Vx, Vx),
    IfNeqRg(Vx, Vx),
    SetAddr(Addr),
    Jump(Addr),
    Rand(Vx, Val),
    Disp(Vx, Vx, Val),
    KeyOpEq(Vx),
    KeyOpNeq(Vx),
    GetTimer(Vx),
    GetKeyOp(Vx),
    SetTimer(Vx),
    SetSoundTimer(Vx),
    AddToI(Vx),
    FontLoad(Vx),
    HighFontLoad(Vx),
    BCD(Vx),
    MemDump(Vx),
    MemLoad(Vx),
}

impl Instruction {
    pub fn decode(instr: u16) -> Result<Self> {
        use Instruction::*;
        let unknown = Err(ChipoError::UnknownOpCodeErr(instr));
        match instr & 0xF000 {
            0x0000 => match instr {
                0x00C0..=0x00CF => Ok(ScrollDown(as_small_val(instr))),
                0x00E0 => Ok(DisplayClear),
                0x00EE => Ok(Return),
                0x00FB => Ok(ScrollRight),
                0x00FC => Ok(ScrollLeft),
                0x00FD => Ok(Exit),
                0x00FE => Ok(LowRes),
                0x00FF => Ok(HighRes),
                _ => unknown,
            },
            0x1000 => Ok(GoTo(as_addr(instr))),
            0x2000 => Ok(Call(as_addr(instr))),
            0x3000 => Ok(IfEq(as_vx(instr), as_val(instr))),
            0x4000 => Ok(IfNeq(as_vx(instr), as_val(instr))),
            0x5000 if instr & 0x000F == 0 => Ok(IfEqRg(as_vx(instr), as_vy(instr))),
            0x6000 => Ok(Set(as_vx(instr), as_val(instr))),
            0x7000 => Ok(Add(as_vx(instr), as_val(instr))),
            0x8000 => {
                let (vx, vy) = (as_vx(instr), as_vy(instr));
                match instr & 0x000F {
                    0x0 => Ok(SetRg(vx, vy)),
                    0x1 => Ok(Or(vx, vy)),
                    0x2 => Ok(And(vx, vy)),
                    0x3 => Ok(Xor(vx, vy)),
                    0x4 => Ok(AddRg(vx, vy)),
                    0x5 => Ok(Sub(vx, vy)),
                    0x6 => Ok(RightShift(vx, vy)),
                    0x7 => Ok(SubSelf(vx, vy)),
                    0xE => Ok(LeftShift(vx, vy)),
                    _ => unknown,
                }
            }
            0x9000 if instr & 0x000F == 0 => Ok(IfNeqRg(as_vx(instr), as_vy(instr))),
            0xA000 => Ok(SetAddr(as_addr(instr))),
            0xB000 => Ok(Jump(as_addr(instr))),
            0xC000 => Ok(Rand(as_vx(instr), as_val(instr))),
            0xD000 => Ok(Disp(as_vx(instr), as_vy(instr), as_small_val(instr))),
            0xE000 => match instr & 0x00FF {
                0x9E => Ok(KeyOpEq(as_vx(instr))),
                0xA1 => Ok(KeyOpNeq(as_vx(instr))),
                _ => unknown,
            },
            0xF000 => match instr & 0x00FF {
                0x07 => Ok(GetTimer(as_vx(instr))),
                0x0A => Ok(GetKeyOp(as_vx(instr))),
                0x15 => Ok(SetTimer(as_vx(instr))),
                0x18 => Ok(SetSoundTimer(as_vx(instr))),
                0x1E => Ok(AddToI(as_vx(instr))),
                0x29 => Ok(FontLoad(as_vx(instr))),
                0x30 => Ok(HighFontLoad(as_vx(instr))),
                0x33 => Ok(BCD(as_vx(instr))),
                0x55 => Ok(MemDump(as_vx(instr))),
                0x65 => Ok(MemLoad(as_vx(instr))),
                _ => unknown,
            },
            _ => unknown,
        }
    }

    pub fn to_bin(&self) -> u16 {
        use Instruction::*;
        match *self {
            ScrollDown(n) => 0x00C0 | (n as u16 & 0xF),
            DisplayClear => 0x00E0,
            Return => 0x00EE,
            ScrollRight => 0x00FB,
            ScrollLeft => 0x00FC,
            Exit => 0x00FD,
            LowRes => 0x00FE,
            HighRes => 0x00FF,
            GoTo(addr) => 0x1000 | (addr & 0x0FFF),
            Call(addr) => 0x2000 | (addr & 0x0FFF),
            IfEq(vx, byte) => op_x_kk(0x3, vx, byte),
            IfNeq(vx, byte) => op_x_kk(0x4, vx, byte),
            IfEqRg(vx, vy) => op_x_y_n(0x5, vx, vy, 0x0),
            Set(vx, byte) => op_x_kk(0x6, vx, byte),
            Add(vx, byte) => op_x_kk(0x7, vx, byte),
            SetRg(vx, vy) => op_x_y_n(0x8, vx, vy, 0x0),
            Or(vx, vy) => op_x_y_n(0x8, vx, vy, 0x1),
            And(vx, vy) => op_x_y_n(0x8, vx, vy, 0x2),
            Xor(vx, vy) => op_x_y_n(0x8, vx, vy, 0x3),
            AddRg(vx, vy) => op_x_y_n(0x8, vx, vy, 0x4),
            Sub(vx, vy) => op_x_y_n(0x8, vx, vy, 0x5),
            RightShift(vx, vy) => op_x_y_n(0x8, vx, vy, 0x6),
            SubSelf(vx, vy) => op_x_y_n(0x8, vx, vy, 0x7),
            LeftShift(vx, vy) => op_x_y_n(0x8, vx, vy, 0xE),
            IfNeqRg(vx, vy) => op_x_y_n(0x9, vx, vy, 0x0),
            SetAddr(addr) => 0xA000 | (addr & 0x0FFF),
            Jump(addr) => 0xB000 | (addr & 0x0FFF),
            Rand(vx, byte) => op_x_kk(0xC, vx, byte),
            Disp(vx, vy, nibble) => op_x_y_n(0xD, vx, vy, nibble),
            KeyOpEq(vx) => op_x_kk(0xE, vx, 0x9E),
            KeyOpNeq(vx) => op_x_kk(0xE, vx, 0xA1),
            GetTimer(vx) => op_x_kk(0xF, vx, 0x07),
            GetKeyOp(vx) => op_x_kk(0xF, vx, 0x0A),
            SetTimer(vx) => op_x_kk(0xF, vx, 0x15),
            SetSoundTimer(vx) => op_x_kk(0xF, vx, 0x18),
            AddToI(vx) => op_x_kk(0xF, vx, 0x1E),
            FontLoad(vx) => op_x_kk(0xF, vx, 0x29),
            HighFontLoad(vx) => op_x_kk(0xF, vx, 0x30),
            BCD(vx) => op_x_kk(0xF, vx, 0x33),
            MemDump(vx) => op_x_kk(0xF, vx, 0x55),
            MemLoad(vx) => op_x_kk(0xF, vx, 0x65),
        }
    }

    /// The 12-bit address operand of JP, CALL, LD I and JP V0.
    pub fn target(&self) -> Option<Addr> {
        use Instruction::*;
        match *self {
            GoTo(addr) | Call(addr) | SetAddr(addr) | Jump(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn to_asm(&self) -> String {
        self.to_asm_with(|addr| format!("#{:03X}", addr))
    }

    /// Renders the instruction in assembler syntax, spelling address
    /// operands with `address`.
    pub fn to_asm_with<F>(&self, address: F) -> String
    where
        F: Fn(Addr) -> String,
    {
        use Instruction::*;
        match *self {
            ScrollDown(n) => format!("SCD #{:02X}", n),
            DisplayClear => "CLS".to_string(),
            Return => "RET".to_string(),
            ScrollRight => "SCR".to_string(),
            ScrollLeft => "SCL".to_string(),
            Exit => "EXIT".to_string(),
            LowRes => "LOW".to_string(),
            HighRes => "HIGH".to_string(),
            GoTo(addr) => format!("JP {}", address(addr)),
            Call(addr) => format!("CALL {}", address(addr)),
            IfEq(vx, byte) => format!("SE V{:X}, #{:02X}", vx, byte),
            IfNeq(vx, byte) => format!("SNE V{:X}, #{:02X}", vx, byte),
            IfEqRg(vx, vy) => format!("SE V{:X}, V{:X}", vx, vy),
            Set(vx, byte) => format!("LD V{:X}, #{:02X}", vx, byte),
            Add(vx, byte) => format!("ADD V{:X}, #{:02X}", vx, byte),
            SetRg(vx, vy) => format!("LD V{:X}, V{:X}", vx, vy),
            Or(vx, vy) => format!("OR V{:X}, V{:X}", vx, vy),
            And(vx, vy) => format!("AND V{:X}, V{:X}", vx, vy),
            Xor(vx, vy) => format!("XOR V{:X}, V{:X}", vx, vy),
            AddRg(vx, vy) => format!("ADD V{:X}, V{:X}", vx, vy),
            Sub(vx, vy) => format!("SUB V{:X}, V{:X}", vx, vy),
            RightShift(vx, vy) => format!("SHR V{:X}, V{:X}", vx, vy),
            SubSelf(vx, vy) => format!("SUBN V{:X}, V{:X}", vx, vy),
            LeftShift(vx, vy) => format!("SHL V{:X}, V{:X}", vx, vy),
            IfNeqRg(vx, vy) => format!("SNE V{:X}, V{:X}", vx, vy),
            SetAddr(addr) => format!("LD I, {}", address(addr)),
            Jump(addr) => format!("JP V0, {}", address(addr)),
            Rand(vx, byte) => format!("RND V{:X}, #{:02X}", vx, byte),
            Disp(vx, vy, nibble) => format!("DRAW V{:X}, V{:X}, {}", vx, vy, nibble),
            KeyOpEq(vx) => format!("SKP V{:X}", vx),
            KeyOpNeq(vx) => format!("SKNP V{:X}", vx),
            GetTimer(vx) => format!("LD V{:X}, DT", vx),
            GetKeyOp(vx) => format!("LD V{:X}, K", vx),
            SetTimer(vx) => format!("LD DT, V{:X}", vx),
            SetSoundTimer(vx) => format!("LD ST, V{:X}", vx),
            AddToI(vx) => format!("ADD I, V{:X}", vx),
            FontLoad(vx) => format!("LDC I, V{:X}", vx),
            HighFontLoad(vx) => format!("LDH I, V{:X}", vx),
            BCD(vx) => format!("STD V{:X}", vx),
            MemDump(vx) => format!("STM V{:X}", vx),
            MemLoad(vx) => format!("LDM V{:X}", vx),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_asm())
    }
}

fn op_x_kk(op: u16, vx: Vx, byte: Val) -> u16 {
    (op << 12) | (((vx & 0xF) as u16) << 8) | byte as u16
}

fn op_x_y_n(op: u16, vx: Vx, vy: Vx, n: Val) -> u16 {
    (op << 12) | (((vx & 0xF) as u16) << 8) | (((vy & 0xF) as u16) << 4) | (n as u16 & 0xF)
}

fn as_addr(instr: u16) -> Addr {
    instr & 0x0FFF
}

fn as_val(instr: u16) -> Val {
    (instr & 0x00FF) as Val
}

fn as_small_val(instr: u16) -> Val {
    (instr & 0x000F) as Val
}

fn as_vx(instr: u16) -> Vx {
    (instr & 0x0F00) as Vx >> 8
}

fn as_vy(instr: u16) -> Vx {
    (instr & 0x00F0) as Vx >> 4
}

#[cfg(test)]
mod tests {
    use crate::emu::Instruction;

    #[test]
    fn test_from_bin() {
        assert_eq!(
            Instruction::decode(0x00E0).unwrap(),
            Instruction::DisplayClear
        );
        assert_eq!(
            Instruction::decode(0xD12F).unwrap(),
            Instruction::Disp(1, 2, 0xF)
        );
        assert_eq!(
            Instruction::decode(0x00C3).unwrap(),
            Instruction::ScrollDown(3)
        );
    }

    #[test]
    fn test_from_to_bin() {
        // CLS
        assert_eq!(Instruction::decode(0x00E0).unwrap().to_bin(), 0x00E0);
        // LD V1, 0x00
        assert_eq!(Instruction::decode(0x6100).unwrap().to_bin(), 0x6100);
        // DRAW V0, V0, 0
        assert_eq!(Instruction::decode(0xD000).unwrap().to_bin(), 0xD000);
        // JP addr
        assert_eq!(Instruction::decode(0x1999).unwrap().to_bin(), 0x1999);
        // JP V0, addr
        assert_eq!(Instruction::decode(0xB999).unwrap().to_bin(), 0xB999);
        // LD I, 0xFFF
        assert_eq!(Instruction::decode(0xAFFF).unwrap().to_bin(), 0xAFFF);
        // RND keeps its own opcode
        assert_eq!(Instruction::decode(0xC3F0).unwrap().to_bin(), 0xC3F0);
        // SHR keeps the source register
        assert_eq!(Instruction::decode(0x8126).unwrap().to_bin(), 0x8126);
    }

    #[test]
    fn test_every_decodable_word_round_trips() {
        let mut decoded = 0;
        for word in 0..=0xFFFFu16 {
            if let Ok(inst) = Instruction::decode(word) {
                assert_eq!(inst.to_bin(), word, "{:04X} -> {:?}", word, inst);
                decoded += 1;
            }
        }
        assert!(decoded > 30_000);
    }

    #[test]
    fn test_strict_decoding() {
        assert!(Instruction::decode(0x0000).is_err());
        assert!(Instruction::decode(0x01E0).is_err());
        assert!(Instruction::decode(0x5121).is_err());
        assert!(Instruction::decode(0x9121).is_err());
        assert!(Instruction::decode(0x8128).is_err());
        assert!(Instruction::decode(0xE19F).is_err());
        assert!(Instruction::decode(0xF131).is_err());
    }

    #[test]
    fn test_to_asm() {
        assert_eq!(Instruction::Call(0x200).to_asm(), "CALL #200");
        assert_eq!(Instruction::Set(1, 0x30).to_asm(), "LD V1, #30");
        assert_eq!(Instruction::DisplayClear.to_asm(), "CLS");
        assert_eq!(Instruction::Or(1, 2).to_asm(), "OR V1, V2");
        assert_eq!(
            Instruction::Jump(0x204).to_asm_with(|a| format!("LBL{:04X}", a)),
            "JP V0, LBL0204"
        );
    }

    #[test]
    fn test_target() {
        assert_eq!(Instruction::GoTo(0x300).target(), Some(0x300));
        assert_eq!(Instruction::SetAddr(0x050).target(), Some(0x050));
        assert_eq!(Instruction::Set(0, 1).target(), None);
    }
}
