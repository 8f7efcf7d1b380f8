pub mod asm;
pub mod disasm;
pub mod emu;
pub mod error;

pub use crate::disasm::disassemble;
use crate::error::Result;

/// Assembles a whole source file into an image loadable at 0x200.
pub fn compile(source: &str) -> Result<Vec<u8>> {
    let mut statements = asm::parse(source);
    Ok(asm::assemble(&mut statements)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse() {
        let code = "\tLD V0, #01 ; 6001\n\tCLS ; 00E0\n\tDRAW V0, V1, 5 ; D015\n\tRET ; 00EE";
        let tokens = compile(code).unwrap();
        let res = disassemble(&tokens).unwrap();
        assert_eq!(res, code);
    }
}
