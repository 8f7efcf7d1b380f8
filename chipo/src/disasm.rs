use std::collections::BTreeSet;

use tracing::debug;

use crate::emu::{Addr, Instruction, MAX_IMAGE_LEN, PROGRAM_START};
use crate::error::{ChipoError, Result};

fn label(addr: Addr) -> String {
    format!("LBL{:04X}", addr)
}

/// Turns an image loaded at `PROGRAM_START` back into assembler source.
///
/// Bytes that do not start a valid instruction come out one at a time as
/// `DB`. Jump, call and `LD I` targets get labels; targets that do not land
/// on a decoded line are defined with `EQU` ahead of the code.
pub fn disassemble(image: &[u8]) -> Result<String> {
    if image.len() > MAX_IMAGE_LEN {
        return Err(ChipoError::ImageTooLarge(image.len()));
    }

    let mut lines: Vec<(Addr, String)> = Vec::with_capacity(image.len() / 2);
    let mut targets = BTreeSet::new();
    let mut at = 0;
    while at < image.len() {
        let addr = PROGRAM_START + at as Addr;
        if let Some(pair) = image.get(at..at + 2) {
            let word = ((pair[0] as u16) << 8) | pair[1] as u16;
            if let Ok(inst) = Instruction::decode(word) {
                if let Some(target) = inst.target() {
                    targets.insert(target);
                }
                lines.push((addr, format!("\t{} ; {:04X}", inst.to_asm_with(label), word)));
                at += 2;
                continue;
            }
        }
        lines.push((addr, format!("\tDB #{:02X}", image[at])));
        at += 1;
    }

    let mut unmatched = vec![];
    for target in targets {
        match lines.binary_search_by_key(&target, |(addr, _)| *addr) {
            Ok(index) => {
                let line = &mut lines[index].1;
                *line = format!("{}: {}", label(target), &line[1..]);
            }
            Err(_) => unmatched.push(format!(
                "{} EQU #{:04X} ; unmatched label",
                label(target),
                target
            )),
        }
    }
    debug!(lines = lines.len(), unmatched = unmatched.len(), "disassembled");

    Ok(unmatched
        .into_iter()
        .chain(lines.into_iter().map(|(_, line)| line))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions() {
        let text = disassemble(&[0x63, 0x21, 0x00, 0xFD]).unwrap();
        assert_eq!(text, "\tLD V3, #21 ; 6321\n\tEXIT ; 00FD");
    }

    #[test]
    fn test_labels() {
        let text = disassemble(&[0x22, 0x04, 0x12, 0x00, 0x00, 0xEE]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "LBL0200: CALL LBL0204 ; 2204",
                "\tJP LBL0200 ; 1200",
                "LBL0204: RET ; 00EE",
            ]
        );
    }

    #[test]
    fn test_unmatched_labels() {
        let text = disassemble(&[0xA0, 0x50, 0x12, 0x03, 0x00, 0xE0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "LBL0050 EQU #0050 ; unmatched label");
        assert_eq!(lines[1], "LBL0203 EQU #0203 ; unmatched label");
        assert_eq!(lines[2], "\tLD I, LBL0050 ; A050");
    }

    #[test]
    fn test_undecodable_bytes() {
        let text = disassemble(&[0xFF, 0x00, 0xE0, 0x7F]).unwrap();
        assert_eq!(text, "\tDB #FF\n\tCLS ; 00E0\n\tDB #7F");
    }

    #[test]
    fn test_too_large() {
        assert!(disassemble(&vec![0; MAX_IMAGE_LEN + 1]).is_err());
        assert!(disassemble(&[]).unwrap().is_empty());
    }
}
