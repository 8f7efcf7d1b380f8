use std::io::Error as IOError;

use thiserror::Error;

use crate::asm::AssemblyError;
use crate::emu::Fault;

#[derive(Debug, Error)]
pub enum ChipoError {
    #[error("'{0}' is not a .s or .c8 file")]
    InvalidFile(String),
    #[error("OpCode 0x{0:04X} not known")]
    UnknownOpCodeErr(u16),
    #[error("image of {0} bytes does not fit in memory above 0x0200")]
    ImageTooLarge(usize),
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error("front end error: {0}")]
    Frontend(String),
    #[error("io error: {0}")]
    IOError(#[from] IOError),
}

pub type Result<T> = std::result::Result<T, ChipoError>;
