mod instructions;
mod keycode;
mod proc;
mod screen;

pub use instructions::{Addr, Instruction, Val, Vx};
pub use keycode::Keycode;
pub use proc::{
    Fault, Proc, ProgramState, HIGH_FONT_BASE, LOW_FONT_BASE, MAX_CALL_DEPTH, MAX_IMAGE_LEN,
    MEMORY_SIZE, PROGRAM_START,
};
pub use screen::{Frontend, Screen, HIGH_RES, LOW_RES};
