use wasm_bindgen::prelude::*;

use chipo::compile as chipo_compile;
use chipo::disassemble as chipo_disassemble;
use chipo::emu::{Keycode, Proc, ProgramState};
use chipo::error::ChipoError;

/// Machine handle passed to the `*_emulator` functions from JavaScript.
#[wasm_bindgen]
pub struct Emulator {
    proc: Proc,
}

fn convert_err(err: ChipoError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub fn new_emulator(code: &[u8]) -> Result<Emulator, JsValue> {
    Ok(Emulator {
        proc: Proc::binary(code).map_err(convert_err)?,
    })
}

#[wasm_bindgen]
pub fn reset_emulator(emu: &mut Emulator, code: &[u8]) -> Result<(), JsValue> {
    emu.proc.reset(Some(code)).map_err(convert_err)
}

/// Returns 0 while running, "wait" while blocked on a key, or the status
/// message when the program exits or reaches a breakpoint. Faults are
/// thrown.
#[wasm_bindgen]
pub fn step_emulator(emu: &mut Emulator) -> Result<JsValue, JsValue> {
    match emu.proc.step().map_err(convert_err)? {
        ProgramState::Continue => Ok(JsValue::from(0)),
        ProgramState::WaitingForKey => Ok(JsValue::from("wait")),
        state => Ok(JsValue::from(state.to_string())),
    }
}

#[wasm_bindgen]
pub fn tick_emulator(emu: &mut Emulator) {
    emu.proc.tick();
}

#[wasm_bindgen]
pub fn add_breakpoint_emulator(emu: &mut Emulator, addr: u16) {
    emu.proc.add_breakpoint(addr);
}

#[wasm_bindgen]
pub fn remove_breakpoint_emulator(emu: &mut Emulator, addr: u16) -> bool {
    emu.proc.remove_breakpoint(addr)
}

#[wasm_bindgen]
pub fn pc_emulator(emu: &Emulator) -> u16 {
    emu.proc.pc()
}

#[wasm_bindgen]
pub fn registers_emulator(emu: &Emulator) -> Vec<u8> {
    emu.proc.registers().to_vec()
}

#[wasm_bindgen]
pub fn display_width_emulator(emu: &Emulator) -> usize {
    emu.proc.frontend().width()
}

/// Copies the frame buffer, one byte per pixel, into `pixels`.
#[wasm_bindgen]
pub fn get_display_buffer_emulator(emu: &Emulator, pixels: &mut [u8]) {
    for (pixel, &lit) in pixels.iter_mut().zip(emu.proc.frontend().pixels()) {
        *pixel = lit as u8;
    }
}

#[wasm_bindgen]
pub fn should_buzz(emu: &Emulator) -> bool {
    emu.proc.frontend().is_buzzing()
}

fn match_keycode(val: &str) -> Keycode {
    match val {
        "digit1" => Keycode::Num1,
        "digit2" => Keycode::Num2,
        "digit3" => Keycode::Num3,
        "digit4" => Keycode::Num4,
        "keyq" => Keycode::Q,
        "keyw" => Keycode::W,
        "keye" => Keycode::E,
        "keyr" => Keycode::R,
        "keya" => Keycode::A,
        "keys" => Keycode::S,
        "keyd" => Keycode::D,
        "keyf" => Keycode::F,
        "keyz" => Keycode::Z,
        "keyx" => Keycode::X,
        "keyc" => Keycode::C,
        "keyv" => Keycode::V,
        _ => Keycode::Other,
    }
}

#[wasm_bindgen]
pub fn set_key_up_emulator(emu: &mut Emulator, key: &str) {
    emu.proc.frontend_mut().set_key_up(match_keycode(key));
}

#[wasm_bindgen]
pub fn set_key_down_emulator(emu: &mut Emulator, key: &str) {
    emu.proc.frontend_mut().set_key_down(match_keycode(key));
}

#[wasm_bindgen]
pub fn compile(code: &str, slice: &mut [u8]) -> Result<usize, JsValue> {
    let code = chipo_compile(code).map_err(convert_err)?;
    if code.len() > slice.len() {
        return Err(JsValue::from_str("output buffer is too small"));
    }
    slice[..code.len()].copy_from_slice(&code);
    Ok(code.len())
}

#[wasm_bindgen]
pub fn disassemble(code: &[u8]) -> Result<String, JsValue> {
    chipo_disassemble(code).map_err(convert_err)
}
