mod media;

use std::thread;
use std::time::{Duration, Instant};

use sdl2::event::Event;
use sdl2::keyboard::Keycode as SDLKeycode;
use tracing::{debug, info};

use chipo::{
    emu::{Addr, Keycode, Proc, ProgramState},
    error::{ChipoError, Result},
};

use crate::media::screen;

pub const DEFAULT_INSTRUCTIONS_PER_TICK: usize = 20;
pub const MIN_INSTRUCTIONS_PER_TICK: usize = 10;
pub const MAX_INSTRUCTIONS_PER_TICK: usize = 1000;

const TICK: Duration = Duration::from_micros(1_000_000 / 60);

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Instructions executed between two timer ticks.
    pub instructions_per_tick: usize,
    /// Size in window pixels of one 128x64 mode pixel.
    pub scale: u32,
    pub breakpoints: Vec<Addr>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            instructions_per_tick: DEFAULT_INSTRUCTIONS_PER_TICK,
            scale: 5,
            breakpoints: vec![],
        }
    }
}

fn sdl_into_chipo(kc: SDLKeycode) -> Keycode {
    match kc {
        SDLKeycode::Num1 => Keycode::Num1,
        SDLKeycode::Num2 => Keycode::Num2,
        SDLKeycode::Num3 => Keycode::Num3,
        SDLKeycode::Num4 => Keycode::Num4,
        SDLKeycode::Q => Keycode::Q,
        SDLKeycode::W => Keycode::W,
        SDLKeycode::E => Keycode::E,
        SDLKeycode::R => Keycode::R,
        SDLKeycode::A => Keycode::A,
        SDLKeycode::S => Keycode::S,
        SDLKeycode::D => Keycode::D,
        SDLKeycode::F => Keycode::F,
        SDLKeycode::Z => Keycode::Z,
        SDLKeycode::X => Keycode::X,
        SDLKeycode::C => Keycode::C,
        SDLKeycode::V => Keycode::V,
        _ => Keycode::Other,
    }
}

/// Runs `blob` in a window until it exits, hits a breakpoint or the window
/// is closed. Returns the state the machine stopped in, `Continue` when
/// the user quit.
pub fn run(blob: &[u8], config: &RunConfig) -> Result<ProgramState> {
    let (mut canvas, mut event_pump) = screen::init(config.scale).map_err(ChipoError::Frontend)?;
    let mut proc = Proc::binary(blob)?;
    for &addr in config.breakpoints.iter() {
        proc.add_breakpoint(addr);
    }
    let per_tick = config
        .instructions_per_tick
        .max(MIN_INSTRUCTIONS_PER_TICK)
        .min(MAX_INSTRUCTIONS_PER_TICK);
    debug!(per_tick, scale = config.scale, "starting");

    let mut buzzing = false;
    let mut last_update = Instant::now();
    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(SDLKeycode::Escape),
                    ..
                } => break 'running,
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => proc.frontend_mut().set_key_down(sdl_into_chipo(keycode)),
                Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => proc.frontend_mut().set_key_up(sdl_into_chipo(keycode)),
                _ => {}
            }
        }

        let elapsed = last_update.elapsed();
        if elapsed < TICK {
            thread::sleep(TICK - elapsed);
            continue;
        }
        last_update = Instant::now();

        for _ in 0..per_tick {
            let state = proc.step()?;
            if state.is_stop() {
                info!(i = proc.i(), registers = ?proc.registers(), "{}", state);
                return Ok(state);
            }
            if state == ProgramState::WaitingForKey {
                break;
            }
        }
        proc.tick();

        if proc.should_buzz() != buzzing {
            buzzing = !buzzing;
            info!(buzzing, "sound");
        }
        if proc.frontend().should_render {
            proc.frontend_mut().should_render = false;
            screen::draw(&mut canvas, proc.frontend(), config.scale).map_err(ChipoError::Frontend)?;
        }
    }
    Ok(ProgramState::Continue)
}
