use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::WindowCanvas;
use sdl2::EventPump;

use chipo::emu::{Screen, HIGH_RES};

/// Opens a window large enough for the 128x64 mode with `scale` sized pixels.
pub fn init(scale: u32) -> Result<(WindowCanvas, EventPump), String> {
    let context = sdl2::init()?;
    let video_subsystem = context.video()?;
    let window = video_subsystem
        .window(
            "chipo",
            HIGH_RES.0 as u32 * scale,
            HIGH_RES.1 as u32 * scale,
        )
        .position_centered()
        .build()
        .map_err(|err| err.to_string())?;
    let mut canvas = window
        .into_canvas()
        .build()
        .map_err(|err| err.to_string())?;
    clear(&mut canvas);
    canvas.present();
    let event_pump = context.event_pump()?;
    Ok((canvas, event_pump))
}

pub fn clear(canvas: &mut WindowCanvas) {
    canvas.set_draw_color(background_color());
    canvas.clear();
    canvas.set_draw_color(foreground_color());
}

/// Redraws the whole frame buffer. Low resolution pixels are twice as big.
pub fn draw(canvas: &mut WindowCanvas, screen: &Screen, scale: u32) -> Result<(), String> {
    let size = scale * (HIGH_RES.0 / screen.width()) as u32;
    let width = screen.width();
    let rects: Vec<Rect> = screen
        .pixels()
        .iter()
        .enumerate()
        .filter(|&(_, &lit)| lit)
        .map(|(pos, _)| {
            Rect::new(
                (pos % width) as i32 * size as i32,
                (pos / width) as i32 * size as i32,
                size,
                size,
            )
        })
        .collect();

    clear(canvas);
    canvas.fill_rects(&rects)?;
    canvas.present();
    Ok(())
}

fn foreground_color() -> Color {
    Color::RGB(38, 84, 124)
}

fn background_color() -> Color {
    Color::RGB(252, 252, 252)
}
