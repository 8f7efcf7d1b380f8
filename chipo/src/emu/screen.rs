use crate::emu::Keycode;

pub const LOW_RES: (usize, usize) = (64, 32);
pub const HIGH_RES: (usize, usize) = (128, 64);

/// The display, keypad and tone generator a `Proc` drives.
///
/// Front ends either implement this directly or wrap the headless `Screen`.
pub trait Frontend {
    /// XOR-blits `sprite` at (`x`, `y`), wrapping at the screen edges.
    /// A 32-byte sprite is drawn as 16x16. Returns true if any lit pixel
    /// was erased.
    fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool;
    fn clear(&mut self);
    fn scroll_up(&mut self, rows: usize);
    fn scroll_down(&mut self, rows: usize);
    fn scroll_left(&mut self, columns: usize);
    fn scroll_right(&mut self, columns: usize);
    /// Switches between 64x32 and 128x64. Clears the display.
    fn set_mode(&mut self, high_res: bool);
    fn key_currently_down(&self) -> Option<u8>;
    fn sound(&mut self, on: bool);
}

/// Headless frame buffer and keypad.
#[derive(Debug, Clone)]
pub struct Screen {
    pixels: Vec<bool>,
    high_res: bool,
    keys: [bool; 16],
    buzzing: bool,
    pub should_render: bool,
}

impl Default for Screen {
    fn default() -> Self {
        Screen {
            pixels: vec![false; LOW_RES.0 * LOW_RES.1],
            high_res: false,
            keys: [false; 16],
            buzzing: false,
            should_render: true,
        }
    }
}

impl Screen {
    pub fn width(&self) -> usize {
        self.dimensions().0
    }

    pub fn height(&self) -> usize {
        self.dimensions().1
    }

    pub fn is_high_res(&self) -> bool {
        self.high_res
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % self.height()) * self.width() + (x % self.width())]
    }

    /// Row-major pixels of the current mode.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    pub fn is_buzzing(&self) -> bool {
        self.buzzing
    }

    pub fn set_key_down(&mut self, keycode: Keycode) {
        if let Some(i) = keycode.key_index() {
            self.keys[i] = true;
        }
    }

    pub fn set_key_up(&mut self, keycode: Keycode) {
        if let Some(i) = keycode.key_index() {
            self.keys[i] = false;
        }
    }

    /// Presses or releases keypad key `key & 0xF` directly.
    pub fn set_key(&mut self, key: u8, down: bool) {
        self.keys[(key & 0xF) as usize] = down;
    }

    fn dimensions(&self) -> (usize, usize) {
        if self.high_res {
            HIGH_RES
        } else {
            LOW_RES
        }
    }

    fn flip(&mut self, x: usize, y: usize) -> bool {
        let location = y * self.width() + x;
        let erased = self.pixels[location];
        self.pixels[location] = !erased;
        erased
    }

    fn shift_rows(&mut self, rows: isize) {
        let (width, height) = self.dimensions();
        let old = self.pixels.clone();
        for y in 0..height {
            let src = y as isize - rows;
            for x in 0..width {
                self.pixels[y * width + x] = src >= 0
                    && (src as usize) < height
                    && old[src as usize * width + x];
            }
        }
        self.should_render = true;
    }

    fn shift_columns(&mut self, columns: isize) {
        let (width, height) = self.dimensions();
        let old = self.pixels.clone();
        for y in 0..height {
            for x in 0..width {
                let src = x as isize - columns;
                self.pixels[y * width + x] =
                    src >= 0 && (src as usize) < width && old[y * width + src as usize];
            }
        }
        self.should_render = true;
    }
}

impl Frontend for Screen {
    fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let (width, height) = self.dimensions();
        let rows: Vec<(u16, usize)> = if sprite.len() == 32 {
            sprite
                .chunks(2)
                .map(|pair| (((pair[0] as u16) << 8) | pair[1] as u16, 16))
                .collect()
        } else {
            sprite.iter().map(|&b| (b as u16, 8)).collect()
        };

        let mut hit = false;
        for (dy, (bits, span)) in rows.into_iter().enumerate() {
            let py = (y as usize + dy) % height;
            for dx in 0..span {
                if bits >> (span - 1 - dx) & 1 == 1 {
                    let px = (x as usize + dx) % width;
                    hit |= self.flip(px, py);
                }
            }
        }
        self.should_render = true;
        hit
    }

    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = false);
        self.should_render = true;
    }

    fn scroll_up(&mut self, rows: usize) {
        self.shift_rows(-(rows as isize));
    }

    fn scroll_down(&mut self, rows: usize) {
        self.shift_rows(rows as isize);
    }

    fn scroll_left(&mut self, columns: usize) {
        self.shift_columns(-(columns as isize));
    }

    fn scroll_right(&mut self, columns: usize) {
        self.shift_columns(columns as isize);
    }

    fn set_mode(&mut self, high_res: bool) {
        self.high_res = high_res;
        let (width, height) = self.dimensions();
        self.pixels = vec![false; width * height];
        self.should_render = true;
    }

    fn key_currently_down(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|k| k as u8)
    }

    fn sound(&mut self, on: bool) {
        self.buzzing = on;
    }
}
