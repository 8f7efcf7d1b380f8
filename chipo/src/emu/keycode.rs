/// Physical keys a front end can forward to the emulated keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keycode {
    Num1,
    Num2,
    Num3,
    Num4,
    Q,
    W,
    E,
    R,
    A,
    S,
    D,
    F,
    Z,
    X,
    C,
    V,
    Other,
}

impl Keycode {
    /// Index of the hex keypad key this keyboard key stands for.
    pub fn key_index(self) -> Option<usize> {
        // From http://devernay.free.fr/hacks/chip8/C8TECH10.HTM#keyboard
        match self {
            Keycode::Num1 => Some(1),
            Keycode::Num2 => Some(2),
            Keycode::Num3 => Some(3),
            Keycode::Num4 => Some(0xC),
            Keycode::Q => Some(4),
            Keycode::W => Some(5),
            Keycode::E => Some(6),
            Keycode::R => Some(0xD),
            Keycode::A => Some(7),
            Keycode::S => Some(8),
            Keycode::D => Some(9),
            Keycode::F => Some(0xE),
            Keycode::Z => Some(0xA),
            Keycode::X => Some(0),
            Keycode::C => Some(0xB),
            Keycode::V => Some(0xF),
            Keycode::Other => None,
        }
    }
}
