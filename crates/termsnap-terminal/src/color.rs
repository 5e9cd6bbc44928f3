//! ANSI color resolution
//!
//! Maps 4-bit, 8-bit and 24-bit color selectors to concrete RGB values.

use crate::TerminalError;

/// An opaque 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiply every channel by `factor`, truncating toward zero
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |c: u8| (f32::from(c) * factor) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// The 16 standard and bright colors, indexed 0-15
pub const ANSI_PALETTE: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(205, 49, 49),
    Rgb::new(13, 188, 121),
    Rgb::new(229, 229, 16),
    Rgb::new(36, 114, 200),
    Rgb::new(188, 63, 188),
    Rgb::new(17, 168, 205),
    Rgb::new(229, 229, 229),
    Rgb::new(102, 102, 102),
    Rgb::new(241, 76, 76),
    Rgb::new(35, 209, 139),
    Rgb::new(245, 245, 67),
    Rgb::new(59, 142, 234),
    Rgb::new(214, 112, 214),
    Rgb::new(41, 184, 219),
    Rgb::new(255, 255, 255),
];

const CUBE_STEP: u8 = 51;

/// Resolve an 8-bit palette index
pub fn resolve_indexed(index: u32) -> Result<Rgb, TerminalError> {
    let i = u8::try_from(index).map_err(|_| TerminalError::InvalidColorIndex(index))?;

    Ok(match i {
        0..=15 => ANSI_PALETTE[usize::from(i)],
        16..=231 => {
            let i = i - 16;
            Rgb::new(
                (i / 36) * CUBE_STEP,
                ((i / 6) % 6) * CUBE_STEP,
                (i % 6) * CUBE_STEP,
            )
        }
        232..=255 => {
            let gray = (i - 232) * 10 + 8;
            Rgb::new(gray, gray, gray)
        }
    })
}

/// Resolve a 24-bit color given as raw sequence parameters
pub fn resolve_truecolor(r: u32, g: u32, b: u32) -> Result<Rgb, TerminalError> {
    let channel = |v: u32| u8::try_from(v).map_err(|_| TerminalError::InvalidColorComponent(v));
    Ok(Rgb::new(channel(r)?, channel(g)?, channel(b)?))
}

/// Color for an SGR foreground code in `30..=37` or `90..=97`
pub fn basic_color(code: u32) -> Option<Rgb> {
    match code {
        30..=37 => Some(ANSI_PALETTE[(code - 30) as usize]),
        90..=97 => Some(ANSI_PALETTE[(code - 90 + 8) as usize]),
        _ => None,
    }
}
