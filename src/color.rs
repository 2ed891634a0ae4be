use crate::error::{MapError, Result};
use macroquad::color::Color;

/// Parses a Tiled hex web color.
///
/// Accepts `#RRGGBB` and `#AARRGGBB` (Tiled puts alpha first), with or
/// without the leading `#`.
pub fn parse_hex_color(s: &str) -> Result<Color> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || MapError::InvalidColor(s.to_owned());

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

    match hex.len() {
        6 => Ok(Color::from_rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Ok(Color::from_rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
        _ => Err(invalid()),
    }
}

/// Converts a color to the RGBA8 layout used by `Image::bytes`.
#[inline]
pub(crate) fn to_rgba8(c: Color) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(c.r), q(c.g), q(c.b), q(c.a)]
}
