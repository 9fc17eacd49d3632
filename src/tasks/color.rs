use anyhow::Result;
use log::error;
use plotters::prelude::RGBColor;

pub static FONT_SIZE: i32 = 14;
pub static STROKE_WIDTH: u32 = 2;

/// Categorical palette the benchmark charts have always been drawn with.
pub fn get_color_from_label(label: &str) -> Result<RGBColor> {
    match label {
        "tab-blue" => Ok(RGBColor(0x1f, 0x77, 0xb4)),
        "tab-orange" => Ok(RGBColor(0xff, 0x7f, 0x0e)),
        "tab-green" => Ok(RGBColor(0x2c, 0xa0, 0x2c)),
        "tab-red" => Ok(RGBColor(0xd6, 0x27, 0x28)),
        "tab-purple" => Ok(RGBColor(0x94, 0x67, 0xbd)),
        "black" => Ok(RGBColor(0, 0, 0)),
        "grid-gray" => Ok(RGBColor(0xb0, 0xb0, 0xb0)),
        _ => {
            error!("unrecognized label for color (label={label})");
            anyhow::bail!("unrecognized label (label={label})");
        }
    }
}

/// Parse a `#rrggbb` color, as accepted in plot configuration files.
pub fn parse_hex_color(hex: &str) -> Result<RGBColor> {
    let digits = match hex.strip_prefix('#') {
        Some(digits) if digits.len() == 6 && digits.is_ascii() => digits,
        _ => {
            error!("malformed hex color (color={hex})");
            anyhow::bail!("malformed hex color, expected #rrggbb (color={hex})");
        }
    };

    let channel = |idx: usize| -> Result<u8> {
        u8::from_str_radix(&digits[idx..idx + 2], 16).map_err(|e| {
            let reason = format!("malformed hex color (color={hex}, error={e:?})");
            error!("{reason}");
            anyhow::anyhow!(reason)
        })
    };

    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}
