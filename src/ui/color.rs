use crate::game::note::{Column, NUM_COLUMNS};

/// Accepts "#rrggbb" or "#rrggbbaa" (the '#' is optional).
/// Panics on invalid input; use only with trusted literals.
/// Evaluated at COMPILE TIME if assigned to a const/static.
pub const fn rgba_hex(s: &str) -> [f32; 4] {
    let bytes = s.as_bytes();
    let (bytes, len) = if !bytes.is_empty() && bytes[0] == b'#' {
        let (_, rem) = bytes.split_at(1);
        (rem, s.len() - 1)
    } else {
        (bytes, s.len())
    };

    const fn val(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => 10 + (b - b'a'),
            b'A'..=b'F' => 10 + (b - b'A'),
            _ => panic!("invalid hex digit in color string"),
        }
    }

    const fn byte2(h: u8, l: u8) -> u8 {
        (val(h) << 4) | val(l)
    }

    let a = match len {
        6 => 0xFF,
        8 => byte2(bytes[6], bytes[7]),
        _ => panic!("color hex string must be 6 or 8 digits"),
    };
    let r = byte2(bytes[0], bytes[1]);
    let g = byte2(bytes[2], bytes[3]);
    let b = byte2(bytes[4], bytes[5]);

    [
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ]
}

pub const GREEN: [f32; 4] = rgba_hex("#00ff00");
pub const RED: [f32; 4] = rgba_hex("#ff0000");
pub const BLUE: [f32; 4] = rgba_hex("#0000ff");
pub const YELLOW: [f32; 4] = rgba_hex("#ffff00");

pub const COLUMN_COLORS: [[f32; 4]; NUM_COLUMNS] = [GREEN, RED, BLUE, YELLOW];
pub const COLUMN_COLOR_NAMES: [&str; NUM_COLUMNS] = ["green", "red", "blue", "yellow"];

#[inline(always)]
pub const fn column_color(column: Column) -> [f32; 4] {
    COLUMN_COLORS[column.index()]
}

#[inline(always)]
pub const fn column_color_name(column: Column) -> &'static str {
    COLUMN_COLOR_NAMES[column.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_handles_alpha() {
        assert_eq!(rgba_hex("ff0000"), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(rgba_hex("#00000000"), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn same_pitch_class_shares_color() {
        for pitch in 0..=127 {
            let a = Column::from_pitch(pitch);
            let b = Column::from_pitch(pitch + 4);
            assert_eq!(column_color(a), column_color(b), "pitch {pitch}");
        }
        assert_eq!(column_color_name(Column::from_pitch(64)), "green");
        assert_eq!(column_color_name(Column::from_pitch(67)), "yellow");
    }
}
