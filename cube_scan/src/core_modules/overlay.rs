// THEORY:
// The annotated preview needs two kinds of marks: cell outlines and short uppercase
// labels (a color letter per cell, one instruction line per frame). Outlines go
// through `imageproc`. Labels use a built-in 5x7 bitmap font instead of
// `imageproc::drawing::draw_text_mut`, which needs a TrueType font loaded from a file
// or embedded in the binary. Every glyph is seven rows of five bits, MSB left.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;

pub const OK_OUTLINE: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const UNKNOWN_OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BANNER_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);

fn glyph(c: char) -> [u8; 7] {
    match c {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ' ' => [0; 7],
        _ => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
    }
}

/// Width in pixels of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let count = text.chars().count() as u32;
    if count == 0 {
        return 0;
    }
    (count * (GLYPH_WIDTH + GLYPH_SPACING) - GLYPH_SPACING) * scale
}

/// Renders `text` with its top-left corner at (`x`, `y`). Lowercase is drawn as
/// uppercase; anything outside the frame is clipped.
pub fn draw_text(frame: &mut RgbaImage, text: &str, x: i32, y: i32, scale: u32, color: Rgba<u8>) {
    let scale = scale.max(1);
    let advance = ((GLYPH_WIDTH + GLYPH_SPACING) * scale) as i32;
    for (index, c) in text.chars().enumerate() {
        let rows = glyph(c.to_ascii_uppercase());
        let origin_x = x + index as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                    continue;
                }
                let px = origin_x + (column * scale) as i32;
                let py = y + (row as u32 * scale) as i32;
                draw_filled_rect_mut(frame, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

/// Draws a rectangle outline `thickness` pixels wide, growing inwards.
pub fn draw_outline(frame: &mut RgbaImage, x: i32, y: i32, size: u32, thickness: u32, color: Rgba<u8>) {
    for inset in 0..thickness {
        let side = size.saturating_sub(inset * 2);
        if side == 0 {
            break;
        }
        let offset = inset as i32;
        draw_hollow_rect_mut(frame, Rect::at(x + offset, y + offset).of_size(side, side), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_accounts_for_spacing() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("W", 1), 5);
        assert_eq!(text_width("UP", 3), (5 + 1 + 5) * 3);
    }

    #[test]
    fn glyph_pixels_are_painted() {
        let mut frame = RgbaImage::new(20, 20);
        draw_text(&mut frame, "i", 0, 0, 1, LABEL_COLOR);
        // Top row of 'I' is 01110.
        assert_eq!(*frame.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*frame.get_pixel(1, 0), LABEL_COLOR);
        assert_eq!(*frame.get_pixel(3, 0), LABEL_COLOR);
        assert_eq!(*frame.get_pixel(4, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn drawing_off_frame_is_clipped() {
        let mut frame = RgbaImage::new(8, 8);
        draw_text(&mut frame, "SCAN COMPLETE!", -20, 4, 2, BANNER_COLOR);
        draw_outline(&mut frame, 4, 4, 30, 2, OK_OUTLINE);
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut frame = RgbaImage::new(20, 20);
        draw_outline(&mut frame, 2, 2, 10, 2, UNKNOWN_OUTLINE);
        assert_eq!(*frame.get_pixel(2, 2), UNKNOWN_OUTLINE);
        assert_eq!(*frame.get_pixel(3, 3), UNKNOWN_OUTLINE);
        assert_eq!(*frame.get_pixel(6, 6), Rgba([0, 0, 0, 0]));
    }
}
