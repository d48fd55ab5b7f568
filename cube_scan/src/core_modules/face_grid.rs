// THEORY:
// The `FaceGridSampler` is the bridge between a raw frame and the nine facelet
// readings of one cube face. It lays a fixed 3x3 grid of square cells over the
// middle of the frame, independent of the frame's resolution: the user aligns the
// cube with the grid, not the grid with the cube.
//
// For every cell, in row-major order (row 0 on top):
// 1.  **Inset**: the sampling region shrinks by a fixed margin on every side so the
//     dark plastic between stickers and lens vignetting near the cell edge never
//     leak into the average.
// 2.  **Average**: the region collapses into one `Pixel` via `Chunk::average_pixel`.
// 3.  **Classify**: the average goes through the `ColorClassifier`.
// 4.  **Annotate**: the cell outline is drawn green (ok) or red (unknown) and the
//     classified letter is drawn inside it. Annotation always happens, whether or not
//     the caller wants the readings, because the live preview relies on it.

use crate::core_modules::chunk::chunk::{Chunk, Region};
use crate::core_modules::color_classifier::{ColorClassifier, ColorCode};
use crate::core_modules::overlay::{
    self, GLYPH_HEIGHT, LABEL_COLOR, OK_OUTLINE, UNKNOWN_OUTLINE,
};
use image::RgbaImage;

/// Number of cells along one side of a face.
pub const GRID_SIDE: u32 = 3;
/// Number of facelets on one face.
pub const FACELETS: usize = 9;
/// Row-major index of the centerpiece.
pub const CENTER_INDEX: usize = 4;

const OUTLINE_THICKNESS: u32 = 2;
const LABEL_SCALE: u32 = 3;

/// Nine raw cell readings, row-major. May contain `Unknown`.
pub type FaceReading = [ColorCode; FACELETS];

/// Placement of one grid cell on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Left edge of the cell, possibly negative on frames smaller than the grid.
    pub x: i32,
    pub y: i32,
    pub size: u32,
    /// The inset sampling region, clipped to the frame.
    pub sample: Region,
}

/// Samples the 3x3 facelet grid centered on a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGridSampler {
    /// Edge length of one cell in pixels.
    pub cell_size: u32,
    /// Margin removed from each cell edge before sampling.
    pub inset: u32,
    pub classifier: ColorClassifier,
}

impl Default for FaceGridSampler {
    fn default() -> Self {
        Self {
            cell_size: 60,
            inset: 10,
            classifier: ColorClassifier::default(),
        }
    }
}

impl FaceGridSampler {
    pub fn new(cell_size: u32, inset: u32, classifier: ColorClassifier) -> Self {
        Self {
            cell_size,
            inset,
            classifier,
        }
    }

    /// Lays out the nine cells for a frame of the given size.
    pub fn cells(&self, image_width: u32, image_height: u32) -> [Cell; FACELETS] {
        let center_x = (image_width / 2) as i32;
        let center_y = (image_height / 2) as i32;
        let step = self.cell_size as i32;
        let start_x = center_x - step * 3 / 2;
        let start_y = center_y - step * 3 / 2;
        let inset = self.inset as i32;

        std::array::from_fn(|cell_index| {
            let row = (cell_index as u32 / GRID_SIDE) as i32;
            let column = (cell_index as u32 % GRID_SIDE) as i32;
            let x = start_x + column * step;
            let y = start_y + row * step;

            let clamp_x = |v: i32| v.clamp(0, image_width as i32) as u32;
            let clamp_y = |v: i32| v.clamp(0, image_height as i32) as u32;
            let sample = Region {
                x0: clamp_x(x + inset),
                y0: clamp_y(y + inset),
                x1: clamp_x((x + step - inset).max(x + inset)),
                y1: clamp_y((y + step - inset).max(y + inset)),
            };

            Cell {
                x,
                y,
                size: self.cell_size,
                sample,
            }
        })
    }

    /// Classifies the nine cells without touching the frame.
    pub fn read(&self, frame: &RgbaImage) -> FaceReading {
        let cells = self.cells(frame.width(), frame.height());
        cells.map(|cell| {
            Chunk::extract(frame, cell.sample)
                .average_pixel()
                .map(|average| self.classifier.classify(average.to_hsv()))
                .unwrap_or(ColorCode::Unknown)
        })
    }

    /// Annotates `frame` in place and, when `extract` is set, returns the nine codes
    /// in row-major order. Without `extract` the returned list is empty.
    pub fn sample(&self, frame: &mut RgbaImage, extract: bool) -> Vec<ColorCode> {
        let reading = self.read(frame);
        let cells = self.cells(frame.width(), frame.height());

        for (cell, code) in cells.iter().zip(reading.iter()) {
            let outline = if code.is_known() {
                OK_OUTLINE
            } else {
                UNKNOWN_OUTLINE
            };
            overlay::draw_outline(frame, cell.x, cell.y, cell.size, OUTLINE_THICKNESS, outline);

            let label = code.letter().to_string();
            let label_x = cell.x + (cell.size as i32 - overlay::text_width(&label, LABEL_SCALE) as i32) / 2;
            let label_y = cell.y + (cell.size as i32 - (GLYPH_HEIGHT * LABEL_SCALE) as i32) / 2;
            overlay::draw_text(frame, &label, label_x, label_y, LABEL_SCALE, LABEL_COLOR);
        }

        if extract {
            reading.to_vec()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use super::*;
    use image::Rgba;

    /// An RGB value that classifies as `code` under the default classifier.
    pub fn paint_for(code: ColorCode) -> Rgba<u8> {
        match code {
            ColorCode::White => Rgba([235, 235, 230, 255]),
            ColorCode::Yellow => Rgba([240, 220, 20, 255]),
            ColorCode::Green => Rgba([20, 180, 60, 255]),
            ColorCode::Blue => Rgba([20, 60, 200, 255]),
            ColorCode::Orange => Rgba([250, 120, 10, 255]),
            ColorCode::Red => Rgba([200, 15, 25, 255]),
            // Magenta sits in the hue gap between blue and red.
            ColorCode::Unknown => Rgba([200, 20, 200, 255]),
        }
    }

    /// A frame whose nine grid cells are filled with the given colors.
    pub fn painted_face(sampler: &FaceGridSampler, width: u32, height: u32, codes: &[ColorCode; 9]) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(width, height, Rgba([10, 10, 10, 255]));
        for (cell, code) in sampler.cells(width, height).iter().zip(codes) {
            let color = paint_for(*code);
            for y in cell.y.max(0)..(cell.y + cell.size as i32).min(height as i32) {
                for x in cell.x.max(0)..(cell.x + cell.size as i32).min(width as i32) {
                    frame.put_pixel(x as u32, y as u32, color);
                }
            }
        }
        frame
    }
}
