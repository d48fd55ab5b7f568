// THEORY:
// A `Chunk` is the rectangular sampling region inside one grid cell. Averaging the
// region before classifying cancels sensor noise and the odd specular glint on a
// sticker, so a single cell reading reflects the sticker rather than one pixel.
//
// Averaging happens on the raw RGB channels. Averaging hue directly would tear red
// samples apart, since red sits on both ends of the hue circle.

pub mod chunk {
    use crate::core_modules::pixel::pixel::Pixel;
    use image::RgbaImage;

    /// A rectangle in frame pixel coordinates. `x1`/`y1` are exclusive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Region {
        pub x0: u32,
        pub y0: u32,
        pub x1: u32,
        pub y1: u32,
    }

    impl Region {
        pub fn width(&self) -> u32 {
            self.x1.saturating_sub(self.x0)
        }

        pub fn height(&self) -> u32 {
            self.y1.saturating_sub(self.y0)
        }

        pub fn is_empty(&self) -> bool {
            self.width() == 0 || self.height() == 0
        }
    }

    /// A block of pixels lifted out of a frame.
    pub struct Chunk {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<Pixel>,
    }

    impl Chunk {
        pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
            Self {
                width,
                height,
                pixels,
            }
        }

        /// Copies `region` out of an RGBA frame buffer, clipped to the frame bounds.
        pub fn extract(frame: &RgbaImage, region: Region) -> Self {
            let image_width = frame.width();
            let x1 = region.x1.min(image_width);
            let y1 = region.y1.min(frame.height());
            let x0 = region.x0.min(x1);
            let y0 = region.y0.min(y1);
            let width = x1 - x0;
            let height = y1 - y0;

            let buffer = frame.as_raw();
            let mut pixels = Vec::with_capacity((width * height) as usize);
            for pixel_y in y0..y1 {
                let row_start = ((pixel_y * image_width + x0) * 4) as usize;
                let row_end = row_start + (width * 4) as usize;
                for bytes in buffer[row_start..row_end].chunks_exact(4) {
                    pixels.push(Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3]));
                }
            }

            Chunk::new(width, height, pixels)
        }

        pub fn is_empty(&self) -> bool {
            self.pixels.is_empty()
        }

        /// Average pixel of the chunk, or `None` when it holds no pixels.
        pub fn average_pixel(&self) -> Option<Pixel> {
            let num_pixels = self.pixels.len() as u64;
            if num_pixels == 0 {
                return None;
            }

            let mut sum_r = 0u64;
            let mut sum_g = 0u64;
            let mut sum_b = 0u64;
            let mut sum_a = 0u64;
            for pixel in &self.pixels {
                sum_r += pixel.red as u64;
                sum_g += pixel.green as u64;
                sum_b += pixel.blue as u64;
                sum_a += pixel.alpha as u64;
            }

            Some(Pixel {
                red: (sum_r / num_pixels) as u8,
                green: (sum_g / num_pixels) as u8,
                blue: (sum_b / num_pixels) as u8,
                alpha: (sum_a / num_pixels) as u8,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::chunk::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use image::{Rgba, RgbaImage};

    #[test]
    fn average_of_two_tone_region() {
        let mut frame = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]));
        for y in 0..2 {
            for x in 2..4 {
                frame.put_pixel(x, y, Rgba([200, 100, 50, 255]));
            }
        }
        let chunk = Chunk::extract(
            &frame,
            Region {
                x0: 0,
                y0: 0,
                x1: 4,
                y1: 2,
            },
        );
        assert_eq!(chunk.pixels.len(), 8);
        assert_eq!(chunk.average_pixel(), Some(Pixel::new(100, 50, 25, 255)));
    }

    #[test]
    fn extraction_is_clipped_to_the_frame() {
        let frame = RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 255]));
        let chunk = Chunk::extract(
            &frame,
            Region {
                x0: 8,
                y0: 8,
                x1: 20,
                y1: 20,
            },
        );
        assert_eq!((chunk.width, chunk.height), (2, 2));
        assert_eq!(chunk.pixels.len(), 4);
    }

    #[test]
    fn region_outside_frame_is_empty() {
        let frame = RgbaImage::new(10, 10);
        let chunk = Chunk::extract(
            &frame,
            Region {
                x0: 30,
                y0: 30,
                x1: 40,
                y1: 40,
            },
        );
        assert!(chunk.is_empty());
        assert_eq!(chunk.average_pixel(), None);
    }
}
