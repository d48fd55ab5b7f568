// THEORY:
// The classifier turns one averaged HSV sample into one of the six sticker colors.
// It is a pure function with a fixed priority order:
//
// 1.  **Achromatic first**: a low-saturation sample is white. Webcams wash white
//     stickers into pale tints of whatever the ambient light is, so saturation is
//     the only reliable signal and hue is ignored entirely for these samples.
// 2.  **Hue bands**: every saturated sample falls into a hue band. Red straddles the
//     wrap-around of the hue circle, so it owns both ends of the scale.
// 3.  **No guessing**: a saturated hue outside every band (the magenta gap) is
//     `Unknown`. Downstream, `Unknown` rejects the whole face; it never becomes a
//     "closest" color.

use crate::core_modules::pixel::pixel::Hsv;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Saturation below which a sample is treated as white.
pub const WHITE_SATURATION_MAX: f32 = 60.0;

const ORANGE_HUE: (f32, f32) = (10.0, 22.0);
const YELLOW_HUE: (f32, f32) = (22.0, 38.0);
const GREEN_HUE: (f32, f32) = (38.0, 95.0);
const BLUE_HUE: (f32, f32) = (95.0, 130.0);
const RED_LOW_HUE_MAX: f32 = 10.0;
const RED_HIGH_HUE: (f32, f32) = (160.0, 180.0);

/// Categorical facelet color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorCode {
    #[serde(rename = "W")]
    White,
    #[serde(rename = "Y")]
    Yellow,
    #[serde(rename = "G")]
    Green,
    #[serde(rename = "B")]
    Blue,
    #[serde(rename = "O")]
    Orange,
    #[serde(rename = "R")]
    Red,
    /// Classification failed.
    #[serde(rename = "U")]
    Unknown,
}

impl ColorCode {
    /// The six sticker colors, without `Unknown`.
    pub const STICKERS: [ColorCode; 6] = [
        ColorCode::White,
        ColorCode::Yellow,
        ColorCode::Green,
        ColorCode::Blue,
        ColorCode::Orange,
        ColorCode::Red,
    ];

    pub fn letter(self) -> char {
        match self {
            ColorCode::White => 'W',
            ColorCode::Yellow => 'Y',
            ColorCode::Green => 'G',
            ColorCode::Blue => 'B',
            ColorCode::Orange => 'O',
            ColorCode::Red => 'R',
            ColorCode::Unknown => 'U',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'W' => Some(ColorCode::White),
            'Y' => Some(ColorCode::Yellow),
            'G' => Some(ColorCode::Green),
            'B' => Some(ColorCode::Blue),
            'O' => Some(ColorCode::Orange),
            'R' => Some(ColorCode::Red),
            'U' => Some(ColorCode::Unknown),
            _ => None,
        }
    }

    pub fn is_known(self) -> bool {
        self != ColorCode::Unknown
    }

    /// Display color used when annotating frames (RGB).
    pub fn swatch(self) -> [u8; 3] {
        match self {
            ColorCode::White => [255, 255, 255],
            ColorCode::Yellow => [255, 220, 0],
            ColorCode::Green => [0, 160, 60],
            ColorCode::Blue => [0, 70, 200],
            ColorCode::Orange => [255, 120, 0],
            ColorCode::Red => [200, 0, 0],
            ColorCode::Unknown => [128, 128, 128],
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorCode::White => "White",
            ColorCode::Yellow => "Yellow",
            ColorCode::Green => "Green",
            ColorCode::Blue => "Blue",
            ColorCode::Orange => "Orange",
            ColorCode::Red => "Red",
            ColorCode::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

fn in_band(hue: f32, (min, max): (f32, f32)) -> bool {
    hue >= min && hue < max
}

/// Hue-band classifier for averaged facelet samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorClassifier {
    /// When set, low-saturation samples darker than this value are `Unknown`
    /// instead of `White`.
    pub low_light_value_floor: Option<f32>,
}

impl ColorClassifier {
    pub fn new(low_light_value_floor: Option<f32>) -> Self {
        Self {
            low_light_value_floor,
        }
    }

    pub fn classify(&self, sample: Hsv) -> ColorCode {
        if sample.saturation < WHITE_SATURATION_MAX {
            return match self.low_light_value_floor {
                Some(floor) if sample.value < floor => ColorCode::Unknown,
                _ => ColorCode::White,
            };
        }

        let hue = sample.hue;
        if in_band(hue, ORANGE_HUE) {
            ColorCode::Orange
        } else if in_band(hue, YELLOW_HUE) {
            ColorCode::Yellow
        } else if in_band(hue, GREEN_HUE) {
            ColorCode::Green
        } else if in_band(hue, BLUE_HUE) {
            ColorCode::Blue
        } else if (0.0..RED_LOW_HUE_MAX).contains(&hue)
            || (RED_HIGH_HUE.0..=RED_HIGH_HUE.1).contains(&hue)
        {
            ColorCode::Red
        } else {
            ColorCode::Unknown
        }
    }
}

/// Classifies with the default settings.
pub fn classify(sample: Hsv) -> ColorCode {
    ColorClassifier::default().classify(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saturated(hue: f32) -> Hsv {
        Hsv::new(hue, 200.0, 200.0)
    }

    #[test]
    fn low_saturation_is_white_for_any_hue_or_value() {
        for hue in [0.0, 15.0, 30.0, 60.0, 115.0, 145.0, 170.0, 180.0] {
            for value in [0.0, 20.0, 100.0, 255.0] {
                for saturation in [0.0, 30.0, 59.9] {
                    assert_eq!(
                        classify(Hsv::new(hue, saturation, value)),
                        ColorCode::White,
                        "h={hue} s={saturation} v={value}"
                    );
                }
            }
        }
    }

    #[test]
    fn reference_samples() {
        assert_eq!(classify(saturated(30.0)), ColorCode::Yellow);
        assert_eq!(classify(saturated(5.0)), ColorCode::Red);
        assert_eq!(classify(saturated(170.0)), ColorCode::Red);
        assert_eq!(classify(saturated(115.0)), ColorCode::Blue);
        assert_eq!(classify(saturated(60.0)), ColorCode::Green);
        assert_eq!(classify(saturated(15.0)), ColorCode::Orange);
    }

    #[test]
    fn band_edges_are_half_open() {
        assert_eq!(classify(saturated(0.0)), ColorCode::Red);
        assert_eq!(classify(saturated(9.99)), ColorCode::Red);
        assert_eq!(classify(saturated(10.0)), ColorCode::Orange);
        assert_eq!(classify(saturated(22.0)), ColorCode::Yellow);
        assert_eq!(classify(saturated(38.0)), ColorCode::Green);
        assert_eq!(classify(saturated(95.0)), ColorCode::Blue);
        assert_eq!(classify(saturated(160.0)), ColorCode::Red);
        assert_eq!(classify(saturated(180.0)), ColorCode::Red);
    }

    #[test]
    fn magenta_gap_is_unknown() {
        assert_eq!(classify(saturated(130.0)), ColorCode::Unknown);
        assert_eq!(classify(saturated(145.0)), ColorCode::Unknown);
        assert_eq!(classify(saturated(159.9)), ColorCode::Unknown);
        assert_eq!(classify(saturated(181.0)), ColorCode::Unknown);
    }

    #[test]
    fn saturation_threshold_is_exclusive() {
        assert_eq!(classify(Hsv::new(60.0, 60.0, 200.0)), ColorCode::Green);
    }

    #[test]
    fn low_light_floor_rejects_dark_greys() {
        let classifier = ColorClassifier::new(Some(100.0));
        assert_eq!(classifier.classify(Hsv::new(0.0, 10.0, 40.0)), ColorCode::Unknown);
        assert_eq!(classifier.classify(Hsv::new(0.0, 10.0, 180.0)), ColorCode::White);
        assert_eq!(classifier.classify(saturated(60.0)), ColorCode::Green);
    }

    #[test]
    fn letters_round_trip() {
        for code in ColorCode::STICKERS.into_iter().chain([ColorCode::Unknown]) {
            assert_eq!(ColorCode::from_letter(code.letter()), Some(code));
        }
        assert_eq!(ColorCode::from_letter('x'), None);
    }

    #[test]
    fn camera_srgb_samples_classify_as_stickers() {
        use crate::core_modules::pixel::pixel::Pixel;

        let samples = [
            (Pixel::rgb(250, 120, 10), ColorCode::Orange),
            (Pixel::rgb(200, 15, 25), ColorCode::Red),
            (Pixel::rgb(240, 220, 20), ColorCode::Yellow),
            (Pixel::rgb(20, 180, 60), ColorCode::Green),
            (Pixel::rgb(20, 60, 200), ColorCode::Blue),
            (Pixel::rgb(235, 235, 230), ColorCode::White),
        ];
        for (pixel, expected) in samples {
            assert_eq!(classify(pixel.to_hsv()), expected, "{pixel:?}");
        }
    }
}
