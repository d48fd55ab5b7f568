// THEORY (single-pixel color):
// `Pixel` is a "dumb" RGBA container plus the handful of single-pixel heuristics the
// facelet classifier needs: hue, HSV value, chroma and HSV saturation. Nothing here
// looks at neighbors; averaging over a region is the job of `Chunk`.
//
// The classifier thresholds are written on the 8-bit OpenCV HSV scale (hue 0..180,
// saturation and value 0..255), so `Pixel::to_hsv` rescales the natural ranges
// (hue in degrees, saturation/value in 0..1) onto that scale once, here.
//
// All math runs on the gamma-encoded sRGB bytes the camera delivers. The hue bands
// are defined on that encoding; linearizing first shifts orange into red.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type NormalizedChannel = f32;
    pub type Hue = f32;
    pub type SaturationHSV = f32;
    pub type ValueHSV = f32;
    pub type Chroma = f32;

    /// Hue span of the 8-bit HSV scale.
    pub const HUE_SCALE_MAX: f32 = 180.0;
    /// Saturation and value span of the 8-bit HSV scale.
    pub const CHANNEL_SCALE_MAX: f32 = 255.0;

    /// A single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    /// An HSV sample on the 8-bit scale: hue 0..180, saturation and value 0..255.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        pub hue: f32,
        pub saturation: f32,
        pub value: f32,
    }

    impl Hsv {
        pub fn new(hue: f32, saturation: f32, value: f32) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, u8::MAX)
        }

        fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as f32 / 255.0,
                self.green as f32 / 255.0,
                self.blue as f32 / 255.0,
            )
        }

        /// Hue angle in degrees [0, 360) from the given normalized channels.
        fn hue_from((red, green, blue): (f32, f32, f32)) -> Hue {
            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            if chroma <= 1e-6 {
                return 0.0;
            }

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// Hue in degrees [0, 360).
        pub fn hue(&self) -> Hue {
            Self::hue_from(self.normalized())
        }

        /// HSV Value: max(R, G, B) in 0..1.
        pub fn value_hsv(&self) -> ValueHSV {
            let (red, green, blue) = self.normalized();
            red.max(green.max(blue))
        }

        /// Chroma: max(R,G,B) - min(R,G,B) in 0..1.
        pub fn chroma(&self) -> Chroma {
            let (red, green, blue) = self.normalized();
            red.max(green.max(blue)) - red.min(green.min(blue))
        }

        /// HSV Saturation: chroma / value in 0..1. Zero for black.
        pub fn saturation_hsv(&self) -> SaturationHSV {
            let value = self.value_hsv();
            if value <= 1e-6 {
                return 0.0;
            }
            self.chroma() / value
        }

        /// Converts to the 8-bit HSV scale the classifier thresholds are written on.
        pub fn to_hsv(&self) -> Hsv {
            let hue = self.hue() / 2.0;
            // 359.x degrees rounds onto the 180 boundary of the 8-bit scale.
            let hue = if hue >= HUE_SCALE_MAX { 0.0 } else { hue };
            Hsv {
                hue,
                saturation: self.saturation_hsv() * CHANNEL_SCALE_MAX,
                value: self.value_hsv() * CHANNEL_SCALE_MAX,
            }
        }
    }

    impl From<[Byte; 4]> for Pixel {
        fn from(bytes: [Byte; 4]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(rgba: image::Rgba<u8>) -> Self {
            Pixel::from(rgba.0)
        }
    }

    impl From<Pixel> for image::Rgba<u8> {
        fn from(pixel: Pixel) -> Self {
            image::Rgba([pixel.red, pixel.green, pixel.blue, pixel.alpha])
        }
    }
}
