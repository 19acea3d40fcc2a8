/// An sRGB colour with straight alpha, every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0., 0., 0.);
    /// `#7CFC00`, the default colour of the smallest sampled values.
    pub const LAWN_GREEN: Colour = Colour::rgb_u8(0x7C, 0xFC, 0x00);
    /// `#FF4500`, the default colour of the largest sampled values.
    pub const ORANGE_RED: Colour = Colour::rgb_u8(0xFF, 0x45, 0x00);

    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.,
        }
    }

    pub const fn rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self::rgb(
            red as f32 / u8::MAX as f32,
            green as f32 / u8::MAX as f32,
            blue as f32 / u8::MAX as f32,
        )
    }

    /// Componentwise linear interpolation towards `other`, alpha included.
    ///
    /// `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, other: &Colour, t: f32) -> Colour {
        let t = t.clamp(0., 1.);
        let mix = |a: f32, b: f32| a * (1. - t) + b * t;
        Colour {
            red: mix(self.red, other.red),
            green: mix(self.green, other.green),
            blue: mix(self.blue, other.blue),
            alpha: mix(self.alpha, other.alpha),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = Colour::rgb(0., 0.5, 1.);
        let b = Colour::rgb(1., 0.5, 0.);
        assert_eq!(a.lerp(&b, 0.), a);
        assert_eq!(a.lerp(&b, 1.), b);
        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.red, 0.5);
        assert_relative_eq!(mid.green, 0.5);
        assert_relative_eq!(mid.blue, 0.5);
        assert_eq!(a.lerp(&b, 7.), b);
    }

    #[test]
    fn named_colours() {
        assert_eq!(Colour::ORANGE_RED.red, 1.);
        assert_eq!(Colour::LAWN_GREEN.blue, 0.);
        assert_eq!(Colour::BLACK.to_array(), [0., 0., 0., 1.]);
    }
}
