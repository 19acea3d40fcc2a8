use nalgebra::Point3;

/// Scalar value sampled from a surface function.
pub type Value = f64;

/// A 3D marker position with [`Value`] components.
pub type Point = Point3<Value>;

/// A bivariate surface function: maps `(x, y)` to a [`Value`].
pub type CompiledFunction = dyn Fn(Value, Value) -> Value + Send + Sync;

/// An `(x, y)` sample location in domain units.
///
/// Coordinates are produced by the grid sweep and act as stable keys for the
/// lifetime of one grid; they never change after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoordinate {
    pub x: Value,
    pub y: Value,
}

impl GridCoordinate {
    pub fn new(x: Value, y: Value) -> Self {
        Self { x, y }
    }
}

/// Pan and z-scale applied to a function before sampling.
///
/// `z_zoom` is always `10^z_unit`, so it is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionTransform {
    pub x_offset: Value,
    pub y_offset: Value,
    z_unit: Value,
    z_zoom: Value,
}

impl Default for FunctionTransform {
    fn default() -> Self {
        Self {
            x_offset: 0.,
            y_offset: 0.,
            z_unit: 0.,
            z_zoom: 1.,
        }
    }
}

impl FunctionTransform {
    pub fn new(x_offset: Value, y_offset: Value, z_unit: Value) -> Self {
        Self {
            x_offset,
            y_offset,
            ..Default::default()
        }
        .with_z_unit(z_unit)
    }

    /// Sets the base-10 exponent of the z-scale.
    pub fn with_z_unit(mut self, z_unit: Value) -> Self {
        self.z_unit = z_unit;
        self.z_zoom = 10_f64.powf(z_unit);
        self
    }

    pub fn z_unit(&self) -> Value {
        self.z_unit
    }

    /// The multiplier applied to every sampled value, `10^z_unit`.
    pub fn z_zoom(&self) -> Value {
        self.z_zoom
    }
}

/// Minimum and maximum of the most recent resample. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: Value,
    pub max: Value,
}

impl ValueRange {
    /// A range holding a single value.
    pub fn seeded(value: Value) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Widens the range to include `value`. Equal values keep the first-seen bound.
    pub fn include(&mut self, value: Value) {
        if value > self.max {
            self.max = value;
        } else if value < self.min {
            self.min = value;
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Multiplies both bounds by a positive `factor`.
    pub fn scaled(self, factor: Value) -> Self {
        debug_assert!(factor > 0.);
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zoom_is_power_of_ten() {
        let t = FunctionTransform::new(1., 2., 2.);
        assert_relative_eq!(t.z_zoom(), 100.);
        assert_relative_eq!(t.with_z_unit(-2.).z_zoom(), 0.01);
        assert_eq!(FunctionTransform::default().z_zoom(), 1.);
    }

    #[test]
    fn range_tracks_extremes() {
        let mut range = ValueRange::seeded(3.);
        for v in [1., 7., 7., -2., 5.] {
            range.include(v);
        }
        assert_eq!(range, ValueRange { min: -2., max: 7. });
        assert!(!range.is_degenerate());
        assert!(ValueRange::seeded(4.).is_degenerate());
    }
}
