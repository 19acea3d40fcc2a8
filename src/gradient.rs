use derive_more::Display;

use crate::{
    colour::Colour,
    error::{Result, SurfacePlotError},
    interp::value_normalized_position,
    types::{Value, ValueRange},
};

/// Number of entries in a built [`GradientTable`]: one per hundredth in `[0, 1]`.
pub const GRADIENT_STEPS: usize = 101;

/// Index of one entry in a [`GradientTable`], stored in hundredths.
///
/// Markers hold a key rather than a colour, so refreshing the table recolours
/// every marker that points at an entry without touching the markers.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{:.2}", *_0 as f64 / 100.)]
pub struct GradientKey(u8);

impl GradientKey {
    /// Ramp position `0.00`, the colour of the largest values.
    pub const FIRST: GradientKey = GradientKey(0);
    /// Ramp position `1.00`, the colour of the smallest values. Point clouds use it too.
    pub const LAST: GradientKey = GradientKey((GRADIENT_STEPS - 1) as u8);

    /// Quantises a colour-ramp position to two decimals.
    ///
    /// The position is clamped to `[0, 1]` before rounding; `NaN` maps to [`GradientKey::FIRST`].
    pub fn from_ramp_position(position: Value) -> Self {
        if position.is_nan() {
            return Self::FIRST;
        }
        let hundredths = (position.clamp(0., 1.) * 100.).round();
        GradientKey(hundredths as u8)
    }

    /// The key a sample with `value` is coloured with, given the current `range`.
    ///
    /// Value-normalised position `0` is the range maximum and ramp position `0`
    /// is the max-value colour, so the two map onto each other directly.
    pub fn for_value(value: Value, range: ValueRange) -> Self {
        Self::from_ramp_position(value_normalized_position(value, range))
    }

    pub fn ramp_position(&self) -> Value {
        self.0 as Value / 100.
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Every key in ascending order, `0.00` through `1.00`.
    pub fn all() -> impl Iterator<Item = GradientKey> {
        (0..GRADIENT_STEPS as u8).map(GradientKey)
    }
}

/// Discretised colour ramp between two endpoint colours.
///
/// Entry `p` is `max_colour * (1 - p) + min_colour * p`: position `0.00` holds the
/// colour of the largest values and position `1.00` the colour of the smallest.
#[derive(Debug, Clone, Default)]
pub struct GradientTable {
    entries: Vec<Colour>,
}

impl GradientTable {
    /// Creates a table with all [`GRADIENT_STEPS`] entries filled.
    pub fn new(min_colour: Colour, max_colour: Colour) -> Self {
        let mut table = Self::default();
        table.build(min_colour, max_colour);
        table
    }

    /// Discards any existing entries and creates a fresh ramp.
    pub fn build(&mut self, min_colour: Colour, max_colour: Colour) {
        self.entries = GradientKey::all()
            .map(|key| ramp_colour(min_colour, max_colour, key))
            .collect();
    }

    /// Recolours the existing entries in place, keeping the key set unchanged.
    ///
    /// Builds the table if it has never been built.
    pub fn refresh(&mut self, min_colour: Colour, max_colour: Colour) {
        if !self.is_built() {
            self.build(min_colour, max_colour);
            return;
        }
        for (key, entry) in GradientKey::all().zip(self.entries.iter_mut()) {
            *entry = ramp_colour(min_colour, max_colour, key);
        }
    }

    pub fn is_built(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `key`, falling back to the `0.00` entry for untracked keys.
    ///
    /// Returns [`SurfacePlotError::GradientNotBuilt`] if the table has no entries.
    pub fn get(&self, key: GradientKey) -> Result<Colour> {
        self.entries
            .get(key.index())
            .or_else(|| self.entries.first())
            .copied()
            .ok_or(SurfacePlotError::GradientNotBuilt)
    }

    /// Clamps and rounds a ramp position, then returns its entry.
    pub fn lookup(&self, position: Value) -> Result<Colour> {
        self.get(GradientKey::from_ramp_position(position))
    }

    /// Iterates `(key, colour)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (GradientKey, Colour)> + '_ {
        GradientKey::all().zip(self.entries.iter().copied())
    }
}

fn ramp_colour(min_colour: Colour, max_colour: Colour, key: GradientKey) -> Colour {
    max_colour.lerp(&min_colour, key.ramp_position() as f32)
}
