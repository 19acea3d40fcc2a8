use crate::types::{Value, ValueRange};

// Return the interpolation factor t at which `v` sits between v0 and v1
pub fn find_t(v0: Value, v1: Value, v: Value) -> Value {
    (v - v0) / (v1 - v0)
}

/// Where `value` falls in `range`, as a fraction in `[0, 1]`.
///
/// The fraction runs *downwards*: `0` at `range.max` and `1` at `range.min`.
/// A degenerate range (`min == max`) maps every value to `0`.
///
/// ```text
/// value == t * min + (1 - t) * max
/// ```
pub fn value_normalized_position(value: Value, range: ValueRange) -> Value {
    if range.is_degenerate() {
        return 0.;
    }
    let t = find_t(range.max, range.min, value);
    if t.is_nan() { 0. } else { t.clamp(0., 1.) }
}
