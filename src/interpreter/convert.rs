//! Numeric conversions. Float-to-int truncates toward zero and saturates on
//! overflow (NaN maps to 0), resolving the Open Question spec.md left for
//! the source's silence on overflow behavior — see the design notes.

/// Saturating truncation from `f32` to `i32`.
pub fn f32_to_i32(v: f32) -> i32 {
    if v.is_nan() {
        0
    } else {
        v.trunc().clamp(i32::MIN as f32, i32::MAX as f32) as i32
    }
}

/// Saturating truncation from `f64` to `i32`.
pub fn f64_to_i32(v: f64) -> i32 {
    if v.is_nan() {
        0
    } else {
        v.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

/// Saturating truncation from `f64` to `i64`.
pub fn f64_to_i64(v: f64) -> i64 {
    if v.is_nan() {
        0
    } else {
        v.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }
}
