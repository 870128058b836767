//! Pure arithmetic/bitwise helpers for the i32, i64 and float op families.
//!
//! Each function takes already-decoded operands and returns the already-wrapped
//! result or a [`Trap`]; [`super::dispatch`] owns packing results back into
//! register bit patterns. Keeping these free of register/frame state makes
//! them trivial to unit test independent of the rest of the interpreter.

use crate::error::Trap;

/// Wrapping 32-bit add, matching spec.md's "integer overflow wraps
/// (two's complement)".
pub fn add32(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

pub fn sub32(a: i32, b: i32) -> i32 {
    a.wrapping_sub(b)
}

pub fn mul32(a: i32, b: i32) -> i32 {
    a.wrapping_mul(b)
}

/// Signed division. Traps on divide-by-zero; `MIN / -1` wraps to `MIN`
/// rather than invoking undefined behavior.
pub fn div32(a: i32, b: i32) -> Result<i32, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a.wrapping_div(b))
}

pub fn divu32(a: u32, b: u32) -> Result<u32, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a / b)
}

pub fn rem32(a: i32, b: i32) -> Result<i32, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a.wrapping_rem(b))
}

pub fn remu32(a: u32, b: u32) -> Result<u32, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a % b)
}

pub fn neg32(a: i32) -> i32 {
    a.wrapping_neg()
}

/// Shift amounts are masked to width, per §4.2.
pub fn shl32(a: i32, amount: i32) -> i32 {
    a.wrapping_shl(amount as u32 & 0x1f)
}

pub fn shr32(a: i32, amount: i32) -> i32 {
    a.wrapping_shr(amount as u32 & 0x1f)
}

pub fn shru32(a: u32, amount: u32) -> u32 {
    a.wrapping_shr(amount & 0x1f)
}

pub fn clz32(a: u32) -> u32 {
    a.leading_zeros()
}

pub fn ctz32(a: u32) -> u32 {
    a.trailing_zeros()
}

pub fn popcnt32(a: u32) -> u32 {
    a.count_ones()
}

// --- i64, parallel set, shifts masked to 6 bits ---

pub fn add64(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

pub fn sub64(a: i64, b: i64) -> i64 {
    a.wrapping_sub(b)
}

pub fn mul64(a: i64, b: i64) -> i64 {
    a.wrapping_mul(b)
}

pub fn div64(a: i64, b: i64) -> Result<i64, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a.wrapping_div(b))
}

pub fn divu64(a: u64, b: u64) -> Result<u64, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a / b)
}

pub fn rem64(a: i64, b: i64) -> Result<i64, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a.wrapping_rem(b))
}

pub fn remu64(a: u64, b: u64) -> Result<u64, Trap> {
    if b == 0 {
        return Err(Trap::DivZero);
    }
    Ok(a % b)
}

pub fn neg64(a: i64) -> i64 {
    a.wrapping_neg()
}

pub fn shl64(a: i64, amount: i64) -> i64 {
    a.wrapping_shl(amount as u32 & 0x3f)
}

pub fn shr64(a: i64, amount: i64) -> i64 {
    a.wrapping_shr(amount as u32 & 0x3f)
}

pub fn shru64(a: u64, amount: u64) -> u64 {
    a.wrapping_shr(amount as u32 & 0x3f)
}

pub fn clz64(a: u64) -> u32 {
    a.leading_zeros()
}

pub fn ctz64(a: u64) -> u32 {
    a.trailing_zeros()
}

pub fn popcnt64(a: u64) -> u32 {
    a.count_ones()
}

// --- floats: host IEEE-754 semantics, division by zero does not trap ---

pub fn fmin32(a: f32, b: f32) -> f32 {
    a.min(b)
}

pub fn fmax32(a: f32, b: f32) -> f32 {
    a.max(b)
}

pub fn fmin64(a: f64, b: f64) -> f64 {
    a.min(b)
}

pub fn fmax64(a: f64, b: f64) -> f64 {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn division_by_zero_traps() {
        assert_eq!(div32(10, 0), Err(Trap::DivZero));
        assert_eq!(remu64(1, 0), Err(Trap::DivZero));
    }

    #[test]
    fn min_int_div_neg_one_wraps_without_panicking() {
        assert_eq!(div32(i32::MIN, -1), Ok(i32::MIN));
        assert_eq!(div64(i64::MIN, -1), Ok(i64::MIN));
    }

    #[test]
    fn shift_amounts_are_masked() {
        // 32 masked to 5 bits is 0, so this must be a no-op shift.
        assert_eq!(shl32(1, 32), 1);
        assert_eq!(shl64(1, 64), 1);
    }

    #[test]
    fn clz_ctz_of_zero_yield_width() {
        assert_eq!(clz32(0), 32);
        assert_eq!(ctz32(0), 32);
        assert_eq!(clz64(0), 64);
    }

    #[test]
    fn float_division_by_zero_produces_infinity_not_a_trap() {
        assert_eq!(1.0f32 / 0.0f32, f32::INFINITY);
    }

    #[quickcheck]
    fn add32_then_sub32_is_the_identity(a: i32, b: i32) -> bool {
        sub32(add32(a, b), b) == a
    }

    #[quickcheck]
    fn unsigned_div_rem_reconstructs_the_dividend(a: u32, b: u32) -> bool {
        if b == 0 {
            return divu32(a, b).is_err() && remu32(a, b).is_err();
        }
        let q = divu32(a, b).unwrap();
        let r = remu32(a, b).unwrap();
        q.wrapping_mul(b).wrapping_add(r) == a
    }

    #[quickcheck]
    fn shift_amount_masking_never_panics(a: i64, amount: i64) -> bool {
        // The property under test is that these never panic; the masked
        // amount is always in range for `wrapping_shl`/`wrapping_shr`.
        let _ = shl64(a, amount);
        let _ = shr64(a, amount);
        true
    }
}
