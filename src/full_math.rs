///! `mul_div` with full-precision intermediate multiplication.
///!
///! `a * b` can overflow 256 bits even when the final `(a*b)/d` does not, so
///! the multiplication happens in `U512` and the result is narrowed back down
///! once the division has shrunk it.
use crate::big_num::{U256, U512};
use crate::error::{Error, Result};

pub trait MulDiv: Sized {
    /// `floor(self * num / denom)`.
    fn mul_div_floor(self, num: Self, denom: Self) -> Result<Self>;

    /// `ceil(self * num / denom)`.
    fn mul_div_ceil(self, num: Self, denom: Self) -> Result<Self>;
}

impl MulDiv for U256 {
    fn mul_div_floor(self, num: Self, denom: Self) -> Result<Self> {
        if denom.is_zero() {
            return Err(Error::DivByZero);
        }
        let product = self.to_u512() * num.to_u512();
        (product / denom.to_u512())
            .to_u256()
            .ok_or(Error::Overflow)
    }

    fn mul_div_ceil(self, num: Self, denom: Self) -> Result<Self> {
        if denom.is_zero() {
            return Err(Error::DivByZero);
        }
        let product = self.to_u512() * num.to_u512();
        let denom_wide = denom.to_u512();
        let quotient = product / denom_wide;
        let remainder = product % denom_wide;
        let result = if remainder.is_zero() {
            quotient
        } else {
            quotient + U512::from(1)
        };
        result.to_u256().ok_or(Error::Overflow)
    }
}

/// `ceil(a * b / d)`, rejecting a zero divisor and an out-of-range result.
pub fn mul_div_rounding_up(a: U256, b: U256, d: U256) -> Result<U256> {
    a.mul_div_ceil(b, d)
}

/// `floor(a * b / d)`, rejecting a zero divisor and an out-of-range result.
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256> {
    a.mul_div_floor(b, d)
}

/// `floor(a * b / d)` for `u128` operands, widening through `U256` so the
/// intermediate product can't overflow.
pub fn mul_div_u128_floor(a: u128, b: u128, d: u128) -> Result<u128> {
    let result = U256::from(a).mul_div_floor(U256::from(b), U256::from(d))?;
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow);
    }
    Ok(result.as_u128())
}

/// `ceil(a * b / d)` for `u128` operands, widening through `U256` so the
/// intermediate product can't overflow.
pub fn mul_div_u128_ceil(a: u128, b: u128, d: u128) -> Result<u128> {
    let result = U256::from(a).mul_div_ceil(U256::from(b), U256::from(d))?;
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow);
    }
    Ok(result.as_u128())
}

/// `ceil(n / d)`, reduced modulo 2^256 as the reference library allows.
pub fn div_rounding_up(n: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(Error::DivByZero);
    }
    let (quotient, remainder) = (n / d, n % d);
    Ok(if remainder.is_zero() {
        quotient
    } else {
        quotient.overflowing_add(U256::from(1)).0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floor_simple() {
        assert_eq!(
            U256::from(100u64)
                .mul_div_floor(U256::from(3u64), U256::from(7u64))
                .unwrap(),
            U256::from(42u64) // floor(300/7) = 42
        );
    }

    #[test]
    fn mul_div_ceil_rounds_up_on_remainder() {
        assert_eq!(
            U256::from(100u64)
                .mul_div_ceil(U256::from(3u64), U256::from(7u64))
                .unwrap(),
            U256::from(43u64)
        );
    }

    #[test]
    fn mul_div_ceil_exact_does_not_round() {
        assert_eq!(
            U256::from(100u64)
                .mul_div_ceil(U256::from(7u64), U256::from(7u64))
                .unwrap(),
            U256::from(100u64)
        );
    }

    #[test]
    fn div_by_zero_is_rejected() {
        assert_eq!(
            U256::from(1u64).mul_div_floor(U256::from(1u64), U256::from(0u64)),
            Err(Error::DivByZero)
        );
    }

    #[test]
    fn overflow_beyond_256_bits_is_rejected() {
        let big = U256::MAX;
        assert_eq!(big.mul_div_floor(big, U256::from(1u64)), Err(Error::Overflow));
    }

    #[test]
    fn mul_div_u128_ceil_rounds_up_on_remainder() {
        assert_eq!(mul_div_u128_floor(100, 3, 7).unwrap(), 42);
        assert_eq!(mul_div_u128_ceil(100, 3, 7).unwrap(), 43);
    }

    #[quickcheck_macros::quickcheck]
    fn mul_div_by_self_is_identity(a: u64, b: u64) -> bool {
        if b == 0 {
            return true;
        }
        let a = U256::from(a);
        let b = U256::from(b);
        mul_div(a, b, b).unwrap() == a
    }
}
