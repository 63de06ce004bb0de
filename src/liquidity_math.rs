///! Liquidity deltas and conversions between liquidity and token amounts.
use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::RESOLUTION_96;
use crate::full_math::MulDiv;

/// Applies a signed liquidity delta to a gross liquidity value, erroring on
/// overflow (delta too large and positive) or underflow (delta too large and
/// negative).
pub fn add_delta(x: u128, delta: i128) -> Result<u128> {
    if delta == 0 {
        return Ok(x);
    }
    if delta < 0 {
        x.checked_sub(delta.unsigned_abs()).ok_or(Error::Underflow)
    } else {
        x.checked_add(delta as u128).ok_or(Error::Overflow)
    }
}

fn ordered(mut a: U256, mut b: U256) -> (U256, U256) {
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    (a, b)
}

/// `ΔL = Δx * (√P_upper * √P_lower) / (√P_upper - √P_lower)`.
pub fn get_liquidity_for_amount_0(sqrt_ratio_a: U256, sqrt_ratio_b: U256, amount_0: u128) -> Result<u128> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    let intermediate = a.mul_div_floor(b, U256::from(1u8) << RESOLUTION_96)?;
    let liquidity = U256::from(amount_0).mul_div_floor(intermediate, b - a)?;
    narrow(liquidity)
}

/// `ΔL = Δy / (√P_upper - √P_lower)`.
pub fn get_liquidity_for_amount_1(sqrt_ratio_a: U256, sqrt_ratio_b: U256, amount_1: u128) -> Result<u128> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    let liquidity = U256::from(amount_1).mul_div_floor(U256::from(1u8) << RESOLUTION_96, b - a)?;
    narrow(liquidity)
}

/// The maximum liquidity obtainable from `amount_0`/`amount_1` at the current
/// price over `[sqrt_ratio_a, sqrt_ratio_b]`.
pub fn get_liquidity_for_amounts(
    sqrt_ratio: U256,
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    amount_0: u128,
    amount_1: u128,
) -> Result<u128> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    if sqrt_ratio <= a {
        get_liquidity_for_amount_0(a, b, amount_0)
    } else if sqrt_ratio < b {
        Ok(u128::min(
            get_liquidity_for_amount_0(sqrt_ratio, b, amount_0)?,
            get_liquidity_for_amount_1(a, sqrt_ratio, amount_1)?,
        ))
    } else {
        get_liquidity_for_amount_1(a, b, amount_1)
    }
}

/// `Δx = ΔL * (√P_upper - √P_lower) / (√P_upper * √P_lower)`.
pub fn get_amount_0_for_liquidity(sqrt_ratio_a: U256, sqrt_ratio_b: U256, liquidity: u128) -> Result<u128> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    let numerator = (U256::from(liquidity) << RESOLUTION_96).mul_div_floor(b - a, b)?;
    narrow(numerator / a)
}

/// `Δy = ΔL * (√P_upper - √P_lower)`.
pub fn get_amount_1_for_liquidity(sqrt_ratio_a: U256, sqrt_ratio_b: U256, liquidity: u128) -> Result<u128> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    let amount = U256::from(liquidity).mul_div_floor(b - a, U256::from(1u8) << RESOLUTION_96)?;
    narrow(amount)
}

/// The token0/token1 value of `liquidity` at the current price over
/// `[sqrt_ratio_a, sqrt_ratio_b]`.
pub fn get_amounts_for_liquidity(
    sqrt_ratio: U256,
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    liquidity: u128,
) -> Result<(u128, u128)> {
    let (a, b) = ordered(sqrt_ratio_a, sqrt_ratio_b);
    if sqrt_ratio <= a {
        Ok((get_amount_0_for_liquidity(a, b, liquidity)?, 0))
    } else if sqrt_ratio < b {
        Ok((
            get_amount_0_for_liquidity(sqrt_ratio, b, liquidity)?,
            get_amount_1_for_liquidity(a, sqrt_ratio, liquidity)?,
        ))
    } else {
        Ok((0, get_amount_1_for_liquidity(a, b, liquidity)?))
    }
}

fn narrow(x: U256) -> Result<u128> {
    if x > U256::from(u128::MAX) {
        return Err(Error::Overflow);
    }
    Ok(x.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_price_sqrt(reserve1: u64, reserve0: u64) -> U256 {
        let ratio = (U256::from(reserve1) << 192) / U256::from(reserve0);
        let mut x = ratio;
        if x.is_zero() {
            return U256::zero();
        }
        let mut y = (x + U256::from(1u8)) / U256::from(2u8);
        while y < x {
            x = y;
            y = (x + ratio / x) / U256::from(2u8);
        }
        x
    }

    #[test]
    fn add_delta_handles_both_signs() {
        assert_eq!(add_delta(10, 5).unwrap(), 15);
        assert_eq!(add_delta(10, -5).unwrap(), 5);
        assert_eq!(add_delta(10, -11), Err(Error::Underflow));
        assert_eq!(add_delta(u128::MAX, 1), Err(Error::Overflow));
    }

    mod get_liquidity_for_amounts {
        use super::*;

        #[test]
        fn amounts_for_price_inside() {
            let p = encode_price_sqrt(1, 1);
            let a = encode_price_sqrt(100, 110);
            let b = encode_price_sqrt(110, 100);
            let liquidity = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
            assert!(liquidity > 0);
        }

        #[test]
        fn amounts_for_price_below_uses_only_token_0() {
            let p = encode_price_sqrt(99, 110);
            let a = encode_price_sqrt(100, 110);
            let b = encode_price_sqrt(110, 100);
            let from_0 = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
            let direct = get_liquidity_for_amount_0(a, b, 100).unwrap();
            assert_eq!(from_0, direct);
        }

        #[test]
        fn amounts_for_price_above_uses_only_token_1() {
            let p = encode_price_sqrt(111, 100);
            let a = encode_price_sqrt(100, 110);
            let b = encode_price_sqrt(110, 100);
            let from_1 = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
            let direct = get_liquidity_for_amount_1(a, b, 200).unwrap();
            assert_eq!(from_1, direct);
        }
    }

    #[test]
    fn get_amounts_for_liquidity_round_trips_with_get_liquidity_for_amounts() {
        let p = encode_price_sqrt(1, 1);
        let a = encode_price_sqrt(100, 110);
        let b = encode_price_sqrt(110, 100);
        let liquidity = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
        let (amount_0, amount_1) = get_amounts_for_liquidity(p, a, b, liquidity).unwrap();
        // Recovered amounts never exceed the amounts that produced the liquidity.
        assert!(amount_0 <= 100);
        assert!(amount_1 <= 200);
    }

    #[test]
    fn price_at_or_beyond_either_boundary_yields_single_sided_amounts() {
        let a = encode_price_sqrt(100, 110);
        let b = encode_price_sqrt(110, 100);
        let (amount_0, amount_1) = get_amounts_for_liquidity(a, a, b, 1_000_000).unwrap();
        assert!(amount_0 > 0);
        assert_eq!(amount_1, 0);

        let (amount_0, amount_1) = get_amounts_for_liquidity(b, a, b, 1_000_000).unwrap();
        assert_eq!(amount_0, 0);
        assert!(amount_1 > 0);
    }

    #[test]
    fn in_range_liquidity_provision_matches_known_values() {
        let p = encode_price_sqrt(1, 1);
        let a = encode_price_sqrt(100, 110);
        let b = encode_price_sqrt(110, 100);

        let liquidity = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
        assert_eq!(liquidity, 2148);

        let (amount_0, amount_1) = get_amounts_for_liquidity(p, a, b, 2148).unwrap();
        assert_eq!((amount_0, amount_1), (99, 99));
    }

    #[test]
    fn below_range_liquidity_provision_matches_known_values() {
        let p = encode_price_sqrt(99, 110);
        let a = encode_price_sqrt(100, 110);
        let b = encode_price_sqrt(110, 100);

        let liquidity = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
        assert_eq!(liquidity, 1048);

        let (amount_0, amount_1) = get_amounts_for_liquidity(p, a, b, 1048).unwrap();
        assert_eq!((amount_0, amount_1), (99, 0));
    }

    #[test]
    fn above_range_liquidity_provision_matches_known_values() {
        let p = encode_price_sqrt(111, 100);
        let a = encode_price_sqrt(100, 110);
        let b = encode_price_sqrt(110, 100);

        let liquidity = get_liquidity_for_amounts(p, a, b, 100, 200).unwrap();
        assert_eq!(liquidity, 2097);

        let (amount_0, amount_1) = get_amounts_for_liquidity(p, a, b, 2097).unwrap();
        assert_eq!((amount_0, amount_1), (0, 199));
    }
}
