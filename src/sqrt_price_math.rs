///! Token amount <-> sqrt price conversions.
///!
///! Every amount returned here is a magnitude (`u128`); callers that need a
///! signed delta negate based on the sign of the liquidity they passed in.
use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::q96;
use crate::full_math::MulDiv;

fn narrow_to_u128(x: U256) -> Result<u128> {
    if x > U256::from(u128::MAX) {
        return Err(Error::Overflow);
    }
    Ok(x.as_u128())
}

fn div_rounding_up_u256(n: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(Error::DivByZero);
    }
    let (q, r) = (n / d, n % d);
    Ok(if r.is_zero() { q } else { q + U256::from(1u8) })
}

/// `|Δtoken0|` for liquidity `L` between two sqrt prices, ordered internally.
pub fn get_amount_0_delta_unsigned(
    mut sqrt_ratio_a: U256,
    mut sqrt_ratio_b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<u128> {
    if sqrt_ratio_a > sqrt_ratio_b {
        std::mem::swap(&mut sqrt_ratio_a, &mut sqrt_ratio_b);
    }
    if sqrt_ratio_a.is_zero() {
        return Err(Error::InvalidSqrtPrice);
    }

    let numerator_1 = U256::from(liquidity) << 96;
    let numerator_2 = sqrt_ratio_b - sqrt_ratio_a;

    let result = if round_up {
        div_rounding_up_u256(
            numerator_1.mul_div_ceil(numerator_2, sqrt_ratio_b)?,
            sqrt_ratio_a,
        )?
    } else {
        numerator_1.mul_div_floor(numerator_2, sqrt_ratio_b)? / sqrt_ratio_a
    };
    narrow_to_u128(result)
}

/// `|Δtoken1|` for liquidity `L` between two sqrt prices, ordered internally.
pub fn get_amount_1_delta_unsigned(
    mut sqrt_ratio_a: U256,
    mut sqrt_ratio_b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<u128> {
    if sqrt_ratio_a > sqrt_ratio_b {
        std::mem::swap(&mut sqrt_ratio_a, &mut sqrt_ratio_b);
    }
    let delta = sqrt_ratio_b - sqrt_ratio_a;
    let result = if round_up {
        U256::from(liquidity).mul_div_ceil(delta, q96())?
    } else {
        U256::from(liquidity).mul_div_floor(delta, q96())?
    };
    narrow_to_u128(result)
}

/// Signed token0 delta: negative `liquidity` yields a negative amount.
pub fn get_amount_0_delta_signed(sqrt_ratio_a: U256, sqrt_ratio_b: U256, liquidity: i128) -> Result<i128> {
    let magnitude = get_amount_0_delta_unsigned(sqrt_ratio_a, sqrt_ratio_b, liquidity.unsigned_abs(), liquidity > 0)?;
    signed_amount(magnitude, liquidity < 0)
}

/// Signed token1 delta: negative `liquidity` yields a negative amount.
pub fn get_amount_1_delta_signed(sqrt_ratio_a: U256, sqrt_ratio_b: U256, liquidity: i128) -> Result<i128> {
    let magnitude = get_amount_1_delta_unsigned(sqrt_ratio_a, sqrt_ratio_b, liquidity.unsigned_abs(), liquidity > 0)?;
    signed_amount(magnitude, liquidity < 0)
}

fn signed_amount(magnitude: u128, negative: bool) -> Result<i128> {
    if magnitude > i128::MAX as u128 {
        return Err(Error::Overflow);
    }
    let v = magnitude as i128;
    Ok(if negative { -v } else { v })
}

/// Next sqrt price after adding `amount` of token0 to (or removing from) the pool.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_price: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<U256> {
    if amount == 0 {
        return Ok(sqrt_price);
    }
    let numerator1 = U256::from(liquidity) << 96;
    let amount = U256::from(amount);

    if add {
        let product = amount * sqrt_price;
        if product / amount == sqrt_price {
            let denominator = numerator1 + product;
            if denominator >= numerator1 {
                return numerator1.mul_div_ceil(sqrt_price, denominator);
            }
        }
        // Overflow-resistant form: L / (L/sqrt_price + amount), rounded up.
        div_rounding_up_u256(numerator1, numerator1 / sqrt_price + amount)
    } else {
        let product = amount * sqrt_price;
        if product / amount != sqrt_price || numerator1 <= product {
            return Err(Error::Overflow);
        }
        let denominator = numerator1 - product;
        numerator1.mul_div_ceil(sqrt_price, denominator)
    }
}

/// Next sqrt price after adding `amount` of token1 to (or removing from) the pool.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_price: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<U256> {
    let liquidity = U256::from(liquidity);
    let amount = U256::from(amount);
    if add {
        let quotient = (amount << 96) / liquidity;
        Ok(sqrt_price + quotient)
    } else {
        let quotient = div_rounding_up_u256(amount << 96, liquidity)?;
        if sqrt_price <= quotient {
            return Err(Error::Underflow);
        }
        Ok(sqrt_price - quotient)
    }
}

/// Next sqrt price after consuming `amount_in` of the input token.
pub fn get_next_sqrt_price_from_input(
    sqrt_price: U256,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> Result<U256> {
    if sqrt_price.is_zero() {
        return Err(Error::InvalidSqrtPrice);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price, liquidity, amount_in, true)
    }
}

/// Next sqrt price after delivering `amount_out` of the output token.
pub fn get_next_sqrt_price_from_output(
    sqrt_price: U256,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> Result<U256> {
    if sqrt_price.is_zero() {
        return Err(Error::InvalidSqrtPrice);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price, liquidity, amount_out, false)
    }
}
