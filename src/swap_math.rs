///! Computes the result of swapping within a single tick range, i.e. until
///! either the price target or the remaining amount is exhausted.
use crate::big_num::U256;
use crate::error::Result;
use crate::full_math::{mul_div_u128_ceil, mul_div_u128_floor};
use crate::sqrt_price_math;

pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

/// Result of a single swap step.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    /// The price after this step, never past `sqrt_ratio_target`.
    pub sqrt_ratio_next: U256,
    /// The amount taken in, of whichever token the swap direction consumes.
    pub amount_in: u128,
    /// The amount paid out, of whichever token the swap direction produces.
    pub amount_out: u128,
    /// The portion of `amount_in` retained as a fee.
    pub fee_amount: u128,
}

/// Computes the result of swapping some amount in, or amount out, within a
/// single initialized-tick range.
///
/// `amount_remaining` is positive for an exact-input swap and negative for an
/// exact-output swap. The fee plus `amount_in` never exceeds `amount_remaining`
/// in the exact-input case.
pub fn compute_swap_step(
    sqrt_ratio_current: U256,
    sqrt_ratio_target: U256,
    liquidity: u128,
    amount_remaining: i128,
    fee_pips: u32,
) -> Result<SwapStep> {
    let zero_for_one = sqrt_ratio_current >= sqrt_ratio_target;
    let exact_in = amount_remaining >= 0;
    let mut step = SwapStep::default();

    if exact_in {
        let amount_remaining_less_fee = mul_div_u128_floor(
            amount_remaining as u128,
            (FEE_PIPS_DENOMINATOR - fee_pips) as u128,
            FEE_PIPS_DENOMINATOR as u128,
        )?;

        step.amount_in = if zero_for_one {
            sqrt_price_math::get_amount_0_delta_unsigned(sqrt_ratio_target, sqrt_ratio_current, liquidity, true)?
        } else {
            sqrt_price_math::get_amount_1_delta_unsigned(sqrt_ratio_current, sqrt_ratio_target, liquidity, true)?
        };
        step.sqrt_ratio_next = if amount_remaining_less_fee >= step.amount_in {
            sqrt_ratio_target
        } else {
            sqrt_price_math::get_next_sqrt_price_from_input(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        let amount_remaining_abs = amount_remaining.unsigned_abs();
        step.amount_out = if zero_for_one {
            sqrt_price_math::get_amount_1_delta_unsigned(sqrt_ratio_target, sqrt_ratio_current, liquidity, false)?
        } else {
            sqrt_price_math::get_amount_0_delta_unsigned(sqrt_ratio_current, sqrt_ratio_target, liquidity, false)?
        };
        step.sqrt_ratio_next = if amount_remaining_abs >= step.amount_out {
            sqrt_ratio_target
        } else {
            sqrt_price_math::get_next_sqrt_price_from_output(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_abs,
                zero_for_one,
            )?
        };
    }

    let max = sqrt_ratio_target == step.sqrt_ratio_next;

    if zero_for_one {
        if !(max && exact_in) {
            step.amount_in =
                sqrt_price_math::get_amount_0_delta_unsigned(step.sqrt_ratio_next, sqrt_ratio_current, liquidity, true)?;
        }
        if !(max && !exact_in) {
            step.amount_out =
                sqrt_price_math::get_amount_1_delta_unsigned(step.sqrt_ratio_next, sqrt_ratio_current, liquidity, false)?;
        }
    } else {
        if !(max && exact_in) {
            step.amount_in =
                sqrt_price_math::get_amount_1_delta_unsigned(sqrt_ratio_current, step.sqrt_ratio_next, liquidity, true)?;
        }
        if !(max && !exact_in) {
            step.amount_out =
                sqrt_price_math::get_amount_0_delta_unsigned(sqrt_ratio_current, step.sqrt_ratio_next, liquidity, false)?;
        }
    }

    if !exact_in && step.amount_out > amount_remaining.unsigned_abs() {
        step.amount_out = amount_remaining.unsigned_abs();
    }

    step.fee_amount = if exact_in && step.sqrt_ratio_next != sqrt_ratio_target {
        // Target wasn't reached; the untouched remainder is granted as fee.
        amount_remaining as u128 - step.amount_in
    } else {
        mul_div_u128_ceil(step.amount_in, fee_pips as u128, (FEE_PIPS_DENOMINATOR - fee_pips) as u128)?
    };

    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_price_sqrt(reserve1: u64, reserve0: u64) -> U256 {
        let ratio = (U256::from(reserve1) << 192) / U256::from(reserve0);
        if ratio.is_zero() {
            return U256::zero();
        }
        let mut x = ratio;
        let mut y = (x + U256::from(1u8)) / U256::from(2u8);
        while y < x {
            x = y;
            y = (x + ratio / x) / U256::from(2u8);
        }
        x
    }

    #[test]
    fn exact_amount_in_that_gets_capped_at_price_target() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(101, 100);
        let liquidity = 2_000_000_000u128;
        let amount = 100_000_000i128;
        let fee = 600;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.sqrt_ratio_next, sqrt_p_target);
        assert!(step.amount_in + step.fee_amount < amount as u128, "entire amount is not used");
    }

    #[test]
    fn exact_amount_out_that_gets_capped_at_price_target() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(101, 100);
        let liquidity = 2_000_000_000u128;
        let amount = -100_000_000i128;
        let fee = 600;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.sqrt_ratio_next, sqrt_p_target);
        assert!(step.amount_out < (-amount) as u128, "entire amount out is not returned");
    }

    #[test]
    fn exact_amount_in_that_is_fully_spent_without_reaching_target() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(1000, 100);
        let liquidity = 2_000_000_000u128;
        let amount = 100_000_000i128;
        let fee = 600;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.fee_amount, 60_000);
        assert_eq!(step.amount_in, 99_940_000);
        assert_eq!(step.amount_in + step.fee_amount, amount as u128);
        assert!(step.sqrt_ratio_next < sqrt_p_target);
    }

    #[test]
    fn exact_amount_out_that_is_fully_received_without_reaching_target() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(1000, 100);
        let liquidity = 2_000_000_000u128;
        let amount = -100_000_000i128;
        let fee = 600;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.amount_out, (-amount) as u128);
        assert!(step.sqrt_ratio_next < sqrt_p_target);
    }

    #[test]
    fn amount_out_is_capped_at_the_desired_amount_out() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(100, 110);
        let liquidity = 2_000_000_000u128;
        let amount = -1i128;
        let fee = 1;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();
        assert_eq!(step.amount_out, 1);
    }

    #[test]
    fn target_price_of_one_uses_partial_input_as_fee() {
        let step = compute_swap_step(U256::from(2u8), U256::from(1u8), 1, 100_000_000i128, 1).unwrap();
        assert_eq!(step.sqrt_ratio_next, U256::from(2u8));
        assert_eq!(step.amount_out, 0);
        assert_eq!(step.amount_in, 0);
        assert_eq!(step.fee_amount, 100_000_000);
    }

    #[test]
    fn entire_input_amount_taken_as_fee_on_tiny_remainder() {
        let step = compute_swap_step(U256::from(100u64), U256::from(100_000u64), u64::MAX as u128, 1, 1).unwrap();
        assert_eq!(step.sqrt_ratio_next, U256::from(100u64));
        assert_eq!(step.amount_out, 0);
        assert_eq!(step.amount_in, 0);
        assert_eq!(step.fee_amount, 1);
    }

    #[test]
    fn single_step_exact_input_capped_at_price_target_matches_known_values() {
        let sqrt_p = encode_price_sqrt(1, 1);
        let sqrt_p_target = encode_price_sqrt(101, 100);
        let liquidity = 2_000_000_000_000_000_000u128;
        let amount = 1_000_000_000_000_000_000i128;
        let fee = 600;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.sqrt_ratio_next, sqrt_p_target);
        assert_eq!(step.amount_in, 9_975_124_224_178_055);
        assert_eq!(step.fee_amount, 5_988_667_735_148);
        assert_eq!(step.amount_out, 9_925_619_580_021_728);
    }

    #[test]
    fn exact_output_of_one_is_never_rounded_up_to_two() {
        let sqrt_p = U256::from_dec_str("417332158212080721273783715441582").unwrap();
        let sqrt_p_target = U256::from_dec_str("1452870262520218020823638996").unwrap();
        let liquidity = U256::from_dec_str("159344665391607089467575320103").unwrap().as_u128();
        let amount = -1i128;
        let fee = 1;

        let step = compute_swap_step(sqrt_p, sqrt_p_target, liquidity, amount, fee).unwrap();

        assert_eq!(step.amount_in, 1);
        assert_eq!(step.amount_out, 1);
        assert_eq!(step.fee_amount, 1);
        assert_eq!(step.sqrt_ratio_next, sqrt_p - U256::from(1u8));
    }
}
