///! The pool state machine: mint, burn, collect, flash and swap, plus the
///! tick-crossing loop that underlies every swap.
use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::{q128, MAX_TICK, MIN_TICK};
use crate::full_math::MulDiv;
use crate::liquidity_math;
use crate::sqrt_price_math;
use crate::states::position::PositionTable;
use crate::states::tick::{get_fee_growth_inside, TickTable};
use crate::tick_math;

/// A concentrated-liquidity pool and its entire simulated state.
#[derive(Debug, Clone)]
pub struct Pool {
    pub token0_symbol: String,
    pub token1_symbol: String,
    /// Swap fee in hundredths of a bip (3000 = 0.30%).
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,

    pub sqrt_price: U256,
    pub tick: i32,
    /// Packed protocol-fee denominators: low nibble token0, high nibble token1.
    pub fee_protocol: u8,

    pub fee_growth_global_0: U256,
    pub fee_growth_global_1: U256,

    pub protocol_fees_0: u128,
    pub protocol_fees_1: u128,

    pub liquidity: u128,

    pub ticks: TickTable,
    pub positions: PositionTable,

    pub balance0: i128,
    pub balance1: i128,
}

fn check_ticks(tick_lower: i32, tick_upper: i32) -> Result<()> {
    if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(Error::InvalidTick);
    }
    Ok(())
}

impl Pool {
    /// Adds `amount` of liquidity to `[tick_lower, tick_upper)` on behalf of
    /// `recipient`, returning the (non-negative) token amounts owed by the minter.
    pub fn mint(&mut self, recipient: &str, tick_lower: i32, tick_upper: i32, amount: u128) -> Result<(u128, u128)> {
        check_ticks(tick_lower, tick_upper)?;
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let (amount0, amount1) = self.modify_position(recipient, tick_lower, tick_upper, amount as i128)?;
        let amount0 = amount0.max(0) as u128;
        let amount1 = amount1.max(0) as u128;

        self.balance0 += amount0 as i128;
        self.balance1 += amount1 as i128;
        Ok((amount0, amount1))
    }

    /// Removes `amount` of liquidity from an existing position, crediting the
    /// freed token amounts to its `tokens_owed` for later `collect`.
    pub fn burn(&mut self, owner: &str, tick_lower: i32, tick_upper: i32, amount: u128) -> Result<(u128, u128)> {
        check_ticks(tick_lower, tick_upper)?;
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        if self.positions.get(owner, tick_lower, tick_upper).is_none() {
            return Err(Error::PositionNotFound);
        }

        let (amount0, amount1) = self.modify_position(owner, tick_lower, tick_upper, -(amount as i128))?;
        let owed0 = (-amount0).max(0) as u128;
        let owed1 = (-amount1).max(0) as u128;

        self.balance0 += amount0;
        self.balance1 += amount1;

        let position = self.positions.get_mut_or_default(owner, tick_lower, tick_upper);
        position.tokens_owed_0 = position.tokens_owed_0.checked_add(owed0).ok_or(Error::Overflow)?;
        position.tokens_owed_1 = position.tokens_owed_1.checked_add(owed1).ok_or(Error::Overflow)?;

        Ok((owed0, owed1))
    }

    /// Pays out up to `(req0, req1)` of a position's accrued-but-uncollected fees.
    pub fn collect(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        req0: u128,
        req1: u128,
    ) -> Result<(u128, u128)> {
        let position = self
            .positions
            .get(owner, tick_lower, tick_upper)
            .ok_or(Error::PositionNotFound)?;

        let collected0 = req0.min(position.tokens_owed_0);
        let collected1 = req1.min(position.tokens_owed_1);

        if collected0 > 0 || collected1 > 0 {
            let position = self.positions.get_mut_or_default(owner, tick_lower, tick_upper);
            position.tokens_owed_0 -= collected0;
            position.tokens_owed_1 -= collected1;
        }

        Ok((collected0, collected1))
    }

    /// The generic liquidity-delta applicator shared by `mint` and `burn`.
    /// Returns the signed `(amount0, amount1)` the pool's balance moved by.
    fn modify_position(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(i128, i128)> {
        check_ticks(tick_lower, tick_upper)?;

        let mut flipped_lower = false;
        let mut flipped_upper = false;
        if liquidity_delta != 0 {
            flipped_lower = self.ticks.get_mut_or_default(tick_lower).update(
                tick_lower,
                self.tick,
                liquidity_delta,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
                false,
                self.max_liquidity_per_tick,
            )?;
            flipped_upper = self.ticks.get_mut_or_default(tick_upper).update(
                tick_upper,
                self.tick,
                liquidity_delta,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
                true,
                self.max_liquidity_per_tick,
            )?;
        }

        let (fee_growth_inside_0, fee_growth_inside_1) = get_fee_growth_inside(
            tick_lower,
            self.ticks.get(tick_lower),
            tick_upper,
            self.ticks.get(tick_upper),
            self.tick,
            self.fee_growth_global_0,
            self.fee_growth_global_1,
        );

        self.positions
            .get_mut_or_default(owner, tick_lower, tick_upper)
            .update(liquidity_delta, fee_growth_inside_0, fee_growth_inside_1)?;

        let (amount0, amount1) = if self.tick < tick_lower {
            (
                sqrt_price_math::get_amount_0_delta_signed(
                    tick_math::sqrt_ratio_at_tick(tick_lower)?,
                    tick_math::sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?,
                0,
            )
        } else if self.tick < tick_upper {
            let amount0 = sqrt_price_math::get_amount_0_delta_signed(
                self.sqrt_price,
                tick_math::sqrt_ratio_at_tick(tick_upper)?,
                liquidity_delta,
            )?;
            let amount1 = sqrt_price_math::get_amount_1_delta_signed(
                tick_math::sqrt_ratio_at_tick(tick_lower)?,
                self.sqrt_price,
                liquidity_delta,
            )?;
            self.liquidity = liquidity_math::add_delta(self.liquidity, liquidity_delta)?;
            (amount0, amount1)
        } else {
            (
                0,
                sqrt_price_math::get_amount_1_delta_signed(
                    tick_math::sqrt_ratio_at_tick(tick_lower)?,
                    tick_math::sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?,
            )
        };

        if liquidity_delta < 0 {
            if flipped_lower {
                self.ticks.remove_if_clear(tick_lower);
            }
            if flipped_upper {
                self.ticks.remove_if_clear(tick_upper);
            }
        }

        Ok((amount0, amount1))
    }

    /// Settles a flash loan: recognizes `paid0`/`paid1` as fees (net of the
    /// protocol's cut) distributed to in-range liquidity.
    pub fn flash(&mut self, paid0: u128, paid1: u128) -> Result<()> {
        let fee_protocol_0 = self.fee_protocol % 16;
        let fee_protocol_1 = self.fee_protocol >> 4;

        if paid0 > 0 {
            let fees0 = if fee_protocol_0 != 0 { paid0 / fee_protocol_0 as u128 } else { 0 };
            self.protocol_fees_0 = self.protocol_fees_0.checked_add(fees0).ok_or(Error::Overflow)?;
            if self.liquidity > 0 {
                let delta = U256::from(paid0 - fees0).mul_div_floor(q128(), U256::from(self.liquidity))?;
                self.fee_growth_global_0 = self.fee_growth_global_0.overflowing_add(delta).0;
            }
        }
        if paid1 > 0 {
            let fees1 = if fee_protocol_1 != 0 { paid1 / fee_protocol_1 as u128 } else { 0 };
            self.protocol_fees_1 = self.protocol_fees_1.checked_add(fees1).ok_or(Error::Overflow)?;
            if self.liquidity > 0 {
                let delta = U256::from(paid1 - fees1).mul_div_floor(q128(), U256::from(self.liquidity))?;
                self.fee_growth_global_1 = self.fee_growth_global_1.overflowing_add(delta).0;
            }
        }

        self.balance0 += paid0 as i128;
        self.balance1 += paid1 as i128;
        Ok(())
    }

    /// Executes a swap, walking from initialized tick to initialized tick
    /// until either `amount_specified` is exhausted or `sqrt_price_limit` is
    /// reached. Returns the signed `(amount0, amount1)` moved across the pool
    /// boundary (positive: paid in by the trader).
    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit: U256,
    ) -> Result<(i128, i128)> {
        if amount_specified == 0 {
            return Err(Error::InvalidAmount);
        }

        if zero_for_one {
            if !(sqrt_price_limit < self.sqrt_price && sqrt_price_limit > tick_math::min_sqrt_price()) {
                return Err(Error::InvalidPriceLimit);
            }
        } else if !(sqrt_price_limit > self.sqrt_price && sqrt_price_limit < tick_math::max_sqrt_price()) {
            return Err(Error::InvalidPriceLimit);
        }

        let exact_in = amount_specified > 0;
        let fee_protocol_cache = if zero_for_one { self.fee_protocol % 16 } else { self.fee_protocol >> 4 };
        let liquidity_start = self.liquidity;

        let mut remaining = amount_specified;
        let mut calculated: i128 = 0;
        let mut sqrt_price = self.sqrt_price;
        let mut tick = self.tick;
        let mut fee_growth_global = if zero_for_one { self.fee_growth_global_0 } else { self.fee_growth_global_1 };
        let mut protocol_fee: u128 = 0;
        let mut liquidity = self.liquidity;

        while remaining != 0 && sqrt_price != sqrt_price_limit {
            let sqrt_start = sqrt_price;
            let (mut tick_next, initialized) =
                self.ticks.next_initialized_tick_within_one_word(tick, self.tick_spacing, zero_for_one);
            tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
            let sqrt_next = tick_math::sqrt_ratio_at_tick(tick_next)?;

            let target = if zero_for_one {
                sqrt_next.max(sqrt_price_limit)
            } else {
                sqrt_next.min(sqrt_price_limit)
            };

            let step = crate::swap_math::compute_swap_step(sqrt_price, target, liquidity, remaining, self.fee_pips)?;
            sqrt_price = step.sqrt_ratio_next;

            if exact_in {
                remaining -= (step.amount_in + step.fee_amount) as i128;
                calculated -= step.amount_out as i128;
            } else {
                remaining += step.amount_out as i128;
                calculated += (step.amount_in + step.fee_amount) as i128;
            }

            let mut fee_amount = step.fee_amount;
            if fee_protocol_cache > 0 {
                let delta = fee_amount / fee_protocol_cache as u128;
                fee_amount -= delta;
                protocol_fee = protocol_fee.checked_add(delta).ok_or(Error::Overflow)?;
            }

            if liquidity > 0 {
                let delta = U256::from(fee_amount).mul_div_floor(q128(), U256::from(liquidity))?;
                fee_growth_global = fee_growth_global.overflowing_add(delta).0;
            }

            if sqrt_price == sqrt_next {
                if initialized {
                    let (g0, g1) = if zero_for_one {
                        (fee_growth_global, self.fee_growth_global_1)
                    } else {
                        (self.fee_growth_global_0, fee_growth_global)
                    };
                    let mut net = self.ticks.get_mut_or_default(tick_next).cross(g0, g1);
                    if zero_for_one {
                        net = -net;
                    }
                    liquidity = liquidity_math::add_delta(liquidity, net)?;
                }
                tick = if zero_for_one { tick_next - 1 } else { tick_next };
            } else if sqrt_price != sqrt_start {
                tick = tick_math::tick_at_sqrt_ratio(sqrt_price)?;
            }
        }

        self.sqrt_price = sqrt_price;
        if tick != self.tick {
            self.tick = tick;
        }
        if liquidity_start != liquidity {
            self.liquidity = liquidity;
        }
        if zero_for_one {
            self.fee_growth_global_0 = fee_growth_global;
            self.protocol_fees_0 = self.protocol_fees_0.checked_add(protocol_fee).ok_or(Error::Overflow)?;
        } else {
            self.fee_growth_global_1 = fee_growth_global;
            self.protocol_fees_1 = self.protocol_fees_1.checked_add(protocol_fee).ok_or(Error::Overflow)?;
        }

        let (amount0, amount1) = if zero_for_one == exact_in {
            (amount_specified - remaining, calculated)
        } else {
            (calculated, amount_specified - remaining)
        };

        self.balance0 += amount0;
        self.balance1 += amount1;
        Ok((amount0, amount1))
    }
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

    fn fresh_pool(sqrt_price: U256, tick_spacing: i32, fee_pips: u32) -> Pool {
        Pool {
            token0_symbol: "T0".into(),
            token1_symbol: "T1".into(),
            fee_pips,
            tick_spacing,
            max_liquidity_per_tick: crate::states::tick::tick_spacing_to_max_liquidity_per_tick(tick_spacing),
            sqrt_price,
            tick: tick_math::tick_at_sqrt_ratio(sqrt_price).unwrap(),
            fee_protocol: 0,
            fee_growth_global_0: U256::zero(),
            fee_growth_global_1: U256::zero(),
            protocol_fees_0: 0,
            protocol_fees_1: 0,
            liquidity: 0,
            ticks: TickTable::new(),
            positions: PositionTable::new(),
            balance0: 0,
            balance1: 0,
        }
    }

    #[test]
    fn mint_in_range_activates_liquidity_and_takes_both_tokens() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        let (amount0, amount1) = pool.mint("alice", -600, 600, 1_000_000).unwrap();
        assert!(amount0 > 0);
        assert!(amount1 > 0);
        assert_eq!(pool.liquidity, 1_000_000);
        assert_eq!(pool.balance0, amount0 as i128);
        assert_eq!(pool.balance1, amount1 as i128);
    }

    #[test]
    fn mint_requires_valid_ticks_and_positive_amount() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        assert_eq!(pool.mint("alice", 600, -600, 1), Err(Error::InvalidTick));
        assert_eq!(pool.mint("alice", -600, 600, 0), Err(Error::InvalidAmount));
    }

    #[test]
    fn burn_on_absent_position_is_rejected() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        assert_eq!(pool.burn("alice", -600, 600, 1), Err(Error::PositionNotFound));
    }

    #[test]
    fn burn_then_collect_returns_the_minted_tokens() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        let (minted0, minted1) = pool.mint("alice", -600, 600, 1_000_000).unwrap();
        let (owed0, owed1) = pool.burn("alice", -600, 600, 1_000_000).unwrap();
        assert_eq!(owed0, minted0);
        assert_eq!(owed1, minted1);
        assert_eq!(pool.liquidity, 0);

        let (collected0, collected1) = pool.collect("alice", -600, 600, owed0, owed1).unwrap();
        assert_eq!(collected0, owed0);
        assert_eq!(collected1, owed1);

        let (again0, again1) = pool.collect("alice", -600, 600, owed0, owed1).unwrap();
        assert_eq!(again0, 0);
        assert_eq!(again1, 0);
    }

    #[test]
    fn collect_with_zero_request_is_a_no_op() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.mint("alice", -600, 600, 1_000_000).unwrap();
        pool.burn("alice", -600, 600, 1_000_000).unwrap();
        let (c0, c1) = pool.collect("alice", -600, 600, 0, 0).unwrap();
        assert_eq!((c0, c1), (0, 0));
    }

    #[test]
    fn swap_rejects_a_price_limit_on_the_wrong_side_of_current_price() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.mint("alice", -600, 600, 1_000_000_000).unwrap();
        assert_eq!(
            pool.swap(true, 1000, pool.sqrt_price + U256::from(1u8)),
            Err(Error::InvalidPriceLimit)
        );
        assert_eq!(
            pool.swap(false, 1000, pool.sqrt_price - U256::from(1u8)),
            Err(Error::InvalidPriceLimit)
        );
    }

    #[test]
    fn swap_moves_price_and_accrues_fees_for_in_range_liquidity() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.mint("alice", -6000, 6000, 10_000_000_000u128).unwrap();
        let price_before = pool.sqrt_price;

        let (amount0, amount1) = pool.swap(true, 1_000_000, tick_math::min_sqrt_price() + U256::from(1u8)).unwrap();
        assert!(amount0 > 0, "trader pays token0 in");
        assert!(amount1 < 0, "pool pays token1 out");
        assert!(pool.sqrt_price < price_before, "price decreases on a zero_for_one swap");
        assert!(!pool.fee_growth_global_0.is_zero(), "fees accrue in the input token");
        assert_eq!(pool.tick, tick_math::tick_at_sqrt_ratio(pool.sqrt_price).unwrap());
    }

    #[test]
    fn swap_with_zero_amount_is_rejected() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.mint("alice", -6000, 6000, 10_000_000_000u128).unwrap();
        assert_eq!(
            pool.swap(true, 0, tick_math::min_sqrt_price() + U256::from(1u8)),
            Err(Error::InvalidAmount)
        );
    }

    #[test]
    fn flash_distributes_fees_to_in_range_liquidity() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.mint("alice", -6000, 6000, 1_000_000u128).unwrap();
        let balance_before = pool.balance0;

        pool.flash(1000, 0).unwrap();

        assert!(!pool.fee_growth_global_0.is_zero());
        assert_eq!(pool.balance0, balance_before + 1000);
        assert_eq!(pool.protocol_fees_0, 0, "no protocol fee configured");
    }

    #[test]
    fn flash_with_protocol_fee_configured_skims_a_share() {
        let mut pool = fresh_pool(encode_price_sqrt(1, 1), 60, 3000);
        pool.fee_protocol = 4; // token0 protocol share is 1/4
        pool.mint("alice", -6000, 6000, 1_000_000u128).unwrap();

        pool.flash(1000, 0).unwrap();

        assert_eq!(pool.protocol_fees_0, 250);
        assert!(!pool.fee_growth_global_0.is_zero());
    }
}
