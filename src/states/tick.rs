///! Per-tick liquidity and fee-growth bookkeeping.
use std::collections::BTreeMap;

use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::{MAX_TICK, MIN_TICK};
use crate::liquidity_math;

/// Info recorded for an initialized price tick.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Total position liquidity referencing this tick, used to decide whether
    /// the tick is still initialized.
    pub liquidity_gross: u128,

    /// Net liquidity added (removed) when the tick is crossed left to right
    /// (right to left).
    pub liquidity_net: i128,

    /// Fee growth on the other side of this tick, per unit of liquidity.
    /// Only meaningful relative to the pool's global accumulators, and only
    /// from the moment the tick was (re)initialized.
    pub fee_growth_outside_0: U256,
    pub fee_growth_outside_1: U256,
}

impl Tick {
    pub fn is_initialized(&self) -> bool {
        self.liquidity_gross != 0
    }

    /// Updates the tick with a liquidity delta, returning whether it flipped
    /// between initialized and uninitialized.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0: U256,
        fee_growth_global_1: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after = liquidity_math::add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity {
            return Err(Error::TickLiquidityOverflow);
        }

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 {
            // By convention all growth before a tick is initialized is assumed
            // to have happened below the tick.
            if tick <= tick_current {
                self.fee_growth_outside_0 = fee_growth_global_0;
                self.fee_growth_outside_1 = fee_growth_global_1;
            }
        }

        self.liquidity_gross = liquidity_gross_after;
        self.liquidity_net = if upper {
            self.liquidity_net
                .checked_sub(liquidity_delta)
                .ok_or(Error::Underflow)?
        } else {
            self.liquidity_net
                .checked_add(liquidity_delta)
                .ok_or(Error::Overflow)?
        };

        Ok(flipped)
    }

    /// Flips the fee-growth-outside accumulators as the tick is crossed,
    /// returning the raw (un-negated) liquidity_net; the caller negates it
    /// when crossing right to left.
    pub fn cross(&mut self, fee_growth_global_0: U256, fee_growth_global_1: U256) -> i128 {
        self.fee_growth_outside_0 = fee_growth_global_0.overflowing_sub(self.fee_growth_outside_0).0;
        self.fee_growth_outside_1 = fee_growth_global_1.overflowing_sub(self.fee_growth_outside_1).0;
        self.liquidity_net
    }
}

/// The tick index space for one pool, keyed by tick and spaced by
/// `tick_spacing`. A `BTreeMap` stands in for a packed bitmap: lookups walk
/// the sorted keys directly instead of scanning fixed-size words.
#[derive(Debug, Default, Clone)]
pub struct TickTable {
    ticks: BTreeMap<i32, Tick>,
}

impl TickTable {
    pub fn new() -> Self {
        TickTable { ticks: BTreeMap::new() }
    }

    pub fn get(&self, tick: i32) -> Tick {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    pub fn get_mut_or_default(&mut self, tick: i32) -> &mut Tick {
        self.ticks.entry(tick).or_default()
    }

    pub fn remove_if_clear(&mut self, tick: i32) {
        if let Some(t) = self.ticks.get(&tick) {
            if !t.is_initialized() {
                self.ticks.remove(&tick);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i32, &Tick)> {
        self.ticks.iter()
    }

    /// Finds the next initialized tick within the 256-slot "word" containing
    /// `tick`'s compressed index (`tick / spacing`), searching left (`lte`)
    /// or right. Mirrors the bit-packed-bitmap contract: if nothing is found
    /// before the word boundary, returns the boundary tick with `false`.
    pub fn next_initialized_tick_within_one_word(&self, tick: i32, spacing: i32, lte: bool) -> (i32, bool) {
        if lte {
            let compressed = tick.div_euclid(spacing);
            let word_floor = compressed.div_euclid(256) * 256;
            let lo = word_floor * spacing;
            let hi = compressed * spacing;
            match self.ticks.range(lo..=hi).rev().find(|(_, t)| t.is_initialized()) {
                Some((&k, _)) => (k, true),
                None => (lo, false),
            }
        } else {
            let compressed = tick.div_euclid(spacing) + 1;
            let word_ceil = compressed.div_euclid(256) * 256 + 255;
            let lo = compressed * spacing;
            let hi = word_ceil * spacing;
            match self.ticks.range(lo..=hi).find(|(_, t)| t.is_initialized()) {
                Some((&k, _)) => (k, true),
                None => (hi, false),
            }
        }
    }
}

/// The all-time fee growth, per unit of liquidity, inside a position's tick
/// range: `fee_growth_global - fee_growth_below(lower) - fee_growth_above(upper)`.
pub fn get_fee_growth_inside(
    tick_lower: i32,
    tick_lower_state: Tick,
    tick_upper: i32,
    tick_upper_state: Tick,
    tick_current: i32,
    fee_growth_global_0: U256,
    fee_growth_global_1: U256,
) -> (U256, U256) {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (tick_lower_state.fee_growth_outside_0, tick_lower_state.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.overflowing_sub(tick_lower_state.fee_growth_outside_0).0,
            fee_growth_global_1.overflowing_sub(tick_lower_state.fee_growth_outside_1).0,
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (tick_upper_state.fee_growth_outside_0, tick_upper_state.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.overflowing_sub(tick_upper_state.fee_growth_outside_0).0,
            fee_growth_global_1.overflowing_sub(tick_upper_state.fee_growth_outside_1).0,
        )
    };

    (
        fee_growth_global_0.overflowing_sub(below_0).0.overflowing_sub(above_0).0,
        fee_growth_global_1.overflowing_sub(below_1).0.overflowing_sub(above_1).0,
    )
}

/// The maximum `liquidity_gross` a single tick may carry without the pool's
/// entire range being able to overflow `u128` liquidity.
pub fn tick_spacing_to_max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}
