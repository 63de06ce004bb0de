///! A liquidity provider's position between a lower and upper tick boundary,
///! and the fees it has accrued but not yet collected.
use std::collections::HashMap;

use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::q128;
use crate::full_math::MulDiv;
use crate::liquidity_math;

/// A position's liquidity and accrued-but-uncollected fees.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub liquidity: u128,

    /// `fee_growth_inside_{0,1}` as of the last time this position's
    /// liquidity or fees were touched.
    pub fee_growth_inside_0_last: U256,
    pub fee_growth_inside_1_last: U256,

    /// Fees owed to the position owner, accumulated but not yet collected.
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

impl Position {
    /// Applies a liquidity delta and credits newly accrued fees. A delta of
    /// zero ("poke") is only legal on a position that already carries
    /// liquidity.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0: U256,
        fee_growth_inside_1: U256,
    ) -> Result<()> {
        let liquidity_next = if liquidity_delta == 0 {
            if self.liquidity == 0 {
                return Err(Error::NoOpOnEmpty);
            }
            self.liquidity
        } else {
            liquidity_math::add_delta(self.liquidity, liquidity_delta)?
        };

        // Deltas wrap modulo 2^256: a tick's fee_growth_outside reads as a
        // smaller value than it did before crossing, so the subtraction must
        // wrap rather than saturate or panic.
        let growth_delta_0 = fee_growth_inside_0.overflowing_sub(self.fee_growth_inside_0_last).0;
        let growth_delta_1 = fee_growth_inside_1.overflowing_sub(self.fee_growth_inside_1_last).0;

        let tokens_owed_0 = growth_delta_0.mul_div_floor(U256::from(self.liquidity), q128())?;
        let tokens_owed_1 = growth_delta_1.mul_div_floor(U256::from(self.liquidity), q128())?;

        if liquidity_delta != 0 {
            self.liquidity = liquidity_next;
        }
        self.fee_growth_inside_0_last = fee_growth_inside_0;
        self.fee_growth_inside_1_last = fee_growth_inside_1;

        if !tokens_owed_0.is_zero() || !tokens_owed_1.is_zero() {
            self.tokens_owed_0 = self
                .tokens_owed_0
                .checked_add(narrow(tokens_owed_0)?)
                .ok_or(Error::Overflow)?;
            self.tokens_owed_1 = self
                .tokens_owed_1
                .checked_add(narrow(tokens_owed_1)?)
                .ok_or(Error::Overflow)?;
        }

        Ok(())
    }
}

fn narrow(x: U256) -> Result<u128> {
    if x > U256::from(u128::MAX) {
        return Err(Error::Overflow);
    }
    Ok(x.as_u128())
}

/// A pool's positions, keyed by owner and tick range.
#[derive(Debug, Default, Clone)]
pub struct PositionTable {
    positions: HashMap<(String, i32, i32), Position>,
}

impl PositionTable {
    pub fn new() -> Self {
        PositionTable { positions: HashMap::new() }
    }

    pub fn get(&self, owner: &str, tick_lower: i32, tick_upper: i32) -> Option<Position> {
        self.positions.get(&(owner.to_string(), tick_lower, tick_upper)).copied()
    }

    pub fn get_mut_or_default(&mut self, owner: &str, tick_lower: i32, tick_upper: i32) -> &mut Position {
        self.positions
            .entry((owner.to_string(), tick_lower, tick_upper))
            .or_default()
    }

    pub fn remove(&mut self, owner: &str, tick_lower: i32, tick_upper: i32) -> Option<Position> {
        self.positions.remove(&(owner.to_string(), tick_lower, tick_upper))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, i32, i32), &Position)> {
        self.positions.iter()
    }
}
