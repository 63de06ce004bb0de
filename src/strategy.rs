///! Liquidity-management strategies driven by the replay loop. A strategy is
///! mutable state plus a rebalance hook invoked on the schedule the event log
///! dictates; built-in strategies are dispatched by name.
use crate::error::{Error, Result};
use crate::fixed_point::{MAX_TICK, MIN_TICK};
use crate::liquidity_math;
use crate::pool::Pool;
use crate::tick_math;

/// Average gas cost observed on-chain for each pool operation, used to track
/// a strategy's running gas spend without simulating gas itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasAverages {
    pub mint: u128,
    pub burn: u128,
    pub swap: u128,
    pub flash: u128,
    pub collect: u128,
}

/// A liquidity range a strategy has opened, tracked so it can be torn down later.
#[derive(Debug, Clone, Copy)]
pub struct StrategyPosition {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyKind {
    Nil,
    V2,
    V2Reinvesting,
}

/// A strategy's wallet and open positions, plus which built-in behavior drives it.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub address: String,
    pub amount0: u128,
    pub amount1: u128,
    /// Budget the strategy is reported against; never enforced by `rebalance`.
    pub gas_allowance: u128,
    pub gas_used: u128,
    pub gas_averages: GasAverages,
    pub positions: Vec<StrategyPosition>,
    kind: StrategyKind,
}

impl Strategy {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: &str,
        address: String,
        amount0: u128,
        amount1: u128,
        gas_allowance: u128,
        gas_averages: GasAverages,
    ) -> Result<Self> {
        let kind = match kind {
            "nil" => StrategyKind::Nil,
            "v2" => StrategyKind::V2,
            "v2Reinvesting" => StrategyKind::V2Reinvesting,
            other => return Err(Error::UnknownStrategy(other.to_string())),
        };
        Ok(Strategy {
            address,
            amount0,
            amount1,
            gas_allowance,
            gas_used: 0,
            gas_averages,
            positions: Vec::new(),
            kind,
        })
    }

    /// Invoked on the replay driver's rebalance schedule.
    pub fn rebalance(&mut self, pool: &mut Pool) -> Result<()> {
        match self.kind {
            StrategyKind::Nil => Ok(()),
            StrategyKind::V2 => self.v2_rebalance(pool),
            StrategyKind::V2Reinvesting => self.v2_reinvesting_rebalance(pool),
        }
    }

    /// Mints a single full-range position sized to the strategy's current
    /// token balances, if one isn't already open.
    fn v2_rebalance(&mut self, pool: &mut Pool) -> Result<()> {
        if self.positions.is_empty() {
            self.mint_full_range(pool)?;
        }
        Ok(())
    }

    /// Burns and collects everything, folds the proceeds back into the
    /// strategy's balances, then reopens a full-range position.
    fn v2_reinvesting_rebalance(&mut self, pool: &mut Pool) -> Result<()> {
        let (collected0, collected1) = self.burn_all(pool)?;
        self.amount0 = self.amount0.checked_add(collected0).ok_or(Error::Overflow)?;
        self.amount1 = self.amount1.checked_add(collected1).ok_or(Error::Overflow)?;
        self.mint_full_range(pool)
    }

    fn mint_full_range(&mut self, pool: &mut Pool) -> Result<()> {
        self.gas_used = self.gas_used.checked_add(self.gas_averages.mint).ok_or(Error::Overflow)?;

        let spacing = pool.tick_spacing;
        let min_floor = MIN_TICK.div_euclid(spacing);
        // Smallest spacing-multiple >= MIN_TICK (round toward +infinity).
        let tick_lower = if min_floor * spacing == MIN_TICK { min_floor } else { min_floor + 1 } * spacing;
        // Largest spacing-multiple <= MAX_TICK (round toward -infinity).
        let tick_upper = MAX_TICK.div_euclid(spacing) * spacing;

        let sqrt_a = tick_math::sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_b = tick_math::sqrt_ratio_at_tick(tick_upper)?;
        let liquidity =
            liquidity_math::get_liquidity_for_amounts(pool.sqrt_price, sqrt_a, sqrt_b, self.amount0, self.amount1)?;
        if liquidity == 0 {
            return Ok(());
        }

        pool.mint(&self.address, tick_lower, tick_upper, liquidity)?;
        self.positions.push(StrategyPosition {
            tick_lower,
            tick_upper,
            liquidity,
        });
        Ok(())
    }

    /// Burns every open position and collects the resulting fees and
    /// principal, returning the total `(amount0, amount1)` freed.
    pub fn burn_all(&mut self, pool: &mut Pool) -> Result<(u128, u128)> {
        let mut total0 = 0u128;
        let mut total1 = 0u128;

        for position in self.positions.drain(..) {
            self.gas_used = self.gas_used.checked_add(self.gas_averages.burn).ok_or(Error::Overflow)?;
            pool.burn(&self.address, position.tick_lower, position.tick_upper, position.liquidity)?;

            self.gas_used = self.gas_used.checked_add(self.gas_averages.collect).ok_or(Error::Overflow)?;
            let (collected0, collected1) =
                pool.collect(&self.address, position.tick_lower, position.tick_upper, u128::MAX, u128::MAX)?;

            total0 = total0.checked_add(collected0).ok_or(Error::Overflow)?;
            total1 = total1.checked_add(collected1).ok_or(Error::Overflow)?;
        }

        Ok((total0, total1))
    }
}
