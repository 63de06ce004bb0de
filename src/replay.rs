///! The replay driver: walks a historical event log against a pool,
///! optionally invoking a strategy's rebalance hook on a fixed block cadence.
use tracing::{debug, instrument, warn};

use crate::big_num::U256;
use crate::error::Result;
use crate::io::{Event, EventMethod};
use crate::pool::Pool;
use crate::strategy::Strategy;
use crate::tick_math;

/// Drives a pool through a sequence of events, rebalancing the attached
/// strategy (if any) before each event that crosses an update-interval
/// boundary.
pub struct Replay<'a> {
    pool: &'a mut Pool,
    strategy: Option<&'a mut Strategy>,
    update_interval: u64,
    start_block: Option<u64>,
    last_block: Option<u64>,
}

impl<'a> Replay<'a> {
    pub fn new(pool: &'a mut Pool, strategy: Option<&'a mut Strategy>, update_interval: u64) -> Self {
        Replay {
            pool,
            strategy,
            update_interval,
            start_block: None,
            last_block: None,
        }
    }

    #[instrument(skip_all, fields(events = events.len()))]
    pub fn run(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            self.maybe_rebalance(event.block_no)?;
            self.apply(event)?;
            self.last_block = Some(event.block_no);
        }
        Ok(())
    }

    fn maybe_rebalance(&mut self, block_no: u64) -> Result<()> {
        let start_block = *self.start_block.get_or_insert(block_no);
        let due = if self.update_interval == 0 {
            false
        } else {
            let on_schedule = (block_no - start_block) % self.update_interval == 0;
            let gap = self.last_block.is_some_and(|last| block_no - last > self.update_interval);
            on_schedule || gap
        };

        if due {
            if let Some(strategy) = self.strategy.as_deref_mut() {
                debug!(block_no, "rebalancing strategy");
                strategy.rebalance(self.pool)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: &Event) -> Result<()> {
        match event.method {
            EventMethod::Mint => {
                let amount = event.amount()?;
                if amount > 0 {
                    debug!(block_no = event.block_no, amount, "MINT");
                    self.pool.mint(&event.owner, event.tick_lower, event.tick_upper, amount)?;
                } else {
                    warn!(block_no = event.block_no, "skipping zero-amount MINT");
                }
            }
            EventMethod::Burn => {
                let amount = event.amount()?;
                if amount > 0 {
                    debug!(block_no = event.block_no, amount, "BURN");
                    self.pool.burn(&event.owner, event.tick_lower, event.tick_upper, amount)?;
                } else {
                    warn!(block_no = event.block_no, "skipping zero-amount BURN");
                }
            }
            EventMethod::Swap => {
                debug!(block_no = event.block_no, "SWAP");
                self.apply_swap(event)?;
            }
            EventMethod::Flash => {
                debug!(block_no = event.block_no, "FLASH");
                self.pool.flash(event.paid0()?, event.paid1()?)?;
            }
        }
        Ok(())
    }

    /// Direction and magnitude aren't recorded directly; they're recovered
    /// from the event's post-swap price relative to the pool's price before
    /// the swap, and a price limit wide enough to let the swap run to
    /// completion is substituted for the unrecorded original limit.
    fn apply_swap(&mut self, event: &Event) -> Result<()> {
        let sqrt_price_before = self.pool.sqrt_price;
        let sqrt_price_after = event.sqrt_price()?;
        let zero_for_one = sqrt_price_after < sqrt_price_before;

        let amount0 = event.amount0_signed()?;
        let amount1 = event.amount1_signed()?;
        let amount_specified = if amount0 > 0 {
            amount0
        } else if amount1 > 0 {
            amount1
        } else {
            amount0.max(amount1)
        };

        let price_limit = if zero_for_one {
            tick_math::min_sqrt_price() + U256::from(1u8)
        } else {
            tick_math::max_sqrt_price() - U256::from(1u8)
        };

        self.pool.swap(zero_for_one, amount_specified, price_limit)?;
        Ok(())
    }
}
