///! Q-notation constants shared by the tick-math and sqrt-price-math modules.
use crate::big_num::U256;

/// `2^96`, the scale of a Q64.96 sqrt price.
pub const RESOLUTION_96: u8 = 96;

/// `2^128`, the scale of a Q128.128 fee-growth accumulator.
pub const RESOLUTION_128: u8 = 128;

pub fn q96() -> U256 {
    U256::from(1u8) << RESOLUTION_96
}

pub fn q128() -> U256 {
    U256::from(1u8) << RESOLUTION_128
}

/// The smallest sqrt price supported, corresponding to `tick = MIN_TICK`.
pub const MIN_SQRT_RATIO: &str = "4295128739";

/// The largest sqrt price supported, corresponding to `tick = MAX_TICK`.
pub const MAX_SQRT_RATIO: &str = "1461446703485210103287273052203988822378723970342";

pub fn min_sqrt_ratio() -> U256 {
    U256::from_dec_str(MIN_SQRT_RATIO).unwrap()
}

pub fn max_sqrt_ratio() -> U256 {
    U256::from_dec_str(MAX_SQRT_RATIO).unwrap()
}

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;
