///! Conversion between a tick index and its Q64.96 sqrt price.
///!
///! `sqrt_ratio_at_tick` walks the bits of `|tick|`, multiplying together
///! precomputed powers of `sqrt(1/1.0001)` in Q128.128 space. `tick_at_sqrt_ratio`
///! inverts it by approximating `log_2` of the price via repeated squaring and
///! rescaling into `log_sqrt(1.0001)` space.
use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::fixed_point::{MAX_TICK, MIN_TICK};

pub use crate::fixed_point::{max_sqrt_ratio as max_sqrt_price, min_sqrt_ratio as min_sqrt_price};

/// Parses a hex literal (no `0x` prefix) into a `U256`, as the `uint` crate's
/// `FromStr` impl expects.
fn hex(s: &str) -> U256 {
    s.parse().expect("malformed magic constant")
}

/// Returns `ceil(sqrt(1.0001^tick) * 2^96)` as a Q64.96 value.
pub fn sqrt_ratio_at_tick(tick: i32) -> Result<U256> {
    if tick < MIN_TICK || tick > MAX_TICK {
        return Err(Error::InvalidTick);
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        hex("fffcb933bd6fad37aa2d162d1a594001")
    } else {
        U256::from(1u8) << 128
    };

    macro_rules! step {
        ($hex:literal, $bit:expr) => {
            if abs_tick & $bit != 0 {
                ratio = (ratio * hex($hex)) >> 128;
            }
        };
    }

    step!("fff97272373d413259a46990580e213a", 0x2);
    step!("fff2e50f5f656932ef12357cf3c7fdcc", 0x4);
    step!("ffe5caca7e10e4e61c3624eaa0941cd0", 0x8);
    step!("ffcb9843d60f6159c9db58835c926644", 0x10);
    step!("ff973b41fa98c081472e6896dfb254c0", 0x20);
    step!("ff2ea16466c96a3843ec78b326b52861", 0x40);
    step!("fe5dee046a99a2a811c461f1969c3053", 0x80);
    step!("fcbe86c7900a88aedcffc83b479aa3a4", 0x100);
    step!("f987a7253ac413176f2b074cf7815e54", 0x200);
    step!("f3392b0822b70005940c7a398e4b70f3", 0x400);
    step!("e7159475a2c29b7443b29c7fa6e889d9", 0x800);
    step!("d097f3bdfd2022b8845ad8f792aa5825", 0x1000);
    step!("a9f746462d870fdf8a65dc1f90e061e5", 0x2000);
    step!("70d869a156d2a1b890bb3df62baf32f7", 0x4000);
    step!("31be135f97d08fd981231505542fcfa6", 0x8000);
    step!("09aa508b5b7a84e1c677de54f3e99bc9", 0x10000);
    step!("05d6af8dedb81196699c329225ee604", 0x20000);
    step!("2216e584f5fa1ea926041bedfe98", 0x40000);
    step!("48a170391f7dc42444e8fa2", 0x80000);

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up.
    let shifted = ratio >> 32;
    let rounded_down = shifted << 32;
    Ok(if rounded_down == ratio {
        shifted
    } else {
        shifted + U256::from(1u8)
    })
}

/// A magnitude paired with a sign, used only for the handful of signed
/// 256-bit additions `tick_at_sqrt_ratio` needs around its log approximation.
#[derive(Clone, Copy)]
struct Signed256 {
    negative: bool,
    magnitude: U256,
}

impl Signed256 {
    fn from_i128(v: i128) -> Self {
        Signed256 {
            negative: v < 0,
            magnitude: U256::from(v.unsigned_abs()),
        }
    }

    fn add(self, other: Signed256) -> Signed256 {
        if self.negative == other.negative {
            Signed256 {
                negative: self.negative,
                magnitude: self.magnitude + other.magnitude,
            }
        } else if self.magnitude >= other.magnitude {
            Signed256 {
                negative: self.negative,
                magnitude: self.magnitude - other.magnitude,
            }
        } else {
            Signed256 {
                negative: other.negative,
                magnitude: other.magnitude - self.magnitude,
            }
        }
    }

    fn mul_positive(self, rhs: U256) -> Signed256 {
        Signed256 {
            negative: self.negative,
            magnitude: self.magnitude * rhs,
        }
    }

    /// Arithmetic shift right by 128 bits, as if this were a two's-complement i256.
    fn shr_128_to_i32(self) -> i32 {
        let divisor = U256::from(1u8) << 128;
        let (quotient, remainder) = (self.magnitude / divisor, self.magnitude % divisor);
        let q = quotient.as_u32() as i32;
        if !self.negative {
            q
        } else if remainder.is_zero() {
            -q
        } else {
            -(q + 1)
        }
    }
}

/// Returns the greatest tick `t` with `sqrt_ratio_at_tick(t) <= sqrt_price`.
pub fn tick_at_sqrt_ratio(sqrt_price: U256) -> Result<i32> {
    if sqrt_price < min_sqrt_price() || sqrt_price >= max_sqrt_price() {
        return Err(Error::InvalidSqrtPrice);
    }

    let ratio = sqrt_price << 32;
    let msb = 255u32.saturating_sub(ratio.leading_zeros());

    let mut r = if msb >= 128 {
        ratio >> (msb - 127)
    } else {
        ratio << (127 - msb)
    };

    let mut log_2: i128 = (msb as i128 - 128) << 64;

    for shift in (50..=63).rev() {
        r = (r * r) >> 127;
        let f = (r >> 128).as_u32() as i128;
        log_2 |= f << shift;
        r >>= f as u8;
    }

    let log_sqrt_10001 = Signed256::from_i128(log_2).mul_positive(dec("255738958999603826347141"));

    let tick_low = log_sqrt_10001
        .add(Signed256 {
            negative: true,
            magnitude: dec("3402992956809132418596140100660247210"),
        })
        .shr_128_to_i32();
    let tick_high = log_sqrt_10001
        .add(Signed256 {
            negative: false,
            magnitude: dec("291339464771989622907027621153398088495"),
        })
        .shr_128_to_i32();

    Ok(if tick_low == tick_high {
        tick_low
    } else if sqrt_ratio_at_tick(tick_high)? <= sqrt_price {
        tick_high
    } else {
        tick_low
    })
}

fn dec(s: &str) -> U256 {
    U256::from_dec_str(s).expect("malformed decimal constant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_tick_matches_min_sqrt_ratio() {
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK).unwrap(), min_sqrt_price());
    }

    #[test]
    fn max_tick_matches_max_sqrt_ratio() {
        assert_eq!(sqrt_ratio_at_tick(MAX_TICK).unwrap(), max_sqrt_price());
    }

    #[test]
    fn tick_zero_is_q96() {
        assert_eq!(sqrt_ratio_at_tick(0).unwrap(), U256::from(1u128) << 96);
    }

    #[test]
    fn out_of_range_tick_is_rejected() {
        assert_eq!(sqrt_ratio_at_tick(MAX_TICK + 1), Err(Error::InvalidTick));
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK - 1), Err(Error::InvalidTick));
    }

    #[test]
    fn round_trip_across_sampled_ticks() {
        for t in [
            MIN_TICK,
            MIN_TICK + 1,
            -500_000,
            -1,
            0,
            1,
            500_000,
            MAX_TICK - 1,
            MAX_TICK,
        ] {
            let p = sqrt_ratio_at_tick(t).unwrap();
            assert_eq!(tick_at_sqrt_ratio(p).unwrap(), t, "round-trip failed for tick {t}");
        }
    }

    #[test]
    fn sqrt_price_out_of_domain_is_rejected() {
        assert_eq!(
            tick_at_sqrt_ratio(min_sqrt_price() - U256::from(1u8)),
            Err(Error::InvalidSqrtPrice)
        );
        assert_eq!(tick_at_sqrt_ratio(max_sqrt_price()), Err(Error::InvalidSqrtPrice));
    }
}
