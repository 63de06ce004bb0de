///! Fixed-width big integers used throughout the fixed-point layer.
///!
///! `U256` backs every Q64.96 / Q128.128 quantity in the pool; `U512` exists
///! purely as scratch space for `a * b` before the division in `mul_div`
///! narrows the result back down to 256 bits.
use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

construct_uint! {
    pub struct U512(8);
}

impl U256 {
    pub fn to_u512(self) -> U512 {
        let [w0, w1, w2, w3] = self.0;
        U512([w0, w1, w2, w3, 0, 0, 0, 0])
    }
}

impl U512 {
    /// Narrows back to `U256`, returning `None` if the value does not fit.
    pub fn to_u256(self) -> Option<U256> {
        let U512(words) = self;
        if words[4] | words[5] | words[6] | words[7] != 0 {
            return None;
        }
        Some(U256([words[0], words[1], words[2], words[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_narrow_round_trip() {
        let a = U256::from(12345u64);
        assert_eq!(a.to_u512().to_u256(), Some(a));
    }

    #[test]
    fn narrow_fails_when_too_wide() {
        let wide = U256::MAX.to_u512() * U512::from(2);
        assert_eq!(wide.to_u256(), None);
    }
}
