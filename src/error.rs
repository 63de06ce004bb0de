///! The single error type propagated by every fallible operation in the engine.
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("tick bounds invalid: lower must be < upper and both within [MIN_TICK, MAX_TICK]")]
    InvalidTick,

    #[error("sqrt price outside [MIN_SQRT_RATIO, MAX_SQRT_RATIO)")]
    InvalidSqrtPrice,

    #[error("amount must be strictly positive")]
    InvalidAmount,

    #[error("swap price limit is not strictly between the current price and the corresponding bound")]
    InvalidPriceLimit,

    #[error("division by zero")]
    DivByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("tick liquidity_gross would exceed max_liquidity_per_tick")]
    TickLiquidityOverflow,

    #[error("no position found for the given owner and tick range")]
    PositionNotFound,

    #[error("poke (zero liquidity delta) on a position with zero liquidity")]
    NoOpOnEmpty,

    #[error("unknown strategy kind: {0}")]
    UnknownStrategy(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
