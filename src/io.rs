///! JSON document shapes for the CLI's inputs and outputs, and the loaders
///! that turn a pool/position map into the in-memory [`Pool`](crate::pool::Pool).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::big_num::U256;
use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::states::position::{Position, PositionTable};
use crate::states::tick::{Tick, TickTable};
use crate::strategy::{GasAverages, Strategy};

/// Every input document is wrapped in `{"Data": ...}`, mirroring the source
/// simulator's envelope.
#[derive(Debug, Deserialize, Serialize)]
struct Envelope<T> {
    #[serde(rename = "Data")]
    data: T,
}

fn parse_u256(s: &str) -> Result<U256> {
    U256::from_dec_str(s).map_err(|_| Error::InvalidAmount)
}

fn parse_u128(s: &str) -> Result<u128> {
    s.parse().map_err(|_| Error::InvalidAmount)
}

fn parse_i128(s: &str) -> Result<i128> {
    s.parse().map_err(|_| Error::InvalidAmount)
}

#[derive(Debug, Deserialize, Serialize)]
struct Slot0Doc {
    #[serde(rename = "sqrtPriceX96")]
    sqrt_price_x96: String,
    tick: i32,
    #[serde(rename = "feeProtocol")]
    fee_protocol: u8,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProtocolFeesDoc {
    token0: String,
    token1: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct TickDoc {
    #[serde(rename = "liquidityGross")]
    liquidity_gross: String,
    #[serde(rename = "liquidityNet")]
    liquidity_net: String,
    #[serde(rename = "feeGrowthOutside0X128")]
    fee_growth_outside_0_x128: String,
    #[serde(rename = "feeGrowthOutside1X128")]
    fee_growth_outside_1_x128: String,
    #[serde(default)]
    initialized: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct PositionDoc {
    liquidity: String,
    #[serde(rename = "feeGrowthInside0LastX128")]
    fee_growth_inside_0_last_x128: String,
    #[serde(rename = "feeGrowthInside1LastX128")]
    fee_growth_inside_1_last_x128: String,
    #[serde(rename = "tokensOwed0")]
    tokens_owed_0: String,
    #[serde(rename = "tokensOwed1")]
    tokens_owed_1: String,
}

/// The on-the-wire shape of a pool snapshot, before or after a replay run.
#[derive(Debug, Deserialize, Serialize)]
struct PoolDoc {
    token0: String,
    token1: String,
    fee: u32,
    #[serde(rename = "tickSpacing")]
    tick_spacing: i32,
    #[serde(rename = "maxLiquidityPerTick")]
    max_liquidity_per_tick: String,
    slot0: Slot0Doc,
    #[serde(rename = "feeGrowthGlobal0X128")]
    fee_growth_global_0_x128: String,
    #[serde(rename = "feeGrowthGlobal1X128")]
    fee_growth_global_1_x128: String,
    #[serde(rename = "protocolFees")]
    protocol_fees: ProtocolFeesDoc,
    liquidity: String,
    ticks: BTreeMap<String, TickDoc>,
    positions: BTreeMap<String, PositionDoc>,
    balance0: String,
    balance1: String,
}

impl PoolDoc {
    fn into_pool(self) -> Result<Pool> {
        let mut ticks = TickTable::new();
        for (key, doc) in self.ticks {
            let idx: i32 = key.parse().map_err(|_| Error::InvalidTick)?;
            *ticks.get_mut_or_default(idx) = Tick {
                liquidity_gross: parse_u128(&doc.liquidity_gross)?,
                liquidity_net: parse_i128(&doc.liquidity_net)?,
                fee_growth_outside_0: parse_u256(&doc.fee_growth_outside_0_x128)?,
                fee_growth_outside_1: parse_u256(&doc.fee_growth_outside_1_x128)?,
            };
        }

        let mut positions = PositionTable::new();
        for (key, doc) in self.positions {
            let (owner, lower, upper) = decode_position_key(&key)?;
            *positions.get_mut_or_default(&owner, lower, upper) = Position {
                liquidity: parse_u128(&doc.liquidity)?,
                fee_growth_inside_0_last: parse_u256(&doc.fee_growth_inside_0_last_x128)?,
                fee_growth_inside_1_last: parse_u256(&doc.fee_growth_inside_1_last_x128)?,
                tokens_owed_0: parse_u128(&doc.tokens_owed_0)?,
                tokens_owed_1: parse_u128(&doc.tokens_owed_1)?,
            };
        }

        Ok(Pool {
            token0_symbol: self.token0,
            token1_symbol: self.token1,
            fee_pips: self.fee,
            tick_spacing: self.tick_spacing,
            max_liquidity_per_tick: parse_u128(&self.max_liquidity_per_tick)?,
            sqrt_price: parse_u256(&self.slot0.sqrt_price_x96)?,
            tick: self.slot0.tick,
            fee_protocol: self.slot0.fee_protocol,
            fee_growth_global_0: parse_u256(&self.fee_growth_global_0_x128)?,
            fee_growth_global_1: parse_u256(&self.fee_growth_global_1_x128)?,
            protocol_fees_0: parse_u128(&self.protocol_fees.token0)?,
            protocol_fees_1: parse_u128(&self.protocol_fees.token1)?,
            liquidity: parse_u128(&self.liquidity)?,
            ticks,
            positions,
            balance0: parse_i128(&self.balance0)?,
            balance1: parse_i128(&self.balance1)?,
        })
    }

    fn from_pool(pool: &Pool) -> PoolDoc {
        let mut ticks = BTreeMap::new();
        for (idx, t) in pool.ticks.iter() {
            ticks.insert(
                idx.to_string(),
                TickDoc {
                    liquidity_gross: t.liquidity_gross.to_string(),
                    liquidity_net: t.liquidity_net.to_string(),
                    fee_growth_outside_0_x128: t.fee_growth_outside_0.to_string(),
                    fee_growth_outside_1_x128: t.fee_growth_outside_1.to_string(),
                    initialized: t.is_initialized(),
                },
            );
        }

        let mut positions = BTreeMap::new();
        for ((owner, lower, upper), p) in pool.positions.iter() {
            positions.insert(
                encode_position_key(owner, *lower, *upper),
                PositionDoc {
                    liquidity: p.liquidity.to_string(),
                    fee_growth_inside_0_last_x128: p.fee_growth_inside_0_last.to_string(),
                    fee_growth_inside_1_last_x128: p.fee_growth_inside_1_last.to_string(),
                    tokens_owed_0: p.tokens_owed_0.to_string(),
                    tokens_owed_1: p.tokens_owed_1.to_string(),
                },
            );
        }

        PoolDoc {
            token0: pool.token0_symbol.clone(),
            token1: pool.token1_symbol.clone(),
            fee: pool.fee_pips,
            tick_spacing: pool.tick_spacing,
            max_liquidity_per_tick: pool.max_liquidity_per_tick.to_string(),
            slot0: Slot0Doc {
                sqrt_price_x96: pool.sqrt_price.to_string(),
                tick: pool.tick,
                fee_protocol: pool.fee_protocol,
            },
            fee_growth_global_0_x128: pool.fee_growth_global_0.to_string(),
            fee_growth_global_1_x128: pool.fee_growth_global_1.to_string(),
            protocol_fees: ProtocolFeesDoc {
                token0: pool.protocol_fees_0.to_string(),
                token1: pool.protocol_fees_1.to_string(),
            },
            liquidity: pool.liquidity.to_string(),
            ticks,
            positions,
            balance0: pool.balance0.to_string(),
            balance1: pool.balance1.to_string(),
        }
    }
}

fn encode_position_key(owner: &str, lower: i32, upper: i32) -> String {
    format!("{owner}{lower}{upper}")
}

/// Inverse of [`encode_position_key`]. The key has no delimiters between its
/// three parts (matching the source format), so the tick boundaries are
/// recovered by splitting off trailing signed-integer runs from the right.
fn decode_position_key(key: &str) -> Result<(String, i32, i32)> {
    let (rest, upper) = split_trailing_integer(key).ok_or(Error::InvalidTick)?;
    let (owner, lower) = split_trailing_integer(rest).ok_or(Error::InvalidTick)?;
    Ok((owner.to_string(), lower, upper))
}

fn split_trailing_integer(s: &str) -> Option<(&str, i32)> {
    let digits_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let sign_start = if digits_start > 0 && s.as_bytes()[digits_start - 1] == b'-' {
        digits_start - 1
    } else {
        digits_start
    };
    let (rest, number) = s.split_at(sign_start);
    number.parse().ok().map(|n| (rest, n))
}

/// A single historical pool event, as emitted by an on-chain indexer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Event {
    #[serde(rename = "blockNo")]
    pub block_no: u64,
    pub timestamp: u64,
    #[serde(rename = "gasPrice")]
    pub gas_price: u64,
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    #[serde(rename = "gasTotal")]
    pub gas_total: u64,
    pub method: EventMethod,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub owner: String,
    #[serde(rename = "tickLower", default)]
    pub tick_lower: i32,
    #[serde(rename = "tickUpper", default)]
    pub tick_upper: i32,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub amount0: String,
    #[serde(default)]
    pub amount1: String,
    #[serde(rename = "sqrtPriceX96", default)]
    pub sqrt_price_x96: String,
    #[serde(default)]
    pub liquidity: String,
    #[serde(default)]
    pub tick: i32,
    #[serde(default)]
    pub paid0: String,
    #[serde(default)]
    pub paid1: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EventMethod {
    #[serde(rename = "MINT")]
    Mint,
    #[serde(rename = "BURN")]
    Burn,
    #[serde(rename = "SWAP")]
    Swap,
    #[serde(rename = "FLASH")]
    Flash,
}

fn decimal(field: &str) -> Result<u128> {
    if field.is_empty() {
        return Ok(0);
    }
    parse_u128(field)
}

fn decimal_signed(field: &str) -> Result<i128> {
    if field.is_empty() {
        return Ok(0);
    }
    parse_i128(field)
}

fn decimal_price(field: &str) -> Result<U256> {
    if field.is_empty() {
        return Ok(U256::zero());
    }
    parse_u256(field)
}

impl Event {
    pub fn amount(&self) -> Result<u128> {
        decimal(&self.amount)
    }

    pub fn amount0_signed(&self) -> Result<i128> {
        decimal_signed(&self.amount0)
    }

    pub fn amount1_signed(&self) -> Result<i128> {
        decimal_signed(&self.amount1)
    }

    pub fn sqrt_price(&self) -> Result<U256> {
        decimal_price(&self.sqrt_price_x96)
    }

    pub fn paid0(&self) -> Result<u128> {
        decimal(&self.paid0)
    }

    pub fn paid1(&self) -> Result<u128> {
        decimal(&self.paid1)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StrategyDoc {
    pub strategy: String,
    pub amount0: String,
    pub amount1: String,
    #[serde(rename = "gasAllowance", default)]
    pub gas_allowance: String,
    #[serde(rename = "updateInterval")]
    pub update_interval: u64,
}

#[derive(Debug, Serialize)]
struct StrategyResultDoc {
    amount0: String,
    amount1: String,
    #[serde(rename = "gasAllowance")]
    gas_allowance: String,
    #[serde(rename = "gasUsed")]
    gas_used: String,
}

/// Reads and unwraps a `{"Data": ...}`-enveloped JSON document from disk.
fn read_envelope<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    let envelope: Envelope<T> = serde_json::from_str(&raw)?;
    Ok(envelope.data)
}

fn write_envelope<T: Serialize>(path: &std::path::Path, data: &T) -> Result<()> {
    let envelope = Envelope { data };
    let rendered = serde_json::to_string_pretty(&envelope)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

pub fn load_pool(path: &std::path::Path) -> Result<Pool> {
    let doc: PoolDoc = read_envelope(path)?;
    doc.into_pool()
}

pub fn write_pool(path: &std::path::Path, pool: &Pool) -> Result<()> {
    write_envelope(path, &PoolDoc::from_pool(pool))
}

pub fn load_events(path: &std::path::Path) -> Result<Vec<Event>> {
    read_envelope(path)
}

pub fn load_gas_averages(path: &std::path::Path) -> Result<GasAverages> {
    let raw: BTreeMap<String, f64> = read_envelope(path)?;
    let get = |key: &str| raw.get(key).copied().unwrap_or(0.0) as u128;
    Ok(GasAverages {
        mint: get("mint"),
        burn: get("burn"),
        swap: get("swap"),
        flash: get("flash"),
        collect: get("collect"),
    })
}

pub fn load_strategy_descriptor(path: &std::path::Path) -> Result<StrategyDoc> {
    read_envelope(path)
}

pub fn strategy_from_descriptor(doc: &StrategyDoc, address: &str, gas_averages: GasAverages) -> Result<Strategy> {
    Strategy::new(
        &doc.strategy,
        address.to_string(),
        parse_u128(&doc.amount0)?,
        parse_u128(&doc.amount1)?,
        decimal(&doc.gas_allowance)?,
        gas_averages,
    )
}

pub fn write_strategy_result(path: &std::path::Path, strategy: &Strategy) -> Result<()> {
    write_envelope(
        path,
        &StrategyResultDoc {
            amount0: strategy.amount0.to_string(),
            amount1: strategy.amount1.to_string(),
            gas_allowance: strategy.gas_allowance.to_string(),
            gas_used: strategy.gas_used.to_string(),
        },
    )
}
