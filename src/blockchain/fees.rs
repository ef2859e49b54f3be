//! Fee policy and the minimal fee fixed point.
//!
//! The minimal fee depends on the operation size, and the size depends on the
//! fee (it is a variable-length integer on the wire). [`settle_fee`] iterates
//! until the two agree.

use serde_json::Value;

use crate::blockchain::types::{ChainError, ChainResult};
use crate::codec::UnsignedOperation;
use crate::config::{FeeConfig, FeePolicyKind};

/// Passes allowed before the fee is declared unsettled.
pub const MAX_FEE_ITERATIONS: usize = 4;

/// How the fee of a completed operation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Use exactly this fee, in mutez.
    Fixed(u64),
    /// Smallest fee the node's mempool accepts.
    Minimum,
}

impl FeePolicy {
    pub fn from_config(config: &FeeConfig) -> Self {
        match (config.policy, config.fixed_fee) {
            (FeePolicyKind::Fixed, Some(fee)) => Self::Fixed(fee),
            (FeePolicyKind::Fixed, None) => Self::Fixed(config.fee_hint),
            (FeePolicyKind::Minimum, _) => Self::Minimum,
        }
    }
}

/// A per-unit price in nanotez, kept as the ratio the node reports so no
/// rounding happens before the total is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NanotezRate {
    num: u64,
    den: u64,
}

impl NanotezRate {
    /// `None` for a zero denominator.
    pub fn new(num: u64, den: u64) -> Option<Self> {
        (den != 0).then_some(Self { num, den })
    }

    pub const fn whole(nanotez: u64) -> Self {
        Self {
            num: nanotez,
            den: 1,
        }
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }
}

/// Mempool acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    /// Flat part, in mutez.
    pub minimal_fees: u64,
    pub nanotez_per_gas_unit: NanotezRate,
    pub nanotez_per_byte: NanotezRate,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            minimal_fees: 100,
            nanotez_per_gas_unit: NanotezRate::whole(100),
            nanotez_per_byte: NanotezRate::whole(1000),
        }
    }
}

impl FeeParams {
    /// Read the node's mempool filter. Missing or unreadable fields keep their
    /// defaults.
    pub fn from_mempool_filter(filter: &Value) -> Self {
        let defaults = Self::default();
        Self {
            minimal_fees: read_amount(filter.get("minimal_fees")).unwrap_or(defaults.minimal_fees),
            nanotez_per_gas_unit: read_rate(filter.get("minimal_nanotez_per_gas_unit"))
                .unwrap_or(defaults.nanotez_per_gas_unit),
            nanotez_per_byte: read_rate(filter.get("minimal_nanotez_per_byte"))
                .unwrap_or(defaults.nanotez_per_byte),
        }
    }

    /// `minimal_fees + ⌈(gas·ngas + size·nbyte) / 1000⌉` with exact rates,
    /// saturating.
    pub fn minimal_fee(&self, gas_limit: u64, size: usize) -> u64 {
        let size = u64::try_from(size).unwrap_or(u64::MAX);
        variable_mutez(gas_limit, self.nanotez_per_gas_unit, size, self.nanotez_per_byte)
            .and_then(|mutez| mutez.checked_add(u128::from(self.minimal_fees)))
            .and_then(|total| u64::try_from(total).ok())
            .unwrap_or(u64::MAX)
    }
}

/// `⌈(gas·ngas + size·nbyte) / 1000⌉` over the common denominator of the two
/// rates. `None` on overflow.
fn variable_mutez(gas: u64, per_gas: NanotezRate, size: u64, per_byte: NanotezRate) -> Option<u128> {
    let gas_part = u128::from(gas)
        .checked_mul(u128::from(per_gas.num))?
        .checked_mul(u128::from(per_byte.den))?;
    let size_part = u128::from(size)
        .checked_mul(u128::from(per_byte.num))?
        .checked_mul(u128::from(per_gas.den))?;
    let denominator = u128::from(per_gas.den)
        .checked_mul(u128::from(per_byte.den))?
        .checked_mul(1000)?;
    Some(gas_part.checked_add(size_part)?.div_ceil(denominator))
}

/// Amounts appear as decimal strings or plain numbers.
fn read_amount(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Rates appear as amounts or `[num, den]` ratios.
fn read_rate(value: Option<&Value>) -> Option<NanotezRate> {
    match value? {
        Value::Array(parts) if parts.len() == 2 => {
            NanotezRate::new(read_amount(parts.first())?, read_amount(parts.get(1))?)
        }
        other => read_amount(Some(other)).map(NanotezRate::whole),
    }
}

/// Apply `policy` to `operation`, returning the fee it settled on.
pub fn apply_policy(
    operation: &mut UnsignedOperation,
    policy: &FeePolicy,
    params: &FeeParams,
    max_fee: u64,
) -> ChainResult<u64> {
    let fee = match policy {
        FeePolicy::Fixed(fee) => {
            operation.contents.manager.fee = *fee;
            *fee
        }
        FeePolicy::Minimum => settle_fee(operation, params)?,
    };
    if fee > max_fee {
        return Err(ChainError::FeeEstimationFailed(format!(
            "fee {} exceeds cap {}",
            fee, max_fee
        )));
    }
    Ok(fee)
}

/// Iterate encode → size → fee until the fee no longer changes.
pub fn settle_fee(operation: &mut UnsignedOperation, params: &FeeParams) -> ChainResult<u64> {
    let gas_limit = operation.contents.manager.gas_limit;
    for pass in 1..=MAX_FEE_ITERATIONS {
        let fee = params.minimal_fee(gas_limit, operation.signed_len());
        if fee == operation.contents.manager.fee {
            tracing::debug!(fee, passes = pass, "fee settled");
            return Ok(fee);
        }
        operation.contents.manager.fee = fee;
    }
    Err(ChainError::FeeEstimationFailed(format!(
        "fee did not settle after {} passes",
        MAX_FEE_ITERATIONS
    )))
}
