//! 十进制金额与链上最小单位之间的换算

use ethers::types::{I256, U256};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Unsupported token decimals: {0}")]
    UnsupportedDecimals(u8),

    #[error("Amount {amount} overflows with {decimals} decimals")]
    Overflow { amount: String, decimals: u8 },

    #[error("Negative amount not allowed: {0}")]
    Negative(String),
}

/// 10^decimals
fn pow10(decimals: u8) -> Result<Decimal, UnitsError> {
    if decimals > 28 {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    Ok(Decimal::from_i128_with_scale(10i128.pow(decimals as u32), 0))
}

/// 放大并截断小数部分
fn scale_to_integer(amount: Decimal, decimals: u8) -> Result<i128, UnitsError> {
    let scaled = amount
        .checked_mul(pow10(decimals)?)
        .ok_or_else(|| UnitsError::Overflow {
            amount: amount.to_string(),
            decimals,
        })?;

    let mut integral = scaled.trunc();
    integral.rescale(0);
    Ok(integral.mantissa())
}

/// 1.5 (18 位精度) -> 1500000000000000000
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, UnitsError> {
    let value = scale_to_integer(amount, decimals)?;
    if value < 0 {
        return Err(UnitsError::Negative(amount.to_string()));
    }
    Ok(U256::from(value as u128))
}

pub fn to_signed_base_units(amount: Decimal, decimals: u8) -> Result<I256, UnitsError> {
    let value = scale_to_integer(amount, decimals)?;
    I256::from_dec_str(&value.to_string()).map_err(|_| UnitsError::Overflow {
        amount: amount.to_string(),
        decimals,
    })
}

/// 最小单位 -> 十进制金额
pub fn from_base_units(value: I256, decimals: u8) -> Result<Decimal, UnitsError> {
    let overflow = || UnitsError::Overflow {
        amount: value.to_string(),
        decimals,
    };

    if decimals > 28 {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let mantissa: i128 = value.to_string().parse().map_err(|_| overflow())?;
    Decimal::try_from_i128_with_scale(mantissa, decimals as u32)
        .map(|d| d.normalize())
        .map_err(|_| overflow())
}
