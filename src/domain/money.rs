//! Currency amounts are stored as integer minor units (hundredths) and handled
//! in memory as `Decimal` with scale 2, so no float ever touches a price.

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::error::{AppError, AppResult};

pub const SCALE: u32 = 2;

pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE)
}

pub fn to_minor(amount: Decimal) -> AppResult<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|d| d.round())
        .and_then(|d| d.to_i64())
        .ok_or_else(|| AppError::BadRequest(format!("amount {amount} is out of range")))
}

pub fn line_total(unit_price: Decimal, qty: i32) -> AppResult<Decimal> {
    unit_price
        .checked_mul(Decimal::from(qty))
        .ok_or_else(|| AppError::BadRequest("line total is out of range".into()))
}

pub fn sum<I>(amounts: I) -> AppResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::new(0, SCALE), |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| AppError::BadRequest("order total is out of range".into()))
}
