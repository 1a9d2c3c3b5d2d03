//! Currency helpers.
//!
//! Conversion is a static multiply by the exchange rate stored on the record,
//! not a market lookup.

use rust_decimal::Decimal;
use tracing::warn;

/// Returns true when `code` is a known ISO 4217 currency code.
pub fn is_valid_currency_code(code: &str) -> bool {
    rusty_money::iso::find(code).is_some()
}

/// Normalizes a user-entered currency code ("usd " -> "USD").
pub fn normalize_currency_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Converts `amount` into `target_currency`.
///
/// When the record's currency already matches, the amount is returned as is;
/// otherwise it is multiplied by the record's own exchange rate. Returns
/// `None` when the product does not fit in a `Decimal`.
pub fn to_currency(
    amount: Decimal,
    currency: &str,
    exchange_rate: Decimal,
    target_currency: &str,
) -> Option<Decimal> {
    if currency.eq_ignore_ascii_case(target_currency) {
        return Some(amount);
    }
    let converted = amount.checked_mul(exchange_rate);
    if converted.is_none() {
        warn!(
            "Overflow converting {} {} to {} at rate {}",
            amount, currency, target_currency, exchange_rate
        );
    }
    converted
}
