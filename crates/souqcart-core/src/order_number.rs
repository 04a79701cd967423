//! Human-readable order numbers: `SC-<base36 millis>-<4 random base36 chars>`.
//!
//! Uniqueness is probabilistic; the `orders.order_number` unique constraint
//! is the backstop and callers regenerate on a violation.

use chrono::{DateTime, Utc};
use rand::Rng;

pub const ORDER_NUMBER_PREFIX: &str = "SC";
const SUFFIX_LEN: usize = 4;
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate an order number for the current instant.
#[must_use]
pub fn generate_order_number() -> String {
    generate_with(Utc::now(), &mut rand::rng())
}

/// Generate an order number from an explicit clock reading and RNG.
pub fn generate_with<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect();
    format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", to_base36(millis))
}

/// Returns true if `s` has the shape produced by [`generate_order_number`].
#[must_use]
pub fn is_well_formed(s: &str) -> bool {
    let mut parts = s.split('-');
    let (Some(prefix), Some(stamp), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let base36 = |p: &str| p.bytes().all(|b| ALPHABET.contains(&b));
    prefix == ORDER_NUMBER_PREFIX
        && !stamp.is_empty()
        && base36(stamp)
        && suffix.len() == SUFFIX_LEN
        && base36(suffix)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        // n % 36 < 36, so the index is always in range.
        let idx = usize::try_from(n % 36).unwrap_or(0);
        digits.push(ALPHABET[idx]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
