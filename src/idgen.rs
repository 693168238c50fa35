//! Synthetic identifiers for entities created during a run
//!
//! Identifiers are random digit strings from a fast non-cryptographic
//! generator. There is no registry of issued values: repeated suite runs
//! against a shared backend are kept apart by collision probability alone
//! (10^-n per pair for n digits), not by a uniqueness guarantee.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Random digit-string generator
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: SmallRng,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Reproducible generator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// `length` random decimal digits (leading zeros allowed)
    pub fn generate(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    /// `length` digits whose last digit is a Luhn check digit
    ///
    /// Suits national-id-like fields whose UI validates the check digit.
    pub fn generate_with_check_digit(&mut self, length: usize) -> String {
        if length == 0 {
            return String::new();
        }
        let mut body = self.generate(length - 1);
        body.push(char::from(b'0' + luhn_check_digit(&body)));
        body
    }
}

/// Luhn check digit for a string of decimal digits
///
/// Non-digit characters are ignored.
pub fn luhn_check_digit(digits: &str) -> u8 {
    let sum: u32 = digits
        .bytes()
        .rev()
        .filter(u8::is_ascii_digit)
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    ((10 - (sum % 10)) % 10) as u8
}

/// True if the last digit is a valid Luhn check digit for the rest
pub fn luhn_valid(digits: &str) -> bool {
    match digits.len().checked_sub(1) {
        Some(split) if digits.bytes().all(|b| b.is_ascii_digit()) => {
            let (body, check) = digits.split_at(split);
            check.as_bytes()[0] - b'0' == luhn_check_digit(body)
        }
        _ => false,
    }
}
