use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

mod arith;
mod bitwise;

/// Sign of a [`BigInt`]. Zero is its own sign so that every value has
/// exactly one representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// Sign-magnitude arbitrary-precision integer.
///
/// The magnitude is stored as little-endian 32-bit limbs with no
/// most-significant zero limbs; the canonical zero has `Sign::Zero` and an
/// empty limb vector. Values are immutable once constructed; every
/// operation allocates a fresh canonical result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigInt {
    sign: Sign,
    digits: Vec<u32>,
}

impl BigInt {
    pub fn zero() -> Self {
        BigInt {
            sign: Sign::Zero,
            digits: Vec::new(),
        }
    }

    /// Builds the unique canonical form: strips most-significant zero limbs
    /// and forces `Sign::Zero` when no limbs remain.
    pub(crate) fn normalized(sign: Sign, mut digits: Vec<u32>) -> Self {
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            return BigInt::zero();
        }
        debug_assert!(sign != Sign::Zero);
        BigInt { sign, digits }
    }

    pub fn from_u64(n: u64) -> Self {
        if n == 0 {
            return BigInt::zero();
        }
        BigInt::normalized(Sign::Positive, vec![n as u32, (n >> 32) as u32])
    }

    pub fn from_i64(n: i64) -> Self {
        let magnitude = BigInt::from_u64(n.unsigned_abs());
        if n < 0 { magnitude.negate() } else { magnitude }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub(crate) fn digits(&self) -> &[u32] {
        &self.digits
    }

    /// Sign flip; zero stays zero (there is no signed zero in this domain).
    pub fn negate(&self) -> BigInt {
        let sign = match self.sign {
            Sign::Negative => Sign::Positive,
            Sign::Zero => return BigInt::zero(),
            Sign::Positive => Sign::Negative,
        };
        BigInt {
            sign,
            digits: self.digits.clone(),
        }
    }

    /// Total order on magnitudes, ignoring sign. Compares from the
    /// most-significant limb down.
    pub fn compare_magnitude(&self, other: &BigInt) -> Ordering {
        arith::cmp_digits(&self.digits, &other.digits)
    }

    /// Low 64 bits of the two's-complement representation.
    pub fn to_u64_wrapping(&self) -> u64 {
        let lo = self.digits.first().copied().unwrap_or(0) as u64;
        let hi = self.digits.get(1).copied().unwrap_or(0) as u64;
        let magnitude = lo | (hi << 32);
        match self.sign {
            Sign::Negative => magnitude.wrapping_neg(),
            _ => magnitude,
        }
    }

    pub fn to_i64_wrapping(&self) -> i64 {
        self.to_u64_wrapping() as i64
    }

    pub fn to_str_radix(&self, radix: u32) -> Result<String> {
        if !(2..=36).contains(&radix) {
            return Err(Error::range("radix must be between 2 and 36"));
        }
        Ok(self.to_radix_unchecked(radix))
    }

    fn to_radix_unchecked(&self, radix: u32) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut scratch = self.digits.clone();
        let mut out = Vec::new();
        while !scratch.is_empty() {
            let rem = arith::div_small_in_place(&mut scratch, radix);
            out.push(char::from_digit(rem, radix).unwrap_or('?'));
        }
        if self.sign == Sign::Negative {
            out.push('-');
        }
        out.iter().rev().collect()
    }
}

impl FromStr for BigInt {
    type Err = Error;

    /// Parses an optional `-` followed by decimal digits or a `0x`/`0X` hex
    /// magnitude. Anything else is a parse error.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            parse_hex(hex)
        } else {
            parse_decimal(body)
        };
        let Some(digits) = magnitude else {
            return Err(Error::parse(format!("Cannot convert {text} to a BigInt")));
        };
        let value = BigInt::normalized(Sign::Positive, digits);
        Ok(if negative { value.negate() } else { value })
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_radix_unchecked(10))
    }
}

impl fmt::LowerHex for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_radix_unchecked(16))
    }
}

fn parse_hex(text: &str) -> Option<Vec<u32>> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = text.as_bytes();
    let mut digits = Vec::with_capacity(bytes.len().div_ceil(8));
    let mut end = bytes.len();
    while end > 0 {
        let start = end.saturating_sub(8);
        let chunk = std::str::from_utf8(&bytes[start..end]).ok()?;
        digits.push(u32::from_str_radix(chunk, 16).ok()?);
        end = start;
    }
    Some(digits)
}

fn parse_decimal(text: &str) -> Option<Vec<u32>> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let bytes = text.as_bytes();
    let mut digits: Vec<u32> = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        // accumulate 9 decimal digits per step (the largest power of ten
        // that fits a u32), first chunk takes the length remainder
        let take = if pos == 0 {
            let rem = bytes.len() % 9;
            if rem == 0 { 9 } else { rem }
        } else {
            9
        };
        let chunk: u32 = std::str::from_utf8(&bytes[pos..pos + take]).ok()?.parse().ok()?;
        arith::mul_add_small(&mut digits, 10u32.pow(take as u32), chunk);
        pos += take;
    }
    Some(digits)
}
