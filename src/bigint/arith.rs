use std::cmp::Ordering;
use std::ops::{Add, Mul, Sub};

use super::{BigInt, Sign};
use crate::error::{Error, Result};

impl BigInt {
    /// Truncating division, quotient and remainder in one pass.
    ///
    /// `sign(q) = sign(a) xor sign(b)` unless the quotient magnitude is
    /// zero; the remainder takes the dividend's sign unless it is zero.
    pub fn div_rem(&self, divisor: &BigInt) -> Result<(BigInt, BigInt)> {
        if divisor.is_zero() {
            return Err(Error::range("0 is an invalid divisor value."));
        }
        if self.is_zero() || self.compare_magnitude(divisor) == Ordering::Less {
            return Ok((BigInt::zero(), self.clone()));
        }
        let (q, r) = div_rem_digits(&self.digits, &divisor.digits);
        let q_sign = if self.sign == divisor.sign {
            Sign::Positive
        } else {
            Sign::Negative
        };
        Ok((
            BigInt::normalized(q_sign, q),
            BigInt::normalized(self.sign, r),
        ))
    }

    pub fn checked_div(&self, divisor: &BigInt) -> Result<BigInt> {
        Ok(self.div_rem(divisor)?.0)
    }

    pub fn checked_rem(&self, divisor: &BigInt) -> Result<BigInt> {
        Ok(self.div_rem(divisor)?.1)
    }
}

impl Add for &BigInt {
    type Output = BigInt;

    fn add(self, rhs: &BigInt) -> BigInt {
        add_signed(self, rhs)
    }
}

impl Sub for &BigInt {
    type Output = BigInt;

    fn sub(self, rhs: &BigInt) -> BigInt {
        add_signed(self, &rhs.negate())
    }
}

impl Mul for &BigInt {
    type Output = BigInt;

    fn mul(self, rhs: &BigInt) -> BigInt {
        if self.is_zero() || rhs.is_zero() {
            return BigInt::zero();
        }
        let sign = if self.sign == rhs.sign {
            Sign::Positive
        } else {
            Sign::Negative
        };
        BigInt::normalized(sign, mul_digits(&self.digits, &rhs.digits))
    }
}

/// Signed addition: same signs add magnitudes; mixed signs subtract the
/// smaller magnitude from the larger, the larger operand's sign wins.
fn add_signed(lhs: &BigInt, rhs: &BigInt) -> BigInt {
    if lhs.is_zero() {
        return rhs.clone();
    }
    if rhs.is_zero() {
        return lhs.clone();
    }
    if lhs.sign == rhs.sign {
        return BigInt::normalized(lhs.sign, add_digits(&lhs.digits, &rhs.digits));
    }
    match cmp_digits(&lhs.digits, &rhs.digits) {
        Ordering::Equal => BigInt::zero(),
        Ordering::Greater => BigInt::normalized(lhs.sign, sub_digits(&lhs.digits, &rhs.digits)),
        Ordering::Less => BigInt::normalized(rhs.sign, sub_digits(&rhs.digits, &lhs.digits)),
    }
}

pub(super) fn cmp_digits(lhs: &[u32], rhs: &[u32]) -> Ordering {
    if lhs.len() != rhs.len() {
        return lhs.len().cmp(&rhs.len());
    }
    for (a, b) in lhs.iter().rev().zip(rhs.iter().rev()) {
        if a != b {
            return a.cmp(b);
        }
    }
    Ordering::Equal
}

fn add_digits(lhs: &[u32], rhs: &[u32]) -> Vec<u32> {
    let (long, short) = if lhs.len() >= rhs.len() { (lhs, rhs) } else { (rhs, lhs) };
    let mut out = Vec::with_capacity(long.len() + 1);
    let mut carry = 0u64;
    for (i, &a) in long.iter().enumerate() {
        let b = short.get(i).copied().unwrap_or(0);
        let t = a as u64 + b as u64 + carry;
        out.push(t as u32);
        carry = t >> 32;
    }
    if carry != 0 {
        out.push(carry as u32);
    }
    out
}

/// Magnitude subtraction; the caller guarantees `lhs >= rhs`.
fn sub_digits(lhs: &[u32], rhs: &[u32]) -> Vec<u32> {
    debug_assert!(cmp_digits(lhs, rhs) != Ordering::Less);
    let mut out = Vec::with_capacity(lhs.len());
    let mut borrow = 0i64;
    for (i, &a) in lhs.iter().enumerate() {
        let b = rhs.get(i).copied().unwrap_or(0);
        let t = a as i64 - b as i64 + borrow;
        out.push(t as u32);
        borrow = t >> 32;
    }
    debug_assert_eq!(borrow, 0);
    out
}

/// Schoolbook multiplication into a `lhs.len() + rhs.len()` buffer.
fn mul_digits(lhs: &[u32], rhs: &[u32]) -> Vec<u32> {
    let mut out = vec![0u32; lhs.len() + rhs.len()];
    for (i, &a) in lhs.iter().enumerate() {
        if a == 0 {
            continue;
        }
        let mut carry = 0u64;
        for (j, &b) in rhs.iter().enumerate() {
            let t = out[i + j] as u64 + a as u64 * b as u64 + carry;
            out[i + j] = t as u32;
            carry = t >> 32;
        }
        out[i + rhs.len()] = carry as u32;
    }
    out
}

/// `digits <- digits * multiplier + addend`, used by decimal parsing.
pub(super) fn mul_add_small(digits: &mut Vec<u32>, multiplier: u32, addend: u32) {
    let mut carry = addend as u64;
    for limb in digits.iter_mut() {
        let t = *limb as u64 * multiplier as u64 + carry;
        *limb = t as u32;
        carry = t >> 32;
    }
    while carry != 0 {
        digits.push(carry as u32);
        carry >>= 32;
    }
}

/// Divides the magnitude in place by a single limb, returning the
/// remainder and stripping any new leading zero limb.
pub(super) fn div_small_in_place(digits: &mut Vec<u32>, divisor: u32) -> u32 {
    let mut rem = 0u64;
    for limb in digits.iter_mut().rev() {
        let cur = (rem << 32) | *limb as u64;
        *limb = (cur / divisor as u64) as u32;
        rem = cur % divisor as u64;
    }
    while digits.last() == Some(&0) {
        digits.pop();
    }
    rem as u32
}

/// Magnitude long division. Single-limb divisors take the short path;
/// everything else is Knuth Algorithm D over normalized u32 limbs.
/// Caller guarantees a non-empty divisor and `num >= den` in magnitude.
fn div_rem_digits(num: &[u32], den: &[u32]) -> (Vec<u32>, Vec<u32>) {
    debug_assert!(!den.is_empty());
    debug_assert!(cmp_digits(num, den) != Ordering::Less);
    if den.len() == 1 {
        let mut q = num.to_vec();
        let rem = div_small_in_place(&mut q, den[0]);
        return (q, vec![rem]);
    }

    let n = den.len();
    let m = num.len() - n;
    // normalize so the divisor's top limb has its high bit set
    let shift = den[n - 1].leading_zeros();
    let v = shl_digits(den, shift);
    let mut u = shl_digits_extend(num, shift);
    let mut q = vec![0u32; m + 1];
    let base = 1u64 << 32;

    for j in (0..=m).rev() {
        let top = ((u[j + n] as u64) << 32) | u[j + n - 1] as u64;
        let mut qhat = top / v[n - 1] as u64;
        let mut rhat = top % v[n - 1] as u64;
        while qhat >= base
            || qhat * v[n - 2] as u64 > (rhat << 32) + u[j + n - 2] as u64
        {
            qhat -= 1;
            rhat += v[n - 1] as u64;
            if rhat >= base {
                break;
            }
        }

        // multiply-subtract the trial product
        let mut borrow = 0i64;
        let mut carry = 0u64;
        for i in 0..n {
            let product = qhat * v[i] as u64 + carry;
            carry = product >> 32;
            let t = u[j + i] as i64 - (product as u32) as i64 + borrow;
            u[j + i] = t as u32;
            borrow = t >> 32;
        }
        let t = u[j + n] as i64 - carry as i64 + borrow;
        u[j + n] = t as u32;

        if t < 0 {
            // trial quotient was one too large, add the divisor back
            qhat -= 1;
            let mut carry = 0u64;
            for i in 0..n {
                let t = u[j + i] as u64 + v[i] as u64 + carry;
                u[j + i] = t as u32;
                carry = t >> 32;
            }
            u[j + n] = (u[j + n] as u64 + carry) as u32;
        }
        q[j] = qhat as u32;
    }

    (q, shr_digits(&u[..n], shift))
}

fn shl_digits(digits: &[u32], shift: u32) -> Vec<u32> {
    if shift == 0 {
        return digits.to_vec();
    }
    let mut out = Vec::with_capacity(digits.len());
    let mut carry = 0u32;
    for &limb in digits {
        out.push((limb << shift) | carry);
        carry = limb >> (32 - shift);
    }
    debug_assert_eq!(carry, 0);
    out
}

/// Left shift that always appends one extra limb for the spill.
fn shl_digits_extend(digits: &[u32], shift: u32) -> Vec<u32> {
    let mut out = Vec::with_capacity(digits.len() + 1);
    let mut carry = 0u32;
    for &limb in digits {
        if shift == 0 {
            out.push(limb);
        } else {
            out.push((limb << shift) | carry);
            carry = limb >> (32 - shift);
        }
    }
    out.push(carry);
    out
}

fn shr_digits(digits: &[u32], shift: u32) -> Vec<u32> {
    if shift == 0 {
        return digits.to_vec();
    }
    let mut out = vec![0u32; digits.len()];
    let mut carry = 0u32;
    for (i, &limb) in digits.iter().enumerate().rev() {
        out[i] = (limb >> shift) | carry;
        carry = limb << (32 - shift);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    fn big(text: &str) -> BigInt {
        text.parse().unwrap()
    }

    fn oracle(value: &BigInt) -> num_bigint::BigInt {
        value.to_string().parse().unwrap()
    }

    #[test]
    fn add_sub_dispatch_on_sign() {
        assert_eq!(&big("1") + &big("2"), big("3"));
        assert_eq!(&big("-1") + &big("-2"), big("-3"));
        assert_eq!(&big("1") + &big("-2"), big("-1"));
        assert_eq!(&big("-100") + &big("100"), BigInt::zero());
        assert_eq!(&big("5") - &big("7"), big("-2"));
        assert_eq!(
            &big("0x8000000000000000") + &big("0x8000000000000000"),
            big("0x10000000000000000")
        );
    }

    #[test]
    fn mul_sizes_result_buffer() {
        assert_eq!(&big("0xffffffff") * &big("0xffffffff"), big("0xfffffffe00000001"));
        assert_eq!(&big("-3") * &big("4"), big("-12"));
        assert_eq!(&big("-3") * &big("-4"), big("12"));
        assert_eq!(&big("0") * &big("123456789"), BigInt::zero());
    }

    #[test]
    fn division_fixture() {
        let (q, r) = big("0xFEDCBA9876543210").div_rem(&big("0x1234")).unwrap();
        assert_eq!(q, big("0xE0042813BE5DC"));
        assert_eq!(&(&q * &big("0x1234")) + &r, big("0xFEDCBA9876543210"));
    }

    #[test]
    fn division_by_zero_message() {
        let err = big("-1").div_rem(&BigInt::zero()).unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        assert_eq!(err.to_string(), "0 is an invalid divisor value.");
    }

    #[test]
    fn division_truncates_toward_zero() {
        let cases = [
            ("7", "2", "3", "1"),
            ("-7", "2", "-3", "-1"),
            ("7", "-2", "-3", "1"),
            ("-7", "-2", "3", "-1"),
            ("1", "2", "0", "1"),
            ("-1", "2", "0", "-1"),
        ];
        for (a, b, q, r) in cases {
            let (quot, rem) = big(a).div_rem(&big(b)).unwrap();
            assert_eq!(quot, big(q), "{a} / {b}");
            assert_eq!(rem, big(r), "{a} % {b}");
        }
    }

    #[test]
    fn multi_limb_division_matches_long_division() {
        let a = big("0x1fffffffffffffffffffffffffffffffffffffffff");
        let b = big("0xfffffffffffffffffffff");
        let (q, r) = a.div_rem(&b).unwrap();
        let expected_q: num_bigint::BigInt = oracle(&a) / oracle(&b);
        let expected_r: num_bigint::BigInt = oracle(&a) % oracle(&b);
        assert_eq!(q.to_string(), expected_q.to_string());
        assert_eq!(r.to_string(), expected_r.to_string());
    }

    #[test]
    fn division_law_holds() {
        proptest!(|(
            a_neg in proptest::bool::ANY,
            b_neg in proptest::bool::ANY,
            a_text in "[0-9]{1,40}",
            b_text in "[1-9][0-9]{0,20}",
        )| {
            let a = if a_neg { big(&format!("-{a_text}")) } else { big(&a_text) };
            let b = if b_neg { big(&format!("-{b_text}")) } else { big(&b_text) };
            let (q, r) = a.div_rem(&b).unwrap();
            assert_eq!(&(&q * &b) + &r, a);
            assert!(r.is_zero() || r.sign() == a.sign());
            assert_eq!(r.compare_magnitude(&b), Ordering::Less);
        });
    }

    #[test]
    fn arithmetic_matches_oracle() {
        proptest!(|(a_text in "-?[0-9]{1,40}", b_text in "-?[0-9]{1,40}")| {
            let a = big(&a_text);
            let b = big(&b_text);
            let (oa, ob) = (oracle(&a), oracle(&b));
            assert_eq!((&a + &b).to_string(), (&oa + &ob).to_string());
            assert_eq!((&a - &b).to_string(), (&oa - &ob).to_string());
            assert_eq!((&a * &b).to_string(), (&oa * &ob).to_string());
        });
    }
}
