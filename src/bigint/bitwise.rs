//! Bitwise ops over the infinite-bit two's-complement extension: negative
//! values conceptually carry infinite leading 1-bits, so both operands are
//! materialized wide enough to include a sign limb before the limb-wise op.

use std::ops::{BitAnd, BitOr, BitXor};

use super::{BigInt, Sign};

impl BitOr for &BigInt {
    type Output = BigInt;

    fn bitor(self, rhs: &BigInt) -> BigInt {
        bitwise_op(self, rhs, |a, b| a | b)
    }
}

impl BitAnd for &BigInt {
    type Output = BigInt;

    fn bitand(self, rhs: &BigInt) -> BigInt {
        bitwise_op(self, rhs, |a, b| a & b)
    }
}

impl BitXor for &BigInt {
    type Output = BigInt;

    fn bitxor(self, rhs: &BigInt) -> BigInt {
        bitwise_op(self, rhs, |a, b| a ^ b)
    }
}

fn bitwise_op(lhs: &BigInt, rhs: &BigInt, op: fn(u32, u32) -> u32) -> BigInt {
    // one limb beyond the wider operand so the top limb is pure sign fill
    let len = lhs.digits().len().max(rhs.digits().len()) + 1;
    let a = to_twos_complement(lhs, len);
    let b = to_twos_complement(rhs, len);
    let out = a.iter().zip(&b).map(|(&x, &y)| op(x, y)).collect();
    from_twos_complement(out)
}

fn to_twos_complement(value: &BigInt, len: usize) -> Vec<u32> {
    debug_assert!(len > value.digits().len());
    if value.sign() != Sign::Negative {
        let mut limbs = vec![0u32; len];
        limbs[..value.digits().len()].copy_from_slice(value.digits());
        return limbs;
    }
    // invert the magnitude and add one; limbs past the magnitude invert
    // from zero to all-1 fill
    let mut limbs = vec![0u32; len];
    let mut carry = 1u64;
    for (i, limb) in limbs.iter_mut().enumerate() {
        let magnitude = value.digits().get(i).copied().unwrap_or(0);
        let t = (!magnitude) as u64 + carry;
        *limb = t as u32;
        carry = t >> 32;
    }
    limbs
}

fn from_twos_complement(mut limbs: Vec<u32>) -> BigInt {
    let negative = limbs.last().is_some_and(|&top| top & 0x8000_0000 != 0);
    if !negative {
        return BigInt::normalized(Sign::Positive, limbs);
    }
    let mut carry = 1u64;
    for limb in &mut limbs {
        let t = (!*limb) as u64 + carry;
        *limb = t as u32;
        carry = t >> 32;
    }
    BigInt::normalized(Sign::Negative, limbs)
}
