//! 256-bit word helpers
//!
//! Arithmetic on [`Word`] wraps modulo 2^256 unless a helper says otherwise.
//! Conversions to machine integers report overflow instead of truncating.

use nch_primitives::{Address, H256, U256};

/// The machine word
pub type Word = U256;

/// Word size in bytes
pub const WORD_SIZE: u64 = 32;

/// Number of 32-byte words needed to hold `size` bytes
pub fn to_word_size(size: u64) -> u64 {
    if size > u64::MAX - (WORD_SIZE - 1) {
        return u64::MAX / WORD_SIZE + 1;
    }
    (size + WORD_SIZE - 1) / WORD_SIZE
}

/// Low 64 bits and whether the word did not fit
pub fn to_u64(word: &Word) -> (u64, bool) {
    (word.low_u64(), word.bits() > 64)
}

/// `Some` when the word fits in 64 bits
pub fn checked_u64(word: &Word) -> Option<u64> {
    match to_u64(word) {
        (v, false) => Some(v),
        _ => None,
    }
}

/// Saturating conversion used for offsets into code and call data
pub fn saturating_usize(word: &Word) -> usize {
    checked_u64(word)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(usize::MAX)
}

/// Word from a boolean
pub fn from_bool(b: bool) -> Word {
    if b {
        Word::one()
    } else {
        Word::zero()
    }
}

/// Big-endian bytes
pub fn to_bytes(word: &Word) -> [u8; 32] {
    let mut out = [0u8; 32];
    word.to_big_endian(&mut out);
    out
}

/// Storage key/value view of a word
pub fn to_h256(word: &Word) -> H256 {
    H256::from_word(*word)
}

/// Address held in the low 20 bytes
pub fn to_address(word: &Word) -> Address {
    Address::from_word(*word)
}

/// `size` bytes of `data` starting at `start`, right-padded with zeros
pub fn get_data(data: &[u8], start: u64, size: u64) -> Vec<u8> {
    let len = data.len() as u64;
    let start = start.min(len);
    let end = start.saturating_add(size).min(len);
    let mut out = data[start as usize..end as usize].to_vec();
    out.resize(size as usize, 0);
    out
}

// ==================== Signed arithmetic ====================

fn is_negative(v: &Word) -> bool {
    v.bit(255)
}

fn negate(v: Word) -> Word {
    (!v).overflowing_add(Word::one()).0
}

fn abs(v: Word) -> Word {
    if is_negative(&v) {
        negate(v)
    } else {
        v
    }
}

/// Two's complement division, zero on division by zero
pub fn sdiv(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let q = abs(a) / abs(b);
    if is_negative(&a) != is_negative(&b) {
        negate(q)
    } else {
        q
    }
}

/// Two's complement modulo taking the sign of the dividend
pub fn smod(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let r = abs(a) % abs(b);
    if is_negative(&a) {
        negate(r)
    } else {
        r
    }
}

/// Signed less-than
pub fn slt(a: &Word, b: &Word) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// `(a + b) % n` without losing the carry
pub fn addmod(a: Word, b: Word, n: Word) -> Word {
    if n.is_zero() {
        return Word::zero();
    }
    let (a, b) = (a % n, b % n);
    let (sum, carry) = a.overflowing_add(b);
    if carry || sum >= n {
        sum.overflowing_sub(n).0
    } else {
        sum
    }
}

/// `(a * b) % n` through a 512-bit product
pub fn mulmod(a: Word, b: Word, n: Word) -> Word {
    if n.is_zero() {
        return Word::zero();
    }
    let product = a.full_mul(b);
    let reduced = product % primitive_types::U512::from(n);
    // reduced < n, so it fits in 256 bits
    let mut bytes = [0u8; 64];
    reduced.to_big_endian(&mut bytes);
    Word::from_big_endian(&bytes[32..])
}

/// Exponentiation modulo 2^256
pub fn exp(base: Word, exponent: Word) -> Word {
    base.overflowing_pow(exponent).0
}

/// Sign-extend `x` from byte `b` (0 = least significant)
pub fn signextend(b: Word, x: Word) -> Word {
    if b >= Word::from(31u64) {
        return x;
    }
    let bit = b.low_u64() as usize * 8 + 7;
    let mask = (Word::one() << bit) - Word::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// Byte `i` of `x`, 0 being the most significant
pub fn byte(i: Word, x: Word) -> Word {
    if i >= Word::from(32u64) {
        return Word::zero();
    }
    Word::from(x.byte(31 - i.low_u64() as usize))
}

/// Logical shift left
pub fn shl(shift: Word, value: Word) -> Word {
    if shift >= Word::from(256u64) {
        return Word::zero();
    }
    value << shift.low_u64() as usize
}

/// Logical shift right
pub fn shr(shift: Word, value: Word) -> Word {
    if shift >= Word::from(256u64) {
        return Word::zero();
    }
    value >> shift.low_u64() as usize
}

/// Arithmetic shift right
pub fn sar(shift: Word, value: Word) -> Word {
    let negative = is_negative(&value);
    if shift >= Word::from(256u64) {
        return if negative { Word::MAX } else { Word::zero() };
    }
    let s = shift.low_u64() as usize;
    let shifted = value >> s;
    if negative && s > 0 {
        shifted | (Word::MAX << (256 - s))
    } else {
        shifted
    }
}
