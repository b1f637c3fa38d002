//! Arithmetic

use crate::error::VmResult;
use crate::evm::Evm;
use crate::interpreter::Frame;
use crate::word::{self, Word};

binary_op!(add, |a, b| a.overflowing_add(b).0);
binary_op!(mul, |a, b| a.overflowing_mul(b).0);
binary_op!(sub, |a, b| a.overflowing_sub(b).0);
binary_op!(div, |a, b| if b.is_zero() { Word::zero() } else { a / b });
binary_op!(sdiv, |a, b| word::sdiv(a, b));
binary_op!(rem, |a, b| if b.is_zero() { Word::zero() } else { a % b });
binary_op!(smod, |a, b| word::smod(a, b));
ternary_op!(addmod, |a, b, n| word::addmod(a, b, n));
ternary_op!(mulmod, |a, b, n| word::mulmod(a, b, n));
binary_op!(exp, |base, exponent| word::exp(base, exponent));
binary_op!(signextend, |b, x| word::signextend(b, x));
