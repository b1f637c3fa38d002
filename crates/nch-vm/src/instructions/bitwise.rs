//! Comparison and bitwise logic

use crate::error::VmResult;
use crate::evm::Evm;
use crate::interpreter::Frame;
use crate::word::{self, from_bool};

binary_op!(lt, |a, b| from_bool(a < b));
binary_op!(gt, |a, b| from_bool(a > b));
binary_op!(slt, |a, b| from_bool(word::slt(&a, &b)));
binary_op!(sgt, |a, b| from_bool(word::slt(&b, &a)));
binary_op!(eq, |a, b| from_bool(a == b));
unary_op!(iszero, |a| from_bool(a.is_zero()));
binary_op!(and, |a, b| a & b);
binary_op!(or, |a, b| a | b);
binary_op!(xor, |a, b| a ^ b);
unary_op!(not, |a| !a);
binary_op!(byte, |i, x| word::byte(i, x));
binary_op!(shl, |shift, value| word::shl(shift, value));
binary_op!(shr, |shift, value| word::shr(shift, value));
binary_op!(sar, |shift, value| word::sar(shift, value));
