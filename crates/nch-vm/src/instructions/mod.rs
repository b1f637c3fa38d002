//! Instruction implementations
//!
//! Every handler runs after the interpreter has checked stack bounds, charged
//! gas and grown memory, so memory offsets it reads are known to fit `u64`.

macro_rules! unary_op {
    ($name:ident, |$a:ident| $body:expr) => {
        pub(crate) fn $name(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
            let $a = frame.stack.pop()?;
            frame.stack.push($body)?;
            Ok(Vec::new())
        }
    };
}

macro_rules! binary_op {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        pub(crate) fn $name(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
            let [$a, $b] = frame.stack.pop_n::<2>()?;
            frame.stack.push($body)?;
            Ok(Vec::new())
        }
    };
}

macro_rules! ternary_op {
    ($name:ident, |$a:ident, $b:ident, $c:ident| $body:expr) => {
        pub(crate) fn $name(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
            let [$a, $b, $c] = frame.stack.pop_n::<3>()?;
            frame.stack.push($body)?;
            Ok(Vec::new())
        }
    };
}

pub(crate) mod arithmetic;
pub(crate) mod bitwise;
pub(crate) mod environment;
pub(crate) mod flow;
pub(crate) mod logging;
pub(crate) mod system;
