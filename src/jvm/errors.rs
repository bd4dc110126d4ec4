use super::{Constant, ConstantIndex};

/// Ways in which reading or writing a class file can fail
#[derive(Debug)]
pub enum Error {
    /// Truncated input, or an I/O failure while serializing
    IoError(std::io::Error),

    /// Input does not start with `0xCAFEBABE`
    BadMagic(u32),

    /// Extra bytes follow the last class attribute
    TrailingBytes(usize),

    /// Unknown tag byte for the constant at this index
    BadConstantTag { tag: u8, index: ConstantIndex },

    /// Constant index is zero, past the end of the pool, or points at the second half of a wide
    /// constant
    BadConstantIndex(ConstantIndex),

    /// Constant exists, but is not of the kind that the referencing structure requires
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
        found: Constant,
    },

    /// Method handle reference kind outside of `1..=9`
    BadHandleKind(u8),

    /// `Dynamic` or `InvokeDynamic` points past the end of the `BootstrapMethods` attribute
    BadBootstrapMethod(u16),

    /// Descriptor that does not parse
    BadDescriptor(String),

    /// Opcode not defined by the JVM
    UnknownOpcode { opcode: u8, offset: usize },

    /// Instruction runs past the end of the code array
    TruncatedCode { offset: usize },

    /// `tableswitch` whose upper bound is below its lower bound, or `lookupswitch` with a
    /// negative number of pairs
    MalformedSwitch { offset: usize },

    /// Adding this constant would make the pool exceed 65535 slots
    ConstantPoolOverflow { constant: Constant, offset: usize },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
