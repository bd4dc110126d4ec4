use super::{ConstantIndex, Error};

/// Opcodes that the rewriter has to recognize or emit
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const IINC: u8 = 0x84;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const WIDE: u8 = 0xc4;
}

/// What an instruction means, as far as call-site rewriting is concerned
///
/// Every instruction falls in exactly one of these buckets. Anything which can't refer to a
/// method (directly or through a constant) is `Other`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CodeElement {
    /// `invokevirtual`, `invokespecial`, `invokestatic`, or `invokeinterface`
    Invoke { opcode: u8, method: ConstantIndex },

    /// `invokedynamic`, pointing at an `InvokeDynamic` constant
    InvokeDynamic { call_site: ConstantIndex },

    /// `ldc`, `ldc_w`, or `ldc2_w`
    LoadConstant { constant: ConstantIndex },

    Other,
}

/// Decoded instruction, located in its code array
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    /// Offset of the opcode byte
    pub offset: usize,

    /// Total length in bytes (opcode, padding, and operands)
    pub length: usize,

    pub element: CodeElement,
}

/// Split a code array into instructions
///
/// Only instruction boundaries and constant pool operands are decoded; branch offsets and the
/// like are left alone since nothing in the code array moves when it gets rewritten.
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>, Error> {
    let mut instructions = vec![];
    let mut offset = 0;
    while offset < code.len() {
        let instruction = decode_instruction(code, offset)?;
        offset += instruction.length;
        instructions.push(instruction);
    }
    Ok(instructions)
}

fn decode_instruction(code: &[u8], offset: usize) -> Result<Instruction, Error> {
    use self::opcodes::*;

    let opcode = code[offset];
    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        LDC => 2,
        LDC_W | LDC2_W => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        TABLESWITCH => {
            let operands = switch_operands_at(offset);
            let low = read_i32(code, offset, operands + 4)?;
            let high = read_i32(code, offset, operands + 8)?;
            if high < low {
                return Err(Error::MalformedSwitch { offset });
            }
            let entries = (high as i64 - low as i64 + 1) as usize;
            operands - offset + 12 + 4 * entries
        }
        LOOKUPSWITCH => {
            let operands = switch_operands_at(offset);
            let pairs = read_i32(code, offset, operands + 4)?;
            if pairs < 0 {
                return Err(Error::MalformedSwitch { offset });
            }
            operands - offset + 8 + 8 * pairs as usize
        }
        0xac..=0xb1 => 1,
        0xb2..=0xb5 => 3,
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => match code.get(offset + 1) {
            Some(&IINC) => 6,
            Some(&(0x15..=0x19 | 0x36..=0x3a | 0xa9)) => 4,
            Some(&other) => {
                return Err(Error::UnknownOpcode {
                    opcode: other,
                    offset: offset + 1,
                })
            }
            None => return Err(Error::TruncatedCode { offset }),
        },
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        _ => return Err(Error::UnknownOpcode { opcode, offset }),
    };

    if offset + length > code.len() {
        return Err(Error::TruncatedCode { offset });
    }

    let element = match opcode {
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => CodeElement::Invoke {
            opcode,
            method: read_index(code, offset + 1),
        },
        INVOKEDYNAMIC => CodeElement::InvokeDynamic {
            call_site: read_index(code, offset + 1),
        },
        LDC => CodeElement::LoadConstant {
            constant: ConstantIndex(code[offset + 1] as u16),
        },
        LDC_W | LDC2_W => CodeElement::LoadConstant {
            constant: read_index(code, offset + 1),
        },
        _ => CodeElement::Other,
    };

    Ok(Instruction {
        offset,
        length,
        element,
    })
}

/// Switch operands start at the next multiple of four after the opcode
fn switch_operands_at(offset: usize) -> usize {
    (offset + 4) & !3
}

fn read_i32(code: &[u8], offset: usize, at: usize) -> Result<i32, Error> {
    match code.get(at..at + 4) {
        Some(bytes) => Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(Error::TruncatedCode { offset }),
    }
}

/// Caller must have checked that the two bytes are in bounds
fn read_index(code: &[u8], at: usize) -> ConstantIndex {
    ConstantIndex(u16::from_be_bytes([code[at], code[at + 1]]))
}

#[cfg(test)]
mod test {
    use super::opcodes::*;
    use super::*;

    #[test]
    fn switch_padding_and_wide() {
        #[rustfmt::skip]
        let code = vec![
            0x03,                                   // 0: iconst_0
            TABLESWITCH, 0, 0,                      // 1: tableswitch (2 bytes of padding)
            0, 0, 0, 20,                            //    default
            0, 0, 0, 1,                             //    low
            0, 0, 0, 2,                             //    high
            0, 0, 0, 20,                            //    case 1
            0, 0, 0, 20,                            //    case 2
            WIDE, IINC, 1, 0, 0, 5,                 // 24: wide iinc
            INVOKEINTERFACE, 0, 9, 1, 0,            // 30: invokeinterface #9
            LDC, 7,                                 // 35: ldc #7
            0xb1,                                   // 37: return
        ];

        let decoded = decode_instructions(&code).unwrap();
        let offsets: Vec<usize> = decoded.iter().map(|i| i.offset).collect();
        assert_eq!(offsets, vec![0, 1, 24, 30, 35, 37]);
        assert_eq!(
            decoded[3].element,
            CodeElement::Invoke {
                opcode: INVOKEINTERFACE,
                method: ConstantIndex(9)
            }
        );
        assert_eq!(
            decoded[4].element,
            CodeElement::LoadConstant {
                constant: ConstantIndex(7)
            }
        );
        assert_eq!(decoded[5].element, CodeElement::Other);
    }

    #[test]
    fn lookupswitch_at_aligned_offset() {
        #[rustfmt::skip]
        let code = vec![
            0x00, 0x00, 0x03,                       // 0: nop, nop, iconst_0
            LOOKUPSWITCH,                           // 3: lookupswitch (no padding)
            0, 0, 0, 13,                            //    default
            0, 0, 0, 1,                             //    npairs
            0, 0, 0, 42, 0, 0, 0, 13,               //    42 => +13
            0xb1,                                   // 20: return
        ];
        let decoded = decode_instructions(&code).unwrap();
        assert_eq!(decoded[3].length, 17);
        assert_eq!(decoded[4].offset, 20);
    }

    #[test]
    fn malformed_code() {
        assert!(matches!(
            decode_instructions(&[INVOKESTATIC, 0]),
            Err(Error::TruncatedCode { offset: 0 })
        ));
        assert!(matches!(
            decode_instructions(&[0x00, 0xca]),
            Err(Error::UnknownOpcode {
                opcode: 0xca,
                offset: 1
            })
        ));
        assert!(matches!(
            decode_instructions(&[WIDE, 0x00, 0, 0]),
            Err(Error::UnknownOpcode { opcode: 0, .. })
        ));
        #[rustfmt::skip]
        let backwards = [TABLESWITCH, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 1];
        assert!(matches!(
            decode_instructions(&backwards),
            Err(Error::MalformedSwitch { offset: 0 })
        ));
    }
}
