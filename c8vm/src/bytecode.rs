//! Helpers for extracting data from opcodes.
//!
//! Every instruction is a big-endian 16-bit word. Operands are laid out
//! in fixed nibble positions:
//!
//! ```text
//! 0xF000  op    opcode family
//! 0x0F00  x     first register
//! 0x00F0  y     second register
//! 0x000F  n     4-bit immediate, or sub-operation
//! 0x00FF  nn    8-bit immediate
//! 0x0FFF  nnn   12-bit address
//! ```
use crate::constants::{Address, ADDRESS_MASK};

/// Read the instruction word at the given address.
///
/// Both bytes are masked into the 4KB address space, so an instruction
/// straddling the end of memory wraps to address zero.
#[inline(always)]
pub fn fetch(ram: &[u8], address: usize) -> u16 {
    let a = ram[address & ADDRESS_MASK] as u16;
    let b = ram[(address + 1) & ADDRESS_MASK] as u16;
    (a << 8) | b
}

/// Extract the opcode family from the upper nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand X.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand Y.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Extract operand NN.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand NNN.
#[inline(always)]
pub fn op_nnn(word: u16) -> Address {
    word & 0x0FFF
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operands() {
        let word = 0xD12A;
        assert_eq!(op_code(word), 0xD);
        assert_eq!(op_x(word), 0x1);
        assert_eq!(op_y(word), 0x2);
        assert_eq!(op_n(word), 0xA);
        assert_eq!(op_nn(word), 0x2A);
        assert_eq!(op_nnn(word), 0x12A);
    }

    #[test]
    fn test_fetch_wraps() {
        let mut ram = [0u8; 0x1000];
        ram[0xFFF] = 0x12;
        ram[0x000] = 0x34;
        assert_eq!(fetch(&ram, 0xFFF), 0x1234);
        assert_eq!(fetch(&ram, 0x1FFF), 0x1234);
    }
}
