//! Instruction decoding.
//!
//! Decoding is kept separate from execution. A raw 16-bit word is turned
//! into an [`Op`] value by [`decode`], which the virtual machine then
//! dispatches on. The same representation drives the disassembler.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, constants::Address};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// 0nnn (SYS addr)
    ///
    /// Call a machine code routine on the host CPU. Only meaningful
    /// on the original hardware.
    System { address: Address },
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    Jump { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    SkipEqByte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    SkipNotEqByte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    SkipEq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    LoadByte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    AddByte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx {, Vy})
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    SubReverse { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx {, Vy})
    ShiftLeft { vx: u8, vy: u8 },

    /// 9xy0 (SNE Vx, Vy)
    SkipNotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    LoadAddress { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    JumpV0 { address: Address },
    /// Cxnn (RND Vx, byte)
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    SkipKeyPressed { vx: u8 },
    /// ExA1 (SKNP Vx)
    SkipKeyNotPressed { vx: u8 },
    /// Fx0A (LD Vx, K)
    WaitKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers and memory
    /// Fx07 (LD Vx, DT)
    LoadDelay { vx: u8 },
    /// Fx15 (LD DT, Vx)
    SetDelay { vx: u8 },
    /// Fx18 (LD ST, Vx)
    SetSound { vx: u8 },
    /// Fx1E (ADD I, Vx)
    AddAddress { vx: u8 },
    /// Fx29 (LD F, Vx)
    LoadFont { vx: u8 },
    /// Fx33 (LD B, Vx)
    StoreBcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    StoreRegisters { vx: u8 },
    /// Fx65 (LD Vx, [I])
    LoadRegisters { vx: u8 },

    /// Bit pattern outside of the instruction set.
    Unknown(u16),
}

/// Decode a raw instruction word.
pub fn decode(word: u16) -> Op {
    let vx = op_x(word);
    let vy = op_y(word);
    let n = op_n(word);
    let nn = op_nn(word);
    let nnn = op_nnn(word);

    match op_code(word) {
        0x0 => match word {
            0x00E0 => Op::ClearScreen,
            0x00EE => Op::Return,
            _ => Op::System { address: nnn },
        },
        0x1 => Op::Jump { address: nnn },
        0x2 => Op::Call { address: nnn },
        0x3 => Op::SkipEqByte { vx, nn },
        0x4 => Op::SkipNotEqByte { vx, nn },
        0x5 if n == 0 => Op::SkipEq { vx, vy },
        0x6 => Op::LoadByte { vx, nn },
        0x7 => Op::AddByte { vx, nn },
        0x8 => match n {
            0x0 => Op::Load { vx, vy },
            0x1 => Op::Or { vx, vy },
            0x2 => Op::And { vx, vy },
            0x3 => Op::Xor { vx, vy },
            0x4 => Op::Add { vx, vy },
            0x5 => Op::Sub { vx, vy },
            0x6 => Op::ShiftRight { vx, vy },
            0x7 => Op::SubReverse { vx, vy },
            0xE => Op::ShiftLeft { vx, vy },
            _ => Op::Unknown(word),
        },
        0x9 if n == 0 => Op::SkipNotEq { vx, vy },
        0xA => Op::LoadAddress { address: nnn },
        0xB => Op::JumpV0 { address: nnn },
        0xC => Op::Random { vx, nn },
        0xD => Op::Draw { vx, vy, n },
        0xE => match nn {
            0x9E => Op::SkipKeyPressed { vx },
            0xA1 => Op::SkipKeyNotPressed { vx },
            _ => Op::Unknown(word),
        },
        0xF => match nn {
            0x07 => Op::LoadDelay { vx },
            0x0A => Op::WaitKey { vx },
            0x15 => Op::SetDelay { vx },
            0x18 => Op::SetSound { vx },
            0x1E => Op::AddAddress { vx },
            0x29 => Op::LoadFont { vx },
            0x33 => Op::StoreBcd { vx },
            0x55 => Op::StoreRegisters { vx },
            0x65 => Op::LoadRegisters { vx },
            _ => Op::Unknown(word),
        },
        _ => Op::Unknown(word),
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::System { address } => write!(f, "SYS 0x{address:03X}"),
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::Jump { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::SkipEqByte { vx, nn } => write!(f, "SE v{vx:x}, 0x{nn:02X}"),
            Op::SkipNotEqByte { vx, nn } => write!(f, "SNE v{vx:x}, 0x{nn:02X}"),
            Op::SkipEq { vx, vy } => write!(f, "SE v{vx:x}, v{vy:x}"),
            Op::LoadByte { vx, nn } => write!(f, "LD v{vx:x}, 0x{nn:02X}"),
            Op::AddByte { vx, nn } => write!(f, "ADD v{vx:x}, 0x{nn:02X}"),
            // ------
            Op::Load { vx, vy } => write!(f, "LD v{vx:x}, v{vy:x}"),
            Op::Or { vx, vy } => write!(f, "OR v{vx:x}, v{vy:x}"),
            Op::And { vx, vy } => write!(f, "AND v{vx:x}, v{vy:x}"),
            Op::Xor { vx, vy } => write!(f, "XOR v{vx:x}, v{vy:x}"),
            Op::Add { vx, vy } => write!(f, "ADD v{vx:x}, v{vy:x}"),
            Op::Sub { vx, vy } => write!(f, "SUB v{vx:x}, v{vy:x}"),
            Op::ShiftRight { vx, vy } => write!(f, "SHR v{vx:x}, v{vy:x}"),
            Op::SubReverse { vx, vy } => write!(f, "SUBN v{vx:x}, v{vy:x}"),
            Op::ShiftLeft { vx, vy } => write!(f, "SHL v{vx:x}, v{vy:x}"),
            // ------
            Op::SkipNotEq { vx, vy } => write!(f, "SNE v{vx:x}, v{vy:x}"),
            Op::LoadAddress { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::JumpV0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:x}, 0x{nn:02X}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:x}, v{vy:x}, {n}"),
            // ------
            Op::SkipKeyPressed { vx } => write!(f, "SKP v{vx:x}"),
            Op::SkipKeyNotPressed { vx } => write!(f, "SKNP v{vx:x}"),
            Op::WaitKey { vx } => write!(f, "LD v{vx:x}, K"),
            // ------
            Op::LoadDelay { vx } => write!(f, "LD v{vx:x}, DT"),
            Op::SetDelay { vx } => write!(f, "LD DT, v{vx:x}"),
            Op::SetSound { vx } => write!(f, "LD ST, v{vx:x}"),
            Op::AddAddress { vx } => write!(f, "ADD I, v{vx:x}"),
            Op::LoadFont { vx } => write!(f, "LD F, v{vx:x}"),
            Op::StoreBcd { vx } => write!(f, "LD B, v{vx:x}"),
            Op::StoreRegisters { vx } => write!(f, "LD [I], v{vx:x}"),
            Op::LoadRegisters { vx } => write!(f, "LD v{vx:x}, [I]"),

            Op::Unknown(word) => write!(f, "0x{word:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_decode_instruction_set() {
        let cases = [
            (0x0123, Op::System { address: 0x123 }),
            (0x00E0, Op::ClearScreen),
            (0x00EE, Op::Return),
            (0x1ABC, Op::Jump { address: 0xABC }),
            (0x2ABC, Op::Call { address: 0xABC }),
            (0x3A42, Op::SkipEqByte { vx: 0xA, nn: 0x42 }),
            (0x4A42, Op::SkipNotEqByte { vx: 0xA, nn: 0x42 }),
            (0x5AB0, Op::SkipEq { vx: 0xA, vy: 0xB }),
            (0x6A42, Op::LoadByte { vx: 0xA, nn: 0x42 }),
            (0x7A42, Op::AddByte { vx: 0xA, nn: 0x42 }),
            (0x8AB0, Op::Load { vx: 0xA, vy: 0xB }),
            (0x8AB1, Op::Or { vx: 0xA, vy: 0xB }),
            (0x8AB2, Op::And { vx: 0xA, vy: 0xB }),
            (0x8AB3, Op::Xor { vx: 0xA, vy: 0xB }),
            (0x8AB4, Op::Add { vx: 0xA, vy: 0xB }),
            (0x8AB5, Op::Sub { vx: 0xA, vy: 0xB }),
            (0x8AB6, Op::ShiftRight { vx: 0xA, vy: 0xB }),
            (0x8AB7, Op::SubReverse { vx: 0xA, vy: 0xB }),
            (0x8ABE, Op::ShiftLeft { vx: 0xA, vy: 0xB }),
            (0x9AB0, Op::SkipNotEq { vx: 0xA, vy: 0xB }),
            (0xA123, Op::LoadAddress { address: 0x123 }),
            (0xB123, Op::JumpV0 { address: 0x123 }),
            (0xCA0F, Op::Random { vx: 0xA, nn: 0x0F }),
            (0xDAB5, Op::Draw { vx: 0xA, vy: 0xB, n: 5 }),
            (0xEA9E, Op::SkipKeyPressed { vx: 0xA }),
            (0xEAA1, Op::SkipKeyNotPressed { vx: 0xA }),
            (0xFA07, Op::LoadDelay { vx: 0xA }),
            (0xFA0A, Op::WaitKey { vx: 0xA }),
            (0xFA15, Op::SetDelay { vx: 0xA }),
            (0xFA18, Op::SetSound { vx: 0xA }),
            (0xFA1E, Op::AddAddress { vx: 0xA }),
            (0xFA29, Op::LoadFont { vx: 0xA }),
            (0xFA33, Op::StoreBcd { vx: 0xA }),
            (0xFA55, Op::StoreRegisters { vx: 0xA }),
            (0xFA65, Op::LoadRegisters { vx: 0xA }),
        ];

        for (word, op) in cases {
            assert_eq!(decode(word), op, "decoding {word:04X}");
        }
    }

    #[test]
    fn test_decode_unknown() {
        for word in [0x5121, 0x8008, 0x800F, 0x9AB1, 0xE19F, 0xF000, 0xF1FF] {
            assert_eq!(decode(word), Op::Unknown(word), "decoding {word:04X}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(decode(0x6005).to_string(), "LD v0, 0x05");
        assert_eq!(decode(0xD014).to_string(), "DRW v0, v1, 4");
        assert_eq!(decode(0xA21E).to_string(), "LD I, 0x21E");
        assert_eq!(decode(0xFB65).to_string(), "LD vb, [I]");
        assert_eq!(decode(0x5121).to_string(), "0x5121");
    }
}
