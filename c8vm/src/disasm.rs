//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    constants::{Address, MEM_START},
    instr::{decode, Op},
};

/// Walks a program two bytes at a time, printing each word as an instruction.
///
/// Programs mix code and sprite data, so data words come out as
/// instructions too. Anything that does not decode is shown as a raw word.
///
/// A program of odd length has its last byte padded with a zero, both in
/// the listing and when iterating over the decoded instructions.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Disassemble the whole program into a listing.
    pub fn listing(&mut self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble(&mut s)?;
            self.cursor += 2;
        }
        self.cursor = 0;

        Ok(s)
    }

    /// Write a single instruction to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let Some(word) = self.word_at(self.cursor) else {
            return Ok(());
        };
        let address = (MEM_START + self.cursor) as Address;

        match decode(word) {
            Op::Unknown(_) => writeln!(w, "0x{address:04X} {word:04X}  ???"),
            op => writeln!(w, "0x{address:04X} {word:04X}  {op}"),
        }
    }

    fn word_at(&self, cursor: usize) -> Option<u16> {
        let hi = *self.bytecode.get(cursor)?;
        let lo = self.bytecode.get(cursor + 1).copied().unwrap_or(0);
        Some(u16::from_be_bytes([hi, lo]))
    }
}

impl<'a> Iterator for Disassembler<'a> {
    type Item = (Address, Op);

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.word_at(self.cursor)?;
        let address = (MEM_START + self.cursor) as Address;
        self.cursor += 2;

        Some((address, decode(word)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_listing() {
        let bytecode = [0x60, 0x05, 0xA2, 0x1E, 0xD0, 0x14, 0x51, 0x21, 0x12, 0x00];
        let listing = Disassembler::new(&bytecode).listing().unwrap();
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(
            lines,
            [
                "0x0200 6005  LD v0, 0x05",
                "0x0202 A21E  LD I, 0x21E",
                "0x0204 D014  DRW v0, v1, 4",
                "0x0206 5121  ???",
                "0x0208 1200  JP 0x200",
            ]
        );
    }

    #[test]
    fn test_odd_length() {
        let listing = Disassembler::new(&[0x00, 0xE0, 0x12]).listing().unwrap();
        assert_eq!(listing.lines().last(), Some("0x0202 1200  JP 0x200"));
    }

    #[test]
    fn test_iterator() {
        let ops: Vec<_> = Disassembler::new(&[0x00, 0xE0, 0x00, 0xEE, 0x12]).collect();
        assert_eq!(
            ops,
            [
                (0x200, Op::ClearScreen),
                (0x202, Op::Return),
                (0x204, Op::Jump { address: 0x200 }),
            ]
        );

        // both views agree on the padded word
        let listing = Disassembler::new(&[0x00, 0xE0, 0x00, 0xEE, 0x12]).listing().unwrap();
        assert_eq!(listing.lines().count(), ops.len());
    }
}
