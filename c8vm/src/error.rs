//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Attempt to load a program that can't fit in memory.
    ProgramTooLarge { size: usize },
    /// The fetched instruction is not part of the instruction set.
    ///
    /// This is a diagnostic. The program counter has already moved past
    /// the instruction, the timers were counted down, and the VM can keep
    /// stepping. `tone` reports the buzzer event of that timer tick.
    UnknownOpcode {
        address: Address,
        opcode: u16,
        tone: bool,
    },
    /// A `CALL` was attempted with every stack slot in use.
    StackOverflow { address: Address },
    /// A `RET` was attempted with an empty call stack.
    StackUnderflow { address: Address },
}

impl Chip8Error {
    /// Whether the VM is stuck on the faulting instruction.
    ///
    /// Stepping again after a fatal error reports the same error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnknownOpcode { .. })
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramTooLarge { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, limit is {MAX_PROGRAM_SIZE}"
            ),
            Self::UnknownOpcode {
                address, opcode, ..
            } => {
                write!(f, "unknown opcode {opcode:04X} at {address:04X}")
            }
            Self::StackOverflow { address } => write!(f, "call stack overflow at {address:04X}"),
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at {address:04X}")
            }
        }
    }
}

impl std::error::Error for Chip8Error {}
