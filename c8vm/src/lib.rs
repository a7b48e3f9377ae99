//! CHIP-8 interpreter core.
//!
//! The machine is driven by the host one instruction at a time with
//! [`Chip8Vm::step`](prelude::Chip8Vm::step). Input is fed in between steps,
//! and the display buffer is read out whenever it is flagged dirty.
mod bytecode;
mod clock;
mod conf;
pub mod constants;
mod cpu;
mod disasm;
mod error;
mod instr;
mod keypad;
mod vm;

pub use self::conf::{Hz, Quirks, TimerMode};

pub mod prelude {
    pub use super::{
        clock::Clock,
        conf::{Chip8Conf, Hz, Quirks, TimerMode},
        cpu::Chip8Cpu,
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        instr::{decode, Op},
        keypad::{InvalidKeyCode, KeyCode},
        vm::{check_program_size, Chip8Vm, Flow, Outcome},
    };
}
