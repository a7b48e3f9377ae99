//! Virtual machine.
use std::fmt::{self, Write};

use log::{debug, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    bytecode::fetch,
    conf::{Chip8Conf, TimerMode},
    constants::*,
    cpu::Chip8Cpu,
    error::{Chip8Error, Chip8Result},
    instr::{decode, Op},
    keypad::KeyCode,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

/// What happened during a single step, as far as the host is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Program counter moved on to the next instruction.
    Next,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was changed.
    Draw,
    /// The sound timer was loaded with a non-zero value.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    /// Nothing in the machine changed during this step.
    KeyWait,
}

/// Result of a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub flow: Flow,
    /// The sound timer went from 1 to 0 during this step.
    pub tone: bool,
}

/// Describes how the program counter should be updated after
/// executing an instruction.
enum ProgramCounterUpdate {
    /// Go directly to the next instruction (pc + 2)
    Next,
    /// Skip the next instruction (pc + 4).
    SkipNext,
    /// Jump to the given address.
    Jump(Address),
    /// Stay on the current instruction so it executes again next step.
    Stall,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Put the machine back into its power-on state.
    ///
    /// Memory is erased apart from the built-in font, and the display is
    /// flagged as dirty so the host clears its screen on the next frame.
    pub fn initialize(&mut self) {
        debug!("initializing machine state");
        self.cpu.reset();
    }

    /// Copy a program into memory at the start of program space.
    ///
    /// Memory is left untouched if the program does not fit.
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::ProgramTooLarge {
                size: bytecode.len(),
            });
        }

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);
        debug!("loaded {} byte program", bytecode.len());

        Ok(())
    }

    /// Start a fresh machine with the given program.
    ///
    /// The current state is kept if the program does not fit.
    pub fn reset_and_load(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::ProgramTooLarge {
                size: bytecode.len(),
            });
        }

        self.initialize();
        self.load_program(bytecode)
    }
}

/// Checks whether the given bytecode will fit into the VM memory.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}

/// Input
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    pub fn key_state(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }
}

/// Output
impl Chip8Vm {
    /// Row-major pixel states, one byte per pixel holding either 0 or 1.
    pub fn display_buffer(&self) -> &[u8; DISPLAY_BUFFER_SIZE] {
        &self.cpu.display
    }

    /// Whether the pixel at the given coordinate is lit.
    ///
    /// Coordinates outside of the display are never lit.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.cpu.display[x + y * DISPLAY_WIDTH] != 0
    }

    /// Whether the display buffer changed since the presenter last cleared the flag.
    pub fn is_display_dirty(&self) -> bool {
        self.cpu.display_dirty
    }

    /// Acknowledge that the display buffer has been presented.
    pub fn clear_display_dirty(&mut self) {
        self.cpu.display_dirty = false;
    }

    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    /// Index register `I`.
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn sp(&self) -> usize {
        self.cpu.sp
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.cpu.ram
    }

    /// Return addresses of the active sub-routine calls, innermost last.
    pub fn stack(&self) -> &[Address] {
        &self.cpu.stack[..self.cpu.sp]
    }
}

/// Interpreter
impl Chip8Vm {
    /// Execute a number of steps.
    ///
    /// Unknown opcodes are logged and skipped. Execution stops early
    /// on a fatal error.
    ///
    /// Returns whether a tone was triggered during any of the steps.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<bool> {
        let mut tone = false;

        for _ in 0..step_count {
            match self.step() {
                Ok(outcome) => tone |= outcome.tone,
                Err(Chip8Error::UnknownOpcode { tone: t, .. }) => tone |= t,
                Err(err) => return Err(err),
            }
        }

        Ok(tone)
    }

    /// Count down the delay and sound timers by one tick.
    ///
    /// Intended to be called at 60Hz by hosts using [`TimerMode::External`].
    /// Returns `true` when the buzzer should sound.
    pub fn tick_timers(&mut self) -> bool {
        self.cpu.tick_timers()
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// An [`Chip8Error::UnknownOpcode`] is not fatal. The instruction is
    /// skipped, the timers still count down, and the machine can keep stepping. A stack fault leaves
    /// the machine on the faulting instruction.
    pub fn step(&mut self) -> Chip8Result<Outcome> {
        let pc = self.cpu.pc;

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let word = fetch(&*self.cpu.ram, pc as usize);
        let op = decode(word);
        trace!("{pc:04X}: {word:04X} {op}");

        let (update, flow) = self.exec(op, pc).map_err(|err| {
            warn!("{err}");
            err
        })?;

        self.cpu.pc = match update {
            ProgramCounterUpdate::Next => next_address(pc, 2),
            ProgramCounterUpdate::SkipNext => next_address(pc, 4),
            ProgramCounterUpdate::Jump(address) => address & ADDRESS_MASK as Address,
            ProgramCounterUpdate::Stall => {
                // Waiting does not consume the step.
                return Ok(Outcome { flow, tone: false });
            }
        };

        let tone = match self.conf.timers {
            TimerMode::Step => self.cpu.tick_timers(),
            TimerMode::External => false,
        };

        if let Op::System { .. } | Op::Unknown(_) = op {
            let err = Chip8Error::UnknownOpcode {
                address: pc,
                opcode: word,
                tone,
            };
            warn!("{err}");
            return Err(err);
        }

        Ok(Outcome { flow, tone })
    }

    /// Apply the effect of a single instruction.
    fn exec(&mut self, op: Op, pc: Address) -> Chip8Result<(ProgramCounterUpdate, Flow)> {
        use ProgramCounterUpdate as PC;

        let quirks = self.conf.quirks;
        let cpu = &mut self.cpu;
        let v = &mut cpu.registers;

        let result = match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                cpu.clear_display();
                (PC::Next, Flow::Draw)
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // The stack holds the address of the CALL instruction,
            // so execution continues at the instruction after it.
            Op::Return => {
                if cpu.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { address: pc });
                }
                cpu.sp -= 1;
                let address = next_address(cpu.stack[cpu.sp], 2);
                (PC::Jump(address), Flow::Jump)
            }
            // 1NNN (JP addr)
            Op::Jump { address } => (PC::Jump(address), Flow::Jump),
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            Op::Call { address } => {
                if cpu.sp >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow { address: pc });
                }
                cpu.stack[cpu.sp] = pc;
                cpu.sp += 1;
                (PC::Jump(address), Flow::Jump)
            }
            // 3XNN (SE Vx, byte)
            Op::SkipEqByte { vx, nn } => (skip_if(v[vx as usize] == nn), Flow::Next),
            // 4XNN (SNE Vx, byte)
            Op::SkipNotEqByte { vx, nn } => (skip_if(v[vx as usize] != nn), Flow::Next),
            // 5XY0 (SE Vx, Vy)
            Op::SkipEq { vx, vy } => (skip_if(v[vx as usize] == v[vy as usize]), Flow::Next),
            // 6XNN (LD Vx, byte)
            Op::LoadByte { vx, nn } => {
                v[vx as usize] = nn;
                (PC::Next, Flow::Next)
            }
            // 7xnn (ADD Vx, byte)
            //
            // Carry flag is not set.
            Op::AddByte { vx, nn } => {
                v[vx as usize] = v[vx as usize].wrapping_add(nn);
                (PC::Next, Flow::Next)
            }
            // ----------------------------------------------------------------
            // Arithmetic
            //
            // VF is always written last, so it holds the flag even
            // when it was also the destination.
            Op::Load { vx, vy } => {
                v[vx as usize] = v[vy as usize];
                (PC::Next, Flow::Next)
            }
            Op::Or { vx, vy } => {
                v[vx as usize] |= v[vy as usize];
                if quirks.logic_resets_vf {
                    v[FLAG_REGISTER] = 0;
                }
                (PC::Next, Flow::Next)
            }
            Op::And { vx, vy } => {
                v[vx as usize] &= v[vy as usize];
                if quirks.logic_resets_vf {
                    v[FLAG_REGISTER] = 0;
                }
                (PC::Next, Flow::Next)
            }
            Op::Xor { vx, vy } => {
                v[vx as usize] ^= v[vy as usize];
                if quirks.logic_resets_vf {
                    v[FLAG_REGISTER] = 0;
                }
                (PC::Next, Flow::Next)
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // If overflow, set VF to 1, else 0.
            Op::Add { vx, vy } => {
                let (result, carry) = v[vx as usize].overflowing_add(v[vy as usize]);
                v[vx as usize] = result;
                v[FLAG_REGISTER] = carry as u8;
                (PC::Next, Flow::Next)
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub { vx, vy } => {
                let (result, borrow) = v[vx as usize].overflowing_sub(v[vy as usize]);
                v[vx as usize] = result;
                v[FLAG_REGISTER] = !borrow as u8;
                (PC::Next, Flow::Next)
            }
            // 8XY6 (SHR Vx)
            //
            // VF receives the bit shifted out.
            Op::ShiftRight { vx, vy } => {
                let x = if quirks.shift_uses_vy {
                    v[vy as usize]
                } else {
                    v[vx as usize]
                };
                v[vx as usize] = x >> 1;
                v[FLAG_REGISTER] = x & 1;
                (PC::Next, Flow::Next)
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            Op::SubReverse { vx, vy } => {
                let (result, borrow) = v[vy as usize].overflowing_sub(v[vx as usize]);
                v[vx as usize] = result;
                v[FLAG_REGISTER] = !borrow as u8;
                (PC::Next, Flow::Next)
            }
            // 8XYE (SHL Vx)
            Op::ShiftLeft { vx, vy } => {
                let x = if quirks.shift_uses_vy {
                    v[vy as usize]
                } else {
                    v[vx as usize]
                };
                v[vx as usize] = x << 1;
                v[FLAG_REGISTER] = x >> 7;
                (PC::Next, Flow::Next)
            }
            // ----------------------------------------------------------------
            // 9xy0 (SNE Vx, Vy)
            Op::SkipNotEq { vx, vy } => (skip_if(v[vx as usize] != v[vy as usize]), Flow::Next),
            // Annn (LD I, addr)
            Op::LoadAddress { address } => {
                cpu.address = address;
                (PC::Next, Flow::Next)
            }
            // Bnnn (JP V0, addr)
            Op::JumpV0 { address } => (PC::Jump(address + v[0] as Address), Flow::Jump),
            // CXNN (RND Vx, byte)
            Op::Random { vx, nn } => {
                v[vx as usize] = self.rng.gen::<u8>() & nn;
                (PC::Next, Flow::Next)
            }
            // Dxyn (DRW Vx, Vy, nibble)
            Op::Draw { vx, vy, n } => {
                let x = v[vx as usize] as usize;
                let y = v[vy as usize] as usize;
                let collision = draw_sprite(cpu, x, y, n as usize);

                // If a pixel was erased, then a collision occurred.
                cpu.registers[FLAG_REGISTER] = collision as u8;
                (PC::Next, Flow::Draw)
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            Op::SkipKeyPressed { vx } => {
                let key = cpu.registers[vx as usize];
                (skip_if(cpu.key_state(key)), Flow::Next)
            }
            // ExA1 (SKNP Vx)
            Op::SkipKeyNotPressed { vx } => {
                let key = cpu.registers[vx as usize];
                (skip_if(!cpu.key_state(key)), Flow::Next)
            }
            // Fx0A (LD Vx, K)
            //
            // All execution stops until a key is pressed, then the value of that key is stored in Vx.
            Op::WaitKey { vx } => match cpu.first_key() {
                Some(key) => {
                    cpu.registers[vx as usize] = key;
                    (PC::Next, Flow::Next)
                }
                None => (PC::Stall, Flow::KeyWait),
            },
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            Op::LoadDelay { vx } => {
                v[vx as usize] = cpu.delay_timer;
                (PC::Next, Flow::Next)
            }
            // Fx15 (LD DT, Vx)
            Op::SetDelay { vx } => {
                cpu.delay_timer = v[vx as usize];
                (PC::Next, Flow::Next)
            }
            // Fx18 (LD ST, Vx)
            Op::SetSound { vx } => {
                cpu.sound_timer = v[vx as usize];
                let flow = if cpu.sound_timer > 0 {
                    Flow::Sound
                } else {
                    Flow::Next
                };
                (PC::Next, flow)
            }
            // Fx1E (ADD I, Vx)
            //
            // VF is set when the sum leaves the 12-bit address space,
            // but I keeps the full sum.
            Op::AddAddress { vx } => {
                let sum = cpu.address as u32 + v[vx as usize] as u32;
                cpu.address = sum as Address;
                v[FLAG_REGISTER] = (sum > ADDRESS_MASK as u32) as u8;
                (PC::Next, Flow::Next)
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::LoadFont { vx } => {
                let x = v[vx as usize] as Address;
                cpu.address = FONTSET_START + x * FONTSET_HEIGHT as Address;
                (PC::Next, Flow::Next)
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::StoreBcd { vx } => {
                let addr = cpu.address as usize;
                let x = cpu.registers[vx as usize];
                cpu.write(addr,     x / 100 % 10);
                cpu.write(addr + 1, x / 10  % 10);
                cpu.write(addr + 2, x       % 10);
                (PC::Next, Flow::Next)
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::StoreRegisters { vx } => {
                let addr = cpu.address as usize;
                for r in 0..=vx as usize {
                    let value = cpu.registers[r];
                    cpu.write(addr + r, value);
                }
                if quirks.load_store_increments_i {
                    cpu.address = cpu.address.wrapping_add(vx as Address + 1);
                }
                (PC::Next, Flow::Next)
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::LoadRegisters { vx } => {
                let addr = cpu.address as usize;
                for r in 0..=vx as usize {
                    cpu.registers[r] = cpu.read(addr + r);
                }
                if quirks.load_store_increments_i {
                    cpu.address = cpu.address.wrapping_add(vx as Address + 1);
                }
                (PC::Next, Flow::Next)
            }
            // ----------------------------------------------------------------
            // Machine code routines can't run here, so SYS is as
            // unsupported as any unknown bit pattern.
            Op::System { .. } | Op::Unknown(_) => (PC::Next, Flow::Next),
        };

        Ok(result)
    }
}

#[inline(always)]
fn skip_if(condition: bool) -> ProgramCounterUpdate {
    if condition {
        ProgramCounterUpdate::SkipNext
    } else {
        ProgramCounterUpdate::Next
    }
}

#[inline(always)]
fn next_address(address: Address, offset: Address) -> Address {
    address.wrapping_add(offset) & ADDRESS_MASK as Address
}

/// XOR a sprite of `height` rows, read from memory at `I`, onto the display.
///
/// Sprites are not wrapped around the screen. Each pixel is placed by its
/// buffer index, so columns past the right edge spill onto the start of the
/// next row, and pixels past the end of the buffer are dropped.
///
/// Returns `true` if any lit pixel was erased.
fn draw_sprite(cpu: &mut Chip8Cpu, x: usize, y: usize, height: usize) -> bool {
    let mut is_erased = false;

    for r in 0..height {
        // Each row is 8 bits representing the 8 pixels of the sprite.
        let row = cpu.read(cpu.address as usize + r);

        for c in 0..8 {
            if (row >> (7 - c)) & 1 == 0 {
                continue;
            }

            let d = (y + r) * DISPLAY_WIDTH + x + c;
            if d >= DISPLAY_BUFFER_SIZE {
                continue;
            }

            // XOR erases a pixel when both the old and new values are both 1.
            is_erased |= cpu.display[d] != 0;
            cpu.display[d] ^= 1;
        }
    }

    cpu.display_dirty = true;
    is_erased
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    ///
    /// One line per instruction word, covering the first `count` bytes
    /// after `MEM_START`. An odd count includes the whole word holding
    /// the last byte.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.read(i + 1))?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.pixel(x, y) {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys:")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, " k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }
}
