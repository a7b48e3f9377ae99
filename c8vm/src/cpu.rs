//! CPU and memory state.
use crate::constants::*;

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: Address,
    /// Stack pointer, indicating the number of occupied stack slots.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// Can be pushed past the 12-bit address space by `ADD I, Vx`,
    /// so memory accesses through it are masked.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to. One byte per pixel, either 0 or 1.
    pub(crate) display: Box<[u8; DISPLAY_BUFFER_SIZE]>,
    /// Set whenever the display buffer changes, cleared by the presenter.
    pub(crate) display_dirty: bool,
}

/// Power-on state, with the font already in memory.
impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([0; DISPLAY_BUFFER_SIZE]),
            display_dirty: true,
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put every register and memory buffer back into its power-on state.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_state = 0;

        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(0);
        self.display_dirty = true;

        self.load_font();
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    pub fn clear_display(&mut self) {
        self.display.fill(0);
        self.display_dirty = true;
    }

    /// Read a byte of memory, wrapping the address into the 4KB space.
    #[inline(always)]
    pub fn read(&self, address: usize) -> u8 {
        self.ram[address & ADDRESS_MASK]
    }

    /// Write a byte of memory, wrapping the address into the 4KB space.
    #[inline(always)]
    pub fn write(&mut self, address: usize, value: u8) {
        self.ram[address & ADDRESS_MASK] = value;
    }

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    /// Keys outside of the keypad are never pressed.
    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the lowest key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            Some(self.key_state.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down both timers by one tick.
    ///
    /// Returns `true` when the sound timer crossed from 1 to 0,
    /// which is when the buzzer should sound.
    #[inline]
    pub fn tick_timers(&mut self) -> bool {
        self.delay_timer = self.delay_timer.saturating_sub(1);

        let tone = self.sound_timer == 1;
        self.sound_timer = self.sound_timer.saturating_sub(1);
        tone
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        cpu.set_key_state(0, true);
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        cpu.set_key_state(7, true);
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(0, false);
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(15, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));
        assert!(cpu.key_state(15));

        // out of range keys are ignored
        cpu.set_key_state(16, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(16));
    }

    #[test]
    fn test_first_key() {
        let mut cpu = Chip8Cpu::default();
        assert_eq!(cpu.first_key(), None);

        cpu.set_key_state(0xB, true);
        cpu.set_key_state(0x4, true);
        assert_eq!(cpu.first_key(), Some(0x4));

        cpu.set_key_state(0x4, false);
        assert_eq!(cpu.first_key(), Some(0xB));
    }

    #[test]
    fn test_tick_timers() {
        let mut cpu = Chip8Cpu::default();
        cpu.delay_timer = 2;
        cpu.sound_timer = 2;

        assert!(!cpu.tick_timers());
        assert_eq!(cpu.delay_timer, 1);
        assert_eq!(cpu.sound_timer, 1);

        assert!(cpu.tick_timers());
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);

        // timers rest at zero, and the tone is one-shot
        assert!(!cpu.tick_timers());
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_default_has_font() {
        let cpu = Chip8Cpu::default();
        assert_eq!(&cpu.ram[..FONTSET_DATA_LENGTH], &FONTSET[..]);
        assert!(cpu.ram[FONTSET_DATA_LENGTH..].iter().all(|b| *b == 0));
        assert_eq!(cpu.pc, 0x200);
        assert!(cpu.display_dirty);
    }

    #[test]
    fn test_reset() {
        let mut cpu = Chip8Cpu::new();
        cpu.registers[3] = 9;
        cpu.ram[0x300] = 0xFF;
        cpu.display[10] = 1;
        cpu.display_dirty = false;
        cpu.sp = 2;

        cpu.reset();

        assert_eq!(cpu.registers, [0; REGISTER_COUNT]);
        assert_eq!(cpu.ram[0x300], 0);
        assert_eq!(cpu.display[10], 0);
        assert_eq!(cpu.sp, 0);
        assert_eq!(cpu.pc, 0x200);
        assert!(cpu.display_dirty);
        assert_eq!(&cpu.ram[..FONTSET_DATA_LENGTH], &FONTSET[..]);
    }
}
