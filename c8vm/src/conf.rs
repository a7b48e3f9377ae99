//! Virtual machine configuration.
use std::time::Duration;

use crate::constants::NANOS_IN_SECOND;

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Rate at which the host should execute instructions.
    ///
    /// The VM itself never sleeps. This is advice for the loop driving it.
    pub clock_frequency: Option<Hz>,
    /// How the delay and sound timers are counted down.
    pub timers: TimerMode,
    pub quirks: Quirks,
    /// Fixed seed for `RND`, to make runs reproducible.
    pub rng_seed: Option<u64>,
}

impl Chip8Conf {
    /// Number of instructions the host should run per 60Hz frame.
    pub fn steps_per_frame(&self) -> u64 {
        let Hz(freq) = self.clock_frequency.unwrap_or_default();
        (freq / crate::constants::DELAY_FREQUENCY).max(1)
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

/// Commonly used speed for games written for the COSMAC VIP.
impl Default for Hz {
    fn default() -> Self {
        Hz(600)
    }
}

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimerMode {
    /// Timers count down once after every executed instruction.
    ///
    /// Couples the timer rate to the instruction rate, which is not how
    /// the hardware behaved, but it is how many interpreters do it.
    #[default]
    Step,
    /// Timers are only counted down when the host calls
    /// [`Chip8Vm::tick_timers`](crate::prelude::Chip8Vm::tick_timers), ideally at 60Hz.
    External,
}

/// Behaviours that differ between historical interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Quirks {
    /// `SHR` and `SHL` shift `Vy` into `Vx`, instead of shifting `Vx` in place.
    pub shift_uses_vy: bool,
    /// `LD [I], Vx` and `LD Vx, [I]` leave `I` pointing past the last byte accessed.
    pub load_store_increments_i: bool,
    /// `OR`, `AND` and `XOR` reset `VF` to zero.
    pub logic_resets_vf: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            shift_uses_vy: false,
            load_store_increments_i: true,
            logic_resets_vf: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert_eq!(interval, Duration::ZERO);
    }

    #[test]
    fn test_steps_per_frame() {
        let mut conf = Chip8Conf::default();
        assert_eq!(conf.steps_per_frame(), 10);

        conf.clock_frequency = Some(Hz(30));
        assert_eq!(conf.steps_per_frame(), 1);

        conf.clock_frequency = Some(Hz(1200));
        assert_eq!(conf.steps_per_frame(), 20);
    }
}
