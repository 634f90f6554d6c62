//! Fixed clock dividers of the clock-divided peripherals, and lookups from a requested
//! tick period or output frequency to one of them.
//!
//! Each peripheral only supports a handful of dividers, and only at the two reference
//! CPU clocks. Lookups are `const fn`s, so a fixed configuration can be checked while
//! compiling:
//!
//! ```
//! use mega_hal::clocks::{CpuClock, DividerTable, Prescaler};
//!
//! const SCK: Prescaler = match DividerTable::SPI.for_frequency(CpuClock::Mhz1, 7_812) {
//!     Ok(p) => p,
//!     Err(_) => panic!("Unsupported SCK frequency"),
//! };
//! assert_eq!(SCK, Prescaler::Div128);
//! ```

use super::{ClockError, CpuClock};
use crate::util::div_round;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Division factor applied to the CPU clock before it reaches a peripheral. Not every
/// peripheral supports every divider; see [`DividerTable`].
pub enum Prescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
    Div256,
    Div1024,
}

impl Prescaler {
    pub const fn value(&self) -> u16 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
            Self::Div256 => 256,
            Self::Div1024 => 1_024,
        }
    }
}

/// The dividers a peripheral supports, in ascending order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DividerTable {
    dividers: &'static [Prescaler],
}

impl DividerTable {
    /// Timer/Counter0 (`CS0`).
    pub const TIMER0: Self = Self {
        dividers: &[
            Prescaler::Div1,
            Prescaler::Div8,
            Prescaler::Div64,
            Prescaler::Div256,
            Prescaler::Div1024,
        ],
    };

    /// Timer/Counter1 (`CS1`).
    pub const TIMER1: Self = Self {
        dividers: &[
            Prescaler::Div1,
            Prescaler::Div8,
            Prescaler::Div64,
            Prescaler::Div256,
            Prescaler::Div1024,
        ],
    };

    /// Timer/Counter2 (`CS2`). Has the extra /32 and /128 steps.
    pub const TIMER2: Self = Self {
        dividers: &[
            Prescaler::Div1,
            Prescaler::Div8,
            Prescaler::Div32,
            Prescaler::Div64,
            Prescaler::Div128,
            Prescaler::Div256,
            Prescaler::Div1024,
        ],
    };

    /// SPI clock (`SPR` and `SPI2X`).
    pub const SPI: Self = Self {
        dividers: &[
            Prescaler::Div2,
            Prescaler::Div4,
            Prescaler::Div8,
            Prescaler::Div16,
            Prescaler::Div32,
            Prescaler::Div64,
            Prescaler::Div128,
        ],
    };

    pub const fn dividers(&self) -> &'static [Prescaler] {
        self.dividers
    }

    pub const fn contains(&self, prescaler: Prescaler) -> bool {
        let mut i = 0;
        while i < self.dividers.len() {
            if self.dividers[i] as u8 == prescaler as u8 {
                return true;
            }
            i += 1;
        }
        false
    }

    /// The divider whose clock period is exactly `period_us` microseconds.
    /// Eg at 8 MHz, a 1 µs Timer1 tick is `Div8`.
    pub const fn for_tick_period_us(
        &self,
        clock: CpuClock,
        period_us: u32,
    ) -> Result<Prescaler, ClockError> {
        let ticks_per_us = clock.hz() / 1_000_000;
        let mut i = 0;
        while i < self.dividers.len() {
            let p = self.dividers[i];
            if p.value() as u32 == period_us.saturating_mul(ticks_per_us) {
                return Ok(p);
            }
            i += 1;
        }
        Err(ClockError::UnsupportedPeriod)
    }

    /// The divider producing `freq_hz` from the CPU clock. The frequency of each
    /// divider is `clock / divider` truncated, so 1 MHz / 128 is requested as 7812 Hz.
    pub const fn for_frequency(&self, clock: CpuClock, freq_hz: u32) -> Result<Prescaler, ClockError> {
        let mut i = 0;
        while i < self.dividers.len() {
            let p = self.dividers[i];
            if clock.hz() / p.value() as u32 == freq_hz {
                return Ok(p);
            }
            i += 1;
        }
        Err(ClockError::UnsupportedDivider)
    }
}

/// Length of one divided clock tick, in ns.
pub const fn tick_period_ns(clock: CpuClock, prescaler: Prescaler) -> u32 {
    prescaler.value() as u32 * (1_000_000_000 / clock.hz())
}

/// Frequency of the divided clock, in Hz, rounded to the nearest integer. Eg 1 MHz / 128
/// counts at 7813 Hz.
pub const fn counting_frequency(clock: CpuClock, prescaler: Prescaler) -> u32 {
    div_round(clock.hz() as u64, prescaler.value() as u64) as u32
}
