//! CPU clock configuration, and the fixed divider tables of the clock-divided
//! peripherals.
//!
//! Only two CPU clocks are handled: 1 MHz (the factory setting, internal RC with
//! `CKDIV8`) and 8 MHz. Any other value is rejected when the [`Clocks`] configuration is
//! built. Use [`CpuClock::from_hz_const`] in a `const` item to turn that into a build error.

use cfg_if::cfg_if;

mod divider;

pub use divider::*;

#[cfg(clock_conflict)]
compile_error!("Select at most one of the `f_cpu_1mhz` and `f_cpu_8mhz` features.");

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The CPU clock is not one of the supported reference frequencies.
    UnsupportedClockFrequency,
    /// No divider in the table gives the requested tick period at this clock.
    UnsupportedPeriod,
    /// No divider in the table gives the requested frequency at this clock.
    UnsupportedDivider,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedClockFrequency => {
                write!(f, "unsupported CPU clock; valid ones: 1 MHz, 8 MHz")
            }
            Self::UnsupportedPeriod => write!(f, "no divider gives that tick period"),
            Self::UnsupportedDivider => write!(f, "no divider gives that frequency"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The CPU clock frequencies this library knows how to divide.
pub enum CpuClock {
    /// 1 MHz. Internal 8 MHz RC oscillator with `CKDIV8` programmed.
    Mhz1,
    /// 8 MHz.
    Mhz8,
}

impl CpuClock {
    /// Frequency, in Hz.
    pub const fn hz(&self) -> u32 {
        match self {
            Self::Mhz1 => 1_000_000,
            Self::Mhz8 => 8_000_000,
        }
    }

    pub const fn from_hz(hz: u32) -> Result<Self, ClockError> {
        match hz {
            1_000_000 => Ok(Self::Mhz1),
            8_000_000 => Ok(Self::Mhz8),
            _ => Err(ClockError::UnsupportedClockFrequency),
        }
    }

    /// Same as `from_hz`, but panics on an unsupported clock. Evaluated in a `const`
    /// context, the panic is a compile error:
    ///
    /// ```
    /// use mega_hal::clocks::CpuClock;
    ///
    /// const CPU: CpuClock = CpuClock::from_hz_const(8_000_000);
    /// assert_eq!(CPU, CpuClock::Mhz8);
    /// ```
    ///
    /// ```compile_fail
    /// use mega_hal::clocks::CpuClock;
    ///
    /// const CPU: CpuClock = CpuClock::from_hz_const(16_000_000);
    /// ```
    pub const fn from_hz_const(hz: u32) -> Self {
        match Self::from_hz(hz) {
            Ok(clock) => clock,
            Err(_) => panic!("Unsupported CPU clock. Valid ones: 1 MHz or 8 MHz."),
        }
    }
}

/// Clock configuration handed to peripheral constructors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    pub cpu: CpuClock,
}

impl Clocks {
    pub const fn new(cpu: CpuClock) -> Self {
        Self { cpu }
    }

    /// Build a configuration from a raw frequency, eg the value of `F_CPU`.
    pub const fn from_hz(hz: u32) -> Result<Self, ClockError> {
        match CpuClock::from_hz(hz) {
            Ok(cpu) => Ok(Self { cpu }),
            Err(e) => Err(e),
        }
    }

    /// CPU clock speed, in Hz. Timer1 runs from it directly.
    pub const fn sysclk(&self) -> u32 {
        self.cpu.hz()
    }
}

impl Default for Clocks {
    /// The CPU clock selected with the `f_cpu_1mhz` or `f_cpu_8mhz` feature; 1 MHz if
    /// neither is set.
    fn default() -> Self {
        cfg_if! {
            if #[cfg(feature = "f_cpu_8mhz")] {
                Self::new(CpuClock::Mhz8)
            } else {
                Self::new(CpuClock::Mhz1)
            }
        }
    }
}
