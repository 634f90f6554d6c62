//! Conversion between a duty cycle in percent and a compare register value.

use super::TimerError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A duty cycle, in whole percent: 0 to 100.
pub struct DutyCycle(u8);

impl DutyCycle {
    /// Always low.
    pub const ZERO: Self = Self(0);
    /// Always high.
    pub const FULL: Self = Self(100);
    /// A toggling pin.
    pub const HALF: Self = Self(50);

    pub const fn new(percent: u8) -> Result<Self, TimerError> {
        if percent > 100 {
            return Err(TimerError::InvalidDutyCycle);
        }
        Ok(Self(percent))
    }

    pub const fn percent(&self) -> u8 {
        self.0
    }

    /// `100 - self`
    pub const fn complement(&self) -> Self {
        Self(100 - self.0)
    }

    /// 0 % and 100 % are generated as a static pin level, not by the timer.
    pub const fn is_static(&self) -> bool {
        self.0 == 0 || self.0 == 100
    }
}

impl TryFrom<u8> for DutyCycle {
    type Error = TimerError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

/// Compare value for `duty` with a counter TOP of `top`: `round(duty · top / 100)`. Never
/// above `top`.
pub const fn encode(top: u16, duty: DutyCycle) -> u16 {
    ((duty.0 as u32 * top as u32 + 50) / 100) as u16
}

/// The duty cycle a compare value represents, rounded to the nearest percent. Values above
/// `top` read as 100 %; a TOP of 0 reads as 0 %.
pub const fn decode(top: u16, compare: u16) -> DutyCycle {
    if top == 0 {
        return DutyCycle::ZERO;
    }
    if compare >= top {
        return DutyCycle::FULL;
    }
    let top = top as u32;
    DutyCycle(((compare as u32 * 100 + top / 2) / top) as u8)
}
