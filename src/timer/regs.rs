//! Register-level interface of a 16-bit Timer/Counter with two output-compare channels.

use super::Channel;
use crate::clocks::Prescaler;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Waveform generation mode: the `WGM1[3:0]` bits, split across `TCCR1A` and `TCCR1B`.
/// Only the modes this library programs are listed; the PWM ones use `ICR1` as TOP.
pub enum WaveformGeneration {
    /// Count up to `0xFFFF`, and wrap.
    Normal = 0,
    /// Count up and down, TOP = `ICR1`. `OCR1x` is updated at BOTTOM.
    PhaseFreqCorrectIcr = 8,
    /// Clear timer on compare match, TOP = `ICR1`. `OCR1x` is not buffered.
    CtcIcr = 12,
    /// Count up and wrap, TOP = `ICR1`. `OCR1x` is updated at BOTTOM.
    FastPwmIcr = 14,
}

impl WaveformGeneration {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Normal),
            8 => Some(Self::PhaseFreqCorrectIcr),
            12 => Some(Self::CtcIcr),
            14 => Some(Self::FastPwmIcr),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Compare output mode: the `COM1x[1:0]` bits. What each one does to the pin depends on
/// the waveform generation mode; see [`PinAction`](super::PinAction).
pub enum CompareOutput {
    Disconnected = 0b00,
    Toggle = 0b01,
    Clear = 0b10,
    Set = 0b11,
}

impl CompareOutput {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Disconnected,
            0b01 => Self::Toggle,
            0b10 => Self::Clear,
            _ => Self::Set,
        }
    }
}

/// Access to the registers of a 16-bit timer. The device backend implements this on the
/// PAC register block; tests implement it on a simulated timer.
///
/// Methods touch one register (or one field) each. Multi-register sequences that must not
/// be observed half-done are wrapped in a critical section by the caller.
pub trait Timer16Regs {
    /// `TCNT1`
    fn counter(&self) -> u16;
    fn set_counter(&mut self, value: u16);

    /// `OCR1A` or `OCR1B`
    fn compare(&self, channel: Channel) -> u16;
    fn set_compare(&mut self, channel: Channel, value: u16);

    /// `ICR1`, used as TOP.
    fn top(&self) -> u16;
    fn set_top(&mut self, value: u16);

    /// Select the clock source. This starts the counter. Dividers outside
    /// `DividerTable::TIMER1` stop it.
    fn set_prescaler(&mut self, prescaler: Prescaler);
    /// Remove the clock source, stopping the counter.
    fn stop(&mut self);
    /// The current clock source; `None` when stopped.
    fn prescaler(&self) -> Option<Prescaler>;

    fn set_waveform(&mut self, mode: WaveformGeneration);
    /// `None` for modes this library doesn't program.
    fn waveform(&self) -> Option<WaveformGeneration>;

    fn set_compare_output(&mut self, channel: Channel, mode: CompareOutput);
    fn compare_output(&self, channel: Channel) -> CompareOutput;
    /// Apply the channel's compare output action now, without a compare match. Only has
    /// an effect in non-PWM modes. (`FOC1x`)
    fn force_compare(&mut self, channel: Channel);

    /// `OCIE1x`
    fn enable_compare_interrupt(&mut self, channel: Channel);
    fn disable_compare_interrupt(&mut self, channel: Channel);
    fn is_compare_interrupt_enabled(&self, channel: Channel) -> bool;

    /// `OCF1x`
    fn is_compare_match_pending(&self, channel: Channel) -> bool;
    fn clear_compare_match_flag(&mut self, channel: Channel);
}
