//! Translates a requested output frequency into a clock divider and a counter TOP.
//!
//! Output frequency for each counting mode, with `p` the divider:
//!
//! - CTC, pin toggled on each match: `f = clock / (2 · p · (top + 1))`
//! - Fast PWM: `f = clock / (p · (top + 1))`
//! - Phase (and frequency) correct PWM: `f = clock / (2 · p · top)`
//!
//! Dividers are tried in ascending order; the first one whose rounded TOP fits the counter
//! wins.

use super::{Alignment, Hertz, TimerError, WaveformGeneration};
use crate::{
    clocks::{CpuClock, DividerTable, Prescaler},
    util::{abs_diff, div_round},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Counting mode of a solved configuration.
pub enum WaveformMode {
    /// Clear timer on compare match; a toggling pin outputs a 50 % square wave.
    Ctc,
    /// Single-slope PWM. Edge aligned.
    FastPwm,
    /// Dual-slope PWM. Center aligned, symmetric edges.
    PhaseCorrect,
}

impl WaveformMode {
    /// Counter steps per output period is `factor · (top + offset)`.
    const fn factor(&self) -> u64 {
        match self {
            Self::Ctc | Self::PhaseCorrect => 2,
            Self::FastPwm => 1,
        }
    }

    /// See `factor`.
    const fn top_offset(&self) -> u64 {
        match self {
            Self::Ctc | Self::FastPwm => 1,
            Self::PhaseCorrect => 0,
        }
    }

    /// Smallest usable TOP. A PWM counter needs at least two steps.
    const fn min_top(&self) -> u64 {
        match self {
            Self::Ctc => 0,
            Self::FastPwm | Self::PhaseCorrect => 1,
        }
    }

    /// The register setting implementing this mode with `ICR1` as TOP.
    pub const fn waveform(&self) -> WaveformGeneration {
        match self {
            Self::Ctc => WaveformGeneration::CtcIcr,
            Self::FastPwm => WaveformGeneration::FastPwmIcr,
            Self::PhaseCorrect => WaveformGeneration::PhaseFreqCorrectIcr,
        }
    }

    pub const fn from_waveform(waveform: WaveformGeneration) -> Option<Self> {
        match waveform {
            WaveformGeneration::CtcIcr => Some(Self::Ctc),
            WaveformGeneration::FastPwmIcr => Some(Self::FastPwm),
            WaveformGeneration::PhaseFreqCorrectIcr => Some(Self::PhaseCorrect),
            WaveformGeneration::Normal => None,
        }
    }
}

impl From<Alignment> for WaveformMode {
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Edge => Self::FastPwm,
            Alignment::Center => Self::PhaseCorrect,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Divider, TOP and counting mode that produce a requested frequency.
pub struct TimerConfig {
    pub prescaler: Prescaler,
    pub top: u16,
    pub mode: WaveformMode,
}

impl TimerConfig {
    /// Length of one output period, in CPU clock cycles.
    pub const fn period_clocks(&self) -> u64 {
        self.mode.factor() * self.prescaler.value() as u64 * (self.top as u64 + self.mode.top_offset())
    }

    /// The frequency actually generated, rounded to the nearest Hz. `None` if TOP is out
    /// of range for the mode.
    pub const fn frequency(&self, clock_hz: u32) -> Option<Hertz> {
        if (self.top as u64) < self.mode.min_top() {
            return None;
        }
        Some(Hertz(div_round(clock_hz as u64, self.period_clocks()) as u32))
    }

    /// `|clock - period · target|`. Proportional to the frequency error for a fixed target,
    /// without dividing.
    const fn mismatch(&self, clock_hz: u32, target: Hertz) -> u64 {
        abs_diff(clock_hz as u64, self.period_clocks() * target.0 as u64)
    }
}

/// Frequency solver for one timer: its input clock, counter width and divider table.
#[derive(Clone, Copy, Debug)]
pub struct Solver {
    clock_hz: u32,
    counter_max: u16,
    dividers: DividerTable,
}

impl Solver {
    pub const fn new(clock_hz: u32, counter_max: u16, dividers: DividerTable) -> Self {
        Self {
            clock_hz,
            counter_max,
            dividers,
        }
    }

    /// 8-bit Timer/Counter0.
    pub const fn timer0(clock: CpuClock) -> Self {
        Self::new(clock.hz(), u8::MAX as u16, DividerTable::TIMER0)
    }

    /// 16-bit Timer/Counter1.
    pub const fn timer1(clock: CpuClock) -> Self {
        Self::new(clock.hz(), u16::MAX, DividerTable::TIMER1)
    }

    /// 8-bit Timer/Counter2.
    pub const fn timer2(clock: CpuClock) -> Self {
        Self::new(clock.hz(), u8::MAX as u16, DividerTable::TIMER2)
    }

    /// Find the smallest divider, and the TOP that goes with it, producing `target` in
    /// `mode`. The resulting frequency is rounded, never further than half a counter step
    /// from the target.
    pub fn solve(&self, target: Hertz, mode: WaveformMode) -> Result<TimerConfig, TimerError> {
        let clock = self.clock_hz as u64;
        let freq = target.0 as u64;

        if freq == 0 || freq * 2 > clock {
            debug!("Frequency out of range: {} Hz", target.0);
            return Err(TimerError::UnsupportedFrequency);
        }

        for &prescaler in self.dividers.dividers() {
            let steps = div_round(clock, mode.factor() * prescaler.value() as u64 * freq);
            if steps < mode.top_offset() + mode.min_top() {
                continue;
            }
            let top = steps - mode.top_offset();
            if top > self.counter_max as u64 {
                continue;
            }

            let config = TimerConfig {
                prescaler,
                top: top as u16,
                mode,
            };
            trace!(
                "Solved {} Hz: divider {}, top {}",
                target.0,
                prescaler.value(),
                config.top
            );
            return Ok(config);
        }

        debug!("No divider fits {} Hz", target.0);
        Err(TimerError::UnsupportedFrequency)
    }

    /// Solve for a PWM signal. With an alignment, its mode is used. Without one, both PWM
    /// modes are solved and the one closest to the target is kept; ties go to fast PWM.
    pub fn solve_pwm(
        &self,
        target: Hertz,
        alignment: Option<Alignment>,
    ) -> Result<TimerConfig, TimerError> {
        if let Some(alignment) = alignment {
            return self.solve(target, alignment.into());
        }

        match (
            self.solve(target, WaveformMode::FastPwm),
            self.solve(target, WaveformMode::PhaseCorrect),
        ) {
            (Ok(fast), Ok(phase)) => {
                if phase.mismatch(self.clock_hz, target) < fast.mismatch(self.clock_hz, target) {
                    Ok(phase)
                } else {
                    Ok(fast)
                }
            }
            (Ok(fast), Err(_)) => Ok(fast),
            (Err(_), Ok(phase)) => Ok(phase),
            (Err(e), Err(_)) => Err(e),
        }
    }
}
