//! Finite pulse trains, sequenced from the compare-match interrupt.
//!
//! The train's state lives in a [`PulseTrain`], shared between the code that arms it and
//! the interrupt handler. Declare it as a `static`:
//!
//! ```
//! use mega_hal::timer::PulseTrain;
//!
//! static TRAIN: PulseTrain = PulseTrain::new();
//! assert!(TRAIN.is_idle());
//! ```
//!
//! While a train runs, each compare match decrements the remaining edge count and loads the
//! compare value for the next edge: `values[1]` when the count left is odd, `values[0]`
//! when it's even. On the last edge the handler stops the timer.

use core::cell::Cell;

use critical_section::Mutex;

use super::{Channel, DutyCycle, Hertz, TimerError};

/// Two edges per pulse.
const EDGES_PER_PULSE: u16 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Snapshot of a pulse train. Written as a whole, never field by field.
pub(crate) struct Sequence {
    pub values: [u16; 2],
    pub remaining: u16,
    pub channel: Channel,
}

impl Sequence {
    const IDLE: Self = Self {
        values: [0, 0],
        remaining: 0,
        channel: Channel::A,
    };

    fn advance(&mut self) -> Step {
        if self.remaining == 0 {
            return Step::Idle;
        }

        self.remaining -= 1;

        if self.remaining == 0 {
            Step::Finished(self.channel)
        } else if self.remaining % 2 == 1 {
            Step::Load(self.channel, self.values[1])
        } else {
            Step::Load(self.channel, self.values[0])
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What the interrupt handler has to do after a compare match.
pub enum Step {
    /// Write this compare value to the channel.
    Load(Channel, u16),
    /// That was the last edge. Stop the timer and release the channel.
    Finished(Channel),
    /// No train running; the match wasn't ours.
    Idle,
}

/// Pulse-train state shared with the compare-match interrupt.
pub struct PulseTrain {
    state: Mutex<Cell<Sequence>>,
}

impl PulseTrain {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(Sequence::IDLE)),
        }
    }

    /// Edges left to generate. Two per pulse.
    pub fn remaining(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow(cs).get().remaining)
    }

    pub fn is_idle(&self) -> bool {
        self.remaining() == 0
    }

    /// Block until the running train, if any, is done. Interrupts must be enabled.
    pub fn wait(&self) {
        while !self.is_idle() {
            core::hint::spin_loop();
        }
    }

    /// Count one compare match, and return what to do about it.
    pub fn advance(&self) -> Step {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut seq = cell.get();
            let step = seq.advance();
            cell.set(seq);
            step
        })
    }

    pub(crate) fn snapshot(&self, cs: critical_section::CriticalSection) -> Sequence {
        self.state.borrow(cs).get()
    }

    pub(crate) fn store(&self, cs: critical_section::CriticalSection, seq: Sequence) {
        self.state.borrow(cs).set(seq);
    }

    pub(crate) fn clear(&self, cs: critical_section::CriticalSection) -> Sequence {
        self.state.borrow(cs).replace(Sequence::IDLE)
    }
}

impl Default for PulseTrain {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge count for `pulses` pulses.
pub(crate) fn edge_count(pulses: u16) -> Result<u16, TimerError> {
    pulses
        .checked_mul(EDGES_PER_PULSE)
        .ok_or(TimerError::PulseCountOverflow)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A finite train of pulses whose edges sit at two positions within the timer period.
///
/// The counter runs in CTC mode with a period of `1 / frequency`, and the pin toggles on
/// each compare match. The rising edge lands `edges[0]` into the period and the falling
/// edge `edges[1]` into it, so a pulse is high for `edges[1] - edges[0]` of the period
/// (wrapping around when `edges[1]` is the smaller one). Both edges being equal gives a
/// 50 % square wave at half `frequency`.
///
/// The two positions must be further apart than the interrupt latency, or the second edge
/// slips to the next period.
pub struct PulseTrainRequest {
    pub frequency: Hertz,
    pub edges: [DutyCycle; 2],
    pub pulses: u16,
}

impl PulseTrainRequest {
    pub const fn new(frequency: Hertz, edges: [DutyCycle; 2], pulses: u16) -> Self {
        Self {
            frequency,
            edges,
            pulses,
        }
    }

    /// Pulses high for `duty` of each period.
    pub const fn with_duty(frequency: Hertz, duty: DutyCycle, pulses: u16) -> Self {
        Self::new(frequency, [DutyCycle::ZERO, duty], pulses)
    }
}
