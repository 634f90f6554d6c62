//! This module provides the General Purpose Input and Output (GPIO) access the timer needs:
//! pin direction, and reading and writing pin levels.
//!
//! It's expressed as the [`Gpio`] trait; the `atmega328p` feature provides an implementation
//! for `PORTB`, which holds the Timer1 output-compare pins `OC1A` (PB1) and `OC1B` (PB2).

#[cfg(device_selected)]
use crate::pac;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Values for `PINx` and `PORTx`.
pub enum PinState {
    High = 1,
    Low = 0,
}

impl PinState {
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }

    pub const fn is_low(&self) -> bool {
        matches!(self, Self::Low)
    }
}

impl From<bool> for PinState {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    B,
    C,
    D,
}

/// A GPIO pin: its port, and its bit number within the port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    pub port: Port,
    pub bit: u8,
}

impl PinId {
    /// `OC1A`. Package pin 15 on the DIP-28.
    pub const PB1: Self = Self::new(Port::B, 1);
    /// `OC1B`. Package pin 16 on the DIP-28.
    pub const PB2: Self = Self::new(Port::B, 2);

    pub const fn new(port: Port, bit: u8) -> Self {
        Self { port, bit }
    }

    /// Bit mask of the pin in its port registers.
    pub const fn mask(&self) -> u8 {
        1 << (self.bit & 0b111)
    }
}

/// Pin-level access used by the timer to take a pin in and out of waveform control.
pub trait Gpio {
    /// Set the pin's data direction to output.
    fn set_direction_output(&mut self, pin: PinId);
    /// Set the pin's output latch.
    fn write_level(&mut self, pin: PinId, level: PinState);
    /// Read the pin's input level.
    fn read_level(&self, pin: PinId) -> PinState;
}

#[cfg(device_selected)]
/// `PORTB`, the port of the Timer1 output-compare pins.
pub struct PortB {
    regs: pac::PORTB,
}

#[cfg(device_selected)]
impl PortB {
    pub fn new(regs: pac::PORTB) -> Self {
        Self { regs }
    }

    /// Give back the register block.
    pub fn free(self) -> pac::PORTB {
        self.regs
    }
}

#[cfg(device_selected)]
impl Gpio for PortB {
    fn set_direction_output(&mut self, pin: PinId) {
        if pin.port != Port::B {
            warn!("Pin not on PORTB; ignored");
            return;
        }
        self.regs
            .ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() | pin.mask()) });
    }

    fn write_level(&mut self, pin: PinId, level: PinState) {
        if pin.port != Port::B {
            warn!("Pin not on PORTB; ignored");
            return;
        }
        self.regs.portb.modify(|r, w| unsafe {
            match level {
                PinState::High => w.bits(r.bits() | pin.mask()),
                PinState::Low => w.bits(r.bits() & !pin.mask()),
            }
        });
    }

    fn read_level(&self, pin: PinId) -> PinState {
        if pin.port != Port::B {
            return PinState::Low;
        }
        (self.regs.pinb.read().bits() & pin.mask() != 0).into()
    }
}
