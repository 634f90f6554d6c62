//! Timer/Counter1 register access on the ATmega328P.

use super::{Channel, CompareOutput, Timer16Regs, WaveformGeneration};
use crate::{clocks::Prescaler, pac};

/// Register block of Timer/Counter1.
pub struct Tc1Regs {
    regs: pac::TC1,
}

impl Tc1Regs {
    pub fn new(regs: pac::TC1) -> Self {
        Self { regs }
    }

    /// Give back the register block.
    pub fn free(self) -> pac::TC1 {
        self.regs
    }
}

impl Timer16Regs for Tc1Regs {
    fn counter(&self) -> u16 {
        self.regs.tcnt1.read().bits()
    }

    fn set_counter(&mut self, value: u16) {
        self.regs.tcnt1.write(|w| w.bits(value));
    }

    fn compare(&self, channel: Channel) -> u16 {
        match channel {
            Channel::A => self.regs.ocr1a.read().bits(),
            Channel::B => self.regs.ocr1b.read().bits(),
        }
    }

    fn set_compare(&mut self, channel: Channel, value: u16) {
        match channel {
            Channel::A => self.regs.ocr1a.write(|w| w.bits(value)),
            Channel::B => self.regs.ocr1b.write(|w| w.bits(value)),
        }
    }

    fn top(&self) -> u16 {
        self.regs.icr1.read().bits()
    }

    fn set_top(&mut self, value: u16) {
        self.regs.icr1.write(|w| w.bits(value));
    }

    fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.regs.tccr1b.modify(|_, w| match prescaler {
            Prescaler::Div1 => w.cs1().direct(),
            Prescaler::Div8 => w.cs1().prescale_8(),
            Prescaler::Div64 => w.cs1().prescale_64(),
            Prescaler::Div256 => w.cs1().prescale_256(),
            Prescaler::Div1024 => w.cs1().prescale_1024(),
            // Not in `DividerTable::TIMER1`.
            _ => w.cs1().no_clock(),
        });
    }

    fn stop(&mut self) {
        self.regs.tccr1b.modify(|_, w| w.cs1().no_clock());
    }

    fn prescaler(&self) -> Option<Prescaler> {
        match self.regs.tccr1b.read().cs1().bits() {
            1 => Some(Prescaler::Div1),
            2 => Some(Prescaler::Div8),
            3 => Some(Prescaler::Div64),
            4 => Some(Prescaler::Div256),
            5 => Some(Prescaler::Div1024),
            // Stopped, or clocked from the T1 pin.
            _ => None,
        }
    }

    fn set_waveform(&mut self, mode: WaveformGeneration) {
        let bits = mode as u8;
        self.regs.tccr1a.modify(|_, w| w.wgm1().bits(bits & 0b11));
        self.regs.tccr1b.modify(|_, w| w.wgm1().bits(bits >> 2));
    }

    fn waveform(&self) -> Option<WaveformGeneration> {
        let low = self.regs.tccr1a.read().wgm1().bits();
        let high = self.regs.tccr1b.read().wgm1().bits();
        WaveformGeneration::from_bits(high << 2 | low)
    }

    fn set_compare_output(&mut self, channel: Channel, mode: CompareOutput) {
        match channel {
            Channel::A => self.regs.tccr1a.modify(|_, w| match mode {
                CompareOutput::Disconnected => w.com1a().disconnected(),
                CompareOutput::Toggle => w.com1a().match_toggle(),
                CompareOutput::Clear => w.com1a().match_clear(),
                CompareOutput::Set => w.com1a().match_set(),
            }),
            Channel::B => self.regs.tccr1a.modify(|_, w| match mode {
                CompareOutput::Disconnected => w.com1b().disconnected(),
                CompareOutput::Toggle => w.com1b().match_toggle(),
                CompareOutput::Clear => w.com1b().match_clear(),
                CompareOutput::Set => w.com1b().match_set(),
            }),
        }
    }

    fn compare_output(&self, channel: Channel) -> CompareOutput {
        let tccr1a = self.regs.tccr1a.read();
        let bits = match channel {
            Channel::A => tccr1a.com1a().bits(),
            Channel::B => tccr1a.com1b().bits(),
        };
        CompareOutput::from_bits(bits)
    }

    fn force_compare(&mut self, channel: Channel) {
        match channel {
            Channel::A => self.regs.tccr1c.write(|w| w.foc1a().set_bit()),
            Channel::B => self.regs.tccr1c.write(|w| w.foc1b().set_bit()),
        }
    }

    fn enable_compare_interrupt(&mut self, channel: Channel) {
        match channel {
            Channel::A => self.regs.timsk1.modify(|_, w| w.ocie1a().set_bit()),
            Channel::B => self.regs.timsk1.modify(|_, w| w.ocie1b().set_bit()),
        }
    }

    fn disable_compare_interrupt(&mut self, channel: Channel) {
        match channel {
            Channel::A => self.regs.timsk1.modify(|_, w| w.ocie1a().clear_bit()),
            Channel::B => self.regs.timsk1.modify(|_, w| w.ocie1b().clear_bit()),
        }
    }

    fn is_compare_interrupt_enabled(&self, channel: Channel) -> bool {
        let timsk1 = self.regs.timsk1.read();
        match channel {
            Channel::A => timsk1.ocie1a().bit_is_set(),
            Channel::B => timsk1.ocie1b().bit_is_set(),
        }
    }

    fn is_compare_match_pending(&self, channel: Channel) -> bool {
        let tifr1 = self.regs.tifr1.read();
        match channel {
            Channel::A => tifr1.ocf1a().bit_is_set(),
            Channel::B => tifr1.ocf1b().bit_is_set(),
        }
    }

    fn clear_compare_match_flag(&mut self, channel: Channel) {
        // Flags clear by writing a one; `write` leaves the other flags alone.
        match channel {
            Channel::A => self.regs.tifr1.write(|w| w.ocf1a().set_bit()),
            Channel::B => self.regs.tifr1.write(|w| w.ocf1b().set_bit()),
        }
    }
}
