//! Hardware abstraction layer for ATmega microcontrollers, focused on the 16-bit
//! Timer/Counter1 as a signal generator.
//!
//! The library turns an abstract request ("500 kHz square wave on OC1A", "30 % PWM at
//! 1 kHz on OC1B", "send 24 pulses rising 30 % and falling 60 % into each period") into the discrete
//! settings the timer understands: a clock prescaler, a counter top, and compare
//! register values. Finite pulse trains are sequenced from the compare-match interrupt.
//!
//! Hardware access goes through two small traits, [`gpio::Gpio`] and
//! [`timer::Timer16Regs`]. Enable the `atmega328p` feature to get implementations that
//! write the real registers through `avr-device`; everything else is portable, which is
//! also how the crate is tested on a host.
//!
//! Example: generating a PWM signal, and a pulse train driven by the interrupt handler:
//!
//! ```ignore
//! use mega_hal::{
//!     access_global,
//!     clocks::Clocks,
//!     gpio::PortB,
//!     init_globals, make_globals,
//!     timer::{
//!         Channel, DutyCycle, Hertz, PulseTrain, PulseTrainRequest, PwmSignal, Tc1Regs, Timer1,
//!     },
//! };
//!
//! make_globals!((TIMER, Timer1<Tc1Regs, PortB>));
//! static TRAIN: PulseTrain = PulseTrain::new();
//!
//! let clocks = Clocks::default();
//! let mut timer = Timer1::new(Tc1Regs::new(dp.TC1), PortB::new(dp.PORTB), &clocks);
//!
//! timer.generate_pwm(Channel::A, PwmSignal::new(Hertz(1_000), DutyCycle::new(30)?))?;
//!
//! let request = PulseTrainRequest::new(Hertz(10_000), [DutyCycle::new(30)?, DutyCycle::new(60)?], 24);
//! timer.generate_pulse_train(&TRAIN, Channel::B, &request)?;
//! init_globals!((TIMER, timer));
//!
//! #[avr_device::interrupt(atmega328p)]
//! fn TIMER1_COMPB() {
//!     critical_section::with(|cs| {
//!         access_global!(TIMER, timer, cs);
//!         timer.handle_compare_match(&TRAIN);
//!     });
//! }
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

#[cfg(feature = "atmega328p")]
pub use avr_device::atmega328p as pac;

// Keep `fmt` first: its macros are used by the modules below.
#[macro_use]
mod fmt;

pub mod clocks;
pub mod error;
pub mod gpio;
pub mod macros;
pub mod timer;
mod util;

#[cfg(test)]
mod sim;

pub use error::{Error, Result};
