//! Provides support for the 16-bit Timer/Counter1 as a signal generator: square waves,
//! PWM, finite pulse trains sequenced from the compare-match interrupt, and a free-running
//! tick counter.
//!
//! The timer has one counter, one divider and one TOP (`ICR1`), shared by its two output
//! compare channels, `OC1A` and `OC1B`. Anything that changes the frequency goes through
//! [`Timer1`] and affects both channels. A [`PwmChannel`] handle can only change its own
//! duty cycle.

use core::fmt;

use crate::{
    clocks::{Clocks, CpuClock, DividerTable, Prescaler},
    gpio::{Gpio, PinId, PinState},
    Result,
};

mod duty;
mod pulse_train;
mod regs;
mod solver;

#[cfg(device_selected)]
mod atmega328p;


#[cfg(device_selected)]
pub use atmega328p::Tc1Regs;
pub use duty::{decode, encode, DutyCycle};
pub use pulse_train::{PulseTrain, PulseTrainRequest, Step};
pub use regs::{CompareOutput, Timer16Regs, WaveformGeneration};
pub use solver::{Solver, TimerConfig, WaveformMode};

use pulse_train::{edge_count, Sequence};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// No divider and TOP produce the requested frequency at this clock.
    UnsupportedFrequency,
    /// Twice the requested pulse count doesn't fit the edge counter.
    PulseCountOverflow,
    /// A duty cycle above 100 %.
    InvalidDutyCycle,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFrequency => write!(f, "frequency can't be generated at this clock"),
            Self::PulseCountOverflow => write!(f, "too many pulses"),
            Self::InvalidDutyCycle => write!(f, "duty cycle above 100 %"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hertz(pub u32);

/// Output alignment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    /// Fast PWM.
    Edge,
    /// Phase and frequency correct PWM.
    Center,
}

/// Timer channel
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// `OC1A`, on PB1
    A,
    /// `OC1B`, on PB2
    B,
}

impl Channel {
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// The pin this channel drives.
    pub const fn pin(&self) -> PinId {
        match self {
            Self::A => PinId::PB1,
            Self::B => PinId::PB2,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What a compare match does to the channel's pin.
pub enum PinAction {
    /// The timer drives nothing; the pin is a plain GPIO.
    Disconnected,
    /// Toggle on match. Square waves, in CTC mode.
    Toggle,
    /// Clear on match.
    Clear,
    /// Set on match.
    Set,
    /// PWM: high for the duty cycle, then low.
    NonInverting,
    /// PWM: low for the duty cycle, then high.
    Inverting,
}

impl PinAction {
    pub const fn compare_output(&self) -> CompareOutput {
        match self {
            Self::Disconnected => CompareOutput::Disconnected,
            Self::Toggle => CompareOutput::Toggle,
            Self::Clear | Self::NonInverting => CompareOutput::Clear,
            Self::Set | Self::Inverting => CompareOutput::Set,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A PWM request.
pub struct PwmSignal {
    pub frequency: Hertz,
    pub duty: DutyCycle,
    /// `None` picks whichever PWM mode gets closest to `frequency`.
    pub alignment: Option<Alignment>,
}

impl PwmSignal {
    pub const fn new(frequency: Hertz, duty: DutyCycle) -> Self {
        Self {
            frequency,
            duty,
            alignment: None,
        }
    }

    pub const fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// How a PWM request ended up being generated.
pub enum SignalOutput {
    /// 0 % or 100 %: the pin is a static output, disconnected from the timer.
    Constant(PinState),
    /// The timer generates it with this configuration.
    Timer(TimerConfig),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A pulse train with its compare values already computed, ready to be sent any number of
/// times with [`Timer1::send_pulses`].
pub struct EncodedPulseTrain {
    pub prescaler: Prescaler,
    pub top: u16,
    pub values: [u16; 2],
}

/// Represents the Timer/Counter1 peripheral, and the GPIO port holding its output compare
/// pins.
pub struct Timer1<R, G> {
    /// Register block. Public for direct access to features not wrapped here.
    pub regs: R,
    gpio: G,
    clock: CpuClock,
    /// The train last armed on this timer.
    train: Option<&'static PulseTrain>,
}

impl<R, G> Timer1<R, G>
where
    R: Timer16Regs,
    G: Gpio,
{
    /// Take ownership of the timer, stopped, with both channels disconnected and their
    /// interrupts disabled.
    pub fn new(regs: R, gpio: G, clocks: &Clocks) -> Self {
        let mut result = Self {
            regs,
            gpio,
            clock: clocks.cpu,
            train: None,
        };

        critical_section::with(|_| {
            result.regs.stop();
            for channel in Channel::ALL {
                result.regs.disable_compare_interrupt(channel);
                result.regs.set_compare_output(channel, CompareOutput::Disconnected);
            }
            result.regs.set_waveform(WaveformGeneration::Normal);
        });

        result
    }

    /// Give back the register block and the GPIO port.
    pub fn free(self) -> (R, G) {
        (self.regs, self.gpio)
    }

    pub fn clock(&self) -> CpuClock {
        self.clock
    }

    /// The frequency solver for this timer at its clock.
    pub fn solver(&self) -> Solver {
        Solver::timer1(self.clock)
    }

    /// A handle to one channel, that can only change its duty cycle.
    pub fn channel(&mut self, channel: Channel) -> PwmChannel<'_, R, G> {
        PwmChannel {
            timer: self,
            channel,
        }
    }

    /// Program the counting mode, TOP and divider of `config`, bind `action` to the
    /// channel's pin, and start the counter from 0. The compare value is left as is.
    ///
    /// The other channel is reconfigured too: it shares the counter, the divider and TOP. A
    /// running pulse train is ended.
    pub fn configure(&mut self, channel: Channel, config: &TimerConfig, action: PinAction) {
        critical_section::with(|_| {
            self.end_train(None);
            self.regs.stop();
            self.regs.set_waveform(config.mode.waveform());
            self.regs.set_top(config.top);
            self.regs.set_counter(0);
            self.connect(channel, action);
            self.regs.set_prescaler(config.prescaler);
        });
    }

    /// Bind `action` to the channel's pin, making it an output. The timer state is not
    /// touched.
    pub fn connect(&mut self, channel: Channel, action: PinAction) {
        self.gpio.set_direction_output(channel.pin());
        self.regs.set_compare_output(channel, action.compare_output());
    }

    /// Release the channel's pin from the timer without touching the timer, so a signal
    /// on the other channel keeps running. The pin's level is left to whatever its output
    /// latch holds; use `set_low` or `set_high` to choose it.
    pub fn disconnect(&mut self, channel: Channel) {
        self.regs
            .set_compare_output(channel, CompareOutput::Disconnected);
    }

    pub fn is_connected(&self, channel: Channel) -> bool {
        self.regs.compare_output(channel) != CompareOutput::Disconnected
    }

    /// Disconnect the channel, and drive its pin low as a plain output.
    pub fn set_low(&mut self, channel: Channel) {
        self.write_static(channel, PinState::Low);
    }

    /// Disconnect the channel, and drive its pin high as a plain output.
    pub fn set_high(&mut self, channel: Channel) {
        self.write_static(channel, PinState::High);
    }

    /// The pin level, if the channel is disconnected from the timer. `None` while the timer
    /// drives it.
    pub fn static_level(&self, channel: Channel) -> Option<PinState> {
        if self.is_connected(channel) {
            return None;
        }
        Some(self.gpio.read_level(channel.pin()))
    }

    pub fn is_low(&self, channel: Channel) -> bool {
        self.static_level(channel) == Some(PinState::Low)
    }

    pub fn is_high(&self, channel: Channel) -> bool {
        self.static_level(channel) == Some(PinState::High)
    }

    /// Generate a 50 % square wave on the channel: CTC mode, the pin toggling on each
    /// compare match. The pin starts low.
    pub fn generate_square_wave(&mut self, channel: Channel, frequency: Hertz) -> Result<TimerConfig> {
        let config = match self.solver().solve(frequency, WaveformMode::Ctc) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(channel, e)),
        };

        critical_section::with(|_| {
            self.program(&config);
            self.regs.set_waveform(WaveformGeneration::CtcIcr);
            self.regs.set_compare(channel, 0);
            self.reset_output(channel);
            self.connect(channel, PinAction::Toggle);
            self.regs.set_prescaler(config.prescaler);
        });

        debug!(
            "Square wave: divider {}, top {}",
            config.prescaler.value(),
            config.top
        );
        Ok(config)
    }

    /// Generate a PWM signal on the channel, non-inverting. 0 % and 100 % are generated as a
    /// static pin level instead, with the channel disconnected.
    pub fn generate_pwm(&mut self, channel: Channel, signal: PwmSignal) -> Result<SignalOutput> {
        if signal.duty == DutyCycle::ZERO {
            self.end_train(Some(channel));
            self.set_low(channel);
            return Ok(SignalOutput::Constant(PinState::Low));
        }
        if signal.duty == DutyCycle::FULL {
            self.end_train(Some(channel));
            self.set_high(channel);
            return Ok(SignalOutput::Constant(PinState::High));
        }

        let config = match self.solver().solve_pwm(signal.frequency, signal.alignment) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(channel, e)),
        };
        let compare = encode(config.top, signal.duty);

        critical_section::with(|_| {
            // Written before the PWM mode is set, so the first period already uses it.
            self.program(&config);
            self.regs.set_compare(channel, compare);
            self.configure(channel, &config, PinAction::NonInverting);
        });

        debug!(
            "PWM: divider {}, top {}, compare {}",
            config.prescaler.value(),
            config.top,
            compare
        );
        Ok(SignalOutput::Timer(config))
    }

    /// The configuration currently running. `None` when the timer is stopped, or in a mode
    /// this library doesn't program.
    pub fn config(&self) -> Option<TimerConfig> {
        critical_section::with(|_| {
            let prescaler = self.regs.prescaler()?;
            let mode = WaveformMode::from_waveform(self.regs.waveform()?)?;
            Some(TimerConfig {
                prescaler,
                top: self.regs.top(),
                mode,
            })
        })
    }

    /// The frequency being generated: that of the square wave in CTC mode, and of the PWM
    /// signal in the PWM modes. `None` when no channel is connected, as with the tick counter.
    pub fn frequency(&self) -> Option<Hertz> {
        if !Channel::ALL.into_iter().any(|c| self.is_connected(c)) {
            return None;
        }
        self.config()?.frequency(self.clock.hz())
    }

    /// The channel's duty cycle, read back from its compare value and TOP. It's approximate,
    /// due to rounding. A disconnected channel reports 0 % or 100 % from its pin level.
    pub fn duty_cycle(&self, channel: Channel) -> DutyCycle {
        critical_section::with(|_| match self.regs.compare_output(channel) {
            CompareOutput::Disconnected => match self.gpio.read_level(channel.pin()) {
                PinState::Low => DutyCycle::ZERO,
                PinState::High => DutyCycle::FULL,
            },
            CompareOutput::Toggle => DutyCycle::HALF,
            CompareOutput::Clear => decode(self.regs.top(), self.regs.compare(channel)),
            CompareOutput::Set => decode(self.regs.top(), self.regs.compare(channel)).complement(),
        })
    }

    /// Change the channel's duty cycle, keeping the frequency. 0 % and 100 % disconnect the
    /// channel and drive its pin; anything else (re)connects it as non-inverting PWM. A pulse
    /// train on the channel is ended.
    pub fn set_duty_cycle(&mut self, channel: Channel, duty: DutyCycle) {
        self.end_train(Some(channel));
        match duty {
            DutyCycle::ZERO => self.set_low(channel),
            DutyCycle::FULL => self.set_high(channel),
            _ => {
                let top = self.regs.top();
                self.set_compare_value(channel, encode(top, duty));
            }
        }
    }

    /// Stop the counter, and release every connected channel with its pin driven low.
    /// Compare interrupts are disabled, and a running pulse train is ended.
    pub fn stop(&mut self) {
        critical_section::with(|_| {
            self.end_train(None);
            self.regs.stop();
            for channel in Channel::ALL {
                self.regs.disable_compare_interrupt(channel);
                if self.is_connected(channel) {
                    self.set_low(channel);
                }
            }
        });
        trace!("Timer1 stopped");
    }

    /// Busy-wait until the channel's compare match flag is set, then clear it.
    pub fn wait_for_compare_match(&mut self, channel: Channel) {
        while !self.regs.is_compare_match_pending(channel) {
            core::hint::spin_loop();
        }
        self.regs.clear_compare_match_flag(channel);
    }

    /// Run the counter freely from 0 to `top` and back, one step every `tick_period_us`
    /// microseconds. The period must match a Timer1 divider at this clock. Channels are left
    /// as they are; a running pulse train is ended.
    pub fn start_tick_counter(&mut self, tick_period_us: u32, top: u16) -> Result<Prescaler> {
        let prescaler = DividerTable::TIMER1.for_tick_period_us(self.clock, tick_period_us)?;

        critical_section::with(|_| {
            self.end_train(None);
            self.regs.stop();
            self.regs.set_waveform(WaveformGeneration::CtcIcr);
            self.regs.set_top(top);
            self.regs.set_counter(0);
            self.regs.set_prescaler(prescaler);
        });

        trace!("Tick counter: {} us, top {}", tick_period_us, top);
        Ok(prescaler)
    }

    /// Counter value. 16-bit registers are read through a shared temporary register, so
    /// this runs in a critical section.
    pub fn counter(&self) -> u16 {
        critical_section::with(|_| self.regs.counter())
    }

    pub fn reset_counter(&mut self) {
        critical_section::with(|_| self.regs.set_counter(0));
    }

    /// Compute the divider, TOP and compare values of a pulse train, without touching the
    /// hardware.
    pub fn encode_pulse_train(
        &self,
        request: &PulseTrainRequest,
    ) -> core::result::Result<EncodedPulseTrain, TimerError> {
        // One counter cycle per pulse: the fast PWM period.
        let config = self.solver().solve(request.frequency, WaveformMode::FastPwm)?;
        Ok(EncodedPulseTrain {
            prescaler: config.prescaler,
            top: config.top,
            values: [
                encode(config.top, request.edges[0]),
                encode(config.top, request.edges[1]),
            ],
        })
    }

    /// Send `request.pulses` pulses on the channel. Returns immediately; the compare
    /// match interrupt must call [`Timer1::handle_compare_match`] with the same `train`.
    /// A train already running is replaced.
    pub fn generate_pulse_train(
        &mut self,
        train: &'static PulseTrain,
        channel: Channel,
        request: &PulseTrainRequest,
    ) -> Result<()> {
        let encoded = match self.encode_pulse_train(request) {
            Ok(e) => e,
            Err(e) => return Err(self.fail(channel, e)),
        };
        self.send_pulses(train, channel, &encoded, request.pulses)
    }

    /// Send `pulses` periods of a 50 % square wave on the channel. See
    /// `generate_pulse_train`.
    pub fn generate_square_wave_pulses(
        &mut self,
        train: &'static PulseTrain,
        channel: Channel,
        frequency: Hertz,
        pulses: u16,
    ) -> Result<()> {
        let config = match self.solver().solve(frequency, WaveformMode::Ctc) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(channel, e)),
        };
        let encoded = EncodedPulseTrain {
            prescaler: config.prescaler,
            top: config.top,
            values: [0, 0],
        };
        self.send_pulses(train, channel, &encoded, pulses)
    }

    /// Arm a pulse train from precomputed values. 0 pulses does nothing.
    ///
    /// The train state is replaced in a single write, and the timer programmed, inside one
    /// critical section; the interrupt handler sees either the old train or the new one. A
    /// different train still running on this timer is ended first.
    pub fn send_pulses(
        &mut self,
        train: &'static PulseTrain,
        channel: Channel,
        encoded: &EncodedPulseTrain,
        pulses: u16,
    ) -> Result<()> {
        let edges = match edge_count(pulses) {
            Ok(e) => e,
            Err(e) => return Err(self.fail(channel, e)),
        };
        if edges == 0 {
            return Ok(());
        }

        critical_section::with(|cs| {
            if self.train.is_some_and(|t| !core::ptr::eq(t, train)) {
                self.end_train(None);
            }
            self.train = Some(train);

            let previous = train.snapshot(cs);
            if previous.remaining != 0 {
                debug!("Pulse train preempted with {} edges left", previous.remaining);
                self.regs.disable_compare_interrupt(previous.channel);
                if previous.channel != channel {
                    self.set_low(previous.channel);
                }
            }
            self.regs.disable_compare_interrupt(channel);
            self.regs.stop();

            train.store(
                cs,
                Sequence {
                    values: encoded.values,
                    remaining: edges,
                    channel,
                },
            );

            self.regs.set_waveform(WaveformGeneration::CtcIcr);
            self.regs.set_top(encoded.top);
            self.regs.set_counter(0);
            self.regs.set_compare(channel, encoded.values[0]);
            self.reset_output(channel);
            self.connect(channel, PinAction::Toggle);
            self.regs.clear_compare_match_flag(channel);
            self.regs.enable_compare_interrupt(channel);
            self.regs.set_prescaler(encoded.prescaler);
        });

        debug!("Pulse train armed: {} pulses", pulses);
        Ok(())
    }

    /// Call this from the compare match interrupt of the channel carrying `train`. Loads the
    /// next compare value; after the last edge, disables the interrupt, stops the timer,
    /// and leaves the pin disconnected and low.
    pub fn handle_compare_match(&mut self, train: &PulseTrain) -> Step {
        let step = train.advance();
        match step {
            Step::Load(channel, value) => self.regs.set_compare(channel, value),
            Step::Finished(channel) => {
                self.release(channel);
                trace!("Pulse train done");
            }
            Step::Idle => (),
        }
        step
    }

    /// Stop a running pulse train before its end. Returns `false` if none was running.
    pub fn cancel_pulses(&mut self, train: &PulseTrain) -> bool {
        let cancelled = critical_section::with(|cs| {
            let seq = train.clear(cs);
            if seq.remaining == 0 {
                return false;
            }
            self.release(seq.channel);
            true
        });

        if cancelled {
            debug!("Pulse train cancelled");
        }
        cancelled
    }

    /// Write a compare value, as PWM. 0 and TOP or above become static levels.
    fn set_compare_value(&mut self, channel: Channel, value: u16) {
        critical_section::with(|_| {
            self.end_train(Some(channel));
            let top = self.regs.top();
            if value == 0 {
                self.set_low(channel);
            } else if value >= top {
                self.set_high(channel);
            } else {
                self.regs.set_compare(channel, value);
                if !self.is_connected(channel) {
                    self.connect(channel, PinAction::NonInverting);
                }
            }
        });
    }

    /// Stop the counter, and load TOP and a zero count. Leaves the timer in normal mode,
    /// where compare values are written straight through; the caller sets the final mode.
    fn program(&mut self, config: &TimerConfig) {
        self.end_train(None);
        self.regs.stop();
        self.regs.set_waveform(WaveformGeneration::Normal);
        self.regs.set_top(config.top);
        self.regs.set_counter(0);
    }

    /// Force the channel's output compare latch low. Non-PWM modes only.
    fn reset_output(&mut self, channel: Channel) {
        self.regs.set_compare_output(channel, CompareOutput::Clear);
        self.regs.force_compare(channel);
    }

    fn write_static(&mut self, channel: Channel, level: PinState) {
        critical_section::with(|_| {
            self.disconnect(channel);
            self.gpio.write_level(channel.pin(), level);
            self.gpio.set_direction_output(channel.pin());
        });
    }

    /// End of a pulse train.
    fn release(&mut self, channel: Channel) {
        self.regs.disable_compare_interrupt(channel);
        self.regs.stop();
        self.set_low(channel);
    }

    /// End the pulse train armed on this timer, if one is running: on any channel with
    /// `None`, on that channel only otherwise. Its interrupt is disabled and its pin driven
    /// low; the counter is left to the caller. Returns `true` if a train was ended.
    fn end_train(&mut self, channel: Option<Channel>) -> bool {
        let Some(train) = self.train else {
            return false;
        };

        critical_section::with(|cs| {
            let seq = train.snapshot(cs);
            if seq.remaining == 0 || channel.is_some_and(|c| c != seq.channel) {
                return false;
            }
            train.clear(cs);
            self.regs.disable_compare_interrupt(seq.channel);
            self.set_low(seq.channel);
            debug!("Pulse train ended with {} edges left", seq.remaining);
            true
        })
    }

    /// A request that can't be generated leaves its channel disconnected and low. The
    /// counter is not touched, so the other channel keeps its signal, unless the channel was
    /// carrying a pulse train: the counter ran the train's configuration, and is stopped.
    fn fail(&mut self, channel: Channel, error: TimerError) -> crate::Error {
        warn!("Signal request failed on {}", channel);
        critical_section::with(|_| {
            if self.end_train(Some(channel)) {
                self.regs.stop();
            }
            self.set_low(channel);
        });
        error.into()
    }
}

/// One output compare channel of [`Timer1`]. The frequency belongs to the timer; the
/// handle only changes the channel's duty cycle.
pub struct PwmChannel<'a, R, G> {
    timer: &'a mut Timer1<R, G>,
    channel: Channel,
}

impl<R, G> PwmChannel<'_, R, G>
where
    R: Timer16Regs,
    G: Gpio,
{
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn set_duty_cycle(&mut self, duty: DutyCycle) {
        self.timer.set_duty_cycle(self.channel, duty);
    }

    pub fn duty_cycle(&self) -> DutyCycle {
        self.timer.duty_cycle(self.channel)
    }

    /// The compare value for 100 %: TOP.
    pub fn max_duty(&self) -> u16 {
        self.timer.regs.top()
    }

    /// Write the compare value directly. 0 and `max_duty` or above are static levels.
    pub fn set_compare_value(&mut self, value: u16) {
        self.timer.set_compare_value(self.channel, value);
    }
}

#[cfg(feature = "embedded_hal")]
mod embedded_hal_impl {
    use embedded_hal::pwm::{ErrorType, SetDutyCycle};

    use super::{Gpio, PwmChannel, Timer16Regs};

    impl<R, G> ErrorType for PwmChannel<'_, R, G>
    where
        R: Timer16Regs,
        G: Gpio,
    {
        type Error = crate::Error;
    }

    impl<R, G> SetDutyCycle for PwmChannel<'_, R, G>
    where
        R: Timer16Regs,
        G: Gpio,
    {
        fn max_duty_cycle(&self) -> u16 {
            self.max_duty().max(1)
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.set_compare_value(duty);
            Ok(())
        }
    }
}
