//! Simulated Timer/Counter1 and PORTB for host tests.
//!
//! Both halves share one [`Board`], so pin levels read through the GPIO side reflect the
//! output compare unit when the timer drives the pin. The counter advances one divided
//! clock per [`SimTimer::tick`]; the divider itself is only recorded.

use std::{boxed::Box, cell::RefCell, rc::Rc};

use crate::{
    clocks::Prescaler,
    gpio::{Gpio, PinId, PinState, Port},
    timer::{Channel, CompareOutput, Timer16Regs, WaveformGeneration},
};

/// A register write, as seen by a write hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RegWrite {
    Counter,
    Compare(Channel),
    Top,
    Prescaler,
    Stop,
    Waveform,
    CompareOutput(Channel),
    Force(Channel),
    InterruptEnable(Channel),
    InterruptDisable(Channel),
    ClearFlag(Channel),
}

/// Pin activity, counted over timer ticks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Trace {
    pub rising: u32,
    pub falling: u32,
    pub high_ticks: u64,
    pub ticks: u64,
}

#[derive(Clone, Copy)]
struct OutputCompare {
    ocr: u16,
    ocr_buffer: u16,
    com: CompareOutput,
    latch: PinState,
    ocie: bool,
    ocf: bool,
    last_level: PinState,
    trace: Trace,
}

impl OutputCompare {
    const RESET: Self = Self {
        ocr: 0,
        ocr_buffer: 0,
        com: CompareOutput::Disconnected,
        latch: PinState::Low,
        ocie: false,
        ocf: false,
        last_level: PinState::Low,
        trace: Trace {
            rising: 0,
            falling: 0,
            high_ticks: 0,
            ticks: 0,
        },
    };
}

pub(crate) struct Board {
    tcnt: u16,
    icr: u16,
    prescaler: Option<Prescaler>,
    wgm: u8,
    counting_down: bool,
    oc: [OutputCompare; 2],
    ddrb: u8,
    portb: u8,
    hook: Option<Box<dyn FnMut(RegWrite)>>,
}

impl Board {
    fn is_pwm(&self) -> bool {
        matches!(
            WaveformGeneration::from_bits(self.wgm),
            Some(WaveformGeneration::FastPwmIcr | WaveformGeneration::PhaseFreqCorrectIcr)
        )
    }

    fn channel_of(pin: PinId) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.pin() == pin)
    }

    fn level(&self, pin: PinId) -> PinState {
        if let Some(channel) = Self::channel_of(pin) {
            let oc = &self.oc[channel as usize];
            if oc.com != CompareOutput::Disconnected && self.ddrb & pin.mask() != 0 {
                return oc.latch;
            }
        }
        (self.portb & pin.mask() != 0).into()
    }

    /// Non-PWM compare output action.
    fn apply_com(oc: &mut OutputCompare) {
        oc.latch = match oc.com {
            CompareOutput::Disconnected => oc.latch,
            CompareOutput::Toggle => match oc.latch {
                PinState::Low => PinState::High,
                PinState::High => PinState::Low,
            },
            CompareOutput::Clear => PinState::Low,
            CompareOutput::Set => PinState::High,
        };
    }

    fn compare_match(&mut self, channel: Channel, up: bool) {
        let mode = WaveformGeneration::from_bits(self.wgm);
        let oc = &mut self.oc[channel as usize];
        oc.ocf = true;

        match (mode, oc.com) {
            (_, CompareOutput::Disconnected) => (),
            (Some(WaveformGeneration::FastPwmIcr), CompareOutput::Clear) => oc.latch = PinState::Low,
            (Some(WaveformGeneration::FastPwmIcr), CompareOutput::Set) => oc.latch = PinState::High,
            (Some(WaveformGeneration::PhaseFreqCorrectIcr), CompareOutput::Clear) => {
                oc.latch = if up { PinState::Low } else { PinState::High }
            }
            (Some(WaveformGeneration::PhaseFreqCorrectIcr), CompareOutput::Set) => {
                oc.latch = if up { PinState::High } else { PinState::Low }
            }
            (Some(WaveformGeneration::FastPwmIcr | WaveformGeneration::PhaseFreqCorrectIcr), _) => (),
            _ => Self::apply_com(oc),
        }
    }

    fn tick(&mut self) {
        if self.prescaler.is_none() {
            return;
        }

        match WaveformGeneration::from_bits(self.wgm) {
            Some(WaveformGeneration::PhaseFreqCorrectIcr) => {
                let top = self.icr;
                if top == 0 {
                    return;
                }
                let up = !self.counting_down;
                self.tcnt = if up { self.tcnt + 1 } else { self.tcnt - 1 };
                if self.tcnt >= top {
                    self.counting_down = true;
                }
                if self.tcnt == 0 {
                    self.counting_down = false;
                    for oc in self.oc.iter_mut() {
                        oc.ocr = oc.ocr_buffer;
                    }
                }
                self.check_matches(up);
            }
            Some(WaveformGeneration::FastPwmIcr) => {
                self.tcnt = if self.tcnt >= self.icr { 0 } else { self.tcnt + 1 };
                if self.tcnt == 0 {
                    for oc in self.oc.iter_mut() {
                        oc.ocr = oc.ocr_buffer;
                        match oc.com {
                            CompareOutput::Clear => oc.latch = PinState::High,
                            CompareOutput::Set => oc.latch = PinState::Low,
                            _ => (),
                        }
                    }
                }
                self.check_matches(true);
            }
            Some(WaveformGeneration::CtcIcr) => {
                self.tcnt = if self.tcnt >= self.icr { 0 } else { self.tcnt + 1 };
                self.check_matches(true);
            }
            _ => {
                self.tcnt = self.tcnt.wrapping_add(1);
                self.check_matches(true);
            }
        }

        for channel in Channel::ALL {
            let level = self.level(channel.pin());
            let oc = &mut self.oc[channel as usize];
            match (oc.last_level, level) {
                (PinState::Low, PinState::High) => oc.trace.rising += 1,
                (PinState::High, PinState::Low) => oc.trace.falling += 1,
                _ => (),
            }
            oc.last_level = level;
            oc.trace.ticks += 1;
            if level == PinState::High {
                oc.trace.high_ticks += 1;
            }
        }
    }

    fn check_matches(&mut self, up: bool) {
        for channel in Channel::ALL {
            if self.tcnt == self.oc[channel as usize].ocr {
                self.compare_match(channel, up);
            }
        }
    }
}

/// The timer half of the simulated board.
pub(crate) struct SimTimer(Rc<RefCell<Board>>);

/// The PORTB half of the simulated board.
pub(crate) struct SimGpio(Rc<RefCell<Board>>);

/// A reset board: timer stopped, every pin an input, latches low.
pub(crate) fn board() -> (SimTimer, SimGpio) {
    let board = Rc::new(RefCell::new(Board {
        tcnt: 0,
        icr: 0,
        prescaler: None,
        wgm: 0,
        counting_down: false,
        oc: [OutputCompare::RESET; 2],
        ddrb: 0,
        portb: 0,
        hook: None,
    }));
    (SimTimer(board.clone()), SimGpio(board))
}

impl SimTimer {
    /// Advance the counter by one divided clock.
    pub fn tick(&self) {
        self.0.borrow_mut().tick();
    }

    pub fn ticks(&self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// If the channel's interrupt is enabled and its flag set, clear the flag like the
    /// hardware does on entering the handler, and return `true`.
    pub fn take_interrupt(&self, channel: Channel) -> bool {
        let mut board = self.0.borrow_mut();
        let oc = &mut board.oc[channel as usize];
        if oc.ocie && oc.ocf {
            oc.ocf = false;
            return true;
        }
        false
    }

    /// Call `hook` after every register write.
    pub fn on_write(&self, hook: impl FnMut(RegWrite) + 'static) {
        self.0.borrow_mut().hook = Some(Box::new(hook));
    }

    pub fn trace(&self, channel: Channel) -> Trace {
        self.0.borrow().oc[channel as usize].trace
    }

    pub fn reset_trace(&self) {
        let mut board = self.0.borrow_mut();
        for channel in Channel::ALL {
            let level = board.level(channel.pin());
            let oc = &mut board.oc[channel as usize];
            oc.trace = Trace::default();
            oc.last_level = level;
        }
    }

    /// The level on the channel's pin.
    pub fn pin_level(&self, channel: Channel) -> PinState {
        self.0.borrow().level(channel.pin())
    }

    fn write(&mut self, reg: RegWrite, f: impl FnOnce(&mut Board)) {
        f(&mut *self.0.borrow_mut());

        // The hook may read the board, so it runs outside the borrow.
        let hook = self.0.borrow_mut().hook.take();
        if let Some(mut hook) = hook {
            hook(reg);
            let mut board = self.0.borrow_mut();
            if board.hook.is_none() {
                board.hook = Some(hook);
            }
        }
    }
}

impl Timer16Regs for SimTimer {
    fn counter(&self) -> u16 {
        self.0.borrow().tcnt
    }

    fn set_counter(&mut self, value: u16) {
        self.write(RegWrite::Counter, |b| b.tcnt = value);
    }

    fn compare(&self, channel: Channel) -> u16 {
        self.0.borrow().oc[channel as usize].ocr_buffer
    }

    fn set_compare(&mut self, channel: Channel, value: u16) {
        self.write(RegWrite::Compare(channel), |b| {
            let pwm = b.is_pwm();
            let oc = &mut b.oc[channel as usize];
            oc.ocr_buffer = value;
            if !pwm {
                oc.ocr = value;
            }
        });
    }

    fn top(&self) -> u16 {
        self.0.borrow().icr
    }

    fn set_top(&mut self, value: u16) {
        self.write(RegWrite::Top, |b| b.icr = value);
    }

    fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.write(RegWrite::Prescaler, |b| {
            b.prescaler = match prescaler {
                Prescaler::Div1
                | Prescaler::Div8
                | Prescaler::Div64
                | Prescaler::Div256
                | Prescaler::Div1024 => Some(prescaler),
                _ => None,
            }
        });
    }

    fn stop(&mut self) {
        self.write(RegWrite::Stop, |b| b.prescaler = None);
    }

    fn prescaler(&self) -> Option<Prescaler> {
        self.0.borrow().prescaler
    }

    fn set_waveform(&mut self, mode: WaveformGeneration) {
        self.write(RegWrite::Waveform, |b| {
            b.wgm = mode as u8;
            b.counting_down = false;
        });
    }

    fn waveform(&self) -> Option<WaveformGeneration> {
        WaveformGeneration::from_bits(self.0.borrow().wgm)
    }

    fn set_compare_output(&mut self, channel: Channel, mode: CompareOutput) {
        self.write(RegWrite::CompareOutput(channel), |b| {
            b.oc[channel as usize].com = mode
        });
    }

    fn compare_output(&self, channel: Channel) -> CompareOutput {
        self.0.borrow().oc[channel as usize].com
    }

    fn force_compare(&mut self, channel: Channel) {
        self.write(RegWrite::Force(channel), |b| {
            if !b.is_pwm() {
                Board::apply_com(&mut b.oc[channel as usize]);
            }
        });
    }

    fn enable_compare_interrupt(&mut self, channel: Channel) {
        self.write(RegWrite::InterruptEnable(channel), |b| {
            b.oc[channel as usize].ocie = true
        });
    }

    fn disable_compare_interrupt(&mut self, channel: Channel) {
        self.write(RegWrite::InterruptDisable(channel), |b| {
            b.oc[channel as usize].ocie = false
        });
    }

    fn is_compare_interrupt_enabled(&self, channel: Channel) -> bool {
        self.0.borrow().oc[channel as usize].ocie
    }

    fn is_compare_match_pending(&self, channel: Channel) -> bool {
        self.0.borrow().oc[channel as usize].ocf
    }

    fn clear_compare_match_flag(&mut self, channel: Channel) {
        self.write(RegWrite::ClearFlag(channel), |b| {
            b.oc[channel as usize].ocf = false
        });
    }
}

impl Gpio for SimGpio {
    fn set_direction_output(&mut self, pin: PinId) {
        if pin.port == Port::B {
            self.0.borrow_mut().ddrb |= pin.mask();
        }
    }

    fn write_level(&mut self, pin: PinId, level: PinState) {
        if pin.port != Port::B {
            return;
        }
        let mut board = self.0.borrow_mut();
        match level {
            PinState::High => board.portb |= pin.mask(),
            PinState::Low => board.portb &= !pin.mask(),
        }
    }

    fn read_level(&self, pin: PinId) -> PinState {
        if pin.port != Port::B {
            return PinState::Low;
        }
        self.0.borrow().level(pin)
    }
}
