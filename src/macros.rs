//! Utility macros for sharing peripherals between the main loop and interrupt handlers.
//!
//! The compare match handler of a pulse train needs the [`Timer1`](crate::timer::Timer1) the
//! main code configured; these store it in a `Mutex<RefCell<Option>>>` global.

/// Syntax helper for getting global variables of the form `Mutex<RefCell<Option>>>` from an interrupt-free
/// context - eg in interrupt handlers. If the global hasn't been initialized yet, returns from
/// the enclosing function or closure.
///
/// Example: `access_global!(TIMER, timer, cs)`
#[macro_export]
macro_rules! access_global {
    ($NAME_GLOBAL:ident, $name_local:ident, $cs:expr) => {
        let mut part1 = $NAME_GLOBAL.borrow($cs).borrow_mut();
        let Some($name_local) = part1.as_mut() else {
            return;
        };
    };
}

/// Syntax helper for setting global variables of the form `Mutex<RefCell<Option>>>`.
/// eg in interrupt handlers. Ideal for non-copy-type variables that can't be initialized
/// immediatiately.
///
/// Example: `make_globals!(
///     (TIMER, Timer1<Tc1Regs, PortB>),
///     (LED, PortB),
/// )`
#[macro_export]
macro_rules! make_globals {
    ($(($NAME:ident, $type:ty)),+ $(,)?) => {
        $(
            static $NAME: ::critical_section::Mutex<core::cell::RefCell<Option<$type>>> = ::critical_section::Mutex::new(core::cell::RefCell::new(None));
        )+
    };
}

/// Initialize one or more globals inside a critical section.
///
/// Usage:
/// ```rust
/// # use mega_hal::{init_globals, make_globals};
/// make_globals!((COUNT, u32));
/// let count = 3;
///
/// init_globals!((COUNT, count));
/// ```
#[macro_export]
macro_rules! init_globals {
    ($(($NAME:ident, $val:expr)),* $(,)?) => {
        ::critical_section::with(|cs| {
            $(
                $NAME.borrow(cs).replace(Some($val));
            )*
        });
    };
}
