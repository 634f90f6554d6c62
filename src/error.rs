//! Common error definitions.

use crate::{clocks::ClockError, timer::TimerError};

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Timer configuration and signal generation errors.
    TimerError(TimerError),
    /// Clock and divider-table errors.
    ClockError(ClockError),
}

impl_from_error!(TimerError);
impl_from_error!(ClockError);

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TimerError(e) => write!(f, "timer: {e}"),
            Self::ClockError(e) => write!(f, "clock: {e}"),
        }
    }
}

#[cfg(feature = "embedded_hal")]
mod embedded_hal_impl {
    use embedded_hal::pwm::{Error as PwmEhError, ErrorKind as PwmErrorKind};

    use super::Error;

    impl PwmEhError for Error {
        fn kind(&self) -> PwmErrorKind {
            PwmErrorKind::Other
        }
    }
}
