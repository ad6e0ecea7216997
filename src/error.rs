//! Error types for the console and the firmware around it.
//!
//! Every variant is fixed-size and `Copy`. With the `defmt` feature they
//! derive `defmt::Format` so firmware can log them directly.

use core::fmt;

/// Why the console refused a message at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    /// Empty payload.
    InvalidArgument,
    /// Not enough free ring space; the message was dropped.
    NoSpace,
    /// No link is established and the console requires one.
    NotConnected,
}

impl ConsoleError {
    /// Negative errno for callers that expect POSIX-style return codes.
    pub const fn errno(self) -> i32 {
        match self {
            ConsoleError::InvalidArgument => -22, // EINVAL
            ConsoleError::NoSpace => -12,         // ENOMEM
            ConsoleError::NotConnected => -128,   // ENOTCONN (Zephyr)
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::InvalidArgument => f.write_str("invalid argument"),
            ConsoleError::NoSpace => f.write_str("no space in console buffer"),
            ConsoleError::NotConnected => f.write_str("not connected"),
        }
    }
}

/// Top-level firmware error.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// An Embassy task could not be spawned (pool exhausted).
    Spawn,
}

/// BLE failures the firmware reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// GATT server registration failed.
    GattServer,
    /// Advertising could not start.
    AdvertiseFailed,
    /// The advertising set is already in use; retry shortly.
    AdvertiseBusy,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Ble(BleError::GattServer) => f.write_str("GATT server registration failed"),
            Error::Ble(BleError::AdvertiseFailed) => f.write_str("advertising failed"),
            Error::Ble(BleError::AdvertiseBusy) => f.write_str("advertising busy"),
            Error::Spawn => f.write_str("task spawn failed"),
        }
    }
}
