//! BLE Nordic UART Service debug console.
//!
//! This library holds the part of the firmware that runs the same on the
//! host and on the nRF52840: the ring buffer, the enqueue API and the drain
//! loop. The SoftDevice glue lives in the embedded binary (`main.rs`,
//! feature `embedded`).
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides the host-testable entry point it builds on.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod console;
pub mod error;

pub use console::{
    CallContext, Console, ConnectionEvent, DrainReport, EnqueuePolicy, NotifyLink, Stats,
};
pub use error::ConsoleError;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::config::*;

    #[test]
    fn chunk_size_fits_att_mtu() {
        assert_eq!(NOTIFY_CHUNK_SIZE, 253);
        assert!(NOTIFY_CHUNK_SIZE + 3 <= BLE_ATT_MTU as usize);
    }

    #[test]
    fn largest_record_fits_in_ring() {
        assert_eq!(RECORD_HEADER_SIZE, 2);
        assert!(MSG_MAX_SIZE + RECORD_HEADER_SIZE <= RING_BUF_SIZE);
    }

    #[test]
    fn max_message_splits_into_three_chunks() {
        assert_eq!(MSG_MAX_SIZE.div_ceil(NOTIFY_CHUNK_SIZE), 3);
    }
}
