//! Application-wide constants and compile-time configuration.
//!
//! Ring sizing, link chunking and BLE advertising parameters live here so
//! they can be tuned in one place.

// Console

/// Ring buffer capacity in bytes (headers included).
pub const RING_BUF_SIZE: usize = 2048;

/// Largest single message payload. Longer input is truncated to this.
pub const MSG_MAX_SIZE: usize = 512;

/// Size of the little-endian length prefix in front of every record.
pub const RECORD_HEADER_SIZE: usize = core::mem::size_of::<u16>();

/// Maximum payload per TX notification: ATT MTU minus the 3-byte ATT
/// notification header.
pub const NOTIFY_CHUNK_SIZE: usize = BLE_ATT_MTU as usize - 3;

/// Pause after each chunk so the SoftDevice notification queue can drain.
pub const CHUNK_PACING_MS: u32 = 10;

const _: () = assert!(MSG_MAX_SIZE <= u16::MAX as usize);
const _: () = assert!(RING_BUF_SIZE >= MSG_MAX_SIZE + RECORD_HEADER_SIZE);

// BLE

/// GAP device name, also sent in the advertising payload.
pub const BLE_DEVICE_NAME: &str = "nus-console";

/// Negotiated ATT MTU we configure the SoftDevice for.
pub const BLE_ATT_MTU: u16 = 256;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

/// Delay before retrying advertising when the SoftDevice reports it busy.
pub const BLE_ADV_BUSY_RETRY_MS: u64 = 300;

/// Delay before retrying advertising after any other failure.
pub const BLE_ADV_ERROR_RETRY_MS: u64 = 1000;

// Firmware

/// Period of the uptime/stats heartbeat printed on the console (seconds).
pub const HEARTBEAT_PERIOD_SECS: u64 = 5;
