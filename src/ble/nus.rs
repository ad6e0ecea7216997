//! Nordic UART Service ([NUS]) and the console's link over it.
//!
//! [NUS]: https://developer.nordicsemi.com/nRF_Connect_SDK/doc/latest/nrf/libraries/bluetooth_services/services/nus.html
//!
//! TX notifications carry console output; bytes the central writes to RX
//! are echoed back through the console.

use defmt::{info, warn};
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::NotifyValueError;
use nrf_softdevice::ble::Connection;
use nrf_softdevice::RawError;
use nus_console::config::NOTIFY_CHUNK_SIZE;
use nus_console::{CallContext, NotifyLink};

use super::{Server, CONSOLE};

pub const NUS_UUID: u128 = 0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E;

#[nrf_softdevice::gatt_service(uuid = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E")]
pub struct Nus {
    #[characteristic(uuid = "6E400002-B5A3-F393-E0A9-E50E24DCCA9E", write, write_without_response)]
    pub rx: Vec<u8, NOTIFY_CHUNK_SIZE>,

    #[characteristic(uuid = "6E400003-B5A3-F393-E0A9-E50E24DCCA9E", notify)]
    pub tx: Vec<u8, NOTIFY_CHUNK_SIZE>,
}

/// GATT server callback for the NUS service.
pub fn on_event(event: NusEvent) {
    match event {
        NusEvent::TxCccdWrite { notifications } => {
            info!("NUS notifications {}", if notifications { "enabled" } else { "disabled" });
        }
        NusEvent::RxWrite(data) => {
            info!("NUS received {} bytes", data.len());
            if CONSOLE.send_bytes(&data, CallContext::Thread).is_err() {
                warn!("NUS echo dropped");
            }
        }
    }
}

/// Console link that sends each chunk as a TX notification.
pub struct NusLink {
    server: &'static Server,
}

impl NusLink {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }
}

impl NotifyLink for NusLink {
    type Conn = Connection;
    type Error = NotifyValueError;

    async fn notify(&mut self, conn: &Connection, chunk: &[u8]) -> Result<(), NotifyValueError> {
        debug_assert!(chunk.len() <= NOTIFY_CHUNK_SIZE);
        let value: Vec<u8, NOTIFY_CHUNK_SIZE> =
            Vec::from_slice(chunk).map_err(|()| NotifyValueError::Raw(RawError::DataSize))?;
        self.server.nus.tx_notify(conn, &value)
    }
}
