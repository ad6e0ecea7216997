//! Peripheral role: advertise, accept one central, run the GATT server.
//!
//! The console learns about the link only through
//! `ConnectionEvent::Established` / `ConnectionEvent::Ended` sent from here.

use defmt::{info, warn};
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::peripheral::{self, AdvertiseError, ConnectableAdvertisement};
use nrf_softdevice::ble::{gatt_server, Connection};
use nrf_softdevice::Softdevice;
use nus_console::config::{
    BLE_ADV_BUSY_RETRY_MS, BLE_ADV_ERROR_RETRY_MS, BLE_ADV_INTERVAL, BLE_DEVICE_NAME,
};
use nus_console::error::BleError;
use nus_console::ConnectionEvent;

use super::nus::{self, NUS_UUID};
use super::{security, Server, ServerEvent, CONSOLE};

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .full_name(BLE_DEVICE_NAME)
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_128(ServiceList::Complete, &[NUS_UUID.to_le_bytes()])
    .build();

/// Advertise and serve centrals forever, one at a time.
pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    let bonder = security::bonder();
    let config = peripheral::Config {
        interval: BLE_ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        let conn = match peripheral::advertise_pairable(sd, adv, &config, bonder).await {
            Ok(conn) => conn,
            Err(e) => {
                let retry_ms = match classify(&e) {
                    BleError::AdvertiseBusy => BLE_ADV_BUSY_RETRY_MS,
                    _ => BLE_ADV_ERROR_RETRY_MS,
                };
                warn!("Advertising failed: {:?}, retrying in {} ms", e, retry_ms);
                Timer::after_millis(retry_ms).await;
                continue;
            }
        };

        serve(&conn, server).await;
        info!("Advertising restarted");
    }
}

async fn serve(conn: &Connection, server: &Server) {
    info!("Central connected: {}", conn.peer_address());
    CONSOLE.on_connection_event(ConnectionEvent::Established(conn.clone()));

    let reason = gatt_server::run(conn, server, |event| match event {
        ServerEvent::Nus(e) => nus::on_event(e),
    })
    .await;

    info!("Central disconnected: {:?}", reason);
    CONSOLE.on_connection_event(ConnectionEvent::Ended);
}

fn classify(e: &AdvertiseError) -> BleError {
    match e {
        AdvertiseError::NoFreeConn => BleError::AdvertiseBusy,
        _ => BleError::AdvertiseFailed,
    }
}
