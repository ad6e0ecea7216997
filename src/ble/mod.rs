//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Peripheral** - advertises the Nordic UART Service and accepts a
//!    single central at a time.
//! 2. **NUS** - GATT service whose TX notifications carry console output.
//! 3. **Security** - passkey display and in-RAM bonding.
//!
//! The console itself is the library's `Console`, stored in [`CONSOLE`];
//! its drain loop runs in its own task.

pub mod nus;
pub mod peripheral;
pub mod security;

use core::mem;

use defmt::info;
use embassy_executor::Spawner;
use embassy_time::Delay;
use nrf_softdevice::ble::Connection;
use nrf_softdevice::{raw, Softdevice};
use nus_console::config::{BLE_ATT_MTU, BLE_DEVICE_NAME, RING_BUF_SIZE};
use nus_console::error::{BleError, Error};
use nus_console::Console;
use static_cell::StaticCell;

use nus::{Nus, NusEvent, NusLink};

/// The one debug console of this firmware.
pub static CONSOLE: Console<Connection, RING_BUF_SIZE> = Console::new();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub nus: Nus,
}

/// Enable the SoftDevice, register the GATT server and start the BLE tasks.
pub fn init(spawner: &Spawner) -> Result<(), Error> {
    let sd = Softdevice::enable(&softdevice_config());

    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = Server::new(sd).map_err(|_| BleError::GattServer)?;
    let server: &'static Server = SERVER.init(server);
    let sd: &'static Softdevice = sd;

    spawner
        .spawn(softdevice_task(sd))
        .map_err(|_| Error::Spawn)?;
    spawner
        .spawn(console_task(server))
        .map_err(|_| Error::Spawn)?;
    spawner
        .spawn(peripheral_task(sd, server))
        .map_err(|_| Error::Spawn)?;

    info!("BLE console initialised");
    Ok(())
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: BLE_ATT_MTU,
        }),
        conn_gatts: Some(raw::ble_gatts_conn_cfg_t {
            hvn_tx_queue_size: 4,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for the security mode struct.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn console_task(server: &'static Server) -> ! {
    let mut link = NusLink::new(server);
    CONSOLE.run(&mut link, &mut Delay).await
}

#[embassy_executor::task]
async fn peripheral_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    peripheral::run(sd, server).await
}
