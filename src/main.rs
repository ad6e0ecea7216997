//! nus-console firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Queues a boot banner, brings up the BLE console and prints a periodic
//! heartbeat with queue statistics to whichever central is connected.

#![no_std]
#![no_main]

mod ble;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use embassy_time::{Duration, Instant, Ticker};
use nus_console::config::HEARTBEAT_PERIOD_SECS;
use nus_console::{nus_printf, CallContext};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("nus-console starting");

    // The SoftDevice owns priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(config);

    // Held in the ring until the first central connects.
    let _ = ble::CONSOLE.send_str("nus-console booted\n", CallContext::Thread);

    unwrap!(ble::init(&spawner));
    unwrap!(spawner.spawn(heartbeat_task()));
}

#[embassy_executor::task]
async fn heartbeat_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_secs(HEARTBEAT_PERIOD_SECS));
    loop {
        ticker.next().await;
        if !ble::CONSOLE.is_connected() {
            continue;
        }

        let stats = ble::CONSOLE.stats();
        let _ = nus_printf!(
            ble::CONSOLE,
            "uptime {} s, console {}/{} bytes used, {} dropped\n",
            Instant::now().as_secs(),
            stats.used,
            stats.total,
            stats.dropped
        );
    }
}
