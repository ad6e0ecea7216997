//! Desktop terminal for the nus-console firmware.
//!
//! Without a target it scans and lists nearby devices. With a target name
//! or address it connects, prints everything the console notifies on NUS
//! TX and sends each stdin line to NUS RX. Type `exit` to quit.

use std::io::Write as _;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use clap::Parser;
use futures::stream::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use uuid::Uuid;

const NUS_RX_CHAR_UUID: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
const NUS_TX_CHAR_UUID: Uuid = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

/// Delay between consecutive RX writes.
const WRITE_PACING: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "nus-terminal", version, about = "Talk to a nus-console device over BLE")]
struct Args {
    /// Device name or address. Omit to list nearby devices and exit.
    target: Option<String>,

    /// How long to scan before looking for the target, in seconds.
    #[arg(long, default_value_t = 5)]
    scan_secs: u64,
}

struct Discovered {
    peripheral: Peripheral,
    name: String,
    address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    let adapter = adapters
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;

    let devices = scan(&adapter, Duration::from_secs(args.scan_secs)).await?;
    for d in &devices {
        println!("{} - {}", d.address, d.name);
    }

    let Some(target) = args.target else {
        if devices.is_empty() {
            println!("No BLE devices found.");
        }
        println!("\nUsage: nus-terminal <DEVICE_NAME_OR_ADDRESS>");
        return Ok(());
    };

    let device = devices
        .into_iter()
        .find(|d| matches_target(&d.name, &d.address, &target))
        .ok_or_else(|| anyhow!("Target device {target:?} not found"))?;

    let result = session(&device).await;
    println!("Disconnecting device...");
    device.peripheral.disconnect().await?;
    result
}

async fn scan(adapter: &Adapter, window: Duration) -> Result<Vec<Discovered>> {
    println!("Scanning for BLE devices...");
    adapter.start_scan(ScanFilter::default()).await?;
    sleep(window).await;
    adapter.stop_scan().await?;

    let mut devices = Vec::new();
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(props)) = peripheral.properties().await {
            let name = props.local_name.unwrap_or_else(|| "Unknown Device".to_string());
            let address = props.address.to_string();
            devices.push(Discovered {
                peripheral,
                name,
                address,
            });
        }
    }
    Ok(devices)
}

async fn session(device: &Discovered) -> Result<()> {
    let peripheral = &device.peripheral;
    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }
    peripheral.discover_services().await?;
    println!("Connected to {}", device.address);

    let tx = find_characteristic(peripheral, NUS_TX_CHAR_UUID)
        .ok_or_else(|| anyhow!("NUS TX characteristic not found"))?;
    let rx = find_characteristic(peripheral, NUS_RX_CHAR_UUID)
        .ok_or_else(|| anyhow!("NUS RX characteristic not found"))?;

    let mut notifications = peripheral.notifications().await?;
    if let Err(e) = peripheral.subscribe(&tx).await {
        eprintln!("Notification setup failed: {e}");
    }

    println!("Type messages to send. Type 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            notification = notifications.next() => {
                let Some(data) = notification else {
                    println!("\nNotification stream closed");
                    break;
                };
                if data.uuid == NUS_TX_CHAR_UUID {
                    print!("{}", String::from_utf8_lossy(&data.value));
                    stdout.flush()?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().eq_ignore_ascii_case("exit") {
                    break;
                }
                peripheral.write(&rx, line.as_bytes(), WriteType::WithResponse).await?;
                sleep(WRITE_PACING).await;
            }
        }
    }

    let _ = peripheral.unsubscribe(&tx).await;
    Ok(())
}

fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Option<Characteristic> {
    peripheral.characteristics().into_iter().find(|c| c.uuid == uuid)
}

/// A target matches a device by exact name or case-insensitive address.
fn matches_target(name: &str, address: &str, target: &str) -> bool {
    name == target || address.eq_ignore_ascii_case(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_matches_name_exactly() {
        assert!(matches_target("nus-console", "AA:BB:CC:DD:EE:FF", "nus-console"));
        assert!(!matches_target("nus-console", "AA:BB:CC:DD:EE:FF", "NUS-CONSOLE"));
    }

    #[test]
    fn target_matches_address_ignoring_case() {
        assert!(matches_target("x", "AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:ff"));
        assert!(!matches_target("x", "AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:00"));
    }

    #[test]
    fn nus_uuids_share_base() {
        assert_eq!(
            NUS_RX_CHAR_UUID.to_string(),
            "6e400002-b5a3-f393-e0a9-e50e24dcca9e"
        );
        assert_eq!(
            NUS_TX_CHAR_UUID.to_string(),
            "6e400003-b5a3-f393-e0a9-e50e24dcca9e"
        );
    }
}
