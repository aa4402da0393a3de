//! Basic example: Track nearby BLE devices with the system radio
//!
//! Run with: cargo run --example scan_devices

use ble_device_registry::{ble::service_name, Notification, Registry, RegistryConfig, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ble_device_registry=info".parse().unwrap()),
        )
        .init();

    println!("Starting BLE device scan...\n");

    let registry = Registry::with_btleplug(RegistryConfig::default()).await?;

    // Print registry-level changes as they happen
    let _handle = registry.on_notification(|notification| match notification {
        Notification::DevicesChanged { .. } => println!("  * device list changed"),
        Notification::RadioStateChanged { .. } => println!("  * radio state changed"),
        Notification::StateChanged { device } => println!("  * {} changed state", device),
        Notification::NameChanged { device } => println!("  * {} renamed", device),
        _ => {}
    });

    registry.start().await?;
    println!("Radio: {}", registry.radio_state().await?.description());

    println!("Scanning for 30 seconds...");
    println!("Press Ctrl+C to exit early.\n");

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted!");
                break;
            }
            _ = ticker.tick() => {
                println!("\n{} devices:", registry.device_count().await?);
                for device in registry.devices().await? {
                    println!(
                        "  {} {:<24} {:>4} dBm  {}  seen {:.1}s ago",
                        device.identifier,
                        device.name,
                        device.signal_strength.map_or("?".to_string(), |r| r.to_string()),
                        "|".repeat(device.signal_bars() as usize),
                        device.last_seen_ago.as_secs_f32(),
                    );
                }
            }
        }
    }

    // Connect to the strongest device and show what it offers
    let strongest = registry
        .devices()
        .await?
        .into_iter()
        .filter(|d| d.signal_strength.is_some())
        .max_by_key(|d| d.signal_strength);

    if let Some(device) = strongest {
        println!("\nConnecting to {} ({})...", device.name, device.identifier);
        registry.connect(&device.identifier).await?;
        tokio::time::sleep(Duration::from_secs(5)).await;

        if let Some(device) = registry.device(&device.identifier).await? {
            println!("  State: {}", device.connection_state);
            for service in device.topology.services() {
                let name = service_name(&service.0).unwrap_or("Unknown Service");
                println!(
                    "  {} ({}): {} characteristics",
                    name,
                    service,
                    device.topology.characteristics(service).len()
                );
            }
        }
    }

    registry.shutdown().await?;
    println!("\nDone!");

    Ok(())
}
