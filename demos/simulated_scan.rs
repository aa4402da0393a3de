//! Example: Drive the registry with a simulated radio
//!
//! No Bluetooth hardware is needed.
//!
//! Run with: cargo run --example simulated_scan

use ble_device_registry::{
    AdapterEvent, ConnectionState, DeviceId, RadioState, Registry, RegistryConfig, Result,
    ServiceId, SimulatedAdapter, Topic,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ble_device_registry=debug".parse().unwrap()),
        )
        .init();

    let radio = Arc::new(SimulatedAdapter::with_power_state(RadioState::PoweredOn));
    let config = RegistryConfig::default().with_lost_timeout(Duration::from_secs(2));
    let registry = Registry::new(radio.clone(), config)?;

    let _signal = registry.on_topic(Topic::SignalStrengthChanged, |n| {
        if let Some(device) = n.device() {
            println!("  signal changed on {}", device);
        }
    });

    registry.start().await?;

    // A few devices come into range
    radio.advertise("3C:A1:00:00:00:02", -72, Some("Thermostat"));
    radio.advertise("3C:A1:00:00:00:01", -48, Some("Heart Rate Strap"));
    radio.advertise("3C:A1:00:00:00:03", -85, None);
    radio.advertise("3C:A1:00:00:00:01", -51, None);

    print_devices(&registry).await?;

    // Connect to the strap and walk its services
    let strap = DeviceId::from("3C:A1:00:00:00:01");
    registry.connect(&strap).await?;
    radio.complete_connection(&strap);
    radio.emit(AdapterEvent::ServicesDiscovered {
        id: strap.clone(),
        services: vec![
            ServiceId(ble_device_registry::ble::HEART_RATE_SERVICE_UUID),
            ServiceId(ble_device_registry::ble::BATTERY_SERVICE_UUID),
        ],
        error: None,
    });

    if let Some(device) = registry.device(&strap).await? {
        println!(
            "\n{} is {} with {} services",
            device.name,
            device.connection_state,
            device.topology.service_count()
        );
        debug_assert_eq!(device.connection_state, ConnectionState::Connected);
    }

    // Everything else goes quiet and expires
    println!("\nWaiting for silent devices to expire...");
    tokio::time::sleep(Duration::from_secs(3)).await;
    print_devices(&registry).await?;

    // Radio switched off: the registry empties
    radio.set_power_state(RadioState::PoweredOff);
    println!("\nRadio: {}", registry.radio_state().await?.description());
    print_devices(&registry).await?;

    registry.shutdown().await?;
    println!("\nDone!");

    Ok(())
}

async fn print_devices(registry: &Registry) -> Result<()> {
    let devices = registry.devices().await?;
    println!("\n{} devices:", devices.len());
    for device in devices {
        println!(
            "  {} {:<18} {:?} dBm ({} bars) {}",
            device.identifier,
            device.name,
            device.signal_strength,
            device.signal_bars(),
            device.connection_state
        );
    }
    Ok(())
}
