//! LoRaWAN node example.
//!
//! This example joins a simulated LoRaWAN network, sends periodic uplinks,
//! loses coverage and rejoins, then stops retrying. Time runs on a manual
//! clock so the whole lifecycle completes instantly.
//!
//! Run with: RUST_LOG=debug cargo run --example lora_node

use netconn_rs::clock::ManualClock;
use netconn_rs::connection::ConnectionHandler;
use netconn_rs::sim::SimLoRaModem;
use netconn_rs::transport::{Band, DeviceClass, LoRaHandler, LoRaParams};
use netconn_rs::{ConnectionState, Event};
use tracing::{info, warn};

/// Simulated main-loop period.
const POLL_MS: u64 = 100;

/// Polls between uplinks.
const UPLINK_EVERY: u32 = 150;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== LoRaWAN Node ===\n");

    let params = LoRaParams::new("70B3D57ED0000001", "2B7E151628AED2A6ABF7158809CF4F3C")
        .with_band(Band::Eu868)
        .with_class(DeviceClass::A);
    let clock = ManualClock::new();
    let mut conn = ConnectionHandler::with_clock(
        LoRaHandler::new(SimLoRaModem::new(), params),
        clock.clone(),
    );

    conn.set_notifier(|event, code| match event {
        Event::Connected => info!("network joined"),
        Event::Disconnected => warn!("network lost"),
        Event::Error => warn!("bring-up failed (code {})", code),
    });

    let mut uplinks = 0u32;
    let mut poll = 0u32;

    while conn.state() != ConnectionState::Closed && poll < 10_000 {
        clock.advance_ms(POLL_MS);
        poll += 1;
        let state = conn.tick();

        // Coverage returns once the node starts over.
        if state == ConnectionState::Init {
            conn.transport_mut().modem_mut().set_link_up(true);
        }

        if state != ConnectionState::Connected || poll % UPLINK_EVERY != 0 {
            continue;
        }

        let payload = format!("temp=21.{}", uplinks % 10);
        match conn.write(payload.as_bytes()) {
            Ok(n) => info!("uplink {} sent ({} bytes)", uplinks, n),
            Err(e) => warn!("uplink {} failed: {}", uplinks, e),
        }
        uplinks += 1;

        match uplinks {
            3 => {
                info!("simulating loss of coverage");
                conn.transport_mut().modem_mut().set_link_up(false);
            }
            6 => {
                // No LoRaWAN teardown: the node closes once the link drops.
                info!("no more retries");
                conn.request_disconnect();
                conn.transport_mut().modem_mut().set_link_up(false);
            }
            _ => {}
        }
    }

    println!("\nFinal state: {}", conn.state());
    println!("Joins:       {}", conn.transport().modem().joins());
    println!("Uplinks:     {}", conn.transport().modem().sent().len());
    println!("Stats:       {:?}", conn.stats());
}
