//! Cellular reconnect example.
//!
//! This example brings up a simulated Cat-M1 modem that fails to register
//! a few times, retries with exponential backoff, survives a dropped data
//! session and finally tears the link down on request.
//!
//! Run with: RUST_LOG=debug cargo run --example cellular_reconnect

use std::time::Duration;

use netconn_rs::clock::ManualClock;
use netconn_rs::connection::{BackoffStrategy, ConnectionHandler};
use netconn_rs::sim::SimCellularModem;
use netconn_rs::transport::{CatM1Handler, CellularParams, RadioAccessTechnology, Transport};
use netconn_rs::{ConnectionState, DriverError, Event};
use tracing::{error, info, warn};

/// Simulated main-loop period.
const POLL_MS: u64 = 250;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== Cellular Reconnect ===\n");

    let params = CellularParams::new("iot.example")
        .with_pin("0000")
        .with_rat(RadioAccessTechnology::CatM1);
    let mut modem = SimCellularModem::new();
    modem.set_begin_result(Err(DriverError(-3)));

    let transport = CatM1Handler::new(modem, params);
    let config = transport.default_config().with_backoff(BackoffStrategy::Exponential {
        base: Duration::from_secs(2),
        max: Duration::from_secs(30),
        multiplier: 2.0,
    });

    let clock = ManualClock::new();
    let mut conn = ConnectionHandler::with_config(transport, clock.clone(), config);
    conn.set_notifier(|event, code| match event {
        Event::Connected => info!("data session up"),
        Event::Disconnected => warn!("data session down"),
        Event::Error => error!("registration failed (code {})", code),
    });

    let mut sessions = 0u32;
    let mut was_connected = false;

    for _ in 0..20_000 {
        clock.advance_ms(POLL_MS);
        let state = conn.tick();

        // The network accepts us after three failed attempts.
        if conn.stats().error_count >= 3 {
            conn.transport_mut().modem_mut().set_begin_result(Ok(()));
        }

        let connected = state.is_connected();
        if connected && !was_connected {
            sessions += 1;
            match conn.write(b"hello") {
                Ok(n) => info!("session {}: sent {} bytes", sessions, n),
                Err(e) => warn!("session {}: send failed: {}", sessions, e),
            }

            if sessions == 1 {
                info!("network drops the data session");
                conn.transport_mut().modem_mut().set_registered(false);
            } else {
                info!("shutting down");
                conn.request_disconnect();
            }
        }
        if state == ConnectionState::Init {
            conn.transport_mut().modem_mut().set_registered(true);
        }
        was_connected = connected;

        if state == ConnectionState::Closed {
            break;
        }
    }

    let modem = conn.transport().modem();
    println!("\nFinal state:    {}", conn.state());
    println!("Begin restarts: {:?}", modem.begin_restarts());
    println!("Disconnects:    {}", modem.disconnects());
    println!("Stats:          {:?}", conn.stats());
}
