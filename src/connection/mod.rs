//! Connection lifecycle management.
//!
//! This module provides:
//! - The polling state machine ([`ConnectionHandler`])
//! - Per-state re-check intervals and retry backoff
//! - Single-slot event notification
//! - Connection statistics
//!
//! # Example
//!
//! ```no_run
//! use netconn_rs::clock::SystemClock;
//! use netconn_rs::connection::{BackoffStrategy, ConnectionHandler};
//! use netconn_rs::sim::SimCellularModem;
//! use netconn_rs::transport::{CatM1Handler, CellularParams, Transport};
//! use netconn_rs::{ConnectionState, Event};
//! use std::time::Duration;
//!
//! let transport = CatM1Handler::new(SimCellularModem::new(), CellularParams::new("iot.apn"));
//! let config = transport
//!     .default_config()
//!     .with_backoff(BackoffStrategy::Fixed(Duration::from_secs(30)));
//!
//! let mut conn = ConnectionHandler::with_config(transport, SystemClock::new(), config);
//! conn.set_notifier(|event, code| match event {
//!     Event::Connected => println!("link up"),
//!     Event::Disconnected => println!("link down"),
//!     Event::Error => println!("bring-up failed ({code})"),
//! });
//!
//! loop {
//!     if conn.tick() == ConnectionState::Connected {
//!         let _ = conn.write(b"telemetry");
//!     }
//!     std::thread::sleep(Duration::from_millis(50));
//! }
//! ```

mod config;
mod handler;
mod notify;
mod state;

pub use config::{BackoffStrategy, HandlerConfig, InitFailurePolicy, IntervalTable};
pub use handler::{ConnectionHandler, Context};
pub use notify::EventNotifier;
pub use state::ConnectionStats;

// Async driving helpers (require tokio feature)
#[cfg(feature = "tokio")]
mod handler_async;

#[cfg(feature = "tokio")]
pub use handler_async::{drive_until, drive_until_timeout};
