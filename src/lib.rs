//! Connection lifecycle management for slow, unreliable links.
//!
//! This crate brings a link up over a radio or cellular transport, notices
//! when it goes away and retries according to the owner's keep-alive
//! intent, all from a single non-blocking `tick()` called in the owner's
//! own loop. There are no threads and no executor: the multi-step bring-up
//! is carried across calls in the connection state.
//!
//! # Features
//!
//! - One state machine shared by every transport
//! - Per-state re-check intervals, with optional retry backoff
//! - Edge-triggered connect/disconnect/error notifications
//! - LoRaWAN, Cat-M1/NB-IoT and Wi-Fi handlers over driver traits
//! - Simulated drivers and a manual clock for host testing
//!
//! # Example
//!
//! ```
//! use netconn_rs::clock::ManualClock;
//! use netconn_rs::connection::ConnectionHandler;
//! use netconn_rs::sim::SimWifiRadio;
//! use netconn_rs::transport::{WifiHandler, WifiParams};
//! use netconn_rs::{ConnectionState, Event};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let clock = ManualClock::new();
//! let wifi = WifiHandler::new(SimWifiRadio::new(), WifiParams::new("lab", "secret"));
//! let mut conn = ConnectionHandler::with_clock(wifi, clock.clone());
//!
//! let up = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&up);
//! conn.set_notifier(move |event, _code| flag.set(event == Event::Connected));
//!
//! clock.advance_ms(100);
//! assert_eq!(conn.tick(), ConnectionState::Connecting);
//! clock.advance_ms(500);
//! assert_eq!(conn.tick(), ConnectionState::Connected);
//! assert!(up.get());
//! ```
//!
//! # State Overview
//!
//! ```text
//!   INIT ──ok──> CONNECTING ──ok──> CONNECTED
//!    │               │  ▲ retry        │ lost
//!    │ fail          └──┘              ▼
//!    └────────────────────────────> DISCONNECTED <── DISCONNECTING
//!                                      │     │
//!                          keep-alive  │     │ no keep-alive
//!                                      ▼     ▼
//!                                    INIT   CLOSED
//! ```

pub mod clock;
pub mod connection;
pub mod error;
pub mod sim;
pub mod transport;
pub mod types;

// Re-export commonly used types at the crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{ConnectionHandler, HandlerConfig, IntervalTable};
pub use error::{DriverError, LinkError, Result};
pub use transport::{LinkIo, Transport};
pub use types::{ConnectionState, Event};
