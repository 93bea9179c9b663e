//! The polling connection state machine.

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{DriverError, Result};
use crate::transport::Transport;
use crate::types::{ConnectionState, Event};

use super::config::{HandlerConfig, InitFailurePolicy};
use super::notify::EventNotifier;
use super::state::ConnectionStats;

/// What a state handler may see and do while it runs.
pub struct Context<'a> {
    name: &'static str,
    keep_alive: bool,
    init_failure: InitFailurePolicy,
    now_ms: u64,
    clock: &'a dyn Clock,
    notifier: &'a mut EventNotifier,
    stats: &'a mut ConnectionStats,
}

impl Context<'_> {
    /// Owner's keep-alive intent.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Clock reading taken when this evaluation started.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Wait for a hardware settle delay.
    pub fn settle(&self, delay: Duration) {
        trace!("[{}] settle {:?}", self.name, delay);
        self.clock.wait(delay);
    }

    /// Raise an event to the owner.
    pub fn notify(&mut self, event: Event, code: i32) {
        match event {
            Event::Connected => self.stats.record_connect(self.now_ms),
            Event::Disconnected => self.stats.record_disconnect(self.now_ms),
            Event::Error => self.stats.record_error(self.now_ms),
        }
        debug!("[{}] event {} (code {})", self.name, event, code);
        self.notifier.notify(event, code);
    }

    /// Report a failed initialization and pick the next state by policy.
    pub fn init_failed(&mut self, err: DriverError) -> ConnectionState {
        self.notify(Event::Error, err.code());
        let next = self.init_failure.next_state();
        error!("[{}] initialization failed: {}, going {}", self.name, err, next);
        next
    }

    /// Report loss of an established link.
    pub fn link_lost(&mut self) -> ConnectionState {
        self.notify(Event::Disconnected, 0);
        if self.keep_alive {
            warn!("[{}] connection lost, attempting reconnection", self.name);
        } else {
            info!("[{}] connection closed", self.name);
        }
        ConnectionState::Disconnected
    }

    /// Resolve the Disconnected decision point from the keep-alive intent.
    pub fn after_disconnect(&self) -> ConnectionState {
        if self.keep_alive {
            ConnectionState::Init
        } else {
            ConnectionState::Closed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Connect,
    Disconnect,
}

/// Drives one transport through its connection lifecycle.
///
/// The owner calls [`tick`](Self::tick) from its own loop. Each state has a
/// minimum re-evaluation interval; ticks arriving earlier return the
/// current state without touching the driver.
///
/// # Example
///
/// ```
/// use netconn_rs::clock::ManualClock;
/// use netconn_rs::connection::ConnectionHandler;
/// use netconn_rs::sim::SimLoRaModem;
/// use netconn_rs::transport::{Band, DeviceClass, LoRaHandler, LoRaParams};
/// use netconn_rs::ConnectionState;
///
/// let params = LoRaParams::new("0000000000000001", "00112233445566778899aabbccddeeff")
///     .with_band(Band::Eu868)
///     .with_class(DeviceClass::A);
/// let clock = ManualClock::new();
/// let mut conn = ConnectionHandler::with_clock(
///     LoRaHandler::new(SimLoRaModem::new(), params),
///     clock.clone(),
/// );
///
/// clock.advance_ms(100);
/// assert_eq!(conn.tick(), ConnectionState::Connecting);
/// clock.advance_ms(500);
/// assert_eq!(conn.tick(), ConnectionState::Connected);
/// ```
pub struct ConnectionHandler<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: HandlerConfig,
    state: ConnectionState,
    last_tick_ms: u64,
    keep_alive: bool,
    pending: Option<Request>,
    failed_attempts: u32,
    notifier: EventNotifier,
    stats: ConnectionStats,
}

impl<T: Transport> ConnectionHandler<T, SystemClock> {
    /// Create a handler on the system clock with the transport's defaults.
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> ConnectionHandler<T, C> {
    /// Create a handler on `clock` with the transport's defaults.
    pub fn with_clock(transport: T, clock: C) -> Self {
        let config = transport.default_config();
        Self::with_config(transport, clock, config)
    }

    /// Create a handler with an explicit configuration.
    pub fn with_config(transport: T, clock: C, config: HandlerConfig) -> Self {
        let last_tick_ms = clock.now_ms();
        let keep_alive = config.keep_alive;
        Self {
            transport,
            clock,
            config,
            state: ConnectionState::Init,
            last_tick_ms,
            keep_alive,
            pending: None,
            failed_attempts: 0,
            notifier: EventNotifier::new(),
            stats: ConnectionStats::default(),
        }
    }

    /// Install the owner's event callback, replacing any previous one.
    ///
    /// Call this before starting the poll loop.
    pub fn set_notifier<F>(&mut self, callback: F)
    where
        F: FnMut(Event, i32) + 'static,
    {
        self.notifier.set(callback);
    }

    /// Remove the owner's event callback.
    pub fn clear_notifier(&mut self) {
        self.notifier.clear();
    }

    /// Get the current state without evaluating anything.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the keep-alive intent.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Get the connection statistics.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Get the configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Time left before the current state is evaluated again.
    pub fn next_due_in(&self) -> Duration {
        if self.pending == Some(Request::Connect) {
            return Duration::ZERO;
        }
        let elapsed = Duration::from_millis(self.clock.now_ms().wrapping_sub(self.last_tick_ms));
        self.current_interval().saturating_sub(elapsed)
    }

    /// Ask for the link to be brought up and kept up.
    ///
    /// While a bring-up is already in flight this only withdraws a pending
    /// disconnect. Otherwise the next tick restarts bring-up from Init
    /// regardless of the interval gate.
    pub fn request_connect(&mut self) {
        if self.state.is_bringing_up() || self.pending == Some(Request::Connect) {
            if self.pending == Some(Request::Disconnect) {
                self.pending = None;
                self.keep_alive = true;
                info!("[{}] pending disconnect withdrawn", self.transport.name());
            } else {
                debug!("[{}] connect request ignored in {}", self.transport.name(), self.state);
            }
            return;
        }
        self.keep_alive = true;
        self.pending = Some(Request::Connect);
        info!("[{}] connect requested", self.transport.name());
    }

    /// Ask for the link to be taken down and not retried.
    ///
    /// The machine winds down on the following due ticks. An established
    /// link is torn down through Disconnecting; a bring-up in flight is
    /// abandoned straight to Disconnected. A transport without a teardown
    /// primitive only loses its keep-alive intent.
    pub fn request_disconnect(&mut self) {
        self.keep_alive = false;
        if self.transport.supports_teardown() {
            self.pending = Some(Request::Disconnect);
        } else if self.pending == Some(Request::Connect) {
            self.pending = None;
        }
        info!("[{}] disconnect requested", self.transport.name());
    }

    /// Advance the state machine if the current state is due.
    pub fn tick(&mut self) -> ConnectionState {
        let now = self.clock.now_ms();

        if self.pending == Some(Request::Connect) {
            self.pending = None;
            self.last_tick_ms = now;
            self.failed_attempts = 0;
            self.enter(ConnectionState::Init);
            return self.state;
        }

        let elapsed = now.wrapping_sub(self.last_tick_ms);
        if u128::from(elapsed) < self.current_interval().as_millis() {
            return self.state;
        }
        self.last_tick_ms = now;

        if self.pending == Some(Request::Disconnect) {
            self.pending = None;
            match self.state {
                ConnectionState::Connected => {
                    self.enter(ConnectionState::Disconnecting);
                    return self.state;
                }
                ConnectionState::Init | ConnectionState::Connecting => {
                    info!("[{}] bring-up abandoned", self.transport.name());
                    self.enter(ConnectionState::Disconnected);
                    return self.state;
                }
                _ => {}
            }
        }

        let next = self.dispatch(now);
        if self.state.can_advance_to(next) {
            self.enter(next);
        } else {
            self.reject(next, now);
        }
        self.state
    }

    /// Send `buf` over the link.
    ///
    /// Not gated on state; calling this outside Connected yields whatever
    /// the driver does. Transmit failures leave the state untouched.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.transport.write(buf) {
            Ok(written) => {
                self.stats.record_write(written);
                Ok(written)
            }
            Err(err) => {
                self.stats.record_write_failure();
                Err(err)
            }
        }
    }

    /// Take one received byte, if any.
    pub fn read(&mut self) -> Option<u8> {
        let byte = self.transport.read();
        if byte.is_some() {
            self.stats.record_read();
        }
        byte
    }

    /// Check if received bytes are waiting.
    pub fn available(&mut self) -> bool {
        self.transport.available()
    }

    /// Consume the handler, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn current_interval(&self) -> Duration {
        self.config.interval_for(self.state, self.failed_attempts)
    }

    fn dispatch(&mut self, now: u64) -> ConnectionState {
        let mut ctx = Context {
            name: self.transport.name(),
            keep_alive: self.keep_alive,
            init_failure: self.config.init_failure,
            now_ms: now,
            clock: &self.clock,
            notifier: &mut self.notifier,
            stats: &mut self.stats,
        };

        match self.state {
            ConnectionState::Init => {
                ctx.stats.record_bring_up();
                self.transport.handle_init(&mut ctx)
            }
            ConnectionState::Connecting => self.transport.handle_connecting(&mut ctx),
            ConnectionState::Connected => self.transport.handle_connected(&mut ctx),
            ConnectionState::Disconnecting => self.transport.handle_disconnecting(&mut ctx),
            ConnectionState::Disconnected => self.transport.handle_disconnected(&mut ctx),
            ConnectionState::Closed | ConnectionState::Error => self.state,
        }
    }

    // A handler outcome outside the transition graph is a transport bug;
    // the machine faults instead of adopting it.
    fn reject(&mut self, next: ConnectionState, now: u64) {
        error!(
            "[{}] handler returned illegal transition {} -> {}, faulting",
            self.transport.name(),
            self.state,
            next
        );
        self.stats.record_error(now);
        self.notifier.notify(Event::Error, 0);
        self.enter(ConnectionState::Error);
    }

    fn enter(&mut self, next: ConnectionState) {
        if next == self.state {
            return;
        }
        match next {
            ConnectionState::Connected => self.failed_attempts = 0,
            ConnectionState::Disconnected => {
                self.failed_attempts = self.failed_attempts.saturating_add(1)
            }
            _ => {}
        }
        debug!("[{}] {} -> {}", self.transport.name(), self.state, next);
        self.state = next;
    }
}

impl<T: Transport, C> fmt::Debug for ConnectionHandler<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("transport", &self.transport.name())
            .field("state", &self.state)
            .field("keep_alive", &self.keep_alive)
            .field("last_tick_ms", &self.last_tick_ms)
            .finish()
    }
}
