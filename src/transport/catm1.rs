//! Cat-M1 / NB-IoT cellular handler.
//!
//! Registration happens inside the modem's `begin`; the handler then waits
//! for packet-data access and confirms reachability with a ping before
//! reporting the link up. A failed registration forces a modem restart on
//! the next attempt.

use tracing::{debug, error, info, warn};

use crate::connection::{Context, HandlerConfig, IntervalTable};
use crate::error::{DriverError, Result};
use crate::types::{ConnectionState, Event};

use super::{LinkIo, Transport, check_sent};

/// Host pinged to confirm end-to-end reachability.
pub const DEFAULT_PING_HOST: &str = "time.arduino.cc";

/// Re-check delays for a cellular modem.
pub const CELLULAR_INTERVALS: IntervalTable = IntervalTable {
    init: 100,
    connecting: 500,
    connected: 10_000,
    disconnecting: 100,
    disconnected: 1_000,
    closed: 1_000,
    error: 1_000,
};

/// Radio access technology selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RadioAccessTechnology {
    CatM1,
    NbIot,
    /// Prefer Cat-M1, fall back to NB-IoT.
    #[default]
    CatM1NbIot,
}

/// Driver primitives of a cellular modem.
pub trait CellularModem {
    /// Power up, unlock and register. `restart` asks for a full modem reset.
    fn begin(&mut self, params: &CellularParams, restart: bool) -> std::result::Result<(), DriverError>;

    /// Check packet-data access.
    fn is_connected(&mut self) -> bool;

    /// Ping `host`; negative results are failures.
    fn ping(&mut self, host: &str) -> i32;

    /// Drop the data session.
    fn disconnect(&mut self);

    /// Power the modem down.
    fn end(&mut self);

    /// Send bytes; returns the byte count or a negative code.
    fn send(&mut self, buf: &[u8]) -> i32;

    /// Number of received bytes waiting.
    fn receive_available(&mut self) -> usize;

    /// Take one received byte.
    fn receive_byte(&mut self) -> Option<u8>;
}

/// SIM and network access parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellularParams {
    /// SIM PIN; empty when the SIM is unlocked.
    pub pin: String,
    /// Access point name.
    pub apn: String,
    /// APN user name.
    pub login: String,
    /// APN password.
    pub password: String,
    /// Radio access technology.
    pub rat: RadioAccessTechnology,
    /// Band bitmask understood by the modem.
    pub band: u32,
    /// Host used for the reachability probe.
    pub ping_host: String,
}

impl CellularParams {
    /// Create parameters for `apn` with no PIN or credentials.
    pub fn new(apn: impl Into<String>) -> Self {
        Self {
            pin: String::new(),
            apn: apn.into(),
            login: String::new(),
            password: String::new(),
            rat: RadioAccessTechnology::default(),
            band: 0,
            ping_host: DEFAULT_PING_HOST.to_string(),
        }
    }

    /// Set the SIM PIN.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = pin.into();
        self
    }

    /// Set APN credentials.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = login.into();
        self.password = password.into();
        self
    }

    /// Set the radio access technology.
    pub fn with_rat(mut self, rat: RadioAccessTechnology) -> Self {
        self.rat = rat;
        self
    }

    /// Set the band bitmask.
    pub fn with_band(mut self, band: u32) -> Self {
        self.band = band;
        self
    }

    /// Set the reachability probe host.
    pub fn with_ping_host(mut self, host: impl Into<String>) -> Self {
        self.ping_host = host.into();
        self
    }
}

/// State handlers for a Cat-M1 / NB-IoT modem.
#[derive(Debug)]
pub struct CatM1Handler<M> {
    modem: M,
    params: CellularParams,
    restart: bool,
}

impl<M: CellularModem> CatM1Handler<M> {
    /// Wrap `modem` with fixed parameters.
    pub fn new(modem: M, params: CellularParams) -> Self {
        Self {
            modem,
            params,
            restart: false,
        }
    }

    /// Get the parameters.
    pub fn params(&self) -> &CellularParams {
        &self.params
    }

    /// Check if the next bring-up will restart the modem.
    pub fn restart_pending(&self) -> bool {
        self.restart
    }

    /// Network time from the modem.
    ///
    /// Always 0: the modem RTC is not known to be in sync.
    pub fn time(&self) -> u64 {
        0
    }

    /// Get the modem.
    pub fn modem(&self) -> &M {
        &self.modem
    }

    /// Get the modem mutably.
    pub fn modem_mut(&mut self) -> &mut M {
        &mut self.modem
    }
}

impl<M: CellularModem> LinkIo for CatM1Handler<M> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = check_sent(self.modem.send(buf), buf.len(), |_| "modem rejected write");
        if let Err(err) = &result {
            warn!("[catm1] {}", err);
        }
        result
    }

    fn read(&mut self) -> Option<u8> {
        self.modem.receive_byte()
    }

    fn available(&mut self) -> bool {
        self.modem.receive_available() > 0
    }
}

impl<M: CellularModem> Transport for CatM1Handler<M> {
    fn name(&self) -> &'static str {
        "catm1"
    }

    fn default_config(&self) -> HandlerConfig {
        HandlerConfig::new(CELLULAR_INTERVALS)
    }

    fn handle_init(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if let Err(err) = self.modem.begin(&self.params, self.restart) {
            error!("[catm1] the board was not able to register to the network");
            self.restart = true;
            return ctx.init_failed(err);
        }
        self.restart = false;
        ConnectionState::Connecting
    }

    fn handle_connecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if !self.modem.is_connected() {
            error!("[catm1] data access not alive, disconnecting");
            ctx.notify(Event::Error, 0);
            return ConnectionState::Disconnected;
        }

        debug!("[catm1] pinging {}", self.params.ping_host);
        let result = self.modem.ping(&self.params.ping_host);
        if result < 0 {
            warn!("[catm1] ping failed ({}), retrying", result);
            return ConnectionState::Connecting;
        }

        info!("[catm1] connected to network");
        ctx.notify(Event::Connected, 0);
        ConnectionState::Connected
    }

    fn handle_connected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if !self.modem.is_connected() {
            return ctx.link_lost();
        }
        ConnectionState::Connected
    }

    fn handle_disconnecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        self.modem.disconnect();
        ctx.link_lost()
    }

    fn handle_disconnected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        self.modem.end();
        ctx.after_disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::connection::ConnectionHandler;
    use crate::sim::SimCellularModem;

    fn connection() -> (ConnectionHandler<CatM1Handler<SimCellularModem>, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let params = CellularParams::new("iot.example")
            .with_pin("1234")
            .with_rat(RadioAccessTechnology::CatM1)
            .with_ping_host("ping.example");
        let conn = ConnectionHandler::with_clock(
            CatM1Handler::new(SimCellularModem::new(), params),
            clock.clone(),
        );
        (conn, clock)
    }

    #[test]
    fn test_failed_registration_requests_restart() {
        let (mut conn, clock) = connection();
        conn.transport_mut()
            .modem_mut()
            .set_begin_result(Err(DriverError(-3)));

        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Disconnected);
        assert!(conn.transport().restart_pending());

        conn.transport_mut().modem_mut().set_begin_result(Ok(()));
        clock.advance_ms(1_000);
        assert_eq!(conn.tick(), ConnectionState::Init);
        assert_eq!(conn.transport().modem().ends(), 1);

        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Connecting);
        assert_eq!(conn.transport().modem().begin_restarts(), &[false, true]);
        assert!(!conn.transport().restart_pending());
    }

    #[test]
    fn test_ping_failure_stays_connecting() {
        let (mut conn, clock) = connection();
        conn.transport_mut().modem_mut().set_ping_result(-1);

        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Connecting);
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Connecting);
        assert_eq!(conn.transport().modem().last_ping_host(), Some("ping.example"));

        conn.transport_mut().modem_mut().set_ping_result(42);
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Connected);
    }

    #[test]
    fn test_no_data_access_while_connecting() {
        let (mut conn, clock) = connection();
        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Connecting);

        conn.transport_mut().modem_mut().set_registered(false);
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Disconnected);
        assert_eq!(conn.stats().error_count, 1);
    }

    #[test]
    fn test_time_is_untrusted() {
        let (conn, _) = connection();
        assert_eq!(conn.transport().time(), 0);
    }

    #[test]
    fn test_write_rejected() {
        let (mut conn, _) = connection();
        conn.transport_mut().modem_mut().set_send_result(Some(-1));
        assert!(conn.write(b"data").is_err());
        assert_eq!(conn.stats().write_failures, 1);
        assert_eq!(conn.state(), ConnectionState::Init);
    }
}
