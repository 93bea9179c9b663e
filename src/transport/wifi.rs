//! Wi-Fi station handler.

use tracing::{error, info, warn};

use crate::connection::{Context, HandlerConfig, InitFailurePolicy, IntervalTable};
use crate::error::{DriverError, Result};
use crate::types::{ConnectionState, Event};

use super::{LinkIo, Transport, check_sent};

/// Re-check delays for a Wi-Fi station.
pub const WIFI_INTERVALS: IntervalTable = IntervalTable {
    init: 100,
    connecting: 500,
    connected: 10_000,
    disconnecting: 100,
    disconnected: 1_000,
    closed: 1_000,
    error: 1_000,
};

/// Station link status reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WifiStatus {
    #[default]
    Idle,
    NoSsidAvailable,
    ConnectFailed,
    Connected,
    ConnectionLost,
    Disconnected,
}

/// Driver primitives of a Wi-Fi radio.
pub trait WifiRadio {
    /// Check that the radio module and its firmware respond.
    fn present(&mut self) -> bool;

    /// Associate with an access point and report the resulting status.
    fn associate(&mut self, ssid: &str, password: &str) -> WifiStatus;

    /// Current link status.
    fn status(&mut self) -> WifiStatus;

    /// Leave the access point.
    fn disassociate(&mut self);

    /// Power the radio down.
    fn end(&mut self);

    /// Send bytes; returns the byte count or a negative code.
    fn send(&mut self, buf: &[u8]) -> i32;

    /// Number of received bytes waiting.
    fn receive_available(&mut self) -> usize;

    /// Take one received byte.
    fn receive_byte(&mut self) -> Option<u8>;
}

/// Access point credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiParams {
    /// Network name.
    pub ssid: String,
    /// WPA passphrase; empty for open networks.
    pub password: String,
}

impl WifiParams {
    /// Create credentials for `ssid`.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

/// State handlers for a Wi-Fi station.
#[derive(Debug)]
pub struct WifiHandler<R> {
    radio: R,
    params: WifiParams,
}

impl<R: WifiRadio> WifiHandler<R> {
    /// Wrap `radio` with fixed credentials.
    pub fn new(radio: R, params: WifiParams) -> Self {
        Self { radio, params }
    }

    /// Get the credentials.
    pub fn params(&self) -> &WifiParams {
        &self.params
    }

    /// Get the radio.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Get the radio mutably.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

impl<R: WifiRadio> LinkIo for WifiHandler<R> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = check_sent(self.radio.send(buf), buf.len(), |_| "radio rejected write");
        if let Err(err) = &result {
            warn!("[wifi] {}", err);
        }
        result
    }

    fn read(&mut self) -> Option<u8> {
        self.radio.receive_byte()
    }

    fn available(&mut self) -> bool {
        self.radio.receive_available() > 0
    }
}

impl<R: WifiRadio> Transport for WifiHandler<R> {
    fn name(&self) -> &'static str {
        "wifi"
    }

    // A missing radio will not appear by retrying.
    fn default_config(&self) -> HandlerConfig {
        HandlerConfig::new(WIFI_INTERVALS).with_init_failure(InitFailurePolicy::Halt)
    }

    fn handle_init(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if !self.radio.present() {
            error!("[wifi] communication with the radio module failed");
            return ctx.init_failed(DriverError::UNSPECIFIED);
        }
        info!("[wifi] connecting to \"{}\"", self.params.ssid);
        ConnectionState::Connecting
    }

    fn handle_connecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        let status = self.radio.associate(&self.params.ssid, &self.params.password);
        if status != WifiStatus::Connected {
            warn!("[wifi] association with \"{}\" failed: {:?}, retrying", self.params.ssid, status);
            return ConnectionState::Connecting;
        }
        info!("[wifi] connected to \"{}\"", self.params.ssid);
        ctx.notify(Event::Connected, 0);
        ConnectionState::Connected
    }

    fn handle_connected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if self.radio.status() != WifiStatus::Connected {
            return ctx.link_lost();
        }
        ConnectionState::Connected
    }

    fn handle_disconnecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        self.radio.disassociate();
        ctx.link_lost()
    }

    fn handle_disconnected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        self.radio.end();
        ctx.after_disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::connection::ConnectionHandler;
    use crate::sim::SimWifiRadio;

    #[test]
    fn test_missing_radio_halts() {
        let clock = ManualClock::new();
        let mut radio = SimWifiRadio::new();
        radio.set_present(false);
        let mut conn = ConnectionHandler::with_clock(
            WifiHandler::new(radio, WifiParams::new("lab", "secret")),
            clock.clone(),
        );

        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Error);

        // Terminal: no further driver calls.
        let calls = conn.transport().radio().calls();
        clock.advance_ms(60_000);
        assert_eq!(conn.tick(), ConnectionState::Error);
        assert_eq!(conn.transport().radio().calls(), calls);
    }

    #[test]
    fn test_association_retries_in_place() {
        let clock = ManualClock::new();
        let mut radio = SimWifiRadio::new();
        radio.set_associate_status(WifiStatus::NoSsidAvailable);
        let mut conn = ConnectionHandler::with_clock(
            WifiHandler::new(radio, WifiParams::new("lab", "secret")),
            clock.clone(),
        );

        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Connecting);
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Connecting);
        assert_eq!(conn.stats().error_count, 0);

        conn.transport_mut()
            .radio_mut()
            .set_associate_status(WifiStatus::Connected);
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Connected);
        assert_eq!(conn.transport().radio().last_ssid(), Some("lab"));
    }

    #[test]
    fn test_disconnect_request_disassociates() {
        let clock = ManualClock::new();
        let mut conn = ConnectionHandler::with_clock(
            WifiHandler::new(SimWifiRadio::new(), WifiParams::new("lab", "secret")),
            clock.clone(),
        );
        clock.advance_ms(100);
        conn.tick();
        clock.advance_ms(500);
        assert_eq!(conn.tick(), ConnectionState::Connected);

        conn.request_disconnect();
        clock.advance_ms(10_000);
        assert_eq!(conn.tick(), ConnectionState::Disconnecting);
        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Disconnected);
        assert_eq!(conn.transport().radio().disassociations(), 1);
        clock.advance_ms(1_000);
        assert_eq!(conn.tick(), ConnectionState::Closed);
        assert_eq!(conn.transport().radio().ends(), 1);
    }
}
