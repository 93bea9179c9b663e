//! LoRaWAN end-device handler.
//!
//! Bring-up powers the radio on the configured regional band, applies the
//! device class and performs an OTAA join. The medium has no teardown
//! primitive: once joined, the link only goes away when the modem reports
//! it lost.

use std::fmt;
use std::time::Duration;

use tracing::{error, info};

use crate::connection::{Context, HandlerConfig, IntervalTable};
use crate::error::{DriverError, LinkError, Result};
use crate::types::{ConnectionState, Event};

use super::{LinkIo, Transport, check_sent};

/// Largest application payload accepted for one uplink.
pub const MAX_PAYLOAD: usize = 242;

/// Radio settle time after `begin` and after applying the device class.
pub const MODEM_SETTLE: Duration = Duration::from_millis(100);

/// Re-check delays tuned for LoRaWAN duty-cycle limits.
pub const LORA_INTERVALS: IntervalTable = IntervalTable {
    init: 100,
    connecting: 500,
    connected: 10_000,
    disconnecting: 100,
    disconnected: 1_000,
    closed: 1_000,
    error: 1_000,
};

/// LoRaWAN regional frequency plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Band {
    As923,
    Au915,
    Cn470,
    Cn779,
    Eu433,
    #[default]
    Eu868,
    Kr920,
    In865,
    Us915,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::As923 => "AS923",
            Self::Au915 => "AU915",
            Self::Cn470 => "CN470",
            Self::Cn779 => "CN779",
            Self::Eu433 => "EU433",
            Self::Eu868 => "EU868",
            Self::Kr920 => "KR920",
            Self::In865 => "IN865",
            Self::Us915 => "US915",
        };
        f.write_str(name)
    }
}

/// LoRaWAN device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceClass {
    /// Receive windows only after an uplink.
    #[default]
    A,
    /// Scheduled receive slots.
    B,
    /// Continuously listening.
    C,
}

/// Negative result codes returned by the modem on transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LoRaError {
    AckNotReceived = -1,
    Generic = -2,
    WrongParam = -3,
    CommunicationBusy = -4,
    MessageOverflow = -5,
    NoNetworkAvailable = -6,
    RxPacket = -7,
    ReasonUnknown = -8,
    MaxPacketSize = -20,
}

impl LoRaError {
    /// Map a raw modem code to a known error.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::AckNotReceived),
            -2 => Some(Self::Generic),
            -3 => Some(Self::WrongParam),
            -4 => Some(Self::CommunicationBusy),
            -5 => Some(Self::MessageOverflow),
            -6 => Some(Self::NoNetworkAvailable),
            -7 => Some(Self::RxPacket),
            -8 => Some(Self::ReasonUnknown),
            -20 => Some(Self::MaxPacketSize),
            _ => None,
        }
    }

    /// Raw modem code.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Human readable reason.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AckNotReceived => "message ack was not received, the message could not be delivered",
            Self::Generic => "generic modem error",
            Self::WrongParam => "malformed parameter",
            Self::CommunicationBusy => "chip is busy",
            Self::MessageOverflow => "chip overflow",
            Self::NoNetworkAvailable => "no network available",
            Self::RxPacket => "receive error",
            Self::ReasonUnknown => "unknown error",
            Self::MaxPacketSize => "message length is bigger than max packet size",
        }
    }
}

fn describe_code(code: i32) -> &'static str {
    LoRaError::from_code(code).map_or("unrecognized modem code", |e| e.description())
}

/// Driver primitives of a LoRaWAN modem.
pub trait LoRaModem {
    /// Power up the radio on `band`.
    fn begin(&mut self, band: Band) -> std::result::Result<(), DriverError>;

    /// Apply the device class.
    fn configure_class(&mut self, class: DeviceClass) -> std::result::Result<(), DriverError>;

    /// Over-the-air activation.
    fn join_otaa(&mut self, app_eui: &str, app_key: &str) -> std::result::Result<(), DriverError>;

    /// Check if the modem still considers itself joined.
    fn connected(&mut self) -> bool;

    /// Send one uplink; returns the byte count or a negative [`LoRaError`] code.
    fn transmit(&mut self, buf: &[u8]) -> i32;

    /// Number of downlink bytes waiting.
    fn receive_available(&mut self) -> usize;

    /// Take one downlink byte.
    fn receive_byte(&mut self) -> Option<u8>;
}

/// OTAA credentials and radio selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoRaParams {
    /// Application EUI (hex).
    pub app_eui: String,
    /// Application key (hex).
    pub app_key: String,
    /// Regional frequency plan.
    pub band: Band,
    /// Device class.
    pub class: DeviceClass,
}

impl LoRaParams {
    /// Create parameters with the default band and class.
    pub fn new(app_eui: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_eui: app_eui.into(),
            app_key: app_key.into(),
            band: Band::default(),
            class: DeviceClass::default(),
        }
    }

    /// Set the regional band.
    pub fn with_band(mut self, band: Band) -> Self {
        self.band = band;
        self
    }

    /// Set the device class.
    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }
}

/// State handlers for a LoRaWAN modem.
#[derive(Debug)]
pub struct LoRaHandler<M> {
    modem: M,
    params: LoRaParams,
}

impl<M: LoRaModem> LoRaHandler<M> {
    /// Wrap `modem` with fixed parameters.
    pub fn new(modem: M, params: LoRaParams) -> Self {
        Self { modem, params }
    }

    /// Get the parameters.
    pub fn params(&self) -> &LoRaParams {
        &self.params
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

impl<M: LoRaModem> LinkIo for LoRaHandler<M> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.len() > MAX_PAYLOAD {
            error!("[lora] {}", LoRaError::MaxPacketSize.description());
            return Err(LinkError::PayloadTooLarge {
                size: buf.len(),
                max: MAX_PAYLOAD,
            });
        }

        let result = check_sent(self.modem.transmit(buf), buf.len(), describe_code);
        match &result {
            Ok(_) => info!("[lora] message sent"),
            Err(err) => error!("[lora] {}", err),
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

impl<M: LoRaModem> Transport for LoRaHandler<M> {
    fn name(&self) -> &'static str {
        "lora"
    }

    fn default_config(&self) -> HandlerConfig {
        HandlerConfig::new(LORA_INTERVALS)
    }

    fn supports_teardown(&self) -> bool {
        false
    }

    fn handle_init(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if let Err(err) = self.modem.begin(self.params.band) {
            error!("[lora] modem failed to start; is {} the right band?", self.params.band);
            return ctx.init_failed(err);
        }
        ctx.settle(MODEM_SETTLE);
        if let Err(err) = self.modem.configure_class(self.params.class) {
            return ctx.init_failed(err);
        }
        ctx.settle(MODEM_SETTLE);
        info!("[lora] connecting to the network");
        ConnectionState::Connecting
    }

    fn handle_connecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if let Err(err) = self.modem.join_otaa(&self.params.app_eui, &self.params.app_key) {
            error!("[lora] join failed: {}; move near a window and retry", err);
            ctx.notify(Event::Error, err.code());
            return ConnectionState::Error;
        }
        info!("[lora] connected to the network");
        ctx.notify(Event::Connected, 0);
        ConnectionState::Connected
    }

    fn handle_connected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        if !self.modem.connected() {
            return ctx.link_lost();
        }
        ConnectionState::Connected
    }

    fn handle_disconnecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        ctx.link_lost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimLoRaModem;

    fn handler() -> LoRaHandler<SimLoRaModem> {
        LoRaHandler::new(
            SimLoRaModem::new(),
            LoRaParams::new("70B3D57ED0000001", "00112233445566778899AABBCCDDEEFF")
                .with_band(Band::Us915)
                .with_class(DeviceClass::C),
        )
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LoRaError::from_code(-4), Some(LoRaError::CommunicationBusy));
        assert_eq!(LoRaError::from_code(-20), Some(LoRaError::MaxPacketSize));
        assert_eq!(LoRaError::from_code(-9), None);
        assert_eq!(LoRaError::NoNetworkAvailable.code(), -6);
        assert_eq!(describe_code(-99), "unrecognized modem code");
    }

    #[test]
    fn test_write_success() {
        let mut lora = handler();
        assert_eq!(lora.write(b"hello"), Ok(5));
        assert_eq!(lora.modem().sent().len(), 1);
        assert_eq!(&lora.modem().sent()[0][..], b"hello");
    }

    #[test]
    fn test_write_driver_error() {
        let mut lora = handler();
        lora.modem_mut().set_send_result(Some(-1));
        let err = lora.write(b"hello").unwrap_err();
        assert_eq!(
            err,
            LinkError::transmit(-1, LoRaError::AckNotReceived.description())
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_write_oversized_never_reaches_modem() {
        let mut lora = handler();
        let calls = lora.modem().calls();
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            lora.write(&payload),
            Err(LinkError::PayloadTooLarge { size: 243, max: 242 })
        ));
        assert_eq!(lora.modem().calls(), calls);
    }

    #[test]
    fn test_read_path() {
        let mut lora = handler();
        assert!(!lora.available());
        lora.modem_mut().push_downlink(b"ok");
        assert!(lora.available());
        assert_eq!(lora.read(), Some(b'o'));
        assert_eq!(lora.read(), Some(b'k'));
        assert_eq!(lora.read(), None);
    }

    #[test]
    fn test_params_passed_to_modem() {
        use crate::clock::{Clock, ManualClock};
        use crate::connection::ConnectionHandler;

        let clock = ManualClock::new();
        let mut conn = ConnectionHandler::with_clock(handler(), clock.clone());
        clock.advance_ms(100);
        assert_eq!(conn.tick(), ConnectionState::Connecting);

        let modem = conn.transport().modem();
        assert_eq!(modem.band(), Some(Band::Us915));
        assert_eq!(modem.class(), Some(DeviceClass::C));
        // Both settle delays elapsed on the fake clock.
        assert_eq!(clock.now_ms(), 300);
        assert!(!conn.transport().supports_teardown());
    }
}
