//! Simulated drivers for host-side testing.
//!
//! Each simulator answers driver calls from scripted results and counts
//! every call, so tests can check that gated ticks never reach the driver.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::DriverError;
use crate::transport::{
    Band, CellularModem, CellularParams, DeviceClass, LoRaModem, WifiRadio, WifiStatus,
};

type DriverResult = std::result::Result<(), DriverError>;

/// Byte path shared by the simulators.
#[derive(Debug, Default)]
struct SimLink {
    rx: BytesMut,
    sent: Vec<Bytes>,
    send_result: Option<i32>,
}

impl SimLink {
    fn send(&mut self, buf: &[u8]) -> i32 {
        if let Some(code) = self.send_result {
            return code;
        }
        self.sent.push(Bytes::copy_from_slice(buf));
        buf.len() as i32
    }

    fn available(&self) -> usize {
        self.rx.remaining()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.has_remaining().then(|| self.rx.get_u8())
    }
}

/// Scriptable LoRaWAN modem.
#[derive(Debug)]
pub struct SimLoRaModem {
    begin_result: DriverResult,
    class_result: DriverResult,
    join_result: DriverResult,
    joined: bool,
    link_up: bool,
    band: Option<Band>,
    class: Option<DeviceClass>,
    joins: u32,
    calls: u32,
    link: SimLink,
}

impl SimLoRaModem {
    /// A modem on which every step succeeds.
    pub fn new() -> Self {
        Self {
            begin_result: Ok(()),
            class_result: Ok(()),
            join_result: Ok(()),
            joined: false,
            link_up: true,
            band: None,
            class: None,
            joins: 0,
            calls: 0,
            link: SimLink::default(),
        }
    }

    pub fn set_begin_result(&mut self, result: DriverResult) {
        self.begin_result = result;
    }

    pub fn set_class_result(&mut self, result: DriverResult) {
        self.class_result = result;
    }

    pub fn set_join_result(&mut self, result: DriverResult) {
        self.join_result = result;
    }

    /// Whether a joined modem keeps reporting the link as up.
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    /// Override what `transmit` returns; `None` echoes the length.
    pub fn set_send_result(&mut self, result: Option<i32>) {
        self.link.send_result = result;
    }

    /// Queue downlink bytes.
    pub fn push_downlink(&mut self, data: &[u8]) {
        self.link.rx.extend_from_slice(data);
    }

    pub fn band(&self) -> Option<Band> {
        self.band
    }

    pub fn class(&self) -> Option<DeviceClass> {
        self.class
    }

    /// Number of join attempts.
    pub fn joins(&self) -> u32 {
        self.joins
    }

    /// Total driver calls.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Frames accepted by `transmit`.
    pub fn sent(&self) -> &[Bytes] {
        &self.link.sent
    }
}

impl Default for SimLoRaModem {
    fn default() -> Self {
        Self::new()
    }
}

impl LoRaModem for SimLoRaModem {
    fn begin(&mut self, band: Band) -> DriverResult {
        self.calls += 1;
        self.band = Some(band);
        self.begin_result
    }

    fn configure_class(&mut self, class: DeviceClass) -> DriverResult {
        self.calls += 1;
        self.class = Some(class);
        self.class_result
    }

    fn join_otaa(&mut self, _app_eui: &str, _app_key: &str) -> DriverResult {
        self.calls += 1;
        self.joins += 1;
        self.joined = self.join_result.is_ok();
        self.join_result
    }

    fn connected(&mut self) -> bool {
        self.calls += 1;
        self.joined && self.link_up
    }

    fn transmit(&mut self, buf: &[u8]) -> i32 {
        self.calls += 1;
        self.link.send(buf)
    }

    fn receive_available(&mut self) -> usize {
        self.calls += 1;
        self.link.available()
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.calls += 1;
        self.link.read()
    }
}

/// Scriptable cellular modem.
#[derive(Debug)]
pub struct SimCellularModem {
    begin_result: DriverResult,
    registered: bool,
    ping_result: i32,
    begin_restarts: Vec<bool>,
    last_ping_host: Option<String>,
    disconnects: u32,
    ends: u32,
    calls: u32,
    link: SimLink,
}

impl SimCellularModem {
    /// A modem that registers and answers pings.
    pub fn new() -> Self {
        Self {
            begin_result: Ok(()),
            registered: true,
            ping_result: 42,
            begin_restarts: Vec::new(),
            last_ping_host: None,
            disconnects: 0,
            ends: 0,
            calls: 0,
            link: SimLink::default(),
        }
    }

    pub fn set_begin_result(&mut self, result: DriverResult) {
        self.begin_result = result;
    }

    /// Whether packet-data access is reported alive.
    pub fn set_registered(&mut self, registered: bool) {
        self.registered = registered;
    }

    pub fn set_ping_result(&mut self, result: i32) {
        self.ping_result = result;
    }

    /// Override what `send` returns; `None` echoes the length.
    pub fn set_send_result(&mut self, result: Option<i32>) {
        self.link.send_result = result;
    }

    /// Queue received bytes.
    pub fn push_received(&mut self, data: &[u8]) {
        self.link.rx.extend_from_slice(data);
    }

    /// The `restart` flag of every `begin` call, in order.
    pub fn begin_restarts(&self) -> &[bool] {
        &self.begin_restarts
    }

    pub fn last_ping_host(&self) -> Option<&str> {
        self.last_ping_host.as_deref()
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects
    }

    pub fn ends(&self) -> u32 {
        self.ends
    }

    /// Total driver calls.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Frames accepted by `send`.
    pub fn sent(&self) -> &[Bytes] {
        &self.link.sent
    }
}

impl Default for SimCellularModem {
    fn default() -> Self {
        Self::new()
    }
}

impl CellularModem for SimCellularModem {
    fn begin(&mut self, _params: &CellularParams, restart: bool) -> DriverResult {
        self.calls += 1;
        self.begin_restarts.push(restart);
        self.begin_result
    }

    fn is_connected(&mut self) -> bool {
        self.calls += 1;
        self.registered
    }

    fn ping(&mut self, host: &str) -> i32 {
        self.calls += 1;
        self.last_ping_host = Some(host.to_string());
        self.ping_result
    }

    fn disconnect(&mut self) {
        self.calls += 1;
        self.disconnects += 1;
    }

    fn end(&mut self) {
        self.calls += 1;
        self.ends += 1;
    }

    fn send(&mut self, buf: &[u8]) -> i32 {
        self.calls += 1;
        self.link.send(buf)
    }

    fn receive_available(&mut self) -> usize {
        self.calls += 1;
        self.link.available()
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.calls += 1;
        self.link.read()
    }
}

/// Scriptable Wi-Fi radio.
#[derive(Debug)]
pub struct SimWifiRadio {
    present: bool,
    associate_status: WifiStatus,
    status: WifiStatus,
    last_ssid: Option<String>,
    disassociations: u32,
    ends: u32,
    calls: u32,
    link: SimLink,
}

impl SimWifiRadio {
    /// A radio that associates on the first attempt.
    pub fn new() -> Self {
        Self {
            present: true,
            associate_status: WifiStatus::Connected,
            status: WifiStatus::Idle,
            last_ssid: None,
            disassociations: 0,
            ends: 0,
            calls: 0,
            link: SimLink::default(),
        }
    }

    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Status returned by the next `associate` calls.
    pub fn set_associate_status(&mut self, status: WifiStatus) {
        self.associate_status = status;
    }

    /// Force the current link status.
    pub fn set_status(&mut self, status: WifiStatus) {
        self.status = status;
    }

    /// Override what `send` returns; `None` echoes the length.
    pub fn set_send_result(&mut self, result: Option<i32>) {
        self.link.send_result = result;
    }

    pub fn last_ssid(&self) -> Option<&str> {
        self.last_ssid.as_deref()
    }

    pub fn disassociations(&self) -> u32 {
        self.disassociations
    }

    pub fn ends(&self) -> u32 {
        self.ends
    }

    /// Total driver calls.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl Default for SimWifiRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiRadio for SimWifiRadio {
    fn present(&mut self) -> bool {
        self.calls += 1;
        self.present
    }

    fn associate(&mut self, ssid: &str, _password: &str) -> WifiStatus {
        self.calls += 1;
        self.last_ssid = Some(ssid.to_string());
        self.status = self.associate_status;
        self.status
    }

    fn status(&mut self) -> WifiStatus {
        self.calls += 1;
        self.status
    }

    fn disassociate(&mut self) {
        self.calls += 1;
        self.disassociations += 1;
        self.status = WifiStatus::Disconnected;
    }

    fn end(&mut self) {
        self.calls += 1;
        self.ends += 1;
        self.status = WifiStatus::Idle;
    }

    fn send(&mut self, buf: &[u8]) -> i32 {
        self.calls += 1;
        self.link.send(buf)
    }

    fn receive_available(&mut self) -> usize {
        self.calls += 1;
        self.link.available()
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.calls += 1;
        self.link.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_link_queue() {
        let mut link = SimLink::default();
        link.rx.extend_from_slice(b"ab");
        assert_eq!(link.available(), 2);
        assert_eq!(link.read(), Some(b'a'));
        assert_eq!(link.read(), Some(b'b'));
        assert_eq!(link.read(), None);

        assert_eq!(link.send(b"xyz"), 3);
        link.send_result = Some(-5);
        assert_eq!(link.send(b"xyz"), -5);
        assert_eq!(link.sent.len(), 1);
    }

    #[test]
    fn test_sim_lora_join_state() {
        let mut modem = SimLoRaModem::new();
        assert!(!modem.connected());
        modem.set_join_result(Err(DriverError(-6)));
        assert_eq!(modem.join_otaa("eui", "key"), Err(DriverError(-6)));
        assert!(!modem.connected());
        modem.set_join_result(Ok(()));
        assert_eq!(modem.join_otaa("eui", "key"), Ok(()));
        assert!(modem.connected());
        modem.set_link_up(false);
        assert!(!modem.connected());
        assert_eq!(modem.joins(), 2);
        assert_eq!(modem.calls(), 6);
    }
}
