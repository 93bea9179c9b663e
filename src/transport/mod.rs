//! Per-transport state handlers.
//!
//! Every medium drives the same five-state bring-up shape against its own
//! driver primitives. A [`Transport`] supplies one handler per active state
//! plus the byte path; [`ConnectionHandler`](crate::connection::ConnectionHandler)
//! owns the clock, the keep-alive intent and the dispatch.
//!
//! | Transport | Bring-up | Liveness | Teardown |
//! |-----------|----------|----------|----------|
//! | [`LoRaHandler`] | begin + class, OTAA join | `connected()` | none |
//! | [`CatM1Handler`] | modem begin/register | ping, `is_connected()` | disconnect + end |
//! | [`WifiHandler`] | firmware check, associate | link status | disassociate + end |

pub mod catm1;
pub mod lora;
pub mod wifi;

pub use catm1::{CatM1Handler, CellularModem, CellularParams, RadioAccessTechnology};
pub use lora::{Band, DeviceClass, LoRaError, LoRaHandler, LoRaModem, LoRaParams};
pub use wifi::{WifiHandler, WifiParams, WifiRadio, WifiStatus};

use crate::connection::{Context, HandlerConfig};
use crate::error::{LinkError, Result};
use crate::types::ConnectionState;

/// Byte path of a link, passed straight through to the driver.
///
/// Calls are only meaningful while the link is Connected; outside that
/// state the result is whatever the driver does.
pub trait LinkIo {
    /// Send `buf` as one unit, returning the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Take one received byte, if any.
    fn read(&mut self) -> Option<u8>;

    /// Check if received bytes are waiting.
    fn available(&mut self) -> bool;
}

/// State handlers for one physical medium.
///
/// Each handler runs only when the state is due, performs its driver calls
/// to completion and returns the next state. Events are raised through the
/// [`Context`].
pub trait Transport: LinkIo {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Intervals and policies tuned to this medium.
    fn default_config(&self) -> HandlerConfig;

    /// Whether the medium has an explicit teardown primitive.
    ///
    /// Without one, a disconnect request only clears the keep-alive intent.
    fn supports_teardown(&self) -> bool {
        true
    }

    /// Power up and configure the transport.
    fn handle_init(&mut self, ctx: &mut Context<'_>) -> ConnectionState;

    /// Join or register with the network.
    fn handle_connecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState;

    /// Check that the link is still alive.
    fn handle_connected(&mut self, ctx: &mut Context<'_>) -> ConnectionState;

    /// Actively tear the link down.
    fn handle_disconnecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState;

    /// Decide between retrying and closing.
    fn handle_disconnected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        ctx.after_disconnect()
    }
}

impl<T: LinkIo + ?Sized> LinkIo for Box<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn available(&mut self) -> bool {
        (**self).available()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn default_config(&self) -> HandlerConfig {
        (**self).default_config()
    }

    fn supports_teardown(&self) -> bool {
        (**self).supports_teardown()
    }

    fn handle_init(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        (**self).handle_init(ctx)
    }

    fn handle_connecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        (**self).handle_connecting(ctx)
    }

    fn handle_connected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        (**self).handle_connected(ctx)
    }

    fn handle_disconnecting(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        (**self).handle_disconnecting(ctx)
    }

    fn handle_disconnected(&mut self, ctx: &mut Context<'_>) -> ConnectionState {
        (**self).handle_disconnected(ctx)
    }
}

/// Interpret a driver's send result: a byte count, or a negative code.
pub(crate) fn check_sent(
    result: i32,
    expected: usize,
    reason: impl FnOnce(i32) -> &'static str,
) -> Result<usize> {
    match usize::try_from(result) {
        Ok(written) if written == expected => Ok(written),
        Ok(written) => Err(LinkError::ShortWrite { written, expected }),
        Err(_) => Err(LinkError::transmit(result, reason(result))),
    }
}
