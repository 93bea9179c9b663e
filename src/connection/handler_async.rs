//! Driving a connection handler from a tokio runtime.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval, timeout};

use crate::clock::Clock;
use crate::error::{LinkError, Result};
use crate::transport::Transport;
use crate::types::ConnectionState;

use super::handler::ConnectionHandler;

/// Tick `handler` every `period` until `done` accepts the returned state.
///
/// The handler itself stays synchronous; this only replaces the owner's
/// poll loop. A zero `period` is raised to one millisecond.
pub async fn drive_until<T, C, F>(
    handler: &mut ConnectionHandler<T, C>,
    period: Duration,
    mut done: F,
) -> ConnectionState
where
    T: Transport,
    C: Clock,
    F: FnMut(ConnectionState) -> bool,
{
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let state = handler.tick();
        if done(state) {
            return state;
        }
    }
}

/// Like [`drive_until`], giving up after `limit`.
pub async fn drive_until_timeout<T, C, F>(
    handler: &mut ConnectionHandler<T, C>,
    period: Duration,
    limit: Duration,
    done: F,
) -> Result<ConnectionState>
where
    T: Transport,
    C: Clock,
    F: FnMut(ConnectionState) -> bool,
{
    timeout(limit, drive_until(handler, period, done))
        .await
        .map_err(|_| LinkError::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::connection::{HandlerConfig, IntervalTable};
    use crate::error::DriverError;
    use crate::sim::SimLoRaModem;
    use crate::transport::{LoRaHandler, LoRaParams};

    fn fast_lora(modem: SimLoRaModem) -> ConnectionHandler<LoRaHandler<SimLoRaModem>, SystemClock> {
        ConnectionHandler::with_config(
            LoRaHandler::new(modem, LoRaParams::new("eui", "key")),
            SystemClock::new(),
            HandlerConfig::new(IntervalTable::uniform(1)),
        )
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_drive_until_connected() {
        let mut conn = fast_lora(SimLoRaModem::new());
        let state = drive_until_timeout(
            &mut conn,
            Duration::from_millis(2),
            Duration::from_secs(5),
            |s| s.is_connected(),
        )
        .await;
        assert_eq!(state, Ok(ConnectionState::Connected));
        assert_eq!(conn.stats().connect_count, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_drive_until_times_out() {
        let mut modem = SimLoRaModem::new();
        modem.set_join_result(Err(DriverError(-6)));
        let mut conn = fast_lora(modem);

        let result = drive_until_timeout(
            &mut conn,
            Duration::from_millis(2),
            Duration::from_millis(100),
            |s| s.is_connected(),
        )
        .await;
        assert_eq!(result, Err(LinkError::Timeout));
        assert_eq!(conn.state(), ConnectionState::Error);
    }
}
