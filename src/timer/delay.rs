use crate::error::Result;
use crate::line::{MicrosClock, SignalLine};
use crate::session::{Exchange, HostSession};
use embedded_hal::delay::DelayNs;

/// Polls the host once, then waits `interval_us`.
///
/// Returns `None` when no exchange was due.
pub fn step_host_loop<L, C, D, W>(
    session: &mut HostSession<L, C, D>,
    delay: &mut W,
    interval_us: u32,
) -> Option<Result<Exchange>>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
    W: DelayNs,
{
    let outcome = match session.poll() {
        Ok(exchange) => Some(Ok(exchange)),
        Err(nb::Error::WouldBlock) => None,
        Err(nb::Error::Other(err)) => {
            warn!("exchange failed: {}", err);
            Some(Err(err))
        }
    };
    delay.delay_us(interval_us);
    outcome
}

/// Runs a blocking loop that keeps the host cadence.
///
/// For environments where interrupts are unavailable or undesired. Failed
/// exchanges are logged and the loop carries on with the next one.
///
/// # Arguments
/// - `session`: the host session to drive.
/// - `delay`: a delay provider, typically from the HAL.
/// - `interval_us`: the pause between polls, well under the keep-alive interval.
///
/// # Example
/// ```ignore
/// use mdlink::{config::Timing, session::HostSession, timer::run_host_loop};
///
/// let mut host = HostSession::new(line, clock, delay, Timing::default())?;
/// run_host_loop(&mut host, &mut loop_delay, 1_000);
/// ```
///
/// # Notes
/// - This loop never returns; it is intended for single-purpose firmware.
/// - Anything that queues payloads has to live in an interrupt, or use
///   [`step_host_loop`] from its own loop instead.
pub fn run_host_loop<L, C, D, W>(
    session: &mut HostSession<L, C, D>,
    delay: &mut W,
    interval_us: u32,
) -> !
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
    W: DelayNs,
{
    loop {
        let _ = step_host_loop(session, delay, interval_us);
    }
}
