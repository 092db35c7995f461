use crate::config::Timing;
use crate::error::Result;
use crate::line::{MicrosClock, SignalLine};
use crate::session::{Exchange, HostSession};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

/// A host session shared between `main` and the timer interrupt.
pub type GlobalHost<L, C, D> = Mutex<RefCell<Option<HostSession<L, C, D>>>>;

/// Used to initialize the global static `HostSession` for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```ignore
/// use mdlink::timer::{GlobalHost, global_host_init};
/// use some_hal::{Micros, Delay, PD2};
///
/// static LINK_HOST: GlobalHost<PD2, Micros, Delay> = global_host_init();
/// ```
pub const fn global_host_init<L, C, D>() -> GlobalHost<L, C, D> {
    Mutex::new(RefCell::new(None))
}

/// Builds the host session and stores it in `global_host`.
///
/// Any session already stored is dropped.
///
/// # Example
/// ```ignore
/// fn main() {
///     global_host_setup(&LINK_HOST, line, clock, delay, Timing::default())?;
/// }
/// ```
pub fn global_host_setup<L, C, D>(
    global_host: &'static GlobalHost<L, C, D>,
    line: L,
    clock: C,
    delay: D,
    timing: Timing,
) -> Result<()>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
{
    let session = HostSession::new(line, clock, delay, timing)?;
    critical_section::with(|cs| {
        let _ = global_host.borrow(cs).replace(Some(session));
    });
    Ok(())
}

/// Polls the global host from the timer interrupt.
///
/// Returns `None` when the session is not set up yet or no exchange was due.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn TIM2() {
///     let _ = global_host_tick(&LINK_HOST);
/// }
/// ```
pub fn global_host_tick<L, C, D>(
    global_host: &'static GlobalHost<L, C, D>,
) -> Option<Result<Exchange>>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
{
    critical_section::with(|cs| {
        let mut slot = global_host.borrow(cs).borrow_mut();
        match slot.as_mut()?.poll() {
            Ok(exchange) => Some(Ok(exchange)),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(err)) => {
                warn!("exchange failed: {}", err);
                Some(Err(err))
            }
        }
    })
}

/// Runs `f` on the global host, if it is set up.
///
/// Used from `main` to queue payloads or text between ticks.
///
/// # Example
/// ```ignore
/// let queued = with_global_host(&LINK_HOST, |host| host.request_capabilities(5));
/// ```
pub fn with_global_host<L, C, D, R>(
    global_host: &'static GlobalHost<L, C, D>,
    f: impl FnOnce(&mut HostSession<L, C, D>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global_host.borrow(cs).borrow_mut().as_mut().map(f))
}
