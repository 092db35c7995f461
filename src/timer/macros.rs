/// Declares a static global `LINK_HOST` protected by a `critical_section` mutex.
///
/// Both `main` and the timer interrupt reach the host session through it.
///
/// # Arguments
/// - `$line`: the concrete type of the signal line (must implement `SignalLine`)
/// - `$clock`: the concrete type of the microsecond clock (must implement `MicrosClock`)
/// - `$delay`: the concrete type of the delay provider (must implement `DelayNs`)
///
/// # Example
/// ```ignore
/// init_link_host!(MyLinePin, MyMicros, MyDelay);
/// ```
#[macro_export]
macro_rules! init_link_host {
    ( $line:ty, $clock:ty, $delay:ty ) => {
        pub static LINK_HOST: $crate::timer::GlobalHost<$line, $clock, $delay> =
            $crate::timer::global_host_init();
    };
}

/// Builds a host session and stores it in the global `LINK_HOST`.
///
/// Evaluates to `mdlink::error::Result<()>`. Without a timing argument the
/// default timing is used.
///
/// # Example
/// ```ignore
/// fn main() {
///     setup_link_host!(line, clock, delay).unwrap();
/// }
/// ```
///
/// # Notes
/// - Requires `init_link_host!` to have been used earlier.
#[macro_export]
macro_rules! setup_link_host {
    ( $line:expr, $clock:expr, $delay:expr ) => {
        $crate::setup_link_host!($line, $clock, $delay, $crate::config::Timing::default())
    };
    ( $line:expr, $clock:expr, $delay:expr, $timing:expr ) => {
        $crate::timer::global_host_setup(&LINK_HOST, $line, $clock, $delay, $timing)
    };
}

/// Polls the global `LINK_HOST` if it has been set up.
///
/// Intended for the timer interrupt. Evaluates to the same value as
/// `global_host_tick`.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn TIM2() {
///     let _ = tick_link_host!();
/// }
/// ```
///
/// # Notes
/// - Safe to call before `setup_link_host!`; it does nothing until then.
#[macro_export]
macro_rules! tick_link_host {
    () => {
        $crate::timer::global_host_tick(&LINK_HOST)
    };
}

#[cfg(test)]
mod tests {
    use crate::testutil::StepClock;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    init_link_host!(PinMock, StepClock, NoopDelay);

    #[test]
    fn test_macros_wire_up_global_host() {
        assert!(tick_link_host!().is_none());
        setup_link_host!(
            PinMock::new(&[PinTransaction::set(PinState::High)]),
            StepClock::new(1),
            NoopDelay::new()
        )
        .unwrap();
        assert!(tick_link_host!().is_none());

        let host = critical_section::with(|cs| LINK_HOST.borrow(cs).take()).unwrap();
        let (mut line, _, _) = host.free();
        line.done();
    }
}
