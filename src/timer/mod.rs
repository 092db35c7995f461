//! Driving the host cadence.
//!
//! The host role has to run an exchange at least every keep-alive interval.
//! Two ways of doing that are offered: a timer interrupt that polls a global
//! session guarded by `critical_section::with` (`timer-isr` feature), or a
//! blocking loop paced by a `DelayNs` (`delay-loop` feature).
//!
//! Helpers for sizing the interrupt:
//! - `compute_ocr_value`: runtime compare-value calculator
//! - `const_ocr_value`: compile-time compare-value calculator
//! - `ticks_per_keepalive`: how many interrupts make up one keep-alive interval
//!
//! Common prescalers on a 16 MHz AVR, for use with the calculators above:
//!
//! | PRESCALER | TIMER_COUNTS | Overflow Interval |
//! |-----------|--------------|-------------------|
//! |        64 |          250 |              1 ms |
//! |       256 |          125 |              2 ms |
//! |       256 |          250 |              4 ms |
//! |      1024 |          125 |              8 ms |
//! |      1024 |          250 |             16 ms |

use libm::round;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// 1,000,000 microseconds = 1 second
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// Computes the OCR value for an AVR timer (CTC mode).
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 64, 256, 1024)
/// - `period_us`: desired interrupt period in microseconds (e.g., 4000.0)
///
/// # Returns
/// - OCR value for OCRnA, rounded to the nearest count
pub fn compute_ocr_value(f_cpu: u32, prescaler: u32, period_us: f32) -> u16 {
    let counts_per_second = f_cpu as f64 / prescaler as f64;
    let counts = counts_per_second * (period_us as f64 / MICROSECONDS_PER_SECOND as f64);
    round(counts) as u16
}

/// Compile-time OCR value calculator.
///
/// Integer only, so the result truncates instead of rounding.
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 64, 256, 1024)
/// - `period_us`: desired interrupt period in whole microseconds
pub const fn const_ocr_value(f_cpu: u32, prescaler: u32, period_us: u32) -> u16 {
    ((f_cpu / prescaler) as u64 * period_us as u64 / MICROSECONDS_PER_SECOND as u64) as u16
}

/// Number of interrupts of `period_us` that cover `keepalive_us`, at least one.
pub const fn ticks_per_keepalive(period_us: u32, keepalive_us: u32) -> u32 {
    if period_us == 0 || keepalive_us <= period_us {
        1
    } else {
        keepalive_us / period_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_for_four_ms_period() {
        assert_eq!(compute_ocr_value(16_000_000, 256, 4_000.0), 250);
        assert_eq!(const_ocr_value(16_000_000, 256, 4_000), 250);
    }

    #[test]
    fn test_ocr_rounds_at_runtime_only() {
        assert_eq!(compute_ocr_value(16_000_000, 1024, 1_000.0), 16);
        assert_eq!(const_ocr_value(16_000_000, 1024, 1_000), 15);
    }

    #[test]
    fn test_ticks_per_keepalive() {
        assert_eq!(ticks_per_keepalive(4_000, 32_000), 8);
        assert_eq!(ticks_per_keepalive(40_000, 32_000), 1);
        assert_eq!(ticks_per_keepalive(0, 32_000), 1);
    }
}
