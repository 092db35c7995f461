//! Application hooks for the receive role.

use crate::consts::PAYLOAD_LEN;

/// Notifications raised by [`RecvSession`](crate::session::recv::RecvSession).
///
/// Both methods default to doing nothing, so an implementation only
/// overrides what it cares about.
pub trait LinkListener {
    /// A packet arrived from a ready host and passed its parity check.
    fn on_packet(&mut self, payload: &[u8; PAYLOAD_LEN]) {
        let _ = payload;
    }

    /// The last fragment of a text arrived.
    fn on_text(&mut self, text: &str) {
        let _ = text;
    }
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl LinkListener for NoopListener {}

impl<T: LinkListener + ?Sized> LinkListener for &mut T {
    fn on_packet(&mut self, payload: &[u8; PAYLOAD_LEN]) {
        (**self).on_packet(payload);
    }

    fn on_text(&mut self, text: &str) {
        (**self).on_text(text);
    }
}
