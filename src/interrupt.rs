use embedded_hal::digital::v2::OutputPin;
use log::debug;

/// Consumer of interrupt-line edges. Invoked only when the logical
/// line state actually changes.
pub trait IntNotify {
    fn on_int_change(&mut self, asserted: bool);
}

/// Discards all edges
#[derive(Default)]
pub struct NoopInt;

impl IntNotify for NoopInt {
    fn on_int_change(&mut self, _asserted: bool) {}
}

/// Drives a physical pin from the logical line state, asserted = low.
pub struct ActiveLowPin<P: OutputPin>(pub P);

impl<P: OutputPin> IntNotify for ActiveLowPin<P> {
    fn on_int_change(&mut self, asserted: bool) {
        let result = if asserted {
            self.0.set_low()
        } else {
            self.0.set_high()
        };

        if result.is_err() {
            debug!("INT pin refused the level change, edge dropped");
        }
    }
}
