use alloc::vec::Vec;

/// Switch blade position
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchDirection {
    Straight,
    Curve,
}

/// Handle onto one train of the simulated layout
pub trait TrainHandle {
    /// Ids of the sensors this train currently keeps triggered
    fn triggered_sensors(&self) -> Vec<u32>;
}

/// The simulated world as seen by the protocol layer. All operations
/// are fire-and-forget, failures stay inside the implementation.
pub trait LayoutController {
    type Train: TrainHandle;

    /// Emergency stop, track power off
    fn stop(&self);

    /// Track power on
    fn go(&self);

    /// Stop all trains, track power stays on
    fn halt(&self);

    /// `speed` is in simulator steps 0..=14
    fn set_train_speed(&self, train_id: u32, speed: u8, light: bool);

    fn reverse_train(&self, train_id: u32);

    fn set_switch(&self, switch_id: u32, direction: SwitchDirection);

    fn enumerate_trains(&self) -> Vec<Self::Train>;
}

impl<T: LayoutController + ?Sized> LayoutController for &T {
    type Train = T::Train;

    fn stop(&self) {
        (**self).stop()
    }

    fn go(&self) {
        (**self).go()
    }

    fn halt(&self) {
        (**self).halt()
    }

    fn set_train_speed(&self, train_id: u32, speed: u8, light: bool) {
        (**self).set_train_speed(train_id, speed, light)
    }

    fn reverse_train(&self, train_id: u32) {
        (**self).reverse_train(train_id)
    }

    fn set_switch(&self, switch_id: u32, direction: SwitchDirection) {
        (**self).set_switch(switch_id, direction)
    }

    fn enumerate_trains(&self) -> Vec<Self::Train> {
        (**self).enumerate_trains()
    }
}
