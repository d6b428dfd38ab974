use crate::controller::{LayoutController, SwitchDirection, TrainHandle};
use crate::interrupt::IntNotify;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use embedded_hal::digital::v2::OutputPin;
use mockall::mock;

mock! {
    pub Pin {}

    impl OutputPin for Pin {
        type Error = u32;

        fn set_low(&mut self) -> Result<(), u32>;
        fn set_high(&mut self) -> Result<(), u32>;
    }
}

/// Records every interrupt edge in order
pub struct EdgeRecorder(pub Rc<RefCell<Vec<bool>>>);

impl IntNotify for EdgeRecorder {
    fn on_int_change(&mut self, asserted: bool) {
        self.0.borrow_mut().push(asserted);
    }
}

mock! {
    pub Train {}

    impl TrainHandle for Train {
        fn triggered_sensors(&self) -> Vec<u32>;
    }
}

mock! {
    pub Layout {}

    impl LayoutController for Layout {
        type Train = MockTrain;

        fn stop(&self);
        fn go(&self);
        fn halt(&self);
        fn set_train_speed(&self, train_id: u32, speed: u8, light: bool);
        fn reverse_train(&self, train_id: u32);
        fn set_switch(&self, switch_id: u32, direction: SwitchDirection);
        fn enumerate_trains(&self) -> Vec<MockTrain>;
    }
}
