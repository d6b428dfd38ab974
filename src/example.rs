//! # Doubles for doc examples and tests
//!
//! `ExampleLayout` records every controller call and serves a scripted
//! sensor set; `ExampleClock` replays a list of instants. Neither
//! needs a mocking framework, so both work in doc examples.
use crate::controller::{LayoutController, SwitchDirection, TrainHandle};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use embedded_time::clock::Error;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};

/// One recorded controller call
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LayoutCall {
    Stop,
    Go,
    Halt,
    SetTrainSpeed {
        train_id: u32,
        speed: u8,
        light: bool,
    },
    ReverseTrain {
        train_id: u32,
    },
    SetSwitch {
        switch_id: u32,
        direction: SwitchDirection,
    },
}

#[derive(Clone, Debug, Default)]
pub struct ExampleTrain {
    pub sensors: Vec<u32>,
}

impl ExampleTrain {
    pub fn new(sensors: Vec<u32>) -> Self {
        Self { sensors }
    }
}

impl TrainHandle for ExampleTrain {
    fn triggered_sensors(&self) -> Vec<u32> {
        self.sensors.clone()
    }
}

/// In-memory layout, shared through an immutable handle
#[derive(Debug, Default)]
pub struct ExampleLayout {
    pub calls: RefCell<Vec<LayoutCall>>,
    pub trains: RefCell<Vec<ExampleTrain>>,
}

impl LayoutController for ExampleLayout {
    type Train = ExampleTrain;

    fn stop(&self) {
        self.calls.borrow_mut().push(LayoutCall::Stop);
    }

    fn go(&self) {
        self.calls.borrow_mut().push(LayoutCall::Go);
    }

    fn halt(&self) {
        self.calls.borrow_mut().push(LayoutCall::Halt);
    }

    fn set_train_speed(&self, train_id: u32, speed: u8, light: bool) {
        self.calls.borrow_mut().push(LayoutCall::SetTrainSpeed {
            train_id,
            speed,
            light,
        });
    }

    fn reverse_train(&self, train_id: u32) {
        self.calls
            .borrow_mut()
            .push(LayoutCall::ReverseTrain { train_id });
    }

    fn set_switch(&self, switch_id: u32, direction: SwitchDirection) {
        self.calls.borrow_mut().push(LayoutCall::SetSwitch {
            switch_id,
            direction,
        });
    }

    fn enumerate_trains(&self) -> Vec<ExampleTrain> {
        self.trains.borrow().clone()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ExampleClock {
    pub next_instants: RefCell<Vec<u64>>,
}

impl ExampleClock {
    pub fn new(next_instants: Vec<u64>) -> Self {
        Self {
            next_instants: RefCell::new(next_instants),
        }
    }
}

impl Default for ExampleClock {
    fn default() -> Self {
        Self::new(vec![
            0,       // Poller start
            100_000, // First poll
            200_000, // Second poll
        ])
    }
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        if self.next_instants.borrow().len() == 0 {
            return Err(Error::Unspecified);
        }

        Ok(Instant::new(self.next_instants.borrow_mut().remove(0)))
    }

    fn new_timer<Dur: Duration + FixedPoint>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur> {
        Timer::new(self, duration)
    }
}
