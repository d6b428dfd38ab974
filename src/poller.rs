use crate::controller::{LayoutController, TrainHandle};
use crate::cs3::make_sensor_event;
use crate::frame::CanFrame;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use embedded_time::duration::Milliseconds;
use embedded_time::{Clock, Instant};

/// Default sensor sampling cadence
pub const DEFAULT_POLL_INTERVAL: Milliseconds<u32> = Milliseconds(100);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PollError {
    /// The supplied clock failed or its instant overflowed
    ClockError,
}

impl From<embedded_time::clock::Error> for PollError {
    fn from(_error: embedded_time::clock::Error) -> Self {
        Self::ClockError
    }
}

/// Periodic observer turning sensor transitions into event frames.
///
/// Each due `poll` snapshots the set of triggered sensor ids across
/// all trains, diffs it against the previous snapshot and produces
/// one event frame per sensor that appeared or disappeared.
pub struct SensorPoller<C: LayoutController, CLK: Clock> {
    controller: C,
    interval: Milliseconds<u32>,
    triggered: BTreeSet<u32>,
    next_tick: Option<Instant<CLK>>,
}

impl<C: LayoutController, CLK: Clock> SensorPoller<C, CLK> {
    pub fn new(controller: C) -> Self {
        Self::with_interval(controller, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(controller: C, interval: Milliseconds<u32>) -> Self {
        Self {
            controller,
            interval,
            triggered: BTreeSet::new(),
            next_tick: None,
        }
    }

    /// Arms the timer. The first tick is due on the next `poll`.
    pub fn start(&mut self, clock: &CLK) -> Result<(), PollError> {
        self.next_tick = Some(clock.try_now()?);
        Ok(())
    }

    /// Disarms the timer. Calling it on a stopped poller is a no-op.
    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Samples the layout if the tick is due. Returns the event
    /// frames to feed into the RX path, oldest transition first.
    pub fn poll(&mut self, clock: &CLK) -> Result<Vec<CanFrame>, PollError> {
        let deadline = match self.next_tick {
            Some(deadline) => deadline,
            None => return Ok(Vec::new()),
        };

        let now = clock.try_now()?;
        if now < deadline {
            return Ok(Vec::new());
        }
        self.next_tick = Some(now.checked_add(self.interval).ok_or(PollError::ClockError)?);

        let current: BTreeSet<u32> = self
            .controller
            .enumerate_trains()
            .iter()
            .flat_map(|train| train.triggered_sensors())
            .collect();

        let mut events = Vec::new();
        for id in current.difference(&self.triggered) {
            events.push(make_sensor_event(*id, false, true));
        }
        for id in self.triggered.difference(&current) {
            events.push(make_sensor_event(*id, true, false));
        }

        self.triggered = current;
        Ok(events)
    }
}
