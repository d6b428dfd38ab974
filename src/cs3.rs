use crate::controller::{LayoutController, SwitchDirection};
use crate::frame::CanFrame;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use log::warn;

/// CS3 response marker, bit 16 of the extended id
pub const RESPONSE_BIT: u32 = 1 << 16;

/// First id of the CS3 accessory address range for switches
const SWITCH_ID_BASE: u32 = 0x3000;

/// Speed scale of the CS3 wire format
const CS3_SPEED_MAX: i32 = 1000;

/// Speed steps of the simulated layout
const SIM_SPEED_MAX: i32 = 14;

/// System sub-commands in data[4]
const SYSTEM_STOP: u8 = 0;
const SYSTEM_GO: u8 = 1;
const SYSTEM_HALT: u8 = 2;

/// CS3 command codes, carried in the low 7 bits of the standard id
/// and bit 17 of the extended id
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    System = 0x00,
    Speed = 0x04,
    Direction = 0x05,
    Light = 0x06,
    Switch = 0x0B,
    Sensor = 0x11,
}

impl Command {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::System),
            0x04 => Some(Self::Speed),
            0x05 => Some(Self::Direction),
            0x06 => Some(Self::Light),
            0x0B => Some(Self::Switch),
            0x11 => Some(Self::Sensor),
            _ => None,
        }
    }
}

/// Extracts the 8-bit command code of a frame
pub fn decode_command(frame: &CanFrame) -> u8 {
    ((frame.id() << 1) & 0xFE) as u8 | ((frame.eid() >> 17) & 0x01) as u8
}

/// Copies a frame and sets the response marker. Payload is preserved.
pub fn make_ack(frame: &CanFrame) -> CanFrame {
    let mut ack = frame.clone();
    ack.eid |= RESPONSE_BIT;
    ack
}

/// Builds the unsolicited event frame for one sensor transition
pub fn make_sensor_event(sensor_id: u32, old: bool, new: bool) -> CanFrame {
    let mut data = [0u8; 8];
    BigEndian::write_u32(&mut data[0..4], sensor_id);
    data[4] = u8::from(old);
    data[5] = u8::from(new);

    let id = Command::Sensor as u16 >> 1;
    let eid = u32::from(Command::Sensor as u8 & 0x01) << 17 | RESPONSE_BIT | (sensor_id & 0xFFFF);
    CanFrame::new(id, eid, &data).expect("sensor event fields stay in range")
}

/// Maps the 0..=1000 CS3 speed scale onto the layout's 0..=14 steps,
/// rounding to the nearest step
pub fn cs3_speed_to_sim(cs3_speed: i32) -> u8 {
    let clamped = cs3_speed.clamp(0, CS3_SPEED_MAX);
    ((clamped * SIM_SPEED_MAX + CS3_SPEED_MAX / 2) / CS3_SPEED_MAX) as u8
}

/// Frames a command produced, split by when the transport should
/// hand them to the RX path.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Dispatch {
    /// Queue right away
    pub immediate: Vec<CanFrame>,

    /// Queue at the transport's delayed-acknowledge opportunity
    pub delayed: Vec<CanFrame>,
}

impl Dispatch {
    fn ack(frame: &CanFrame) -> Self {
        Dispatch {
            immediate: vec![make_ack(frame)],
            delayed: Vec::new(),
        }
    }

    /// Switch commands are acknowledged twice, once immediately and
    /// once after the blades had time to move.
    fn double_ack(frame: &CanFrame) -> Self {
        Dispatch {
            immediate: vec![make_ack(frame)],
            delayed: vec![make_ack(frame)],
        }
    }
}

/// Interprets decoded CAN frames as CS3 commands against a layout
pub struct Cs3Dispatcher<C: LayoutController> {
    controller: C,

    /// CS3 sends the light state separately from speed, the layout
    /// takes both in one call
    train_lights: BTreeMap<u32, bool>,
}

impl<C: LayoutController> Cs3Dispatcher<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            train_lights: BTreeMap::new(),
        }
    }

    /// Handles one frame. Every frame is acknowledged, whatever its
    /// payload looked like; anomalies are only logged.
    pub fn dispatch(&mut self, frame: &CanFrame) -> Dispatch {
        let code = decode_command(frame);

        match Command::from_code(code) {
            Some(Command::System) => self.on_system(frame),
            Some(Command::Speed) => self.on_speed(frame),
            Some(Command::Direction) => self.on_direction(frame),
            Some(Command::Light) => self.on_light(frame),
            Some(Command::Switch) => self.on_switch(frame),
            Some(Command::Sensor) | None => {
                warn!("unhandled CS3 command {code:#04x}, acknowledging only");
                Dispatch::ack(frame)
            }
        }
    }

    fn on_system(&mut self, frame: &CanFrame) -> Dispatch {
        match frame.data().get(4) {
            Some(&SYSTEM_STOP) => self.controller.stop(),
            Some(&SYSTEM_GO) => self.controller.go(),
            Some(&SYSTEM_HALT) => self.controller.halt(),
            Some(&sub) => warn!("unknown system sub-command {sub:#04x}"),
            None => warn!("system command without sub-command byte"),
        }
        Dispatch::ack(frame)
    }

    fn on_speed(&mut self, frame: &CanFrame) -> Dispatch {
        let data = frame.data();

        if data.len() >= 6 {
            let train_id = BigEndian::read_u32(&data[0..4]);
            let cs3_speed = BigEndian::read_u16(&data[4..6]);
            let light = self.train_lights.get(&train_id).copied().unwrap_or(false);
            self.controller
                .set_train_speed(train_id, cs3_speed_to_sim(cs3_speed.into()), light);
        } else if data.len() != 4 {
            // 4 bytes is a plain speed query, anything else is junk
            warn!("speed command with {} payload bytes", data.len());
        }

        Dispatch::ack(frame)
    }

    fn on_direction(&mut self, frame: &CanFrame) -> Dispatch {
        let data = frame.data();

        if data.len() >= 4 {
            self.controller.reverse_train(BigEndian::read_u32(&data[0..4]));
        } else {
            warn!("direction command with {} payload bytes", data.len());
        }

        Dispatch::ack(frame)
    }

    fn on_light(&mut self, frame: &CanFrame) -> Dispatch {
        let data = frame.data();

        if data.len() >= 6 {
            let train_id = BigEndian::read_u32(&data[0..4]);
            self.train_lights.insert(train_id, data[5] != 0);
        } else {
            warn!("light command with {} payload bytes", data.len());
        }

        Dispatch::ack(frame)
    }

    fn on_switch(&mut self, frame: &CanFrame) -> Dispatch {
        let data = frame.data();

        if data.len() < 5 {
            warn!("switch command with {} payload bytes", data.len());
            return Dispatch::double_ack(frame);
        }

        let encoded = BigEndian::read_u32(&data[0..4]);
        let switch_id = match encoded.checked_sub(SWITCH_ID_BASE) {
            Some(offset) => offset + 1,
            None => {
                warn!("switch id {encoded:#06x} below the accessory base");
                return Dispatch::double_ack(frame);
            }
        };

        match data[4] {
            0 => self.controller.set_switch(switch_id, SwitchDirection::Curve),
            1 => self.controller.set_switch(switch_id, SwitchDirection::Straight),
            position => warn!("unknown switch position {position:#04x}"),
        }

        Dispatch::double_ack(frame)
    }
}
