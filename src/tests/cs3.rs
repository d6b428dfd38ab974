use crate::chip::Mcp2515;
use crate::controller::SwitchDirection;
use crate::cs3::{
    cs3_speed_to_sim, decode_command, make_ack, make_sensor_event, Cs3Dispatcher, RESPONSE_BIT,
};
use crate::frame::CanFrame;
use crate::mocks::MockLayout;
use alloc::vec;
use byteorder::{BigEndian, ByteOrder};
use mockall::predicate::eq;
use mockall::Sequence;

/// Builds a frame whose id bits decode to the given command code
fn command_frame(command: u8, data: &[u8]) -> CanFrame {
    let id = u16::from(command) >> 1;
    let eid = u32::from(command & 0x01) << 17;
    CanFrame::new(id, eid, data).unwrap()
}

#[test]
fn test_command_decode() {
    assert_eq!(0x00, decode_command(&command_frame(0x00, &[])));
    assert_eq!(0x04, decode_command(&command_frame(0x04, &[])));
    assert_eq!(0x0B, decode_command(&command_frame(0x0B, &[])));
    assert_eq!(0x11, decode_command(&command_frame(0x11, &[])));
    assert_eq!(0xFF, decode_command(&command_frame(0xFF, &[])));
}

#[test]
fn test_ack_preserves_command_and_payload() {
    let frame = command_frame(0x04, &[0, 0, 0, 1, 0x01, 0xF4]);
    let ack = make_ack(&frame);

    assert_eq!(decode_command(&frame), decode_command(&ack));
    assert_eq!(frame.eid() | RESPONSE_BIT, ack.eid());
    assert_eq!(frame.id(), ack.id());
    assert_eq!(frame.data(), ack.data());
}

#[test]
fn test_system_sub_commands() {
    let mut mock = MockLayout::new();
    let mut seq = Sequence::new();
    mock.expect_stop().times(1).in_sequence(&mut seq).return_const(());
    mock.expect_go().times(1).in_sequence(&mut seq).return_const(());
    mock.expect_halt().times(1).in_sequence(&mut seq).return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);
    for sub in [0u8, 1, 2] {
        let frame = command_frame(0x00, &[0, 0, 0, 0, sub]);
        let result = dispatcher.dispatch(&frame);
        assert_eq!(vec![make_ack(&frame)], result.immediate);
        assert!(result.delayed.is_empty());
    }
}

#[test]
fn test_system_unknown_sub_command_acked_only() {
    let mut dispatcher = Cs3Dispatcher::new(MockLayout::new());

    let frame = command_frame(0x00, &[0, 0, 0, 0, 9]);
    assert_eq!(1, dispatcher.dispatch(&frame).immediate.len());

    let short = command_frame(0x00, &[]);
    assert_eq!(1, dispatcher.dispatch(&short).immediate.len());
}

#[test]
fn test_speed_sets_mapped_speed() {
    let mut mock = MockLayout::new();
    mock.expect_set_train_speed()
        .with(eq(1u32), eq(7u8), eq(false))
        .times(1)
        .return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);
    let frame = command_frame(0x04, &[0, 0, 0, 1, 0x01, 0xF4]);
    let result = dispatcher.dispatch(&frame);

    assert_eq!(vec![make_ack(&frame)], result.immediate);
    assert!(result.delayed.is_empty());
}

#[test]
fn test_speed_query_and_short_payloads_acked_only() {
    let mut dispatcher = Cs3Dispatcher::new(MockLayout::new());

    // Query carries only the train id
    let query = command_frame(0x04, &[0, 0, 0, 1]);
    assert_eq!(1, dispatcher.dispatch(&query).immediate.len());

    // Truncated payloads change nothing either
    for data in [&[][..], &[0, 1][..], &[0, 0, 0, 1, 0][..]] {
        let frame = command_frame(0x04, data);
        assert_eq!(1, dispatcher.dispatch(&frame).immediate.len());
    }
}

#[test]
fn test_light_flag_feeds_following_speed_commands() {
    let mut mock = MockLayout::new();
    let mut seq = Sequence::new();
    mock.expect_set_train_speed()
        .with(eq(1u32), eq(14u8), eq(true))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    mock.expect_set_train_speed()
        .with(eq(1u32), eq(0u8), eq(false))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);

    dispatcher.dispatch(&command_frame(0x06, &[0, 0, 0, 1, 0, 1]));
    dispatcher.dispatch(&command_frame(0x04, &[0, 0, 0, 1, 0x03, 0xE8]));

    dispatcher.dispatch(&command_frame(0x06, &[0, 0, 0, 1, 0, 0]));
    dispatcher.dispatch(&command_frame(0x04, &[0, 0, 0, 1, 0x00, 0x00]));
}

#[test]
fn test_direction_reverses_train() {
    let mut mock = MockLayout::new();
    mock.expect_reverse_train().with(eq(2u32)).times(1).return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);
    let frame = command_frame(0x05, &[0, 0, 0, 2]);
    assert_eq!(1, dispatcher.dispatch(&frame).immediate.len());
}

#[test]
fn test_switch_straight_is_acknowledged_twice() {
    let mut mock = MockLayout::new();
    mock.expect_set_switch()
        .with(eq(1u32), eq(SwitchDirection::Straight))
        .times(1)
        .return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);
    let frame = command_frame(0x0B, &[0x00, 0x00, 0x30, 0x00, 1]);
    let result = dispatcher.dispatch(&frame);

    assert_eq!(vec![make_ack(&frame)], result.immediate);
    assert_eq!(vec![make_ack(&frame)], result.delayed);
}

#[test]
fn test_switch_id_decode_and_curve_mapping() {
    let mut mock = MockLayout::new();
    mock.expect_set_switch()
        .with(eq(10u32), eq(SwitchDirection::Curve))
        .times(1)
        .return_const(());

    let mut dispatcher = Cs3Dispatcher::new(mock);
    dispatcher.dispatch(&command_frame(0x0B, &[0x00, 0x00, 0x30, 0x09, 0]));
}

#[test]
fn test_switch_below_accessory_base_acked_only() {
    let mut dispatcher = Cs3Dispatcher::new(MockLayout::new());

    let frame = command_frame(0x0B, &[0x00, 0x00, 0x2F, 0xFF, 1]);
    let result = dispatcher.dispatch(&frame);
    assert_eq!(1, result.immediate.len());
    assert_eq!(1, result.delayed.len());
}

#[test]
fn test_switch_unknown_position_acked_only() {
    let mut dispatcher = Cs3Dispatcher::new(MockLayout::new());

    let frame = command_frame(0x0B, &[0x00, 0x00, 0x30, 0x00, 7]);
    let result = dispatcher.dispatch(&frame);
    assert_eq!(1, result.immediate.len());
    assert_eq!(1, result.delayed.len());
}

#[test]
fn test_unknown_command_acked_only() {
    let mut dispatcher = Cs3Dispatcher::new(MockLayout::new());

    let frame = command_frame(0x42, &[1, 2, 3]);
    let result = dispatcher.dispatch(&frame);
    assert_eq!(vec![make_ack(&frame)], result.immediate);
    assert!(result.delayed.is_empty());

    // Sensor events are outbound only, inbound ones are not interpreted
    let sensor = command_frame(0x11, &[0; 8]);
    assert_eq!(1, dispatcher.dispatch(&sensor).immediate.len());
}

#[test]
fn test_speed_mapping_boundaries() {
    assert_eq!(0, cs3_speed_to_sim(0));
    assert_eq!(7, cs3_speed_to_sim(500));
    assert_eq!(14, cs3_speed_to_sim(1000));
    assert_eq!(14, cs3_speed_to_sim(1001));
    assert_eq!(0, cs3_speed_to_sim(-5));
}

#[test]
fn test_sensor_event_encoding() {
    let frame = make_sensor_event(42, false, true);

    assert_eq!(0x11, decode_command(&frame));
    assert_eq!(0x08, frame.id());
    assert_eq!((1 << 17) | RESPONSE_BIT | 42, frame.eid());
    assert_eq!(8, frame.dlc());
    assert_eq!(frame.data(), [0, 0, 0, 42, 0, 1, 0, 0]);
    assert_eq!(42, BigEndian::read_u32(&frame.data()[0..4]));

    let released = make_sensor_event(0x1234, true, false);
    assert_eq!(released.data(), [0, 0, 0x12, 0x34, 1, 0, 0, 0]);
    assert_eq!((1 << 17) | RESPONSE_BIT | 0x1234, released.eid());
}

/// Full loop: the host driver loads a speed command over SPI, the
/// dispatcher commands the layout, and the driver reads the
/// acknowledgement back out of RX buffer 0.
#[test]
fn test_speed_command_end_to_end() {
    let mut chip = Mcp2515::default();
    let mut mock = MockLayout::new();
    mock.expect_set_train_speed()
        .with(eq(1u32), eq(7u8), eq(false))
        .times(1)
        .return_const(());
    let mut dispatcher = Cs3Dispatcher::new(mock);

    // Enable the RX interrupt, then load a 500-per-mille speed
    // command for train 1 into TX buffer 0
    let mut response = Vec::new();
    let mut frames = Vec::new();
    let bytes = [
        0x02, 0x2B, 0x01, 0x02, 0x31, 0x00, 0x48, 0x00, 0x00, 0x46, 0x00, 0x00, 0x00, 0x01, 0x01,
        0xF4,
    ];
    for byte in bytes {
        let (out, frame) = chip.step(byte);
        response.push(out);
        frames.extend(frame);
    }

    assert_eq!(1, frames.len());
    assert_eq!(0x04, decode_command(&frames[0]));
    assert_eq!(frames[0].data(), [0, 0, 0, 1, 0x01, 0xF4]);

    let result = dispatcher.dispatch(&frames[0]);
    chip.queue_rx(result.immediate);
    assert!(chip.int_asserted());

    // Read the acknowledgement back through the SPI register window
    let mut readout = Vec::new();
    for byte in [0x03, 0x61, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0] {
        readout.push(chip.step(byte).0);
    }

    let ack = CanFrame::from_rx_buffer(&readout[2..]).unwrap();
    assert_eq!(make_ack(&frames[0]), ack);
    assert_eq!(0x04, decode_command(&ack));
    assert_ne!(0, ack.eid() & RESPONSE_BIT);
}
