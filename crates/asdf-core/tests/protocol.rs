use asdf_core::protocol::codec::{self, LEGACY_HEADER};
use asdf_core::protocol::commands::LEVER_SET_OPCODES;
use asdf_core::protocol::{Command, LeverMask, PollFormat, ProtocolError, ResponseCode};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

mod common;
use common::{legacy_frame, LEGACY_SAMPLES};

#[test]
fn test_lever_set_table_is_bijection() {
    let keys: HashSet<&str> = LEVER_SET_OPCODES.iter().map(|(k, _)| *k).collect();
    let opcodes: HashSet<u8> = LEVER_SET_OPCODES
        .iter()
        .map(|(k, _)| codec::lever_set_opcode(k).unwrap())
        .collect();
    assert_eq!(keys.len(), 8);
    assert_eq!(opcodes.len(), 8);
    assert_eq!(
        opcodes,
        [0x82, 0x92, 0xA2, 0xB2, 0xC2, 0xD2, 0xE2, 0xF2]
            .into_iter()
            .collect::<HashSet<u8>>()
    );
}

#[test]
fn test_lever_set_rejects_other_strings() {
    for bad in ["", "1", "0000", "abc", "1O1", "2"] {
        assert!(
            matches!(codec::lever_set_opcode(bad), Err(ProtocolError::Encoding(_))),
            "{:?} accepted",
            bad
        );
    }
}

#[test]
fn test_encode_lever_set_preserves_value_order() {
    let cmd = Command::LeverSet {
        mask: "111".parse().unwrap(),
        values: vec![3, 2, 1],
    };
    assert_eq!(codec::encode(&cmd).unwrap(), vec![0xF2, 3, 2, 1]);
}

#[test]
fn test_encode_empty_lever_set() {
    let cmd = Command::LeverSet {
        mask: LeverMask::NONE,
        values: vec![],
    };
    assert_eq!(codec::encode(&cmd).unwrap(), vec![0x82]);
}

#[test]
fn test_legacy_frame_with_header_parses_without_rotation() {
    let frame = legacy_frame();
    assert_eq!(&frame[..2], &LEGACY_HEADER[..]);
    let sample = codec::decode_poll(&frame, PollFormat::Legacy).unwrap();
    assert_eq!(sample.values(), &LEGACY_SAMPLES);
}

#[test]
fn test_legacy_frame_shifted_parses_to_same_samples() {
    let aligned = codec::decode_poll(&legacy_frame(), PollFormat::Legacy).unwrap();

    let mut shifted = legacy_frame();
    shifted.rotate_right(1);
    let realigned = codec::decode_poll(&shifted, PollFormat::Legacy).unwrap();

    assert_eq!(realigned, aligned);
}

#[test]
fn test_legacy_rotation_is_one_shot() {
    // Shifted by two: one rotation is not enough and no further rotation happens
    let mut shifted = legacy_frame();
    shifted.rotate_right(2);
    let mut once = shifted.clone();
    assert!(codec::realign_legacy(&mut once));
    assert_ne!(once, legacy_frame());

    let sample = codec::decode_poll(&shifted, PollFormat::Legacy).unwrap();
    assert_ne!(sample.values(), &LEGACY_SAMPLES);
}

#[test]
fn test_compact_frame_is_plain_little_endian() {
    let frame = [0x02, 0x00, 0xFF, 0x7F, 0x10];
    let sample = codec::decode_poll(&frame, PollFormat::Compact).unwrap();
    assert_eq!(sample.values(), &[0x0002, 0x7FFF]);

    // A header-less compact frame is never rotated
    let odd = [0x00, 0x02, 0x00, 0x00, 0x00];
    let sample = codec::decode_poll(&odd, PollFormat::Compact).unwrap();
    assert_eq!(sample.values(), &[0x0200, 0x0000]);
}

#[test]
fn test_decode_simple_covers_response_table() {
    let table = [
        (0xFF, ResponseCode::Error),
        (0x00, ResponseCode::Ack),
        (0x01, ResponseCode::ResetDone),
        (0x02, ResponseCode::PollOk),
        (0x03, ResponseCode::ReleasePilot),
        (0x83, ResponseCode::ReleaseResp),
    ];
    for (byte, code) in table {
        assert_eq!(codec::decode_simple(&[byte]), Ok(code));
    }
    assert_eq!(
        codec::decode_simple(&[0x04]),
        Err(ProtocolError::UnknownResponseCode(0x04))
    );
    assert_eq!(
        codec::decode_simple(&[0x00, 0x00]),
        Err(ProtocolError::FrameLength {
            expected: 1,
            actual: 2
        })
    );
}

#[test]
fn test_protocol_error_display() {
    let err = ProtocolError::UnknownResponseCode(0x42);
    assert_eq!(err.to_string(), "Unknown response code: 0x42");
}
