//! Integration tests for the bus value codec and group addresses: encode and
//! decode round trips, bit-level boundaries, and the preserved legacy quirks.

use knxmux_rs::codec::{decode, encode, BusValue, DataType, GroupAddress, ValueKind};
use knxmux_rs::error::KnxMuxError;
use proptest::prelude::*;

/// Tests that switch values survive an encode/decode round trip.
#[test]
fn test_switch_round_trip() {
    for v in [0i64, 1] {
        let frame = encode(DataType::Switching, &BusValue::Integer(v)).unwrap();
        assert_eq!(frame.length, 1);
        assert_eq!(
            decode(DataType::Switching, &frame.payload).unwrap(),
            BusValue::Integer(v)
        );
    }
}

/// Tests that 16-bit counters round trip at both range ends.
#[test]
fn test_counter16_round_trip() {
    for v in [0i64, 1, 0x1234, 65535] {
        let frame = encode(DataType::Counter16, &BusValue::Integer(v)).unwrap();
        assert_eq!(frame.length, 3);
        assert_eq!(frame.payload[0], 0);
        assert_eq!(
            decode(DataType::Counter16, &frame.payload).unwrap(),
            BusValue::Integer(v)
        );
    }
}

/// Tests that 32-bit counters round trip and use big-endian order.
#[test]
fn test_counter32_round_trip() {
    let frame = encode(DataType::Counter32, &BusValue::Integer(0x0102_0304)).unwrap();
    assert_eq!(frame.length, 5);
    assert_eq!(frame.payload, vec![0x00, 0x01, 0x02, 0x03, 0x04]);
    assert_eq!(
        decode(DataType::Counter32, &frame.payload).unwrap(),
        BusValue::Integer(0x0102_0304)
    );
}

/// Tests that 8-bit counters and characters round trip through their
/// two-byte envelope.
#[test]
fn test_single_byte_tags_round_trip() {
    for tag in [DataType::Scaling, DataType::Character, DataType::Counter8] {
        let frame = encode(tag, &BusValue::Integer(200)).unwrap();
        assert_eq!(frame.length, 2);
        assert_eq!(decode(tag, &frame.payload).unwrap(), BusValue::Integer(200));
    }
}

/// Tests that 32-bit floats round trip exactly.
#[test]
fn test_float_round_trip() {
    for v in [0.0f64, 21.5, -273.15, 1e6] {
        let frame = encode(DataType::FloatValue, &BusValue::Float(v)).unwrap();
        assert_eq!(frame.length, 5);
        let decoded = decode(DataType::FloatValue, &frame.payload).unwrap();
        match decoded {
            BusValue::Float(out) => assert_eq!(out, v as f32 as f64),
            other => panic!("expected float, got {other:?}"),
        }
    }
}

/// Tests the 2-octet float decode against hand-computed fixtures.
#[test]
fn test_small_float_fixtures() {
    // sign 1, exponent 1, mantissa 1025 - 2048 = -1023 -> -20.46
    let v = decode(DataType::Value, &[0x00, 0x8C, 0x01]).unwrap();
    match v {
        BusValue::Float(f) => assert!((f - (-20.46)).abs() < 1e-9),
        other => panic!("expected float, got {other:?}"),
    }

    // sign 0, exponent 0, mantissa 2047 -> 20.47
    let v = decode(DataType::Value, &[0x00, 0x07, 0xFF]).unwrap();
    match v {
        BusValue::Float(f) => assert!((f - 20.47).abs() < 1e-9),
        other => panic!("expected float, got {other:?}"),
    }

    // all zero -> 0.0
    assert_eq!(
        decode(DataType::Value, &[0x00, 0x00, 0x00]).unwrap(),
        BusValue::Float(0.0)
    );
}

/// Tests that time-of-day values round trip from both accepted input forms.
#[test]
fn test_time_round_trip() {
    let seconds = 13 * 3600 + 52 * 60 + 5;
    let from_int = encode(DataType::Time, &BusValue::Integer(seconds)).unwrap();
    let from_text = encode(DataType::Time, &BusValue::Text("13:52:05".into())).unwrap();
    assert_eq!(from_int, from_text);
    assert_eq!(
        decode(DataType::Time, &from_int.payload).unwrap(),
        BusValue::Integer(seconds)
    );
}

/// Tests that dates round trip through the day/month/year byte layout.
#[test]
fn test_date_round_trip() {
    let frame = encode(DataType::Date, &BusValue::Text("2010/06/15".into())).unwrap();
    assert_eq!(frame.length, 4);
    assert_eq!(frame.payload, vec![0, 15, 6, 10]);

    // 2010-06-15 00:00:00 UTC
    assert_eq!(
        decode(DataType::Date, &frame.payload).unwrap(),
        BusValue::Integer(1_276_560_000)
    );

    // Years before 2000 are stored as an offset of 90-99.
    let frame = encode(DataType::Date, &BusValue::Text("1995/01/02".into())).unwrap();
    assert_eq!(frame.payload, vec![0, 2, 1, 95]);
}

/// Tests that date encoding accepts epoch seconds as input.
#[test]
fn test_date_encode_from_epoch() {
    let frame = encode(DataType::Date, &BusValue::Integer(1_276_560_000)).unwrap();
    assert_eq!(frame.payload, vec![0, 15, 6, 10]);
}

/// Tests that text values round trip and drop the marker byte on decode.
#[test]
fn test_text_round_trip() {
    let frame = encode(DataType::Text, &BusValue::Text("hello".into())).unwrap();
    assert_eq!(frame.length, 5);
    assert_eq!(frame.payload, b"hello");

    // Decoded payloads carry the marker byte at index 0.
    assert_eq!(
        decode(DataType::Text, &[0, b'h', b'e', b'l', b'l', b'o']).unwrap(),
        BusValue::Text("hello".into())
    );
}

/// Pins the legacy access composite: hex of byte 4 followed by six decimal
/// nibbles, with byte 3's high nibble appearing twice.
#[test]
fn test_access_composite_regression() {
    assert_eq!(
        decode(DataType::Access, &[0x00, 0x12, 0x34, 0x56, 0x78]).unwrap(),
        BusValue::Text("78145856".into())
    );
    // Nibbles of 10 and above render as two decimal digits.
    assert_eq!(
        decode(DataType::Access, &[0x00, 0xF0, 0x0A, 0xBC, 0xDE]).unwrap(),
        BusValue::Text("de151011141112".into())
    );
}

/// Pins the value-kind table, including the numeric-but-text character tag.
#[test]
fn test_value_kind_table() {
    let numbers = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 14];
    for tag in numbers {
        assert_eq!(
            DataType::try_from(tag).unwrap().value_kind(),
            ValueKind::Number,
            "tag {tag}"
        );
    }
    for tag in [12u8, 13, 15] {
        assert_eq!(
            DataType::try_from(tag).unwrap().value_kind(),
            ValueKind::Text,
            "tag {tag}"
        );
    }
}

/// Tests that a group address built from components, packed, and
/// re-decomposed renders the same textual form.
#[test]
fn test_group_address_round_trip() {
    let addr: GroupAddress = "3/2/18".parse().unwrap();
    assert_eq!(addr.raw(), 3 * 2048 + 2 * 256 + 18);
    let back = GroupAddress::from_raw(addr.raw());
    assert_eq!(back.to_string(), "3/2/18");
}

/// Tests that encoding refuses a value of the wrong shape for the tag.
#[test]
fn test_encode_type_mismatch() {
    assert!(matches!(
        encode(DataType::Counter16, &BusValue::Text("12".into())),
        Err(KnxMuxError::InvalidValue(_))
    ));
    assert!(matches!(
        encode(DataType::Text, &BusValue::Integer(7)),
        Err(KnxMuxError::InvalidValue(_))
    ));
}

proptest! {
    /// Any 16-bit counter value survives the round trip.
    #[test]
    fn prop_counter16_round_trip(v in 0u16..=u16::MAX) {
        let frame = encode(DataType::Counter16, &BusValue::Integer(v as i64)).unwrap();
        prop_assert_eq!(
            decode(DataType::Counter16, &frame.payload).unwrap(),
            BusValue::Integer(v as i64)
        );
    }

    /// Any in-range component triple survives packing and decomposition.
    #[test]
    fn prop_group_address_round_trip(main in 0u8..=15, sub in 0u8..=7, group in 0u8..=255) {
        let addr = GroupAddress::new(main, sub, group).unwrap();
        prop_assert_eq!(addr.main(), main);
        prop_assert_eq!(addr.sub(), sub);
        prop_assert_eq!(addr.group(), group);
    }
}
