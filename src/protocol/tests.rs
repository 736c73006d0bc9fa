use super::*;
use crate::utils::error::Error;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn roundtrip(packet: Packet) {
    let bytes = packet.encode().unwrap();
    assert_eq!(Packet::decode(&bytes).unwrap(), Some(packet));
}

#[test]
fn test_publish_encoding_matches_reference_bytes() {
    let plain = Packet::publish("temperature", "45", false).encode().unwrap();
    assert_eq!(hex(&plain), "300f000b74656d70657261747572653435");

    let retained = Packet::publish("temperature", "45", true).encode().unwrap();
    assert_eq!(hex(&retained), "310f000b74656d70657261747572653435");
    assert_eq!(plain[1..], retained[1..]);
}

#[test]
fn test_subscribe_encoding_matches_reference_bytes() {
    let bytes = Packet::subscribe("temper", 1).encode().unwrap();
    assert_eq!(hex(&bytes), "820b0001000674656d70657200");
    assert_eq!(bytes[bytes.len() - 1], REQUESTED_QOS);

    let suback = Packet::suback(1).encode().unwrap();
    assert_eq!(suback[suback.len() - 1], GRANTED_QOS);
}

#[test]
fn test_connect_encoding_matches_reference_bytes() {
    let bytes = Packet::connect("mosq-6F4yNCdkrVx80t8BVp").encode().unwrap();
    assert_eq!(
        hex(&bytes),
        "102300044d5154540402003c00176d6f73712d364634794e43646b72567838307438425670"
    );
}

#[test]
fn test_fixed_packets() {
    assert_eq!(hex(&Packet::ConnAck.encode().unwrap()), "20020000");
    assert_eq!(hex(&Packet::suback(1).encode().unwrap()), "9003000100");
    assert_eq!(hex(&Packet::Disconnect.encode().unwrap()), "e000");
}

#[test]
fn test_roundtrip_every_kind() {
    roundtrip(Packet::connect("pub 001"));
    roundtrip(Packet::ConnAck);
    roundtrip(Packet::publish("temper", "24", false));
    roundtrip(Packet::publish("temper", "24", true));
    roundtrip(Packet::subscribe("temperdefqdfqdffdq", 123));
    roundtrip(Packet::suback(u16::MAX));
    roundtrip(Packet::Disconnect);
}

#[test]
fn test_roundtrip_empty_topic_and_value() {
    roundtrip(Packet::publish("", "", false));
    roundtrip(Packet::publish("", "value", true));
    roundtrip(Packet::publish("topic", "", false));
    roundtrip(Packet::subscribe("", 7));
    roundtrip(Packet::connect(""));
}

#[test]
fn test_publish_at_remaining_length_ceiling() {
    let topic = "t".repeat(100);
    let value = "v".repeat(MAX_REMAINING_LENGTH - 2 - topic.len());
    let bytes = Packet::publish(topic.clone(), value.clone(), true)
        .encode()
        .unwrap();
    assert_eq!(bytes[1], 0xff);
    assert_eq!(bytes.len(), 2 + MAX_REMAINING_LENGTH);
    roundtrip(Packet::publish(topic, value, true));
}

#[test]
fn test_encode_rejects_oversized_packets() {
    let value = "v".repeat(MAX_REMAINING_LENGTH - 2 - 1 + 1);
    match Packet::publish("t", value, false).encode() {
        Err(Error::PayloadTooLarge { remaining_length }) => assert_eq!(remaining_length, 256),
        other => panic!("expected PayloadTooLarge, got {other:?}"),
    }

    let topic = "t".repeat(251);
    assert!(matches!(
        Packet::subscribe(topic, 1).encode(),
        Err(Error::PayloadTooLarge { .. })
    ));

    let client_id = "c".repeat(244);
    assert!(matches!(
        Packet::connect(client_id).encode(),
        Err(Error::PayloadTooLarge { .. })
    ));
    assert!(Packet::connect("c".repeat(243)).encode().is_ok());
}

#[test]
fn test_encode_rejects_non_ascii_text() {
    assert!(matches!(
        Packet::publish("température", "45", false).encode(),
        Err(Error::MalformedPacket(_))
    ));
    assert!(matches!(
        Packet::publish("temperature", "45°", false).encode(),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn test_decode_empty_buffer_is_no_packet() {
    assert_eq!(Packet::decode(&[]).unwrap(), None);
}

#[test]
fn test_decode_header() {
    let header = decode_header(&[0x31, 0x0f]).unwrap();
    assert_eq!(header.kind, PacketKind::Publish);
    assert_eq!(header.flags, 0x01);
    assert_eq!(header.remaining_length, 15);
    assert_eq!(header.packet_len(), 17);

    assert_eq!(
        decode_header(&[0xc0, 0x00]).unwrap().kind,
        PacketKind::Other(0xc0)
    );
    assert!(matches!(
        decode_header(&[0x30]),
        Err(Error::TruncatedPacket {
            needed: 2,
            available: 1
        })
    ));
}

#[test]
fn test_decode_truncated_body() {
    let bytes = Packet::publish("temperature", "45", false).encode().unwrap();
    assert!(matches!(
        Packet::decode(&bytes[..10]),
        Err(Error::TruncatedPacket {
            needed: 17,
            available: 10
        })
    ));
}

#[test]
fn test_decode_topic_length_past_body() {
    // remaining length 4, topic length claims 10
    let bytes = [0x30, 0x04, 0x00, 0x0a, b'a', b'b'];
    assert!(matches!(
        Packet::decode(&bytes),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn test_decode_subscribe_missing_qos() {
    let bytes = [0x82, 0x05, 0x00, 0x01, 0x00, 0x01, b'a'];
    assert!(matches!(
        Packet::decode(&bytes),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn test_decode_rejects_non_ascii() {
    let bytes = [0x30, 0x05, 0x00, 0x01, b'a', 0xc3, 0xa9];
    assert!(matches!(
        Packet::decode(&bytes),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn test_decode_rejects_foreign_protocol_name() {
    let mut bytes = Packet::connect("id").encode().unwrap().to_vec();
    bytes[4..8].copy_from_slice(b"MQIs");
    assert!(matches!(
        Packet::decode(&bytes),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn test_decode_unsupported_kind() {
    // PINGREQ is outside the subset
    assert!(matches!(
        Packet::decode(&[0xc0, 0x00]),
        Err(Error::UnsupportedPacket(0xc0))
    ));
    // PUBLISH at QoS 1
    assert!(matches!(
        Packet::decode(&[0x32, 0x00]),
        Err(Error::UnsupportedPacket(0x32))
    ));
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let mut bytes = Packet::Disconnect.encode().unwrap().to_vec();
    bytes.extend_from_slice(&[0x30, 0x00]);
    assert_eq!(Packet::decode(&bytes).unwrap(), Some(Packet::Disconnect));
}

#[test]
fn test_packet_kind_display() {
    assert_eq!(Packet::ConnAck.kind().to_string(), "CONNACK");
    assert_eq!(PacketKind::Other(0xc0).to_string(), "0xc0");
}
