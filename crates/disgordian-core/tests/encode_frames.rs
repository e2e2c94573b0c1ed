//! Outbound frame encoding.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use disgordian_core::protocol::payload::{ClientProperties, Identify};
use disgordian_core::protocol::{encode, heartbeat, Opcode};

#[test]
fn heartbeat_carries_sequence() {
    assert_eq!(heartbeat(Some(1)).unwrap(), r#"{"op":1,"d":1}"#);
    assert_eq!(heartbeat(Some(41)).unwrap(), r#"{"op":1,"d":41}"#);
}

#[test]
fn heartbeat_before_any_sequence_is_null() {
    assert_eq!(heartbeat(None).unwrap(), r#"{"op":1,"d":null}"#);
}

#[test]
fn identify_shape() {
    let identify = Identify {
        token: "secret".into(),
        properties: ClientProperties {
            os: "linux".into(),
            browser: "disgordian".into(),
            device: "disgordian".into(),
            referrer: String::new(),
            referring_domain: String::new(),
        },
        compress: false,
        large_threshold: 250,
        shard: [0, 1],
    };
    let s = encode(Opcode::Identify, &identify).unwrap();
    let v: serde_json::Value = serde_json::from_str(&s).unwrap();

    assert_eq!(v["op"], 2);
    assert_eq!(v["d"]["token"], "secret");
    assert_eq!(v["d"]["properties"]["$os"], "linux");
    assert_eq!(v["d"]["properties"]["$referring_domain"], "");
    assert_eq!(v["d"]["compress"], false);
    assert_eq!(v["d"]["large_threshold"], 250);
    assert_eq!(v["d"]["shard"], serde_json::json!([0, 1]));
    assert!(s.starts_with(r#"{"op":2,"#));
}
