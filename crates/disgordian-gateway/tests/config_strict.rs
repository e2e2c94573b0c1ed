#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use disgordian_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  url: "wss://gateway.discord.gg"
identity:
  token: "abc"
  shards: [0, 1] # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
gateway:
  url: "wss://gateway.discord.gg"
identity:
  token: "abc"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.protocol_version, 5);
    assert_eq!(cfg.gateway.outbound_capacity, 64);
    assert_eq!(cfg.identity.large_threshold, 250);
    assert_eq!(cfg.identity.shard, [0, 1]);
    assert_eq!(cfg.identity.browser, "disgordian");
    assert!(!cfg.identity.compress);
}

#[test]
fn connect_url_appends_version_query() {
    let cfg = config::load_from_str(
        r#"
version: 1
gateway:
  url: "wss://gateway.discord.gg"
  protocol_version: 6
identity:
  token: "abc"
"#,
    )
    .unwrap();
    assert_eq!(
        cfg.gateway.connect_url(),
        "wss://gateway.discord.gg?v=6&encoding=json"
    );
}

#[test]
fn connect_url_keeps_existing_query() {
    let cfg = config::load_from_str(
        r#"
version: 1
gateway:
  url: "ws://127.0.0.1:9000/gw?region=eu"
identity:
  token: "abc"
"#,
    )
    .unwrap();
    assert_eq!(
        cfg.gateway.connect_url(),
        "ws://127.0.0.1:9000/gw?region=eu&v=5&encoding=json"
    );
}

#[test]
fn rejects_bad_values() {
    let cases = [
        // wrong scheme
        r#"
version: 1
gateway: { url: "https://discord.com" }
identity: { token: "abc" }
"#,
        // empty token
        r#"
version: 1
gateway: { url: "wss://gw" }
identity: { token: "  " }
"#,
        // shard index out of range
        r#"
version: 1
gateway: { url: "wss://gw" }
identity: { token: "abc", shard: [1, 1] }
"#,
        // threshold out of range
        r#"
version: 1
gateway: { url: "wss://gw" }
identity: { token: "abc", large_threshold: 10 }
"#,
        // compression unsupported
        r#"
version: 1
gateway: { url: "wss://gw" }
identity: { token: "abc", compress: true }
"#,
        // unsupported version
        r#"
version: 2
gateway: { url: "wss://gw" }
identity: { token: "abc" }
"#,
    ];

    for case in cases {
        let err = config::load_from_str(case).expect_err(case);
        assert_eq!(err.class().as_str(), "CONFIG", "{case}");
    }
}

#[test]
fn sample_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../disgordian.yaml");
    let cfg = config::load_from_file(path).unwrap();
    assert_eq!(cfg.gateway.connect_url(), "wss://gateway.discord.gg?v=5&encoding=json");
}
