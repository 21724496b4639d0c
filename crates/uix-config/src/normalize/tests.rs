use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

use super::*;
use crate::types::RawConfig;

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

fn run(value: Value) -> ConfigDocument {
    normalize(RawConfig::from_value(value), &Prior::default(), &mut rng())
}

fn assert_valid(doc: &ConfigDocument) {
    assert!(is_valid_port(doc.bridge.port), "port {}", doc.bridge.port);
    assert!(is_valid_username(&doc.bridge.username), "username {}", doc.bridge.username);
    assert!(is_valid_pin(&doc.bridge.pin), "pin {}", doc.bridge.pin);
    assert!(!doc.bridge.name.is_empty());
}

#[test]
fn test_missing_bridge_is_rebuilt() {
    let doc = run(json!({}));
    assert_valid(&doc);
    assert!(doc.accessories.is_empty());
    assert!(doc.platforms.is_empty());
}

#[test]
fn test_non_object_bridge_is_replaced() {
    let doc = run(json!({"bridge": [1, 2]}));
    assert_valid(&doc);
    assert!(doc.bridge.extra.is_empty());
}

#[test]
fn test_non_object_document_is_repaired() {
    let doc = run(json!("not a config"));
    assert_valid(&doc);
}

#[test]
fn test_numeric_string_port_is_parsed() {
    let doc = run(json!({"bridge": {"port": "51826"}}));
    assert_eq!(doc.bridge.port, 51826);

    let doc = run(json!({"bridge": {"port": " 8581 "}}));
    assert_eq!(doc.bridge.port, 8581);
}

#[test]
fn test_invalid_port_gets_fallback_range() {
    for port in [json!("abc"), json!(80), json!(65534), json!(-1), json!(null), json!(51826.5)] {
        let doc = run(json!({"bridge": {"port": port}}));
        assert!(
            (FALLBACK_PORT_MIN..=FALLBACK_PORT_MAX).contains(&doc.bridge.port),
            "port {port} became {}",
            doc.bridge.port
        );
    }
}

#[test]
fn test_integral_float_port_is_kept() {
    let doc = run(json!({"bridge": {"port": 51826.0}}));
    assert_eq!(doc.bridge.port, 51826);

    assert_eq!(coerce_port(Some(&json!(8581.0))), Some(8581));
    assert_eq!(coerce_port(Some(&json!(8581.25))), None);
}

#[test]
fn test_port_bounds_are_inclusive() {
    assert_eq!(run(json!({"bridge": {"port": 1025}})).bridge.port, 1025);
    assert_eq!(run(json!({"bridge": {"port": 65533}})).bridge.port, 65533);
}

#[test]
fn test_valid_username_is_kept_in_any_case() {
    let doc = run(json!({"bridge": {"username": "cc:22:3d:e3:ce:30"}}));
    assert_eq!(doc.bridge.username, "cc:22:3d:e3:ce:30");
}

#[test]
fn test_absent_username_is_generated_even_with_prior() {
    let prior = Prior {
        username: Some("CC:22:3D:E3:CE:30"),
        pin: None,
    };
    let doc = normalize(RawConfig::from_value(json!({"bridge": {}})), &prior, &mut rng());
    assert!(doc.bridge.username.starts_with("0E:"));
}

#[test]
fn test_malformed_username_reuses_valid_prior() {
    let prior = Prior {
        username: Some("CC:22:3D:E3:CE:30"),
        pin: Some("031-45-154"),
    };
    let raw = RawConfig::from_value(json!({
        "bridge": {"username": "CC:22:3D", "pin": "1234"}
    }));
    let doc = normalize(raw, &prior, &mut rng());
    assert_eq!(doc.bridge.username, "CC:22:3D:E3:CE:30");
    assert_eq!(doc.bridge.pin, "031-45-154");
}

#[test]
fn test_malformed_username_with_invalid_prior_is_generated() {
    let prior = Prior {
        username: Some("garbage"),
        pin: Some("12345678"),
    };
    let raw = RawConfig::from_value(json!({
        "bridge": {"username": 42, "pin": "03145154"}
    }));
    let doc = normalize(raw, &prior, &mut rng());
    assert!(doc.bridge.username.starts_with("0E:"));
    assert_valid(&doc);
}

#[test]
fn test_name_derived_from_username() {
    let doc = run(json!({"bridge": {"username": "0E:AA:BB:CC:12:34"}}));
    assert_eq!(doc.bridge.name, "Homebridge 1234");

    let doc = run(json!({"bridge": {"username": "0E:AA:BB:CC:12:34", "name": ""}}));
    assert_eq!(doc.bridge.name, "Homebridge 1234");

    let doc = run(json!({"bridge": {"username": "0E:AA:BB:CC:12:34", "name": 7}}));
    assert_eq!(doc.bridge.name, "Homebridge 1234");
}

#[test]
fn test_name_is_kept() {
    let doc = run(json!({"bridge": {"name": "Living Room"}}));
    assert_eq!(doc.bridge.name, "Living Room");
}

#[test]
fn test_unknown_bridge_keys_survive() {
    let doc = run(json!({"bridge": {"bind": ["eth0"], "port": 51826}}));
    assert_eq!(doc.bridge.extra["bind"], json!(["eth0"]));
    assert!(!doc.bridge.extra.contains_key("port"));
}

#[test]
fn test_block_arrays_are_coerced() {
    let doc = run(json!({
        "accessories": "nope",
        "platforms": [{"platform": "config"}, 3, [1]],
    }));
    assert!(doc.accessories.is_empty());
    assert_eq!(doc.platforms.len(), 1);
    assert_eq!(doc.platforms[0]["platform"], json!("config"));
}

#[test]
fn test_plugins_dropped_when_empty_or_not_array() {
    assert!(run(json!({"plugins": []})).plugins.is_none());
    assert!(run(json!({"plugins": "homebridge-foo"})).plugins.is_none());
    assert_eq!(
        run(json!({"plugins": ["homebridge-foo"]})).plugins,
        Some(vec!["homebridge-foo".to_owned()])
    );
}

#[test]
fn test_mdns_dropped_when_not_object() {
    assert!(run(json!({"mdns": "ciao"})).mdns.is_none());
    let doc = run(json!({"mdns": {"interface": "192.168.1.10"}}));
    assert_eq!(doc.mdns.unwrap()["interface"], json!("192.168.1.10"));
}

#[test]
fn test_disabled_plugins_dropped_when_not_array() {
    assert!(run(json!({"disabledPlugins": {"a": 1}})).disabled_plugins.is_none());
    assert_eq!(run(json!({"disabledPlugins": []})).disabled_plugins, Some(vec![]));
}

#[test]
fn test_unknown_top_level_keys_survive() {
    let doc = run(json!({"ports": {"start": 52100, "end": 52150}}));
    assert_eq!(doc.extra["ports"]["start"], json!(52100));
}

#[test]
fn test_abc_port_scenario() {
    let doc = run(json!({"bridge": {"port": "abc"}}));
    assert!((51000..=52000).contains(&doc.bridge.port));
    assert!(doc.bridge.username.starts_with("0E:"));
    assert!(is_valid_username(&doc.bridge.username));
    assert!(is_valid_pin(&doc.bridge.pin));
    assert!(doc.accessories.is_empty());
    assert!(doc.platforms.is_empty());
}

#[test]
fn test_normalize_is_idempotent() {
    let inputs = [
        json!({}),
        json!({"bridge": {"port": "abc", "username": "x"}, "plugins": []}),
        json!({"bridge": {"name": "Hub", "port": 51826}, "accessories": [{"accessory": "A"}]}),
        json!({"mdns": 1, "disabledPlugins": ["a"], "platforms": {}}),
    ];

    for input in inputs {
        let once = run(input);
        let raw = RawConfig::from(once.clone());
        // A different seed proves nothing is regenerated the second time.
        let twice = normalize(raw, &Prior::default(), &mut StdRng::seed_from_u64(99));
        assert_eq!(once, twice);
    }
}

#[test]
fn test_generated_username_shape() {
    let mut rng = rng();
    for _ in 0..200 {
        let username = generate_username(&mut rng);
        assert_eq!(username.len(), 17);
        assert!(username.starts_with("0E:"));
        assert!(is_valid_username(&username));
        assert_eq!(username, username.to_uppercase());
    }
}

#[test]
fn test_generated_pin_shape_and_range() {
    let mut rng = rng();
    for _ in 0..200 {
        let pin = generate_pin(&mut rng);
        assert!(is_valid_pin(&pin), "pin {pin}");
        let digits: u32 = pin.replace('-', "").parse().unwrap();
        assert!((10_000_000..=89_999_999).contains(&digits));
    }
}

#[test]
fn test_successive_generations_differ() {
    let mut rng = rand::thread_rng();
    assert_ne!(generate_username(&mut rng), generate_username(&mut rng));
    assert_ne!(generate_pin(&mut rng), generate_pin(&mut rng));
}

#[test]
fn test_patterns() {
    assert!(is_valid_username("0E:1A:2B:3C:4D:5F"));
    assert!(!is_valid_username("0E:1A:2B:3C:4D"));
    assert!(!is_valid_username("0E-1A-2B-3C-4D-5F"));
    assert!(!is_valid_username(" 0E:1A:2B:3C:4D:5F"));
    assert!(is_valid_pin("031-45-154"));
    assert!(!is_valid_pin("03145154"));
    assert!(!is_valid_pin("031-45-15a"));
}

#[test]
fn test_default_bridge_name_short_username() {
    assert_eq!(default_bridge_name("AB"), "Homebridge AB");
}
