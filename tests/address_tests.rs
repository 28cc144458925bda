use ww_invoke::address::{AddressError, PeerId, ProcessId, ProtocolAddress, resolve, resolve_str};
use ww_invoke::constants::SERVICE_NAMESPACE;

#[test]
fn test_resolve_textual_form() {
    let address = resolve_str("A", "42").unwrap();
    assert_eq!(address.to_string(), "/peer/A/ww-invoke/pid/42");
    assert_eq!(address.namespace(), SERVICE_NAMESPACE);
    assert_eq!(address.protocol_id(), address.to_string());
}

#[test]
fn test_resolve_then_split_recovers_pair() {
    let pairs = [
        ("A", "42"),
        ("QmYyQSo1c1Ym7orWxLYvCrM2EmxFTANf8wXmmE7DWjhx5N", "7"),
        ("peer-with.dots_and-dashes", "proc.main"),
        ("12D3KooWGz", "0"),
    ];

    for (peer_text, pid_text) in pairs {
        let peer = PeerId::parse(peer_text).unwrap();
        let pid = ProcessId::parse(pid_text).unwrap();

        let address = resolve(&peer, &pid);
        let (split_peer, split_pid) = address.split();

        assert_eq!(split_peer, peer);
        assert_eq!(split_pid, pid);

        // The textual form parses back into the same address.
        let reparsed: ProtocolAddress = address.to_string().parse().unwrap();
        assert_eq!(reparsed, address);
    }
}

#[test]
fn test_invalid_peer_id_fails_fast() {
    for text in ["", "has/slash", "has space", "ünïcode"] {
        let result = resolve_str(text, "42");
        assert!(
            matches!(result, Err(AddressError::InvalidPeerId(_))),
            "expected InvalidPeerId for {text:?}, got {result:?}"
        );
    }
}

#[test]
fn test_invalid_pid_fails_fast() {
    for text in ["", "a/b", "tab\there"] {
        let result = resolve_str("A", text);
        assert!(
            matches!(result, Err(AddressError::InvalidPid(_))),
            "expected InvalidPid for {text:?}, got {result:?}"
        );
    }
}

#[test]
fn test_overlong_identifier_rejected() {
    let long = "x".repeat(129);
    assert!(PeerId::parse(&long).is_err());
    assert!(PeerId::parse(&long[..128]).is_ok());
}

#[test]
fn test_malformed_address_text() {
    let cases = [
        "peer/A/ww-invoke/pid/42",
        "/peer/A/other-service/pid/42",
        "/node/A/ww-invoke/pid/42",
        "/peer/A/ww-invoke/proc/42",
        "/peer/A/ww-invoke/pid/42/extra",
        "/peer/A/ww-invoke/pid",
    ];

    for text in cases {
        let result = text.parse::<ProtocolAddress>();
        assert!(
            matches!(result, Err(AddressError::MalformedAddress(_))),
            "expected MalformedAddress for {text:?}, got {result:?}"
        );
    }

    // Well-shaped but carrying a bad identifier reports the identifier.
    assert!(matches!(
        "/peer//ww-invoke/pid/42".parse::<ProtocolAddress>(),
        Err(AddressError::InvalidPeerId(_))
    ));
}

#[test]
fn test_address_equality_is_segment_wise() {
    let a = resolve_str("A", "42").unwrap();
    let b = resolve_str("A", "42").unwrap();
    let c = resolve_str("A", "43").unwrap();
    let d = resolve_str("B", "42").unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
}
