//! Setup reply decoding

mod common;

use common::*;
use x11blit::protocol::*;
use x11blit::Error;

fn header(wire: &[u8]) -> SetupHeader {
    SetupHeader::parse(wire[..8].try_into().unwrap())
}

#[test]
fn test_parse_setup_success() {
    let mut setup = setup();
    setup.vendor = "The X.Org Foundation".to_string();
    setup.pixmap_formats.insert(
        0,
        Format {
            depth: 1,
            bits_per_pixel: 1,
            scanline_pad: 32,
        },
    );
    let wire = encode_setup(&setup);
    assert_eq!(wire.len() % 4, 0);

    let header = header(&wire);
    assert_eq!(header.status, SetupStatus::Success as u8);
    assert_eq!(header.data_len(), wire.len() - 8);

    let parsed = SetupSuccess::parse(&header, &wire[8..]).unwrap();
    assert_eq!(parsed, setup);
    assert_eq!(parsed.roots[0].root, Window::new(ROOT));
    assert_eq!(parsed.roots[0].root_depth, 24);
}

#[test]
fn test_truncated_setup_is_malformed() {
    let wire = encode_setup(&setup());
    let header = header(&wire);
    let truncated = &wire[8..wire.len() - 10];

    match SetupSuccess::parse(&header, truncated) {
        Err(Error::MalformedResponse { what, .. }) => assert_eq!(what, "setup visuals"),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[test]
fn test_failed_reason() {
    let wire = encode_setup_refusal(SetupStatus::Failed, "No protocol specified\n");
    let header = header(&wire);
    assert_eq!(header.data_len(), 24);
    assert_eq!(parse_setup_reason(&header, &wire[8..]), "No protocol specified\n");
}

#[test]
fn test_authenticate_reason_trims_padding() {
    let wire = encode_setup_refusal(SetupStatus::Authenticate, "cookie");
    let header = header(&wire);
    assert_eq!(parse_setup_reason(&header, &wire[8..]), "cookie");
}
