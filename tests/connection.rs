//! Handshake and request tests against a fake server

mod common;

use byteorder::{ByteOrder, LittleEndian};
use common::*;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::thread;
use x11blit::protocol::*;
use x11blit::{
    colors, Connection, ConnectionConfig, Credentials, Error, Framebuffer, GcValues,
    WindowAttributes,
};

fn refuse(status: SetupStatus, reason: &'static str) -> Error {
    init_logging();
    let (client, mut server) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || {
        read_setup_request(&mut server);
        server
            .write_all(&encode_setup_refusal(status, reason))
            .unwrap();
    });
    let err = Connection::from_stream(client, &ConnectionConfig::default()).unwrap_err();
    server_thread.join().unwrap();
    err
}

#[test]
fn test_handshake_reads_root_screen() {
    let (conn, _server) = connect();
    assert_eq!(conn.root_window(), Window::new(ROOT));
    assert_eq!(conn.root_visual(), VisualID::new(VISUAL));
    assert_eq!(conn.root_depth(), 24);
    assert_eq!((conn.screen_width(), conn.screen_height()), (1920, 1080));
    assert_eq!(conn.white_pixel(), 0x00FF_FFFF);
    assert_eq!(conn.setup().vendor, "Fake Server");
    assert_eq!(conn.max_request_units(), 0xFFFF);
}

#[test]
fn test_handshake_sends_credentials() {
    init_logging();
    let (client, mut server) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || {
        let received = read_setup_request(&mut server);
        server.write_all(&encode_setup(&setup())).unwrap();
        received
    });

    let config = ConnectionConfig::default()
        .with_credentials(Credentials::new("MIT-MAGIC-COOKIE-1", vec![7; 16]));
    let _conn = Connection::from_stream(client, &config).unwrap();
    let received = server_thread.join().unwrap();

    assert_eq!(received.header[0], b'l');
    assert_eq!(LittleEndian::read_u16(&received.header[2..4]), 11);
    assert_eq!(received.auth_name, b"MIT-MAGIC-COOKIE-1");
    assert_eq!(received.auth_data, vec![7; 16]);
}

#[test]
fn test_handshake_selects_screen() {
    let mut setup = setup();
    setup.roots.push(screen(800, 600));
    let config = ConnectionConfig::default().with_display(":0.1");
    let (conn, _server) = connect_with(setup, &config);
    assert_eq!(conn.screen_width(), 800);
}

#[test]
fn test_missing_screen_is_rejected() {
    init_logging();
    let (client, mut server) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || {
        read_setup_request(&mut server);
        server.write_all(&encode_setup(&setup())).unwrap();
    });
    let config = ConnectionConfig::default().with_display(":0.3");
    let result = Connection::from_stream(client, &config);
    server_thread.join().unwrap();
    assert!(matches!(result, Err(Error::InvalidDisplay(_))));
}

#[test]
fn test_rejected_connection_carries_reason() {
    match refuse(SetupStatus::Failed, "Protocol version mismatch") {
        Error::ConnectionRejected(reason) => assert_eq!(reason, "Protocol version mismatch"),
        other => panic!("expected ConnectionRejected, got {:?}", other),
    }
}

#[test]
fn test_authenticate_is_distinct() {
    assert!(matches!(
        refuse(SetupStatus::Authenticate, "need cookie"),
        Error::AuthenticationRequired(_)
    ));
}

#[test]
fn test_server_hangup_during_handshake() {
    init_logging();
    let (client, mut server) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || {
        read_setup_request(&mut server);
        server.write_all(&[1, 0, 11, 0]).unwrap();
    });
    let result = Connection::from_stream(client, &ConnectionConfig::default());
    server_thread.join().unwrap();
    assert!(matches!(result, Err(Error::Closed)));
}

#[test]
fn test_window_lifecycle_requests() {
    let (mut conn, mut server) = connect();

    let window = conn
        .create_window(10, 20, 320, 240, &WindowAttributes::default())
        .unwrap();
    let gc = conn
        .create_gc(window.into(), &GcValues::foreground(colors::RED.to_pixel()))
        .unwrap();
    conn.map_window(window).unwrap();
    conn.change_gc(gc, &GcValues::foreground(colors::BLUE.to_pixel()))
        .unwrap();
    conn.fill_rectangles(window.into(), gc, &[Rectangle::new(0, 0, 5, 5)])
        .unwrap();
    conn.free_gc(gc).unwrap();
    conn.unmap_window(window).unwrap();
    conn.destroy_window(window).unwrap();

    let window_id = window.id().get();
    assert_eq!(window_id & !ID_MASK, ID_BASE);

    let create = read_request(&mut server);
    assert_eq!(create[0], RequestOpcode::CreateWindow as u8);
    assert_eq!(create[1], 24);
    assert_eq!(LittleEndian::read_u32(&create[4..8]), window_id);
    assert_eq!(LittleEndian::read_u32(&create[8..12]), ROOT);
    assert_eq!(LittleEndian::read_u32(&create[24..28]), VISUAL);
    assert_eq!(
        LittleEndian::read_u32(&create[28..32]),
        cw::BACK_PIXEL | cw::EVENT_MASK
    );

    let create_gc = read_request(&mut server);
    assert_eq!(create_gc[0], RequestOpcode::CreateGC as u8);
    assert_eq!(LittleEndian::read_u32(&create_gc[4..8]), gc.id().get());
    assert_eq!(LittleEndian::read_u32(&create_gc[16..20]), 0x00FF_0000);

    let map = read_request(&mut server);
    assert_eq!(map, {
        let mut expected = vec![8, 0, 2, 0];
        expected.extend_from_slice(&window_id.to_le_bytes());
        expected
    });

    let change_gc = read_request(&mut server);
    assert_eq!(change_gc[0], RequestOpcode::ChangeGC as u8);
    assert_eq!(LittleEndian::read_u32(&change_gc[12..16]), 0x0000_00FF);

    let fill = read_request(&mut server);
    assert_eq!(fill[0], RequestOpcode::PolyFillRectangle as u8);
    assert_eq!(fill.len(), 20);

    for opcode in [RequestOpcode::FreeGC, RequestOpcode::UnmapWindow, RequestOpcode::DestroyWindow] {
        let request = read_request(&mut server);
        assert_eq!(request[0], opcode as u8);
        assert_eq!(request.len(), 8);
    }
    assert_eq!(conn.last_sequence(), 8);
}

#[test]
fn test_put_framebuffer_is_split_into_strips() {
    let (mut conn, mut server) = connect();
    let window = conn
        .create_window(0, 0, 1920, 1080, &WindowAttributes::default())
        .unwrap();
    let gc = conn.create_gc(window.into(), &GcValues::default()).unwrap();

    let mut fb = Framebuffer::new(1920, 1080);
    fb.fill_rect(0, 500, 1920, 100, colors::GREEN);
    fb.draw_line(0, 0, 1919, 1079, colors::WHITE);

    // The server side has to drain while the client writes ~8 MB
    let reader = thread::spawn(move || {
        read_request(&mut server);
        read_request(&mut server);
        let mut strips = Vec::new();
        let mut rows = 0;
        while rows < 1080 {
            let strip = read_request(&mut server);
            rows += LittleEndian::read_u16(&strip[14..16]) as usize;
            strips.push(strip);
        }
        strips
    });

    conn.put_framebuffer(window.into(), gc, &fb, 0, 0).unwrap();
    let strips = reader.join().unwrap();

    assert!(strips.len() > 1);
    let mut next_y = 0i16;
    let mut pixels = Vec::new();
    for strip in &strips {
        assert_eq!(strip[0], RequestOpcode::PutImage as u8);
        assert_eq!(strip[1], ImageFormat::ZPixmap as u8);
        assert!(strip.len() <= 0xFFFF * 4);
        assert_eq!(LittleEndian::read_u16(&strip[12..14]), 1920);
        assert_eq!(LittleEndian::read_i16(&strip[18..20]), next_y);
        assert_eq!(strip[21], 24);
        let height = LittleEndian::read_u16(&strip[14..16]);
        next_y += height as i16;
        pixels.extend_from_slice(&strip[24..24 + height as usize * 1920 * 4]);
    }
    assert_eq!(next_y, 1080);
    assert_eq!(pixels, fb.as_bytes());
}

#[test]
fn test_small_request_limit_shrinks_strips() {
    let mut setup = setup();
    setup.maximum_request_length = 1000;
    let (mut conn, mut server) = connect_with(setup, &ConnectionConfig::default());
    let window = x11blit::Window::new(ID_BASE | 1);
    let gc = x11blit::GContext::new(ID_BASE | 2);

    let fb = Framebuffer::new(100, 50);
    conn.put_framebuffer(window.into(), gc, &fb, 0, 0).unwrap();

    // (1000 * 4 - 24) / 400 = 9 rows per strip
    for expected in [9u16, 9, 9, 9, 9, 5] {
        let strip = read_request(&mut server);
        assert!(strip.len() <= 4000);
        assert_eq!(LittleEndian::read_u16(&strip[14..16]), expected);
    }
}

#[test]
fn test_put_image_row_too_wide() {
    let mut setup = setup();
    setup.maximum_request_length = 16;
    let (mut conn, _server) = connect_with(setup, &ConnectionConfig::default());
    let window = x11blit::Window::new(ID_BASE | 1);
    let gc = x11blit::GContext::new(ID_BASE | 2);

    let result = conn.put_framebuffer(window.into(), gc, &Framebuffer::new(64, 2), 0, 0);
    assert!(matches!(result, Err(Error::RequestTooLarge { .. })));
    assert_eq!(conn.last_sequence(), 0);
}

#[test]
fn test_intern_atom_reply() {
    let (mut conn, mut server) = connect();

    let server_thread = thread::spawn(move || {
        let request = read_request(&mut server);
        assert_eq!(request[0], RequestOpcode::InternAtom as u8);
        assert_eq!(&request[8..24], b"WM_DELETE_WINDOW");

        // An event arriving before the reply must not be lost
        send_events(&mut server, &[expose_event(ID_BASE, 0)]);

        let mut reply = [0u8; 32];
        reply[0] = 1;
        LittleEndian::write_u16(&mut reply[2..4], 1);
        LittleEndian::write_u32(&mut reply[8..12], 0x155);
        server.write_all(&reply).unwrap();
        server
    });

    let atom = conn.intern_atom("WM_DELETE_WINDOW", false).unwrap();
    let _server = server_thread.join().unwrap();
    assert_eq!(atom, Atom::new(0x155));

    match conn.next_event().unwrap() {
        x11blit::Event::Expose(e) => assert_eq!(e.window, Window::new(ID_BASE)),
        other => panic!("expected buffered expose, got {:?}", other),
    }
}

#[test]
fn test_intern_atom_error() {
    let (mut conn, mut server) = connect();

    let server_thread = thread::spawn(move || {
        read_request(&mut server);
        let mut error = [0u8; 32];
        error[1] = ErrorCode::Alloc as u8;
        LittleEndian::write_u16(&mut error[2..4], 1);
        error[10] = RequestOpcode::InternAtom as u8;
        server.write_all(&error).unwrap();
        server
    });

    let result = conn.intern_atom("_NET_WM_NAME", false);
    let _server = server_thread.join().unwrap();
    match result {
        Err(Error::Protocol(error)) => {
            assert_eq!(error.code(), Some(ErrorCode::Alloc));
            assert_eq!(error.major_opcode, RequestOpcode::InternAtom as u8);
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_change_property_request() {
    let (mut conn, mut server) = connect();
    let window = Window::new(ID_BASE);
    conn.change_property(window, Atom::WM_NAME, Atom::STRING, 8, b"demo")
        .unwrap();

    let request = read_request(&mut server);
    assert_eq!(request[0], RequestOpcode::ChangeProperty as u8);
    assert_eq!(request[1], PropMode::Replace as u8);
    assert_eq!(LittleEndian::read_u32(&request[8..12]), Atom::WM_NAME.get());
    assert_eq!(LittleEndian::read_u32(&request[20..24]), 4);
    assert_eq!(&request[24..28], b"demo");
}

#[test]
fn test_write_after_server_hangup_fails() {
    let (mut conn, server) = connect();
    drop(server);
    let result = conn.map_window(Window::new(ID_BASE));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_close() {
    let (conn, _server) = connect();
    conn.close().unwrap();
}

#[test]
fn test_generate_id_stays_in_range() {
    let (mut conn, _server) = connect();
    let ids: Vec<u32> = (0..1000).map(|_| conn.generate_id()).collect();
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    for id in ids {
        assert_eq!(id & !ID_MASK, ID_BASE);
    }
}

#[test]
fn test_generate_id_uses_lowest_mask_bit() {
    let mut setup = setup();
    setup.resource_id_mask = 0x0000_0FF0;
    let (mut conn, _server) = connect_with(setup, &ConnectionConfig::default());

    assert_eq!(conn.generate_id(), ID_BASE);
    assert_eq!(conn.generate_id(), ID_BASE | 0x10);
    assert_eq!(conn.generate_id(), ID_BASE | 0x20);
}

#[test]
fn test_generate_id_wraps_without_failing() {
    let mut setup = setup();
    setup.resource_id_mask = 0x3;
    let (mut conn, _server) = connect_with(setup, &ConnectionConfig::default());
    let ids: Vec<u32> = (0..5).map(|_| conn.generate_id() & 0x3).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 0]);
}

#[test]
fn test_zero_max_request_length_means_protocol_limit() {
    let mut setup = setup();
    setup.maximum_request_length = 0;
    let (conn, _server) = connect_with(setup, &ConnectionConfig::default());
    assert_eq!(conn.max_request_units(), MAX_REQUEST_UNITS);
}

#[test]
fn test_poll_without_pump_is_empty() {
    let (mut conn, _server) = connect();
    assert!(conn.poll_event().is_none());
    assert!(conn.event_pump().is_none());
}

#[test]
fn test_oversized_property_is_refused_before_sending() {
    let mut setup = setup();
    setup.maximum_request_length = 1000;
    let (mut conn, mut server) = connect_with(setup, &ConnectionConfig::default());
    let window = Window::new(ID_BASE);

    // 24 header bytes + 4000 data bytes is one unit over the limit
    let result = conn.change_property(window, Atom::new(300), Atom::CARDINAL, 32, &[0; 4000]);
    match result {
        Err(Error::RequestTooLarge { bytes, max_bytes, .. }) => {
            assert_eq!(bytes, 4024);
            assert_eq!(max_bytes, 4000);
        }
        other => panic!("expected RequestTooLarge, got {:?}", other),
    }
    assert_eq!(conn.last_sequence(), 0);

    // The stream is still in sync: the next request is the first one sent
    conn.change_property(window, Atom::new(300), Atom::CARDINAL, 32, &[0; 3976])
        .unwrap();
    conn.map_window(window).unwrap();
    let request = read_request(&mut server);
    assert_eq!(request[0], RequestOpcode::ChangeProperty as u8);
    assert_eq!(request.len(), 4000);
    assert_eq!(LittleEndian::read_u32(&request[20..24]), 994);
    assert_eq!(read_request(&mut server)[0], RequestOpcode::MapWindow as u8);
    assert_eq!(conn.last_sequence(), 2);
}

#[test]
fn test_property_with_partial_element_is_refused() {
    let (mut conn, _server) = connect();
    let window = Window::new(ID_BASE);
    let result = conn.change_property(window, Atom::WM_NAME, Atom::CARDINAL, 32, b"abcdef");
    assert!(matches!(
        result,
        Err(Error::InvalidPropertyFormat { format: 32, len: 6 })
    ));
    assert_eq!(conn.last_sequence(), 0);
}

#[test]
fn test_intern_atom_over_server_limit() {
    let mut setup = setup();
    setup.maximum_request_length = 16;
    let (mut conn, _server) = connect_with(setup, &ConnectionConfig::default());

    let name = "X".repeat(100);
    assert!(matches!(
        conn.intern_atom(&name, false),
        Err(Error::RequestTooLarge { .. })
    ));
    assert_eq!(conn.last_sequence(), 0);
}
