//! In-process fake X server for integration tests
//!
//! The client gets one end of a socket pair, a thread plays the server on
//! the other end: it reads the setup request, answers it, then hands the
//! socket back so the test can read requests and write events.

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread;
use x11blit::protocol::*;
use x11blit::{Connection, ConnectionConfig};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const ROOT: u32 = 0x0000_03ad;
pub const VISUAL: u32 = 0x21;
pub const ID_BASE: u32 = 0x0480_0000;
pub const ID_MASK: u32 = 0x001F_FFFF;

pub fn screen(width: u16, height: u16) -> Screen {
    Screen {
        root: Window::new(ROOT),
        default_colormap: 0x20,
        white_pixel: 0x00FF_FFFF,
        black_pixel: 0,
        current_input_masks: 0,
        width_in_pixels: width,
        height_in_pixels: height,
        width_in_millimeters: 340,
        height_in_millimeters: 190,
        min_installed_maps: 1,
        max_installed_maps: 1,
        root_visual: VisualID::new(VISUAL),
        backing_stores: 0,
        save_unders: false,
        root_depth: 24,
        allowed_depths: vec![Depth {
            depth: 24,
            visuals: vec![VisualType {
                visual_id: VisualID::new(VISUAL),
                class: 4,
                bits_per_rgb_value: 8,
                colormap_entries: 256,
                red_mask: 0x00FF_0000,
                green_mask: 0x0000_FF00,
                blue_mask: 0x0000_00FF,
            }],
        }],
    }
}

pub fn setup() -> SetupSuccess {
    SetupSuccess {
        protocol_major_version: 11,
        protocol_minor_version: 0,
        release_number: 12_101_004,
        resource_id_base: ID_BASE,
        resource_id_mask: ID_MASK,
        motion_buffer_size: 256,
        maximum_request_length: 0xFFFF,
        image_byte_order: 0,
        bitmap_format_bit_order: 0,
        bitmap_format_scanline_unit: 32,
        bitmap_format_scanline_pad: 32,
        min_keycode: 8,
        max_keycode: 255,
        vendor: "Fake Server".to_string(),
        pixmap_formats: vec![Format {
            depth: 24,
            bits_per_pixel: 32,
            scanline_pad: 32,
        }],
        roots: vec![screen(1920, 1080)],
    }
}

/// Encode a successful setup reply as a server sends it, header included.
pub fn encode_setup(setup: &SetupSuccess) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::with_capacity(128);

    buf.push(SetupStatus::Success as u8);
    buf.push(0);
    buf.write_u16::<LittleEndian>(setup.protocol_major_version).unwrap();
    buf.write_u16::<LittleEndian>(setup.protocol_minor_version).unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap(); // length, patched below

    buf.write_u32::<LittleEndian>(setup.release_number).unwrap();
    buf.write_u32::<LittleEndian>(setup.resource_id_base).unwrap();
    buf.write_u32::<LittleEndian>(setup.resource_id_mask).unwrap();
    buf.write_u32::<LittleEndian>(setup.motion_buffer_size).unwrap();
    buf.write_u16::<LittleEndian>(setup.vendor.len() as u16).unwrap();
    buf.write_u16::<LittleEndian>(setup.maximum_request_length).unwrap();
    buf.push(setup.roots.len() as u8);
    buf.push(setup.pixmap_formats.len() as u8);
    buf.push(setup.image_byte_order);
    buf.push(setup.bitmap_format_bit_order);
    buf.push(setup.bitmap_format_scanline_unit);
    buf.push(setup.bitmap_format_scanline_pad);
    buf.push(setup.min_keycode);
    buf.push(setup.max_keycode);
    buf.extend_from_slice(&[0u8; 4]);

    buf.extend_from_slice(setup.vendor.as_bytes());
    buf.resize(buf.len() + pad(setup.vendor.len()), 0);

    for format in &setup.pixmap_formats {
        buf.extend_from_slice(&[format.depth, format.bits_per_pixel, format.scanline_pad]);
        buf.extend_from_slice(&[0u8; 5]);
    }

    for screen in &setup.roots {
        buf.write_u32::<LittleEndian>(screen.root.id().get()).unwrap();
        buf.write_u32::<LittleEndian>(screen.default_colormap).unwrap();
        buf.write_u32::<LittleEndian>(screen.white_pixel).unwrap();
        buf.write_u32::<LittleEndian>(screen.black_pixel).unwrap();
        buf.write_u32::<LittleEndian>(screen.current_input_masks).unwrap();
        buf.write_u16::<LittleEndian>(screen.width_in_pixels).unwrap();
        buf.write_u16::<LittleEndian>(screen.height_in_pixels).unwrap();
        buf.write_u16::<LittleEndian>(screen.width_in_millimeters).unwrap();
        buf.write_u16::<LittleEndian>(screen.height_in_millimeters).unwrap();
        buf.write_u16::<LittleEndian>(screen.min_installed_maps).unwrap();
        buf.write_u16::<LittleEndian>(screen.max_installed_maps).unwrap();
        buf.write_u32::<LittleEndian>(screen.root_visual.get()).unwrap();
        buf.push(screen.backing_stores);
        buf.push(screen.save_unders as u8);
        buf.push(screen.root_depth);
        buf.push(screen.allowed_depths.len() as u8);

        for depth in &screen.allowed_depths {
            buf.push(depth.depth);
            buf.push(0);
            buf.write_u16::<LittleEndian>(depth.visuals.len() as u16).unwrap();
            buf.extend_from_slice(&[0u8; 4]);
            for visual in &depth.visuals {
                buf.write_u32::<LittleEndian>(visual.visual_id.get()).unwrap();
                buf.push(visual.class);
                buf.push(visual.bits_per_rgb_value);
                buf.write_u16::<LittleEndian>(visual.colormap_entries).unwrap();
                buf.write_u32::<LittleEndian>(visual.red_mask).unwrap();
                buf.write_u32::<LittleEndian>(visual.green_mask).unwrap();
                buf.write_u32::<LittleEndian>(visual.blue_mask).unwrap();
                buf.extend_from_slice(&[0u8; 4]);
            }
        }
    }

    let units = ((buf.len() - 8) / 4) as u16;
    LittleEndian::write_u16(&mut buf[6..8], units);
    buf
}

/// Encode a `Failed` (or `Authenticate`) reply carrying `reason`.
pub fn encode_setup_refusal(status: SetupStatus, reason: &str) -> Vec<u8> {
    let mut buf = vec![0u8; 8 + padded_len(reason.len())];
    buf[0] = status as u8;
    if status == SetupStatus::Failed {
        buf[1] = reason.len() as u8;
    }
    LittleEndian::write_u16(&mut buf[2..4], PROTOCOL_MAJOR_VERSION);
    LittleEndian::write_u16(&mut buf[4..6], PROTOCOL_MINOR_VERSION);
    LittleEndian::write_u16(&mut buf[6..8], (padded_len(reason.len()) / 4) as u16);
    buf[8..8 + reason.len()].copy_from_slice(reason.as_bytes());
    buf
}

/// Setup request as received by the server
#[derive(Debug)]
pub struct ReceivedSetup {
    pub header: [u8; 12],
    pub auth_name: Vec<u8>,
    pub auth_data: Vec<u8>,
}

pub fn read_setup_request(stream: &mut UnixStream) -> ReceivedSetup {
    let mut header = [0u8; 12];
    stream.read_exact(&mut header).unwrap();
    let name_len = LittleEndian::read_u16(&header[6..8]) as usize;
    let data_len = LittleEndian::read_u16(&header[8..10]) as usize;

    let mut name = vec![0u8; padded_len(name_len)];
    stream.read_exact(&mut name).unwrap();
    name.truncate(name_len);
    let mut data = vec![0u8; padded_len(data_len)];
    stream.read_exact(&mut data).unwrap();
    data.truncate(data_len);

    ReceivedSetup {
        header,
        auth_name: name,
        auth_data: data,
    }
}

/// Read one request; returns the whole request, header included.
pub fn read_request(stream: &mut UnixStream) -> Vec<u8> {
    let mut request = vec![0u8; 4];
    stream.read_exact(&mut request).unwrap();
    let len = LittleEndian::read_u16(&request[2..4]) as usize * 4;
    request.resize(len, 0);
    stream.read_exact(&mut request[4..]).unwrap();
    request
}

/// Open a connection against a fake server answering with `setup`.
pub fn connect_with(setup: SetupSuccess, config: &ConnectionConfig) -> (Connection, UnixStream) {
    init_logging();
    let (client, mut server) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || {
        read_setup_request(&mut server);
        server.write_all(&encode_setup(&setup)).unwrap();
        server
    });
    let conn = Connection::from_stream(client, config).unwrap();
    (conn, server_thread.join().unwrap())
}

pub fn connect() -> (Connection, UnixStream) {
    connect_with(setup(), &ConnectionConfig::default())
}

pub fn expose_event(window: u32, count: u16) -> [u8; 32] {
    let mut event = [0u8; 32];
    event[0] = 12;
    LittleEndian::write_u32(&mut event[4..8], window);
    LittleEndian::write_u16(&mut event[12..14], 64);
    LittleEndian::write_u16(&mut event[14..16], 48);
    LittleEndian::write_u16(&mut event[16..18], count);
    event
}

pub fn send_events(stream: &mut UnixStream, events: &[[u8; 32]]) {
    for event in events {
        stream.write_all(event).unwrap();
    }
}
