//! X11 connection setup protocol
//!
//! The client opens with a 12-byte request (plus padded credentials) and the
//! server answers with an 8-byte header followed by `length * 4` bytes whose
//! meaning depends on the status byte.

use super::*;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Connection setup request sent by the client
///
/// Layout (little-endian):
/// `[0]` byte order `'l'`, `[1]` unused, `[2..4]` major, `[4..6]` minor,
/// `[6..8]` auth name length, `[8..10]` auth data length, `[10..12]` unused,
/// then the auth name and data, each padded to 4 bytes.
#[derive(Debug, Clone, Default)]
pub struct SetupRequest {
    pub authorization_protocol_name: String,
    pub authorization_protocol_data: Vec<u8>,
}

impl SetupRequest {
    pub fn encode(&self) -> Vec<u8> {
        let name = self.authorization_protocol_name.as_bytes();
        let data = &self.authorization_protocol_data;

        let mut buffer = vec![0u8; 12 + padded_len(name.len()) + padded_len(data.len())];
        buffer[0] = b'l';
        LittleEndian::write_u16(&mut buffer[2..4], PROTOCOL_MAJOR_VERSION);
        LittleEndian::write_u16(&mut buffer[4..6], PROTOCOL_MINOR_VERSION);
        LittleEndian::write_u16(&mut buffer[6..8], name.len() as u16);
        LittleEndian::write_u16(&mut buffer[8..10], data.len() as u16);

        let name_start = 12;
        buffer[name_start..name_start + name.len()].copy_from_slice(name);
        let data_start = name_start + padded_len(name.len());
        buffer[data_start..data_start + data.len()].copy_from_slice(data);

        buffer
    }
}

/// Setup response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Failed = 0,
    Success = 1,
    Authenticate = 2,
}

impl SetupStatus {
    pub fn from_u8(status: u8) -> Option<Self> {
        match status {
            0 => Some(SetupStatus::Failed),
            1 => Some(SetupStatus::Success),
            2 => Some(SetupStatus::Authenticate),
            _ => None,
        }
    }
}

/// The fixed 8-byte header in front of every setup response
#[derive(Debug, Clone, Copy)]
pub struct SetupHeader {
    pub status: u8,
    /// Reason length for `Failed`, unused otherwise
    pub detail: u8,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    /// Length of the trailing data in 4-byte units
    pub additional_length: u16,
}

impl SetupHeader {
    pub fn parse(header: &[u8; 8]) -> Self {
        SetupHeader {
            status: header[0],
            detail: header[1],
            protocol_major_version: LittleEndian::read_u16(&header[2..4]),
            protocol_minor_version: LittleEndian::read_u16(&header[4..6]),
            additional_length: LittleEndian::read_u16(&header[6..8]),
        }
    }

    pub fn data_len(&self) -> usize {
        self.additional_length as usize * 4
    }
}

/// Pixmap format information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub depth: u8,
    pub bits_per_pixel: u8,
    pub scanline_pad: u8,
}

impl Format {
    const SIZE: usize = 8;
}

/// Visual type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualType {
    pub visual_id: VisualID,
    pub class: u8,
    pub bits_per_rgb_value: u8,
    pub colormap_entries: u16,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
}

impl VisualType {
    const SIZE: usize = 24;

    fn parse(data: &[u8]) -> Self {
        VisualType {
            visual_id: VisualID::new(LittleEndian::read_u32(&data[0..4])),
            class: data[4],
            bits_per_rgb_value: data[5],
            colormap_entries: LittleEndian::read_u16(&data[6..8]),
            red_mask: LittleEndian::read_u32(&data[8..12]),
            green_mask: LittleEndian::read_u32(&data[12..16]),
            blue_mask: LittleEndian::read_u32(&data[16..20]),
        }
    }
}

/// Depth information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depth {
    pub depth: u8,
    pub visuals: Vec<VisualType>,
}

/// Screen information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub root: Window,
    pub default_colormap: u32,
    pub white_pixel: u32,
    pub black_pixel: u32,
    pub current_input_masks: u32,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
    pub width_in_millimeters: u16,
    pub height_in_millimeters: u16,
    pub min_installed_maps: u16,
    pub max_installed_maps: u16,
    pub root_visual: VisualID,
    pub backing_stores: u8,
    pub save_unders: bool,
    pub root_depth: u8,
    pub allowed_depths: Vec<Depth>,
}

impl Screen {
    pub(crate) const SIZE: usize = 40;
}

/// Setup reply (success case)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSuccess {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub release_number: u32,
    pub resource_id_base: u32,
    pub resource_id_mask: u32,
    pub motion_buffer_size: u32,
    pub maximum_request_length: u16,
    pub image_byte_order: u8,
    pub bitmap_format_bit_order: u8,
    pub bitmap_format_scanline_unit: u8,
    pub bitmap_format_scanline_pad: u8,
    pub min_keycode: u8,
    pub max_keycode: u8,
    pub vendor: String,
    pub pixmap_formats: Vec<Format>,
    pub roots: Vec<Screen>,
}

fn need(data: &[u8], end: usize, what: &'static str) -> Result<()> {
    if data.len() < end {
        Err(Error::malformed(what, end, data.len()))
    } else {
        Ok(())
    }
}

impl SetupSuccess {
    /// Length of the fixed part of the success data, before the vendor string
    const FIXED_LEN: usize = 32;

    /// Parse the data following a `Success` header.
    pub fn parse(header: &SetupHeader, data: &[u8]) -> Result<Self> {
        need(data, Self::FIXED_LEN, "setup reply")?;

        let release_number = LittleEndian::read_u32(&data[0..4]);
        let resource_id_base = LittleEndian::read_u32(&data[4..8]);
        let resource_id_mask = LittleEndian::read_u32(&data[8..12]);
        let motion_buffer_size = LittleEndian::read_u32(&data[12..16]);
        let vendor_len = LittleEndian::read_u16(&data[16..18]) as usize;
        let maximum_request_length = LittleEndian::read_u16(&data[18..20]);
        let num_screens = data[20] as usize;
        let num_formats = data[21] as usize;

        let mut offset = Self::FIXED_LEN;
        need(data, offset + vendor_len, "setup vendor string")?;
        let vendor = String::from_utf8_lossy(&data[offset..offset + vendor_len]).into_owned();
        offset += padded_len(vendor_len);

        let mut pixmap_formats = Vec::with_capacity(num_formats);
        for _ in 0..num_formats {
            need(data, offset + Format::SIZE, "setup pixmap format")?;
            pixmap_formats.push(Format {
                depth: data[offset],
                bits_per_pixel: data[offset + 1],
                scanline_pad: data[offset + 2],
            });
            offset += Format::SIZE;
        }

        let mut roots = Vec::with_capacity(num_screens);
        for _ in 0..num_screens {
            need(data, offset + Screen::SIZE, "setup screen")?;
            let s = &data[offset..offset + Screen::SIZE];
            let num_depths = s[39] as usize;
            let mut screen = Screen {
                root: Window::new(LittleEndian::read_u32(&s[0..4])),
                default_colormap: LittleEndian::read_u32(&s[4..8]),
                white_pixel: LittleEndian::read_u32(&s[8..12]),
                black_pixel: LittleEndian::read_u32(&s[12..16]),
                current_input_masks: LittleEndian::read_u32(&s[16..20]),
                width_in_pixels: LittleEndian::read_u16(&s[20..22]),
                height_in_pixels: LittleEndian::read_u16(&s[22..24]),
                width_in_millimeters: LittleEndian::read_u16(&s[24..26]),
                height_in_millimeters: LittleEndian::read_u16(&s[26..28]),
                min_installed_maps: LittleEndian::read_u16(&s[28..30]),
                max_installed_maps: LittleEndian::read_u16(&s[30..32]),
                root_visual: VisualID::new(LittleEndian::read_u32(&s[32..36])),
                backing_stores: s[36],
                save_unders: s[37] != 0,
                root_depth: s[38],
                allowed_depths: Vec::with_capacity(num_depths),
            };
            offset += Screen::SIZE;

            for _ in 0..num_depths {
                need(data, offset + 8, "setup depth")?;
                let depth = data[offset];
                let num_visuals = LittleEndian::read_u16(&data[offset + 2..offset + 4]) as usize;
                offset += 8;

                need(data, offset + num_visuals * VisualType::SIZE, "setup visuals")?;
                let visuals = data[offset..offset + num_visuals * VisualType::SIZE]
                    .chunks_exact(VisualType::SIZE)
                    .map(VisualType::parse)
                    .collect();
                offset += num_visuals * VisualType::SIZE;

                screen.allowed_depths.push(Depth { depth, visuals });
            }

            roots.push(screen);
        }

        Ok(SetupSuccess {
            protocol_major_version: header.protocol_major_version,
            protocol_minor_version: header.protocol_minor_version,
            release_number,
            resource_id_base,
            resource_id_mask,
            motion_buffer_size,
            maximum_request_length,
            image_byte_order: data[22],
            bitmap_format_bit_order: data[23],
            bitmap_format_scanline_unit: data[24],
            bitmap_format_scanline_pad: data[25],
            min_keycode: data[26],
            max_keycode: data[27],
            vendor,
            pixmap_formats,
            roots,
        })
    }
}

/// Extract the reason string from a `Failed` or `Authenticate` response.
///
/// `Failed` carries the exact length in the header detail byte; `Authenticate`
/// only has the padded data, so trailing NULs are trimmed.
pub fn parse_setup_reason(header: &SetupHeader, data: &[u8]) -> String {
    let end = if header.status == SetupStatus::Failed as u8 {
        (header.detail as usize).min(data.len())
    } else {
        data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1)
    };
    String::from_utf8_lossy(&data[..end]).into_owned()
}
