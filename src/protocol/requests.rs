//! X11 protocol requests
//!
//! Every request starts with a 4-byte header: opcode, one opcode-specific
//! byte, and the total length in 4-byte units. All encoders here allocate the
//! exact size up front so the declared length always matches the bytes sent.

use super::*;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// X11 request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestOpcode {
    CreateWindow = 1,
    DestroyWindow = 4,
    MapWindow = 8,
    UnmapWindow = 10,
    InternAtom = 16,
    ChangeProperty = 18,
    CreateGC = 55,
    ChangeGC = 56,
    FreeGC = 60,
    PolyFillRectangle = 70,
    PutImage = 72,
}

/// Allocate a request of `len` bytes (must be a multiple of 4) and fill in
/// the header.
fn request_buffer(opcode: RequestOpcode, data: u8, len: usize) -> Vec<u8> {
    debug_assert_eq!(len % 4, 0);
    let mut buffer = vec![0u8; len];
    buffer[0] = opcode as u8;
    buffer[1] = data;
    LittleEndian::write_u16(&mut buffer[2..4], (len / 4) as u16);
    buffer
}

/// Like [`request_buffer`] for requests whose size depends on their payload.
/// Fails instead of writing a length field that cannot hold `len`.
fn sized_request_buffer(opcode: RequestOpcode, data: u8, len: usize) -> Result<Vec<u8>> {
    let max_bytes = MAX_REQUEST_UNITS * 4;
    if len > max_bytes {
        return Err(Error::too_large("request", len, max_bytes));
    }
    Ok(request_buffer(opcode, data, len))
}

/// Append the values of a value-list in ascending bit order of `mask`.
fn write_value_list(buffer: &mut [u8], offset: usize, values: &[(u32, u32)]) {
    for (i, (_, value)) in values.iter().enumerate() {
        let at = offset + i * 4;
        LittleEndian::write_u32(&mut buffer[at..at + 4], *value);
    }
}

fn value_mask(values: &[(u32, u32)]) -> u32 {
    values.iter().fold(0, |mask, (bit, _)| mask | bit)
}

/// CreateWindow value-list bits
pub mod cw {
    pub const BACK_PIXEL: u32 = 0x0000_0002;
    pub const BORDER_PIXEL: u32 = 0x0000_0008;
    pub const OVERRIDE_REDIRECT: u32 = 0x0000_0200;
    pub const EVENT_MASK: u32 = 0x0000_0800;
}

/// GC value-list bits
pub mod gc {
    pub const FUNCTION: u32 = 0x0000_0001;
    pub const FOREGROUND: u32 = 0x0000_0004;
    pub const BACKGROUND: u32 = 0x0000_0008;
    pub const LINE_WIDTH: u32 = 0x0000_0010;
    pub const GRAPHICS_EXPOSURES: u32 = 0x0001_0000;
}

/// Create window request
#[derive(Debug, Clone)]
pub struct CreateWindowRequest {
    pub depth: u8,
    pub wid: Window,
    pub parent: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub class: WindowClass,
    pub visual: VisualID,
    pub background_pixel: Option<u32>,
    pub border_pixel: Option<u32>,
    pub override_redirect: Option<bool>,
    pub event_mask: Option<u32>,
}

impl CreateWindowRequest {
    fn values(&self) -> Vec<(u32, u32)> {
        let mut values = Vec::with_capacity(4);
        if let Some(pixel) = self.background_pixel {
            values.push((cw::BACK_PIXEL, pixel));
        }
        if let Some(pixel) = self.border_pixel {
            values.push((cw::BORDER_PIXEL, pixel));
        }
        if let Some(flag) = self.override_redirect {
            values.push((cw::OVERRIDE_REDIRECT, flag as u32));
        }
        if let Some(mask) = self.event_mask {
            values.push((cw::EVENT_MASK, mask));
        }
        values
    }

    /// `[4]` wid, `[8]` parent, `[12]` x, `[14]` y, `[16]` width,
    /// `[18]` height, `[20]` border, `[22]` class, `[24]` visual,
    /// `[28]` value-mask, `[32..]` values.
    pub fn encode(&self) -> Vec<u8> {
        let values = self.values();
        let mut buffer = request_buffer(RequestOpcode::CreateWindow, self.depth, 32 + values.len() * 4);
        LittleEndian::write_u32(&mut buffer[4..8], self.wid.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], self.parent.id().get());
        LittleEndian::write_i16(&mut buffer[12..14], self.x);
        LittleEndian::write_i16(&mut buffer[14..16], self.y);
        LittleEndian::write_u16(&mut buffer[16..18], self.width);
        LittleEndian::write_u16(&mut buffer[18..20], self.height);
        LittleEndian::write_u16(&mut buffer[20..22], self.border_width);
        LittleEndian::write_u16(&mut buffer[22..24], self.class as u16);
        LittleEndian::write_u32(&mut buffer[24..28], self.visual.get());
        LittleEndian::write_u32(&mut buffer[28..32], value_mask(&values));
        write_value_list(&mut buffer, 32, &values);
        buffer
    }
}

/// Encode one of the requests whose only field is a resource ID
/// (DestroyWindow, MapWindow, UnmapWindow, FreeGC).
pub fn encode_resource_request(opcode: RequestOpcode, id: XID) -> Vec<u8> {
    let mut buffer = request_buffer(opcode, 0, 8);
    LittleEndian::write_u32(&mut buffer[4..8], id.get());
    buffer
}

/// GC attributes shared by CreateGC and ChangeGC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcValues {
    pub function: Option<u8>,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
    pub line_width: Option<u16>,
    pub graphics_exposures: Option<bool>,
}

impl GcValues {
    pub fn foreground(pixel: u32) -> Self {
        GcValues {
            foreground: Some(pixel),
            ..Default::default()
        }
    }

    fn values(&self) -> Vec<(u32, u32)> {
        let mut values = Vec::with_capacity(5);
        if let Some(function) = self.function {
            values.push((gc::FUNCTION, function as u32));
        }
        if let Some(pixel) = self.foreground {
            values.push((gc::FOREGROUND, pixel));
        }
        if let Some(pixel) = self.background {
            values.push((gc::BACKGROUND, pixel));
        }
        if let Some(width) = self.line_width {
            values.push((gc::LINE_WIDTH, width as u32));
        }
        if let Some(exposures) = self.graphics_exposures {
            values.push((gc::GRAPHICS_EXPOSURES, exposures as u32));
        }
        values
    }
}

#[derive(Debug, Clone)]
pub struct CreateGCRequest {
    pub cid: GContext,
    pub drawable: Drawable,
    pub values: GcValues,
}

impl CreateGCRequest {
    /// `[4]` cid, `[8]` drawable, `[12]` value-mask, `[16..]` values.
    pub fn encode(&self) -> Vec<u8> {
        let values = self.values.values();
        let mut buffer = request_buffer(RequestOpcode::CreateGC, 0, 16 + values.len() * 4);
        LittleEndian::write_u32(&mut buffer[4..8], self.cid.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], self.drawable.id().get());
        LittleEndian::write_u32(&mut buffer[12..16], value_mask(&values));
        write_value_list(&mut buffer, 16, &values);
        buffer
    }
}

#[derive(Debug, Clone)]
pub struct ChangeGCRequest {
    pub gc: GContext,
    pub values: GcValues,
}

impl ChangeGCRequest {
    /// `[4]` gc, `[8]` value-mask, `[12..]` values.
    pub fn encode(&self) -> Vec<u8> {
        let values = self.values.values();
        let mut buffer = request_buffer(RequestOpcode::ChangeGC, 0, 12 + values.len() * 4);
        LittleEndian::write_u32(&mut buffer[4..8], self.gc.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], value_mask(&values));
        write_value_list(&mut buffer, 12, &values);
        buffer
    }
}

#[derive(Debug, Clone)]
pub struct PolyFillRectangleRequest {
    pub drawable: Drawable,
    pub gc: GContext,
    pub rectangles: Vec<Rectangle>,
}

impl PolyFillRectangleRequest {
    /// `[4]` drawable, `[8]` gc, then 8 bytes per rectangle.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = sized_request_buffer(
            RequestOpcode::PolyFillRectangle,
            0,
            12 + self.rectangles.len() * 8,
        )?;
        LittleEndian::write_u32(&mut buffer[4..8], self.drawable.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], self.gc.id().get());
        for (i, rect) in self.rectangles.iter().enumerate() {
            let at = 12 + i * 8;
            LittleEndian::write_i16(&mut buffer[at..at + 2], rect.x);
            LittleEndian::write_i16(&mut buffer[at + 2..at + 4], rect.y);
            LittleEndian::write_u16(&mut buffer[at + 4..at + 6], rect.width);
            LittleEndian::write_u16(&mut buffer[at + 6..at + 8], rect.height);
        }
        Ok(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct InternAtomRequest {
    pub only_if_exists: bool,
    pub name: String,
}

impl InternAtomRequest {
    /// `[1]` only-if-exists, `[4]` name length, `[8..]` name padded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| Error::too_large("atom name", name.len(), u16::MAX as usize))?;
        let mut buffer = sized_request_buffer(
            RequestOpcode::InternAtom,
            self.only_if_exists as u8,
            8 + padded_len(name.len()),
        )?;
        LittleEndian::write_u16(&mut buffer[4..6], name_len);
        buffer[8..8 + name.len()].copy_from_slice(name);
        Ok(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct ChangePropertyRequest {
    pub mode: PropMode,
    pub window: Window,
    pub property: Atom,
    pub type_: Atom,
    /// 8, 16 or 32 bits per element
    pub format: u8,
    pub data: Vec<u8>,
}

impl ChangePropertyRequest {
    /// `[1]` mode, `[4]` window, `[8]` property, `[12]` type, `[16]` format,
    /// `[20]` length in format units, `[24..]` data padded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let element_size = match self.format {
            8 => 1,
            16 => 2,
            32 => 4,
            _ => 0,
        };
        if element_size == 0 || self.data.len() % element_size != 0 {
            return Err(Error::InvalidPropertyFormat {
                format: self.format,
                len: self.data.len(),
            });
        }
        let mut buffer = sized_request_buffer(
            RequestOpcode::ChangeProperty,
            self.mode as u8,
            24 + padded_len(self.data.len()),
        )?;
        LittleEndian::write_u32(&mut buffer[4..8], self.window.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], self.property.get());
        LittleEndian::write_u32(&mut buffer[12..16], self.type_.get());
        buffer[16] = self.format;
        LittleEndian::write_u32(&mut buffer[20..24], (self.data.len() / element_size) as u32);
        buffer[24..24 + self.data.len()].copy_from_slice(&self.data);
        Ok(buffer)
    }
}

/// Bytes before the pixel data in a PutImage request
pub const PUT_IMAGE_HEADER_LEN: usize = 24;

/// Bytes per pixel of the ZPixmap images we send (depth 24, 32 bpp)
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone)]
pub struct PutImageRequest<'a> {
    pub format: ImageFormat,
    pub drawable: Drawable,
    pub gc: GContext,
    pub width: u16,
    pub height: u16,
    pub dst_x: i16,
    pub dst_y: i16,
    pub left_pad: u8,
    pub depth: u8,
    pub data: &'a [u8],
}

impl PutImageRequest<'_> {
    /// `[1]` format, `[4]` drawable, `[8]` gc, `[12]` width, `[14]` height,
    /// `[16]` dst-x, `[18]` dst-y, `[20]` left-pad, `[21]` depth, `[24..]` data.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = sized_request_buffer(
            RequestOpcode::PutImage,
            self.format as u8,
            PUT_IMAGE_HEADER_LEN + padded_len(self.data.len()),
        )?;
        LittleEndian::write_u32(&mut buffer[4..8], self.drawable.id().get());
        LittleEndian::write_u32(&mut buffer[8..12], self.gc.id().get());
        LittleEndian::write_u16(&mut buffer[12..14], self.width);
        LittleEndian::write_u16(&mut buffer[14..16], self.height);
        LittleEndian::write_i16(&mut buffer[16..18], self.dst_x);
        LittleEndian::write_i16(&mut buffer[18..20], self.dst_y);
        buffer[20] = self.left_pad;
        buffer[21] = self.depth;
        buffer[24..24 + self.data.len()].copy_from_slice(self.data);
        Ok(buffer)
    }
}

impl<'a> PutImageRequest<'a> {
    /// Split into horizontal strips that each fit in `max_request_units`.
    ///
    /// Every strip spans the full width, strips are issued top to bottom at
    /// increasing `dst_y`, and together they cover each row exactly once.
    /// A request that already fits is returned unchanged.
    pub fn into_strips(self, max_request_units: usize) -> Result<Vec<PutImageRequest<'a>>> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let expected = row_bytes * self.height as usize;
        if self.data.len() != expected {
            return Err(Error::InvalidBuffer {
                expected,
                actual: self.data.len(),
            });
        }
        if expected == 0 {
            return Ok(Vec::new());
        }

        let max_bytes = max_request_units.min(MAX_REQUEST_UNITS) * 4;
        let rows_per_strip = max_bytes.saturating_sub(PUT_IMAGE_HEADER_LEN) / row_bytes;
        if rows_per_strip == 0 {
            return Err(Error::too_large(
                "image row",
                row_bytes,
                max_bytes.saturating_sub(PUT_IMAGE_HEADER_LEN),
            ));
        }

        let strip_count = (self.height as usize + rows_per_strip - 1) / rows_per_strip;
        let last_y = self.dst_y as i64 + ((strip_count - 1) * rows_per_strip) as i64;
        if last_y > i16::MAX as i64 {
            return Err(Error::CoordinateOverflow(last_y));
        }

        let data = self.data;
        let strips = data
            .chunks(rows_per_strip * row_bytes)
            .enumerate()
            .map(|(i, chunk)| PutImageRequest {
                height: (chunk.len() / row_bytes) as u16,
                dst_y: (self.dst_y as i64 + (i * rows_per_strip) as i64) as i16,
                data: chunk,
                ..self.clone()
            })
            .collect();
        Ok(strips)
    }
}
