//! X11 protocol events
//!
//! Every event is a 32-byte record. The low 7 bits of byte 0 select the
//! event type; the high bit is set when the event was synthesized by another
//! client through SendEvent. We decode the handful of events a framebuffer
//! window cares about and hand everything else back untouched.

use super::*;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Read;

/// Event type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    KeyPress = 2,
    KeyRelease = 3,
    ButtonPress = 4,
    ButtonRelease = 5,
    MotionNotify = 6,
    Expose = 12,
    ConfigureNotify = 22,
    ClientMessage = 33,
}

/// Type byte of an error record
pub const ERROR_RECORD: u8 = 0;
/// Type byte of a reply record
pub const REPLY_RECORD: u8 = 1;

/// Bit set in byte 0 when the event came from SendEvent
pub const SYNTHETIC_BIT: u8 = 0x80;

/// Decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Button(ButtonEvent),
    Motion(MotionEvent),
    Expose(ExposeEvent),
    Configure(ConfigureEvent),
    ClientMessage(ClientMessageEvent),
    Unknown(UnknownEvent),
}

impl Event {
    /// Decode a 32-byte wire record. Never fails: types we don't know
    /// become [`Event::Unknown`].
    pub fn parse(buffer: &[u8; 32]) -> Event {
        let synthetic = buffer[0] & SYNTHETIC_BIT != 0;
        match buffer[0] & !SYNTHETIC_BIT {
            2 => Event::Key(KeyEvent::parse(buffer, true, synthetic)),
            3 => Event::Key(KeyEvent::parse(buffer, false, synthetic)),
            4 => Event::Button(ButtonEvent::parse(buffer, true, synthetic)),
            5 => Event::Button(ButtonEvent::parse(buffer, false, synthetic)),
            6 => Event::Motion(MotionEvent::parse(buffer, synthetic)),
            12 => Event::Expose(ExposeEvent::parse(buffer, synthetic)),
            22 => Event::Configure(ConfigureEvent::parse(buffer, synthetic)),
            33 => Event::ClientMessage(ClientMessageEvent::parse(buffer, synthetic)),
            raw_type => Event::Unknown(UnknownEvent {
                raw_type,
                synthetic,
                data: *buffer,
            }),
        }
    }

    /// Whether the high bit of the type byte was set
    pub fn is_synthetic(&self) -> bool {
        match self {
            Event::Key(e) => e.synthetic,
            Event::Button(e) => e.synthetic,
            Event::Motion(e) => e.synthetic,
            Event::Expose(e) => e.synthetic,
            Event::Configure(e) => e.synthetic,
            Event::ClientMessage(e) => e.synthetic,
            Event::Unknown(e) => e.synthetic,
        }
    }

    /// The window this event is reported relative to, if any
    pub fn window(&self) -> Option<Window> {
        match self {
            Event::Key(e) => Some(e.event),
            Event::Button(e) => Some(e.event),
            Event::Motion(e) => Some(e.event),
            Event::Expose(e) => Some(e.window),
            Event::Configure(e) => Some(e.window),
            Event::ClientMessage(e) => Some(e.window),
            Event::Unknown(_) => None,
        }
    }
}

// Key, button and motion events share one layout:
// [1] detail, [2] sequence, [4] time, [8] root, [12] event, [16] child,
// [20] root-x, [22] root-y, [24] event-x, [26] event-y, [28] state,
// [30] same-screen
macro_rules! define_input_event {
    ($(#[$meta:meta])* $name:ident { $detail:ident: $detail_ty:ident, $pressed:ident }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            /// Press (true) or release (false)
            pub $pressed: bool,
            pub $detail: $detail_ty,
            pub synthetic: bool,
            pub sequence: u16,
            pub time: Timestamp,
            pub root: Window,
            pub event: Window,
            pub child: Window,
            pub root_x: i16,
            pub root_y: i16,
            pub event_x: i16,
            pub event_y: i16,
            /// Modifier mask, see [`key_but_mask`]
            pub state: u16,
            pub same_screen: bool,
        }

        impl $name {
            fn parse(buffer: &[u8; 32], $pressed: bool, synthetic: bool) -> Self {
                $name {
                    $pressed,
                    $detail: $detail_ty::new(buffer[1]),
                    synthetic,
                    sequence: LittleEndian::read_u16(&buffer[2..4]),
                    time: Timestamp::new(LittleEndian::read_u32(&buffer[4..8])),
                    root: Window::new(LittleEndian::read_u32(&buffer[8..12])),
                    event: Window::new(LittleEndian::read_u32(&buffer[12..16])),
                    child: Window::new(LittleEndian::read_u32(&buffer[16..20])),
                    root_x: LittleEndian::read_i16(&buffer[20..22]),
                    root_y: LittleEndian::read_i16(&buffer[22..24]),
                    event_x: LittleEndian::read_i16(&buffer[24..26]),
                    event_y: LittleEndian::read_i16(&buffer[26..28]),
                    state: LittleEndian::read_u16(&buffer[28..30]),
                    same_screen: buffer[30] != 0,
                }
            }
        }
    };
}

define_input_event!(
    /// KeyPress / KeyRelease
    KeyEvent { keycode: Keycode, pressed }
);
define_input_event!(
    /// ButtonPress / ButtonRelease
    ButtonEvent { button: Button, pressed }
);

/// MotionNotify. Same layout as key events but without a key or button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionEvent {
    /// Normal (0) or hint (1)
    pub is_hint: bool,
    pub synthetic: bool,
    pub sequence: u16,
    pub time: Timestamp,
    pub root: Window,
    pub event: Window,
    pub child: Window,
    pub root_x: i16,
    pub root_y: i16,
    pub event_x: i16,
    pub event_y: i16,
    pub state: u16,
    pub same_screen: bool,
}

impl MotionEvent {
    fn parse(buffer: &[u8; 32], synthetic: bool) -> Self {
        MotionEvent {
            is_hint: buffer[1] != 0,
            synthetic,
            sequence: LittleEndian::read_u16(&buffer[2..4]),
            time: Timestamp::new(LittleEndian::read_u32(&buffer[4..8])),
            root: Window::new(LittleEndian::read_u32(&buffer[8..12])),
            event: Window::new(LittleEndian::read_u32(&buffer[12..16])),
            child: Window::new(LittleEndian::read_u32(&buffer[16..20])),
            root_x: LittleEndian::read_i16(&buffer[20..22]),
            root_y: LittleEndian::read_i16(&buffer[22..24]),
            event_x: LittleEndian::read_i16(&buffer[24..26]),
            event_y: LittleEndian::read_i16(&buffer[26..28]),
            state: LittleEndian::read_u16(&buffer[28..30]),
            same_screen: buffer[30] != 0,
        }
    }
}

/// Expose: `[4]` window, `[8]` x, `[10]` y, `[12]` width, `[14]` height,
/// `[16]` count of expose events still to come
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposeEvent {
    pub synthetic: bool,
    pub sequence: u16,
    pub window: Window,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub count: u16,
}

impl ExposeEvent {
    fn parse(buffer: &[u8; 32], synthetic: bool) -> Self {
        ExposeEvent {
            synthetic,
            sequence: LittleEndian::read_u16(&buffer[2..4]),
            window: Window::new(LittleEndian::read_u32(&buffer[4..8])),
            x: LittleEndian::read_u16(&buffer[8..10]),
            y: LittleEndian::read_u16(&buffer[10..12]),
            width: LittleEndian::read_u16(&buffer[12..14]),
            height: LittleEndian::read_u16(&buffer[14..16]),
            count: LittleEndian::read_u16(&buffer[16..18]),
        }
    }
}

/// ConfigureNotify: `[4]` event, `[8]` window, `[12]` above-sibling,
/// `[16]` x, `[18]` y, `[20]` width, `[22]` height, `[24]` border,
/// `[26]` override-redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureEvent {
    pub synthetic: bool,
    pub sequence: u16,
    pub event: Window,
    pub window: Window,
    pub above_sibling: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub override_redirect: bool,
}

impl ConfigureEvent {
    fn parse(buffer: &[u8; 32], synthetic: bool) -> Self {
        ConfigureEvent {
            synthetic,
            sequence: LittleEndian::read_u16(&buffer[2..4]),
            event: Window::new(LittleEndian::read_u32(&buffer[4..8])),
            window: Window::new(LittleEndian::read_u32(&buffer[8..12])),
            above_sibling: Window::new(LittleEndian::read_u32(&buffer[12..16])),
            x: LittleEndian::read_i16(&buffer[16..18]),
            y: LittleEndian::read_i16(&buffer[18..20]),
            width: LittleEndian::read_u16(&buffer[20..22]),
            height: LittleEndian::read_u16(&buffer[22..24]),
            border_width: LittleEndian::read_u16(&buffer[24..26]),
            override_redirect: buffer[26] != 0,
        }
    }
}

/// ClientMessage: `[1]` format, `[4]` window, `[8]` type, `[12..32]` data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessageEvent {
    pub synthetic: bool,
    /// 8, 16, or 32
    pub format: u8,
    pub sequence: u16,
    pub window: Window,
    pub type_: Atom,
    pub data: [u8; 20],
}

impl ClientMessageEvent {
    fn parse(buffer: &[u8; 32], synthetic: bool) -> Self {
        let mut data = [0u8; 20];
        data.copy_from_slice(&buffer[12..32]);
        ClientMessageEvent {
            synthetic,
            format: buffer[1],
            sequence: LittleEndian::read_u16(&buffer[2..4]),
            window: Window::new(LittleEndian::read_u32(&buffer[4..8])),
            type_: Atom::new(LittleEndian::read_u32(&buffer[8..12])),
            data,
        }
    }

    /// The payload as five 32-bit values (meaningful when `format == 32`)
    pub fn data32(&self) -> [u32; 5] {
        let mut values = [0u32; 5];
        LittleEndian::read_u32_into(&self.data, &mut values);
        values
    }
}

/// Any record we don't decode, kept whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEvent {
    /// Type byte with the synthetic bit cleared
    pub raw_type: u8,
    pub synthetic: bool,
    pub data: [u8; 32],
}

impl UnknownEvent {
    /// Decode the record as a server error, if it is one.
    pub fn protocol_error(&self) -> Option<X11Error> {
        X11Error::parse(&self.data)
    }
}

/// Reads whole 32-byte records off a stream.
#[derive(Debug)]
pub struct EventReader<R> {
    stream: R,
}

impl<R: Read> EventReader<R> {
    pub fn new(stream: R) -> Self {
        EventReader { stream }
    }

    /// Read one raw record. A stream that ends before 32 bytes yields
    /// [`Error::Closed`].
    pub fn read_record(&mut self) -> Result<[u8; 32]> {
        let mut buffer = [0u8; EVENT_SIZE];
        self.stream.read_exact(&mut buffer).map_err(Error::from_read)?;

        // Replies can carry more than 32 bytes; drain the rest so the next
        // read starts on a record boundary.
        if buffer[0] == REPLY_RECORD {
            let extra = LittleEndian::read_u32(&buffer[4..8]) as u64 * 4;
            if extra > 0 {
                log::debug!("Skipping {} trailing reply bytes", extra);
                let copied = std::io::copy(
                    &mut (&mut self.stream).take(extra),
                    &mut std::io::sink(),
                )?;
                if copied < extra {
                    return Err(Error::Closed);
                }
            }
        }

        Ok(buffer)
    }

    /// Block until the next event arrives and decode it.
    pub fn next_event(&mut self) -> Result<Event> {
        let record = self.read_record()?;
        Ok(Event::parse(&record))
    }

    pub fn get_ref(&self) -> &R {
        &self.stream
    }
}
