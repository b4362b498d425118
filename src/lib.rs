//! x11blit - a small X11 client with a software framebuffer
//!
//! This library speaks the core X11 wire protocol over a local socket and
//! pairs it with a pixel buffer you can draw into and push to a window.
//!
//! ```no_run
//! use x11blit::{Connection, Framebuffer, GcValues, WindowAttributes, colors};
//!
//! let mut conn = Connection::connect()?;
//! let window = conn.create_window(0, 0, 320, 240, &WindowAttributes::default())?;
//! let gc = conn.create_gc(window.into(), &GcValues::default())?;
//! conn.map_window(window)?;
//! conn.start_event_pump()?;
//!
//! let mut fb = Framebuffer::new(320, 240);
//! fb.fill_circle(160, 120, 40, colors::RED);
//! conn.put_framebuffer(window.into(), gc, &fb, 0, 0)?;
//! # Ok::<(), x11blit::Error>(())
//! ```

pub mod connection;
pub mod error;
pub mod framebuffer;
pub mod protocol;

pub use connection::{
    Connection, ConnectionConfig, Credentials, DisplayName, EventPump, GcValues, WindowAttributes,
};
pub use error::{Error, Result};
pub use framebuffer::{colors, Framebuffer, Rgb, Sprite};
pub use protocol::{Atom, Drawable, Event, GContext, Rectangle, Window};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version
pub const PROTOCOL_MAJOR: u16 = 11;
pub const PROTOCOL_MINOR: u16 = 0;
