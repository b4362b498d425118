//! Connection layer
//!
//! A [`Connection`] owns the socket to one X server. Requests are written
//! synchronously on the caller's thread. Incoming records are read either
//! synchronously through [`Connection::next_event`] or, once
//! [`Connection::start_event_pump`] has been called, by a background thread
//! feeding a bounded queue.

mod display;
mod pump;

pub use display::{
    ConnectionConfig, Credentials, DisplayName, DEFAULT_EVENT_QUEUE_CAPACITY, SOCKET_DIR,
};
pub use pump::EventPump;
pub use crate::protocol::GcValues;

use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::protocol::*;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;

/// Attributes applied when creating a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Background pixel; `None` uses the screen's black pixel
    pub background_pixel: Option<u32>,
    pub border_pixel: Option<u32>,
    pub border_width: u16,
    pub override_redirect: bool,
    pub event_mask: u32,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        WindowAttributes {
            background_pixel: None,
            border_pixel: None,
            border_width: 0,
            override_redirect: false,
            event_mask: event_mask::EXPOSURE
                | event_mask::KEY_PRESS
                | event_mask::KEY_RELEASE
                | event_mask::BUTTON_PRESS
                | event_mask::BUTTON_RELEASE
                | event_mask::POINTER_MOTION
                | event_mask::STRUCTURE_NOTIFY,
        }
    }
}

/// An open connection to an X server
#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,
    /// Read half until the pump takes it over
    reader: Option<EventReader<UnixStream>>,
    /// Events read while waiting for a reply
    pending: VecDeque<Event>,
    pump: Option<EventPump>,
    setup: SetupSuccess,
    screen: usize,
    next_id: u32,
    id_increment: u32,
    sequence: u16,
    max_request_units: usize,
    event_queue_capacity: usize,
}

/// Dial the display socket, falling back to the abstract namespace on Linux.
fn dial(name: &DisplayName) -> Result<UnixStream> {
    let path = name.socket_path();
    match UnixStream::connect(&path) {
        Ok(stream) => Ok(stream),
        Err(source) => {
            #[cfg(target_os = "linux")]
            match dial_abstract(&path) {
                Ok(stream) => {
                    log::debug!("Connected to abstract socket @{}", path.display());
                    return Ok(stream);
                }
                Err(e) => log::debug!("Abstract socket @{} unavailable: {}", path.display(), e),
            }
            Err(Error::Connect { path, source })
        }
    }
}

#[cfg(target_os = "linux")]
fn dial_abstract(path: &std::path::Path) -> nix::Result<UnixStream> {
    use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, UnixAddr};
    use std::os::fd::AsRawFd;
    use std::os::unix::ffi::OsStrExt;

    let fd = socket(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    let addr = UnixAddr::new_abstract(path.as_os_str().as_bytes())?;
    connect(fd.as_raw_fd(), &addr)?;
    Ok(UnixStream::from(fd))
}

/// Perform the setup exchange on a freshly opened stream.
fn handshake(stream: &mut UnixStream, credentials: Option<&Credentials>) -> Result<SetupSuccess> {
    let request = SetupRequest {
        authorization_protocol_name: credentials.map(|c| c.name.clone()).unwrap_or_default(),
        authorization_protocol_data: credentials.map(|c| c.data.clone()).unwrap_or_default(),
    };
    stream.write_all(&request.encode())?;

    let mut header = [0u8; 8];
    stream.read_exact(&mut header).map_err(Error::from_read)?;
    let header = SetupHeader::parse(&header);

    let mut data = vec![0u8; header.data_len()];
    stream.read_exact(&mut data).map_err(Error::from_read)?;

    match SetupStatus::from_u8(header.status) {
        Some(SetupStatus::Success) => SetupSuccess::parse(&header, &data),
        Some(SetupStatus::Failed) => {
            Err(Error::ConnectionRejected(parse_setup_reason(&header, &data)))
        }
        Some(SetupStatus::Authenticate) => {
            Err(Error::AuthenticationRequired(parse_setup_reason(&header, &data)))
        }
        None => Err(Error::ConnectionRejected(format!(
            "unknown setup status {}",
            header.status
        ))),
    }
}

impl Connection {
    /// Connect to the display named by `DISPLAY` (display 0 when unset).
    pub fn connect() -> Result<Self> {
        Self::connect_with(&ConnectionConfig::from_env())
    }

    pub fn connect_with(config: &ConnectionConfig) -> Result<Self> {
        let name = config.display_name()?;
        log::debug!("Connecting to display {}", name);
        let stream = dial(&name)?;
        Self::from_stream(stream, config)
    }

    /// Run the handshake over an already connected stream.
    ///
    /// Only the credentials, screen number and queue capacity of `config` are
    /// used; the stream itself decides which server we talk to.
    pub fn from_stream(mut stream: UnixStream, config: &ConnectionConfig) -> Result<Self> {
        let screen = config.display_name()?.screen_index();
        let setup = handshake(&mut stream, config.credentials.as_ref())?;

        log::debug!(
            "Setup: vendor {:?}, release {}, resource base 0x{:08x} mask 0x{:08x}, {} screen(s)",
            setup.vendor,
            setup.release_number,
            setup.resource_id_base,
            setup.resource_id_mask,
            setup.roots.len()
        );

        if setup.roots.is_empty() {
            return Err(Error::malformed("setup screen", Screen::SIZE, 0));
        }
        if screen >= setup.roots.len() {
            return Err(Error::InvalidDisplay(format!(
                "screen {} requested but the server has {}",
                screen,
                setup.roots.len()
            )));
        }

        let max_request_units = match setup.maximum_request_length {
            0 => MAX_REQUEST_UNITS,
            units => units as usize,
        };
        let mask = setup.resource_id_mask;
        let reader = EventReader::new(stream.try_clone()?);

        let conn = Connection {
            stream,
            reader: Some(reader),
            pending: VecDeque::new(),
            pump: None,
            screen,
            next_id: 0,
            id_increment: mask & mask.wrapping_neg(),
            sequence: 0,
            max_request_units,
            event_queue_capacity: config.event_queue_capacity,
            setup,
        };

        let root = conn.screen();
        log::info!(
            "Connected to X server ({}x{}, depth {}, root {})",
            root.width_in_pixels,
            root.height_in_pixels,
            root.root_depth,
            root.root.id()
        );
        Ok(conn)
    }

    /// The full setup reply
    pub fn setup(&self) -> &SetupSuccess {
        &self.setup
    }

    /// The screen this connection draws on
    pub fn screen(&self) -> &Screen {
        &self.setup.roots[self.screen]
    }

    pub fn root_window(&self) -> Window {
        self.screen().root
    }

    pub fn root_visual(&self) -> VisualID {
        self.screen().root_visual
    }

    pub fn root_depth(&self) -> u8 {
        self.screen().root_depth
    }

    pub fn screen_width(&self) -> u16 {
        self.screen().width_in_pixels
    }

    pub fn screen_height(&self) -> u16 {
        self.screen().height_in_pixels
    }

    pub fn white_pixel(&self) -> u32 {
        self.screen().white_pixel
    }

    pub fn black_pixel(&self) -> u32 {
        self.screen().black_pixel
    }

    /// Largest request the server accepts, in 4-byte units
    pub fn max_request_units(&self) -> usize {
        self.max_request_units
    }

    /// Sequence number of the last request sent
    pub fn last_sequence(&self) -> u16 {
        self.sequence
    }

    /// Allocate a fresh resource ID from the range the server assigned us.
    ///
    /// Never fails. If the range is exhausted the counter wraps and a warning
    /// is logged; IDs may then collide with live resources.
    pub fn generate_id(&mut self) -> u32 {
        let mask = self.setup.resource_id_mask;
        let id = self.setup.resource_id_base | (self.next_id & mask);
        self.next_id = self.next_id.wrapping_add(self.id_increment);
        if self.id_increment != 0 && self.next_id & mask == 0 {
            log::warn!("Resource ID space exhausted, wrapping around");
        }
        id
    }

    /// Write one encoded request. Requests longer than the server accepts
    /// are refused before anything reaches the socket.
    fn send(&mut self, request: &[u8]) -> Result<u16> {
        let max_bytes = self.max_request_units * 4;
        if request.len() > max_bytes {
            return Err(Error::too_large("request", request.len(), max_bytes));
        }
        self.stream.write_all(request)?;
        self.sequence = self.sequence.wrapping_add(1);
        log::trace!(
            "Sent request opcode {} ({} bytes, seq {})",
            request[0],
            request.len(),
            self.sequence
        );
        Ok(self.sequence)
    }

    pub fn create_window(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        attributes: &WindowAttributes,
    ) -> Result<Window> {
        let wid = Window::new(self.generate_id());
        let request = CreateWindowRequest {
            depth: self.root_depth(),
            wid,
            parent: self.root_window(),
            x,
            y,
            width,
            height,
            border_width: attributes.border_width,
            class: WindowClass::InputOutput,
            visual: self.root_visual(),
            background_pixel: Some(attributes.background_pixel.unwrap_or(self.black_pixel())),
            border_pixel: attributes.border_pixel,
            override_redirect: attributes.override_redirect.then_some(true),
            event_mask: Some(attributes.event_mask),
        };
        self.send(&request.encode())?;
        log::debug!("Created window {} ({}x{})", wid.id(), width, height);
        Ok(wid)
    }

    pub fn map_window(&mut self, window: Window) -> Result<()> {
        self.send(&encode_resource_request(RequestOpcode::MapWindow, window.id()))?;
        Ok(())
    }

    pub fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.send(&encode_resource_request(RequestOpcode::UnmapWindow, window.id()))?;
        Ok(())
    }

    pub fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.send(&encode_resource_request(RequestOpcode::DestroyWindow, window.id()))?;
        Ok(())
    }

    pub fn create_gc(&mut self, drawable: Drawable, values: &GcValues) -> Result<GContext> {
        let cid = GContext::new(self.generate_id());
        let request = CreateGCRequest {
            cid,
            drawable,
            values: values.clone(),
        };
        self.send(&request.encode())?;
        Ok(cid)
    }

    pub fn change_gc(&mut self, gc: GContext, values: &GcValues) -> Result<()> {
        let request = ChangeGCRequest {
            gc,
            values: values.clone(),
        };
        self.send(&request.encode())?;
        Ok(())
    }

    pub fn free_gc(&mut self, gc: GContext) -> Result<()> {
        self.send(&encode_resource_request(RequestOpcode::FreeGC, gc.id()))?;
        Ok(())
    }

    /// Fill rectangles with the GC's foreground, split across as many
    /// requests as the server's size limit requires.
    pub fn fill_rectangles(
        &mut self,
        drawable: Drawable,
        gc: GContext,
        rectangles: &[Rectangle],
    ) -> Result<()> {
        let per_request = (self.max_request_units * 4).saturating_sub(12) / 8;
        for chunk in rectangles.chunks(per_request.max(1)) {
            let request = PolyFillRectangleRequest {
                drawable,
                gc,
                rectangles: chunk.to_vec(),
            };
            self.send(&request.encode()?)?;
        }
        Ok(())
    }

    /// Send a ZPixmap image (4 bytes per pixel, BGRX) at the root depth.
    /// Images larger than one request are sent as horizontal strips.
    #[allow(clippy::too_many_arguments)]
    pub fn put_image(
        &mut self,
        drawable: Drawable,
        gc: GContext,
        width: u16,
        height: u16,
        dst_x: i16,
        dst_y: i16,
        data: &[u8],
    ) -> Result<()> {
        let request = PutImageRequest {
            format: ImageFormat::ZPixmap,
            drawable,
            gc,
            width,
            height,
            dst_x,
            dst_y,
            left_pad: 0,
            depth: self.root_depth(),
            data,
        };
        let strips = request.into_strips(self.max_request_units)?;
        if strips.len() > 1 {
            log::trace!("PutImage {}x{} split into {} strips", width, height, strips.len());
        }
        for strip in &strips {
            self.send(&strip.encode()?)?;
        }
        Ok(())
    }

    /// Push a whole framebuffer with its top-left corner at (dst_x, dst_y).
    pub fn put_framebuffer(
        &mut self,
        drawable: Drawable,
        gc: GContext,
        framebuffer: &Framebuffer,
        dst_x: i16,
        dst_y: i16,
    ) -> Result<()> {
        let too_large = || {
            Error::too_large(
                "framebuffer",
                framebuffer.as_bytes().len(),
                u16::MAX as usize * u16::MAX as usize * BYTES_PER_PIXEL,
            )
        };
        let width = u16::try_from(framebuffer.width()).map_err(|_| too_large())?;
        let height = u16::try_from(framebuffer.height()).map_err(|_| too_large())?;
        self.put_image(drawable, gc, width, height, dst_x, dst_y, framebuffer.as_bytes())
    }

    /// Look up (or create) the atom for `name`.
    ///
    /// This waits for the server's reply, so it is only available before the
    /// event pump starts. Events that arrive first are kept for
    /// [`next_event`](Self::next_event) or the pump.
    pub fn intern_atom(&mut self, name: &str, only_if_exists: bool) -> Result<Atom> {
        if self.pump.is_some() {
            return Err(Error::EventPumpRunning);
        }
        let request = InternAtomRequest {
            only_if_exists,
            name: name.to_string(),
        };
        let sequence = self.send(&request.encode()?)?;

        let reader = self.reader.as_mut().ok_or(Error::EventPumpRunning)?;
        loop {
            let record = reader.read_record()?;
            let record_sequence = LittleEndian::read_u16(&record[2..4]);
            match record[0] {
                REPLY_RECORD if record_sequence == sequence => {
                    let atom = Atom::new(LittleEndian::read_u32(&record[8..12]));
                    log::debug!("Interned {:?} as {}", name, atom.get());
                    return Ok(atom);
                }
                ERROR_RECORD if record_sequence == sequence => {
                    if let Some(error) = X11Error::parse(&record) {
                        return Err(Error::Protocol(error));
                    }
                }
                REPLY_RECORD => {
                    log::debug!("Ignoring reply for sequence {}", record_sequence);
                }
                _ => self.pending.push_back(Event::parse(&record)),
            }
        }
    }

    /// Replace a window property.
    pub fn change_property(
        &mut self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: &[u8],
    ) -> Result<()> {
        let request = ChangePropertyRequest {
            mode: PropMode::Replace,
            window,
            property,
            type_,
            format,
            data: data.to_vec(),
        };
        self.send(&request.encode()?)?;
        Ok(())
    }

    /// Block until the next event, reading the socket on this thread.
    ///
    /// Fails with [`Error::EventPumpRunning`] once the pump owns the socket;
    /// use [`wait_event`](Self::wait_event) instead.
    pub fn next_event(&mut self) -> Result<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        match self.reader.as_mut() {
            Some(reader) => reader.next_event(),
            None => Err(Error::EventPumpRunning),
        }
    }

    /// Hand the read half to a background thread. Calling it again is a
    /// no-op.
    pub fn start_event_pump(&mut self) -> Result<()> {
        if self.pump.is_some() {
            return Ok(());
        }
        let reader = self.reader.take().ok_or(Error::EventPumpRunning)?;
        let backlog = std::mem::take(&mut self.pending);
        self.pump = Some(EventPump::spawn(reader, self.event_queue_capacity, backlog)?);
        Ok(())
    }

    /// Next event if one is ready. Without a pump this only returns events
    /// already buffered.
    pub fn poll_event(&mut self) -> Option<Event> {
        match &self.pump {
            Some(pump) => pump.poll(),
            None => self.pending.pop_front(),
        }
    }

    /// Block until an event arrives, from the pump if it is running or from
    /// the socket directly otherwise.
    pub fn wait_event(&mut self) -> Result<Event> {
        match &self.pump {
            Some(pump) => pump.wait(),
            None => self.next_event(),
        }
    }

    pub fn event_pump(&self) -> Option<&EventPump> {
        self.pump.as_ref()
    }

    /// Stop the pump and shut the socket down.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut pump) = self.pump.take() {
            pump.stop();
        }
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => {
                log::debug!("Connection closed");
                Ok(())
            }
        }
    }
}
