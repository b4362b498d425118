//! Display names and connection configuration

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Directory holding the per-display listening sockets
pub const SOCKET_DIR: &str = "/tmp/.X11-unix";

/// Default capacity of the event queue fed by the pump
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// A parsed `DISPLAY` value such as `:0`, `:1.0` or `unix:2`.
///
/// Only local displays are reachable, so the host part must be empty,
/// `unix` or `localhost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayName {
    pub display: u32,
    pub screen: Option<u32>,
}

impl DisplayName {
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || Error::InvalidDisplay(name.to_string());

        let (host, rest) = name.rsplit_once(':').ok_or_else(invalid)?;
        if !matches!(host, "" | "unix" | "localhost") {
            return Err(invalid());
        }

        let (display, screen) = match rest.split_once('.') {
            Some((display, screen)) => (display, Some(screen)),
            None => (rest, None),
        };
        let display = display.parse::<u32>().map_err(|_| invalid())?;
        let screen = screen
            .map(|s| s.parse::<u32>().map_err(|_| invalid()))
            .transpose()?;

        Ok(DisplayName { display, screen })
    }

    /// Filesystem path of the display's socket
    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(format!("{}/X{}", SOCKET_DIR, self.display))
    }

    /// Screen to use, falling back to the first one
    pub fn screen_index(&self) -> usize {
        self.screen.unwrap_or(0) as usize
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        DisplayName {
            display: 0,
            screen: None,
        }
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.screen {
            Some(screen) => write!(f, ":{}.{}", self.display, screen),
            None => write!(f, ":{}", self.display),
        }
    }
}

/// Authorization sent during setup, e.g. an `MIT-MAGIC-COOKIE-1` entry
/// read from the user's authority file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub data: Vec<u8>,
}

impl Credentials {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Credentials {
            name: name.into(),
            data,
        }
    }
}

// Keep cookies out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

/// Everything needed to open a [`Connection`](super::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Display name; `None` means display 0
    pub display: Option<String>,
    pub credentials: Option<Credentials>,
    /// Events buffered by the pump before new ones are dropped
    pub event_queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            display: None,
            credentials: None,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    /// Defaults with the display taken from `DISPLAY`.
    pub fn from_env() -> Self {
        ConnectionConfig {
            display: std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn display_name(&self) -> Result<DisplayName> {
        match &self.display {
            Some(name) => DisplayName::parse(name),
            None => Ok(DisplayName::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_only() {
        let name = DisplayName::parse(":0").unwrap();
        assert_eq!(name, DisplayName { display: 0, screen: None });
        assert_eq!(name.socket_path(), PathBuf::from("/tmp/.X11-unix/X0"));
        assert_eq!(name.screen_index(), 0);
    }

    #[test]
    fn test_parse_with_screen_and_host() {
        let name = DisplayName::parse("unix:12.1").unwrap();
        assert_eq!(name.display, 12);
        assert_eq!(name.screen, Some(1));
        assert_eq!(name.to_string(), ":12.1");

        assert_eq!(DisplayName::parse("localhost:3").unwrap().display, 3);
    }

    #[test]
    fn test_parse_rejects_remote_and_garbage() {
        for bad in ["", "0", "remote.example.com:0", ":x", ":1.y", ":", ":-1"] {
            assert!(
                matches!(DisplayName::parse(bad), Err(Error::InvalidDisplay(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.event_queue_capacity, 256);
        assert_eq!(config.display_name().unwrap(), DisplayName::default());

        let config = config.with_display(":7").with_event_queue_capacity(4);
        assert_eq!(config.display_name().unwrap().display, 7);
        assert_eq!(config.event_queue_capacity, 4);
    }

    #[test]
    fn test_credentials_debug_hides_cookie() {
        let creds = Credentials::new("MIT-MAGIC-COOKIE-1", vec![0x5a; 16]);
        let shown = format!("{:?}", creds);
        assert!(shown.contains("<16 bytes>"));
        assert!(!shown.contains("90"));
    }
}
