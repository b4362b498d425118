//! Background event pump
//!
//! One thread owns the read half of the socket, decodes events and pushes
//! them into a bounded queue. Publishing never blocks: when the queue is full
//! the new event is dropped and counted. A read failure or EOF ends the
//! thread, which closes the queue so a blocked [`EventPump::wait`] returns
//! [`Error::Closed`] once the remaining events are drained.

use crate::error::{Error, Result};
use crate::protocol::{Event, EventReader};
use std::collections::VecDeque;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct EventPump {
    receiver: Receiver<Event>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    /// Second handle on the socket, used to unblock the reader on stop
    shutdown: Option<UnixStream>,
    handle: Option<JoinHandle<()>>,
}

/// Queue an event without blocking, counting it if there is no room.
/// Returns `false` once nobody is listening anymore.
fn publish(sender: &SyncSender<Event>, event: Event, dropped: &AtomicU64) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("Event queue full, dropped event ({} dropped so far)", total);
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

impl EventPump {
    /// Start pumping `reader` into a queue of `capacity` events.
    ///
    /// `backlog` holds events read before the pump existed; they are queued
    /// first so ordering is preserved.
    pub(crate) fn spawn(
        reader: EventReader<UnixStream>,
        capacity: usize,
        backlog: VecDeque<Event>,
    ) -> Result<Self> {
        let shutdown = reader.get_ref().try_clone()?;
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));

        for event in backlog {
            publish(&sender, event, &dropped);
        }

        let handle = {
            let running = running.clone();
            let dropped = dropped.clone();
            thread::Builder::new()
                .name("x11-event-pump".to_string())
                .spawn(move || run(reader, sender, running, dropped))?
        };

        log::debug!("Event pump started (capacity {})", capacity);
        Ok(EventPump {
            receiver,
            running,
            dropped,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Take the next queued event, if any, without blocking.
    pub fn poll(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Block until an event arrives. Returns [`Error::Closed`] once the pump
    /// has stopped and the queue is empty.
    pub fn wait(&self) -> Result<Event> {
        self.receiver.recv().map_err(|_| Error::Closed)
    }

    /// Blocking iterator that ends when the pump stops.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.receiver.iter()
    }

    /// Number of events discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the thread, unblock its read and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(socket) = self.shutdown.take() {
            // Already disconnected is fine, the reader has its EOF either way
            let _ = socket.shutdown(Shutdown::Read);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Event pump thread panicked");
            }
            log::debug!("Event pump stopped");
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EventPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPump")
            .field("running", &self.is_running())
            .field("dropped", &self.dropped())
            .finish()
    }
}

fn run(
    mut reader: EventReader<UnixStream>,
    sender: SyncSender<Event>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    while running.load(Ordering::Acquire) {
        let event = match reader.next_event() {
            Ok(event) => event,
            Err(Error::Closed) => {
                log::debug!("Event stream closed");
                break;
            }
            Err(e) => {
                if running.load(Ordering::Acquire) {
                    log::warn!("Event pump read failed: {}", e);
                }
                break;
            }
        };

        if !running.load(Ordering::Acquire) || !publish(&sender, event, &dropped) {
            break;
        }
    }
    running.store(false, Ordering::Release);
}
