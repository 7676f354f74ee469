// ABOUTME: Per-link table of requests awaiting a response, keyed by sequence number
// ABOUTME: Every entry is resolved exactly once: by its response, its timeout, or link teardown

use crate::client::error::{SmppError, SmppResult};
use crate::codec::Frame;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};

type Responder = oneshot::Sender<SmppResult<Frame>>;

#[derive(Debug)]
struct Entry {
    // Distinguishes a reused sequence number from the entry a waiter registered.
    ticket: u64,
    responder: Responder,
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<u32, Entry>,
    closed: bool,
}

/// Requests in flight on one carrier link.
///
/// Submitters insert, the reader task completes, teardown fails whatever is
/// left. In-flight entries are capped by a semaphore.
#[derive(Debug)]
pub struct PendingRequests {
    table: Mutex<Table>,
    slots: Arc<Semaphore>,
    tickets: AtomicU64,
}

impl PendingRequests {
    pub fn new(max_in_flight: usize) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(Table::default()),
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tickets: AtomicU64::new(0),
        })
    }

    fn table(&self) -> std::sync::MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for an in-flight slot. Fails once the link is torn down.
    pub async fn reserve(&self) -> SmppResult<OwnedSemaphorePermit> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| SmppError::ConnectionClosed)
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.table().entries.contains_key(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a waiter for `sequence_number`.
    pub fn register(
        self: &Arc<Self>,
        sequence_number: u32,
        permit: OwnedSemaphorePermit,
    ) -> SmppResult<PendingResponse> {
        let (tx, rx) = oneshot::channel();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let mut table = self.table();
        if table.closed {
            return Err(SmppError::ConnectionClosed);
        }
        table.entries.insert(
            sequence_number,
            Entry {
                ticket,
                responder: tx,
            },
        );

        Ok(PendingResponse {
            sequence_number,
            ticket,
            rx,
            table: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Hands `frame` to its waiter. Returns false when nobody is waiting,
    /// e.g. the waiter already timed out.
    pub fn complete(&self, frame: Frame) -> bool {
        let entry = self.table().entries.remove(&frame.sequence_number());
        match entry {
            // The waiter may have been cancelled between remove and send
            Some(entry) => entry.responder.send(Ok(frame)).is_ok(),
            None => false,
        }
    }

    /// Fails every waiter with `ConnectionClosed` and refuses new entries.
    /// Safe to call more than once. Returns how many waiters were failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<Entry> = {
            let mut table = self.table();
            table.closed = true;
            table.entries.drain().map(|(_, entry)| entry).collect()
        };
        self.slots.close();

        let count = drained.len();
        for entry in drained {
            let _ = entry.responder.send(Err(SmppError::ConnectionClosed));
        }
        count
    }

    fn forget(&self, sequence_number: u32, ticket: u64) {
        let mut table = self.table();
        if table
            .entries
            .get(&sequence_number)
            .is_some_and(|entry| entry.ticket == ticket)
        {
            table.entries.remove(&sequence_number);
        }
    }
}

/// Handle to one pending request.
///
/// Dropping it, whether after a response, on timeout or because the caller
/// was cancelled, removes its table entry and frees its in-flight slot.
#[derive(Debug)]
pub struct PendingResponse {
    sequence_number: u32,
    ticket: u64,
    rx: oneshot::Receiver<SmppResult<Frame>>,
    table: Arc<PendingRequests>,
    _permit: OwnedSemaphorePermit,
}

impl PendingResponse {
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Waits up to `deadline` for the response.
    pub async fn wait(mut self, deadline: Duration) -> SmppResult<Frame> {
        match tokio::time::timeout(deadline, &mut self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SmppError::ConnectionClosed),
            Err(_) => Err(SmppError::Timeout),
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.table.forget(self.sequence_number, self.ticket);
    }
}
