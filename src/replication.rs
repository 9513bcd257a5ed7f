//! Master-side replica links: propagation, offsets and WAIT.
//!
//! Each replica link owns the write half of its promoted connection, a
//! byte offset counting everything propagated toward it, and a FIFO queue
//! of ack waiters. One inbound `REPLCONF ACK` releases the front waiter of
//! its link; a WAIT invocation that times out detaches its waiters from
//! every link so a late ack is dropped instead of delivered stale.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::resp::RespValue;

#[derive(Debug)]
struct AckWaiter {
    wait_id: u64,
    sender: mpsc::Sender<u64>,
}

/// A live replica connection as seen by the master.
#[derive(Debug)]
pub struct ReplicaLink {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    byte_offset: u64,
    ack_waiters: VecDeque<AckWaiter>,
}

impl ReplicaLink {
    fn new(writer: Arc<Mutex<OwnedWriteHalf>>) -> Self {
        Self {
            writer,
            byte_offset: 0,
            ack_waiters: VecDeque::new(),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> tokio::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        self.byte_offset += bytes.len() as u64;
        Ok(())
    }
}

/// The set of live replica links, keyed by remote address.
#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    links: Mutex<HashMap<String, Arc<Mutex<ReplicaLink>>>>,
    next_wait_id: AtomicU64,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly promoted connection with a zero offset.
    pub async fn register(&self, id: String, writer: Arc<Mutex<OwnedWriteHalf>>) {
        debug!(replica = %id, "registering replica link");
        let mut links = self.links.lock().await;
        links.insert(id, Arc::new(Mutex::new(ReplicaLink::new(writer))));
    }

    pub async fn remove(&self, id: &str) {
        let mut links = self.links.lock().await;
        if links.remove(id).is_some() {
            debug!(replica = %id, "removed replica link");
        }
    }

    pub async fn len(&self) -> usize {
        self.links.lock().await.len()
    }

    async fn snapshot(&self) -> Vec<(String, Arc<Mutex<ReplicaLink>>)> {
        let links = self.links.lock().await;
        links
            .iter()
            .map(|(id, link)| (id.clone(), Arc::clone(link)))
            .collect()
    }

    /// Fans a write command out to every live link, adding its encoded
    /// length to each link's byte offset. Fire-and-forget for the caller:
    /// a link that fails to accept the write is dropped from the registry.
    pub async fn propagate(&self, command: &RespValue) {
        let encoded = command.encode();
        let mut dead_links = Vec::new();

        for (id, link) in self.snapshot().await {
            let mut link_guard = link.lock().await;
            if let Err(e) = link_guard.write(encoded.as_bytes()).await {
                warn!(replica = %id, error = %e, "dropping replica link after failed propagation");
                dead_links.push(id);
            }
        }

        for id in dead_links {
            self.remove(&id).await;
        }
    }

    /// Delivers an inbound `REPLCONF ACK <offset>` from the given link to
    /// the link's oldest pending waiter. Dropped when no waiter is pending.
    pub async fn ack_received(&self, id: &str, offset: u64) {
        let link = {
            let links = self.links.lock().await;
            links.get(id).map(Arc::clone)
        };

        let Some(link) = link else {
            return;
        };

        let mut link_guard = link.lock().await;
        if let Some(waiter) = link_guard.ack_waiters.pop_front() {
            let _ = waiter.sender.try_send(offset);
        }
    }

    /// Implements `WAIT numreplicas timeout`.
    ///
    /// Links that were never written to count as in-sync immediately. Every
    /// other link gets a `REPLCONF GETACK *` probe and a waiter entry; the
    /// call returns once enough acks arrived or the timeout passed. A
    /// timeout of `None` waits indefinitely.
    pub async fn wait_for_acks(&self, numreplicas: usize, timeout: Option<Duration>) -> usize {
        let links = self.snapshot().await;
        let (ack_tx, mut ack_rx) = mpsc::channel(links.len().max(1));
        let wait_id = self.next_wait_id.fetch_add(1, Ordering::Relaxed);
        let getack = RespValue::command(&["REPLCONF", "GETACK", "*"]).encode();

        let mut count = 0;
        let mut dead_links = Vec::new();

        for (id, link) in &links {
            let mut link_guard = link.lock().await;

            if link_guard.byte_offset == 0 {
                count += 1;
                continue;
            }

            link_guard.ack_waiters.push_back(AckWaiter {
                wait_id,
                sender: ack_tx.clone(),
            });

            if let Err(e) = link_guard.write(getack.as_bytes()).await {
                warn!(replica = %id, error = %e, "dropping replica link after failed GETACK");
                dead_links.push(id.clone());
            }
        }

        drop(ack_tx);
        for id in dead_links {
            self.remove(&id).await;
        }

        let deadline = timeout.map(|t| Instant::now() + t);

        while count < numreplicas {
            let received = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, ack_rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => break,
                },
                None => ack_rx.recv().await,
            };

            match received {
                Some(_) => count += 1,
                None => break,
            }
        }

        self.detach_waiters(wait_id).await;
        count
    }

    /// Removes every waiter a finished WAIT left behind, so a late ack is
    /// dropped rather than delivered to a closed channel while the next
    /// waiter in line starves.
    async fn detach_waiters(&self, wait_id: u64) {
        for (_, link) in self.snapshot().await {
            let mut link_guard = link.lock().await;
            link_guard
                .ack_waiters
                .retain(|waiter| waiter.wait_id != wait_id);
        }
    }
}
