//! Wakeup channels for blocking stream reads.
//!
//! A blocking XREAD registers one waiter per watched key; XADD signals
//! every waiter registered for the key it appended to. The waiting task
//! owns the receiving end and removes its waiters once it is done, so a
//! late signal never reaches a finished read.

use std::collections::HashMap;

use tokio::sync::mpsc;

#[derive(Debug)]
pub struct StreamWaiter {
    pub client_address: String,
    pub sender: mpsc::Sender<()>,
}

#[derive(Debug, Default)]
pub struct State {
    stream_waiters: HashMap<String, Vec<StreamWaiter>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stream_waiter(&mut self, key: String, waiter: StreamWaiter) {
        self.stream_waiters.entry(key).or_default().push(waiter);
    }

    /// Drops every waiter the given client registered for the given keys.
    pub fn remove_stream_waiters(&mut self, keys: &[String], client_address: &str) {
        for key in keys {
            if let Some(waiters) = self.stream_waiters.get_mut(key) {
                waiters.retain(|waiter| waiter.client_address != client_address);

                if waiters.is_empty() {
                    self.stream_waiters.remove(key);
                }
            }
        }
    }

    /// Signals every waiter watching `key`. A full or closed channel means
    /// the waiter is already awake or gone; either way the signal is moot.
    pub fn notify_stream_waiters(&self, key: &str) {
        if let Some(waiters) = self.stream_waiters.get(key) {
            for waiter in waiters {
                let _ = waiter.sender.try_send(());
            }
        }
    }
}
