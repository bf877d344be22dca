//! Write-behind persistence for planner snapshots.
//!
//! Snapshots are handed to a background thread over a channel. The thread
//! serializes and writes them, coalescing a burst of queued snapshots into a
//! single write of the newest one. Write failures are logged and never
//! reported back to the caller.

use crate::error::AppError;
use crate::storage::StorageBackend;
use crate::storage::json_store::encode_state;
use crate::store::PlannerState;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

enum Message {
    Save(Arc<PlannerState>),
    Flush(Sender<()>),
}

pub struct Persister {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    pub fn spawn(backend: Arc<dyn StorageBackend>, key: &str) -> Result<Self, AppError> {
        let (sender, receiver) = mpsc::channel();
        let key = key.to_string();
        let worker = std::thread::Builder::new()
            .name("planner-persister".to_string())
            .spawn(move || run_writer(backend.as_ref(), &key, receiver))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues a snapshot for writing and returns immediately.
    pub fn schedule(&self, state: Arc<PlannerState>) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        if sender.send(Message::Save(state)).is_err() {
            warn!("event=persist_schedule module=storage status=error reason=writer_stopped");
        }
    }

    /// Blocks until every snapshot queued so far has been written (or failed).
    pub fn flush(&self) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        let (ack_sender, ack_receiver) = mpsc::channel();
        if sender.send(Message::Flush(ack_sender)).is_ok() {
            let _ = ack_receiver.recv();
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain what is queued and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("event=persist_shutdown module=storage status=error reason=writer_panicked");
        }
    }
}

fn run_writer(backend: &dyn StorageBackend, key: &str, receiver: Receiver<Message>) {
    while let Ok(first) = receiver.recv() {
        let mut latest = None;
        let mut waiters = Vec::new();

        let mut absorb = |message: Message| match message {
            Message::Save(state) => latest = Some(state),
            Message::Flush(ack) => waiters.push(ack),
        };
        absorb(first);
        while let Ok(message) = receiver.try_recv() {
            absorb(message);
        }

        if let Some(state) = latest {
            write_snapshot(backend, key, &state);
        }
        for ack in waiters {
            let _ = ack.send(());
        }
    }
}

fn write_snapshot(backend: &dyn StorageBackend, key: &str, state: &PlannerState) {
    let result = encode_state(state).and_then(|content| backend.set_item(key, &content));
    match result {
        Ok(()) => debug!(
            "event=persist_write module=storage status=ok weeks={} templates={}",
            state.weeks.len(),
            state.templates.len()
        ),
        Err(err) => warn!(
            "event=persist_write module=storage status=error code={} message={}",
            err.code(),
            err.message()
        ),
    }
}
