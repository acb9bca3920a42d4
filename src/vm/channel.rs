//! Bounded blocking queues
//!
//! Each queue has exactly one writer and one reader. Writers block while the
//! queue is full, readers block while it is empty. Closing the writer lets
//! the reader drain what is buffered and then observe "no more data".
//!
//! The queues sit on `tokio::sync::mpsc` bounded channels driven through the
//! blocking API, so they must be used from plain threads and never from
//! inside an async runtime.

use log::debug;
use tokio::sync::mpsc::{self, error::TryRecvError, Receiver, Sender};

use crate::vm::errors::VMError;

/// Capacity used when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 2;

/// Create a queue holding at most `capacity` values
pub fn queue(capacity: usize) -> Result<(QueueWriter, QueueReader), VMError> {
    if capacity == 0 {
        return Err(VMError::Configuration(
            "queue capacity must be at least 1".to_string(),
        ));
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((QueueWriter { tx: Some(tx) }, QueueReader { rx }))
}

/// Writing end of a queue
#[derive(Debug)]
pub struct QueueWriter {
    tx: Option<Sender<i64>>,
}

impl QueueWriter {
    /// Append `value`, blocking while the queue is full
    pub fn write(&self, value: i64) -> Result<(), VMError> {
        let tx = self.tx.as_ref().ok_or(VMError::OutputDisconnected)?;
        tx.blocking_send(value)
            .map_err(|_| VMError::OutputDisconnected)
    }

    /// Mark the queue as receiving no more values. Idempotent.
    pub fn close(&mut self) {
        if self.tx.take().is_some() {
            debug!("queue writer closed");
        }
    }

    /// True once this end is closed or the reader has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

/// Reading end of a queue
#[derive(Debug)]
pub struct QueueReader {
    rx: Receiver<i64>,
}

impl QueueReader {
    /// Remove the head, blocking while empty. `None` once closed and drained.
    pub fn read(&mut self) -> Option<i64> {
        self.rx.blocking_recv()
    }

    /// Remove the head without blocking; `None` if nothing is buffered
    pub fn try_read(&mut self) -> Option<i64> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Refuse further writes. Values already buffered can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
