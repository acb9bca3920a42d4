//! Input and output seams of the execution unit
//!
//! A machine reads through an [`InputSource`] and writes through an
//! [`OutputSink`]. Blocking queues connect machines to hosts and to each
//! other; in-memory buffers serve fully sequential runs; a closure lets a
//! host compute each input on demand.

use std::collections::VecDeque;

use crate::vm::channel::{QueueReader, QueueWriter};
use crate::vm::errors::VMError;

/// Where a machine's input instructions take their values from
pub trait InputSource {
    /// Next value, or `None` when no more data will arrive
    fn next_input(&mut self) -> Option<i64>;

    /// Stop accepting values from upstream
    fn close(&mut self) {}
}

/// Where a machine's output instructions deliver their values
pub trait OutputSink {
    fn emit(&mut self, value: i64) -> Result<(), VMError>;

    /// Signal that no more values will be emitted
    fn close(&mut self) {}
}

impl InputSource for QueueReader {
    fn next_input(&mut self) -> Option<i64> {
        self.read()
    }

    fn close(&mut self) {
        QueueReader::close(self)
    }
}

impl OutputSink for QueueWriter {
    fn emit(&mut self, value: i64) -> Result<(), VMError> {
        self.write(value)
    }

    fn close(&mut self) {
        QueueWriter::close(self)
    }
}

impl InputSource for VecDeque<i64> {
    fn next_input(&mut self) -> Option<i64> {
        self.pop_front()
    }
}

impl OutputSink for Vec<i64> {
    fn emit(&mut self, value: i64) -> Result<(), VMError> {
        self.push(value);
        Ok(())
    }
}

/// Input computed by the host each time the machine asks for one
pub struct InputFn<F>(pub F);

impl<F> InputSource for InputFn<F>
where
    F: FnMut() -> i64,
{
    fn next_input(&mut self) -> Option<i64> {
        Some((self.0)())
    }
}

impl<F> std::fmt::Debug for InputFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InputFn")
    }
}
