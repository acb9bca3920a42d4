//! Error types for VM operations
//!
//! This module defines all possible error conditions that can occur while
//! building or running a machine. Every runtime variant is fatal: a machine
//! that returns one of them never executes another instruction.

use thiserror::Error;

/// Error variants that can occur during VM construction or execution
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VMError {
    /// The opcode is unknown, or not part of the selected instruction set
    #[error("Illegal opcode {opcode}")]
    IllegalOpcode { opcode: i64 },

    /// The addressing-mode digit is unknown, or not part of the selected instruction set
    #[error("Illegal mode {mode} for parameter {param}")]
    IllegalMode { mode: i64, param: usize },

    /// A destination parameter was encoded in immediate mode
    #[error("Immediate mode used for write destination (parameter {param})")]
    ImmediateWrite { param: usize },

    /// A resolved address was below zero
    #[error("Negative address {address}")]
    NegativeAddress { address: i64 },

    /// A resolved address was past the end of allocated memory
    #[error("Address {address} out of range (memory size {size})")]
    AddressOutOfRange { address: i64, size: usize },

    /// The requested memory is smaller than the program it must hold
    #[error("Memory size {requested} is smaller than program length {program_len}")]
    MemoryTooSmall { requested: usize, program_len: usize },

    /// Add or multiply left the signed 64-bit range
    #[error("Arithmetic overflow: {lhs} {op} {rhs}")]
    ArithmeticOverflow { op: &'static str, lhs: i64, rhs: i64 },

    /// An input instruction found the input closed and drained
    #[error("Input exhausted")]
    InputExhausted,

    /// An output instruction found nobody left to receive the value
    #[error("Output disconnected")]
    OutputDisconnected,

    /// A machine was stepped after it already returned a fault
    #[error("Machine {0} has already faulted")]
    Faulted(String),

    /// A topology finished without its last instance emitting anything
    #[error("No output produced")]
    NoOutput,

    /// Invalid machine or pipeline configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A fault raised by the instruction at `pc`
    #[error("Machine {machine}: fault at pc {pc}: {source}")]
    Fault {
        machine: String,
        pc: usize,
        /// Instruction word at `pc`, absent when the fetch itself failed
        word: Option<i64>,
        #[source]
        source: Box<VMError>,
    },
}

impl VMError {
    /// The underlying cause, looking through a `Fault` wrapper
    pub fn root(&self) -> &VMError {
        match self {
            VMError::Fault { source, .. } => source.root(),
            other => other,
        }
    }

    /// Program counter of the failing instruction, if the error came from one
    pub fn pc(&self) -> Option<usize> {
        match self {
            VMError::Fault { pc, .. } => Some(*pc),
            _ => None,
        }
    }
}
