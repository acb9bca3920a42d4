//! Stored-program integer virtual machine
//!
//! The `intcode-vm` crate interprets a flat array of signed integers as both
//! code and data. Key features:
//! - Position, immediate and relative parameter addressing
//! - Memory over-allocation for programs that need scratch space
//! - Bounded blocking I/O queues, so machines can be chained into pipelines
//!   and feedback loops running on separate threads
//! - Faults returned as values, never aborting unrelated instances

pub mod ascii;
pub mod config;
pub mod loader;
pub mod pipeline;
pub mod vm;

pub use crate::config::MachineConfig;
pub use crate::loader::{load_program, parse_program, LoadError};
pub use crate::pipeline::{best_phase_setting, permutations, Pipeline, Topology};
pub use crate::vm::{Machine, Memory, Port, VMError};
