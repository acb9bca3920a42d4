//! Virtual Machine
//!
//! A stored-program machine that interprets a flat array of signed integers
//! as both code and data.
//!
//! - **types.rs**: opcodes, addressing modes, instructions and instruction sets.
//! - **decoder.rs**: maps an instruction word to an opcode and parameter modes.
//! - **memory.rs**: fixed-size word memory with address checking.
//! - **channel.rs**: bounded blocking queues connecting machines and hosts.
//! - **io.rs**: the `InputSource` / `OutputSink` seams of the execution unit.
//! - **machine.rs**: the `Machine` aggregate and the host-side `Port`.
//! - **execution.rs**: the fetch-decode-execute step.
//! - **disasm.rs**: program listings.

mod channel;
mod decoder;
mod disasm;
mod errors;
mod execution;
mod io;
mod machine;
mod memory;
mod types;

pub use channel::{queue, QueueReader, QueueWriter, DEFAULT_CAPACITY};
pub use decoder::decode;
pub use disasm::{disassemble, Line};
pub use errors::VMError;
pub use io::{InputFn, InputSource, OutputSink};
pub use machine::{Machine, Port};
pub use memory::Memory;
pub use types::{Instruction, InstructionSet, MachineState, Mode, Opcode, StepOutcome};
