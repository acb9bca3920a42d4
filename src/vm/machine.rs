//! Main Virtual Machine implementation
//!
//! A [`Machine`] owns its memory, program counter, relative base and the
//! machine-side ends of its input and output. Nothing here is shared between
//! instances; the only cross-instance communication is through the queues.
//!
//! Machines built with [`Machine::new`] or [`Machine::with_config`] come with
//! a [`Port`], the host-side ends of their two blocking queues. Machines that
//! take part in a topology are wired with [`Machine::with_io`] instead.

use log::debug;
use std::thread::{self, JoinHandle};

use crate::config::MachineConfig;
use crate::vm::channel::{queue, QueueReader, QueueWriter};
use crate::vm::errors::VMError;
use crate::vm::io::{InputSource, OutputSink};
use crate::vm::memory::Memory;
use crate::vm::types::{InstructionSet, MachineState, StepOutcome};

/// One VM instance
#[derive(Debug)]
pub struct Machine<I = QueueReader, O = QueueWriter> {
    pub(super) id: String,
    pub(super) memory: Memory,
    pub(super) pc: usize,
    pub(super) relative_base: i64,
    pub(super) state: MachineState,
    pub(super) instruction_set: InstructionSet,
    pub(super) input: I,
    pub(super) output: O,
    pub(super) last_output: Option<i64>,
    pub(super) steps: u64,
}

impl Machine {
    /// Load `program` into `memory_size` words with default-sized queues
    pub fn new(program: &[i64], memory_size: usize) -> Result<(Self, Port), VMError> {
        let config = MachineConfig::default().with_memory_size(memory_size);
        Self::with_config(program, &config)
    }

    pub fn with_config(program: &[i64], config: &MachineConfig) -> Result<(Self, Port), VMError> {
        config.validate()?;
        let memory = config.memory_for(program)?;
        let (input_writer, input_reader) = queue(config.queue_capacity)?;
        let (output_writer, output_reader) = queue(config.queue_capacity)?;

        let machine = Machine::with_io(
            memory,
            input_reader,
            output_writer,
            config.instruction_set,
        );
        let port = Port {
            input: input_writer,
            output: output_reader,
        };
        Ok((machine, port))
    }
}

impl<I, O> Machine<I, O>
where
    I: InputSource,
    O: OutputSink,
{
    pub fn with_io(memory: Memory, input: I, output: O, instruction_set: InstructionSet) -> Self {
        debug!(
            "machine created: {} words, instruction set {:?}",
            memory.len(),
            instruction_set
        );
        Self {
            id: "vm".to_string(),
            memory,
            pc: 0,
            relative_base: 0,
            state: MachineState::Running,
            instruction_set,
            input,
            output,
            last_output: None,
            steps: 0,
        }
    }

    /// Name this instance in logs and fault diagnostics
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Execute instructions until the machine halts or faults
    pub fn run(&mut self) -> Result<(), VMError> {
        loop {
            if self.step()? == StepOutcome::Halted {
                debug!("{}: halted after {} steps", self.id, self.steps);
                return Ok(());
            }
        }
    }

    /// Run on a dedicated thread, handing the machine back with its result
    pub fn spawn(mut self) -> JoinHandle<(Self, Result<(), VMError>)>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        thread::spawn(move || {
            let result = self.run();
            (self, result)
        })
    }

    /// Last value emitted by an output instruction
    pub fn peek(&self) -> Option<i64> {
        self.last_output
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    pub fn instruction_set(&self) -> InstructionSet {
        self.instruction_set
    }

    /// Instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    /// Refuse further input. A halted machine keeps its input open until
    /// the host calls this or drops the machine.
    pub fn close_input(&mut self) {
        self.input.close();
    }
}

/// Host-side ends of a machine's input and output queues
#[derive(Debug)]
pub struct Port {
    input: QueueWriter,
    output: QueueReader,
}

impl Port {
    /// Enqueue an input value, blocking while the input queue is full
    pub fn write(&self, value: i64) -> Result<(), VMError> {
        self.input.write(value)
    }

    pub fn write_all(&self, values: &[i64]) -> Result<(), VMError> {
        values.iter().try_for_each(|value| self.write(*value))
    }

    /// Dequeue an output value; `None` once the machine has stopped and
    /// every value has been read
    pub fn read(&mut self) -> Option<i64> {
        self.output.read()
    }

    /// Read until the machine stops
    pub fn drain(&mut self) -> Vec<i64> {
        std::iter::from_fn(|| self.read()).collect()
    }

    /// Tell the machine no more input will arrive
    pub fn close_input(&mut self) {
        self.input.close();
    }

    pub fn into_parts(self) -> (QueueWriter, QueueReader) {
        (self.input, self.output)
    }
}
