//! VM instruction execution
//!
//! The fetch-decode-execute step. Each call to [`Machine::step`] decodes the
//! word at the program counter, resolves its parameters, applies the effect
//! and advances or overwrites the program counter. Input and output are the
//! only operations that can block.
//!
//! Any fault is terminal: the machine moves to `Faulted`, closes both of its
//! queue ends so neighbours stop waiting on it, and returns the fault wrapped
//! with the failing program counter.

use log::{debug, log_enabled, trace, warn, Level};

use crate::vm::decoder::decode;
use crate::vm::errors::VMError;
use crate::vm::io::{InputSource, OutputSink};
use crate::vm::machine::Machine;
use crate::vm::types::{Instruction, MachineState, Mode, Opcode, StepOutcome};

impl<I, O> Machine<I, O>
where
    I: InputSource,
    O: OutputSink,
{
    /// Execute a single instruction
    pub fn step(&mut self) -> Result<StepOutcome, VMError> {
        match self.state {
            MachineState::Halted => return Ok(StepOutcome::Halted),
            MachineState::Faulted => return Err(VMError::Faulted(self.id.clone())),
            MachineState::Running => {}
        }

        let pc = self.pc;
        let set = self.instruction_set;
        let fetched = self.memory.read(pc as i64);
        let word = fetched.as_ref().ok().copied();

        let outcome = fetched
            .and_then(|word| decode(word, set))
            .and_then(|instruction| self.execute(instruction));

        outcome.map_err(|source| {
            warn!("{}: fault at pc {}: {}", self.id, pc, source);
            self.state = MachineState::Faulted;
            self.output.close();
            self.input.close();
            VMError::Fault {
                machine: self.id.clone(),
                pc,
                word,
                source: Box::new(source),
            }
        })
    }

    fn execute(&mut self, instruction: Instruction) -> Result<StepOutcome, VMError> {
        if log_enabled!(Level::Trace) {
            trace!(
                "{}: pc={} rb={} {} {:?}",
                self.id,
                self.pc,
                self.relative_base,
                instruction.opcode,
                &self.memory.as_slice()
                    [self.pc..(self.pc + instruction.opcode.width()).min(self.memory.len())]
            );
        }
        self.steps += 1;

        match instruction.opcode {
            Opcode::Add => {
                let (lhs, rhs) = self.operands(&instruction)?;
                let sum = lhs
                    .checked_add(rhs)
                    .ok_or(VMError::ArithmeticOverflow { op: "+", lhs, rhs })?;
                self.store(&instruction, 3, sum)?;
                self.advance(&instruction);
            }
            Opcode::Multiply => {
                let (lhs, rhs) = self.operands(&instruction)?;
                let product = lhs
                    .checked_mul(rhs)
                    .ok_or(VMError::ArithmeticOverflow { op: "*", lhs, rhs })?;
                self.store(&instruction, 3, product)?;
                self.advance(&instruction);
            }
            Opcode::Input => {
                let value = self.input.next_input().ok_or(VMError::InputExhausted)?;
                self.store(&instruction, 1, value)?;
                self.advance(&instruction);
            }
            Opcode::Output => {
                let value = self.operand(&instruction, 1)?;
                self.output.emit(value)?;
                self.last_output = Some(value);
                self.advance(&instruction);
            }
            Opcode::JumpIfTrue => {
                if self.operand(&instruction, 1)? != 0 {
                    self.jump(&instruction)?;
                } else {
                    self.advance(&instruction);
                }
            }
            Opcode::JumpIfFalse => {
                if self.operand(&instruction, 1)? == 0 {
                    self.jump(&instruction)?;
                } else {
                    self.advance(&instruction);
                }
            }
            Opcode::LessThan => {
                let (lhs, rhs) = self.operands(&instruction)?;
                self.store(&instruction, 3, (lhs < rhs) as i64)?;
                self.advance(&instruction);
            }
            Opcode::Equals => {
                let (lhs, rhs) = self.operands(&instruction)?;
                self.store(&instruction, 3, (lhs == rhs) as i64)?;
                self.advance(&instruction);
            }
            Opcode::AdjustRelativeBase => {
                let delta = self.operand(&instruction, 1)?;
                self.relative_base =
                    self.relative_base
                        .checked_add(delta)
                        .ok_or(VMError::ArithmeticOverflow {
                            op: "+",
                            lhs: self.relative_base,
                            rhs: delta,
                        })?;
                self.advance(&instruction);
            }
            Opcode::Halt => {
                self.state = MachineState::Halted;
                self.output.close();
                debug!("{}: halt at pc {}", self.id, self.pc);
                return Ok(StepOutcome::Halted);
            }
        }

        Ok(StepOutcome::Continue)
    }

    /// Raw operand word of the 1-indexed parameter `param`
    fn parameter(&self, param: usize) -> Result<i64, VMError> {
        self.memory.read(self.pc as i64 + param as i64)
    }

    /// Address a position- or relative-mode parameter refers to
    fn address(&self, instruction: &Instruction, param: usize) -> Result<i64, VMError> {
        let raw = self.parameter(param)?;
        match instruction.mode(param) {
            Mode::Position => Ok(raw),
            Mode::Relative => Ok(raw.saturating_add(self.relative_base)),
            Mode::Immediate => Err(VMError::ImmediateWrite { param }),
        }
    }

    fn operand(&self, instruction: &Instruction, param: usize) -> Result<i64, VMError> {
        match instruction.mode(param) {
            Mode::Immediate => self.parameter(param),
            Mode::Position | Mode::Relative => {
                let address = self.address(instruction, param)?;
                self.memory.read(address)
            }
        }
    }

    fn operands(&self, instruction: &Instruction) -> Result<(i64, i64), VMError> {
        Ok((self.operand(instruction, 1)?, self.operand(instruction, 2)?))
    }

    fn store(&mut self, instruction: &Instruction, param: usize, value: i64) -> Result<(), VMError> {
        let address = self.address(instruction, param)?;
        self.memory.write(address, value)
    }

    /// Move pc to the second operand. A target outside memory faults here,
    /// attributed to the jump's own pc rather than to the next fetch.
    fn jump(&mut self, instruction: &Instruction) -> Result<(), VMError> {
        let target = self.operand(instruction, 2)?;
        self.pc = self.memory.index(target)?;
        Ok(())
    }

    fn advance(&mut self, instruction: &Instruction) {
        self.pc += instruction.opcode.width();
    }
}
