//! Core data structures for the VM
//!
//! Defines the instruction vocabulary: opcodes, parameter addressing modes,
//! decoded instructions and the instruction-set generations a machine can be
//! restricted to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation selector occupying the low two decimal digits of an instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustRelativeBase,
    Halt,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustRelativeBase,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Multiply => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustRelativeBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustRelativeBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Words occupied by the instruction, including the instruction word itself
    pub fn width(self) -> usize {
        self.arity() + 1
    }

    /// Short mnemonic used in listings and traces
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Multiply => "mul",
            Opcode::Input => "in",
            Opcode::Output => "out",
            Opcode::JumpIfTrue => "jnz",
            Opcode::JumpIfFalse => "jz",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::AdjustRelativeBase => "arb",
            Opcode::Halt => "halt",
        }
    }

    /// Index of the parameter this opcode writes to, if any
    pub fn write_param(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => Some(3),
            Opcode::Input => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// How a parameter's value is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Operand is an address
    #[default]
    Position,
    /// Operand is a literal value
    Immediate,
    /// Operand is an address offset by the relative base
    Relative,
}

impl Mode {
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }

    pub fn digit(self) -> i64 {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
            Mode::Relative => 2,
        }
    }
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// One mode per parameter position; positions past the arity stay `Position`
    pub modes: [Mode; 3],
}

impl Instruction {
    pub fn new(opcode: Opcode, modes: [Mode; 3]) -> Self {
        Self { opcode, modes }
    }

    /// Mode of the 1-indexed parameter `param`
    pub fn mode(&self, param: usize) -> Mode {
        self.modes[param - 1]
    }

    /// Rebuild the instruction word this instruction decodes from
    pub fn encode(&self) -> i64 {
        self.modes
            .iter()
            .take(self.opcode.arity())
            .enumerate()
            .fold(self.opcode.code(), |word, (k, mode)| {
                word + mode.digit() * 10i64.pow(k as u32 + 2)
            })
    }
}

/// Generations of the machine, from plain arithmetic up to relative addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionSet {
    /// Add, multiply and halt; position mode only
    Arithmetic,
    /// Adds input and output plus immediate mode
    Io,
    /// Adds conditional jumps and comparisons
    Branching,
    /// Adds relative-base adjustment and relative mode
    #[default]
    Full,
}

impl InstructionSet {
    pub fn supports_opcode(self, opcode: Opcode) -> bool {
        let required = match opcode {
            Opcode::Add | Opcode::Multiply | Opcode::Halt => InstructionSet::Arithmetic,
            Opcode::Input | Opcode::Output => InstructionSet::Io,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse | Opcode::LessThan | Opcode::Equals => {
                InstructionSet::Branching
            }
            Opcode::AdjustRelativeBase => InstructionSet::Full,
        };
        self >= required
    }

    pub fn supports_mode(self, mode: Mode) -> bool {
        let required = match mode {
            Mode::Position => InstructionSet::Arithmetic,
            Mode::Immediate => InstructionSet::Io,
            Mode::Relative => InstructionSet::Full,
        };
        self >= required
    }
}

impl std::str::FromStr for InstructionSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arithmetic" => Ok(InstructionSet::Arithmetic),
            "io" => Ok(InstructionSet::Io),
            "branching" => Ok(InstructionSet::Branching),
            "full" => Ok(InstructionSet::Full),
            other => Err(format!("unknown instruction set '{}'", other)),
        }
    }
}

/// Execution state of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    Halted,
    /// A fault was returned; terminal like `Halted`
    Faulted,
}

/// Result of executing a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction completed and the machine can continue
    Continue,
    /// The machine is halted
    Halted,
}
