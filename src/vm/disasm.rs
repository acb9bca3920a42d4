//! Program listings
//!
//! Walks memory from address 0 and renders each decodable instruction, or a
//! data word where decoding fails. Programs that modify themselves or jump
//! into the middle of data are listed as they appear before execution.

use std::fmt;

use crate::vm::decoder::decode;
use crate::vm::memory::Memory;
use crate::vm::types::{Instruction, InstructionSet, Mode};

/// One line of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction {
        address: usize,
        instruction: Instruction,
        operands: Vec<i64>,
    },
    Data {
        address: usize,
        value: i64,
    },
}

pub fn disassemble(memory: &Memory, set: InstructionSet) -> Vec<Line> {
    let words = memory.as_slice();
    let mut lines = Vec::new();
    let mut address = 0;

    while address < words.len() {
        let decoded = decode(words[address], set)
            .ok()
            .filter(|ins| address + ins.opcode.width() <= words.len());

        match decoded {
            Some(instruction) => {
                let width = instruction.opcode.width();
                lines.push(Line::Instruction {
                    address,
                    instruction,
                    operands: words[address + 1..address + width].to_vec(),
                });
                address += width;
            }
            None => {
                lines.push(Line::Data {
                    address,
                    value: words[address],
                });
                address += 1;
            }
        }
    }

    lines
}

fn operand(mode: Mode, value: i64) -> String {
    match mode {
        Mode::Position => format!("[{}]", value),
        Mode::Immediate => format!("#{}", value),
        Mode::Relative => format!("r[{}]", value),
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Data { address, value } => write!(f, "{:04}: .data {}", address, value),
            Line::Instruction {
                address,
                instruction,
                operands,
            } => {
                write!(f, "{:04}: {}", address, instruction.opcode)?;
                let rendered: Vec<String> = operands
                    .iter()
                    .enumerate()
                    .map(|(k, value)| operand(instruction.mode(k + 1), *value))
                    .collect();
                match instruction.opcode.write_param() {
                    Some(param) if rendered.len() == param && param > 1 => {
                        write!(
                            f,
                            " {} -> {}",
                            rendered[..param - 1].join(", "),
                            rendered[param - 1]
                        )
                    }
                    _ if !rendered.is_empty() => write!(f, " {}", rendered.join(", ")),
                    _ => Ok(()),
                }
            }
        }
    }
}
