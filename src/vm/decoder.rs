//! Instruction decoding
//!
//! Maps a raw instruction word to an opcode plus one addressing mode per
//! parameter the opcode consumes. The opcode is `word % 100`; the mode of
//! parameter `k` is the decimal digit `(word / 10^(k+1)) % 10`.

use crate::vm::errors::VMError;
use crate::vm::types::{Instruction, InstructionSet, Mode, Opcode};

/// Decode `word` against the given instruction set
pub fn decode(word: i64, set: InstructionSet) -> Result<Instruction, VMError> {
    let code = word % 100;
    let opcode = Opcode::from_code(code)
        .filter(|op| set.supports_opcode(*op))
        .ok_or(VMError::IllegalOpcode { opcode: code })?;

    let mut modes = [Mode::Position; 3];
    let mut divisor = 100;
    for (k, slot) in modes.iter_mut().enumerate().take(opcode.arity()) {
        let digit = (word / divisor) % 10;
        *slot = Mode::from_digit(digit)
            .filter(|mode| set.supports_mode(*mode))
            .ok_or(VMError::IllegalMode {
                mode: digit,
                param: k + 1,
            })?;
        divisor *= 10;
    }

    if let Some(param) = opcode.write_param() {
        if modes[param - 1] == Mode::Immediate {
            return Err(VMError::ImmediateWrite { param });
        }
    }

    Ok(Instruction::new(opcode, modes))
}
