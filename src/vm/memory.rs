//! VM Memory
//!
//! A fixed-size, randomly-addressable store of signed integers. Memory is
//! sized once at construction (possibly larger than the loaded program, to
//! give the program scratch space) and never grows during execution.

use std::fmt;

use crate::vm::errors::VMError;

/// Flat word-addressed memory owned by a single machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    /// Copy `program` into a zero-filled memory of `size` words
    pub fn new(program: &[i64], size: usize) -> Result<Self, VMError> {
        if size < program.len() {
            return Err(VMError::MemoryTooSmall {
                requested: size,
                program_len: program.len(),
            });
        }
        let mut cells = vec![0; size];
        cells[..program.len()].copy_from_slice(program);
        Ok(Self { cells })
    }

    /// Memory sized exactly to the program
    pub fn from_program(program: &[i64]) -> Self {
        Self {
            cells: program.to_vec(),
        }
    }

    /// Validate `address` and convert it to an index
    pub fn index(&self, address: i64) -> Result<usize, VMError> {
        if address < 0 {
            return Err(VMError::NegativeAddress { address });
        }
        let index = address as usize;
        if index >= self.cells.len() {
            return Err(VMError::AddressOutOfRange {
                address,
                size: self.cells.len(),
            });
        }
        Ok(index)
    }

    pub fn read(&self, address: i64) -> Result<i64, VMError> {
        let index = self.index(address)?;
        Ok(self.cells[index])
    }

    pub fn write(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        let index = self.index(address)?;
        self.cells[index] = value;
        Ok(())
    }

    /// Read by index, `None` past the end
    pub fn get(&self, index: usize) -> Option<i64> {
        self.cells.get(index).copied()
    }

    /// Patch a cell before or between runs
    pub fn set(&mut self, index: usize, value: i64) -> Result<(), VMError> {
        self.write(index as i64, value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.cells.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", words.join(","))
    }
}
