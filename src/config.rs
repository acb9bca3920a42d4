//! Machine configuration
//!
//! Settings can come from a JSON file, from `INTCODE_*` environment variables
//! and from command-line flags, applied in that order.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::vm::{InstructionSet, Memory, VMError, DEFAULT_CAPACITY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Words of memory to allocate; `None` sizes memory to the program
    pub memory_size: Option<usize>,

    /// Capacity of each blocking I/O queue
    pub queue_capacity: usize,

    pub instruction_set: InstructionSet,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: None,
            queue_capacity: DEFAULT_CAPACITY,
            instruction_set: InstructionSet::Full,
        }
    }
}

impl MachineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Override fields from `INTCODE_MEMORY_SIZE`, `INTCODE_QUEUE_CAPACITY`
    /// and `INTCODE_INSTRUCTION_SET` when they are set
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = env::var("INTCODE_MEMORY_SIZE") {
            self.memory_size = Some(parse_var("INTCODE_MEMORY_SIZE", &value)?);
        }
        if let Ok(value) = env::var("INTCODE_QUEUE_CAPACITY") {
            self.queue_capacity = parse_var("INTCODE_QUEUE_CAPACITY", &value)?;
        }
        if let Ok(value) = env::var("INTCODE_INSTRUCTION_SET") {
            self.instruction_set = parse_var("INTCODE_INSTRUCTION_SET", &value)?;
        }
        Ok(self)
    }

    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = Some(size);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_instruction_set(mut self, set: InstructionSet) -> Self {
        self.instruction_set = set;
        self
    }

    pub fn validate(&self) -> Result<(), VMError> {
        if self.queue_capacity == 0 {
            return Err(VMError::Configuration(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the initial memory image for `program` under this configuration
    pub fn memory_for(&self, program: &[i64]) -> Result<Memory, VMError> {
        match self.memory_size {
            Some(size) => Memory::new(program, size),
            None => Ok(Memory::from_program(program)),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.memory_size, None);
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.instruction_set, InstructionSet::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MachineConfig =
            serde_json::from_str(r#"{ "memory_size": 8192, "instruction_set": "branching" }"#)
                .unwrap();
        assert_eq!(config.memory_size, Some(8192));
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.instruction_set, InstructionSet::Branching);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "queue_capacity": 8 }}"#).unwrap();
        let config = MachineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.queue_capacity, 8);
    }

    #[test]
    fn test_zero_capacity_is_invalid() {
        let config = MachineConfig::default().with_queue_capacity(0);
        assert!(matches!(config.validate(), Err(VMError::Configuration(_))));
    }

    #[test]
    fn test_memory_for() {
        let program = [1, 0, 0, 0, 99];
        let exact = MachineConfig::default().memory_for(&program).unwrap();
        assert_eq!(exact.len(), 5);

        let padded = MachineConfig::default()
            .with_memory_size(64)
            .memory_for(&program)
            .unwrap();
        assert_eq!(padded.len(), 64);

        let too_small = MachineConfig::default()
            .with_memory_size(3)
            .memory_for(&program);
        assert!(matches!(too_small, Err(VMError::MemoryTooSmall { .. })));
    }
}
