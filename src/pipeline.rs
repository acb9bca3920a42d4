//! Pipeline composer
//!
//! Wires several machines so that each instance's output becomes the next
//! instance's input. Two topologies are supported:
//!
//! - **Linear**: stages run one after another on the calling thread; each
//!   stage runs to completion and its whole output is handed to the next.
//! - **Feedback**: every stage runs on its own thread, connected by bounded
//!   queues, with the last stage feeding the first. The result is read only
//!   after every stage has been joined.

use log::{debug, info};
use std::collections::VecDeque;
use std::thread;

use crate::config::MachineConfig;
use crate::vm::{queue, Machine, Memory, QueueReader, QueueWriter, VMError};

/// How the stages of a pipeline are connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Linear,
    Feedback,
}

/// An ordered set of machine images to be wired together
#[derive(Debug, Clone)]
pub struct Pipeline {
    images: Vec<Memory>,
    config: MachineConfig,
}

impl Pipeline {
    /// Every stage runs its own copy of `program`
    pub fn uniform(program: &[i64], stages: usize, config: MachineConfig) -> Result<Self, VMError> {
        let image = config.memory_for(program)?;
        Ok(Self::from_images(vec![image; stages], config))
    }

    pub fn from_images(images: Vec<Memory>, config: MachineConfig) -> Self {
        Self { images, config }
    }

    pub fn stages(&self) -> usize {
        self.images.len()
    }

    /// Run with one phase value per stage and return the final signal
    pub fn run(&self, topology: Topology, phases: &[i64], seed: i64) -> Result<i64, VMError> {
        let stage_inputs: Vec<Vec<i64>> = phases.iter().map(|phase| vec![*phase]).collect();
        match topology {
            Topology::Linear => self
                .run_linear(&stage_inputs, seed)?
                .last()
                .copied()
                .ok_or(VMError::NoOutput),
            Topology::Feedback => self.run_feedback(&stage_inputs, seed),
        }
    }

    /// Run stages sequentially; returns everything the last stage emitted
    pub fn run_linear(&self, stage_inputs: &[Vec<i64>], seed: i64) -> Result<Vec<i64>, VMError> {
        self.check_stages(stage_inputs)?;

        let mut carried = vec![seed];
        for (index, (image, initial)) in self.images.iter().zip(stage_inputs).enumerate() {
            let mut input: VecDeque<i64> = initial.iter().copied().collect();
            input.extend(carried.drain(..));

            let mut machine = Machine::with_io(
                image.clone(),
                input,
                Vec::new(),
                self.config.instruction_set,
            )
            .with_id(format!("stage-{}", index));
            machine.run()?;
            carried = machine.into_output();
            debug!("stage-{} emitted {} values", index, carried.len());
        }

        Ok(carried)
    }

    /// Run all stages concurrently in a cycle; returns the last value the
    /// final stage emitted
    pub fn run_feedback(&self, stage_inputs: &[Vec<i64>], seed: i64) -> Result<i64, VMError> {
        self.check_stages(stage_inputs)?;
        let capacity = self.config.queue_capacity;

        // Queue i feeds stage i. Initial values go in before anything runs.
        let mut writers: Vec<QueueWriter> = Vec::with_capacity(self.stages());
        let mut readers: Vec<QueueReader> = Vec::with_capacity(self.stages());
        for (index, initial) in stage_inputs.iter().enumerate() {
            let pending = initial.len() + usize::from(index == 0);
            if pending > capacity {
                return Err(VMError::Configuration(format!(
                    "stage {} needs {} initial values but queue capacity is {}",
                    index, pending, capacity
                )));
            }
            let (writer, reader) = queue(capacity)?;
            for value in initial {
                writer.write(*value)?;
            }
            if index == 0 {
                writer.write(seed)?;
            }
            writers.push(writer);
            readers.push(reader);
        }
        // Stage i writes into queue i + 1; the last stage closes the cycle.
        writers.rotate_left(1);

        let mut machines = self
            .images
            .iter()
            .zip(readers.into_iter().zip(writers))
            .enumerate()
            .map(|(index, (image, (reader, writer)))| {
                Machine::with_io(image.clone(), reader, writer, self.config.instruction_set)
                    .with_id(format!("stage-{}", index))
            })
            .collect::<Vec<_>>();

        debug!("feedback loop wired with {} stages", machines.len());
        let results: Vec<Result<(), VMError>> = thread::scope(|scope| {
            let handles: Vec<_> = machines
                .iter_mut()
                .map(|machine| scope.spawn(move || machine.run()))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut errors: Vec<VMError> = results.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            // Prefer the original fault over neighbours that merely saw a closed queue.
            let origin = errors
                .iter()
                .position(|err| {
                    !matches!(
                        err.root(),
                        VMError::InputExhausted | VMError::OutputDisconnected
                    )
                })
                .unwrap_or(0);
            return Err(errors.swap_remove(origin));
        }

        machines
            .last()
            .and_then(|machine| machine.peek())
            .ok_or(VMError::NoOutput)
    }

    fn check_stages(&self, stage_inputs: &[Vec<i64>]) -> Result<(), VMError> {
        self.config.validate()?;
        if self.images.is_empty() {
            return Err(VMError::Configuration(
                "pipeline needs at least one stage".to_string(),
            ));
        }
        if stage_inputs.len() != self.images.len() {
            return Err(VMError::Configuration(format!(
                "{} stages but {} sets of initial inputs",
                self.images.len(),
                stage_inputs.len()
            )));
        }
        Ok(())
    }
}

/// Try every ordering of `phases` and return the one producing the
/// largest signal
pub fn best_phase_setting(
    program: &[i64],
    config: &MachineConfig,
    topology: Topology,
    phases: &[i64],
    seed: i64,
) -> Result<(Vec<i64>, i64), VMError> {
    let pipeline = Pipeline::uniform(program, phases.len(), config.clone())?;
    let mut best: Option<(Vec<i64>, i64)> = None;

    for ordering in permutations(phases) {
        let signal = pipeline.run(topology, &ordering, seed)?;
        if best.as_ref().map_or(true, |(_, top)| signal > *top) {
            best = Some((ordering, signal));
        }
    }

    let best = best.ok_or(VMError::NoOutput)?;
    info!("best phase setting {:?} -> {}", best.0, best.1);
    Ok(best)
}

/// Lazily yields every ordering of `values` (Heap's algorithm)
pub fn permutations<T: Clone>(values: &[T]) -> Permutations<T> {
    Permutations {
        items: values.to_vec(),
        counters: vec![0; values.len()],
        index: 1,
        started: false,
    }
}

#[derive(Debug, Clone)]
pub struct Permutations<T> {
    items: Vec<T>,
    counters: Vec<usize>,
    index: usize,
    started: bool,
}

impl<T: Clone> Iterator for Permutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(self.items.clone());
        }

        while self.index < self.items.len() {
            let i = self.index;
            if self.counters[i] < i {
                let j = if i % 2 == 0 { 0 } else { self.counters[i] };
                self.items.swap(j, i);
                self.counters[i] += 1;
                self.index = 1;
                return Some(self.items.clone());
            }
            self.counters[i] = 0;
            self.index += 1;
        }

        None
    }
}
