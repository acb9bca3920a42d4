use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use intcode_vm::ascii;
use intcode_vm::config::{ConfigError, MachineConfig};
use intcode_vm::loader::{load_program, parse_program, LoadError};
use intcode_vm::pipeline::{best_phase_setting, Pipeline, Topology};
use intcode_vm::vm::{disassemble, InstructionSet, Machine, QueueWriter, VMError};
use log::{debug, info};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error("VM error: {0}")]
    VM(#[from] VMError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Stored-program integer virtual machine
#[derive(Debug, Parser)]
#[command(name = "intcode", version, about)]
struct Cli {
    #[command(flatten)]
    machine: MachineArgs,

    /// Log machine lifecycle events (set RUST_LOG=trace for every instruction)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct MachineArgs {
    /// Machine configuration file in JSON format
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Words of memory to allocate (defaults to the program length)
    #[arg(long, global = true, value_name = "WORDS")]
    memory: Option<usize>,

    /// Capacity of each I/O queue
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// Instruction set: arithmetic, io, branching or full
    #[arg(long = "set", global = true, value_name = "NAME")]
    instruction_set: Option<InstructionSet>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a program, printing everything it outputs
    Run {
        /// Program file (comma-separated integers)
        program: PathBuf,

        /// Input values, in order (repeatable or comma-separated)
        #[arg(short, long = "input", value_delimiter = ',', allow_negative_numbers = true)]
        inputs: Vec<i64>,

        /// Lines of text sent as character codes after the numeric inputs
        #[arg(long = "line", value_name = "TEXT")]
        lines: Vec<String>,

        /// Render output as text
        #[arg(long)]
        ascii: bool,

        /// Patch memory before running
        #[arg(long = "patch", value_name = "ADDR=VALUE", value_parser = parse_patch)]
        patches: Vec<(usize, i64)>,

        /// Read further input from the terminal
        #[arg(long)]
        interactive: bool,

        /// Print a JSON run report instead of raw output
        #[arg(long)]
        json: bool,
    },

    /// Chain copies of a program, one per phase setting
    Amplify {
        /// Program file (comma-separated integers)
        program: PathBuf,

        /// Phase settings, one per stage
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        phases: Vec<i64>,

        /// Feed the last stage back into the first and run stages concurrently
        #[arg(long)]
        feedback: bool,

        /// Try every ordering of the phases and report the best
        #[arg(long)]
        search: bool,

        /// Value injected into the first stage after its phase
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        seed: i64,
    },

    /// Print a listing of a program
    Disasm {
        /// Program file (comma-separated integers)
        program: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct RunReport {
    outputs: Vec<i64>,
    last_output: Option<i64>,
    steps: u64,
    pc: usize,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = dispatch(cli) {
        eprintln!("{} {}", "Error:".red().bold(), err);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn dispatch(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli.machine)?;
    debug!("machine configuration: {:?}", config);

    match cli.command {
        Command::Run {
            program,
            inputs,
            lines,
            ascii,
            patches,
            interactive,
            json,
        } => {
            let options = RunOptions {
                inputs,
                lines,
                ascii,
                patches,
                interactive,
                json,
            };
            run_program(&program, &config, options)
        }
        Command::Amplify {
            program,
            phases,
            feedback,
            search,
            seed,
        } => amplify(&program, &config, &phases, feedback, search, seed),
        Command::Disasm { program } => {
            let program = load_program(&program)?;
            let memory = config.memory_for(&program)?;
            for line in disassemble(&memory, config.instruction_set) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

fn resolve_config(args: &MachineArgs) -> Result<MachineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => MachineConfig::from_file(path)?,
        None => MachineConfig::default(),
    }
    .apply_env()?;

    if let Some(size) = args.memory {
        config = config.with_memory_size(size);
    }
    if let Some(capacity) = args.capacity {
        config = config.with_queue_capacity(capacity);
    }
    if let Some(set) = args.instruction_set {
        config = config.with_instruction_set(set);
    }
    config.validate()?;
    Ok(config)
}

fn parse_patch(s: &str) -> Result<(usize, i64), String> {
    let (address, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got '{}'", s))?;
    let address = address
        .trim()
        .parse()
        .map_err(|_| format!("invalid address '{}'", address))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{}'", value))?;
    Ok((address, value))
}

struct RunOptions {
    inputs: Vec<i64>,
    lines: Vec<String>,
    ascii: bool,
    patches: Vec<(usize, i64)>,
    interactive: bool,
    json: bool,
}

fn run_program(path: &Path, config: &MachineConfig, options: RunOptions) -> Result<(), AppError> {
    let program = load_program(path)?;
    let (mut machine, port) = Machine::with_config(&program, config)?;
    for (address, value) in &options.patches {
        machine.memory_mut().set(*address, *value)?;
    }

    let (input, mut output) = port.into_parts();
    let mut scripted = options.inputs.clone();
    for line in &options.lines {
        scripted.extend(ascii::encode_line(line));
    }

    let ascii_mode = options.ascii;
    let feeder = if options.interactive {
        thread::spawn(move || feed_interactive(input, scripted, ascii_mode));
        None
    } else {
        Some(thread::spawn(move || feed_scripted(input, scripted)))
    };

    let handle = machine.spawn();

    let mut outputs = Vec::new();
    let stdout = io::stdout();
    while let Some(value) = output.read() {
        if !options.json {
            let mut out = stdout.lock();
            if options.ascii {
                write!(out, "{}", ascii::render(&[value]))?;
            } else {
                writeln!(out, "{}", value)?;
            }
            out.flush()?;
        }
        outputs.push(value);
    }

    let (mut machine, result) = handle
        .join()
        .map_err(|_| AppError::Other("machine thread panicked".to_string()))?;
    // A halted machine keeps its input open; release a feeder still writing.
    machine.close_input();

    if let Some(feeder) = feeder {
        let delivered = feeder
            .join()
            .map_err(|_| AppError::Other("input thread panicked".to_string()))?;
        debug!("{} scripted inputs delivered", delivered);
    }
    result?;

    info!(
        "{}: halted after {} steps with {} outputs",
        machine.id(),
        machine.steps(),
        outputs.len()
    );

    if options.json {
        let report = RunReport {
            last_output: machine.peek(),
            outputs,
            steps: machine.steps(),
            pc: machine.pc(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if options.ascii && !outputs.is_empty() {
        println!();
    }
    Ok(())
}

/// Write the scripted inputs, then close the input queue. Stops early once
/// the machine no longer reads; returns how many values were accepted.
fn feed_scripted(mut input: QueueWriter, scripted: Vec<i64>) -> usize {
    let mut delivered = 0;
    for value in scripted {
        if input.write(value).is_err() {
            return delivered;
        }
        delivered += 1;
    }
    input.close();
    delivered
}

/// Write the scripted inputs, then forward terminal lines until EOF
fn feed_interactive(mut input: QueueWriter, scripted: Vec<i64>, ascii_mode: bool) -> Result<(), AppError> {
    for value in scripted {
        if input.write(value).is_err() {
            return Ok(());
        }
    }

    let mut rl = rustyline::DefaultEditor::new().map_err(|e| AppError::Other(e.to_string()))?;
    loop {
        let line = match rl.readline("") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(AppError::Other(format!("Error reading input: {}", e))),
        };
        let _ = rl.add_history_entry(line.as_str());

        let values = if ascii_mode {
            ascii::encode_line(&line)
        } else if line.trim().is_empty() {
            continue;
        } else {
            match parse_program(&line) {
                Ok(values) => values,
                Err(e) => {
                    eprintln!("{} {}", "Invalid input:".yellow(), e);
                    continue;
                }
            }
        };

        for value in values {
            if input.write(value).is_err() {
                // The machine has stopped reading.
                return Ok(());
            }
        }
    }

    input.close();
    Ok(())
}

fn amplify(
    path: &Path,
    config: &MachineConfig,
    phases: &[i64],
    feedback: bool,
    search: bool,
    seed: i64,
) -> Result<(), AppError> {
    let program = load_program(path)?;
    let topology = if feedback {
        Topology::Feedback
    } else {
        Topology::Linear
    };

    if search {
        let (best, signal) = best_phase_setting(&program, config, topology, phases, seed)?;
        let rendered: Vec<String> = best.iter().map(|p| p.to_string()).collect();
        println!("{}", signal);
        println!("phases: {}", rendered.join(","));
    } else {
        let pipeline = Pipeline::uniform(&program, phases.len(), config.clone())?;
        let signal = pipeline.run(topology, phases, seed)?;
        println!("{}", signal);
    }
    Ok(())
}
