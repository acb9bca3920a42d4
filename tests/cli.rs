use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn write_program(dir: &TempDir, name: &str, source: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join(name);
    fs::write(&path, source)?;
    Ok(path)
}

fn intcode() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("intcode")?;
    cmd.env_remove("INTCODE_MEMORY_SIZE")
        .env_remove("INTCODE_QUEUE_CAPACITY")
        .env_remove("INTCODE_INSTRUCTION_SET");
    Ok(cmd)
}

#[test]
fn test_run_echoes_inputs() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "echo.int", "3,13,3,14,3,15,4,13,4,14,4,15,99,0,0,0\n")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--input")
        .arg("5,-6")
        .arg("--input")
        .arg("7")
        .assert()
        .success()
        .stdout("5\n-6\n7\n");

    Ok(())
}

#[test]
fn test_run_halts_before_reading_every_input() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    // in [0]; out [0]; halt
    let program = write_program(&temp_dir, "once.int", "3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--input")
        .arg("1,2,3,4")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("1\n");

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--line")
        .arg("a much longer line than the program reads")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("97\n");

    Ok(())
}

#[test]
fn test_interactive_numeric_lines() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    // in [0]; out [0]; in [0]; out [0]; halt
    let program = write_program(&temp_dir, "twice.int", "3,0,4,0,3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--interactive")
        .write_stdin("5\n6\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("5\n6\n");

    // Scripted inputs go first, then terminal lines.
    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--input")
        .arg("7")
        .arg("--interactive")
        .write_stdin("8\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("7\n8\n");

    Ok(())
}

#[test]
fn test_interactive_skips_invalid_lines() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "twice.int", "3,0,4,0,3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--interactive")
        .write_stdin("5\nfive\n\n6\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("5\n6\n")
        .stderr(predicate::str::contains("Invalid input"));

    Ok(())
}

#[test]
fn test_interactive_end_of_input_closes_queue() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "twice.int", "3,0,4,0,3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--interactive")
        .write_stdin("5\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stdout("5\n")
        .stderr(predicate::str::contains("Input exhausted"));

    Ok(())
}

#[test]
fn test_interactive_stops_when_machine_halts() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "once.int", "3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--interactive")
        .write_stdin("1\n2\n3\n4\n5\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout("1\n");

    Ok(())
}

#[test]
fn test_interactive_ascii_lines() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    // Echo three characters, then halt
    let program = write_program(&temp_dir, "echo3.int", "3,0,4,0,3,0,4,0,3,0,4,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--ascii")
        .arg("--interactive")
        .write_stdin("Hi\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Hi\n"));

    Ok(())
}

#[test]
fn test_run_quine_with_extended_memory() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let source = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
    let program = write_program(&temp_dir, "quine.int", source)?;

    let expected = source.replace(',', "\n") + "\n";
    intcode()?
        .arg("--memory")
        .arg("128")
        .arg("run")
        .arg(&program)
        .assert()
        .success()
        .stdout(expected);

    // Without scratch memory the program reads past the end.
    intcode()?
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    Ok(())
}

#[test]
fn test_run_json_report() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "out.int", "104,1,104,2,99")?;

    let output = intcode()?.arg("run").arg(&program).arg("--json").output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["outputs"], serde_json::json!([1, 2]));
    assert_eq!(report["last_output"], serde_json::json!(2));
    assert_eq!(report["steps"], serde_json::json!(3));
    assert_eq!(report["pc"], serde_json::json!(4));

    Ok(())
}

#[test]
fn test_run_patch_and_ascii() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    // out #72; out #105; out #10; halt, with the first output patched to 'h'
    let program = write_program(&temp_dir, "hi.int", "104,72,104,105,104,10,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--ascii")
        .arg("--patch")
        .arg("1=104")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("hi\n"));

    Ok(())
}

#[test]
fn test_run_line_input() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    // in [9]; out [9]; in [9]; out [9]; halt
    let program = write_program(&temp_dir, "chars.int", "3,9,4,9,3,9,4,9,99,0")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--line")
        .arg("A")
        .assert()
        .success()
        .stdout("65\n10\n");

    Ok(())
}

#[test]
fn test_restricted_instruction_set_faults() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "jump.int", "1,0,0,0,5,0,0,99")?;

    intcode()?
        .arg("--set")
        .arg("arithmetic")
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fault at pc 4"))
        .stderr(predicate::str::contains("Illegal opcode 5"));

    Ok(())
}

#[test]
fn test_missing_input_is_reported() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "in.int", "3,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input exhausted"));

    Ok(())
}

#[test]
fn test_invalid_program_text() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "bad.int", "1,0,zero,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid token 'zero' at position 2"));

    Ok(())
}

#[test]
fn test_amplify_linear_and_feedback() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let linear = write_program(
        &temp_dir,
        "linear.int",
        "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0",
    )?;
    let feedback = write_program(
        &temp_dir,
        "feedback.int",
        "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5",
    )?;

    intcode()?
        .arg("amplify")
        .arg(&linear)
        .arg("--phases")
        .arg("4,3,2,1,0")
        .assert()
        .success()
        .stdout("43210\n");

    intcode()?
        .arg("amplify")
        .arg(&feedback)
        .arg("--phases")
        .arg("9,8,7,6,5")
        .arg("--feedback")
        .assert()
        .success()
        .stdout("139629729\n");

    intcode()?
        .arg("amplify")
        .arg(&linear)
        .arg("--phases")
        .arg("0,1,2,3,4")
        .arg("--search")
        .assert()
        .success()
        .stdout(predicate::str::contains("43210"))
        .stdout(predicate::str::contains("phases: 4,3,2,1,0"));

    Ok(())
}

#[test]
fn test_config_file_and_env() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "rel.int", "109,200,21101,7,8,0,204,0,99")?;
    let config = temp_dir.path().join("machine.json");
    fs::write(&config, r#"{ "memory_size": 512 }"#)?;

    intcode()?
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&program)
        .assert()
        .success()
        .stdout("15\n");

    intcode()?
        .env("INTCODE_MEMORY_SIZE", "512")
        .arg("run")
        .arg(&program)
        .assert()
        .success()
        .stdout("15\n");

    intcode()?
        .env("INTCODE_QUEUE_CAPACITY", "none")
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("INTCODE_QUEUE_CAPACITY"));

    Ok(())
}

#[test]
fn test_disasm_listing() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "add.int", "1101,100,-1,4,0,3,5,99")?;

    intcode()?
        .arg("disasm")
        .arg(&program)
        .assert()
        .success()
        .stdout(predicate::str::contains("0000: add #100, #-1 -> [4]"))
        .stdout(predicate::str::contains("0004: .data 0"))
        .stdout(predicate::str::contains("0005: in [5]"))
        .stdout(predicate::str::contains("0007: halt"));

    Ok(())
}
