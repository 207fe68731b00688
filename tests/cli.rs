//! Process-level behavior of the `cgd` binary.

use std::process::Command;

#[test]
fn missing_program_prints_usage_and_exits_2() {
    let output = Command::new(env!("CARGO_BIN_EXE_cgd"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cgd -c prog"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn unreadable_config_file_exits_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_cgd"))
        .args(["-c", "/bin/true", "--config", "/nonexistent/cgd.toml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn bind_failure_exits_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_cgd"))
        .args(["-c", "/bin/true", "-a", "not-an-address"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}
