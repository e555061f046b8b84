// Command-line front end tests

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use test_log::test;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("agic-cli-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_compile_with_options() {
    let dir = scratch_dir("options");
    fs::write(dir.join("room.lgc"), "if (said(\"look\")) { print(\"A room.\"); }\nv1 = START;\n").unwrap();
    fs::write(dir.join("words.txt"), "* test words\n10 look\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_agic"))
        .arg("-D")
        .arg("START=4")
        .arg("--dictionary")
        .arg(dir.join("words.txt"))
        .arg("--words-out")
        .arg(dir.join("words.tok"))
        .arg("-o")
        .arg(dir.join("room.agl"))
        .arg(dir.join("room.lgc"))
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let resource = fs::read(dir.join("room.agl")).unwrap();
    let code_len = u16::from_le_bytes([resource[0], resource[1]]) as usize;
    assert_eq!(
        &resource[2..2 + code_len],
        &[0xFF, 0x0E, 0x01, 0x0A, 0x00, 0xFF, 0x02, 0x00, 0x65, 0x01, 0x03, 0x01, 0x04, 0x00]
    );
    assert_eq!(resource[2 + code_len], 1);
    assert!(resource.ends_with(b"A room.\0"));

    let words = fs::read(dir.join("words.tok")).unwrap();
    assert_eq!(words.len(), 52 + 7 + 1);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_compile_error_exit_status() {
    let dir = scratch_dir("error");
    fs::write(dir.join("bad.lgc"), "goto nowhere;\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_agic"))
        .arg("-o")
        .arg(dir.join("bad.agl"))
        .arg(dir.join("bad.lgc"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere"));
    assert!(!dir.join("bad.agl").exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unknown_option() {
    let output = Command::new(env!("CARGO_BIN_EXE_agic"))
        .arg("--frobnicate")
        .arg("x.lgc")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
