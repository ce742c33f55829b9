// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface specs for the three daemons.

use assert_cmd::Command;

const BINARIES: [&str; 3] = ["wayru-agent", "wayru-collector", "wayru-config"];

#[test]
fn version_flags_print_name_and_version() {
    for binary in BINARIES {
        let assert = Command::cargo_bin(binary).unwrap().arg("--version").assert().success();
        let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        assert!(output.starts_with(binary), "unexpected version line: {output}");
    }
}

#[test]
fn help_mentions_the_config_flag() {
    for binary in BINARIES {
        let assert = Command::cargo_bin(binary).unwrap().arg("--help").assert().success();
        let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        assert!(output.contains("--config"), "{binary} help is missing --config");
    }
}

#[test]
fn unexpected_arguments_fail() {
    for binary in BINARIES {
        Command::cargo_bin(binary).unwrap().arg("--bogus").assert().failure();
    }
}

#[test]
fn disabled_configuration_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disabled.toml");
    std::fs::write(&path, "enabled = false\n").unwrap();

    for binary in BINARIES {
        let assert = Command::cargo_bin(binary)
            .unwrap()
            .args(["--config", path.to_str().unwrap()])
            .assert()
            .success();
        let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        assert!(output.contains("disabled"), "{binary} did not report being disabled");
    }
}
