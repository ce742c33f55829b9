// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn events_are_annotated_with_the_gateway_mac() {
    let chunk = "auth_client 11:22:33:44:55:66 granted\ndeauth_client 11:22:33:44:55:66\n";
    let events = format_events(chunk, "AA:BB:CC:DD:EE:FF");
    assert_eq!(
        events,
        vec![
            "auth_client 11:22:33:44:55:66 granted, gatewaymac=AA:BB:CC:DD:EE:FF",
            "deauth_client 11:22:33:44:55:66, gatewaymac=AA:BB:CC:DD:EE:FF",
        ]
    );
}

#[test]
fn blank_lines_are_dropped() {
    assert!(format_events("\n\n  \n", "AA").is_empty());
    assert_eq!(format_events("one\n\ntwo", "AA").len(), 2);
}

#[test]
fn fifo_path_lives_under_the_runtime_dir() {
    let config = AgentConfig { temp_path: PathBuf::from("/tmp"), ..AgentConfig::default() };
    assert_eq!(fifo_path(&config), PathBuf::from("/tmp/wayru-os-services/nds-fifo"));
}

#[test]
fn chunk_reader_treats_eof_as_idle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regular-file");
    std::fs::write(&path, "").unwrap();
    let mut file = std::fs::File::open(&path).unwrap();
    assert!(read_chunk(&mut file).is_none());
}

#[test]
fn chunk_reader_returns_pending_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regular-file");
    std::fs::write(&path, "auth_client x\n").unwrap();
    let mut file = std::fs::File::open(&path).unwrap();
    assert_eq!(read_chunk(&mut file).as_deref(), Some("auth_client x\n"));
}
