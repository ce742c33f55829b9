// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    unknown = { -1, DeviceStatus::Unknown },
    initial = { 0, DeviceStatus::Initial },
    setup_pending = { 1, DeviceStatus::SetupPending },
    setup_approved = { 2, DeviceStatus::SetupApproved },
    mint_pending = { 3, DeviceStatus::MintPending },
    ready = { 4, DeviceStatus::Ready },
    banned = { 5, DeviceStatus::Banned },
)]
fn status_codes_round_trip(code: i64, status: DeviceStatus) {
    assert_eq!(DeviceStatus::from_code(code), status);
    assert_eq!(status.code(), code);
}

#[test]
fn out_of_range_codes_are_unknown() {
    assert_eq!(DeviceStatus::from_code(42), DeviceStatus::Unknown);
    assert_eq!(DeviceStatus::from_code(-7), DeviceStatus::Unknown);
}

#[test]
fn shared_status_starts_unknown() {
    let status = SharedStatus::new();
    assert_eq!(status.get(), DeviceStatus::Unknown);
    status.set(DeviceStatus::Ready);
    assert_eq!(status.get(), DeviceStatus::Ready);
}
