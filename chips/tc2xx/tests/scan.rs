// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

mod common;

use common::{background_group, channel, init_module, scan_group, FakeRouter};
use tc2xx::vadc::{
    ChannelId, Emulator, Error, GroupId, RequestSource, ResultRegister, ScanStatus, Vadc,
};

#[test]
fn scan_pass_converts_selected_channels() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);

    let group = vadc.init_group(&scan_group(GroupId::Group3)).unwrap();
    let ch2 = group
        .init_channel(&channel(ChannelId::Channel2, ResultRegister::Result2))
        .unwrap();
    let ch5 = group
        .init_channel(&channel(ChannelId::Channel5, ResultRegister::Result5))
        .unwrap();
    emu.set_input(GroupId::Group3, ChannelId::Channel2, 0x400);
    emu.set_input(GroupId::Group3, ChannelId::Channel5, 0xABC);

    group.set_scan(0b10_0100, 0b10_0100).unwrap();
    assert_eq!(group.scan_status(), ScanStatus::Idle);
    group.start_scan().unwrap();
    assert_eq!(group.scan_status(), ScanStatus::ChannelsPending);

    assert_eq!(emu.run_round(GroupId::Group3), 2);
    assert_eq!(group.scan_status(), ScanStatus::Idle);

    let r5 = group.result(&ch5).unwrap();
    assert!(r5.valid);
    assert!(!r5.overrun);
    assert_eq!(r5.value, 0xABC);
    assert_eq!(r5.channel, ChannelId::Channel5);
    assert_eq!(r5.source, RequestSource::Scan);

    let r2 = group.result(&ch2).unwrap();
    assert!(r2.valid);
    assert_eq!(r2.value, 0x400);

    // Reading consumed both results.
    assert!(!group.result(&ch5).unwrap().valid);
}

#[test]
fn autoscan_pass_skips_masked_channels() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);

    let mut config = scan_group(GroupId::Group3);
    config.scan.autoscan = true;
    let group = vadc.init_group(&config).unwrap();
    assert_eq!(group.master(), GroupId::Group3);
    let ch2 = group
        .init_channel(&channel(ChannelId::Channel2, ResultRegister::Result2))
        .unwrap();
    let ch5 = group
        .init_channel(&channel(ChannelId::Channel5, ResultRegister::Result5))
        .unwrap();
    let ch7 = group
        .init_channel(&channel(ChannelId::Channel7, ResultRegister::Result7))
        .unwrap();
    emu.set_input(GroupId::Group3, ChannelId::Channel2, 0x123);
    emu.set_input(GroupId::Group3, ChannelId::Channel5, 0x456);
    emu.set_input(GroupId::Group3, ChannelId::Channel7, 0x789);
    group.configure_wait_for_read(&ch2, true).unwrap();
    group.configure_wait_for_read(&ch5, true).unwrap();

    group.set_scan(0b10_0100, 0b10_0100).unwrap();
    group.start_scan().unwrap();

    // The reloaded pass waits until the first one has been read.
    assert_eq!(emu.run_round(GroupId::Group3), 2);
    assert_eq!(group.scan_status(), ScanStatus::ChannelsPending);

    let r2 = group.result(&ch2).unwrap();
    let r5 = group.result(&ch5).unwrap();
    assert!(r2.valid && r5.valid);
    assert!(!r2.overrun && !r5.overrun);
    assert_eq!((r2.value, r5.value), (0x123, 0x456));
    assert!(!group.peek_result(&ch7).unwrap().valid);
    assert!(!group.result(&ch7).unwrap().valid);

    assert_eq!(emu.run_round(GroupId::Group3), 2);
    assert_eq!(group.result(&ch5).unwrap().value, 0x456);
    assert!(!group.result(&ch7).unwrap().valid);
}

#[test]
fn highest_channel_is_scanned_first() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);

    let group = vadc.init_group(&scan_group(GroupId::Group0)).unwrap();
    let low = group
        .init_channel(&channel(ChannelId::Channel1, ResultRegister::Result0))
        .unwrap();
    group
        .init_channel(&channel(ChannelId::Channel9, ResultRegister::Result0))
        .unwrap();
    group.set_scan(0x0202, 0xFFFF).unwrap();
    group.start_scan().unwrap();
    emu.run_round(GroupId::Group0);

    let result = group.result(&low).unwrap();
    assert_eq!(result.channel, ChannelId::Channel1);
    assert!(result.overrun);
}

#[test]
fn mask_limits_the_update() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group2)).unwrap();

    group.set_scan(0b0110, 0b0110).unwrap();
    group.set_scan(0b1000, 0b1100).unwrap();
    assert_eq!(group.scan_select(), 0b1010);
    group.set_scan(0xFFFF, 0).unwrap();
    assert_eq!(group.scan_select(), 0b1010);
}

#[test]
fn autoscan_reloads_after_each_pass() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);

    let mut config = scan_group(GroupId::Group1);
    config.scan.autoscan = true;
    let group = vadc.init_group(&config).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel2, ResultRegister::Result2))
        .unwrap();
    group
        .init_channel(&channel(ChannelId::Channel5, ResultRegister::Result5))
        .unwrap();
    group.set_scan(0b10_0100, 0b10_0100).unwrap();
    group.start_scan().unwrap();

    assert_eq!(emu.run_round(GroupId::Group1), 4);
    assert_eq!(group.scan_status(), ScanStatus::ChannelsPending);

    group.set_autoscan(false).unwrap();
    group.stop_scan().unwrap();
    assert_eq!(group.scan_status(), ScanStatus::Idle);
    assert_eq!(emu.run_round(GroupId::Group1), 0);
}

#[test]
fn background_and_priority_channels_do_not_mix() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group4)).unwrap();

    let mut bg = channel(ChannelId::Channel4, ResultRegister::Result4);
    bg.background = true;
    group.init_channel(&bg).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel6, ResultRegister::Result6))
        .unwrap();

    assert_eq!(group.set_scan(1 << 4, 1 << 4), Err(Error::ChannelConflict));
    assert_eq!(group.scan_select(), 0);
    group.set_scan(1 << 6, 1 << 6).unwrap();

    assert_eq!(
        vadc.set_background_scan(&group, 1 << 6, 1 << 6),
        Err(Error::ChannelConflict)
    );
    vadc.set_background_scan(&group, 1 << 4, 1 << 4).unwrap();
    assert_eq!(vadc.background_scan_select(GroupId::Group4), 1 << 4);
}

#[test]
fn background_scan_fills_the_global_result() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&background_group(GroupId::Group6)).unwrap();

    let mut config = channel(ChannelId::Channel7, ResultRegister::Result1);
    config.background = true;
    config.global_result = true;
    let ch7 = group.init_channel(&config).unwrap();
    assert!(ch7.uses_global_result());

    emu.set_input(GroupId::Group6, ChannelId::Channel7, 0x5A5);
    vadc.set_background_scan(&group, 1 << 7, 1 << 7).unwrap();
    vadc.start_background_scan();
    assert_eq!(vadc.background_scan_status(), ScanStatus::ChannelsPending);

    assert_eq!(emu.run(1), 1);
    assert_eq!(vadc.background_scan_status(), ScanStatus::Idle);

    let result = group.result(&ch7).unwrap();
    assert!(result.valid);
    assert_eq!(result.value, 0x5A5);
    assert_eq!(result.group, Some(GroupId::Group6));
    assert_eq!(result.source, RequestSource::Background);
    assert!(!vadc.global_result().valid);
}
