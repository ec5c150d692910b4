// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

mod common;

use common::{channel, init_module, queue_group, scan_group, FakeRouter};
use tc2xx::vadc::{
    ChannelId, Emulator, Error, GatingMode, GroupId, InputSelector, RequestSource, ResultRegister,
    ScanStatus, SignalTarget, TriggerMode, Vadc,
};

fn line(index: u8) -> InputSelector {
    InputSelector::new(index).unwrap()
}

#[test]
fn rising_edge_loads_the_scan() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let mut config = scan_group(GroupId::Group1);
    config.scan.trigger.trigger_mode = TriggerMode::RisingEdge;
    config.scan.trigger.trigger_input = line(5);
    let group = vadc.init_group(&config).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel2, ResultRegister::Result2))
        .unwrap();
    group.set_scan(1 << 2, 1 << 2).unwrap();

    let target = SignalTarget::Group(GroupId::Group1);
    emu.drive_trigger(target, 5, true);
    assert_eq!(group.scan_status(), ScanStatus::ChannelsPending);
    assert_eq!(emu.run_round(GroupId::Group1), 1);

    emu.drive_trigger(target, 5, false);
    assert_eq!(group.scan_status(), ScanStatus::Idle);
    emu.drive_trigger(SignalTarget::Group(GroupId::Group0), 5, true);
    assert_eq!(group.scan_status(), ScanStatus::Idle);
}

#[test]
fn any_edge_fires_both_ways() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let mut config = scan_group(GroupId::Group3);
    config.scan.trigger.trigger_mode = TriggerMode::AnyEdge;
    config.scan.trigger.trigger_input = line(1);
    let group = vadc.init_group(&config).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel0, ResultRegister::Result0))
        .unwrap();
    group.set_scan(1, 1).unwrap();

    let target = SignalTarget::Group(GroupId::Group3);
    for level in [true, false] {
        emu.drive_trigger(target, 1, level);
        assert_eq!(emu.run_round(GroupId::Group3), 1);
    }
    emu.drive_trigger(target, 1, false);
    assert_eq!(emu.run_round(GroupId::Group3), 0);
}

#[test]
fn gate_level_qualifies_requests() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let mut config = scan_group(GroupId::Group2);
    config.scan.trigger.gating_mode = GatingMode::High;
    config.scan.trigger.gating_input = line(2);
    let group = vadc.init_group(&config).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel4, ResultRegister::Result0))
        .unwrap();
    group.set_scan(1 << 4, 1 << 4).unwrap();
    group.start_scan().unwrap();

    assert_eq!(emu.run_round(GroupId::Group2), 0);
    emu.drive_gate(SignalTarget::Group(GroupId::Group2), 2, true);
    assert_eq!(emu.run_round(GroupId::Group2), 1);

    group.start_scan().unwrap();
    group
        .configure_gating(RequestSource::Scan, GatingMode::Low, line(2))
        .unwrap();
    assert_eq!(emu.run_round(GroupId::Group2), 0);
    emu.drive_gate(SignalTarget::Group(GroupId::Group2), 2, false);
    assert_eq!(emu.run_round(GroupId::Group2), 1);
}

#[test]
fn extended_trigger_input_takes_the_gate() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let mut config = scan_group(GroupId::Group0);
    config.scan.trigger.trigger_mode = TriggerMode::RisingEdge;
    config.scan.trigger.trigger_input = InputSelector::EXTENDED;
    config.scan.trigger.gating_mode = GatingMode::High;
    config.scan.trigger.gating_input = line(6);
    let group = vadc.init_group(&config).unwrap();
    group
        .init_channel(&channel(ChannelId::Channel1, ResultRegister::Result1))
        .unwrap();
    group.set_scan(1 << 1, 1 << 1).unwrap();

    let read = group.trigger_config(RequestSource::Scan);
    assert_eq!(read.trigger_input, InputSelector::EXTENDED);
    assert_eq!(read.gating_mode, GatingMode::Always);
    assert_eq!(read.gating_input, line(6));

    assert_eq!(
        group.configure_gating(RequestSource::Scan, GatingMode::High, line(6)),
        Err(Error::GatingAliased)
    );
    group
        .configure_gating(RequestSource::Scan, GatingMode::Always, line(6))
        .unwrap();

    // The edge arrives through the gate input and the gate stays open.
    let target = SignalTarget::Group(GroupId::Group0);
    emu.drive_trigger(target, 15, true);
    assert_eq!(group.scan_status(), ScanStatus::Idle);
    emu.drive_gate(target, 6, true);
    assert_eq!(group.scan_status(), ScanStatus::ChannelsPending);
    emu.drive_gate(target, 6, false);
    assert_eq!(emu.run_round(GroupId::Group0), 1);
}

#[test]
fn runtime_trigger_changes_read_back() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&queue_group(GroupId::Group7)).unwrap();

    group.configure_trigger(RequestSource::Queue, TriggerMode::FallingEdge, line(9)).unwrap();
    let read = group.trigger_config(RequestSource::Queue);
    assert_eq!(read.trigger_mode, TriggerMode::FallingEdge);
    assert_eq!(read.trigger_input, line(9));
    assert_eq!(read.gating_mode, GatingMode::Always);

    group
        .configure_trigger(RequestSource::Queue, TriggerMode::RisingEdge, InputSelector::EXTENDED)
        .unwrap();
    assert_eq!(
        group.configure_gating(RequestSource::Queue, GatingMode::Low, line(0)),
        Err(Error::GatingAliased)
    );
    assert_eq!(group.trigger_config(RequestSource::Queue).gating_mode, GatingMode::Always);
}

#[test]
fn background_trigger_loads_every_group() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let mut config = common::background_group(GroupId::Group4);
    config.background.trigger.trigger_mode = TriggerMode::RisingEdge;
    config.background.trigger.trigger_input = line(8);
    let group = vadc.init_group(&config).unwrap();
    let mut bg = channel(ChannelId::Channel3, ResultRegister::Result3);
    bg.background = true;
    let ch = group.init_channel(&bg).unwrap();
    vadc.set_background_scan(&group, 1 << 3, 1 << 3).unwrap();

    emu.drive_trigger(SignalTarget::Group(GroupId::Group4), 8, true);
    assert_eq!(vadc.background_scan_status(), ScanStatus::Idle);
    emu.drive_trigger(SignalTarget::Background, 8, true);
    assert_eq!(vadc.background_scan_status(), ScanStatus::ChannelsPending);
    assert_eq!(emu.run(1), 1);
    assert_eq!(group.result(&ch).unwrap().source, RequestSource::Background);
}
