// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

mod common;

use common::{channel, init_module, scan_group, FakePin, FakeRouter};
use tc2xx::hil::{OutputMode, PadDriver};
use tc2xx::vadc::{
    ChannelId, EmuxCoding, EmuxConfig, EmuxInterface, EmuxMode, EmuxPinConfig, Emulator, Error,
    GroupId, InputClassConfig, Resolution, ResultRegister, Vadc,
};

fn emux_on(group: GroupId, channel: ChannelId, mode: EmuxMode, start: u8) -> EmuxConfig {
    let mut config = EmuxConfig::new();
    config.group = group;
    config.channels = channel.index() as u16;
    config.mode = mode;
    config.start_select = start;
    config
}

#[test]
fn steady_select_drives_gray_coded_pins() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group4)).unwrap();
    let ch = group
        .init_channel(&channel(ChannelId::Channel6, ResultRegister::Result6))
        .unwrap();

    let pins = [FakePin::default(), FakePin::default()];
    let pin_configs = [
        EmuxPinConfig {
            pin: &pins[0],
            mode: OutputMode::PushPull,
            driver: PadDriver::CmosAutomotiveSpeed1,
        },
        EmuxPinConfig {
            pin: &pins[1],
            mode: OutputMode::PushPull,
            driver: PadDriver::CmosAutomotiveSpeed1,
        },
    ];
    let mut config = emux_on(GroupId::Group4, ChannelId::Channel6, EmuxMode::Steady, 5);
    config.coding = EmuxCoding::Gray;
    vadc.init_external_multiplexer(&config, &pin_configs).unwrap();
    for pin in &pins {
        assert_eq!(
            pin.configured.get(),
            Some((OutputMode::PushPull, PadDriver::CmosAutomotiveSpeed1))
        );
    }

    assert_eq!(group.emux_select(), 5);
    assert_eq!(emu.emux_output(EmuxInterface::Interface0), 7);

    emu.set_input(GroupId::Group4, ChannelId::Channel6, 0x123);
    emu.set_emux_input(GroupId::Group4, 5, 0x777);
    group.set_scan(1 << 6, 1 << 6).unwrap();
    group.start_scan().unwrap();
    assert_eq!(emu.run_round(GroupId::Group4), 1);
    let result = group.result(&ch).unwrap();
    assert_eq!(result.value, 0x777);
    assert_eq!(result.emux, 5);
    assert_eq!(group.emux_select(), 5);
}

#[test]
fn sequence_counts_down_then_reloads() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group1)).unwrap();
    let ch = group
        .init_channel(&channel(ChannelId::Channel3, ResultRegister::Result0))
        .unwrap();
    vadc.init_external_multiplexer(
        &emux_on(GroupId::Group1, ChannelId::Channel3, EmuxMode::Sequence, 2),
        &[],
    )
    .unwrap();
    for select in 0..3 {
        emu.set_emux_input(GroupId::Group1, select, 0x100 * (u16::from(select) + 1));
    }
    group.set_scan(1 << 3, 1 << 3).unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        group.start_scan().unwrap();
        assert_eq!(emu.run_round(GroupId::Group1), 1);
        let result = group.result(&ch).unwrap();
        seen.push((result.emux, result.value));
    }
    assert_eq!(seen, [(2, 0x300), (1, 0x200), (0, 0x100), (2, 0x300)]);
}

#[test]
fn other_channels_ignore_the_multiplexer() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group2)).unwrap();
    let plain = group
        .init_channel(&channel(ChannelId::Channel1, ResultRegister::Result1))
        .unwrap();
    vadc.init_external_multiplexer(
        &emux_on(GroupId::Group2, ChannelId::Channel0, EmuxMode::Sequence, 3),
        &[],
    )
    .unwrap();
    emu.set_input(GroupId::Group2, ChannelId::Channel1, 0x0A5);
    emu.set_emux_input(GroupId::Group2, 3, 0xFFF);

    group.set_scan(1 << 1, 1 << 1).unwrap();
    group.start_scan().unwrap();
    emu.run_round(GroupId::Group2);
    assert_eq!(group.result(&plain).unwrap().value, 0x0A5);
    assert_eq!(group.emux_select(), 3);
}

#[test]
fn software_select_and_limits() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group0)).unwrap();

    let mut config = emux_on(GroupId::Group0, ChannelId::Channel0, EmuxMode::SoftwareControl, 8);
    assert_eq!(
        vadc.init_external_multiplexer(&config, &[]),
        Err(Error::ConfigurationInfeasible)
    );
    config.start_select = 1;
    config.interface = EmuxInterface::Interface1;
    let pins: [FakePin; 4] = Default::default();
    let pin_configs = pins.each_ref().map(|pin| EmuxPinConfig {
        pin,
        mode: OutputMode::PushPull,
        driver: PadDriver::CmosAutomotiveSpeed1,
    });
    assert_eq!(
        vadc.init_external_multiplexer(&config, &pin_configs),
        Err(Error::ConfigurationInfeasible)
    );
    assert!(pins.iter().all(|pin| pin.configured.get().is_none()));

    vadc.init_external_multiplexer(&config, &pin_configs[..3]).unwrap();
    assert_eq!(emu.emux_output(EmuxInterface::Interface1), 1);
    assert!(pins[3].configured.get().is_none());

    group.set_emux_select(6).unwrap();
    assert_eq!(group.emux_select(), 6);
    assert_eq!(emu.emux_output(EmuxInterface::Interface1), 6);
    assert_eq!(group.set_emux_select(9), Err(Error::ConfigurationInfeasible));
    assert_eq!(group.emux_select(), 6);
}

#[test]
fn multiplexed_conversions_use_the_emux_class() {
    let emu = Emulator::new();
    let router = FakeRouter::new();
    let vadc = Vadc::new(&emu, &router);
    init_module(&vadc);
    let group = vadc.init_group(&scan_group(GroupId::Group6)).unwrap();
    let eight_bit = InputClassConfig {
        resolution: Resolution::Bits8,
        sample_time_ns: 1_000,
    };
    assert_eq!(
        group.set_emux_input_class(2, &eight_bit),
        Err(Error::ConfigurationInfeasible)
    );
    group.set_emux_input_class(0, &eight_bit).unwrap();

    let muxed = group
        .init_channel(&channel(ChannelId::Channel2, ResultRegister::Result2))
        .unwrap();
    let plain = group
        .init_channel(&channel(ChannelId::Channel3, ResultRegister::Result3))
        .unwrap();
    vadc.init_external_multiplexer(
        &emux_on(GroupId::Group6, ChannelId::Channel2, EmuxMode::Steady, 4),
        &[],
    )
    .unwrap();
    emu.set_emux_input(GroupId::Group6, 4, 0x5A5);
    emu.set_input(GroupId::Group6, ChannelId::Channel3, 0x5A5);

    group.set_scan(0b1100, 0b1100).unwrap();
    group.start_scan().unwrap();
    assert_eq!(emu.run_round(GroupId::Group6), 2);
    assert_eq!(group.result(&muxed).unwrap().value, 0x5A0);
    assert_eq!(group.result(&plain).unwrap().value, 0x5A5);
    assert_eq!(
        group.channel_input_class(&plain).resolution,
        Resolution::Bits12
    );
}
