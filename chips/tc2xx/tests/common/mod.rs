// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Shared fixtures: a recording interrupt router and client, plus helpers
//! that bring the converter up on top of the emulator.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use tc2xx::hil::{Client, EmuxPin, InterruptRouter, OutputMode, PadDriver, ServiceProvider};
use tc2xx::vadc::{
    ChannelConfig, ChannelId, ConversionResult, Emulator, GatingMode, GroupConfig, GroupId,
    ModuleConfig, RequestSource, ResultRegister, ResultSlot, ServiceRequest, Vadc,
};

#[derive(Default)]
pub struct FakeRouter {
    pub installed: RefCell<Vec<(ServiceRequest, u8, ServiceProvider)>>,
    pub enabled: RefCell<Vec<ServiceRequest>>,
}

impl FakeRouter {
    pub fn new() -> FakeRouter {
        FakeRouter::default()
    }
}

impl InterruptRouter for FakeRouter {
    fn install_handler(&self, request: ServiceRequest, priority: u8, target: ServiceProvider) {
        let mut installed = self.installed.borrow_mut();
        installed.retain(|(r, _, _)| *r != request);
        installed.push((request, priority, target));
    }

    fn enable(&self, request: ServiceRequest) {
        self.enabled.borrow_mut().push(request);
    }

    fn installed(&self, request: ServiceRequest) -> Option<(u8, ServiceProvider)> {
        self.installed
            .borrow()
            .iter()
            .find(|(r, _, _)| *r == request)
            .map(|(_, priority, target)| (*priority, *target))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Channel(GroupId, ChannelId),
    Result(ResultSlot, ConversionResult),
    Source(Option<GroupId>, RequestSource),
}

#[derive(Default)]
pub struct RecordingClient {
    pub events: RefCell<Vec<Event>>,
}

impl RecordingClient {
    pub fn new() -> RecordingClient {
        RecordingClient::default()
    }

    pub fn take(&self) -> Vec<Event> {
        self.events.take()
    }
}

impl Client for RecordingClient {
    fn channel_event(&self, group: GroupId, channel: ChannelId) {
        self.events.borrow_mut().push(Event::Channel(group, channel));
    }

    fn result_ready(&self, slot: ResultSlot, result: ConversionResult) {
        self.events.borrow_mut().push(Event::Result(slot, result));
    }

    fn source_event(&self, group: Option<GroupId>, source: RequestSource) {
        self.events.borrow_mut().push(Event::Source(group, source));
    }
}

#[derive(Default)]
pub struct FakePin {
    pub configured: Cell<Option<(OutputMode, PadDriver)>>,
}

impl EmuxPin for FakePin {
    fn configure_output(&self, mode: OutputMode, driver: PadDriver) {
        self.configured.set(Some((mode, driver)));
    }
}

pub fn init_module(vadc: &Vadc) {
    vadc.init_module(&ModuleConfig::new()).unwrap();
}

/// Group config with the queue enabled (wait for start, gate always open).
pub fn queue_group(id: GroupId) -> GroupConfig {
    let mut config = GroupConfig::new(id);
    config.arbiter.queue.enabled = true;
    config.queue.trigger.gating_mode = GatingMode::Always;
    config
}

/// Group config with the scan source enabled (gate always open).
pub fn scan_group(id: GroupId) -> GroupConfig {
    let mut config = GroupConfig::new(id);
    config.arbiter.scan.enabled = true;
    config.scan.trigger.gating_mode = GatingMode::Always;
    config
}

/// Group config with the background slot enabled (gate always open).
pub fn background_group(id: GroupId) -> GroupConfig {
    let mut config = GroupConfig::new(id);
    config.arbiter.background.enabled = true;
    config.background.trigger.gating_mode = GatingMode::Always;
    config
}

pub fn channel(channel: ChannelId, result: ResultRegister) -> ChannelConfig {
    let mut config = ChannelConfig::new(channel);
    config.result_register = result;
    config
}

/// Hands every raised service request to the driver.
pub fn deliver_interrupts(emu: &Emulator, vadc: &Vadc) -> usize {
    let mut delivered = 0;
    while let Some(request) = emu.take_service_request() {
        vadc.handle_interrupt(request);
        delivered += 1;
    }
    delivered
}
