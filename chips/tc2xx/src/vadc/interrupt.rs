// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Service request routing and event dispatch.
//!
//! Every event flag of a group has a 4-bit node pointer. Pointers 0-3 select
//! the group's own service request lines, 4-7 the four lines shared by the
//! groups of the same domain (the common group). Module-wide events (the
//! background source and the global result) always use common group 0.

use super::group::Group;
use super::registers::{
    self, node_pointer, with_node_pointer, EVFLAG, GLOBEFLAG, GLOBEVNP, GLOBRCR, RCR, SEFLAG,
    SEVNP, SRCMR, CHANNEL_COUNT, RESULT_COUNT,
};
use super::result::ResultSlot;
use super::{Channel, ChannelId, Error, GroupId, RequestSource, ResultRegister, Vadc};
use crate::hil::ServiceProvider;

/// Node pointer value of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceNode {
    Group0 = 0,
    Group1 = 1,
    Group2 = 2,
    Group3 = 3,
    Shared0 = 4,
    Shared1 = 5,
    Shared2 = 6,
    Shared3 = 7,
}

impl ServiceNode {
    pub const fn pointer(self) -> u32 {
        self as u32
    }

    pub(crate) fn from_pointer(pointer: u32) -> ServiceNode {
        match pointer & 0x7 {
            0 => ServiceNode::Group0,
            1 => ServiceNode::Group1,
            2 => ServiceNode::Group2,
            3 => ServiceNode::Group3,
            4 => ServiceNode::Shared0,
            5 => ServiceNode::Shared1,
            6 => ServiceNode::Shared2,
            _ => ServiceNode::Shared3,
        }
    }

    /// Line an event of `group` pointing at this node is delivered on.
    pub fn request_for(self, group: GroupId) -> ServiceRequest {
        let pointer = self.pointer() as u8;
        if pointer < 4 {
            ServiceRequest::Group {
                group,
                index: pointer,
            }
        } else {
            ServiceRequest::Common {
                cluster: group.domain() as u8,
                index: pointer - 4,
            }
        }
    }

    /// Line a module-wide event pointing at this node is delivered on.
    pub fn global_request(self) -> ServiceRequest {
        ServiceRequest::Common {
            cluster: 0,
            index: (self.pointer() % 4) as u8,
        }
    }
}

/// One VADC service request line at the interrupt router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceRequest {
    /// Group specific line `index` (0-3).
    Group { group: GroupId, index: u8 },
    /// Line `index` (0-3) shared by the groups of domain `cluster`.
    Common { cluster: u8, index: u8 },
}

/// Interrupt routing of one event. Priority 0 leaves the event polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptBinding {
    pub priority: u8,
    pub target: ServiceProvider,
    pub node: ServiceNode,
}

impl InterruptBinding {
    /// Disabled, CPU0, group node 0.
    pub const fn new() -> InterruptBinding {
        InterruptBinding {
            priority: 0,
            target: ServiceProvider::Cpu0,
            node: ServiceNode::Group0,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.priority > 0
    }
}

impl Default for InterruptBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl Group<'_, '_> {
    pub(crate) fn bind_channel_event(&self, channel: &Channel, binding: &InterruptBinding) {
        let g = self.id.index();
        let c = channel.id().index();
        let bus = self.vadc.bus;
        let reg = registers::cevnp(g, c / 8);
        reg.set(bus, with_node_pointer(reg.get(bus), c, binding.node.pointer()));
        registers::cefclr(g).write(bus, EVFLAG::EV.val(1 << c));
        self.install(binding.node.request_for(self.id), binding);
    }

    pub(crate) fn bind_result_event(&self, channel: &Channel, binding: &InterruptBinding) {
        let bus = self.vadc.bus;
        if channel.uses_global_result() {
            registers::globrcr().modify(bus, GLOBRCR::SRGEN::SET);
            registers::globevnp().modify(bus, GLOBEVNP::REV0NP.val(binding.node.pointer()));
            registers::globeflag().write(bus, GLOBEFLAG::REVGLBCLR::SET);
            self.install(binding.node.global_request(), binding);
        } else {
            let g = self.id.index();
            let r = channel.result_register().index();
            registers::rcr(g, r).modify(bus, RCR::SRGEN::SET);
            let reg = registers::revnp(g, r / 8);
            reg.set(bus, with_node_pointer(reg.get(bus), r, binding.node.pointer()));
            registers::refclr(g).write(bus, EVFLAG::EV.val(1 << r));
            self.install(binding.node.request_for(self.id), binding);
        }
    }

    /// Routes the completion event of a request source and enables it for
    /// the scan sources. Queue entries opt in one by one when added.
    pub fn bind_source_event(
        &self,
        source: RequestSource,
        binding: &InterruptBinding,
    ) -> Result<(), Error> {
        self.check_live()?;
        if !binding.is_enabled() {
            return Ok(());
        }
        let g = self.id.index();
        let bus = self.vadc.bus;
        let pointer = binding.node.pointer();
        match source {
            RequestSource::Queue => {
                registers::sevnp(g).modify(bus, SEVNP::SEV0NP.val(pointer));
                registers::sefclr(g).write(bus, SEFLAG::SEV0::SET);
                self.install(binding.node.request_for(self.id), binding);
            }
            RequestSource::Scan => {
                registers::sevnp(g).modify(bus, SEVNP::SEV1NP.val(pointer));
                registers::sefclr(g).write(bus, SEFLAG::SEV1::SET);
                registers::asmr(g).modify(bus, SRCMR::ENSI::SET);
                self.install(binding.node.request_for(self.id), binding);
            }
            RequestSource::Background => {
                registers::globevnp().modify(bus, GLOBEVNP::SEV0NP.val(pointer));
                registers::globeflag().write(bus, GLOBEFLAG::SEVGLBCLR::SET);
                registers::brsmr().modify(bus, SRCMR::ENSI::SET);
                self.install(binding.node.global_request(), binding);
            }
        }
        Ok(())
    }

    pub(crate) fn read_binding(&self, node: ServiceNode) -> InterruptBinding {
        match self.vadc.router.installed(node.request_for(self.id)) {
            Some((priority, target)) => InterruptBinding {
                priority,
                target,
                node,
            },
            None => InterruptBinding {
                node,
                ..InterruptBinding::new()
            },
        }
    }

    fn install(&self, request: ServiceRequest, binding: &InterruptBinding) {
        if !binding.is_enabled() {
            return;
        }
        self.vadc
            .router
            .install_handler(request, binding.priority, binding.target);
        self.vadc.router.enable(request);
    }
}

impl Vadc<'_> {
    /// Services one VADC line: every event flag routed to `request` is
    /// cleared and reported to the client. Results are read out, which
    /// clears their valid flags.
    pub fn handle_interrupt(&self, request: ServiceRequest) {
        match request {
            ServiceRequest::Group { group, index } => self.service_group(group, index as u32),
            ServiceRequest::Common { cluster, index } => {
                for id in GroupId::ALL {
                    if id.domain() == cluster as usize {
                        self.service_group(id, 4 + index as u32);
                    }
                }
                if cluster == 0 {
                    self.service_global(index as u32);
                }
            }
        }
    }

    fn service_group(&self, id: GroupId, pointer: u32) {
        let g = id.index();
        let client = self.client.get();

        let ceflag = registers::ceflag(g).read(self.bus, EVFLAG::EV);
        for c in 0..CHANNEL_COUNT {
            let routed = node_pointer(registers::cevnp(g, c / 8).get(self.bus), c) == pointer;
            if ceflag & (1 << c) != 0 && routed {
                registers::cefclr(g).write(self.bus, EVFLAG::EV.val(1 << c));
                if let (Some(client), Some(channel)) = (client, ChannelId::from_index(c)) {
                    client.channel_event(id, channel);
                }
            }
        }

        let reflag = registers::reflag(g).read(self.bus, EVFLAG::EV);
        for r in 0..RESULT_COUNT {
            let routed = node_pointer(registers::revnp(g, r / 8).get(self.bus), r) == pointer;
            if reflag & (1 << r) != 0 && routed {
                registers::refclr(g).write(self.bus, EVFLAG::EV.val(1 << r));
                if let Some(register) = ResultRegister::from_index(r) {
                    let result = self.take_group_result(id, register);
                    if let Some(client) = client {
                        client.result_ready(ResultSlot::Group(id, register), result);
                    }
                }
            }
        }

        let seflag = registers::seflag(g).extract(self.bus);
        let sevnp = registers::sevnp(g).extract(self.bus);
        if seflag.is_set(SEFLAG::SEV0) && sevnp.read(SEVNP::SEV0NP) == pointer {
            registers::sefclr(g).write(self.bus, SEFLAG::SEV0::SET);
            if let Some(client) = client {
                client.source_event(Some(id), RequestSource::Queue);
            }
        }
        if seflag.is_set(SEFLAG::SEV1) && sevnp.read(SEVNP::SEV1NP) == pointer {
            registers::sefclr(g).write(self.bus, SEFLAG::SEV1::SET);
            if let Some(client) = client {
                client.source_event(Some(id), RequestSource::Scan);
            }
        }
    }

    fn service_global(&self, index: u32) {
        let client = self.client.get();
        let flags = registers::globeflag().extract(self.bus);
        let evnp = registers::globevnp().extract(self.bus);
        if flags.is_set(GLOBEFLAG::SEVGLB) && evnp.read(GLOBEVNP::SEV0NP) % 4 == index {
            registers::globeflag().write(self.bus, GLOBEFLAG::SEVGLBCLR::SET);
            if let Some(client) = client {
                client.source_event(None, RequestSource::Background);
            }
        }
        if flags.is_set(GLOBEFLAG::REVGLB) && evnp.read(GLOBEVNP::REV0NP) % 4 == index {
            registers::globeflag().write(self.bus, GLOBEFLAG::REVGLBCLR::SET);
            let result = self.take_global_result();
            if let Some(client) = client {
                client.result_ready(ResultSlot::Global, result);
            }
        }
    }
}
