// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Arbitration rounds and conversions of the emulated converter.

use tock_registers::LocalRegisterCopy;

use super::{Emulator, SignalTarget};
use crate::bus::RegisterBus;
use crate::vadc::arbiter::{ArbitrationRound, RequestSlotPriority, RoundPlan};
use crate::vadc::channel::{BoundarySelect, InputClass, LimitCheck};
use crate::vadc::emux::{self, EmuxMode};
use crate::vadc::interrupt::{ServiceNode, ServiceRequest};
use crate::vadc::module::Resolution;
use crate::vadc::registers::{
    self, node_pointer, ARBCFG, ARBPR, BOUND, CHCTR, EMUXCTR, GLOBEFLAG, GLOBEVNP, GLOBRCR,
    GLOBRES, ICLASS, QENTRY, QMR, RCR, RES, SEFLAG, SEVNP, SRCCTRL, SRCMR, SYNCTR, CHANNEL_COUNT,
    GROUP_COUNT,
};
use crate::vadc::sync;
use crate::vadc::trigger::{self, GatingMode};
use crate::vadc::{GroupId, RequestSource};

const ANALOG_ON: u32 = 3;

/// Where a conversion result lands.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Group(usize),
    Global,
}

enum Service {
    Converted,
    /// The result register still holds an unread result under wait-for-read.
    Stalled,
}

impl Emulator {
    /// Runs one arbitration round of `group` and returns the number of
    /// conversions it performed, synchronized slave conversions excluded.
    ///
    /// A group whose start-up calibration is pending spends the round
    /// finishing it. A group stops early when a wait-for-read result
    /// register blocks the winning request.
    pub fn run_round(&self, group: GroupId) -> usize {
        let g = group.index();
        let arbcfg = registers::arbcfg(g);
        if arbcfg.is_set(&self.regs, ARBCFG::CAL) {
            arbcfg.set(&self.regs, arbcfg.get(&self.regs) & !ARBCFG::CAL::SET.value);
            log::trace!("vadc emulator: group {} calibrated", g);
            return 0;
        }
        if !self.converter_on(group) {
            return 0;
        }

        let length = ArbitrationRound::from_raw(arbcfg.read(&self.regs, ARBCFG::ARBRND));
        let mut plan = RoundPlan::new(length, self.ready_sources(g));
        let mut converted = 0;
        while let Some(source) = plan.next(self.ready_sources(g)) {
            match self.service(g, source) {
                Service::Converted => converted += 1,
                Service::Stalled => break,
            }
        }
        converted
    }

    /// Runs `rounds` arbitration rounds on every group in turn.
    pub fn run(&self, rounds: usize) -> usize {
        let mut converted = 0;
        for _ in 0..rounds {
            for group in GroupId::ALL {
                converted += self.run_round(group);
            }
        }
        converted
    }

    /// A group converts when its own converter is on, or, as a slave, when
    /// the converter of its master is.
    fn converter_on(&self, group: GroupId) -> bool {
        let g = group.index();
        if registers::arbcfg(g).read(&self.regs, ARBCFG::ANONC) == ANALOG_ON {
            return true;
        }
        let stsel = registers::synctr(g).read(&self.regs, SYNCTR::STSEL) as u8;
        match sync::resolve_master_group(group, stsel) {
            Ok(master) if master != group => {
                registers::arbcfg(master.index()).read(&self.regs, ARBCFG::ANONC) == ANALOG_ON
            }
            _ => false,
        }
    }

    fn ready_sources(&self, g: usize) -> [Option<RequestSlotPriority>; 3] {
        let arbpr = registers::arbpr(g).extract(&self.regs);
        let slots = [
            (RequestSource::Queue, ARBPR::ASEN0, ARBPR::PRIO0),
            (RequestSource::Scan, ARBPR::ASEN1, ARBPR::PRIO1),
            (RequestSource::Background, ARBPR::ASEN2, ARBPR::PRIO2),
        ];
        let mut ready = [None; 3];
        for (source, enable, priority) in slots {
            if arbpr.is_set(enable) && self.has_request(g, source) {
                ready[source.slot()] = Some(RequestSlotPriority::from_raw(arbpr.read(priority)));
            }
        }
        ready
    }

    fn gate_open(&self, g: usize, source: RequestSource, engt: u32) -> bool {
        let target = match source {
            RequestSource::Background => SignalTarget::Background,
            _ => SignalTarget::Group(GroupId::ALL[g]),
        };
        let gtsel = trigger::control_register(g, source).read(&self.regs, SRCCTRL::GTSEL);
        GatingMode::from_raw(engt).is_open(self.gate_level(target, gtsel))
    }

    fn has_request(&self, g: usize, source: RequestSource) -> bool {
        match source {
            RequestSource::Queue => {
                let engt = registers::qmr0(g).read(&self.regs, QMR::ENGT);
                let auto_start = registers::arbpr(g).is_set(&self.regs, ARBPR::CSM0);
                let state = self.state.borrow();
                let Some(&head) = state.queues[g].front() else {
                    return false;
                };
                let head = LocalRegisterCopy::<u32, QENTRY::Register>::new(head);
                let armed = if head.is_set(QENTRY::EXTR) {
                    state.queue_event[g]
                } else {
                    auto_start || state.queue_started[g]
                };
                drop(state);
                armed && self.gate_open(g, source, engt)
            }
            RequestSource::Scan => {
                registers::aspnd(g).get(&self.regs) != 0
                    && self.gate_open(g, source, registers::asmr(g).read(&self.regs, SRCMR::ENGT))
            }
            RequestSource::Background => {
                registers::brspnd(g).get(&self.regs) != 0
                    && self.gate_open(g, source, registers::brsmr().read(&self.regs, SRCMR::ENGT))
            }
        }
    }

    fn service(&self, g: usize, source: RequestSource) -> Service {
        match source {
            RequestSource::Queue => self.service_queue(g),
            RequestSource::Scan => self.service_scan(g),
            RequestSource::Background => self.service_background(g),
        }
    }

    fn service_queue(&self, g: usize) -> Service {
        let Some(head) = self.state.borrow().queues[g].front().copied() else {
            return Service::Stalled;
        };
        let entry = LocalRegisterCopy::<u32, QENTRY::Register>::new(head);
        let channel = entry.read(QENTRY::REQCHNR) as usize % CHANNEL_COUNT;
        if self.blocked(g, channel, RequestSource::Queue) {
            return Service::Stalled;
        }
        {
            let mut state = self.state.borrow_mut();
            state.queues[g].pop_front();
            if entry.is_set(QENTRY::EXTR) {
                state.queue_event[g] = false;
            }
            if entry.is_set(QENTRY::RF) {
                let _ = state.queues[g].push_back(head);
            }
        }
        self.convert(g, channel, RequestSource::Queue, true);
        if entry.is_set(QENTRY::ENSI) {
            self.source_event(g, SEFLAG::SEV0::SET.value, SEVNP::SEV0NP);
        }
        Service::Converted
    }

    fn service_scan(&self, g: usize) -> Service {
        let pending = registers::aspnd(g).get(&self.regs);
        let Some(channel) = highest(pending) else {
            return Service::Stalled;
        };
        if self.blocked(g, channel, RequestSource::Scan) {
            return Service::Stalled;
        }
        let pending = pending & !(1 << channel);
        registers::aspnd(g).set(&self.regs, pending);
        self.convert(g, channel, RequestSource::Scan, true);
        if pending == 0 {
            let asmr = registers::asmr(g).extract(&self.regs);
            if asmr.is_set(SRCMR::ENSI) {
                self.source_event(g, SEFLAG::SEV1::SET.value, SEVNP::SEV1NP);
            }
            if asmr.is_set(SRCMR::SCAN) {
                let select = registers::assel(g).get(&self.regs);
                registers::aspnd(g).set(&self.regs, select);
            }
        }
        Service::Converted
    }

    /// The background pass ends once no group has a pending channel left.
    fn service_background(&self, g: usize) -> Service {
        let pending = registers::brspnd(g).get(&self.regs);
        let Some(channel) = highest(pending) else {
            return Service::Stalled;
        };
        if self.blocked(g, channel, RequestSource::Background) {
            return Service::Stalled;
        }
        registers::brspnd(g).set(&self.regs, pending & !(1 << channel));
        self.convert(g, channel, RequestSource::Background, true);
        let idle = (0..GROUP_COUNT).all(|g| registers::brspnd(g).get(&self.regs) == 0);
        if idle {
            let brsmr = registers::brsmr().extract(&self.regs);
            if brsmr.is_set(SRCMR::ENSI) {
                registers::globeflag().modify(&self.regs, GLOBEFLAG::SEVGLB::SET);
                let pointer = registers::globevnp().read(&self.regs, GLOBEVNP::SEV0NP);
                self.raise(ServiceNode::from_pointer(pointer).global_request());
            }
            if brsmr.is_set(SRCMR::SCAN) {
                for g in 0..GROUP_COUNT {
                    let select = registers::brssel(g).get(&self.regs);
                    registers::brspnd(g).set(&self.regs, select);
                }
            }
        }
        Service::Converted
    }

    fn target(&self, g: usize, channel: usize, source: RequestSource) -> Target {
        let chctr = registers::chctr(g, channel).extract(&self.regs);
        if source == RequestSource::Background && chctr.is_set(CHCTR::RESTBS) {
            Target::Global
        } else {
            Target::Group(chctr.read(CHCTR::RESREG) as usize)
        }
    }

    fn blocked(&self, g: usize, channel: usize, source: RequestSource) -> bool {
        match self.target(g, channel, source) {
            Target::Group(r) => {
                registers::rcr(g, r).is_set(&self.regs, RCR::WFR)
                    && self.regs.read(registers::res(g, r).offset()) & RES::VF::SET.value != 0
            }
            Target::Global => {
                registers::globrcr().is_set(&self.regs, GLOBRCR::WFR)
                    && self.regs.read(registers::globres().offset()) & GLOBRES::VF::SET.value != 0
            }
        }
    }

    fn boundary(&self, g: usize, select: BoundarySelect) -> u16 {
        let value = match select {
            BoundarySelect::Group0 => registers::bound(g).read(&self.regs, BOUND::BOUNDARY0),
            BoundarySelect::Group1 => registers::bound(g).read(&self.regs, BOUND::BOUNDARY1),
            BoundarySelect::Global0 => registers::globbound().read(&self.regs, BOUND::BOUNDARY0),
            BoundarySelect::Global1 => registers::globbound().read(&self.regs, BOUND::BOUNDARY1),
        };
        value as u16
    }

    /// Converts `channel` of group `g` on behalf of `source`. With
    /// `follow_sync`, a synchronized channel of a master also converts in
    /// every slave following it.
    fn convert(&self, g: usize, channel: usize, source: RequestSource, follow_sync: bool) {
        let chctr = registers::chctr(g, channel).extract(&self.regs);
        let emuxctr = registers::emuxctr(g).extract(&self.regs);
        let multiplexed = emux::is_multiplexed(emuxctr.get(), channel);
        let select = emuxctr.read(EMUXCTR::EMUXACT) as u8;

        let sample = {
            let state = self.state.borrow();
            let external = state.emux_inputs[g][select as usize % 8];
            match external {
                Some(value) if multiplexed => value,
                _ => state.inputs[g][channel],
            }
        };

        let class = InputClass::from_raw(chctr.read(CHCTR::ICLSEL)).register(g);
        let mode = if multiplexed {
            class.read(&self.regs, ICLASS::CME)
        } else {
            class.read(&self.regs, ICLASS::CMS)
        };
        let shift = 12 - Resolution::from_raw(mode).result_bits();
        let truncated = u32::from(sample) >> shift;
        let value = if chctr.is_set(CHCTR::RESPOS) {
            truncated
        } else {
            truncated << shift
        };

        let upper = self.boundary(g, BoundarySelect::from_raw(chctr.read(CHCTR::BNDSELU)));
        let lower = self.boundary(g, BoundarySelect::from_raw(chctr.read(CHCTR::BNDSELL)));
        let fast_compare = chctr.read(CHCTR::BNDSELX) != 0;
        let above = fast_compare && sample >= upper;
        let check = LimitCheck::from_raw(chctr.read(CHCTR::CHEVMODE));
        let fires = if fast_compare {
            check.fires_on_compare(above)
        } else {
            check.fires(sample, lower, upper)
        };

        let group = GroupId::ALL[g];
        match self.target(g, channel, source) {
            Target::Group(r) => {
                let res = registers::res(g, r);
                if self.regs.read(res.offset()) & RES::VF::SET.value != 0 {
                    let vfr = registers::vfr(g);
                    vfr.set(&self.regs, vfr.get(&self.regs) | 1 << (16 + r));
                }
                let word = (RES::RESULT.val(value)
                    + RES::CHNR.val(channel as u32)
                    + RES::EMUX.val(select as u32)
                    + RES::CRS.val(source.slot() as u32)
                    + RES::FCR.val(above as u32)
                    + RES::VF::SET)
                    .value;
                self.regs.write(res.offset(), word);
                self.regs.write(registers::resd(g, r).offset(), word);
                let vfr = registers::vfr(g);
                vfr.set(&self.regs, vfr.get(&self.regs) | 1 << r);
                if registers::rcr(g, r).is_set(&self.regs, RCR::SRGEN) {
                    let flags = registers::reflag(g);
                    flags.set(&self.regs, flags.get(&self.regs) | 1 << r);
                    let pointer = node_pointer(registers::revnp(g, r / 8).get(&self.regs), r);
                    self.raise(ServiceNode::from_pointer(pointer).request_for(group));
                }
            }
            Target::Global => {
                let globres = registers::globres();
                if self.regs.read(globres.offset()) & GLOBRES::VF::SET.value != 0 {
                    registers::globeflag().modify(&self.regs, GLOBEFLAG::OVGLB::SET);
                }
                let word = (GLOBRES::RESULT.val(value)
                    + GLOBRES::GNR.val(g as u32)
                    + GLOBRES::CHNR.val(channel as u32)
                    + GLOBRES::EMUX.val(select as u32)
                    + GLOBRES::CRS.val(source.slot() as u32)
                    + GLOBRES::FCR.val(above as u32)
                    + GLOBRES::VF::SET)
                    .value;
                self.regs.write(globres.offset(), word);
                self.regs.write(registers::globresd().offset(), word);
                if registers::globrcr().is_set(&self.regs, GLOBRCR::SRGEN) {
                    registers::globeflag().modify(&self.regs, GLOBEFLAG::REVGLB::SET);
                    let pointer = registers::globevnp().read(&self.regs, GLOBEVNP::REV0NP);
                    self.raise(ServiceNode::from_pointer(pointer).global_request());
                }
            }
        }

        if fires {
            let flags = registers::ceflag(g);
            flags.set(&self.regs, flags.get(&self.regs) | 1 << channel);
            let pointer = node_pointer(registers::cevnp(g, channel / 8).get(&self.regs), channel);
            self.raise(ServiceNode::from_pointer(pointer).request_for(group));
        }

        if multiplexed {
            let mode = EmuxMode::from_raw(emuxctr.read(EMUXCTR::EMUXMODE));
            let start = emuxctr.read(EMUXCTR::EMUXSET) as u8;
            let next = emux::next_select(mode, select, start);
            registers::emuxctr(g).modify(&self.regs, EMUXCTR::EMUXACT.val(next as u32));
        }

        if follow_sync && chctr.is_set(CHCTR::SYNC) {
            self.convert_slaves(group, channel, source);
        }
    }

    fn convert_slaves(&self, master: GroupId, channel: usize, source: RequestSource) {
        if registers::synctr(master.index()).read(&self.regs, SYNCTR::STSEL) != 0 {
            return;
        }
        for slave in GroupId::ALL {
            if slave == master || slave.domain() != master.domain() {
                continue;
            }
            let stsel = registers::synctr(slave.index()).read(&self.regs, SYNCTR::STSEL) as u8;
            if stsel == 0 || sync::resolve_master_group(slave, stsel) != Ok(master) {
                continue;
            }
            if self.blocked(slave.index(), channel, source) {
                log::trace!(
                    "vadc emulator: group {} missed a synchronized conversion",
                    slave.index()
                );
                continue;
            }
            self.convert(slave.index(), channel, source, false);
        }
    }

    fn source_event(
        &self,
        g: usize,
        flag: u32,
        pointer: tock_registers::fields::Field<u32, SEVNP::Register>,
    ) {
        let flags = registers::seflag(g);
        flags.set(&self.regs, flags.get(&self.regs) | flag);
        let node = registers::sevnp(g).read(&self.regs, pointer);
        self.raise(ServiceNode::from_pointer(node).request_for(GroupId::ALL[g]));
    }

    /// A request already pending is not queued twice.
    fn raise(&self, request: ServiceRequest) {
        let mut state = self.state.borrow_mut();
        if state.requests.iter().any(|pending| *pending == request) {
            return;
        }
        if state.requests.push_back(request).is_err() {
            log::warn!("vadc emulator: dropped service request {:?}", request);
        }
    }
}

fn highest(pending: u32) -> Option<usize> {
    let pending = pending & 0xFFFF;
    if pending == 0 {
        None
    } else {
        Some(31 - pending.leading_zeros() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::highest;

    #[test]
    fn scan_order_is_highest_channel_first() {
        assert_eq!(highest(0), None);
        assert_eq!(highest(0b10_0100), Some(5));
        assert_eq!(highest(1), Some(0));
        assert_eq!(highest(0x18000), Some(15));
    }
}
