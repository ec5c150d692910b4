// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Behavioural model of the VADC behind a [`RegisterBus`].
//!
//! The model keeps a plain register file and applies the peripheral's side
//! effects on access: action bits, write-control bits, write-one-to-clear
//! flags, read-to-clear valid flags, access protection and kernel reset.
//! Conversions happen only when the harness calls [`Emulator::run_round`] or
//! [`Emulator::run`], one arbitration round at a time. Analog inputs,
//! trigger lines and gate lines are driven from the harness as well.
//!
//! ```rust,ignore
//! let emu = Emulator::new();
//! let vadc = Vadc::new(&emu, &router);
//! // ... configure through `vadc`
//! emu.set_input(GroupId::Group3, ChannelId::Channel2, 0x800);
//! emu.run(1);
//! ```

mod converter;

use core::cell::RefCell;

use heapless::Deque;
use tock_registers::LocalRegisterCopy;

use super::emux::{self, EmuxCoding, EmuxMode};
use super::interrupt::ServiceRequest;
use super::registers::{
    self, ACCPROT0, ARBCFG, ARBPR, CHSEL, CLC, EMUXCTR, EMUXSEL, EVFLAG, GLOBCFG, GLOBEFLAG, KRST,
    QENTRY, QMR, QSR, SEFLAG, SRCCTRL, SRCMR, VFR, BLOCK_SIZE, CHANNEL_COUNT, GROUP_COUNT,
    QUEUE_DEPTH, RESULT_COUNT,
};
use super::{ChannelId, GroupId, RequestSource};
use crate::bus::{RegisterBus, RegisterFile};

const WORDS: usize = BLOCK_SIZE / 4;
const PENDING_REQUESTS: usize = 32;
const SAMPLE_MASK: u16 = 0xFFF;

/// Which set of trigger and gate lines a signal is driven on. Queue and
/// scan of a group share the group's lines; the background scan has its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalTarget {
    Group(GroupId),
    Background,
}

impl SignalTarget {
    const fn index(self) -> usize {
        match self {
            SignalTarget::Group(id) => id.index(),
            SignalTarget::Background => GROUP_COUNT,
        }
    }
}

struct State {
    queues: [Deque<u32, QUEUE_DEPTH>; GROUP_COUNT],
    queue_started: [bool; GROUP_COUNT],
    queue_event: [bool; GROUP_COUNT],
    inputs: [[u16; CHANNEL_COUNT]; GROUP_COUNT],
    emux_inputs: [[Option<u16>; 8]; GROUP_COUNT],
    trigger_lines: [u16; GROUP_COUNT + 1],
    gate_lines: [u16; GROUP_COUNT + 1],
    requests: Deque<ServiceRequest, PENDING_REQUESTS>,
}

impl State {
    fn new() -> State {
        State {
            queues: core::array::from_fn(|_| Deque::new()),
            queue_started: [false; GROUP_COUNT],
            queue_event: [false; GROUP_COUNT],
            inputs: [[0; CHANNEL_COUNT]; GROUP_COUNT],
            emux_inputs: [[None; 8]; GROUP_COUNT],
            trigger_lines: [0; GROUP_COUNT + 1],
            gate_lines: [0; GROUP_COUNT + 1],
            requests: Deque::new(),
        }
    }

    /// Everything the kernel reset clears; the analog world stays.
    fn reset(&mut self) {
        self.queues.iter_mut().for_each(|queue| queue.clear());
        self.queue_started = [false; GROUP_COUNT];
        self.queue_event = [false; GROUP_COUNT];
        self.requests.clear();
    }
}

pub struct Emulator {
    regs: RegisterFile<WORDS>,
    state: RefCell<State>,
}

impl Emulator {
    pub fn new() -> Emulator {
        Emulator {
            regs: RegisterFile::new(),
            state: RefCell::new(State::new()),
        }
    }

    /// Analog level of a channel, 12 bit.
    pub fn set_input(&self, group: GroupId, channel: ChannelId, value: u16) {
        self.state.borrow_mut().inputs[group.index()][channel.index()] = value & SAMPLE_MASK;
    }

    /// Analog level seen by a multiplexed channel while `select` is driven.
    pub fn set_emux_input(&self, group: GroupId, select: u8, value: u16) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.emux_inputs[group.index()].get_mut(select as usize) {
            *slot = Some(value & SAMPLE_MASK);
        }
    }

    /// Sets trigger input `line` and delivers a trigger event to every
    /// source watching it with a matching edge.
    pub fn drive_trigger(&self, target: SignalTarget, line: u8, level: bool) {
        let previous = self.set_line(target, line, level, false);
        let (group, sources) = Self::sources_on(target);
        for &source in sources {
            let ctrl = self.control(group, source);
            let xtsel = ctrl.read(SRCCTRL::XTSEL) as u8;
            if xtsel == line && xtsel != 15 && self.trigger_mode(ctrl).fires(previous, level) {
                self.trigger_event(group, source);
            }
        }
    }

    /// Sets gate input `line`. Sources using trigger input 15 see the edge
    /// as a trigger.
    pub fn drive_gate(&self, target: SignalTarget, line: u8, level: bool) {
        let previous = self.set_line(target, line, level, true);
        let (group, sources) = Self::sources_on(target);
        for &source in sources {
            let ctrl = self.control(group, source);
            let extended = ctrl.read(SRCCTRL::XTSEL) == 15;
            if extended
                && ctrl.read(SRCCTRL::GTSEL) as u8 == line
                && self.trigger_mode(ctrl).fires(previous, level)
            {
                self.trigger_event(group, source);
            }
        }
    }

    /// Oldest service request raised and not yet taken.
    pub fn take_service_request(&self) -> Option<ServiceRequest> {
        self.state.borrow_mut().requests.pop_front()
    }

    /// Value on the select pins of an external multiplexer interface.
    pub fn emux_output(&self, interface: emux::EmuxInterface) -> u8 {
        let sel = registers::emuxsel().extract(&self.regs);
        let group = match interface {
            emux::EmuxInterface::Interface0 => sel.read(EMUXSEL::EMUXGRP0),
            emux::EmuxInterface::Interface1 => sel.read(EMUXSEL::EMUXGRP1),
        } as usize;
        let ctr = registers::emuxctr(group % GROUP_COUNT).extract(&self.regs);
        let coding = if ctr.is_set(EMUXCTR::EMXCOD) {
            EmuxCoding::Gray
        } else {
            EmuxCoding::Binary
        };
        emux::encode(ctr.read(EMUXCTR::EMUXACT) as u8, coding)
    }

    fn set_line(&self, target: SignalTarget, line: u8, level: bool, gate: bool) -> bool {
        let mut state = self.state.borrow_mut();
        let lines = if gate {
            &mut state.gate_lines[target.index()]
        } else {
            &mut state.trigger_lines[target.index()]
        };
        let bit = 1u16 << (line & 0xF);
        let previous = *lines & bit != 0;
        if level {
            *lines |= bit;
        } else {
            *lines &= !bit;
        }
        previous
    }

    fn gate_level(&self, target: SignalTarget, line: u32) -> bool {
        self.state.borrow().gate_lines[target.index()] & (1 << (line & 0xF)) != 0
    }

    fn sources_on(target: SignalTarget) -> (usize, &'static [RequestSource]) {
        match target {
            SignalTarget::Group(id) => (id.index(), &[RequestSource::Queue, RequestSource::Scan]),
            SignalTarget::Background => (0, &[RequestSource::Background]),
        }
    }

    fn control(
        &self,
        group: usize,
        source: RequestSource,
    ) -> LocalRegisterCopy<u32, SRCCTRL::Register> {
        super::trigger::control_register(group, source).extract(&self.regs)
    }

    fn trigger_mode(&self, ctrl: LocalRegisterCopy<u32, SRCCTRL::Register>) -> super::TriggerMode {
        super::TriggerMode::from_raw(ctrl.read(SRCCTRL::XTMODE))
    }

    /// A trigger event only counts when the source has its trigger enabled.
    fn trigger_event(&self, group: usize, source: RequestSource) {
        match source {
            RequestSource::Queue => {
                if registers::qmr0(group).is_set(&self.regs, QMR::ENTR) {
                    let mut state = self.state.borrow_mut();
                    state.queue_event[group] = true;
                    state.queue_started[group] = true;
                }
            }
            RequestSource::Scan => {
                let asmr = registers::asmr(group).extract(&self.regs);
                if asmr.is_set(SRCMR::ENTR) {
                    self.load_scan(group, asmr.is_set(SRCMR::LDM));
                }
            }
            RequestSource::Background => {
                let brsmr = registers::brsmr().extract(&self.regs);
                if brsmr.is_set(SRCMR::ENTR) {
                    self.load_background(brsmr.is_set(SRCMR::LDM));
                }
            }
        }
    }

    fn load_scan(&self, group: usize, combine: bool) {
        let select = registers::assel(group).get(&self.regs);
        let pending = registers::aspnd(group);
        let old = if combine { pending.get(&self.regs) } else { 0 };
        pending.set(&self.regs, old | select);
    }

    fn load_background(&self, combine: bool) {
        for g in 0..GROUP_COUNT {
            let select = registers::brssel(g).get(&self.regs);
            let pending = registers::brspnd(g);
            let old = if combine { pending.get(&self.regs) } else { 0 };
            pending.set(&self.regs, old | select);
        }
    }

    fn reset(&self) {
        self.regs.clear();
        self.state.borrow_mut().reset();
        log::trace!("vadc emulator: kernel reset");
    }

    fn read_group(&self, offset: usize, g: usize) -> u32 {
        if offset == registers::qsr0(g).offset() {
            return self.queue_status(g);
        }
        if offset == registers::q0r0(g).offset() {
            return self.state.borrow().queues[g]
                .front()
                .map_or(0, |entry| entry | QENTRY::V::SET.value);
        }
        if offset == registers::qinr0(g).offset() {
            return 0;
        }
        let first = registers::res(g, 0).offset();
        let last = registers::res(g, RESULT_COUNT - 1).offset();
        if (first..=last).contains(&offset) {
            let r = (offset - first) / 4;
            let value = self.regs.read(offset);
            self.clear_result_valid(g, r);
            let vfr = registers::vfr(g);
            vfr.set(&self.regs, vfr.get(&self.regs) & !(1 << r));
            return value;
        }
        self.regs.read(offset)
    }

    fn queue_status(&self, g: usize) -> u32 {
        let state = self.state.borrow();
        let fill = state.queues[g].len() as u32;
        (QSR::FILL.val(fill)
            + QSR::EMPTY.val((fill == 0) as u32)
            + QSR::EV.val(state.queue_event[g] as u32))
        .value
    }

    fn protected(
        &self,
        field: tock_registers::fields::Field<u32, ACCPROT0::Register>,
        g: usize,
    ) -> bool {
        registers::accprot0().read(&self.regs, field) & (1 << g) != 0
    }

    fn write_group(&self, offset: usize, g: usize, value: u32) {
        let init_registers = [
            registers::arbcfg(g).offset(),
            registers::arbpr(g).offset(),
            registers::chass(g).offset(),
            registers::iclass(g, 0).offset(),
            registers::iclass(g, 1).offset(),
            registers::synctr(g).offset(),
        ];
        if init_registers.contains(&offset) && self.protected(ACCPROT0::APGC, g) {
            log::trace!("vadc emulator: write to {:#x} blocked", offset);
            return;
        }
        let first_chctr = registers::chctr(g, 0).offset();
        let last_chctr = registers::chctr(g, CHANNEL_COUNT - 1).offset();
        if (first_chctr..=last_chctr).contains(&offset) && self.protected(ACCPROT0::APC, g) {
            log::trace!("vadc emulator: write to {:#x} blocked", offset);
            return;
        }

        if offset == registers::arbcfg(g).offset() {
            let status =
                ARBCFG::CAL::SET.value | ARBCFG::BUSY::SET.value | ARBCFG::SAMPLE::SET.value;
            let old = self.regs.read(offset);
            self.regs.write(offset, (value & !status) | (old & status));
        } else if offset == registers::qinr0(g).offset() {
            let stored = QENTRY::REQCHNR.val(0x1F)
                + QENTRY::RF::SET
                + QENTRY::ENSI::SET
                + QENTRY::EXTR::SET;
            let entry = value & stored.value;
            if self.state.borrow_mut().queues[g].push_back(entry).is_err() {
                log::trace!("vadc emulator: group {} queue overflow", g);
            }
        } else if offset == registers::qmr0(g).offset() {
            self.write_qmr(g, value);
        } else if offset == registers::qctrl0(g).offset()
            || offset == registers::asctrl(g).offset()
        {
            self.write_control(offset, value);
        } else if offset == registers::asmr(g).offset() {
            self.write_scan_mode(offset, value, Some(g));
        } else if offset == registers::assel(g).offset() {
            self.regs.write(offset, value & CHSEL::CH::SET.value);
            if self.auto_start(g, RequestSource::Scan) {
                let pending = registers::aspnd(g);
                pending.set(&self.regs, pending.get(&self.regs) | (value & CHSEL::CH::SET.value));
            }
        } else if offset == registers::cefclr(g).offset() {
            let flags = registers::ceflag(g);
            flags.set(&self.regs, flags.get(&self.regs) & !(value & EVFLAG::EV::SET.value));
        } else if offset == registers::refclr(g).offset() {
            let flags = registers::reflag(g);
            flags.set(&self.regs, flags.get(&self.regs) & !(value & EVFLAG::EV::SET.value));
        } else if offset == registers::sefclr(g).offset() {
            let mask = SEFLAG::SEV0::SET.value | SEFLAG::SEV1::SET.value;
            let flags = registers::seflag(g);
            flags.set(&self.regs, flags.get(&self.regs) & !(value & mask));
        } else if offset == registers::vfr(g).offset() {
            self.write_vfr(g, value);
        } else if offset == registers::emuxctr(g).offset() {
            self.write_emuxctr(g, value);
        } else if offset >= registers::res(g, 0).offset()
            && offset <= registers::resd(g, RESULT_COUNT - 1).offset()
        {
            // Result registers are read only.
        } else {
            self.regs.write(offset, value);
        }
    }

    fn write_module(&self, offset: usize, value: u32) {
        if offset == registers::krst0().offset() {
            let request = LocalRegisterCopy::<u32, KRST::Register>::new(value).is_set(KRST::RST);
            if request && registers::krst1().is_set(&self.regs, KRST::RST) {
                self.reset();
            } else {
                self.regs.write(offset, value);
            }
        } else if offset == registers::clc().offset() {
            let disr = LocalRegisterCopy::<u32, CLC::Register>::new(value).read(CLC::DISR);
            registers::clc().write(&self.regs, CLC::DISR.val(disr) + CLC::DISS.val(disr));
        } else if offset == registers::globcfg().offset() {
            self.write_globcfg(value);
        } else if offset == registers::globeflag().offset() {
            let request = LocalRegisterCopy::<u32, GLOBEFLAG::Register>::new(value);
            let mut flags = registers::globeflag().extract(&self.regs);
            if request.is_set(GLOBEFLAG::SEVGLBCLR) {
                flags.modify(GLOBEFLAG::SEVGLB::CLEAR);
            }
            if request.is_set(GLOBEFLAG::REVGLBCLR) {
                flags.modify(GLOBEFLAG::REVGLB::CLEAR);
            }
            if request.is_set(GLOBEFLAG::OVGLBCLR) {
                flags.modify(GLOBEFLAG::OVGLB::CLEAR);
            }
            registers::globeflag().set(&self.regs, flags.get());
        } else if offset == registers::brsctrl().offset() {
            self.write_control(offset, value);
        } else if offset == registers::brsmr().offset() {
            self.write_scan_mode(offset, value, None);
        } else if offset == registers::globres().offset()
            || offset == registers::globresd().offset()
        {
            // Read only.
        } else if let Some(g) =
            (0..GROUP_COUNT).find(|g| registers::brssel(*g).offset() == offset)
        {
            self.regs.write(offset, value & CHSEL::CH::SET.value);
            if self.auto_start(g, RequestSource::Background) {
                let pending = registers::brspnd(g);
                pending.set(&self.regs, pending.get(&self.regs) | (value & CHSEL::CH::SET.value));
            }
        } else {
            self.regs.write(offset, value);
        }
    }

    fn write_globcfg(&self, value: u32) {
        let request = LocalRegisterCopy::<u32, GLOBCFG::Register>::new(value);
        let mut cfg = registers::globcfg().extract(&self.regs);
        if request.is_set(GLOBCFG::DIVWC) {
            cfg.modify(
                GLOBCFG::DIVA.val(request.read(GLOBCFG::DIVA))
                    + GLOBCFG::DCMSB.val(request.read(GLOBCFG::DCMSB))
                    + GLOBCFG::DIVD.val(request.read(GLOBCFG::DIVD)),
            );
        }
        cfg.modify(
            GLOBCFG::DPCAL.val(request.read(GLOBCFG::DPCAL))
                + GLOBCFG::LOSUP.val(request.read(GLOBCFG::LOSUP)),
        );
        registers::globcfg().set(&self.regs, cfg.get());
        if request.is_set(GLOBCFG::SUCAL) {
            for g in 0..GROUP_COUNT {
                let arbcfg = registers::arbcfg(g);
                if arbcfg.read(&self.regs, ARBCFG::ANONC) != 0 {
                    arbcfg.set(&self.regs, arbcfg.get(&self.regs) | ARBCFG::CAL::SET.value);
                }
            }
        }
    }

    /// XTSEL/XTMODE change only with XTWC, GTSEL only with GTWC.
    fn write_control(&self, offset: usize, value: u32) {
        let request = LocalRegisterCopy::<u32, SRCCTRL::Register>::new(value);
        let mut ctrl = LocalRegisterCopy::<u32, SRCCTRL::Register>::new(self.regs.read(offset));
        ctrl.modify(SRCCTRL::SRCRESREG.val(request.read(SRCCTRL::SRCRESREG)));
        if request.is_set(SRCCTRL::XTWC) {
            ctrl.modify(
                SRCCTRL::XTSEL.val(request.read(SRCCTRL::XTSEL))
                    + SRCCTRL::XTMODE.val(request.read(SRCCTRL::XTMODE)),
            );
        }
        if request.is_set(SRCCTRL::GTWC) {
            ctrl.modify(SRCCTRL::GTSEL.val(request.read(SRCCTRL::GTSEL)));
        }
        self.regs.write(offset, ctrl.get());
    }

    fn write_qmr(&self, g: usize, value: u32) {
        let request = LocalRegisterCopy::<u32, QMR::Register>::new(value);
        registers::qmr0(g).write(
            &self.regs,
            QMR::ENGT.val(request.read(QMR::ENGT))
                + QMR::ENTR.val(request.read(QMR::ENTR))
                + QMR::RPTDIS.val(request.read(QMR::RPTDIS)),
        );
        let mut state = self.state.borrow_mut();
        if request.is_set(QMR::FLUSH) {
            state.queues[g].clear();
        }
        if request.is_set(QMR::CLRV) {
            state.queues[g].pop_front();
        }
        if request.is_set(QMR::CEV) {
            state.queue_event[g] = false;
            state.queue_started[g] = false;
        }
        if request.is_set(QMR::TREV) {
            state.queue_event[g] = true;
            state.queue_started[g] = true;
        }
    }

    /// ASMR for `Some(group)`, BRSMR for `None`.
    fn write_scan_mode(&self, offset: usize, value: u32, group: Option<usize>) {
        let request = LocalRegisterCopy::<u32, SRCMR::Register>::new(value);
        self.regs.write(
            offset,
            (SRCMR::ENGT.val(request.read(SRCMR::ENGT))
                + SRCMR::ENTR.val(request.read(SRCMR::ENTR))
                + SRCMR::ENSI.val(request.read(SRCMR::ENSI))
                + SRCMR::SCAN.val(request.read(SRCMR::SCAN))
                + SRCMR::LDM.val(request.read(SRCMR::LDM))
                + SRCMR::RPTDIS.val(request.read(SRCMR::RPTDIS)))
            .value,
        );
        let combine = request.is_set(SRCMR::LDM);
        match group {
            Some(g) => {
                if request.is_set(SRCMR::CLRPND) {
                    registers::aspnd(g).set(&self.regs, 0);
                }
                if request.is_set(SRCMR::LDEV) {
                    self.load_scan(g, combine);
                }
            }
            None => {
                if request.is_set(SRCMR::CLRPND) {
                    (0..GROUP_COUNT).for_each(|g| registers::brspnd(g).set(&self.regs, 0));
                }
                if request.is_set(SRCMR::LDEV) {
                    self.load_background(combine);
                }
            }
        }
    }

    /// Low half clears valid flags (and the result registers' VF), high
    /// half clears overrun flags.
    fn write_vfr(&self, g: usize, value: u32) {
        let vfr = registers::vfr(g).extract(&self.regs);
        let clear_valid = value & VFR::VF::SET.value;
        for r in 0..RESULT_COUNT {
            if clear_valid & (1 << r) != 0 {
                self.clear_result_valid(g, r);
            }
        }
        registers::vfr(g).set(&self.regs, vfr.get() & !value);
    }

    /// Drops VF from a result register and its debug view.
    fn clear_result_valid(&self, g: usize, r: usize) {
        for reg in [registers::res(g, r), registers::resd(g, r)] {
            reg.set(&self.regs, reg.get(&self.regs) & !registers::RES::VF::SET.value);
        }
    }

    fn write_emuxctr(&self, g: usize, value: u32) {
        let request = LocalRegisterCopy::<u32, EMUXCTR::Register>::new(value);
        let mut ctr = registers::emuxctr(g).extract(&self.regs);
        let set = request.read(EMUXCTR::EMUXSET);
        ctr.modify(EMUXCTR::EMUXSET.val(set));
        if request.is_set(EMUXCTR::EMXWC) {
            ctr.modify(
                EMUXCTR::EMUXCH.val(request.read(EMUXCTR::EMUXCH))
                    + EMUXCTR::EMUXMODE.val(request.read(EMUXCTR::EMUXMODE))
                    + EMUXCTR::EMXCOD.val(request.read(EMUXCTR::EMXCOD))
                    + EMUXCTR::EMXST.val(request.read(EMUXCTR::EMXST))
                    + EMUXCTR::EMXCSS.val(request.read(EMUXCTR::EMXCSS))
                    + EMUXCTR::EMUXACT.val(set),
            );
        } else if matches!(
            EmuxMode::from_raw(ctr.read(EMUXCTR::EMUXMODE)),
            EmuxMode::SoftwareControl | EmuxMode::Steady
        ) {
            ctr.modify(EMUXCTR::EMUXACT.val(set));
        }
        registers::emuxctr(g).set(&self.regs, ctr.get());
    }

    fn auto_start(&self, g: usize, source: RequestSource) -> bool {
        let arbpr = registers::arbpr(g).extract(&self.regs);
        match source {
            RequestSource::Queue => arbpr.is_set(ARBPR::CSM0),
            RequestSource::Scan => arbpr.is_set(ARBPR::CSM1),
            RequestSource::Background => arbpr.is_set(ARBPR::CSM2),
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for Emulator {
    fn read(&self, offset: usize) -> u32 {
        match registers::group_of(offset) {
            Some((g, _)) => self.read_group(offset, g),
            None => {
                if offset == registers::globres().offset() {
                    let value = self.regs.read(offset);
                    for reg in [registers::globres(), registers::globresd()] {
                        let word = reg.get(&self.regs) & !registers::GLOBRES::VF::SET.value;
                        reg.set(&self.regs, word);
                    }
                    value
                } else {
                    self.regs.read(offset)
                }
            }
        }
    }

    fn write(&self, offset: usize, value: u32) {
        match registers::group_of(offset) {
            Some((g, _)) => self.write_group(offset, g, value),
            None => self.write_module(offset, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_status(emu: &Emulator) -> LocalRegisterCopy<u32, QSR::Register> {
        LocalRegisterCopy::new(emu.read(registers::qsr0(2).offset()))
    }

    #[test]
    fn queue_input_fills_the_queue() {
        let emu = Emulator::new();
        for channel in [3, 7] {
            emu.write(registers::qinr0(2).offset(), channel);
        }
        let qsr = queue_status(&emu);
        assert_eq!(qsr.read(QSR::FILL), 2);
        assert!(!qsr.is_set(QSR::EMPTY));
        assert_eq!(emu.read(registers::q0r0(2).offset()) & 0x1F, 3);

        emu.write(registers::qmr0(2).offset(), QMR::FLUSH::SET.value);
        let qsr = queue_status(&emu);
        assert!(qsr.is_set(QSR::EMPTY));
    }

    #[test]
    fn trigger_select_needs_write_control() {
        let emu = Emulator::new();
        let ctrl = registers::asctrl(1);
        emu.write(ctrl.offset(), SRCCTRL::XTSEL.val(4).value);
        assert_eq!(ctrl.read(&emu, SRCCTRL::XTSEL), 0);
        emu.write(ctrl.offset(), (SRCCTRL::XTSEL.val(4) + SRCCTRL::XTWC::SET).value);
        assert_eq!(ctrl.read(&emu, SRCCTRL::XTSEL), 4);
        assert!(!ctrl.is_set(&emu, SRCCTRL::XTWC));
    }

    #[test]
    fn protected_group_ignores_init_writes() {
        let emu = Emulator::new();
        registers::accprot0().write(&emu, ACCPROT0::APGC.val(1 << 5));
        registers::arbcfg(5).write(&emu, ARBCFG::ANONC::NormalOperation);
        assert_eq!(registers::arbcfg(5).read(&emu, ARBCFG::ANONC), 0);
        registers::arbcfg(4).write(&emu, ARBCFG::ANONC::NormalOperation);
        assert_eq!(registers::arbcfg(4).read(&emu, ARBCFG::ANONC), 3);
    }

    #[test]
    fn valid_flags_clear_on_read_and_by_vfr() {
        let emu = Emulator::new();
        let valid = registers::RES::VF::SET.value | 0x123;
        emu.regs.write(registers::res(0, 4).offset(), valid);
        emu.regs.write(registers::res(0, 5).offset(), valid);
        emu.regs.write(registers::vfr(0).offset(), 0b11_0000);

        assert_eq!(emu.read(registers::res(0, 4).offset()), valid);
        assert_eq!(emu.read(registers::res(0, 4).offset()) & registers::RES::VF::SET.value, 0);
        assert_eq!(registers::vfr(0).get(&emu), 0b10_0000);

        emu.write(registers::vfr(0).offset(), 0b10_0000);
        assert_eq!(registers::vfr(0).get(&emu), 0);
        assert_eq!(emu.regs.read(registers::res(0, 5).offset()), 0x123);
    }

    #[test]
    fn kernel_reset_needs_both_registers() {
        let emu = Emulator::new();
        registers::globbound().set(&emu, 0x0123_0456);
        emu.write(registers::qinr0(0).offset(), 1);
        registers::krst0().write(&emu, KRST::RST::SET);
        assert_eq!(registers::globbound().get(&emu), 0x0123_0456);

        registers::krst1().write(&emu, KRST::RST::SET);
        registers::krst0().write(&emu, KRST::RST::SET);
        assert_eq!(registers::globbound().get(&emu), 0);
        assert_eq!(registers::krst1().get(&emu), 0);
        assert!(registers::qsr0(0).is_set(&emu, QSR::EMPTY));
    }

    #[test]
    fn start_up_calibration_marks_powered_groups() {
        let emu = Emulator::new();
        registers::arbcfg(2).write(&emu, ARBCFG::ANONC::NormalOperation);
        registers::globcfg().write(&emu, GLOBCFG::SUCAL::SET);
        assert!(registers::arbcfg(2).is_set(&emu, ARBCFG::CAL));
        assert!(!registers::arbcfg(3).is_set(&emu, ARBCFG::CAL));
        assert!(!registers::globcfg().is_set(&emu, GLOBCFG::SUCAL));

        assert_eq!(emu.run_round(GroupId::Group2), 0);
        assert!(!registers::arbcfg(2).is_set(&emu, ARBCFG::CAL));
    }
}
