// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Analog input channels.

use super::group::Group;
use super::interrupt::{InterruptBinding, ServiceNode};
use super::module::{InputClassConfig, Resolution};
use super::registers::{self, CHASS, CHCTR, ICLASS, RCR};
use super::{clock, ChannelId, Error, GroupId, ResultRegister};
use crate::bus::Reg;

/// Input class a channel takes its resolution and sample time from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputClass {
    Group0 = 0,
    Group1 = 1,
    Global0 = 2,
    Global1 = 3,
}

impl InputClass {
    pub(crate) fn from_raw(raw: u32) -> InputClass {
        match raw & 0x3 {
            0 => InputClass::Group0,
            1 => InputClass::Group1,
            2 => InputClass::Global0,
            _ => InputClass::Global1,
        }
    }

    pub(crate) fn register(self, group: usize) -> Reg<ICLASS::Register> {
        match self {
            InputClass::Group0 => registers::iclass(group, 0),
            InputClass::Group1 => registers::iclass(group, 1),
            InputClass::Global0 => registers::globiclass(0),
            InputClass::Global1 => registers::globiclass(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reference {
    /// VAREF
    Standard = 0,
    /// Input channel 0 of the group
    Channel0 = 1,
}

/// Boundary register a channel's lower or upper limit comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundarySelect {
    Group0 = 0,
    Group1 = 1,
    Global0 = 2,
    Global1 = 3,
}

impl BoundarySelect {
    pub(crate) fn from_raw(raw: u32) -> BoundarySelect {
        match raw & 0x3 {
            0 => BoundarySelect::Group0,
            1 => BoundarySelect::Group1,
            2 => BoundarySelect::Global0,
            _ => BoundarySelect::Global1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Compare the result against the lower and upper boundary.
    Standard,
    /// Only compare against the upper boundary, reporting above/below.
    FastCompare,
}

/// When a conversion raises a channel event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitCheck {
    None = 0,
    /// Result within `lower..=upper`.
    InsideBand = 1,
    /// Result below `lower` or above `upper`.
    OutsideBand = 2,
    Always = 3,
}

impl LimitCheck {
    pub(crate) fn from_raw(raw: u32) -> LimitCheck {
        match raw & 0x3 {
            0 => LimitCheck::None,
            1 => LimitCheck::InsideBand,
            2 => LimitCheck::OutsideBand,
            _ => LimitCheck::Always,
        }
    }

    pub fn fires(self, sample: u16, lower: u16, upper: u16) -> bool {
        match self {
            LimitCheck::None => false,
            LimitCheck::InsideBand => lower <= sample && sample <= upper,
            LimitCheck::OutsideBand => sample < lower || sample > upper,
            LimitCheck::Always => true,
        }
    }

    /// Fast compare has a single boundary: below it counts as inside the
    /// band, at or above it as outside.
    pub fn fires_on_compare(self, above: bool) -> bool {
        match self {
            LimitCheck::None => false,
            LimitCheck::InsideBand => !above,
            LimitCheck::OutsideBand => above,
            LimitCheck::Always => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: ChannelId,
    pub input_class: InputClass,
    pub reference: Reference,
    pub result_register: ResultRegister,
    /// Background conversions of this channel go to the global result
    /// register instead of `result_register`.
    pub global_result: bool,
    pub lower_boundary: BoundarySelect,
    pub upper_boundary: BoundarySelect,
    pub boundary_mode: BoundaryMode,
    pub limit_check: LimitCheck,
    /// Convert in lockstep with the other groups of the cluster.
    pub synchronize: bool,
    /// Serviced by the background scan instead of the group's queue and
    /// scan.
    pub background: bool,
    pub right_aligned: bool,
    pub channel_interrupt: InterruptBinding,
    pub result_interrupt: InterruptBinding,
}

impl ChannelConfig {
    /// Group class 0, standard reference, result register 0, group boundary
    /// 0 for both limits, no limit check, priority channel, left aligned,
    /// no interrupts.
    pub const fn new(channel: ChannelId) -> ChannelConfig {
        ChannelConfig {
            channel,
            input_class: InputClass::Group0,
            reference: Reference::Standard,
            result_register: ResultRegister::Result0,
            global_result: false,
            lower_boundary: BoundarySelect::Group0,
            upper_boundary: BoundarySelect::Group0,
            boundary_mode: BoundaryMode::Standard,
            limit_check: LimitCheck::None,
            synchronize: false,
            background: false,
            right_aligned: false,
            channel_interrupt: InterruptBinding::new(),
            result_interrupt: InterruptBinding::new(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(ChannelId::Channel0)
    }
}

/// Token for a configured channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    group: GroupId,
    channel: ChannelId,
    result_register: ResultRegister,
    global_result: bool,
    background: bool,
}

impl Channel {
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn id(&self) -> ChannelId {
        self.channel
    }

    pub fn result_register(&self) -> ResultRegister {
        self.result_register
    }

    /// Background conversions land in the global result register.
    pub fn uses_global_result(&self) -> bool {
        self.background && self.global_result
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

impl Group<'_, '_> {
    /// Configures one channel of the group.
    ///
    /// Interrupt bindings with priority 0 are left alone: no node pointer is
    /// set and nothing is installed or enabled at the router.
    pub fn init_channel(&self, config: &ChannelConfig) -> Result<Channel, Error> {
        self.check_live()?;
        let g = self.id.index();
        let c = config.channel.index();
        let bus = self.vadc.bus;
        let configured = &self.vadc.configured_channels[g];
        if configured.get() & config.channel.mask() != 0 {
            return Err(Error::AlreadyInitialized);
        }

        let bndselx = match config.boundary_mode {
            BoundaryMode::Standard => 0,
            BoundaryMode::FastCompare => 1,
        };
        self.vadc.with_channel_access(self.id, || {
            registers::chctr(g, c).write(
                bus,
                CHCTR::ICLSEL.val(config.input_class as u32)
                    + CHCTR::BNDSELL.val(config.lower_boundary as u32)
                    + CHCTR::BNDSELU.val(config.upper_boundary as u32)
                    + CHCTR::CHEVMODE.val(config.limit_check as u32)
                    + CHCTR::SYNC.val(config.synchronize as u32)
                    + CHCTR::REFSEL.val(config.reference as u32)
                    + CHCTR::BNDSELX.val(bndselx)
                    + CHCTR::RESREG.val(config.result_register.index() as u32)
                    + CHCTR::RESTBS.val(config.global_result as u32)
                    + CHCTR::RESPOS.val(config.right_aligned as u32),
            );
        });
        self.vadc.with_group_access(self.id, || {
            let assch = registers::chass(g).read(bus, CHASS::ASSCH);
            let assch = if config.background {
                assch & !(1 << c)
            } else {
                assch | (1 << c)
            };
            registers::chass(g).write(bus, CHASS::ASSCH.val(assch));
        });
        configured.set(configured.get() | config.channel.mask());

        let channel = Channel {
            group: self.id,
            channel: config.channel,
            result_register: config.result_register,
            global_result: config.global_result,
            background: config.background,
        };
        if config.channel_interrupt.is_enabled() {
            self.bind_channel_event(&channel, &config.channel_interrupt);
        }
        if config.result_interrupt.is_enabled() {
            self.bind_result_event(&channel, &config.result_interrupt);
        }
        log::debug!(
            "vadc: group {} channel {} -> result {}{}",
            g,
            c,
            config.result_register.index(),
            if config.background { " (background)" } else { "" }
        );
        Ok(channel)
    }

    /// Token for a channel configured earlier, if it was.
    pub fn channel(&self, id: ChannelId) -> Option<Channel> {
        let g = self.id.index();
        if self.vadc.configured_channels[g].get() & id.mask() == 0 {
            return None;
        }
        let chctr = registers::chctr(g, id.index()).extract(self.vadc.bus);
        let assch = registers::chass(g).read(self.vadc.bus, CHASS::ASSCH);
        let priority = assch & (1 << id.index()) != 0;
        Some(Channel {
            group: self.id,
            channel: id,
            result_register: ResultRegister::from_index(chctr.read(CHCTR::RESREG) as usize)
                .unwrap_or(ResultRegister::Result0),
            global_result: chctr.is_set(CHCTR::RESTBS),
            background: !priority,
        })
    }

    /// Channel configuration reconstructed from the registers and the
    /// interrupt router. The channel interrupt reports whatever the router
    /// has installed on the node the channel points at.
    pub fn channel_config(&self, channel: &Channel) -> Result<ChannelConfig, Error> {
        if channel.group != self.id {
            return Err(Error::WrongGroup);
        }
        let g = self.id.index();
        let c = channel.channel.index();
        let bus = self.vadc.bus;
        let chctr = registers::chctr(g, c).extract(bus);
        let boundary_mode = if chctr.read(CHCTR::BNDSELX) == 0 {
            BoundaryMode::Standard
        } else {
            BoundaryMode::FastCompare
        };
        let channel_interrupt = self.read_binding(ServiceNode::from_pointer(
            registers::node_pointer(registers::cevnp(g, c / 8).get(bus), c),
        ));
        let r = channel.result_register.index();
        let result_interrupt = if registers::rcr(g, r).is_set(bus, RCR::SRGEN) {
            self.read_binding(ServiceNode::from_pointer(registers::node_pointer(
                registers::revnp(g, r / 8).get(bus),
                r,
            )))
        } else {
            InterruptBinding::new()
        };
        Ok(ChannelConfig {
            channel: channel.channel,
            input_class: InputClass::from_raw(chctr.read(CHCTR::ICLSEL)),
            reference: if chctr.is_set(CHCTR::REFSEL) {
                Reference::Channel0
            } else {
                Reference::Standard
            },
            result_register: channel.result_register,
            global_result: chctr.is_set(CHCTR::RESTBS),
            lower_boundary: BoundarySelect::from_raw(chctr.read(CHCTR::BNDSELL)),
            upper_boundary: BoundarySelect::from_raw(chctr.read(CHCTR::BNDSELU)),
            boundary_mode,
            limit_check: LimitCheck::from_raw(chctr.read(CHCTR::CHEVMODE)),
            synchronize: chctr.is_set(CHCTR::SYNC),
            background: channel.background,
            right_aligned: chctr.is_set(CHCTR::RESPOS),
            channel_interrupt,
            result_interrupt,
        })
    }

    /// Sample, conversion and synchronization time of one conversion.
    pub fn conversion_time_ns(&self, channel: &Channel) -> u32 {
        let g = self.id.index();
        let bus = self.vadc.bus;
        let class = InputClass::from_raw(
            registers::chctr(g, channel.channel.index()).read(bus, CHCTR::ICLSEL),
        );
        let iclass = class.register(g).extract(bus);
        let resolution = Resolution::from_raw(iclass.read(ICLASS::CMS));
        clock::conversion_time_ns(
            self.vadc.analog_frequency.get(),
            self.vadc.module_frequency.get(),
            iclass.read(ICLASS::STCS),
            resolution.bits(),
            self.post_calibration(),
        )
    }

    /// Resolution and sample time `channel` converts with.
    pub fn channel_input_class(&self, channel: &Channel) -> InputClassConfig {
        let g = self.id.index();
        let class = InputClass::from_raw(
            registers::chctr(g, channel.channel.index()).read(self.vadc.bus, CHCTR::ICLSEL),
        );
        InputClassConfig::from_standard(
            self.vadc.analog_frequency.get(),
            class.register(g).get(self.vadc.bus),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_checks() {
        assert!(LimitCheck::InsideBand.fires(100, 100, 200));
        assert!(LimitCheck::InsideBand.fires(200, 100, 200));
        assert!(!LimitCheck::InsideBand.fires(201, 100, 200));
        assert!(LimitCheck::OutsideBand.fires(99, 100, 200));
        assert!(!LimitCheck::OutsideBand.fires(150, 100, 200));
        assert!(LimitCheck::Always.fires(0, 100, 200));
        assert!(!LimitCheck::None.fires(150, 100, 200));
    }

    #[test]
    fn fast_compare_checks() {
        assert!(LimitCheck::OutsideBand.fires_on_compare(true));
        assert!(!LimitCheck::OutsideBand.fires_on_compare(false));
        assert!(LimitCheck::InsideBand.fires_on_compare(false));
        assert!(!LimitCheck::None.fires_on_compare(true));
    }

    #[test]
    fn lower_and_upper_boundaries_are_independent() {
        let mut config = ChannelConfig::new(ChannelId::Channel4);
        config.upper_boundary = BoundarySelect::Global1;
        assert_eq!(config.lower_boundary, BoundarySelect::Group0);
        assert_eq!(BoundarySelect::from_raw(config.upper_boundary as u32), BoundarySelect::Global1);
    }
}
