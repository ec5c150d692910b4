// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! External multiplexer control.
//!
//! A group can drive up to three port pins with a select value for an
//! external analog multiplexer in front of one of its channels. The select
//! can be fixed by software, or stepped down from a start value after each
//! conversion and reloaded when it reaches zero.

use super::group::Group;
use super::module::InputClassConfig;
use super::registers::{self, EMUXCTR, EMUXSEL};
use super::{Error, GroupId, Vadc};
use crate::hil::{EmuxPin, OutputMode, PadDriver};

const SELECT_MAX: u8 = 7;
const EMUXCH_MAX: u16 = 0x3FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmuxInterface {
    Interface0 = 0,
    Interface1 = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmuxCoding {
    Binary = 0,
    Gray = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmuxSampleTime {
    /// Extended sample time only after the select changed.
    SettingChanges = 0,
    Always = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmuxMode {
    /// Select changes only when software writes it.
    SoftwareControl = 0,
    /// Select stays at the start value.
    Steady = 1,
    /// Select steps once per trigger.
    SingleStep = 2,
    /// Select steps after every conversion of the multiplexed channel.
    Sequence = 3,
}

impl EmuxMode {
    pub(crate) fn from_raw(raw: u32) -> EmuxMode {
        match raw & 0x3 {
            0 => EmuxMode::SoftwareControl,
            1 => EmuxMode::Steady,
            2 => EmuxMode::SingleStep,
            _ => EmuxMode::Sequence,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmuxSelectionStyle {
    /// `channels` holds one channel number.
    ChannelNumber = 0,
    /// `channels` is a mask of channels.
    ChannelEnable = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmuxConfig {
    pub interface: EmuxInterface,
    pub group: GroupId,
    pub channels: u16,
    pub start_select: u8,
    pub coding: EmuxCoding,
    pub sample_time: EmuxSampleTime,
    pub mode: EmuxMode,
    pub selection_style: EmuxSelectionStyle,
}

impl EmuxConfig {
    /// Interface 0 for group 0 channel 0, binary coded, software controlled,
    /// start select 0.
    pub const fn new() -> EmuxConfig {
        EmuxConfig {
            interface: EmuxInterface::Interface0,
            group: GroupId::Group0,
            channels: 0,
            start_select: 0,
            coding: EmuxCoding::Binary,
            sample_time: EmuxSampleTime::SettingChanges,
            mode: EmuxMode::SoftwareControl,
            selection_style: EmuxSelectionStyle::ChannelNumber,
        }
    }
}

impl Default for EmuxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One select output pin.
#[derive(Clone, Copy)]
pub struct EmuxPinConfig<'p> {
    pub pin: &'p dyn EmuxPin,
    pub mode: OutputMode,
    pub driver: PadDriver,
}

/// Value driven on the select pins for `select`.
pub const fn encode(select: u8, coding: EmuxCoding) -> u8 {
    match coding {
        EmuxCoding::Binary => select,
        EmuxCoding::Gray => select ^ (select >> 1),
    }
}

/// Select value following a conversion with `active`.
pub const fn next_select(mode: EmuxMode, active: u8, start: u8) -> u8 {
    match mode {
        EmuxMode::SoftwareControl | EmuxMode::Steady => active,
        EmuxMode::SingleStep | EmuxMode::Sequence => {
            if active == 0 {
                start
            } else {
                active - 1
            }
        }
    }
}

/// Whether `channel` is behind the multiplexer described by EMUXCTR.
///
/// Software controlled mode leaves the converter out of it: the select is
/// only driven, never stepped, and channels keep their standard settings.
pub(crate) fn is_multiplexed(emuxctr: u32, channel: usize) -> bool {
    let reg = tock_registers::LocalRegisterCopy::<u32, EMUXCTR::Register>::new(emuxctr);
    if EmuxMode::from_raw(reg.read(EMUXCTR::EMUXMODE)) == EmuxMode::SoftwareControl {
        return false;
    }
    let channels = reg.read(EMUXCTR::EMUXCH);
    if reg.is_set(EMUXCTR::EMXCSS) {
        channel < 10 && channels & (1 << channel) != 0
    } else {
        channels as usize == channel
    }
}

impl Vadc<'_> {
    /// Routes an external multiplexer interface to a group, configures its
    /// select pins and programs the select sequence.
    pub fn init_external_multiplexer(
        &self,
        config: &EmuxConfig,
        pins: &[EmuxPinConfig<'_>],
    ) -> Result<(), Error> {
        if config.start_select > SELECT_MAX || config.channels > EMUXCH_MAX || pins.len() > 3 {
            return Err(Error::ConfigurationInfeasible);
        }
        let group = config.group.index() as u32;
        match config.interface {
            EmuxInterface::Interface0 => {
                registers::emuxsel().modify(self.bus, EMUXSEL::EMUXGRP0.val(group))
            }
            EmuxInterface::Interface1 => {
                registers::emuxsel().modify(self.bus, EMUXSEL::EMUXGRP1.val(group))
            }
        }
        registers::emuxctr(config.group.index()).write(
            self.bus,
            EMUXCTR::EMUXSET.val(config.start_select as u32)
                + EMUXCTR::EMUXCH.val(config.channels as u32)
                + EMUXCTR::EMUXMODE.val(config.mode as u32)
                + EMUXCTR::EMXCOD.val(config.coding as u32)
                + EMUXCTR::EMXST.val(config.sample_time as u32)
                + EMUXCTR::EMXCSS.val(config.selection_style as u32)
                + EMUXCTR::EMXWC::SET,
        );
        for pin in pins {
            pin.pin.configure_output(pin.mode, pin.driver);
        }
        log::debug!(
            "vadc: emux {} -> group {}, {:?} from {}",
            config.interface as u8,
            group,
            config.mode,
            config.start_select
        );
        Ok(())
    }
}

impl Group<'_, '_> {
    /// Sets the select value. In software controlled mode it is driven
    /// right away, otherwise it becomes the new start value.
    pub fn set_emux_select(&self, select: u8) -> Result<(), Error> {
        self.check_live()?;
        if select > SELECT_MAX {
            return Err(Error::ConfigurationInfeasible);
        }
        registers::emuxctr(self.id.index())
            .modify(self.vadc.bus, EMUXCTR::EMUXSET.val(select as u32));
        Ok(())
    }

    /// Select value currently driven.
    pub fn emux_select(&self) -> u8 {
        registers::emuxctr(self.id.index()).read(self.vadc.bus, EMUXCTR::EMUXACT) as u8
    }

    /// Resolution and sample time of multiplexed conversions for input class
    /// `index` of the group.
    pub fn set_emux_input_class(
        &self,
        index: usize,
        config: &InputClassConfig,
    ) -> Result<(), Error> {
        self.check_live()?;
        if index > 1 {
            return Err(Error::ConfigurationInfeasible);
        }
        let fields = config.emux_fields(self.vadc.analog_frequency.get())?;
        self.vadc.with_group_access(self.id, || {
            registers::iclass(self.id.index(), index).modify(self.vadc.bus, fields)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_code() {
        let gray = [0, 1, 3, 2, 6, 7, 5, 4];
        for (select, expected) in gray.iter().enumerate() {
            assert_eq!(encode(select as u8, EmuxCoding::Gray), *expected);
            assert_eq!(encode(select as u8, EmuxCoding::Binary), select as u8);
        }
    }

    #[test]
    fn sequence_counts_down_and_reloads() {
        let mut active = 3;
        let mut seen = [0u8; 6];
        for slot in seen.iter_mut() {
            *slot = active;
            active = next_select(EmuxMode::Sequence, active, 3);
        }
        assert_eq!(seen, [3, 2, 1, 0, 3, 2]);
        assert_eq!(next_select(EmuxMode::Steady, 5, 7), 5);
    }

    #[test]
    fn channel_selection_styles() {
        let steady = 1 << 26;
        let number = steady | (4 << 16);
        assert!(is_multiplexed(number, 4));
        assert!(!is_multiplexed(number, 2));
        let mask = steady | (0b110 << 16) | (1 << 30);
        assert!(is_multiplexed(mask, 1));
        assert!(is_multiplexed(mask, 2));
        assert!(!is_multiplexed(mask, 0));
        assert!(is_multiplexed(steady, 0));
    }

    #[test]
    fn software_control_multiplexes_nothing() {
        assert!(!is_multiplexed(0, 0));
        assert!(!is_multiplexed(4 << 16, 4));
        assert!(!is_multiplexed((0b110 << 16) | (1 << 30), 1));
    }
}
