// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Trigger and gating of request sources.
//!
//! Each request source watches one of sixteen trigger inputs for an edge and
//! one of sixteen gate inputs for a level. Trigger input 15 is special: it
//! routes the selected gate input to the trigger detector, which leaves the
//! gate itself with nothing to qualify. Whenever that input is selected the
//! gate is forced open ([`GatingMode::Always`]) and any other gating request
//! is refused.

use super::group::Group;
use super::registers::{self, QMR, SRCCTRL, SRCMR};
use super::{Error, RequestSource};
use crate::bus::Reg;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    None = 0,
    FallingEdge = 1,
    RisingEdge = 2,
    AnyEdge = 3,
}

impl TriggerMode {
    pub(crate) fn from_raw(raw: u32) -> TriggerMode {
        match raw & 0x3 {
            0 => TriggerMode::None,
            1 => TriggerMode::FallingEdge,
            2 => TriggerMode::RisingEdge,
            _ => TriggerMode::AnyEdge,
        }
    }

    /// Whether a transition of the input from `previous` to `current`
    /// generates a trigger event.
    pub fn fires(self, previous: bool, current: bool) -> bool {
        match self {
            TriggerMode::None => false,
            TriggerMode::FallingEdge => previous && !current,
            TriggerMode::RisingEdge => !previous && current,
            TriggerMode::AnyEdge => previous != current,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatingMode {
    /// No conversions are requested.
    Disabled = 0,
    /// Requests are issued regardless of the gate input.
    Always = 1,
    /// Requests are issued while the gate input is high.
    High = 2,
    /// Requests are issued while the gate input is low.
    Low = 3,
}

impl GatingMode {
    pub(crate) fn from_raw(raw: u32) -> GatingMode {
        match raw & 0x3 {
            0 => GatingMode::Disabled,
            1 => GatingMode::Always,
            2 => GatingMode::High,
            _ => GatingMode::Low,
        }
    }

    pub fn is_open(self, level: bool) -> bool {
        match self {
            GatingMode::Disabled => false,
            GatingMode::Always => true,
            GatingMode::High => level,
            GatingMode::Low => !level,
        }
    }
}

/// One of the sixteen trigger or gate inputs of a request source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSelector(u8);

impl InputSelector {
    /// Trigger input that takes its signal from the gate input.
    pub const EXTENDED: InputSelector = InputSelector(15);

    pub const fn new(line: u8) -> Option<InputSelector> {
        if line < 16 {
            Some(InputSelector(line))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn is_extended(self) -> bool {
        self.0 == Self::EXTENDED.0
    }

    pub(crate) const fn from_raw(raw: u32) -> InputSelector {
        InputSelector((raw & 0xF) as u8)
    }
}

/// Trigger and gate settings of one request source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerConfig {
    pub trigger_mode: TriggerMode,
    pub trigger_input: InputSelector,
    /// Ignored while `trigger_input` is [`InputSelector::EXTENDED`].
    pub gating_mode: GatingMode,
    pub gating_input: InputSelector,
}

impl TriggerConfig {
    /// No trigger, gate disabled, both selectors on input 0.
    pub const fn new() -> TriggerConfig {
        TriggerConfig {
            trigger_mode: TriggerMode::None,
            trigger_input: InputSelector(0),
            gating_mode: GatingMode::Disabled,
            gating_input: InputSelector(0),
        }
    }

    /// Gating mode the hardware will actually run with.
    pub fn effective_gating(&self) -> GatingMode {
        if self.trigger_input.is_extended() {
            GatingMode::Always
        } else {
            self.gating_mode
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn control_register(group: usize, source: RequestSource) -> Reg<SRCCTRL::Register> {
    match source {
        RequestSource::Queue => registers::qctrl0(group),
        RequestSource::Scan => registers::asctrl(group),
        RequestSource::Background => registers::brsctrl(),
    }
}

impl Group<'_, '_> {
    /// Selects the edge and input that trigger `source`.
    ///
    /// Choosing [`InputSelector::EXTENDED`] forces the source's gate open.
    pub fn configure_trigger(
        &self,
        source: RequestSource,
        mode: TriggerMode,
        input: InputSelector,
    ) -> Result<(), Error> {
        self.check_live()?;
        let bus = self.vadc.bus;
        control_register(self.id.index(), source).modify(
            bus,
            SRCCTRL::XTSEL.val(input.index() as u32)
                + SRCCTRL::XTMODE.val(mode as u32)
                + SRCCTRL::XTWC::SET,
        );
        self.write_trigger_enable(source, mode != TriggerMode::None);
        if input.is_extended() {
            self.write_gating_mode(source, GatingMode::Always);
        }
        Ok(())
    }

    /// Selects the gate level and input that qualify `source`.
    pub fn configure_gating(
        &self,
        source: RequestSource,
        mode: GatingMode,
        input: InputSelector,
    ) -> Result<(), Error> {
        self.check_live()?;
        let ctrl = control_register(self.id.index(), source);
        let xtsel = ctrl.read(self.vadc.bus, SRCCTRL::XTSEL);
        let extended = InputSelector::from_raw(xtsel).is_extended();
        if extended && mode != GatingMode::Always {
            log::warn!(
                "vadc: group {} {:?} gating {:?} refused, trigger input is the gate",
                self.id.index(),
                source,
                mode
            );
            return Err(Error::GatingAliased);
        }
        ctrl.modify(
            self.vadc.bus,
            SRCCTRL::GTSEL.val(input.index() as u32) + SRCCTRL::GTWC::SET,
        );
        self.write_gating_mode(source, mode);
        Ok(())
    }

    /// Trigger and gate settings of `source` as programmed.
    pub fn trigger_config(&self, source: RequestSource) -> TriggerConfig {
        let ctrl = control_register(self.id.index(), source).extract(self.vadc.bus);
        let trigger_mode = TriggerMode::from_raw(ctrl.read(SRCCTRL::XTMODE));
        let trigger_input = InputSelector::from_raw(ctrl.read(SRCCTRL::XTSEL));
        let gating_mode = if trigger_input.is_extended() && trigger_mode != TriggerMode::None {
            GatingMode::Always
        } else {
            self.read_gating_mode(source)
        };
        TriggerConfig {
            trigger_mode,
            trigger_input,
            gating_mode,
            gating_input: InputSelector::from_raw(ctrl.read(SRCCTRL::GTSEL)),
        }
    }

    /// Programs a full trigger/gate configuration. The extended trigger
    /// input takes precedence over `config.gating_mode`.
    pub(crate) fn program_trigger(&self, source: RequestSource, config: &TriggerConfig) {
        let bus = self.vadc.bus;
        control_register(self.id.index(), source).modify(
            bus,
            SRCCTRL::XTSEL.val(config.trigger_input.index() as u32)
                + SRCCTRL::XTMODE.val(config.trigger_mode as u32)
                + SRCCTRL::XTWC::SET
                + SRCCTRL::GTSEL.val(config.gating_input.index() as u32)
                + SRCCTRL::GTWC::SET,
        );
        self.write_trigger_enable(source, config.trigger_mode != TriggerMode::None);
        self.write_gating_mode(source, config.effective_gating());
    }

    pub(crate) fn read_gating_mode(&self, source: RequestSource) -> GatingMode {
        let bus = self.vadc.bus;
        let g = self.id.index();
        GatingMode::from_raw(match source {
            RequestSource::Queue => registers::qmr0(g).read(bus, QMR::ENGT),
            RequestSource::Scan => registers::asmr(g).read(bus, SRCMR::ENGT),
            RequestSource::Background => registers::brsmr().read(bus, SRCMR::ENGT),
        })
    }

    pub(crate) fn write_gating_mode(&self, source: RequestSource, mode: GatingMode) {
        let bus = self.vadc.bus;
        let g = self.id.index();
        match source {
            RequestSource::Queue => registers::qmr0(g).modify(bus, QMR::ENGT.val(mode as u32)),
            RequestSource::Scan => registers::asmr(g).modify(bus, SRCMR::ENGT.val(mode as u32)),
            RequestSource::Background => {
                registers::brsmr().modify(bus, SRCMR::ENGT.val(mode as u32))
            }
        }
    }

    fn write_trigger_enable(&self, source: RequestSource, enable: bool) {
        let bus = self.vadc.bus;
        let g = self.id.index();
        match source {
            RequestSource::Queue => registers::qmr0(g).modify(bus, QMR::ENTR.val(enable as u32)),
            RequestSource::Scan => registers::asmr(g).modify(bus, SRCMR::ENTR.val(enable as u32)),
            RequestSource::Background => {
                registers::brsmr().modify(bus, SRCMR::ENTR.val(enable as u32))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_detection() {
        assert!(TriggerMode::RisingEdge.fires(false, true));
        assert!(!TriggerMode::RisingEdge.fires(true, false));
        assert!(TriggerMode::FallingEdge.fires(true, false));
        assert!(!TriggerMode::FallingEdge.fires(true, true));
        assert!(TriggerMode::AnyEdge.fires(true, false));
        assert!(TriggerMode::AnyEdge.fires(false, true));
        assert!(!TriggerMode::None.fires(false, true));
    }

    #[test]
    fn gate_levels() {
        assert!(!GatingMode::Disabled.is_open(true));
        assert!(GatingMode::Always.is_open(false));
        assert!(GatingMode::High.is_open(true));
        assert!(!GatingMode::High.is_open(false));
        assert!(GatingMode::Low.is_open(false));
    }

    #[test]
    fn extended_input_forces_gate_open() {
        let mut config = TriggerConfig::new();
        config.gating_mode = GatingMode::High;
        assert_eq!(config.effective_gating(), GatingMode::High);
        config.trigger_input = InputSelector::EXTENDED;
        config.trigger_mode = TriggerMode::RisingEdge;
        assert_eq!(config.effective_gating(), GatingMode::Always);
    }

    #[test]
    fn selectors_are_four_bits() {
        assert!(InputSelector::new(15).is_some_and(InputSelector::is_extended));
        assert_eq!(InputSelector::new(16), None);
    }
}
