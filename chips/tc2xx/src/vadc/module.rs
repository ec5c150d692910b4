// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Module-wide configuration: clocks, supply, global input classes and
//! calibration.

use tock_registers::fields::FieldValue;

use super::registers::{self, ARBCFG, BOUND, CLC, GLOBCFG, ICLASS, KRST};
use super::{clock, Error, GroupId, Vadc};

pub const DEFAULT_MODULE_FREQUENCY: u32 = 100_000_000;
pub const DEFAULT_ANALOG_FREQUENCY: u32 = 20_000_000;

const BOUNDARY_MAX: u16 = 0xFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Bits12 = 0,
    Bits10 = 1,
    Bits8 = 2,
    /// Compare against a boundary instead of converting.
    FastCompare = 5,
}

impl Resolution {
    /// Conversion steps taken by the converter.
    pub const fn bits(self) -> u32 {
        match self {
            Resolution::Bits12 => 12,
            Resolution::Bits10 => 10,
            Resolution::Bits8 => 8,
            Resolution::FastCompare => 2,
        }
    }

    /// Significant bits of a stored result.
    pub(crate) const fn result_bits(self) -> u32 {
        match self {
            Resolution::Bits12 => 12,
            Resolution::Bits10 | Resolution::FastCompare => 10,
            Resolution::Bits8 => 8,
        }
    }

    pub(crate) fn from_raw(raw: u32) -> Resolution {
        match raw {
            1 => Resolution::Bits10,
            2 => Resolution::Bits8,
            5 => Resolution::FastCompare,
            _ => Resolution::Bits12,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupplyVoltage {
    Supply5V = 0,
    Supply3V3 = 1,
}

/// Resolution and sample time shared by the channels that select the class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputClassConfig {
    pub resolution: Resolution,
    pub sample_time_ns: u32,
}

impl InputClassConfig {
    /// 12 bit, 1 us sample time.
    pub const fn new() -> InputClassConfig {
        InputClassConfig {
            resolution: Resolution::Bits12,
            sample_time_ns: 1_000,
        }
    }

    /// Field values for the standard conversion half of an ICLASS register.
    pub(crate) fn standard_fields(
        &self,
        analog_frequency: u32,
    ) -> Result<FieldValue<u32, ICLASS::Register>, Error> {
        let stcs = clock::sample_time_control(analog_frequency, self.sample_time_ns)?;
        Ok(ICLASS::STCS.val(stcs) + ICLASS::CMS.val(self.resolution as u32))
    }

    /// Field values for the external multiplexer half of an ICLASS register.
    pub(crate) fn emux_fields(
        &self,
        analog_frequency: u32,
    ) -> Result<FieldValue<u32, ICLASS::Register>, Error> {
        let stcs = clock::sample_time_control(analog_frequency, self.sample_time_ns)?;
        Ok(ICLASS::STCE.val(stcs) + ICLASS::CME.val(self.resolution as u32))
    }

    pub(crate) fn from_standard(analog_frequency: u32, iclass: u32) -> InputClassConfig {
        let reg = tock_registers::LocalRegisterCopy::<u32, ICLASS::Register>::new(iclass);
        InputClassConfig {
            resolution: Resolution::from_raw(reg.read(ICLASS::CMS)),
            sample_time_ns: clock::sample_time_ns(analog_frequency, reg.read(ICLASS::STCS)),
        }
    }
}

impl Default for InputClassConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Clock feeding the peripheral (fADC).
    pub module_frequency: u32,
    /// Requested analog clock (fADCI). The closest divided clock not above
    /// this is used.
    pub analog_frequency: u32,
    /// Requested arbiter clock (fADCD).
    pub digital_frequency: u32,
    pub supply_voltage: SupplyVoltage,
    /// Run the start-up calibration at the end of `init_module`.
    pub startup_calibration: bool,
    pub global_input_classes: [InputClassConfig; 2],
}

impl ModuleConfig {
    /// 100 MHz module clock, 20 MHz analog clock, undivided arbiter clock,
    /// 5 V supply, no start-up calibration, 12 bit / 1 us global classes.
    pub const fn new() -> ModuleConfig {
        ModuleConfig {
            module_frequency: DEFAULT_MODULE_FREQUENCY,
            analog_frequency: DEFAULT_ANALOG_FREQUENCY,
            digital_frequency: DEFAULT_MODULE_FREQUENCY,
            supply_voltage: SupplyVoltage::Supply5V,
            startup_calibration: false,
            global_input_classes: [InputClassConfig::new(), InputClassConfig::new()],
        }
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Vadc<'_> {
    /// Enables the module and programs clocks, supply class and global input
    /// classes. Nothing is written if a clock or sample time is infeasible.
    pub fn init_module(&self, config: &ModuleConfig) -> Result<(), Error> {
        let diva = clock::analog_divider(config.module_frequency, config.analog_frequency)
            .inspect_err(|_| {
                log::warn!(
                    "vadc: no analog divider for {} Hz from {} Hz",
                    config.analog_frequency,
                    config.module_frequency
                )
            })?;
        let divd = clock::digital_divider(config.module_frequency, config.digital_frequency)?;
        let analog_frequency = clock::analog_frequency(config.module_frequency, diva);
        let classes = [
            config.global_input_classes[0].standard_fields(analog_frequency)?,
            config.global_input_classes[1].standard_fields(analog_frequency)?,
        ];

        registers::clc().write(self.bus, CLC::DISR::CLEAR);
        registers::globcfg().write(
            self.bus,
            GLOBCFG::DIVA.val(diva)
                + GLOBCFG::DIVD.val(divd)
                + GLOBCFG::DIVWC::SET
                + GLOBCFG::LOSUP.val(config.supply_voltage as u32),
        );
        for (index, class) in classes.iter().enumerate() {
            registers::globiclass(index).write(self.bus, *class);
        }
        self.module_frequency.set(config.module_frequency);
        self.analog_frequency.set(analog_frequency);
        self.startup_calibration.set(config.startup_calibration);
        log::debug!(
            "vadc: module on, fADCI {} Hz (DIVA {}), DIVD {}",
            analog_frequency,
            diva,
            divd
        );

        if config.startup_calibration {
            self.start_calibration();
        }
        Ok(())
    }

    /// Module configuration reconstructed from the registers.
    pub fn module_config(&self) -> ModuleConfig {
        let globcfg = registers::globcfg().extract(self.bus);
        let module_frequency = self.module_frequency.get();
        let analog_frequency =
            clock::analog_frequency(module_frequency, globcfg.read(GLOBCFG::DIVA));
        let supply_voltage = if globcfg.is_set(GLOBCFG::LOSUP) {
            SupplyVoltage::Supply3V3
        } else {
            SupplyVoltage::Supply5V
        };
        ModuleConfig {
            module_frequency,
            analog_frequency,
            digital_frequency: module_frequency / (globcfg.read(GLOBCFG::DIVD) + 1),
            supply_voltage,
            startup_calibration: self.startup_calibration.get(),
            global_input_classes: [0, 1].map(|index| {
                let raw = registers::globiclass(index).get(self.bus);
                InputClassConfig::from_standard(analog_frequency, raw)
            }),
        }
    }

    /// Requests a module clock stop. Configuration is kept.
    pub fn disable_module(&self) {
        registers::clc().write(self.bus, CLC::DISR::SET);
    }

    /// Whether the module clock is running.
    pub fn is_enabled(&self) -> bool {
        !registers::clc().is_set(self.bus, CLC::DISS)
    }

    /// Kernel reset: every register returns to its reset value and all
    /// groups and channels have to be initialised again.
    pub fn deinit_module(&self) {
        registers::krst1().write(self.bus, KRST::RST::SET);
        registers::krst0().write(self.bus, KRST::RST::SET);
        self.reset_tracking();
        log::debug!("vadc: kernel reset");
    }

    /// Switches every converter on and starts the start-up calibration.
    ///
    /// The calibration runs in hardware; poll [`Vadc::is_calibrating`].
    pub fn start_calibration(&self) {
        for id in GroupId::ALL {
            self.with_group_access(id, || {
                registers::arbcfg(id.index()).modify(self.bus, ARBCFG::ANONC::NormalOperation)
            });
        }
        registers::globcfg().modify(self.bus, GLOBCFG::SUCAL::SET);
    }

    pub fn is_calibrating(&self) -> bool {
        GroupId::ALL
            .iter()
            .any(|id| registers::arbcfg(id.index()).is_set(self.bus, ARBCFG::CAL))
    }

    /// Programs the two global boundaries (12 bit).
    pub fn set_global_boundaries(&self, boundary0: u16, boundary1: u16) -> Result<(), Error> {
        let (boundary0, boundary1) = (check_boundary(boundary0)?, check_boundary(boundary1)?);
        registers::globbound().write(
            self.bus,
            BOUND::BOUNDARY0.val(boundary0) + BOUND::BOUNDARY1.val(boundary1),
        );
        Ok(())
    }

    pub fn set_global_input_class(
        &self,
        index: usize,
        config: &InputClassConfig,
    ) -> Result<(), Error> {
        if index > 1 {
            return Err(Error::ConfigurationInfeasible);
        }
        let fields = config.standard_fields(self.analog_frequency.get())?;
        registers::globiclass(index).modify(self.bus, fields);
        Ok(())
    }

    pub fn analog_frequency(&self) -> u32 {
        self.analog_frequency.get()
    }

    pub fn module_frequency(&self) -> u32 {
        self.module_frequency.get()
    }
}

pub(crate) fn check_boundary(value: u16) -> Result<u32, Error> {
    if value > BOUNDARY_MAX {
        Err(Error::ConfigurationInfeasible)
    } else {
        Ok(value as u32)
    }
}
