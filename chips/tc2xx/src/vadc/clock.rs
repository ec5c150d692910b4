// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Converter clock dividers and sample timing.
//!
//! Frequencies are in Hz and durations in ns. A request that cannot be met
//! with the divider or sample-time encodings fails with
//! [`Error::ConfigurationInfeasible`] instead of being clamped.

use super::Error;

/// Upper limit of the analog clock fADCI.
pub const MAX_ANALOG_FREQUENCY: u32 = 20_000_000;
/// Lower limit of the analog clock fADCI.
pub const MIN_ANALOG_FREQUENCY: u32 = 500_000;

const DIVA_MAX: u32 = 31;
const DIVD_MAX: u32 = 3;
const STCS_MAX: u32 = 31;
const NS_PER_S: u64 = 1_000_000_000;

/// DIVA setting giving the fastest analog clock not above `target`.
pub fn analog_divider(module_frequency: u32, target: u32) -> Result<u32, Error> {
    if module_frequency == 0 || target == 0 {
        return Err(Error::ConfigurationInfeasible);
    }
    let divider = module_frequency.div_ceil(target);
    let actual = module_frequency / divider;
    if divider - 1 > DIVA_MAX || !(MIN_ANALOG_FREQUENCY..=MAX_ANALOG_FREQUENCY).contains(&actual) {
        return Err(Error::ConfigurationInfeasible);
    }
    Ok(divider - 1)
}

/// DIVD setting giving the fastest arbiter clock not above `target`.
pub fn digital_divider(module_frequency: u32, target: u32) -> Result<u32, Error> {
    if module_frequency == 0 || target == 0 {
        return Err(Error::ConfigurationInfeasible);
    }
    let divider = module_frequency.div_ceil(target);
    if divider - 1 > DIVD_MAX {
        return Err(Error::ConfigurationInfeasible);
    }
    Ok(divider - 1)
}

pub const fn analog_frequency(module_frequency: u32, diva: u32) -> u32 {
    module_frequency / (diva + 1)
}

/// Sample phase cycles added on top of the fixed two by an STCS value.
const fn additional_cycles(stcs: u32) -> u32 {
    if stcs <= 16 {
        stcs
    } else {
        (stcs - 15) * 16
    }
}

/// Smallest STCS encoding whose sample phase lasts at least `sample_time_ns`.
pub fn sample_time_control(analog_frequency: u32, sample_time_ns: u32) -> Result<u32, Error> {
    if analog_frequency == 0 {
        return Err(Error::ConfigurationInfeasible);
    }
    let cycles = (sample_time_ns as u64 * analog_frequency as u64).div_ceil(NS_PER_S);
    let additional = cycles.saturating_sub(2) as u32;
    let stcs = if additional <= 16 {
        additional
    } else {
        additional.div_ceil(16) + 15
    };
    if stcs > STCS_MAX {
        return Err(Error::ConfigurationInfeasible);
    }
    Ok(stcs)
}

/// Length of the sample phase encoded by `stcs`.
pub fn sample_time_ns(analog_frequency: u32, stcs: u32) -> u32 {
    if analog_frequency == 0 {
        return 0;
    }
    let cycles = 2 + additional_cycles(stcs) as u64;
    (cycles * NS_PER_S / analog_frequency as u64) as u32
}

/// Sample phase, conversion steps and optional post calibration in analog
/// clocks, plus two module clocks of synchronization.
pub fn conversion_time_ns(
    analog_frequency: u32,
    module_frequency: u32,
    stcs: u32,
    resolution_bits: u32,
    post_calibration: bool,
) -> u32 {
    if analog_frequency == 0 || module_frequency == 0 {
        return 0;
    }
    let post = if post_calibration { 2 } else { 0 };
    let analog_cycles = (2 + additional_cycles(stcs) + resolution_bits + post) as u64;
    let ns = analog_cycles * NS_PER_S / analog_frequency as u64
        + 2 * NS_PER_S / module_frequency as u64;
    ns as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analog_divider_rounds_down_the_clock() {
        assert_eq!(analog_divider(100_000_000, 20_000_000), Ok(4));
        assert_eq!(analog_divider(100_000_000, 15_000_000), Ok(6));
        assert_eq!(analog_frequency(100_000_000, 6), 14_285_714);
    }

    #[test]
    fn analog_divider_limits() {
        assert_eq!(
            analog_divider(100_000_000, 100_000),
            Err(Error::ConfigurationInfeasible)
        );
        assert_eq!(
            analog_divider(40_000_000, 40_000_000),
            Err(Error::ConfigurationInfeasible)
        );
        assert_eq!(analog_divider(0, 1), Err(Error::ConfigurationInfeasible));
    }

    #[test]
    fn digital_divider_range() {
        assert_eq!(digital_divider(100_000_000, 100_000_000), Ok(0));
        assert_eq!(digital_divider(100_000_000, 25_000_000), Ok(3));
        assert_eq!(
            digital_divider(100_000_000, 20_000_000),
            Err(Error::ConfigurationInfeasible)
        );
    }

    #[test]
    fn sample_time_encoding() {
        // 10 MHz: 1 us is ten cycles, eight on top of the fixed two.
        assert_eq!(sample_time_control(10_000_000, 1_000), Ok(8));
        assert_eq!(sample_time_ns(10_000_000, 8), 1_000);
        // 20 MHz: twenty cycles needs the coarse encoding.
        assert_eq!(sample_time_control(20_000_000, 1_000), Ok(17));
        assert!(sample_time_ns(20_000_000, 17) >= 1_000);
        assert_eq!(sample_time_control(20_000_000, 0), Ok(0));
    }

    #[test]
    fn sample_time_too_long() {
        assert_eq!(
            sample_time_control(20_000_000, 100_000),
            Err(Error::ConfigurationInfeasible)
        );
        assert!(sample_time_control(20_000_000, 12_900).is_ok());
    }

    #[test]
    fn conversion_time() {
        // (2 + 8 + 12) cycles at 10 MHz plus 2 cycles at 100 MHz.
        assert_eq!(conversion_time_ns(10_000_000, 100_000_000, 8, 12, false), 2_220);
        assert_eq!(conversion_time_ns(10_000_000, 100_000_000, 8, 12, true), 2_420);
    }
}
