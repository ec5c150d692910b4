// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Drivers and chip support for the Infineon AURIX TC2xx family.
//!
//! Only the versatile analog-to-digital converter (VADC) and the interrupt
//! router's service request registers are covered. Both talk to hardware
//! through [`bus::RegisterBus`], so the same driver runs against the memory
//! mapped peripheral or against [`vadc::emulator::Emulator`].

#![no_std]
#![crate_name = "tc2xx"]
#![crate_type = "rlib"]

pub mod bus;
pub mod hil;
pub mod ir;
pub mod vadc;

/// Base address of the VADC register block.
pub const VADC_BASE: usize = 0xF002_0000;
/// Base address of the interrupt router service request block.
pub const SRC_BASE: usize = 0xF003_8000;
