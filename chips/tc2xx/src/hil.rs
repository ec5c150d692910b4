// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interfaces between the VADC driver and the rest of the system.
//!
//! The converter driver programs service request routing, reports completed
//! work, and drives external multiplexer pins only through these traits.

use crate::vadc::interrupt::ServiceRequest;
use crate::vadc::result::{ConversionResult, ResultSlot};
use crate::vadc::{ChannelId, GroupId, RequestSource};

/// CPU or DMA that services an interrupt request (the router's TOS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceProvider {
    Cpu0 = 0,
    Cpu1 = 1,
    Cpu2 = 2,
    Dma = 3,
}

impl ServiceProvider {
    pub(crate) fn from_tos(tos: u32) -> ServiceProvider {
        match tos & 0x3 {
            0 => ServiceProvider::Cpu0,
            1 => ServiceProvider::Cpu1,
            2 => ServiceProvider::Cpu2,
            _ => ServiceProvider::Dma,
        }
    }
}

/// Interrupt controller as seen by the converter driver.
///
/// The driver only configures lines; dispatch stays with the kernel, which
/// calls [`crate::vadc::Vadc::handle_interrupt`] for the line that fired.
pub trait InterruptRouter {
    fn install_handler(&self, request: ServiceRequest, priority: u8, target: ServiceProvider);
    fn enable(&self, request: ServiceRequest);
    /// Priority and target currently programmed for `request`, if any.
    fn installed(&self, request: ServiceRequest) -> Option<(u8, ServiceProvider)>;
}

/// Receives conversion events decoded by `handle_interrupt`.
pub trait Client {
    /// A channel's limit check fired.
    fn channel_event(&self, group: GroupId, channel: ChannelId);
    /// A result register received a value. The value has already been read,
    /// so the slot's valid flag is clear again.
    fn result_ready(&self, slot: ResultSlot, result: ConversionResult);
    /// A request source finished an entry or a pass that asked for an
    /// interrupt. Background scan events carry no group.
    fn source_event(&self, group: Option<GroupId>, source: RequestSource);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    PushPull,
    OpenDrain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadDriver {
    CmosAutomotiveSpeed1,
    CmosAutomotiveSpeed2,
    CmosAutomotiveSpeed3,
    CmosAutomotiveSpeed4,
    TtlSpeed1,
    TtlSpeed2,
    TtlSpeed3,
    TtlSpeed4,
}

/// A port pin that drives one bit of an external multiplexer select.
pub trait EmuxPin {
    fn configure_output(&self, mode: OutputMode, driver: PadDriver);
}
