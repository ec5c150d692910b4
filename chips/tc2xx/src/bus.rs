// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Word-wide register access.
//!
//! Drivers in this crate never dereference peripheral addresses themselves.
//! They address registers by byte offset through a [`RegisterBus`] and use
//! [`Reg`] descriptors so that each access names the bitfield layout of the
//! register it touches.

use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr;

use tock_registers::fields::{Field, FieldValue};
use tock_registers::{LocalRegisterCopy, RegisterLongName};

/// A block of 32-bit registers addressed by byte offset.
pub trait RegisterBus {
    fn read(&self, offset: usize) -> u32;
    fn write(&self, offset: usize, value: u32);
}

/// The real, memory-mapped register block.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block that stays
    /// mapped while the returned value is alive. Offsets passed to the bus
    /// must stay inside that block.
    pub const unsafe fn new(base: usize) -> Mmio {
        Mmio { base }
    }
}

impl RegisterBus for Mmio {
    fn read(&self, offset: usize) -> u32 {
        // Safety: the constructor contract guarantees `base + offset` is a
        // mapped, word aligned peripheral register.
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        // Safety: see `read`.
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

/// Plain storage with no side effects, `N` words long.
///
/// Reads of offsets past the end return zero and writes to them are dropped.
pub struct RegisterFile<const N: usize> {
    words: [Cell<u32>; N],
}

impl<const N: usize> RegisterFile<N> {
    pub fn new() -> Self {
        RegisterFile {
            words: core::array::from_fn(|_| Cell::new(0)),
        }
    }

    pub fn clear(&self) {
        self.words.iter().for_each(|w| w.set(0));
    }
}

impl<const N: usize> Default for RegisterFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RegisterBus for RegisterFile<N> {
    fn read(&self, offset: usize) -> u32 {
        self.words.get(offset / 4).map_or(0, Cell::get)
    }

    fn write(&self, offset: usize, value: u32) {
        if let Some(word) = self.words.get(offset / 4) {
            word.set(value);
        }
    }
}

/// Location of one register together with its bitfield layout `R`.
pub struct Reg<R: RegisterLongName> {
    offset: usize,
    associated_register: PhantomData<R>,
}

impl<R: RegisterLongName> Clone for Reg<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RegisterLongName> Copy for Reg<R> {}

impl<R: RegisterLongName> Reg<R> {
    pub const fn at(offset: usize) -> Self {
        Reg {
            offset,
            associated_register: PhantomData,
        }
    }

    pub const fn offset(self) -> usize {
        self.offset
    }

    pub fn get(self, bus: &dyn RegisterBus) -> u32 {
        bus.read(self.offset)
    }

    pub fn set(self, bus: &dyn RegisterBus, value: u32) {
        bus.write(self.offset, value);
    }

    pub fn extract(self, bus: &dyn RegisterBus) -> LocalRegisterCopy<u32, R> {
        LocalRegisterCopy::new(self.get(bus))
    }

    pub fn read(self, bus: &dyn RegisterBus, field: Field<u32, R>) -> u32 {
        self.extract(bus).read(field)
    }

    pub fn is_set(self, bus: &dyn RegisterBus, field: Field<u32, R>) -> bool {
        self.extract(bus).is_set(field)
    }

    /// Writes `value`, zeroing every field it does not name.
    pub fn write(self, bus: &dyn RegisterBus, value: FieldValue<u32, R>) {
        self.set(bus, value.value);
    }

    /// Read-modify-write of the fields named by `value`.
    pub fn modify(self, bus: &dyn RegisterBus, value: FieldValue<u32, R>) {
        let mut copy = self.extract(bus);
        copy.modify(value);
        self.set(bus, copy.get());
    }
}
