// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! STM32F767 internal flash in single-bank mode, programmed a byte at a time.
//!
//! Only the 256 KiB sectors (5..=11) are reachable; the firmware image lives below them.

use stm32f7xx_hal::pac;

use crate::error::FlashError;
use crate::storage::flash::FlashMemory;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

// FLASH_CR
const CR_PG: u32 = 1 << 0;
const CR_SER: u32 = 1 << 1;
const CR_SNB_SHIFT: u32 = 3;
const CR_SNB_MASK: u32 = 0xF << CR_SNB_SHIFT;
const CR_PSIZE_SHIFT: u32 = 8;
const CR_PSIZE_MASK: u32 = 0b11 << CR_PSIZE_SHIFT;
const PSIZE_X8: u32 = 0b00;
const PSIZE_X32: u32 = 0b10;
const CR_STRT: u32 = 1 << 16;
const CR_LOCK: u32 = 1 << 31;

// FLASH_SR
const SR_OPERR: u32 = 1 << 1;
const SR_WRPERR: u32 = 1 << 4;
const SR_PGAERR: u32 = 1 << 5;
const SR_PGPERR: u32 = 1 << 6;
const SR_ERSERR: u32 = 1 << 7;
const SR_BSY: u32 = 1 << 16;
const SR_ERRORS: u32 = SR_OPERR | SR_WRPERR | SR_PGAERR | SR_PGPERR | SR_ERSERR;

/// First 256 KiB sector and its number.
const LARGE_BASE: u32 = 0x0804_0000;
const LARGE_FIRST_SECTOR: u32 = 5;
const FLASH_END: u32 = 0x0820_0000;

pub struct InternalFlash {
    _private: (),
}

impl InternalFlash {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn regs() -> &'static pac::flash::RegisterBlock {
        unsafe { &*pac::FLASH::ptr() }
    }

    fn check_range(addr: u32, len: usize) -> Result<(), FlashError> {
        let end = addr.checked_add(len as u32).ok_or(FlashError::OutOfBounds)?;
        if addr < LARGE_BASE || end > FLASH_END {
            return Err(FlashError::OutOfBounds);
        }
        Ok(())
    }

    fn sector(addr: u32) -> u32 {
        LARGE_FIRST_SECTOR + (addr - LARGE_BASE) / Self::SEGMENT_SIZE
    }

    fn wait_idle() {
        let flash = Self::regs();
        while flash.sr.read().bits() & SR_BSY != 0 {}
    }

    fn unlock() {
        let flash = Self::regs();
        if flash.cr.read().bits() & CR_LOCK != 0 {
            flash.keyr.write(|w| unsafe { w.bits(KEY1) });
            flash.keyr.write(|w| unsafe { w.bits(KEY2) });
        }
    }

    fn lock() {
        let flash = Self::regs();
        flash.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_LOCK) });
    }

    /// Clear sticky error flags. Returns the flags that were set.
    fn take_errors() -> u32 {
        let flash = Self::regs();
        let errors = flash.sr.read().bits() & SR_ERRORS;
        if errors != 0 {
            flash.sr.write(|w| unsafe { w.bits(errors) });
        }
        errors
    }
}

impl Default for InternalFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashMemory for InternalFlash {
    const SEGMENT_SIZE: u32 = 0x4_0000;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        Self::check_range(addr, buf.len())?;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = unsafe { core::ptr::read_volatile((addr + i as u32) as *const u8) };
        }
        Ok(())
    }

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        Self::check_range(addr, data.len())?;
        let flash = Self::regs();

        Self::wait_idle();
        Self::take_errors();
        Self::unlock();
        flash.cr.modify(|r, w| unsafe {
            w.bits((r.bits() & !(CR_PSIZE_MASK | CR_SER)) | (PSIZE_X8 << CR_PSIZE_SHIFT) | CR_PG)
        });

        let mut result = Ok(());
        for (i, &b) in data.iter().enumerate() {
            unsafe { core::ptr::write_volatile((addr + i as u32) as *mut u8, b) };
            cortex_m::asm::dsb();
            Self::wait_idle();
            if Self::take_errors() != 0 {
                result = Err(FlashError::ProgramFailed);
                break;
            }
        }

        flash.cr.modify(|r, w| unsafe { w.bits(r.bits() & !CR_PG) });
        Self::lock();
        result
    }

    fn erase_segment(&mut self, addr: u32) -> Result<(), FlashError> {
        Self::check_range(addr, Self::SEGMENT_SIZE as usize)?;
        if (addr - LARGE_BASE) % Self::SEGMENT_SIZE != 0 {
            return Err(FlashError::Misaligned);
        }
        let flash = Self::regs();
        let sector = Self::sector(addr);

        Self::wait_idle();
        Self::take_errors();
        Self::unlock();
        flash.cr.modify(|r, w| unsafe {
            w.bits(
                (r.bits() & !(CR_PSIZE_MASK | CR_SNB_MASK | CR_PG))
                    | (PSIZE_X32 << CR_PSIZE_SHIFT)
                    | (sector << CR_SNB_SHIFT)
                    | CR_SER,
            )
        });
        flash.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_STRT) });
        Self::wait_idle();

        let errors = Self::take_errors();
        flash.cr.modify(|r, w| unsafe { w.bits(r.bits() & !(CR_SER | CR_SNB_MASK)) });
        Self::lock();

        if errors != 0 {
            log_warn!("sector {} erase failed: sr={}", sector, errors);
            return Err(FlashError::EraseFailed);
        }
        Ok(())
    }
}
