// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Stored file viewer.
//!
//! Row 0 of the LCD shows the file name, row 1 one page of content. The button advances one page
//! and wraps back to the first after the last.

use heapless::Vec;

use crate::config::{FILE_NAME_LEN, LCD_COLS};
use crate::context::{DeviceContext, Mode};
use crate::error::{Error, StorageError};
use crate::hw::traits::CharDisplay;
use crate::storage::{with_store, FlashMemory, SharedStore};

const PAGE: usize = LCD_COLS as usize;

/// Page position within the selected file. Reset on mode entry and on every `r<n>` command.
#[derive(Debug, Default)]
pub struct BrowseSession {
    page: usize,
    shown: bool,
}

impl BrowseSession {
    pub const fn new() -> Self {
        Self {
            page: 0,
            shown: false,
        }
    }

    #[inline]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Draw the first page, then redraw on every button press.
    pub fn step<D, F>(&mut self, ctx: &DeviceContext, lcd: &mut D, store: &SharedStore<F>)
    where
        D: CharDisplay,
        F: FlashMemory,
    {
        if ctx.take_selection_change() {
            ctx.take_button();
            *self = Self::new();
        }

        if self.shown {
            if !ctx.take_button() {
                return;
            }
            self.page += 1;
        }

        let index = ctx.selected_file();
        let mut name: Vec<u8, FILE_NAME_LEN> = Vec::new();
        let mut text = [0u8; PAGE];

        let loaded: Result<(usize, usize), Error> = with_store(store, |s| {
            let entry = s.entry(index).ok_or(StorageError::InvalidIndex)?;
            name = entry.name.clone();
            let pages = (entry.size as usize).div_ceil(PAGE).max(1);
            let page = self.page % pages;

            match s.read_at(index, page * PAGE, &mut text) {
                Ok(bytes) => Ok((page, bytes.len())),
                Err(Error::Storage(StorageError::NoContent)) => Ok((0, 0)),
                Err(e) => Err(e),
            }
        });

        let (page, len) = match loaded {
            Ok(shown) => shown,
            Err(e) => {
                log_warn!("browse file {}: {:?}", index, e);
                ctx.set_mode(Mode::Idle);
                return;
            }
        };
        self.page = page;
        self.shown = true;

        lcd.clear();
        lcd.set_cursor(0, 0);
        for &b in name.iter() {
            lcd.write_byte(b);
        }
        lcd.set_cursor(1, 0);
        for &b in &text[..len] {
            lcd.write_byte(b);
        }
    }
}
