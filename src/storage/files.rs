// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Flat flash file store with a fixed ten-slot table.
//!
//! Files are laid out back to back in the file region in slot order. A file never straddles an
//! erase segment: when it would, it starts at the next segment boundary instead.
//!
//! Uploads arrive in chunks from the host link and are staged in RAM; nothing touches flash until
//! the file is finalized. The content is then programmed in one pass. When its span is not blank
//! (a reused slot, or leftovers from an upload cut short by a reset) the segment is erased and the
//! other files in it are written back first.
//!
//! The table is appended to its own block through a [`Journal`] when a file is finalized.
//! Record format (little endian):
//!
//! ```text
//! [count: u8] then MAX_FILES records of
//! [name: 10 bytes, zero padded][kind: u8][size: u16][address: u32]
//! ```

use heapless::Vec;

use crate::config::{FlashLayout, FILE_NAME_LEN, MAX_FILES, MAX_FILE_SIZE};
use crate::error::{Result, StorageError};
use crate::storage::flash::{segment_start, FlashMemory};
use crate::storage::journal::Journal;

const RECORD_LEN: usize = FILE_NAME_LEN + 1 + 2 + 4;
const TABLE_LEN: usize = 1 + MAX_FILES * RECORD_LEN;

const CONTENT_LEN: usize = MAX_FILE_SIZE as usize;

/// Content of every file but one, held while its segment is erased.
const SURVIVOR_LEN: usize = (MAX_FILES - 1) * CONTENT_LEN;

/// Read size for blank checks.
const SCAN_CHUNK: usize = 32;

/// Content type of a stored file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileKind {
    /// Hex-encoded opcode script.
    Script,
    /// Plain text shown on the LCD.
    Text,
}

impl FileKind {
    fn to_byte(self) -> u8 {
        match self {
            FileKind::Script => 0,
            FileKind::Text => 1,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(FileKind::Script),
            1 => Some(FileKind::Text),
            _ => None,
        }
    }
}

/// One slot of the file table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: Vec<u8, FILE_NAME_LEN>,
    pub kind: FileKind,
    /// Committed size once finalized; the reserved size while an upload is staged.
    pub size: u16,
    /// Absolute flash address of the content.
    pub address: u32,
}

impl FileEntry {
    const EMPTY: FileEntry = FileEntry {
        name: Vec::new(),
        kind: FileKind::Script,
        size: 0,
        address: 0,
    };

    /// Name as text. Names only ever hold printable ASCII.
    pub fn name_str(&self) -> &str {
        core::str::from_utf8(&self.name).unwrap_or("?")
    }

    fn end(&self) -> u32 {
        self.address + self.size as u32
    }
}

/// File being received from the host.
struct Upload {
    index: usize,
    entry: FileEntry,
    content: Vec<u8, CONTENT_LEN>,
}

pub struct FileStore<F> {
    flash: F,
    layout: FlashLayout,
    entries: [FileEntry; MAX_FILES],
    count: usize,
    upload: Option<Upload>,
    table: Journal<TABLE_LEN>,
}

impl<F: FlashMemory> FileStore<F> {
    /// Empty store. Call [`FileStore::load`] once the flash is usable.
    pub const fn new(flash: F, layout: FlashLayout) -> Self {
        Self {
            flash,
            layout,
            entries: [FileEntry::EMPTY; MAX_FILES],
            count: 0,
            upload: None,
            table: Journal::new(layout.table_addr),
        }
    }

    /// Number of finalized files.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Finalized entry at `index`.
    pub fn entry(&self, index: usize) -> Option<&FileEntry> {
        if index < self.count {
            self.entries.get(index)
        } else {
            None
        }
    }

    /// Underlying device, for the other persistent blocks.
    #[inline]
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Slot the next upload goes to. A full table reuses the last slot.
    #[inline]
    pub fn next_slot(&self) -> usize {
        self.count.min(MAX_FILES - 1)
    }

    /// Content address for `size` bytes in slot `index`, given the slots before it.
    ///
    /// The file follows the end of slot `index - 1` (the sum of the sizes before it unless a
    /// file was relocated) and moves to the next segment boundary when
    /// `offset_in_segment + size` would exceed the segment.
    pub fn allocate(&self, index: usize, size: u16) -> Result<u32> {
        if index >= MAX_FILES || index > self.count {
            return Err(StorageError::InvalidIndex.into());
        }

        let seg = F::SEGMENT_SIZE;
        let start = match index {
            0 => self.layout.files_start,
            i => self.entries[i - 1].end(),
        };

        let address = if start % seg + size as u32 > seg {
            segment_start(start, seg) + seg
        } else {
            start
        };

        if address + size as u32 > self.layout.files_end() {
            return Err(StorageError::RegionFull.into());
        }
        Ok(address)
    }

    /// Start staging a new file for slot `index`. Replaces any upload left unfinished.
    pub fn create(&mut self, index: usize, name: &[u8]) -> Result<u32> {
        let address = self.allocate(index, 0)?;

        let mut entry = FileEntry::EMPTY;
        let _ = entry
            .name
            .extend_from_slice(&name[..name.len().min(FILE_NAME_LEN)]);
        entry.address = address;

        if let Some(stale) = self.upload.replace(Upload {
            index,
            entry,
            content: Vec::new(),
        }) {
            log_warn!("file {}: unfinished upload dropped", stale.index);
        }

        log_info!("file {}: create at {:#x}", index, address);
        Ok(address)
    }

    fn upload_mut(&mut self, index: usize) -> Result<&mut Upload> {
        match self.upload.as_mut() {
            Some(up) if up.index == index => Ok(up),
            _ => Err(StorageError::NoUpload.into()),
        }
    }

    pub fn set_kind(&mut self, index: usize, kind: FileKind) -> Result<()> {
        self.upload_mut(index)?.entry.kind = kind;
        Ok(())
    }

    /// Reserve `size` bytes (clamped to the per-file maximum) and re-resolve the address.
    /// Returns the reserved size.
    pub fn reserve(&mut self, index: usize, size: u16) -> Result<u16> {
        let size = size.min(MAX_FILE_SIZE);
        let address = self.allocate(index, size)?;

        let up = self.upload_mut(index)?;
        up.entry.size = size;
        up.entry.address = address;
        up.content.clear();

        log_debug!("file {}: reserve {} bytes at {:#x}", index, size, address);
        Ok(size)
    }

    /// Stage one content chunk. Line breaks are dropped and staging stops at the reserved size.
    /// Returns the number of bytes kept.
    pub fn append(&mut self, index: usize, bytes: &[u8]) -> Result<usize> {
        let up = self.upload_mut(index)?;
        let room = (up.entry.size as usize).saturating_sub(up.content.len());

        let mut kept = 0;
        for &b in bytes.iter().filter(|&&b| b != b'\n' && b != b'\r').take(room) {
            if up.content.push(b).is_err() {
                break;
            }
            kept += 1;
        }
        Ok(kept)
    }

    /// Close slot `index`: program the staged content, record its size and persist the table.
    pub fn finalize(&mut self, index: usize) -> Result<()> {
        self.upload_mut(index)?;
        let Some(Upload {
            mut entry, content, ..
        }) = self.upload.take()
        else {
            return Err(StorageError::NoUpload.into());
        };

        entry.size = content.len() as u16;
        if !content.is_empty() {
            self.commit(index, entry.address, &content)?;
        }

        self.entries[index] = entry;
        self.count = self.count.max(index + 1);

        log_info!(
            "file {}: finalize {} bytes, {} file(s)",
            index,
            content.len(),
            self.count
        );
        self.persist()
    }

    /// Program `content` at `address`, erasing its segment first if the span is not blank.
    fn commit(&mut self, index: usize, address: u32, content: &[u8]) -> Result<()> {
        if self.is_blank(address, content.len())? {
            self.flash.program(address, content)?;
            return Ok(());
        }

        let seg = segment_start(address, F::SEGMENT_SIZE);
        let span = address..address + content.len() as u32;

        // Everything else finalized in this segment goes back after the erase.
        let mut saved = [0u8; SURVIVOR_LEN];
        let mut kept: Vec<(u32, usize, usize), MAX_FILES> = Vec::new();
        let mut used = 0;
        for (i, e) in self.entries[..self.count].iter().enumerate() {
            let overlaps = e.address < span.end && span.start < e.end();
            let elsewhere = segment_start(e.address, F::SEGMENT_SIZE) != seg;
            if i == index || e.size == 0 || overlaps || elsewhere {
                continue;
            }
            let len = e.size as usize;
            self.flash.read(e.address, &mut saved[used..used + len])?;
            let _ = kept.push((e.address, used, len));
            used += len;
        }

        log_info!("file {}: erase segment {:#x}, {} file(s) kept", index, seg, kept.len());
        self.flash.erase_segment(seg)?;
        for &(addr, offset, len) in &kept {
            self.flash.program(addr, &saved[offset..offset + len])?;
        }
        self.flash.program(address, content)?;
        Ok(())
    }

    fn is_blank(&mut self, address: u32, len: usize) -> Result<bool> {
        let mut buf = [0u8; SCAN_CHUNK];
        let mut offset = 0;
        while offset < len {
            let n = (len - offset).min(SCAN_CHUNK);
            self.flash.read(address + offset as u32, &mut buf[..n])?;
            if buf[..n].iter().any(|&b| b != 0xFF) {
                return Ok(false);
            }
            offset += n;
        }
        Ok(true)
    }

    /// Copy up to `buf.len()` bytes of slot `index` starting at `offset`.
    pub fn read_at<'b>(&mut self, index: usize, offset: usize, buf: &'b mut [u8]) -> Result<&'b [u8]> {
        let (address, size) = match self.entry(index) {
            Some(e) => (e.address, e.size as usize),
            None => return Err(StorageError::InvalidIndex.into()),
        };
        if size == 0 {
            return Err(StorageError::NoContent.into());
        }

        let len = size.saturating_sub(offset).min(buf.len());
        self.flash.read(address + offset as u32, &mut buf[..len])?;
        Ok(&buf[..len])
    }

    /// Copy the content of slot `index` into `buf`.
    #[inline]
    pub fn read<'b>(&mut self, index: usize, buf: &'b mut [u8]) -> Result<&'b [u8]> {
        self.read_at(index, 0, buf)
    }

    /// Append the current table to the table block.
    pub fn persist(&mut self) -> Result<()> {
        let mut block = [0u8; TABLE_LEN];
        block[0] = self.count as u8;

        for (entry, record) in self
            .entries
            .iter()
            .zip(block[1..].chunks_exact_mut(RECORD_LEN))
        {
            record[..entry.name.len()].copy_from_slice(&entry.name);
            record[FILE_NAME_LEN] = entry.kind.to_byte();
            record[FILE_NAME_LEN + 1..FILE_NAME_LEN + 3].copy_from_slice(&entry.size.to_le_bytes());
            record[FILE_NAME_LEN + 3..].copy_from_slice(&entry.address.to_le_bytes());
        }

        self.table.append(&mut self.flash, &block)
    }

    /// Reload the table from flash. A missing table, or one that fails validation (count out of
    /// range, entries outside the region), leaves the store empty.
    pub fn load(&mut self) -> Result<()> {
        self.entries = [FileEntry::EMPTY; MAX_FILES];
        self.count = 0;
        self.upload = None;

        let mut block = [0u8; TABLE_LEN];
        if !self.table.load(&mut self.flash, &mut block)? {
            log_info!("file table: none stored, starting empty");
            return Ok(());
        }

        let count = block[0] as usize;
        if count > MAX_FILES {
            log_warn!("file table: invalid count {}, starting empty", count);
            return Ok(());
        }

        for (i, record) in block[1..].chunks_exact(RECORD_LEN).take(count).enumerate() {
            match self.decode_record(record) {
                Some(entry) => self.entries[i] = entry,
                None => {
                    log_warn!("file table: slot {} invalid, starting empty", i);
                    self.entries = [FileEntry::EMPTY; MAX_FILES];
                    return Ok(());
                }
            }
        }

        self.count = count;
        log_info!("file table: {} file(s) loaded", count);
        Ok(())
    }

    fn decode_record(&self, record: &[u8]) -> Option<FileEntry> {
        let name_bytes = &record[..FILE_NAME_LEN];
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILE_NAME_LEN);
        let kind = FileKind::from_byte(record[FILE_NAME_LEN])?;
        let size = u16::from_le_bytes([record[FILE_NAME_LEN + 1], record[FILE_NAME_LEN + 2]]);
        let mut addr = [0u8; 4];
        addr.copy_from_slice(&record[FILE_NAME_LEN + 3..]);
        let address = u32::from_le_bytes(addr);

        let in_region = address >= self.layout.files_start
            && address as u64 + size as u64 <= self.layout.files_end() as u64;
        if size > MAX_FILE_SIZE || !in_region {
            return None;
        }

        Some(FileEntry {
            name: Vec::from_slice(&name_bytes[..name_len]).ok()?,
            kind,
            size,
            address,
        })
    }
}
