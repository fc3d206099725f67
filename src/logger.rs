//! The write side: gates records on the category mask, encodes them into a
//! reusable scratch buffer and hands finished records to a [`BlockWriter`].
//!
//! A log starts with one format record per catalogue entry so that it can be
//! replayed without the catalogue that wrote it.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::catalogue::Catalogue;
use crate::category::{Category, CategoryMask};
use crate::config::FORMAT_MSG_ID;
use crate::encoder::encode_into;
use crate::error::Result;
use crate::message::Message;
use crate::type_code::FieldValue;

/// Destination for finished records.
///
/// Every call carries exactly one whole record, so an implementation that
/// appends blocks in order produces a valid log.
pub trait BlockWriter {
    fn write_block(&mut self, block: &[u8]) -> io::Result<()>;

    /// Whether storage is present. Checked when a new log starts.
    fn card_inserted(&self) -> bool {
        true
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Growable in-memory log.
///
/// Clones share the same bytes, so a reader can take snapshots while a
/// logger keeps appending.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    /// Drops all stored bytes.
    pub fn erase(&self) {
        self.bytes.lock().clear();
    }
}

impl BlockWriter for MemoryLog {
    fn write_block(&mut self, block: &[u8]) -> io::Result<()> {
        self.bytes.lock().extend_from_slice(block);
        Ok(())
    }
}

/// Adapts any [`Write`] (a file, a socket, a `BufWriter`) to [`BlockWriter`].
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> BlockWriter for StreamWriter<W> {
    fn write_block(&mut self, block: &[u8]) -> io::Result<()> {
        self.inner.write_all(block)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Counters kept by a [`Logger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Records handed to the writer.
    pub written: u64,
    /// Optional records dropped because their category was disabled.
    pub suppressed: u64,
    pub bytes: u64,
}

/// Record writer for one log.
///
/// Not shareable between threads; the category mask is, so an operator
/// thread can toggle categories while the control loop logs.
pub struct Logger<'c, W: BlockWriter> {
    catalogue: &'c Catalogue,
    mask: Arc<CategoryMask>,
    writer: W,
    scratch: Box<[u8]>,
    stats: LoggerStats,
}

impl<'c, W: BlockWriter> Logger<'c, W> {
    pub fn new(catalogue: &'c Catalogue, mask: Arc<CategoryMask>, writer: W) -> Self {
        let scratch = vec![0u8; catalogue.max_record_len()].into_boxed_slice();
        Self {
            catalogue,
            mask,
            writer,
            scratch,
            stats: LoggerStats::default(),
        }
    }

    /// Starts a new log by describing every catalogue entry.
    ///
    /// Without storage there is nothing to log to: the mask is cleared so
    /// every optional record is dropped cheaply, and `Ok(false)` is returned.
    pub fn start_new_log(&mut self) -> Result<bool> {
        if !self.writer.card_inserted() {
            self.mask.store(0);
            warn!("no storage present, logging disabled");
            return Ok(false);
        }
        let formats = self.write_formats()?;
        debug!(formats, "new log started");
        Ok(true)
    }

    /// Writes one format record per catalogue entry, in catalogue order.
    pub fn write_formats(&mut self) -> Result<usize> {
        let catalogue = self.catalogue;
        let mut count = 0;
        for entry in catalogue.list() {
            let values = Catalogue::format_values(entry);
            let n = encode_into(catalogue, FORMAT_MSG_ID, &values, &mut self.scratch)?;
            self.writer.write_block(&self.scratch[..n])?;
            self.count_written(n);
            count += 1;
        }
        Ok(count)
    }

    /// Writes a record unconditionally.
    pub fn write(&mut self, message_id: u8, values: &[FieldValue]) -> Result<()> {
        let n = encode_into(self.catalogue, message_id, values, &mut self.scratch)?;
        self.writer.write_block(&self.scratch[..n])?;
        self.count_written(n);
        Ok(())
    }

    /// Writes a record only if `category` is enabled. Returns whether it was
    /// written.
    pub fn write_optional(
        &mut self,
        category: &Category,
        message_id: u8,
        values: &[FieldValue],
    ) -> Result<bool> {
        if !self.mask.is_enabled(category) {
            self.stats.suppressed += 1;
            return Ok(false);
        }
        self.write(message_id, values)?;
        Ok(true)
    }

    /// Writes a typed message, gated on its category if it has one.
    pub fn write_message<M: Message>(&mut self, message: &M) -> Result<bool> {
        if let Some(category) = M::CATEGORY {
            if !self.mask.is_enabled(&category) {
                self.stats.suppressed += 1;
                trace!(msg = M::NAME, category = category.name, "suppressed");
                return Ok(false);
            }
        }
        let n = message.encode_into(self.catalogue, &mut self.scratch)?;
        self.writer.write_block(&self.scratch[..n])?;
        self.count_written(n);
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn catalogue(&self) -> &'c Catalogue {
        self.catalogue
    }

    pub fn mask(&self) -> &Arc<CategoryMask> {
        &self.mask
    }

    pub fn stats(&self) -> LoggerStats {
        self.stats
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn count_written(&mut self, n: usize) {
        self.stats.written += 1;
        self.stats.bytes += n as u64;
    }
}

impl<W: BlockWriter> Drop for Logger<'_, W> {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            warn!(%err, "flush on drop failed");
        }
    }
}
