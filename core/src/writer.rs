//! Sequential block writer
//!
//! Appends to a seekable stream while tracking the write cursor explicitly,
//! pads to alignment boundaries, and supports reserve-now/patch-later for
//! records whose contents depend on later output.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use hostpack_common::{Alignment, PackRecord};

use crate::error::{HostPackError, Result};

/// A byte range reserved earlier in the stream, to be patched later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a reservation must be patched before the stream is finished"]
pub struct Reservation {
    offset: u64,
    len: u64,
}

impl Reservation {
    pub(crate) fn len(&self) -> u64 {
        self.len
    }
}

pub struct BlockWriter<W: Write + Seek> {
    inner: W,
    cursor: u64,
}

impl<W: Write + Seek> BlockWriter<W> {
    /// Start writing at offset 0 of `inner`
    pub fn new(inner: W) -> Self {
        Self { inner, cursor: 0 }
    }

    /// Current write cursor (bytes written so far, including padding)
    pub fn position(&self) -> u64 {
        self.cursor
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.cursor += bytes.len() as u64;
        Ok(())
    }

    pub fn write_record<R: PackRecord>(&mut self, record: &R) -> Result<()> {
        self.write_bytes(&record.serialize())
    }

    pub fn write_f32_column(&mut self, values: impl IntoIterator<Item = f32>) -> Result<()> {
        for v in values {
            self.inner.write_f32::<LittleEndian>(v)?;
            self.cursor += 4;
        }
        Ok(())
    }

    pub fn write_u32_column(&mut self, values: impl IntoIterator<Item = u32>) -> Result<()> {
        for v in values {
            self.inner.write_u32::<LittleEndian>(v)?;
            self.cursor += 4;
        }
        Ok(())
    }

    pub fn write_zeros(&mut self, count: u64) -> Result<()> {
        let written = io::copy(&mut io::repeat(0).take(count), &mut self.inner)?;
        self.cursor += written;
        if written != count {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        Ok(())
    }

    /// Zero-pad up to the next multiple of `align`; returns the new cursor
    pub fn pad_to(&mut self, align: Alignment) -> Result<u64> {
        self.write_zeros(align.padding_for(self.cursor))?;
        Ok(self.cursor)
    }

    /// Write `len` zero bytes and remember where they went
    pub fn reserve(&mut self, len: u64) -> Result<Reservation> {
        let offset = self.cursor;
        self.write_zeros(len)?;
        Ok(Reservation { offset, len })
    }

    /// Overwrite a reservation, then return to the end of the stream
    pub fn patch(&mut self, reservation: Reservation, bytes: &[u8]) -> Result<()> {
        if bytes.len() as u64 != reservation.len {
            return Err(HostPackError::Internal(format!(
                "patch of {} bytes does not fit {}-byte reservation at {:#x}",
                bytes.len(),
                reservation.len,
                reservation.offset
            )));
        }
        self.inner.seek(SeekFrom::Start(reservation.offset))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.cursor))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying stream
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostpack_common::{Aabb, SceneRecord};
    use std::io::Cursor;

    fn writer() -> BlockWriter<Cursor<Vec<u8>>> {
        BlockWriter::new(Cursor::new(Vec::new()))
    }

    #[test]
    fn test_cursor_tracks_writes() {
        let mut w = writer();
        w.write_bytes(b"abc").unwrap();
        w.write_u32_column([1, 2]).unwrap();
        w.write_f32_column([0.5]).unwrap();
        assert_eq!(w.position(), 15);

        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(bytes.len(), 15);
        assert_eq!(&bytes[3..7], &1u32.to_le_bytes());
        assert_eq!(&bytes[11..15], &0.5f32.to_le_bytes());
    }

    #[test]
    fn test_pad_to_alignment() {
        let mut w = writer();
        let block = Alignment::new(16).unwrap();
        w.write_bytes(&[0xFF; 5]).unwrap();
        assert_eq!(w.pad_to(block).unwrap(), 16);
        // Already aligned: no-op
        assert_eq!(w.pad_to(block).unwrap(), 16);

        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(bytes.len(), 16);
        assert!(bytes[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reserve_and_patch() {
        let mut w = writer();
        let header = w.reserve(4).unwrap();
        w.write_bytes(b"tail").unwrap();
        w.patch(header, b"HEAD").unwrap();
        // Appends continue at the end after patching
        w.write_bytes(b"!").unwrap();
        assert_eq!(w.position(), 9);

        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(&bytes, b"HEADtail!");
    }

    #[test]
    fn test_patch_size_mismatch() {
        let mut w = writer();
        let r = w.reserve(8).unwrap();
        let err = w.patch(r, b"short").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn test_write_record() {
        let mut w = writer();
        w.write_record(&SceneRecord::new(Aabb::UNIT)).unwrap();
        assert_eq!(w.position(), SceneRecord::SIZE as u64);
    }
}
