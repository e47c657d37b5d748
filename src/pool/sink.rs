//! Output sinks for corrected fields

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::frame::Sample;

/// Destination of the corrected field stream
pub trait FieldSink: Send {
    /// Write both fields of one frame, in the order given, as a single unit
    fn write_frame(&mut self, fields: [&[Sample]; 2]) -> io::Result<()>;

    /// Write a lone field (an out-of-order leading field)
    fn write_field(&mut self, field: &[Sample]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes fields as raw little-endian 16-bit samples
pub struct TbcWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: Write> TbcWriter<W> {
    pub fn new(inner: W) -> Self {
        TbcWriter {
            inner,
            buffer: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn encode(&mut self, fields: &[&[Sample]]) {
        let total: usize = fields.iter().map(|f| f.len() * 2).sum();
        self.buffer.resize(total, 0);
        let mut offset = 0;
        for field in fields {
            let bytes = field.len() * 2;
            LittleEndian::write_u16_into(field, &mut self.buffer[offset..offset + bytes]);
            offset += bytes;
        }
    }
}

impl<W: Write + Send> FieldSink for TbcWriter<W> {
    fn write_frame(&mut self, fields: [&[Sample]; 2]) -> io::Result<()> {
        self.encode(&fields);
        self.inner.write_all(&self.buffer)
    }

    fn write_field(&mut self, field: &[Sample]) -> io::Result<()> {
        self.encode(&[field]);
        self.inner.write_all(&self.buffer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_little_endian() {
        let mut writer = TbcWriter::new(Vec::new());
        writer.write_frame([&[0x0102, 0x0304], &[0xA0B0]]).unwrap();
        assert_eq!(writer.into_inner(), vec![0x02, 0x01, 0x04, 0x03, 0xB0, 0xA0]);
    }

    #[test]
    fn test_lone_field() {
        let mut writer = TbcWriter::new(Vec::new());
        writer.write_field(&[1, 2, 3]).unwrap();
        writer.write_frame([&[4], &[5]]).unwrap();
        FieldSink::flush(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), vec![1, 0, 2, 0, 3, 0, 4, 0, 5, 0]);
    }
}
