use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use pmguard::trace::TraceRecord;

use crate::error::{Result, TraceError};

/// "PMTR", little endian.
pub const TRACE_MAGIC: u32 = 0x5254_4D50;
pub const TRACE_VERSION: u32 = 1;

/// 16-byte file header: magic, format version, execution id (names the
/// backtrace log files of the same run), reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceFileHeader {
    pub version: u32,
    pub exec_id: u32,
}

impl TraceFileHeader {
    pub const SIZE: usize = 16;

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != TRACE_MAGIC {
            return Err(TraceError::InvalidMagic);
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != TRACE_VERSION {
            return Err(TraceError::UnsupportedVersion(version));
        }
        let exec_id = reader.read_u32::<LittleEndian>()?;
        let _reserved = reader.read_u32::<LittleEndian>()?;
        Ok(Self { version, exec_id })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u32::<LittleEndian>(TRACE_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.exec_id)?;
        writer.write_u32::<LittleEndian>(0)?;
        Ok(())
    }
}

/// Per-entry frame: sequence number, payload length, CRC64 over
/// `seq || len || payload`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub seq: u64,
    pub payload_len: u32,
    pub checksum: u64,
}

impl EntryHeader {
    pub const SIZE: usize = 8 + 4 + 8;
}

fn entry_checksum(seq: u64, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

/// Append-only trace-log writer; sequence numbers are assigned here.
pub struct TraceWriter {
    file: File,
    next_seq: u64,
}

impl TraceWriter {
    /// Create (truncating) a trace log and write its header.
    pub fn create(path: impl AsRef<Path>, exec_id: u32) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        TraceFileHeader { version: TRACE_VERSION, exec_id }.write_to(&mut file)?;
        Ok(Self { file, next_seq: 0 })
    }

    /// Append one record; returns its sequence number.
    pub fn append(&mut self, record: &TraceRecord) -> Result<u64> {
        let seq = self.next_seq;
        let payload = bincode::serde::encode_to_vec(record, bincode::config::standard())?;
        let checksum = entry_checksum(seq, &payload);

        self.file.write_u64::<LittleEndian>(seq)?;
        self.file.write_u32::<LittleEndian>(payload.len() as u32)?;
        self.file.write_u64::<LittleEndian>(checksum)?;
        self.file.write_all(&payload)?;

        self.next_seq += 1;
        Ok(seq)
    }
}

/// Iterator-based trace-log reader. A clean EOF ends iteration; corruption
/// and truncation surface as typed errors.
pub struct TraceReader {
    reader: BufReader<File>,
    header: TraceFileHeader,
}

impl TraceReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let header = TraceFileHeader::read_from(&mut reader)?;
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> TraceFileHeader {
        self.header
    }

    pub fn exec_id(&self) -> u32 {
        self.header.exec_id
    }
}

impl Iterator for TraceReader {
    type Item = Result<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = match self.reader.read_u64::<LittleEndian>() {
            Ok(seq) => seq,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(TraceError::Io(e))),
        };
        let frame = (|| {
            let payload_len = self.reader.read_u32::<LittleEndian>()?;
            let checksum = self.reader.read_u64::<LittleEndian>()?;
            let mut payload = vec![0u8; payload_len as usize];
            self.reader.read_exact(&mut payload)?;
            io::Result::Ok((checksum, payload))
        })();
        let (checksum, payload) = match frame {
            Ok(frame) => frame,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Some(Err(TraceError::Truncated { seq }));
            }
            Err(e) => return Some(Err(TraceError::Io(e))),
        };

        let found = entry_checksum(seq, &payload);
        if found != checksum {
            return Some(Err(TraceError::ChecksumMismatch { seq, expected: checksum, found }));
        }

        let decoded =
            bincode::serde::decode_from_slice::<TraceRecord, _>(&payload, bincode::config::standard());
        match decoded {
            Ok((record, _)) => Some(Ok(record)),
            Err(e) => Some(Err(TraceError::Decode(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmguard::trace::PmOp;

    fn record(op: PmOp, dst: u64, size: u64) -> TraceRecord {
        TraceRecord {
            op,
            tid: 0,
            ip: 0x4012ab,
            src_addr: 0,
            dst_addr: dst,
            size,
            ret: true,
        }
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.trace");

        let mut writer = TraceWriter::create(&path, 7).unwrap();
        let records = vec![
            record(PmOp::Alloc, 0x1000_0000_1000, 64),
            record(PmOp::Write, 0x1000_0000_1000, 8),
            record(PmOp::Flush, 0x1000_0000_1000, 64),
            record(PmOp::Drain, 0, 1),
        ];
        for rec in &records {
            writer.append(rec).unwrap();
        }

        let reader = TraceReader::open(&path).unwrap();
        assert_eq!(reader.exec_id(), 7);
        let read: Vec<TraceRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(read, records);
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.trace");
        std::fs::write(&path, b"not a trace log at all").unwrap();

        assert!(matches!(TraceReader::open(&path), Err(TraceError::InvalidMagic)));
    }

    #[test]
    fn test_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.trace");

        let mut writer = TraceWriter::create(&path, 1).unwrap();
        writer.append(&record(PmOp::Write, 0x1000_0000_2000, 16)).unwrap();
        drop(writer);

        // Flip one payload byte past the header and entry frame.
        let mut bytes = std::fs::read(&path).unwrap();
        let idx = TraceFileHeader::SIZE + EntryHeader::SIZE + 1;
        bytes[idx] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = TraceReader::open(&path).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(TraceError::ChecksumMismatch { seq: 0, .. }))
        ));
    }

    #[test]
    fn test_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.trace");

        let mut writer = TraceWriter::create(&path, 1).unwrap();
        writer.append(&record(PmOp::Write, 0x1000_0000_2000, 16)).unwrap();
        writer.append(&record(PmOp::Drain, 0, 1)).unwrap();
        drop(writer);

        // Drop the last few bytes, as a crashed capture run would.
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let mut reader = TraceReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(TraceError::Truncated { seq: 1 }))));
    }
}
