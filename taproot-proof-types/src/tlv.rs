//! BigSize TLV primitives shared by every encoded structure.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use alloc::format;
use bitcoin::io::{self as bitcoin_io, Read};

use crate::error::Error;

/// Largest value accepted for a single TLV record.
pub const MAX_RECORD_SIZE: u64 = 64 * 1024 * 1024;

/// Unknown odd TLV records retained for re-encoding.
pub type UnknownOddTypes = BTreeMap<u64, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type(pub u64);

impl Type {
    pub fn is_even(self) -> bool {
        self.0 % 2 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    tlv_type: Type,
    value: Vec<u8>,
}

impl Record {
    pub fn tlv_type(&self) -> Type {
        self.tlv_type
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    pub fn value_reader(&self) -> bitcoin_io::Cursor<&[u8]> {
        bitcoin_io::Cursor::new(&self.value)
    }

    /// Stores an unrecognised record, rejecting it if its type is even.
    pub fn retain_unknown(self, unknown: &mut UnknownOddTypes) -> Result<(), Error> {
        if self.tlv_type.is_even() {
            return Err(Error::UnknownTlvType(self.tlv_type.0));
        }
        unknown.insert(self.tlv_type.0, self.value);
        Ok(())
    }
}

/// Reader over a TLV stream that enforces strictly increasing types.
pub struct Stream<R: Read> {
    reader: R,
    last_type: Option<u64>,
}

impl<R: Read> Stream<R> {
    pub fn new(reader: R) -> Self {
        Stream {
            reader,
            last_type: None,
        }
    }

    /// Returns the next record, or `None` on a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, Error> {
        let mut first = [0u8; 1];
        if self.reader.read(&mut first)? == 0 {
            return Ok(None);
        }
        let tlv_type = read_bigsize_tail(&mut self.reader, first[0])?;

        if let Some(last) = self.last_type {
            if tlv_type <= last {
                return Err(Error::UnorderedTlvType(tlv_type));
            }
        }
        self.last_type = Some(tlv_type);

        let length = read_bigsize(&mut self.reader)?;
        if length > MAX_RECORD_SIZE {
            return Err(Error::RecordTooLarge { tlv_type, length });
        }

        let value = read_exact_len(&mut self.reader, length).map_err(|e| {
            Error::TlvStream(format!(
                "failed to read value for type {} (length {}): {}",
                tlv_type, length, e
            ))
        })?;

        Ok(Some(Record {
            tlv_type: Type(tlv_type),
            value,
        }))
    }
}

/// Collects records so they can be written in ascending type order.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: BTreeMap<u64, Vec<u8>>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, tlv_type: u64, value: Vec<u8>) {
        self.records.insert(tlv_type, value);
    }

    pub fn put_unknown(&mut self, unknown: &UnknownOddTypes) {
        for (tlv_type, value) in unknown {
            self.records
                .entry(*tlv_type)
                .or_insert_with(|| value.clone());
        }
    }

    pub fn write(self, out: &mut Vec<u8>) {
        for (tlv_type, value) in self.records {
            encode_record(tlv_type, &value, out);
        }
    }
}

/// Encodes a TLV record into the provided buffer.
pub fn encode_record(tlv_type: u64, value: &[u8], out: &mut Vec<u8>) {
    encode_bigsize(tlv_type, out);
    encode_bigsize(value.len() as u64, out);
    out.extend_from_slice(value);
}

/// Encodes a BigSize varint into the provided buffer.
pub fn encode_bigsize(value: u64, out: &mut Vec<u8>) {
    match value {
        0..=0xFC => out.push(value as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Encodes length-prefixed bytes into the provided buffer.
pub fn encode_var_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_bigsize(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

/// Reads a fixed-size byte array.
pub fn read_array<const N: usize, R: Read>(r: &mut R) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8, Error> {
    Ok(read_array::<1, _>(r)?[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> Result<u16, Error> {
    Ok(u16::from_be_bytes(read_array(r)?))
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32, Error> {
    Ok(u32::from_be_bytes(read_array(r)?))
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64, Error> {
    Ok(u64::from_be_bytes(read_array(r)?))
}

/// Reads a minimally encoded BigSize varint.
pub fn read_bigsize<R: Read>(r: &mut R) -> Result<u64, Error> {
    let first = read_u8(r)?;
    read_bigsize_tail(r, first)
}

fn read_bigsize_tail<R: Read>(r: &mut R, first: u8) -> Result<u64, Error> {
    let (value, min) = match first {
        0..=0xFC => return Ok(first as u64),
        0xFD => (read_u16(r)? as u64, 0xFD),
        0xFE => (read_u32(r)? as u64, 0x1_0000),
        0xFF => (read_u64(r)?, 0x1_0000_0000),
    };
    if value < min {
        return Err(Error::NonCanonicalBigSize);
    }
    Ok(value)
}

/// Reads length-prefixed bytes, rejecting lengths above `max`.
pub fn read_var_bytes<R: Read>(r: &mut R, max: u64) -> Result<Vec<u8>, Error> {
    let length = read_bigsize(r)?;
    if length > max {
        return Err(Error::TlvStream(format!(
            "var bytes length {} exceeds {}",
            length, max
        )));
    }
    read_exact_len(r, length)
}

/// Reads exactly `length` bytes. The buffer grows with the bytes actually
/// read, so a large declared length costs nothing until data arrives.
pub fn read_exact_len<R: Read>(r: &mut R, length: u64) -> Result<Vec<u8>, Error> {
    let mut value = Vec::new();
    r.take(length).read_to_end(&mut value)?;
    if value.len() as u64 != length {
        return Err(Error::TlvStream(format!(
            "expected {} bytes, got {}",
            length,
            value.len()
        )));
    }
    Ok(value)
}

/// Reads everything left in the reader.
pub fn read_to_end<R: Read>(r: &mut R) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match r.read(&mut chunk)? {
            0 => return Ok(out),
            n => out.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Fails if a record value was not fully consumed by its decoder.
pub fn ensure_consumed(record: &Record, cursor: &bitcoin_io::Cursor<&[u8]>) -> Result<(), Error> {
    let total = record.value().len() as u64;
    if cursor.position() != total {
        return Err(Error::InvalidTlvValue(
            record.tlv_type().0,
            format!("{} trailing bytes", total - cursor.position()),
        ));
    }
    Ok(())
}

/// Parses a fixed-length record value.
pub fn fixed_value<const N: usize>(record: &Record) -> Result<[u8; N], Error> {
    record.value().try_into().map_err(|_| {
        Error::InvalidTlvValue(
            record.tlv_type().0,
            format!("expected {} bytes, got {}", N, record.value().len()),
        )
    })
}
