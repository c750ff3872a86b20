//! Record bundle backend
//!
//! A flat Little-Endian container of typed records.
//!
//! Structure:
//! - Signature: 4 bytes ("RBDL")
//! - Version: 4 bytes (1)
//! - Record count: 4 bytes
//! - Records, each:
//!   - Path id: 8 bytes (i64)
//!   - Class id: 4 bytes (i32)
//!   - Payload length: 4 bytes, followed by the payload

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;

use super::error::ContainerError;
use super::types::{ClassId, Record, TextureUpdate};
use super::AssetContainer;

/// Bundle file signature
pub const BUNDLE_SIGNATURE: &[u8; 4] = b"RBDL";

/// Only version this backend reads and writes
pub const BUNDLE_VERSION: u32 = 1;

/// In-memory record bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBundle {
    records: Vec<Record>,
}

impl RecordBundle {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse a bundle from bytes
    pub fn parse(data: &[u8]) -> Result<Self, ContainerError> {
        let mut cursor = Cursor::new(data);

        let mut signature = [0u8; 4];
        cursor
            .read_exact(&mut signature)
            .map_err(ContainerError::from_read)?;
        if &signature != BUNDLE_SIGNATURE {
            return Err(ContainerError::InvalidFile(format!(
                "Invalid signature: {:?}",
                signature
            )));
        }

        let version = cursor
            .read_u32::<LittleEndian>()
            .map_err(ContainerError::from_read)?;
        if version != BUNDLE_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(ContainerError::from_read)?;
        tracing::debug!("Bundle: version={}, records={}", version, count);

        // Every record needs at least 16 header bytes; don't trust `count` for allocation
        let remaining = data.len().saturating_sub(cursor.position() as usize);
        let mut records = Vec::with_capacity((count as usize).min(remaining / 16));

        for index in 0..count {
            let path_id = cursor
                .read_i64::<LittleEndian>()
                .map_err(ContainerError::from_read)?;
            let class_id = ClassId(
                cursor
                    .read_i32::<LittleEndian>()
                    .map_err(ContainerError::from_read)?,
            );
            let len = cursor
                .read_u32::<LittleEndian>()
                .map_err(ContainerError::from_read)? as usize;

            let start = cursor.position() as usize;
            let end = start
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    ContainerError::InvalidFile(format!(
                        "record {} (path id {}) is truncated",
                        index, path_id
                    ))
                })?;
            records.push(Record::new(path_id, class_id, data[start..end].to_vec()));
            cursor.set_position(end as u64);
        }

        let consumed = cursor.position() as usize;
        if consumed != data.len() {
            return Err(ContainerError::InvalidFile(format!(
                "{} unexpected bytes after last record",
                data.len() - consumed
            )));
        }

        Ok(Self { records })
    }

    /// Load a bundle from disk
    pub fn load(path: &Path) -> Result<Self, ContainerError> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Append a record, used when assembling bundles
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }
}

impl AssetContainer for RecordBundle {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    fn replace_texture(
        &mut self,
        index: usize,
        update: TextureUpdate,
    ) -> Result<(), ContainerError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(ContainerError::RecordOutOfRange(index))?;
        if !record.class_id.is_texture() {
            return Err(ContainerError::NotATexture(index));
        }

        let mut header = record.texture()?;
        header.apply(update)?;
        // Only swap the payload once the new one is fully built
        record.payload = header.to_payload()?;
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, ContainerError> {
        let body: usize = self.records.iter().map(|r| 16 + r.payload.len()).sum();
        let mut out = Vec::with_capacity(12 + body);

        out.extend_from_slice(BUNDLE_SIGNATURE);
        out.write_u32::<LittleEndian>(BUNDLE_VERSION)?;
        out.write_u32::<LittleEndian>(
            u32::try_from(self.records.len())
                .map_err(|_| ContainerError::Overflow("record count".into()))?,
        )?;

        for record in &self.records {
            out.write_i64::<LittleEndian>(record.path_id)?;
            out.write_i32::<LittleEndian>(record.class_id.0)?;
            out.write_u32::<LittleEndian>(u32::try_from(record.payload.len()).map_err(|_| {
                ContainerError::Overflow(format!("payload of record {}", record.path_id))
            })?)?;
            out.extend_from_slice(&record.payload);
        }

        Ok(out)
    }
}
