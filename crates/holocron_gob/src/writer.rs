use crate::{GobHeader, GOB_ENTRY_SIZE, GOB_MAGIC, GOB_NAME_SIZE, GOB_VERSION};
use anyhow::ensure;
use holocron_utils::{ok, packed::PackedWriteExt, AnyResult};
use std::io::Write;

/// Builds a GOB container in memory and writes it out in one go.
///
/// The directory is placed right after the header, followed by record data in insertion order.
#[derive(Debug, Default)]
pub struct GobWriter {
    entries: Vec<(String, Vec<u8>)>,
}

impl GobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record. Names are stored verbatim.
    pub fn add(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.entries.push((name.into(), data));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> AnyResult {
        const HEADER_SIZE: u64 = 12;

        let directory_size = 4 + self.entries.len() as u64 * GOB_ENTRY_SIZE;
        let mut data_offset = HEADER_SIZE + directory_size;

        w.write_packed(GobHeader {
            magic: GOB_MAGIC,
            version: GOB_VERSION,
            directory_offset: HEADER_SIZE as u32,
        })?;
        w.write_packed(u32::try_from(self.entries.len())?)?;

        for (name, data) in &self.entries {
            ensure!(name.is_ascii(), "record name `{name}` isn't ASCII");
            ensure!(
                name.len() < GOB_NAME_SIZE,
                "record name `{name}` is longer than {} bytes",
                GOB_NAME_SIZE - 1
            );

            let mut name_field = [0u8; GOB_NAME_SIZE];
            name_field[..name.len()].copy_from_slice(name.as_bytes());

            w.write_packed(u32::try_from(data_offset)?)?;
            w.write_packed(u32::try_from(data.len())?)?;
            w.write_all(&name_field)?;

            data_offset += data.len() as u64;
        }

        for (_, data) in &self.entries {
            w.write_all(data)?;
        }

        ok()
    }
}
