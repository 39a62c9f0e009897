use crate::{GobError, GobResult};
use holocron_proc::PackedData;
use holocron_utils::{packed::PackedReadExt, string_as_u32, AsciiDisplay, ReadSeek, SharedTake};
use log::*;
use parking_lot::Mutex;
use std::{
    fs::File,
    io::{BufReader, SeekFrom},
    path::Path,
    sync::Arc,
};

pub const GOB_MAGIC: u32 = string_as_u32("GOB ");
pub const GOB_VERSION: u32 = 0x14;
pub const GOB_NAME_SIZE: usize = 128;

/// Size of a single directory entry on disk
pub const GOB_ENTRY_SIZE: u64 = 8 + GOB_NAME_SIZE as u64;

#[derive(Debug, Clone, PackedData)]
pub struct GobHeader {
    pub magic: u32,
    pub version: u32,
    pub directory_offset: u32,
}

#[derive(Debug, Clone, PackedData)]
pub struct GobDirectoryEntry {
    pub offset: u32,
    pub length: u32,
    pub name: [u8; GOB_NAME_SIZE],
}

/// A single named record of a container, as listed in its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GobRecord {
    /// Name exactly as stored, with the container's own separators and casing
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// Stream over a single record. It's bounded to the record's bytes and independent of any other
/// stream opened on the same container.
pub type GobStream = SharedTake<dyn ReadSeek>;

/// An indexed GOB container. The directory is read once on open, the backing stream is kept
/// open for the container's lifetime.
pub struct GobContainer {
    label: String,
    source: Arc<Mutex<dyn ReadSeek>>,
    records: Vec<GobRecord>,
}

impl GobContainer {
    /// Opens and indexes a container file.
    pub fn open(path: impl AsRef<Path>) -> GobResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(path.display().to_string(), BufReader::new(file))
    }

    /// Indexes a container from an arbitrary stream. The label is only used for diagnostics.
    pub fn from_reader<R: ReadSeek + 'static>(label: impl Into<String>, mut reader: R) -> GobResult<Self> {
        let label = label.into();
        let records = read_directory(&label, &mut reader)?;

        trace!("Indexed container `{label}` with {} records", records.len());

        let source: Arc<Mutex<dyn ReadSeek>> = Arc::new(Mutex::new(reader));
        Ok(Self {
            label,
            source,
            records,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// All records, in directory order
    pub fn records(&self) -> &[GobRecord] {
        &self.records
    }

    /// Opens a bounded stream over the given record.
    pub fn open_record(&self, record: &GobRecord) -> GobStream {
        SharedTake::new(self.source.clone(), record.offset, record.length)
    }
}

fn read_directory(label: &str, r: &mut impl ReadSeek) -> GobResult<Vec<GobRecord>> {
    let file_len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(0))?;

    let header: GobHeader = r
        .read_packed()
        .map_err(|e| GobError::corrupt(label, format!("couldn't read the header: {e}")))?;

    if header.magic != GOB_MAGIC {
        return Err(GobError::corrupt(
            label,
            format!("invalid magic `{}`", AsciiDisplay(&header.magic.to_le_bytes())),
        ));
    }
    if header.version != GOB_VERSION {
        return Err(GobError::corrupt(
            label,
            format!("unsupported version {:#x}", header.version),
        ));
    }

    let directory_offset = u64::from(header.directory_offset);
    if directory_offset + 4 > file_len {
        return Err(GobError::corrupt(label, "directory starts past the end of file"));
    }

    r.seek(SeekFrom::Start(directory_offset))?;
    let count: u32 = r
        .read_packed()
        .map_err(|e| GobError::corrupt(label, format!("couldn't read the entry count: {e}")))?;

    if directory_offset + 4 + u64::from(count) * GOB_ENTRY_SIZE > file_len {
        return Err(GobError::corrupt(
            label,
            format!("directory of {count} entries extends past the end of file"),
        ));
    }

    let mut records = Vec::with_capacity(count as usize);
    for index in 0..count {
        let entry: GobDirectoryEntry = r
            .read_packed()
            .map_err(|e| GobError::corrupt(label, format!("couldn't read entry {index}: {e}")))?;

        let Some(name_len) = entry.name.iter().position(|&byte| byte == 0) else {
            return Err(GobError::corrupt(
                label,
                format!("entry {index} has an unterminated name"),
            ));
        };
        let name = String::from_utf8_lossy(&entry.name[..name_len]).into_owned();

        let offset = u64::from(entry.offset);
        let length = u64::from(entry.length);
        if offset + length > file_len {
            return Err(GobError::corrupt(
                label,
                format!("record `{name}` extends past the end of file"),
            ));
        }

        records.push(GobRecord {
            name,
            offset,
            length,
        });
    }

    Ok(records)
}
