use crate::{GobContainer, GobError, GobRecord, GobResult, GobStream};
use ahash::{AHashMap, AHashSet};
use holocron_utils::ReadSeek;
use log::*;
use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// Turns a logical file name into its lookup key: lowercase, `/` separated, no leading separator.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_ascii_lowercase()
}

/// Layered, case-insensitive view over overlay directories and GOB containers.
///
/// Lookups check overlay directories first, in registration order, then the container index.
/// If several containers hold a record of the same name, the one registered first wins.
#[derive(Default)]
pub struct Vfs {
    overlays: Vec<PathBuf>,
    containers: Vec<GobContainer>,
    labels: AHashSet<String>,
    /// Normalized name -> (container, record)
    index: AHashMap<String, (usize, usize)>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory whose files shadow container records. Returns `false` if the
    /// directory was already registered.
    pub fn add_overlay_directory(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.overlays.iter().any(|known| known == path) {
            debug!("Overlay directory `{}` is already registered", path.display());
            return false;
        }

        trace!("Registering overlay directory `{}`", path.display());
        self.overlays.push(path.to_path_buf());
        true
    }

    /// Opens and indexes a container file.
    ///
    /// Returns `false` if the file doesn't exist or was already added, and an error if the
    /// container is corrupt.
    pub fn add_container(&mut self, path: impl AsRef<Path>) -> GobResult<bool> {
        let path = path.as_ref();
        let label = path.display().to_string();

        if self.labels.contains(&label) {
            debug!("Container `{label}` is already mounted");
            return Ok(false);
        }
        if !path.is_file() {
            debug!("Container `{label}` doesn't exist, skipping");
            return Ok(false);
        }

        let container = GobContainer::open(path)?;
        Ok(self.mount(container))
    }

    /// Indexes a container from an arbitrary stream. Returns `false` if a container with the
    /// same label was already added.
    pub fn add_container_reader<R: ReadSeek + 'static>(
        &mut self,
        label: impl Into<String>,
        reader: R,
    ) -> GobResult<bool> {
        let label = label.into();
        if self.labels.contains(&label) {
            return Ok(false);
        }

        let container = GobContainer::from_reader(label, reader)?;
        Ok(self.mount(container))
    }

    fn mount(&mut self, container: GobContainer) -> bool {
        let container_index = self.containers.len();
        let mut shadowed = 0;

        for (record_index, record) in container.records().iter().enumerate() {
            let key = normalize_name(&record.name);
            if self.index.contains_key(&key) {
                shadowed += 1;
                continue;
            }
            self.index.insert(key, (container_index, record_index));
        }

        info!(
            "Mounted `{}` ({} records, {shadowed} shadowed by earlier containers)",
            container.label(),
            container.records().len()
        );

        self.labels.insert(container.label().to_string());
        self.containers.push(container);
        true
    }

    /// Checks whether a file is available, either on disk or in a container.
    pub fn exists(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.find_on_disk(&key).is_some() || self.index.contains_key(&key)
    }

    /// Opens a file, preferring overlay directories over container records.
    pub fn open(&self, name: &str) -> GobResult<VfsStream> {
        let key = normalize_name(name);

        if let Some(path) = self.find_on_disk(&key) {
            trace!("Opening `{name}` from `{}`", path.display());
            return Ok(VfsStream::Disk(BufReader::new(File::open(path)?)));
        }

        match self.index.get(&key) {
            Some(&(container, record)) => {
                let container = &self.containers[container];
                Ok(VfsStream::Record(BufReader::new(
                    container.open_record(&container.records()[record]),
                )))
            }
            None => Err(GobError::NotFound(name.to_string())),
        }
    }

    /// Reads a whole file into memory.
    pub fn read(&self, name: &str) -> GobResult<Vec<u8>> {
        let mut data = Vec::new();
        self.open(name)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Looks up the container record that would serve the name, ignoring overlays.
    pub fn record(&self, name: &str) -> Option<(&GobContainer, &GobRecord)> {
        self.index
            .get(&normalize_name(name))
            .map(|&(container, record)| {
                let container = &self.containers[container];
                (container, &container.records()[record])
            })
    }

    /// Every indexed container record, keyed by its normalized name, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &GobRecord)> + '_ {
        self.index.iter().map(|(key, &(container, record))| {
            (key.as_str(), &self.containers[container].records()[record])
        })
    }

    pub fn containers(&self) -> &[GobContainer] {
        &self.containers
    }

    pub fn overlays(&self) -> &[PathBuf] {
        &self.overlays
    }

    fn find_on_disk(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() {
            return None;
        }

        self.overlays
            .iter()
            .find_map(|overlay| find_case_insensitive(overlay, key))
    }
}

/// Resolves a normalized name below `root`, matching every path component case-insensitively.
fn find_case_insensitive(root: &Path, key: &str) -> Option<PathBuf> {
    let direct = root.join(key);
    if direct.is_file() {
        return Some(direct);
    }

    let mut current = root.to_path_buf();
    for component in key.split('/').filter(|c| !c.is_empty()) {
        let entry = fs::read_dir(&current)
            .ok()?
            .filter_map(Result::ok)
            .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(component))?;
        current = entry.path();
    }

    current.is_file().then_some(current)
}

/// A file opened through the [`Vfs`].
pub enum VfsStream {
    Disk(BufReader<File>),
    Record(BufReader<GobStream>),
}

impl Read for VfsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            VfsStream::Disk(r) => r.read(buf),
            VfsStream::Record(r) => r.read(buf),
        }
    }
}

impl Seek for VfsStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            VfsStream::Disk(r) => r.seek(pos),
            VfsStream::Record(r) => r.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GobWriter;
    use std::io::Cursor;

    fn archive(files: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut writer = GobWriter::new();
        for (name, data) in files {
            writer.add(*name, data.as_bytes().to_vec());
        }
        let mut bytes = Vec::new();
        writer.write_to(&mut bytes).unwrap();
        Cursor::new(bytes)
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let mut vfs = Vfs::new();
        vfs.add_container_reader("res2.gob", archive(&[("MISC\\CMP\\dflt.CMP", "palette")]))
            .unwrap();

        assert!(vfs.exists("misc/cmp/dflt.cmp"));
        assert!(vfs.exists("Misc\\Cmp\\DFLT.cmp"));
        assert_eq!(vfs.read("misc\\cmp\\dflt.cmp").unwrap(), b"palette");
    }

    #[test]
    fn first_container_wins() {
        let mut vfs = Vfs::new();
        assert!(vfs
            .add_container_reader("a.gob", archive(&[("3do\\crate.3do", "first")]))
            .unwrap());
        assert!(vfs
            .add_container_reader("b.gob", archive(&[("3do\\crate.3do", "second")]))
            .unwrap());
        assert!(!vfs
            .add_container_reader("a.gob", archive(&[("3do\\crate.3do", "third")]))
            .unwrap());

        assert_eq!(vfs.read("3do/crate.3do").unwrap(), b"first");
        assert_eq!(vfs.containers().len(), 2);
    }

    #[test]
    fn missing_files() {
        let mut vfs = Vfs::new();
        assert!(!vfs.add_container("/definitely/not/here.gob").unwrap());
        assert!(!vfs.exists("jkl/nothing.jkl"));
        assert!(matches!(vfs.open("jkl/nothing.jkl"), Err(GobError::NotFound(_))));
    }

    #[test]
    fn overlays_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Mat")).unwrap();
        fs::write(dir.path().join("Mat").join("Floor.MAT"), b"from disk").unwrap();

        let mut vfs = Vfs::new();
        vfs.add_container_reader(
            "res.gob",
            archive(&[("mat\\floor.mat", "from gob"), ("mat\\wall.mat", "wall")]),
        )
        .unwrap();
        assert!(vfs.add_overlay_directory(dir.path()));
        assert!(!vfs.add_overlay_directory(dir.path()));

        assert_eq!(vfs.read("mat\\floor.mat").unwrap(), b"from disk");
        assert_eq!(vfs.read("mat\\wall.mat").unwrap(), b"wall");
    }

    #[test]
    fn containers_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Res1hi.gob");
        fs::write(&path, archive(&[("ui\\bm\\title.bm", "bitmap")]).into_inner()).unwrap();

        let mut vfs = Vfs::new();
        assert!(vfs.add_container(&path).unwrap());
        assert!(!vfs.add_container(&path).unwrap());

        let mut stream = vfs.open("ui/bm/title.bm").unwrap();
        stream.seek(SeekFrom::Start(3)).unwrap();
        let mut rest = String::new();
        stream.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "map");

        let names: Vec<_> = vfs.entries().map(|(name, _)| name).collect();
        assert_eq!(names, ["ui/bm/title.bm"]);
    }
}
