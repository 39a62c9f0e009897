use parking_lot::Mutex;
use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

/// Object safe stand-in for `Read + Seek + Send`, so different backing streams can share a
/// container type.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A [`Read`] + [`Seek`] window over a byte range of a shared stream, working like [`io::Take`]
/// does, except that several windows can be open over the same stream at once.
///
/// Every window tracks its own position and reseeks the shared stream under its lock before
/// each read, so windows never observe each other's cursor.
pub struct SharedTake<T: ?Sized> {
    source: Arc<Mutex<T>>,
    start: u64,
    len: u64,
    position: u64,
}

impl<T: ?Sized> SharedTake<T> {
    pub fn new(source: Arc<Mutex<T>>, start: u64, len: u64) -> Self {
        Self {
            source,
            start,
            len,
            position: 0,
        }
    }

    /// Length of the window in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the window inside the shared stream
    pub fn start(&self) -> u64 {
        self.start
    }
}

impl<T: Read + Seek + ?Sized> Read for SharedTake<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.position);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let wanted = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

        let mut source = self.source.lock();
        source.seek(SeekFrom::Start(self.start + self.position))?;
        let read = source.read(&mut buf[..wanted])?;
        self.position += read as u64;

        Ok(read)
    }
}

impl<T: ?Sized> Seek for SharedTake<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(n) => i128::from(self.position) + i128::from(n),
            SeekFrom::End(n) => i128::from(self.len) + i128::from(n),
        };

        if target < 0 || target > i128::from(self.len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seeking outside the SharedTake range",
            ));
        }

        self.position = target as u64;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::SharedTake;
    use parking_lot::Mutex;
    use std::{
        io::{Cursor, Read, Seek, SeekFrom},
        sync::Arc,
    };

    #[test]
    fn windows_are_independent() {
        let source = Arc::new(Mutex::new(Cursor::new((0u8..32).collect::<Vec<_>>())));

        let mut a = SharedTake::new(source.clone(), 4, 8);
        let mut b = SharedTake::new(source, 20, 4);

        let mut first = [0u8; 3];
        a.read_exact(&mut first).unwrap();
        assert_eq!(first, [4, 5, 6]);

        let mut all_of_b = Vec::new();
        b.read_to_end(&mut all_of_b).unwrap();
        assert_eq!(all_of_b, [20, 21, 22, 23]);

        let mut rest_of_a = Vec::new();
        a.read_to_end(&mut rest_of_a).unwrap();
        assert_eq!(rest_of_a, [7, 8, 9, 10, 11]);
    }

    #[test]
    fn seeking_is_bounded() {
        let source = Arc::new(Mutex::new(Cursor::new(vec![0u8; 16])));
        let mut window = SharedTake::new(source, 2, 10);

        assert_eq!(window.seek(SeekFrom::End(-2)).unwrap(), 8);
        assert_eq!(window.seek(SeekFrom::Current(2)).unwrap(), 10);
        assert!(window.seek(SeekFrom::Current(1)).is_err());
        assert!(window.seek(SeekFrom::Current(-11)).is_err());

        let mut buf = [0u8; 4];
        assert_eq!(window.read(&mut buf).unwrap(), 0);
    }
}
