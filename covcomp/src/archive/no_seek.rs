use std::fmt::Debug;
use std::io::{Error, ErrorKind, Seek, SeekFrom, Write};

/// Wrapper over a [`std::io::Write`] object that counts the bytes written
/// and provides a [`std::io::Seek`] implementation accepting only no-op
/// seeks.
///
/// Archive parts are appended one after another, so the only position the
/// archive writer ever needs is the current one.
#[derive(Debug)]
pub struct NoSeek<T> {
    inner: T,
    position: u64,
}

impl<T> NoSeek<T> {
    /// Constructs a new [`NoSeek<T>`] object.
    ///
    /// # Examples
    /// ```
    /// use std::io::{Seek, SeekFrom, Write};
    ///
    /// use covcomp::archive::no_seek::NoSeek;
    ///
    /// let mut writer = NoSeek::new(Vec::new());
    /// writer.write_all(&[1, 2, 3]).unwrap();
    ///
    /// assert!(writer.seek(SeekFrom::Start(3)).is_ok());
    /// assert!(writer.seek(SeekFrom::Start(0)).is_err());
    /// ```
    pub fn new(inner: T) -> Self {
        Self { inner, position: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn seek_error() -> Error {
        Error::new(ErrorKind::Other, "Non-noop seek on a NoSeek object")
    }
}

impl<T> Seek for NoSeek<T> {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match pos {
            SeekFrom::Start(i) if i == self.position => Ok(self.position),
            SeekFrom::Current(0) => Ok(self.position),
            _ => Err(Self::seek_error()),
        }
    }
}

impl<W: Write> Write for NoSeek<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.position += size as u64;
        Ok(size)
    }

    #[inline]
    fn write_vectored(&mut self, bufs: &[std::io::IoSlice<'_>]) -> std::io::Result<usize> {
        let size = self.inner.write_vectored(bufs)?;
        self.position += size as u64;
        Ok(size)
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, SeekFrom, Write};

    use crate::archive::no_seek::NoSeek;

    #[test]
    fn test_position() {
        let mut writer = NoSeek::new(Vec::new());
        writer.write_all(b"COVCOMP").unwrap();

        assert_eq!(writer.position(), 7);
        assert_eq!(writer.stream_position().unwrap(), 7);
        assert!(writer.seek(SeekFrom::End(0)).is_err());
        assert!(writer.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(writer.into_inner(), b"COVCOMP");
    }
}
