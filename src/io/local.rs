use async_trait::async_trait;
use std::path::Path;

use super::ReadAt;
use crate::error::{FetchError, OpenError};

/// Local file reader with random access support
pub struct LocalFileReader {
    #[cfg(unix)]
    file: std::fs::File,
    #[cfg(not(unix))]
    file: parking_lot::Mutex<std::fs::File>,
    size: u64,
}

impl LocalFileReader {
    /// Open a local file. Empty files are rejected, as with remote objects.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let local = |source| OpenError::Local {
            path: path.display().to_string(),
            source,
        };

        let file = std::fs::File::open(path).map_err(local)?;
        let size = file.metadata().map_err(local)?.len();
        if size == 0 {
            return Err(OpenError::ZeroLength {
                url: path.display().to_string(),
            });
        }

        Ok(Self {
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: parking_lot::Mutex::new(file),
            size,
        })
    }

    #[cfg(unix)]
    fn pread(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(not(unix))]
    fn pread(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError> {
        // A single pread may return fewer bytes than asked without being at
        // end of file, so keep going until the buffer is full or the file ends.
        let mut filled = 0;
        while filled < buf.len() {
            match self.pread(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
