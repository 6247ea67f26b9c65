use std::{
    fs::File,
    io::{self, Read, Write},
    os::fd::AsFd,
};

/// Upper bound for a single `sendfile(2)` call. The kernel caps transfers at
/// a bit less than 2 GiB anyway.
const MAX_SENDFILE_CHUNK: usize = 0x7fff_f000;

const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// A bulk copy stopped before the requested byte count was transferred.
#[derive(Debug)]
pub struct ShortCopy {
    pub copied: u64,
    /// `None` when the source hit end of file early.
    pub source: Option<io::Error>,
}

impl ShortCopy {
    fn eof(copied: u64) -> Self {
        Self {
            copied,
            source: None,
        }
    }

    fn failed(copied: u64, err: impl Into<io::Error>) -> Self {
        Self {
            copied,
            source: Some(err.into()),
        }
    }
}

/// Copy exactly `len` bytes from the current position of `src` to `dst`.
///
/// Uses `sendfile(2)` where the kernel supports it for this pair of
/// descriptors and falls back to a buffered read/write loop otherwise. Both
/// paths loop until `len` bytes are through; a zero-length transfer is
/// reported as a [`ShortCopy`].
pub fn copy_exact<W>(src: &mut File, dst: &mut W, len: u64) -> Result<(), ShortCopy>
where
    W: Write + AsFd,
{
    // Anything still sitting in a userspace buffer must hit the descriptor
    // before the kernel starts writing underneath it.
    dst.flush().map_err(|e| ShortCopy::failed(0, e))?;

    copy_sendfile(src, dst, len)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn copy_sendfile<W>(src: &mut File, dst: &mut W, len: u64) -> Result<(), ShortCopy>
where
    W: Write + AsFd,
{
    use nix::{errno::Errno, sys::sendfile::sendfile};

    let mut copied = 0u64;
    while copied < len {
        let chunk = usize::try_from(len - copied)
            .unwrap_or(usize::MAX)
            .min(MAX_SENDFILE_CHUNK);
        match sendfile(dst.as_fd(), src.as_fd(), None, chunk) {
            Ok(0) => return Err(ShortCopy::eof(copied)),
            Ok(n) => {
                copied += n as u64;
                tracing::trace!(copied, len, "sendfile progress");
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::EINVAL | Errno::ENOSYS) if copied == 0 => {
                tracing::debug!("sendfile not supported for this output, falling back to read/write");
                return copy_buffered(src, dst, len);
            }
            Err(e) => return Err(ShortCopy::failed(copied, e)),
        }
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn copy_sendfile<W>(src: &mut File, dst: &mut W, len: u64) -> Result<(), ShortCopy>
where
    W: Write + AsFd,
{
    copy_buffered(src, dst, len)
}

/// Plain read/write fallback for [`copy_exact`].
pub fn copy_buffered<R, W>(src: &mut R, dst: &mut W, len: u64) -> Result<(), ShortCopy>
where
    R: Read,
    W: Write,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE.min(usize::try_from(len).unwrap_or(usize::MAX))];
    let mut copied = 0u64;
    while copied < len {
        let want = (len - copied).min(buf.len() as u64) as usize;
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => return Err(ShortCopy::eof(copied)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ShortCopy::failed(copied, e)),
        };
        dst.write_all(&buf[..n])
            .map_err(|e| ShortCopy::failed(copied, e))?;
        copied += n as u64;
    }
    Ok(())
}

/// Write `len` zero bytes to `dst`.
pub fn write_zeros<W: Write + ?Sized>(dst: &mut W, len: u64) -> io::Result<()> {
    let written = io::copy(&mut io::repeat(0).take(len), dst)?;
    if written != len {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("wrote {written} of {len} padding bytes"),
        ));
    }
    Ok(())
}
