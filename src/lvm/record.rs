use super::DiskLocation;

/// Sequential little-endian writer over a fixed on-disk record.
///
/// Fields land exactly in call order with no implicit padding. Writing past the
/// end of the buffer panics, which only happens if a record layout is wrong.
pub(crate) struct RecordWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> RecordWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put(&mut self, bytes: &[u8]) -> &mut Self {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.put(&value.to_le_bytes())
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.put(&value.to_le_bytes())
    }

    pub fn put_location(&mut self, location: DiskLocation) -> &mut Self {
        self.put_u64(location.offset).put_u64(location.size)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}
