use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::ops::Deref;

/// Buffers that grew past this capacity are dropped instead of pooled.
const MAX_POOLED_CAPACITY: usize = 16 << 10;
const MAX_POOLED_BUFFERS: usize = 64;
const INITIAL_CAPACITY: usize = 1024;

static POOL: Mutex<Vec<Vec<u8>>> = parking_lot::const_mutex(Vec::new());

/// Byte buffer borrowed from a process-wide pool.
///
/// A buffer is obtained with [`Buffer::get`] and handed back to the pool
/// when it is dropped: its length is reset to zero while the backing
/// allocation is kept for the next render. Every render path therefore
/// acquires exactly one buffer at the top of the call and lets scope exit
/// release it, including on early return.
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Take a buffer from the pool, allocating a fresh one if it is empty.
    pub fn get() -> Self {
        let bytes = POOL
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_CAPACITY));
        Self { bytes }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    pub fn write_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    pub fn write_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.write_str(c.encode_utf8(&mut tmp));
    }

    /// Append the base-10 form of a signed integer.
    pub fn write_i64(&mut self, v: i64) {
        self.write_display(v);
    }

    /// Append the base-10 form of an unsigned integer.
    pub fn write_u64(&mut self, v: u64) {
        self.write_display(v);
    }

    /// Append the `Display` form of `v`. If the impl reports an error,
    /// whatever it wrote is discarded.
    pub fn write_display(&mut self, v: impl fmt::Display) {
        let start = self.bytes.len();
        if fmt::write(self, format_args!("{}", v)).is_err() {
            self.bytes.truncate(start);
        }
    }

    /// Replace the last byte, used to turn the trailing separator into a newline.
    pub fn set_last(&mut self, b: u8) {
        if let Some(last) = self.bytes.last_mut() {
            *last = b;
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.bytes.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.bytes.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        let mut bytes = std::mem::take(&mut self.bytes);
        bytes.clear();
        let mut pool = POOL.lock();
        if pool.len() < MAX_POOLED_BUFFERS {
            pool.push(bytes);
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .finish()
    }
}
