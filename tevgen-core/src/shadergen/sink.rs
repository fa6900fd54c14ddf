//! Output sinks for the shader generator.
//!
//! The generator runs one traversal for both the text and the UID. The
//! sink decides what happens to the text: [`ShaderCode`] keeps it in a
//! fixed-size buffer, [`NullSink`] drops it without formatting anything.

use std::fmt;

/// Default capacity of a [`ShaderCode`] buffer in bytes.
pub const SHADER_BUFFER_SIZE: usize = 65536;

const CANARY: u8 = 0x7C;

/// Destination for generated shader text.
pub trait ShaderSink: fmt::Write {
    /// `false` for sinks that discard everything written to them.
    fn wants_text(&self) -> bool {
        true
    }
}

/// Sink used for UID-only generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl fmt::Write for NullSink {
    #[inline]
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        Ok(())
    }

    // Skip argument formatting entirely.
    #[inline]
    fn write_fmt(&mut self, _args: fmt::Arguments<'_>) -> fmt::Result {
        Ok(())
    }
}

impl ShaderSink for NullSink {
    fn wants_text(&self) -> bool {
        false
    }
}

/// Fixed-capacity text buffer guarded by a tail canary byte.
///
/// Writes past the end are truncated instead of growing the buffer; the
/// sentinel in the last slot is overwritten by the first byte that reaches
/// it, which [`ShaderCode::canary_intact`] then reports.
pub struct ShaderCode {
    buf: Box<[u8]>,
    len: usize,
    dropped: usize,
}

impl ShaderCode {
    pub fn new() -> Self {
        Self::with_capacity(SHADER_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut buf = vec![0u8; capacity].into_boxed_slice();
        buf[capacity - 1] = CANARY;
        Self { buf, len: 0, dropped: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The sentinel byte is still in place and nothing was truncated.
    pub fn canary_intact(&self) -> bool {
        self.dropped == 0 && self.len < self.buf.len() && self.buf[self.buf.len() - 1] == CANARY
    }

    pub fn as_str(&self) -> &str {
        // Only complete `&str` slices are ever copied in, except when a write
        // is truncated, and truncation is reported through the canary.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf[..self.len]).into_owned()
    }
}

impl Default for ShaderCode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for ShaderCode {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let room = self.buf.len() - self.len;
        let n = bytes.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        self.dropped += bytes.len() - n;
        Ok(())
    }
}

impl ShaderSink for ShaderCode {}

impl fmt::Debug for ShaderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderCode")
            .field("len", &self.len)
            .field("capacity", &self.buf.len())
            .field("canary_intact", &self.canary_intact())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn accumulates_text() {
        let mut code = ShaderCode::new();
        write!(code, "float4 {} = {};", "prev", 1).unwrap();
        assert_eq!(code.as_str(), "float4 prev = 1;");
        assert!(code.canary_intact());
    }

    #[test]
    fn overrun_eats_the_canary() {
        let mut code = ShaderCode::with_capacity(8);
        code.write_str("0123456").unwrap();
        assert!(code.canary_intact());
        code.write_str("789").unwrap();
        assert!(!code.canary_intact());
        assert_eq!(code.len(), 8);
    }

    #[test]
    fn null_sink_wants_no_text() {
        let mut sink = NullSink;
        write!(sink, "{}", 42).unwrap();
        assert!(!sink.wants_text());
        assert!(ShaderCode::new().wants_text());
    }
}
