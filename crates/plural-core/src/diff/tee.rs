//! Writer that duplicates every write to two sinks.

use std::io::{self, Write};

/// Forwards each write to `primary` and mirrors it to `secondary`.
///
/// The secondary sink receives exactly the bytes the primary accepted. A
/// failing secondary does not interrupt the primary: its first error is kept
/// and mirroring stops.
#[derive(Debug)]
pub struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
    secondary_error: Option<io::Error>,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self {
            primary,
            secondary,
            secondary_error: None,
        }
    }

    /// First error returned by the secondary sink, if any.
    pub fn secondary_error(&self) -> Option<&io::Error> {
        self.secondary_error.as_ref()
    }

    pub fn take_secondary_error(&mut self) -> Option<io::Error> {
        self.secondary_error.take()
    }

    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.primary.write(buf)?;
        if self.secondary_error.is_none() {
            if let Err(err) = self.secondary.write_all(&buf[..written]) {
                self.secondary_error = Some(err);
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        if self.secondary_error.is_none() {
            if let Err(err) = self.secondary.flush() {
                self.secondary_error = Some(err);
            }
        }
        Ok(())
    }
}
