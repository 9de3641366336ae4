// Licensed under the Apache-2.0 license

//! Shared driver plumbing: the diagnostic logger used by the I2C driver.
//!
//! Drivers take a `L: Logger` type parameter that defaults to [`NoOpLogger`],
//! so logging compiles away entirely unless a sink is supplied.

use embedded_io::Write;

/// Minimal diagnostic sink.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Logger writing one line per message to any `embedded_io::Write` sink,
/// typically a UART.
///
/// Write failures are dropped: a broken console must not turn into a bus error.
pub struct WriteLogger<W: Write> {
    out: W,
}

impl<W: Write> WriteLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, level: &str, msg: &str) {
        let _ = self.out.write_all(level.as_bytes());
        let _ = self.out.write_all(msg.as_bytes());
        let _ = self.out.write_all(b"\r\n");
    }
}

impl<W: Write> Logger for WriteLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.line("[i2c] ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line("[i2c] error: ", msg);
    }
}

/// Logger forwarding to `defmt`.
#[cfg(feature = "defmt")]
#[derive(Copy, Clone, Debug, Default)]
pub struct DefmtLogger;

#[cfg(feature = "defmt")]
impl Logger for DefmtLogger {
    fn debug(&mut self, msg: &str) {
        defmt::debug!("{=str}", msg);
    }

    fn error(&mut self, msg: &str) {
        defmt::error!("{=str}", msg);
    }
}
