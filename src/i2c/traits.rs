// Licensed under the Apache-2.0 license

//! # I2C Hardware Abstraction Traits
//!
//! Two traits separate what a controller needs from the hardware:
//!
//! ```text
//! I2cHardwareCore (enable, clock programming, recovery)
//!     └── I2cMaster (blocking master transfers)
//! ```
//!
//! `I2cController` is generic over these, so the bus-level logic (pin
//! routing, scanning, `embedded-hal` glue) is independent of how the
//! peripheral registers are reached.

use crate::i2c::common::{I2cConfig, TimingConfig};
use embedded_hal::i2c::{AddressMode, Operation, SevenBitAddress};

/// Core I2C hardware interface.
///
/// # Examples
///
/// ```rust,no_run
/// use ch32v003_i2c::i2c::{I2cConfigBuilder, I2cHardwareCore, I2cSpeed};
///
/// fn bring_up<T: I2cHardwareCore>(controller: &mut T) -> Result<(), T::Error> {
///     let config = I2cConfigBuilder::new().speed(I2cSpeed::Fast).build();
///     controller.init(&config)
/// }
/// ```
pub trait I2cHardwareCore {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Program the clock registers for `config` and enable the peripheral.
    ///
    /// # Errors
    ///
    /// Fails without touching the registers when `config` cannot be
    /// expressed by the clock dividers, and after enabling when the bus
    /// reports a latched bus error.
    fn init(&mut self, config: &I2cConfig) -> Result<(), Self::Error>;

    /// Write precomputed clock register values. The peripheral must be
    /// disabled while this runs.
    fn configure_timing(&mut self, timing: &TimingConfig);

    /// Attempt to recover the I2C bus from stuck conditions
    ///
    /// Issues STOP, software-resets the block and reprograms the last
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored configuration is no longer valid.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;

    /// Release the bus, disable the peripheral and reset its registers.
    fn shutdown(&mut self);
}

/// I2C Master mode operations
///
/// Every operation issues STOP before returning, on success and on failure.
/// Only 7-bit addressing is used on this part, but the address type stays a
/// parameter so the trait lines up with `embedded-hal`.
///
/// # Examples
///
/// ```rust,no_run
/// use ch32v003_i2c::i2c::I2cMaster;
///
/// fn read_temperature<T: I2cMaster>(i2c: &mut T) -> Result<u16, T::Error> {
///     let mut data = [0u8; 2];
///     i2c.read_register(0x48, 0x00, &mut data)?;
///     Ok(u16::from_be_bytes(data))
/// }
/// ```
pub trait I2cMaster<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// Probe `addr` with an address-only write.
    ///
    /// # Errors
    ///
    /// `Nack` when nobody answers, or any bus error seen on the way.
    fn ping(&mut self, addr: A) -> Result<(), Self::Error>;

    /// Write `bytes` starting at register `reg` of the device.
    ///
    /// With an empty `bytes` only the register byte is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is out of range, the buffer is too
    /// long, a byte is not acknowledged or a bus fault occurs.
    fn write_register(&mut self, addr: A, reg: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read `buffer.len()` bytes starting at register `reg` of the device.
    ///
    /// The register byte is written, then a repeated start switches to
    /// reading. An empty `buffer` stops after the register byte and is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// As for [`write_register`](Self::write_register).
    fn read_register(&mut self, addr: A, reg: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Write data to a slave device at the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge, bus arbitration
    /// is lost, or other I2C protocol errors occur.
    fn write(&mut self, addr: A, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a slave device at the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge, bus arbitration
    /// is lost, or other I2C protocol errors occur.
    fn read(&mut self, addr: A, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Combined write-then-read operation with restart condition
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge during either
    /// phase, or if bus arbitration is lost.
    fn write_read(&mut self, addr: A, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute a sequence of I2C operations as a single transaction
    ///
    /// Adjacent operations of the same direction share one address phase;
    /// a change of direction uses a repeated start. Empty operations are
    /// skipped, and a sequence with nothing to transfer probes the address.
    ///
    /// # Errors
    ///
    /// Returns the first error; later operations are not attempted.
    fn transaction_slice(
        &mut self,
        addr: A,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}
