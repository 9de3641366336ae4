// Licensed under the Apache-2.0 license

//! High-level I2C controller for the CH32V003.
//!
//! Ties the master hardware to its system collaborators (clock and reset
//! control, pin mux) and exposes the bus-level API: initialisation, register
//! access, probing and scanning. It also implements the `embedded-hal`
//! blocking I2C trait so device drivers can sit on top of it.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::ch32_i2c::Error;
use crate::i2c::common::{ConfigurationError, I2cConfig, TimingConfig};
use crate::i2c::system_setup::I2cSystemSetup;
use crate::i2c::traits::I2cMaster;
use crate::pinctrl::{self, PinMux, PinProfile};
use crate::syscon::{ClockId, ResetId};
use core::ops::RangeInclusive;
use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::HertzU32;
use openprot_hal_blocking::system_control::{ErrorType, SystemControl};

/// Every 7-bit address, reserved ones included.
const SCAN_RANGE: RangeInclusive<u8> = 0x00..=0x7F;

pub struct I2cController<H, S, P, L = NoOpLogger>
where
    H: I2cMaster<Error = Error>,
    S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
    P: PinMux,
    L: Logger,
{
    pub hardware: H,
    pub system: S,
    pub pinmux: P,
    /// Pin pair the bus is (or will be) routed to.
    pub profile: PinProfile,
    /// Configuration of the last successful `init`.
    pub config: I2cConfig,
    pub logger: L,
}

impl<H, S, P, L> I2cController<H, S, P, L>
where
    H: I2cMaster<Error = Error>,
    S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
    P: PinMux,
    L: Logger,
    Error: From<<S as ErrorType>::Error>,
{
    /// Build a controller for the build-time pin profile. Nothing is touched
    /// until [`init`](Self::init).
    pub fn new(hardware: H, system: S, pinmux: P, config: I2cConfig, logger: L) -> Self {
        Self {
            hardware,
            system,
            pinmux,
            profile: PinProfile::SELECTED,
            config,
            logger,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: PinProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Configuration for a bus rate of `clk_rate` Hz, clocked from the
    /// current I2C source clock. Fails if the rate cannot be programmed.
    fn bus_config(&self, clk_rate: u32) -> Result<I2cConfig, Error> {
        let sysclk = I2cSystemSetup::get_i2c_source_frequency(&self.system)?;
        let sysclk = u32::try_from(sysclk).map_err(|_| ConfigurationError::InvalidPrerate)?;
        let config = I2cConfig {
            speed: HertzU32::from_raw(clk_rate),
            sysclk: HertzU32::from_raw(sysclk),
            ..self.config
        };
        TimingConfig::compute(&config)?;
        Ok(config)
    }

    /// Bring the bus up at `clk_rate` Hz on the current pin profile.
    ///
    /// Resets I2C1, enables its clocks, routes the pins and programs the
    /// clock dividers. Calling it again fully re-initialises the peripheral,
    /// which is also the way out of a timed-out transaction.
    ///
    /// # Errors
    ///
    /// Configuration errors are reported before any register is written.
    pub fn init(&mut self, clk_rate: u32) -> Result<(), Error> {
        let config = self.bus_config(clk_rate)?;
        let mapping = self.profile.mapping();

        I2cSystemSetup::initialize_i2c_system(&mut self.system, &mapping)?;
        pinctrl::apply_mapping(&mut self.pinmux, &mapping);
        self.hardware.init(&config)?;

        self.config = config;
        self.logger.debug("bus initialised");
        Ok(())
    }

    /// Move the bus to another pin profile and re-initialise it.
    ///
    /// The peripheral issues STOP, is disabled and software-reset before the
    /// old pins are floated. Swapping pins on a live bus is still hazardous:
    /// a target caught mid-byte may keep SDA low afterwards, and only a
    /// power cycle of that target clears it.
    ///
    /// # Errors
    ///
    /// An unusable `clk_rate` is rejected before the bus is touched. Other
    /// errors come from the `init` that follows the swap.
    pub fn reconfigure(&mut self, profile: PinProfile, clk_rate: u32) -> Result<(), Error> {
        self.bus_config(clk_rate)?;

        self.hardware.shutdown();
        pinctrl::release_mapping(&mut self.pinmux, &self.profile.mapping());
        self.profile = profile;
        self.logger.debug("pin profile changed");
        self.init(clk_rate)
    }

    /// Software-reset the peripheral and restore the last configuration.
    ///
    /// # Errors
    ///
    /// See [`I2cHardwareCore::recover_bus`](crate::i2c::I2cHardwareCore::recover_bus).
    pub fn recover(&mut self) -> Result<(), Error> {
        self.hardware.recover_bus()
    }

    /// `Ok(())` iff a device acknowledges `addr`.
    ///
    /// # Errors
    ///
    /// `Nack` for an empty address, `Timeout` or a bus fault otherwise.
    pub fn ping(&mut self, addr: SevenBitAddress) -> Result<(), Error> {
        self.hardware.ping(addr)
    }

    /// Read `buf.len()` bytes starting at register `reg`.
    ///
    /// # Errors
    ///
    /// See [`I2cMaster::read_register`].
    pub fn read(&mut self, addr: SevenBitAddress, reg: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.hardware.read_register(addr, reg, buf)
    }

    /// Write `buf` starting at register `reg`.
    ///
    /// # Errors
    ///
    /// See [`I2cMaster::write_register`].
    pub fn write(&mut self, addr: SevenBitAddress, reg: u8, buf: &[u8]) -> Result<(), Error> {
        self.hardware.write_register(addr, reg, buf)
    }

    /// Lazily probe every address, yielding the ones that answer.
    pub fn scan(&mut self) -> Scan<'_, H> {
        Scan {
            hardware: &mut self.hardware,
            addresses: SCAN_RANGE,
        }
    }

    /// Append every responding address to `found` and return how many were
    /// added.
    pub fn scan_into(&mut self, found: &mut heapless::Vec<u8, 128>) -> usize {
        let before = found.len();
        for addr in self.scan() {
            if found.push(addr).is_err() {
                break;
            }
        }
        found.len() - before
    }

    /// Scan and print one `0xNN responded` line per device, then a summary.
    ///
    /// # Errors
    ///
    /// Only failures of `out` are reported; bus errors just mean "absent".
    pub fn scan_report<W: embedded_io::Write>(
        &mut self,
        out: &mut W,
    ) -> Result<usize, embedded_io::WriteFmtError<W::Error>> {
        let mut count = 0;
        for addr in self.scan() {
            write!(out, "0x{addr:02X} responded\r\n")?;
            count += 1;
        }
        write!(out, "scan done, {count} device(s) found\r\n")?;
        Ok(count)
    }
}

/// Iterator returned by [`I2cController::scan`].
///
/// Each step pings addresses in ascending order until one answers; nothing
/// is remembered between scans.
pub struct Scan<'a, H: I2cMaster> {
    hardware: &'a mut H,
    addresses: RangeInclusive<u8>,
}

impl<H: I2cMaster> Iterator for Scan<'_, H> {
    type Item = SevenBitAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let hardware = &mut *self.hardware;
        self.addresses.find(|&addr| hardware.ping(addr).is_ok())
    }
}

impl<H, S, P, L> embedded_hal::i2c::ErrorType for I2cController<H, S, P, L>
where
    H: I2cMaster<Error = Error>,
    S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
    P: PinMux,
    L: Logger,
{
    type Error = Error;
}

impl<H, S, P, L> embedded_hal::i2c::I2c for I2cController<H, S, P, L>
where
    H: I2cMaster<Error = Error>,
    S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
    P: PinMux,
    L: Logger,
{
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.hardware.read(addr, buffer)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.hardware.write(addr, bytes)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.hardware.write_read(addr, bytes, buffer)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.hardware.transaction_slice(addr, operations)
    }
}
