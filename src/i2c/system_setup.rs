// Licensed under the Apache-2.0 license

//! I2C System Setup Helper
//!
//! Reset and clock gating for the I2C block and its pins, expressed through
//! the `OpenProt` `SystemControl` trait so the controller never touches the
//! RCC registers directly.

use crate::i2c::ch32_i2c::Error;
use crate::pinctrl::PinMapping;
use crate::syscon::{ClockId, ResetId};
use openprot_hal_blocking::system_control::{ErrorType, SystemControl};

/// Width of the reset pulse applied to I2C1.
const RESET_PULSE_US: u32 = 1;

/// Helper for I2C system control operations
pub struct I2cSystemSetup;

impl I2cSystemSetup {
    /// Reset I2C1 and enable every clock the bus needs.
    ///
    /// Clocks enabled: the I2C block, the GPIO port carrying `mapping`, and
    /// AFIO for the remap register.
    ///
    /// # Errors
    ///
    /// Propagates the first system-control failure.
    pub fn initialize_i2c_system<S>(
        system_controller: &mut S,
        mapping: &PinMapping,
    ) -> Result<(), Error>
    where
        S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
        Error: From<<S as ErrorType>::Error>,
    {
        Self::reset_i2c_peripheral(system_controller)?;

        system_controller
            .enable(&ClockId::ClkI2C1)
            .map_err(Error::from)?;
        system_controller
            .enable(&mapping.port_clock)
            .map_err(Error::from)?;
        system_controller
            .enable(&ClockId::ClkAFIO)
            .map_err(Error::from)?;

        Ok(())
    }

    /// Clock feeding the I2C block, used as `sysclk` in timing calculations.
    ///
    /// # Errors
    ///
    /// Propagates the system-control failure.
    pub fn get_i2c_source_frequency<S>(system_controller: &S) -> Result<u64, Error>
    where
        S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
        Error: From<<S as ErrorType>::Error>,
    {
        system_controller
            .get_frequency(&ClockId::ClkI2C1)
            .map_err(Error::from)
    }

    /// Pulse the I2C1 reset line. All I2C registers return to their reset
    /// values; clocks and pins are left alone.
    ///
    /// # Errors
    ///
    /// Propagates the system-control failure.
    pub fn reset_i2c_peripheral<S>(system_controller: &mut S) -> Result<(), Error>
    where
        S: SystemControl<ClockId = ClockId, ResetId = ResetId>,
        Error: From<<S as ErrorType>::Error>,
    {
        system_controller
            .reset_pulse(&ResetId::RstI2C1, RESET_PULSE_US)
            .map_err(Error::from)
    }
}
