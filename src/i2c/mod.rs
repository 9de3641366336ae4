// Licensed under the Apache-2.0 license

//! CH32V003 I2C master driver.
//!
//! Layers, bottom up: register access ([`registers`]), the status word and
//! event masks ([`status`]), the polling transaction engine ([`ch32_i2c`])
//! and the bus-level controller ([`i2c_controller`]).

pub mod ch32_i2c;
pub mod common;
pub mod i2c_controller;
pub mod registers;
#[cfg(test)]
mod sim;
pub mod status;
pub mod system_setup;
pub mod traits;

pub use ch32_i2c::{Ch32I2c, Error, MAX_TRANSFER_LEN};
pub use common::{
    ConfigurationError, Duty, I2cConfig, I2cConfigBuilder, I2cSpeed, TimingConfig,
};
pub use i2c_controller::{I2cController, Scan};
pub use registers::{I2c1, I2cRegisters};
pub use status::Status;
pub use system_setup::I2cSystemSetup;
pub use traits::{I2cHardwareCore, I2cMaster};
