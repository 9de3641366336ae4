// Licensed under the Apache-2.0 license

// Enforce coding guidelines - prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]

//! Master-mode driver for the CH32V003 hardware I2C peripheral.
//!
//! ```rust,no_run
//! use ch32v003_i2c::common::NoOpLogger;
//! use ch32v003_i2c::i2c::{Ch32I2c, I2c1, I2cConfig, I2cController};
//! use ch32v003_i2c::pinctrl::AfioPinMux;
//! use ch32v003_i2c::syscon::SysCon;
//! # fn demo<D: embedded_hal::delay::DelayNs>(delay: D) -> Result<(), ch32v003_i2c::i2c::Error> {
//! let hardware = Ch32I2c::new(unsafe { I2c1::steal() }, NoOpLogger);
//! let syscon = unsafe { SysCon::new(delay) };
//! let pinmux = unsafe { AfioPinMux::new() };
//! let mut i2c = I2cController::new(hardware, syscon, pinmux, I2cConfig::default(), NoOpLogger);
//!
//! i2c.init(400_000)?;
//! let mut id = [0u8; 4];
//! i2c.read(0x50, 0x00, &mut id)?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod i2c;
pub mod pinctrl;
pub mod syscon;
