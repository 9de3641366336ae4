// Licensed under the Apache-2.0 license

//! Reset and clock control (RCC) for the peripherals the I2C driver needs.
//!
//! `SysCon` implements the `OpenProt` `SystemControl` trait so that the I2C
//! setup code only ever talks to the trait, and tests can substitute a mock.

use ch32_metapac::RCC;
use embedded_hal::delay::DelayNs;
use openprot_hal_blocking::system_control::{ErrorType, SystemControl};

/// Default core clock after the usual PLL setup.
pub const HCLK_HZ: u64 = 48_000_000;

/// Peripheral clock gates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockId {
    ClkAFIO,
    ClkGPIOC,
    ClkGPIOD,
    ClkI2C1,
}

/// Peripheral reset lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetId {
    RstI2C1,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClockConfig {
    pub enabled: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysconError {
    /// The clock tree cannot be retuned from here.
    Unsupported,
}

impl core::fmt::Display for SysconError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "clock operation not supported"),
        }
    }
}

enum Bus {
    Apb1,
    Apb2,
}

fn clock_gate(id: ClockId) -> (Bus, u32) {
    match id {
        ClockId::ClkAFIO => (Bus::Apb2, 1 << 0),
        ClockId::ClkGPIOC => (Bus::Apb2, 1 << 4),
        ClockId::ClkGPIOD => (Bus::Apb2, 1 << 5),
        ClockId::ClkI2C1 => (Bus::Apb1, 1 << 21),
    }
}

fn reset_line(id: ResetId) -> (Bus, u32) {
    match id {
        ResetId::RstI2C1 => (Bus::Apb1, 1 << 21),
    }
}

/// RCC-backed system controller.
pub struct SysCon<D: DelayNs> {
    delay: D,
}

impl<D: DelayNs> SysCon<D> {
    /// # Safety
    ///
    /// The caller must own the RCC block; no other code may modify the
    /// peripheral clock or reset registers concurrently.
    pub unsafe fn new(delay: D) -> Self {
        Self { delay }
    }
}

impl<D: DelayNs> ErrorType for SysCon<D> {
    type Error = SysconError;
}

impl<D: DelayNs> SystemControl for SysCon<D> {
    type ClockId = ClockId;
    type ResetId = ResetId;
    type ClockConfig = ClockConfig;

    fn enable(&mut self, clock_id: &Self::ClockId) -> Result<(), Self::Error> {
        match clock_gate(*clock_id) {
            (Bus::Apb1, bit) => RCC.apb1pcenr().modify(|w| w.0 |= bit),
            (Bus::Apb2, bit) => RCC.apb2pcenr().modify(|w| w.0 |= bit),
        }
        Ok(())
    }

    fn disable(&mut self, clock_id: &Self::ClockId) -> Result<(), Self::Error> {
        match clock_gate(*clock_id) {
            (Bus::Apb1, bit) => RCC.apb1pcenr().modify(|w| w.0 &= !bit),
            (Bus::Apb2, bit) => RCC.apb2pcenr().modify(|w| w.0 &= !bit),
        }
        Ok(())
    }

    fn set_frequency(
        &mut self,
        _clock_id: &Self::ClockId,
        frequency: u64,
    ) -> Result<(), Self::Error> {
        // Every gated peripheral here runs from HCLK.
        if frequency == HCLK_HZ {
            Ok(())
        } else {
            Err(SysconError::Unsupported)
        }
    }

    fn get_frequency(&self, _clock_id: &Self::ClockId) -> Result<u64, Self::Error> {
        Ok(HCLK_HZ)
    }

    fn reset_assert(&mut self, reset_id: &Self::ResetId) -> Result<(), Self::Error> {
        match reset_line(*reset_id) {
            (Bus::Apb1, bit) => RCC.apb1prstr().modify(|w| w.0 |= bit),
            (Bus::Apb2, bit) => RCC.apb2prstr().modify(|w| w.0 |= bit),
        }
        Ok(())
    }

    fn reset_deassert(&mut self, reset_id: &Self::ResetId) -> Result<(), Self::Error> {
        match reset_line(*reset_id) {
            (Bus::Apb1, bit) => RCC.apb1prstr().modify(|w| w.0 &= !bit),
            (Bus::Apb2, bit) => RCC.apb2prstr().modify(|w| w.0 &= !bit),
        }
        Ok(())
    }

    fn reset_pulse(&mut self, reset_id: &Self::ResetId, duration_us: u32) -> Result<(), Self::Error> {
        self.reset_assert(reset_id)?;
        self.delay.delay_us(duration_us);
        self.reset_deassert(reset_id)
    }

    fn configure_clock(
        &mut self,
        clock_id: &Self::ClockId,
        config: &Self::ClockConfig,
    ) -> Result<(), Self::Error> {
        if config.enabled {
            self.enable(clock_id)
        } else {
            self.disable(clock_id)
        }
    }

    fn get_clock_config(&self, clock_id: &Self::ClockId) -> Result<Self::ClockConfig, Self::Error> {
        let enabled = match clock_gate(*clock_id) {
            (Bus::Apb1, bit) => RCC.apb1pcenr().read().0 & bit != 0,
            (Bus::Apb2, bit) => RCC.apb2pcenr().read().0 & bit != 0,
        };
        Ok(ClockConfig { enabled })
    }
}
