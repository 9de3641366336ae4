// Licensed under the Apache-2.0 license

//! Common types for the CH32V003 I2C driver: bus configuration, derived
//! timing register values and configuration errors.

use fugit::HertzU32;

/// Highest bus rate the block supports (Fast mode).
pub const MAX_BUS_HZ: u32 = 400_000;

/// Iteration budget used by every bounded status wait unless overridden.
pub const DEFAULT_TIMEOUT: u32 = 2000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn hertz(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// SCL low/high ratio in Fast mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duty {
    Duty2_1,
    Duty16_9,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// Requested bus rate is zero.
    ZeroFrequency,
    /// Requested bus rate is above 400 kHz.
    SpeedTooHigh,
    /// `sysclk / prerate` falls outside the 2..=36 MHz range of CTLR2.FREQ,
    /// or the I2C source clock does not fit in 32 bits.
    InvalidPrerate,
    /// The clock divider does not fit the 12-bit CCR field.
    ClockTooSlow,
}

impl core::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroFrequency => write!(f, "bus frequency must be non-zero"),
            Self::SpeedTooHigh => write!(f, "bus frequency above {MAX_BUS_HZ} Hz"),
            Self::InvalidPrerate => write!(f, "module clock prerate out of range"),
            Self::ClockTooSlow => write!(f, "bus frequency too low for the clock divider"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    /// SCL frequency.
    pub speed: HertzU32,
    /// Clock feeding the I2C block (HCLK; PCLK1 equals HCLK on this part).
    pub sysclk: HertzU32,
    /// Divisor from `sysclk` to the value programmed in CTLR2.FREQ.
    pub prerate: HertzU32,
    pub duty: Duty,
    /// Poll iterations allowed per phase before reporting a timeout.
    pub timeout: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    speed: HertzU32,
    sysclk: HertzU32,
    prerate: HertzU32,
    duty: Duty,
    timeout: u32,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: I2cSpeed::Standard.hertz(),
            sysclk: HertzU32::MHz(48),
            prerate: HertzU32::MHz(2),
            duty: Duty::Duty2_1,
            timeout: DEFAULT_TIMEOUT,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed.hertz();
        self
    }
    #[must_use]
    pub fn frequency(mut self, frequency: HertzU32) -> Self {
        self.speed = frequency;
        self
    }
    #[must_use]
    pub fn sysclk(mut self, sysclk: HertzU32) -> Self {
        self.sysclk = sysclk;
        self
    }
    #[must_use]
    pub fn prerate(mut self, prerate: HertzU32) -> Self {
        self.prerate = prerate;
        self
    }
    #[must_use]
    pub fn duty(mut self, duty: Duty) -> Self {
        self.duty = duty;
        self
    }
    #[must_use]
    pub fn timeout(mut self, iterations: u32) -> Self {
        self.timeout = iterations;
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            speed: self.speed,
            sysclk: self.sysclk,
            prerate: self.prerate,
            duty: self.duty,
            timeout: self.timeout,
        }
    }
}

/// Register values derived from an [`I2cConfig`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    /// CTLR2.FREQ
    pub freq: u8,
    /// CKCFGR.CCR
    pub ccr: u16,
    /// CKCFGR.F/S
    pub fast_mode: bool,
    /// CKCFGR.DUTY
    pub duty_16_9: bool,
    /// Rise-time register value, on blocks that have one.
    pub trise: u8,
}

impl TimingConfig {
    /// Derive the clock register values for `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when the requested rate or the clock
    /// tree cannot be expressed in the registers. Nothing is written to
    /// hardware in that case.
    pub fn compute(config: &I2cConfig) -> Result<Self, ConfigurationError> {
        let rate = config.speed.to_Hz();
        if rate == 0 {
            return Err(ConfigurationError::ZeroFrequency);
        }
        if rate > MAX_BUS_HZ {
            return Err(ConfigurationError::SpeedTooHigh);
        }

        let sysclk = config.sysclk.to_Hz();
        let freq = sysclk
            .checked_div(config.prerate.to_Hz())
            .ok_or(ConfigurationError::InvalidPrerate)?;
        if !(2..=36).contains(&freq) {
            return Err(ConfigurationError::InvalidPrerate);
        }

        let (ccr, fast_mode, duty_16_9, trise) = if rate <= I2cSpeed::Standard as u32 {
            let ccr = (sysclk / (2 * rate)).max(0x04);
            (ccr, false, false, freq + 1)
        } else {
            let divider = match config.duty {
                Duty::Duty2_1 => 3,
                Duty::Duty16_9 => 25,
            };
            let ccr = (sysclk / (divider * rate)).max(0x01);
            (ccr, true, config.duty == Duty::Duty16_9, freq * 300 / 1000 + 1)
        };

        if ccr > 0x0FFF {
            return Err(ConfigurationError::ClockTooSlow);
        }

        // Both narrowings are bounded by the range checks above.
        Ok(Self {
            freq: freq as u8,
            ccr: ccr as u16,
            fast_mode,
            duty_16_9,
            trise: trise as u8,
        })
    }
}
