// Licensed under the Apache-2.0 license

//! I2C pin mapping profiles and the pin-mux collaborator.
//!
//! The CH32V003 routes I2C1 to one of three fixed pin pairs, selected by the
//! I2C remap field of `AFIO_PCFR1`:
//!
//! | Profile   | SCL | SDA | remap value   |
//! |-----------|-----|-----|---------------|
//! | `Default` | PC2 | PC1 | `0x0000_0000` |
//! | `Alt1`    | PD1 | PD0 | `0x0400_0002` |
//! | `Alt2`    | PC5 | PC6 | `0x0040_0002` |
//!
//! The profile is chosen at build time through the `pinout-alt1` /
//! `pinout-alt2` cargo features and exposed as [`PinProfile::SELECTED`].
//! Changing profile on a running bus is not supported; see
//! `I2cController::reconfigure`.

use crate::syscon::ClockId;
use ch32_metapac::gpio::Gpio;
use ch32_metapac::{AFIO, GPIOC, GPIOD};

#[cfg(all(feature = "pinout-alt1", feature = "pinout-alt2"))]
compile_error!("features `pinout-alt1` and `pinout-alt2` are mutually exclusive");

/// Bits of `AFIO_PCFR1` owned by the I2C remap field.
pub const I2C_REMAP_MASK: u32 = 0x0440_0002;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    C,
    D,
}

impl Port {
    fn block(self) -> Gpio {
        match self {
            Port::C => GPIOC,
            Port::D => GPIOD,
        }
    }

    #[must_use]
    pub const fn clock(self) -> ClockId {
        match self {
            Port::C => ClockId::ClkGPIOC,
            Port::D => ClockId::ClkGPIOD,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinProfile {
    /// SCL on PC2, SDA on PC1.
    Default,
    /// SCL on PD1, SDA on PD0.
    Alt1,
    /// SCL on PC5, SDA on PC6.
    Alt2,
}

/// Concrete wiring a profile resolves to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMapping {
    pub port: Port,
    pub port_clock: ClockId,
    pub scl: u8,
    pub sda: u8,
    pub remap: u32,
}

impl PinProfile {
    #[cfg(feature = "pinout-alt1")]
    pub const SELECTED: PinProfile = PinProfile::Alt1;
    #[cfg(feature = "pinout-alt2")]
    pub const SELECTED: PinProfile = PinProfile::Alt2;
    #[cfg(not(any(feature = "pinout-alt1", feature = "pinout-alt2")))]
    pub const SELECTED: PinProfile = PinProfile::Default;

    #[must_use]
    pub const fn mapping(self) -> PinMapping {
        let (port, scl, sda, remap) = match self {
            PinProfile::Default => (Port::C, 2, 1, 0x0000_0000),
            PinProfile::Alt1 => (Port::D, 1, 0, 0x0400_0002),
            PinProfile::Alt2 => (Port::C, 5, 6, 0x0040_0002),
        };
        PinMapping {
            port,
            port_clock: port.clock(),
            scl,
            sda,
            remap,
        }
    }
}

/// GPIO configuration nibbles (`CNF[1:0]:MODE[1:0]`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Alternate-function open-drain output, 10 MHz.
    AltOpenDrain,
    /// Floating input, the reset state.
    InputFloating,
}

impl PinMode {
    #[must_use]
    pub const fn cfg_bits(self) -> u32 {
        match self {
            PinMode::AltOpenDrain => 0b1101,
            PinMode::InputFloating => 0b0100,
        }
    }
}

/// Alternate-function remap and pin mode control.
pub trait PinMux {
    /// Replace the bits under `mask` in the remap register with `value`.
    fn set_remap(&mut self, mask: u32, value: u32);

    fn set_pin_mode(&mut self, port: Port, pin: u8, mode: PinMode);
}

/// Route the bus pins of `mapping` to the I2C block.
pub fn apply_mapping<P: PinMux>(pinmux: &mut P, mapping: &PinMapping) {
    pinmux.set_remap(I2C_REMAP_MASK, mapping.remap);
    pinmux.set_pin_mode(mapping.port, mapping.sda, PinMode::AltOpenDrain);
    pinmux.set_pin_mode(mapping.port, mapping.scl, PinMode::AltOpenDrain);
}

/// Hand the bus pins of `mapping` back to GPIO as floating inputs.
pub fn release_mapping<P: PinMux>(pinmux: &mut P, mapping: &PinMapping) {
    pinmux.set_pin_mode(mapping.port, mapping.scl, PinMode::InputFloating);
    pinmux.set_pin_mode(mapping.port, mapping.sda, PinMode::InputFloating);
}

/// `PinMux` over the AFIO and GPIO register blocks.
pub struct AfioPinMux {
    _private: (),
}

impl AfioPinMux {
    /// # Safety
    ///
    /// The caller must own AFIO and the GPIO ports used by the I2C pins.
    #[must_use]
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PinMux for AfioPinMux {
    fn set_remap(&mut self, mask: u32, value: u32) {
        AFIO.pcfr1().modify(|w| w.0 = (w.0 & !mask) | (value & mask));
    }

    fn set_pin_mode(&mut self, port: Port, pin: u8, mode: PinMode) {
        let shift = u32::from(pin & 0x07) * 4;
        port.block()
            .cfglr()
            .modify(|w| w.0 = (w.0 & !(0x0F << shift)) | (mode.cfg_bits() << shift));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    pub(crate) struct MockPinMux {
        pub pcfr1: u32,
        pub modes: Vec<(Port, u8, PinMode)>,
    }

    impl PinMux for MockPinMux {
        fn set_remap(&mut self, mask: u32, value: u32) {
            self.pcfr1 = (self.pcfr1 & !mask) | (value & mask);
        }

        fn set_pin_mode(&mut self, port: Port, pin: u8, mode: PinMode) {
            self.modes.push((port, pin, mode));
        }
    }

    #[test]
    fn test_profile_tables() {
        let default = PinProfile::Default.mapping();
        assert_eq!((default.port, default.scl, default.sda), (Port::C, 2, 1));
        assert_eq!(default.remap, 0);
        assert_eq!(default.port_clock, ClockId::ClkGPIOC);

        let alt1 = PinProfile::Alt1.mapping();
        assert_eq!((alt1.port, alt1.scl, alt1.sda), (Port::D, 1, 0));
        assert_eq!(alt1.remap, 0x0400_0002);
        assert_eq!(alt1.port_clock, ClockId::ClkGPIOD);

        let alt2 = PinProfile::Alt2.mapping();
        assert_eq!((alt2.port, alt2.scl, alt2.sda), (Port::C, 5, 6));
        assert_eq!(alt2.remap, 0x0040_0002);
    }

    #[test]
    fn test_remap_values_stay_inside_field() {
        for profile in [PinProfile::Default, PinProfile::Alt1, PinProfile::Alt2] {
            assert_eq!(profile.mapping().remap & !I2C_REMAP_MASK, 0);
        }
    }

    #[test]
    fn test_apply_mapping_preserves_foreign_remap_bits() {
        let mut mux = MockPinMux {
            pcfr1: 0x8000_0001 | 0x0040_0000,
            ..Default::default()
        };
        apply_mapping(&mut mux, &PinProfile::Alt1.mapping());
        assert_eq!(mux.pcfr1, 0x8000_0001 | 0x0400_0002);
        assert_eq!(
            mux.modes,
            [
                (Port::D, 0, PinMode::AltOpenDrain),
                (Port::D, 1, PinMode::AltOpenDrain),
            ]
        );
    }

    #[test]
    fn test_release_mapping_floats_pins() {
        let mut mux = MockPinMux::default();
        release_mapping(&mut mux, &PinProfile::Alt2.mapping());
        assert_eq!(
            mux.modes,
            [
                (Port::C, 5, PinMode::InputFloating),
                (Port::C, 6, PinMode::InputFloating),
            ]
        );
    }

    #[test]
    fn test_selected_profile_defaults_without_features() {
        #[cfg(not(any(feature = "pinout-alt1", feature = "pinout-alt2")))]
        assert_eq!(PinProfile::SELECTED, PinProfile::Default);
    }
}
