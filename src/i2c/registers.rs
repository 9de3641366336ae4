// Licensed under the Apache-2.0 license

//! Register-level interface to the I2C block.
//!
//! The transaction engine only talks to [`I2cRegisters`]. The I2C1
//! implementation here goes through the `ch32-metapac` register block, and
//! tests plug in a simulated bus.

use ch32_metapac as pac;
use pac::i2c::{regs, I2c};

/// CTLR1 bits.
pub mod ctlr1 {
    pub const PE: u16 = 1 << 0;
    pub const START: u16 = 1 << 8;
    pub const STOP: u16 = 1 << 9;
    pub const ACK: u16 = 1 << 10;
    pub const SWRST: u16 = 1 << 15;
}

/// CTLR2 bits.
pub mod ctlr2 {
    pub const FREQ: u16 = 0x003F;
}

/// CKCFGR bits.
pub mod ckcfgr {
    pub const CCR: u16 = 0x0FFF;
    pub const DUTY: u16 = 1 << 14;
    pub const FS: u16 = 1 << 15;
}

/// Access to the I2C registers.
///
/// Every method maps onto exactly one bus access. Reads take `&mut self`
/// because status and data reads have side effects on the hardware.
pub trait I2cRegisters {
    fn read_ctlr1(&mut self) -> u16;
    fn write_ctlr1(&mut self, value: u16);
    fn read_ctlr2(&mut self) -> u16;
    fn write_ctlr2(&mut self, value: u16);
    fn write_ckcfgr(&mut self, value: u16);
    fn read_star1(&mut self) -> u16;
    /// STAR1 error flags are cleared by writing zero; ones are ignored.
    fn write_star1(&mut self, value: u16);
    fn read_star2(&mut self) -> u16;
    fn read_datar(&mut self) -> u8;
    fn write_datar(&mut self, value: u8);

    /// Rise-time register. The CH32V003 block has none, so the default
    /// discards the value.
    fn write_rise_time(&mut self, _value: u8) {}

    fn modify_ctlr1(&mut self, f: impl FnOnce(u16) -> u16) {
        let value = self.read_ctlr1();
        self.write_ctlr1(f(value));
    }
}

/// Low half of a register snapshot. The PAC exposes raw values at the bus
/// width, which for these registers only ever carries 16 meaningful bits.
fn low_half<T: Into<u32>>(raw: T) -> u16 {
    (raw.into() & 0xFFFF) as u16
}

/// I2C1 of the CH32V003.
pub struct I2c1 {
    regs: I2c,
}

impl I2c1 {
    /// # Safety
    ///
    /// Only one `I2c1` may exist at a time; it owns the peripheral.
    #[must_use]
    pub unsafe fn steal() -> Self {
        Self { regs: pac::I2C1 }
    }
}

impl I2cRegisters for I2c1 {
    fn read_ctlr1(&mut self) -> u16 {
        low_half(self.regs.ctlr1().read().0)
    }

    fn write_ctlr1(&mut self, value: u16) {
        self.regs.ctlr1().write_value(regs::Ctlr1(value.into()));
    }

    fn read_ctlr2(&mut self) -> u16 {
        low_half(self.regs.ctlr2().read().0)
    }

    fn write_ctlr2(&mut self, value: u16) {
        self.regs.ctlr2().write_value(regs::Ctlr2(value.into()));
    }

    fn write_ckcfgr(&mut self, value: u16) {
        self.regs.ckcfgr().write(|w| {
            w.set_ccr(value & ckcfgr::CCR);
            w.set_duty(value & ckcfgr::DUTY != 0);
            w.set_f_s(value & ckcfgr::FS != 0);
        });
    }

    fn read_star1(&mut self) -> u16 {
        low_half(self.regs.star1().read().0)
    }

    fn write_star1(&mut self, value: u16) {
        self.regs.star1().write_value(regs::Star1(value.into()));
    }

    fn read_star2(&mut self) -> u16 {
        low_half(self.regs.star2().read().0)
    }

    fn read_datar(&mut self) -> u8 {
        self.regs.datar().read().datar()
    }

    fn write_datar(&mut self, value: u8) {
        self.regs.datar().write(|w| w.set_datar(value));
    }
}
