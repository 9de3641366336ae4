// Licensed under the Apache-2.0 license

//! Combined I2C status word.
//!
//! STAR1 occupies bits 0..=15 and STAR2 bits 16..=31, matching the layout of
//! the vendor's event constants so a whole phase can be tested with a single
//! mask. A `Status` is a snapshot taken at one poll; it must never be reused
//! for a later check.

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        // STAR1
        /// Start condition generated.
        const SB = 1 << 0;
        /// Address sent and acknowledged.
        const ADDR = 1 << 1;
        /// Byte transfer finished.
        const BTF = 1 << 2;
        const STOPF = 1 << 4;
        /// Receive register not empty.
        const RXNE = 1 << 6;
        /// Transmit register empty.
        const TXE = 1 << 7;
        /// Misplaced start or stop.
        const BERR = 1 << 8;
        /// Arbitration lost.
        const ARLO = 1 << 9;
        /// Acknowledge failure.
        const AF = 1 << 10;
        const OVR = 1 << 11;
        const PECERR = 1 << 12;

        // STAR2
        /// Master mode.
        const MSL = 1 << 16;
        const BUSY = 1 << 17;
        /// Transmitter (as opposed to receiver).
        const TRA = 1 << 18;
    }
}

/// STAR1 flags that software clears by writing zero.
pub const STAR1_CLEARABLE: u16 = (Status::BERR.bits()
    | Status::ARLO.bits()
    | Status::AF.bits()
    | Status::OVR.bits()
    | Status::PECERR.bits()) as u16;

/// Phase completion masks.
pub mod event {
    use super::Status;

    /// BUSY, MSL, SB
    pub const MASTER_MODE_SELECT: Status = Status::BUSY.union(Status::MSL).union(Status::SB);

    /// BUSY, MSL, ADDR, TXE, TRA
    pub const MASTER_TRANSMITTER_MODE_SELECTED: Status = Status::BUSY
        .union(Status::MSL)
        .union(Status::ADDR)
        .union(Status::TXE)
        .union(Status::TRA);

    /// BUSY, MSL, ADDR
    pub const MASTER_RECEIVER_MODE_SELECTED: Status =
        Status::BUSY.union(Status::MSL).union(Status::ADDR);

    /// TRA, BUSY, MSL, TXE, BTF
    pub const MASTER_BYTE_TRANSMITTED: Status = Status::TRA
        .union(Status::BUSY)
        .union(Status::MSL)
        .union(Status::TXE)
        .union(Status::BTF);

    /// BUSY, MSL, RXNE
    pub const MASTER_BYTE_RECEIVED: Status = Status::BUSY.union(Status::MSL).union(Status::RXNE);
}

impl Status {
    /// Build a snapshot from the raw register values.
    #[must_use]
    pub const fn from_registers(star1: u16, star2: u16) -> Self {
        Self::from_bits_retain((star1 as u32) | ((star2 as u32) << 16))
    }

    /// Exact-subset match: every bit of `mask` is set.
    #[must_use]
    pub const fn matches(self, mask: Status) -> bool {
        self.bits() & mask.bits() == mask.bits()
    }

    #[must_use]
    pub const fn start_generated(self) -> bool {
        self.contains(Status::SB)
    }

    #[must_use]
    pub const fn address_acked(self) -> bool {
        self.contains(Status::ADDR)
    }

    #[must_use]
    pub const fn byte_done(self) -> bool {
        self.contains(Status::BTF)
    }

    #[must_use]
    pub const fn byte_received(self) -> bool {
        self.contains(Status::RXNE)
    }

    #[must_use]
    pub const fn nack(self) -> bool {
        self.contains(Status::AF)
    }

    #[must_use]
    pub const fn bus_error(self) -> bool {
        self.contains(Status::BERR)
    }

    #[must_use]
    pub const fn arbitration_lost(self) -> bool {
        self.contains(Status::ARLO)
    }

    #[must_use]
    pub const fn busy(self) -> bool {
        self.contains(Status::BUSY)
    }
}
