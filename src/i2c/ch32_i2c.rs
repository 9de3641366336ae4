// Licensed under the Apache-2.0 license

//! Polling master-mode driver for the CH32V003 I2C block.
//!
//! Every transaction is a fixed sequence of hardware phases (start, address,
//! register byte, data, stop). Each phase writes one control or data
//! register and then polls the combined status word until the phase's event
//! mask is fully set, an error flag shows up, or the iteration budget runs
//! out. Whatever happens, a stop condition is issued before a transaction
//! returns, so the bus is never left held by this master.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{ConfigurationError, I2cConfig, TimingConfig, DEFAULT_TIMEOUT};
use crate::i2c::registers::{ckcfgr, ctlr1, ctlr2, I2cRegisters};
use crate::i2c::status::{event, Status};
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};
use crate::syscon::SysconError;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};

/// Largest transfer a single register access may carry.
pub const MAX_TRANSFER_LEN: usize = 255;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A polled condition never became true within the iteration budget.
    Timeout,
    /// Address or data byte not acknowledged.
    Nack,
    /// Misplaced start or stop condition on the bus.
    BusError,
    /// Another master won the bus.
    ArbitrationLost,
    /// Address does not fit in 7 bits.
    InvalidAddress,
    /// Buffer longer than [`MAX_TRANSFER_LEN`].
    InvalidLength,
    Configuration(ConfigurationError),
    SystemControl(SysconError),
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error::Configuration(err)
    }
}

impl From<SysconError> for Error {
    fn from(err: SysconError) -> Self {
        Error::SystemControl(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Timeout => write!(f, "timeout"),
            Error::Nack => write!(f, "no acknowledge"),
            Error::BusError => write!(f, "bus error"),
            Error::ArbitrationLost => write!(f, "arbitration lost"),
            Error::InvalidAddress => write!(f, "address is not 7-bit"),
            Error::InvalidLength => write!(f, "transfer longer than {MAX_TRANSFER_LEN} bytes"),
            Error::Configuration(err) => write!(f, "configuration: {err}"),
            Error::SystemControl(err) => write!(f, "system control: {err}"),
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::BusError => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

/// Transaction phase, used for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    BusFree,
    Start,
    Address,
    Register,
    Restart,
    Data,
}

impl Phase {
    fn failure(self) -> &'static str {
        match self {
            Phase::BusFree => "bus stayed busy",
            Phase::Start => "start phase failed",
            Phase::Address => "address phase failed",
            Phase::Register => "register phase failed",
            Phase::Restart => "repeated start failed",
            Phase::Data => "data phase failed",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Direction {
    Write,
    Read,
}

fn check_address(addr: SevenBitAddress) -> Result<(), Error> {
    if addr > 0x7F {
        return Err(Error::InvalidAddress);
    }
    Ok(())
}

fn check_len(len: usize) -> Result<(), Error> {
    if len > MAX_TRANSFER_LEN {
        return Err(Error::InvalidLength);
    }
    Ok(())
}

/// CH32V003 I2C master.
pub struct Ch32I2c<R: I2cRegisters, L: Logger = NoOpLogger> {
    regs: R,
    logger: L,
    config: I2cConfig,
    timeout: u32,
}

impl<R: I2cRegisters, L: Logger> Ch32I2c<R, L> {
    pub fn new(regs: R, logger: L) -> Self {
        Self {
            regs,
            logger,
            config: I2cConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-phase poll budget without re-initialising.
    pub fn set_timeout(&mut self, iterations: u32) {
        self.timeout = iterations;
    }

    pub fn registers(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Fresh snapshot of STAR1/STAR2. STAR1 is read first; the pair of reads
    /// also clears ADDR, as the hardware expects.
    pub fn status(&mut self) -> Status {
        let star1 = self.regs.read_star1();
        let star2 = self.regs.read_star2();
        Status::from_registers(star1, star2)
    }

    /// `true` iff every bit of `mask` is set in the live status.
    pub fn check_event(&mut self, mask: Status) -> bool {
        self.status().matches(mask)
    }

    fn clear_flags(&mut self, flags: Status) {
        // Write-zero-to-clear; ones leave the other flags untouched.
        let bits = (flags.bits() & 0xFFFF) as u16;
        self.regs.write_star1(!bits);
    }

    /// Arbitration loss or bus error latched in `status`. The flag that
    /// fired is cleared.
    fn take_bus_fault(&mut self, status: Status) -> Option<Error> {
        if status.arbitration_lost() {
            self.clear_flags(Status::ARLO);
            return Some(Error::ArbitrationLost);
        }
        if status.bus_error() {
            self.clear_flags(Status::BERR);
            return Some(Error::BusError);
        }
        None
    }

    /// One poll of `mask`. Error flags are checked before the mask because
    /// they can latch at any point of a phase.
    fn poll_event(&mut self, mask: Status) -> nb::Result<(), Error> {
        let status = self.status();
        if let Some(err) = self.take_bus_fault(status) {
            return Err(nb::Error::Other(err));
        }
        if status.nack() {
            self.clear_flags(Status::AF);
            return Err(nb::Error::Other(Error::Nack));
        }
        if status.matches(mask) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// One poll of STAR2.BUSY, with the same error-first order as
    /// [`poll_event`](Self::poll_event).
    fn poll_idle(&mut self) -> nb::Result<(), Error> {
        let status = self.status();
        if let Some(err) = self.take_bus_fault(status) {
            return Err(nb::Error::Other(err));
        }
        if status.busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Repeat `poll` until it settles or the budget runs out.
    fn wait<F>(&mut self, phase: Phase, mut poll: F) -> Result<(), Error>
    where
        F: FnMut(&mut Self) -> nb::Result<(), Error>,
    {
        let mut budget = self.timeout;
        loop {
            match poll(self) {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(err)) => {
                    self.logger.error(phase.failure());
                    return Err(err);
                }
                Err(nb::Error::WouldBlock) => {}
            }
            if budget == 0 {
                self.logger.error(phase.failure());
                return Err(Error::Timeout);
            }
            budget -= 1;
        }
    }

    fn wait_event(&mut self, mask: Status, phase: Phase) -> Result<(), Error> {
        self.wait(phase, |this| this.poll_event(mask))
    }

    fn wait_bus_free(&mut self) -> Result<(), Error> {
        self.wait(Phase::BusFree, Self::poll_idle)
    }

    fn set_ack(&mut self, ack: bool) {
        if ack {
            self.regs.modify_ctlr1(|v| v | ctlr1::ACK);
        } else {
            self.regs.modify_ctlr1(|v| v & !ctlr1::ACK);
        }
    }

    fn start(&mut self, phase: Phase) -> Result<(), Error> {
        self.regs.modify_ctlr1(|v| v | ctlr1::START);
        self.wait_event(event::MASTER_MODE_SELECT, phase)
    }

    fn stop(&mut self) {
        self.regs.modify_ctlr1(|v| v | ctlr1::STOP);
    }

    fn send_write_address(&mut self, addr: SevenBitAddress) -> Result<(), Error> {
        self.regs.write_datar(addr << 1);
        self.wait_event(event::MASTER_TRANSMITTER_MODE_SELECTED, Phase::Address)
    }

    /// `ack_first` decides the acknowledge of the first received byte, which
    /// must be settled before the address phase completes.
    fn send_read_address(&mut self, addr: SevenBitAddress, ack_first: bool) -> Result<(), Error> {
        self.set_ack(ack_first);
        self.regs.write_datar((addr << 1) | 0x01);
        self.wait_event(event::MASTER_RECEIVER_MODE_SELECTED, Phase::Address)
    }

    fn send_byte(&mut self, byte: u8, phase: Phase) -> Result<(), Error> {
        self.regs.write_datar(byte);
        self.wait_event(event::MASTER_BYTE_TRANSMITTED, phase)
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            self.send_byte(byte, Phase::Data)?;
        }
        Ok(())
    }

    /// Receive into `buffer`, acknowledging every byte except, when
    /// `nack_last` is set, the final one.
    fn receive(&mut self, buffer: &mut [u8], nack_last: bool) -> Result<(), Error> {
        let last = buffer.len().saturating_sub(1);
        for (i, byte) in buffer.iter_mut().enumerate() {
            if nack_last && i == last {
                self.set_ack(false);
            }
            self.wait_event(event::MASTER_BYTE_RECEIVED, Phase::Data)?;
            *byte = self.regs.read_datar();
        }
        Ok(())
    }

    /// Start, address for write, register byte.
    fn select_register(&mut self, addr: SevenBitAddress, reg: u8) -> Result<(), Error> {
        self.wait_bus_free()?;
        self.start(Phase::Start)?;
        self.send_write_address(addr)?;
        self.send_byte(reg, Phase::Register)
    }

    /// Run `phases` and issue STOP afterwards, whatever the outcome.
    fn with_stop<F>(&mut self, phases: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        let result = phases(self);
        self.stop();
        result
    }

    fn probe(&mut self, addr: SevenBitAddress) -> Result<(), Error> {
        self.wait_bus_free()?;
        self.start(Phase::Start)?;
        self.send_write_address(addr)
    }

    fn enable(&mut self) {
        self.regs.modify_ctlr1(|v| v | ctlr1::PE | ctlr1::ACK);
    }
}

impl<R: I2cRegisters, L: Logger> I2cHardwareCore for Ch32I2c<R, L> {
    type Error = Error;

    fn init(&mut self, config: &I2cConfig) -> Result<(), Self::Error> {
        let timing = TimingConfig::compute(config)?;
        self.config = *config;
        self.timeout = config.timeout;

        self.regs.modify_ctlr1(|v| v & !ctlr1::PE);
        self.configure_timing(&timing);
        self.enable();

        if self.status().bus_error() {
            self.clear_flags(Status::BERR);
            self.logger.error("bus error after enable");
            return Err(Error::BusError);
        }
        self.logger.debug("peripheral enabled");
        Ok(())
    }

    fn configure_timing(&mut self, timing: &TimingConfig) {
        let freq = (self.regs.read_ctlr2() & !ctlr2::FREQ) | (u16::from(timing.freq) & ctlr2::FREQ);
        self.regs.write_ctlr2(freq);

        let mut clock = timing.ccr & ckcfgr::CCR;
        if timing.fast_mode {
            clock |= ckcfgr::FS;
        }
        if timing.duty_16_9 {
            clock |= ckcfgr::DUTY;
        }
        self.regs.write_ckcfgr(clock);
        self.regs.write_rise_time(timing.trise);
    }

    fn recover_bus(&mut self) -> Result<(), Self::Error> {
        let timing = TimingConfig::compute(&self.config)?;
        self.stop();
        self.regs.modify_ctlr1(|v| v | ctlr1::SWRST);
        self.regs.modify_ctlr1(|v| v & !ctlr1::SWRST);
        self.configure_timing(&timing);
        self.enable();
        self.logger.debug("bus recovered by software reset");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.stop();
        self.regs.modify_ctlr1(|v| v & !ctlr1::PE);
        self.regs.modify_ctlr1(|v| v | ctlr1::SWRST);
        self.regs.modify_ctlr1(|v| v & !ctlr1::SWRST);
        self.logger.debug("peripheral shut down");
    }
}

impl<R: I2cRegisters, L: Logger> I2cMaster<SevenBitAddress> for Ch32I2c<R, L> {
    fn ping(&mut self, addr: SevenBitAddress) -> Result<(), Self::Error> {
        check_address(addr)?;
        self.with_stop(|this| this.probe(addr))
    }

    fn write_register(
        &mut self,
        addr: SevenBitAddress,
        reg: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        check_address(addr)?;
        check_len(bytes.len())?;
        self.with_stop(|this| {
            this.select_register(addr, reg)?;
            this.transmit(bytes)
        })
    }

    fn read_register(
        &mut self,
        addr: SevenBitAddress,
        reg: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        check_address(addr)?;
        check_len(buffer.len())?;
        self.with_stop(|this| {
            this.select_register(addr, reg)?;
            if buffer.is_empty() {
                return Ok(());
            }
            this.start(Phase::Restart)?;
            this.send_read_address(addr, buffer.len() > 1)?;
            this.receive(buffer, true)
        })
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        check_address(addr)?;
        self.with_stop(|this| {
            this.probe(addr)?;
            this.transmit(bytes)
        })
    }

    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        check_address(addr)?;
        if buffer.is_empty() {
            return self.ping(addr);
        }
        self.with_stop(|this| {
            this.wait_bus_free()?;
            this.start(Phase::Start)?;
            this.send_read_address(addr, buffer.len() > 1)?;
            this.receive(buffer, true)
        })
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        check_address(addr)?;
        self.with_stop(|this| {
            this.probe(addr)?;
            this.transmit(bytes)?;
            if buffer.is_empty() {
                return Ok(());
            }
            this.start(Phase::Restart)?;
            this.send_read_address(addr, buffer.len() > 1)?;
            this.receive(buffer, true)
        })
    }

    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        check_address(addr)?;
        self.with_stop(|this| {
            this.wait_bus_free()?;

            let mut ops = ops_slice
                .iter_mut()
                .filter(|op| match op {
                    Operation::Write(bytes) => !bytes.is_empty(),
                    Operation::Read(buffer) => !buffer.is_empty(),
                })
                .peekable();

            if ops.peek().is_none() {
                this.start(Phase::Start)?;
                return this.send_write_address(addr);
            }

            let mut current: Option<Direction> = None;
            while let Some(op) = ops.next() {
                let next_is_read = matches!(ops.peek(), Some(Operation::Read(_)));
                let phase = if current.is_some() {
                    Phase::Restart
                } else {
                    Phase::Start
                };
                match op {
                    Operation::Write(bytes) => {
                        if current != Some(Direction::Write) {
                            this.start(phase)?;
                            this.send_write_address(addr)?;
                            current = Some(Direction::Write);
                        }
                        this.transmit(bytes)?;
                    }
                    Operation::Read(buffer) => {
                        if current != Some(Direction::Read) {
                            this.start(phase)?;
                            let ack_first = buffer.len() > 1 || next_is_read;
                            this.send_read_address(addr, ack_first)?;
                            current = Some(Direction::Read);
                        }
                        this.receive(buffer, !next_is_read)?;
                    }
                }
            }
            Ok(())
        })
    }
}
