// Licensed under the Apache-2.0 license

//! Register-level model of the I2C block and a handful of memory-style
//! targets, used by the unit tests.
//!
//! Targets behave like small EEPROMs: after an address-for-write the first
//! byte sets the internal pointer, later bytes are stored with
//! auto-increment, and reads stream from the pointer. Faults can be injected
//! through [`Faults`].

use crate::i2c::registers::{ctlr1, I2cRegisters};
use crate::i2c::status::{Status, STAR1_CLEARABLE};
use std::collections::HashMap;
use std::vec::Vec;

const fn star1(flag: Status) -> u16 {
    (flag.bits() & 0xFFFF) as u16
}

const fn star2(flag: Status) -> u16 {
    (flag.bits() >> 16) as u16
}

const SB: u16 = star1(Status::SB);
const ADDR: u16 = star1(Status::ADDR);
const BTF: u16 = star1(Status::BTF);
const RXNE: u16 = star1(Status::RXNE);
const TXE: u16 = star1(Status::TXE);
const BERR: u16 = star1(Status::BERR);
const ARLO: u16 = star1(Status::ARLO);
const AF: u16 = star1(Status::AF);
const MSL: u16 = star2(Status::MSL);
const BUSY: u16 = star2(Status::BUSY);
const TRA: u16 = star2(Status::TRA);

/// What happened on the wire, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Restart,
    Address { addr: u8, read: bool, acked: bool },
    ArbitrationLost,
    /// Byte sent by the master.
    Write(u8),
    /// Byte taken out of DATAR by the master.
    Read(u8),
    /// Master did not acknowledge the byte it just read.
    MasterNack,
    Stop,
}

#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// START is requested but SB never rises.
    pub stall_start: bool,
    /// Data bytes never complete in either direction.
    pub stall_data: bool,
    /// BUSY reads back set at all times.
    pub bus_stuck_busy: bool,
    /// The address byte goes out but the target neither ACKs nor NACKs.
    pub stall_address: bool,
    /// Targets NACK their address in the read direction.
    pub nack_read_address: bool,
    /// A repeated START is requested but SB never rises.
    pub stall_restart: bool,
    pub arbitration_lost_on_address: bool,
    pub bus_error_on_data: bool,
    /// BERR latches when the peripheral is enabled.
    pub bus_error_on_enable: bool,
}

pub struct SimDevice {
    pub memory: [u8; 256],
    /// Acknowledge this many bytes after an address-for-write, then NACK.
    pub nack_data_after: Option<usize>,
    pointer: u8,
    expect_register: bool,
    received: usize,
}

impl SimDevice {
    fn new() -> Self {
        Self {
            memory: [0; 256],
            nack_data_after: None,
            pointer: 0,
            expect_register: false,
            received: 0,
        }
    }

    fn next_byte(&mut self) -> u8 {
        let byte = self.memory[usize::from(self.pointer)];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    AwaitAddress,
    Transmit(u8),
    /// Read address acknowledged; the first byte arrives once ADDR clears.
    ReceiveArmed(u8),
    Receive(u8),
    /// Transfer over, waiting for STOP.
    Done,
}

pub struct SimBus {
    pub faults: Faults,
    ctlr1: u16,
    ctlr2: u16,
    ckcfgr: u16,
    rise_time: Option<u8>,
    star1: u16,
    star2: u16,
    datar: u8,
    star1_read: bool,
    status_reads: usize,
    mode: Mode,
    devices: HashMap<u8, SimDevice>,
    events: Vec<BusEvent>,
    software_resets: usize,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            faults: Faults::default(),
            ctlr1: 0,
            ctlr2: 0,
            ckcfgr: 0,
            rise_time: None,
            star1: 0,
            star2: 0,
            datar: 0,
            star1_read: false,
            status_reads: 0,
            mode: Mode::Idle,
            devices: HashMap::new(),
            events: Vec::new(),
            software_resets: 0,
        }
    }

    #[must_use]
    pub fn with_device(mut self, addr: u8) -> Self {
        self.devices.insert(addr, SimDevice::new());
        self
    }

    pub fn device_mut(&mut self, addr: u8) -> &mut SimDevice {
        self.devices.get_mut(&addr).expect("no such device")
    }

    pub fn memory(&self, addr: u8) -> &[u8; 256] {
        &self.devices.get(&addr).expect("no such device").memory
    }

    /// Preload `data` at `offset` in a device's memory.
    pub fn load(&mut self, addr: u8, offset: u8, data: &[u8]) {
        let device = self.device_mut(addr);
        for (i, byte) in data.iter().enumerate() {
            device.memory[(usize::from(offset) + i) % 256] = *byte;
        }
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.events.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.events.iter().filter(|e| **e == BusEvent::Stop).count()
    }

    /// Neither SCL nor SDA is held by the master and nobody else is driving
    /// the bus.
    pub fn lines_idle(&self) -> bool {
        self.star2 & (MSL | BUSY) == 0 && !self.faults.bus_stuck_busy && self.mode == Mode::Idle
    }

    /// Latch a STAR1 flag as if the hardware had raised it.
    pub fn latch(&mut self, flag: Status) {
        self.star1 |= star1(flag);
    }

    /// Number of STAR1 reads so far, one per status poll.
    pub fn status_reads(&self) -> usize {
        self.status_reads
    }

    pub fn ctlr1(&self) -> u16 {
        self.ctlr1
    }

    pub fn ctlr2(&self) -> u16 {
        self.ctlr2
    }

    pub fn ckcfgr(&self) -> u16 {
        self.ckcfgr
    }

    pub fn rise_time(&self) -> Option<u8> {
        self.rise_time
    }

    pub fn software_resets(&self) -> usize {
        self.software_resets
    }

    fn reset_registers(&mut self) {
        self.ctlr1 = 0;
        self.ctlr2 = 0;
        self.ckcfgr = 0;
        self.star1 = 0;
        self.star2 = 0;
        self.datar = 0;
        self.star1_read = false;
        self.mode = Mode::Idle;
    }

    fn release(&mut self) {
        self.star1 &= !(SB | ADDR | BTF | TXE | RXNE);
        self.star2 &= !(MSL | BUSY | TRA);
        self.mode = Mode::Idle;
    }

    fn generate_start(&mut self) {
        if self.mode == Mode::Idle {
            self.events.push(BusEvent::Start);
        } else {
            self.events.push(BusEvent::Restart);
        }
        self.star1 &= !(ADDR | BTF | TXE | RXNE);
        self.star1 |= SB;
        self.star2 &= !TRA;
        self.star2 |= MSL | BUSY;
        self.mode = Mode::AwaitAddress;
    }

    fn load_next(&mut self, addr: u8) {
        if self.faults.stall_data {
            return;
        }
        if let Some(device) = self.devices.get_mut(&addr) {
            self.datar = device.next_byte();
            self.star1 |= RXNE;
        }
    }

    fn address(&mut self, value: u8) {
        self.star1 &= !SB;
        let addr = value >> 1;
        let read = value & 0x01 != 0;

        if self.faults.arbitration_lost_on_address {
            self.events.push(BusEvent::ArbitrationLost);
            self.star1 |= ARLO;
            self.star2 &= !(MSL | BUSY | TRA);
            self.mode = Mode::Idle;
            return;
        }

        if self.faults.stall_address || (read && self.faults.nack_read_address) {
            // A silent target raises neither ADDR nor AF.
            if !self.faults.stall_address {
                self.star1 |= AF;
            }
            self.mode = Mode::Done;
            self.events.push(BusEvent::Address { addr, read, acked: false });
            return;
        }

        let acked = match self.devices.get_mut(&addr) {
            Some(device) => {
                if read {
                    self.star2 &= !TRA;
                    self.mode = Mode::ReceiveArmed(addr);
                } else {
                    device.expect_register = true;
                    device.received = 0;
                    self.star1 |= TXE;
                    self.star2 |= TRA;
                    self.mode = Mode::Transmit(addr);
                }
                self.star1 |= ADDR;
                true
            }
            None => {
                self.star1 |= AF;
                self.mode = Mode::Done;
                false
            }
        };
        self.events.push(BusEvent::Address { addr, read, acked });
    }

    fn transmit(&mut self, addr: u8, value: u8) {
        self.events.push(BusEvent::Write(value));
        self.star1 &= !(TXE | BTF);
        if self.faults.stall_data {
            return;
        }
        if self.faults.bus_error_on_data {
            self.star1 |= BERR;
            return;
        }
        let Some(device) = self.devices.get_mut(&addr) else {
            return;
        };
        if device.nack_data_after.is_some_and(|limit| device.received >= limit) {
            self.star1 |= AF;
            return;
        }
        device.received += 1;
        if device.expect_register {
            device.pointer = value;
            device.expect_register = false;
        } else {
            device.memory[usize::from(device.pointer)] = value;
            device.pointer = device.pointer.wrapping_add(1);
        }
        self.star1 |= TXE | BTF;
    }
}

impl I2cRegisters for SimBus {
    fn read_ctlr1(&mut self) -> u16 {
        self.ctlr1
    }

    fn write_ctlr1(&mut self, value: u16) {
        if value & ctlr1::SWRST != 0 {
            if self.ctlr1 & ctlr1::SWRST == 0 {
                self.software_resets += 1;
            }
            self.reset_registers();
            self.ctlr1 = ctlr1::SWRST;
            return;
        }

        let was_enabled = self.ctlr1 & ctlr1::PE != 0;
        self.ctlr1 = value & (ctlr1::PE | ctlr1::ACK | ctlr1::START);

        if value & ctlr1::PE == 0 {
            self.ctlr1 &= !ctlr1::START;
            self.release();
            return;
        }
        if !was_enabled && self.faults.bus_error_on_enable {
            self.star1 |= BERR;
        }
        if value & ctlr1::STOP != 0 {
            self.events.push(BusEvent::Stop);
            self.ctlr1 &= !ctlr1::START;
            self.release();
            return;
        }
        let stalled = self.faults.stall_start
            || (self.faults.stall_restart && self.mode != Mode::Idle);
        if value & ctlr1::START != 0 && !stalled {
            self.ctlr1 &= !ctlr1::START;
            self.generate_start();
        }
    }

    fn read_ctlr2(&mut self) -> u16 {
        self.ctlr2
    }

    fn write_ctlr2(&mut self, value: u16) {
        self.ctlr2 = value;
    }

    fn write_ckcfgr(&mut self, value: u16) {
        self.ckcfgr = value;
    }

    fn read_star1(&mut self) -> u16 {
        self.star1_read = true;
        self.status_reads += 1;
        self.star1
    }

    fn write_star1(&mut self, value: u16) {
        self.star1 &= value | !STAR1_CLEARABLE;
    }

    fn read_star2(&mut self) -> u16 {
        let mut value = self.star2;
        if self.faults.bus_stuck_busy {
            value |= BUSY;
        }
        if self.star1_read && self.star1 & ADDR != 0 {
            self.star1 &= !ADDR;
            if let Mode::ReceiveArmed(addr) = self.mode {
                self.mode = Mode::Receive(addr);
                self.load_next(addr);
            }
        }
        self.star1_read = false;
        value
    }

    fn read_datar(&mut self) -> u8 {
        let byte = self.datar;
        if self.star1 & RXNE != 0 {
            self.star1 &= !RXNE;
            self.events.push(BusEvent::Read(byte));
            if let Mode::Receive(addr) = self.mode {
                if self.ctlr1 & ctlr1::ACK != 0 {
                    self.load_next(addr);
                } else {
                    self.events.push(BusEvent::MasterNack);
                    self.mode = Mode::Done;
                }
            }
        }
        byte
    }

    fn write_datar(&mut self, value: u8) {
        match self.mode {
            Mode::AwaitAddress if self.star1 & SB != 0 => self.address(value),
            Mode::Transmit(addr) => self.transmit(addr, value),
            _ => {}
        }
    }

    fn write_rise_time(&mut self, value: u8) {
        self.rise_time = Some(value);
    }
}
