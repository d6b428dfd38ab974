use modular_bitfield_msb::prelude::*;

pub(crate) const CANINTE: u8 = 0x2B;
pub(crate) const CANINTF: u8 = 0x2C;
pub(crate) const TXB0CTRL: u8 = 0x30;
pub(crate) const TXB0SIDH: u8 = 0x31;
pub(crate) const TXB1CTRL: u8 = 0x40;
pub(crate) const TXB2CTRL: u8 = 0x50;
pub(crate) const RXB0SIDH: u8 = 0x61;

/// CANINTF/CANINTE flag bits
pub(crate) const RX0IF: u8 = 0x01;
pub(crate) const RX1IF: u8 = 0x02;
pub(crate) const TX0IF: u8 = 0x04;
pub(crate) const TX1IF: u8 = 0x08;
pub(crate) const TX2IF: u8 = 0x10;

/// TXBnCTRL transmit-request bit
pub(crate) const TXREQ: u8 = 0x08;

/// Flat 256-byte register space. All write policy lives in the engine,
/// this type only holds bytes.
pub(crate) struct RegisterFile([u8; 256]);

impl RegisterFile {
    pub fn new() -> Self {
        Self([0; 256])
    }

    pub fn read(&self, address: u8) -> u8 {
        self.0[usize::from(address)]
    }

    pub fn write(&mut self, address: u8, value: u8) {
        self.0[usize::from(address)] = value;
    }
}

/// Response byte of the READ_STATUS instruction
#[bitfield]
#[derive(Default)]
#[repr(u8)]
pub(crate) struct ReadStatus {
    pub tx2if: bool,
    pub tx2req: bool,
    pub tx1if: bool,
    pub tx1req: bool,
    pub tx0if: bool,
    pub tx0req: bool,
    pub rx1if: bool,
    pub rx0if: bool,
}

/// SIDL byte of a TX/RX buffer header: low three id bits, the
/// extended-id enable flag and the top two extended-id bits
#[bitfield]
#[derive(Default)]
#[repr(u8)]
pub(crate) struct BufIdLow {
    pub sid: B3,
    pub srr: bool,
    pub ide: bool,
    #[skip]
    __: B1,
    pub eid_hi: B2,
}

/// CANINTF and CANINTE share one layout
#[bitfield]
#[derive(Default)]
#[repr(u8)]
pub(crate) struct InterruptFlags {
    pub merrf: bool,
    pub wakif: bool,
    pub errif: bool,
    pub tx2if: bool,
    pub tx1if: bool,
    pub tx0if: bool,
    pub rx1if: bool,
    pub rx0if: bool,
}
