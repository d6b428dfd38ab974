use crate::frame::{dlc_from_header, CanFrame, HEADER_LEN, MAX_PAYLOAD};
use crate::interrupt::{IntNotify, NoopInt};
use crate::registers::{
    ReadStatus, RegisterFile, CANINTE, CANINTF, RX0IF, RX1IF, RXB0SIDH, TX0IF, TX1IF, TX2IF,
    TXB0CTRL, TXB0SIDH, TXB1CTRL, TXB2CTRL, TXREQ,
};
use alloc::collections::VecDeque;
use log::debug;

/// SPI instruction set understood by the engine
#[derive(Copy, Clone, Debug, PartialEq)]
enum Instruction {
    Write = 0x02,
    Read = 0x03,
    BitModify = 0x05,
    ReadStatus = 0xA0,
}

impl Instruction {
    fn classify(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::Write),
            0x03 => Some(Self::Read),
            0x05 => Some(Self::BitModify),
            0xA0 => Some(Self::ReadStatus),
            _ => None,
        }
    }
}

/// Decoder state. Variants carry exactly the bytes-in-progress they
/// need, so a TX accumulator only exists while a TX load is underway.
#[derive(Copy, Clone, Debug, PartialEq)]
enum State {
    Idle,
    WriteAddr,
    WriteData {
        addr: u8,
    },
    TxHeader {
        header: [u8; HEADER_LEN],
        count: usize,
    },
    TxData {
        header: [u8; HEADER_LEN],
        data: [u8; MAX_PAYLOAD],
        count: usize,
        dlc: u8,
    },
    ReadAddr,
    ReadData {
        addr: u8,
    },
    BitModifyAddr,
    BitModifyMask {
        addr: u8,
    },
    BitModifyData {
        addr: u8,
        mask: u8,
    },
    ReadStatusDummy,
}

/// The simulated chip: a full-duplex byte transducer over a 256-byte
/// register file, plus the inbound frame queue feeding RX buffer 0.
///
/// Chip-select framing is implicit in the stream: a recognized
/// instruction opcode terminates a running read or write transaction.
pub struct Mcp2515<I: IntNotify> {
    regs: RegisterFile,
    state: State,
    rx_queue: VecDeque<CanFrame>,
    int_asserted: bool,
    int: I,
}

impl Default for Mcp2515<NoopInt> {
    fn default() -> Self {
        Self::new(NoopInt)
    }
}

impl<I: IntNotify> Mcp2515<I> {
    pub fn new(int: I) -> Self {
        Self {
            regs: RegisterFile::new(),
            state: State::Idle,
            rx_queue: VecDeque::new(),
            int_asserted: false,
            int,
        }
    }

    /// Clocks one full-duplex byte through the chip. Every input byte
    /// produces exactly one response byte and at most one frame the
    /// host driver just finished loading.
    pub fn step(&mut self, byte: u8) -> (u8, Option<CanFrame>) {
        match self.state {
            State::Idle => (self.dispatch(byte), None),
            State::WriteAddr => {
                self.state = if byte == TXB0SIDH {
                    State::TxHeader {
                        header: [0; HEADER_LEN],
                        count: 0,
                    }
                } else {
                    State::WriteData { addr: byte }
                };
                (0, None)
            }
            State::WriteData { addr } => {
                if Instruction::classify(byte).is_some() {
                    return (self.dispatch(byte), None);
                }
                self.store(addr, byte);
                self.state = State::WriteData {
                    addr: addr.wrapping_add(1),
                };
                (0, None)
            }
            State::TxHeader { mut header, count } => {
                header[count] = byte;
                self.regs.write(TXB0SIDH + count as u8, byte);

                let count = count + 1;
                if count < HEADER_LEN {
                    self.state = State::TxHeader { header, count };
                    return (0, None);
                }

                let dlc = dlc_from_header(header[HEADER_LEN - 1]);
                if dlc == 0 {
                    return (0, Some(self.emit_tx(header, &[])));
                }
                self.state = State::TxData {
                    header,
                    data: [0; MAX_PAYLOAD],
                    count: 0,
                    dlc,
                };
                (0, None)
            }
            State::TxData {
                header,
                mut data,
                count,
                dlc,
            } => {
                data[count] = byte;
                self.regs.write(TXB0SIDH + (HEADER_LEN + count) as u8, byte);

                let count = count + 1;
                if count < usize::from(dlc) {
                    self.state = State::TxData {
                        header,
                        data,
                        count,
                        dlc,
                    };
                    return (0, None);
                }
                (0, Some(self.emit_tx(header, &data[..count])))
            }
            State::ReadAddr => {
                self.state = State::ReadData { addr: byte };
                (0, None)
            }
            State::ReadData { addr } => {
                if Instruction::classify(byte).is_some() {
                    return (self.dispatch(byte), None);
                }
                self.state = State::ReadData {
                    addr: addr.wrapping_add(1),
                };
                (self.regs.read(addr), None)
            }
            State::BitModifyAddr => {
                self.state = State::BitModifyMask { addr: byte };
                (0, None)
            }
            State::BitModifyMask { addr } => {
                self.state = State::BitModifyData { addr, mask: byte };
                (0, None)
            }
            State::BitModifyData { addr, mask } => {
                let old = self.regs.read(addr);
                self.store(addr, (old & !mask) | (byte & mask));
                self.state = State::Idle;
                (0, None)
            }
            State::ReadStatusDummy => {
                self.state = State::Idle;
                (self.read_status(), None)
            }
        }
    }

    /// Appends inbound frames in order and loads the first one into
    /// RX buffer 0 if it is free.
    pub fn queue_rx(&mut self, frames: impl IntoIterator<Item = CanFrame>) {
        self.rx_queue.extend(frames);
        self.try_load_next();
        self.sync_int_line();
    }

    /// Raw register readback, mainly for diagnostics
    pub fn register(&self, address: u8) -> u8 {
        self.regs.read(address)
    }

    /// Logical interrupt line, true = asserted (physical level low)
    pub fn int_asserted(&self) -> bool {
        self.int_asserted
    }

    /// Frames queued but not yet visible in RX buffer 0
    pub fn pending_rx(&self) -> usize {
        self.rx_queue.len()
    }

    /// Classifies an instruction opcode. Anything else between
    /// transactions is chip-select noise.
    fn dispatch(&mut self, byte: u8) -> u8 {
        self.state = match Instruction::classify(byte) {
            Some(Instruction::Write) => State::WriteAddr,
            Some(Instruction::Read) => State::ReadAddr,
            Some(Instruction::BitModify) => State::BitModifyAddr,
            Some(Instruction::ReadStatus) => State::ReadStatusDummy,
            None => {
                debug!("ignoring unknown SPI opcode {byte:#04x}");
                State::Idle
            }
        };
        0
    }

    /// Register store shared by WRITE and BIT_MODIFY, including the
    /// side effects keyed on the target address.
    fn store(&mut self, addr: u8, value: u8) {
        // Transmission completes instantaneously, so TXREQ never sticks
        let value = if addr == TXB0CTRL { value & !TXREQ } else { value };
        self.regs.write(addr, value);

        match addr {
            CANINTF => {
                self.try_load_next();
                self.sync_int_line();
            }
            CANINTE => self.sync_int_line(),
            _ => {}
        }
    }

    fn emit_tx(&mut self, header: [u8; HEADER_LEN], data: &[u8]) -> CanFrame {
        let frame = CanFrame::from_tx_buffer(header, data);
        self.regs.write(CANINTF, self.regs.read(CANINTF) | TX0IF);
        self.sync_int_line();
        self.state = State::Idle;
        frame
    }

    /// Moves the queue head into RX buffer 0 once the previous frame
    /// has been consumed (RX0IF cleared by the host).
    fn try_load_next(&mut self) {
        if self.regs.read(CANINTF) & RX0IF != 0 {
            return;
        }

        if let Some(frame) = self.rx_queue.pop_front() {
            let (buffer, len) = frame.to_rx_buffer();
            for (i, value) in buffer[..len].iter().enumerate() {
                self.regs.write(RXB0SIDH + i as u8, *value);
            }
            self.regs.write(CANINTF, self.regs.read(CANINTF) | RX0IF);
        }
    }

    /// Change-detected `(CANINTF & CANINTE) != 0`. Intermediate
    /// transitions within one byte-step collapse into a single edge.
    fn sync_int_line(&mut self) {
        let asserted = self.regs.read(CANINTF) & self.regs.read(CANINTE) != 0;
        if asserted != self.int_asserted {
            self.int_asserted = asserted;
            self.int.on_int_change(asserted);
        }
    }

    fn read_status(&self) -> u8 {
        let intf = self.regs.read(CANINTF);

        ReadStatus::new()
            .with_rx0if(intf & RX0IF != 0)
            .with_rx1if(intf & RX1IF != 0)
            .with_tx0req(self.regs.read(TXB0CTRL) & TXREQ != 0)
            .with_tx0if(intf & TX0IF != 0)
            .with_tx1req(self.regs.read(TXB1CTRL) & TXREQ != 0)
            .with_tx1if(intf & TX1IF != 0)
            .with_tx2req(self.regs.read(TXB2CTRL) & TXREQ != 0)
            .with_tx2if(intf & TX2IF != 0)
            .into_bytes()[0]
    }
}
