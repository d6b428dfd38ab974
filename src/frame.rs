use crate::registers::BufIdLow;
use bytes::BytesMut;
use log::debug;

pub const STANDARD_ID_MASK: u16 = 0x7FF;
pub const EXTENDED_ID_MASK: u32 = 0x3FFFF;
pub const MAX_PAYLOAD: usize = 8;

/// SIDH, SIDL, EID8, EID0, DLC
pub(crate) const HEADER_LEN: usize = 5;

#[derive(Debug, Eq, PartialEq)]
pub enum FrameError {
    /// Standard id does not fit in 11 bits
    InvalidStandardId(u16),

    /// Extended id does not fit in 18 bits
    InvalidExtendedId(u32),

    /// Payload longer than 8 bytes, or buffer shorter than its DLC claims
    InvalidLength(usize),
}

/// One CAN frame: 11-bit standard id, 18-bit extended id and up to
/// 8 payload bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanFrame {
    pub(crate) id: u16,
    pub(crate) eid: u32,
    pub(crate) data: BytesMut,
}

impl CanFrame {
    pub fn new(id: u16, eid: u32, data: &[u8]) -> Result<Self, FrameError> {
        if id > STANDARD_ID_MASK {
            return Err(FrameError::InvalidStandardId(id));
        }

        if eid > EXTENDED_ID_MASK {
            return Err(FrameError::InvalidExtendedId(eid));
        }

        if data.len() > MAX_PAYLOAD {
            return Err(FrameError::InvalidLength(data.len()));
        }

        let mut bytes = BytesMut::with_capacity(data.len());
        bytes.extend_from_slice(data);

        Ok(Self { id, eid, data: bytes })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn eid(&self) -> u32 {
        self.eid
    }

    pub fn dlc(&self) -> u8 {
        self.data.len() as u8
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reassembles the frame a host driver wrote into the TX buffer.
    /// `data` must already be sliced to the header's DLC.
    pub(crate) fn from_tx_buffer(header: [u8; HEADER_LEN], data: &[u8]) -> Self {
        let sidl = BufIdLow::from_bytes([header[1]]);
        let id = u16::from(header[0]) << 3 | u16::from(sidl.sid());
        let eid = u32::from(sidl.eid_hi()) << 16 | u32::from(header[2]) << 8 | u32::from(header[3]);

        let mut bytes = BytesMut::with_capacity(data.len());
        bytes.extend_from_slice(data);

        Self { id, eid, data: bytes }
    }

    /// Encodes the frame into the RX buffer register layout.
    /// Returns the buffer and the number of valid bytes in it.
    pub(crate) fn to_rx_buffer(&self) -> ([u8; HEADER_LEN + MAX_PAYLOAD], usize) {
        let mut buffer = [0u8; HEADER_LEN + MAX_PAYLOAD];

        buffer[0] = (self.id >> 3) as u8;
        buffer[1] = BufIdLow::new()
            .with_sid((self.id & 0x07) as u8)
            .with_ide(true)
            .with_eid_hi((self.eid >> 16) as u8)
            .into_bytes()[0];
        buffer[2] = (self.eid >> 8) as u8;
        buffer[3] = self.eid as u8;
        buffer[4] = self.dlc();
        buffer[HEADER_LEN..HEADER_LEN + self.data.len()].copy_from_slice(&self.data);

        (buffer, HEADER_LEN + self.data.len())
    }

    /// Decodes the RX buffer register layout back into a frame. Useful on
    /// the transport side to check what the host driver will read.
    pub fn from_rx_buffer(buffer: &[u8]) -> Result<Self, FrameError> {
        if buffer.len() < HEADER_LEN {
            return Err(FrameError::InvalidLength(buffer.len()));
        }

        let sidl = BufIdLow::from_bytes([buffer[1]]);
        let id = u16::from(buffer[0]) << 3 | u16::from(sidl.sid());
        let eid = u32::from(sidl.eid_hi()) << 16 | u32::from(buffer[2]) << 8 | u32::from(buffer[3]);
        let dlc = usize::from(dlc_from_header(buffer[4]));

        if buffer.len() < HEADER_LEN + dlc {
            return Err(FrameError::InvalidLength(buffer.len()));
        }

        Self::new(id, eid, &buffer[HEADER_LEN..HEADER_LEN + dlc])
    }
}

/// Extracts the DLC nibble of the last header byte, limited to the
/// 8 data bytes a buffer actually has.
pub(crate) fn dlc_from_header(byte: u8) -> u8 {
    let dlc = byte & 0x0F;

    if usize::from(dlc) > MAX_PAYLOAD {
        debug!("DLC nibble {dlc} exceeds buffer size, using 8");
        return MAX_PAYLOAD as u8;
    }

    dlc
}
