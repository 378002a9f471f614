use crate::tcp::errors::HeaderError;
use crate::tcp::flags::TcpFlags;
use crate::tcp::wrap32::Wrap32;

pub const TCP_MIN_HEADER_LEN: usize = 20;

const MIN_DATA_OFFSET: u8 = 5;
const MAX_DATA_OFFSET: u8 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_no: Wrap32,
    pub ack_no: Wrap32,
    pub data_offset: u8, // Upper 4 bits, in 32-bit words
    pub reserved: u8,    // Lower 4 bits, 3 reserved + NS
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
    pub options: Vec<u8>, // Opaque, zero padded up to the data offset
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader {
            src_port: 0,
            dst_port: 0,
            seq_no: Wrap32::new(0),
            ack_no: Wrap32::new(0),
            data_offset: MIN_DATA_OFFSET,
            reserved: 0,
            flags: TcpFlags::empty(),
            window: 0,
            checksum: 0,
            urgent: 0,
            options: vec![],
        }
    }
}

impl TcpHeader {
    /// A minimum-length header between the two ports with everything else zeroed.
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        TcpHeader {
            src_port,
            dst_port,
            ..Default::default()
        }
    }

    /// Header length in bytes, as declared by the data offset.
    pub fn header_len(&self) -> usize {
        self.data_offset as usize * 4
    }

    /// Write the header into `buf`. Returns the number of bytes written, which
    /// is always `header_len()`. The checksum field is copied as is.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, HeaderError> {
        if !(MIN_DATA_OFFSET..=MAX_DATA_OFFSET).contains(&self.data_offset) {
            return Err(HeaderError::InvalidDataOffset(self.data_offset));
        }

        let header_len = self.header_len();
        let options_room = header_len - TCP_MIN_HEADER_LEN;
        if self.options.len() > options_room {
            return Err(HeaderError::OptionsTooLong { max: options_room, found: self.options.len() });
        }

        if buf.len() < header_len {
            return Err(HeaderError::BufferTooSmall { expected: header_len, found: buf.len() });
        }

        buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seq_no.value().to_be_bytes());
        buf[8..12].copy_from_slice(&self.ack_no.value().to_be_bytes());
        buf[12] = (self.data_offset << 4) | (self.reserved & 0x0f);
        buf[13] = self.flags.bits();
        buf[14..16].copy_from_slice(&self.window.to_be_bytes());
        buf[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        buf[18..20].copy_from_slice(&self.urgent.to_be_bytes());

        // Options, then pad with zeros up to the data offset
        let options_end = TCP_MIN_HEADER_LEN + self.options.len();
        buf[TCP_MIN_HEADER_LEN..options_end].copy_from_slice(&self.options);
        buf[options_end..header_len].fill(0);

        Ok(header_len)
    }

    /// Convert a `TcpHeader` into a byte vector of exactly `header_len()` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HeaderError> {
        let mut buf = vec![0u8; self.header_len()];
        self.serialize(&mut buf)?;
        Ok(buf)
    }

    /// Parse the header at the front of `buf`. Anything past `header_len()`
    /// is payload and left alone.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < TCP_MIN_HEADER_LEN {
            return Err(HeaderError::BufferTooSmall { expected: TCP_MIN_HEADER_LEN, found: buf.len() });
        }

        let data_offset = buf[12] >> 4;
        if data_offset < MIN_DATA_OFFSET {
            return Err(HeaderError::InvalidDataOffset(data_offset));
        }

        let header_len = data_offset as usize * 4;
        if buf.len() < header_len {
            return Err(HeaderError::BufferTooSmall { expected: header_len, found: buf.len() });
        }

        Ok(TcpHeader {
            src_port: u16::from_be_bytes([buf[0], buf[1]]),
            dst_port: u16::from_be_bytes([buf[2], buf[3]]),
            seq_no: Wrap32::new(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])),
            ack_no: Wrap32::new(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])),
            data_offset,
            reserved: buf[12] & 0x0f,
            flags: TcpFlags::from_bits_retain(buf[13]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            checksum: u16::from_be_bytes([buf[16], buf[17]]),
            urgent: u16::from_be_bytes([buf[18], buf[19]]),
            options: buf[TCP_MIN_HEADER_LEN..header_len].to_vec(),
        })
    }

    /// Patch the checksum field of an encoded segment in place.
    pub fn set_checksum(buf: &mut [u8], checksum: u16) -> Result<(), HeaderError> {
        match buf.get_mut(16..18) {
            Some(field) => {
                field.copy_from_slice(&checksum.to_be_bytes());
                Ok(())
            }
            None => Err(HeaderError::BufferTooSmall { expected: TCP_MIN_HEADER_LEN, found: buf.len() }),
        }
    }

    /// Flags in the usual `SYN|ACK` notation, for logging.
    pub fn flags_str(&self) -> String {
        if self.flags.is_empty() {
            return "<none>".to_string();
        }
        self.flags
            .iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

// -- Unit tests --
