use bitflags::bitflags;

bitflags! {
    // Bit positions [ CWR, ECE, URG, ACK, PSH, RST, SYN, FIN ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TcpFlags: u8 {
        const CWR = 1 << 7;
        const ECE = 1 << 6;
        const URG = 1 << 5;
        const ACK = 1 << 4;
        const PSH = 1 << 3;
        const RST = 1 << 2;
        const SYN = 1 << 1;
        const FIN = 1 << 0;
    }
}

impl TcpFlags {
    /// True if SYN is set and ACK is clear.
    pub fn is_pure_syn(self) -> bool {
        self.contains(TcpFlags::SYN) && !self.contains(TcpFlags::ACK)
    }

    /// True if both SYN and ACK are set.
    pub fn is_syn_ack(self) -> bool {
        self.contains(TcpFlags::SYN | TcpFlags::ACK)
    }

    /// True if ACK is set and none of SYN, FIN or RST is.
    pub fn is_pure_ack(self) -> bool {
        self.contains(TcpFlags::ACK) && !self.intersects(TcpFlags::SYN | TcpFlags::FIN | TcpFlags::RST)
    }

    /// Sequence space consumed by the control bits alone.
    pub fn seq_len(self) -> u32 {
        self.contains(TcpFlags::SYN) as u32 + self.contains(TcpFlags::FIN) as u32
    }
}

// -- Unit tests --
