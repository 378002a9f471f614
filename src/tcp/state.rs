use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcpState {
    #[default]
    Closed, // No connection yet

    // -- Opening states --
    Listen,  // Waiting for SYN
    SynSent, // SYN sent, waiting for SYN-ACK
    SynRcvd, // SYN received, SYN-ACK sent, waiting for ACK

    // -- Steady state; opened --
    Established, // Handshake complete
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TcpState::Closed => "CLOSED",
            TcpState::Listen => "LISTEN",
            TcpState::SynSent => "SYN-SENT",
            TcpState::SynRcvd => "SYN-RECEIVED",
            TcpState::Established => "ESTABLISHED",
        };
        f.write_str(name)
    }
}
