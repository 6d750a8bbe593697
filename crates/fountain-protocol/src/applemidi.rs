//! AppleMIDI session control packets (the RTP-MIDI session protocol).
//!
//! Only the session exchange is modelled: invitation, accept, reject and
//! end-of-session. Clock sync and the RTP-MIDI payload itself are handled by
//! whoever owns the data port.
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬───────────────┬──────────┬──────────────┐
//! │ 0xFFFF   │ Command │ Version  │ Initiator tok │ SSRC     │ Name (NUL)   │
//! │ (2B)     │ (2B)    │ (4B BE)  │ (4B BE)       │ (4B BE)  │ IN/OK only   │
//! └──────────┴─────────┴──────────┴───────────────┴──────────┴──────────────┘
//! ```

pub const SIGNATURE: [u8; 2] = [0xFF, 0xFF];
pub const PROTOCOL_VERSION: u32 = 2;

/// Session control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// "IN": invite the peer into a session
    Invitation,
    /// "OK": invitation accepted
    Accepted,
    /// "NO": invitation rejected
    Rejected,
    /// "BY": end the session
    End,
}

impl SessionCommand {
    pub fn code(self) -> [u8; 2] {
        match self {
            Self::Invitation => *b"IN",
            Self::Accepted => *b"OK",
            Self::Rejected => *b"NO",
            Self::End => *b"BY",
        }
    }

    pub fn from_code(code: [u8; 2]) -> Option<Self> {
        match &code {
            b"IN" => Some(Self::Invitation),
            b"OK" => Some(Self::Accepted),
            b"NO" => Some(Self::Rejected),
            b"BY" => Some(Self::End),
            _ => None,
        }
    }

    fn carries_name(self) -> bool {
        matches!(self, Self::Invitation | Self::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPacket {
    pub command: SessionCommand,
    pub initiator_token: u32,
    pub ssrc: u32,
    /// Session name; empty for commands that don't carry one
    pub name: String,
}

impl SessionPacket {
    /// signature(2) + command(2) + version(4) + token(4) + ssrc(4)
    pub const HEADER_SIZE: usize = 16;

    pub fn invitation(initiator_token: u32, ssrc: u32, name: &str) -> Self {
        Self {
            command: SessionCommand::Invitation,
            initiator_token,
            ssrc,
            name: name.to_string(),
        }
    }

    pub fn end(initiator_token: u32, ssrc: u32) -> Self {
        Self {
            command: SessionCommand::End,
            initiator_token,
            ssrc,
            name: String::new(),
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.extend_from_slice(&SIGNATURE);
        buf.extend_from_slice(&self.command.code());
        buf.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        buf.extend_from_slice(&self.initiator_token.to_be_bytes());
        buf.extend_from_slice(&self.ssrc.to_be_bytes());
        if self.command.carries_name() {
            buf.extend_from_slice(self.name.as_bytes());
            buf.push(0);
        }
    }

    pub fn deserialize(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::HEADER_SIZE || buf[0..2] != SIGNATURE {
            return None;
        }

        let command = SessionCommand::from_code([buf[2], buf[3]])?;
        let version = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != PROTOCOL_VERSION {
            return None;
        }
        let initiator_token = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let ssrc = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);

        let name = if command.carries_name() {
            let rest = &buf[Self::HEADER_SIZE..];
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            String::from_utf8_lossy(&rest[..end]).into_owned()
        } else {
            String::new()
        };

        Some(Self {
            command,
            initiator_token,
            ssrc,
            name,
        })
    }
}
