//! Synthetic capture construction shared by the integration tests.
#![allow(dead_code)]

pub const SERVER: [u8; 4] = [93, 184, 216, 34];
pub const CLIENT: [u8; 4] = [192, 168, 0, 101];
pub const OTHER: [u8; 4] = [192, 168, 0, 102];

/// One Ethernet/IPv4/TCP frame with knobs for every derived length.
#[derive(Debug, Clone)]
pub struct TcpFrame {
    pub destination: [u8; 4],
    pub sequence: u32,
    pub payload: Vec<u8>,
    pub ip_option_words: u8,
    pub tcp_option_words: u8,
    pub ether_type: u16,
    pub protocol: u8,
    pub total_len: Option<u16>,
    pub trailer: Vec<u8>,
}

impl TcpFrame {
    pub fn new(destination: [u8; 4], sequence: u32, payload: &[u8]) -> Self {
        Self {
            destination,
            sequence,
            payload: payload.to_vec(),
            ip_option_words: 0,
            tcp_option_words: 0,
            ether_type: 0x0800,
            protocol: 6,
            total_len: None,
            trailer: Vec::new(),
        }
    }

    pub fn ip_options(mut self, words: u8) -> Self {
        self.ip_option_words = words;
        self
    }

    pub fn tcp_options(mut self, words: u8) -> Self {
        self.tcp_option_words = words;
        self
    }

    pub fn ether_type(mut self, ether_type: u16) -> Self {
        self.ether_type = ether_type;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn total_len(mut self, total_len: u16) -> Self {
        self.total_len = Some(total_len);
        self
    }

    pub fn trailer(mut self, trailer: &[u8]) -> Self {
        self.trailer = trailer.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let ip_header_len = 20 + 4 * self.ip_option_words as usize;
        let tcp_header_len = 20 + 4 * self.tcp_option_words as usize;
        let total_len = self
            .total_len
            .unwrap_or((ip_header_len + tcp_header_len + self.payload.len()) as u16);

        let mut out = Vec::new();
        out.extend_from_slice(&[0x00, 0x1b, 0x21, 0x3a, 0x4f, 0x50]);
        out.extend_from_slice(&[0x00, 0x0c, 0x29, 0x11, 0x22, 0x33]);
        out.extend_from_slice(&self.ether_type.to_be_bytes());

        out.push(0x40 | (5 + self.ip_option_words));
        out.push(0);
        out.extend_from_slice(&total_len.to_be_bytes());
        out.extend_from_slice(&0x4d2eu16.to_be_bytes());
        out.extend_from_slice(&0x4000u16.to_be_bytes());
        out.push(64);
        out.push(self.protocol);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&SERVER);
        out.extend_from_slice(&self.destination);
        out.extend(std::iter::repeat_n(0x01, 4 * self.ip_option_words as usize));

        out.extend_from_slice(&80u16.to_be_bytes());
        out.extend_from_slice(&51000u16.to_be_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&1u32.to_be_bytes());
        let offset_flags = ((5 + self.tcp_option_words as u16) << 12) | 0x018;
        out.extend_from_slice(&offset_flags.to_be_bytes());
        out.extend_from_slice(&4096u16.to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        for _ in 0..self.tcp_option_words {
            out.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]);
        }

        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.trailer);
        out
    }
}

/// Builds a capture file image around raw frames.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuilder {
    big_endian: bool,
    linktype: Option<u32>,
    records: Vec<(u32, Vec<u8>)>,
}

impl CaptureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn linktype(mut self, linktype: u32) -> Self {
        self.linktype = Some(linktype);
        self
    }

    pub fn frame(self, frame: Vec<u8>) -> Self {
        let original = frame.len() as u32;
        self.frame_with_original(frame, original)
    }

    pub fn tcp(self, frame: &TcpFrame) -> Self {
        self.frame(frame.build())
    }

    pub fn frame_with_original(mut self, frame: Vec<u8>, original: u32) -> Self {
        self.records.push((original, frame));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let u16b = |v: u16| {
            if self.big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        let u32b = |v: u32| {
            if self.big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };

        let mut out = Vec::new();
        out.extend_from_slice(&u32b(0xa1b2_c3d4));
        out.extend_from_slice(&u16b(2));
        out.extend_from_slice(&u16b(4));
        out.extend_from_slice(&u32b(0));
        out.extend_from_slice(&u32b(0));
        out.extend_from_slice(&u32b(65535));
        out.extend_from_slice(&u32b(self.linktype.unwrap_or(1)));

        for (idx, (original, frame)) in self.records.iter().enumerate() {
            out.extend_from_slice(&u32b(1_700_000_000 + idx as u32));
            out.extend_from_slice(&u32b(0));
            out.extend_from_slice(&u32b(frame.len() as u32));
            out.extend_from_slice(&u32b(*original));
            out.extend_from_slice(frame);
        }
        out
    }
}
