use crate::{Error, Result};
use crate::handshake::c0c1::HANDSHAKE_SIZE;

/// Lowest S0 version a plain RTMP server may answer with
pub const MIN_SERVER_VERSION: u8 = 3;

/// Versions 32 and above are not valid RTMP versions
pub const MAX_SERVER_VERSION: u8 = 31;

/// Version byte chosen by the server in S0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpVersion(pub u8);

impl RtmpVersion {
    /// Validate the S0 byte against the version requested in C0.
    ///
    /// Only plain RTMP is spoken, so a server answering with any other
    /// version (6 is RTMPE) is rejected.
    pub fn from_s0(byte: u8, requested: u8) -> Result<Self> {
        if !(MIN_SERVER_VERSION..=MAX_SERVER_VERSION).contains(&byte) {
            return Err(Error::handshake(format!(
                "Unexpected server version: {}",
                byte
            )));
        }
        if byte != requested {
            return Err(Error::handshake(format!(
                "Server chose version {}, requested {}",
                byte, requested
            )));
        }
        Ok(RtmpVersion(byte))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Server S1 packet, echoed back verbatim as C2
#[derive(Debug, Clone)]
pub struct S1 {
    data: Vec<u8>,
}

impl S1 {
    /// Wrap S1 bytes read from the socket
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() != HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "S1 has {} bytes, expected {}",
                data.len(),
                HANDSHAKE_SIZE
            )));
        }
        Ok(S1 { data })
    }

    /// Server timestamp (bytes 0-3)
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    /// C2 is an exact echo of S1
    pub fn echo_as_c2(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_range() {
        assert_eq!(RtmpVersion::from_s0(3, 3).unwrap().value(), 3);
        assert!(RtmpVersion::from_s0(31, 31).is_ok());
        assert!(RtmpVersion::from_s0(2, 2).is_err());
        assert!(RtmpVersion::from_s0(0xFF, 3).is_err());
    }

    #[test]
    fn test_version_must_match_request() {
        let err = RtmpVersion::from_s0(6, 3).unwrap_err();
        assert!(matches!(err, Error::Handshake { ref message, .. } if message.contains("version 6")));
        assert!(RtmpVersion::from_s0(4, 3).is_err());
    }

    #[test]
    fn test_s1_echo() {
        let mut bytes = vec![0xAB; HANDSHAKE_SIZE];
        bytes[..4].copy_from_slice(&1234u32.to_be_bytes());
        let s1 = S1::parse(bytes.clone()).unwrap();

        assert_eq!(s1.timestamp(), 1234);
        assert_eq!(s1.echo_as_c2(), bytes.as_slice());
        assert!(S1::parse(vec![0; 10]).is_err());
    }
}
