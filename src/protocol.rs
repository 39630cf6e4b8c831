//! Byte-exact codec for the four layers of an IPMI v1.5 LAN datagram.
//!
//! ```text
//! +-------------+--------------------------+--------------+---------+----+
//! | RMCP (4)    | session (10 or 26)       | IPMB hdr (6) | payload | ck |
//! +-------------+--------------------------+--------------+---------+----+
//! ```
//!
//! Every multi-byte integer is big-endian. Decoding never validates
//! checksums; callers run [`verify_header_checksum`] and
//! [`verify_trailing_checksum`] on the raw message because the trailing
//! checksum domain spans the IPMB header and the command payload.

use crate::crypto::{AUTH_FIELD_LEN, Password, compute_auth_code};
use crate::error::{ChecksumKind, Error, Result};
use crate::types::AuthType;

/// UDP port for RMCP.
pub const RMCP_PORT: u16 = 623;

/// RMCP header values.
const RMCP_VERSION: u8 = 0x06;
const RMCP_RESERVED: u8 = 0x00;
const RMCP_SEQ_NO_ACK: u8 = 0xFF;
const RMCP_CLASS_IPMI: u8 = 0x07;

/// IPMB slave address of the BMC.
pub const BMC_ADDR: u8 = 0x20;
/// IPMB software id of the remote console.
pub const REMOTE_CONSOLE_ADDR: u8 = 0x81;

/// Encoded size of the IPMB header (without the trailing checksum).
pub const IPMB_HEADER_LEN: usize = 6;
/// Smallest well-formed IPMB message: header plus trailing checksum.
pub const IPMB_MIN_MESSAGE_LEN: usize = IPMB_HEADER_LEN + 1;

/// Fixed-layout encode/decode shared by every header and command payload.
pub trait Wire: Sized {
    /// Number of bytes [`Wire::encode`] appends.
    fn encoded_len(&self) -> usize;

    /// Append the encoded value to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Decode a value from the front of `buf`, advancing it past the consumed bytes.
    fn decode(buf: &mut &[u8]) -> Result<Self>;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }
}

pub(crate) fn ensure(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

pub(crate) fn take<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N]> {
    ensure(buf, N)?;
    let (head, rest) = buf.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    *buf = rest;
    Ok(out)
}

pub(crate) fn take_u8(buf: &mut &[u8]) -> Result<u8> {
    Ok(take::<1>(buf)?[0])
}

pub(crate) fn take_u32(buf: &mut &[u8]) -> Result<u32> {
    Ok(u32::from_be_bytes(take::<4>(buf)?))
}

/// Compute the standard 2's complement checksum used by IPMI LAN messages.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

fn sums_to_zero(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

/// Validate checksum 1: responder address + netFn/LUN + checksum == 0 (mod 256).
pub fn verify_header_checksum(message: &[u8]) -> Result<()> {
    ensure(message, IPMB_MIN_MESSAGE_LEN)?;
    if !sums_to_zero(&message[..3]) {
        return Err(Error::ChecksumMismatch(ChecksumKind::Header));
    }
    Ok(())
}

/// Validate checksum 2, the last byte of the message.
///
/// The domain is the whole message, from the responder address through the
/// checksum byte itself.
pub fn verify_trailing_checksum(message: &[u8]) -> Result<()> {
    ensure(message, IPMB_MIN_MESSAGE_LEN)?;
    if !sums_to_zero(message) {
        return Err(Error::ChecksumMismatch(ChecksumKind::Trailing));
    }
    Ok(())
}

/// RMCP transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmcpHeader {
    /// RMCP version (0x06 for ASF 2.0).
    pub version: u8,
    /// Reserved, always zero.
    pub reserved: u8,
    /// RMCP sequence number; 0xFF requests no RMCP ACK.
    pub sequence: u8,
    /// Message class; 0x07 is a normal IPMI message.
    pub message_class: u8,
}

impl RmcpHeader {
    /// Encoded size.
    pub const LEN: usize = 4;

    fn validate(&self) -> Result<()> {
        if self.version != RMCP_VERSION {
            return Err(Error::Protocol("unexpected RMCP version"));
        }
        if self.message_class != RMCP_CLASS_IPMI {
            return Err(Error::Protocol("unexpected RMCP class"));
        }
        Ok(())
    }
}

impl Default for RmcpHeader {
    fn default() -> Self {
        Self {
            version: RMCP_VERSION,
            reserved: RMCP_RESERVED,
            sequence: RMCP_SEQ_NO_ACK,
            message_class: RMCP_CLASS_IPMI,
        }
    }
}

impl Wire for RmcpHeader {
    fn encoded_len(&self) -> usize {
        Self::LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[
            self.version,
            self.reserved,
            self.sequence,
            self.message_class,
        ]);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let [version, reserved, sequence, message_class] = take::<4>(buf)?;
        Ok(Self {
            version,
            reserved,
            sequence,
            message_class,
        })
    }
}

/// IPMI v1.5 session header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHeader {
    /// Authentication type of this packet.
    pub auth_type: AuthType,
    /// Session sequence number.
    pub sequence: u32,
    /// Session id.
    pub session_id: u32,
    /// Auth code; present iff `auth_type` is not [`AuthType::None`].
    pub auth_code: Option<[u8; AUTH_FIELD_LEN]>,
    /// Length of the IPMB message that follows.
    pub payload_len: u8,
}

impl SessionHeader {
    /// Encoded size without an auth code.
    pub const LEN: usize = 10;
    /// Encoded size with a 16-byte auth code.
    pub const LEN_WITH_AUTH: usize = Self::LEN + AUTH_FIELD_LEN;
}

impl Wire for SessionHeader {
    fn encoded_len(&self) -> usize {
        if self.auth_type.has_auth_code() {
            Self::LEN_WITH_AUTH
        } else {
            Self::LEN
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.auth_type.as_u8());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.session_id.to_be_bytes());
        if self.auth_type.has_auth_code() {
            out.extend_from_slice(&self.auth_code.unwrap_or([0u8; AUTH_FIELD_LEN]));
        }
        out.push(self.payload_len);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        ensure(buf, Self::LEN)?;
        let auth_type = AuthType::from_u8(buf[0])
            .ok_or(Error::Protocol("unknown session auth type"))?;
        if auth_type.has_auth_code() {
            ensure(buf, Self::LEN_WITH_AUTH)?;
        }

        take_u8(buf)?;
        let sequence = take_u32(buf)?;
        let session_id = take_u32(buf)?;
        let auth_code = if auth_type.has_auth_code() {
            Some(take::<AUTH_FIELD_LEN>(buf)?)
        } else {
            None
        };
        let payload_len = take_u8(buf)?;

        Ok(Self {
            auth_type,
            sequence,
            session_id,
            auth_code,
            payload_len,
        })
    }
}

/// IPMB message header as carried over LAN.
///
/// The header checksum is computed on encode and skipped on decode; see
/// [`verify_header_checksum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpmbHeader {
    /// Responder slave address.
    pub rs_addr: u8,
    /// Network function (6 bits).
    pub netfn: u8,
    /// Responder LUN (2 bits).
    pub rs_lun: u8,
    /// Requester address.
    pub rq_addr: u8,
    /// Requester sequence (6 bits).
    pub rq_seq: u8,
    /// Requester LUN (2 bits).
    pub rq_lun: u8,
    /// Command code.
    pub command: u8,
}

impl IpmbHeader {
    /// Header for a request from the remote console to the BMC.
    pub fn request(netfn: u8, rq_seq: u8, command: u8) -> Self {
        Self {
            rs_addr: BMC_ADDR,
            netfn,
            rs_lun: 0,
            rq_addr: REMOTE_CONSOLE_ADDR,
            rq_seq,
            rq_lun: 0,
            command,
        }
    }

    /// Header the BMC uses to answer a request carrying `request`.
    pub fn response_to(request: &Self) -> Self {
        Self {
            rs_addr: request.rq_addr,
            netfn: request.netfn.wrapping_add(1) & 0x3F,
            rs_lun: request.rq_lun,
            rq_addr: request.rs_addr,
            rq_seq: request.rq_seq,
            rq_lun: request.rs_lun,
            command: request.command,
        }
    }

    fn netfn_lun(&self) -> u8 {
        (self.netfn << 2) | (self.rs_lun & 0x03)
    }

    fn rq_seq_lun(&self) -> u8 {
        (self.rq_seq << 2) | (self.rq_lun & 0x03)
    }
}

impl Wire for IpmbHeader {
    fn encoded_len(&self) -> usize {
        IPMB_HEADER_LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let netfn_lun = self.netfn_lun();
        out.push(self.rs_addr);
        out.push(netfn_lun);
        out.push(checksum(&[self.rs_addr, netfn_lun]));
        out.push(self.rq_addr);
        out.push(self.rq_seq_lun());
        out.push(self.command);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        // A header is only meaningful with the trailing checksum behind it.
        ensure(buf, IPMB_MIN_MESSAGE_LEN)?;
        let [rs_addr, netfn_lun, _checksum, rq_addr, rq_seq_lun, command] =
            take::<IPMB_HEADER_LEN>(buf)?;
        Ok(Self {
            rs_addr,
            netfn: netfn_lun >> 2,
            rs_lun: netfn_lun & 0x03,
            rq_addr,
            rq_seq: rq_seq_lun >> 2,
            rq_lun: rq_seq_lun & 0x03,
            command,
        })
    }
}

/// Build an IPMB message: header, payload bytes and trailing checksum.
pub fn encode_message(header: &IpmbHeader, payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(IPMB_MIN_MESSAGE_LEN + payload.len());
    header.encode(&mut msg);
    msg.extend_from_slice(payload);
    let csum2 = checksum(&msg);
    msg.push(csum2);
    msg
}

/// How an outbound packet is authenticated.
#[derive(Debug, Clone, Copy)]
pub enum Authentication<'a> {
    /// Auth type none; the session header has no auth code.
    None,
    /// MD5 auth code keyed by `password`.
    Md5 {
        /// Session password.
        password: &'a Password,
        /// Sequence term fed to the digest. Equals the header sequence for
        /// every packet except Activate Session, which hashes zero.
        auth_sequence: u32,
    },
}

/// Wrap an IPMB message in RMCP and session headers.
///
/// The session header is written with an empty auth code slot first; once the
/// message bytes are in place the MD5 code is computed over them and spliced
/// into the slot.
pub fn encode_packet(
    auth: Authentication<'_>,
    session_id: u32,
    sequence: u32,
    message: &[u8],
) -> Result<Vec<u8>> {
    let payload_len: u8 = message
        .len()
        .try_into()
        .map_err(|_| Error::Protocol("IPMB message too large"))?;

    let auth_type = match auth {
        Authentication::None => AuthType::None,
        Authentication::Md5 { .. } => AuthType::Md5,
    };
    let session = SessionHeader {
        auth_type,
        sequence,
        session_id,
        auth_code: None,
        payload_len,
    };

    let mut packet = Vec::with_capacity(RmcpHeader::LEN + session.encoded_len() + message.len());
    RmcpHeader::default().encode(&mut packet);
    session.encode(&mut packet);
    let message_start = packet.len();
    packet.extend_from_slice(message);

    if let Authentication::Md5 {
        password,
        auth_sequence,
    } = auth
    {
        let code = compute_auth_code(password, session_id, message, auth_sequence);
        let slot_end = message_start - 1;
        packet[slot_end - AUTH_FIELD_LEN..slot_end].copy_from_slice(&code);
    }

    Ok(packet)
}

/// A decoded inbound datagram. Checksums and auth code are not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    /// RMCP header.
    pub rmcp: RmcpHeader,
    /// Session header.
    pub session: SessionHeader,
    /// Decoded IPMB header.
    pub ipmb: IpmbHeader,
    /// Raw IPMB message, header through trailing checksum.
    pub message: Vec<u8>,
}

impl InboundPacket {
    /// Command payload bytes between the IPMB header and the trailing checksum.
    pub fn body(&self) -> &[u8] {
        &self.message[IPMB_HEADER_LEN..self.message.len() - 1]
    }

    /// Run both IPMB checksum checks.
    pub fn verify_checksums(&self) -> Result<()> {
        verify_header_checksum(&self.message)?;
        verify_trailing_checksum(&self.message)
    }
}

/// Split a datagram into its layers.
pub fn decode_packet(bytes: &[u8]) -> Result<InboundPacket> {
    let mut buf = bytes;

    let rmcp = RmcpHeader::decode(&mut buf)?;
    rmcp.validate()?;

    let session = SessionHeader::decode(&mut buf)?;
    let payload_len = usize::from(session.payload_len);
    ensure(buf, payload_len)?;
    let mut message = &buf[..payload_len];
    let raw = message.to_vec();

    let ipmb = IpmbHeader::decode(&mut message)?;

    Ok(InboundPacket {
        rmcp,
        session,
        ipmb,
        message: raw,
    })
}

/// Check that an inbound IPMB header answers the request we sent.
pub(crate) fn check_response_header(
    header: &IpmbHeader,
    request_netfn: u8,
    command: u8,
    rq_seq: u8,
) -> Result<()> {
    if header.rs_addr != REMOTE_CONSOLE_ADDR || header.netfn != request_netfn + 1 {
        return Err(Error::Protocol("unexpected responder or netfn"));
    }
    if header.rq_addr != BMC_ADDR {
        return Err(Error::Protocol("unexpected requester address"));
    }
    if header.rq_seq != rq_seq {
        return Err(Error::Protocol("unexpected request sequence"));
    }
    if header.command != command {
        return Err(Error::Protocol("unexpected command"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPS_REQUEST: [u8; 23] = [
        0x06, 0x00, 0xFF, 0x07, // rmcp
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, // session
        0x20, 0x18, 0xC8, 0x81, 0x04, 0x38, // ipmb
        0x0E, 0x04, // channel, privilege
        0x31, // checksum2
    ];

    const CAPS_RESPONSE: [u8; 30] = [
        0x06, 0x00, 0xFF, 0x07, // rmcp
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, // session
        0x81, 0x1C, 0x63, 0x20, 0x04, 0x38, // ipmb
        0x00, 0x01, 0x14, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, // body
        0x8B, // checksum2
    ];

    #[test]
    fn ipmi_request_encoding_get_device_id_no_data() {
        let msg = encode_message(&IpmbHeader::request(0x06, 0, 0x01), &[]);
        assert_eq!(msg, vec![0x20, 0x18, 0xC8, 0x81, 0x00, 0x01, 0x7E]);
    }

    #[test]
    fn trailing_checksum_covers_the_header_bytes() {
        let mut msg = encode_message(&IpmbHeader::request(0x06, 1, 0x38), &[0x0E, 0x04]);
        assert!(verify_trailing_checksum(&msg).is_ok());

        // Bytes 3.. still sum to zero, the full message does not.
        msg[2] = msg[2].wrapping_add(1);
        assert!(matches!(
            verify_trailing_checksum(&msg),
            Err(Error::ChecksumMismatch(ChecksumKind::Trailing))
        ));
    }

    #[test]
    fn response_netfn_stays_in_six_bits() {
        let mut request = IpmbHeader::request(0x06, 1, 0x38);
        assert_eq!(IpmbHeader::response_to(&request).netfn, 0x07);

        request.netfn = 0xFF;
        assert_eq!(IpmbHeader::response_to(&request).netfn, 0x00);
        request.netfn = 0x3F;
        assert_eq!(IpmbHeader::response_to(&request).netfn, 0x00);
    }

    #[test]
    fn unauthenticated_packet_layout() {
        let msg = encode_message(&IpmbHeader::request(0x06, 1, 0x38), &[0x0E, 0x04]);
        let packet = encode_packet(Authentication::None, 0, 0, &msg).expect("encode");
        assert_eq!(packet, CAPS_REQUEST);
    }

    #[test]
    fn md5_packet_reserves_and_fills_auth_slot() {
        let password = Password::new("secret").expect("password");
        let msg = encode_message(&IpmbHeader::request(0x06, 4, 0x3B), &[0x04]);
        let packet = encode_packet(
            Authentication::Md5 {
                password: &password,
                auth_sequence: 0x100,
            },
            0x0A0B_0C0D,
            0x100,
            &msg,
        )
        .expect("encode");

        assert_eq!(packet.len(), 4 + 26 + msg.len());
        assert_eq!(&packet[4..13], &[0x02, 0x00, 0x00, 0x01, 0x00, 0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(
            &packet[13..29],
            &[
                0xAD, 0x93, 0x1D, 0x11, 0x07, 0xCE, 0x9D, 0x27, 0x4F, 0x74, 0x77, 0x11, 0x9F, 0x85,
                0x40, 0x2D,
            ]
        );
        assert_eq!(packet[29], msg.len() as u8);
        assert_eq!(&packet[30..], &msg[..]);
    }

    #[test]
    fn decode_splits_layers() {
        let packet = decode_packet(&CAPS_RESPONSE).expect("decode");
        assert_eq!(packet.rmcp, RmcpHeader::default());
        assert_eq!(packet.session.auth_type, AuthType::None);
        assert_eq!(packet.session.payload_len, 16);
        assert_eq!(packet.ipmb.rs_addr, REMOTE_CONSOLE_ADDR);
        assert_eq!(packet.ipmb.netfn, 0x07);
        assert_eq!(packet.ipmb.rq_seq, 1);
        assert_eq!(packet.ipmb.command, 0x38);
        assert_eq!(
            packet.body(),
            &[0x00, 0x01, 0x14, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        packet.verify_checksums().expect("checksums");
        check_response_header(&packet.ipmb, 0x06, 0x38, 1).expect("matches request");
    }

    #[test]
    fn decode_detects_bad_checksums() {
        let mut bytes = CAPS_RESPONSE;
        bytes[16] ^= 0x01;
        let packet = decode_packet(&bytes).expect("decode");
        assert!(matches!(
            packet.verify_checksums(),
            Err(Error::ChecksumMismatch(ChecksumKind::Header))
        ));

        let mut bytes = CAPS_RESPONSE;
        bytes[22] ^= 0xFF;
        let packet = decode_packet(&bytes).expect("decode");
        assert!(matches!(
            packet.verify_checksums(),
            Err(Error::ChecksumMismatch(ChecksumKind::Trailing))
        ));
    }

    #[test]
    fn layer_truncation_reports_layer_size() {
        let err = RmcpHeader::decode(&mut &CAPS_RESPONSE[..3]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 4,
                available: 3
            }
        ));

        let err = SessionHeader::decode(&mut &CAPS_RESPONSE[4..12]).unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 10, .. }));

        let authed = [0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = SessionHeader::decode(&mut &authed[..]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 26,
                available: 12
            }
        ));

        let err = IpmbHeader::decode(&mut &CAPS_RESPONSE[14..20]).unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 7, .. }));
    }

    #[test]
    fn decode_rejects_short_message_and_foreign_rmcp() {
        let err = decode_packet(&CAPS_RESPONSE[..25]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 16,
                available: 11
            }
        ));

        let mut bytes = CAPS_RESPONSE;
        bytes[3] = 0x06;
        assert!(matches!(decode_packet(&bytes), Err(Error::Protocol(_))));
    }

    #[test]
    fn response_header_mismatches_are_rejected() {
        let request = IpmbHeader::request(0x06, 5, 0x3B);
        let response = IpmbHeader::response_to(&request);
        check_response_header(&response, 0x06, 0x3B, 5).expect("match");
        assert!(check_response_header(&response, 0x06, 0x3B, 6).is_err());
        assert!(check_response_header(&response, 0x06, 0x3A, 5).is_err());
        assert!(check_response_header(&response, 0x00, 0x3B, 5).is_err());
    }
}
