//! Request and response payloads for the commands a LAN session needs.
//!
//! Every payload has a fixed layout. Response layouts start with the
//! completion code; decoding a response with a non-zero completion code stops
//! there and yields [`Error::CompletionCode`].

use crate::crypto::{AUTH_FIELD_LEN, pad_field};
use crate::error::{Error, Result};
use crate::protocol::{IpmbHeader, Wire, encode_message, ensure, take, take_u8, take_u32};
use crate::types::{AuthType, ChassisControl, PrivilegeLevel};

/// Network function codes (request side; responses use `netfn + 1`).
pub mod netfn {
    /// Chassis request.
    pub const CHASSIS: u8 = 0x00;
    /// Application request.
    pub const APP: u8 = 0x06;
}

/// Command codes.
pub mod cmd {
    /// Chassis Control (Chassis netFn).
    pub const CHASSIS_CONTROL: u8 = 0x02;
    /// Get Channel Authentication Capabilities.
    pub const GET_CHANNEL_AUTH_CAPABILITIES: u8 = 0x38;
    /// Get Session Challenge.
    pub const GET_SESSION_CHALLENGE: u8 = 0x39;
    /// Activate Session.
    pub const ACTIVATE_SESSION: u8 = 0x3A;
    /// Set Session Privilege Level.
    pub const SET_SESSION_PRIVILEGE_LEVEL: u8 = 0x3B;
}

/// Short name of a command code, for logs and metric labels.
pub fn command_name(command: u8) -> &'static str {
    match command {
        cmd::CHASSIS_CONTROL => "chassis_control",
        cmd::GET_CHANNEL_AUTH_CAPABILITIES => "get_channel_auth_capabilities",
        cmd::GET_SESSION_CHALLENGE => "get_session_challenge",
        cmd::ACTIVATE_SESSION => "activate_session",
        cmd::SET_SESSION_PRIVILEGE_LEVEL => "set_session_privilege_level",
        _ => "unknown",
    }
}

/// Channel selector meaning "the channel this request arrived on".
pub const CURRENT_CHANNEL: u8 = 0x0E;

/// Username used when none is configured.
pub const DEFAULT_USERNAME: &[u8] = b"root";

/// A typed IPMI request with its matching response payload.
pub trait Command: Wire {
    /// Response payload type.
    type Response: Wire;

    /// Network Function (NetFn) for the request.
    const NETFN: u8;

    /// Command number.
    const CMD: u8;
}

/// Consume the completion code, failing on non-zero or on a short payload.
fn decode_completion(buf: &mut &[u8], command: u8, len: usize) -> Result<()> {
    let completion_code = *buf.first().ok_or(Error::Truncated {
        needed: len,
        available: 0,
    })?;
    if completion_code != 0x00 {
        return Err(Error::CompletionCode {
            command,
            completion_code,
        });
    }
    ensure(buf, len)?;
    *buf = &buf[1..];
    Ok(())
}

fn decode_privilege(byte: u8) -> Result<PrivilegeLevel> {
    PrivilegeLevel::from_u8(byte).ok_or(Error::Protocol("invalid privilege level"))
}

fn decode_auth_type(byte: u8) -> Result<AuthType> {
    AuthType::from_u8(byte & 0x0F).ok_or(Error::Protocol("invalid auth type"))
}

/// `Get Channel Authentication Capabilities` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetChannelAuthCapabilities {
    /// Channel number, or [`CURRENT_CHANNEL`].
    pub channel: u8,
    /// Privilege level to report capabilities for.
    pub privilege: PrivilegeLevel,
}

impl Default for GetChannelAuthCapabilities {
    fn default() -> Self {
        Self {
            channel: CURRENT_CHANNEL,
            privilege: PrivilegeLevel::Administrator,
        }
    }
}

impl Wire for GetChannelAuthCapabilities {
    fn encoded_len(&self) -> usize {
        2
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.channel);
        out.push(self.privilege.as_u8());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let [channel, privilege] = take::<2>(buf)?;
        Ok(Self {
            channel,
            privilege: decode_privilege(privilege)?,
        })
    }
}

impl Command for GetChannelAuthCapabilities {
    type Response = ChannelAuthCapabilities;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = cmd::GET_CHANNEL_AUTH_CAPABILITIES;
}

/// Parsed response for `Get Channel Authentication Capabilities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAuthCapabilities {
    /// Channel number.
    pub channel: u8,
    /// Supported authentication types (bitmask, first auth-type byte).
    pub auth_type_support: u8,
    /// Login status flags (second auth-type byte).
    pub auth_status: u8,
    /// Reserved byte.
    pub reserved: u8,
    /// OEM IANA enterprise number bytes.
    pub oem_id: [u8; 3],
    /// OEM auxiliary data.
    pub oem_aux: u8,
}

impl ChannelAuthCapabilities {
    const LEN: usize = 9;

    /// MD5 authentication is supported (bit 2 of the first auth-type byte).
    pub fn has_md5(&self) -> bool {
        self.auth_type_support & 0x04 != 0
    }

    /// Auth type none is supported.
    pub fn has_none(&self) -> bool {
        self.auth_type_support & 0x01 != 0
    }

    /// MD2 authentication is supported.
    pub fn has_md2(&self) -> bool {
        self.auth_type_support & 0x02 != 0
    }

    /// Straight password authentication is supported.
    pub fn has_password(&self) -> bool {
        self.auth_type_support & 0x10 != 0
    }

    /// Per-message authentication is disabled.
    pub fn per_message_auth_disabled(&self) -> bool {
        self.auth_status & 0x10 != 0
    }

    /// User-level authentication is disabled.
    pub fn user_level_auth_disabled(&self) -> bool {
        self.auth_status & 0x08 != 0
    }

    /// Anonymous login (null user/null password) is enabled.
    pub fn anonymous_login_enabled(&self) -> bool {
        self.auth_status & 0x01 != 0
    }
}

impl Wire for ChannelAuthCapabilities {
    fn encoded_len(&self) -> usize {
        Self::LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x00);
        out.push(self.channel);
        out.push(self.auth_type_support);
        out.push(self.auth_status);
        out.push(self.reserved);
        out.extend_from_slice(&self.oem_id);
        out.push(self.oem_aux);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        decode_completion(buf, cmd::GET_CHANNEL_AUTH_CAPABILITIES, Self::LEN)?;
        let [channel, auth_type_support, auth_status, reserved] = take::<4>(buf)?;
        let oem_id = take::<3>(buf)?;
        let oem_aux = take_u8(buf)?;
        Ok(Self {
            channel,
            auth_type_support,
            auth_status,
            reserved,
            oem_id,
            oem_aux,
        })
    }
}

/// `Get Session Challenge` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSessionChallenge {
    /// Requested authentication type.
    pub auth_type: AuthType,
    /// Zero-padded username.
    pub username: [u8; AUTH_FIELD_LEN],
}

impl GetSessionChallenge {
    /// MD5 challenge request for `username` (at most 16 bytes).
    pub fn md5(username: &[u8]) -> Result<Self> {
        Ok(Self {
            auth_type: AuthType::Md5,
            username: pad_field(username, "username longer than 16 bytes")?,
        })
    }
}

impl Wire for GetSessionChallenge {
    fn encoded_len(&self) -> usize {
        1 + AUTH_FIELD_LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.auth_type.as_u8());
        out.extend_from_slice(&self.username);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        ensure(buf, 1 + AUTH_FIELD_LEN)?;
        let auth_type = decode_auth_type(take_u8(buf)?)?;
        let username = take::<AUTH_FIELD_LEN>(buf)?;
        Ok(Self {
            auth_type,
            username,
        })
    }
}

impl Command for GetSessionChallenge {
    type Response = SessionChallenge;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = cmd::GET_SESSION_CHALLENGE;
}

/// Parsed response for `Get Session Challenge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChallenge {
    /// Temporary session id.
    pub session_id: u32,
    /// Challenge string to echo in Activate Session.
    pub challenge: [u8; 16],
}

impl SessionChallenge {
    const LEN: usize = 1 + 4 + 16;
}

impl Wire for SessionChallenge {
    fn encoded_len(&self) -> usize {
        Self::LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x00);
        out.extend_from_slice(&self.session_id.to_be_bytes());
        out.extend_from_slice(&self.challenge);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        decode_completion(buf, cmd::GET_SESSION_CHALLENGE, Self::LEN)?;
        let session_id = take_u32(buf)?;
        let challenge = take::<16>(buf)?;
        Ok(Self {
            session_id,
            challenge,
        })
    }
}

/// `Activate Session` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateSession {
    /// Session authentication type.
    pub auth_type: AuthType,
    /// Maximum privilege level requested for the session.
    pub privilege: PrivilegeLevel,
    /// Challenge string from `Get Session Challenge`, verbatim.
    pub challenge: [u8; 16],
    /// Initial sequence number the BMC should use for its outbound packets.
    pub initial_sequence: u32,
}

impl Wire for ActivateSession {
    fn encoded_len(&self) -> usize {
        1 + 1 + 16 + 4
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.auth_type.as_u8());
        out.push(self.privilege.as_u8());
        out.extend_from_slice(&self.challenge);
        out.extend_from_slice(&self.initial_sequence.to_be_bytes());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        ensure(buf, 22)?;
        let [auth_type, privilege] = take::<2>(buf)?;
        let challenge = take::<16>(buf)?;
        let initial_sequence = take_u32(buf)?;
        Ok(Self {
            auth_type: decode_auth_type(auth_type)?,
            privilege: decode_privilege(privilege)?,
            challenge,
            initial_sequence,
        })
    }
}

impl Command for ActivateSession {
    type Response = ActivatedSession;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = cmd::ACTIVATE_SESSION;
}

/// Parsed response for `Activate Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivatedSession {
    /// Authentication type for the rest of the session.
    pub auth_type: AuthType,
    /// Session id.
    pub session_id: u32,
    /// Sequence number the console must use for its next outbound packet.
    pub initial_sequence: u32,
    /// Maximum privilege level granted.
    pub max_privilege: PrivilegeLevel,
}

impl ActivatedSession {
    const LEN: usize = 1 + 1 + 4 + 4 + 1;
}

impl Wire for ActivatedSession {
    fn encoded_len(&self) -> usize {
        Self::LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x00);
        out.push(self.auth_type.as_u8());
        out.extend_from_slice(&self.session_id.to_be_bytes());
        out.extend_from_slice(&self.initial_sequence.to_be_bytes());
        out.push(self.max_privilege.as_u8());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        decode_completion(buf, cmd::ACTIVATE_SESSION, Self::LEN)?;
        let auth_type = decode_auth_type(take_u8(buf)?)?;
        let session_id = take_u32(buf)?;
        let initial_sequence = take_u32(buf)?;
        let max_privilege = decode_privilege(take_u8(buf)?)?;
        Ok(Self {
            auth_type,
            session_id,
            initial_sequence,
            max_privilege,
        })
    }
}

/// `Set Session Privilege Level` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSessionPrivilegeLevel {
    /// Requested privilege level.
    pub privilege: PrivilegeLevel,
}

impl Wire for SetSessionPrivilegeLevel {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.privilege.as_u8());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            privilege: decode_privilege(take_u8(buf)?)?,
        })
    }
}

impl Command for SetSessionPrivilegeLevel {
    type Response = PrivilegeGranted;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = cmd::SET_SESSION_PRIVILEGE_LEVEL;
}

/// Parsed response for `Set Session Privilege Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegeGranted {
    /// Privilege level now in effect.
    pub privilege: PrivilegeLevel,
}

impl Wire for PrivilegeGranted {
    fn encoded_len(&self) -> usize {
        2
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x00);
        out.push(self.privilege.as_u8());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        decode_completion(buf, cmd::SET_SESSION_PRIVILEGE_LEVEL, 2)?;
        Ok(Self {
            privilege: decode_privilege(take_u8(buf)?)?,
        })
    }
}

/// `Chassis Control` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisControlCommand {
    /// Control operation.
    pub control: ChassisControl,
}

impl Wire for ChassisControlCommand {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.control.as_u8());
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let control = ChassisControl::from_u8(take_u8(buf)?)
            .ok_or(Error::Protocol("invalid chassis control"))?;
        Ok(Self { control })
    }
}

impl Command for ChassisControlCommand {
    type Response = ChassisControlAck;
    const NETFN: u8 = netfn::CHASSIS;
    const CMD: u8 = cmd::CHASSIS_CONTROL;
}

/// Response for `Chassis Control`; carries only the completion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisControlAck;

impl Wire for ChassisControlAck {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x00);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        decode_completion(buf, cmd::CHASSIS_CONTROL, 1)?;
        Ok(Self)
    }
}

/// Any request this client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Get Channel Authentication Capabilities.
    GetChannelAuthCapabilities(GetChannelAuthCapabilities),
    /// Get Session Challenge.
    GetSessionChallenge(GetSessionChallenge),
    /// Activate Session.
    ActivateSession(ActivateSession),
    /// Set Session Privilege Level.
    SetSessionPrivilegeLevel(SetSessionPrivilegeLevel),
    /// Chassis Control.
    ChassisControl(ChassisControlCommand),
}

impl Request {
    /// Network function of the request.
    pub fn netfn(&self) -> u8 {
        match self {
            Self::GetChannelAuthCapabilities(_) => GetChannelAuthCapabilities::NETFN,
            Self::GetSessionChallenge(_) => GetSessionChallenge::NETFN,
            Self::ActivateSession(_) => ActivateSession::NETFN,
            Self::SetSessionPrivilegeLevel(_) => SetSessionPrivilegeLevel::NETFN,
            Self::ChassisControl(_) => ChassisControlCommand::NETFN,
        }
    }

    /// Command code of the request.
    pub fn command(&self) -> u8 {
        match self {
            Self::GetChannelAuthCapabilities(_) => GetChannelAuthCapabilities::CMD,
            Self::GetSessionChallenge(_) => GetSessionChallenge::CMD,
            Self::ActivateSession(_) => ActivateSession::CMD,
            Self::SetSessionPrivilegeLevel(_) => SetSessionPrivilegeLevel::CMD,
            Self::ChassisControl(_) => ChassisControlCommand::CMD,
        }
    }

    /// Encoded payload length.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::GetChannelAuthCapabilities(r) => r.encoded_len(),
            Self::GetSessionChallenge(r) => r.encoded_len(),
            Self::ActivateSession(r) => r.encoded_len(),
            Self::SetSessionPrivilegeLevel(r) => r.encoded_len(),
            Self::ChassisControl(r) => r.encoded_len(),
        }
    }

    /// Append the payload bytes.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::GetChannelAuthCapabilities(r) => r.encode(out),
            Self::GetSessionChallenge(r) => r.encode(out),
            Self::ActivateSession(r) => r.encode(out),
            Self::SetSessionPrivilegeLevel(r) => r.encode(out),
            Self::ChassisControl(r) => r.encode(out),
        }
    }

    /// Decode the payload of the request identified by `command`.
    pub fn decode(command: u8, buf: &mut &[u8]) -> Result<Self> {
        match command {
            cmd::GET_CHANNEL_AUTH_CAPABILITIES => {
                GetChannelAuthCapabilities::decode(buf).map(Self::GetChannelAuthCapabilities)
            }
            cmd::GET_SESSION_CHALLENGE => {
                GetSessionChallenge::decode(buf).map(Self::GetSessionChallenge)
            }
            cmd::ACTIVATE_SESSION => ActivateSession::decode(buf).map(Self::ActivateSession),
            cmd::SET_SESSION_PRIVILEGE_LEVEL => {
                SetSessionPrivilegeLevel::decode(buf).map(Self::SetSessionPrivilegeLevel)
            }
            cmd::CHASSIS_CONTROL => ChassisControlCommand::decode(buf).map(Self::ChassisControl),
            _ => Err(Error::Unsupported("unknown command")),
        }
    }

    /// Build the full IPMB message (header, payload, trailing checksum).
    pub fn to_message(&self, rq_seq: u8) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.encoded_len());
        self.encode(&mut payload);
        encode_message(
            &IpmbHeader::request(self.netfn(), rq_seq, self.command()),
            &payload,
        )
    }
}

/// Any response this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Get Channel Authentication Capabilities.
    GetChannelAuthCapabilities(ChannelAuthCapabilities),
    /// Get Session Challenge.
    GetSessionChallenge(SessionChallenge),
    /// Activate Session.
    ActivateSession(ActivatedSession),
    /// Set Session Privilege Level.
    SetSessionPrivilegeLevel(PrivilegeGranted),
    /// Chassis Control.
    ChassisControl(ChassisControlAck),
}

impl Response {
    /// Command code of the response.
    pub fn command(&self) -> u8 {
        match self {
            Self::GetChannelAuthCapabilities(_) => cmd::GET_CHANNEL_AUTH_CAPABILITIES,
            Self::GetSessionChallenge(_) => cmd::GET_SESSION_CHALLENGE,
            Self::ActivateSession(_) => cmd::ACTIVATE_SESSION,
            Self::SetSessionPrivilegeLevel(_) => cmd::SET_SESSION_PRIVILEGE_LEVEL,
            Self::ChassisControl(_) => cmd::CHASSIS_CONTROL,
        }
    }

    /// Encoded payload length, completion code included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::GetChannelAuthCapabilities(r) => r.encoded_len(),
            Self::GetSessionChallenge(r) => r.encoded_len(),
            Self::ActivateSession(r) => r.encoded_len(),
            Self::SetSessionPrivilegeLevel(r) => r.encoded_len(),
            Self::ChassisControl(r) => r.encoded_len(),
        }
    }

    /// Append the payload bytes with a zero completion code.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::GetChannelAuthCapabilities(r) => r.encode(out),
            Self::GetSessionChallenge(r) => r.encode(out),
            Self::ActivateSession(r) => r.encode(out),
            Self::SetSessionPrivilegeLevel(r) => r.encode(out),
            Self::ChassisControl(r) => r.encode(out),
        }
    }

    /// Decode the payload of the response to `command`.
    pub fn decode(command: u8, buf: &mut &[u8]) -> Result<Self> {
        match command {
            cmd::GET_CHANNEL_AUTH_CAPABILITIES => {
                ChannelAuthCapabilities::decode(buf).map(Self::GetChannelAuthCapabilities)
            }
            cmd::GET_SESSION_CHALLENGE => {
                SessionChallenge::decode(buf).map(Self::GetSessionChallenge)
            }
            cmd::ACTIVATE_SESSION => ActivatedSession::decode(buf).map(Self::ActivateSession),
            cmd::SET_SESSION_PRIVILEGE_LEVEL => {
                PrivilegeGranted::decode(buf).map(Self::SetSessionPrivilegeLevel)
            }
            cmd::CHASSIS_CONTROL => ChassisControlAck::decode(buf).map(Self::ChassisControl),
            _ => Err(Error::Unsupported("unknown command")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_lengths_match_layouts() {
        let requests = [
            (Request::GetChannelAuthCapabilities(Default::default()), 2),
            (
                Request::GetSessionChallenge(GetSessionChallenge::md5(b"root").expect("user")),
                17,
            ),
            (
                Request::ActivateSession(ActivateSession {
                    auth_type: AuthType::Md5,
                    privilege: PrivilegeLevel::Administrator,
                    challenge: [0xAA; 16],
                    initial_sequence: 1,
                }),
                22,
            ),
            (
                Request::SetSessionPrivilegeLevel(SetSessionPrivilegeLevel {
                    privilege: PrivilegeLevel::Administrator,
                }),
                1,
            ),
            (
                Request::ChassisControl(ChassisControlCommand {
                    control: ChassisControl::PowerCycle,
                }),
                1,
            ),
        ];

        for (request, len) in requests {
            let mut out = Vec::new();
            request.encode(&mut out);
            assert_eq!(out.len(), len);
            assert_eq!(request.encoded_len(), len);
        }
    }

    #[test]
    fn chassis_control_is_the_only_chassis_netfn_command() {
        let chassis = Request::ChassisControl(ChassisControlCommand {
            control: ChassisControl::PowerUp,
        });
        assert_eq!(chassis.netfn(), netfn::CHASSIS);
        assert_eq!(chassis.command(), 0x02);
        assert_eq!(
            Request::GetChannelAuthCapabilities(Default::default()).netfn(),
            netfn::APP
        );
    }

    #[test]
    fn session_challenge_request_pads_username() {
        let request = GetSessionChallenge::md5(b"root").expect("user");
        assert_eq!(
            request.to_bytes(),
            vec![
                0x02, b'r', b'o', b'o', b't', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0
            ]
        );
        assert!(matches!(
            GetSessionChallenge::md5(&[b'a'; 17]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn activate_session_request_layout() {
        let mut challenge = [0u8; 16];
        for (i, b) in challenge.iter_mut().enumerate() {
            *b = 0x10 + i as u8;
        }
        let request = ActivateSession {
            auth_type: AuthType::Md5,
            privilege: PrivilegeLevel::Administrator,
            challenge,
            initial_sequence: 0xA1B2_C3D4,
        };
        let bytes = request.to_bytes();
        assert_eq!(&bytes[..2], &[0x02, 0x04]);
        assert_eq!(&bytes[2..18], &challenge);
        assert_eq!(&bytes[18..], &[0xA1, 0xB2, 0xC3, 0xD4]);
    }

    #[test]
    fn parse_channel_auth_capabilities_md5_bit() {
        let data = [0x00, 0x01, 0x14, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
        let caps = ChannelAuthCapabilities::decode(&mut &data[..]).expect("parse");
        assert_eq!(caps.channel, 0x01);
        assert!(caps.has_md5());
        assert!(caps.has_password());
        assert!(!caps.has_md2());
        assert!(!caps.has_none());

        let data = [0x00, 0x01, 0x11, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
        let caps = ChannelAuthCapabilities::decode(&mut &data[..]).expect("parse");
        assert!(!caps.has_md5());
        assert!(caps.has_none());
    }

    #[test]
    fn parse_activated_session() {
        let data = [
            0x00, 0x02, 0x0A, 0x0B, 0x0C, 0x0D, 0x00, 0x00, 0x01, 0x00, 0x04,
        ];
        let mut buf = &data[..];
        let session = ActivatedSession::decode(&mut buf).expect("parse");
        assert!(buf.is_empty());
        assert_eq!(session.auth_type, AuthType::Md5);
        assert_eq!(session.session_id, 0x0A0B_0C0D);
        assert_eq!(session.initial_sequence, 0x100);
        assert_eq!(session.max_privilege, PrivilegeLevel::Administrator);
    }

    #[test]
    fn completion_code_is_reported_before_length() {
        let err = Response::decode(cmd::GET_SESSION_CHALLENGE, &mut &[0xC1][..]).unwrap_err();
        assert!(matches!(
            err,
            Error::CompletionCode {
                command: 0x39,
                completion_code: 0xC1
            }
        ));
    }

    #[test]
    fn short_response_is_truncated() {
        let err = Response::decode(cmd::GET_SESSION_CHALLENGE, &mut &[0x00, 0x01, 0x02][..])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 21,
                available: 3
            }
        ));

        let err = Response::decode(cmd::CHASSIS_CONTROL, &mut &[][..]).unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 1, .. }));
    }

    #[test]
    fn unknown_command_code_is_unsupported() {
        assert!(matches!(
            Response::decode(0x01, &mut &[0x00][..]),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn request_message_matches_capture() {
        let request = Request::GetChannelAuthCapabilities(Default::default());
        assert_eq!(
            request.to_message(1),
            vec![0x20, 0x18, 0xC8, 0x81, 0x04, 0x38, 0x0E, 0x04, 0x31]
        );
    }
}
