use ipmi_lan::commands::{
    ActivatedSession, ChannelAuthCapabilities, ChassisControlAck, ChassisControlCommand, Command,
    GetChannelAuthCapabilities, GetSessionChallenge, PrivilegeGranted, Request, Response,
    SessionChallenge, SetSessionPrivilegeLevel, cmd, command_name, netfn,
};
use ipmi_lan::protocol::Wire;
use ipmi_lan::{AuthType, ChassisControl, Error, PrivilegeLevel};

#[test]
fn command_codes_and_netfns() {
    assert_eq!(GetChannelAuthCapabilities::CMD, 0x38);
    assert_eq!(GetSessionChallenge::CMD, 0x39);
    assert_eq!(SetSessionPrivilegeLevel::CMD, 0x3B);
    assert_eq!(ChassisControlCommand::CMD, 0x02);
    assert_eq!(ChassisControlCommand::NETFN, netfn::CHASSIS);
    assert_eq!(GetSessionChallenge::NETFN, netfn::APP);
    assert_eq!(command_name(cmd::ACTIVATE_SESSION), "activate_session");
    assert_eq!(command_name(0x01), "unknown");
}

#[test]
fn channel_auth_capabilities_request_defaults() {
    let request = GetChannelAuthCapabilities::default();
    assert_eq!(request.to_bytes(), vec![0x0E, 0x04]);
}

#[test]
fn chassis_control_request_encoding() {
    let cases = [
        (ChassisControl::PowerDown, 0x00),
        (ChassisControl::PowerUp, 0x01),
        (ChassisControl::PowerCycle, 0x02),
        (ChassisControl::HardReset, 0x03),
        (ChassisControl::PulseDiagnosticInterrupt, 0x04),
        (ChassisControl::SoftShutdown, 0x05),
    ];
    for (control, byte) in cases {
        assert_eq!(ChassisControlCommand { control }.to_bytes(), vec![byte]);
    }
}

#[test]
fn session_challenge_response_parses() {
    let mut data = vec![0x00, 0xDE, 0xAD, 0xBE, 0xEF];
    data.extend(0x10..0x20u8);

    let challenge = SessionChallenge::decode(&mut &data[..]).expect("parse");
    assert_eq!(challenge.session_id, 0xDEAD_BEEF);
    assert_eq!(challenge.challenge[0], 0x10);
    assert_eq!(challenge.challenge[15], 0x1F);
}

#[test]
fn responses_dispatch_on_command_code() {
    let body = [0x00, 0x04];
    let response = Response::decode(cmd::SET_SESSION_PRIVILEGE_LEVEL, &mut &body[..]).expect("parse");
    assert_eq!(
        response,
        Response::SetSessionPrivilegeLevel(PrivilegeGranted {
            privilege: PrivilegeLevel::Administrator
        })
    );
    assert_eq!(response.command(), 0x3B);

    let response = Response::decode(cmd::CHASSIS_CONTROL, &mut &[0x00][..]).expect("parse");
    assert_eq!(response, Response::ChassisControl(ChassisControlAck));
}

#[test]
fn completion_code_is_reported() {
    let err = Response::decode(cmd::ACTIVATE_SESSION, &mut &[0x86, 0x00][..])
        .expect_err("expected error");
    assert!(matches!(
        err,
        Error::CompletionCode {
            command: 0x3A,
            completion_code: 0x86
        }
    ));

    let err = ChassisControlAck::decode(&mut &[0xC0][..]).expect_err("expected error");
    assert!(matches!(
        err,
        Error::CompletionCode {
            command: 0x02,
            completion_code: 0xC0
        }
    ));
}

#[test]
fn invalid_field_values_are_protocol_errors() {
    let err = ChassisControlCommand::decode(&mut &[0x09][..]).expect_err("expected error");
    assert!(matches!(err, Error::Protocol(_)));

    let activated = [0x00, 0x02, 0, 0, 0, 1, 0, 0, 0, 1, 0x00];
    let err = ActivatedSession::decode(&mut &activated[..]).expect_err("expected error");
    assert!(matches!(err, Error::Protocol(_)));
}

#[test]
fn requests_decode_by_command_code() {
    let request = Request::GetSessionChallenge(GetSessionChallenge::md5(b"admin").expect("user"));
    let mut body = Vec::new();
    request.encode(&mut body);

    let decoded = Request::decode(request.command(), &mut &body[..]).expect("decode");
    assert_eq!(decoded, request);
    match decoded {
        Request::GetSessionChallenge(challenge) => {
            assert_eq!(challenge.auth_type, AuthType::Md5);
            assert_eq!(&challenge.username[..5], b"admin");
        }
        other => panic!("unexpected request {other:?}"),
    }
}

#[test]
fn capabilities_flags() {
    let caps = ChannelAuthCapabilities {
        channel: 1,
        auth_type_support: 0x04,
        auth_status: 0x19,
        reserved: 0,
        oem_id: [0; 3],
        oem_aux: 0,
    };
    assert!(caps.has_md5());
    assert!(caps.per_message_auth_disabled());
    assert!(caps.user_level_auth_disabled());
    assert!(caps.anonymous_login_enabled());
}
