//! The session state machine.
//!
//! A [`Client`] never blocks and never receives on its own. A driver tells it
//! when the transport is up ([`Client::on_connected`]), hands it every inbound
//! datagram ([`Client::on_data`]) and reports expired deadlines
//! ([`Client::on_timeout`]). Every entry point answers with a [`Status`].

use core::fmt;
use std::time::{Duration, Instant};

use zeroize::Zeroizing;

use crate::commands::{
    ActivateSession, ChassisControlCommand, DEFAULT_USERNAME, GetChannelAuthCapabilities,
    GetSessionChallenge, Request, Response, SetSessionPrivilegeLevel, cmd,
};
use crate::crypto::{AUTH_FIELD_LEN, Password, pad_field, verify_auth_code};
use crate::error::{Error, Result};
use crate::protocol::{Authentication, check_response_header, decode_packet, encode_packet};
use crate::session::{SessionContext, SessionState};
use crate::transport::{EntropySource, SystemEntropy, Transport};
use crate::types::{AuthType, ChassisControl, PrivilegeLevel};

const DEFAULT_MAX_FAILURES: u32 = 3;
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_ENTROPY_DRAWS: usize = 8;

/// Outcome of feeding one event into a [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing was sent.
    Idle,
    /// A request for `command` went out.
    Sent {
        /// Command code of the request.
        command: u8,
    },
    /// The event was counted as a handshake failure.
    Failed {
        /// Consecutive failures so far.
        failures: u32,
    },
    /// The session is abandoned; no further requests will be sent.
    Abandoned,
}

/// How a request is authenticated on the wire.
#[derive(Debug, Clone, Copy)]
enum Outbound {
    /// Auth type none, session id and sequence zero.
    Unauthenticated,
    /// MD5 under the temporary session id, sequence term zero.
    Activation,
    /// MD5 under the session id with the next outbound sequence.
    Session,
}

#[derive(Debug)]
struct Outstanding {
    netfn: u8,
    command: u8,
    rq_seq: u8,
    packet: Vec<u8>,
    sent_at: Instant,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    username: Vec<u8>,
    password: Option<Zeroizing<Vec<u8>>>,
    privilege_level: PrivilegeLevel,
    max_failures: u32,
    response_timeout: Duration,
    entropy: Box<dyn EntropySource + Send>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &self.password.as_ref().map(|_| "<secret>"))
            .field("privilege_level", &self.privilege_level)
            .field("max_failures", &self.max_failures)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_vec(),
            password: None,
            privilege_level: PrivilegeLevel::Administrator,
            max_failures: DEFAULT_MAX_FAILURES,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            entropy: Box::new(SystemEntropy),
        }
    }

    /// Set the password (at most 16 bytes; shorter values are zero-padded).
    pub fn password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.password = Some(Zeroizing::new(password.as_ref().to_vec()));
        self
    }

    /// Set the username sent in Get Session Challenge. Defaults to `root`.
    pub fn username(mut self, username: impl AsRef<[u8]>) -> Self {
        self.username = username.as_ref().to_vec();
        self
    }

    /// Set the privilege level requested at activation and escalation.
    pub fn privilege_level(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_level = level;
        self
    }

    /// Consecutive failures tolerated before the session is abandoned.
    pub fn max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// How long a request may stay unanswered before it counts as a failure.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Source of the initial outbound sequence number.
    pub fn entropy(mut self, entropy: impl EntropySource + Send + 'static) -> Self {
        self.entropy = Box::new(entropy);
        self
    }

    /// Build the [`Client`] around `transport`. Nothing is sent yet.
    pub fn build<T: Transport>(self, transport: T) -> Result<Client<T>> {
        let password = self
            .password
            .ok_or(Error::InvalidArgument("password is required"))?;
        let password = Password::new(password.as_slice())?;
        let username = pad_field(&self.username, "username longer than 16 bytes")?;

        Ok(Client {
            transport,
            entropy: self.entropy,
            ctx: SessionContext::new(password),
            username,
            privilege_level: self.privilege_level,
            max_failures: self.max_failures.max(1),
            response_timeout: self.response_timeout,
            connected: false,
            abandoned: false,
            outstanding: None,
            last_error: None,
        })
    }
}

/// IPMI v1.5 LAN session client driving one MD5-authenticated session.
pub struct Client<T> {
    transport: T,
    entropy: Box<dyn EntropySource + Send>,
    ctx: SessionContext,
    username: [u8; AUTH_FIELD_LEN],
    privilege_level: PrivilegeLevel,
    max_failures: u32,
    response_timeout: Duration,
    connected: bool,
    abandoned: bool,
    outstanding: Option<Outstanding>,
    last_error: Option<Error>,
}

impl<T: fmt::Debug> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .field("state", &self.ctx.state)
            .field("session_id", &self.ctx.session_id)
            .field("failures", &self.ctx.failures)
            .field("pending", &self.ctx.queue.len())
            .field("abandoned", &self.abandoned)
            .finish_non_exhaustive()
    }
}

impl Client<()> {
    /// Create a [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Transport> Client<T> {
    /// The transport is up. Starts the handshake if it has not started yet.
    pub fn on_connected(&mut self) -> Status {
        if self.abandoned {
            return Status::Abandoned;
        }
        self.connected = true;
        if self.ctx.state == SessionState::Initial {
            self.start_handshake()
        } else {
            Status::Idle
        }
    }

    /// Queue a chassis control command.
    ///
    /// It is sent right away when the session is ready; from `Initial` on a
    /// connected transport the handshake starts. Otherwise it waits.
    pub fn submit(&mut self, control: ChassisControl) -> Status {
        if self.abandoned {
            return Status::Abandoned;
        }
        self.ctx.queue.push_back(control);
        match self.ctx.state {
            SessionState::Initial if self.connected => self.start_handshake(),
            SessionState::SessionReady => self.step(|client| client.dispatch_next()),
            _ => Status::Idle,
        }
    }

    /// Feed one inbound datagram.
    pub fn on_data(&mut self, datagram: &[u8]) -> Status {
        if self.abandoned {
            return Status::Abandoned;
        }
        crate::debug::dump_hex("ipmi lan recv", datagram);

        if !self.ctx.state.is_awaiting() {
            crate::observe::unsolicited(self.ctx.state, datagram.len());
            return Status::Idle;
        }

        self.step(|client| {
            let response = client.decode_response(datagram)?;
            client.ctx.failures = 0;
            client.advance(response)
        })
    }

    /// Count the outstanding request as failed if its deadline has passed.
    ///
    /// The deadline restarts at `now`; call [`Client::retransmit`] to resend.
    pub fn on_timeout(&mut self, now: Instant) -> Status {
        if self.abandoned {
            return Status::Abandoned;
        }
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                if let Some(outstanding) = self.outstanding.as_mut() {
                    outstanding.sent_at = now;
                }
                self.fail(Error::Timeout)
            }
            _ => Status::Idle,
        }
    }

    /// Resend the outstanding request verbatim.
    ///
    /// With nothing outstanding this restarts whatever was interrupted by a
    /// failed send: the handshake from `Initial`, or the next queued command
    /// once the session is ready.
    pub fn retransmit(&mut self) -> Status {
        if self.abandoned {
            return Status::Abandoned;
        }
        match self.ctx.state {
            SessionState::Initial if self.connected => self.start_handshake(),
            SessionState::Initial => Status::Idle,
            SessionState::SessionReady => self.step(|client| client.dispatch_next()),
            _ => self.step(|client| client.resend()),
        }
    }

    /// When the outstanding request times out, if any.
    pub fn deadline(&self) -> Option<Instant> {
        if self.abandoned || !self.ctx.state.is_awaiting() {
            return None;
        }
        self.outstanding
            .as_ref()
            .map(|outstanding| outstanding.sent_at + self.response_timeout)
    }

    fn start_handshake(&mut self) -> Status {
        self.step(|client| {
            let status = client.send(
                Request::GetChannelAuthCapabilities(GetChannelAuthCapabilities {
                    privilege: client.privilege_level,
                    ..Default::default()
                }),
                Outbound::Unauthenticated,
            )?;
            client.transition(SessionState::AwaitingAuthCapabilities);
            Ok(status)
        })
    }

    /// Run one fallible step, turning an error into a counted failure.
    fn step(&mut self, f: impl FnOnce(&mut Self) -> Result<Status>) -> Status {
        match f(self) {
            Ok(status) => status,
            Err(err) => self.fail(err),
        }
    }

    fn advance(&mut self, response: Response) -> Result<Status> {
        match (self.ctx.state, response) {
            (SessionState::AwaitingAuthCapabilities, Response::GetChannelAuthCapabilities(caps)) => {
                if !caps.has_md5() {
                    return Err(Error::UnsupportedAuthentication);
                }
                let status = self.send(
                    Request::GetSessionChallenge(GetSessionChallenge {
                        auth_type: AuthType::Md5,
                        username: self.username,
                    }),
                    Outbound::Unauthenticated,
                )?;
                self.transition(SessionState::AwaitingSessionChallenge);
                Ok(status)
            }
            (SessionState::AwaitingSessionChallenge, Response::GetSessionChallenge(challenge)) => {
                self.ctx.session_id = challenge.session_id;
                let initial_sequence = self.draw_initial_sequence()?;
                let status = self.send(
                    Request::ActivateSession(ActivateSession {
                        auth_type: AuthType::Md5,
                        privilege: self.privilege_level,
                        challenge: challenge.challenge,
                        initial_sequence,
                    }),
                    Outbound::Activation,
                )?;
                self.transition(SessionState::AwaitingActivateSession);
                Ok(status)
            }
            (SessionState::AwaitingActivateSession, Response::ActivateSession(activated)) => {
                self.ctx.session_id = activated.session_id;
                self.ctx.set_out_seq(activated.initial_sequence);
                let status = self.send(
                    Request::SetSessionPrivilegeLevel(SetSessionPrivilegeLevel {
                        privilege: self.privilege_level,
                    }),
                    Outbound::Session,
                )?;
                self.transition(SessionState::AwaitingSetPrivilege);
                Ok(status)
            }
            (SessionState::AwaitingSetPrivilege, Response::SetSessionPrivilegeLevel(_)) => {
                self.transition(SessionState::SessionReady);
                crate::observe::session_established(self.ctx.session_id);
                self.dispatch_next()
            }
            (SessionState::AwaitingChassisControlResponse, Response::ChassisControl(_)) => {
                crate::observe::command_completed(cmd::CHASSIS_CONTROL, self.ctx.session_id);
                self.transition(SessionState::SessionReady);
                self.dispatch_next()
            }
            _ => Err(Error::Protocol("response does not match session state")),
        }
    }

    fn dispatch_next(&mut self) -> Result<Status> {
        let Some(&control) = self.ctx.queue.front() else {
            return Ok(Status::Idle);
        };
        let status = self.send(
            Request::ChassisControl(ChassisControlCommand { control }),
            Outbound::Session,
        )?;
        self.ctx.queue.pop_front();
        self.transition(SessionState::AwaitingChassisControlResponse);
        Ok(status)
    }

    fn decode_response(&mut self, datagram: &[u8]) -> Result<Response> {
        let (netfn, command, rq_seq) = match self.outstanding.as_ref() {
            Some(outstanding) => (outstanding.netfn, outstanding.command, outstanding.rq_seq),
            None => return Err(Error::Protocol("no request outstanding")),
        };

        let packet = decode_packet(datagram)?;
        packet.verify_checksums()?;
        check_response_header(&packet.ipmb, netfn, command, rq_seq)?;

        if self.ctx.state.is_session_bound() {
            if packet.session.session_id != self.ctx.session_id {
                return Err(Error::Protocol("unexpected session id"));
            }
            if packet.session.auth_type != AuthType::Md5 {
                return Err(Error::Protocol("unauthenticated response in active session"));
            }
        }

        match (packet.session.auth_type, packet.session.auth_code) {
            (AuthType::None, _) => {}
            (AuthType::Md5, Some(code)) => {
                verify_auth_code(
                    &self.ctx.password,
                    packet.session.session_id,
                    &packet.message,
                    packet.session.sequence,
                    &code,
                )?;
                self.ctx.last_in_seq = Some(packet.session.sequence);
            }
            _ => return Err(Error::Protocol("unexpected session auth type")),
        }

        Response::decode(command, &mut packet.body())
    }

    fn send(&mut self, request: Request, outbound: Outbound) -> Result<Status> {
        let rq_seq = self.ctx.allocate_rq_seq();
        let message = request.to_message(rq_seq);
        let packet = match outbound {
            Outbound::Unauthenticated => encode_packet(Authentication::None, 0, 0, &message)?,
            Outbound::Activation => encode_packet(
                Authentication::Md5 {
                    password: &self.ctx.password,
                    auth_sequence: 0,
                },
                self.ctx.session_id,
                0,
                &message,
            )?,
            Outbound::Session => {
                let sequence = self.ctx.allocate_out_seq();
                encode_packet(
                    Authentication::Md5 {
                        password: &self.ctx.password,
                        auth_sequence: sequence,
                    },
                    self.ctx.session_id,
                    sequence,
                    &message,
                )?
            }
        };

        crate::debug::dump_hex("ipmi lan send", &packet);
        self.transport.send(&packet)?;

        let command = request.command();
        crate::observe::request_sent(
            self.ctx.state,
            request.netfn(),
            command,
            self.ctx.session_id,
        );
        self.outstanding = Some(Outstanding {
            netfn: request.netfn(),
            command,
            rq_seq,
            packet,
            sent_at: Instant::now(),
        });
        Ok(Status::Sent { command })
    }

    fn resend(&mut self) -> Result<Status> {
        let Some(outstanding) = self.outstanding.as_mut() else {
            return Ok(Status::Idle);
        };
        crate::debug::dump_hex("ipmi lan resend", &outstanding.packet);
        self.transport.send(&outstanding.packet)?;
        outstanding.sent_at = Instant::now();
        Ok(Status::Sent {
            command: outstanding.command,
        })
    }

    fn draw_initial_sequence(&mut self) -> Result<u32> {
        (0..MAX_ENTROPY_DRAWS)
            .map(|_| self.entropy.random_u32())
            .find(|&value| value != 0)
            .ok_or(Error::Protocol("entropy source keeps returning zero"))
    }
}

impl<T> Client<T> {
    fn transition(&mut self, to: SessionState) {
        let from = self.ctx.state;
        self.ctx.state = to;
        if !to.is_awaiting() {
            self.outstanding = None;
        }
        crate::observe::transition(from, to);
    }

    fn fail(&mut self, err: Error) -> Status {
        self.ctx.failures += 1;
        let state = self.ctx.state;
        let failures = self.ctx.failures;
        crate::observe::handshake_failure(state, failures, &err);

        let status = if err.is_fatal_at(state) || failures >= self.max_failures {
            self.abandoned = true;
            self.outstanding = None;
            crate::observe::session_abandoned(state, failures, &err);
            Status::Abandoned
        } else {
            Status::Failed { failures }
        };
        self.last_error = Some(err);
        status
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.ctx.state
    }

    /// Session id, once the BMC has assigned one.
    pub fn session_id(&self) -> u32 {
        self.ctx.session_id
    }

    /// Consecutive failures since the last accepted response.
    pub fn failures(&self) -> u32 {
        self.ctx.failures
    }

    /// The error behind the most recent counted failure.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Chassis control commands still waiting to be sent.
    pub fn pending(&self) -> usize {
        self.ctx.queue.len()
    }

    /// Sequence number of the last authenticated inbound packet.
    pub fn inbound_sequence(&self) -> Option<u32> {
        self.ctx.last_in_seq
    }

    /// Whether [`Client::on_connected`] has been called.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the session has been given up.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Session ready with nothing queued or in flight.
    pub fn is_idle(&self) -> bool {
        !self.abandoned && self.ctx.state == SessionState::SessionReady && self.ctx.queue.is_empty()
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drop the state machine and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
