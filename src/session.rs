use core::fmt;
use std::collections::VecDeque;

use crate::crypto::Password;
use crate::types::ChassisControl;

/// Handshake position of a [`Client`](crate::Client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing sent yet.
    Initial,
    /// Waiting for `Get Channel Authentication Capabilities`.
    AwaitingAuthCapabilities,
    /// Waiting for `Get Session Challenge`.
    AwaitingSessionChallenge,
    /// Waiting for `Activate Session`.
    AwaitingActivateSession,
    /// Waiting for `Set Session Privilege Level`.
    AwaitingSetPrivilege,
    /// Session established, no command in flight.
    SessionReady,
    /// Waiting for `Chassis Control`.
    AwaitingChassisControlResponse,
}

impl SessionState {
    /// Stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::AwaitingAuthCapabilities => "awaiting_auth_capabilities",
            Self::AwaitingSessionChallenge => "awaiting_session_challenge",
            Self::AwaitingActivateSession => "awaiting_activate_session",
            Self::AwaitingSetPrivilege => "awaiting_set_privilege",
            Self::SessionReady => "session_ready",
            Self::AwaitingChassisControlResponse => "awaiting_chassis_control_response",
        }
    }

    /// Whether a response is outstanding in this state.
    pub fn is_awaiting(self) -> bool {
        !matches!(self, Self::Initial | Self::SessionReady)
    }

    /// Whether responses must come from the activated session under MD5.
    pub fn is_session_bound(self) -> bool {
        matches!(
            self,
            Self::AwaitingSetPrivilege | Self::AwaitingChassisControlResponse
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable per-session data owned by the client.
#[derive(Debug)]
pub(crate) struct SessionContext {
    pub(crate) state: SessionState,
    pub(crate) session_id: u32,
    pub(crate) password: Password,
    pub(crate) failures: u32,
    pub(crate) queue: VecDeque<ChassisControl>,
    pub(crate) last_in_seq: Option<u32>,
    next_out_seq: u32,
    rq_seq: u8,
}

impl SessionContext {
    pub(crate) fn new(password: Password) -> Self {
        Self {
            state: SessionState::Initial,
            session_id: 0,
            password,
            failures: 0,
            queue: VecDeque::new(),
            last_in_seq: None,
            next_out_seq: 0,
            rq_seq: 1,
        }
    }

    /// Adopt the sequence number the BMC assigned in Activate Session.
    pub(crate) fn set_out_seq(&mut self, seq: u32) {
        self.next_out_seq = seq;
    }

    pub(crate) fn allocate_out_seq(&mut self) -> u32 {
        let current = self.next_out_seq;
        self.next_out_seq = match self.next_out_seq.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        current
    }

    pub(crate) fn allocate_rq_seq(&mut self) -> u8 {
        // rq_seq is 6-bit. We keep a u8 and wrap at 64.
        let current = self.rq_seq;
        self.rq_seq = (self.rq_seq + 1) & 0x3F;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(Password::new("secret").expect("password"))
    }

    #[test]
    fn rq_seq_starts_at_one_and_wraps_at_64() {
        let mut ctx = context();
        assert_eq!(ctx.allocate_rq_seq(), 1);
        for _ in 2..64 {
            ctx.allocate_rq_seq();
        }
        assert_eq!(ctx.allocate_rq_seq(), 0);
        assert_eq!(ctx.allocate_rq_seq(), 1);
    }

    #[test]
    fn out_seq_skips_zero_on_wrap() {
        let mut ctx = context();
        ctx.set_out_seq(u32::MAX);
        assert_eq!(ctx.allocate_out_seq(), u32::MAX);
        assert_eq!(ctx.allocate_out_seq(), 1);
        assert_eq!(ctx.allocate_out_seq(), 2);
    }

    #[test]
    fn only_initial_and_ready_have_nothing_outstanding() {
        assert!(!SessionState::Initial.is_awaiting());
        assert!(!SessionState::SessionReady.is_awaiting());
        assert!(SessionState::AwaitingActivateSession.is_awaiting());
        assert_eq!(
            SessionState::AwaitingChassisControlResponse.to_string(),
            "awaiting_chassis_control_response"
        );
    }

    #[test]
    fn only_post_activation_states_are_session_bound() {
        assert!(SessionState::AwaitingSetPrivilege.is_session_bound());
        assert!(SessionState::AwaitingChassisControlResponse.is_session_bound());
        assert!(!SessionState::AwaitingActivateSession.is_session_bound());
        assert!(!SessionState::SessionReady.is_session_bound());
    }
}
