use crate::error::Error;
use crate::session::SessionState;

pub(crate) fn request_sent(state: SessionState, netfn: u8, command: u8, session_id: u32) {
    let _ = (state, netfn, command, session_id);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!(
            "ipmi_requests_sent_total",
            "command" => crate::commands::command_name(command)
        )
        .increment(1);
    }

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(
            state = %state,
            netfn,
            command,
            session_id,
            "ipmi request sent"
        );
    }
}

pub(crate) fn transition(from: SessionState, to: SessionState) {
    let _ = (from, to);

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(from = %from, state = %to, "ipmi session state changed");
    }
}

pub(crate) fn session_established(session_id: u32) {
    let _ = session_id;

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_sessions_established_total").increment(1);
    }

    #[cfg(feature = "tracing")]
    {
        tracing::info!(session_id, "ipmi session established");
    }
}

pub(crate) fn command_completed(command: u8, session_id: u32) {
    let _ = (command, session_id);

    #[cfg(feature = "tracing")]
    {
        tracing::info!(command, session_id, completion_code = 0u8, "ipmi command completed");
    }
}

pub(crate) fn handshake_failure(state: SessionState, failures: u32, err: &Error) {
    let _ = (state, failures, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_handshake_failures_total", "kind" => err.kind()).increment(1);
    }

    #[cfg(feature = "tracing")]
    {
        match err {
            Error::CompletionCode {
                command,
                completion_code,
            } => tracing::warn!(
                state = %state,
                failures,
                command,
                completion_code,
                "ipmi command rejected"
            ),
            _ => tracing::warn!(
                state = %state,
                failures,
                kind = err.kind(),
                error = %err,
                "ipmi response failed validation"
            ),
        }
    }
}

pub(crate) fn session_abandoned(state: SessionState, failures: u32, err: &Error) {
    let _ = (state, failures, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_sessions_abandoned_total").increment(1);
    }

    #[cfg(feature = "tracing")]
    {
        tracing::error!(state = %state, failures, error = %err, "ipmi session abandoned");
    }
}

pub(crate) fn unsolicited(state: SessionState, len: usize) {
    let _ = (state, len);

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(state = %state, len, "dropping unsolicited datagram");
    }
}
