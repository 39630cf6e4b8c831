use core::fmt;

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Length of IPMI v1.5 passwords, usernames and MD5 auth codes.
pub const AUTH_FIELD_LEN: usize = 16;

/// A fixed-width IPMI v1.5 password that zeroizes its contents on drop.
///
/// Shorter secrets are right-padded with zero bytes. Secrets longer than
/// 16 bytes are rejected rather than truncated.
#[derive(Clone)]
pub struct Password([u8; AUTH_FIELD_LEN]);

impl Password {
    /// Build a password from raw bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self(pad_field(secret.as_ref(), "password longer than 16 bytes")?))
    }

    pub(crate) fn expose(&self) -> &[u8; AUTH_FIELD_LEN] {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Copy `value` into a zero-padded 16-byte field.
pub(crate) fn pad_field(value: &[u8], too_long: &'static str) -> Result<[u8; AUTH_FIELD_LEN]> {
    if value.len() > AUTH_FIELD_LEN {
        return Err(Error::InvalidArgument(too_long));
    }
    let mut out = [0u8; AUTH_FIELD_LEN];
    out[..value.len()].copy_from_slice(value);
    Ok(out)
}

/// Compute the MD5 session auth code.
///
/// The digest covers `password | session_id | message | sequence | password`,
/// where `message` is the IPMB message from the responder address through the
/// trailing checksum. Integers use the same big-endian layout as the wire.
pub fn compute_auth_code(
    password: &Password,
    session_id: u32,
    message: &[u8],
    sequence: u32,
) -> [u8; AUTH_FIELD_LEN] {
    let mut hasher = Md5::new();
    hasher.update(password.expose());
    hasher.update(session_id.to_be_bytes());
    hasher.update(message);
    hasher.update(sequence.to_be_bytes());
    hasher.update(password.expose());
    let digest = hasher.finalize();

    let mut out = [0u8; AUTH_FIELD_LEN];
    out.copy_from_slice(&digest[..]);
    out
}

/// Check an inbound auth code in constant time.
pub fn verify_auth_code(
    password: &Password,
    session_id: u32,
    message: &[u8],
    sequence: u32,
    received: &[u8; AUTH_FIELD_LEN],
) -> Result<()> {
    let expected = compute_auth_code(password, session_id, message, sequence);
    if ct_eq(&expected, received) {
        Ok(())
    } else {
        Err(Error::AuthCodeMismatch)
    }
}

pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
