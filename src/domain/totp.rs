//! Time-based one-time-password generation (RFC 6238).
//!
//! The vault's second factor is a standard 6-digit TOTP over a base32 shared
//! secret, SHA-1 HMAC, 30-second step.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Code validity window in seconds.
pub const STEP_SECONDS: u64 = 30;

const CODE_DIGITS: u32 = 6;

/// One-time-password generation error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("shared secret is not valid base32")]
    InvalidSecret,
}

/// Compute the code for the current 30-second step.
pub fn code(secret_base32: &str) -> Result<String, TotpError> {
    code_at(secret_base32, SystemTime::now())
}

/// Compute the code for the step containing `at`.
pub fn code_at(secret_base32: &str, at: SystemTime) -> Result<String, TotpError> {
    let key = decode_base32(secret_base32)?;
    let step = at
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
        / STEP_SECONDS;

    let mut mac = HmacSha1::new_from_slice(&key).map_err(|_| TotpError::InvalidSecret)?;
    mac.update(&step.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    let code = binary % 10u32.pow(CODE_DIGITS);
    Ok(format!("{code:0width$}", width = CODE_DIGITS as usize))
}

/// Decode an RFC 4648 base32 secret. Case-insensitive, tolerates padding and
/// spaces as issuers commonly format secrets in groups of four.
fn decode_base32(secret: &str) -> Result<Vec<u8>, TotpError> {
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(secret.len() * 5 / 8);

    for c in secret.chars() {
        if c == '=' || c == ' ' {
            continue;
        }

        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u32 - 'A' as u32,
            c @ '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(TotpError::InvalidSecret),
        };

        buffer = (buffer << 5) | value;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    if out.is_empty() {
        return Err(TotpError::InvalidSecret);
    }

    Ok(out)
}
