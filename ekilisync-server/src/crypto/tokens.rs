//! Random secrets. Everything here draws from the operating system RNG.

use data_encoding::BASE64URL_NOPAD;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};

/// A numeric one-time passcode with exactly `digits` digits, leading zeros included
pub fn generate_otp(digits: usize) -> String {
    (0..digits)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect()
}

/// An alphanumeric credential for directly created identities
pub fn generate_temporary_password(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// An opaque two-segment refresh token
pub fn generate_refresh_token() -> String {
    let mut id = [0u8; 16];
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut id);
    OsRng.fill_bytes(&mut secret);

    format!(
        "{}.{}",
        BASE64URL_NOPAD.encode(&id),
        BASE64URL_NOPAD.encode(&secret)
    )
}
