//! Password scrambling for challenge-response authentication.
//!
//! - `caching_sha2_password` (MySQL 8.0+ default), 32-byte token:
//!   ```text
//!   SHA256(password) XOR SHA256(SHA256(SHA256(password)) ++ challenge)
//!   ```
//! - `mysql_native_password` (MySQL 5.x default), 20-byte token:
//!   ```text
//!   SHA1(password) XOR SHA1(challenge ++ SHA1(SHA1(password)))
//!   ```
//!
//! The server stores only the double hash, so it can verify the token without the
//! plaintext ever crossing the wire. Both functions are pure.

use std::fmt;
use std::str::FromStr;

use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ProtocolError, Result};

/// Length of the server challenge (salt1 ++ salt2)
pub const SCRAMBLE_LEN: usize = 20;

/// Digest length of SHA-256, and of a `caching_sha2_password` token
pub const SHA256_TOKEN_LEN: usize = 32;

/// Digest length of SHA-1, and of a `mysql_native_password` token
pub const NATIVE_TOKEN_LEN: usize = 20;

fn check_challenge(challenge: &[u8]) -> Result<()> {
    if challenge.len() != SCRAMBLE_LEN {
        return Err(ProtocolError::ScrambleInput {
            expected: SCRAMBLE_LEN,
            actual: challenge.len(),
        });
    }
    Ok(())
}

/// SHA-256 three-round scramble used by `caching_sha2_password`
pub fn scramble(password: &[u8], challenge: &[u8]) -> Result<[u8; SHA256_TOKEN_LEN]> {
    check_challenge(challenge)?;

    let mut stage1: [u8; SHA256_TOKEN_LEN] = Sha256::digest(password).into();
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(challenge);
    let stage3 = hasher.finalize();

    let mut token = [0u8; SHA256_TOKEN_LEN];
    for (out, (a, b)) in token.iter_mut().zip(stage1.iter().zip(stage3.iter())) {
        *out = a ^ b;
    }
    stage1.zeroize();
    Ok(token)
}

/// SHA-1 scramble used by `mysql_native_password`
pub fn scramble_native(password: &[u8], challenge: &[u8]) -> Result<[u8; NATIVE_TOKEN_LEN]> {
    check_challenge(challenge)?;

    let mut stage1: [u8; NATIVE_TOKEN_LEN] = Sha1::digest(password).into();
    let stage2 = Sha1::digest(stage1);

    // challenge first, unlike the SHA-256 variant
    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2);
    let stage3 = hasher.finalize();

    let mut token = [0u8; NATIVE_TOKEN_LEN];
    for (out, (a, b)) in token.iter_mut().zip(stage1.iter().zip(stage3.iter())) {
        *out = a ^ b;
    }
    stage1.zeroize();
    Ok(token)
}

/// Auth response bytes; wiped on drop
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct AuthToken(Vec<u8>);

impl AuthToken {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for AuthToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({} bytes)", self.0.len())
    }
}

/// Authentication plugins this client can answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPlugin {
    CachingSha2Password,
    MysqlNativePassword,
}

impl AuthPlugin {
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthPlugin::CachingSha2Password => "caching_sha2_password",
            AuthPlugin::MysqlNativePassword => "mysql_native_password",
        }
    }

    /// Scramble `password` for this plugin. An empty password is sent as an empty
    /// auth response, which is how the server expects a blank password.
    pub fn auth_response(self, password: &[u8], challenge: &[u8]) -> Result<AuthToken> {
        if password.is_empty() {
            check_challenge(challenge)?;
            return Ok(AuthToken::empty());
        }
        let token = match self {
            AuthPlugin::CachingSha2Password => scramble(password, challenge)?.to_vec(),
            AuthPlugin::MysqlNativePassword => scramble_native(password, challenge)?.to_vec(),
        };
        Ok(AuthToken(token))
    }
}

impl FromStr for AuthPlugin {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "caching_sha2_password" => Ok(AuthPlugin::CachingSha2Password),
            "mysql_native_password" => Ok(AuthPlugin::MysqlNativePassword),
            other => Err(ProtocolError::UnsupportedAuthPlugin(other.to_string())),
        }
    }
}

impl fmt::Display for AuthPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn challenge() -> Vec<u8> {
        (1u8..=20).collect()
    }

    #[test]
    fn sha256_reference_token() {
        let expected: [u8; 32] = [
            0x74, 0x6e, 0xbe, 0x20, 0x5d, 0x56, 0xa0, 0x70, 0x7a, 0xcb, 0x3e, 0x79, 0x6e, 0x83,
            0x4e, 0x0d, 0xd7, 0xb1, 0xd6, 0x17, 0x43, 0xb2, 0x6b, 0xd5, 0x20, 0x2c, 0x7a, 0x62,
            0x32, 0x30, 0xc7, 0xc9,
        ];
        assert_eq!(scramble(b"secret", &challenge()).unwrap(), expected);
    }

    #[test]
    fn native_reference_token() {
        let expected: [u8; 20] = [
            0xb3, 0x2b, 0xb3, 0xa5, 0x83, 0xe1, 0x34, 0x0c, 0x0a, 0x11, 0x08, 0xd5, 0x8b, 0x1b,
            0xe4, 0x97, 0x81, 0xad, 0x8c, 0x2f,
        ];
        assert_eq!(scramble_native(b"secret", &challenge()).unwrap(), expected);
    }

    #[test]
    fn deterministic_and_sensitive() {
        let c = challenge();
        let a = scramble(b"secret", &c).unwrap();
        assert_eq!(a, scramble(b"secret", &c).unwrap());

        let mut flipped = c.clone();
        flipped[19] ^= 0x01;
        assert_ne!(a, scramble(b"secret", &flipped).unwrap());
        assert_ne!(a, scramble(b"secreT", &c).unwrap());
    }

    #[test]
    fn challenge_length_checked() {
        for len in [0usize, 8, 19, 21, 32] {
            let err = scramble(b"secret", &vec![1u8; len]).unwrap_err();
            assert!(matches!(
                err,
                ProtocolError::ScrambleInput { expected: 20, actual } if actual == len
            ));
            assert!(scramble_native(b"secret", &vec![1u8; len]).is_err());
        }
    }

    #[test]
    fn empty_password_sends_empty_response() {
        let token = AuthPlugin::CachingSha2Password
            .auth_response(b"", &challenge())
            .unwrap();
        assert!(token.is_empty());
        // length is still validated
        assert!(AuthPlugin::CachingSha2Password
            .auth_response(b"", &[0u8; 4])
            .is_err());
    }

    #[test]
    fn plugin_names() {
        for plugin in [AuthPlugin::CachingSha2Password, AuthPlugin::MysqlNativePassword] {
            assert_eq!(plugin.as_str().parse::<AuthPlugin>().unwrap(), plugin);
        }
        assert!(matches!(
            "sha256_password".parse::<AuthPlugin>(),
            Err(ProtocolError::UnsupportedAuthPlugin(name)) if name == "sha256_password"
        ));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthPlugin::MysqlNativePassword
            .auth_response(b"secret", &challenge())
            .unwrap();
        assert_eq!(format!("{token:?}"), "AuthToken(20 bytes)");
    }
}
