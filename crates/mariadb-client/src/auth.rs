//! Authentication plugins.
//!
//! The server names a plugin in its greeting (or in a later auth-switch
//! request) and supplies a challenge, usually a 20-byte scramble. The client
//! looks the plugin up in its [`AuthRegistry`] and sends back whatever the
//! plugin's [`AuthPlugin::negotiate`] produces.
//!
//! # mysql_native_password
//!
//! ```text
//! SHA1(password) XOR SHA1(scramble + SHA1(SHA1(password)))
//! ```
//!
//! # caching_sha2_password
//!
//! Fast path, accepted when the server has the password hash cached:
//!
//! ```text
//! SHA256(password) XOR SHA256(SHA256(SHA256(password)) + scramble)
//! ```
//!
//! The full-authentication path (RSA key exchange or cleartext over TLS) is
//! not implemented; a server asking for it fails the connect.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Well-known plugin names.
pub mod plugins {
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    pub const MYSQL_CLEAR_PASSWORD: &str = "mysql_clear_password";
}

/// Status bytes of the `caching_sha2_password` exchange.
pub mod caching_sha2 {
    /// Prefix of an "auth more data" packet
    pub const MORE_DATA: u8 = 0x01;
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// The secret material a plugin works from.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A client-side authentication method.
pub trait AuthPlugin: Send + Sync {
    /// Plugin name as it appears on the wire.
    fn name(&self) -> &str;

    /// Compute the auth response for a server challenge.
    fn negotiate(&self, challenge: &[u8], credentials: &Credentials) -> Vec<u8>;
}

/// Strip the NUL terminator servers append to the scramble.
fn scramble(challenge: &[u8]) -> &[u8] {
    match challenge {
        [head @ .., 0] if head.len() == 20 => head,
        _ => challenge,
    }
}

fn xor<const N: usize>(a: [u8; N], b: [u8; N]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// `mysql_native_password`: SHA-1 scramble.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePassword;

impl AuthPlugin for NativePassword {
    fn name(&self) -> &str {
        plugins::MYSQL_NATIVE_PASSWORD
    }

    fn negotiate(&self, challenge: &[u8], credentials: &Credentials) -> Vec<u8> {
        if credentials.password.is_empty() {
            return Vec::new();
        }
        let seed = scramble(challenge);
        let seed = &seed[..seed.len().min(20)];

        let stage1: [u8; 20] = Sha1::digest(credentials.password.as_bytes()).into();
        let stage2: [u8; 20] = Sha1::digest(stage1).into();
        let mut hasher = Sha1::new();
        hasher.update(seed);
        hasher.update(stage2);
        let stage3: [u8; 20] = hasher.finalize().into();
        xor(stage1, stage3)
    }
}

/// `caching_sha2_password`: SHA-256 fast-auth scramble.
#[derive(Debug, Default, Clone, Copy)]
pub struct CachingSha2Password;

impl AuthPlugin for CachingSha2Password {
    fn name(&self) -> &str {
        plugins::CACHING_SHA2_PASSWORD
    }

    fn negotiate(&self, challenge: &[u8], credentials: &Credentials) -> Vec<u8> {
        if credentials.password.is_empty() {
            return Vec::new();
        }
        let seed = scramble(challenge);

        let hash1: [u8; 32] = Sha256::digest(credentials.password.as_bytes()).into();
        let hash2: [u8; 32] = Sha256::digest(hash1).into();
        let mut hasher = Sha256::new();
        hasher.update(hash2);
        hasher.update(seed);
        let hash3: [u8; 32] = hasher.finalize().into();
        xor(hash1, hash3)
    }
}

/// `mysql_clear_password`: the password itself, NUL-terminated.
///
/// Only registered on request; it is meant for channels that are already
/// encrypted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearPassword;

impl AuthPlugin for ClearPassword {
    fn name(&self) -> &str {
        plugins::MYSQL_CLEAR_PASSWORD
    }

    fn negotiate(&self, _challenge: &[u8], credentials: &Credentials) -> Vec<u8> {
        let mut out = credentials.password.as_bytes().to_vec();
        out.push(0);
        out
    }
}

/// Plugins the client is willing to run, keyed by name.
#[derive(Clone)]
pub struct AuthRegistry {
    plugins: BTreeMap<String, Arc<dyn AuthPlugin>>,
}

impl Default for AuthRegistry {
    /// `mysql_native_password` and `caching_sha2_password`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(NativePassword);
        registry.register(CachingSha2Password);
        registry
    }
}

impl AuthRegistry {
    pub fn empty() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Add (or replace) a plugin under its own name.
    pub fn register(&mut self, plugin: impl AuthPlugin + 'static) {
        self.plugins.insert(plugin.name().to_string(), Arc::new(plugin));
    }

    /// Opt in to sending the password in clear text.
    pub fn with_clear_password(mut self) -> Self {
        self.register(ClearPassword);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AuthPlugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }
}

impl fmt::Debug for AuthRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn seed() -> Vec<u8> {
        (1..=20).collect()
    }

    #[test]
    fn native_password_vector() {
        let out = NativePassword.negotiate(&seed(), &Credentials::new("root", "secret"));
        assert_eq!(hex(&out), "b32bb3a583e1340c0a1108d58b1be49781ad8c2f");
    }

    #[test]
    fn caching_sha2_vector() {
        let out = CachingSha2Password.negotiate(&seed(), &Credentials::new("root", "secret"));
        assert_eq!(
            hex(&out),
            "746ebe205d56a0707acb3e796e834e0dd7b1d61743b26bd5202c7a623230c7c9"
        );
    }

    #[test]
    fn trailing_nul_is_ignored() {
        let creds = Credentials::new("root", "secret");
        let mut with_nul = seed();
        with_nul.push(0);
        assert_eq!(
            NativePassword.negotiate(&with_nul, &creds),
            NativePassword.negotiate(&seed(), &creds)
        );
        assert_eq!(
            CachingSha2Password.negotiate(&with_nul, &creds),
            CachingSha2Password.negotiate(&seed(), &creds)
        );
    }

    #[test]
    fn empty_password_sends_empty_response() {
        let creds = Credentials::new("root", "");
        assert!(NativePassword.negotiate(&seed(), &creds).is_empty());
        assert!(CachingSha2Password.negotiate(&seed(), &creds).is_empty());
        assert_eq!(ClearPassword.negotiate(&seed(), &creds), vec![0]);
    }

    #[test]
    fn registry_defaults_and_opt_in() {
        let registry = AuthRegistry::default();
        assert!(registry.contains(plugins::MYSQL_NATIVE_PASSWORD));
        assert!(registry.contains(plugins::CACHING_SHA2_PASSWORD));
        assert!(!registry.contains(plugins::MYSQL_CLEAR_PASSWORD));

        let registry = registry.with_clear_password();
        let plugin = registry.get(plugins::MYSQL_CLEAR_PASSWORD).unwrap();
        assert_eq!(
            plugin.negotiate(&[], &Credentials::new("u", "pw")),
            b"pw\0".to_vec()
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("root", "hunter2"));
        assert!(debug.contains("root"));
        assert!(!debug.contains("hunter2"));
    }
}
