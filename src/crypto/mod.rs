//! Reference `CryptoProvider` implementations.
//!
//! These are real, working cryptography — not mocks — but per the engine's
//! scope, concrete primitive implementations are reference material for
//! testing the engine end to end, not an audited production artifact. Host
//! applications should supply their own `CryptoProvider` backed by their
//! platform's vetted crypto (WebCrypto, libsodium, a platform keychain...).

pub mod stub;

pub use stub::Argon2ChaChaEd25519Provider;
