//! Homomorphic tally accumulation and threshold decryption for ElectionGuard elections.
//!
//! Encrypted ballots are folded into a `tally::CiphertextTally`; guardians each publish partial
//! decryptions of it (`decryption::share`), and a `mediator::DecryptionMediator` collects those,
//! checks them, and combines any quorum of them into a `decryption::PlaintextTally`.

pub mod ballot;
pub mod config;
pub mod crypto;
pub mod decryption;
pub mod election;
pub mod errors;
pub mod generate;
pub mod guardian;
pub mod manifest;
pub mod mediator;
pub mod serialize;
pub mod tally;
