//! Threshold decryption.
//!
//! Each guardian publishes, for every selection ciphertext `(A, B)`, a partial decryption
//! `M_i = A^{P(x_i)}` together with a Chaum-Pedersen proof (`share`).  Any quorum of these is
//! weighted by Lagrange coefficients computed over exactly that quorum (`lagrange`) and combined
//! into `M̄ = A^s` (`accumulator`), from which the count `t` with `K^t = B / M̄` is recovered by a
//! bounded search (`tally`).

pub mod accumulator;
pub mod lagrange;
pub mod share;
pub mod tally;

pub use accumulator::{AggregateDecryptionProof, Participant};
pub use lagrange::compute_lagrange_coefficients;
pub use share::{BallotShare, CiphertextDecryptionContest, CiphertextDecryptionSelection, TallyShare};
pub use tally::{decrypt_ballot, decrypt_tally, PlaintextTally, PlaintextTallyContest, PlaintextTallySelection};
