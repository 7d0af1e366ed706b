//! What the key ceremony hands to the tally and decryption side.
//!
//! During the key ceremony, each guardian randomly generates `k` coefficients of a secret
//! polynomial `P_j`, the first of which is its private key.  It publishes the commitments
//! `K_{j,m} = g^{a_{j,m}}` together with a Schnorr proof of posession for each one, and privately
//! hands guardian `i` the value `P_j(x_i)`.  Guardian `i`'s secret key share is the sum
//! `P(x_i) = Σ_j P_j(x_i)`; it never leaves that guardian.

use num::traits::{One, Pow};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::group::{gen_pow, Element, Exponent};
use crate::crypto::schnorr;
use crate::errors::GuardianError;
use crate::hash_all;

/// A guardian's public record from the key ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPublicKey {
    pub owner_id: String,

    /// The guardian's polynomial is evaluated at this point, so it must be unique and non-zero.
    pub sequence_order: u32,

    /// `K_j = K_{j,0}`.
    pub key: Element,

    pub coefficient_commitments: Vec<Element>,
    pub coefficient_proofs: Vec<schnorr::Proof>,
}

impl ElectionPublicKey {
    /// Check this record against an election with the given quorum: one commitment and one
    /// valid proof per polynomial coefficient.
    pub fn check(&self, quorum: u32) -> Result<(), GuardianError> {
        let guardian_id = || self.owner_id.clone();

        if self.sequence_order == 0 {
            return Err(GuardianError::ZeroSequenceOrder {
                guardian_id: guardian_id(),
            });
        }
        let expected = quorum as usize;
        for actual in [
            self.coefficient_commitments.len(),
            self.coefficient_proofs.len(),
        ] {
            if actual != expected {
                return Err(GuardianError::CoefficientCount {
                    guardian_id: guardian_id(),
                    expected,
                    actual,
                });
            }
        }
        if self.coefficient_commitments.first() != Some(&self.key) {
            return Err(GuardianError::KeyMismatch {
                guardian_id: guardian_id(),
            });
        }

        for (index, (commitment, proof)) in self
            .coefficient_commitments
            .iter()
            .zip(&self.coefficient_proofs)
            .enumerate()
        {
            if !commitment.is_valid_residue() {
                return Err(GuardianError::InvalidCommitment {
                    guardian_id: guardian_id(),
                    index,
                });
            }
            if proof.check(commitment).next().is_some() {
                return Err(GuardianError::InvalidProof {
                    guardian_id: guardian_id(),
                    index,
                });
            }
        }
        Ok(())
    }
}

/// The public commitment `g^{P(x)} = Π_j Π_m K_{j,m}^{x^m}` to the key share of the guardian
/// at `sequence_order = x`.  Partial decryptions by that guardian are proven against this value.
pub fn share_public_key(sequence_order: u32, roster: &[ElectionPublicKey]) -> Element {
    let x = Exponent::from(sequence_order);
    roster
        .iter()
        .flat_map(|key| {
            key.coefficient_commitments
                .iter()
                .scan(Exponent::one(), |power, commitment| {
                    let term = commitment.pow(&*power);
                    *power = &*power * &x;
                    Some(term)
                })
        })
        .fold(Element::one(), |acc, term| acc * term)
}

/// `K = Π_j K_j`.
pub fn joint_public_key(roster: &[ElectionPublicKey]) -> Element {
    roster
        .iter()
        .fold(Element::one(), |acc, key| &acc * &key.key)
}

/// Hash of every commitment in the roster, in roster order.
pub fn commitment_hash(roster: &[ElectionPublicKey]) -> Exponent {
    let commitments: Vec<&Element> = roster
        .iter()
        .flat_map(|key| key.coefficient_commitments.iter())
        .collect();
    hash_all!(commitments)
}

/// A guardian's secret key share `P(x_i)`.
///
/// Deliberately not `Serialize`, and `Debug` does not print the secret.  Decryption shares are
/// computed from it in `decryption::share`.
#[derive(Clone)]
pub struct GuardianKeyShare {
    pub guardian_id: String,
    pub sequence_order: u32,
    pub(crate) secret: Exponent,
}

impl GuardianKeyShare {
    pub fn new(guardian_id: impl Into<String>, sequence_order: u32, secret: Exponent) -> Self {
        GuardianKeyShare {
            guardian_id: guardian_id.into(),
            sequence_order,
            secret,
        }
    }

    /// `g^{P(x_i)}`, which must agree with `share_public_key` computed from the roster.
    pub fn share_public_key(&self) -> Element {
        gen_pow(&self.secret)
    }
}

impl fmt::Debug for GuardianKeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardianKeyShare")
            .field("guardian_id", &self.guardian_id)
            .field("sequence_order", &self.sequence_order)
            .field("secret", &"<redacted>")
            .finish()
    }
}
