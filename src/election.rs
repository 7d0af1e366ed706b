use serde::{Deserialize, Serialize};

use crate::crypto::group::{generator, prime, subgroup_prime, Element, Exponent};
use crate::errors::ElectionError;
use crate::hash_all;

/// The public context every proof in an election is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextElectionContext {
    /// The number of guardians `n`.
    pub number_of_guardians: u32,

    /// The number of guardians `k` required to decrypt.
    pub quorum: u32,

    /// The joint public key `K`, product of every guardian's constant commitment.
    pub elgamal_public_key: Element,

    /// Hash of every coefficient commitment published in the key ceremony.
    pub commitment_hash: Exponent,

    pub manifest_hash: Exponent,

    /// The base hash `Q = H(p, q, g, n, k, manifest_hash)`.
    pub crypto_base_hash: Exponent,

    /// The extended base hash `Q̄ = H(Q, commitment_hash)`, which every challenge starts with.
    pub crypto_extended_base_hash: Exponent,
}

impl CiphertextElectionContext {
    pub fn new(
        number_of_guardians: u32,
        quorum: u32,
        elgamal_public_key: Element,
        commitment_hash: Exponent,
        manifest_hash: Exponent,
    ) -> Result<Self, ElectionError> {
        if quorum == 0 || quorum > number_of_guardians {
            return Err(ElectionError::InvalidQuorum {
                quorum,
                number_of_guardians,
            });
        }

        let crypto_base_hash = hash_all!(
            prime(),
            subgroup_prime(),
            generator(),
            number_of_guardians,
            quorum,
            manifest_hash,
        );
        let crypto_extended_base_hash = hash_all!(crypto_base_hash, commitment_hash);

        Ok(CiphertextElectionContext {
            number_of_guardians,
            quorum,
            elgamal_public_key,
            commitment_hash,
            manifest_hash,
            crypto_base_hash,
            crypto_extended_base_hash,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::elgamal;

    #[test]
    fn quorum_bounds() {
        let make = |n, k| {
            CiphertextElectionContext::new(
                n,
                k,
                elgamal::test::public_key(),
                1_u32.into(),
                2_u32.into(),
            )
        };
        assert!(make(3, 0).is_err());
        assert_eq!(
            make(3, 4),
            Err(ElectionError::InvalidQuorum {
                quorum: 4,
                number_of_guardians: 3
            })
        );
        assert!(make(3, 3).is_ok());
        assert!(make(1, 1).is_ok());
    }

    #[test]
    fn hashes_bind_parameters() {
        let make = |k, commitments: u32| {
            CiphertextElectionContext::new(
                3,
                k,
                elgamal::test::public_key(),
                commitments.into(),
                2_u32.into(),
            )
            .unwrap()
        };
        assert_ne!(make(2, 1).crypto_base_hash, make(3, 1).crypto_base_hash);
        assert_eq!(make(2, 1).crypto_base_hash, make(2, 7).crypto_base_hash);
        assert_ne!(
            make(2, 1).crypto_extended_base_hash,
            make(2, 7).crypto_extended_base_hash
        );
    }
}
