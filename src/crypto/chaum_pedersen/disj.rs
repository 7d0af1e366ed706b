use serde::{Deserialize, Serialize};

use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{Element, Exponent};

/// A pair of Chaum-Pedersen proof transcripts, used to prove that a selection ciphertext encrypts
/// either zero or one (without revealing which).
///
/// If both transcripts are valid for their respective plaintexts, and the sum of the two
/// challenges matches the expected value, then one of the properties holds.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "zero_proof")]
    pub zero: super::Proof,
    #[serde(rename = "one_proof")]
    pub one: super::Proof,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub challenge: bool,
    pub response_zero: super::ResponseStatus,
    pub response_one: super::ResponseStatus,
}

impl Proof {
    pub fn check_zero_one(
        &self,
        public_key: &Element,
        message: &Ciphertext,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext, &Ciphertext) -> Exponent,
    ) -> Status {
        let combined_challenge = &self.zero.challenge + &self.one.challenge;
        let expected_challenge =
            gen_challenge(message, &self.zero.commitment, &self.one.commitment);

        Status {
            challenge: combined_challenge == expected_challenge,
            response_zero: self
                .zero
                .transcript_plaintext(public_key, message, &0_u32.into()),
            response_one: self
                .one
                .transcript_plaintext(public_key, message, &1_u32.into()),
        }
    }

    /// Prove that `message`, an encryption of `plaintext` with nonce `nonce`, holds zero or one.
    ///
    /// The branch matching `plaintext` is proven for real and the other one is simulated from
    /// `fake_challenge` and `fake_response`.  The real challenge is chosen so that the two sum to
    /// the hash of both commitments.  If `plaintext` is neither zero nor one the proof is built
    /// anyway and will fail `check_zero_one`.
    #[allow(clippy::too_many_arguments)]
    pub fn prove(
        public_key: &Element,
        message: &Ciphertext,
        nonce: &Exponent,
        plaintext: bool,
        real_one_time_exponent: &Exponent,
        fake_challenge: &Exponent,
        fake_response: &Exponent,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext, &Ciphertext) -> Exponent,
    ) -> Proof {
        let (real, fake): (Exponent, Exponent) = if plaintext {
            (1_u32.into(), 0_u32.into())
        } else {
            (0_u32.into(), 1_u32.into())
        };

        let simulated =
            super::Proof::simulate_plaintext(public_key, message, &fake, fake_challenge, fake_response);
        let proven = super::Proof::prove_plaintext(
            public_key,
            message,
            nonce,
            &real,
            real_one_time_exponent,
            |_, real_commitment| {
                // The combined challenge covers the ciphertext being proven, not the shifted one
                // `prove_plaintext` hands us.
                let combined_challenge = if plaintext {
                    gen_challenge(message, &simulated.commitment, real_commitment)
                } else {
                    gen_challenge(message, real_commitment, &simulated.commitment)
                };
                &combined_challenge - fake_challenge
            },
        );

        if plaintext {
            Proof {
                zero: simulated,
                one: proven,
            }
        } else {
            Proof {
                zero: proven,
                one: simulated,
            }
        }
    }
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.challenge && self.response_zero.is_ok() && self.response_one.is_ok()
    }
}

#[cfg(test)]
mod test {
    use super::Proof;
    use crate::crypto::elgamal::{self, Ciphertext};
    use crate::crypto::hash::selection_challenge;

    fn prove_and_check(value: u32, claimed: bool) -> bool {
        let public_key = elgamal::test::public_key();
        let extended_base_hash = elgamal::test::extended_base_hash();

        let nonce = 8768_u32.into();
        let message = Ciphertext::encrypt(&public_key, &value.into(), &nonce);
        let proof = Proof::prove(
            &public_key,
            &message,
            &nonce,
            claimed,
            &24256_u32.into(),
            &30125_u32.into(),
            &6033_u32.into(),
            |msg, comm0, comm1| selection_challenge(&extended_base_hash, msg, comm0, comm1),
        );

        let status = proof.check_zero_one(&public_key, &message, |msg, comm0, comm1| {
            selection_challenge(&extended_base_hash, msg, comm0, comm1)
        });
        dbg!(&status);
        status.is_ok()
    }

    /// Encrypt the value zero, prove that it's either zero or one, and check both parts of the
    /// proof.
    #[test]
    fn prove_check_disj_zero() {
        assert!(prove_and_check(0, false));
    }

    #[test]
    fn prove_check_disj_one() {
        assert!(prove_and_check(1, true));
    }

    /// Encrypt the value two and construct a proof that falsely claims it's zero or one.
    #[test]
    fn prove_check_disj_two() {
        assert!(!prove_and_check(2, false));
        assert!(!prove_and_check(2, true));
    }

    /// Encrypt zero but prove the wrong branch.
    #[test]
    fn prove_check_disj_flipped() {
        assert!(!prove_and_check(0, true));
        assert!(!prove_and_check(1, false));
    }
}
