use num::traits::Pow;
use serde::{Deserialize, Serialize};

use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{generator, Element, Exponent};

pub mod disj;

/// A proof transcript from the Chaum-Pedersen protocol.
///
/// We use the Chaum-Pedersen protocol to prove three kinds of properties:
///
/// * `zero`: A `Ciphertext` is an encryption of zero.
/// * `plaintext`: A `Ciphertext` is an encryption of a particular plaintext value.
/// * `exp`: A `value` is some `base` raised to the prover's secret key.  This is the proof that
///   accompanies every partial decryption.
///
/// For each of these properties, the `Proof` API provides some of these methods:
///
/// * `check_*`: Check that this is a valid proof of the property, including the challenge.
/// * `transcript_*`: Check only that this is a valid proof transcript for the property.
///   **This is not sufficient to prove that the property holds:** for that, the caller must also
///   check that the transcript uses the correct challenge.
/// * `prove_*`: Construct a `Proof` showing that the property holds.  (If the property doesn't
///   actually hold, this method will succeed but produce an invalid proof.)
/// * `simulate_*`: Construct a fake `Proof` using a preselected challenge.  The resulting proof
///   will pass the `transcript` check, but will fail `check` due to having the wrong challenge.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Proof {
    /// The commitment `(a, b) = (g^u, h^u)` to the prover's one-time exponent `u`.
    pub commitment: Ciphertext,
    pub challenge: Exponent,
    pub response: Exponent,
}

/// The result of checking proof validity.
#[derive(Debug, Serialize)]
pub struct Status {
    pub challenge: bool,
    pub response: ResponseStatus,
}

/// The result of checking transcript validity.
#[derive(Debug, Serialize)]
pub struct ResponseStatus {
    /// `g^v = a * A^c`
    pub pad: bool,
    /// `h^v = b * B^c`
    pub data: bool,
}

impl Proof {
    /// Use this `Proof` to establish that `message` is an encryption of zero under `public_key`.
    pub fn check_zero(
        &self,
        public_key: &Element,
        message: &Ciphertext,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Status {
        let challenge_ok = self.challenge == gen_challenge(message, &self.commitment);
        Status {
            challenge: challenge_ok,
            response: self.transcript_zero(public_key, message),
        }
    }

    /// Check validity of this transcript for proving that `message` is an encryption of zero.
    pub fn transcript_zero(&self, public_key: &Element, message: &Ciphertext) -> ResponseStatus {
        let g = generator();
        let h = public_key;
        let a = &message.pad;
        let b = &message.data;
        let alpha = &self.commitment.pad;
        let beta = &self.commitment.data;
        let c = &self.challenge;
        let u = &self.response;

        ResponseStatus {
            pad: g.pow(u) == alpha * &a.pow(c),
            data: h.pow(u) == beta * &b.pow(c),
        }
    }

    /// Construct a proof that `message` is an encryption of zero.  This requires knowing the
    /// `nonce` that was used to construct `message`.
    pub fn prove_zero(
        public_key: &Element,
        message: &Ciphertext,
        nonce: &Exponent,
        one_time_exponent: &Exponent,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Proof {
        let g = generator();
        let h = public_key;
        let r = nonce;
        let t = one_time_exponent;

        let commitment = Ciphertext {
            pad: g.pow(t),
            data: h.pow(t),
        };
        let challenge = gen_challenge(message, &commitment);

        // u = t + c r (mod q)
        let response = t + &(&challenge * r);

        Proof {
            commitment,
            challenge,
            response,
        }
    }

    /// Given a preselected `challenge` and `response`, construct a transcript that passes
    /// `transcript_zero` for `message`, regardless of what `message` encrypts.
    pub fn simulate_zero(
        public_key: &Element,
        message: &Ciphertext,
        challenge: &Exponent,
        response: &Exponent,
    ) -> Proof {
        let g = generator();
        let h = public_key;
        let a = &message.pad;
        let b = &message.data;
        let c = challenge;
        let u = response;

        Proof {
            commitment: Ciphertext {
                pad: &g.pow(u) / &a.pow(c),
                data: &h.pow(u) / &b.pow(c),
            },
            challenge: c.clone(),
            response: u.clone(),
        }
    }

    /// Use this `Proof` to establish that `message` is an encryption of `plaintext`.
    pub fn check_plaintext(
        &self,
        public_key: &Element,
        message: &Ciphertext,
        plaintext: &Exponent,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Status {
        // The plaintext is public, so encrypting it with the zero nonce is fine; it only has to
        // match the nonce used in `prove_plaintext`.
        let encrypted_plaintext = Ciphertext::encrypt(public_key, plaintext, &Exponent::from(0_u32));
        // The challenge is computed over the original message, not the difference.
        self.check_zero(public_key, &(message - &encrypted_plaintext), |_, comm| {
            gen_challenge(message, comm)
        })
    }

    pub fn transcript_plaintext(
        &self,
        public_key: &Element,
        message: &Ciphertext,
        plaintext: &Exponent,
    ) -> ResponseStatus {
        let encrypted_plaintext = Ciphertext::encrypt(public_key, plaintext, &Exponent::from(0_u32));
        self.transcript_zero(public_key, &(message - &encrypted_plaintext))
    }

    /// Construct a proof that `message` is an encryption of `plaintext`.
    pub fn prove_plaintext(
        public_key: &Element,
        message: &Ciphertext,
        nonce: &Exponent,
        plaintext: &Exponent,
        one_time_exponent: &Exponent,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Proof {
        let zero = Exponent::from(0_u32);
        let encrypted_plaintext = Ciphertext::encrypt(public_key, plaintext, &zero);
        // `encrypted_plaintext` uses the zero nonce, so the difference still has nonce `nonce`.
        Self::prove_zero(
            public_key,
            &(message - &encrypted_plaintext),
            nonce,
            one_time_exponent,
            |_, comm| gen_challenge(message, comm),
        )
    }

    pub fn simulate_plaintext(
        public_key: &Element,
        message: &Ciphertext,
        plaintext: &Exponent,
        challenge: &Exponent,
        response: &Exponent,
    ) -> Proof {
        let encrypted_plaintext = Ciphertext::encrypt(public_key, plaintext, &Exponent::from(0_u32));
        Self::simulate_zero(public_key, &(message - &encrypted_plaintext), challenge, response)
    }

    /// Use this `Proof` to establish that `result = base^s`, where `s` is the secret behind
    /// `public_key = g^s`.
    pub fn check_exp(
        &self,
        public_key: &Element,
        base: &Element,
        result: &Element,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Status {
        self.check_zero(base, &exp_statement(public_key, result), gen_challenge)
    }

    /// Check validity of this transcript for proving that `result = base^s`.
    pub fn transcript_exp(
        &self,
        public_key: &Element,
        base: &Element,
        result: &Element,
    ) -> ResponseStatus {
        // A partial decryption `M_i = A^{s_i}` is accepted when `g^v = a K_i^c` and
        // `A^v = b M_i^c`.  That is exactly `transcript_zero` for the "ciphertext" `(K_i, M_i)`
        // under the "public key" `A`: proving `(g^s, A^s)` encrypts zero is proving `b = a^s`.
        self.transcript_zero(base, &exp_statement(public_key, result))
    }

    /// Construct a proof that `result = base^secret_key`.
    pub fn prove_exp(
        public_key: &Element,
        secret_key: &Exponent,
        base: &Element,
        result: &Element,
        one_time_exponent: &Exponent,
        gen_challenge: impl FnOnce(&Ciphertext, &Ciphertext) -> Exponent,
    ) -> Proof {
        // In this formulation the long-term secret plays the role of the nonce.
        Self::prove_zero(
            base,
            &exp_statement(public_key, result),
            secret_key,
            one_time_exponent,
            gen_challenge,
        )
    }
}

fn exp_statement(public_key: &Element, result: &Element) -> Ciphertext {
    Ciphertext {
        pad: public_key.clone(),
        data: result.clone(),
    }
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.challenge && self.response.is_ok()
    }
}

impl ResponseStatus {
    pub fn is_ok(&self) -> bool {
        self.pad && self.data
    }
}

#[cfg(test)]
mod test {
    use super::Proof;
    use crate::crypto::elgamal::{self, Ciphertext};
    use crate::crypto::group::{generator, Element, Exponent};
    use crate::crypto::hash::constant_challenge;
    use num::traits::Pow;

    /// Encrypt a zero, construct a Chaum-Pedersen proof that it's zero, and check the proof.
    #[test]
    fn prove_check_zero() {
        let public_key = elgamal::test::public_key();
        let extended_base_hash = elgamal::test::extended_base_hash();

        let nonce = 2140_u32.into();
        let message = Ciphertext::encrypt(&public_key, &0_u32.into(), &nonce);
        let proof = Proof::prove_zero(
            &public_key,
            &message,
            &nonce,
            &3048_u32.into(),
            |msg, comm| constant_challenge(&extended_base_hash, msg, comm),
        );

        let status = proof.check_zero(&public_key, &message, |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        dbg!(&status);
        assert!(status.is_ok());
    }

    /// Encrypt a nonzero value, construct a proof claiming it's zero, and check the proof (which
    /// should fail).
    #[test]
    #[should_panic]
    fn prove_check_zero_fail() {
        let public_key = elgamal::test::public_key();
        let extended_base_hash = elgamal::test::extended_base_hash();

        let nonce = 2140_u32.into();
        let message = Ciphertext::encrypt(&public_key, &1_u32.into(), &nonce);
        let proof = Proof::prove_zero(
            &public_key,
            &message,
            &nonce,
            &3048_u32.into(),
            |msg, comm| constant_challenge(&extended_base_hash, msg, comm),
        );

        let status = proof.check_zero(&public_key, &message, |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        dbg!(&status);
        assert!(status.is_ok());
    }

    /// Encrypt a value, construct a proof that it's that value, and check the proof.
    #[test]
    fn prove_check_plaintext() {
        let public_key = elgamal::test::public_key();
        let extended_base_hash = elgamal::test::extended_base_hash();

        let value: Exponent = 3_u32.into();
        let nonce = 13797_u32.into();
        let message = Ciphertext::encrypt(&public_key, &value, &nonce);
        let proof = Proof::prove_plaintext(
            &public_key,
            &message,
            &nonce,
            &value,
            &30612_u32.into(),
            |msg, comm| constant_challenge(&extended_base_hash, msg, comm),
        );

        let status = proof.check_plaintext(&public_key, &message, &value, |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        dbg!(&status);
        assert!(status.is_ok());

        let wrong = proof.check_plaintext(&public_key, &message, &2_u32.into(), |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        assert!(!wrong.is_ok());
    }

    /// Raise a value to a secret key, prove the exponentiation was done correctly, and check the
    /// proof.
    #[test]
    fn prove_check_exp() {
        let extended_base_hash = elgamal::test::extended_base_hash();

        let secret_key: Exponent = 22757_u32.into();
        let public_key = generator().pow(&secret_key);

        let base: Element = Element::from(1033_u32).pow(&Exponent::from(2_u32));
        let result = base.pow(&secret_key);
        let proof = Proof::prove_exp(
            &public_key,
            &secret_key,
            &base,
            &result,
            &26480_u32.into(),
            |msg, comm| constant_challenge(&extended_base_hash, msg, comm),
        );

        let status = proof.check_exp(&public_key, &base, &result, |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        dbg!(&status);
        assert!(status.is_ok());
    }

    /// Raise a value to some other exponent and construct a proof claiming it used the secret key
    /// (which should fail).
    #[test]
    #[should_panic]
    fn prove_check_exp_fail() {
        let extended_base_hash = elgamal::test::extended_base_hash();

        let secret_key: Exponent = 22757_u32.into();
        let public_key = generator().pow(&secret_key);
        let other_exponent: Exponent = 19315_u32.into();

        let base: Element = Element::from(1033_u32).pow(&Exponent::from(2_u32));
        let result = base.pow(&other_exponent);
        let proof = Proof::prove_exp(
            &public_key,
            &secret_key,
            &base,
            &result,
            &26480_u32.into(),
            |msg, comm| constant_challenge(&extended_base_hash, msg, comm),
        );

        let status = proof.check_exp(&public_key, &base, &result, |msg, comm| {
            constant_challenge(&extended_base_hash, msg, comm)
        });
        dbg!(&status);
        assert!(status.is_ok());
    }
}
