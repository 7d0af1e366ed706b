use num::traits::Pow;
use serde::{Deserialize, Serialize};
use std::iter;

use crate::crypto::group::{generator, Element, Exponent};
use crate::hash_all;

/// A proof of posession of a private key.
///
/// A non-interactive zero-knowledge proof of knowledge of a private key `s` corresponding to a
/// public key `h = g^s`.  In the key ceremony every guardian publishes one of these for each
/// coefficient of its secret polynomial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The one-use public key `k = g^r` generated from the random one-use private key `r`. This
    /// acts as a commitment to `r`.
    pub commitment: Element,

    /// The challenge `c = H(h, k)`.
    pub challenge: Exponent,

    /// The response `u = r + c s mod q` to the challenge.
    pub response: Exponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Challenge,
    Response,
}

impl Proof {
    /// Prove knowledge of `secret_key`, using `one_time_exponent` as `r`.
    pub fn prove(secret_key: &Exponent, one_time_exponent: &Exponent) -> Proof {
        let public_key = generator().pow(secret_key);
        let commitment = generator().pow(one_time_exponent);
        let challenge = Self::expected_challenge(&public_key, &commitment);
        let response = one_time_exponent + &(&challenge * secret_key);
        Proof {
            commitment,
            challenge,
            response,
        }
    }

    /// Return every way in which this proof fails to show knowledge of the secret behind
    /// `public_key`.  An empty iterator means the proof is valid.
    pub fn check<'a>(&'a self, public_key: &'a Element) -> impl Iterator<Item = Error> + 'a {
        let challenge_error = if self.challenge == Self::expected_challenge(public_key, &self.commitment)
        {
            None
        } else {
            Some(Error::Challenge)
        };

        let response_error = if self.is_response_ok(public_key) {
            None
        } else {
            Some(Error::Response)
        };

        iter::empty().chain(challenge_error).chain(response_error)
    }

    #[allow(clippy::many_single_char_names)]
    fn is_response_ok(&self, public_key: &Element) -> bool {
        let g = generator();
        let Proof {
            commitment: k,
            challenge: c,
            response: u,
        } = self;
        let h = public_key;

        g.pow(u) == k * &h.pow(c)
    }

    fn expected_challenge(public_key: &Element, commitment: &Element) -> Exponent {
        hash_all!(public_key, commitment)
    }
}
