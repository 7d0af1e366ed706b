use num::traits::{One, Pow, Zero};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::crypto::group::{generator, Element, Exponent};

/// An exponential ElGamal ciphertext `(A, B) = (g^r, K^(m+r))` encrypting the integer `m` under
/// the public key `K` with nonce `r`.
///
/// Multiplying two ciphertexts component-wise yields an encryption of the sum of their
/// plaintexts, which is how ballots are folded into a tally.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Ciphertext {
    /// The one-time public key `A = g^r`.
    pub pad: Element,

    /// The encoding `B = K^m K^r`.
    pub data: Element,
}

impl Ciphertext {
    pub fn new(pad: Element, data: Element) -> Ciphertext {
        Ciphertext { pad, data }
    }

    /// Encrypt `plaintext` under `public_key` using `nonce` as the one-time secret.
    pub fn encrypt(public_key: &Element, plaintext: &Exponent, nonce: &Exponent) -> Ciphertext {
        Ciphertext {
            pad: generator().pow(nonce),
            data: public_key.pow(&(plaintext + nonce)),
        }
    }

    /// Decrypt with the full secret key `s`, returning `K^m`.  Only useful in tests: in a
    /// threshold election nobody holds `s`.
    pub fn decrypt_known_secret(&self, secret_key: &Exponent) -> Element {
        &self.data / &self.pad.pow(secret_key)
    }

    /// Both components are members of the order-`q` subgroup.
    pub fn is_valid(&self) -> bool {
        self.pad.is_valid_residue() && self.data.is_valid_residue()
    }
}

impl Zero for Ciphertext {
    /// `(1, 1)` encrypts zero under any key with the zero nonce, so it is the identity for
    /// homomorphic addition.
    fn zero() -> Ciphertext {
        Ciphertext {
            pad: Element::one(),
            data: Element::one(),
        }
    }

    fn is_zero(&self) -> bool {
        self.pad == Element::one() && self.data == Element::one()
    }
}

impl Add for &Ciphertext {
    type Output = Ciphertext;
    fn add(self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            pad: &self.pad * &other.pad,
            data: &self.data * &other.data,
        }
    }
}

impl Add for Ciphertext {
    type Output = Ciphertext;
    fn add(self, other: Ciphertext) -> Ciphertext {
        &self + &other
    }
}

impl Sub for &Ciphertext {
    type Output = Ciphertext;
    /// Homomorphic subtraction: the result encrypts the difference of the plaintexts.
    fn sub(self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            pad: &self.pad / &other.pad,
            data: &self.data / &other.data,
        }
    }
}

impl<'a> Sum<&'a Ciphertext> for Ciphertext {
    fn sum<I: Iterator<Item = &'a Ciphertext>>(iter: I) -> Ciphertext {
        iter.fold(Ciphertext::zero(), |acc, c| &acc + c)
    }
}
