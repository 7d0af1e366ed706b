use digest::Digest;
use num::BigUint;
use sha2::Sha256;
use std::borrow::Cow;

use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{Element, Exponent};

/// Anything that can be fed to the election hash function.
pub trait AsBytes {
    fn as_bytes(&self) -> Cow<'_, [u8]>;
}

impl<T: AsBytes + ?Sized> AsBytes for &T {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        (**self).as_bytes()
    }
}

impl AsBytes for BigUint {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_bytes_be())
    }
}

impl AsBytes for Element {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        self.as_uint().as_bytes()
    }
}

impl AsBytes for Exponent {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        self.as_uint().as_bytes()
    }
}

impl AsBytes for Ciphertext {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        let mut bytes = self.pad.as_uint().to_bytes_be();
        bytes.push(SEPARATOR);
        bytes.extend(self.data.as_uint().to_bytes_be());
        Cow::Owned(bytes)
    }
}

impl AsBytes for str {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(str::as_bytes(self))
    }
}

impl AsBytes for String {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(str::as_bytes(self))
    }
}

impl AsBytes for u32 {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_be_bytes().to_vec())
    }
}

impl AsBytes for u64 {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_be_bytes().to_vec())
    }
}

impl<T: AsBytes> AsBytes for [T] {
    /// Sequences hash as their separator-joined items, so nested lists cannot collide with a
    /// flattened argument list of the same contents.
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        let mut bytes = vec![LIST_OPEN];
        for item in self {
            bytes.extend_from_slice(&item.as_bytes());
            bytes.push(SEPARATOR);
        }
        bytes.push(LIST_CLOSE);
        Cow::Owned(bytes)
    }
}

impl<T: AsBytes> AsBytes for Vec<T> {
    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.as_slice().as_bytes().into_owned())
    }
}

const SEPARATOR: u8 = b'|';
const LIST_OPEN: u8 = b'[';
const LIST_CLOSE: u8 = b']';

/// `H(x_1 | x_2 | ... | x_n) mod q` using SHA-256.
pub fn hash_items(items: &[&dyn AsBytes]) -> Exponent {
    let hash = items
        .iter()
        .fold(Sha256::new().chain_update([SEPARATOR]), |hasher, item| {
            hasher.chain_update(item.as_bytes()).chain_update([SEPARATOR])
        })
        .finalize();

    Exponent::new(BigUint::from_bytes_be(hash.as_slice()))
}

/// Hash any number of `AsBytes` values into an `Exponent`.
///
/// ```
/// use electionguard_tally::hash_all;
/// let h = hash_all!("contest", 3_u32);
/// assert_eq!(h, hash_all!("contest", 3_u32));
/// ```
#[macro_export]
macro_rules! hash_all {
    ( $( $x:expr ),* $(,)? ) => {
        $crate::crypto::hash::hash_items(&[
            $( &$x as &dyn $crate::crypto::hash::AsBytes ),*
        ])
    };
}

/// Challenge for a partial decryption proof: `c = H(Q̄, A, B, K_i, a, b, M_i)`.
///
/// `ciphertext` is the `(A, B)` being decrypted, `share_key` is the guardian's public
/// commitment `K_i = g^{P(i)}`, `commitment` is `(a, b) = (g^u, A^u)` and `share` is the partial
/// decryption `M_i = A^{P(i)}`.
pub fn decryption_challenge(
    extended_base_hash: &Exponent,
    ciphertext: &Ciphertext,
    share_key: &Element,
    commitment: &Ciphertext,
    share: &Element,
) -> Exponent {
    hash_all!(
        extended_base_hash,
        ciphertext.pad,
        ciphertext.data,
        share_key,
        commitment.pad,
        commitment.data,
        share,
    )
}

/// Challenge for a 0/1 disjunctive selection proof: `c = H(Q̄, A, B, a_0, b_0, a_1, b_1)`.
pub fn selection_challenge(
    extended_base_hash: &Exponent,
    message: &Ciphertext,
    commitment_zero: &Ciphertext,
    commitment_one: &Ciphertext,
) -> Exponent {
    hash_all!(
        extended_base_hash,
        message.pad,
        message.data,
        commitment_zero.pad,
        commitment_zero.data,
        commitment_one.pad,
        commitment_one.data,
    )
}

/// Challenge for a constant (contest limit) proof: `c = H(Q̄, A, B, a, b)`.
pub fn constant_challenge(
    extended_base_hash: &Exponent,
    message: &Ciphertext,
    commitment: &Ciphertext,
) -> Exponent {
    hash_all!(
        extended_base_hash,
        message.pad,
        message.data,
        commitment.pad,
        commitment.data,
    )
}
