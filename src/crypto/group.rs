use lazy_static::*;
use num::bigint::RandBigInt;
use num::traits::{Num, One, Pow, Zero};
use num::BigUint;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::errors::GroupError;

/// An element of the multiplicative group of integers modulo the prime `p`.  Elements that take
/// part in the protocol must also lie in the order-`q` subgroup; see `is_valid_residue`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Element {
    #[serde(with = "crate::serialize::big_uint")]
    element: BigUint,
}

/// An exponent, i.e. an integer modulo the subgroup order `q`.  Nonces, secret key shares,
/// challenges, responses, hashes and Lagrange coefficients all live here.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exponent {
    #[serde(with = "crate::serialize::big_uint")]
    exponent: BigUint,
}

impl Element {
    /// Return the generator element of the group `G`.
    pub fn gen() -> Element {
        Element::unchecked(GENERATOR.clone())
    }

    /// Inject an integer into the group: this wraps modulo the prime modulus if
    /// the number is greater than or equal to the modulus.
    pub fn new(element: BigUint) -> Element {
        Element::unchecked(element % &*PRIME_MODULUS)
    }

    fn unchecked(element: BigUint) -> Element {
        Element { element }
    }

    pub fn as_uint(&self) -> &BigUint {
        &self.element
    }

    /// `true` iff `0 < x < p` and `x^q = 1 (mod p)`, i.e. the element belongs to the subgroup of
    /// quadratic residues that every ciphertext component must live in.
    pub fn is_valid_residue(&self) -> bool {
        !self.element.is_zero()
            && self.element < *PRIME_MODULUS
            && self
                .element
                .modpow(&PRIME_SUBGROUP_MODULUS, &PRIME_MODULUS)
                .is_one()
    }

    /// Take the multiplicative inverse of the element.
    pub fn inverse(&self) -> Element {
        // p is prime, so a^-1 = a^(p-2) (mod p).
        Element::unchecked(
            self.element
                .modpow(&(&*PRIME_MODULUS - 2_u8), &PRIME_MODULUS),
        )
    }
}

impl Exponent {
    /// Inject an integer into the exponent group: this wraps modulo `q`.
    pub fn new(exponent: BigUint) -> Exponent {
        Exponent::unchecked(exponent % &*PRIME_SUBGROUP_MODULUS)
    }

    fn unchecked(exponent: BigUint) -> Exponent {
        Exponent { exponent }
    }

    pub fn as_uint(&self) -> &BigUint {
        &self.exponent
    }

    /// Draw a uniformly random exponent in `[0, q)`.
    pub fn random(rng: &mut (impl Rng + ?Sized)) -> Exponent {
        Exponent::unchecked(rng.gen_biguint_below(&PRIME_SUBGROUP_MODULUS))
    }

    /// Multiplicative inverse mod `q`.  Returns `None` for zero, which has no inverse.
    pub fn inverse(&self) -> Option<Exponent> {
        if self.exponent.is_zero() {
            return None;
        }
        // q is prime, so a^-1 = a^(q-2) (mod q).
        Some(Exponent::unchecked(self.exponent.modpow(
            &(&*PRIME_SUBGROUP_MODULUS - 2_u8),
            &PRIME_SUBGROUP_MODULUS,
        )))
    }
}

lazy_static! {
    static ref GENERATOR_ELEMENT: Element = Element::gen();
}

pub fn generator() -> &'static Element {
    &GENERATOR_ELEMENT
}

pub fn prime() -> &'static BigUint {
    &PRIME_MODULUS
}

pub fn subgroup_prime() -> &'static BigUint {
    &PRIME_SUBGROUP_MODULUS
}

// Multiplicative group operations

impl One for Element {
    /// Return the element one, which is always part of any valid group.
    fn one() -> Element {
        Element::unchecked(BigUint::one())
    }
}

impl Mul for Element {
    type Output = Element;
    fn mul(self, other: Element) -> Element {
        Element::unchecked(self.element * other.element % &*PRIME_MODULUS)
    }
}

impl Mul for &Element {
    type Output = Element;
    fn mul(self, other: &Element) -> Element {
        Element::unchecked(&self.element * &other.element % &*PRIME_MODULUS)
    }
}

impl Div for Element {
    type Output = Element;
    fn div(self, other: Element) -> Element {
        self * other.inverse()
    }
}

impl Div for &Element {
    type Output = Element;
    fn div(self, other: &Element) -> Element {
        self * &other.inverse()
    }
}

impl Pow<&Exponent> for &Element {
    type Output = Element;
    /// Raise a group element to an exponent, modulo `p`.
    fn pow(self, other: &Exponent) -> Element {
        Element::unchecked(self.element.modpow(&other.exponent, &PRIME_MODULUS))
    }
}

impl Pow<&BigUint> for &Element {
    type Output = Element;
    /// Raise a group element to an arbitrary exponent.
    fn pow(self, other: &BigUint) -> Element {
        Element::unchecked(self.element.modpow(other, &PRIME_MODULUS))
    }
}

/// `g^e mod p`.
pub fn gen_pow(exp: &Exponent) -> Element {
    generator().pow(exp)
}

// Additive exponent group operations

impl Zero for Exponent {
    fn zero() -> Exponent {
        Exponent::unchecked(BigUint::zero())
    }
    fn is_zero(&self) -> bool {
        self.exponent.is_zero()
    }
}

impl One for Exponent {
    fn one() -> Exponent {
        Exponent::unchecked(BigUint::one())
    }
    fn is_one(&self) -> bool {
        self.exponent.is_one()
    }
}

impl Add for Exponent {
    type Output = Exponent;
    fn add(self, other: Exponent) -> Exponent {
        Exponent::unchecked((self.exponent + other.exponent) % &*PRIME_SUBGROUP_MODULUS)
    }
}

impl Add for &Exponent {
    type Output = Exponent;
    fn add(self, other: &Exponent) -> Exponent {
        Exponent::unchecked((&self.exponent + &other.exponent) % &*PRIME_SUBGROUP_MODULUS)
    }
}

impl Sub for Exponent {
    type Output = Exponent;
    fn sub(self, other: Exponent) -> Exponent {
        &self - &other
    }
}

impl Sub for &Exponent {
    type Output = Exponent;
    fn sub(self, other: &Exponent) -> Exponent {
        let a = &self.exponent;
        let b = &other.exponent;
        Exponent::unchecked((a + &*PRIME_SUBGROUP_MODULUS - b) % &*PRIME_SUBGROUP_MODULUS)
    }
}

impl Mul for Exponent {
    type Output = Exponent;
    fn mul(self, other: Exponent) -> Exponent {
        Exponent::unchecked(self.exponent * other.exponent % &*PRIME_SUBGROUP_MODULUS)
    }
}

impl Mul for &Exponent {
    type Output = Exponent;
    fn mul(self, other: &Exponent) -> Exponent {
        Exponent::unchecked(&self.exponent * &other.exponent % &*PRIME_SUBGROUP_MODULUS)
    }
}

impl Neg for Exponent {
    type Output = Exponent;
    fn neg(self) -> Exponent {
        -&self
    }
}

impl Neg for &Exponent {
    type Output = Exponent;
    fn neg(self) -> Exponent {
        if self.exponent.is_zero() {
            self.clone()
        } else {
            Exponent::unchecked(&*PRIME_SUBGROUP_MODULUS - &self.exponent)
        }
    }
}

impl Pow<&BigUint> for &Exponent {
    type Output = Exponent;
    fn pow(self, other: &BigUint) -> Exponent {
        Exponent::unchecked(self.exponent.modpow(other, &PRIME_SUBGROUP_MODULUS))
    }
}

// BigUint -> Element/Exponent conversion

impl TryFrom<BigUint> for Element {
    type Error = GroupError;

    /// Succeeds iff the value is a member of the order-`q` subgroup.
    fn try_from(number: BigUint) -> Result<Self, Self::Error> {
        if number.is_zero() || number >= *PRIME_MODULUS {
            return Err(GroupError::OutOfRange {
                modulus: "p",
                bits: number.bits(),
            });
        }
        let element = Element { element: number };
        if element.is_valid_residue() {
            Ok(element)
        } else {
            Err(GroupError::NotInSubgroup)
        }
    }
}

impl TryFrom<BigUint> for Exponent {
    type Error = GroupError;

    /// Succeeds iff the value is strictly less than `q`.
    fn try_from(number: BigUint) -> Result<Self, Self::Error> {
        if number < *PRIME_SUBGROUP_MODULUS {
            Ok(Exponent { exponent: number })
        } else {
            Err(GroupError::OutOfRange {
                modulus: "q",
                bits: number.bits(),
            })
        }
    }
}

impl From<u32> for Element {
    /// Reduces modulo `p`.  No subgroup check; callers that need one use `TryFrom<BigUint>`.
    fn from(number: u32) -> Self {
        Element::new(BigUint::from(number))
    }
}

impl From<u32> for Exponent {
    /// Reduces modulo `q`.
    fn from(number: u32) -> Self {
        Exponent::new(BigUint::from(number))
    }
}

impl From<u64> for Exponent {
    fn from(number: u64) -> Self {
        Exponent::new(BigUint::from(number))
    }
}

// The group defined in [IETF RFC 3526](https://tools.ietf.org/html/rfc3526), with a small safe
// prime substituted under `cfg(test)`.

#[cfg(not(test))]
lazy_static! {
    /// The selected safe prime `p = 2q + 1` for all group operations.
    pub static ref PRIME_MODULUS: BigUint = PRIME_1536.clone();

    /// `4 = 2^2` is a quadratic residue and therefore generates the order-`q` subgroup.
    pub static ref GENERATOR: BigUint = BigUint::from(4_u32);
}

#[cfg(test)]
lazy_static! {
    pub static ref PRIME_MODULUS: BigUint = BigUint::from(200087_u32);
    pub static ref GENERATOR: BigUint = BigUint::from(25_u32);
}

lazy_static! {
    static ref PRIME_1536: BigUint = parse_biguint_hex_or_panic(PRIME_HEX_1536);

    /// The order `q = (p - 1) / 2` of the subgroup generated by `g`.
    pub static ref PRIME_SUBGROUP_MODULUS: BigUint =
        (&*PRIME_MODULUS - BigUint::one()) / BigUint::from(2_u8);
}

/// Parse a hex string (which might contain spaces, tabs, or newlines) into a BigUint or panic if
/// it can't be done.  Only used for hard-coded constants.
fn parse_biguint_hex_or_panic(hex: &str) -> BigUint {
    BigUint::from_str_radix(
        &hex.replace([' ', '\n', '\t'], ""),
        16,
    )
    .expect("Invalid hex input for parse_biguint_hex_or_panic")
}

/// The prime modulus for the 1536-bit group
const PRIME_HEX_1536: &str = "FFFFFFFF FFFFFFFF C90FDAA2 2168C234 C4C6628B 80DC1CD1
     29024E08 8A67CC74 020BBEA6 3B139B22 514A0879 8E3404DD
     EF9519B3 CD3A431B 302B0A6D F25F1437 4FE1356D 6D51C245
     E485B576 625E7EC6 F44C42E9 A637ED6B 0BFF5CB6 F406B7ED
     EE386BFB 5A899FA5 AE9F2411 7C4B1FE6 49286651 ECE45B3D
     C2007CB8 A163BF05 98DA4836 1C55D39A 69163FA8 FD24CF5F
     83655D23 DCA3AD96 1C62F356 208552BB 9ED52907 7096966D
     670C354E 4ABC9804 F1746C08 CA237327 FFFFFFFF FFFFFFFF";

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn production_prime_parses() {
        assert_eq!(PRIME_1536.bits(), 1536);
    }

    #[test]
    fn generator_has_subgroup_order() {
        assert!(generator().is_valid_residue());
        assert!(!generator().as_uint().is_one());
    }

    #[test]
    fn exponent_inverse_round_trips() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let x = Exponent::random(&mut rng);
            match x.inverse() {
                Some(inv) => assert!((&x * &inv).is_one()),
                None => assert!(x.is_zero()),
            }
        }
        assert!(Exponent::zero().inverse().is_none());
    }

    #[test]
    fn subtraction_wraps_below_zero() {
        let a: Exponent = 3_u32.into();
        let b: Exponent = 5_u32.into();
        assert_eq!(&(&a - &b) + &b, a);
        assert_eq!(-&b + b.clone(), Exponent::zero());
    }

    #[test]
    fn residue_check_rejects_non_members() {
        // p = 3 (mod 4), so -1 is a non-residue.
        let squared = Element::new(BigUint::from(5_u32)).pow(&BigUint::from(2_u32));
        assert!(squared.is_valid_residue());
        assert!(!Element::new(prime() - 1_u32).is_valid_residue());
        assert!(!Element::new(BigUint::zero()).is_valid_residue());
        assert!(Element::try_from(prime().clone()).is_err());
        assert!(Exponent::try_from(subgroup_prime().clone()).is_err());
    }

    #[test]
    fn power_laws_hold() {
        let a: Exponent = 1234_u32.into();
        let b: Exponent = 4321_u32.into();
        assert_eq!(gen_pow(&(&a + &b)), &gen_pow(&a) * &gen_pow(&b));
        assert_eq!(gen_pow(&(&a * &b)), gen_pow(&a).pow(&b));
        assert_eq!(&gen_pow(&a) / &gen_pow(&a), Element::one());
    }
}
