//! Lagrange coefficients for threshold reconstruction.
//!
//! For participating guardians at sequence orders `x_1, ..., x_k`, the coefficient of guardian
//! `i` is the Lagrange basis polynomial for `x_i` evaluated at zero:
//!
//! ```text
//! w_i = Π_{j ≠ i} x_j / (x_j - x_i)   (mod q)
//! ```
//!
//! so that `Σ w_i P(x_i) = P(0)` for any polynomial `P` of degree below `k`.  The coefficients
//! depend only on who participates, never on any secret.

use num::traits::One;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::crypto::group::Exponent;
use crate::errors::LagrangeError;

/// Compute `w_i` for every `(guardian_id, sequence_order)` in `guardians`, using only the
/// guardians listed.
#[instrument(level = "debug", skip_all)]
pub fn compute_lagrange_coefficients<'a>(
    guardians: impl IntoIterator<Item = (&'a str, u32)>,
) -> Result<BTreeMap<String, Exponent>, LagrangeError> {
    let guardians: Vec<(&str, u32)> = guardians.into_iter().collect();
    if guardians.is_empty() {
        return Err(LagrangeError::Empty);
    }

    let mut seen = BTreeMap::new();
    for &(guardian_id, sequence_order) in &guardians {
        if sequence_order == 0 {
            return Err(LagrangeError::ZeroSequenceOrder {
                guardian_id: guardian_id.to_string(),
            });
        }
        if seen.insert(guardian_id, sequence_order).is_some() {
            return Err(LagrangeError::DuplicateGuardian {
                guardian_id: guardian_id.to_string(),
            });
        }
    }

    let coefficients = guardians
        .iter()
        .map(|&(guardian_id, x_i)| {
            let coefficient = coefficient_at_zero(guardian_id, x_i, &guardians)?;
            Ok((guardian_id.to_string(), coefficient))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    debug!(guardians = coefficients.len(), "lagrange coefficients computed");
    Ok(coefficients)
}

fn coefficient_at_zero(
    guardian_id: &str,
    x_i: u32,
    guardians: &[(&str, u32)],
) -> Result<Exponent, LagrangeError> {
    let x_i = Exponent::from(x_i);
    let mut coefficient = Exponent::one();

    for &(other_id, x_j) in guardians {
        if other_id == guardian_id {
            continue;
        }
        let x_j_exp = Exponent::from(x_j);
        // Only equal sequence orders (mod q) give a zero, and hence uninvertible, difference.
        let inverse = (&x_j_exp - &x_i).inverse().ok_or_else(|| {
            LagrangeError::DuplicateSequenceOrder {
                sequence_order: x_j,
                first: guardian_id.to_string(),
                second: other_id.to_string(),
            }
        })?;
        coefficient = &coefficient * &(&x_j_exp * &inverse);
    }
    Ok(coefficient)
}

#[cfg(test)]
mod test {
    use super::*;
    use num::traits::Zero;

    /// `P(x) = 17 + 5x + 9x^2`.
    fn polynomial(x: u32) -> Exponent {
        let x = Exponent::from(x);
        let a: [Exponent; 3] = [17_u32.into(), 5_u32.into(), 9_u32.into()];
        &(&a[0] + &(&a[1] * &x)) + &(&a[2] * &(&x * &x))
    }

    fn reconstruct(points: &[(&str, u32)]) -> Exponent {
        let coefficients = compute_lagrange_coefficients(points.iter().copied()).unwrap();
        points.iter().fold(Exponent::zero(), |acc, (id, x)| {
            &acc + &(&coefficients[*id] * &polynomial(*x))
        })
    }

    #[test]
    fn any_quorum_reconstructs_the_constant_term() {
        let expected = Exponent::from(17_u32);
        assert_eq!(reconstruct(&[("a", 1), ("b", 2), ("c", 3)]), expected);
        assert_eq!(reconstruct(&[("b", 2), ("d", 4), ("e", 5)]), expected);
        assert_eq!(reconstruct(&[("a", 1), ("c", 3), ("d", 4), ("e", 5)]), expected);
    }

    #[test]
    fn coefficients_depend_on_the_participant_set() {
        let first = compute_lagrange_coefficients([("a", 1), ("b", 2)]).unwrap();
        let second = compute_lagrange_coefficients([("a", 1), ("c", 3)]).unwrap();
        assert_ne!(first["a"], second["a"]);
        // w_1 = 2 / (2 - 1) = 2
        assert_eq!(first["a"], Exponent::from(2_u32));
        // A lone guardian holds the whole secret.
        let alone = compute_lagrange_coefficients([("a", 7)]).unwrap();
        assert_eq!(alone["a"], Exponent::one());
    }

    #[test]
    fn degenerate_input_is_rejected() {
        assert_eq!(
            compute_lagrange_coefficients(Vec::<(&str, u32)>::new()),
            Err(LagrangeError::Empty)
        );
        assert_eq!(
            compute_lagrange_coefficients([("a", 1), ("b", 0)]),
            Err(LagrangeError::ZeroSequenceOrder {
                guardian_id: "b".to_string()
            })
        );
        assert_eq!(
            compute_lagrange_coefficients([("a", 1), ("a", 2)]),
            Err(LagrangeError::DuplicateGuardian {
                guardian_id: "a".to_string()
            })
        );
        assert_eq!(
            compute_lagrange_coefficients([("a", 3), ("b", 3)]),
            Err(LagrangeError::DuplicateSequenceOrder {
                sequence_order: 3,
                first: "a".to_string(),
                second: "b".to_string()
            })
        );
    }
}
