use num::traits::One;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::crypto::group::Element;

/// Lookup table for small discrete logarithms `log_K(K^t) = t`.
///
/// Tallies are bounded by the number of cast ballots, so instead of solving a general discrete
/// log we enumerate `K^0, K^1, ...` until the target shows up.  The table grows lazily and is
/// shared between every selection of a decryption, so each power is computed at most once.
#[derive(Debug)]
pub struct DiscreteLog {
    base: Element,
    table: Mutex<Table>,
}

#[derive(Debug)]
struct Table {
    powers: HashMap<Element, u64>,
    /// `base^exponent`, the largest power computed so far.
    current: Element,
    exponent: u64,
}

impl DiscreteLog {
    pub fn new(base: Element) -> DiscreteLog {
        let mut powers = HashMap::new();
        powers.insert(Element::one(), 0);
        DiscreteLog {
            base,
            table: Mutex::new(Table {
                powers,
                current: Element::one(),
                exponent: 0,
            }),
        }
    }

    /// Find `t` in `0..=max` with `base^t = value`.
    pub fn find(&self, value: &Element, max: u64) -> Option<u64> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(&t) = table.powers.get(value) {
            return if t <= max { Some(t) } else { None };
        }

        while table.exponent < max {
            let next = &table.current * &self.base;
            table.exponent += 1;
            let exponent = table.exponent;
            table.powers.insert(next.clone(), exponent);
            table.current = next;
            if &table.current == value {
                return Some(exponent);
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::group::{gen_pow, Exponent};
    use num::traits::Pow;

    #[test]
    fn finds_small_exponents() {
        let base = gen_pow(&Exponent::from(977_u32));
        let dlog = DiscreteLog::new(base.clone());
        assert_eq!(dlog.find(&Element::one(), 0), Some(0));
        assert_eq!(dlog.find(&base.pow(&Exponent::from(37_u32)), 100), Some(37));
        // Already tabulated values are answered from the cache.
        assert_eq!(dlog.find(&base.pow(&Exponent::from(5_u32)), 100), Some(5));
    }

    #[test]
    fn respects_the_bound() {
        let base = gen_pow(&Exponent::from(977_u32));
        let dlog = DiscreteLog::new(base.clone());
        let target = base.pow(&Exponent::from(12_u32));
        assert_eq!(dlog.find(&target, 11), None);
        assert_eq!(dlog.find(&target, 12), Some(12));
        // Once the table has grown past it, a smaller bound still excludes it.
        assert_eq!(dlog.find(&target, 3), None);
    }
}
