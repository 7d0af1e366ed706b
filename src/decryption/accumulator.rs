//! Combining verified partial decryptions into `M̄ = Π M_i^{w_i}` and recovering the count.

use num::traits::{One, Pow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

use crate::ballot::{CiphertextContest, CiphertextSelection};
use crate::crypto::chaum_pedersen;
use crate::crypto::dlog::DiscreteLog;
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{Element, Exponent};
use crate::decryption::share::{
    is_valid_partial_decryption, BallotShare, CiphertextDecryptionContest,
    CiphertextDecryptionSelection, TallyShare,
};
use crate::decryption::tally::PlaintextTallySelection;
use crate::errors::{DecryptionError, ShareError};

/// One participating guardian: who it is, the key its shares are checked against, and its
/// shares for every contest being decrypted.
#[derive(Debug, Clone, Copy)]
pub struct Participant<'a> {
    pub guardian_id: &'a str,
    pub share_key: &'a Element,
    pub contests: &'a BTreeMap<String, CiphertextDecryptionContest>,
}

impl<'a> Participant<'a> {
    pub fn from_tally_share(share: &'a TallyShare, share_key: &'a Element) -> Self {
        Participant {
            guardian_id: &share.guardian_id,
            share_key,
            contests: &share.contests,
        }
    }

    pub fn from_ballot_share(share: &'a BallotShare, share_key: &'a Element) -> Self {
        Participant {
            guardian_id: &share.guardian_id,
            share_key,
            contests: &share.contests,
        }
    }
}

/// One guardian's piece of an aggregate decryption proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareComponent {
    pub guardian_id: String,
    /// `K_i = g^{P(x_i)}`.
    pub share_key: Element,
    /// The Lagrange weight `w_i` for the participating set.
    pub coefficient: Exponent,
    /// `M_i = A^{P(x_i)}`.
    pub share: Element,
    pub proof: chaum_pedersen::Proof,
}

/// Evidence that `M̄` is `A^s` for the joint secret `s`, checkable without trusting any
/// guardian: every `M_i` is proven against its `K_i`, the weighted `K_i` recombine to the joint
/// key `K`, and the same weights recombine the `M_i` to `M̄`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDecryptionProof {
    pub components: Vec<ShareComponent>,
}

impl AggregateDecryptionProof {
    pub fn verify(
        &self,
        selection_id: &str,
        ciphertext: &Ciphertext,
        public_key: &Element,
        combined: &Element,
        extended_base_hash: &Exponent,
    ) -> Result<(), DecryptionError> {
        if self.components.is_empty() {
            return Err(DecryptionError::NoShares {
                selection_id: selection_id.to_string(),
            });
        }
        for component in &self.components {
            if !is_valid_partial_decryption(
                ciphertext,
                &component.share_key,
                &component.share,
                &component.proof,
                extended_base_hash,
            ) {
                return Err(DecryptionError::InvalidGuardian {
                    guardian_id: component.guardian_id.clone(),
                    source: ShareError::InvalidProof {
                        guardian_id: component.guardian_id.clone(),
                        selection_id: selection_id.to_string(),
                    },
                });
            }
        }

        let key = weighted_product(self.components.iter().map(|c| (&c.share_key, &c.coefficient)));
        let value = weighted_product(self.components.iter().map(|c| (&c.share, &c.coefficient)));
        if key != *public_key || value != *combined {
            return Err(DecryptionError::AggregateProof {
                selection_id: selection_id.to_string(),
            });
        }
        Ok(())
    }
}

fn weighted_product<'a>(terms: impl Iterator<Item = (&'a Element, &'a Exponent)>) -> Element {
    terms.fold(Element::one(), |acc, (base, weight)| &acc * &base.pow(weight))
}

/// A selection whose shares have been combined but not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedSelection {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub message: Ciphertext,
    /// `M̄ = A^s`.
    pub value: Element,
    pub proof: AggregateDecryptionProof,
}

impl AccumulatedSelection {
    /// Find `t ≤ bound` with `K^t = B / M̄`.
    pub fn decrypt(&self, dlog: &DiscreteLog, bound: u64) -> Result<PlaintextTallySelection, DecryptionError> {
        let encoded = &self.message.data / &self.value;
        let tally = dlog.find(&encoded, bound).ok_or_else(|| {
            warn!(selection_id = %self.object_id, bound, "decryption not found");
            DecryptionError::NotFound {
                selection_id: self.object_id.clone(),
                bound,
            }
        })?;
        Ok(PlaintextTallySelection {
            object_id: self.object_id.clone(),
            sequence_order: self.sequence_order,
            description_hash: self.description_hash.clone(),
            tally,
            value: encoded,
            message: self.message.clone(),
            proof: self.proof.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedContest {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub selections: BTreeMap<String, AccumulatedSelection>,
}

/// Combine one selection's shares, weighting each guardian's share by its coefficient.
///
/// Unless `skip_validation` is set, every share is verified first and the first invalid one
/// aborts the selection.  `coefficients` must be computed over exactly the guardians in
/// `shares`.
#[instrument(level = "debug", skip_all, fields(selection_id = %selection.object_id()))]
pub fn accumulate_selection<S: CiphertextSelection + ?Sized>(
    selection: &S,
    shares: &[(&Element, &CiphertextDecryptionSelection)],
    coefficients: &BTreeMap<String, Exponent>,
    extended_base_hash: &Exponent,
    skip_validation: bool,
) -> Result<AccumulatedSelection, DecryptionError> {
    if shares.is_empty() {
        return Err(DecryptionError::NoShares {
            selection_id: selection.object_id().to_string(),
        });
    }
    if let Some(absent) = coefficients
        .keys()
        .find(|id| !shares.iter().any(|(_, share)| &share.guardian_id == *id))
    {
        return Err(DecryptionError::MissingShare {
            guardian_id: absent.clone(),
            object_id: selection.object_id().to_string(),
        });
    }

    let mut components = Vec::with_capacity(shares.len());
    for &(share_key, share) in shares {
        if !skip_validation {
            share
                .verify(selection, share_key, extended_base_hash)
                .map_err(|source| {
                    warn!(guardian_id = %share.guardian_id, error = %source, "invalid share");
                    DecryptionError::InvalidGuardian {
                        guardian_id: share.guardian_id.clone(),
                        source,
                    }
                })?;
        }
        let coefficient = coefficients.get(&share.guardian_id).ok_or_else(|| {
            DecryptionError::MissingCoefficient {
                guardian_id: share.guardian_id.clone(),
            }
        })?;
        components.push(ShareComponent {
            guardian_id: share.guardian_id.clone(),
            share_key: share_key.clone(),
            coefficient: coefficient.clone(),
            share: share.share.clone(),
            proof: share.proof.clone(),
        });
    }

    let value = weighted_product(components.iter().map(|c| (&c.share, &c.coefficient)));
    Ok(AccumulatedSelection {
        object_id: selection.object_id().to_string(),
        sequence_order: selection.sequence_order(),
        description_hash: selection.description_hash().clone(),
        message: selection.ciphertext().into_owned(),
        value,
        proof: AggregateDecryptionProof { components },
    })
}

/// Combine every vote selection of `contest` from each participant's shares.
pub fn accumulate_contest<C: CiphertextContest>(
    contest: &C,
    participants: &[Participant<'_>],
    coefficients: &BTreeMap<String, Exponent>,
    extended_base_hash: &Exponent,
    skip_validation: bool,
) -> Result<AccumulatedContest, DecryptionError> {
    let contest_shares = participants
        .iter()
        .map(|p| {
            p.contests
                .get(contest.object_id())
                .map(|c| (p.share_key, c))
                .ok_or_else(|| DecryptionError::MissingShare {
                    guardian_id: p.guardian_id.to_string(),
                    object_id: contest.object_id().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut selections = BTreeMap::new();
    for selection in contest.vote_selections() {
        let shares = contest_shares
            .iter()
            .map(|&(share_key, contest_share)| {
                contest_share
                    .selections
                    .get(selection.object_id())
                    .map(|s| (share_key, s))
                    .ok_or_else(|| DecryptionError::MissingShare {
                        guardian_id: contest_share.guardian_id.clone(),
                        object_id: selection.object_id().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let accumulated = accumulate_selection(
            selection,
            &shares,
            coefficients,
            extended_base_hash,
            skip_validation,
        )?;
        selections.insert(selection.object_id().to_string(), accumulated);
    }

    Ok(AccumulatedContest {
        object_id: contest.object_id().to_string(),
        sequence_order: contest.sequence_order(),
        description_hash: contest.description_hash().clone(),
        selections,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ballot::BallotBoxState;
    use crate::decryption::lagrange::compute_lagrange_coefficients;
    use crate::generate;
    use crate::guardian::share_public_key;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Three guardians, quorum two, one selection holding three votes for "measure-a-yes".
    struct Fixture {
        election: generate::Election,
        tally: crate::tally::CiphertextTally,
        shares: Vec<(Element, CiphertextDecryptionSelection)>,
    }

    fn fixture(seed: u64) -> Fixture {
        let mut rng = StdRng::seed_from_u64(seed);
        let election = generate::election(&mut rng, 3, 2, generate::sample_manifest()).unwrap();
        let tally = election.tally("t");
        for i in 0..3 {
            let ballot = election.encrypt_ballot(&mut rng, &format!("b{}", i), "style-county", &["measure-a-yes"], BallotBoxState::Cast);
            assert!(tally.accumulate(&ballot, false).is_ok());
        }
        let selection = &tally.contests["measure-a"].selections["measure-a-yes"];
        let hash = &election.context.crypto_extended_base_hash;
        let shares = election
            .ceremony
            .key_shares
            .iter()
            .map(|g| {
                let key = share_public_key(g.sequence_order, &election.ceremony.public_keys);
                (key, g.compute_share(selection, hash, &Exponent::random(&mut rng)))
            })
            .collect();
        Fixture { election, tally, shares }
    }

    fn combine(fixture: &Fixture, which: &[usize], skip_validation: bool) -> Result<AccumulatedSelection, DecryptionError> {
        let chosen: Vec<_> = which.iter().map(|&i| (&fixture.shares[i].0, &fixture.shares[i].1)).collect();
        let coefficients = compute_lagrange_coefficients(which.iter().map(|&i| {
            let g = &fixture.election.ceremony.key_shares[i];
            (g.guardian_id.as_str(), g.sequence_order)
        }))
        .unwrap();
        accumulate_selection(
            &fixture.tally.contests["measure-a"].selections["measure-a-yes"],
            &chosen,
            &coefficients,
            &fixture.election.context.crypto_extended_base_hash,
            skip_validation,
        )
    }

    #[test]
    fn every_quorum_recovers_the_same_count() {
        let fixture = fixture(51);
        let dlog = DiscreteLog::new(fixture.election.context.elgamal_public_key.clone());
        for which in [&[0, 1][..], &[1, 2][..], &[0, 2][..], &[0, 1, 2][..]] {
            let accumulated = combine(&fixture, which, false).unwrap();
            let plaintext = accumulated.decrypt(&dlog, 3).unwrap();
            assert_eq!(plaintext.tally, 3);
            assert_eq!(
                accumulated.proof.verify(
                    "measure-a-yes",
                    &accumulated.message,
                    &fixture.election.context.elgamal_public_key,
                    &accumulated.value,
                    &fixture.election.context.crypto_extended_base_hash,
                ),
                Ok(())
            );
        }
    }

    #[test]
    fn a_bound_below_the_count_is_not_found() {
        let fixture = fixture(52);
        let dlog = DiscreteLog::new(fixture.election.context.elgamal_public_key.clone());
        let accumulated = combine(&fixture, &[0, 2], false).unwrap();
        assert_eq!(
            accumulated.decrypt(&dlog, 2),
            Err(DecryptionError::NotFound {
                selection_id: "measure-a-yes".to_string(),
                bound: 2
            })
        );
    }

    #[test]
    fn an_invalid_share_names_its_guardian() {
        let mut fixture = fixture(53);
        let bad = &mut fixture.shares[1].1;
        bad.share = &bad.share * &bad.share;
        let guardian_id = bad.guardian_id.clone();

        match combine(&fixture, &[0, 1], false) {
            Err(DecryptionError::InvalidGuardian { guardian_id: g, .. }) => assert_eq!(g, guardian_id),
            other => panic!("unexpected {:?}", other),
        }
        // Skipping validation combines it anyway, and the aggregate proof catches it.
        let accumulated = combine(&fixture, &[0, 1], true).unwrap();
        assert!(accumulated
            .proof
            .verify(
                "measure-a-yes",
                &accumulated.message,
                &fixture.election.context.elgamal_public_key,
                &accumulated.value,
                &fixture.election.context.crypto_extended_base_hash,
            )
            .is_err());
    }

    #[test]
    fn coefficients_for_absent_guardians_are_rejected() {
        let fixture = fixture(54);
        let coefficients = compute_lagrange_coefficients(
            fixture
                .election
                .ceremony
                .key_shares
                .iter()
                .map(|g| (g.guardian_id.as_str(), g.sequence_order)),
        )
        .unwrap();
        let chosen = vec![(&fixture.shares[0].0, &fixture.shares[0].1)];
        assert!(matches!(
            accumulate_selection(
                &fixture.tally.contests["measure-a"].selections["measure-a-yes"],
                &chosen,
                &coefficients,
                &fixture.election.context.crypto_extended_base_hash,
                false,
            ),
            Err(DecryptionError::MissingShare { .. })
        ));
    }
}
