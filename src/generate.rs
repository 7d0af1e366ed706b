//! Synthetic elections for tests and benchmarks.
//!
//! Runs a simplified key ceremony in one place (every guardian's polynomial is known here, which
//! a real ceremony never allows), and encrypts ballots with valid proofs under the resulting
//! joint key.

use num::traits::{One, Zero};
use rand::Rng;

use crate::ballot::{BallotBoxState, CiphertextBallot, CiphertextBallotContest, CiphertextBallotSelection};
use crate::crypto::chaum_pedersen::{self, disj};
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{gen_pow, Element, Exponent};
use crate::crypto::hash::{constant_challenge, selection_challenge};
use crate::crypto::schnorr;
use crate::election::CiphertextElectionContext;
use crate::errors::ElectionError;
use crate::guardian::{commitment_hash, joint_public_key, ElectionPublicKey, GuardianKeyShare};
use crate::manifest::{BallotStyle, ContestDescription, InternalManifest, Manifest, SelectionDescription};
use crate::tally::CiphertextTally;

/// A small manifest with two contests in overlapping districts:
///
/// * `measure-a` (county-wide, vote for one): `measure-a-yes`, `measure-a-no`
/// * `council` (ward 1, vote for two): `council-ada`, `council-bo`, `council-cy`
///
/// `style-both` carries both contests, `style-county` only the measure.
pub fn sample_manifest() -> Manifest {
    let selection = |id: &str, sequence_order| SelectionDescription {
        object_id: id.to_string(),
        sequence_order,
        candidate_id: format!("{}-candidate", id),
    };
    Manifest {
        election_scope_id: "sample-general".to_string(),
        ballot_styles: vec![
            BallotStyle {
                object_id: "style-both".to_string(),
                geopolitical_unit_ids: vec!["county".to_string(), "ward-1".to_string()],
            },
            BallotStyle {
                object_id: "style-county".to_string(),
                geopolitical_unit_ids: vec!["county".to_string()],
            },
        ],
        contests: vec![
            ContestDescription {
                object_id: "measure-a".to_string(),
                sequence_order: 0,
                electoral_district_id: "county".to_string(),
                name: "Measure A".to_string(),
                number_elected: 1,
                ballot_selections: vec![selection("measure-a-yes", 0), selection("measure-a-no", 1)],
            },
            ContestDescription {
                object_id: "council".to_string(),
                sequence_order: 1,
                electoral_district_id: "ward-1".to_string(),
                name: "Ward 1 Council".to_string(),
                number_elected: 2,
                ballot_selections: vec![
                    selection("council-ada", 0),
                    selection("council-bo", 1),
                    selection("council-cy", 2),
                ],
            },
        ],
    }
}

pub struct KeyCeremony {
    pub public_keys: Vec<ElectionPublicKey>,
    /// `key_shares[i]` belongs to the guardian at `public_keys[i]`.
    pub key_shares: Vec<GuardianKeyShare>,
}

/// Run a key ceremony for `number_of_guardians` guardians with the given quorum.  Guardian `i`
/// (zero-based) is `guardian-{i+1}` at sequence order `i + 1`.
pub fn key_ceremony(
    rng: &mut (impl Rng + ?Sized),
    number_of_guardians: u32,
    quorum: u32,
) -> KeyCeremony {
    let polynomials: Vec<Vec<Exponent>> = (0..number_of_guardians)
        .map(|_| (0..quorum).map(|_| Exponent::random(rng)).collect())
        .collect();

    let public_keys: Vec<ElectionPublicKey> = polynomials
        .iter()
        .zip(1..)
        .map(|(coefficients, sequence_order)| {
            let coefficient_commitments: Vec<_> = coefficients.iter().map(gen_pow).collect();
            let coefficient_proofs = coefficients
                .iter()
                .map(|a| schnorr::Proof::prove(a, &Exponent::random(rng)))
                .collect();
            ElectionPublicKey {
                owner_id: guardian_id(sequence_order),
                sequence_order,
                key: coefficient_commitments.first().cloned().unwrap_or_else(Element::one),
                coefficient_commitments,
                coefficient_proofs,
            }
        })
        .collect();

    // Guardian i's share is Σ_j P_j(x_i); in a real ceremony each P_j(x_i) travels privately.
    let key_shares = (1..=number_of_guardians)
        .map(|sequence_order| {
            let x = Exponent::from(sequence_order);
            let secret = polynomials
                .iter()
                .fold(Exponent::zero(), |acc, coefficients| &acc + &evaluate(coefficients, &x));
            GuardianKeyShare::new(guardian_id(sequence_order), sequence_order, secret)
        })
        .collect();

    KeyCeremony {
        public_keys,
        key_shares,
    }
}

fn guardian_id(sequence_order: u32) -> String {
    format!("guardian-{}", sequence_order)
}

/// Horner evaluation of `Σ_m a_m x^m`.
fn evaluate(coefficients: &[Exponent], x: &Exponent) -> Exponent {
    coefficients
        .iter()
        .rev()
        .fold(Exponent::zero(), |acc, a| &(&acc * x) + a)
}

pub struct Election {
    pub manifest: InternalManifest,
    pub context: CiphertextElectionContext,
    pub ceremony: KeyCeremony,
}

/// A complete election: key ceremony, manifest and context.
pub fn election(
    rng: &mut (impl Rng + ?Sized),
    number_of_guardians: u32,
    quorum: u32,
    manifest: Manifest,
) -> Result<Election, ElectionError> {
    let ceremony = key_ceremony(rng, number_of_guardians, quorum);
    let manifest = InternalManifest::new(manifest);
    let context = CiphertextElectionContext::new(
        number_of_guardians,
        quorum,
        joint_public_key(&ceremony.public_keys),
        commitment_hash(&ceremony.public_keys),
        manifest.manifest_hash.clone(),
    )?;
    Ok(Election {
        manifest,
        context,
        ceremony,
    })
}

impl Election {
    /// An empty tally for this election.
    pub fn tally(&self, object_id: &str) -> CiphertextTally {
        CiphertextTally::new(
            object_id,
            format!("{} tally", self.manifest.manifest.election_scope_id),
            self.manifest.clone(),
            self.context.clone(),
        )
    }

    /// Encrypt a ballot of style `style_id` voting for the selections in `votes`.
    ///
    /// Undervotes are filled with placeholder votes.  Voting for more selections than a contest
    /// allows still produces a ballot, but its contest proof does not verify.  An unknown style
    /// gives a ballot with no contests.
    pub fn encrypt_ballot(
        &self,
        rng: &mut (impl Rng + ?Sized),
        object_id: &str,
        style_id: &str,
        votes: &[&str],
        state: BallotBoxState,
    ) -> CiphertextBallot {
        let public_key = &self.context.elgamal_public_key;
        let extended_base_hash = &self.context.crypto_extended_base_hash;

        let contests = self
            .manifest
            .contests_for(style_id)
            .unwrap_or_default()
            .into_iter()
            .map(|description| {
                let number_elected = description.description.number_elected;
                let real_votes = description
                    .description
                    .ballot_selections
                    .iter()
                    .filter(|s| votes.contains(&s.object_id.as_str()))
                    .count() as u32;
                let mut placeholder_votes = number_elected.saturating_sub(real_votes);

                let mut nonce_sum = Exponent::zero();
                let ballot_selections: Vec<_> = description
                    .all_selections()
                    .map(|(selection, is_placeholder)| {
                        let vote = if is_placeholder {
                            let vote = placeholder_votes > 0;
                            placeholder_votes = placeholder_votes.saturating_sub(1);
                            vote
                        } else {
                            votes.contains(&selection.object_id.as_str())
                        };
                        let nonce = Exponent::random(rng);
                        let ciphertext = Ciphertext::encrypt(public_key, &u32::from(vote).into(), &nonce);
                        let proof = disj::Proof::prove(
                            public_key,
                            &ciphertext,
                            &nonce,
                            vote,
                            &Exponent::random(rng),
                            &Exponent::random(rng),
                            &Exponent::random(rng),
                            |msg, comm0, comm1| selection_challenge(extended_base_hash, msg, comm0, comm1),
                        );
                        nonce_sum = &nonce_sum + &nonce;
                        CiphertextBallotSelection {
                            object_id: selection.object_id.clone(),
                            sequence_order: selection.sequence_order,
                            description_hash: selection.crypto_hash(),
                            ciphertext,
                            is_placeholder_selection: is_placeholder,
                            proof,
                        }
                    })
                    .collect();

                let selection_sum: Ciphertext = ballot_selections.iter().map(|s| &s.ciphertext).sum();
                let proof = chaum_pedersen::Proof::prove_plaintext(
                    public_key,
                    &selection_sum,
                    &nonce_sum,
                    &number_elected.into(),
                    &Exponent::random(rng),
                    |msg, comm| constant_challenge(extended_base_hash, msg, comm),
                );
                CiphertextBallotContest {
                    object_id: description.object_id().to_string(),
                    sequence_order: description.description.sequence_order,
                    description_hash: description.crypto_hash(),
                    ballot_selections,
                    proof,
                }
            })
            .collect();

        CiphertextBallot {
            object_id: object_id.to_string(),
            style_id: style_id.to_string(),
            manifest_hash: self.manifest.manifest_hash.clone(),
            contests,
            state,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn invalid_quorum_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            election(&mut rng, 2, 3, sample_manifest()),
            Err(ElectionError::InvalidQuorum { quorum: 3, number_of_guardians: 2 })
        ));
    }

    #[test]
    fn secret_shares_reconstruct_the_joint_secret() {
        let mut rng = StdRng::seed_from_u64(2);
        let ceremony = key_ceremony(&mut rng, 3, 2);
        // With quorum 2 every polynomial is a line, so 2 P(1) - P(2) = P(0).
        let p1 = &ceremony.key_shares[0].secret;
        let p2 = &ceremony.key_shares[1].secret;
        let secret = &(p1 + p1) - p2;
        assert_eq!(gen_pow(&secret), joint_public_key(&ceremony.public_keys));
    }

    #[test]
    fn placeholders_fill_undervotes() {
        let mut rng = StdRng::seed_from_u64(3);
        let election = election(&mut rng, 1, 1, sample_manifest()).unwrap();
        let secret = &election.ceremony.key_shares[0].secret;
        let ballot = election.encrypt_ballot(&mut rng, "b", "style-both", &["council-cy"], BallotBoxState::Cast);
        let council = &ballot.contests[1];
        let decrypted: Vec<bool> = council
            .ballot_selections
            .iter()
            .map(|s| s.ciphertext.decrypt_known_secret(secret) != Element::one())
            .collect();
        assert_eq!(decrypted, vec![false, false, true, true, false]);
    }
}
