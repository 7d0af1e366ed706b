use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::crypto::chaum_pedersen::{self, disj};
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::Exponent;
use crate::crypto::hash::{constant_challenge, selection_challenge};
use crate::election::CiphertextElectionContext;
use crate::errors::BallotError;
use crate::manifest::{ContestDescriptionWithPlaceholders, InternalManifest};

/// Anything that holds one encrypted selection: a selection on a ballot, or the running sum for
/// that selection in a tally.  Share computation and verification are written against this.
pub trait CiphertextSelection {
    fn object_id(&self) -> &str;
    fn sequence_order(&self) -> u32;
    fn description_hash(&self) -> &Exponent;
    /// Borrowed for ballots; tallies hand out a snapshot of the running sum.
    fn ciphertext(&self) -> Cow<'_, Ciphertext>;
    fn is_placeholder(&self) -> bool {
        false
    }
}

/// A contest made of `CiphertextSelection`s.
pub trait CiphertextContest {
    type Selection: CiphertextSelection;

    fn object_id(&self) -> &str;
    fn sequence_order(&self) -> u32;
    fn description_hash(&self) -> &Exponent;
    /// Selections that carry votes, i.e. everything except placeholders.
    fn vote_selections(&self) -> Box<dyn Iterator<Item = &Self::Selection> + '_>;
}

/// Where a ballot ended up.  Only cast ballots are counted; spoiled ballots are decrypted
/// individually so voters can challenge the encryption device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallotBoxState {
    Cast,
    Spoiled,
    Unknown,
}

/// A single encrypted selection, which contains the encrypted value of the selection (zero or
/// one), as well as a zero-knowledge proof that the encrypted value is either a zero or a one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotSelection {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub ciphertext: Ciphertext,
    pub is_placeholder_selection: bool,
    pub proof: disj::Proof,
}

impl CiphertextSelection for CiphertextBallotSelection {
    fn object_id(&self) -> &str {
        &self.object_id
    }
    fn sequence_order(&self) -> u32 {
        self.sequence_order
    }
    fn description_hash(&self) -> &Exponent {
        &self.description_hash
    }
    fn ciphertext(&self) -> Cow<'_, Ciphertext> {
        Cow::Borrowed(&self.ciphertext)
    }
    fn is_placeholder(&self) -> bool {
        self.is_placeholder_selection
    }
}

/// An encrypted contest.  The proof shows that the selections (placeholders included) add up to
/// exactly `number_elected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotContest {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub ballot_selections: Vec<CiphertextBallotSelection>,
    pub proof: chaum_pedersen::Proof,
}

impl CiphertextBallotContest {
    /// The homomorphic sum of every selection, placeholders included.
    pub fn selection_sum(&self) -> Ciphertext {
        self.ballot_selections.iter().map(|s| &s.ciphertext).sum()
    }
}

impl CiphertextContest for CiphertextBallotContest {
    type Selection = CiphertextBallotSelection;

    fn object_id(&self) -> &str {
        &self.object_id
    }
    fn sequence_order(&self) -> u32 {
        self.sequence_order
    }
    fn description_hash(&self) -> &Exponent {
        &self.description_hash
    }
    fn vote_selections(&self) -> Box<dyn Iterator<Item = &CiphertextBallotSelection> + '_> {
        Box::new(self.ballot_selections.iter().filter(|s| !s.is_placeholder()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallot {
    pub object_id: String,
    pub style_id: String,
    pub manifest_hash: Exponent,
    pub contests: Vec<CiphertextBallotContest>,
    pub state: BallotBoxState,
}

impl CiphertextBallot {
    /// Check that this ballot is well-formed for `manifest` and that every proof on it verifies
    /// under `context`.  The first problem found is returned.
    pub fn check(
        &self,
        manifest: &InternalManifest,
        context: &CiphertextElectionContext,
    ) -> Result<(), BallotError> {
        if self.manifest_hash != manifest.manifest_hash {
            return Err(BallotError::ManifestMismatch {
                ballot_id: self.object_id.clone(),
            });
        }
        let expected =
            manifest
                .contests_for(&self.style_id)
                .ok_or_else(|| BallotError::UnknownStyle {
                    ballot_id: self.object_id.clone(),
                    style_id: self.style_id.clone(),
                })?;

        let mut seen = BTreeSet::new();
        for contest in &self.contests {
            if !seen.insert(contest.object_id.as_str()) {
                return Err(BallotError::DuplicateContest {
                    ballot_id: self.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                });
            }
            let description = expected
                .iter()
                .find(|d| d.object_id() == contest.object_id)
                .ok_or_else(|| BallotError::UnknownContest {
                    ballot_id: self.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                })?;
            self.check_contest(contest, description, context)?;
        }

        if let Some(missing) = expected
            .iter()
            .find(|d| !self.contests.iter().any(|c| c.object_id == d.object_id()))
        {
            return Err(BallotError::MissingContest {
                ballot_id: self.object_id.clone(),
                contest_id: missing.object_id().to_string(),
            });
        }
        Ok(())
    }

    fn check_contest(
        &self,
        contest: &CiphertextBallotContest,
        description: &ContestDescriptionWithPlaceholders,
        context: &CiphertextElectionContext,
    ) -> Result<(), BallotError> {
        let public_key = &context.elgamal_public_key;
        let extended_base_hash = &context.crypto_extended_base_hash;

        if contest.description_hash != description.crypto_hash()
            || contest.sequence_order != description.description.sequence_order
        {
            return Err(BallotError::ContestMismatch {
                ballot_id: self.object_id.clone(),
                contest_id: contest.object_id.clone(),
            });
        }

        let expected_count = description.all_selections().count();
        if contest.ballot_selections.len() != expected_count {
            return Err(BallotError::SelectionCount {
                ballot_id: self.object_id.clone(),
                contest_id: contest.object_id.clone(),
                expected: expected_count,
                actual: contest.ballot_selections.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for selection in &contest.ballot_selections {
            if !seen.insert(selection.object_id.as_str()) {
                return Err(BallotError::DuplicateSelection {
                    ballot_id: self.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                    selection_id: selection.object_id.clone(),
                });
            }
            let matches = description.all_selections().any(|(d, placeholder)| {
                d.object_id == selection.object_id
                    && d.sequence_order == selection.sequence_order
                    && d.crypto_hash() == selection.description_hash
                    && placeholder == selection.is_placeholder_selection
            });
            if !matches {
                return Err(BallotError::SelectionMismatch {
                    ballot_id: self.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                    selection_id: selection.object_id.clone(),
                });
            }
            if !selection.ciphertext.is_valid() {
                return Err(BallotError::InvalidCiphertext {
                    ballot_id: self.object_id.clone(),
                    selection_id: selection.object_id.clone(),
                });
            }
            let status =
                selection
                    .proof
                    .check_zero_one(public_key, &selection.ciphertext, |msg, comm0, comm1| {
                        selection_challenge(extended_base_hash, msg, comm0, comm1)
                    });
            if !status.is_ok() {
                return Err(BallotError::SelectionProof {
                    ballot_id: self.object_id.clone(),
                    selection_id: selection.object_id.clone(),
                });
            }
        }

        let number_elected = Exponent::from(description.description.number_elected);
        let status = contest.proof.check_plaintext(
            public_key,
            &contest.selection_sum(),
            &number_elected,
            |msg, comm| constant_challenge(extended_base_hash, msg, comm),
        );
        if !status.is_ok() {
            return Err(BallotError::ContestProof {
                ballot_id: self.object_id.clone(),
                contest_id: contest.object_id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::generate::{self, Election};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn election(rng: &mut StdRng) -> Election {
        generate::election(rng, 3, 2, generate::sample_manifest()).unwrap()
    }

    #[test]
    fn generated_ballots_check() {
        let mut rng = StdRng::seed_from_u64(21);
        let election = election(&mut rng);
        for (style, votes) in [
            ("style-both", vec!["measure-a-yes", "council-ada", "council-cy"]),
            ("style-both", vec!["council-bo"]),
            ("style-county", vec![]),
        ] {
            let ballot = election.encrypt_ballot(&mut rng, "b", style, &votes, BallotBoxState::Cast);
            assert_eq!(ballot.check(&election.manifest, &election.context), Ok(()));
        }
    }

    #[test]
    fn overvote_fails_contest_proof() {
        let mut rng = StdRng::seed_from_u64(22);
        let election = election(&mut rng);
        let ballot = election.encrypt_ballot(
            &mut rng,
            "overvote",
            "style-county",
            &["measure-a-yes", "measure-a-no"],
            BallotBoxState::Cast,
        );
        assert_eq!(
            ballot.check(&election.manifest, &election.context),
            Err(BallotError::ContestProof {
                ballot_id: "overvote".to_string(),
                contest_id: "measure-a".to_string()
            })
        );
    }

    #[test]
    fn structural_problems_are_named() {
        let mut rng = StdRng::seed_from_u64(23);
        let election = election(&mut rng);
        let ballot = election.encrypt_ballot(
            &mut rng,
            "b1",
            "style-both",
            &["measure-a-no"],
            BallotBoxState::Cast,
        );

        let mut wrong_style = ballot.clone();
        wrong_style.style_id = "style-county".to_string();
        assert!(matches!(
            wrong_style.check(&election.manifest, &election.context),
            Err(BallotError::UnknownContest { contest_id, .. }) if contest_id == "council"
        ));

        let mut missing = ballot.clone();
        missing.contests.pop();
        assert!(matches!(
            missing.check(&election.manifest, &election.context),
            Err(BallotError::MissingContest { .. })
        ));

        let mut swapped = ballot.clone();
        let selections = &mut swapped.contests[0].ballot_selections;
        let first = selections[0].ciphertext.clone();
        selections[0].ciphertext = selections[1].ciphertext.clone();
        selections[1].ciphertext = first;
        assert!(matches!(
            swapped.check(&election.manifest, &election.context),
            Err(BallotError::SelectionProof { .. })
        ));

        let mut repeated_contest = ballot.clone();
        repeated_contest.contests.push(ballot.contests[0].clone());
        assert_eq!(
            repeated_contest.check(&election.manifest, &election.context),
            Err(BallotError::DuplicateContest {
                ballot_id: "b1".to_string(),
                contest_id: "measure-a".to_string()
            })
        );

        // Same length as the description, but one selection stands in for another.
        let mut repeated_selection = ballot.clone();
        let selections = &mut repeated_selection.contests[0].ballot_selections;
        selections[1] = selections[0].clone();
        assert_eq!(
            repeated_selection.check(&election.manifest, &election.context),
            Err(BallotError::DuplicateSelection {
                ballot_id: "b1".to_string(),
                contest_id: "measure-a".to_string(),
                selection_id: "measure-a-yes".to_string()
            })
        );

        let mut other_manifest = ballot;
        other_manifest.manifest_hash = 5_u32.into();
        assert!(matches!(
            other_manifest.check(&election.manifest, &election.context),
            Err(BallotError::ManifestMismatch { .. })
        ));
    }
}
