//! Partial decryption shares: what a guardian computes with its secret, and how anyone else
//! checks it.

use num::traits::Pow;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

use crate::ballot::{CiphertextBallot, CiphertextContest, CiphertextSelection};
use crate::crypto::chaum_pedersen;
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{Element, Exponent};
use crate::crypto::hash::decryption_challenge;
use crate::election::CiphertextElectionContext;
use crate::errors::ShareError;
use crate::guardian::GuardianKeyShare;
use crate::tally::CiphertextTally;

/// One guardian's partial decryption `M_i = A^{P(x_i)}` of one selection, with a proof that it
/// used the same exponent as its share public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextDecryptionSelection {
    /// The selection this share decrypts.
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub guardian_id: String,
    pub share: Element,
    pub proof: chaum_pedersen::Proof,
}

impl CiphertextDecryptionSelection {
    /// Check this share against the selection it claims to decrypt and the guardian's share
    /// public key.
    pub fn verify<S: CiphertextSelection + ?Sized>(
        &self,
        selection: &S,
        share_key: &Element,
        extended_base_hash: &Exponent,
    ) -> Result<(), ShareError> {
        if self.object_id != selection.object_id()
            || self.description_hash != *selection.description_hash()
        {
            return Err(ShareError::DescriptionMismatch {
                guardian_id: self.guardian_id.clone(),
                object_id: self.object_id.clone(),
            });
        }
        if !self.share.is_valid_residue() {
            return Err(ShareError::InvalidShare {
                guardian_id: self.guardian_id.clone(),
                selection_id: self.object_id.clone(),
            });
        }
        let ciphertext = selection.ciphertext();
        if !is_valid_partial_decryption(
            &ciphertext,
            share_key,
            &self.share,
            &self.proof,
            extended_base_hash,
        ) {
            return Err(ShareError::InvalidProof {
                guardian_id: self.guardian_id.clone(),
                selection_id: self.object_id.clone(),
            });
        }
        Ok(())
    }
}

/// `g^v = a K_i^c`, `A^v = b M_i^c` and `c = H(Q̄, A, B, K_i, a, b, M_i)`.
pub fn is_valid_partial_decryption(
    ciphertext: &Ciphertext,
    share_key: &Element,
    share: &Element,
    proof: &chaum_pedersen::Proof,
    extended_base_hash: &Exponent,
) -> bool {
    proof
        .check_exp(share_key, &ciphertext.pad, share, |_, commitment| {
            decryption_challenge(extended_base_hash, ciphertext, share_key, commitment, share)
        })
        .is_ok()
}

/// One guardian's shares for every vote selection of a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextDecryptionContest {
    pub object_id: String,
    pub guardian_id: String,
    pub description_hash: Exponent,
    pub selections: BTreeMap<String, CiphertextDecryptionSelection>,
}

/// One guardian's contribution to decrypting a tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyShare {
    /// The tally id.
    pub object_id: String,
    pub guardian_id: String,
    /// The guardian's share public key `g^{P(x_i)}`.
    pub public_key: Element,
    pub contests: BTreeMap<String, CiphertextDecryptionContest>,
}

impl TallyShare {
    pub fn verify(
        &self,
        tally: &CiphertextTally,
        guardian_id: &str,
        share_key: &Element,
    ) -> Result<(), ShareError> {
        check_header(
            &self.object_id,
            &tally.object_id,
            &self.guardian_id,
            guardian_id,
            &self.public_key,
            share_key,
        )?;
        verify_contests(
            guardian_id,
            &self.contests,
            tally.contests.values(),
            share_key,
            &tally.context.crypto_extended_base_hash,
        )
    }
}

/// One guardian's contribution to decrypting a spoiled ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotShare {
    /// The ballot id.
    pub object_id: String,
    pub guardian_id: String,
    pub public_key: Element,
    pub style_id: String,
    pub manifest_hash: Exponent,
    pub contests: BTreeMap<String, CiphertextDecryptionContest>,
}

impl BallotShare {
    pub fn verify(
        &self,
        ballot: &CiphertextBallot,
        guardian_id: &str,
        share_key: &Element,
        context: &CiphertextElectionContext,
    ) -> Result<(), ShareError> {
        check_header(
            &self.object_id,
            &ballot.object_id,
            &self.guardian_id,
            guardian_id,
            &self.public_key,
            share_key,
        )?;
        if self.manifest_hash != ballot.manifest_hash {
            return Err(ShareError::ManifestMismatch {
                guardian_id: self.guardian_id.clone(),
                ballot_id: self.object_id.clone(),
            });
        }
        if self.style_id != ballot.style_id {
            return Err(ShareError::StyleMismatch {
                guardian_id: self.guardian_id.clone(),
                ballot_id: self.object_id.clone(),
                expected: ballot.style_id.clone(),
                actual: self.style_id.clone(),
            });
        }
        verify_contests(
            guardian_id,
            &self.contests,
            ballot.contests.iter(),
            share_key,
            &context.crypto_extended_base_hash,
        )
    }
}

fn check_header(
    object_id: &str,
    expected_object_id: &str,
    guardian_id: &str,
    expected_guardian_id: &str,
    public_key: &Element,
    share_key: &Element,
) -> Result<(), ShareError> {
    if guardian_id != expected_guardian_id {
        return Err(ShareError::GuardianMismatch {
            object_id: object_id.to_string(),
            expected: expected_guardian_id.to_string(),
            actual: guardian_id.to_string(),
        });
    }
    if object_id != expected_object_id {
        return Err(ShareError::ObjectMismatch {
            guardian_id: guardian_id.to_string(),
            expected: expected_object_id.to_string(),
            actual: object_id.to_string(),
        });
    }
    if public_key != share_key {
        return Err(ShareError::KeyMismatch {
            guardian_id: guardian_id.to_string(),
        });
    }
    Ok(())
}

/// Check that `shares` covers exactly the vote selections of `contests`, each with a valid
/// partial decryption from `guardian_id`.
fn verify_contests<'a, C: CiphertextContest + 'a>(
    guardian_id: &str,
    shares: &BTreeMap<String, CiphertextDecryptionContest>,
    contests: impl IntoIterator<Item = &'a C>,
    share_key: &Element,
    extended_base_hash: &Exponent,
) -> Result<(), ShareError> {
    let mut contest_ids = BTreeSet::new();
    for contest in contests {
        contest_ids.insert(contest.object_id());
        let contest_share =
            shares
                .get(contest.object_id())
                .ok_or_else(|| ShareError::MissingContest {
                    guardian_id: guardian_id.to_string(),
                    contest_id: contest.object_id().to_string(),
                })?;
        if contest_share.guardian_id != guardian_id
            || contest_share.description_hash != *contest.description_hash()
        {
            return Err(ShareError::DescriptionMismatch {
                guardian_id: guardian_id.to_string(),
                object_id: contest.object_id().to_string(),
            });
        }

        let mut selection_ids = BTreeSet::new();
        for selection in contest.vote_selections() {
            selection_ids.insert(selection.object_id());
            let share = contest_share
                .selections
                .get(selection.object_id())
                .ok_or_else(|| ShareError::MissingSelection {
                    guardian_id: guardian_id.to_string(),
                    contest_id: contest.object_id().to_string(),
                    selection_id: selection.object_id().to_string(),
                })?;
            if share.guardian_id != guardian_id {
                return Err(ShareError::GuardianMismatch {
                    object_id: share.object_id.clone(),
                    expected: guardian_id.to_string(),
                    actual: share.guardian_id.clone(),
                });
            }
            share.verify(selection, share_key, extended_base_hash)?;
        }
        if let Some(extra) = contest_share
            .selections
            .keys()
            .find(|id| !selection_ids.contains(id.as_str()))
        {
            return Err(ShareError::UnexpectedSelection {
                guardian_id: guardian_id.to_string(),
                contest_id: contest.object_id().to_string(),
                selection_id: extra.clone(),
            });
        }
    }
    if let Some(extra) = shares.keys().find(|id| !contest_ids.contains(id.as_str())) {
        return Err(ShareError::UnexpectedContest {
            guardian_id: guardian_id.to_string(),
            contest_id: extra.clone(),
        });
    }
    Ok(())
}

impl GuardianKeyShare {
    /// Compute `M_i = A^{P(x_i)}` and prove it, using `nonce` as the proof's one-time exponent.
    /// The same nonce always yields the same proof.
    pub fn partial_decrypt(
        &self,
        ciphertext: &Ciphertext,
        extended_base_hash: &Exponent,
        nonce: &Exponent,
    ) -> (Element, chaum_pedersen::Proof) {
        let share_key = self.share_public_key();
        let share = ciphertext.pad.pow(&self.secret);
        let proof = chaum_pedersen::Proof::prove_exp(
            &share_key,
            &self.secret,
            &ciphertext.pad,
            &share,
            nonce,
            |_, commitment| {
                decryption_challenge(extended_base_hash, ciphertext, &share_key, commitment, &share)
            },
        );
        (share, proof)
    }

    pub fn compute_share<S: CiphertextSelection + ?Sized>(
        &self,
        selection: &S,
        extended_base_hash: &Exponent,
        nonce: &Exponent,
    ) -> CiphertextDecryptionSelection {
        let (share, proof) =
            self.partial_decrypt(&selection.ciphertext(), extended_base_hash, nonce);
        CiphertextDecryptionSelection {
            object_id: selection.object_id().to_string(),
            sequence_order: selection.sequence_order(),
            description_hash: selection.description_hash().clone(),
            guardian_id: self.guardian_id.clone(),
            share,
            proof,
        }
    }

    fn compute_contests<'a, C: CiphertextContest + 'a>(
        &self,
        contests: impl IntoIterator<Item = &'a C>,
        extended_base_hash: &Exponent,
        rng: &mut (impl Rng + ?Sized),
    ) -> BTreeMap<String, CiphertextDecryptionContest> {
        contests
            .into_iter()
            .map(|contest| {
                let selections = contest
                    .vote_selections()
                    .map(|selection| {
                        let share = self.compute_share(
                            selection,
                            extended_base_hash,
                            &Exponent::random(rng),
                        );
                        (selection.object_id().to_string(), share)
                    })
                    .collect();
                let contest_share = CiphertextDecryptionContest {
                    object_id: contest.object_id().to_string(),
                    guardian_id: self.guardian_id.clone(),
                    description_hash: contest.description_hash().clone(),
                    selections,
                };
                (contest.object_id().to_string(), contest_share)
            })
            .collect()
    }

    #[instrument(level = "debug", skip_all, fields(guardian_id = %self.guardian_id, tally_id = %tally.object_id))]
    pub fn compute_tally_share(
        &self,
        tally: &CiphertextTally,
        rng: &mut (impl Rng + ?Sized),
    ) -> TallyShare {
        let contests = self.compute_contests(
            tally.contests.values(),
            &tally.context.crypto_extended_base_hash,
            rng,
        );
        debug!(contests = contests.len(), "tally share computed");
        TallyShare {
            object_id: tally.object_id.clone(),
            guardian_id: self.guardian_id.clone(),
            public_key: self.share_public_key(),
            contests,
        }
    }

    #[instrument(level = "debug", skip_all, fields(guardian_id = %self.guardian_id, ballot_id = %ballot.object_id))]
    pub fn compute_ballot_share(
        &self,
        ballot: &CiphertextBallot,
        context: &CiphertextElectionContext,
        rng: &mut (impl Rng + ?Sized),
    ) -> BallotShare {
        let contests = self.compute_contests(
            ballot.contests.iter(),
            &context.crypto_extended_base_hash,
            rng,
        );
        debug!(contests = contests.len(), "ballot share computed");
        BallotShare {
            object_id: ballot.object_id.clone(),
            guardian_id: self.guardian_id.clone(),
            public_key: self.share_public_key(),
            style_id: ballot.style_id.clone(),
            manifest_hash: ballot.manifest_hash.clone(),
            contests,
        }
    }
}
