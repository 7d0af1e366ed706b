use num::traits::Pow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::ballot::{CiphertextBallot, CiphertextContest};
use crate::crypto::dlog::DiscreteLog;
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::{Element, Exponent};
use crate::decryption::accumulator::{accumulate_contest, AggregateDecryptionProof, Participant};
use crate::election::CiphertextElectionContext;
use crate::errors::DecryptionError;
use crate::tally::CiphertextTally;

/// The decryption of one selection's tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTallySelection {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    /// The count `t`.
    pub tally: u64,
    /// `K^t`.
    pub value: Element,
    /// The encrypted tally this was decrypted from.
    pub message: Ciphertext,
    pub proof: AggregateDecryptionProof,
}

impl PlaintextTallySelection {
    /// Check `value = K^t` and that the aggregate proof shows `B / value` is `A^s` for the
    /// secret behind `public_key`.
    pub fn verify(
        &self,
        public_key: &Element,
        extended_base_hash: &Exponent,
    ) -> Result<(), DecryptionError> {
        if self.value != public_key.pow(&Exponent::from(self.tally)) {
            return Err(DecryptionError::AggregateProof {
                selection_id: self.object_id.clone(),
            });
        }
        let combined = &self.message.data / &self.value;
        self.proof.verify(
            &self.object_id,
            &self.message,
            public_key,
            &combined,
            extended_base_hash,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTallyContest {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub selections: BTreeMap<String, PlaintextTallySelection>,
}

/// The decrypted counts of a tally, or of a single spoiled ballot (where every count is zero
/// or one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTally {
    /// The tally or ballot id.
    pub object_id: String,
    pub contests: BTreeMap<String, PlaintextTallyContest>,
}

impl PlaintextTally {
    pub fn verify(
        &self,
        public_key: &Element,
        extended_base_hash: &Exponent,
    ) -> Result<(), DecryptionError> {
        self.contests
            .values()
            .flat_map(|contest| contest.selections.values())
            .try_for_each(|selection| selection.verify(public_key, extended_base_hash))
    }

    pub fn count(&self, contest_id: &str, selection_id: &str) -> Option<u64> {
        self.contests
            .get(contest_id)?
            .selections
            .get(selection_id)
            .map(|s| s.tally)
    }
}

/// Decrypt every contest of `tally` from the participants' shares, searching counts up to
/// `bound`.
#[instrument(level = "debug", skip_all, fields(tally_id = %tally.object_id, participants = participants.len()))]
pub fn decrypt_tally(
    tally: &CiphertextTally,
    participants: &[Participant<'_>],
    coefficients: &BTreeMap<String, Exponent>,
    dlog: &DiscreteLog,
    bound: u64,
    skip_validation: bool,
) -> Result<PlaintextTally, DecryptionError> {
    let contests = decrypt_contests(
        tally.contests.values(),
        participants,
        coefficients,
        &tally.context.crypto_extended_base_hash,
        dlog,
        bound,
        skip_validation,
    )?;
    debug!(contests = contests.len(), "tally decrypted");
    Ok(PlaintextTally {
        object_id: tally.object_id.clone(),
        contests,
    })
}

/// Decrypt a single spoiled ballot.  Each selection is zero or one.
#[instrument(level = "debug", skip_all, fields(ballot_id = %ballot.object_id, participants = participants.len()))]
pub fn decrypt_ballot(
    ballot: &CiphertextBallot,
    context: &CiphertextElectionContext,
    participants: &[Participant<'_>],
    coefficients: &BTreeMap<String, Exponent>,
    dlog: &DiscreteLog,
    skip_validation: bool,
) -> Result<PlaintextTally, DecryptionError> {
    let contests = decrypt_contests(
        ballot.contests.iter(),
        participants,
        coefficients,
        &context.crypto_extended_base_hash,
        dlog,
        1,
        skip_validation,
    )?;
    debug!(contests = contests.len(), "ballot decrypted");
    Ok(PlaintextTally {
        object_id: ballot.object_id.clone(),
        contests,
    })
}

fn decrypt_contests<'a, C: CiphertextContest + 'a>(
    contests: impl IntoIterator<Item = &'a C>,
    participants: &[Participant<'_>],
    coefficients: &BTreeMap<String, Exponent>,
    extended_base_hash: &Exponent,
    dlog: &DiscreteLog,
    bound: u64,
    skip_validation: bool,
) -> Result<BTreeMap<String, PlaintextTallyContest>, DecryptionError> {
    contests
        .into_iter()
        .map(|contest| {
            let accumulated = accumulate_contest(
                contest,
                participants,
                coefficients,
                extended_base_hash,
                skip_validation,
            )?;
            let selections = accumulated
                .selections
                .iter()
                .map(|(id, selection)| Ok((id.clone(), selection.decrypt(dlog, bound)?)))
                .collect::<Result<BTreeMap<_, _>, DecryptionError>>()?;
            let plaintext = PlaintextTallyContest {
                object_id: accumulated.object_id,
                sequence_order: accumulated.sequence_order,
                description_hash: accumulated.description_hash,
                selections,
            };
            Ok((plaintext.object_id.clone(), plaintext))
        })
        .collect()
}
