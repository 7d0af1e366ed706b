//! Homomorphic accumulation of cast ballots into an encrypted tally.
//!
//! Validation, the expensive part, runs without holding any lock.  The cast and spoiled id sets
//! share one mutex: recording a ballot id is the single point that decides whether a ballot is
//! counted, and it must see both sets at once.  A cast ballot's votes are folded in while that
//! mutex is still held, so `cast_count` never covers a ballot missing from the totals.  Each
//! selection's running sum also sits behind its own mutex for readers.

use num::traits::Zero;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use crate::ballot::{BallotBoxState, CiphertextBallot, CiphertextContest, CiphertextSelection};
use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group::Exponent;
use crate::election::CiphertextElectionContext;
use crate::errors::TallyError;
use crate::manifest::InternalManifest;

/// The encrypted running total for one selection.
#[derive(Debug, Serialize, Deserialize)]
pub struct CiphertextTallySelection {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    ciphertext: Mutex<Ciphertext>,
}

impl CiphertextTallySelection {
    fn new(object_id: String, sequence_order: u32, description_hash: Exponent) -> Self {
        CiphertextTallySelection {
            object_id,
            sequence_order,
            description_hash,
            ciphertext: Mutex::new(Ciphertext::zero()),
        }
    }

    /// Fold one more encrypted vote into the total and return the new total.
    pub fn accumulate(&self, ciphertext: &Ciphertext) -> Ciphertext {
        let mut total = self.ciphertext.lock().unwrap_or_else(PoisonError::into_inner);
        *total = &*total + ciphertext;
        total.clone()
    }
}

impl CiphertextSelection for CiphertextTallySelection {
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
        Cow::Owned(
            self.ciphertext
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CiphertextTallyContest {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: Exponent,
    pub selections: BTreeMap<String, CiphertextTallySelection>,
}

impl CiphertextContest for CiphertextTallyContest {
    type Selection = CiphertextTallySelection;

    fn object_id(&self) -> &str {
        &self.object_id
    }
    fn sequence_order(&self) -> u32 {
        self.sequence_order
    }
    fn description_hash(&self) -> &Exponent {
        &self.description_hash
    }
    fn vote_selections(&self) -> Box<dyn Iterator<Item = &CiphertextTallySelection> + '_> {
        Box::new(self.selections.values())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BallotIds {
    cast: BTreeSet<String>,
    spoiled: BTreeSet<String>,
}

impl BallotIds {
    fn contains(&self, ballot_id: &str) -> bool {
        self.cast.contains(ballot_id) || self.spoiled.contains(ballot_id)
    }
}

/// The encrypted tally of an election.
#[derive(Debug, Serialize, Deserialize)]
pub struct CiphertextTally {
    pub object_id: String,
    pub name: String,
    pub manifest: InternalManifest,
    pub context: CiphertextElectionContext,
    pub contests: BTreeMap<String, CiphertextTallyContest>,
    ballot_ids: Mutex<BallotIds>,
}

/// What happened to each ballot handed to `accumulate` or `accumulate_batch`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AccumulationResult {
    pub tally_id: String,
    pub accepted: BTreeSet<String>,
    pub failed: BTreeMap<String, TallyError>,
    /// Ballots a cancelled batch never started on.  They left no trace in the tally.
    pub cancelled: BTreeSet<String>,
}

impl AccumulationResult {
    fn new(tally_id: &str) -> Self {
        AccumulationResult {
            tally_id: tally_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}

enum Outcome {
    Accepted,
    Failed(TallyError),
    Cancelled,
}

impl CiphertextTally {
    /// An empty tally with one zero-valued selection per (non-placeholder) manifest selection.
    pub fn new(
        object_id: impl Into<String>,
        name: impl Into<String>,
        manifest: InternalManifest,
        context: CiphertextElectionContext,
    ) -> Self {
        let contests = manifest
            .contests
            .iter()
            .map(|contest| {
                let description = &contest.description;
                let selections = description
                    .ballot_selections
                    .iter()
                    .map(|s| {
                        let selection = CiphertextTallySelection::new(
                            s.object_id.clone(),
                            s.sequence_order,
                            s.crypto_hash(),
                        );
                        (s.object_id.clone(), selection)
                    })
                    .collect();
                let tally_contest = CiphertextTallyContest {
                    object_id: description.object_id.clone(),
                    sequence_order: description.sequence_order,
                    description_hash: description.crypto_hash(),
                    selections,
                };
                (description.object_id.clone(), tally_contest)
            })
            .collect();

        CiphertextTally {
            object_id: object_id.into(),
            name: name.into(),
            manifest,
            context,
            contests,
            ballot_ids: Mutex::new(BallotIds::default()),
        }
    }

    fn ballot_ids(&self) -> MutexGuard<'_, BallotIds> {
        self.ballot_ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cast_ballot_ids(&self) -> BTreeSet<String> {
        self.ballot_ids().cast.clone()
    }

    pub fn spoiled_ballot_ids(&self) -> BTreeSet<String> {
        self.ballot_ids().spoiled.clone()
    }

    pub fn cast_count(&self) -> u64 {
        self.ballot_ids().cast.len() as u64
    }

    pub fn contains(&self, ballot_id: &str) -> bool {
        self.ballot_ids().contains(ballot_id)
    }

    /// Accumulate one ballot.  Unless `skip_validation` is set the ballot's proofs are checked
    /// against this tally's manifest and context first.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.object_id, ballot_id = %ballot.object_id))]
    pub fn accumulate(&self, ballot: &CiphertextBallot, skip_validation: bool) -> AccumulationResult {
        let mut result = AccumulationResult::new(&self.object_id);
        match self.accumulate_ballot(ballot, skip_validation) {
            Ok(()) => {
                result.accepted.insert(ballot.object_id.clone());
            }
            Err(err) => {
                result.failed.insert(ballot.object_id.clone(), err);
            }
        }
        result
    }

    /// Accumulate many ballots on the rayon pool.
    ///
    /// A ballot id that repeats within `ballots`, or is already in the tally, is a hard error:
    /// nothing is accumulated.  `cancel` is polled before each ballot; once it is set, ballots
    /// not yet started are reported as cancelled and a ballot already in progress completes.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.object_id, ballots = ballots.len()))]
    pub fn accumulate_batch(
        &self,
        ballots: &[CiphertextBallot],
        skip_validation: bool,
        cancel: &AtomicBool,
    ) -> Result<AccumulationResult, TallyError> {
        {
            let ids = self.ballot_ids();
            let mut seen = BTreeSet::new();
            for ballot in ballots {
                if ids.contains(&ballot.object_id) || !seen.insert(ballot.object_id.as_str()) {
                    warn!(ballot_id = %ballot.object_id, "duplicate ballot in batch");
                    return Err(self.duplicate(&ballot.object_id));
                }
            }
        }

        let outcomes: Vec<(&str, Outcome)> = ballots
            .par_iter()
            .map(|ballot| {
                let outcome = if cancel.load(Ordering::Acquire) {
                    Outcome::Cancelled
                } else {
                    match self.accumulate_ballot(ballot, skip_validation) {
                        Ok(()) => Outcome::Accepted,
                        Err(err) => Outcome::Failed(err),
                    }
                };
                (ballot.object_id.as_str(), outcome)
            })
            .collect();

        let mut result = AccumulationResult::new(&self.object_id);
        for (ballot_id, outcome) in outcomes {
            match outcome {
                Outcome::Accepted => {
                    result.accepted.insert(ballot_id.to_string());
                }
                Outcome::Failed(err) => {
                    result.failed.insert(ballot_id.to_string(), err);
                }
                Outcome::Cancelled => {
                    result.cancelled.insert(ballot_id.to_string());
                }
            }
        }
        debug!(
            accepted = result.accepted.len(),
            failed = result.failed.len(),
            cancelled = result.cancelled.len(),
            "batch accumulated"
        );
        Ok(result)
    }

    fn accumulate_ballot(
        &self,
        ballot: &CiphertextBallot,
        skip_validation: bool,
    ) -> Result<(), TallyError> {
        let result = self.try_accumulate_ballot(ballot, skip_validation);
        match &result {
            Ok(()) => debug!(ballot_id = %ballot.object_id, state = ?ballot.state, "ballot accumulated"),
            Err(err) => warn!(ballot_id = %ballot.object_id, error = %err, "ballot rejected"),
        }
        result
    }

    fn try_accumulate_ballot(
        &self,
        ballot: &CiphertextBallot,
        skip_validation: bool,
    ) -> Result<(), TallyError> {
        if ballot.state == BallotBoxState::Unknown {
            return Err(TallyError::UnknownState {
                tally_id: self.object_id.clone(),
                ballot_id: ballot.object_id.clone(),
            });
        }
        if !skip_validation {
            ballot
                .check(&self.manifest, &self.context)
                .map_err(|source| TallyError::InvalidBallot {
                    tally_id: self.object_id.clone(),
                    source,
                })?;
        }

        // Resolve every target selection before touching any state, so a malformed ballot is
        // rejected without a trace.
        let mut targets = Vec::new();
        let mut seen_contests = BTreeSet::new();
        for contest in &ballot.contests {
            if !seen_contests.insert(contest.object_id.as_str()) {
                return Err(TallyError::DuplicateContest {
                    tally_id: self.object_id.clone(),
                    ballot_id: ballot.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                });
            }
            let mut seen_selections = BTreeSet::new();
            if let Some(repeated) = contest
                .ballot_selections
                .iter()
                .find(|s| !seen_selections.insert(s.object_id.as_str()))
            {
                return Err(TallyError::DuplicateSelection {
                    tally_id: self.object_id.clone(),
                    ballot_id: ballot.object_id.clone(),
                    contest_id: contest.object_id.clone(),
                    selection_id: repeated.object_id.clone(),
                });
            }
            let tally_contest =
                self.contests
                    .get(&contest.object_id)
                    .ok_or_else(|| TallyError::UnknownContest {
                        tally_id: self.object_id.clone(),
                        ballot_id: ballot.object_id.clone(),
                        contest_id: contest.object_id.clone(),
                    })?;
            for selection in contest.vote_selections() {
                let tally_selection = tally_contest
                    .selections
                    .get(&selection.object_id)
                    .ok_or_else(|| TallyError::UnknownSelection {
                        tally_id: self.object_id.clone(),
                        ballot_id: ballot.object_id.clone(),
                        contest_id: contest.object_id.clone(),
                        selection_id: selection.object_id.clone(),
                    })?;
                targets.push((tally_selection, &selection.ciphertext));
            }
        }

        let mut ids = self.ballot_ids();
        if ids.contains(&ballot.object_id) {
            return Err(self.duplicate(&ballot.object_id));
        }
        match ballot.state {
            BallotBoxState::Cast => {
                ids.cast.insert(ballot.object_id.clone());
                for (tally_selection, ciphertext) in targets {
                    tally_selection.accumulate(ciphertext);
                }
            }
            _ => {
                ids.spoiled.insert(ballot.object_id.clone());
            }
        }
        Ok(())
    }

    fn duplicate(&self, ballot_id: &str) -> TallyError {
        TallyError::DuplicateBallot {
            tally_id: self.object_id.clone(),
            ballot_id: ballot_id.to_string(),
        }
    }
}
