//! Collecting guardians' shares for one tally and turning them into a plaintext tally.
//!
//! The mediator owns the tally and everything submitted for it.  All state changes go through
//! the `announce` and `submit_*` methods, each of which validates before it stores anything, so a
//! rejected submission leaves the mediator exactly as it was.  `decrypt` only reads that state
//! (apart from caching its answer), and its answer is reused until another submission is
//! accepted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

use crate::ballot::{BallotBoxState, CiphertextBallot};
use crate::config::DecryptionConfig;
use crate::crypto::dlog::DiscreteLog;
use crate::crypto::group::{Element, Exponent};
use crate::decryption::{
    compute_lagrange_coefficients, decrypt_ballot, decrypt_tally, BallotShare, Participant,
    PlaintextTally, TallyShare,
};
use crate::errors::{DecryptionError, MediatorError};
use crate::guardian::{joint_public_key, share_public_key, ElectionPublicKey};
use crate::tally::CiphertextTally;

/// Where a mediator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecryptionState {
    NoShares,
    CollectingShares,
    /// Every announced guardian has submitted valid shares and there are enough of them.
    Quorate,
    /// The last `decrypt` succeeded and nothing has been submitted since.
    Decrypted,
}

/// The outcome of `DecryptionMediator::decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecryptionResult {
    Decrypted {
        tally_id: String,
        tally: PlaintextTally,
        /// Decrypted spoiled ballots, by ballot id.
        challenged_ballots: BTreeMap<String, PlaintextTally>,
    },
    /// Decryption is not possible (yet), with the reason.
    Invalid { tally_id: String, message: String },
}

impl DecryptionResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, DecryptionResult::Decrypted { .. })
    }

    pub fn tally(&self) -> Option<&PlaintextTally> {
        match self {
            DecryptionResult::Decrypted { tally, .. } => Some(tally),
            DecryptionResult::Invalid { .. } => None,
        }
    }
}

struct Guardian {
    public_key: ElectionPublicKey,
    /// `g^{P(x_i)}`, computed from the whole roster.
    share_key: Element,
}

/// Decrypts one tally once enough guardians have submitted shares for it.
///
/// The tally moves into the mediator and is never handed back out, so no ballot can reach it
/// behind the mediator's back:
///
/// ```compile_fail
/// use electionguard_tally::ballot::CiphertextBallot;
/// use electionguard_tally::mediator::DecryptionMediator;
///
/// fn sneak_in(mediator: &DecryptionMediator, ballot: &CiphertextBallot) {
///     mediator.tally().accumulate(ballot, false);
/// }
/// ```
pub struct DecryptionMediator {
    tally: CiphertextTally,
    config: DecryptionConfig,
    roster: BTreeMap<String, Guardian>,
    announced: BTreeSet<String>,
    tally_shares: BTreeMap<String, TallyShare>,
    ballots: BTreeMap<String, CiphertextBallot>,
    ballot_shares: BTreeMap<String, BTreeMap<String, BallotShare>>,
    dlog: DiscreteLog,
    /// Bumped by every accepted submission.
    revision: u64,
    cached: Option<(u64, bool, DecryptionResult)>,
}

impl DecryptionMediator {
    /// Set up decryption of `tally` by the guardians of the key ceremony `roster`.  The roster
    /// must list every guardian exactly once and reproduce the election public key.
    pub fn new(
        tally: CiphertextTally,
        roster: Vec<ElectionPublicKey>,
        config: DecryptionConfig,
    ) -> Result<Self, MediatorError> {
        config.validate()?;
        let context = &tally.context;
        if roster.len() != context.number_of_guardians as usize {
            return Err(MediatorError::RosterSize {
                tally_id: tally.object_id.clone(),
                expected: context.number_of_guardians,
                actual: roster.len(),
            });
        }
        if joint_public_key(&roster) != context.elgamal_public_key {
            return Err(MediatorError::JointKeyMismatch {
                tally_id: tally.object_id.clone(),
            });
        }

        let mut guardians = BTreeMap::new();
        for public_key in &roster {
            let guardian = Guardian {
                public_key: public_key.clone(),
                share_key: share_public_key(public_key.sequence_order, &roster),
            };
            if guardians
                .insert(public_key.owner_id.clone(), guardian)
                .is_some()
            {
                return Err(MediatorError::DuplicateGuardian {
                    tally_id: tally.object_id.clone(),
                    guardian_id: public_key.owner_id.clone(),
                });
            }
        }

        let dlog = DiscreteLog::new(context.elgamal_public_key.clone());
        Ok(DecryptionMediator {
            tally,
            config,
            roster: guardians,
            announced: BTreeSet::new(),
            tally_shares: BTreeMap::new(),
            ballots: BTreeMap::new(),
            ballot_shares: BTreeMap::new(),
            dlog,
            revision: 0,
            cached: None,
        })
    }

    pub fn tally_id(&self) -> &str {
        &self.tally.object_id
    }

    /// Cast ballots in the tally being decrypted.
    pub fn cast_count(&self) -> u64 {
        self.tally.cast_count()
    }

    pub fn announced_guardians(&self) -> impl Iterator<Item = &str> {
        self.announced.iter().map(String::as_str)
    }

    fn quorum(&self) -> u32 {
        self.tally.context.quorum
    }

    /// The roster entry for `public_key`, which must match it exactly.
    fn guardian(&self, public_key: &ElectionPublicKey) -> Result<&Guardian, MediatorError> {
        let guardian = self.roster.get(&public_key.owner_id).ok_or_else(|| {
            MediatorError::UnknownGuardian {
                tally_id: self.tally.object_id.clone(),
                guardian_id: public_key.owner_id.clone(),
            }
        })?;
        if guardian.public_key != *public_key {
            return Err(MediatorError::GuardianKeyMismatch {
                guardian_id: public_key.owner_id.clone(),
            });
        }
        Ok(guardian)
    }

    fn accept(&mut self) {
        self.revision += 1;
    }

    /// Declare that a guardian is taking part.  Once announced, a guardian must submit a tally
    /// share before the tally can be decrypted.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.tally.object_id, guardian_id = %public_key.owner_id))]
    pub fn announce(&mut self, public_key: &ElectionPublicKey) -> Result<(), MediatorError> {
        self.check_announcement(public_key).map_err(|err| {
            warn!(error = %err, "announcement rejected");
            err
        })?;
        self.announced.insert(public_key.owner_id.clone());
        self.accept();
        debug!("guardian announced");
        Ok(())
    }

    fn check_announcement(&self, public_key: &ElectionPublicKey) -> Result<(), MediatorError> {
        self.guardian(public_key)?;
        if self.announced.contains(&public_key.owner_id) {
            return Err(MediatorError::AlreadyAnnounced {
                tally_id: self.tally.object_id.clone(),
                guardian_id: public_key.owner_id.clone(),
            });
        }
        public_key
            .check(self.quorum())
            .map_err(MediatorError::InvalidGuardianKey)
    }

    /// Accept a guardian's share of the tally, announcing the guardian if it has not been yet.
    /// A second share from the same guardian is rejected and the first one stays.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.tally.object_id, guardian_id = %public_key.owner_id))]
    pub fn submit_tally_share(
        &mut self,
        public_key: &ElectionPublicKey,
        share: TallyShare,
    ) -> Result<(), MediatorError> {
        self.check_tally_share(public_key, &share).map_err(|err| {
            warn!(error = %err, "tally share rejected");
            err
        })?;
        self.announced.insert(public_key.owner_id.clone());
        self.tally_shares.insert(public_key.owner_id.clone(), share);
        self.accept();
        debug!(shares = self.tally_shares.len(), "tally share accepted");
        Ok(())
    }

    fn check_tally_share(
        &self,
        public_key: &ElectionPublicKey,
        share: &TallyShare,
    ) -> Result<(), MediatorError> {
        let guardian = self.guardian(public_key)?;
        if self.tally_shares.contains_key(&public_key.owner_id) {
            return Err(MediatorError::DuplicateTallyShare {
                tally_id: self.tally.object_id.clone(),
                guardian_id: public_key.owner_id.clone(),
            });
        }
        share
            .verify(&self.tally, &public_key.owner_id, &guardian.share_key)
            .map_err(|source| MediatorError::InvalidShare {
                object_id: self.tally.object_id.clone(),
                source,
            })?;
        if !self.announced.contains(&public_key.owner_id) {
            public_key
                .check(self.quorum())
                .map_err(MediatorError::InvalidGuardianKey)?;
        }
        Ok(())
    }

    /// Register a spoiled ballot of this tally for decryption.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.tally.object_id, ballot_id = %ballot.object_id))]
    pub fn submit_spoiled_ballot(&mut self, ballot: CiphertextBallot) -> Result<(), MediatorError> {
        self.check_spoiled_ballot(&ballot).map_err(|err| {
            warn!(error = %err, "spoiled ballot rejected");
            err
        })?;
        self.ballots.insert(ballot.object_id.clone(), ballot);
        self.accept();
        debug!(ballots = self.ballots.len(), "spoiled ballot registered");
        Ok(())
    }

    fn check_spoiled_ballot(&self, ballot: &CiphertextBallot) -> Result<(), MediatorError> {
        if ballot.state != BallotBoxState::Spoiled {
            return Err(MediatorError::NotSpoiled {
                ballot_id: ballot.object_id.clone(),
            });
        }
        if !self.tally.spoiled_ballot_ids().contains(&ballot.object_id) {
            return Err(MediatorError::UnknownBallot {
                tally_id: self.tally.object_id.clone(),
                ballot_id: ballot.object_id.clone(),
            });
        }
        if self.ballots.contains_key(&ballot.object_id) {
            return Err(MediatorError::DuplicateBallot {
                ballot_id: ballot.object_id.clone(),
            });
        }
        ballot
            .check(&self.tally.manifest, &self.tally.context)
            .map_err(MediatorError::InvalidBallot)
    }

    /// Accept a guardian's share of a registered spoiled ballot.
    #[instrument(level = "debug", skip_all, fields(ballot_id = %share.object_id, guardian_id = %public_key.owner_id))]
    pub fn submit_ballot_share(
        &mut self,
        public_key: &ElectionPublicKey,
        share: BallotShare,
    ) -> Result<(), MediatorError> {
        self.check_ballot_share(public_key, &share).map_err(|err| {
            warn!(error = %err, "ballot share rejected");
            err
        })?;
        self.ballot_shares
            .entry(share.object_id.clone())
            .or_default()
            .insert(public_key.owner_id.clone(), share);
        self.accept();
        debug!("ballot share accepted");
        Ok(())
    }

    fn check_ballot_share(
        &self,
        public_key: &ElectionPublicKey,
        share: &BallotShare,
    ) -> Result<(), MediatorError> {
        let guardian = self.guardian(public_key)?;
        let ballot = self.ballots.get(&share.object_id).ok_or_else(|| {
            MediatorError::UnknownBallot {
                tally_id: self.tally.object_id.clone(),
                ballot_id: share.object_id.clone(),
            }
        })?;
        if self
            .ballot_shares
            .get(&share.object_id)
            .map_or(false, |shares| shares.contains_key(&public_key.owner_id))
        {
            return Err(MediatorError::DuplicateBallotShare {
                ballot_id: share.object_id.clone(),
                guardian_id: public_key.owner_id.clone(),
            });
        }
        share
            .verify(ballot, &public_key.owner_id, &guardian.share_key, &self.tally.context)
            .map_err(|source| MediatorError::InvalidShare {
                object_id: share.object_id.clone(),
                source,
            })
    }

    /// Why the tally cannot be decrypted yet, if it cannot.
    ///
    /// Requires at least a quorum of announced guardians, a tally share from each of them and
    /// from nobody else, and a share of every registered spoiled ballot from each of them.  Every
    /// stored share is verified again.
    pub fn readiness(&self) -> Result<(), MediatorError> {
        let tally_id = &self.tally.object_id;
        if self.announced.len() < self.quorum() as usize {
            return Err(MediatorError::InsufficientQuorum {
                tally_id: tally_id.clone(),
                available: self.announced.len(),
                quorum: self.quorum(),
            });
        }
        let missing: Vec<String> = self
            .announced
            .iter()
            .filter(|id| !self.tally_shares.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MediatorError::MissingTallyShares {
                tally_id: tally_id.clone(),
                guardian_ids: missing,
            });
        }

        for (guardian_id, share) in &self.tally_shares {
            let guardian = self.guardian_by_id(guardian_id)?;
            share
                .verify(&self.tally, guardian_id, &guardian.share_key)
                .map_err(|source| MediatorError::InvalidShare {
                    object_id: tally_id.clone(),
                    source,
                })?;
        }

        for (ballot_id, ballot) in &self.ballots {
            for guardian_id in &self.announced {
                let share = self
                    .ballot_shares
                    .get(ballot_id)
                    .and_then(|shares| shares.get(guardian_id))
                    .ok_or_else(|| MediatorError::MissingBallotShare {
                        ballot_id: ballot_id.clone(),
                        guardian_id: guardian_id.clone(),
                    })?;
                let guardian = self.guardian_by_id(guardian_id)?;
                share
                    .verify(ballot, guardian_id, &guardian.share_key, &self.tally.context)
                    .map_err(|source| MediatorError::InvalidShare {
                        object_id: ballot_id.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    fn guardian_by_id(&self, guardian_id: &str) -> Result<&Guardian, MediatorError> {
        self.roster
            .get(guardian_id)
            .ok_or_else(|| MediatorError::UnknownGuardian {
                tally_id: self.tally.object_id.clone(),
                guardian_id: guardian_id.to_string(),
            })
    }

    pub fn can_decrypt(&self) -> bool {
        self.readiness().is_ok()
    }

    pub fn state(&self) -> DecryptionState {
        match &self.cached {
            Some((revision, _, result)) if *revision == self.revision && result.is_valid() => {
                DecryptionState::Decrypted
            }
            _ if self.tally_shares.is_empty() => DecryptionState::NoShares,
            _ if self.can_decrypt() => DecryptionState::Quorate,
            _ => DecryptionState::CollectingShares,
        }
    }

    /// Decrypt the tally and every registered spoiled ballot.
    ///
    /// Unless `skip_validation` is set, nothing is attempted until `can_decrypt` holds.  With
    /// it set, shares are combined without being verified, but fewer than a quorum of them is
    /// still an invalid result.  Calling this again without an intervening submission returns
    /// the same result.
    #[instrument(level = "debug", skip_all, fields(tally_id = %self.tally.object_id, skip_validation = skip_validation))]
    pub fn decrypt(&mut self, skip_validation: bool) -> DecryptionResult {
        if let Some((revision, skipped, result)) = &self.cached {
            if *revision == self.revision && *skipped == skip_validation {
                debug!("returning cached result");
                return result.clone();
            }
        }

        let result = match self.try_decrypt(skip_validation) {
            Ok((tally, challenged_ballots)) => {
                debug!(ballots = challenged_ballots.len(), "tally decrypted");
                DecryptionResult::Decrypted {
                    tally_id: self.tally.object_id.clone(),
                    tally,
                    challenged_ballots,
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot decrypt");
                DecryptionResult::Invalid {
                    tally_id: self.tally.object_id.clone(),
                    message: err.to_string(),
                }
            }
        };
        self.cached = Some((self.revision, skip_validation, result.clone()));
        result
    }

    fn try_decrypt(
        &self,
        skip_validation: bool,
    ) -> Result<(PlaintextTally, BTreeMap<String, PlaintextTally>), MediatorError> {
        if skip_validation {
            self.check_quorum(&self.tally.object_id, self.tally_shares.len())?;
        } else {
            self.readiness()?;
        }

        let participants =
            self.participants(self.tally_shares.iter(), Participant::from_tally_share)?;
        let coefficients = self.coefficients(self.tally_shares.keys())?;
        let bound = self.config.tally_bound(self.tally.cast_count());
        let tally = decrypt_tally(
            &self.tally,
            &participants,
            &coefficients,
            &self.dlog,
            bound,
            skip_validation,
        )?;

        let mut challenged_ballots = BTreeMap::new();
        for (ballot_id, ballot) in &self.ballots {
            let shares = self.ballot_shares.get(ballot_id);
            self.check_quorum(ballot_id, shares.map_or(0, BTreeMap::len))?;
            let participants = self.participants(
                shares.into_iter().flat_map(BTreeMap::iter),
                Participant::from_ballot_share,
            )?;
            let coefficients = self.coefficients(shares.into_iter().flat_map(BTreeMap::keys))?;
            let plaintext = decrypt_ballot(
                ballot,
                &self.tally.context,
                &participants,
                &coefficients,
                &self.dlog,
                skip_validation,
            )?;
            challenged_ballots.insert(ballot_id.clone(), plaintext);
        }
        Ok((tally, challenged_ballots))
    }

    fn check_quorum(&self, object_id: &str, available: usize) -> Result<(), MediatorError> {
        if available < self.quorum() as usize {
            return Err(MediatorError::InsufficientQuorum {
                tally_id: object_id.to_string(),
                available,
                quorum: self.quorum(),
            });
        }
        Ok(())
    }

    fn participants<'a, S: 'a>(
        &'a self,
        shares: impl IntoIterator<Item = (&'a String, &'a S)>,
        participant: impl Fn(&'a S, &'a Element) -> Participant<'a>,
    ) -> Result<Vec<Participant<'a>>, MediatorError> {
        shares
            .into_iter()
            .map(|(guardian_id, share)| {
                let guardian = self.guardian_by_id(guardian_id)?;
                Ok(participant(share, &guardian.share_key))
            })
            .collect()
    }

    /// Lagrange coefficients over exactly `guardian_ids`.
    fn coefficients<'a>(
        &self,
        guardian_ids: impl IntoIterator<Item = &'a String>,
    ) -> Result<BTreeMap<String, Exponent>, MediatorError> {
        let guardians = guardian_ids
            .into_iter()
            .map(|id| Ok((id.as_str(), self.guardian_by_id(id)?.public_key.sequence_order)))
            .collect::<Result<Vec<_>, MediatorError>>()?;
        Ok(compute_lagrange_coefficients(guardians).map_err(DecryptionError::from)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::generate::{self, Election};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        rng: StdRng,
        election: Election,
        shares: Vec<TallyShare>,
        /// A second, differently randomized share from guardian 0.
        resubmission: TallyShare,
        spoiled: Vec<CiphertextBallot>,
        mediator: DecryptionMediator,
    }

    fn cast(rng: &mut StdRng, election: &Election, tally: &CiphertextTally) {
        for (id, vote) in [("b0", "measure-a-yes"), ("b1", "measure-a-no"), ("b2", "measure-a-yes")] {
            let ballot = election.encrypt_ballot(rng, id, "style-county", &[vote], BallotBoxState::Cast);
            assert!(tally.accumulate(&ballot, false).is_ok());
        }
    }

    fn fixture_with(seed: u64, config: DecryptionConfig, spoiled: &[&str]) -> Fixture {
        let mut rng = StdRng::seed_from_u64(seed);
        let election = generate::election(&mut rng, 3, 2, generate::sample_manifest()).unwrap();
        let tally = election.tally("tally");
        cast(&mut rng, &election, &tally);
        let spoiled: Vec<_> = spoiled
            .iter()
            .map(|id| election.encrypt_ballot(&mut rng, id, "style-both", &["council-bo"], BallotBoxState::Spoiled))
            .collect();
        for ballot in &spoiled {
            assert!(tally.accumulate(ballot, false).is_ok());
        }
        let shares = election
            .ceremony
            .key_shares
            .iter()
            .map(|g| g.compute_tally_share(&tally, &mut rng))
            .collect();
        let resubmission = election.ceremony.key_shares[0].compute_tally_share(&tally, &mut rng);
        let mediator = DecryptionMediator::new(tally, election.ceremony.public_keys.clone(), config).unwrap();
        Fixture {
            rng,
            election,
            shares,
            resubmission,
            spoiled,
            mediator,
        }
    }

    fn fixture(seed: u64) -> Fixture {
        fixture_with(seed, DecryptionConfig::default(), &[])
    }

    impl Fixture {
        fn submit(&mut self, i: usize) -> Result<(), MediatorError> {
            let key = self.election.ceremony.public_keys[i].clone();
            self.mediator.submit_tally_share(&key, self.shares[i].clone())
        }
    }

    #[test]
    fn quorum_gates_decryption() {
        let mut f = fixture(71);
        assert_eq!(f.mediator.state(), DecryptionState::NoShares);
        assert!(!f.mediator.can_decrypt());

        f.submit(0).unwrap();
        assert!(!f.mediator.can_decrypt());
        assert_eq!(f.mediator.state(), DecryptionState::CollectingShares);
        let result = f.mediator.decrypt(false);
        assert!(!result.is_valid());
        assert!(matches!(
            f.mediator.readiness(),
            Err(MediatorError::InsufficientQuorum { available: 1, quorum: 2, .. })
        ));
        // Skipping validation does not lower the quorum.
        assert!(!f.mediator.decrypt(true).is_valid());

        f.submit(1).unwrap();
        assert!(f.mediator.can_decrypt());
        assert_eq!(f.mediator.state(), DecryptionState::Quorate);

        f.submit(2).unwrap();
        assert!(f.mediator.can_decrypt());
        let result = f.mediator.decrypt(false);
        assert!(result.is_valid());
        assert_eq!(f.mediator.state(), DecryptionState::Decrypted);

        let tally = result.tally().unwrap();
        assert_eq!(tally.count("measure-a", "measure-a-yes"), Some(2));
        assert_eq!(tally.count("measure-a", "measure-a-no"), Some(1));
        assert_eq!(tally.count("council", "council-ada"), Some(0));
        assert_eq!(
            tally.verify(
                &f.election.context.elgamal_public_key,
                &f.election.context.crypto_extended_base_hash
            ),
            Ok(())
        );
    }

    #[test]
    fn decrypt_is_repeatable() {
        let mut f = fixture(72);
        f.submit(2).unwrap();
        f.submit(0).unwrap();
        let first = f.mediator.decrypt(false);
        assert!(first.is_valid());
        assert_eq!(f.mediator.decrypt(false), first);
        assert_eq!(f.mediator.decrypt(true), first);
    }

    #[test]
    fn result_describes_the_mediated_tally() {
        let mut f = fixture(79);
        assert_eq!(f.mediator.tally_id(), "tally");
        assert_eq!(f.mediator.cast_count(), 3);
        f.submit(0).unwrap();
        f.submit(1).unwrap();

        let result = f.mediator.decrypt(false);
        assert!(matches!(&result, DecryptionResult::Decrypted { tally_id, .. } if tally_id == "tally"));
        let tally = result.tally().unwrap();
        let counted: u64 = ["measure-a-yes", "measure-a-no"]
            .iter()
            .filter_map(|s| tally.count("measure-a", s))
            .sum();
        assert_eq!(counted, f.mediator.cast_count());
        assert_eq!(f.mediator.state(), DecryptionState::Decrypted);
    }

    #[test]
    fn duplicate_share_is_rejected_and_first_kept() {
        let mut f = fixture(73);
        f.submit(0).unwrap();
        let key = f.election.ceremony.public_keys[0].clone();
        let again = f.resubmission.clone();
        assert_eq!(
            f.mediator.submit_tally_share(&key, again),
            Err(MediatorError::DuplicateTallyShare {
                tally_id: "tally".to_string(),
                guardian_id: key.owner_id.clone()
            })
        );
        f.submit(1).unwrap();
        assert!(f.mediator.decrypt(false).is_valid());
    }

    #[test]
    fn invalid_share_leaves_no_trace() {
        let mut f = fixture(74);
        let key = f.election.ceremony.public_keys[0].clone();
        let mut forged = f.shares[0].clone();
        let selection = forged
            .contests
            .get_mut("measure-a")
            .and_then(|c| c.selections.get_mut("measure-a-no"))
            .unwrap();
        selection.share = &selection.share * &selection.share;

        assert!(matches!(
            f.mediator.submit_tally_share(&key, forged),
            Err(MediatorError::InvalidShare { .. })
        ));
        assert_eq!(f.mediator.state(), DecryptionState::NoShares);
        assert_eq!(f.mediator.announced_guardians().count(), 0);
        // The honest share is still welcome.
        f.submit(0).unwrap();
    }

    #[test]
    fn announced_guardians_must_all_submit() {
        let mut f = fixture(75);
        let third = f.election.ceremony.public_keys[2].clone();
        f.mediator.announce(&third).unwrap();
        assert!(matches!(
            f.mediator.announce(&third),
            Err(MediatorError::AlreadyAnnounced { .. })
        ));
        f.submit(0).unwrap();
        f.submit(1).unwrap();
        assert_eq!(
            f.mediator.readiness(),
            Err(MediatorError::MissingTallyShares {
                tally_id: "tally".to_string(),
                guardian_ids: vec![third.owner_id.clone()]
            })
        );
        assert_eq!(f.mediator.state(), DecryptionState::CollectingShares);
        f.submit(2).unwrap();
        assert!(f.mediator.can_decrypt());
    }

    #[test]
    fn roster_and_keys_are_checked() {
        let mut f = fixture(76);
        let mut rng = StdRng::seed_from_u64(760);
        let stranger = generate::key_ceremony(&mut rng, 3, 2);

        assert!(matches!(
            f.mediator.submit_tally_share(&stranger.public_keys[0], f.shares[0].clone()),
            Err(MediatorError::GuardianKeyMismatch { .. })
        ));

        let tally = f.election.tally("other");
        let short = f.election.ceremony.public_keys[..2].to_vec();
        assert!(matches!(
            DecryptionMediator::new(tally, short, DecryptionConfig::default()),
            Err(MediatorError::RosterSize { expected: 3, actual: 2, .. })
        ));

        let tally = f.election.tally("other");
        let mut mixed = f.election.ceremony.public_keys.clone();
        mixed[1] = stranger.public_keys[1].clone();
        assert!(matches!(
            DecryptionMediator::new(tally, mixed, DecryptionConfig::default()),
            Err(MediatorError::JointKeyMismatch { .. })
        ));
    }

    #[test]
    fn search_bound_comes_from_config() {
        let mut f = fixture_with(77, DecryptionConfig::new(1).unwrap(), &[]);
        f.submit(0).unwrap();
        f.submit(1).unwrap();
        match f.mediator.decrypt(false) {
            DecryptionResult::Invalid { message, .. } => assert!(message.contains("measure-a-yes")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn spoiled_ballots_are_decrypted_alongside() {
        let mut f = fixture_with(78, DecryptionConfig::default(), &["s1"]);
        let spoiled = f.spoiled[0].clone();

        let mut cast = spoiled.clone();
        cast.state = BallotBoxState::Cast;
        assert!(matches!(
            f.mediator.submit_spoiled_ballot(cast),
            Err(MediatorError::NotSpoiled { .. })
        ));
        let mut stranger = spoiled.clone();
        stranger.object_id = "s2".to_string();
        assert!(matches!(
            f.mediator.submit_spoiled_ballot(stranger),
            Err(MediatorError::UnknownBallot { .. })
        ));
        f.mediator.submit_spoiled_ballot(spoiled.clone()).unwrap();
        assert!(matches!(
            f.mediator.submit_spoiled_ballot(spoiled.clone()),
            Err(MediatorError::DuplicateBallot { .. })
        ));

        f.submit(0).unwrap();
        f.submit(2).unwrap();
        assert!(matches!(
            f.mediator.readiness(),
            Err(MediatorError::MissingBallotShare { .. })
        ));

        for i in [0, 2] {
            let key = f.election.ceremony.public_keys[i].clone();
            let share = f.election.ceremony.key_shares[i].compute_ballot_share(&spoiled, &f.election.context, &mut f.rng);
            f.mediator.submit_ballot_share(&key, share.clone()).unwrap();
            assert!(matches!(
                f.mediator.submit_ballot_share(&key, share),
                Err(MediatorError::DuplicateBallotShare { .. })
            ));
        }

        match f.mediator.decrypt(false) {
            DecryptionResult::Decrypted {
                tally,
                challenged_ballots,
                ..
            } => {
                assert_eq!(tally.count("measure-a", "measure-a-yes"), Some(2));
                // Spoiled ballots never reach the count.
                assert_eq!(tally.count("council", "council-bo"), Some(0));
                let ballot = &challenged_ballots["s1"];
                assert_eq!(ballot.count("council", "council-bo"), Some(1));
                assert_eq!(ballot.count("council", "council-ada"), Some(0));
                assert_eq!(ballot.count("measure-a", "measure-a-yes"), Some(0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
