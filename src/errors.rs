//! Error types for the crate.
//!
//! Each concern gets its own `thiserror` enum.  Every variant carries the ids (tally, ballot,
//! guardian, contest, selection) needed to tell an auditor exactly which item was rejected.

use thiserror::Error;

/// Conversion of raw integers into group elements or exponents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("{bits}-bit value is out of range for modulus {modulus}")]
    OutOfRange { modulus: &'static str, bits: u64 },
    #[error("value is not a member of the order-q subgroup")]
    NotInSubgroup,
}

/// Construction of the election context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("quorum {quorum} is invalid for {number_of_guardians} guardians")]
    InvalidQuorum {
        quorum: u32,
        number_of_guardians: u32,
    },
}

/// Problems with a guardian's published key-ceremony output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardianError {
    #[error("guardian {guardian_id} has sequence order 0")]
    ZeroSequenceOrder { guardian_id: String },
    #[error("guardian {guardian_id} published {actual} coefficients, expected {expected}")]
    CoefficientCount {
        guardian_id: String,
        expected: usize,
        actual: usize,
    },
    #[error("guardian {guardian_id} key does not match its constant coefficient commitment")]
    KeyMismatch { guardian_id: String },
    #[error("guardian {guardian_id} coefficient {index} is not a valid group element")]
    InvalidCommitment { guardian_id: String, index: usize },
    #[error("guardian {guardian_id} coefficient {index} has an invalid Schnorr proof")]
    InvalidProof { guardian_id: String, index: usize },
}

/// Structural or cryptographic problems with an encrypted ballot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("ballot {ballot_id} was encrypted for a different manifest")]
    ManifestMismatch { ballot_id: String },
    #[error("ballot {ballot_id} has unknown style {style_id}")]
    UnknownStyle { ballot_id: String, style_id: String },
    #[error("ballot {ballot_id} contains contest {contest_id} which its style does not list")]
    UnknownContest {
        ballot_id: String,
        contest_id: String,
    },
    #[error("ballot {ballot_id} lists contest {contest_id} more than once")]
    DuplicateContest {
        ballot_id: String,
        contest_id: String,
    },
    #[error("ballot {ballot_id} is missing contest {contest_id}")]
    MissingContest {
        ballot_id: String,
        contest_id: String,
    },
    #[error("ballot {ballot_id} contest {contest_id} does not match its description")]
    ContestMismatch {
        ballot_id: String,
        contest_id: String,
    },
    #[error("ballot {ballot_id} contest {contest_id} selection {selection_id} does not match its description")]
    SelectionMismatch {
        ballot_id: String,
        contest_id: String,
        selection_id: String,
    },
    #[error("ballot {ballot_id} contest {contest_id} lists selection {selection_id} more than once")]
    DuplicateSelection {
        ballot_id: String,
        contest_id: String,
        selection_id: String,
    },
    #[error("ballot {ballot_id} contest {contest_id} has {actual} selections, expected {expected}")]
    SelectionCount {
        ballot_id: String,
        contest_id: String,
        expected: usize,
        actual: usize,
    },
    #[error("ballot {ballot_id} selection {selection_id} ciphertext is not in the group")]
    InvalidCiphertext {
        ballot_id: String,
        selection_id: String,
    },
    #[error("ballot {ballot_id} selection {selection_id} has an invalid 0/1 proof")]
    SelectionProof {
        ballot_id: String,
        selection_id: String,
    },
    #[error("ballot {ballot_id} contest {contest_id} has an invalid selection limit proof")]
    ContestProof {
        ballot_id: String,
        contest_id: String,
    },
}

/// Failures while folding ballots into an encrypted tally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TallyError {
    #[error("tally {tally_id} already contains ballot {ballot_id}")]
    DuplicateBallot { tally_id: String, ballot_id: String },
    #[error("tally {tally_id} cannot accept ballot {ballot_id} in state Unknown")]
    UnknownState { tally_id: String, ballot_id: String },
    #[error("tally {tally_id} rejected ballot: {source}")]
    InvalidBallot {
        tally_id: String,
        #[source]
        source: BallotError,
    },
    #[error("tally {tally_id} has no contest {contest_id} (ballot {ballot_id})")]
    UnknownContest {
        tally_id: String,
        ballot_id: String,
        contest_id: String,
    },
    #[error("tally {tally_id} got contest {contest_id} twice on ballot {ballot_id}")]
    DuplicateContest {
        tally_id: String,
        ballot_id: String,
        contest_id: String,
    },
    #[error("tally {tally_id} got selection {selection_id} twice in contest {contest_id} on ballot {ballot_id}")]
    DuplicateSelection {
        tally_id: String,
        ballot_id: String,
        contest_id: String,
        selection_id: String,
    },
    #[error("tally {tally_id} contest {contest_id} has no selection {selection_id} (ballot {ballot_id})")]
    UnknownSelection {
        tally_id: String,
        ballot_id: String,
        contest_id: String,
        selection_id: String,
    },
}

/// Degenerate input to Lagrange coefficient computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LagrangeError {
    #[error("no guardians to compute coefficients for")]
    Empty,
    #[error("guardian {guardian_id} has sequence order 0")]
    ZeroSequenceOrder { guardian_id: String },
    #[error("guardian {guardian_id} appears more than once")]
    DuplicateGuardian { guardian_id: String },
    #[error("guardians {first} and {second} share sequence order {sequence_order}")]
    DuplicateSequenceOrder {
        sequence_order: u32,
        first: String,
        second: String,
    },
}

/// A partial decryption share that does not fit, or does not prove, what it claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    #[error("share for {object_id} is from guardian {actual}, expected {expected}")]
    GuardianMismatch {
        object_id: String,
        expected: String,
        actual: String,
    },
    #[error("share from guardian {guardian_id} is for {actual}, expected {expected}")]
    ObjectMismatch {
        guardian_id: String,
        expected: String,
        actual: String,
    },
    #[error("share from guardian {guardian_id} carries the wrong share public key")]
    KeyMismatch { guardian_id: String },
    #[error("ballot share from guardian {guardian_id} for {ballot_id} does not match the ballot's manifest hash")]
    ManifestMismatch {
        guardian_id: String,
        ballot_id: String,
    },
    #[error("ballot share from guardian {guardian_id} for {ballot_id} has style {actual}, expected {expected}")]
    StyleMismatch {
        guardian_id: String,
        ballot_id: String,
        expected: String,
        actual: String,
    },
    #[error("share from guardian {guardian_id} is missing contest {contest_id}")]
    MissingContest {
        guardian_id: String,
        contest_id: String,
    },
    #[error("share from guardian {guardian_id} has unexpected contest {contest_id}")]
    UnexpectedContest {
        guardian_id: String,
        contest_id: String,
    },
    #[error("share from guardian {guardian_id} is missing selection {selection_id} of contest {contest_id}")]
    MissingSelection {
        guardian_id: String,
        contest_id: String,
        selection_id: String,
    },
    #[error("share from guardian {guardian_id} has unexpected selection {selection_id} in contest {contest_id}")]
    UnexpectedSelection {
        guardian_id: String,
        contest_id: String,
        selection_id: String,
    },
    #[error("share from guardian {guardian_id} for {object_id} does not match its description")]
    DescriptionMismatch {
        guardian_id: String,
        object_id: String,
    },
    #[error("share from guardian {guardian_id} for selection {selection_id} is not in the group")]
    InvalidShare {
        guardian_id: String,
        selection_id: String,
    },
    #[error("share from guardian {guardian_id} for selection {selection_id} has an invalid proof")]
    InvalidProof {
        guardian_id: String,
        selection_id: String,
    },
}

/// Combining shares and recovering plaintexts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error(transparent)]
    Lagrange(#[from] LagrangeError),
    #[error("guardian {guardian_id} is invalid: {source}")]
    InvalidGuardian {
        guardian_id: String,
        #[source]
        source: ShareError,
    },
    #[error("no share from guardian {guardian_id} for {object_id}")]
    MissingShare {
        guardian_id: String,
        object_id: String,
    },
    #[error("no Lagrange coefficient for guardian {guardian_id}")]
    MissingCoefficient { guardian_id: String },
    #[error("no shares for selection {selection_id}")]
    NoShares { selection_id: String },
    #[error("decryption of selection {selection_id} not found within bound {bound}")]
    NotFound { selection_id: String, bound: u64 },
    #[error("aggregate proof for selection {selection_id} does not verify")]
    AggregateProof { selection_id: String },
}

/// Rejections from the decryption mediator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    #[error("tally {tally_id} expects {expected} guardians, roster has {actual}")]
    RosterSize {
        tally_id: String,
        expected: u32,
        actual: usize,
    },
    #[error("roster for tally {tally_id} lists guardian {guardian_id} twice")]
    DuplicateGuardian { tally_id: String, guardian_id: String },
    #[error("roster for tally {tally_id} does not produce the election public key")]
    JointKeyMismatch { tally_id: String },
    #[error("guardian {guardian_id} is not part of the key ceremony for tally {tally_id}")]
    UnknownGuardian { tally_id: String, guardian_id: String },
    #[error("guardian {guardian_id} key differs from the key ceremony record")]
    GuardianKeyMismatch { guardian_id: String },
    #[error("guardian key rejected: {0}")]
    InvalidGuardianKey(#[source] GuardianError),
    #[error("guardian {guardian_id} already announced for tally {tally_id}")]
    AlreadyAnnounced { tally_id: String, guardian_id: String },
    #[error("guardian {guardian_id} already submitted a share for tally {tally_id}")]
    DuplicateTallyShare { tally_id: String, guardian_id: String },
    #[error("guardian {guardian_id} already submitted a share for ballot {ballot_id}")]
    DuplicateBallotShare {
        ballot_id: String,
        guardian_id: String,
    },
    #[error("ballot {ballot_id} is not a spoiled ballot of tally {tally_id}")]
    UnknownBallot { tally_id: String, ballot_id: String },
    #[error("ballot {ballot_id} is already registered")]
    DuplicateBallot { ballot_id: String },
    #[error("ballot {ballot_id} is not spoiled")]
    NotSpoiled { ballot_id: String },
    #[error("ballot rejected: {0}")]
    InvalidBallot(#[source] BallotError),
    #[error("share for {object_id} rejected: {source}")]
    InvalidShare {
        object_id: String,
        #[source]
        source: ShareError,
    },
    #[error("tally {tally_id} has {available} guardians, quorum is {quorum}")]
    InsufficientQuorum {
        tally_id: String,
        available: usize,
        quorum: u32,
    },
    #[error("tally {tally_id} is waiting on shares from {}", .guardian_ids.join(", "))]
    MissingTallyShares {
        tally_id: String,
        guardian_ids: Vec<String>,
    },
    #[error("ballot {ballot_id} is waiting on a share from guardian {guardian_id}")]
    MissingBallotShare {
        ballot_id: String,
        guardian_id: String,
    },
}

/// Invalid decryption configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_tally must be at least 1")]
    ZeroMaxTally,
    #[error("cannot parse configuration: {0}")]
    Parse(String),
}
