//! The election manifest: which contests exist, which selections they offer, and which ballot
//! styles include them.
//!
//! Ballots and tallies never refer to a description by value, only by id and `crypto_hash`, so
//! this module is mostly about computing those hashes the same way on every side.

use serde::{Deserialize, Serialize};

use crate::crypto::group::Exponent;
use crate::hash_all;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDescription {
    pub object_id: String,
    pub sequence_order: u32,
    pub candidate_id: String,
}

impl SelectionDescription {
    pub fn crypto_hash(&self) -> Exponent {
        hash_all!(self.object_id, self.sequence_order, self.candidate_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescription {
    pub object_id: String,
    pub sequence_order: u32,
    /// The geopolitical unit this contest is held in.
    pub electoral_district_id: String,
    pub name: String,
    /// How many selections a voter must make.  Undervotes are filled with placeholders.
    pub number_elected: u32,
    pub ballot_selections: Vec<SelectionDescription>,
}

impl ContestDescription {
    pub fn crypto_hash(&self) -> Exponent {
        let selection_hashes: Vec<Exponent> = self
            .ballot_selections
            .iter()
            .map(SelectionDescription::crypto_hash)
            .collect();
        hash_all!(
            self.object_id,
            self.sequence_order,
            self.electoral_district_id,
            self.name,
            self.number_elected,
            selection_hashes,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStyle {
    pub object_id: String,
    pub geopolitical_unit_ids: Vec<String>,
}

impl BallotStyle {
    pub fn crypto_hash(&self) -> Exponent {
        hash_all!(self.object_id, self.geopolitical_unit_ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub election_scope_id: String,
    pub ballot_styles: Vec<BallotStyle>,
    pub contests: Vec<ContestDescription>,
}

impl Manifest {
    pub fn crypto_hash(&self) -> Exponent {
        let style_hashes: Vec<Exponent> =
            self.ballot_styles.iter().map(BallotStyle::crypto_hash).collect();
        let contest_hashes: Vec<Exponent> = self
            .contests
            .iter()
            .map(ContestDescription::crypto_hash)
            .collect();
        hash_all!(self.election_scope_id, style_hashes, contest_hashes)
    }
}

/// A contest together with the placeholder selections an encrypted ballot carries for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescriptionWithPlaceholders {
    pub description: ContestDescription,
    pub placeholder_selections: Vec<SelectionDescription>,
}

impl ContestDescriptionWithPlaceholders {
    fn new(description: ContestDescription) -> Self {
        let next_sequence_order = description
            .ballot_selections
            .iter()
            .map(|s| s.sequence_order)
            .max()
            .unwrap_or(0)
            + 1;
        let placeholder_selections = (0..description.number_elected)
            .map(|i| SelectionDescription {
                object_id: format!("{}-{}-placeholder", description.object_id, i),
                sequence_order: next_sequence_order + i,
                candidate_id: format!("{}-{}-candidate", description.object_id, i),
            })
            .collect();
        ContestDescriptionWithPlaceholders {
            description,
            placeholder_selections,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.description.object_id
    }

    pub fn crypto_hash(&self) -> Exponent {
        self.description.crypto_hash()
    }

    /// Every selection a ballot may carry, placeholders last.  The flag is `true` for
    /// placeholders.
    pub fn all_selections(&self) -> impl Iterator<Item = (&SelectionDescription, bool)> {
        self.description
            .ballot_selections
            .iter()
            .map(|s| (s, false))
            .chain(self.placeholder_selections.iter().map(|s| (s, true)))
    }
}

/// The manifest in the form the tally and ballot checks consume: hashed once, with
/// placeholders attached to every contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalManifest {
    pub manifest: Manifest,
    pub manifest_hash: Exponent,
    pub contests: Vec<ContestDescriptionWithPlaceholders>,
}

impl InternalManifest {
    pub fn new(manifest: Manifest) -> Self {
        let manifest_hash = manifest.crypto_hash();
        let contests = manifest
            .contests
            .iter()
            .cloned()
            .map(ContestDescriptionWithPlaceholders::new)
            .collect();
        InternalManifest {
            manifest,
            manifest_hash,
            contests,
        }
    }

    pub fn ballot_style(&self, style_id: &str) -> Option<&BallotStyle> {
        self.manifest
            .ballot_styles
            .iter()
            .find(|s| s.object_id == style_id)
    }

    pub fn contest(&self, contest_id: &str) -> Option<&ContestDescriptionWithPlaceholders> {
        self.contests.iter().find(|c| c.object_id() == contest_id)
    }

    /// The contests that appear on ballots of the given style, or `None` for an unknown style.
    pub fn contests_for(&self, style_id: &str) -> Option<Vec<&ContestDescriptionWithPlaceholders>> {
        let style = self.ballot_style(style_id)?;
        Some(
            self.contests
                .iter()
                .filter(|c| {
                    style
                        .geopolitical_unit_ids
                        .contains(&c.description.electoral_district_id)
                })
                .collect(),
        )
    }
}
