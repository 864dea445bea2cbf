use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::records::{Interaction, RawEvent};
use crate::error::{PipelineErr, Result};

/// A bijection between raw identifiers and dense indices in `[0, len)`,
/// assigned in first-seen order.
///
/// Built once over the values observed at encoding time and never updated
/// incrementally; an identifier that was not seen then is unrepresentable,
/// and `encode` fails loudly rather than coercing to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEncoder {
    kind: &'static str,
    indices: HashMap<String, u32>,
    // Inverse mapping: raw[i] is the identifier encoded as i.
    raw: Vec<String>,
}

impl IdEncoder {
    /// Builds an encoder over `values`, assigning the next free index to
    /// each identifier the first time it appears.
    ///
    /// `kind` names the identifier column in error messages.
    pub fn fit<'a, I>(kind: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indices = HashMap::new();
        let mut raw = Vec::new();
        for value in values {
            if !indices.contains_key(value) {
                indices.insert(value.to_string(), raw.len() as u32);
                raw.push(value.to_string());
            }
        }

        Self { kind, indices, raw }
    }

    /// Number of distinct identifiers in the encoded domain.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Maps a raw identifier to its dense index.
    ///
    /// # Errors
    /// `UnknownId` if `value` was not part of the fitted domain.
    pub fn encode(&self, value: &str) -> Result<u32> {
        self.indices
            .get(value)
            .copied()
            .ok_or_else(|| PipelineErr::UnknownId {
                kind: self.kind,
                id: value.to_string(),
            })
    }

    /// Maps a dense index back to its raw identifier.
    pub fn decode(&self, index: u32) -> Option<&str> {
        self.raw.get(index as usize).map(String::as_str)
    }

    /// The artifact form: raw identifier → dense index, ordered by key.
    fn to_map(&self) -> BTreeMap<String, u32> {
        self.raw
            .iter()
            .enumerate()
            .map(|(index, value)| (value.clone(), index as u32))
            .collect()
    }

    /// Rebuilds an encoder from its artifact form.
    ///
    /// # Errors
    /// `Artifact` if the indices are not a contiguous `0..len` assignment.
    fn from_map(kind: &'static str, map: BTreeMap<String, u32>) -> Result<Self> {
        let mut raw = vec![None; map.len()];
        for (value, index) in &map {
            match raw.get_mut(*index as usize) {
                Some(slot @ None) => *slot = Some(value.clone()),
                _ => {
                    return Err(PipelineErr::Artifact(format!(
                        "{kind} encoder: index {index} is duplicated or out of range"
                    )))
                }
            }
        }

        let raw = raw
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| PipelineErr::Artifact(format!("{kind} encoder: indices are not contiguous")))?;
        let indices = map.into_iter().collect();

        Ok(Self { kind, indices, raw })
    }
}

/// The pair of encoders covering one dataset, persisted together as a
/// single JSON artifact and shared verbatim by both pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSet {
    pub users: IdEncoder,
    pub products: IdEncoder,
}

/// On-disk JSON shape: `{"user_encoder": {raw → int}, "product_encoder": ...}`.
#[derive(Serialize, Deserialize)]
struct EncoderSetArtifact {
    user_encoder: BTreeMap<String, u32>,
    product_encoder: BTreeMap<String, u32>,
}

impl EncoderSet {
    /// Fits both encoders over the identifier columns of `events`.
    pub fn fit(events: &[RawEvent]) -> Self {
        Self {
            users: IdEncoder::fit("user_id", events.iter().map(|e| e.user_id.as_str())),
            products: IdEncoder::fit("product_id", events.iter().map(|e| e.product_id.as_str())),
        }
    }

    /// Rewrites one raw event into its encoded form, substituting dense
    /// indices for raw identifiers and attaching the derived label.
    ///
    /// # Errors
    /// `UnknownId` if either identifier is outside its encoded domain.
    pub fn encode_event(&self, event: &RawEvent, interaction_strength: f64) -> Result<Interaction> {
        Ok(Interaction {
            user_id: self.users.encode(&event.user_id)?,
            product_id: self.products.encode(&event.product_id)?,
            interaction_strength,
        })
    }

    /// Serializes the mapping-of-mappings artifact.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let artifact = EncoderSetArtifact {
            user_encoder: self.users.to_map(),
            product_encoder: self.products.to_map(),
        };
        serde_json::to_vec(&artifact).map_err(Into::into)
    }

    /// Reconstructs the exact fitted mappings from the artifact.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let artifact: EncoderSetArtifact = serde_json::from_slice(bytes)?;
        Ok(Self {
            users: IdEncoder::from_map("user_id", artifact.user_encoder)?,
            products: IdEncoder::from_map("product_id", artifact.product_encoder)?,
        })
    }
}
