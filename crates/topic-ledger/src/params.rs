use serde::{Deserialize, Serialize};

use topic_types::{BlockHeight, Label, ParticipantId, TopicId};

use crate::error::TopicError;

/// Minimum number of outcomes a topic must offer.
pub const MIN_OUTCOMES: usize = 2;

/// Construction parameters supplied by whoever deploys a topic.
///
/// Labels are raw bytes here; [`TopicParams::validate`] turns them into the
/// immutable [`TopicDefinition`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicParams {
    pub owner: ParticipantId,
    pub name: Vec<u8>,
    pub outcomes: Vec<Vec<u8>>,
    pub deadline_block: BlockHeight,
}

impl TopicParams {
    pub fn new<N, O, I>(
        owner: ParticipantId,
        name: N,
        outcomes: I,
        deadline_block: BlockHeight,
    ) -> Self
    where
        N: Into<Vec<u8>>,
        O: Into<Vec<u8>>,
        I: IntoIterator<Item = O>,
    {
        Self {
            owner,
            name: name.into(),
            outcomes: outcomes.into_iter().map(Into::into).collect(),
            deadline_block,
        }
    }

    /// Check every construction rule and build the immutable definition.
    pub fn validate(&self) -> Result<TopicDefinition, TopicError> {
        let name = Label::new(self.name.clone())
            .map_err(|e| TopicError::InvalidConfiguration(format!("name: {e}")))?;

        if self.outcomes.len() < MIN_OUTCOMES {
            return Err(TopicError::InvalidConfiguration(format!(
                "at least {MIN_OUTCOMES} outcomes required, got {}",
                self.outcomes.len()
            )));
        }

        let outcomes = self
            .outcomes
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                Label::new(raw.clone()).map_err(|e| {
                    TopicError::InvalidConfiguration(format!("outcome {index}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TopicDefinition {
            id: TopicId::derive(&self.owner, &name, &outcomes, self.deadline_block),
            owner: self.owner.clone(),
            name,
            outcomes,
            deadline_block: self.deadline_block,
        })
    }
}

/// The validated, immutable identity of a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicDefinition {
    pub id: TopicId,
    pub owner: ParticipantId,
    pub name: Label,
    pub outcomes: Vec<Label>,
    pub deadline_block: BlockHeight,
}

impl TopicDefinition {
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn outcome(&self, index: usize) -> Result<&Label, TopicError> {
        self.outcomes.get(index).ok_or(TopicError::InvalidOutcome {
            index,
            outcome_count: self.outcomes.len(),
        })
    }

    pub fn to_params(&self) -> TopicParams {
        TopicParams {
            owner: self.owner.clone(),
            name: self.name.as_bytes().to_vec(),
            outcomes: self
                .outcomes
                .iter()
                .map(|o| o.as_bytes().to_vec())
                .collect(),
            deadline_block: self.deadline_block,
        }
    }
}
