use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use topic_fabric::FabricConfig;
use topic_ledger::TopicParams;
use topic_types::{BlockHeight, ParticipantId};

/// A topic plus a scripted sequence of deposits, loaded from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub topic: TopicConfig,
    #[serde(default)]
    pub fabric: FabricConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
    #[serde(default)]
    pub deposits: Vec<ScriptedDeposit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Alias the owner identity is derived from.
    pub owner: String,
    pub name: String,
    pub outcomes: Vec<String>,
    pub deadline_block: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub start_height: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub alias: String,
    #[serde(default)]
    pub funds: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedDeposit {
    pub participant: String,
    pub outcome: usize,
    pub amount: u64,
    /// Chain height to mine to before depositing; the current height if unset.
    #[serde(default)]
    pub height: Option<u64>,
}

impl ScenarioFile {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn topic_params(&self) -> TopicParams {
        TopicParams::new(
            ParticipantId::from_alias(&self.topic.owner),
            self.topic.name.as_str(),
            self.topic.outcomes.iter().map(String::as_str),
            BlockHeight::new(self.topic.deadline_block),
        )
    }

    /// Problems that would make the scenario unrunnable or surprising.
    /// Deposits the ledger itself would reject are not reported here.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Err(e) = self.topic_params().validate() {
            issues.push(format!("topic: {e}"));
        }
        if self.fabric.channel_capacity == 0 {
            issues.push("fabric: channel_capacity must be greater than zero".into());
        }

        let mut aliases = BTreeSet::new();
        for p in &self.participants {
            if !aliases.insert(p.alias.as_str()) {
                issues.push(format!("participant {:?} declared twice", p.alias));
            }
        }

        let mut height = self.chain.start_height;
        for (i, d) in self.deposits.iter().enumerate() {
            let step = i + 1;
            if !aliases.contains(d.participant.as_str()) {
                issues.push(format!(
                    "deposit {step}: unknown participant {:?}",
                    d.participant
                ));
            }
            if let Some(h) = d.height {
                if h < height {
                    issues.push(format!(
                        "deposit {step}: height {h} is below the chain height {height}"
                    ));
                }
                height = height.max(h);
            }
        }

        issues
    }
}
