use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use gambit::orchestrator::OrchestratorConfig;
use gambit::service::EngineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct GambitCliConfig {
    pub engines: BTreeMap<String, EngineConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig
}

impl GambitCliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&config)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn engine(&self, name: &str) -> Result<&EngineConfig> {
        self.engines
            .get(name)
            .with_context(|| format!("no engine named `{}` in config", name))
    }
}
