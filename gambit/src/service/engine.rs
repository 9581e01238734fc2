use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vampirc_uci::UciMessage;

use crate::orchestrator::duration_str;

use super::error::ServiceError;
use super::raw_engine::RawEngine;
use super::uci_convert::*;
use super::{MoveRequest, MoveService};

fn default_movetime() -> Duration {
    Duration::from_millis(1000)
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Option<UciOptionValue>>,
    /// Search time requested per move. Should stay below the orchestrator's
    /// per-attempt timeout.
    #[serde(default = "default_movetime", with = "duration_str")]
    pub movetime: Duration,
    #[serde(default = "default_handshake_timeout", with = "duration_str")]
    pub handshake_timeout: Duration
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UciOptionValue {
    String(String),
    Integer(i64),
    Boolean(bool)
}

/// A UCI engine process used as an external move-generation service.
#[derive(Debug)]
pub struct UciEngine {
    engine: RawEngine,
    engine_name: String,
    movetime: Duration,
    searching: bool
}

impl UciEngine {
    pub async fn new(config: &EngineConfig) -> Result<Self, ServiceError> {
        let engine = RawEngine::new(Path::new(&config.path), &config.args).await?;
        let mut this = Self {
            engine,
            engine_name: String::new(),
            movetime: config.movetime,
            searching: false
        };
        tokio::time::timeout(config.handshake_timeout, this.init(config))
            .await
            .map_err(|_| ServiceError::Timeout(config.handshake_timeout))??;
        Ok(this)
    }

    async fn init(&mut self, config: &EngineConfig) -> Result<(), ServiceError> {
        self.engine.send(&UciMessage::Uci).await?;
        loop {
            match self.engine.recv().await?.ok_or(ServiceError::UnexpectedTermination)? {
                UciMessage::UciOk => break,
                UciMessage::Id { name: Some(name), .. } => self.engine_name = name,
                _ => {}
            }
        }

        for (name, value) in &config.options {
            let name = name.clone();
            let value = value.as_ref().map(|v| match v {
                UciOptionValue::String(s) => s.clone(),
                UciOptionValue::Integer(i) => format!("{}", i),
                UciOptionValue::Boolean(b) => format!("{}", b)
            });
            self.engine.send(&UciMessage::SetOption { name, value }).await?;
        }
        self.sync().await?;
        debug!(engine = %self.engine_name, "engine ready");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.engine_name
    }

    /// Waits for `readyok`, discarding anything the engine says first.
    async fn sync(&mut self) -> Result<(), ServiceError> {
        self.engine.send(&UciMessage::IsReady).await?;
        loop {
            match self.engine.recv().await?.ok_or(ServiceError::UnexpectedTermination)? {
                UciMessage::ReadyOk => return Ok(()),
                UciMessage::BestMove { best_move, .. } => {
                    debug!(%best_move, "discarding stale bestmove");
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl MoveService for UciEngine {
    async fn request_move(&mut self, request: &MoveRequest) -> Result<String, ServiceError> {
        if self.searching {
            // The previous request was abandoned mid-search.
            warn!(engine = %self.engine_name, "stopping abandoned search");
            self.engine.send(&UciMessage::Stop).await?;
            self.sync().await?;
            self.searching = false;
        }
        self.engine.send(&request_to_position_message(request)).await?;
        self.engine.send(&movetime_to_go_message(self.movetime)).await?;
        self.searching = true;
        loop {
            match self.engine.recv().await?.ok_or(ServiceError::UnexpectedTermination)? {
                UciMessage::BestMove { best_move, .. } => {
                    self.searching = false;
                    return Ok(best_move.to_string());
                }
                UciMessage::Unknown(line, _) if line.trim_start().starts_with("bestmove") => {
                    // e.g. `bestmove (none)`, which has no parseable move.
                    self.searching = false;
                    return Ok(line.trim().trim_start_matches("bestmove").trim().to_owned());
                }
                _ => {}
            }
        }
    }
}
