use anyhow::{Context, Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::config::Config;
use crate::storage::Storage;
use crate::types::ObjectRecord;
use crate::types::token::PipelineCancellationToken;

/// Result of sending an object to the next stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

/// Shared context passed to each pipeline stage.
///
/// Stages are connected by bounded channels: each stage reads from
/// `receiver` and writes to `sender`. The lister has no `receiver`.
pub struct Stage {
    pub config: Config,
    pub target: Storage,
    pub receiver: Option<Receiver<ObjectRecord>>,
    pub sender: Option<Sender<ObjectRecord>>,
    pub cancellation_token: PipelineCancellationToken,
}

impl Stage {
    pub fn new(
        config: Config,
        target: Storage,
        receiver: Option<Receiver<ObjectRecord>>,
        sender: Option<Sender<ObjectRecord>>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            config,
            target,
            receiver,
            sender,
            cancellation_token,
        }
    }

    /// Send an object to the next stage.
    ///
    /// Returns `SendResult::Closed` if the downstream receiver has gone away,
    /// allowing the caller to exit gracefully.
    pub async fn send(&self, object: ObjectRecord) -> Result<SendResult> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(anyhow!("stage has no sender."));
        };

        let result = sender
            .send(object)
            .await
            .context("async_channel::Sender::send() failed.");

        if let Err(e) = result {
            return if !sender.is_closed() {
                Err(e)
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }

    pub fn is_channel_closed(&self) -> bool {
        self.sender.as_ref().is_none_or(|sender| sender.is_closed())
    }
}
