mod local;
mod remote;

use anyhow::Result;
use async_trait::async_trait;
use common::ParticipantUpdate;

pub use local::LocalProcessionSink;
pub use remote::{RemoteSink, websocket_url};

/// Destination of replayed or synthesized participant positions.
#[async_trait]
pub trait ParticipantSink: Send {
    async fn deliver(&mut self, update: &ParticipantUpdate) -> Result<()>;

    /// Called once after the last update.
    async fn finish(&mut self) -> Result<()>;
}

/// Keeps every update in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub updates: Vec<ParticipantUpdate>,
    pub finished: bool,
}

#[async_trait]
impl ParticipantSink for CollectingSink {
    async fn deliver(&mut self, update: &ParticipantUpdate) -> Result<()> {
        self.updates.push(update.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
