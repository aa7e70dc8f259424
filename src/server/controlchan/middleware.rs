use crate::server::{
    controlchan::{error::ControlChanError, Reply},
    Event,
};

use async_trait::async_trait;

// Defines the requirements for code that wants to intercept and act on
// control channel events before (or instead of) the primary handler.
#[async_trait]
pub trait ControlChanMiddleware: Send + Sync {
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError>;
}
