//! Browser front-end: chat lines arrive over the bridge

use empathy_core::{Dispatcher, TurnResult};
use empathy_me::InboundMessage;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Run one turn per inbound chat line, serially, until `shutdown` resolves
/// or every listener handle is gone.
pub async fn run<F>(dispatcher: &Dispatcher, mut inbound: mpsc::Receiver<InboundMessage>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            message = inbound.recv() => {
                let Some(message) = message else { break };
                info!("Listener {} says: {}", message.listener, message.text);
                match dispatcher.turn(&message.text).await {
                    TurnResult::Completed { reply, classification, .. } => {
                        info!("Replied as {}: {}", classification.tag, reply);
                    }
                    TurnResult::Failed { error } => warn!("Turn failed: {}", error),
                }
            }
            _ = &mut shutdown => break,
        }
    }
}
