//! Subscription dispatch.
//!
//! Subscribers receive every state change as an ordered stream of
//! [`ConsensusChange`] batches and can mirror the consensus set exactly by
//! replaying them. Delivery happens under the engine's write lock, so a
//! subscriber's accumulated view is always a prefix of the engine's history,
//! never a mixture of two histories. The channel is unbounded and the send
//! never blocks; a subscriber that cannot drain its queue is a bug in the
//! subscriber, not backpressure on consensus.

use tokio::sync::mpsc;

use crate::diffs::ConsensusChange;
use crate::state::State;
use crate::ConsensusSet;

/// A subscriber's ordered view of consensus changes.
pub struct ChangeStream {
    receiver: mpsc::UnboundedReceiver<ConsensusChange>,
}

impl ChangeStream {
    /// The next change batch, or `None` if the engine has shut down.
    pub async fn recv(&mut self) -> Option<ConsensusChange> {
        self.receiver.recv().await
    }
}

impl ConsensusSet {
    /// Register a subscriber. The first batch on the stream replays the
    /// entire current path from genesis, bringing the subscriber to the
    /// engine's present state; subsequent batches arrive per accepted
    /// block.
    pub fn subscribe_to_consensus_changes(&self) -> ChangeStream {
        let mut state = self.state.write().expect("consensus set lock poisoned");
        state.subscribe()
    }
}

impl State {
    pub(crate) fn subscribe(&mut self) -> ChangeStream {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut replay = Vec::with_capacity(self.current_path.len());
        for id in &self.current_path {
            let index = self.node_index[id];
            let node = &self.nodes[index];
            assert!(
                node.diffs_generated,
                "block on the current path has no generated diffs"
            );
            replay.push(node.diff.clone());
        }
        let _ = sender.send(ConsensusChange {
            reverted: Vec::new(),
            applied: replay,
        });

        self.subscribers.push(sender);
        ChangeStream { receiver }
    }

    /// Deliver one batch to every subscriber, dropping subscribers whose
    /// receiving end is gone.
    pub(crate) fn notify(&mut self, change: ConsensusChange) {
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}
