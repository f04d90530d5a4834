//! Capacity-1 handoff between accept loops and the consumer
//!
//! The queue holds at most one item. `offer` parks the accept side while
//! the slot is occupied, which is the only backpressure in this layer;
//! `claim` parks the consumer while the slot is empty. An unbounded queue
//! would silently drop that backpressure, so the capacity is fixed here.

use tokio::sync::mpsc;

/// Accept-side handle. Cloned into each execution path that offers
/// connections.
#[derive(Debug)]
pub struct Handoff<T> {
    tx: mpsc::Sender<T>,
}

// not derived: the handle clones for any `T`, the queue carries boxed
// trait objects
impl<T> Clone for Handoff<T> {
    fn clone(&self) -> Self {
        Handoff {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer-side handle, owned by whoever claims connections.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<T>,
}

/// Creates the single-slot queue pair.
pub fn handoff<T>() -> (Handoff<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (Handoff { tx }, HandoffReceiver { rx })
}

impl<T> Handoff<T> {
    /// Offers one item, waiting until the slot frees up. Returns the item
    /// back when the claim side is gone.
    pub async fn offer(&self, item: T) -> Result<(), T> {
        self.tx.send(item).await.map_err(|e| e.0)
    }

    /// True once the claim side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> HandoffReceiver<T> {
    /// Claims the next item, waiting until one is offered. `None` once
    /// every offer side is gone.
    pub async fn claim(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn offer_then_claim_delivers() {
        let (tx, mut rx) = handoff();
        tx.offer(7u32).await.unwrap();
        assert_eq!(rx.claim().await, Some(7));
    }

    #[tokio::test]
    async fn second_offer_waits_for_the_first_claim() {
        let (tx, mut rx) = handoff();
        tx.offer(1u32).await.unwrap();

        let tx2 = tx.clone();
        let second = tokio::spawn(async move { tx2.offer(2).await });

        // slot occupied, the second offer must still be parked
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        assert_eq!(rx.claim().await, Some(1));
        timeout(Duration::from_secs(1), second)
            .await
            .expect("second offer should complete once the slot frees")
            .unwrap()
            .unwrap();
        assert_eq!(rx.claim().await, Some(2));
    }

    #[tokio::test]
    async fn claim_ends_when_offer_side_is_gone() {
        let (tx, mut rx) = handoff::<u32>();
        drop(tx);
        assert_eq!(rx.claim().await, None);
    }

    #[tokio::test]
    async fn offer_returns_the_item_when_claim_side_is_gone() {
        let (tx, rx) = handoff();
        drop(rx);
        assert_eq!(tx.offer(9u32).await, Err(9));
    }

    #[tokio::test]
    async fn closed_flag_tracks_the_claim_side() {
        let (tx, rx) = handoff::<u32>();
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn offer_side_clones_when_items_cannot() {
        struct Token(u8);

        let (tx, mut rx) = handoff();
        let tx2 = tx.clone();

        assert!(tx.offer(Token(1)).await.is_ok());
        assert_eq!(rx.claim().await.map(|t| t.0), Some(1));

        assert!(tx2.offer(Token(2)).await.is_ok());
        assert_eq!(rx.claim().await.map(|t| t.0), Some(2));
    }
}
