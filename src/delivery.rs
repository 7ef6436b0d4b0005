//! Delivery reconciliation
//!
//! Every load request records `pending[target] = locator` before any work is
//! scheduled. Background completions travel over a channel to the host's
//! delivery thread, where [`DeliveryLoop`] applies each one only if its
//! locator is still the latest request for that target. Anything else is
//! discarded, so a reused target never shows a superseded image.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tracing::{debug, trace};

use crate::decode::DecodedImage;
use crate::locator::Locator;
use crate::stats::LoadCounters;
use crate::target::{RenderTarget, TargetId};

/// Latest requested locator per target
///
/// Keyed by [`TargetId`], so it never keeps a target alive.
#[derive(Debug, Default)]
pub struct PendingRequests {
    map: RwLock<HashMap<TargetId, Locator>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `locator` as the target's most recent request
    pub fn set(&self, target: TargetId, locator: Locator) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, locator);
    }

    pub fn current(&self, target: TargetId) -> Option<Locator> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .cloned()
    }

    /// Whether `locator` is still what the target last asked for
    pub fn is_current(&self, target: TargetId, locator: &Locator) -> bool {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .is_some_and(|pending| pending == locator)
    }

    /// Forget a target; results still in flight for it will be discarded
    pub fn detach(&self, target: TargetId) -> Option<Locator> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&target)
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A finished background load, on its way to the delivery thread
pub struct Delivery {
    pub(crate) target: Weak<dyn RenderTarget>,
    pub(crate) target_id: TargetId,
    pub(crate) locator: Locator,
    pub(crate) image: Arc<DecodedImage>,
}

/// What happened to a delivery once it reached the delivery thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Applied,
    /// The target requested something else since
    Superseded,
    /// The host dropped the target
    TargetGone,
}

/// Receiving end of the completion channel, pumped by the host on its
/// single delivery thread
pub struct DeliveryLoop {
    rx: Receiver<Delivery>,
    pending: Arc<PendingRequests>,
    counters: Arc<LoadCounters>,
}

impl DeliveryLoop {
    pub(crate) fn new(
        rx: Receiver<Delivery>,
        pending: Arc<PendingRequests>,
        counters: Arc<LoadCounters>,
    ) -> Self {
        Self {
            rx,
            pending,
            counters,
        }
    }

    /// Process every completion already queued without blocking. Returns how
    /// many were processed.
    pub fn run_pending(&self) -> usize {
        let mut processed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(delivery) => {
                    self.deliver(delivery);
                    processed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        processed
    }

    /// Wait up to `timeout` for one completion and process it. Returns
    /// `None` on timeout or once the loader is gone.
    pub fn run_next(&self, timeout: Duration) -> Option<DeliveryOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => Some(self.deliver(delivery)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply a completion if it is still current for its target
    pub fn deliver(&self, delivery: Delivery) -> DeliveryOutcome {
        let Delivery {
            target,
            target_id,
            locator,
            image,
        } = delivery;

        if !self.pending.is_current(target_id, &locator) {
            trace!("Discarding superseded result {} for {}", locator, target_id);
            self.counters.record_discarded();
            return DeliveryOutcome::Superseded;
        }

        let Some(target) = target.upgrade() else {
            trace!("Discarding {}: {} was dropped", locator, target_id);
            self.counters.record_discarded();
            return DeliveryOutcome::TargetGone;
        };

        debug!("Applying {} to {}", locator, target_id);
        target.show_image(&locator, image);
        self.counters.record_applied();
        DeliveryOutcome::Applied
    }
}

pub(crate) type DeliverySender = Sender<Delivery>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Displayed, MemoryTarget};
    use std::sync::mpsc;

    fn image() -> Arc<DecodedImage> {
        Arc::new(DecodedImage::from_rgba(vec![0; 4], 1, 1))
    }

    fn delivery_for(target: &Arc<MemoryTarget>, locator: &str) -> Delivery {
        let weak: Weak<dyn RenderTarget> = Arc::downgrade(target) as Weak<dyn RenderTarget>;
        Delivery {
            target: weak,
            target_id: target.id(),
            locator: Locator::from(locator),
            image: image(),
        }
    }

    fn setup() -> (DeliverySender, DeliveryLoop, Arc<PendingRequests>, Arc<LoadCounters>) {
        let (tx, rx) = mpsc::channel();
        let pending = Arc::new(PendingRequests::new());
        let counters = Arc::new(LoadCounters::default());
        let delivery_loop = DeliveryLoop::new(rx, Arc::clone(&pending), Arc::clone(&counters));
        (tx, delivery_loop, pending, counters)
    }

    #[test]
    fn test_pending_last_writer_wins() {
        let pending = PendingRequests::new();
        let id = TargetId::next();
        pending.set(id, Locator::from("a"));
        pending.set(id, Locator::from("b"));
        assert_eq!(pending.current(id), Some(Locator::from("b")));
        assert!(!pending.is_current(id, &Locator::from("a")));
        assert_eq!(pending.detach(id), Some(Locator::from("b")));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_current_result_is_applied() {
        let (tx, delivery_loop, pending, counters) = setup();
        let target = MemoryTarget::new();
        pending.set(target.id(), Locator::from("l1"));

        tx.send(delivery_for(&target, "l1")).unwrap();
        assert_eq!(delivery_loop.run_pending(), 1);

        assert_eq!(target.current().locator(), Some(&Locator::from("l1")));
        assert_eq!(counters.snapshot().applied, 1);
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let (tx, delivery_loop, pending, counters) = setup();
        let target = MemoryTarget::new();
        pending.set(target.id(), Locator::from("l1"));
        pending.set(target.id(), Locator::from("l2"));

        tx.send(delivery_for(&target, "l1")).unwrap();
        assert_eq!(
            delivery_loop.run_next(Duration::from_secs(1)),
            Some(DeliveryOutcome::Superseded)
        );
        assert_eq!(target.current(), Displayed::Nothing);
        assert_eq!(counters.snapshot().discarded, 1);
    }

    #[test]
    fn test_detached_target_discards() {
        let (tx, delivery_loop, pending, _) = setup();
        let target = MemoryTarget::new();
        pending.set(target.id(), Locator::from("l1"));
        pending.detach(target.id());

        tx.send(delivery_for(&target, "l1")).unwrap();
        assert_eq!(
            delivery_loop.run_next(Duration::from_secs(1)),
            Some(DeliveryOutcome::Superseded)
        );
    }

    #[test]
    fn test_dropped_target_discards() {
        let (tx, delivery_loop, pending, _) = setup();
        let target = MemoryTarget::new();
        pending.set(target.id(), Locator::from("l1"));
        let delivery = delivery_for(&target, "l1");
        drop(target);

        tx.send(delivery).unwrap();
        assert_eq!(
            delivery_loop.run_next(Duration::from_secs(1)),
            Some(DeliveryOutcome::TargetGone)
        );
    }

    #[test]
    fn test_run_next_times_out() {
        let (_tx, delivery_loop, _, _) = setup();
        assert_eq!(delivery_loop.run_next(Duration::from_millis(10)), None);
    }
}
