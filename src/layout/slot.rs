//! Layout state channel
//!
//! A single-slot, latest-write-wins channel carrying the current layout from
//! the network context to the render loop. There is no queueing and no
//! back-pressure: a publish replaces whatever the renderer has not yet read.

use super::TileLayout;
use tokio::sync::watch;

/// Writer side of the layout channel, owned by the control-channel glue
pub struct LayoutSlot {
    tx: watch::Sender<Option<TileLayout>>,
}

impl Default for LayoutSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSlot {
    /// Create an empty slot (no layout assigned yet)
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a new layout, replacing any unread previous value
    pub fn publish(&self, layout: TileLayout) {
        log::debug!("Layout published: {:?}", layout);
        self.tx.send_replace(Some(layout));
    }

    /// Current value, if any
    pub fn current(&self) -> Option<TileLayout> {
        self.tx.borrow().clone()
    }

    /// Create a reader for the render loop
    pub fn subscribe(&self) -> LayoutReceiver {
        LayoutReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reader side of the layout channel, polled by the compositor each frame
pub struct LayoutReceiver {
    rx: watch::Receiver<Option<TileLayout>>,
}

impl LayoutReceiver {
    /// Latest published value without consuming the change flag
    pub fn latest(&self) -> Option<TileLayout> {
        self.rx.borrow().clone()
    }

    /// Returns the new value if one was published since the last call,
    /// otherwise `None`. Never blocks.
    pub fn take_changed(&mut self) -> Option<Option<TileLayout>> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rect;

    #[test]
    fn test_latest_write_wins() {
        let slot = LayoutSlot::new();
        let mut rx = slot.subscribe();

        for i in 0..5 {
            slot.publish(TileLayout::region(Rect::new(0.0, 0.0, 1.0, i as f32)));
        }

        // Only the last publish is observable
        let seen = rx.take_changed().expect("change expected");
        assert_eq!(
            seen,
            Some(TileLayout::region(Rect::new(0.0, 0.0, 1.0, 4.0)))
        );
        // And the change flag is consumed
        assert!(rx.take_changed().is_none());
    }

    #[test]
    fn test_empty_slot_reports_no_change() {
        let slot = LayoutSlot::new();
        let mut rx = slot.subscribe();
        assert!(rx.take_changed().is_none());
        assert_eq!(rx.latest(), None);
    }

    #[test]
    fn test_latest_does_not_consume_change() {
        let slot = LayoutSlot::new();
        let mut rx = slot.subscribe();
        slot.publish(TileLayout::region(Rect::full_frame()));

        assert!(rx.latest().is_some());
        assert!(rx.take_changed().is_some());
    }
}
