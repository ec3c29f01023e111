//! Queue of music tracks waiting to be played.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::VecDeque;

use resound_core::Track;

/// First-in, first-out queue of tracks not yet started.
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of queued tracks.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a track to the end of the queue.
    pub fn push(&mut self, track: Track) {
        self.items.push_back(track);
    }

    /// Take the track at the front of the queue.
    pub fn pop(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// The track that would be played next.
    pub fn peek(&self) -> Option<&Track> {
        self.items.front()
    }

    /// Iterate over queued tracks in play order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    /// Drop every queued track. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}

impl Extend<Track> for TrackQueue {
    fn extend<I: IntoIterator<Item = Track>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl FromIterator<Track> for TrackQueue {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = TrackQueue::new();
        queue.push(Track::from_clip("a.ogg"));
        queue.push(Track::from_clip("b.ogg"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().unwrap().id, "a.ogg");
        assert_eq!(queue.pop().unwrap().id, "a.ogg");
        assert_eq!(queue.pop().unwrap().id, "b.ogg");
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue: TrackQueue = ["a.ogg", "b.ogg", "c.ogg"]
            .into_iter()
            .map(Track::from_clip)
            .collect();
        assert_eq!(queue.clear(), 3);
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn test_extend_and_iter() {
        let mut queue = TrackQueue::new();
        queue.extend(vec![Track::from_clip("x.ogg"), Track::from_clip("y.ogg")]);
        let ids: Vec<&str> = queue.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["x.ogg", "y.ogg"]);
    }
}
