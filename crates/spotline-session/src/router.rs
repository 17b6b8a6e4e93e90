//! Subscription bookkeeping for the live link.
//!
//! A session holds at most one subscription set per room: the three channel
//! destinations registered together on connect. The router owns that set,
//! refuses to build a second one while the first is live, and maps inbound
//! destination paths back to channels. Tearing the set down goes one of two
//! ways: [`Router::unsubscribe_all`] when the link is still up and the
//! server should be told, [`Router::reset`] when the link already died and
//! frames would go nowhere.

use spotline_core::{RoomId, RoomMode};
use spotline_proto::{Channel, Destination};

use crate::error::SessionError;

/// Tracks which destinations the session is subscribed to.
#[derive(Debug, Default)]
pub struct Router {
    active: Option<[Destination; 3]>,
}

impl Router {
    /// Router with no active subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and registers the room's subscription set.
    ///
    /// Returns the destinations to subscribe, message channel first so the
    /// server registers chat delivery before any presence traffic.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadySubscribed`] if a set is still registered.
    /// The previous set must be released through [`Router::unsubscribe_all`]
    /// or [`Router::reset`] first.
    pub fn subscribe_all(
        &mut self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> Result<[Destination; 3], SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadySubscribed { room_id });
        }
        let set = Destination::subscribe_set(mode, room_id);
        self.active = Some(set);
        Ok(set)
    }

    /// Releases the active set, returning the destinations to unregister on
    /// the still-live link. Empty if nothing was registered.
    pub fn unsubscribe_all(&mut self) -> Vec<Destination> {
        self.active.take().map(|set| set.to_vec()).unwrap_or_default()
    }

    /// Forgets the active set without unregistration. For links that are
    /// already gone, where unsubscribe frames would never arrive.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Maps an inbound destination path to its channel, if it belongs to
    /// the active set.
    #[must_use]
    pub fn route(&self, destination: &str) -> Option<Channel> {
        let parsed = Destination::parse(destination).ok()?;
        let active = self.active.as_ref()?;
        active.contains(&parsed).then_some(parsed.channel)
    }

    /// Whether a subscription set is currently registered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }
}
