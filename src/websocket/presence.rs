//! Presence counting: tells a room how many members it currently has.

use super::{broadcast::relay, message_types::OnlineCount, Frame, RoomRegistry};

/// Broadcast the current member count to every member of `room`. Presence
/// traffic has no sender to skip, so everyone receives it.
///
/// A delivery round can itself evict dead members, which changes the count,
/// so the announcement repeats until a round removes nobody. Membership only
/// shrinks between rounds, so the loop terminates.
pub async fn announce(registry: &RoomRegistry, room: &str) {
    loop {
        let count = registry.member_count(room).await;
        let frame = Frame::Text(OnlineCount::new(count).encode());

        if relay(registry, room, None, frame).await == 0 {
            break;
        }
    }
}
