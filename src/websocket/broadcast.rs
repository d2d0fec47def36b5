//! Room-wide frame fan-out with per-recipient failure handling.

use super::{ConnectionId, Frame, RoomRegistry};

/// Hard per-frame ceiling. Frames above this are dropped without notice and
/// the sending connection stays open.
pub const MAX_FRAME_BYTES: usize = 1_600_000;

/// Deliver `frame` to every member of `room` except `sender`; `None`
/// addresses all members (the presence path has no sender to skip).
///
/// A failed delivery marks that recipient dead without aborting the rest of
/// the fan-out; the dead are removed afterwards. Returns how many members
/// were removed so the caller knows membership changed. Never errors.
pub async fn relay(
    registry: &RoomRegistry,
    room: &str,
    sender: Option<ConnectionId>,
    frame: Frame,
) -> usize {
    if frame.len() > MAX_FRAME_BYTES {
        tracing::debug!(room = %room, bytes = frame.len(), "dropping oversized frame");
        return 0;
    }

    let members = registry.snapshot(room).await;

    let mut dead = Vec::new();
    for member in &members {
        if sender == Some(member.id()) {
            continue;
        }
        if member.deliver(frame.clone()).is_err() {
            dead.push(member.id());
        }
    }

    if !dead.is_empty() {
        registry.remove_all(room, &dead).await;
        tracing::debug!(room = %room, dropped = dead.len(), "cleaned up dead members during relay");
    }

    dead.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::RoomMember;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn received(rx: &mut UnboundedReceiver<Frame>) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(frame);
        }
        out
    }

    #[tokio::test]
    async fn relays_to_everyone_except_the_sender() {
        let registry = RoomRegistry::new();
        let (a, mut a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();
        let (c, mut c_rx) = RoomMember::register();
        let a_id = a.id();

        registry.join("lobby", a).await;
        registry.join("lobby", b).await;
        registry.join("lobby", c).await;

        let dropped = relay(
            &registry,
            "lobby",
            Some(a_id),
            Frame::Text("hello".into()),
        )
        .await;

        assert_eq!(dropped, 0);
        assert!(received(&mut a_rx).is_empty());
        assert_eq!(received(&mut b_rx), vec![Frame::Text("hello".into())]);
        assert_eq!(received(&mut c_rx), vec![Frame::Text("hello".into())]);
    }

    #[tokio::test]
    async fn without_a_sender_every_member_receives() {
        let registry = RoomRegistry::new();
        let (a, mut a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();

        registry.join("lobby", a).await;
        registry.join("lobby", b).await;

        relay(&registry, "lobby", None, Frame::Text("all".into())).await;

        assert_eq!(received(&mut a_rx).len(), 1);
        assert_eq!(received(&mut b_rx).len(), 1);
    }

    #[tokio::test]
    async fn oversized_frames_are_dropped_silently() {
        let registry = RoomRegistry::new();
        let (a, _a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();
        let a_id = a.id();

        registry.join("lobby", a).await;
        registry.join("lobby", b).await;

        let oversized = Frame::Text("x".repeat(MAX_FRAME_BYTES + 1));
        let dropped = relay(&registry, "lobby", Some(a_id), oversized).await;

        assert_eq!(dropped, 0);
        assert!(received(&mut b_rx).is_empty());
        // The sender is still a member; only the frame was discarded.
        assert_eq!(registry.member_count("lobby").await, 2);
    }

    #[tokio::test]
    async fn frames_at_the_ceiling_still_relay() {
        let registry = RoomRegistry::new();
        let (a, _a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();
        let a_id = a.id();

        registry.join("lobby", a).await;
        registry.join("lobby", b).await;

        let payload = "x".repeat(MAX_FRAME_BYTES);
        relay(&registry, "lobby", Some(a_id), Frame::Text(payload.clone())).await;

        assert_eq!(received(&mut b_rx), vec![Frame::Text(payload)]);
    }

    #[tokio::test]
    async fn a_dead_recipient_is_evicted_without_aborting_the_fanout() {
        let registry = RoomRegistry::new();
        let (a, _a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();
        let (c, c_rx) = RoomMember::register();
        let a_id = a.id();
        let c_id = c.id();

        registry.join("ops", a).await;
        registry.join("ops", b).await;
        registry.join("ops", c).await;

        // C's transport is gone.
        drop(c_rx);

        let dropped = relay(&registry, "ops", Some(a_id), Frame::Text("still here".into())).await;

        assert_eq!(dropped, 1);
        assert_eq!(received(&mut b_rx), vec![Frame::Text("still here".into())]);
        assert_eq!(registry.member_count("ops").await, 2);
        assert!(registry
            .snapshot("ops")
            .await
            .iter()
            .all(|m| m.id() != c_id));
    }

    #[tokio::test]
    async fn binary_frames_arrive_byte_identical() {
        let registry = RoomRegistry::new();
        let (a, _a_rx) = RoomMember::register();
        let (b, mut b_rx) = RoomMember::register();
        let a_id = a.id();

        registry.join("lobby", a).await;
        registry.join("lobby", b).await;

        let payload = bytes::Bytes::from(vec![0u8, 159, 146, 150]);
        relay(&registry, "lobby", Some(a_id), Frame::Binary(payload.clone())).await;

        assert_eq!(received(&mut b_rx), vec![Frame::Binary(payload)]);
    }
}
