//! Gradient state machine
//!
//! Each node tracks its hop distance to the sink, the newest gradient
//! generation it has accepted, and the neighbour it learned its depth from.
//! BUILD packets are evaluated here and discarded; scheduling is left to
//! the caller, which is told whether a re-announcement is due.
//!
//! ## Acceptance
//!
//! A BUILD packet is accepted when either
//!
//! 1. it carries a newer generation than any accepted so far, or
//! 2. it reveals a strictly shorter path, whatever its generation.
//!
//! The second rule can adopt a shorter path from an older generation after
//! a newer, longer one. That precedence is kept as-is.

use gradient_core::{BuildPacket, Mobility, NodeId, Position, Role, SimTime};

/// Result of evaluating one BUILD packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOutcome {
    /// The packet updated depth, generation and parent
    pub accepted: bool,
    /// A re-announcement must be scheduled; at most one is ever pending
    pub should_announce: bool,
}

/// Per-node gradient state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradientState {
    role: Role,
    depth: Option<u32>,
    build_seqno: Option<u32>,
    parent: Option<NodeId>,
    active: bool,
    pending_announce: bool,
}

impl GradientState {
    /// State of an ordinary node before any BUILD has been heard
    pub fn sensor() -> Self {
        Self {
            role: Role::Sensor,
            depth: None,
            build_seqno: None,
            parent: None,
            active: false,
            pending_announce: false,
        }
    }

    /// State of the sink: depth 0, generation 0, already active
    pub fn sink() -> Self {
        Self {
            role: Role::Sink,
            depth: Some(0),
            build_seqno: Some(0),
            parent: None,
            active: true,
            pending_announce: false,
        }
    }

    /// State for a node playing `role`
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Sink => Self::sink(),
            Role::Sensor => Self::sensor(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Hop distance to the sink, if known
    pub fn depth(&self) -> Option<u32> {
        self.depth
    }

    /// Newest accepted generation
    pub fn build_seqno(&self) -> Option<u32> {
        self.build_seqno
    }

    /// Neighbour the current depth was learned from
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node has joined the gradient
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a re-announcement is scheduled and has not fired yet
    pub fn announce_pending(&self) -> bool {
        self.pending_announce
    }

    /// Evaluate a received BUILD packet
    ///
    /// The sink roots the gradient and never accepts.
    pub fn on_build_received(&mut self, packet: &BuildPacket) -> BuildOutcome {
        if self.role == Role::Sink {
            return BuildOutcome::default();
        }

        let offered = packet.depth.saturating_add(1);
        let newer = self.build_seqno.is_none_or(|seq| packet.sequence > seq);
        let shorter = self.depth.is_some_and(|depth| depth > offered);
        if !newer && !shorter {
            return BuildOutcome::default();
        }

        self.build_seqno = Some(
            self.build_seqno
                .map_or(packet.sequence, |seq| seq.max(packet.sequence)),
        );
        self.depth = Some(offered);
        self.parent = Some(packet.source);
        self.active = true;

        let should_announce = !self.pending_announce;
        self.pending_announce = true;
        BuildOutcome {
            accepted: true,
            should_announce,
        }
    }

    /// Mark a re-announcement as scheduled without a received packet
    ///
    /// Returns false if one is already pending.
    pub fn claim_announce(&mut self) -> bool {
        if self.pending_announce {
            return false;
        }
        self.pending_announce = true;
        true
    }

    /// Build the announcement for a firing `tx_build` and clear the latch
    ///
    /// Returns `None` while depth is unknown.
    pub fn announcement(
        &mut self,
        source: NodeId,
        position: Position,
        now: SimTime,
        status: Mobility,
    ) -> Option<BuildPacket> {
        self.pending_announce = false;
        Some(BuildPacket {
            source,
            sequence: self.build_seqno?,
            depth: self.depth?,
            position,
            timestamp: now,
            status,
        })
    }

    /// Start the next generation after a heartbeat
    ///
    /// Only the sink owns generations; sensors are unaffected.
    pub fn advance_generation(&mut self) -> Option<u32> {
        if self.role != Role::Sink {
            return None;
        }
        let next = self.build_seqno.map_or(0, |seq| seq.wrapping_add(1));
        self.build_seqno = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: u32, sequence: u32, depth: u32) -> BuildPacket {
        BuildPacket {
            source: NodeId(source),
            sequence,
            depth,
            position: Position::default(),
            timestamp: SimTime::ZERO,
            status: Mobility::Static,
        }
    }

    #[test]
    fn test_initial_states() {
        let sensor = GradientState::sensor();
        assert_eq!(sensor.depth(), None);
        assert_eq!(sensor.build_seqno(), None);
        assert!(!sensor.is_active());

        let sink = GradientState::sink();
        assert_eq!(sink.depth(), Some(0));
        assert_eq!(sink.build_seqno(), Some(0));
        assert!(sink.is_active());
    }

    #[test]
    fn test_first_build_is_accepted() {
        let mut state = GradientState::sensor();
        let outcome = state.on_build_received(&build(0, 0, 0));

        assert_eq!(
            outcome,
            BuildOutcome {
                accepted: true,
                should_announce: true
            }
        );
        assert_eq!(state.depth(), Some(1));
        assert_eq!(state.build_seqno(), Some(0));
        assert_eq!(state.parent(), Some(NodeId(0)));
        assert!(state.is_active());
        assert!(state.announce_pending());
    }

    #[test]
    fn test_newer_generation_accepted_even_if_longer() {
        let mut state = GradientState::sensor();
        state.on_build_received(&build(0, 0, 0));
        state.announcement(NodeId(1), Position::default(), SimTime::ZERO, Mobility::Static);

        let outcome = state.on_build_received(&build(5, 1, 3));
        assert!(outcome.accepted);
        assert_eq!(state.depth(), Some(4));
        assert_eq!(state.parent(), Some(NodeId(5)));
        assert_eq!(state.build_seqno(), Some(1));
    }

    #[test]
    fn test_same_generation_equal_or_longer_rejected() {
        let mut state = GradientState::sensor();
        state.on_build_received(&build(3, 0, 1));
        assert_eq!(state.depth(), Some(2));

        assert!(!state.on_build_received(&build(4, 0, 1)).accepted);
        assert!(!state.on_build_received(&build(4, 0, 2)).accepted);
        assert_eq!(state.parent(), Some(NodeId(3)));
    }

    #[test]
    fn test_shorter_path_accepted_under_same_generation() {
        let mut state = GradientState::sensor();
        state.on_build_received(&build(3, 0, 2));
        assert_eq!(state.depth(), Some(3));

        let outcome = state.on_build_received(&build(0, 0, 0));
        assert!(outcome.accepted);
        assert_eq!(state.depth(), Some(1));
        assert_eq!(state.parent(), Some(NodeId(0)));
    }

    #[test]
    fn test_stale_generation_shorter_path_keeps_newest_seqno() {
        let mut state = GradientState::sensor();
        state.on_build_received(&build(3, 4, 2));
        assert_eq!(state.build_seqno(), Some(4));

        let outcome = state.on_build_received(&build(0, 2, 0));
        assert!(outcome.accepted);
        assert_eq!(state.depth(), Some(1));
        assert_eq!(state.build_seqno(), Some(4), "generation never regresses");
    }

    #[test]
    fn test_pending_latch_collapses_announcements() {
        let mut state = GradientState::sensor();
        assert!(state.on_build_received(&build(3, 0, 2)).should_announce);

        let second = state.on_build_received(&build(0, 0, 0));
        assert!(second.accepted);
        assert!(!second.should_announce);

        let packet = state
            .announcement(NodeId(7), Position::new(1.0, 1.0), SimTime::ZERO, Mobility::Static)
            .unwrap();
        assert_eq!(packet.depth, 1, "announces the latest depth");
        assert!(!state.announce_pending());

        assert!(state.on_build_received(&build(0, 1, 0)).should_announce);
    }

    #[test]
    fn test_sink_never_accepts() {
        let mut sink = GradientState::sink();
        let outcome = sink.on_build_received(&build(4, 99, 0));
        assert_eq!(outcome, BuildOutcome::default());
        assert_eq!(sink.depth(), Some(0));
        assert_eq!(sink.build_seqno(), Some(0));
    }

    #[test]
    fn test_sink_generations_advance() {
        let mut sink = GradientState::sink();
        let first = sink
            .announcement(NodeId(0), Position::default(), SimTime::ZERO, Mobility::Static)
            .unwrap();
        assert_eq!((first.sequence, first.depth), (0, 0));

        assert_eq!(sink.advance_generation(), Some(1));
        let second = sink
            .announcement(NodeId(0), Position::default(), SimTime::ZERO, Mobility::Static)
            .unwrap();
        assert_eq!(second.sequence, 1);

        let mut sensor = GradientState::sensor();
        assert_eq!(sensor.advance_generation(), None);
    }

    #[test]
    fn test_announcement_without_depth() {
        let mut state = GradientState::sensor();
        assert!(state.claim_announce());
        assert!(!state.claim_announce());
        assert!(
            state
                .announcement(NodeId(2), Position::default(), SimTime::ZERO, Mobility::Static)
                .is_none()
        );
        assert!(!state.announce_pending());
    }
}
