//! Outbound message queue with movement throttling.
//!
//! The simulation pushes messages here during a tick; the transport drains
//! them afterwards. Movement updates are coalesced to at most
//! `update_rate` per second, keeping only the latest one; every other message
//! is queued as-is.

use crate::protocol::{ClientMessage, PlayerMove};
use std::collections::VecDeque;
use tracing::debug;

/// Pending outbound messages.
#[derive(Debug)]
pub struct Outbox {
    queue: VecDeque<ClientMessage>,
    pending_move: Option<PlayerMove>,
    move_interval: f64,
    since_last_move: f64,
    coalesced: u64,
}

impl Outbox {
    /// Outbox sending at most `update_rate` movement updates per second.
    /// A rate of 0 sends every movement update.
    pub fn new(update_rate: u32) -> Self {
        let move_interval = if update_rate == 0 {
            0.0
        } else {
            1.0 / f64::from(update_rate)
        };
        Self {
            queue: VecDeque::new(),
            pending_move: None,
            move_interval,
            since_last_move: f64::INFINITY,
            coalesced: 0,
        }
    }

    /// Record the local player's latest kinematics.
    pub fn push_move(&mut self, update: PlayerMove) {
        if self.pending_move.replace(update).is_some() {
            self.coalesced += 1;
        }
    }

    /// Queue a non-movement message.
    pub fn push(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::PlayerMove(update) => self.push_move(update),
            other => self.queue.push_back(other),
        }
    }

    /// Advance the throttle clock by `dt` seconds, releasing the pending
    /// movement update when its slot is due.
    pub fn tick(&mut self, dt: f64) {
        self.since_last_move += dt;
        if self.since_last_move < self.move_interval {
            return;
        }
        if let Some(update) = self.pending_move.take() {
            self.queue.push_back(ClientMessage::PlayerMove(update));
            self.since_last_move = 0.0;
        }
    }

    /// Take every released message in push order.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        if !self.queue.is_empty() {
            debug!(messages = self.queue.len(), coalesced = self.coalesced, "Draining outbox");
        }
        self.queue.drain(..).collect()
    }

    /// Released messages waiting to be drained.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Movement updates superseded before they were sent.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChatLine, WireVec2};

    fn mv(x: f32) -> PlayerMove {
        PlayerMove {
            position: WireVec2 { x, y: 0.0 },
            velocity: WireVec2::default(),
            rotation: 0.0,
        }
    }

    #[test]
    fn moves_are_throttled_and_coalesced() {
        let mut outbox = Outbox::new(20);
        // 40 ticks at 25 ms = one second of movement.
        let mut sent = 0;
        for i in 0..40 {
            outbox.push_move(mv(i as f32));
            outbox.tick(0.025);
            sent += outbox.drain().len();
        }
        assert!((19..=21).contains(&sent), "sent {sent}");
        assert!(outbox.coalesced() > 0);
    }

    #[test]
    fn latest_move_wins() {
        let mut outbox = Outbox::new(10);
        outbox.tick(1.0);
        outbox.drain();
        outbox.push_move(mv(1.0));
        outbox.push_move(mv(2.0));
        outbox.tick(0.2);
        assert_eq!(outbox.drain(), vec![ClientMessage::PlayerMove(mv(2.0))]);
    }

    #[test]
    fn other_messages_are_not_throttled() {
        let mut outbox = Outbox::new(1);
        outbox.push(ClientMessage::Ping);
        outbox.push(ClientMessage::Chat(ChatLine {
            message: "hi".into(),
            player: None,
        }));
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox.drain()[0], ClientMessage::Ping);
        assert!(outbox.is_empty());
    }
}
