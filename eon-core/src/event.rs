// BgpSim: BGP Network Simulator written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! The event queue driving the call-level discrete-event simulation (spec
//! §4.6). Structurally mirrors `bgpsim::event`'s `EventQueue` trait plus a
//! default binary-heap-backed implementation, generalised from BGP message
//! events to call `Arrival`/`Departure` events keyed on `(time, sequence)`.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ordered_float::NotNan;

use crate::calls::Call;

/// What kind of thing happens at an event's time.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A call request arrives and must be run through the RMSA pipeline.
    Arrival(Call),
    /// An admitted call's holding time has elapsed; release its resources.
    Departure(u64),
}

/// A single scheduled event. Ordering is `(time, seq)`: the sequence
/// counter breaks time ties deterministically (spec §5), since two floating
/// point arrival times are never compared as equal by coincidence alone.
#[derive(Debug, Clone)]
pub struct Event {
    /// Simulation time this event fires at.
    pub time: NotNan<f64>,
    /// Monotonically increasing counter, assigned at push time.
    pub seq: u64,
    /// The event payload.
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// Interface of an event queue, so the simulator can be parameterised over
/// alternative scheduling disciplines without touching the event loop.
pub trait EventQueue {
    /// Enqueue a new event.
    fn push(&mut self, event: Event);

    /// Pop the earliest-ordered event.
    fn pop(&mut self) -> Option<Event>;

    /// Peek at the earliest-ordered event without removing it.
    fn peek(&self) -> Option<&Event>;

    /// Number of enqueued events.
    fn len(&self) -> usize;

    /// Whether no event is enqueued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default event queue: a binary heap ordered earliest-time-first.
#[derive(Debug, Clone, Default)]
pub struct BasicEventQueue(BinaryHeap<Reverse<Event>>);

impl BasicEventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        BasicEventQueue(BinaryHeap::new())
    }
}

impl EventQueue for BasicEventQueue {
    fn push(&mut self, event: Event) {
        self.0.push(Reverse(event));
    }

    fn pop(&mut self) -> Option<Event> {
        self.0.pop().map(|Reverse(e)| e)
    }

    fn peek(&self) -> Option<&Event> {
        self.0.peek().map(|Reverse(e)| e)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallState;
    use crate::topology::NodeId;

    fn dummy_call() -> Call {
        Call {
            id: 0,
            source: NodeId::new(0),
            destination: NodeId::new(1),
            bitrate_gbps: 100.0,
            arrival_time: 0.0,
            duration: 1.0,
            state: CallState::Pending,
        }
    }

    #[test]
    fn pops_in_time_then_sequence_order() {
        let mut q = BasicEventQueue::new();
        q.push(Event {
            time: NotNan::new(5.0).unwrap(),
            seq: 2,
            kind: EventKind::Departure(1),
        });
        q.push(Event {
            time: NotNan::new(1.0).unwrap(),
            seq: 0,
            kind: EventKind::Arrival(dummy_call()),
        });
        q.push(Event {
            time: NotNan::new(1.0).unwrap(),
            seq: 1,
            kind: EventKind::Departure(2),
        });

        let first = q.pop().unwrap();
        assert_eq!(first.seq, 0);
        let second = q.pop().unwrap();
        assert_eq!(second.seq, 1);
        let third = q.pop().unwrap();
        assert_eq!(third.seq, 2);
        assert!(q.is_empty());
    }
}
