//! The event table: a min-priority collection of pending events keyed by
//! time.  Time-equal events are grouped into per-simulator bags, drained in
//! simulator registration order; observation events live in a separate
//! sub-queue of each slot because they run after the instant's transitions.

use std::collections::{BTreeMap, HashMap};

use super::atomic::SimulatorId;
use super::event::{
    CompleteEventBagModel, EventBagModel, ExternalEvent, InternalEvent, ObservationEvent,
    RequestEvent,
};
use super::time::Time;

#[derive(Debug, Default)]
struct TimeSlot {
    bags: BTreeMap<SimulatorId, EventBagModel>,
    observations: Vec<ObservationEvent>,
}

impl TimeSlot {
    fn is_empty(&self) -> bool {
        self.observations.is_empty() && self.bags.values().all(EventBagModel::is_empty)
    }
}

/// Pending events, keyed by time.  Inserts and per-simulator deletes are
/// O(log N); popping a bag is O(log N + k) for a bag of k events.
#[derive(Debug, Default)]
pub struct EventTable {
    slots: BTreeMap<Time, TimeSlot>,
    // Each simulator has at most one pending internal event; its slot time
    // is indexed here so rescheduling and deletion avoid a scan.
    internal_index: HashMap<SimulatorId, Time>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The earliest scheduled time, or `Time::INFINITY` when nothing is
    /// pending.
    pub fn top_time(&self) -> Time {
        self.slots
            .keys()
            .next()
            .copied()
            .unwrap_or(Time::INFINITY)
    }

    fn slot(&mut self, time: Time) -> &mut TimeSlot {
        self.slots.entry(time).or_default()
    }

    /// Schedules a simulator's next internal transition, replacing any
    /// internal event it still has pending.
    pub fn put_internal(&mut self, event: InternalEvent) {
        self.delete_internal(event.target);
        self.internal_index.insert(event.target, event.time);
        self.slot(event.time)
            .bags
            .entry(event.target)
            .or_default()
            .set_internal(event);
    }

    pub fn put_external(&mut self, event: ExternalEvent) {
        self.slot(event.time)
            .bags
            .entry(event.target)
            .or_default()
            .push_external(event);
    }

    pub fn put_request(&mut self, event: RequestEvent) {
        self.slot(event.time)
            .bags
            .entry(event.target)
            .or_default()
            .push_request(event);
    }

    pub fn put_observation(&mut self, event: ObservationEvent) {
        self.slot(event.time).observations.push(event);
    }

    /// Removes and returns every event scheduled at the current minimum
    /// time.  An empty table yields an empty bag, which makes the step a
    /// no-op.
    pub fn pop_bag(&mut self) -> CompleteEventBagModel {
        match self.slots.pop_first() {
            Some((time, slot)) => {
                for (simulator, bag) in &slot.bags {
                    if bag.has_internal() {
                        self.internal_index.remove(simulator);
                    }
                }
                CompleteEventBagModel::new(time, slot.bags, slot.observations)
            }
            None => CompleteEventBagModel::empty(),
        }
    }

    fn delete_internal(&mut self, simulator: SimulatorId) {
        if let Some(time) = self.internal_index.remove(&simulator) {
            if let Some(slot) = self.slots.get_mut(&time) {
                if let Some(bag) = slot.bags.get_mut(&simulator) {
                    bag.take_internal();
                    if bag.is_empty() {
                        slot.bags.remove(&simulator);
                    }
                }
                if slot.is_empty() {
                    self.slots.remove(&time);
                }
            }
        }
    }

    /// Removes every pending event mentioning `simulator` as source or
    /// destination; part of dynamic model deletion.
    pub fn delete_events_for(&mut self, simulator: SimulatorId) {
        self.delete_internal(simulator);
        for slot in self.slots.values_mut() {
            slot.bags.remove(&simulator);
            for bag in slot.bags.values_mut() {
                let externals = bag.take_externals();
                for event in externals {
                    if event.source != simulator && event.target != simulator {
                        bag.push_external(event);
                    }
                }
                let requests = bag.take_requests();
                for event in requests {
                    if event.source != simulator && event.target != simulator {
                        bag.push_request(event);
                    }
                }
            }
            slot.bags.retain(|_, bag| !bag.is_empty());
            slot.observations.retain(|event| event.target != simulator);
        }
        self.slots.retain(|_, slot| !slot.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::event::AttributeMap;

    fn external(time: f64, source: usize, target: usize) -> ExternalEvent {
        ExternalEvent {
            time: Time::new(time),
            source: SimulatorId(source),
            target: SimulatorId(target),
            port_name: "in".to_string(),
            attributes: AttributeMap::new(),
        }
    }

    #[test]
    fn top_time_tracks_minimum() {
        let mut table = EventTable::new();
        assert_eq!(table.top_time(), Time::INFINITY);
        table.put_internal(InternalEvent {
            time: Time::new(4.0),
            target: SimulatorId(0),
        });
        table.put_external(external(2.0, 1, 0));
        assert_eq!(table.top_time(), Time::new(2.0));
    }

    #[test]
    fn rescheduling_replaces_the_pending_internal() {
        let mut table = EventTable::new();
        table.put_internal(InternalEvent {
            time: Time::new(5.0),
            target: SimulatorId(0),
        });
        table.put_internal(InternalEvent {
            time: Time::new(3.0),
            target: SimulatorId(0),
        });
        assert_eq!(table.top_time(), Time::new(3.0));

        let bag = table.pop_bag();
        assert_eq!(bag.time(), Time::new(3.0));
        assert!(table.is_empty());
    }

    #[test]
    fn pop_partitions_per_simulator_in_registration_order() {
        let mut table = EventTable::new();
        table.put_external(external(1.0, 9, 2));
        table.put_external(external(1.0, 9, 0));
        table.put_internal(InternalEvent {
            time: Time::new(1.0),
            target: SimulatorId(1),
        });

        let bag = table.pop_bag();
        assert_eq!(bag.next_bag(), Some(SimulatorId(0)));
    }

    #[test]
    fn delete_drops_every_mention_of_the_simulator() {
        let mut table = EventTable::new();
        table.put_internal(InternalEvent {
            time: Time::new(3.0),
            target: SimulatorId(0),
        });
        table.put_external(external(3.0, 0, 1));
        table.put_external(external(3.0, 2, 0));
        table.put_observation(ObservationEvent {
            time: Time::new(3.0),
            target: SimulatorId(0),
            port_name: "count".to_string(),
            view_name: "v".to_string(),
        });

        table.delete_events_for(SimulatorId(0));
        assert!(table.is_empty());
    }
}
