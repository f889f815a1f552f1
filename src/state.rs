//! Latest-packet snapshot shared with read-only observers.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::packet::Packet;
use crate::schema::PacketType;

/// The most recent decoded packet of each type.
///
/// Sinks [`update`](Self::update) it as packets are popped from the queue;
/// observers read clones or a JSON rendering. Nothing here touches the byte
/// buffer or the queue.
#[derive(Debug, Default)]
pub struct StateSnapshot {
    latest: Mutex<BTreeMap<PacketType, Packet>>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, BTreeMap<PacketType, Packet>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored packet of this packet's type.
    pub fn update(&self, packet: Packet) {
        self.locked().insert(packet.packet_type(), packet);
    }

    /// The most recent packet of `packet_type`, if one has arrived.
    pub fn get(&self, packet_type: PacketType) -> Option<Packet> {
        self.locked().get(&packet_type).cloned()
    }

    /// Render the whole snapshot as a JSON object keyed by type tag.
    pub fn to_json(&self) -> serde_json::Value {
        let latest = self.locked();
        let map: serde_json::Map<String, serde_json::Value> = latest
            .iter()
            .map(|(packet_type, packet)| {
                let value =
                    serde_json::to_value(packet).unwrap_or(serde_json::Value::Null);
                (packet_type.tag().to_string(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::field::FieldValue;
    use crate::testutil;

    #[test]
    fn keeps_the_most_recent_packet_per_type() {
        let state = StateSnapshot::new();
        assert!(state.get(PacketType::Purge).is_none());

        state.update(testutil::sample_packet(PacketType::Purge));
        state.update(Packet::new(
            PacketType::Purge,
            vec![("flow", FieldValue::Signed(7))],
        ));
        state.update(testutil::sample_packet(PacketType::Met));

        let purge = state.get(PacketType::Purge).unwrap();
        assert_eq!(purge.get("flow"), Some(&FieldValue::Signed(7)));
        assert!(state.get(PacketType::Met).is_some());
        assert!(state.get(PacketType::Position).is_none());
    }

    #[test]
    fn renders_a_tag_keyed_object() {
        let state = StateSnapshot::new();
        state.update(testutil::sample_packet(PacketType::Met));
        state.update(testutil::sample_packet(PacketType::Temp));

        let json = state.to_json();
        assert_eq!(json["met"]["type"], "met");
        assert_eq!(json["temp"]["forward"], 2105);
        assert!(json.get("position").is_none());
    }
}
