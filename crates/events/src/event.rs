use objectstore_core::EntityId;

/// A persisted, immutable log record.
///
/// Keyed in the log as `<time>/<entityID>/<type>`; the big-endian nanosecond
/// timestamp keeps that key lexicographically sortable, so a range scan over
/// the log visits events in the order they were dispatched.
#[derive(Debug, Clone)]
pub struct Event {
    time_nanos: i64,
    entity_id: EntityId,
    entity_type: String,
    body: Vec<u8>,
}

impl Event {
    pub fn new(time_nanos: i64, entity_id: EntityId, entity_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            time_nanos,
            entity_id,
            entity_type: entity_type.into(),
            body,
        }
    }

    pub fn time_nanos(&self) -> i64 {
        self.time_nanos
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The log key this event is stored under.
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}",
            encode_time_key(self.time_nanos),
            self.entity_id,
            self.entity_type
        )
    }

    /// Reconstruct an event from a raw log entry, for replay. `None` if the
    /// key doesn't match the `<time>/<entityId>/<type>` shape.
    pub fn from_log_entry(key: &str, body: Vec<u8>) -> Option<Self> {
        let mut parts = key.splitn(3, '/');
        let time_hex = parts.next()?;
        let entity_id = parts.next()?;
        let entity_type = parts.next()?;
        Some(Self {
            time_nanos: decode_time_key(time_hex)?,
            entity_id: EntityId::from(entity_id),
            entity_type: entity_type.to_string(),
            body,
        })
    }
}

/// Big-endian-sortable string encoding of a nanosecond timestamp.
///
/// A fixed-width hex rendering of the big-endian byte representation keeps
/// the original's `binary.Write(..., binary.BigEndian, t)` lexicographic
/// ordering property while staying a plain string, which is what the view
/// and log [`objectstore_kv::Kv`] keys are built from.
pub fn encode_time_key(time_nanos: i64) -> String {
    // Bias into the unsigned range so negative timestamps still sort before
    // positive ones under byte/lexicographic comparison.
    let biased = (time_nanos as i128 - i64::MIN as i128) as u64;
    format!("{biased:016x}")
}

/// Inverse of [`encode_time_key`].
fn decode_time_key(hex: &str) -> Option<i64> {
    let biased = u64::from_str_radix(hex, 16).ok()?;
    Some((biased as i128 + i64::MIN as i128) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_key_preserves_ordering() {
        let a = encode_time_key(100);
        let b = encode_time_key(200);
        assert!(a < b);
    }

    #[test]
    fn time_key_orders_negative_before_positive() {
        let a = encode_time_key(-5);
        let b = encode_time_key(5);
        assert!(a < b);
    }

    #[test]
    fn key_format() {
        let e = Event::new(1, EntityId::from("abc"), "model.person", vec![]);
        assert!(e.key().ends_with("/abc/model.person"));
    }

    #[test]
    fn from_log_entry_round_trips() {
        let e = Event::new(12345, EntityId::from("abc"), "model.person", b"body".to_vec());
        let key = e.key();
        let restored = Event::from_log_entry(&key, e.body().to_vec()).unwrap();
        assert_eq!(restored.time_nanos(), e.time_nanos());
        assert_eq!(restored.entity_id(), e.entity_id());
        assert_eq!(restored.entity_type(), e.entity_type());
    }
}
