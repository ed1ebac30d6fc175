//! Shared scalar types and identifier helpers.

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current instant, used for every `updatedAt`/`lastUpdatedAt` stamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Current instant as epoch milliseconds.
///
/// The characters block carries an epoch-millisecond `version` (a wall-clock
/// edit stamp for the UI), distinct from the ledger's monotonic counters.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Mint a fresh opaque identifier with the given prefix, e.g.
/// `chain_4fd37c1e2a9b4e1fbb1d0c6a7c2f9d3e`.
pub fn mint_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Timestamp (de)serialization for persisted records.
///
/// Writes RFC 3339. Reads RFC 3339 or the offset-less ISO form (assumed
/// UTC) that older records carry in their `updatedAt`/`lastUpdatedAt`
/// fields.
pub mod ts {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<Timestamp, String> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|err| format!("invalid timestamp '{raw}': {err}"))
    }

    /// Same scheme for `Option<Timestamp>` fields.
    pub mod opt {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::Timestamp;

        pub fn serialize<S: Serializer>(
            value: &Option<Timestamp>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Timestamp>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
            }
        }
    }
}
