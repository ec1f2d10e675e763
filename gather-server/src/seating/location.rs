//! Location bucketing for location-aware assignment
//!
//! Bucket key = coordinates rounded to 2 decimal degrees (~1.1 km at the
//! equator). Participants without a location share a single sentinel bucket.

use crate::db::models::{GeoPoint, Participant};
use std::collections::BTreeMap;

/// Sentinel bucket for participants with no usable location
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Bucket key for a (possibly missing) location
pub fn bucket_key(location: Option<&GeoPoint>) -> String {
    match location {
        Some(p) => format!("{:.2},{:.2}", p.latitude, p.longitude),
        None => UNKNOWN_BUCKET.to_string(),
    }
}

/// Partition participants into location buckets
///
/// BTreeMap: 桶按 key 排序遍历，保证 assign 结果对同一输入确定。
pub fn partition<'a>(participants: &[&'a Participant]) -> BTreeMap<String, Vec<&'a Participant>> {
    let mut buckets: BTreeMap<String, Vec<&Participant>> = BTreeMap::new();
    for p in participants {
        buckets
            .entry(bucket_key(p.location.as_ref()))
            .or_default()
            .push(p);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant_at(id: &str, location: Option<GeoPoint>) -> Participant {
        Participant {
            id: Some(surrealdb::RecordId::from_table_key("participant", id)),
            name: id.to_string(),
            full_name: None,
            photo_ref: None,
            gender: None,
            preferences: Default::default(),
            location,
            is_ephemeral: false,
            created_at: 0,
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        let p = GeoPoint {
            latitude: 41.38506,
            longitude: 2.17340,
            accuracy: 10.0,
        };
        assert_eq!(bucket_key(Some(&p)), "41.39,2.17");
    }

    #[test]
    fn missing_location_goes_to_unknown() {
        assert_eq!(bucket_key(None), UNKNOWN_BUCKET);
    }

    #[test]
    fn nearby_points_share_a_bucket() {
        let a = GeoPoint {
            latitude: 41.3801,
            longitude: 2.1701,
            accuracy: 5.0,
        };
        let b = GeoPoint {
            latitude: 41.3849,
            longitude: 2.1749,
            accuracy: 50.0,
        };
        assert_eq!(bucket_key(Some(&a)), bucket_key(Some(&b)));
    }

    #[test]
    fn partition_is_deterministic_and_sorted() {
        let p1 = participant_at(
            "a",
            Some(GeoPoint {
                latitude: 50.0,
                longitude: 8.0,
                accuracy: 1.0,
            }),
        );
        let p2 = participant_at(
            "b",
            Some(GeoPoint {
                latitude: 40.0,
                longitude: -3.0,
                accuracy: 1.0,
            }),
        );
        let p3 = participant_at("c", None);

        let refs: Vec<&Participant> = vec![&p1, &p2, &p3];
        let buckets = partition(&refs);

        let keys: Vec<&str> = buckets.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["40.00,-3.00", "50.00,8.00", "unknown"]);
        assert_eq!(buckets["unknown"].len(), 1);
    }
}
