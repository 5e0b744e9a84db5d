//! Proptest generators for property-based testing.

use proptest::prelude::*;

use crate::objects::NetworkRecord;

/// Generate a key segment: lowercase, no separators.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a key path of 1 to `max` segments.
pub fn segments(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..=max.max(1))
}

/// Generate non-empty payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// Generate a driver name.
pub fn driver() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("bridge".to_string()),
        Just("overlay".to_string()),
        Just("macvlan".to_string()),
        Just("ipvlan".to_string()),
        Just("host".to_string()),
    ]
}

/// Generate a network record that has never been stored.
pub fn network_record() -> impl Strategy<Value = NetworkRecord> {
    (
        segment(),
        driver(),
        prop::collection::btree_map(segment(), segment(), 0..4),
    )
        .prop_map(|(name, driver, labels)| {
            let mut net = NetworkRecord::new(name).with_driver(driver);
            net.labels = labels;
            net
        })
}

/// Generate a set of distinct network names.
pub fn network_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(segment(), 1..=max.max(1))
        .prop_map(|names| names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netkv_core::{key::SEPARATOR, KvObject};

    proptest! {
        #[test]
        fn test_segments_have_no_separator(segs in segments(5)) {
            for seg in &segs {
                prop_assert!(!seg.contains(SEPARATOR));
                prop_assert!(!seg.is_empty());
            }
        }

        #[test]
        fn test_generated_networks_are_fresh(net in network_record()) {
            prop_assert!(!net.exists());
            prop_assert!(net.value().is_some());
        }
    }
}
