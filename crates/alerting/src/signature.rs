//! Deduplication Signatures

use crate::types::{AlertKind, Payload};

/// Compute the deduplication key for an alert.
///
/// Built-in kinds key on their identity fields only, so volatile
/// measurements (durations, rates) never split one recurring condition into
/// many signatures. Kinds without identity fields, or payloads that carry none
/// of them, key on the whole payload.
pub fn signature(kind: &AlertKind, data: &Payload) -> String {
    let selected: Payload = match kind.identity_fields() {
        Some(fields) => fields
            .iter()
            .filter_map(|f| data.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect(),
        None => Payload::new(),
    };

    let identity = if selected.is_empty() { data } else { &selected };

    // Payload is key-ordered, so the JSON rendering is canonical
    let body = serde_json::to_string(identity).unwrap_or_default();
    format!("{}:{}", kind.as_str(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use proptest::prelude::*;

    #[test]
    fn test_slow_query_ignores_duration() {
        let a = payload! { "query_name" => "orders_by_user", "duration_ms" => 2500.0 };
        let b = payload! { "query_name" => "orders_by_user", "duration_ms" => 2731.0 };
        assert_eq!(signature(&AlertKind::SlowQuery, &a), signature(&AlertKind::SlowQuery, &b));
    }

    #[test]
    fn test_different_conditions_differ() {
        let a = payload! { "query_name" => "orders_by_user" };
        let b = payload! { "query_name" => "invoices_by_month" };
        assert_ne!(signature(&AlertKind::SlowQuery, &a), signature(&AlertKind::SlowQuery, &b));
    }

    #[test]
    fn test_kind_is_part_of_signature() {
        let data = payload! { "operation" => "checkout" };
        assert_ne!(
            signature(&AlertKind::HighErrorRate, &data),
            signature(&AlertKind::PerformanceDegradation, &data)
        );
    }

    #[test]
    fn test_missing_identity_falls_back_to_full_payload() {
        let a = payload! { "table" => "users", "value" => 1i64 };
        let b = payload! { "table" => "users", "value" => 2i64 };
        assert_ne!(signature(&AlertKind::SlowQuery, &a), signature(&AlertKind::SlowQuery, &b));
    }

    #[test]
    fn test_custom_kind_uses_full_payload() {
        let kind = AlertKind::from("disk_full");
        let sig = signature(&kind, &payload! { "mount" => "/data" });
        assert_eq!(sig, r#"disk_full:{"mount":"/data"}"#);
    }

    proptest! {
        #[test]
        fn prop_signature_is_deterministic(
            name in "[a-z_]{1,16}",
            duration in 0.0f64..100_000.0,
            rows in 0i64..1_000_000,
        ) {
            let a = payload! { "query_name" => name.clone(), "duration_ms" => duration, "rows" => rows };
            let b = payload! { "rows" => rows, "duration_ms" => duration, "query_name" => name };
            prop_assert_eq!(
                signature(&AlertKind::SlowQuery, &a),
                signature(&AlertKind::SlowQuery, &b)
            );
            prop_assert_eq!(
                signature(&AlertKind::TestAlert, &a),
                signature(&AlertKind::TestAlert, &b)
            );
        }
    }
}
