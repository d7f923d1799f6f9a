// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `dnsrecord.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        DNSRecord, DNSRecordSpec, DNSRecordStatus, RecordSpec, RecordType, ZoneReference,
    };
    use crate::errors::ValidationError;
    use crate::reconcilers::dnsrecord::*;
    use crate::reconcilers::status::{create_condition, ready_condition};
    use crate::status_reasons::{
        MESSAGE_RECORD_CONSTRUCTED, REASON_RECORD_DEGRADED, REASON_RECORD_PENDING,
        REASON_RECORD_READY, STATUS_FALSE, STATUS_TRUE,
    };
    use crate::zonefile::build_record;

    fn record(generation: i64, status: Option<DNSRecordStatus>) -> DNSRecord {
        let mut record = DNSRecord::new(
            "www",
            DNSRecordSpec {
                record: RecordSpec {
                    name: "www".to_string(),
                    value: "10.0.0.5".to_string(),
                    r#type: RecordType::A,
                    ttl: None,
                    set_ptr: Some(true),
                },
                dns_zone_ref: ZoneReference {
                    name: "example-com".to_string(),
                },
            },
        );
        record.metadata.namespace = Some("dns".to_string());
        record.metadata.generation = Some(generation);
        record.status = status;
        record
    }

    fn built(generation: i64, origin: &str) -> DNSRecordStatus {
        DNSRecordStatus {
            observed_generation: Some(generation),
            origin: Some(origin.to_string()),
            validation_passed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_zone_not_found_message() {
        assert_eq!(
            zone_not_found_message("example-com"),
            "DNSZone not found: example-com"
        );
    }

    #[test]
    fn test_first_reconcile_rebuilds() {
        assert!(needs_rebuild(&record(1, None), "example.com."));
    }

    #[test]
    fn test_unchanged_record_is_not_rebuilt() {
        let record = record(3, Some(built(3, "example.com.")));
        assert!(!needs_rebuild(&record, "example.com."));
    }

    #[test]
    fn test_spec_change_rebuilds() {
        let record = record(4, Some(built(3, "example.com.")));
        assert!(needs_rebuild(&record, "example.com."));
    }

    #[test]
    fn test_origin_change_rebuilds() {
        let record = record(3, Some(built(3, "example.com.")));
        assert!(needs_rebuild(&record, "example.org."));
    }

    #[test]
    fn test_successful_build_status() {
        let result = build_record(&record(2, None).spec.record, "example.com");
        let status = built_status(None, &result, "example-com", "example.com.", Some(2));

        assert!(status.validation_passed);
        assert!(status.auto_ipv4_ptr);
        assert_eq!(status.observed_generation, Some(2));
        assert_eq!(status.origin.as_deref(), Some("example.com."));
        assert_eq!(status.zone_ref.as_deref(), Some("example-com"));
        assert_eq!(
            status.generated_record.as_deref(),
            Some("www.example.com. IN A 10.0.0.5\n5.0.0.10.in-addr.arpa. IN PTR www.example.com.")
        );

        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.status, STATUS_FALSE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_RECORD_PENDING));
        assert_eq!(ready.message.as_deref(), Some(MESSAGE_RECORD_CONSTRUCTED));
        assert_eq!(ready.observed_generation, Some(2));
    }

    #[test]
    fn test_failed_build_keeps_no_text() {
        let previous = DNSRecordStatus {
            generated_record: Some("www.example.com. IN A 10.0.0.5".to_string()),
            auto_ipv4_ptr: true,
            ..built(1, "example.com.")
        };
        let result = Err(ValidationError::new(1, "invalid IPv4 address '10.0.0'"));

        let status =
            built_status(Some(&previous), &result, "example-com", "example.com.", Some(2));

        assert!(!status.validation_passed);
        assert!(!status.auto_ipv4_ptr);
        assert!(status.generated_record.is_none());
        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.reason.as_deref(), Some(REASON_RECORD_DEGRADED));
        assert_eq!(
            ready.message.as_deref(),
            Some("line 1: invalid IPv4 address '10.0.0'")
        );
    }

    #[test]
    fn test_rebuild_resets_joined_record_to_pending() {
        let previous = DNSRecordStatus {
            conditions: vec![create_condition(
                "Ready",
                STATUS_TRUE,
                REASON_RECORD_READY,
                "Record has joined to the DNSZone: example-com",
                Some(1),
            )],
            ..built(1, "example.com.")
        };
        let result = build_record(&record(2, None).spec.record, "example.com");

        let status =
            built_status(Some(&previous), &result, "example-com", "example.com.", Some(2));

        assert_eq!(status.conditions.len(), 1);
        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.status, STATUS_FALSE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_RECORD_PENDING));
    }

    #[test]
    fn test_generated_record_serializes_as_null_when_cleared() {
        let status = built_status(
            None,
            &Err(ValidationError::new(1, "bad")),
            "example-com",
            "example.com.",
            Some(1),
        );
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("generatedRecord").unwrap().is_null());
    }
}
