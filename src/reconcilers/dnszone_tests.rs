// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `dnszone.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        DNSRecord, DNSRecordSpec, DNSRecordStatus, DNSZone, DNSZoneSpec, DNSZoneStatus,
        NameserverRecordType, PrimaryNameserver, RecordSpec, RecordType, ZoneReference,
    };
    use crate::errors::ValidationError;
    use crate::reconcilers::dnszone::*;
    use crate::reconcilers::status::{create_condition, ready_condition};
    use crate::status_reasons::{
        REASON_ZONE_ACTIVE, REASON_ZONE_NO_CONNECTOR, REASON_ZONE_PENDING,
        REASON_ZONE_UPDATE_ERROR, STATUS_FALSE, STATUS_TRUE,
    };
    use crate::zonefile::{build_zone_file, ZoneFile};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::ResourceExt;

    const ORIGIN: &str = "example.com.";

    fn zone(status: Option<DNSZoneStatus>) -> DNSZone {
        let mut zone = DNSZone::new(
            "example-com",
            DNSZoneSpec {
                cm_prefix: "coredns-zone-".to_string(),
                domain: "example.com".to_string(),
                primary_ns: PrimaryNameserver {
                    hostname: "ns1".to_string(),
                    ip_address: "10.0.0.53".to_string(),
                    record_type: NameserverRecordType::A,
                },
                resp_person_email: "admin.example.com".to_string(),
                ttl: 86400,
                refresh_rate: 7200,
                retry_interval: 3600,
                expire_time: 1_209_600,
                minimum_ttl: 86400,
                connector_name: "coredns".to_string(),
            },
        );
        zone.metadata.namespace = Some("dns".to_string());
        zone.metadata.generation = Some(2);
        zone.status = status;
        zone
    }

    fn record(name: &str, text: Option<&str>, valid: bool, origin: &str) -> DNSRecord {
        let mut record = DNSRecord::new(
            name,
            DNSRecordSpec {
                record: RecordSpec {
                    name: name.to_string(),
                    value: "10.0.0.5".to_string(),
                    r#type: RecordType::A,
                    ttl: None,
                    set_ptr: None,
                },
                dns_zone_ref: ZoneReference {
                    name: "example-com".to_string(),
                },
            },
        );
        record.status = Some(DNSRecordStatus {
            validation_passed: valid,
            generated_record: text.map(str::to_string),
            origin: Some(origin.to_string()),
            ..Default::default()
        });
        record
    }

    fn file(records: &[&str]) -> ZoneFile {
        build_zone_file(&zone(None).spec, records.iter().copied(), "0101120000")
    }

    fn active_status() -> DNSZoneStatus {
        DNSZoneStatus {
            conditions: vec![create_condition(
                "Ready",
                STATUS_TRUE,
                REASON_ZONE_ACTIVE,
                "Picked up by DNSConnector",
                Some(2),
            )],
            observed_generation: Some(2),
            current_zone_serial: Some("0101110000".to_string()),
            record_count: 0,
            validation_passed: true,
            zone_configmap: Some("coredns-zone-example-com".to_string()),
            checkpoint: true,
        }
    }

    #[test]
    fn test_eligible_records_sorted_and_filtered() {
        let mut deleting = record("deleting", Some("deleting.example.com. IN A 10.0.0.9"), true, ORIGIN);
        deleting.metadata.deletion_timestamp = Some(Time(k8s_openapi::jiff::Timestamp::now()));

        let records = vec![
            record("www", Some("www.example.com. IN A 10.0.0.5"), true, ORIGIN),
            record("broken", None, false, ORIGIN),
            record("api", Some("api.example.com. IN A 10.0.0.6"), true, ORIGIN),
            record("stale", Some("stale.example.org. IN A 10.0.0.7"), true, "example.org."),
            deleting,
        ];

        let names: Vec<String> = eligible_records(&records, ORIGIN)
            .iter()
            .map(|r| r.name_any())
            .collect();
        assert_eq!(names, vec!["api", "www"]);
    }

    #[test]
    fn test_validation_failure_message() {
        let error = ValidationError::new(12, "invalid IPv4 address '10.0.0'");
        assert_eq!(
            validation_failure_message(true, &error),
            "Zone validation failure. Preserving the previous version. Error: line 12: invalid IPv4 address '10.0.0'"
        );
        assert_eq!(
            validation_failure_message(false, &error),
            "Zone validation failure. Error: line 12: invalid IPv4 address '10.0.0'"
        );
    }

    #[test]
    fn test_failed_status_keeps_last_good_artifact() {
        let zone = zone(Some(active_status()));
        let status = failed_status(&zone, &ValidationError::new(3, "bad"));

        assert!(!status.validation_passed);
        assert!(status.checkpoint);
        assert_eq!(status.current_zone_serial.as_deref(), Some("0101110000"));
        assert_eq!(
            status.zone_configmap.as_deref(),
            Some("coredns-zone-example-com")
        );
        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.status, STATUS_FALSE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_ZONE_UPDATE_ERROR));
        assert!(ready
            .message
            .as_deref()
            .unwrap()
            .contains("Preserving the previous version"));
    }

    #[test]
    fn test_first_build_is_pending() {
        let zone = zone(None);
        let file = file(&["www.example.com. IN A 10.0.0.5\n5.0.0.10.in-addr.arpa. IN PTR www.example.com."]);

        let status = built_status(&zone, &file, &file.serial, true, true);

        assert_eq!(status.record_count, 2);
        assert!(status.validation_passed);
        assert!(status.checkpoint);
        assert_eq!(status.observed_generation, Some(2));
        assert_eq!(status.current_zone_serial.as_deref(), Some("0101120000"));
        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.status, STATUS_TRUE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_ZONE_PENDING));
        assert_eq!(
            ready.message.as_deref(),
            Some("Zone ConfigMap has been created: coredns-zone-example-com")
        );
    }

    #[test]
    fn test_missing_connector_is_no_connector() {
        let status = built_status(&zone(None), &file(&[]), "0101120000", true, false);
        let ready = ready_condition(&status.conditions).unwrap();
        assert_eq!(ready.status, STATUS_TRUE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_ZONE_NO_CONNECTOR));
        assert_eq!(status.record_count, 0);
    }

    #[test]
    fn test_unchanged_artifact_keeps_active_zone_untouched() {
        let zone = zone(Some(active_status()));
        let status = built_status(&zone, &file(&[]), "0101110000", false, true);
        assert_eq!(Some(status), zone.status);
    }

    #[test]
    fn test_changed_artifact_returns_to_pending() {
        let previous = active_status();
        let zone = zone(Some(previous.clone()));
        let status = built_status(&zone, &file(&[]), "0101120000", true, true);
        assert_eq!(
            ready_reason_of(&status),
            Some(REASON_ZONE_PENDING.to_string())
        );
        // Status stayed True, so the transition time is kept
        assert_eq!(
            status.conditions[0].last_transition_time,
            previous.conditions[0].last_transition_time
        );
    }

    #[test]
    fn test_connector_removed_after_pickup() {
        let zone = zone(Some(active_status()));
        let status = built_status(&zone, &file(&[]), "0101110000", false, false);
        assert_eq!(
            ready_reason_of(&status),
            Some(REASON_ZONE_NO_CONNECTOR.to_string())
        );
    }

    fn ready_reason_of(status: &DNSZoneStatus) -> Option<String> {
        ready_condition(&status.conditions).and_then(|c| c.reason.clone())
    }
}
