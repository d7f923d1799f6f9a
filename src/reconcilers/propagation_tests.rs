// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `propagation.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        DNSRecord, DNSRecordSpec, DNSRecordStatus, DNSZone, DNSZoneSpec, NameserverRecordType,
        PrimaryNameserver, RecordSpec, RecordType, ZoneReference,
    };
    use crate::reconcilers::propagation::*;
    use std::sync::Arc;

    const NS: &str = "dns";

    fn zone(name: &str, domain: &str) -> DNSZone {
        let mut zone = DNSZone::new(
            name,
            DNSZoneSpec {
                cm_prefix: "coredns-zone-".to_string(),
                domain: domain.to_string(),
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
        zone.metadata.namespace = Some(NS.to_string());
        zone
    }

    fn record(name: &str, zone: &str, origin: Option<&str>) -> DNSRecord {
        let mut record = DNSRecord::new(
            name,
            DNSRecordSpec {
                record: RecordSpec {
                    name: "www".to_string(),
                    value: "10.0.0.5".to_string(),
                    r#type: RecordType::A,
                    ttl: None,
                    set_ptr: None,
                },
                dns_zone_ref: ZoneReference {
                    name: zone.to_string(),
                },
            },
        );
        record.metadata.namespace = Some(NS.to_string());
        record.status = origin.map(|origin| DNSRecordStatus {
            origin: Some(origin.to_string()),
            ..Default::default()
        });
        record
    }

    fn zone_names(targets: &[kube::runtime::reflector::ObjectRef<DNSZone>]) -> Vec<&str> {
        targets.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_record_maps_to_its_zone() {
        let targets = record_to_zones(&record("www", "example-com", None));
        assert_eq!(zone_names(&targets), vec!["example-com"]);
        assert_eq!(targets[0].namespace.as_deref(), Some(NS));
    }

    #[test]
    fn test_record_without_zone_maps_to_nothing() {
        assert!(record_to_zones(&record("www", "", None)).is_empty());

        let mut orphan = record("www", "example-com", None);
        orphan.metadata.namespace = None;
        assert!(record_to_zones(&orphan).is_empty());
    }

    #[test]
    fn test_moved_record_maps_to_previous_zone_too() {
        let mut moved = record("www", "new-zone", Some("example.com."));
        if let Some(status) = moved.status.as_mut() {
            status.zone_ref = Some("old-zone".to_string());
        }
        let targets = record_to_zones(&moved);
        assert_eq!(zone_names(&targets), vec!["new-zone", "old-zone"]);
        assert!(targets.iter().all(|t| t.namespace.as_deref() == Some(NS)));
    }

    #[test]
    fn test_unmoved_record_maps_to_one_zone() {
        let mut record = record("www", "example-com", Some("example.com."));
        if let Some(status) = record.status.as_mut() {
            status.zone_ref = Some("example-com".to_string());
        }
        assert_eq!(zone_names(&record_to_zones(&record)), vec!["example-com"]);
    }

    #[test]
    fn test_zone_maps_to_its_connector() {
        let target = zone_to_connector(&zone("example-com", "example.com")).unwrap();
        assert_eq!(target.name, "coredns");
        assert_eq!(target.namespace.as_deref(), Some(NS));
    }

    #[test]
    fn test_zone_maps_to_records_with_stale_origin() {
        let records = vec![
            Arc::new(record("fresh", "example-com", Some("example.com."))),
            Arc::new(record("stale", "example-com", Some("old.example."))),
            Arc::new(record("never-built", "example-com", None)),
            Arc::new(record("other-zone", "other", Some("old.example."))),
        ];

        let targets: Vec<String> = zone_to_records(&zone("example-com", "example.com"), &records)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(targets, vec!["stale", "never-built"]);
    }

    #[test]
    fn test_zone_in_other_namespace_maps_no_records() {
        let records = vec![Arc::new(record("stale", "example-com", None))];
        let mut other = zone("example-com", "example.com");
        other.metadata.namespace = Some("elsewhere".to_string());
        assert!(zone_to_records(&other, &records).is_empty());
    }
}
