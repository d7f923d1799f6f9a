// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for reconciler helper functions.

#[cfg(test)]
mod tests {
    use super::super::{should_reconcile, status_changed, Outcome};
    use crate::crd::DNSZoneStatus;

    #[test]
    fn test_should_reconcile_when_generations_equal() {
        assert!(!should_reconcile(Some(5), Some(5)));
    }

    #[test]
    fn test_should_reconcile_when_generations_differ() {
        assert!(should_reconcile(Some(7), Some(5)));
        // Restored from backup: still differs, still reconciles
        assert!(should_reconcile(Some(3), Some(5)));
    }

    #[test]
    fn test_should_reconcile_first_reconciliation() {
        assert!(should_reconcile(Some(1), None));
    }

    #[test]
    fn test_should_reconcile_without_generation() {
        assert!(!should_reconcile(None, Some(5)));
        assert!(!should_reconcile(None, None));
    }

    #[test]
    fn test_status_changed_on_optional_status() {
        let built = Some(DNSZoneStatus {
            current_zone_serial: Some("0101120000".to_string()),
            record_count: 2,
            validation_passed: true,
            ..Default::default()
        });

        assert!(status_changed(&None, &built));
        assert!(!status_changed(&built, &built.clone()));

        let mut rebuilt = built.clone();
        if let Some(status) = rebuilt.as_mut() {
            status.record_count = 3;
        }
        assert!(status_changed(&built, &rebuilt));
    }

    #[test]
    fn test_outcome_from_ready() {
        assert_eq!(Outcome::from_ready(true), Outcome::Ready);
        assert_eq!(Outcome::from_ready(false), Outcome::Pending);
    }
}
