// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controllers.rs`

#[cfg(test)]
mod tests {
    use crate::config::OperatorConfig;
    use crate::controllers::{error_requeue, requeue_action, zone_artifact_watch_config};
    use crate::errors::{ReconcileFailure, ValidationError};
    use crate::reconcilers::Outcome;
    use kube::runtime::controller::Action;
    use std::time::Duration;

    #[test]
    fn test_zone_artifact_watch_is_label_scoped() {
        let config = zone_artifact_watch_config();
        assert_eq!(
            config.label_selector.as_deref(),
            Some("app.kubernetes.io/managed-by=corezone")
        );
    }

    #[test]
    fn test_requeue_by_outcome() {
        let config = OperatorConfig::default();
        assert_eq!(
            requeue_action(Outcome::Ready, &config),
            Action::requeue(Duration::from_secs(300))
        );
        assert_eq!(
            requeue_action(Outcome::Pending, &config),
            Action::requeue(Duration::from_secs(30))
        );
        assert_eq!(
            requeue_action(Outcome::Removed, &config),
            Action::await_change()
        );
    }

    #[test]
    fn test_requeue_follows_config() {
        let config = OperatorConfig {
            requeue_ready_secs: 600,
            ..OperatorConfig::default()
        };
        assert_eq!(
            requeue_action(Outcome::Ready, &config),
            Action::requeue(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_conflicts_retry_quickly() {
        let config = OperatorConfig::default();
        let conflict = anyhow::Error::new(ReconcileFailure::Conflict("DNSZone dns/example-com".into()));
        assert_eq!(error_requeue(&conflict, &config), Duration::from_secs(1));
    }

    #[test]
    fn test_other_errors_use_error_requeue() {
        let config = OperatorConfig::default();
        let invalid = anyhow::Error::new(ValidationError::new(1, "bad"));
        assert_eq!(error_requeue(&invalid, &config), Duration::from_secs(30));

        let missing = anyhow::Error::new(ReconcileFailure::not_found("DNSZone", "example-com"));
        assert_eq!(error_requeue(&missing, &config), Duration::from_secs(30));
    }
}
