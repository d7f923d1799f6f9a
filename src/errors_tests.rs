// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for corezone error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;
    use anyhow::Context as _;
    use std::time::Duration;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(Box::new(kube::core::Status {
            status: Some(kube::core::response::StatusSummary::Failure),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
            metadata: None,
            details: None,
        }))
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(3, "bad IPv4 address '10.0.0'");
        assert_eq!(err.to_string(), "line 3: bad IPv4 address '10.0.0'");
    }

    #[test]
    fn test_merge_error_missing_corefile_display() {
        let err = MergeError::MissingCorefile {
            configmap: "coredns".to_string(),
            key: "Corefile".to_string(),
        };
        assert!(err.to_string().starts_with("could not detect corefile"));
    }

    #[test]
    fn test_gate_timeout_display() {
        let err = GateError::Timeout {
            timeout: Duration::from_secs(9),
        };
        assert_eq!(err.to_string(), "CoreDNS did not become ready within 9s");
    }

    #[test]
    fn test_failure_metric_labels() {
        assert_eq!(
            ReconcileFailure::not_found("DNSZone", "example").metric_label(),
            ERROR_TYPE_NOT_FOUND
        );
        assert_eq!(
            ReconcileFailure::Validation(String::new()).metric_label(),
            ERROR_TYPE_VALIDATION
        );
        assert_eq!(
            ReconcileFailure::Conflict(String::new()).metric_label(),
            ERROR_TYPE_CONFLICT
        );
        assert_eq!(
            ReconcileFailure::Timeout(String::new()).metric_label(),
            ERROR_TYPE_TIMEOUT
        );
        assert_eq!(
            ReconcileFailure::Structural(String::new()).metric_label(),
            ERROR_TYPE_STRUCTURAL
        );
    }

    #[test]
    fn test_classify_kube_404_and_409() {
        let not_found = anyhow::Error::from(api_error(404));
        assert_eq!(classify(&not_found), ERROR_TYPE_NOT_FOUND);

        let conflict = anyhow::Error::from(api_error(409));
        assert_eq!(classify(&conflict), ERROR_TYPE_CONFLICT);
        assert!(is_conflict(&conflict));

        let server = anyhow::Error::from(api_error(500));
        assert_eq!(classify(&server), ERROR_TYPE_API);
        assert!(!is_conflict(&server));
    }

    #[test]
    fn test_classify_walks_context_chain() {
        let result: Result<(), kube::Error> = Err(api_error(409));
        let err = result.context("failed to update zone status").unwrap_err();
        assert!(is_conflict(&err));
    }

    #[test]
    fn test_classify_engine_errors() {
        let gate = anyhow::Error::from(GateError::Timeout {
            timeout: Duration::from_secs(1),
        });
        assert_eq!(classify(&gate), ERROR_TYPE_TIMEOUT);

        let merge = anyhow::Error::from(MergeError::MissingDomainAnnotation {
            configmap: "coredns-zone-a".to_string(),
        });
        assert_eq!(classify(&merge), ERROR_TYPE_STRUCTURAL);

        let validation = anyhow::Error::from(ValidationError::new(1, "bad"));
        assert_eq!(classify(&validation), ERROR_TYPE_VALIDATION);
    }

    #[test]
    fn test_conversions_into_failure() {
        let failure: ReconcileFailure = GateError::Probe("boom".to_string()).into();
        assert!(matches!(failure, ReconcileFailure::Timeout(_)));

        let failure: ReconcileFailure = ValidationError::new(2, "bad").into();
        assert_eq!(failure.to_string(), "validation failure: line 2: bad");
    }
}
