// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::finalizers::{has_finalizer, with_finalizer, without_finalizer};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const TEST_FINALIZER: &str = "test.firestoned.io/finalizer";

    fn configmap_with_finalizers(finalizers: Option<Vec<String>>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("coredns-zone-example".to_string()),
                namespace: Some("dns".to_string()),
                finalizers,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_has_finalizer_none() {
        let cm = configmap_with_finalizers(None);
        assert!(!has_finalizer(&cm, TEST_FINALIZER));
    }

    #[test]
    fn test_has_finalizer_present() {
        let cm = configmap_with_finalizers(Some(vec![
            "other.io/finalizer".to_string(),
            TEST_FINALIZER.to_string(),
        ]));
        assert!(has_finalizer(&cm, TEST_FINALIZER));
    }

    #[test]
    fn test_with_finalizer_appends_once() {
        let current = vec!["other.io/finalizer".to_string()];
        let updated = with_finalizer(&current, TEST_FINALIZER).expect("should append");
        assert_eq!(updated, vec!["other.io/finalizer", TEST_FINALIZER]);

        assert!(with_finalizer(&updated, TEST_FINALIZER).is_none());
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let current = vec![
            TEST_FINALIZER.to_string(),
            "other.io/finalizer".to_string(),
        ];
        let updated = without_finalizer(&current, TEST_FINALIZER).expect("should remove");
        assert_eq!(updated, vec!["other.io/finalizer"]);

        assert!(without_finalizer(&updated, TEST_FINALIZER).is_none());
    }

    #[test]
    fn test_without_finalizer_last_one_yields_empty_list() {
        let current = vec![TEST_FINALIZER.to_string()];
        let updated = without_finalizer(&current, TEST_FINALIZER).expect("should remove");
        assert!(updated.is_empty());
    }
}
