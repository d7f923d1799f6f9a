// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Corefile merge engine.
//!
//! corezone owns one delimited block per zone inside an otherwise hand-edited
//! Corefile:
//!
//! ```text
//! # COREDNS CONTROLLER MANAGED BLOCK BEGINNING -- example.com
//! example.com:53 {
//!     file /opt/coredns/example.com.zone
//!     log
//! }
//! # COREDNS CONTROLLER MANAGED BLOCK END -- example.com
//! ```
//!
//! [`merge_corefile`] replaces known blocks in place, drops blocks whose zone is
//! gone and appends blocks for new zones. Text outside blocks is never touched,
//! and merging a merged Corefile again with the same zones yields the same text.

use crate::constants::{DNS_PORT, MANAGED_BLOCK_BEGIN_PREFIX, MANAGED_BLOCK_END_PREFIX};
use crate::errors::MergeError;
use crate::labels::{ANNOTATION_DOMAIN_NAME, ANNOTATION_SERIAL_NUMBER};
use crate::zonefile::zone::zone_data_key;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};

/// A zone `ConfigMap` as seen by the connector.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZoneArtifactRef {
    /// Domain served, without trailing dot
    pub domain: String,
    /// Name of the zone `ConfigMap`
    pub configmap: String,
    /// Serial annotation, when present
    pub serial: Option<String>,
}

impl ZoneArtifactRef {
    /// Read the identifying annotations of a zone `ConfigMap`.
    ///
    /// # Errors
    ///
    /// Fails when the domain annotation or the zone file key is missing.
    pub fn from_configmap(cm: &ConfigMap) -> Result<Self, MergeError> {
        let configmap = cm.name_any();
        let domain = cm
            .annotations()
            .get(ANNOTATION_DOMAIN_NAME)
            .map(|d| d.trim_end_matches('.').to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MergeError::MissingDomainAnnotation {
                configmap: configmap.clone(),
            })?;

        let key = zone_data_key(&domain);
        if !cm.data.as_ref().is_some_and(|data| data.contains_key(&key)) {
            return Err(MergeError::MissingZoneData { configmap, key });
        }

        Ok(Self {
            serial: cm.annotations().get(ANNOTATION_SERIAL_NUMBER).cloned(),
            domain,
            configmap,
        })
    }

    /// Path of the zone file inside the CoreDNS container.
    #[must_use]
    pub fn mount_path(&self, mount_dir: &str) -> String {
        format!(
            "{}/{}",
            mount_dir.trim_end_matches('/'),
            zone_data_key(&self.domain)
        )
    }
}

/// Read the Corefile out of the CoreDNS `ConfigMap`.
///
/// # Errors
///
/// Returns [`MergeError::MissingCorefile`] when `key` is absent.
pub fn corefile_text<'a>(cm: &'a ConfigMap, key: &str) -> Result<&'a str, MergeError> {
    cm.data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(String::as_str)
        .ok_or_else(|| MergeError::MissingCorefile {
            configmap: cm.name_any(),
            key: key.to_string(),
        })
}

/// Whether `corefile` still contains any managed block.
#[must_use]
pub fn has_managed_blocks(corefile: &str) -> bool {
    corefile
        .lines()
        .any(|line| line.trim().starts_with(MANAGED_BLOCK_BEGIN_PREFIX.trim_end()))
}

/// Render the managed block of one zone (no trailing newline).
#[must_use]
pub fn render_block(zone: &ZoneArtifactRef, mount_dir: &str, plugins: &[String]) -> String {
    let domain = &zone.domain;
    let mut lines = vec![
        format!("{MANAGED_BLOCK_BEGIN_PREFIX}{domain}"),
        format!("{domain}:{DNS_PORT} {{"),
        format!("\tfile {}", zone.mount_path(mount_dir)),
    ];
    lines.extend(
        plugins
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| format!("\t{p}")),
    );
    lines.push("}".to_string());
    lines.push(format!("{MANAGED_BLOCK_END_PREFIX}{domain}"));
    lines.join("\n")
}

/// Merge the managed blocks of `zones` into `corefile`.
///
/// # Errors
///
/// Fails without producing any text on an unterminated, nested or stray block
/// marker, or when two zones serve the same domain.
pub fn merge_corefile(
    corefile: &str,
    zones: &[ZoneArtifactRef],
    mount_dir: &str,
    plugins: &[String],
) -> Result<String, MergeError> {
    let mut blocks: BTreeMap<&str, String> = BTreeMap::new();
    for zone in zones {
        let block = render_block(zone, mount_dir, plugins);
        if blocks.insert(zone.domain.as_str(), block).is_some() {
            return Err(MergeError::DuplicateDomain {
                domain: zone.domain.clone(),
            });
        }
    }
    let mut pending: BTreeSet<&str> = blocks.keys().copied().collect();

    let mut out: Vec<&str> = Vec::new();
    let mut open: Option<(&str, usize)> = None;

    for (index, line) in corefile.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(domain) = trimmed.strip_prefix(MANAGED_BLOCK_BEGIN_PREFIX.trim_end()) {
            let domain = domain.trim();
            if let Some((outer, _)) = open {
                return Err(MergeError::NestedBlock {
                    domain: domain.to_string(),
                    open: outer.to_string(),
                    line: index + 1,
                });
            }
            open = Some((domain, index + 1));
            if pending.remove(domain) {
                if let Some(block) = blocks.get(domain) {
                    out.push(block);
                }
            }
            continue;
        }
        if let Some(domain) = trimmed.strip_prefix(MANAGED_BLOCK_END_PREFIX.trim_end()) {
            let domain = domain.trim();
            match open {
                Some((current, _)) if current == domain => open = None,
                _ => {
                    return Err(MergeError::UnexpectedEnd {
                        domain: domain.to_string(),
                        line: index + 1,
                    })
                }
            }
            continue;
        }
        if open.is_none() {
            out.push(line);
        }
    }

    if let Some((domain, line)) = open {
        return Err(MergeError::UnterminatedBlock {
            domain: domain.to_string(),
            line,
        });
    }

    let mut merged = out.join("\n");
    if corefile.ends_with('\n') && !out.is_empty() {
        merged.push('\n');
    }

    for domain in pending {
        if !merged.is_empty() {
            if !merged.ends_with('\n') {
                merged.push('\n');
            }
            if !merged.ends_with("\n\n") {
                merged.push('\n');
            }
        }
        if let Some(block) = blocks.get(domain) {
            merged.push_str(block);
            merged.push('\n');
        }
    }

    Ok(merged)
}

#[cfg(test)]
#[path = "corefile_tests.rs"]
mod corefile_tests;
