// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD manifests.
//!
//! Renders the `CustomResourceDefinition` of every corezone kind as YAML so the
//! files under `deploy/crds/` always match the Rust types in [`crate::crd`].

use crate::crd::{DNSConnector, DNSRecord, DNSZone};
use anyhow::{Context, Result};
use kube::CustomResourceExt;
use std::fs;
use std::path::{Path, PathBuf};

/// Header prepended to every generated manifest.
pub const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

/// File name of the manifest for `T` (`dnszones.crd.yaml`).
#[must_use]
pub fn crd_file_name<T: CustomResourceExt>() -> String {
    format!("{}.crd.yaml", T::api_resource().plural)
}

/// The CRD of `T` as YAML, with the generated-file header.
///
/// # Errors
///
/// Returns an error if the CRD cannot be serialized.
pub fn render_crd<T: CustomResourceExt>() -> Result<String> {
    let yaml = serde_yaml::to_string(&T::crd())
        .with_context(|| format!("failed to serialize CRD {}", T::crd_name()))?;
    Ok(format!("{COPYRIGHT_HEADER}{yaml}"))
}

fn write_crd<T: CustomResourceExt>(output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(crd_file_name::<T>());
    fs::write(&path, render_crd::<T>()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the manifests of all three kinds into `output_dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub fn write_crds(output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    Ok(vec![
        write_crd::<DNSConnector>(output_dir)?,
        write_crd::<DNSZone>(output_dir)?,
        write_crd::<DNSRecord>(output_dir)?,
    ])
}

#[cfg(test)]
#[path = "crd_yaml_tests.rs"]
mod crd_yaml_tests;
