// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from Rust types defined in src/crd.rs.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! Generated files are written to deploy/crds/.

use corezone::crd_yaml::write_crds;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let output_dir = Path::new("deploy/crds");

    println!("Generating CRD YAML files from src/crd.rs...");

    for path in write_crds(output_dir)? {
        println!("  ✓ Generated {}", path.display());
    }

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}
