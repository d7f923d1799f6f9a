// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone-file generation and validation.
//!
//! - [`record`] - renders one `DNSRecord` into master-file text
//! - [`zone`] - renders a `DNSZone` header plus its records, serial handling
//! - [`validate`] - master-file syntax checks on top of hickory's zone parser

pub mod record;
pub mod validate;
pub mod zone;

pub use record::{build_record, qualify_name, zone_origin, RenderedRecord};
pub use validate::{validate_record, validate_zone};
pub use zone::{build_zone_file, equal_ignoring_serial, serial_at, ZoneFile};
