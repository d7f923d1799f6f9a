// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record Builder: renders one `DNSRecord` into zone-file text.
//!
//! A record renders to `<fqdn> [<ttl>] IN <type> <value>`. Only the owner name is
//! qualified; the value is written as given and relative values resolve through
//! the zone's `$ORIGIN`.
//!
//! # Example
//!
//! ```rust
//! use corezone::crd::{RecordSpec, RecordType};
//! use corezone::zonefile::record::build_record;
//!
//! let spec = RecordSpec {
//!     name: "www".to_string(),
//!     value: "10.0.0.5".to_string(),
//!     r#type: RecordType::A,
//!     ttl: None,
//!     set_ptr: Some(true),
//! };
//! let rendered = build_record(&spec, "example.com").unwrap();
//! assert_eq!(
//!     rendered.text,
//!     "www.example.com. IN A 10.0.0.5\n5.0.0.10.in-addr.arpa. IN PTR www.example.com."
//! );
//! ```

use crate::constants::IN_ADDR_ARPA_SUFFIX;
use crate::crd::{RecordSpec, RecordType};
use crate::errors::ValidationError;
use crate::zonefile::validate::validate_record;
use std::net::Ipv4Addr;

/// Rendered text of one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRecord {
    /// One line, or two when a PTR was generated
    pub text: String,
    /// A PTR line was generated
    pub auto_ptr: bool,
}

/// Renders and validates one record against a zone origin.
type RecordHandler = fn(&RecordSpec, &str) -> Result<RenderedRecord, ValidationError>;

/// Handler per record type. Only `A` differs, because of its PTR side effect.
const RECORD_HANDLERS: [(RecordType, RecordHandler); 15] = [
    (RecordType::A, build_a_record),
    (RecordType::AAAA, build_generic_record),
    (RecordType::CNAME, build_generic_record),
    (RecordType::MX, build_generic_record),
    (RecordType::TXT, build_generic_record),
    (RecordType::NS, build_generic_record),
    (RecordType::PTR, build_generic_record),
    (RecordType::SRV, build_generic_record),
    (RecordType::CAA, build_generic_record),
    (RecordType::DNSKEY, build_generic_record),
    (RecordType::DS, build_generic_record),
    (RecordType::NAPTR, build_generic_record),
    (RecordType::RRSIG, build_generic_record),
    (RecordType::DNAME, build_generic_record),
    (RecordType::HINFO, build_generic_record),
];

fn handler_for(record_type: RecordType) -> RecordHandler {
    RECORD_HANDLERS
        .iter()
        .find(|(t, _)| *t == record_type)
        .map_or(build_generic_record as RecordHandler, |(_, handler)| *handler)
}

/// Absolute origin of a zone domain (`example.com` -> `example.com.`).
#[must_use]
pub fn zone_origin(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

/// Qualify a record owner name against the zone domain.
///
/// - `@` is the origin
/// - names ending in `.` are kept
/// - the domain itself or names under it gain a trailing dot
/// - anything else is relative to the origin
#[must_use]
pub fn qualify_name(name: &str, domain: &str) -> String {
    let origin = zone_origin(domain);
    let bare = origin.trim_end_matches('.').to_ascii_lowercase();
    let lower = name.to_ascii_lowercase();

    if name == "@" {
        origin
    } else if name.ends_with('.') {
        name.to_string()
    } else if lower == bare || lower.ends_with(&format!(".{bare}")) {
        format!("{name}.")
    } else {
        format!("{name}.{origin}")
    }
}

/// Owner name of the PTR record for a dotted-quad IPv4 address.
#[must_use]
pub fn ipv4_ptr_owner(value: &str) -> Option<String> {
    let address: Ipv4Addr = value.trim().parse().ok()?;
    let [w, x, y, z] = address.octets();
    Some(format!("{z}.{y}.{x}.{w}.{IN_ADDR_ARPA_SUFFIX}"))
}

fn render_line(owner: &str, ttl: Option<u32>, record_type: &str, value: &str) -> String {
    match ttl {
        Some(ttl) => format!("{owner} {ttl} IN {record_type} {}", value.trim()),
        None => format!("{owner} IN {record_type} {}", value.trim()),
    }
}

fn build_generic_record(spec: &RecordSpec, domain: &str) -> Result<RenderedRecord, ValidationError> {
    let origin = zone_origin(domain);
    let text = render_line(
        &qualify_name(&spec.name, domain),
        spec.ttl,
        spec.r#type.as_str(),
        &spec.value,
    );
    validate_record(&text, &origin)?;
    Ok(RenderedRecord {
        text,
        auto_ptr: false,
    })
}

fn build_a_record(spec: &RecordSpec, domain: &str) -> Result<RenderedRecord, ValidationError> {
    let mut rendered = build_generic_record(spec, domain)?;
    if !spec.set_ptr.unwrap_or(false) {
        return Ok(rendered);
    }

    let owner = ipv4_ptr_owner(&spec.value).ok_or_else(|| {
        ValidationError::new(
            1,
            format!("cannot derive PTR from non-IPv4 value '{}'", spec.value),
        )
    })?;
    let ptr = render_line(
        &owner,
        None,
        RecordType::PTR.as_str(),
        &qualify_name(&spec.name, domain),
    );
    validate_record(&ptr, &zone_origin(domain))?;

    rendered.text = format!("{}\n{ptr}", rendered.text);
    rendered.auto_ptr = true;
    Ok(rendered)
}

/// Render and validate one record for the zone `domain`.
///
/// # Errors
///
/// Returns the validator's diagnostic when the rendered text is not exactly one
/// valid master-file entry on one line, or when a PTR is requested for a value
/// that is not a dotted-quad IPv4 address.
pub fn build_record(spec: &RecordSpec, domain: &str) -> Result<RenderedRecord, ValidationError> {
    handler_for(spec.r#type)(spec, domain)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
