// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone Builder: renders a `DNSZone` header plus its records into a zone file.
//!
//! The serial is wall-clock time (`MMDDHHMMSS`), so two builds of unchanged
//! input differ only on the SOA serial line. [`equal_ignoring_serial`] is the
//! comparison used to decide whether the zone `ConfigMap` needs an update.

use crate::constants::{ZONE_FILE_EXTENSION, ZONE_SERIAL_FORMAT};
use crate::crd::DNSZoneSpec;
use crate::errors::ValidationError;
use crate::zonefile::record::zone_origin;
use crate::zonefile::validate::validate_zone;
use chrono::{DateTime, Utc};

/// Trailing comment that identifies the SOA serial line.
const SERIAL_MARKER: &str = "; Serial";

/// A rendered zone file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneFile {
    pub text: String,
    pub serial: String,
    /// Number of record lines in the body
    pub record_count: usize,
}

/// Serial for a build started at `now`.
#[must_use]
pub fn serial_at(now: DateTime<Utc>) -> String {
    now.format(ZONE_SERIAL_FORMAT).to_string()
}

/// Data key of the zone file inside its `ConfigMap` (`example.com.zone`).
#[must_use]
pub fn zone_data_key(domain: &str) -> String {
    format!("{}{ZONE_FILE_EXTENSION}", domain.trim_end_matches('.'))
}

/// Name of the zone `ConfigMap` for a zone object.
#[must_use]
pub fn zone_configmap_name(spec: &DNSZoneSpec, zone_name: &str) -> String {
    format!("{}{zone_name}", spec.cm_prefix)
}

/// Render the `$ORIGIN`/`$TTL`/SOA/NS/glue header.
#[must_use]
pub fn render_header(spec: &DNSZoneSpec, serial: &str) -> String {
    let origin = zone_origin(&spec.domain);
    let ns = &spec.primary_ns.hostname;
    let email = spec.resp_person_email.trim_end_matches('.');
    format!(
        "$ORIGIN {origin}\n\
$TTL {ttl}s\n\
@ IN SOA {ns}.{origin} {email}. (\n\
\t{serial}     {SERIAL_MARKER}\n\
\t{refresh}    ; Refresh\n\
\t{retry}      ; Retry\n\
\t{expire}     ; Expire\n\
\t{minimum} ; Minimum TTL\n\
)\n\
@ IN NS {ns}.{origin}\n\
{ns} IN {ns_type} {ip}\n",
        ttl = spec.ttl,
        refresh = spec.refresh_rate,
        retry = spec.retry_interval,
        expire = spec.expire_time,
        minimum = spec.minimum_ttl,
        ns_type = spec.primary_ns.record_type,
        ip = spec.primary_ns.ip_address,
    )
}

/// Join record texts into a zone body, one record per line, in the given order.
#[must_use]
pub fn record_body<'a>(records: impl IntoIterator<Item = &'a str>) -> String {
    records
        .into_iter()
        .map(str::trim_end)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of record lines in a body. An A record with its PTR counts twice.
#[must_use]
pub fn count_record_lines(body: &str) -> usize {
    body.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Build a zone file from its spec, the ordered record texts and a serial.
#[must_use]
pub fn build_zone_file<'a>(
    spec: &DNSZoneSpec,
    records: impl IntoIterator<Item = &'a str>,
    serial: &str,
) -> ZoneFile {
    let body = record_body(records);
    let mut text = render_header(spec, serial);
    if !body.is_empty() {
        text.push_str(&body);
        text.push('\n');
    }
    ZoneFile {
        text,
        serial: serial.to_string(),
        record_count: count_record_lines(&body),
    }
}

/// Check a complete zone file.
///
/// # Errors
///
/// Returns the first grammar violation.
pub fn validate_zone_file(text: &str) -> Result<(), ValidationError> {
    validate_zone(text, None)
}

fn is_serial_line(line: &str) -> bool {
    line.trim_end().ends_with(SERIAL_MARKER)
}

/// Replace the SOA serial line with a serial-free marker.
///
/// Only the first serial line is touched. The header always precedes the
/// body, so a record whose comment happens to read `; Serial` is compared as is.
#[must_use]
pub fn strip_serial(text: &str) -> String {
    let mut stripped = false;
    text.lines()
        .map(|line| {
            if !stripped && is_serial_line(line) {
                stripped = true;
                SERIAL_MARKER
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compare two zone files ignoring their SOA serials.
#[must_use]
pub fn equal_ignoring_serial(previous: &str, candidate: &str) -> bool {
    strip_serial(previous) == strip_serial(candidate)
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
