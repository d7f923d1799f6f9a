// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone-file syntax checks.
//!
//! Text is parsed with hickory's RFC1035 master-file parser
//! (`hickory_client::serialize::txt`). That parser refuses DNSKEY, DS and RRSIG
//! (it expects them to be signed in, not written) and has no DNAME support, so
//! entries of those four types are checked here field by field and blanked out
//! of the text handed to hickory.
//!
//! A light pre-pass splits the text into entries. It tracks `$ORIGIN`, refuses
//! `$INCLUDE` and unknown directives, and gives every diagnostic a line number.

use crate::constants::DEFAULT_ZONE_TTL_SECS;
use crate::crd::RecordType;
use crate::errors::ValidationError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hickory_client::serialize::txt::Parser;
use hickory_proto::rr::{Name, RecordType as WireType};
use std::str::FromStr;

/// Record types hickory's text parser cannot read.
const LOCALLY_CHECKED: [RecordType; 4] = [
    RecordType::DNSKEY,
    RecordType::DS,
    RecordType::RRSIG,
    RecordType::DNAME,
];

/// One lexical token of an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    pub quoted: bool,
}

impl Token {
    fn bare() -> Self {
        Self {
            text: String::new(),
            quoted: false,
        }
    }
}

/// One logical entry (a directive or a resource record), possibly spanning lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    /// First line of the entry (1-based)
    pub line: usize,
    /// Last line of the entry (1-based)
    pub end_line: usize,
    /// The first line starts with whitespace (owner is inherited)
    pub indented: bool,
    pub tokens: Vec<Token>,
}

impl Entry {
    fn is_directive(&self) -> bool {
        !self.indented && self.tokens.first().is_some_and(|t| !t.quoted && t.text.starts_with('$'))
    }
}

/// Split master-file text into entries.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Entry>, ValidationError> {
    let mut entries = Vec::new();
    let mut open: Option<Entry> = None;
    let mut depth = 0usize;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let mut entry = open.take().unwrap_or_else(|| Entry {
            line,
            end_line: line,
            indented: raw.starts_with([' ', '\t']),
            tokens: Vec::new(),
        });
        entry.end_line = line;

        let mut current: Option<Token> = None;
        let mut in_quotes = false;
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if in_quotes {
                let token = current.get_or_insert_with(Token::bare);
                match c {
                    '"' => {
                        in_quotes = false;
                        entry.tokens.extend(current.take());
                    }
                    '\\' => {
                        token.text.push(c);
                        token.text.extend(chars.next());
                    }
                    _ => token.text.push(c),
                }
                continue;
            }
            match c {
                ' ' | '\t' | '\r' => entry.tokens.extend(current.take()),
                ';' => break,
                '(' => {
                    entry.tokens.extend(current.take());
                    depth += 1;
                }
                ')' => {
                    entry.tokens.extend(current.take());
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| ValidationError::new(line, "unbalanced ')'"))?;
                }
                '"' => {
                    entry.tokens.extend(current.take());
                    in_quotes = true;
                    current = Some(Token {
                        text: String::new(),
                        quoted: true,
                    });
                }
                '\\' => {
                    let token = current.get_or_insert_with(Token::bare);
                    token.text.push(c);
                    token.text.extend(chars.next());
                }
                _ => current.get_or_insert_with(Token::bare).text.push(c),
            }
        }
        if in_quotes {
            return Err(ValidationError::new(line, "unterminated quoted string"));
        }
        entry.tokens.extend(current.take());

        if depth > 0 {
            open = Some(entry);
        } else if !entry.tokens.is_empty() {
            entries.push(entry);
        }
    }

    match open {
        Some(entry) => Err(ValidationError::new(entry.line, "unbalanced '('")),
        None => Ok(entries),
    }
}

/// Parse a TTL: plain seconds or a `1h30m` style duration.
#[must_use]
pub fn parse_ttl(token: &str) -> Option<u32> {
    if token.is_empty() {
        return None;
    }
    let mut total: u64 = 0;
    let mut number: Option<u64> = None;
    for c in token.chars() {
        if let Some(digit) = c.to_digit(10) {
            number = Some(number.unwrap_or(0).checked_mul(10)?.checked_add(u64::from(digit))?);
            continue;
        }
        let multiplier = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return None,
        };
        total = total.checked_add(number.take()?.checked_mul(multiplier)?)?;
    }
    if let Some(seconds) = number {
        total = total.checked_add(seconds)?;
    }
    u32::try_from(total).ok()
}

fn is_class(token: &str) -> bool {
    ["IN", "CH", "HS", "CS"]
        .iter()
        .any(|class| class.eq_ignore_ascii_case(token))
}

/// Record type token and the RDATA after it, skipping owner, TTL and class.
fn split_record(entry: &Entry) -> Option<(&Token, &[Token])> {
    let mut rest: &[Token] = &entry.tokens;
    if !entry.indented {
        rest = &rest[1..];
    }
    let (mut seen_ttl, mut seen_class) = (false, false);
    while let Some(token) = rest.first() {
        if !seen_class && !token.quoted && is_class(&token.text) {
            seen_class = true;
        } else if !seen_ttl && !token.quoted && parse_ttl(&token.text).is_some() {
            seen_ttl = true;
        } else {
            break;
        }
        rest = &rest[1..];
    }
    rest.split_first()
}

fn parse_name(token: &Token, origin: Option<&Name>) -> Result<Name, String> {
    if token.quoted {
        return Err(format!("quoted string \"{}\" is not a domain name", token.text));
    }
    if token.text == "@" {
        return origin
            .cloned()
            .ok_or_else(|| "'@' used without $ORIGIN".to_string());
    }
    if origin.is_none() && !token.text.ends_with('.') {
        return Err(format!("relative name '{}' used without $ORIGIN", token.text));
    }
    Name::parse(&token.text, origin).map_err(|e| format!("bad name '{}': {e}", token.text))
}

fn parse_number<T: FromStr>(token: &Token, field: &str) -> Result<T, String> {
    token
        .text
        .parse()
        .map_err(|_| format!("bad {field} '{}'", token.text))
}

fn expect_at_least(rdata: &[Token], count: usize, rtype: RecordType) -> Result<(), String> {
    if rdata.len() >= count {
        Ok(())
    } else {
        Err(format!(
            "{rtype} expects at least {count} RDATA fields, found {}",
            rdata.len()
        ))
    }
}

fn joined(rdata: &[Token]) -> String {
    rdata.iter().map(|t| t.text.as_str()).collect()
}

fn check_base64(rdata: &[Token], field: &str) -> Result<(), String> {
    STANDARD
        .decode(joined(rdata).as_bytes())
        .map(|_| ())
        .map_err(|e| format!("bad {field}: {e}"))
}

fn check_hex(rdata: &[Token], field: &str) -> Result<(), String> {
    let encoded = joined(rdata);
    if encoded.is_empty()
        || encoded.len() % 2 != 0
        || !encoded.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(format!("bad {field} '{encoded}'"));
    }
    Ok(())
}

/// DNSSEC algorithm numbers or their mnemonics.
fn check_algorithm(token: &Token) -> Result<(), String> {
    const MNEMONICS: [&str; 12] = [
        "RSAMD5",
        "DH",
        "DSA",
        "RSASHA1",
        "DSA-NSEC3-SHA1",
        "RSASHA1-NSEC3-SHA1",
        "RSASHA256",
        "RSASHA512",
        "ECC-GOST",
        "ECDSAP256SHA256",
        "ECDSAP384SHA384",
        "ED25519",
    ];
    if token.text.parse::<u8>().is_ok()
        || MNEMONICS.iter().any(|m| m.eq_ignore_ascii_case(&token.text))
    {
        Ok(())
    } else {
        Err(format!("bad algorithm '{}'", token.text))
    }
}

/// RRSIG timestamps: `YYYYMMDDHHmmSS` or seconds since the epoch.
fn check_signature_time(token: &Token, field: &str) -> Result<(), String> {
    let text = &token.text;
    if text.len() == 14 && text.bytes().all(|b| b.is_ascii_digit()) {
        return chrono::NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S")
            .map(|_| ())
            .map_err(|_| format!("bad {field} '{text}'"));
    }
    parse_number::<u32>(token, field).map(|_| ())
}

fn check_type_covered(token: &Token) -> Result<(), String> {
    let text = &token.text;
    let generic = text
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("TYPE"))
        .and_then(|_| text[4..].parse::<u16>().ok())
        .is_some();
    if generic
        || RecordType::from_mnemonic(text).is_some()
        || WireType::from_str(&text.to_ascii_uppercase()).is_ok()
    {
        Ok(())
    } else {
        Err(format!("bad type covered '{text}'"))
    }
}

/// RDATA of the types hickory cannot read.
fn check_local_rdata(
    rtype: RecordType,
    rdata: &[Token],
    origin: Option<&Name>,
) -> Result<(), String> {
    match rtype {
        RecordType::DNAME => match rdata {
            [target] => parse_name(target, origin).map(|_| ()),
            _ => Err(format!("DNAME expects 1 RDATA field, found {}", rdata.len())),
        },
        RecordType::DNSKEY => {
            expect_at_least(rdata, 4, rtype)?;
            parse_number::<u16>(&rdata[0], "flags")?;
            parse_number::<u8>(&rdata[1], "protocol")?;
            check_algorithm(&rdata[2])?;
            check_base64(&rdata[3..], "public key")
        }
        RecordType::DS => {
            expect_at_least(rdata, 4, rtype)?;
            parse_number::<u16>(&rdata[0], "key tag")?;
            check_algorithm(&rdata[1])?;
            parse_number::<u8>(&rdata[2], "digest type")?;
            check_hex(&rdata[3..], "digest")
        }
        RecordType::RRSIG => {
            expect_at_least(rdata, 9, rtype)?;
            check_type_covered(&rdata[0])?;
            check_algorithm(&rdata[1])?;
            parse_number::<u8>(&rdata[2], "labels")?;
            parse_ttl(&rdata[3].text)
                .ok_or_else(|| format!("bad original TTL '{}'", rdata[3].text))?;
            check_signature_time(&rdata[4], "expiration")?;
            check_signature_time(&rdata[5], "inception")?;
            parse_number::<u16>(&rdata[6], "key tag")?;
            parse_name(&rdata[7], origin)?;
            check_base64(&rdata[8..], "signature")
        }
        other => Err(format!("{other} is checked by the zone parser")),
    }
}

/// Run hickory's parser over `text`. A leading `$TTL` lets standalone records
/// without a TTL parse; the text's own `$TTL` overrides it.
fn parse_with_hickory(text: &str, origin: Option<&Name>) -> Result<(), String> {
    let input = format!("$TTL {DEFAULT_ZONE_TTL_SECS}\n{text}\n");
    Parser::new(input, None, origin.cloned())
        .parse()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn origin_name(origin: &str) -> Result<Name, ValidationError> {
    Name::from_ascii(origin)
        .map_err(|e| ValidationError::new(0, format!("bad origin '{origin}': {e}")))
}

/// Validate master-file text.
///
/// `origin` is the initial `$ORIGIN` (absolute, trailing dot) used until the
/// text sets its own.
///
/// # Errors
///
/// Returns the first violation found, with its 1-based line number.
pub fn validate_zone(text: &str, origin: Option<&str>) -> Result<(), ValidationError> {
    let initial = origin.map(origin_name).transpose()?;
    let mut origin = initial.clone();
    let entries = tokenize(text)?;

    let mut lines: Vec<&str> = text.lines().collect();
    let mut parsed: Vec<&Entry> = Vec::new();

    for entry in &entries {
        let fail = |message: String| ValidationError::new(entry.line, message);

        if entry.is_directive() {
            let args = &entry.tokens[1..];
            match entry.tokens[0].text.to_ascii_uppercase().as_str() {
                "$ORIGIN" => {
                    let [name] = args else {
                        return Err(fail("$ORIGIN expects exactly one name".to_string()));
                    };
                    origin = Some(parse_name(name, origin.as_ref()).map_err(fail)?);
                }
                "$TTL" => {}
                "$INCLUDE" => return Err(fail("$INCLUDE is not supported".to_string())),
                other => return Err(fail(format!("unknown directive '{other}'"))),
            }
            parsed.push(entry);
            continue;
        }

        let Some((rtype, rdata)) = split_record(entry) else {
            return Err(fail("missing record type".to_string()));
        };
        match RecordType::from_mnemonic(&rtype.text).filter(|t| LOCALLY_CHECKED.contains(t)) {
            Some(local) => {
                if !entry.indented {
                    parse_name(&entry.tokens[0], origin.as_ref()).map_err(fail)?;
                }
                check_local_rdata(local, rdata, origin.as_ref()).map_err(fail)?;
                for line in &mut lines[entry.line - 1..entry.end_line] {
                    *line = "";
                }
            }
            None => parsed.push(entry),
        }
    }

    if parse_with_hickory(&lines.join("\n"), initial.as_ref()).is_ok() {
        return Ok(());
    }

    // Re-parse growing prefixes to find the entry that breaks the parse.
    for entry in &parsed {
        if let Err(message) =
            parse_with_hickory(&lines[..entry.end_line].join("\n"), initial.as_ref())
        {
            return Err(ValidationError::new(entry.line, message));
        }
    }
    let message = parse_with_hickory(&lines.join("\n"), initial.as_ref())
        .err()
        .unwrap_or_default();
    Err(ValidationError::new(
        parsed.last().map_or(1, |entry| entry.line),
        message,
    ))
}

/// Validate one rendered record line.
///
/// On top of [`validate_zone`], the text must be a single resource record on a
/// single line: no line breaks, no directives, no second entry.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_record(text: &str, origin: &str) -> Result<(), ValidationError> {
    if text.contains(['\n', '\r']) {
        return Err(ValidationError::new(
            1,
            "record text must be a single line",
        ));
    }
    let entries = tokenize(text)?;
    match entries.as_slice() {
        [entry] if entry.is_directive() => Err(ValidationError::new(
            1,
            format!("directive '{}' is not a record", entry.tokens[0].text),
        )),
        [_] => validate_zone(text, Some(origin)),
        _ => Err(ValidationError::new(
            1,
            format!("expected exactly one record, found {}", entries.len()),
        )),
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod validate_tests;
