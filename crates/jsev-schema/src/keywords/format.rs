//! # Format Vocabulary
//!
//! `format` always annotates with the format name. It asserts only when
//! the format-assertion vocabulary is active in the schema's dialect or
//! the caller sets
//! [`require_format_assertions`](crate::options::EvaluationOptions::require_format_assertions).
//!
//! Checked formats: `date-time`, `date`, `time`, `duration`, `email`,
//! `idn-email`, `hostname`, `idn-hostname`, `ipv4`, `ipv6`, `uri`,
//! `uri-reference`, `iri`, `iri-reference`, `uri-template`, `uuid`,
//! `regex`, `json-pointer` and `relative-json-pointer`. Unknown formats
//! and non-string instances always pass.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::NaiveDate;
use jsev_core::{EvaluationError, JsonPointer, MalformedSchemaError};
use serde_json::Value;
use url::Url;

use super::{
    expect_string, handler, CompileContext, Keyword, KeywordContext, KeywordHandler, KeywordResult,
};
use crate::model::compile_pattern;

/// Handlers of the format-annotation vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![handler("format", &[], compile_format)]
}

type Check = fn(&str) -> bool;

/// The checker for a format name, if the format is known.
pub fn checker(format: &str) -> Option<Check> {
    let check: Check = match format {
        "date-time" => is_date_time,
        "date" => is_date,
        "time" => is_time,
        "duration" => is_duration,
        "email" | "idn-email" => is_email,
        "hostname" => is_hostname,
        "idn-hostname" => is_idn_hostname,
        "ipv4" => is_ipv4,
        "ipv6" => is_ipv6,
        "uri" | "iri" => is_uri,
        "uri-reference" | "iri-reference" => is_uri_reference,
        "uri-template" => is_uri_template,
        "uuid" => is_uuid,
        "regex" => is_regex,
        "json-pointer" => is_json_pointer,
        "relative-json-pointer" => is_relative_json_pointer,
        _ => return None,
    };
    Some(check)
}

#[derive(Debug)]
struct Format {
    name: String,
    check: Option<Check>,
}

impl Keyword for Format {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let annotation = KeywordResult::annotate(Value::String(self.name.clone()));
        if !cx.asserts_format() {
            return Ok(annotation);
        }
        let (Some(check), Value::String(s)) = (self.check, instance) else {
            return Ok(annotation);
        };
        if check(s) {
            Ok(annotation)
        } else {
            Ok(KeywordResult::fail(format!(
                "{} is not a valid '{}'",
                crate::json::preview(instance),
                self.name
            )))
        }
    }
}

fn compile_format(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let name = expect_string(value, cx)?;
    Ok(Box::new(Format {
        name: name.to_string(),
        check: checker(name),
    }))
}

fn is_date_time(s: &str) -> bool {
    match s.find(['T', 't']) {
        Some(t) => is_date(&s[..t]) && is_time(&s[t + 1..]),
        None => false,
    }
}

fn is_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
        && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// RFC 3339 `full-time`, with leap seconds only at 23:59:60 UTC.
fn is_time(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 9 || bytes[2] != b':' || bytes[5] != b':' {
        return false;
    }
    let field = |range: std::ops::Range<usize>| s.get(range).and_then(two_digits);
    let (Some(hour), Some(minute), Some(second)) = (field(0..2), field(3..5), field(6..8)) else {
        return false;
    };
    let mut rest = &s[8..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let digits = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &fraction[digits..];
    }
    let offset_minutes: i64 = match rest {
        "Z" | "z" => 0,
        _ => {
            let sign = match rest.as_bytes().first() {
                Some(b'+') => 1,
                Some(b'-') => -1,
                _ => return false,
            };
            let offset = &rest[1..];
            if offset.len() != 5 || !offset.is_ascii() || offset.as_bytes()[2] != b':' {
                return false;
            }
            let (Some(oh), Some(om)) = (two_digits(&offset[..2]), two_digits(&offset[3..])) else {
                return false;
            };
            if oh > 23 || om > 59 {
                return false;
            }
            sign * (oh * 60 + om)
        }
    };
    if hour > 23 || minute > 59 || second > 60 {
        return false;
    }
    if second == 60 {
        let utc = (hour * 60 + minute - offset_minutes).rem_euclid(24 * 60);
        return utc == 23 * 60 + 59;
    }
    true
}

fn two_digits(s: &str) -> Option<i64> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// ISO 8601 duration as profiled by RFC 3339 appendix A.
fn is_duration(s: &str) -> bool {
    let Some(body) = s.strip_prefix('P') else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return false;
            }
            (date, Some(time))
        }
        None => (body, None),
    };
    if date.ends_with('W') {
        return time.is_none() && designators(&date[..date.len() - 1], &[]).is_some();
    }
    let Some(date_units) = designators(date, &['Y', 'M', 'D']) else {
        return false;
    };
    let time_units = match time {
        Some(time) => match designators(time, &['H', 'M', 'S']) {
            Some(units) if units > 0 => units,
            _ => return false,
        },
        None => 0,
    };
    date_units + time_units > 0
}

/// Parse `<digits><unit>` pairs with units in the given order. With no
/// units, the whole string must be digits. Returns the number of pairs.
fn designators(s: &str, units: &[char]) -> Option<usize> {
    if units.is_empty() {
        return (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(1);
    }
    let mut count = 0;
    let mut next_unit = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let unit = rest[digits..].chars().next()?;
        let position = units[next_unit..].iter().position(|u| *u == unit)?;
        next_unit += position + 1;
        count += 1;
        rest = &rest[digits + unit.len_utf8()..];
    }
    Some(count)
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if local.contains("..") || (local.contains('@') && !local.starts_with('"')) {
        return false;
    }
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return match literal.strip_prefix("IPv6:") {
            Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
            None => literal.parse::<Ipv4Addr>().is_ok(),
        };
    }
    is_idn_hostname(domain)
}

fn is_hostname(s: &str) -> bool {
    s.is_ascii() && is_idn_hostname(s)
}

/// Label structure of a hostname; non-ASCII labels are accepted as-is.
fn is_idn_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-')
    })
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

fn is_uri(s: &str) -> bool {
    !s.contains(char::is_whitespace) && !s.contains('\\') && Url::parse(s).is_ok()
}

fn is_uri_reference(s: &str) -> bool {
    if s.contains(char::is_whitespace) || s.contains('\\') {
        return false;
    }
    Url::parse("json-schema:///").is_ok_and(|base| base.join(s).is_ok())
}

fn is_uri_template(s: &str) -> bool {
    let mut open = false;
    for c in s.chars() {
        match (c, open) {
            ('{', false) => open = true,
            ('}', true) => open = false,
            ('{', true) | ('}', false) => return false,
            _ => {}
        }
    }
    !open
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && [8, 13, 18, 23].iter().all(|i| s.as_bytes()[*i] == b'-')
        && uuid::Uuid::parse_str(s).is_ok()
}

fn is_regex(s: &str) -> bool {
    compile_pattern(s).is_ok()
}

fn is_json_pointer(s: &str) -> bool {
    JsonPointer::parse(s).is_ok()
}

fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || JsonPointer::parse(rest).is_ok()
}
