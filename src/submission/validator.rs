//! Field validation.
//!
//! Every field is checked independently and all failures are collected, so a
//! caller sees every invalid field at once. No I/O happens here; the file
//! stream is only checked for presence and moved into the result.

use std::num::IntErrorKind;

use chrono::{NaiveDate, NaiveTime};

use crate::submission::types::{
    fields, ErrorCode, FieldError, FieldErrors, RawSubmission, ValidatedSubmission,
};

const REQUIRED_MESSAGE: &str = "This field is required.";

pub const TRANS_NUM_MIN: i64 = 10_000_000_000_000;
pub const TRANS_NUM_MAX: i64 = 99_999_999_999_999;
pub const PORT_OF_ENTRY_MIN: i64 = 0;
pub const PORT_OF_ENTRY_MAX: i64 = 999;
pub const CCD_MIN_LENGTH: usize = 5;
pub const CCD_MAX_LENGTH: usize = 25;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

struct IntegerRule {
    field: &'static str,
    min: i64,
    max: i64,
    invalid: &'static str,
    out_of_range: &'static str,
}

const TRANS_NUM_RULE: IntegerRule = IntegerRule {
    field: fields::TRANS_NUM,
    min: TRANS_NUM_MIN,
    max: TRANS_NUM_MAX,
    invalid: "Please enter a valid transaction number.",
    out_of_range: "Transaction must be 14 digits.",
};

const PORT_OF_ENTRY_RULE: IntegerRule = IntegerRule {
    field: fields::PORT_OF_ENTRY,
    min: PORT_OF_ENTRY_MIN,
    max: PORT_OF_ENTRY_MAX,
    invalid: "Please enter a valid port of entry.",
    out_of_range: "Please enter a valid port of entry.",
};

/// Validate a raw submission.
///
/// Returns the validated submission, or every field error found. The file
/// handle moves into the result on success and is dropped on rejection.
pub fn validate(mut raw: RawSubmission) -> Result<ValidatedSubmission, FieldErrors> {
    let mut errors = FieldErrors::new();

    let trans_num = check_integer(&TRANS_NUM_RULE, raw.field(fields::TRANS_NUM));
    let port = check_integer(&PORT_OF_ENTRY_RULE, raw.field(fields::PORT_OF_ENTRY));
    let ccd = check_ccd(raw.field(fields::CCD_NUM));
    let eta_date = check_optional(raw.field(fields::ETA_DATE), parse_date);
    let eta_time = check_optional(raw.field(fields::ETA_TIME), parse_time);
    let file = raw.take_file().ok_or_else(|| {
        FieldError::new(fields::USERFILE, ErrorCode::Required, REQUIRED_MESSAGE)
    });

    let trans_num = collect(trans_num, &mut errors);
    let port = collect(port, &mut errors);
    let ccd = collect(ccd, &mut errors);
    let eta_date = collect(eta_date, &mut errors);
    let eta_time = collect(eta_time, &mut errors);
    let file = collect(file, &mut errors);

    match (trans_num, port, ccd, eta_date, eta_time, file) {
        (Some(trans_num), Some(port), Some(ccd), Some(eta_date), Some(eta_time), Some(file)) => {
            // Range checks above guarantee both conversions.
            Ok(ValidatedSubmission::new(
                trans_num as u64,
                ccd,
                port as u16,
                eta_date,
                eta_time,
                file,
            ))
        }
        _ => Err(errors),
    }
}

fn collect<T>(result: Result<T, FieldError>, errors: &mut FieldErrors) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn required<'a>(field: &'static str, raw: Option<&'a str>) -> Result<&'a str, FieldError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FieldError::new(field, ErrorCode::Required, REQUIRED_MESSAGE)),
    }
}

fn check_integer(rule: &IntegerRule, raw: Option<&str>) -> Result<i64, FieldError> {
    let value = strip_zero_fraction(required(rule.field, raw)?);

    let number = value.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => {
            FieldError::new(rule.field, ErrorCode::MaxValue, rule.out_of_range)
        }
        IntErrorKind::NegOverflow => {
            FieldError::new(rule.field, ErrorCode::MinValue, rule.out_of_range)
        }
        _ => FieldError::new(rule.field, ErrorCode::Invalid, rule.invalid),
    })?;

    if number < rule.min {
        return Err(FieldError::new(rule.field, ErrorCode::MinValue, rule.out_of_range));
    }
    if number > rule.max {
        return Err(FieldError::new(rule.field, ErrorCode::MaxValue, rule.out_of_range));
    }
    Ok(number)
}

/// `440.`, `440.0` and `440.000` are whole numbers; `440.5` is not.
fn strip_zero_fraction(value: &str) -> &str {
    match value.rfind('.') {
        Some(dot) if value[dot + 1..].bytes().all(|b| b == b'0') => &value[..dot],
        _ => value,
    }
}

fn check_ccd(raw: Option<&str>) -> Result<String, FieldError> {
    let value = required(fields::CCD_NUM, raw)?;
    let length = value.chars().count();

    if length < CCD_MIN_LENGTH {
        return Err(FieldError::new(
            fields::CCD_NUM,
            ErrorCode::MinLength,
            format!(
                "Ensure this value has at least {} characters (it has {}).",
                CCD_MIN_LENGTH, length
            ),
        ));
    }
    if length > CCD_MAX_LENGTH {
        return Err(FieldError::new(
            fields::CCD_NUM,
            ErrorCode::MaxLength,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                CCD_MAX_LENGTH, length
            ),
        ));
    }
    Ok(value.to_string())
}

/// Blank or missing is "no value"; anything else must parse.
fn check_optional<T>(
    raw: Option<&str>,
    parse: fn(&str) -> Result<T, FieldError>,
) -> Result<Option<T>, FieldError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, FieldError> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| FieldError::new(fields::ETA_DATE, ErrorCode::Invalid, "Enter a valid date."))
}

fn parse_time(value: &str) -> Result<NaiveTime, FieldError> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| FieldError::new(fields::ETA_TIME, ErrorCode::Invalid, "Enter a valid time."))
}
