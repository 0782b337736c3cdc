//! Bridges `validator` derive output into the crate error taxonomy.
//!
//! Request DTOs carry declarative rules; `check` runs them and flattens every
//! violation into `AppError::Validation` so a response lists all problems with
//! a payload, not just the first one encountered.

use chrono::{NaiveDate, Utc};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::errors::{AppError, FieldError};

pub fn check<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(collect)
}

fn collect(errors: ValidationErrors) -> AppError {
    let mut details = Vec::new();
    flatten(None, &errors, &mut details);
    AppError::Validation(details)
}

fn flatten(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let qualified = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.clone(),
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.push(to_field_error(&qualified, error));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten(Some(&qualified), nested, out),
            ValidationErrorsKind::List(map) => {
                for (index, nested) in map {
                    let indexed = format!("{qualified}[{index}]");
                    flatten(Some(&indexed), nested, out);
                }
            }
        }
    }
}

fn to_field_error(field: &str, error: &ValidationError) -> FieldError {
    // Struct-level rules land under "__all__"; the rule functions stash the
    // offending field name in the params so the response can point at it.
    let field = if field.ends_with("__all__") {
        error
            .params
            .get("field")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| field.to_string())
    } else {
        field.to_string()
    };

    FieldError {
        field,
        rule: error.code.to_string(),
        message: error
            .message
            .clone()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "invalid value".to_string()),
    }
}

/// Log entry dates may not be in the future.
pub fn not_future(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut error = ValidationError::new("not_future");
        error.message = Some("date cannot be in the future".into());
        return Err(error);
    }
    Ok(())
}

/// Cross-field rule shared by student profiles and weekly reports: equal dates
/// are rejected along with inverted ranges.
pub fn date_range_error() -> ValidationError {
    let mut error = ValidationError::new("date_range");
    error.message = Some("end date must be after start date".into());
    error.add_param("field".into(), &"end_date");
    error
}

pub fn check_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end <= start {
        return Err(date_range_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    #[validate(schema(function = check_sample, skip_on_field_errors = false))]
    struct Sample {
        #[validate(length(min = 10, max = 50, message = "content must be 10-50 characters"))]
        content: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    }

    fn check_sample(sample: &Sample) -> Result<(), ValidationError> {
        check_date_range(sample.start_date, sample.end_date)
    }

    #[test]
    fn all_violations_are_collected() {
        let sample = Sample {
            content: "short".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        };

        let err = check(&sample).unwrap_err();
        match err {
            AppError::Validation(details) => {
                assert_eq!(details.len(), 2);
                assert!(details.iter().any(|d| d.field == "content"));
                assert!(details
                    .iter()
                    .any(|d| d.field == "end_date" && d.rule == "date_range"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_passes() {
        let sample = Sample {
            content: "long enough content".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
        };
        assert!(check(&sample).is_ok());
    }

    #[test]
    fn future_dates_rejected_for_log_entries() {
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        assert!(not_future(&tomorrow).is_err());
        let today = Utc::now().date_naive();
        assert!(not_future(&today).is_ok());
    }
}
