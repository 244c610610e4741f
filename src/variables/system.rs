//! System variables: `{{$guid}}`, `{{$timestamp}}`, `{{$randomInt}}`,
//! `{{$datetime}}` and `{{$processEnv}}`.
//!
//! Values are generated fresh on every substitution and never cached. A
//! `$`-name with arguments that do not fit one of the forms below is not a
//! system variable at all and is left for the caller to report.
//!
//! | Form | Value |
//! |---|---|
//! | `$guid` | random UUID v4 |
//! | `$timestamp` | Unix time in seconds |
//! | `$randomInt [min max]` | integer in `min..=max` (default `0..=1000`) |
//! | `$datetime [iso8601\|rfc1123] [offsetMs]` | current time, optionally shifted |
//! | `$processEnv NAME` / `$processEnv %NAME` | process env var; `%` makes it optional |

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use std::env;
use uuid::Uuid;

/// Default `$randomInt` range.
pub const RANDOM_INT_DEFAULT_MIN: i64 = 0;
pub const RANDOM_INT_DEFAULT_MAX: i64 = 1000;

/// Output format of `$datetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeFormat {
    /// `2030-01-01T00:00:00.000Z`
    Iso8601,
    /// `Tue, 01 Jan 2030 00:00:00 GMT`
    Rfc1123,
}

impl DatetimeFormat {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "iso8601" => Some(DatetimeFormat::Iso8601),
            "rfc1123" => Some(DatetimeFormat::Rfc1123),
            _ => None,
        }
    }

    pub fn format(&self, datetime: DateTime<Utc>) -> String {
        match self {
            DatetimeFormat::Iso8601 => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
            DatetimeFormat::Rfc1123 => datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        }
    }
}

/// A recognized system variable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemVariable {
    Guid,
    Timestamp,
    RandomInt { min: i64, max: i64 },
    Datetime { format: DatetimeFormat, offset_ms: i64 },
    ProcessEnv { name: String, optional: bool },
}

impl SystemVariable {
    /// Parses a placeholder name such as `$randomInt 1 10`.
    ///
    /// Returns `None` for anything that is not exactly one of the supported
    /// forms.
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split_whitespace();
        let head = parts.next()?;
        let args: Vec<&str> = parts.collect();

        match (head, args.as_slice()) {
            ("$guid", []) => Some(SystemVariable::Guid),
            ("$timestamp", []) => Some(SystemVariable::Timestamp),
            ("$randomInt", []) => Some(SystemVariable::RandomInt {
                min: RANDOM_INT_DEFAULT_MIN,
                max: RANDOM_INT_DEFAULT_MAX,
            }),
            ("$randomInt", [min, max]) => {
                let min: i64 = min.parse().ok()?;
                let max: i64 = max.parse().ok()?;
                (min <= max).then_some(SystemVariable::RandomInt { min, max })
            }
            ("$datetime", []) => Some(SystemVariable::Datetime {
                format: DatetimeFormat::Iso8601,
                offset_ms: 0,
            }),
            ("$datetime", [format]) => Some(SystemVariable::Datetime {
                format: DatetimeFormat::parse(format)?,
                offset_ms: 0,
            }),
            ("$datetime", [format, offset]) => Some(SystemVariable::Datetime {
                format: DatetimeFormat::parse(format)?,
                offset_ms: offset.parse().ok()?,
            }),
            ("$processEnv", [var]) => {
                let (name, optional) = match var.strip_prefix('%') {
                    Some(name) => (name, true),
                    None => (*var, false),
                };
                (!name.is_empty()).then(|| SystemVariable::ProcessEnv {
                    name: name.to_string(),
                    optional,
                })
            }
            _ => None,
        }
    }

    /// Generates a fresh value.
    ///
    /// `None` when a required `$processEnv` variable is unset or a datetime
    /// offset overflows.
    pub fn generate(&self) -> Option<String> {
        match self {
            SystemVariable::Guid => Some(Uuid::new_v4().to_string()),
            SystemVariable::Timestamp => Some(Utc::now().timestamp().to_string()),
            SystemVariable::RandomInt { min, max } => {
                Some(rand::thread_rng().gen_range(*min..=*max).to_string())
            }
            SystemVariable::Datetime { format, offset_ms } => {
                let datetime = Utc::now().checked_add_signed(Duration::try_milliseconds(*offset_ms)?)?;
                Some(format.format(datetime))
            }
            SystemVariable::ProcessEnv { name, optional } => match env::var(name) {
                Ok(value) => Some(value),
                Err(_) if *optional => Some(String::new()),
                Err(_) => None,
            },
        }
    }
}

/// Resolves a system variable placeholder name.
///
/// # Examples
///
/// ```
/// use httprex::variables::system::resolve_system_variable;
///
/// let guid = resolve_system_variable("$guid").unwrap();
/// assert_eq!(guid.len(), 36);
///
/// let n: i64 = resolve_system_variable("$randomInt 5 5").unwrap().parse().unwrap();
/// assert_eq!(n, 5);
///
/// assert!(resolve_system_variable("$datetime someday").is_none());
/// ```
pub fn resolve_system_variable(name: &str) -> Option<String> {
    SystemVariable::parse(name)?.generate()
}

/// Whether `name` uses the `$` system variable namespace.
pub fn is_system_variable(name: &str) -> bool {
    name.trim_start().starts_with('$')
}
