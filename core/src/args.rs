//! Command-line argument parsing with cardinality contracts.
//!
//! The free functions scan a raw argument vector for a single option literal
//! such as `--flag` or `--param`. Matching is exact string equality, in one
//! left-to-right pass; the token following an option is its value. There is no
//! prefix matching and no `--opt=value` form.
//!
//! Commands that accept a fixed set of options implement [`ArgumentSet`],
//! which validates the whole set at once and either yields a fully populated
//! value or every violation that was found.

use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// A single violation of an option's cardinality contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Parameter {option} was not found")]
    Missing { option: String },

    #[error("Parameter {option} was found more than once")]
    Duplicate { option: String },

    /// The option was the last token, so it has no value.
    #[error("Parameter {option} was malformed")]
    Malformed { option: String },
}

impl ArgumentError {
    /// The option literal this violation is about.
    pub fn option(&self) -> &str {
        match self {
            Self::Missing { option } | Self::Duplicate { option } | Self::Malformed { option } => {
                option
            }
        }
    }

    fn missing(option: &str) -> Self {
        Self::Missing {
            option: option.to_owned(),
        }
    }

    fn duplicate(option: &str) -> Self {
        Self::Duplicate {
            option: option.to_owned(),
        }
    }

    fn malformed(option: &str) -> Self {
        Self::Malformed {
            option: option.to_owned(),
        }
    }
}

/// Ordered, immutable sequence of raw command-line tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentVector(Vec<String>);

impl ArgumentVector {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    /// Capture the current process arguments, without the program name.
    ///
    /// Arguments that are not valid UTF-8 are converted lossily: each invalid
    /// sequence becomes `U+FFFD`, so such a token never matches an option literal.
    pub fn from_env() -> Self {
        Self(
            std::env::args_os()
                .skip(1)
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Deref for ArgumentVector {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for ArgumentVector {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl From<&[&str]> for ArgumentVector {
    fn from(tokens: &[&str]) -> Self {
        Self(tokens.iter().map(|t| (*t).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ArgumentVector {
    fn from(tokens: [&str; N]) -> Self {
        Self(tokens.iter().map(|t| (*t).to_owned()).collect())
    }
}

impl FromIterator<String> for ArgumentVector {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Returns true if `option` appears anywhere in `args`, any number of times.
pub fn parse_flag<S: AsRef<str>>(args: &[S], option: &str) -> bool {
    args.iter().any(|arg| arg.as_ref() == option)
}

/// Parse a parameter that must appear exactly once.
pub fn parse_required_parameter<S: AsRef<str>>(
    args: &[S],
    option: &str,
) -> Result<String, ArgumentError> {
    scan_single(args, option)?.ok_or_else(|| ArgumentError::missing(option))
}

/// Parse a parameter that may appear zero times or once.
pub fn parse_optional_parameter<S: AsRef<str>>(
    args: &[S],
    option: &str,
) -> Result<Option<String>, ArgumentError> {
    scan_single(args, option)
}

/// Parse a parameter that must appear at least once, collecting every value
/// in order of appearance.
pub fn parse_required_parameter_list<S: AsRef<str>>(
    args: &[S],
    option: &str,
) -> Result<Vec<String>, ArgumentError> {
    let values = scan_all(args, option)?;
    if values.is_empty() {
        return Err(ArgumentError::missing(option));
    }
    Ok(values)
}

/// Parse a parameter that may appear any number of times.
pub fn parse_optional_parameter_list<S: AsRef<str>>(
    args: &[S],
    option: &str,
) -> Result<Vec<String>, ArgumentError> {
    scan_all(args, option)
}

// A second occurrence fails at that occurrence, before anything later in the
// vector is looked at. The trailing-value check comes first.
fn scan_single<S: AsRef<str>>(args: &[S], option: &str) -> Result<Option<String>, ArgumentError> {
    let mut result = None;
    let mut tokens = args.iter().map(AsRef::as_ref);
    while let Some(token) = tokens.next() {
        if token != option {
            continue;
        }
        let value = tokens.next().ok_or_else(|| ArgumentError::malformed(option))?;
        if result.is_some() {
            return Err(ArgumentError::duplicate(option));
        }
        result = Some(value.to_owned());
    }
    Ok(result)
}

fn scan_all<S: AsRef<str>>(args: &[S], option: &str) -> Result<Vec<String>, ArgumentError> {
    let mut values = Vec::new();
    let mut tokens = args.iter().map(AsRef::as_ref);
    while let Some(token) = tokens.next() {
        if token == option {
            let value = tokens.next().ok_or_else(|| ArgumentError::malformed(option))?;
            values.push(value.to_owned());
        }
    }
    Ok(values)
}

/// Every violation found while validating an [`ArgumentSet`], in detection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentErrors(Vec<ArgumentError>);

impl ArgumentErrors {
    pub fn violations(&self) -> &[ArgumentError] {
        &self.0
    }

}

impl fmt::Display for ArgumentErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ArgumentErrors {}

/// Reads options out of an argument vector on behalf of an [`ArgumentSet`],
/// recording violations instead of stopping at the first one.
///
/// Methods return a default value (empty string, `None`, empty list) when the
/// option is in violation. Those placeholders never escape: [`Validator::finish`]
/// discards the built value if anything was recorded.
pub struct Validator<'a> {
    args: &'a ArgumentVector,
    violations: Vec<ArgumentError>,
}

impl<'a> Validator<'a> {
    pub fn new(args: &'a ArgumentVector) -> Self {
        Self {
            args,
            violations: Vec::new(),
        }
    }

    /// The raw vector being validated.
    pub fn args(&self) -> &'a ArgumentVector {
        self.args
    }

    pub fn flag(&mut self, option: &str) -> bool {
        parse_flag(self.args.as_slice(), option)
    }

    pub fn required(&mut self, option: &str) -> String {
        let result = parse_required_parameter(self.args.as_slice(), option);
        self.record(result)
    }

    pub fn optional(&mut self, option: &str) -> Option<String> {
        let result = parse_optional_parameter(self.args.as_slice(), option);
        self.record(result)
    }

    pub fn required_list(&mut self, option: &str) -> Vec<String> {
        let result = parse_required_parameter_list(self.args.as_slice(), option);
        self.record(result)
    }

    pub fn optional_list(&mut self, option: &str) -> Vec<String> {
        let result = parse_optional_parameter_list(self.args.as_slice(), option);
        self.record(result)
    }

    /// Hand back `value` only if no violation was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, ArgumentErrors> {
        if self.violations.is_empty() {
            Ok(value)
        } else {
            Err(ArgumentErrors(self.violations))
        }
    }

    fn record<T: Default>(&mut self, result: Result<T, ArgumentError>) -> T {
        result.unwrap_or_else(|err| {
            self.violations.push(err);
            T::default()
        })
    }
}

/// A command's complete set of options, validated in one pass.
///
/// ```
/// use buildglue_core::{ArgumentSet, ArgumentVector, Validator};
///
/// struct Publish {
///     target: String,
///     dry_run: bool,
/// }
///
/// impl ArgumentSet for Publish {
///     fn validate(v: &mut Validator<'_>) -> Self {
///         Publish {
///             target: v.required("--target"),
///             dry_run: v.flag("--dry-run"),
///         }
///     }
/// }
///
/// let publish = Publish::from_args(["--target", "staging"]).unwrap();
/// assert_eq!(publish.target, "staging");
/// assert!(!publish.dry_run);
/// assert!(Publish::from_args(ArgumentVector::default()).is_err());
/// ```
pub trait ArgumentSet: Sized {
    /// Read every option this set recognizes through `v`.
    fn validate(v: &mut Validator<'_>) -> Self;

    fn from_args(args: impl Into<ArgumentVector>) -> Result<Self, ArgumentErrors> {
        let args = args.into();
        let mut validator = Validator::new(&args);
        let parsed = Self::validate(&mut validator);
        validator.finish(parsed)
    }
}
