//! Typed values and error-tolerant coercion.
//!
//! Raw scalars arriving from a loader are coerced into [`TypedValue`]s by
//! [`coerce`]. Coercion never fails: anything that cannot be represented in
//! the requested type becomes [`TypedValue::Missing`], which later stages
//! treat as ordinary data.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "date", alias = "datetime")]
    Timestamp,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::Text => "text",
            TypeTag::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(TypeTag::Integer),
            "float" => Ok(TypeTag::Float),
            "boolean" | "bool" => Ok(TypeTag::Boolean),
            "text" | "string" => Ok(TypeTag::Text),
            "timestamp" | "date" | "datetime" => Ok(TypeTag::Timestamp),
            other => Err(format!("Unknown type '{other}'")),
        }
    }
}

/// A scalar as delivered by a loader, before any typing decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl From<&str> for RawScalar {
    fn from(value: &str) -> Self {
        RawScalar::Text(value.to_string())
    }
}

impl From<i64> for RawScalar {
    fn from(value: i64) -> Self {
        RawScalar::Integer(value)
    }
}

impl From<f64> for RawScalar {
    fn from(value: f64) -> Self {
        RawScalar::Float(value)
    }
}

impl From<bool> for RawScalar {
    fn from(value: bool) -> Self {
        RawScalar::Boolean(value)
    }
}

impl<T: Into<RawScalar>> From<Option<T>> for RawScalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawScalar::Null)
    }
}

impl fmt::Display for RawScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawScalar::Boolean(b) => write!(f, "{b}"),
            RawScalar::Integer(i) => write!(f, "{i}"),
            RawScalar::Float(v) => write!(f, "{v}"),
            RawScalar::Text(s) => f.write_str(s),
            RawScalar::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Timestamp(NaiveDateTime),
    Missing,
}

impl TypedValue {
    /// Lifts a raw scalar into the dataset without choosing a type for it.
    /// Nulls and NaN floats become `Missing`.
    pub fn from_raw(raw: RawScalar) -> Self {
        match raw {
            RawScalar::Boolean(b) => TypedValue::Boolean(b),
            RawScalar::Integer(i) => TypedValue::Integer(i),
            RawScalar::Float(v) if v.is_nan() => TypedValue::Missing,
            RawScalar::Float(v) => TypedValue::Float(v),
            RawScalar::Text(s) => TypedValue::Text(s),
            RawScalar::Null => TypedValue::Missing,
        }
    }

    pub fn to_raw(&self) -> RawScalar {
        match self {
            TypedValue::Integer(i) => RawScalar::Integer(*i),
            TypedValue::Float(v) => RawScalar::Float(*v),
            TypedValue::Boolean(b) => RawScalar::Boolean(*b),
            TypedValue::Text(s) => RawScalar::Text(s.clone()),
            TypedValue::Timestamp(_) => RawScalar::Text(self.as_display()),
            TypedValue::Missing => RawScalar::Null,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, TypedValue::Missing)
    }

    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            TypedValue::Integer(_) => Some(TypeTag::Integer),
            TypedValue::Float(_) => Some(TypeTag::Float),
            TypedValue::Boolean(_) => Some(TypeTag::Boolean),
            TypedValue::Text(_) => Some(TypeTag::Text),
            TypedValue::Timestamp(_) => Some(TypeTag::Timestamp),
            TypedValue::Missing => None,
        }
    }

    /// Numeric view used by range filters and summaries.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Integer(i) => Some(*i as f64),
            TypedValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// True for `Missing` and for text that is empty once trimmed.
    pub fn is_blank(&self) -> bool {
        match self {
            TypedValue::Missing => true,
            TypedValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            TypedValue::Integer(i) => i.to_string(),
            TypedValue::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{v:.0}")
                } else {
                    v.to_string()
                }
            }
            TypedValue::Boolean(b) => b.to_string(),
            TypedValue::Text(s) => s.clone(),
            TypedValue::Timestamp(ts) => {
                if ts.time().num_seconds_from_midnight() == 0 && ts.time().nanosecond() == 0 {
                    ts.format("%Y-%m-%d").to_string()
                } else {
                    ts.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            TypedValue::Missing => String::new(),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedValue::Integer(a), TypedValue::Integer(b)) => a == b,
            (TypedValue::Float(a), TypedValue::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (TypedValue::Boolean(a), TypedValue::Boolean(b)) => a == b,
            (TypedValue::Text(a), TypedValue::Text(b)) => a == b,
            (TypedValue::Timestamp(a), TypedValue::Timestamp(b)) => a == b,
            (TypedValue::Missing, TypedValue::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for TypedValue {}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TypedValue::Integer(i) => i.hash(state),
            TypedValue::Float(v) => canonical_bits(*v).hash(state),
            TypedValue::Boolean(b) => b.hash(state),
            TypedValue::Text(s) => s.hash(state),
            TypedValue::Timestamp(ts) => ts.hash(state),
            TypedValue::Missing => {}
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Case-insensitive token table used for boolean coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct BooleanVocabulary {
    tokens: BTreeMap<String, bool>,
}

impl BooleanVocabulary {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let tokens = entries
            .into_iter()
            .map(|(token, value)| (token.as_ref().trim().to_lowercase(), value))
            .collect();
        Self { tokens }
    }

    pub fn lookup(&self, token: &str) -> Option<bool> {
        self.tokens.get(&token.trim().to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for BooleanVocabulary {
    fn default() -> Self {
        Self::new([("yes", true), ("no", false)])
    }
}

impl From<BTreeMap<String, bool>> for BooleanVocabulary {
    fn from(tokens: BTreeMap<String, bool>) -> Self {
        Self::new(tokens)
    }
}

impl From<BooleanVocabulary> for BTreeMap<String, bool> {
    fn from(vocabulary: BooleanVocabulary) -> Self {
        vocabulary.tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionOptions {
    #[serde(default)]
    pub booleans: BooleanVocabulary,
    #[serde(default = "default_timestamp_formats")]
    pub timestamp_formats: Vec<String>,
}

pub fn default_timestamp_formats() -> Vec<String> {
    DEFAULT_TIMESTAMP_FORMATS
        .iter()
        .map(|fmt| fmt.to_string())
        .collect()
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            booleans: BooleanVocabulary::default(),
            timestamp_formats: default_timestamp_formats(),
        }
    }
}

pub fn coerce(raw: &RawScalar, target: TypeTag, options: &CoercionOptions) -> TypedValue {
    let coerced = match target {
        TypeTag::Integer => coerce_integer(raw),
        TypeTag::Float => coerce_float(raw),
        TypeTag::Boolean => coerce_boolean(raw, &options.booleans),
        TypeTag::Text => coerce_text(raw),
        TypeTag::Timestamp => coerce_timestamp(raw, &options.timestamp_formats),
    };
    coerced.unwrap_or(TypedValue::Missing)
}

pub fn coerce_default(raw: &RawScalar, target: TypeTag) -> TypedValue {
    coerce(raw, target, &CoercionOptions::default())
}

/// Re-types a value already held by a dataset. Values carrying the target
/// tag are kept as they are.
pub fn recast(value: &TypedValue, target: TypeTag, options: &CoercionOptions) -> TypedValue {
    if value.type_tag() == Some(target) {
        return value.clone();
    }
    coerce(&value.to_raw(), target, options)
}

fn integral_f64(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

fn coerce_integer(raw: &RawScalar) -> Option<TypedValue> {
    let parsed = match raw {
        RawScalar::Integer(i) => Some(*i),
        RawScalar::Float(v) => integral_f64(*v),
        RawScalar::Boolean(b) => Some(i64::from(*b)),
        RawScalar::Text(s) => parse_integer_text(s.trim()),
        RawScalar::Null => None,
    };
    parsed.map(TypedValue::Integer)
}

/// Largest magnitude below which every integer has an exact `f64` form.
const EXACT_F64_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn parse_integer_text(text: &str) -> Option<i64> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    if let Some((whole, fraction)) = text.split_once('.') {
        if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') {
            if let Ok(value) = whole.parse::<i64>() {
                return Some(value);
            }
        }
    }
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() < EXACT_F64_INTEGER_LIMIT)
        .and_then(integral_f64)
}

fn coerce_float(raw: &RawScalar) -> Option<TypedValue> {
    let parsed = match raw {
        RawScalar::Integer(i) => Some(*i as f64),
        RawScalar::Float(v) => Some(*v),
        RawScalar::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawScalar::Text(s) => s.trim().parse::<f64>().ok(),
        RawScalar::Null => None,
    };
    parsed.filter(|v| v.is_finite()).map(TypedValue::Float)
}

fn coerce_boolean(raw: &RawScalar, vocabulary: &BooleanVocabulary) -> Option<TypedValue> {
    let parsed = match raw {
        RawScalar::Boolean(b) => Some(*b),
        RawScalar::Null => None,
        RawScalar::Text(s) => vocabulary.lookup(s),
        other => vocabulary.lookup(&other.to_string()),
    };
    parsed.map(TypedValue::Boolean)
}

fn coerce_text(raw: &RawScalar) -> Option<TypedValue> {
    match raw {
        RawScalar::Null => None,
        RawScalar::Text(s) => Some(TypedValue::Text(s.clone())),
        RawScalar::Float(v) => Some(TypedValue::Text(TypedValue::Float(*v).as_display())),
        other => Some(TypedValue::Text(other.to_string())),
    }
}

fn coerce_timestamp(raw: &RawScalar, formats: &[String]) -> Option<TypedValue> {
    match raw {
        RawScalar::Text(s) => parse_timestamp(s.trim(), formats).map(TypedValue::Timestamp),
        _ => None,
    }
}

/// Tries each format in order, first as a date-time and then as a bare
/// date resolved to midnight.
pub fn parse_timestamp<S: AsRef<str>>(value: &str, formats: &[S]) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| {
        let fmt = fmt.as_ref();
        NaiveDateTime::parse_from_str(value, fmt).ok().or_else(|| {
            NaiveDate::parse_from_str(value, fmt)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
    })
}
