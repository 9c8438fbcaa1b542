//! Format templates for block text
//!
//! A template is literal text with `{...}` placeholders:
//!
//! ```text
//! { name [ : [0] min_width ] [ ^ max_width ] [ ; [ ] [_] prefix ] [ * [_] unit ] [ # clamp_max ] }
//! ```
//!
//! - `:03` pads to three chars with zeros (`:3` pads with spaces)
//! - `^6` keeps at most six chars (the head of the text)
//! - `;K` scales numbers to engineering notation with at least the `K`
//!   prefix; `; ` puts a space before the prefix, `;_` hides the prefix
//! - `*W` appends a unit, `*_W` declares it without printing it
//! - `#100` clamps numbers to at most 100
//!
//! A brace group that does not match the grammar is kept as literal text,
//! and so is a group written with a doubled opening brace (`{{name}}`).
//!
//! Expansion never fails. A missing value expands to nothing; a text value
//! given to a placeholder with numeric modifiers is printed as-is.

use crate::text::{pad_chars_start, truncate_chars_slice};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\{(\w+)",
        r"(?::(0)?(\d+))?",
        r"(?:\^(\d+))?",
        r"(?:;( )?(_)?([num1KMGT]))?",
        r"(?:\*(_)?([\w%]+))?",
        r"(?:#(\d+(?:\.\d+)?))?",
        r"\}",
    ))
    .expect("placeholder regex is valid")
});

/// Digits printed after the decimal point for floats and scaled numbers.
pub const FLOAT_PRECISION: usize = 1;

/// A value available to template expansion
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Named values a template is expanded against
#[derive(Debug, Clone, Default)]
pub struct NamedArgs {
    values: HashMap<String, Value>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for NamedArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

/// SI prefix used for engineering notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prefix {
    Nano,
    Micro,
    Milli,
    One,
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl Prefix {
    const MAX_EXPONENT: i32 = 4;

    /// Power of 1000 this prefix stands for.
    pub fn exponent(self) -> i32 {
        match self {
            Self::Nano => -3,
            Self::Micro => -2,
            Self::Milli => -1,
            Self::One => 0,
            Self::Kilo => 1,
            Self::Mega => 2,
            Self::Giga => 3,
            Self::Tera => 4,
        }
    }

    fn from_exponent(exponent: i32) -> Self {
        match exponent {
            i32::MIN..=-3 => Self::Nano,
            -2 => Self::Micro,
            -1 => Self::Milli,
            0 => Self::One,
            1 => Self::Kilo,
            2 => Self::Mega,
            3 => Self::Giga,
            _ => Self::Tera,
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "n" => Some(Self::Nano),
            "u" => Some(Self::Micro),
            "m" => Some(Self::Milli),
            "1" => Some(Self::One),
            "K" => Some(Self::Kilo),
            "M" => Some(Self::Mega),
            "G" => Some(Self::Giga),
            "T" => Some(Self::Tera),
            _ => None,
        }
    }

    /// Symbol printed after the number. Empty for [`Prefix::One`].
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Nano => "n",
            Self::Micro => "u",
            Self::Milli => "m",
            Self::One => "",
            Self::Kilo => "K",
            Self::Mega => "M",
            Self::Giga => "G",
            Self::Tera => "T",
        }
    }
}

/// Engineering-notation modifier of a placeholder (`;[ ][_]prefix`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixSpec {
    /// Smallest prefix the value may be scaled to
    pub min: Prefix,
    /// `_`: scale, but do not print the prefix symbol
    pub hidden: bool,
    /// ` `: put a space between the number and the prefix
    pub space: bool,
}

/// Unit modifier of a placeholder (`*[_]unit`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub symbol: String,
    pub hidden: bool,
}

/// A parsed `{...}` field reference
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub name: String,
    pub min_width: Option<usize>,
    pub zero_pad: bool,
    pub max_width: Option<usize>,
    pub prefix: Option<PrefixSpec>,
    pub unit: Option<UnitSpec>,
    pub clamp_max: Option<f64>,
}

impl Placeholder {
    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        let name = caps.get(1)?.as_str().to_string();
        let prefix = match caps.get(7) {
            Some(symbol) => Some(PrefixSpec {
                min: Prefix::from_symbol(symbol.as_str())?,
                hidden: caps.get(6).is_some(),
                space: caps.get(5).is_some(),
            }),
            None => None,
        };
        Some(Self {
            name,
            min_width: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            zero_pad: caps.get(2).is_some(),
            max_width: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            prefix,
            unit: caps.get(9).map(|m| UnitSpec {
                symbol: m.as_str().to_string(),
                hidden: caps.get(8).is_some(),
            }),
            clamp_max: caps.get(10).and_then(|m| m.as_str().parse().ok()),
        })
    }

    /// Format one value according to this placeholder's modifiers.
    pub fn format(&self, value: &Value) -> String {
        let mut text = match value {
            Value::Text(text) => text.clone(),
            Value::Int(int) => self.format_number(Number::Int(*int)),
            Value::Float(float) => self.format_number(Number::Float(*float)),
        };
        if let Some(unit) = &self.unit {
            if !unit.hidden {
                text.push_str(&unit.symbol);
            }
        }
        if let Some(min_width) = self.min_width {
            let numeric = !matches!(value, Value::Text(_));
            text = match text.strip_prefix('-') {
                // zeros go between the sign and the digits
                Some(magnitude) if numeric && self.zero_pad => {
                    let magnitude = pad_chars_start(magnitude, min_width.saturating_sub(1), '0');
                    format!("-{magnitude}")
                }
                _ => pad_chars_start(&text, min_width, if self.zero_pad { '0' } else { ' ' }),
            };
        }
        if let Some(max_width) = self.max_width {
            text = truncate_chars_slice(&text, max_width).to_string();
        }
        text
    }

    fn format_number(&self, number: Number) -> String {
        let number = match self.clamp_max {
            Some(max) => number.clamp_max(max),
            None => number,
        };
        let Some(prefix) = self.prefix else {
            return number.to_string();
        };
        let value = number.as_f64();
        let exponent = scale_exponent(value, prefix.min);
        let mut text = if exponent == 0 {
            number.to_string()
        } else {
            let scaled = value / 1000f64.powi(exponent);
            format!("{scaled:.FLOAT_PRECISION$}")
        };
        if prefix.space {
            text.push(' ');
        }
        if !prefix.hidden {
            text.push_str(Prefix::from_exponent(exponent).symbol());
        }
        text
    }
}

/// Largest power of 1000, not below `min`, that keeps the scaled magnitude >= 1.
fn scale_exponent(value: f64, min: Prefix) -> i32 {
    let min = min.exponent();
    if value == 0.0 || !value.is_finite() {
        return min.max(0);
    }
    let mut exponent = min;
    while exponent < Prefix::MAX_EXPONENT && value.abs() >= 1000f64.powi(exponent + 1) {
        exponent += 1;
    }
    exponent
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(int) => int as f64,
            Self::Float(float) => float,
        }
    }

    fn clamp_max(self, max: f64) -> Self {
        if self.as_f64() <= max {
            return self;
        }
        match self {
            Self::Int(_) if max.fract() == 0.0 => Self::Int(max as i64),
            _ => Self::Float(max),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float:.FLOAT_PRECISION$}"),
        }
    }
}

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed format template. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTemplate {
    source: String,
    parts: Vec<Part>,
}

impl FormatTemplate {
    /// Parse a template. Never fails: anything that is not a well-formed
    /// placeholder becomes literal text.
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER_RE.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            // `{{name}}` is an escaped brace group, not a placeholder
            if source[..whole.start()].ends_with('{') {
                continue;
            }
            let Some(placeholder) = Placeholder::from_captures(&caps) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Part::Literal(source[last..whole.start()].to_string()));
            }
            parts.push(Part::Placeholder(placeholder));
            last = whole.end();
        }
        if last < source.len() {
            parts.push(Part::Literal(source[last..].to_string()));
        }
        Self {
            source: source.to_string(),
            parts,
        }
    }

    /// Expand against `args`. Pure; never fails.
    pub fn expand(&self, args: &NamedArgs) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(placeholder) => {
                    if let Some(value) = args.get(&placeholder.name) {
                        out.push_str(&placeholder.format(value));
                    }
                }
            }
        }
        out
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.parts.iter().filter_map(|part| match part {
            Part::Placeholder(placeholder) => Some(placeholder),
            Part::Literal(_) => None,
        })
    }

    /// The text the template was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for FormatTemplate {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for FormatTemplate {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for FormatTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for FormatTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|source| Self::parse(&source))
    }
}
