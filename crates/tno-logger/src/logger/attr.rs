use std::{fmt, path::Path};

use serde::{Serialize, Serializer, ser::Error as _};
use time::{
    OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use tracing::{Level, Metadata};

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const SOURCE_KEY: &str = "source";
pub const MESSAGE_KEY: &str = "msg";

const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Rewrites one attribute. The first argument is the enclosing group path.
pub type ReplaceAttr = fn(&[&str], Attr) -> Attr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// Module path of the callsite, `::` written as `.`.
    pub fn from_metadata(meta: &Metadata<'_>) -> Self {
        let function = meta
            .module_path()
            .unwrap_or_else(|| meta.target())
            .replace("::", ".");
        Self {
            function,
            file: meta.file().unwrap_or("unknown").to_string(),
            line: meta.line().unwrap_or(0),
        }
    }

    /// First segment of the function identifier, or `unknown` when it has only one.
    pub fn package(&self) -> &str {
        let mut parts = self.function.split('.');
        match (parts.next(), parts.next()) {
            (Some(first), Some(_)) => first,
            _ => "unknown",
        }
    }

    pub fn basename(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(".")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.package(), self.basename(), self.line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Time(OffsetDateTime),
    Level(Level),
    Source(SourceLocation),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(v) => f.write_str(v),
            AttrValue::I64(v) => write!(f, "{v}"),
            AttrValue::U64(v) => write!(f, "{v}"),
            AttrValue::F64(v) => write!(f, "{v}"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Time(v) => match v.format(&Rfc3339) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{v}"),
            },
            AttrValue::Level(v) => f.write_str(v.as_str()),
            AttrValue::Source(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AttrValue::Str(v) => serializer.serialize_str(v),
            AttrValue::I64(v) => serializer.serialize_i64(*v),
            AttrValue::U64(v) => serializer.serialize_u64(*v),
            AttrValue::F64(v) => serializer.serialize_f64(*v),
            AttrValue::Bool(v) => serializer.serialize_bool(*v),
            AttrValue::Time(v) => {
                let s = v.format(&Rfc3339).map_err(S::Error::custom)?;
                serializer.serialize_str(&s)
            }
            AttrValue::Level(v) => serializer.serialize_str(v.as_str()),
            AttrValue::Source(v) => v.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: &'static str,
    pub value: AttrValue,
}

impl Attr {
    pub fn new(key: &'static str, value: AttrValue) -> Self {
        Self { key, value }
    }
}

pub fn replace_attr(_groups: &[&str], mut attr: Attr) -> Attr {
    let replaced = match (attr.key, &attr.value) {
        (TIME_KEY, AttrValue::Time(t)) => Some(AttrValue::Str(format_time(t))),
        (SOURCE_KEY, AttrValue::Source(src)) => Some(AttrValue::Str(src.to_string())),
        _ => None,
    };
    if let Some(value) = replaced {
        attr.value = value;
    }
    attr
}

fn format_time(t: &OffsetDateTime) -> String {
    t.format(TIME_FORMAT).unwrap_or_else(|_| t.to_string())
}
