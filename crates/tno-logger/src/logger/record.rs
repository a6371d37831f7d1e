use std::fmt;

use time::{OffsetDateTime, UtcOffset};
use tracing::{
    Event, Level,
    field::{Field, Visit},
};

use crate::logger::attr::{
    Attr, AttrValue, LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, SourceLocation, TIME_KEY,
};

/// One captured event, before any attribute rewriting.
pub(crate) struct Record {
    pub time: OffsetDateTime,
    pub level: Level,
    pub source: SourceLocation,
    pub message: String,
    pub fields: Vec<Attr>,
}

impl Record {
    pub fn capture(event: &Event<'_>, offset: UtcOffset) -> Self {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        Self {
            time: OffsetDateTime::now_utc().to_offset(offset),
            level: *meta.level(),
            source: SourceLocation::from_metadata(meta),
            message: visitor.message,
            fields: visitor.fields,
        }
    }

    pub fn into_attrs(self) -> Vec<Attr> {
        let mut attrs = Vec::with_capacity(4 + self.fields.len());
        attrs.push(Attr::new(TIME_KEY, AttrValue::Time(self.time)));
        attrs.push(Attr::new(LEVEL_KEY, AttrValue::Level(self.level)));
        attrs.push(Attr::new(SOURCE_KEY, AttrValue::Source(self.source)));
        attrs.push(Attr::new(MESSAGE_KEY, AttrValue::Str(self.message)));
        attrs.extend(self.fields);
        attrs
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<Attr>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: AttrValue) {
        self.fields.push(Attr::new(field.name(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, AttrValue::F64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, AttrValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, AttrValue::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, AttrValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push(field, AttrValue::Str(value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, AttrValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push(field, AttrValue::Str(format!("{value:?}")));
        }
    }
}
