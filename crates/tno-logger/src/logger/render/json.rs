use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeMap};
use time::UtcOffset;
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

use crate::logger::{
    attr::{Attr, ReplaceAttr},
    record::Record,
};

/// One JSON object per line. Caller fields named like a built-in key are
/// written as a second entry with that key.
pub struct JsonFormat {
    offset: UtcOffset,
    replace: ReplaceAttr,
}

impl JsonFormat {
    pub fn new(offset: UtcOffset, replace: ReplaceAttr) -> Self {
        Self { offset, replace }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let attrs: Vec<Attr> = Record::capture(event, self.offset)
            .into_attrs()
            .into_iter()
            .map(|attr| (self.replace)(&[], attr))
            .collect();

        let line = serde_json::to_string(&JsonLine(&attrs)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

struct JsonLine<'a>(&'a [Attr]);

impl Serialize for JsonLine<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for attr in self.0 {
            map.serialize_entry(attr.key, &attr.value)?;
        }
        map.end()
    }
}
