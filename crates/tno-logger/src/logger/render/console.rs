use std::fmt;

use colored::Colorize;
use time::UtcOffset;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

use crate::logger::{
    attr::{AttrValue, LEVEL_KEY, MESSAGE_KEY, ReplaceAttr, SOURCE_KEY, TIME_KEY},
    record::Record,
};

/// `<time> <LVL> <source> <msg> key=value ...`
pub struct ConsoleFormat {
    offset: UtcOffset,
    replace: ReplaceAttr,
}

impl ConsoleFormat {
    pub fn new(offset: UtcOffset, replace: ReplaceAttr) -> Self {
        Self { offset, replace }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
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
        let ansi = writer.has_ansi_escapes();
        let record = Record::capture(event, self.offset);

        let mut parts = Vec::with_capacity(4 + record.fields.len());
        for attr in record.into_attrs() {
            let attr = (self.replace)(&[], attr);
            let part = match (attr.key, &attr.value) {
                (MESSAGE_KEY, AttrValue::Str(msg)) if msg.is_empty() => continue,
                (LEVEL_KEY, AttrValue::Level(level)) => paint_level(*level, ansi),
                (TIME_KEY | SOURCE_KEY, value) => faint(value.to_string(), ansi),
                (MESSAGE_KEY, value) => value.to_string(),
                (key, value) => field(key, value, ansi),
            };
            parts.push(part);
        }

        writeln!(writer, "{}", parts.join(" "))
    }
}

fn faint(text: String, ansi: bool) -> String {
    if ansi {
        text.dimmed().to_string()
    } else {
        text
    }
}

fn paint_level(level: Level, ansi: bool) -> String {
    let abbr = match level {
        Level::TRACE => "TRC",
        Level::DEBUG => "DBG",
        Level::INFO => "INF",
        Level::WARN => "WRN",
        Level::ERROR => "ERR",
    };
    if !ansi {
        return abbr.to_string();
    }
    match level {
        Level::TRACE => abbr.dimmed(),
        Level::DEBUG => abbr.bright_blue(),
        Level::INFO => abbr.green(),
        Level::WARN => abbr.yellow(),
        Level::ERROR => abbr.red(),
    }
    .to_string()
}

fn field(key: &str, value: &AttrValue, ansi: bool) -> String {
    let value = match value {
        AttrValue::Str(s) => quote_if_needed(s),
        other => other.to_string(),
    };
    format!("{}{value}", faint(format!("{key}="), ansi))
}

fn quote_if_needed(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '=' || c == '"');
    if needs_quotes {
        format!("{s:?}")
    } else {
        s.to_string()
    }
}
