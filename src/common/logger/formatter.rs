use core::fmt as core_fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields},
    },
    registry::LookupSpan,
};

fn level_color(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::ERROR => "\x1b[31m", // Red
        tracing::Level::WARN => "\x1b[33m",  // Yellow
        tracing::Level::INFO => "\x1b[32m",  // Green
        tracing::Level::DEBUG => "\x1b[34m", // Blue
        tracing::Level::TRACE => "\x1b[35m", // Magenta
    }
}

pub struct EventFormatter {
    use_ansi: bool,
}

impl EventFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }
}

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let reset = if self.use_ansi { "\x1b[0m" } else { "" };
        let bold = if self.use_ansi { "\x1b[1m" } else { "" };
        let dim = if self.use_ansi { "\x1b[2m" } else { "" };

        // Timestamp
        let format = time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        );
        let now =
            time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        let timestamp = now
            .format(&format)
            .unwrap_or_else(|_| "Unknown Time".to_string());

        write!(writer, "{}[{}]{} ", dim, timestamp, reset)?;

        // Level
        let metadata = event.metadata();
        let level = *metadata.level();
        let level_str = format!("{: <5}", level.to_string());

        if self.use_ansi {
            write!(writer, "{}{}{}{} ", level_color(level), bold, level_str, reset)?;
        } else {
            write!(writer, "{} ", level_str)?;
        }

        // Target and line
        let line = metadata
            .line()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "??".to_string());
        write!(writer, "{}{}: {}{} ", dim, metadata.target(), line, reset)?;

        // Message
        write!(writer, "> ")?;
        ctx.format_fields(writer.by_ref(), event)?;

        // Final reset to prevent any leakage into the terminal shell
        write!(writer, "{}", reset)?;

        writeln!(writer)
    }
}
