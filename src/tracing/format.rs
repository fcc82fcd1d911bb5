use tracing::Event;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::registry::LookupSpan;

/// `LEVEL timestamp::engine::file::line::message`, one event per line.
#[derive(Debug, Clone)]
pub struct MustakshifFormat {
    pub engine_name: String,
}

impl MustakshifFormat {
    pub fn new(engine_name: &str) -> Self {
        Self {
            engine_name: engine_name.to_string(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for MustakshifFormat
where
    S: tracing::Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        // events without a source location come from dependencies' log bridges
        let Some(file) = metadata.file() else {
            if !cfg!(feature = "deep-trace") {
                return Ok(());
            }
            return self.write_event(ctx, writer.by_ref(), event, "unknown", 0);
        };

        self.write_event(ctx, writer.by_ref(), event, file, metadata.line().unwrap_or(0))
    }
}

impl MustakshifFormat {
    fn write_event<S, N>(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
        file: &str,
        line: u32,
    ) -> std::fmt::Result
    where
        S: tracing::Subscriber + for<'lookup> LookupSpan<'lookup>,
        N: for<'writer> FormatFields<'writer> + 'static,
    {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");

        write!(
            writer,
            "{} {}::{}::{}::{}::",
            event.metadata().level(),
            timestamp,
            self.engine_name,
            file,
            line
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
