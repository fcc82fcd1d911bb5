use tracing::Level;
use tracing::Metadata;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::registry::LookupSpan;

const CRATE_TARGET: &str = "mustakshif";

/// Passes events from this crate whose level is one of `levels`.
#[derive(Debug, Clone, Copy)]
pub struct CrateLevelFilter {
    levels: &'static [Level],
}

impl CrateLevelFilter {
    pub const DEBUG_ONLY: Self = Self {
        levels: &[Level::DEBUG],
    };
    pub const ERROR_ONLY: Self = Self {
        levels: &[Level::ERROR],
    };
    pub const ERROR_WARN: Self = Self {
        levels: &[Level::ERROR, Level::WARN],
    };
    pub const INFO_AND_ABOVE: Self = Self {
        levels: &[Level::ERROR, Level::WARN, Level::INFO],
    };

    pub fn accepts(
        &self,
        level: &Level,
        target: &str,
    ) -> bool {
        target.starts_with(CRATE_TARGET) && self.levels.contains(level)
    }
}

impl<S> Filter<S> for CrateLevelFilter
where
    S: tracing::Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn enabled(
        &self,
        meta: &Metadata<'_>,
        _ctx: &Context<'_, S>,
    ) -> bool {
        self.accepts(meta.level(), meta.target())
    }
}
