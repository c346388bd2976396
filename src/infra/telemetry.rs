use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_DISPATCH_MS, METRIC_DISPATCH_TOTAL, METRIC_EXECUTOR_REJECTED_TOTAL,
    METRIC_INVALIDATIONS_TOTAL, METRIC_REVALIDATE_MS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_INVALIDATIONS_TOTAL,
            Unit::Count,
            "Tag and path invalidations attempted, by kind and result."
        );
        describe_counter!(
            METRIC_DISPATCH_TOTAL,
            Unit::Count,
            "Revalidation dispatches completed, by result."
        );
        describe_histogram!(
            METRIC_DISPATCH_MS,
            Unit::Milliseconds,
            "Round-trip latency of one revalidation dispatch in milliseconds."
        );
        describe_histogram!(
            METRIC_REVALIDATE_MS,
            Unit::Milliseconds,
            "Executor latency for an accepted revalidation request in milliseconds."
        );
        describe_counter!(
            METRIC_EXECUTOR_REJECTED_TOTAL,
            Unit::Count,
            "Revalidation requests rejected before any invalidation, by reason."
        );
    });
}
