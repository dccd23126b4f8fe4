use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    /// One JSON object per event, fields flattened to the top level.
    Json,
}

/// Installs the process-wide subscriber. Fails if one is already set.
pub fn init(format: LogFormat, level: Level) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}
