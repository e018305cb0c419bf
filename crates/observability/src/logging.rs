//! Logging configuration.

use clap::Args;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct LogArgs {
    /// Silence all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Extra filter directives, e.g. `tessera_retrieval=trace`
    #[arg(long = "log.filter", value_name = "DIRECTIVE", global = true)]
    pub filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long = "log.json", global = true)]
    pub json: bool,
}

impl LogArgs {
    /// Build the filter for these arguments.
    ///
    /// Precedence:
    /// 1. `--quiet` shows only errors
    /// 2. otherwise `RUST_LOG`, falling back to a level picked by `-v`
    /// 3. `--log.filter` directives are added on top
    pub fn env_filter(&self) -> EnvFilter {
        if self.quiet {
            return EnvFilter::new("error");
        }

        let base_level = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

        if let Some(custom) = &self.filter {
            for directive in custom.split(',') {
                if let Ok(d) = directive.trim().parse() {
                    filter = filter.add_directive(d);
                }
            }
        }

        filter
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine readable.
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    let layer = if args.json {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(args.env_filter())
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbosity() {
        let args = LogArgs {
            quiet: true,
            verbosity: 3,
            ..Default::default()
        };
        assert_eq!(args.env_filter().to_string(), "error");
    }

    #[test]
    fn test_custom_directives_are_added() {
        let args = LogArgs {
            filter: Some("tessera_retrieval=trace, ,bogus=nonsense=x".to_string()),
            ..Default::default()
        };
        assert!(args.env_filter().to_string().contains("tessera_retrieval=trace"));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let args: LogArgs = serde_json::from_str(r#"{"json":true}"#).unwrap();
        assert!(args.json);
        assert_eq!(args.verbosity, 0);
    }
}
