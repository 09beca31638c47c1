//! `[output]` section: how turns are rendered on the terminal

use chatflow_domain::OutputFormat;
use serde::{Deserialize, Serialize};

/// Renderer settings
///
/// `format` picks the frame renderer when `--output` is not given: `console`
/// streams text and tool lines, `json` writes one frame per line. JSON output
/// never shows a spinner since stdout must stay machine-readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    /// ANSI colors for the console renderer and tool listings
    pub color: bool,
    /// Spinner on stderr while a step or tool call is in flight
    pub show_progress: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            show_progress: true,
        }
    }
}

impl FileOutputConfig {
    /// Renderer for this run; a command-line choice wins over the file
    pub fn resolve_format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.format).unwrap_or_default()
    }

    pub fn wants_progress(&self, format: OutputFormat) -> bool {
        self.show_progress && format != OutputFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_file_format() {
        let config = FileOutputConfig {
            format: Some(OutputFormat::Json),
            ..Default::default()
        };
        assert_eq!(config.resolve_format(None), OutputFormat::Json);
        assert_eq!(
            config.resolve_format(Some(OutputFormat::Console)),
            OutputFormat::Console
        );
        assert_eq!(
            FileOutputConfig::default().resolve_format(None),
            OutputFormat::Console
        );
    }

    #[test]
    fn test_json_output_suppresses_spinner() {
        let config = FileOutputConfig::default();
        assert!(config.wants_progress(OutputFormat::Console));
        assert!(!config.wants_progress(OutputFormat::Json));

        let quiet: FileOutputConfig = toml::from_str("show_progress = false").unwrap();
        assert!(!quiet.wants_progress(OutputFormat::Console));
        assert!(quiet.color);
    }
}
