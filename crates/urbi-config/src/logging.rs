//! Output format of the client programs' diagnostics.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the programs render log records on stderr.
///
/// Names are matched without regard to ASCII case, so `URBI_LOG_FORMAT=JSON`
/// and `--log-format json` select the same format. `text` is accepted as a
/// synonym for `compact`.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One terse line per event, meant for someone watching a terminal.
    #[default]
    #[serde(alias = "text")]
    #[strum(to_string = "compact", serialize = "text")]
    Compact,
    /// One JSON object per event, fields flattened to the top level.
    Json,
}

/// Rejection of an unrecognised format name.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("JSON", LogFormat::Json)]
    #[case("compact", LogFormat::Compact)]
    #[case("Text", LogFormat::Compact)]
    fn names_parse_ignoring_case(#[case] name: &str, #[case] expected: LogFormat) {
        assert_eq!(name.parse::<LogFormat>().ok(), Some(expected));
    }

    #[test]
    fn synonym_displays_as_the_canonical_name() {
        let format: LogFormat = "text".parse().expect("text is a synonym");
        assert_eq!(format.to_string(), "compact");
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }
}
