//! Command-line argument parsing for the navik CLI.

/// Options for the interactive REPL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplOptions {
    /// Override the backend base URL
    pub base_url: Option<String>,
    /// Force the single-shot fallback instead of streaming
    pub no_stream: bool,
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Run the interactive REPL (default)
    Repl(ReplOptions),
}

/// Parse command-line arguments and return the command to execute.
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut options = ReplOptions::default();
    let mut args = args.skip(1); // skip the program name

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--no-stream" => options.no_stream = true,
            "--base-url" => {
                if let Some(url) = args.next() {
                    options.base_url = Some(url);
                }
            }
            _ => {}
        }
    }
    CliCommand::Repl(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliCommand {
        parse_args(
            std::iter::once("navik".to_string()).chain(args.iter().map(|s| s.to_string())),
        )
    }

    #[test]
    fn test_no_args_runs_repl() {
        assert_eq!(parse(&[]), CliCommand::Repl(ReplOptions::default()));
    }

    #[test]
    fn test_version_flags() {
        assert_eq!(parse(&["--version"]), CliCommand::Version);
        assert_eq!(parse(&["-V"]), CliCommand::Version);
    }

    #[test]
    fn test_help_flags() {
        assert_eq!(parse(&["--help"]), CliCommand::Help);
        assert_eq!(parse(&["-h"]), CliCommand::Help);
    }

    #[test]
    fn test_no_stream_flag() {
        match parse(&["--no-stream"]) {
            CliCommand::Repl(options) => assert!(options.no_stream),
            other => panic!("expected Repl, got {:?}", other),
        }
    }

    #[test]
    fn test_base_url_flag() {
        match parse(&["--base-url", "https://api.navik.app"]) {
            CliCommand::Repl(options) => {
                assert_eq!(options.base_url.as_deref(), Some("https://api.navik.app"));
            }
            other => panic!("expected Repl, got {:?}", other),
        }
    }

    #[test]
    fn test_base_url_without_value_ignored() {
        match parse(&["--base-url"]) {
            CliCommand::Repl(options) => assert!(options.base_url.is_none()),
            other => panic!("expected Repl, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_args_ignored() {
        match parse(&["--future-flag", "--no-stream"]) {
            CliCommand::Repl(options) => assert!(options.no_stream),
            other => panic!("expected Repl, got {:?}", other),
        }
    }
}
