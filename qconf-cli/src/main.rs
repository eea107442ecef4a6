//! qconf CLI - converts qconf text on stdin into an XML file
//!
//! ```text
//! qconf -o output.xml < input.qconf
//! ```

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use qconf_core::{ParseOptions, XmlOptions};
use tracing::info;

mod logging;

use crate::logging::LogFormat;

const USAGE: &str = "usage: qconf -o output.xml < input.qconf";

#[derive(Parser, Debug)]
#[command(
    name = "qconf",
    about = "Convert qconf configuration text read from stdin to XML",
    version
)]
struct Cli {
    /// Path of the XML file to write
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Name of the root element
    #[arg(long, value_name = "NAME", default_value = "config")]
    root: String,

    /// Keep `true`/`false` strings typed as strings
    #[arg(long)]
    no_bool_detect: bool,

    /// Deepest mapping nesting accepted
    #[arg(long, value_name = "N", default_value_t = ParseOptions::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log filter such as `debug` or `qconf_core=trace` (overrides QCONF_LOG)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Cli {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
        }
    }

    fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            root_name: self.root.clone(),
            detect_booleans: !self.no_bool_detect,
            ..XmlOptions::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("expected input on stdin\n{USAGE}")]
    TerminalInput,

    #[error("input is empty")]
    EmptyInput,

    #[error("cannot read stdin: {0}")]
    Stdin(#[from] io::Error),

    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Convert(#[from] qconf_core::Error),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.log_format);

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
    println!("converted to {}", cli.output.display());
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::TerminalInput);
    }

    let mut input = String::new();
    stdin.lock().read_to_string(&mut input)?;
    convert_to_file(cli, &input)
}

fn convert_to_file(cli: &Cli, input: &str) -> Result<(), CliError> {
    if input.trim().is_empty() {
        return Err(CliError::EmptyInput);
    }
    info!(bytes = input.len(), "read input");

    let xml = qconf_core::convert(input, cli.parse_options(), &cli.xml_options())?;

    fs::write(&cli.output, xml).map_err(|source| CliError::Write {
        path: cli.output.clone(),
        source,
    })?;
    info!(path = %cli.output.display(), "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("qconf").chain(args.iter().copied())).unwrap()
    }

    fn temp_output(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qconf-cli-{}-{}.xml", name, process::id()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_is_required() {
        assert!(Cli::try_parse_from(["qconf"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&["-o", "out.xml"]);
        assert_eq!(cli.output, PathBuf::from("out.xml"));
        assert_eq!(cli.xml_options(), XmlOptions::default());
        assert_eq!(cli.parse_options(), ParseOptions::default());
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_options_map_through() {
        let cli = cli(&[
            "--output",
            "out.xml",
            "--root",
            "configuration",
            "--no-bool-detect",
            "--max-depth",
            "8",
        ]);
        let xml = cli.xml_options();
        assert_eq!(xml.root_name, "configuration");
        assert!(!xml.detect_booleans);
        assert_eq!(cli.parse_options().max_depth, 8);
    }

    #[test]
    fn test_convert_writes_file() {
        let path = temp_output("ok");
        let cli = cli(&["-o", path.to_str().unwrap()]);
        convert_to_file(&cli, "define port 8080\n(p: $port 1 +$;)").unwrap();

        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(written.contains("<p type=\"number\">8081</p>"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let cli = cli(&["-o", "unused.xml"]);
        assert!(matches!(convert_to_file(&cli, " \n\t"), Err(CliError::EmptyInput)));
    }

    #[test]
    fn test_parse_error_is_reported_with_position() {
        let path = temp_output("err");
        let cli = cli(&["-o", path.to_str().unwrap()]);
        let err = convert_to_file(&cli, "(a: 1 b: 2;)").unwrap_err();
        assert_eq!(err.to_string(), "line 1, column 7: expected ; after value");
        assert!(!path.exists());
    }
}
