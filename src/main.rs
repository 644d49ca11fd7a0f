use anyhow::anyhow;
use anyhow::Result;
use broker_report_fixer::config::Config;
use broker_report_fixer::config::Locale;
use broker_report_fixer::config::Options;
use broker_report_fixer::processor;
use clap::Parser;
use clap::ValueEnum;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LocaleArg {
    /// `1 234,56`, footers like `3 из 12`
    Ru,
    /// `1,234.56`, footers like `3 of 12`
    En,
}

#[derive(Parser, Debug)]
#[command(name = "broker-report-fixer")]
#[command(about = "Rewrites paginated broker reports into one clean table per section")]
#[command(version)]
struct Cli {
    /// Directory searched recursively for reports
    #[arg(default_value = ".")]
    input_dir: PathBuf,

    /// Directory the fixed workbooks are written to
    #[arg(short, long, default_value = "fixed")]
    output_dir: PathBuf,

    /// File name pattern of source reports
    #[arg(long, default_value = "broker-report-*.xlsx")]
    pattern: String,

    /// Suffix replacing the extension of output files
    #[arg(long, default_value = "-fixed.xlsx")]
    suffix: String,

    /// Number format and vocabulary of the reports
    #[arg(long, value_enum, default_value = "ru")]
    locale: LocaleArg,

    /// Regular expression for page footer rows, replacing the locale's
    #[arg(long)]
    page_break_pattern: Option<String>,

    /// Read rows from column 1 instead of probing for the first text column
    #[arg(long)]
    no_anchor_probe: bool,

    /// Keep numeric text as text
    #[arg(long)]
    no_numeric_coercion: bool,

    /// Keep full date-times in time columns
    #[arg(long)]
    no_time_fixup: bool,

    /// Log every detected table
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    fn into_config(self) -> Result<Config> {
        let locale = match self.locale {
            LocaleArg::Ru => Locale::russian(),
            LocaleArg::En => Locale::english(),
        };
        let locale = match &self.page_break_pattern {
            Some(pattern) => locale
                .with_page_break(pattern)
                .map_err(|e| anyhow!("Invalid page break pattern '{}': {}", pattern, e))?,
            None => locale,
        };
        Ok(Config {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
            pattern: self.pattern,
            output_suffix: self.suffix,
            options: Options {
                anchor_probe: !self.no_anchor_probe,
                numeric_coercion: !self.no_numeric_coercion,
                time_column_fixup: !self.no_time_fixup,
            },
            locale,
        })
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = cli.into_config()?;
    let summary = processor::run(&config)?;
    Ok(if summary.failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
