use clap::Parser;
use std::path::PathBuf;

use crate::cache::DEFAULT_CAPACITY;
use crate::config::ConverterConfig;
use crate::emit::OutputFormat;
use crate::extract::{ExecutionType, Priority};

#[derive(Parser, Debug)]
#[command(name = "xmindcase")]
#[command(version)]
#[command(
    about = "Convert XMind test-case outlines into Zentao CSV, TestLink XML and JSON",
    long_about = None
)]
#[command(after_help = "Examples:\n  \
  xmindcase cases.xmind                 write cases.csv, cases.xml and cases.json\n  \
  xmindcase cases.xmind -f testlink -p  print TestLink XML to stdout\n  \
  xmindcase -t cases.xmind              preview the extracted test cases\n  \
  xmindcase -l cases.xmind              list the members of the container")]
pub struct Cli {
    /// XMind workbook(s) to convert
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Output format, repeatable (default: all)
    #[arg(short = 'f', long = "format", value_enum, value_name = "FORMAT")]
    pub formats: Vec<OutputFormat>,

    /// Write outputs into DIR (default: next to each FILE)
    #[arg(short = 'd', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print outputs to stdout, no files
    #[arg(short = 'p')]
    pub pipe: bool,

    /// List container members and exit
    #[arg(short = 'l')]
    pub list: bool,

    /// Preview extracted test cases instead of writing outputs
    #[arg(short = 't')]
    pub preview: bool,

    /// Never overwrite existing files
    #[arg(short = 'n', conflicts_with = "overwrite")]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Disable the content-fingerprint conversion cache
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum number of cached conversions
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CAPACITY)]
    pub cache_size: usize,

    /// Priority for cases without a priority marker or label
    #[arg(long, value_enum, default_value_t = Priority::Medium)]
    pub default_priority: Priority,

    /// Execution type for cases without a Manual/Automated label
    #[arg(long, value_enum, default_value_t = ExecutionType::Manual)]
    pub default_execution_type: ExecutionType,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// More log output (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Requested formats, all of them when none was given.
    pub fn formats(&self) -> Vec<OutputFormat> {
        if self.formats.is_empty() {
            OutputFormat::ALL.to_vec()
        } else {
            let mut formats: Vec<OutputFormat> = Vec::with_capacity(self.formats.len());
            for format in &self.formats {
                if !formats.contains(format) {
                    formats.push(*format);
                }
            }
            formats
        }
    }

    pub fn converter_config(&self) -> ConverterConfig {
        ConverterConfig {
            enable_cache: !self.no_cache,
            cache_size: self.cache_size,
            default_priority: self.default_priority,
            default_execution_type: self.default_execution_type,
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (0, 0) => "xmindcase=info",
            (0, 1) => "xmindcase=warn",
            (0, _) => "xmindcase=error",
            (1, _) => "xmindcase=debug",
            _ => "xmindcase=trace",
        }
    }
}
