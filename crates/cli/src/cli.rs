use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Transcript output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// One `method params` line per call
	#[default]
	Text,
	/// One JSON object per line
	Ndjson,
}

#[derive(Parser, Debug)]
#[command(name = "boost-sim")]
#[command(about = "Drive a host and a simulated embedded runtime through the route bridge")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Transcript format
	#[arg(short = 'f', long, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Load setup options from a JSON file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Dispatch foreground/background manually instead of from screen callbacks
	#[arg(long)]
	pub override_foreground_background: bool,

	/// Initial route for the embedded runtime (overrides the config file)
	#[arg(long, value_name = "ROUTE")]
	pub initial_route: Option<String>,
}
