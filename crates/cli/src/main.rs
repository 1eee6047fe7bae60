use boost::SetupOptions;
use boost_cli::{
	cli::{Cli, OutputFormat},
	logging, sim,
};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let mut options = match &cli.config {
		Some(path) => SetupOptions::load(path)?,
		None => SetupOptions::default(),
	};
	if cli.override_foreground_background {
		options.override_foreground_background = true;
	}
	if let Some(route) = cli.initial_route {
		options.initial_route = route;
	}
	tracing::info!(%options, "Starting simulation");

	let transcript = sim::run(options).await?;
	for record in &transcript {
		match cli.format {
			OutputFormat::Text => println!("{record}"),
			OutputFormat::Ndjson => println!("{}", serde_json::to_string(record)?),
		}
	}
	Ok(())
}
