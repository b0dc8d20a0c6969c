//! Sibling indentation checker executable.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

mod cli;
mod indent;

mod prelude {
	pub use color_eyre::{Result, eyre};
}

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const LOG_ENV: &str = "VINDENT_LOG";

fn normalize_args(mut args: Vec<String>) -> Vec<String> {
	if args.get(1).is_some_and(|arg| arg == "vindent") {
		args.remove(1);
	}

	args
}

fn normalized_cli_args() -> Vec<String> {
	normalize_args(std::env::args().collect::<Vec<_>>())
}

fn init_tracing() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

	if let Err(err) = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.try_init()
	{
		eprintln!("Failed to initialize logging: {err}.");
	}
}

fn main() -> ExitCode {
	if let Err(err) = color_eyre::install() {
		eprintln!("Failed to initialize error reporter: {err}.");

		return ExitCode::FAILURE;
	}

	init_tracing();

	match Cli::parse_from(normalized_cli_args()).run() {
		Ok(code) => code,
		Err(err) => {
			eprintln!("{err:?}");

			ExitCode::FAILURE
		},
	}
}
