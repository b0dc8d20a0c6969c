// crates.io
use clap::{
	Args, Parser, Subcommand, ValueEnum,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};

// std
use std::{path::PathBuf, process::ExitCode};

// self
use crate::{
	indent::{self, CargoOptions, Cancellation, FixMode, FixState, IndentOptions, RunSummary},
	prelude::*,
};

/// Command-line interface for the sibling indentation checker.
#[derive(Debug, Parser)]
#[command(
	version = concat!(
		env!("CARGO_PKG_VERSION"),
		"-",
		env!("VERGEN_GIT_SHA"),
		"-",
		env!("VERGEN_CARGO_TARGET_TRIPLE"),
	),
	rename_all = "kebab",
	styles = styles(),
)]
pub(crate) struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Report sibling indentation violations.
	Check {
		/// Optional Rust files. Defaults to git-tracked `*.rs`.
		files: Vec<PathBuf>,
		#[command(flatten)]
		selection: Selection,
		#[command(flatten)]
		analysis: Analysis,
		#[arg(long, value_enum, default_value_t = OutputFormat::Human)]
		format: OutputFormat,
	},
	/// Reindent misaligned siblings, then re-check.
	Fix {
		/// Optional Rust files. Defaults to git-tracked `*.rs`.
		files: Vec<PathBuf>,
		#[command(flatten)]
		selection: Selection,
		#[command(flatten)]
		analysis: Analysis,
		/// Fix only the first fixable violation in each file.
		#[arg(long)]
		single: bool,
		#[arg(long, value_enum, default_value_t = OutputFormat::Human)]
		format: OutputFormat,
	},
	/// Print implemented rule IDs.
	Coverage,
}

#[derive(Debug, Args)]
struct Selection {
	/// Check every workspace member.
	#[arg(long)]
	workspace: bool,
	/// Restrict to the named workspace package. Repeatable.
	#[arg(short = 'p', long = "package", value_name = "SPEC")]
	packages: Vec<String>,
}
impl Selection {
	fn cargo_options(&self) -> CargoOptions {
		CargoOptions { workspace: self.workspace, packages: self.packages.clone() }
	}
}

#[derive(Debug, Args)]
struct Analysis {
	/// Also require every group to sit one indent level inside its opening delimiter.
	#[arg(long)]
	absolute_depth: bool,
	/// Maximum number of fix rounds per file.
	#[arg(long, value_name = "N", default_value_t = IndentOptions::default().max_rounds)]
	max_rounds: usize,
	/// Columns a tab advances to.
	#[arg(long, value_name = "N", default_value_t = IndentOptions::default().tab_width)]
	tab_width: usize,
	/// Columns per nesting level.
	#[arg(long, value_name = "N", default_value_t = IndentOptions::default().indent_width)]
	indent_width: usize,
}
impl Analysis {
	fn options(&self) -> IndentOptions {
		IndentOptions {
			absolute_depth: self.absolute_depth,
			max_rounds: self.max_rounds,
			tab_width: self.tab_width,
			indent_width: self.indent_width,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
	Human,
	Json,
}

impl Cli {
	pub(crate) fn run(&self) -> Result<ExitCode> {
		let cancel = Cancellation::default();

		match &self.command {
			Command::Check { files, selection, analysis, format } => {
				let summary = indent::run_check(
					files,
					&selection.cargo_options(),
					&analysis.options(),
					&cancel,
				)?;

				print_summary(&summary, *format, false)?;

				if summary.violation_count > 0 {
					eprintln!("\nFound {} indentation violation(s).", summary.violation_count);

					return Ok(ExitCode::FAILURE);
				}
			},
			Command::Fix { files, selection, analysis, single, format } => {
				let mode = if *single { FixMode::Single } else { FixMode::All };
				let summary = indent::run_fix(
					files,
					&selection.cargo_options(),
					&analysis.options(),
					mode,
					&cancel,
				)?;

				print_summary(&summary, *format, true)?;

				if summary.violation_count > 0 {
					eprintln!(
						"\nFound {} remaining indentation violation(s) after fix.",
						summary.violation_count
					);

					return Ok(ExitCode::FAILURE);
				}
			},
			Command::Coverage => indent::print_coverage(),
		}

		Ok(ExitCode::SUCCESS)
	}
}

fn print_summary(summary: &RunSummary, format: OutputFormat, fix_mode: bool) -> Result<()> {
	if format == OutputFormat::Json {
		println!("{}", serde_json::to_string_pretty(summary)?);

		return Ok(());
	}

	for violation in &summary.violations {
		println!("{}", violation.format());
	}
	for report in &summary.fixed_files {
		if let Some(state) = report.state
			&& state != FixState::Converged
		{
			println!(
				"{}: stopped after {} round(s) ({}).",
				report.file.display(),
				report.rounds,
				state.label()
			);
		}
	}

	if fix_mode {
		println!(
			"\nChecked {} file(s). Applied {} fix(es).",
			summary.file_count, summary.applied_fix_count
		);
	} else {
		println!("\nChecked {} file(s).", summary.file_count);
	}

	if summary.unfixable_count > 0 {
		println!("{} violation(s) require manual fixes.", summary.unfixable_count);
	}

	Ok(())
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_check_subcommand() {
		let cli = Cli::parse_from(["app", "check"]);

		assert!(matches!(cli.command, Command::Check { format: OutputFormat::Human, .. }));
	}

	#[test]
	fn analysis_flags_map_to_options() {
		let cli = Cli::parse_from([
			"app",
			"fix",
			"--absolute-depth",
			"--max-rounds",
			"5",
			"--tab-width",
			"8",
			"src/lib.rs",
		]);
		let Command::Fix { files, analysis, single, .. } = cli.command else {
			panic!("expected fix");
		};
		let options = analysis.options();

		assert_eq!(files, vec![PathBuf::from("src/lib.rs")]);
		assert!(!single);
		assert!(options.absolute_depth);
		assert_eq!(options.max_rounds, 5);
		assert_eq!(options.tab_width, 8);
		assert_eq!(options.indent_width, IndentOptions::default().indent_width);
	}

	#[test]
	fn package_selection_is_repeatable() {
		let cli =
			Cli::parse_from(["app", "check", "-p", "a", "--package", "b", "--format", "json"]);
		let Command::Check { selection, format, .. } = cli.command else {
			panic!("expected check");
		};
		let cargo_options = selection.cargo_options();

		assert_eq!(format, OutputFormat::Json);
		assert_eq!(cargo_options.packages, vec!["a", "b"]);
		assert!(cargo_options.has_package_filter());
	}
}
