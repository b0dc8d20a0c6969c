mod baseline;
mod detect;
mod driver;
mod fixes;
mod groups;
mod shared;
mod span;

pub(crate) use driver::FixState;
pub(crate) use shared::{CargoOptions, Cancellation, IndentOptions, RunSummary};

use std::{
	fs,
	path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::prelude::*;
use shared::{FileFixReport, Violation};

const FILE_BATCH_SIZE: usize = 64;

/// How much of a file `run_fix` corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FixMode {
	/// Fix-All until convergence or the round cap.
	All,
	/// Only the first fixable violation of each file.
	Single,
}

#[derive(Debug)]
struct FileFix {
	report: FileFixReport,
	rewritten_text: Option<String>,
}

pub(crate) fn run_check(
	requested_files: &[PathBuf],
	cargo_options: &CargoOptions,
	options: &IndentOptions,
	cancel: &Cancellation,
) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files, cargo_options)?;
	let violations = check_files(&files, options, cancel)?;

	Ok(summarize(files.len(), violations, Vec::new()))
}

pub(crate) fn run_fix(
	requested_files: &[PathBuf],
	cargo_options: &CargoOptions,
	options: &IndentOptions,
	mode: FixMode,
	cancel: &Cancellation,
) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files, cargo_options)?;
	let mut reports = Vec::new();

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let outcomes = batch
			.par_iter()
			.map(|file| -> Result<Option<FileFix>> {
				let Ok(text) = fs::read_to_string(file) else {
					return Ok(None);
				};

				fix_text(file, &text, options, mode, cancel).map(Some)
			})
			.collect::<Vec<_>>();

		for outcome in outcomes {
			let Some(outcome) = outcome? else {
				continue;
			};

			if let Some(text) = outcome.rewritten_text {
				fs::write(&outcome.report.file, text)?;

				tracing::info!(
					path = %outcome.report.file.display(),
					applied = outcome.report.applied,
					"Rewrote file."
				);
			}

			reports.push(outcome.report);
		}
	}

	let violations = check_files(&files, options, cancel)?;

	reports.retain(|report| report.applied > 0);

	Ok(summarize(files.len(), violations, reports))
}

pub(crate) fn print_coverage() {
	for rule in shared::STYLE_RULE_IDS {
		println!("{rule}\timplemented");
	}
}

fn check_files(
	files: &[PathBuf],
	options: &IndentOptions,
	cancel: &Cancellation,
) -> Result<Vec<Violation>> {
	let mut violations = Vec::new();

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let batch_results = batch
			.par_iter()
			.map(|file| -> Result<Vec<Violation>> {
				let Some(ctx) = shared::read_file_context(file)? else {
					return Ok(Vec::new());
				};

				Ok(driver::scan(&ctx, options, cancel).violations)
			})
			.collect::<Vec<_>>();

		for result in batch_results {
			violations.extend(result?);
		}
	}

	Ok(violations)
}

fn fix_text(
	path: &Path,
	text: &str,
	options: &IndentOptions,
	mode: FixMode,
	cancel: &Cancellation,
) -> Result<FileFix> {
	let (fixed, rounds, applied, state) = match mode {
		FixMode::All => {
			let outcome = driver::fix_all(path, text, options, cancel)?;

			(outcome.text, outcome.rounds, outcome.applied, Some(outcome.state))
		},
		FixMode::Single => {
			let first = match shared::read_file_context_from_text(path, text.to_owned()) {
				Some(ctx) => fix_first(&ctx, options, cancel)?,
				None => None,
			};

			match first {
				Some((fixed, applied)) => (fixed, 1, applied, None),
				None => (text.to_owned(), 0, 0, None),
			}
		},
	};

	Ok(FileFix {
		report: FileFixReport { file: path.to_path_buf(), rounds, applied, state },
		rewritten_text: (fixed != text).then_some(fixed),
	})
}

fn fix_first(
	ctx: &shared::FileContext,
	options: &IndentOptions,
	cancel: &Cancellation,
) -> Result<Option<(String, usize)>> {
	driver::scan(ctx, options, cancel)
		.violations
		.iter()
		.find(|violation| violation.fixable)
		.map(|violation| fixes::fix_single(ctx, violation, options))
		.transpose()
}

fn summarize(
	file_count: usize,
	mut violations: Vec<Violation>,
	fixed_files: Vec<FileFixReport>,
) -> RunSummary {
	violations.sort_by(|a, b| {
		a.file
			.cmp(&b.file)
			.then(a.line.cmp(&b.line))
			.then(a.column.cmp(&b.column))
			.then(a.rule.cmp(b.rule))
	});

	let unfixable_count = violations.iter().filter(|v| !v.fixable).count();
	let applied_fix_count = fixed_files.iter().map(|report| report.applied).sum();

	RunSummary {
		file_count,
		violation_count: violations.len(),
		unfixable_count,
		applied_fix_count,
		violations,
		fixed_files,
	}
}
