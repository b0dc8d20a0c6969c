use std::{
	collections::{BTreeSet, HashSet},
	fs,
	path::{Path, PathBuf},
	process::Command,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use cargo_metadata::MetadataCommand;
use ra_ap_syntax::{AstNode, Edition, SourceFile, SyntaxKind, TextRange};
use serde::Serialize;

use crate::{
	indent::{driver::FixState, groups::GroupShape},
	prelude::*,
};

pub(crate) const RELATIVE_RULE: &str = "RUST-STYLE-INDENT-001";
pub(crate) const ABSOLUTE_DEPTH_RULE: &str = "RUST-STYLE-INDENT-002";
pub(crate) const STYLE_RULE_IDS: [&str; 2] = [RELATIVE_RULE, ABSOLUTE_DEPTH_RULE];
pub(crate) const DEFAULT_MAX_ROUNDS: usize = 3;
pub(crate) const DEFAULT_TAB_WIDTH: usize = 4;
pub(crate) const DEFAULT_INDENT_WIDTH: usize = 4;

/// Analysis settings consumed by the detector and the fix driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndentOptions {
	/// Also require each group baseline to match its nesting depth.
	pub(crate) absolute_depth: bool,
	pub(crate) max_rounds: usize,
	pub(crate) tab_width: usize,
	pub(crate) indent_width: usize,
}
impl Default for IndentOptions {
	fn default() -> Self {
		Self {
			absolute_depth: false,
			max_rounds: DEFAULT_MAX_ROUNDS,
			tab_width: DEFAULT_TAB_WIDTH,
			indent_width: DEFAULT_INDENT_WIDTH,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CargoOptions {
	pub(crate) workspace: bool,
	pub(crate) packages: Vec<String>,
}
impl CargoOptions {
	pub(crate) fn has_package_filter(&self) -> bool {
		self.workspace || !self.packages.is_empty()
	}
}

/// Cooperative cancellation flag shared between a host and running analyses.
#[derive(Debug, Clone, Default)]
pub(crate) struct Cancellation(Arc<AtomicBool>);
impl Cancellation {
	pub(crate) fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub(crate) fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum Variant {
	Relative,
	AbsoluteDepth,
}
impl Variant {
	pub(crate) fn rule(self) -> &'static str {
		match self {
			Self::Relative => RELATIVE_RULE,
			Self::AbsoluteDepth => ABSOLUTE_DEPTH_RULE,
		}
	}

	pub(crate) fn severity(self) -> Severity {
		match self {
			Self::Relative => Severity::Error,
			Self::AbsoluteDepth => Severity::Warning,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Severity {
	Error,
	Warning,
}

/// Physical lines owned by one flagged member, zero-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemberExtent {
	pub(crate) anchor_line: usize,
	pub(crate) first_line: usize,
	pub(crate) last_line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Violation {
	pub(crate) file: PathBuf,
	/// One-based line of the member's anchor token.
	pub(crate) line: usize,
	/// One-based visual column the anchor currently sits at.
	pub(crate) column: usize,
	pub(crate) expected_column: usize,
	pub(crate) rule: &'static str,
	pub(crate) variant: Variant,
	pub(crate) severity: Severity,
	pub(crate) shape: GroupShape,
	pub(crate) message: String,
	pub(crate) fixable: bool,
	#[serde(skip)]
	pub(crate) extent: MemberExtent,
}
impl Violation {
	pub(crate) fn format(&self) -> String {
		format!(
			"{}:{}:{}: [{}] {}{}",
			self.file.display(),
			self.line,
			self.column,
			self.rule,
			self.message,
			if self.fixable { " (fixable)" } else { "" }
		)
	}

	/// Signed column delta that moves the member onto its expected column.
	pub(crate) fn delta(&self) -> isize {
		self.expected_column as isize - self.column as isize
	}
}

/// Per-file result of a fix run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FileFixReport {
	pub(crate) file: PathBuf,
	pub(crate) rounds: usize,
	pub(crate) applied: usize,
	/// Fix-All terminal state; absent for single-violation fixes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(crate) state: Option<FixState>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunSummary {
	pub(crate) file_count: usize,
	pub(crate) violation_count: usize,
	pub(crate) unfixable_count: usize,
	pub(crate) applied_fix_count: usize,
	pub(crate) violations: Vec<Violation>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub(crate) fixed_files: Vec<FileFixReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndentStyle {
	Tabs,
	Spaces,
}
impl IndentStyle {
	/// Renders `column` visual columns of leading whitespace.
	pub(crate) fn render(self, column: usize, tab_width: usize) -> String {
		match self {
			Self::Tabs if tab_width > 0 => {
				let mut out = "\t".repeat(column / tab_width);

				out.push_str(&" ".repeat(column % tab_width));

				out
			},
			Self::Tabs | Self::Spaces => " ".repeat(column),
		}
	}
}

#[derive(Debug)]
pub(crate) struct FileContext {
	pub(crate) path: PathBuf,
	pub(crate) text: String,
	pub(crate) line_starts: Vec<usize>,
	pub(crate) source_file: SourceFile,
	pub(crate) indent_style: IndentStyle,
	/// Zero-based lines whose leading whitespace belongs to a literal or block comment.
	pub(crate) opaque_lines: BTreeSet<usize>,
}
impl FileContext {
	pub(crate) fn line_count(&self) -> usize {
		self.line_starts.len()
	}

	pub(crate) fn line_of(&self, offset: usize) -> usize {
		line_from_offset(&self.line_starts, offset)
	}

	/// Text of a zero-based line without its terminator.
	pub(crate) fn line_text(&self, line: usize) -> &str {
		let Some(&start) = self.line_starts.get(line) else {
			return "";
		};
		let end = self.line_starts.get(line + 1).map_or(self.text.len(), |next| next - 1);
		let raw = &self.text[start..end.max(start)];

		raw.strip_suffix('\r').unwrap_or(raw)
	}

	/// Byte range of the leading whitespace run of a zero-based line.
	pub(crate) fn indent_range(&self, line: usize) -> Option<(usize, usize)> {
		let start = *self.line_starts.get(line)?;
		let width = leading_whitespace(self.line_text(line)).len();

		Some((start, start + width))
	}

	pub(crate) fn indent_column(&self, line: usize, tab_width: usize) -> usize {
		visual_width(leading_whitespace(self.line_text(line)), tab_width)
	}

	pub(crate) fn is_blank_line(&self, line: usize) -> bool {
		self.line_text(line).trim().is_empty()
	}

	/// Whether only whitespace precedes `offset` on its line.
	pub(crate) fn is_first_in_line(&self, offset: usize) -> bool {
		let line = self.line_of(offset);
		let start = self.line_starts[line];

		self.text[start..offset].chars().all(|ch| ch == ' ' || ch == '\t')
	}

	pub(crate) fn range_lines(&self, range: TextRange) -> (usize, usize) {
		text_range_to_lines(&self.line_starts, range)
	}
}

pub(crate) fn read_file_context(path: &Path) -> Result<Option<FileContext>> {
	let text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(_) => return Ok(None),
	};

	Ok(read_file_context_from_text(path, text))
}

pub(crate) fn read_file_context_from_text(path: &Path, text: String) -> Option<FileContext> {
	if text.is_empty() {
		return None;
	}

	let line_starts = build_line_starts(&text);
	let source_file = SourceFile::parse(&text, Edition::CURRENT).tree();
	let indent_style = detect_indent_style(&text);
	let opaque_lines = collect_opaque_lines(&source_file, &line_starts);

	Some(FileContext {
		path: path.to_path_buf(),
		text,
		line_starts,
		source_file,
		indent_style,
		opaque_lines,
	})
}

pub(crate) fn resolve_files(
	requested_files: &[PathBuf],
	cargo_options: &CargoOptions,
) -> Result<Vec<PathBuf>> {
	if !requested_files.is_empty() {
		return Ok(requested_files
			.iter()
			.filter(|file| file.extension().is_some_and(|ext| ext == "rs"))
			.cloned()
			.collect());
	}

	let git_files = git_ls_files_rs()?;

	if !cargo_options.has_package_filter() {
		return Ok(git_files);
	}

	let metadata = MetadataCommand::new()
		.no_deps()
		.exec()
		.map_err(|err| eyre::eyre!("Failed to run cargo metadata: {err}."))?;
	let workspace_member_ids = metadata.workspace_members.iter().cloned().collect::<HashSet<_>>();
	let mut missing = cargo_options.packages.iter().cloned().collect::<HashSet<_>>();
	let mut selected_roots = HashSet::new();

	for package in metadata.packages {
		if !workspace_member_ids.contains(&package.id) {
			continue;
		}

		let package_name = package.name.as_str().replace('-', "_");
		let mut matched = false;

		for requested in &cargo_options.packages {
			if requested.replace('-', "_") == package_name {
				missing.remove(requested);

				matched = true;
			}
		}

		if !(cargo_options.workspace || matched) {
			continue;
		}

		let manifest = PathBuf::from(package.manifest_path.as_str());

		if let Some(root) = manifest.parent() {
			selected_roots.insert(normalize_path(root));
		}
	}

	if !missing.is_empty() {
		let mut missing = missing.into_iter().collect::<Vec<_>>();

		missing.sort();

		return Err(eyre::eyre!(
			"Requested package(s) not found in workspace: {}.",
			missing.join(", ")
		));
	}

	let cwd =
		std::env::current_dir().map_err(|err| eyre::eyre!("Failed to resolve cwd: {err}."))?;

	Ok(git_files
		.into_iter()
		.filter(|relative| {
			let absolute = normalize_path(&cwd.join(relative));

			selected_roots.iter().any(|root| absolute.starts_with(root))
		})
		.collect())
}

pub(crate) fn line_from_offset(line_starts: &[usize], offset: usize) -> usize {
	match line_starts.binary_search(&offset) {
		Ok(pos) => pos,
		Err(pos) => pos.saturating_sub(1),
	}
}

pub(crate) fn text_range_to_lines(line_starts: &[usize], range: TextRange) -> (usize, usize) {
	let start = usize::from(range.start());
	let end_exclusive = usize::from(range.end());
	let start_line = line_from_offset(line_starts, start);
	let end_line = if end_exclusive <= start {
		start_line
	} else {
		line_from_offset(line_starts, end_exclusive - 1)
	};

	(start_line, end_line)
}

pub(crate) fn leading_whitespace(line: &str) -> &str {
	let end = line.find(|ch: char| ch != ' ' && ch != '\t').unwrap_or(line.len());

	&line[..end]
}

/// Visual width of a whitespace run; tabs advance to the next tab stop.
pub(crate) fn visual_width(whitespace: &str, tab_width: usize) -> usize {
	whitespace.chars().fold(0, |column, ch| match ch {
		'\t' if tab_width > 0 => (column / tab_width + 1) * tab_width,
		_ => column + 1,
	})
}

fn git_ls_files_rs() -> Result<Vec<PathBuf>> {
	let output = Command::new("git")
		.args(["ls-files", "*.rs"])
		.output()
		.map_err(|err| eyre::eyre!("Failed to run git ls-files: {err}."))?;

	if !output.status.success() {
		return Err(eyre::eyre!("git ls-files failed with status {}.", output.status));
	}

	let stdout = String::from_utf8(output.stdout)?;

	Ok(stdout.lines().filter(|line| !line.is_empty()).map(PathBuf::from).collect())
}

fn normalize_path(path: &Path) -> PathBuf {
	match fs::canonicalize(path) {
		Ok(canonical) => canonical,
		Err(_) => path.to_path_buf(),
	}
}

fn build_line_starts(text: &str) -> Vec<usize> {
	let mut starts = vec![0_usize];

	for (idx, ch) in text.char_indices() {
		if ch == '\n' {
			starts.push(idx + 1);
		}
	}

	starts
}

fn detect_indent_style(text: &str) -> IndentStyle {
	for line in text.lines() {
		if line.trim().is_empty() {
			continue;
		}

		match line.chars().next() {
			Some('\t') => return IndentStyle::Tabs,
			Some(' ') => return IndentStyle::Spaces,
			_ => {},
		}
	}

	IndentStyle::Spaces
}

fn collect_opaque_lines(source_file: &SourceFile, line_starts: &[usize]) -> BTreeSet<usize> {
	let mut lines = BTreeSet::new();

	for token in source_file
		.syntax()
		.descendants_with_tokens()
		.filter_map(|element| element.into_token())
	{
		let opaque = match token.kind() {
			SyntaxKind::STRING | SyntaxKind::BYTE_STRING | SyntaxKind::C_STRING => true,
			SyntaxKind::COMMENT => token.text().starts_with("/*"),
			_ => false,
		};

		if !opaque {
			continue;
		}

		let (start_line, end_line) = text_range_to_lines(line_starts, token.text_range());

		lines.extend(start_line + 1..=end_line);
	}

	lines
}
