use color_eyre::{Result, eyre};

use super::{
	shared::{FileContext, IndentOptions, Violation, visual_width},
	span::{self, SpanShape},
};

/// Replacement of one line's leading whitespace run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
	/// Zero-based line the edit applies to.
	pub(crate) line: usize,
	pub(crate) start: usize,
	pub(crate) end: usize,
	pub(crate) replacement: String,
	pub(crate) rule: &'static str,
}

/// Whitespace edits that shift a flagged member onto its expected column.
///
/// Every shiftable line of the member moves by the same delta, so the
/// member's internal layout survives. Indentation that would go negative is
/// clamped to zero.
pub(crate) fn edits_for_violation(
	ctx: &FileContext,
	violation: &Violation,
	options: &IndentOptions,
) -> Vec<Edit> {
	if !violation.fixable {
		return Vec::new();
	}

	let span = span::classify(ctx, &violation.extent);
	let delta = violation.delta();
	let lines = match span.shape {
		SpanShape::Single => vec![span.anchor_line],
		SpanShape::Multi => span.shiftable_lines().collect(),
	};

	lines
		.into_iter()
		.filter_map(|line| {
			let (start, end) = ctx.indent_range(line)?;
			let current = &ctx.text[start..end];
			let column = visual_width(current, options.tab_width).saturating_add_signed(delta);
			let replacement = ctx.indent_style.render(column, options.tab_width);

			(replacement != current).then_some(Edit {
				line,
				start,
				end,
				replacement,
				rule: violation.rule,
			})
		})
		.collect()
}

/// Corrected text with only `violation` fixed, plus the number of edits applied.
pub(crate) fn fix_single(
	ctx: &FileContext,
	violation: &Violation,
	options: &IndentOptions,
) -> Result<(String, usize)> {
	let mut text = ctx.text.clone();
	let applied = apply_edits(&mut text, edits_for_violation(ctx, violation, options))?;

	Ok((text, applied))
}

/// Applies a batch of edits and returns how many were applied. Edits that
/// overlap an earlier one are dropped; edits that would touch anything other
/// than whitespace are rejected.
pub(crate) fn apply_edits(text: &mut String, mut edits: Vec<Edit>) -> Result<usize> {
	if edits.is_empty() {
		return Ok(0);
	}

	edits.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)).then(a.rule.cmp(b.rule)));

	let mut filtered = Vec::with_capacity(edits.len());
	let mut last_end = None;

	for edit in edits {
		if last_end.is_some_and(|last_end| edit.start < last_end) {
			continue;
		}

		last_end = Some(edit.end.max(edit.start + 1));

		filtered.push(edit);
	}

	for edit in filtered.iter().rev() {
		if edit.end > text.len() || edit.start > edit.end {
			return Err(eyre::eyre!(
				"Invalid edit range {}..{} for text length {}.",
				edit.start,
				edit.end,
				text.len()
			));
		}
		if !is_indent(&text[edit.start..edit.end]) || !is_indent(&edit.replacement) {
			return Err(eyre::eyre!(
				"Edit on line {} would change non-whitespace text.",
				edit.line + 1
			));
		}

		text.replace_range(edit.start..edit.end, &edit.replacement);
	}

	Ok(filtered.len())
}

fn is_indent(text: &str) -> bool {
	text.chars().all(|ch| ch == ' ' || ch == '\t')
}

#[cfg(test)]
mod tests {
	// std
	use std::path::Path;

	// self
	use super::*;
	use crate::indent::{driver, shared};

	fn context(text: &str) -> FileContext {
		shared::read_file_context_from_text(Path::new("fixes.rs"), text.to_owned())
			.expect("has ctx")
	}

	fn fix_first(text: &str) -> String {
		let options = IndentOptions::default();
		let ctx = context(text);
		let scan = driver::scan(&ctx, &options, &shared::Cancellation::default());
		let violation = scan.violations.first().expect("one violation");

		let (fixed, applied) = fix_single(&ctx, violation, &options).expect("fix applies");

		assert!(applied > 0);

		fixed
	}

	fn without_whitespace(text: &str) -> Vec<String> {
		text.lines().map(|line| line.trim_start().to_owned()).collect()
	}

	#[test]
	fn misaligned_parameter_moves_to_baseline() {
		let original = "fn f(\nx: i32,\n  y: i32,\nz: i32,\n) {}\n";
		let fixed = fix_first(original);

		assert_eq!(fixed, "fn f(\nx: i32,\ny: i32,\nz: i32,\n) {}\n");
	}

	#[test]
	fn multi_line_member_shifts_as_a_block() {
		let original = r#"fn f() {
    let a = 1;
  if a > 0 {
      g(
          a,
      );
  }
    let b = 2;
}
"#;
		let fixed = fix_first(original);

		assert_eq!(
			fixed,
			r#"fn f() {
    let a = 1;
    if a > 0 {
        g(
            a,
        );
    }
    let b = 2;
}
"#
		);
		assert_eq!(without_whitespace(&fixed), without_whitespace(original));
	}

	#[test]
	fn negative_indentation_is_clamped_to_zero() {
		let original = "fn f() {\nlet a = 1;\n    let b = [\n  1,\n    ];\n}\n";
		let fixed = fix_first(original);

		assert_eq!(fixed, "fn f() {\nlet a = 1;\nlet b = [\n1,\n];\n}\n");
	}

	#[test]
	fn literal_content_is_never_reindented() {
		let original = "fn f() {\n    let a = 1;\n  let b = \"x\n  y\";\n}\n";
		let fixed = fix_first(original);

		assert_eq!(fixed, "fn f() {\n    let a = 1;\n    let b = \"x\n  y\";\n}\n");
	}

	#[test]
	fn tab_files_are_fixed_with_tabs() {
		let original = "fn f() {\n\tlet a = 1;\n  let b = 2;\n}\n";
		let fixed = fix_first(original);

		assert_eq!(fixed, "fn f() {\n\tlet a = 1;\n\tlet b = 2;\n}\n");
	}

	#[test]
	fn overlapping_edits_keep_the_first() {
		let mut text = "  a\n".to_owned();
		let edits = vec![
			Edit { line: 0, start: 0, end: 2, replacement: "    ".to_owned(), rule: "TEST" },
			Edit { line: 0, start: 1, end: 2, replacement: String::new(), rule: "TEST" },
		];
		let applied = apply_edits(&mut text, edits).expect("apply edits");

		assert_eq!(applied, 1);
		assert_eq!(text, "    a\n");
	}

	#[test]
	fn non_whitespace_edits_are_rejected() {
		let mut text = "  a\n".to_owned();
		let edits =
			vec![Edit { line: 0, start: 0, end: 3, replacement: "  ".to_owned(), rule: "TEST" }];

		assert!(apply_edits(&mut text, edits).is_err());
		assert_eq!(text, "  a\n");
	}
}
