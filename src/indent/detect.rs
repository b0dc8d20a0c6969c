use super::{
	baseline::{self, Baseline, MemberLayout},
	groups::{GroupShape, SiblingGroup},
	shared::{FileContext, IndentOptions, Variant, Violation},
	span,
};

/// Everything one detection pass learns about a group. Which parts become
/// diagnostics is decided by [`emit`].
#[derive(Debug, Clone)]
pub(crate) struct GroupReport {
	pub(crate) shape: GroupShape,
	pub(crate) baseline: Baseline,
	pub(crate) baseline_layout: MemberLayout,
	pub(crate) expected_depth: Option<usize>,
	/// Members that begin their line but disagree with the baseline.
	pub(crate) mismatches: Vec<MemberLayout>,
}
impl GroupReport {
	pub(crate) fn baseline_matches_depth(&self) -> bool {
		self.expected_depth.is_none_or(|depth| depth == self.baseline.column)
	}
}

pub(crate) fn detect(
	ctx: &FileContext,
	group: &SiblingGroup,
	options: &IndentOptions,
) -> Option<GroupReport> {
	let laid_out = baseline::layout_members(ctx, group, options);
	let group_first_line = laid_out.first()?.extent.anchor_line;
	let checked = laid_out.iter().filter(|layout| layout.starts_line).copied().collect::<Vec<_>>();

	if checked.len() < 2 {
		return None;
	}

	let first_line = checked[0].extent.anchor_line;

	if checked.iter().all(|layout| layout.extent.anchor_line == first_line) {
		return None;
	}

	let baseline = baseline::resolve_baseline(group.shape, &checked)?;
	let baseline_layout = *checked.iter().find(|layout| layout.index == baseline.member)?;
	let expected_depth = baseline::expected_depth(ctx, group, group_first_line, options);
	let mismatches = checked
		.into_iter()
		.filter(|layout| layout.index != baseline.member && layout.column != baseline.column)
		.collect();

	Some(GroupReport { shape: group.shape, baseline, baseline_layout, expected_depth, mismatches })
}

pub(crate) fn emit(
	ctx: &FileContext,
	report: &GroupReport,
	options: &IndentOptions,
) -> Vec<Violation> {
	let mut violations = Vec::with_capacity(report.mismatches.len() + 1);

	if options.absolute_depth
		&& !report.baseline_matches_depth()
		&& let Some(depth) = report.expected_depth
	{
		violations.push(violation(
			ctx,
			report,
			&report.baseline_layout,
			depth,
			Variant::AbsoluteDepth,
		));
	}
	for layout in &report.mismatches {
		violations.push(violation(ctx, report, layout, report.baseline.column, Variant::Relative));
	}

	violations
}

/// Runs detection and emission for one group.
pub(crate) fn check_group(
	ctx: &FileContext,
	group: &SiblingGroup,
	options: &IndentOptions,
) -> Vec<Violation> {
	detect(ctx, group, options).map(|report| emit(ctx, &report, options)).unwrap_or_default()
}

fn violation(
	ctx: &FileContext,
	report: &GroupReport,
	layout: &MemberLayout,
	expected: usize,
	variant: Variant,
) -> Violation {
	let subject = report.shape.describe();
	let message = match variant {
		Variant::Relative => format!(
			"Indent this {subject} to column {} to match its siblings.",
			expected + 1
		),
		Variant::AbsoluteDepth => format!(
			"Indent this {subject} group to column {} to match its nesting depth.",
			expected + 1
		),
	};
	let fixable = span::classify(ctx, &layout.extent).is_shiftable();

	Violation {
		file: ctx.path.clone(),
		line: layout.extent.anchor_line + 1,
		column: layout.column + 1,
		expected_column: expected + 1,
		rule: variant.rule(),
		variant,
		severity: variant.severity(),
		shape: report.shape,
		message,
		fixable,
		extent: layout.extent,
	}
}
