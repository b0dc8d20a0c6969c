use ra_ap_syntax::{NodeOrToken, SyntaxElement, SyntaxKind, SyntaxToken};

use super::{
	groups::{GroupShape, Member, SiblingGroup},
	shared::{FileContext, IndentOptions, MemberExtent},
};

/// Placement of one group member on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemberLayout {
	pub(crate) index: usize,
	pub(crate) extent: MemberExtent,
	/// Visual indentation of the anchor line.
	pub(crate) column: usize,
	pub(crate) starts_line: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Baseline {
	pub(crate) column: usize,
	/// Index into the group's members of the member the column came from.
	pub(crate) member: usize,
}

/// First significant token of a member.
///
/// Doc comments and outer attributes decorate a declaration rather than
/// start it, so they never serve as the anchor.
pub(crate) fn anchor_token(element: &SyntaxElement) -> Option<SyntaxToken> {
	match element {
		NodeOrToken::Token(token) => (!token.kind().is_trivia()).then(|| token.clone()),
		NodeOrToken::Node(node) => node
			.children_with_tokens()
			.filter(|child| child.kind() != SyntaxKind::ATTR)
			.find_map(|child| anchor_token(&child)),
	}
}

pub(crate) fn layout_members(
	ctx: &FileContext,
	group: &SiblingGroup,
	options: &IndentOptions,
) -> Vec<MemberLayout> {
	group
		.members
		.iter()
		.enumerate()
		.filter_map(|(index, member)| layout_member(ctx, index, member, options))
		.collect()
}

/// Chooses the reference column among members that begin their own line.
///
/// Attribute groups take the column of the declaration, every other shape
/// takes the first such member in source order.
pub(crate) fn resolve_baseline(shape: GroupShape, laid_out: &[MemberLayout]) -> Option<Baseline> {
	let mut candidates = laid_out.iter().filter(|layout| layout.starts_line);
	let anchor = match shape {
		GroupShape::Attributes => candidates.next_back(),
		_ => candidates.next(),
	}?;

	Some(Baseline { column: anchor.column, member: anchor.index })
}

/// Column the group's members should start at given how deep the group is
/// nested, when that can be derived from the container.
///
/// `first_line` is the anchor line of the group's first member, whether or
/// not that member begins its line. A group opened on that line is hanging
/// and has no depth expectation.
pub(crate) fn expected_depth(
	ctx: &FileContext,
	group: &SiblingGroup,
	first_line: usize,
	options: &IndentOptions,
) -> Option<usize> {
	if !group.shape.has_nesting_depth() {
		return None;
	}
	if group.container.kind() == SyntaxKind::SOURCE_FILE {
		return Some(0);
	}

	let opener = group
		.container
		.children_with_tokens()
		.filter_map(|child| child.into_token())
		.find(|token| {
			matches!(
				token.kind(),
				SyntaxKind::L_CURLY
					| SyntaxKind::L_PAREN
					| SyntaxKind::L_BRACK
					| SyntaxKind::L_ANGLE
					| SyntaxKind::PIPE
					| SyntaxKind::WHERE_KW
			)
		})?;
	let opener_line = ctx.line_of(usize::from(opener.text_range().start()));

	if opener_line == first_line {
		return None;
	}

	Some(ctx.indent_column(opener_line, options.tab_width) + options.indent_width)
}

fn layout_member(
	ctx: &FileContext,
	index: usize,
	member: &Member,
	options: &IndentOptions,
) -> Option<MemberLayout> {
	let anchor = anchor_token(&member.element)?;
	let anchor_offset = usize::from(anchor.text_range().start());
	let anchor_line = ctx.line_of(anchor_offset);
	let (extent_first, last_line) = ctx.range_lines(member.extent);
	let first_line = if extent_first < anchor_line
		&& ctx.is_first_in_line(usize::from(member.extent.start()))
	{
		extent_first
	} else {
		anchor_line
	};

	Some(MemberLayout {
		index,
		extent: MemberExtent { anchor_line, first_line, last_line: last_line.max(anchor_line) },
		column: ctx.indent_column(anchor_line, options.tab_width),
		starts_line: ctx.is_first_in_line(anchor_offset),
	})
}
