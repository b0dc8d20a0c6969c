use super::shared::{FileContext, MemberExtent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpanShape {
	Single,
	Multi,
}

/// Physical lines that move together when one member is reindented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineSpan {
	pub(crate) shape: SpanShape,
	pub(crate) anchor_line: usize,
	pub(crate) first_line: usize,
	pub(crate) last_line: usize,
	/// Lines inside a multi-line literal or block comment. Their leading
	/// whitespace is content and must not change.
	pub(crate) opaque: Vec<usize>,
	blank: Vec<usize>,
}
impl LineSpan {
	pub(crate) fn lines(&self) -> std::ops::RangeInclusive<usize> {
		self.first_line..=self.last_line
	}

	pub(crate) fn is_opaque(&self, line: usize) -> bool {
		self.opaque.binary_search(&line).is_ok()
	}

	pub(crate) fn shiftable_lines(&self) -> impl Iterator<Item = usize> + '_ {
		self.lines()
			.filter(|line| !self.is_opaque(*line) && self.blank.binary_search(line).is_err())
	}

	/// Whether a fix can move the member's anchor at all.
	pub(crate) fn is_shiftable(&self) -> bool {
		self.shiftable_lines().any(|line| line == self.anchor_line)
	}
}

pub(crate) fn classify(ctx: &FileContext, extent: &MemberExtent) -> LineSpan {
	let last_line = extent.last_line.min(ctx.line_count().saturating_sub(1));
	let first_line = extent.first_line.min(last_line);
	let shape = if first_line == last_line { SpanShape::Single } else { SpanShape::Multi };
	let opaque = match shape {
		SpanShape::Single => Vec::new(),
		SpanShape::Multi => ctx.opaque_lines.range(first_line + 1..=last_line).copied().collect(),
	};
	let blank = (first_line..=last_line).filter(|line| ctx.is_blank_line(*line)).collect();

	LineSpan { shape, anchor_line: extent.anchor_line, first_line, last_line, opaque, blank }
}
