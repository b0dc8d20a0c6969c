//! Sibling-group catalogue.
//!
//! Every container shape that holds indentation-bearing siblings is one
//! variant of [`GroupShape`]. Member extraction is a single exhaustive match,
//! so a new shape cannot be added without deciding how its members are found.

use ra_ap_syntax::{
	AstNode, Direction, NodeOrToken, SyntaxElement, SyntaxKind, SyntaxNode, TextRange,
	ast::{self, AssocItem, Expr, GenericArg, GenericParam, Item, Pat, Stmt},
};
use serde::Serialize;

use super::baseline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum GroupShape {
	/// Items of a file, an inline module, or an extern block.
	ModuleItems,
	/// Items of an `impl` or `trait` body.
	AssocItems,
	RecordFields,
	TupleFields,
	Variants,
	/// Statements and the tail expression of a block.
	Statements,
	MatchArms,
	Params,
	Args,
	GenericParams,
	GenericArgs,
	/// Outer attributes plus the declaration they decorate.
	Attributes,
	ArrayElements,
	TupleElements,
	RecordExprFields,
	PatternElements,
	WherePredicates,
	UseTrees,
	/// A label and the loop or block it names.
	LabeledStatement,
}
impl GroupShape {
	fn of_container(kind: SyntaxKind) -> Option<Self> {
		let shape = match kind {
			SyntaxKind::SOURCE_FILE | SyntaxKind::ITEM_LIST | SyntaxKind::EXTERN_ITEM_LIST =>
				Self::ModuleItems,
			SyntaxKind::ASSOC_ITEM_LIST => Self::AssocItems,
			SyntaxKind::RECORD_FIELD_LIST => Self::RecordFields,
			SyntaxKind::TUPLE_FIELD_LIST => Self::TupleFields,
			SyntaxKind::VARIANT_LIST => Self::Variants,
			SyntaxKind::STMT_LIST => Self::Statements,
			SyntaxKind::MATCH_ARM_LIST => Self::MatchArms,
			SyntaxKind::PARAM_LIST => Self::Params,
			SyntaxKind::ARG_LIST => Self::Args,
			SyntaxKind::GENERIC_PARAM_LIST => Self::GenericParams,
			SyntaxKind::GENERIC_ARG_LIST => Self::GenericArgs,
			SyntaxKind::ARRAY_EXPR => Self::ArrayElements,
			SyntaxKind::TUPLE_EXPR => Self::TupleElements,
			SyntaxKind::RECORD_EXPR_FIELD_LIST => Self::RecordExprFields,
			SyntaxKind::TUPLE_PAT
			| SyntaxKind::SLICE_PAT
			| SyntaxKind::TUPLE_STRUCT_PAT
			| SyntaxKind::RECORD_PAT_FIELD_LIST => Self::PatternElements,
			SyntaxKind::WHERE_CLAUSE => Self::WherePredicates,
			SyntaxKind::USE_TREE_LIST => Self::UseTrees,
			SyntaxKind::LOOP_EXPR
			| SyntaxKind::WHILE_EXPR
			| SyntaxKind::FOR_EXPR
			| SyntaxKind::BLOCK_EXPR => Self::LabeledStatement,
			_ => return None,
		};

		Some(shape)
	}

	pub(crate) fn describe(self) -> &'static str {
		match self {
			Self::ModuleItems | Self::AssocItems => "item",
			Self::RecordFields | Self::TupleFields | Self::RecordExprFields => "field",
			Self::Variants => "variant",
			Self::Statements => "statement",
			Self::MatchArms => "match arm",
			Self::Params => "parameter",
			Self::Args => "argument",
			Self::GenericParams => "generic parameter",
			Self::GenericArgs => "generic argument",
			Self::Attributes => "attribute",
			Self::ArrayElements | Self::TupleElements => "element",
			Self::PatternElements => "pattern",
			Self::WherePredicates => "where predicate",
			Self::UseTrees => "use tree",
			Self::LabeledStatement => "labeled statement",
		}
	}

	/// Whether members sit one level inside an opening delimiter.
	pub(crate) fn has_nesting_depth(self) -> bool {
		!matches!(self, Self::Attributes | Self::LabeledStatement)
	}
}

/// One sibling element plus the source range that moves with it.
#[derive(Debug, Clone)]
pub(crate) struct Member {
	pub(crate) element: SyntaxElement,
	pub(crate) extent: TextRange,
}
impl Member {
	fn node(node: SyntaxNode) -> Self {
		let extent = node.text_range();

		Self { element: NodeOrToken::Node(node), extent }
	}
}

#[derive(Debug, Clone)]
pub(crate) struct SiblingGroup {
	pub(crate) shape: GroupShape,
	pub(crate) container: SyntaxNode,
	pub(crate) members: Vec<Member>,
}

/// Enumerates every sibling group under `root` in preorder, so an enclosing
/// group is always yielded before the groups nested inside its members.
pub(crate) fn sibling_groups(root: &SyntaxNode) -> impl Iterator<Item = SiblingGroup> + '_ {
	root.descendants().flat_map(|node| groups_at(&node))
}

fn groups_at(node: &SyntaxNode) -> Vec<SiblingGroup> {
	if node.children().any(|child| child.kind() == SyntaxKind::ERROR) {
		return Vec::new();
	}

	let mut groups = Vec::with_capacity(2);

	if let Some(group) = attribute_group(node) {
		groups.push(group);
	}
	if let Some(shape) = GroupShape::of_container(node.kind()) {
		let members = members_of(shape, node);

		if members.len() >= 2 {
			groups.push(SiblingGroup { shape, container: node.clone(), members });
		}
	}

	groups
}

fn members_of(shape: GroupShape, node: &SyntaxNode) -> Vec<Member> {
	let select = |keep: fn(SyntaxKind) -> bool| {
		node.children().filter(|child| keep(child.kind())).map(Member::node).collect::<Vec<_>>()
	};

	match shape {
		GroupShape::ModuleItems => select(Item::can_cast),
		GroupShape::AssocItems => select(AssocItem::can_cast),
		GroupShape::RecordFields => select(|kind| kind == SyntaxKind::RECORD_FIELD),
		GroupShape::TupleFields => select(|kind| kind == SyntaxKind::TUPLE_FIELD),
		GroupShape::Variants => select(|kind| kind == SyntaxKind::VARIANT),
		GroupShape::Statements => select(|kind| Stmt::can_cast(kind) || Expr::can_cast(kind)),
		GroupShape::MatchArms => select(|kind| kind == SyntaxKind::MATCH_ARM),
		GroupShape::Params =>
			select(|kind| matches!(kind, SyntaxKind::PARAM | SyntaxKind::SELF_PARAM)),
		GroupShape::Args | GroupShape::TupleElements => select(Expr::can_cast),
		GroupShape::GenericParams => select(GenericParam::can_cast),
		GroupShape::GenericArgs => select(GenericArg::can_cast),
		GroupShape::ArrayElements => {
			// `[value; count]` is a repeat expression, not a list.
			let is_repeat = node
				.children_with_tokens()
				.any(|child| child.kind() == SyntaxKind::SEMICOLON);

			if is_repeat { Vec::new() } else { select(Expr::can_cast) }
		},
		GroupShape::RecordExprFields => select(|kind| kind == SyntaxKind::RECORD_EXPR_FIELD),
		GroupShape::PatternElements => select(|kind| {
			Pat::can_cast(kind) || kind == SyntaxKind::RECORD_PAT_FIELD
		}),
		GroupShape::WherePredicates => select(|kind| kind == SyntaxKind::WHERE_PRED),
		GroupShape::UseTrees => select(|kind| kind == SyntaxKind::USE_TREE),
		GroupShape::LabeledStatement => label_chain(node),
		GroupShape::Attributes => Vec::new(),
	}
}

/// `'label:` followed by the keyword or block it names, which carries the
/// rest of the statement with it.
fn label_chain(node: &SyntaxNode) -> Vec<Member> {
	let Some(label) = node.children().find(|child| child.kind() == SyntaxKind::LABEL) else {
		return Vec::new();
	};
	let Some(rest) = label
		.siblings_with_tokens(Direction::Next)
		.skip(1)
		.find(|element| !element.kind().is_trivia())
	else {
		return Vec::new();
	};
	let rest_extent = TextRange::new(rest.text_range().start(), node.text_range().end());

	vec![Member::node(label), Member { element: rest, extent: rest_extent }]
}

/// Outer attributes of `node` followed by the declaration they decorate.
fn attribute_group(node: &SyntaxNode) -> Option<SiblingGroup> {
	let mut members = node
		.children()
		.filter_map(ast::Attr::cast)
		.filter(|attr| attr.excl_token().is_none())
		.map(|attr| Member::node(attr.syntax().clone()))
		.collect::<Vec<_>>();

	if members.is_empty() {
		return None;
	}

	let declaration = baseline::anchor_token(&NodeOrToken::Node(node.clone()))?;
	let extent = TextRange::new(declaration.text_range().start(), node.text_range().end());

	members.push(Member { element: NodeOrToken::Token(declaration), extent });

	Some(SiblingGroup { shape: GroupShape::Attributes, container: node.clone(), members })
}
