use std::{collections::BTreeSet, path::Path};

use ra_ap_syntax::AstNode;
use serde::Serialize;

use super::{
	detect,
	fixes::{self, Edit},
	groups,
	shared::{self, Cancellation, FileContext, IndentOptions, Violation},
};
use crate::prelude::*;

/// Fix-All progress. The last four variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum FixState {
	Scanning,
	Editing,
	/// No violations remain.
	Converged,
	/// The round cap was hit with violations left.
	IterationLimitReached,
	/// Violations remain but none of them can produce an edit.
	Stalled,
	Cancelled,
}
impl FixState {
	pub(crate) fn is_terminal(self) -> bool {
		!matches!(self, Self::Scanning | Self::Editing)
	}

	pub(crate) fn label(self) -> &'static str {
		match self {
			Self::Scanning => "scanning",
			Self::Editing => "editing",
			Self::Converged => "converged",
			Self::IterationLimitReached => "iteration-limit-reached",
			Self::Stalled => "stalled",
			Self::Cancelled => "cancelled",
		}
	}
}

/// Violations found by one detection pass over a file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scan {
	pub(crate) violations: Vec<Violation>,
	/// Set when the pass stopped early; `violations` covers completed groups only.
	pub(crate) cancelled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FixOutcome {
	pub(crate) text: String,
	pub(crate) rounds: usize,
	pub(crate) applied: usize,
	pub(crate) state: FixState,
	pub(crate) remaining: Vec<Violation>,
}

/// Edits chosen for one Fix-All round.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoundPlan {
	pub(crate) edits: Vec<Edit>,
	pub(crate) planned: usize,
	/// Violations left for a later round because an earlier one already moves their lines.
	pub(crate) deferred: usize,
}

pub(crate) fn scan(ctx: &FileContext, options: &IndentOptions, cancel: &Cancellation) -> Scan {
	let mut violations = Vec::new();

	for group in groups::sibling_groups(ctx.source_file.syntax()) {
		if cancel.is_cancelled() {
			return Scan { violations, cancelled: true };
		}

		violations.extend(detect::check_group(ctx, &group, options));
	}

	Scan { violations, cancelled: false }
}

/// Picks the edits for one round.
///
/// Violations arrive with enclosing groups first. Once a member's lines are
/// claimed, any later violation touching them waits for the next scan, where
/// its columns reflect the enclosing shift.
pub(crate) fn plan_round(
	ctx: &FileContext,
	violations: &[Violation],
	options: &IndentOptions,
) -> RoundPlan {
	let mut claimed = BTreeSet::new();
	let mut plan = RoundPlan::default();

	for violation in violations {
		let extent = violation.extent;

		if claimed.range(extent.first_line..=extent.last_line).next().is_some() {
			plan.deferred += 1;

			continue;
		}

		let edits = fixes::edits_for_violation(ctx, violation, options);

		if edits.is_empty() {
			continue;
		}

		claimed.extend(extent.first_line..=extent.last_line);

		plan.planned += 1;
		plan.edits.extend(edits);
	}

	plan
}

/// Repeats detect-then-edit on `text` until nothing is left to fix, the round
/// cap is reached, no edit can be made, or `cancel` fires. Each round replaces
/// the whole text, so a cancelled run never returns a half-edited snapshot.
pub(crate) fn fix_all(
	path: &Path,
	text: &str,
	options: &IndentOptions,
	cancel: &Cancellation,
) -> Result<FixOutcome> {
	let mut outcome = FixOutcome {
		text: text.to_owned(),
		rounds: 0,
		applied: 0,
		state: FixState::Scanning,
		remaining: Vec::new(),
	};

	while !outcome.state.is_terminal() {
		let Some(ctx) = shared::read_file_context_from_text(path, outcome.text.clone()) else {
			outcome.state = FixState::Converged;

			break;
		};
		let found = scan(&ctx, options, cancel);

		outcome.state = after_scan(&found, outcome.rounds, options.max_rounds);
		outcome.remaining = found.violations;

		if outcome.state != FixState::Editing {
			break;
		}

		let plan = plan_round(&ctx, &outcome.remaining, options);

		if plan.edits.is_empty() {
			outcome.state = FixState::Stalled;

			break;
		}
		if cancel.is_cancelled() {
			outcome.state = FixState::Cancelled;

			break;
		}

		let mut next = ctx.text;
		let applied = fixes::apply_edits(&mut next, plan.edits)?;

		outcome.text = next;
		outcome.rounds += 1;
		outcome.applied += applied;

		tracing::debug!(
			path = %path.display(),
			round = outcome.rounds,
			applied,
			planned = plan.planned,
			deferred = plan.deferred,
			"Applied indentation fix round."
		);

		outcome.state = FixState::Scanning;
	}

	match outcome.state {
		FixState::IterationLimitReached => tracing::warn!(
			path = %path.display(),
			rounds = outcome.rounds,
			remaining = outcome.remaining.len(),
			"Stopped fixing at the round cap."
		),
		FixState::Stalled => tracing::warn!(
			path = %path.display(),
			remaining = outcome.remaining.len(),
			"Remaining indentation violations cannot be fixed automatically."
		),
		_ => {},
	}

	Ok(outcome)
}

fn after_scan(scan: &Scan, rounds: usize, max_rounds: usize) -> FixState {
	if scan.cancelled {
		FixState::Cancelled
	} else if scan.violations.is_empty() {
		FixState::Converged
	} else if rounds >= max_rounds {
		FixState::IterationLimitReached
	} else {
		FixState::Editing
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const NESTED_MATCH: &str = r#"fn f(x: u8) {
    match x {
        0 => {
            a();
            b();
        },
      1 => {
            c();
              d();
          },
    }
}
"#;

	fn fix(text: &str, options: &IndentOptions) -> FixOutcome {
		fix_all(Path::new("driver.rs"), text, options, &Cancellation::default()).expect("fix all")
	}

	fn rescan(text: &str) -> Vec<Violation> {
		let ctx = shared::read_file_context_from_text(Path::new("driver.rs"), text.to_owned())
			.expect("has ctx");

		scan(&ctx, &IndentOptions::default(), &Cancellation::default()).violations
	}

	#[test]
	fn nested_groups_converge_in_two_rounds() {
		let outcome = fix(NESTED_MATCH, &IndentOptions::default());

		assert_eq!(outcome.state, FixState::Converged);
		assert_eq!(outcome.rounds, 2);
		assert!(outcome.remaining.is_empty());
		assert!(outcome.text.contains(
			"        1 => {\n              c();\n              d();\n            },\n"
		));
		assert!(rescan(&outcome.text).is_empty());
	}

	#[test]
	fn converged_output_is_a_fixpoint() {
		let first = fix(NESTED_MATCH, &IndentOptions::default());
		let second = fix(&first.text, &IndentOptions::default());

		assert_eq!(second.state, FixState::Converged);
		assert_eq!(second.rounds, 0);
		assert_eq!(second.applied, 0);
		assert_eq!(second.text, first.text);
	}

	#[test]
	fn round_cap_surfaces_remaining_violations() {
		let outcome = fix(NESTED_MATCH, &IndentOptions { max_rounds: 1, ..Default::default() });

		assert_eq!(outcome.state, FixState::IterationLimitReached);
		assert_eq!(outcome.rounds, 1);
		assert_eq!(outcome.remaining.len(), 1);
		assert_eq!(outcome.remaining[0].line, 9);
	}

	#[test]
	fn inner_violation_is_deferred_behind_its_enclosing_member() {
		let ctx = shared::read_file_context_from_text(Path::new("driver.rs"), NESTED_MATCH.into())
			.expect("has ctx");
		let found = scan(&ctx, &IndentOptions::default(), &Cancellation::default()).violations;
		let plan = plan_round(&ctx, &found, &IndentOptions::default());

		assert_eq!(found.len(), 2);
		assert_eq!(plan.planned, 1);
		assert_eq!(plan.deferred, 1);
		assert_eq!(plan.edits.len(), 4);
	}

	#[test]
	fn unfixable_violations_plan_nothing() {
		let ctx = shared::read_file_context_from_text(Path::new("driver.rs"), NESTED_MATCH.into())
			.expect("has ctx");
		let mut found = scan(&ctx, &IndentOptions::default(), &Cancellation::default()).violations;

		for violation in &mut found {
			violation.fixable = false;
		}

		let plan = plan_round(&ctx, &found, &IndentOptions::default());

		assert!(plan.edits.is_empty());
		assert_eq!(plan.deferred, 0);
	}

	#[test]
	fn cancelled_run_keeps_the_original_text() {
		let cancel = Cancellation::default();

		cancel.cancel();

		let outcome =
			fix_all(Path::new("driver.rs"), NESTED_MATCH, &IndentOptions::default(), &cancel)
				.expect("fix all");

		assert_eq!(outcome.state, FixState::Cancelled);
		assert_eq!(outcome.rounds, 0);
		assert_eq!(outcome.text, NESTED_MATCH);
	}

	#[test]
	fn scan_outcomes_map_to_states() {
		let clean = Scan::default();
		let dirty = Scan { violations: rescan(NESTED_MATCH), cancelled: false };
		let cancelled = Scan { violations: Vec::new(), cancelled: true };

		assert_eq!(after_scan(&clean, 0, 3), FixState::Converged);
		assert_eq!(after_scan(&dirty, 0, 3), FixState::Editing);
		assert_eq!(after_scan(&dirty, 3, 3), FixState::IterationLimitReached);
		assert_eq!(after_scan(&cancelled, 0, 3), FixState::Cancelled);
		assert!(FixState::Stalled.is_terminal());
		assert!(!FixState::Scanning.is_terminal());
	}

	#[test]
	fn empty_text_converges_immediately() {
		let outcome = fix("", &IndentOptions::default());

		assert_eq!(outcome.state, FixState::Converged);
		assert_eq!(outcome.rounds, 0);
	}
}
