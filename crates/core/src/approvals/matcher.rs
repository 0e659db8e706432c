use regex::{Regex, RegexBuilder};

use crate::approvals::normalize_key;
use crate::domain::approval::{ApprovalRule, MatchingCriteria};
use crate::domain::entity::ApprovalEntity;

/// Returns every rule whose entity type equals the entity's and whose criteria
/// accept it. Rules are returned in input order; each match spawns its own
/// approval chain, so no ranking is applied.
pub fn match_rules<'a>(entity: &ApprovalEntity, rules: &'a [ApprovalRule]) -> Vec<&'a ApprovalRule> {
    let entity_type = entity.entity_type();
    rules
        .iter()
        .filter(|rule| rule.entity_type == entity_type)
        .filter(|rule| criteria_accept(&rule.criteria, entity))
        .collect()
}

pub(crate) fn compile_title_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

// Only populated criteria that apply to the entity kind are checked; with none
// populated the rule is unconstrained. Otherwise one satisfied criterion is
// enough.
fn criteria_accept(criteria: &MatchingCriteria, entity: &ApprovalEntity) -> bool {
    let mut checks = Vec::with_capacity(4);

    if !criteria.stages.is_empty() {
        checks.push(criteria.stages.contains(&entity.stage()));
    }

    if let Some(priority) = entity.priority() {
        if !criteria.priorities.is_empty() {
            checks.push(criteria.priorities.contains(&priority));
        }
    }

    if let Some(category) = entity.category() {
        if !criteria.document_categories.is_empty() {
            let category = normalize_key(category);
            checks.push(
                criteria
                    .document_categories
                    .iter()
                    .any(|candidate| normalize_key(candidate) == category),
            );
        }
    }

    if let Some(pattern) = criteria.title_pattern.as_deref().filter(|p| !p.trim().is_empty()) {
        checks.push(title_matches(pattern, entity.title()));
    }

    checks.is_empty() || checks.into_iter().any(|satisfied| satisfied)
}

fn title_matches(pattern: &str, title: &str) -> bool {
    match compile_title_pattern(pattern) {
        Ok(regex) => regex.is_match(title),
        Err(error) => {
            tracing::warn!(
                event_name = "approval.rule.invalid_title_pattern",
                pattern,
                error = %error,
                "ignoring approval rule title pattern that does not compile"
            );
            false
        }
    }
}
