//! Redirect resolution.
//!
//! Forward: pick the single best redirect for a path (longest matching source across every
//! selected template, first seen wins ties) and rewrite the path onto its target.
//! Backward: map a physical path under some target back to the location the app believes in.
//! Neither direction is applied more than once per call, so a target nested under its own source
//! cannot chain.

use crate::paths;
use crate::rules::{RedirectRule, Template};

/// The redirect chosen for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectMatch {
    pub rule: RedirectRule,
    /// Name of the template the rule came from.
    pub template: String,
    /// True when the match came from a deprecated single-target template.
    pub legacy: bool,
}

impl RedirectMatch {
    pub fn apply(&self, path: &str) -> String {
        apply(&self.rule, path)
    }
}

/// Longest-source match among `redirect_rules`; legacy pairs are consulted only when none match.
pub fn resolve_redirect(templates: &[&Template], path: &str) -> Option<RedirectMatch> {
    let mut best: Option<RedirectMatch> = None;
    for t in templates {
        for rule in t.redirect_rules() {
            consider(&mut best, t, rule.clone(), path, false);
        }
    }
    if best.is_some() {
        return best;
    }
    for t in templates {
        for rule in t.legacy_rules() {
            consider(&mut best, t, rule, path, true);
        }
    }
    best
}

fn consider(best: &mut Option<RedirectMatch>, template: &Template, rule: RedirectRule, path: &str, legacy: bool) {
    if !paths::contains(&rule.source, path) {
        return;
    }
    // Strictly longer only: equal lengths keep the first seen
    let better = best.as_ref().map_or(true, |b| rule.source.len() > b.rule.source.len());
    if better {
        *best = Some(RedirectMatch { rule, template: template.name().to_string(), legacy });
    }
}

/// Replace the rule's source prefix with its target, keeping the subtree layout.
/// A path the rule does not cover is returned unchanged.
pub fn apply(rule: &RedirectRule, path: &str) -> String {
    paths::replace_prefix(path, &rule.source, &rule.target).unwrap_or_else(|| path.to_string())
}

/// Reverse mapping `target -> source` over every rule of a template selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InversionMap {
    pairs: Vec<RedirectRule>,
}

impl InversionMap {
    pub fn build(templates: &[&Template]) -> Self {
        let mut pairs: Vec<RedirectRule> = Vec::new();
        let all = templates
            .iter()
            .flat_map(|t| t.redirect_rules().iter().cloned().chain(t.legacy_rules()));
        for rule in all {
            if !pairs.contains(&rule) {
                pairs.push(rule);
            }
        }
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

    pub fn len(&self) -> usize { self.pairs.len() }

    /// The externally visible path for `physical`, or None when no target covers it.
    /// The longest matching target wins; ties keep rule order.
    pub fn invert(&self, physical: &str) -> Option<String> {
        let mut best: Option<&RedirectRule> = None;
        for rule in &self.pairs {
            if paths::contains(&rule.target, physical)
                && best.map_or(true, |b| rule.target.len() > b.target.len())
            {
                best = Some(rule);
            }
        }
        best.and_then(|r| paths::replace_prefix(physical, &r.target, &r.source))
    }

    pub fn invert_or_same(&self, physical: &str) -> String {
        self.invert(physical).unwrap_or_else(|| physical.to_string())
    }
}

/// Externally visible form of `physical` under the given templates.
pub fn invert(templates: &[&Template], physical: &str) -> String {
    InversionMap::build(templates).invert_or_same(physical)
}
