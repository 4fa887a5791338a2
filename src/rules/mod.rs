//! Rule model: templates, rule sets, selection and the reloadable store.
//!
//! A `RuleSet` is loaded once per configuration change and never mutated afterwards; the
//! `RuleStore` swaps whole rule sets so readers always see a consistent snapshot.

mod model;
pub mod selector;
mod store;

pub use model::{Operation, RedirectRule, Template, TemplateBuilder, TypeCode};
pub use selector::{select, select_for_app, select_named};
pub use store::RuleStore;

use crate::error::EngineResult;
use crate::paths::AliasRoots;

/// Ordered list of templates. Order matters only as a tie-break between equal-length prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    templates: Vec<Template>,
    /// Roots the paths were canonicalized for; None while still in configuration form.
    roots: Option<AliasRoots>,
}

impl RuleSet {
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates, roots: None }
    }

    pub fn empty() -> Self { Self::default() }

    /// Parse a serialized template list. Empty input is an empty rule set; any malformed
    /// record fails the whole load.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::empty());
        }
        let templates: Vec<Template> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(&self.templates)?)
    }

    /// Map every rule path onto the canonical storage root of `roots`.
    pub fn canonicalized(&self, roots: &AliasRoots) -> RuleSet {
        if self.is_canonical_for(roots) {
            return self.clone();
        }
        RuleSet {
            templates: self.templates.iter().map(|t| t.canonicalized(roots)).collect(),
            roots: Some(roots.clone()),
        }
    }

    pub fn is_canonical_for(&self, roots: &AliasRoots) -> bool {
        self.roots.as_ref() == Some(roots)
    }

    pub fn templates(&self) -> &[Template] { &self.templates }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize { self.templates.len() }

    pub fn is_empty(&self) -> bool { self.templates.is_empty() }
}
