//! Rule data contracts. Templates are validated on the way in and immutable afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::identity::AppIdentity;
use crate::paths::{self, AliasRoots};

/// Coarse content classification, produced by a `TypeClassifier`.
pub type TypeCode = i32;

/// Operation kinds a template can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Query,
    Insert,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Insert => "insert",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Operation::Query),
            "insert" => Ok(Operation::Insert),
            other => Err(EngineError::unsupported(
                "unsupported_operation".to_string(),
                format!("unsupported operation kind '{}'", other),
            )),
        }
    }
}

/// Transparent relocation of the subtree at `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedirectRule {
    pub source: String,
    pub target: String,
}

impl RedirectRule {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }

    fn validated(self, template: &str) -> EngineResult<Self> {
        let source = paths::clean(&self.source);
        let target = paths::clean(&self.target);
        if source.is_empty() || target.is_empty() {
            return Err(EngineError::config(
                "empty_redirect_path".to_string(),
                format!("template '{}': redirect source and target must not be empty", template),
            ));
        }
        Ok(Self { source, target })
    }
}

/// Serialized form of a template, field names as written by the rule editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TemplateRecord {
    template_name: String,
    hook_operation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apply_to_app: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permitted_media_types: Option<Vec<TypeCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_rules: Option<Vec<RedirectRule>>,
    /// Deprecated single-target redirect; `filter_path` entries act as its sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_path: Option<String>,
}

/// A named policy entry: scope, visibility constraints and redirect mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TemplateRecord", into = "TemplateRecord")]
pub struct Template {
    name: String,
    operations: BTreeSet<Operation>,
    apply_to_app: Option<BTreeSet<AppIdentity>>,
    permitted_types: Option<BTreeSet<TypeCode>>,
    hide_prefixes: Option<Vec<String>>,
    redirect_rules: Vec<RedirectRule>,
    legacy_redirect_target: Option<String>,
}

impl Template {
    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(name)
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn operations(&self) -> &BTreeSet<Operation> { &self.operations }

    /// None means the template applies to every caller.
    pub fn apply_to_app(&self) -> Option<&BTreeSet<AppIdentity>> { self.apply_to_app.as_ref() }

    /// None means every type is permitted.
    pub fn permitted_types(&self) -> Option<&BTreeSet<TypeCode>> { self.permitted_types.as_ref() }

    pub fn hide_prefixes(&self) -> &[String] { self.hide_prefixes.as_deref().unwrap_or(&[]) }

    pub fn redirect_rules(&self) -> &[RedirectRule] { &self.redirect_rules }

    pub fn legacy_redirect_target(&self) -> Option<&str> { self.legacy_redirect_target.as_deref() }

    pub fn handles(&self, op: Operation) -> bool { self.operations.contains(&op) }

    pub fn applies_to(&self, caller: &AppIdentity) -> bool {
        match &self.apply_to_app {
            None => true,
            Some(apps) => apps.contains(caller),
        }
    }

    pub fn permits_type(&self, type_code: TypeCode) -> bool {
        match &self.permitted_types {
            None => true,
            Some(types) => types.contains(&type_code),
        }
    }

    /// Legacy pairs `{hide_prefix -> legacy target}`, empty when no legacy target is set.
    pub fn legacy_rules(&self) -> impl Iterator<Item = RedirectRule> + '_ {
        let target = self.legacy_redirect_target.as_deref();
        self.hide_prefixes()
            .iter()
            .filter_map(move |src| target.map(|t| RedirectRule::new(src.clone(), t)))
    }

    /// Same template with every path mapped onto the canonical storage root.
    pub fn canonicalized(&self, roots: &AliasRoots) -> Template {
        Template {
            hide_prefixes: self
                .hide_prefixes
                .as_ref()
                .map(|v| v.iter().map(|p| roots.canonicalize(p)).collect()),
            redirect_rules: self
                .redirect_rules
                .iter()
                .map(|r| RedirectRule::new(roots.canonicalize(&r.source), roots.canonicalize(&r.target)))
                .collect(),
            legacy_redirect_target: self.legacy_redirect_target.as_ref().map(|t| roots.canonicalize(t)),
            ..self.clone()
        }
    }
}

impl TryFrom<TemplateRecord> for Template {
    type Error = EngineError;

    fn try_from(rec: TemplateRecord) -> Result<Self, Self::Error> {
        let name = rec.template_name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::config("empty_template_name", "template name must not be empty"));
        }

        let mut operations = BTreeSet::new();
        for op in &rec.hook_operation {
            let parsed = op.parse::<Operation>().map_err(|_| {
                EngineError::config(
                    "unknown_operation".to_string(),
                    format!("template '{}': unknown operation '{}'", name, op),
                )
            })?;
            operations.insert(parsed);
        }

        let apply_to_app = rec
            .apply_to_app
            .map(|apps| apps.into_iter().map(AppIdentity::from).collect::<BTreeSet<_>>());
        let permitted_types = rec.permitted_media_types.map(|t| t.into_iter().collect::<BTreeSet<_>>());

        let hide_prefixes = match rec.filter_path {
            None => None,
            Some(list) => {
                let mut out = Vec::with_capacity(list.len());
                for p in list {
                    let cleaned = paths::clean(&p);
                    if cleaned.is_empty() {
                        return Err(EngineError::config(
                            "empty_hide_prefix".to_string(),
                            format!("template '{}': hide prefix must not be empty", name),
                        ));
                    }
                    out.push(cleaned);
                }
                Some(out)
            }
        };

        let redirect_rules = rec
            .redirect_rules
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.validated(&name))
            .collect::<EngineResult<Vec<_>>>()?;

        // Blank legacy targets were written by older editors for "no redirect"
        let legacy_redirect_target = rec
            .redirect_path
            .map(|t| paths::clean(&t))
            .filter(|t| !t.is_empty());

        Ok(Template {
            name,
            operations,
            apply_to_app,
            permitted_types,
            hide_prefixes,
            redirect_rules,
            legacy_redirect_target,
        })
    }
}

impl From<Template> for TemplateRecord {
    fn from(t: Template) -> Self {
        TemplateRecord {
            template_name: t.name,
            hook_operation: t.operations.iter().map(|o| o.as_str().to_string()).collect(),
            apply_to_app: t.apply_to_app.map(|apps| apps.into_iter().map(|a| a.as_str().to_string()).collect()),
            permitted_media_types: t.permitted_types.map(|s| s.into_iter().collect()),
            filter_path: t.hide_prefixes,
            redirect_rules: if t.redirect_rules.is_empty() { None } else { Some(t.redirect_rules) },
            redirect_path: t.legacy_redirect_target,
        }
    }
}

/// Programmatic construction; goes through the same validation as JSON loading.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    record: TemplateRecord,
}

impl TemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: TemplateRecord {
                template_name: name.into(),
                hook_operation: Vec::new(),
                apply_to_app: None,
                permitted_media_types: None,
                filter_path: None,
                redirect_rules: None,
                redirect_path: None,
            },
        }
    }

    pub fn operation(mut self, op: Operation) -> Self {
        self.record.hook_operation.push(op.as_str().to_string());
        self
    }

    pub fn app(mut self, app: impl Into<String>) -> Self {
        self.record.apply_to_app.get_or_insert_with(Vec::new).push(app.into());
        self
    }

    pub fn permitted_type(mut self, code: TypeCode) -> Self {
        self.record.permitted_media_types.get_or_insert_with(Vec::new).push(code);
        self
    }

    pub fn hide_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record.filter_path.get_or_insert_with(Vec::new).push(prefix.into());
        self
    }

    pub fn redirect(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.record.redirect_rules.get_or_insert_with(Vec::new).push(RedirectRule::new(source, target));
        self
    }

    pub fn legacy_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.record.redirect_path = Some(target.into());
        self
    }

    pub fn build(self) -> EngineResult<Template> {
        Template::try_from(self.record)
    }
}
