//! CLI configuration: command-line arguments and the project file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use vellum_core::catalog::{EntityRegistry, SchemaConfig};
use vellum_core::security::{EntityRules, FieldAccess, RequestContext, RuleBasedPolicy};
use vellum_core::store::MemoryStore;
use vellum_core::{CompileOptions, CompilerConfig, QueryEngine, DEFAULT_SAMPLE_CAP};

use crate::formatter::OutputFormat;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(version, about = "Compile CMS where clauses into native queries", long_about = None)]
pub struct Args {
    /// Project file (schema, access rules, seed documents).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Collection or global to query.
    #[arg(long)]
    pub collection: String,

    /// Where clause as JSON, or `@path` to read it from a file.
    #[arg(short, long = "where", default_value = "{}")]
    pub where_clause: String,

    /// Sort field, prefixed with `-` for descending order.
    #[arg(long)]
    pub sort: Option<String>,

    /// Locale for localized fields.
    #[arg(long)]
    pub locale: Option<String>,

    /// Authenticated user id.
    #[arg(long)]
    pub user: Option<String>,

    /// Caller role (repeatable).
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Skip read permission checks.
    #[arg(long)]
    pub override_access: bool,

    /// Keep conditions on hidden fields.
    #[arg(long)]
    pub include_hidden: bool,

    /// Check permissions for `near` conditions too.
    #[arg(long)]
    pub gate_near: bool,

    /// Run the compiled query against the project's seed documents.
    #[arg(long)]
    pub execute: bool,

    /// Maximum identifiers collected per relationship sub-query.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
    pub sample_cap: usize,

    /// Output format for executed results.
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,
}

/// Where the `where` clause comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhereSource {
    Inline(String),
    File(PathBuf),
}

impl WhereSource {
    /// Parse a `--where` argument.
    pub fn parse(arg: &str) -> Self {
        match arg.strip_prefix('@') {
            Some(path) => WhereSource::File(PathBuf::from(path)),
            None => WhereSource::Inline(arg.to_string()),
        }
    }

    /// Read and parse the clause.
    pub fn load(&self) -> anyhow::Result<Value> {
        let text = match self {
            WhereSource::Inline(text) => text.clone(),
            WhereSource::File(path) => fs::read_to_string(path)
                .with_context(|| format!("reading where clause from {}", path.display()))?,
        };
        let value: Value = serde_json::from_str(&text).context("parsing where clause")?;
        if !value.is_object() {
            bail!("where clause must be a JSON object");
        }
        Ok(value)
    }
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub project_path: PathBuf,
    pub collection: String,
    pub where_source: WhereSource,
    pub sort: Option<String>,
    pub request: RequestContext,
    pub options: CompileOptions,
    pub compiler: CompilerConfig,
    pub execute: bool,
    pub format: OutputFormat,
}

impl Args {
    /// Convert command-line arguments to the CLI configuration.
    pub fn into_config(self) -> CliConfig {
        let mut request = RequestContext::new("cli");
        if let Some(locale) = self.locale {
            request = request.with_locale(locale);
        }
        if let Some(user) = self.user {
            request = request.with_user(user);
        }
        for role in self.roles {
            request = request.with_role(role);
        }

        let mut options = CompileOptions::new();
        options.override_access = self.override_access;
        options.include_hidden_fields = self.include_hidden;

        let mut compiler = CompilerConfig::new().with_sample_cap(self.sample_cap);
        if self.gate_near {
            compiler = compiler.with_gated_near();
        }

        CliConfig {
            project_path: self.config,
            collection: self.collection,
            where_source: WhereSource::parse(&self.where_clause),
            sort: self.sort,
            request,
            options,
            compiler,
            execute: self.execute,
            format: self.format,
        }
    }
}

/// Project file contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(flatten)]
    pub schema: SchemaConfig,
    /// Field rules per entity.
    #[serde(default)]
    pub access: HashMap<String, EntityRules>,
    /// Access for fields without a rule.
    #[serde(default)]
    pub default_access: FieldAccess,
    /// Role that reads everything.
    #[serde(default)]
    pub admin_role: Option<String>,
    /// Seed documents per entity.
    #[serde(default)]
    pub documents: HashMap<String, Vec<Value>>,
}

impl ProjectConfig {
    /// Load a project file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading project file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing project file {}", path.display()))
    }

    /// Build the read policy described by the access rules.
    pub fn policy(&self) -> RuleBasedPolicy {
        let mut policy = RuleBasedPolicy::from_rules(self.access.clone())
            .with_default_access(self.default_access.clone());
        if let Some(role) = &self.admin_role {
            policy = policy.with_admin_role(role.clone());
        }
        policy
    }

    /// Compile the schema and seed an in-memory store.
    pub fn into_engine(self, config: CompilerConfig) -> anyhow::Result<QueryEngine> {
        let policy = self.policy();
        let registry = EntityRegistry::new(self.schema).context("compiling schema")?;

        let store = MemoryStore::new();
        for entity in registry.collections().chain(registry.globals()) {
            store.create_collection(entity.slug());
        }
        for (slug, documents) in self.documents {
            if registry.lookup(&slug).is_none() {
                bail!("documents given for unknown entity {slug:?}");
            }
            store.insert_many(slug, documents);
        }

        Ok(QueryEngine::with_config(
            Arc::new(registry),
            Arc::new(policy),
            Arc::new(store),
            config,
        ))
    }
}
