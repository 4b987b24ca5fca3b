// src/task/spec.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::TaskKind;

/// Parameter naming the emission source type a pipeline step works on.
pub const SOURCETYPE_PARAM: &str = "sourcetype";

/// Description of one operation the user asked for.
///
/// `params` are opaque to the supervisor and passed through to the invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub kind: TaskKind,
    /// Human label shown in progress bars and dialogs.
    pub description: String,
    pub params: BTreeMap<String, String>,
    /// Validate only. Decides whether a parsed summary is a validation or an
    /// import summary. Set by default for [`TaskKind::Validate`].
    pub dry_run: bool,
    /// After a successful rasterization, load the new rasters onto the map.
    pub load_after_creation: bool,
    /// Directory the operation writes its output files into.
    pub output_dir: Option<PathBuf>,
}

impl TaskSpec {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            description: default_description(kind).to_string(),
            params: BTreeMap::new(),
            dry_run: kind == TaskKind::Validate,
            load_after_creation: false,
            output_dir: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn load_after_creation(mut self, load: bool) -> Self {
        self.load_after_creation = load;
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn sourcetype(&self) -> Option<&str> {
        self.param(SOURCETYPE_PARAM)
    }
}

fn default_description(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Import => "Import",
        TaskKind::Validate => "Validate",
        TaskKind::Export => "Export",
        TaskKind::RasterizeEmissions => "Rasterize emissions",
        TaskKind::AggregateEmissions => "Aggregate emissions",
        TaskKind::RebuildEmissionTable => "Rebuild emission table",
        TaskKind::LoadStaticLayer => "Load static layer",
    }
}
