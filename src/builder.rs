//! Build orchestrator: per-file transforms in parallel, then whole-graph optimization.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CachedTransform, TransformCache};
use crate::config::{BuildContext, PipelineConfig};
use crate::error::{ConfigError, ConfigResult, PipelineError, PipelineResult, StepError};
use crate::html::render_document;
use crate::manifest::{AssetManifest, MANIFEST_FILE};
use crate::mode::BuildMode;
use crate::models::{
  Artifact, ArtifactKind, BuildWarning, ModuleClass, ModuleRecord, SourceFile, WarningKind,
};
use crate::optimize::{
  Chunk, ChunkKind, OptimizationPlan, OptimizationPlanner, SourceMapStyle, assemble_chunks,
  runtime_source,
};
use crate::output::{ContentHash, LogicalName, NamingSurface, OutputNamer, write_artifacts};
use crate::paths::{initial_format, is_image, normalize_path};
use crate::rules::{RuleKind, RuleMatcher, RuleTable};
use crate::transform::builtins::{INLINE_STEP, RESOURCE_STEP};
use crate::transform::{
  AssetStrategy, ContentFormat, FileMeta, MinimizeInput, TransformChain, TransformChainBuilder,
  TransformInput, TransformRegistry,
};

/// Invocation parameters of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildParams {
  /// Build mode.
  pub mode: BuildMode,
  /// Entry name to entry module path.
  pub entries: BTreeMap<String, String>,
  /// Destination directory; required in production.
  pub output_dir: Option<PathBuf>,
  /// Content of the HTML template; the built-in document is used when absent.
  pub html_template: Option<String>,
}

impl BuildParams {
  /// Parameters for `mode` without entries.
  pub fn new(mode: BuildMode) -> Self {
    Self {
      mode,
      ..Self::default()
    }
  }

  /// Add an entry point.
  pub fn entry(mut self, name: &str, path: &str) -> Self {
    self.entries.insert(name.to_string(), normalize_path(path));
    self
  }

  /// Set the output directory.
  pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.output_dir = Some(dir.into());
    self
  }

  /// Set the HTML template content.
  pub fn html_template(mut self, template: impl Into<String>) -> Self {
    self.html_template = Some(template.into());
    self
  }

  fn validate(&self, files: &[SourceFile]) -> ConfigResult<()> {
    if self.entries.is_empty() {
      return Err(ConfigError::NoEntries);
    }
    if self.mode.is_production() && self.output_dir.is_none() {
      return Err(ConfigError::MissingOutputDir);
    }

    let known: BTreeSet<&str> = files.iter().map(|file| file.path.as_str()).collect();
    for (name, path) in &self.entries {
      if !known.contains(path.as_str()) {
        return Err(ConfigError::EntryNotFound {
          name: name.clone(),
          path: path.clone(),
        });
      }
    }
    Ok(())
  }
}

/// Everything a successful build produced, held in memory until emitted.
#[derive(Debug, Clone)]
pub struct BuildResult {
  /// Mode of the build.
  pub mode: BuildMode,
  /// Plan the optimization phase followed.
  pub plan: OptimizationPlan,
  /// Named artifacts sorted by path.
  pub artifacts: Vec<Artifact>,
  /// Non-fatal findings.
  pub warnings: Vec<BuildWarning>,
  /// Modules whose source changed since the previous run of the same orchestrator.
  pub changed_modules: Vec<String>,
  /// Modules present in the previous run but not in this one.
  pub removed_modules: Vec<String>,
  /// The manifest also emitted as an artifact.
  pub manifest: AssetManifest,
  /// Output directory from the build parameters.
  pub output_dir: Option<PathBuf>,
  /// Transform cache counters after the build.
  pub cache: CacheStats,
}

impl BuildResult {
  /// Artifact emitted at `path`.
  pub fn artifact(&self, path: &str) -> Option<&Artifact> {
    self.artifacts.iter().find(|artifact| artifact.path == path)
  }

  /// Artifacts of one kind.
  pub fn artifacts_of(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
    self
      .artifacts
      .iter()
      .filter(move |artifact| artifact.kind == kind)
  }

  /// Write the artifacts below `dir`; see [`write_artifacts`].
  pub fn emit(&self, dir: &Path, clean: bool) -> anyhow::Result<Vec<PathBuf>> {
    write_artifacts(&self.artifacts, dir, clean)
  }
}

/// Composes matching, chain building, transform execution and the optimization phase.
///
/// The rule table is compiled once and never changes. Transform results are memoized
/// across runs, and the source hashes of the last successful run drive
/// [`BuildResult::changed_modules`].
#[derive(Debug)]
pub struct BuildOrchestrator {
  config: PipelineConfig,
  registry: TransformRegistry,
  table: RuleTable,
  planner: OptimizationPlanner,
  cache: TransformCache,
  previous: BTreeMap<String, ContentHash>,
}

impl BuildOrchestrator {
  /// Validate `config` against `registry` and compile the rule table.
  pub fn new(config: PipelineConfig, registry: TransformRegistry) -> ConfigResult<Self> {
    let table = RuleTable::compile(&config.rules, &registry)?;

    for rule in table.rules() {
      let required: &[&str] = match rule.kind {
        RuleKind::Transform => &[],
        RuleKind::Inline => &[INLINE_STEP],
        RuleKind::Resource => &[RESOURCE_STEP],
        RuleKind::Asset { .. } => &[INLINE_STEP, RESOURCE_STEP],
      };
      if let Some(step) = required.iter().find(|step| !registry.has_executor(step)) {
        return Err(ConfigError::UnknownTransform {
          rule: rule.name.clone(),
          step: step.to_string(),
        });
      }
    }

    config.output_templates.validate()?;

    let minimizers = &config.optimization.minimizers;
    for name in [&minimizers.scripts, &minimizers.styles, &minimizers.images] {
      if !registry.has_minimizer(name) {
        return Err(ConfigError::UnknownMinimizer(name.clone()));
      }
    }

    let planner = OptimizationPlanner::new(&config.optimization)?;

    Ok(Self {
      config,
      registry,
      table,
      planner,
      cache: TransformCache::new(),
      previous: BTreeMap::new(),
    })
  }

  /// Configuration the orchestrator was built with.
  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Compiled rule table.
  pub fn table(&self) -> &RuleTable {
    &self.table
  }

  /// Transform cache shared by every run.
  pub fn cache(&self) -> &TransformCache {
    &self.cache
  }

  /// Optimization plan for `mode`.
  pub fn plan(&self, mode: BuildMode) -> OptimizationPlan {
    self.planner.plan(mode)
  }

  /// Chain a file at `path` with `size` bytes would get in `mode`.
  pub fn explain(&self, path: &str, size: u64, mode: BuildMode) -> TransformChain {
    let path = normalize_path(path);
    let ctx = BuildContext::new(&self.config, mode);
    let matched = RuleMatcher::new(&self.table).match_path(&path);
    TransformChainBuilder::new(ctx).build(&matched, &FileMeta { path: &path, size })
  }

  /// Run a build over `files`.
  ///
  /// Every file is transformed in parallel; the optimization phase starts once all of
  /// them finished. The first failing file in input order aborts the build.
  pub fn run(&mut self, files: &[SourceFile], params: &BuildParams) -> PipelineResult<BuildResult> {
    params.validate(files)?;
    let ctx = BuildContext::new(&self.config, params.mode);
    info!(mode = %params.mode, files = files.len(), "transforming modules");

    let modules = files
      .par_iter()
      .map(|file| self.process_file(ctx, file))
      .collect::<Vec<_>>()
      .into_iter()
      .collect::<PipelineResult<Vec<_>>>()?;

    let plan = self.planner.plan(params.mode);
    info!(
      split = ?plan.split_chunks,
      minimize = plan.minimizes(),
      "optimizing {} modules",
      modules.len()
    );

    let mut warnings: Vec<BuildWarning> = modules
      .iter()
      .flat_map(|module| {
        module
          .warnings
          .iter()
          .map(|message| BuildWarning::new(WarningKind::Lint, module.path.clone(), message.clone()))
      })
      .collect();

    let mut finalizer = Finalizer::new(self, ctx, &plan);
    finalizer.emit_chunks(&params.entries, &modules)?;
    finalizer.emit_media(&modules)?;
    finalizer.emit_html(params.html_template.as_deref())?;
    let (artifacts, manifest) = finalizer.finish()?;

    warnings.extend(self.performance_warnings(&artifacts));
    warnings.extend(
      self
        .table
        .unused_exclusions(files.iter().map(|file| file.path.as_str()))
        .into_iter()
        .map(|unused| {
          BuildWarning::new(
            WarningKind::UnusedExclusion,
            unused.rule,
            format!("exclusion `{}` matched none of the input files", unused.pattern),
          )
        }),
    );
    for warning in &warnings {
      warn!(kind = ?warning.kind, "{warning}");
    }

    let (changed_modules, removed_modules) = self.track_changes(&modules);
    info!(
      artifacts = artifacts.len(),
      warnings = warnings.len(),
      changed = changed_modules.len(),
      "build finished"
    );

    Ok(BuildResult {
      mode: params.mode,
      plan,
      artifacts,
      warnings,
      changed_modules,
      removed_modules,
      manifest,
      output_dir: params.output_dir.clone(),
      cache: self.cache.stats(),
    })
  }

  fn process_file(&self, ctx: BuildContext<'_>, file: &SourceFile) -> PipelineResult<ModuleRecord> {
    let matched = RuleMatcher::new(&self.table).match_path(&file.path);
    let chain = TransformChainBuilder::new(ctx).build(&matched, &FileMeta {
      path: &file.path,
      size: file.size(),
    });
    let source_hash = ContentHash::of(&file.content);

    let output = if chain.steps.is_empty() {
      CachedTransform {
        content: file.content.clone(),
        format: initial_format(&file.path),
        warnings: Vec::new(),
      }
    } else {
      let key = TransformCache::key(source_hash, &file.path, &chain, ctx.mode);
      self
        .cache
        .get_or_try_insert(key, || self.execute(ctx.mode, file, &chain))?
    };

    let class = classify(chain.strategy, output.format);
    debug!(
      path = %file.path,
      rules = ?chain.rules,
      steps = ?chain.step_names(),
      strategy = ?chain.strategy,
      class = ?class,
      "classified module"
    );

    let origin = if output.content == file.content {
      file.origin.clone()
    } else {
      None
    };

    Ok(ModuleRecord {
      path: file.path.clone(),
      rules: chain.rules,
      strategy: chain.strategy,
      class,
      format: output.format,
      content: output.content,
      source_hash,
      reached_from: file.reached_from.clone(),
      origin,
      output: chain.output,
      warnings: output.warnings,
    })
  }

  fn execute(
    &self,
    mode: BuildMode,
    file: &SourceFile,
    chain: &TransformChain,
  ) -> PipelineResult<CachedTransform> {
    let mut content = file.content.clone();
    let mut format = initial_format(&file.path);
    let mut warnings = Vec::new();

    for step in &chain.steps {
      let failed = |source: StepError| PipelineError::Transform {
        path: file.path.clone(),
        step: step.name.clone(),
        source,
      };
      let executor = self
        .registry
        .executor(&step.name)
        .ok_or_else(|| failed(StepError::new("transform is not registered")))?;

      let output = executor
        .apply(TransformInput {
          path: &file.path,
          content: &content,
          format,
          options: &step.options,
          mode,
        })
        .map_err(failed)?;

      content = output.content;
      format = output.format;
      warnings.extend(output.warnings);
    }

    Ok(CachedTransform {
      content,
      format,
      warnings,
    })
  }

  fn minimize(
    &self,
    name: &str,
    path: &str,
    content: &[u8],
    options: &Value,
  ) -> PipelineResult<Vec<u8>> {
    let minimizer = self
      .registry
      .minimizer(name)
      .ok_or_else(|| ConfigError::UnknownMinimizer(name.to_string()))?;
    minimizer
      .minimize(MinimizeInput {
        path,
        content,
        options,
      })
      .map_err(|source| PipelineError::Minimize {
        path: path.to_string(),
        minimizer: name.to_string(),
        source,
      })
  }

  fn performance_warnings(&self, artifacts: &[Artifact]) -> Vec<BuildWarning> {
    let performance = &self.config.performance;
    if !performance.hints {
      return Vec::new();
    }

    artifacts
      .iter()
      .filter(|artifact| {
        !matches!(
          artifact.kind,
          ArtifactKind::SourceMap | ArtifactKind::Html | ArtifactKind::Manifest
        )
      })
      .filter(|artifact| artifact.size() > performance.max_asset_size)
      .map(|artifact| {
        BuildWarning::new(
          WarningKind::OversizedAsset,
          artifact.path.clone(),
          format!(
            "{} bytes exceeds the recommended limit of {} bytes",
            artifact.size(),
            performance.max_asset_size
          ),
        )
      })
      .collect()
  }

  fn track_changes(&mut self, modules: &[ModuleRecord]) -> (Vec<String>, Vec<String>) {
    let current: BTreeMap<String, ContentHash> = modules
      .iter()
      .map(|module| (module.path.clone(), module.source_hash))
      .collect();

    let changed = current
      .iter()
      .filter(|(path, hash)| self.previous.get(*path) != Some(*hash))
      .map(|(path, _)| path.clone())
      .collect();
    let removed = self
      .previous
      .keys()
      .filter(|path| !current.contains_key(*path))
      .cloned()
      .collect();

    self.previous = current;
    (changed, removed)
  }
}

fn classify(strategy: AssetStrategy, format: ContentFormat) -> ModuleClass {
  match (strategy, format) {
    (AssetStrategy::EmitFile, _) => ModuleClass::Media,
    (AssetStrategy::Passthrough, ContentFormat::Script) => ModuleClass::Script,
    (AssetStrategy::Passthrough, ContentFormat::Style) => ModuleClass::Style,
    (AssetStrategy::Passthrough, _) => ModuleClass::Asset,
    (_, ContentFormat::Script) => ModuleClass::Script,
    (_, ContentFormat::Style) => ModuleClass::Style,
    (_, ContentFormat::Binary | ContentFormat::Text) => ModuleClass::Media,
  }
}

/// Files an entry loads, in load order.
#[derive(Debug, Default)]
struct EntryFiles {
  scripts: Vec<String>,
  styles: Vec<String>,
}

/// Second phase state: names artifacts, rejects collisions and builds the manifest.
struct Finalizer<'o, 'p> {
  orchestrator: &'o BuildOrchestrator,
  namer: OutputNamer<'o>,
  plan: &'p OptimizationPlan,
  artifacts: Vec<Artifact>,
  by_path: BTreeMap<String, usize>,
  manifest: AssetManifest,
  entry_files: BTreeMap<String, EntryFiles>,
}

impl<'o, 'p> Finalizer<'o, 'p> {
  fn new(
    orchestrator: &'o BuildOrchestrator,
    ctx: BuildContext<'o>,
    plan: &'p OptimizationPlan,
  ) -> Self {
    Self {
      orchestrator,
      namer: OutputNamer::new(ctx),
      plan,
      artifacts: Vec::new(),
      by_path: BTreeMap::new(),
      manifest: AssetManifest::new(plan.mode),
      entry_files: BTreeMap::new(),
    }
  }

  /// Add an artifact. Paths are compared as written to disk, without their query
  /// string. The same file with the same content is emitted once; the same file
  /// with different content is a collision.
  fn push(&mut self, artifact: Artifact) -> PipelineResult<String> {
    let file_path = artifact.file_path().to_string();
    if let Some(&index) = self.by_path.get(&file_path) {
      let existing = &self.artifacts[index];
      if existing.hash == artifact.hash {
        debug!(
          path = %artifact.path,
          source = %artifact.source,
          "deduplicated identical output"
        );
        return Ok(artifact.path);
      }
      return Err(PipelineError::NamingCollision {
        path: file_path,
        first: existing.source.clone(),
        second: artifact.source,
      });
    }

    let path = artifact.path.clone();
    self.by_path.insert(file_path, self.artifacts.len());
    self.artifacts.push(artifact);
    Ok(path)
  }

  fn emit_chunks(
    &mut self,
    entries: &BTreeMap<String, String>,
    modules: &[ModuleRecord],
  ) -> PipelineResult<()> {
    let plan = self.plan;
    let chunks = assemble_chunks(entries, modules, plan.split_chunks);
    for entry in entries.keys() {
      self.entry_files.insert(entry.clone(), EntryFiles::default());
    }

    for chunk in chunks.iter().filter(|chunk| chunk.kind == ChunkKind::Shared) {
      self.emit_chunk(chunk, None)?;
    }

    for chunk in chunks.iter().filter(|chunk| chunk.kind == ChunkKind::Entry) {
      let bootstrap = match plan.runtime_chunk {
        Some(_) => None,
        None => Some(self.bootstrap(&chunk.name)),
      };
      self.emit_chunk(chunk, bootstrap)?;
    }

    if let Some(runtime) = &plan.runtime_chunk {
      for entry in entries.keys() {
        let name = runtime.name(entry);
        let content = self.bootstrap(entry).into_bytes();
        let path =
          self.emit_script(&name, NamingSurface::Script, ArtifactKind::Runtime, content, &[])?;
        if let Some(files) = self.entry_files.get_mut(entry) {
          files.scripts.insert(0, path);
        }
      }
    }

    for (entry, files) in &self.entry_files {
      let mut loaded = files.scripts.clone();
      loaded.extend(files.styles.iter().cloned());
      self.manifest.add_entrypoint(entry.clone(), loaded);
    }
    Ok(())
  }

  /// Bootstrap registering `entry` with the scripts recorded for it so far.
  fn bootstrap(&self, entry: &str) -> String {
    let files = self
      .entry_files
      .get(entry)
      .map(|files| files.scripts.as_slice())
      .unwrap_or_default();
    runtime_source(entry, files, self.plan.live_reload)
  }

  fn emit_chunk(&mut self, chunk: &Chunk<'_>, bootstrap: Option<String>) -> PipelineResult<()> {
    let (script_surface, style_surface) = match chunk.kind {
      ChunkKind::Entry => (NamingSurface::Script, NamingSurface::Style),
      ChunkKind::Shared => (NamingSurface::ScriptChunk, NamingSurface::StyleChunk),
    };

    if chunk.kind == ChunkKind::Entry || !chunk.scripts.is_empty() {
      let mut content = bootstrap.map(String::into_bytes).unwrap_or_default();
      content.extend(chunk.script_source());
      let sources: Vec<&str> = chunk.scripts.iter().map(|module| module.path.as_str()).collect();
      let path = self.emit_script(
        &chunk.name,
        script_surface,
        ArtifactKind::Script,
        content,
        &sources,
      )?;
      for entry in &chunk.entries {
        if let Some(files) = self.entry_files.get_mut(entry) {
          files.scripts.push(path.clone());
        }
      }
    }

    if !chunk.styles.is_empty() {
      let mut content = chunk.style_source();
      let logical = format!("{}.css", chunk.name);
      let minimized = self.plan.minimize_styles;
      if minimized {
        let name = &self.orchestrator.config.optimization.minimizers.styles;
        content = self.orchestrator.minimize(name, &logical, &content, &Value::Null)?;
      }

      let path = self
        .namer
        .name(style_surface, &LogicalName::chunk(&chunk.name, ".css"), &content);
      let mut artifact = Artifact::new(path, ArtifactKind::Style, chunk.name.clone(), content);
      artifact.minimized = minimized;
      let path = self.push(artifact)?;
      self.manifest.add_file(logical, path.clone());

      for entry in &chunk.entries {
        if let Some(files) = self.entry_files.get_mut(entry) {
          files.styles.push(path.clone());
        }
      }
    }
    Ok(())
  }

  /// Minimize, name and add a script, plus its source map when the plan asks for one.
  fn emit_script(
    &mut self,
    name: &str,
    surface: NamingSurface,
    kind: ArtifactKind,
    mut content: Vec<u8>,
    sources: &[&str],
  ) -> PipelineResult<String> {
    let logical = format!("{name}.js");
    let minimized = self.plan.minimize_scripts;
    if minimized {
      let minimizer = &self.orchestrator.config.optimization.minimizers.scripts;
      content = self.orchestrator.minimize(minimizer, &logical, &content, &Value::Null)?;
    }

    let path = self
      .namer
      .name(surface, &LogicalName::chunk(name, ".js"), &content);
    let mut artifact = Artifact::new(path, kind, name, content);
    artifact.minimized = minimized;
    let path = self.push(artifact)?;
    self.manifest.add_file(logical.clone(), path.clone());

    if self.plan.source_maps == SourceMapStyle::Full {
      let map_path = format!("{path}.map");
      let map = json!({
        "version": 3,
        "file": path.rsplit('/').next().unwrap_or(path.as_str()),
        "sources": sources,
        "names": [],
        "mappings": ""
      });
      self.push(Artifact::new(
        map_path.clone(),
        ArtifactKind::SourceMap,
        name,
        map.to_string().into_bytes(),
      ))?;
      self.manifest.add_file(format!("{logical}.map"), map_path);
    }
    Ok(path)
  }

  fn emit_media(&mut self, modules: &[ModuleRecord]) -> PipelineResult<()> {
    let image_options = self.plan.image_options();

    for module in modules {
      let kind = match module.class {
        ModuleClass::Media => ArtifactKind::Media,
        ModuleClass::Asset => ArtifactKind::Asset,
        ModuleClass::Script | ModuleClass::Style => continue,
      };

      let mut content = module.content.clone();
      let mut origin = module.origin.clone();
      let minimized =
        kind == ArtifactKind::Media && self.plan.minimize_images && is_image(&module.path);
      if minimized {
        let minimizer = &self.orchestrator.config.optimization.minimizers.images;
        content = self
          .orchestrator
          .minimize(minimizer, &module.path, &content, &image_options)?;
        if content != module.content {
          origin = None;
        }
      }

      let logical = LogicalName::from_path(&module.path);
      let path = match &module.output {
        Some(template) => self
          .namer
          .name_with_template(template, NamingSurface::Media, &logical, &content),
        None => self.namer.name(NamingSurface::Media, &logical, &content),
      };

      let mut artifact = Artifact::new(path, kind, module.path.clone(), content);
      artifact.minimized = minimized;
      artifact.origin = origin;
      let path = self.push(artifact)?;
      self.manifest.add_file(module.path.clone(), path);
    }
    Ok(())
  }

  fn emit_html(&mut self, template: Option<&str>) -> PipelineResult<()> {
    let html = &self.orchestrator.config.html;
    if !html.enabled {
      return Ok(());
    }

    let mut scripts: Vec<String> = Vec::new();
    let mut styles: Vec<String> = Vec::new();
    for files in self.entry_files.values() {
      for script in &files.scripts {
        if !scripts.contains(script) {
          scripts.push(script.clone());
        }
      }
      for style in &files.styles {
        if !styles.contains(style) {
          styles.push(style.clone());
        }
      }
    }

    let document = render_document(template, &styles, &scripts);
    let filename = html.filename.clone();
    self.push(Artifact::new(
      filename.clone(),
      ArtifactKind::Html,
      filename.clone(),
      document.into_bytes(),
    ))?;
    self.manifest.add_file(filename.clone(), filename);
    Ok(())
  }

  fn finish(mut self) -> PipelineResult<(Vec<Artifact>, AssetManifest)> {
    let json = self.manifest.to_json().map_err(PipelineError::Manifest)?;
    self.push(Artifact::new(
      MANIFEST_FILE.to_string(),
      ArtifactKind::Manifest,
      MANIFEST_FILE,
      json,
    ))?;

    let mut artifacts = self.artifacts;
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((artifacts, self.manifest))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transform::{TransformExecutor, TransformOutput};

  fn orchestrator() -> BuildOrchestrator {
    BuildOrchestrator::new(PipelineConfig::default(), TransformRegistry::with_builtins())
      .expect("default configuration is valid")
  }

  fn project() -> Vec<SourceFile> {
    vec![
      SourceFile::new("src/main.js", "import './app.less';\nconsole.log('main');\n"),
      SourceFile::new(
        "src/app.less",
        "@primary-color: #1890ff;\n.btn { color: @primary-color; }\n",
      ),
      SourceFile::new("node_modules/react/index.js", "module.exports = {};\n"),
    ]
  }

  #[test]
  fn validates_parameters_before_processing() {
    let mut orchestrator = orchestrator();
    let files = project();

    let err = orchestrator
      .run(&files, &BuildParams::new(BuildMode::Development))
      .unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::NoEntries)));

    let err = orchestrator
      .run(&files, &BuildParams::new(BuildMode::Production).entry("main", "src/main.js"))
      .unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::MissingOutputDir)));

    let err = orchestrator
      .run(&files, &BuildParams::new(BuildMode::Development).entry("main", "src/index.js"))
      .unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::EntryNotFound { .. })));
  }

  #[test]
  fn rejects_unknown_minimizers() {
    let mut config = PipelineConfig::default();
    config.optimization.minimizers.scripts = "uglify".into();
    let err = BuildOrchestrator::new(config, TransformRegistry::with_builtins()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownMinimizer(name) if name == "uglify"));
  }

  #[test]
  fn asset_rules_need_the_builtin_steps() {
    let mut registry = TransformRegistry::empty();
    for name in [
      "eslint",
      "babel-loader",
      "ts-loader",
      "css-loader",
      "postcss-loader",
      "less-loader",
      "sass-loader",
      "stylus-loader",
      "style-loader",
      "mini-css-extract",
    ] {
      registry.register_executor(name, crate::transform::builtins::PassThrough(None));
    }
    let err = BuildOrchestrator::new(PipelineConfig::default(), registry).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTransform { rule, .. } if rule == "images"));
  }

  #[test]
  fn development_builds_inject_styles() {
    let mut orchestrator = orchestrator();
    let result = orchestrator
      .run(&project(), &BuildParams::new(BuildMode::Development).entry("main", "src/main.js"))
      .unwrap();

    assert_eq!(result.artifacts_of(ArtifactKind::Style).count(), 0);
    assert_eq!(result.artifacts_of(ArtifactKind::Runtime).count(), 0);

    let main = result.artifact("static/js/main.js").expect("stable entry name");
    let text = String::from_utf8_lossy(&main.content);
    assert!(text.contains("document.head.appendChild(style)"));
    assert!(text.contains("#1DA57A"));
    assert!(text.contains(r#""liveReload":true"#));
    assert!(result.artifact("index.html").is_some());
    assert!(result.artifact(MANIFEST_FILE).is_some());
  }

  #[test]
  fn production_builds_split_vendors_and_runtime() {
    let mut orchestrator = orchestrator();
    let result = orchestrator
      .run(
        &project(),
        &BuildParams::new(BuildMode::Production)
          .entry("main", "src/main.js")
          .output_dir("dist"),
      )
      .unwrap();

    let kinds: Vec<(ArtifactKind, &str)> = result
      .artifacts
      .iter()
      .map(|artifact| (artifact.kind, artifact.source.as_str()))
      .collect();
    assert!(kinds.contains(&(ArtifactKind::Runtime, "runtime~main")));
    assert!(kinds.contains(&(ArtifactKind::Script, "vendors~main")));
    assert!(kinds.contains(&(ArtifactKind::Style, "main")));
    assert!(result.artifacts_of(ArtifactKind::SourceMap).count() >= 3);

    let entry = &result.manifest.entrypoints["main"];
    assert!(entry[0].starts_with("static/js/runtime~main."));
    assert!(entry[1].starts_with("static/js/vendors~main."));
    assert!(entry[2].starts_with("static/js/main."));
    assert!(entry[3].starts_with("static/css/main."));
  }

  struct Failing;

  impl TransformExecutor for Failing {
    fn apply(&self, _input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
      Err(StepError::new("unexpected token"))
    }
  }

  #[test]
  fn transform_failures_abort_with_the_first_file_in_input_order() {
    let mut registry = TransformRegistry::with_builtins();
    registry.register_executor("babel-loader", Failing);
    let mut orchestrator = BuildOrchestrator::new(PipelineConfig::default(), registry).unwrap();

    let files = vec![
      SourceFile::new("src/a.js", "a"),
      SourceFile::new("src/b.js", "b"),
    ];
    let err = orchestrator
      .run(&files, &BuildParams::new(BuildMode::Development).entry("main", "src/a.js"))
      .unwrap_err();

    match err {
      PipelineError::Transform { path, step, source } => {
        assert_eq!(path, "src/a.js");
        assert_eq!(step, "babel-loader");
        assert_eq!(source.message, "unexpected token");
      }
      other => panic!("unexpected error {other}"),
    }
  }

  #[test]
  fn tracks_changed_and_removed_modules() {
    let mut orchestrator = orchestrator();
    let params = BuildParams::new(BuildMode::Development).entry("main", "src/main.js");
    let mut files = project();

    let first = orchestrator.run(&files, &params).unwrap();
    assert_eq!(first.changed_modules.len(), files.len());

    let second = orchestrator.run(&files, &params).unwrap();
    assert!(second.changed_modules.is_empty());
    assert!(second.cache.hits >= 2);

    files[1] = SourceFile::new("src/app.less", ".btn { color: red; }\n");
    files.pop();
    let third = orchestrator.run(&files, &params).unwrap();
    assert_eq!(third.changed_modules, vec!["src/app.less".to_string()]);
    assert_eq!(third.removed_modules, vec!["node_modules/react/index.js".to_string()]);
  }

  #[test]
  fn explain_reports_the_chain() {
    let orchestrator = orchestrator();
    let chain = orchestrator.explain("./src/logo.png", 20 * 1024, BuildMode::Production);
    assert_eq!(chain.strategy, AssetStrategy::EmitFile);
    assert_eq!(chain.rules, vec!["images"]);
  }

  #[test]
  fn classification_follows_strategy_and_format() {
    assert_eq!(classify(AssetStrategy::EmitFile, ContentFormat::Binary), ModuleClass::Media);
    assert_eq!(classify(AssetStrategy::InlineDataUri, ContentFormat::Script), ModuleClass::Script);
    assert_eq!(classify(AssetStrategy::Passthrough, ContentFormat::Text), ModuleClass::Asset);
    assert_eq!(classify(AssetStrategy::Transform, ContentFormat::Style), ModuleClass::Style);
  }
}
