// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{CacheStorageMode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional and defaults to the stock project layout:
///
/// ```toml
/// [config]
/// triggered_while_running_behaviour = "cancel"
/// debounce_ms = 200
///
/// [paths]
/// styles = "src/assets/scss/**/*.scss"
///
/// [dist]
/// root = "dist"
///
/// [task.app-ngdocs]
/// after = ["app-annotate"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub dist: DistSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub minify: MinifySection,
    #[serde(default)]
    pub templates: TemplatesSection,
    #[serde(default)]
    pub htmlify: HtmlifySection,
    #[serde(default)]
    pub images: ImagesSection,
    #[serde(default)]
    pub serve: ServeSection,
    #[serde(default)]
    pub notify: NotifySection,
    /// Extra dependency edges from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, so holders
/// can rely on known task names, an acyclic task graph and sane settings.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub dist: DistSection,
    pub styles: StylesSection,
    pub minify: MinifySection,
    pub templates: TemplatesSection,
    pub htmlify: HtmlifySection,
    pub images: ImagesSection,
    pub serve: ServeSection,
    pub notify: NotifySection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            dist: raw.dist,
            styles: raw.styles,
            minify: raw.minify,
            templates: raw.templates,
            htmlify: raw.htmlify,
            images: raw.images,
            serve: raw.serve,
            notify: raw.notify,
            task: raw.task,
        }
    }

    /// Declared `after` edges for a task (empty when not configured).
    pub fn after_of(&self, task: &str) -> &[String] {
        self.task
            .get(task)
            .map(|t| t.after.as_slice())
            .unwrap_or(&[])
    }
}

/// `[config]` section: runtime behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigSection {
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
    /// Maximum number of queued trigger batches to remember.
    pub queue_length: usize,
    /// Quiet period for coalescing file-change events in watch mode.
    pub debounce_ms: u64,
    pub cache_storage_mode: CacheStorageMode,
    /// Exit non-zero from one-shot runs when any task failed.
    pub fail_on_error: bool,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::Cancel,
            queue_length: 1,
            debounce_ms: 200,
            cache_storage_mode: CacheStorageMode::File,
            fail_on_error: false,
        }
    }
}

/// `[paths]` section: input globs, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub sprite: String,
    pub styles: String,
    pub scripts: String,
    /// Vendor scripts, concatenated in exactly this order.
    pub app_deps: Vec<String>,
    /// Application sources as ordered groups: module file, components,
    /// templates-registration file.
    pub app: Vec<String>,
    pub html_templates: String,
    pub htmlify: String,
    pub images: String,
    pub jslib: String,
    pub fonts: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            sprite: "src/assets/svg/*.svg".to_string(),
            styles: "src/assets/scss/**/*.scss".to_string(),
            scripts: "src/assets/js/scripts.js".to_string(),
            app_deps: vec![
                "bower_components/jquery/dist/jquery.js".to_string(),
                "bower_components/angular/angular.js".to_string(),
            ],
            app: vec![
                "src/app/app.module.js".to_string(),
                "src/app/**/**/*.js".to_string(),
                "src/app/app.templates.js".to_string(),
            ],
            html_templates: "src/app/**/**/*.html".to_string(),
            htmlify: "src/views/*.html".to_string(),
            images: "src/assets/img/**/*.{png,jpg,jpeg}".to_string(),
            jslib: "src/assets/js/lib/**/*".to_string(),
            fonts: "src/assets/fonts/**/*".to_string(),
        }
    }
}

/// `[dist]` section: output directories, relative to `root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistSection {
    pub root: String,
    pub css: String,
    pub img: String,
    pub svg: String,
    pub js: String,
    pub jslib: String,
    pub templates: String,
    pub docs: String,
    pub fonts: String,
    /// Source-map directory, relative to each task's destination.
    pub maps: String,
}

impl Default for DistSection {
    fn default() -> Self {
        Self {
            root: "dist".to_string(),
            css: "css".to_string(),
            img: "img".to_string(),
            svg: "svg".to_string(),
            js: "js".to_string(),
            jslib: "js/lib".to_string(),
            templates: "js/templates".to_string(),
            docs: "docs".to_string(),
            fonts: "fonts".to_string(),
            maps: "maps".to_string(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StylesSection {
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            browsers: ["last 2 versions", "safari 6", "ie 9", "ios 7", "android 4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// `[minify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinifySection {
    /// Suffix replacing `.js` on minified outputs.
    pub min_suffix: String,
    /// Also emit the unminified bundle under its original name.
    pub keep_source: bool,
}

impl Default for MinifySection {
    fn default() -> Self {
        Self {
            min_suffix: "-min.js".to_string(),
            keep_source: true,
        }
    }
}

/// `[templates]` section: the generated template-cache script.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplatesSection {
    pub module: String,
    /// Directory prefix of every cache key.
    pub prefix: String,
    /// Declare the module (`angular.module(name, [])`) instead of looking it up.
    pub standalone: bool,
    pub file_name: String,
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            module: "templates".to_string(),
            prefix: "templates/".to_string(),
            standalone: false,
            file_name: "templates.js".to_string(),
        }
    }
}

/// `[htmlify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HtmlifySection {
    pub prefixes: Vec<String>,
}

impl Default for HtmlifySection {
    fn default() -> Self {
        Self {
            prefixes: vec!["ng".to_string()],
        }
    }
}

/// `[images]` section: the compression service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    /// Environment variable holding the API key. The key itself never lives
    /// in configuration.
    pub api_key_env: String,
    pub endpoint: String,
    /// Minimum spacing between two compression requests.
    pub min_interval_ms: u64,
    pub monthly_quota: u32,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            api_key_env: "TINYPNG_API_KEY".to_string(),
            endpoint: "https://api.tinify.com/shrink".to_string(),
            min_interval_ms: 500,
            monthly_quota: 500,
        }
    }
}

/// `[serve]` section: the development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeSection {
    pub host: String,
    pub port: u16,
    /// Globs (relative to the dist root) whose changes reload the browser.
    pub files: Vec<String>,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            files: vec![
                "css/*.css".to_string(),
                "js/*.js".to_string(),
                "*.html".to_string(),
            ],
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub title: String,
    /// Ring the terminal bell on failures.
    pub bell: bool,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            title: "assetpipe".to_string(),
            bell: false,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// This task waits for all tasks listed here within a run.
    #[serde(default)]
    pub after: Vec<String>,
}
