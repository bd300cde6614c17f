// src/config/paths.rs

//! The path table: logical asset categories mapped to input globs and
//! output directories.
//!
//! Built once per process from a validated [`ConfigFile`] and shared as
//! `Arc<PathTable>`; nothing mutates it afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;

/// Input categories (what a task reads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputCategory {
    Sprite,
    Styles,
    Scripts,
    AppDeps,
    App,
    HtmlTemplates,
    Htmlify,
    Images,
    JsLib,
    Fonts,
}

impl InputCategory {
    pub const ALL: [InputCategory; 10] = [
        InputCategory::Sprite,
        InputCategory::Styles,
        InputCategory::Scripts,
        InputCategory::AppDeps,
        InputCategory::App,
        InputCategory::HtmlTemplates,
        InputCategory::Htmlify,
        InputCategory::Images,
        InputCategory::JsLib,
        InputCategory::Fonts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputCategory::Sprite => "sprite",
            InputCategory::Styles => "styles",
            InputCategory::Scripts => "scripts",
            InputCategory::AppDeps => "app_deps",
            InputCategory::App => "app",
            InputCategory::HtmlTemplates => "html_templates",
            InputCategory::Htmlify => "htmlify",
            InputCategory::Images => "images",
            InputCategory::JsLib => "jslib",
            InputCategory::Fonts => "fonts",
        }
    }
}

/// Output categories (where a task writes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputCategory {
    /// The distribution root itself.
    Root,
    Css,
    Img,
    Svg,
    Js,
    JsLib,
    Templates,
    Docs,
    Fonts,
}

impl OutputCategory {
    pub const ALL: [OutputCategory; 9] = [
        OutputCategory::Root,
        OutputCategory::Css,
        OutputCategory::Img,
        OutputCategory::Svg,
        OutputCategory::Js,
        OutputCategory::JsLib,
        OutputCategory::Templates,
        OutputCategory::Docs,
        OutputCategory::Fonts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputCategory::Root => "root",
            OutputCategory::Css => "css",
            OutputCategory::Img => "img",
            OutputCategory::Svg => "svg",
            OutputCategory::Js => "js",
            OutputCategory::JsLib => "jslib",
            OutputCategory::Templates => "templates",
            OutputCategory::Docs => "docs",
            OutputCategory::Fonts => "fonts",
        }
    }
}

#[derive(Clone)]
pub struct PathTable {
    root: PathBuf,
    sprite: Vec<String>,
    styles: Vec<String>,
    scripts: Vec<String>,
    app_deps: Vec<String>,
    app: Vec<String>,
    html_templates: Vec<String>,
    htmlify: Vec<String>,
    images: Vec<String>,
    jslib: Vec<String>,
    fonts: Vec<String>,
    dist_root: PathBuf,
    css: PathBuf,
    img: PathBuf,
    svg: PathBuf,
    js: PathBuf,
    js_lib: PathBuf,
    templates: PathBuf,
    docs: PathBuf,
    font_dir: PathBuf,
    maps: String,
    serve_files: Vec<String>,
}

impl fmt::Debug for PathTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathTable")
            .field("root", &self.root)
            .field("dist_root", &self.dist_root)
            .finish_non_exhaustive()
    }
}

impl PathTable {
    /// Build the table for a project rooted at `root`.
    pub fn from_config(root: impl Into<PathBuf>, cfg: &ConfigFile) -> Self {
        let p = &cfg.paths;
        let d = &cfg.dist;
        let dist_root = PathBuf::from(&d.root);

        Self {
            root: root.into(),
            sprite: vec![p.sprite.clone()],
            styles: vec![p.styles.clone()],
            scripts: vec![p.scripts.clone()],
            app_deps: p.app_deps.clone(),
            app: p.app.clone(),
            html_templates: vec![p.html_templates.clone()],
            htmlify: vec![p.htmlify.clone()],
            images: vec![p.images.clone()],
            jslib: vec![p.jslib.clone()],
            fonts: vec![p.fonts.clone()],
            css: dist_root.join(&d.css),
            img: dist_root.join(&d.img),
            svg: dist_root.join(&d.svg),
            js: dist_root.join(&d.js),
            js_lib: dist_root.join(&d.jslib),
            templates: dist_root.join(&d.templates),
            docs: dist_root.join(&d.docs),
            font_dir: dist_root.join(&d.fonts),
            maps: d.maps.clone(),
            serve_files: cfg.serve.files.clone(),
            dist_root,
        }
    }

    /// Project root every glob and destination is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Input glob(s) for a category, in declared order.
    pub fn inputs(&self, category: InputCategory) -> &[String] {
        match category {
            InputCategory::Sprite => &self.sprite,
            InputCategory::Styles => &self.styles,
            InputCategory::Scripts => &self.scripts,
            InputCategory::AppDeps => &self.app_deps,
            InputCategory::App => &self.app,
            InputCategory::HtmlTemplates => &self.html_templates,
            InputCategory::Htmlify => &self.htmlify,
            InputCategory::Images => &self.images,
            InputCategory::JsLib => &self.jslib,
            InputCategory::Fonts => &self.fonts,
        }
    }

    /// Destination directory for a category, relative to the project root.
    pub fn output(&self, category: OutputCategory) -> &Path {
        match category {
            OutputCategory::Root => &self.dist_root,
            OutputCategory::Css => &self.css,
            OutputCategory::Img => &self.img,
            OutputCategory::Svg => &self.svg,
            OutputCategory::Js => &self.js,
            OutputCategory::JsLib => &self.js_lib,
            OutputCategory::Templates => &self.templates,
            OutputCategory::Docs => &self.docs,
            OutputCategory::Fonts => &self.font_dir,
        }
    }

    /// Destination directory resolved against the project root.
    pub fn output_abs(&self, category: OutputCategory) -> PathBuf {
        self.root.join(self.output(category))
    }

    /// Source-map directory, relative to a task's destination.
    pub fn maps_dir(&self) -> &str {
        &self.maps
    }

    /// Live-reload globs, relative to the distribution root.
    pub fn serve_files(&self) -> &[String] {
        &self.serve_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;

    #[test]
    fn defaults_match_the_stock_layout() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let table = PathTable::from_config(".", &cfg);

        assert_eq!(table.inputs(InputCategory::Sprite), ["src/assets/svg/*.svg"]);
        assert_eq!(table.inputs(InputCategory::AppDeps).len(), 2);
        assert_eq!(table.output(OutputCategory::JsLib), Path::new("dist/js/lib"));
        assert_eq!(table.output(OutputCategory::Templates), Path::new("dist/js/templates"));
        assert_eq!(table.output(OutputCategory::Root), Path::new("dist"));
        assert_eq!(table.maps_dir(), "maps");
        assert_eq!(table.serve_files(), ["css/*.css", "js/*.js", "*.html"]);
    }
}
