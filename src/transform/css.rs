// src/transform/css.rs

//! Sass compilation (grass) and vendor prefixing (lightningcss).

use std::fmt;
use std::io;
use std::path::Path;

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::fs::FileSystem;
use crate::pipeline::sourcemap::SourceMap;
use crate::pipeline::{Asset, StageContext, Transform};

/// Exposes our [`FileSystem`] to the Sass compiler so imports resolve
/// against the same tree the task reads from.
struct SassFs<'a>(&'a dyn FileSystem);

impl fmt::Debug for SassFs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SassFs").field(&self.0).finish()
    }
}

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0
            .read(path)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{e:#}")))
    }
}

/// Keep the map pointing at the original stylesheet after a rewrite.
fn refit_map(map: &SourceMap, generated: &str) -> SourceMap {
    let source = map.sources.first().map(String::as_str).unwrap_or_default();
    let content = map
        .sources_content
        .first()
        .and_then(|c| c.as_deref())
        .unwrap_or_default();
    SourceMap::file_level(source, content, generated)
}

/// Compressed Sass compilation. Partials (`_name.scss`) are dropped from the
/// stream; they are only reachable through imports.
#[derive(Debug, Default)]
pub struct SassCompile;

impl Transform for SassCompile {
    fn name(&self) -> &str {
        "sass"
    }

    fn apply(&self, mut asset: Asset, ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        if asset.file_name().starts_with('_') {
            return Ok(Vec::new());
        }

        let fs = SassFs(ctx.fs);
        let options = grass::Options::default()
            .style(grass::OutputStyle::Compressed)
            .fs(&fs);
        let path = ctx.root.join(&asset.origin);
        let css = grass::from_path(&path, &options).map_err(|e| anyhow!("{e}"))?;

        asset.source_map = asset.source_map.as_ref().map(|m| refit_map(m, &css));
        asset.set_text(css);
        asset.set_extension("css");
        Ok(vec![asset])
    }
}

/// Adds vendor prefixes for the configured browsers and minifies.
#[derive(Debug, Clone)]
pub struct Autoprefix {
    targets: Targets,
}

impl Autoprefix {
    pub fn new(browsers: &[String]) -> Result<Self> {
        let browsers = Browsers::from_browserslist(browsers).map_err(|e| anyhow!("invalid browser list: {e}"))?;
        Ok(Self {
            targets: Targets::from(browsers),
        })
    }

    pub fn process(&self, css: &str, file_name: &str) -> Result<String> {
        let mut sheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: file_name.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| anyhow!("{e}"))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| anyhow!("{e}"))?;

        let out = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("{e}"))?;
        Ok(out.code)
    }
}

impl Transform for Autoprefix {
    fn name(&self) -> &str {
        "autoprefixer"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        let css = self.process(asset.text()?, &asset.relative)?;
        asset.source_map = asset.source_map.as_ref().map(|m| refit_map(m, &css));
        asset.set_text(css);
        Ok(vec![asset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_for_old_browsers() {
        let prefixer = Autoprefix::new(&["safari 6".to_string()]).unwrap();
        let out = prefixer.process(".a { display: flex; }", "a.css").unwrap();
        assert!(out.contains("-webkit-"), "got {out}");
    }

    #[test]
    fn rejects_garbage_browser_queries() {
        assert!(Autoprefix::new(&["definitely not a browser 99".to_string()]).is_err());
    }
}
