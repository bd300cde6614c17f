// src/transform/js/mod.rs

//! Script transforms built on a shared tokenizer.

pub mod annotate;
pub mod downlevel;
pub mod lexer;
pub mod minify;

use anyhow::Context;

use crate::pipeline::sourcemap::SourceMap;
use crate::pipeline::{Asset, StageContext, Transform};

use lexer::LexError;

type Rewrite = fn(&str, Option<&SourceMap>, &str) -> Result<(String, SourceMap), LexError>;

/// Run a token-level rewrite over an asset, carrying its map along.
fn rewrite(asset: &mut Asset, what: &str, f: Rewrite) -> anyhow::Result<()> {
    let (code, map) = f(asset.text()?, asset.source_map.as_ref(), &asset.relative)
        .with_context(|| format!("{what} {}", asset.origin))?;
    asset.set_text(code);
    if asset.source_map.is_some() {
        asset.source_map = Some(map);
    }
    Ok(())
}

/// Block-scoped declarations and plain templates to ES5.
#[derive(Debug, Default)]
pub struct Downlevel;

impl Transform for Downlevel {
    fn name(&self) -> &str {
        "downlevel"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        rewrite(&mut asset, "compiling", downlevel::downlevel)?;
        Ok(vec![asset])
    }
}

/// Angular dependency-injection annotation.
#[derive(Debug, Default)]
pub struct Annotate;

impl Transform for Annotate {
    fn name(&self) -> &str {
        "ng-annotate"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        rewrite(&mut asset, "annotating", annotate::annotate)?;
        Ok(vec![asset])
    }
}

/// Minifier emitting `<name><min_suffix>`, optionally next to the
/// unminified input.
#[derive(Debug, Clone)]
pub struct MinifyJs {
    min_suffix: String,
    keep_source: bool,
}

impl MinifyJs {
    pub fn new(min_suffix: impl Into<String>, keep_source: bool) -> Self {
        Self {
            min_suffix: min_suffix.into(),
            keep_source,
        }
    }

    fn min_name(&self, relative: &str) -> String {
        let stem = relative.strip_suffix(".js").unwrap_or(relative);
        format!("{stem}{}", self.min_suffix)
    }
}

impl Transform for MinifyJs {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply(&self, asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        let mut min = asset.clone();
        rewrite(&mut min, "minifying", minify::minify)?;
        min.relative = self.min_name(&asset.relative);

        Ok(if self.keep_source {
            vec![asset, min]
        } else {
            vec![min]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_name_replaces_the_js_extension() {
        let m = MinifyJs::new("-min.js", true);
        assert_eq!(m.min_name("app.js"), "app-min.js");
        assert_eq!(m.min_name("sub/app-deps.js"), "sub/app-deps-min.js");
    }
}
