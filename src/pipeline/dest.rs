// src/pipeline/dest.rs

//! Pipeline ends: source-map emission and writing to disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::pipeline::sourcemap::SourceMap;
use crate::pipeline::{Asset, PipelineError, Stage, StageContext};

/// Attach an identity source map to every asset that has none yet.
#[derive(Debug, Default)]
pub struct InitMaps;

impl Stage for InitMaps {
    fn name(&self) -> &str {
        "sourcemaps-init"
    }

    fn run(&self, mut assets: Vec<Asset>, _ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        for asset in &mut assets {
            if asset.source_map.is_some() {
                continue;
            }
            let text = String::from_utf8_lossy(&asset.contents);
            asset.source_map = Some(SourceMap::identity(&asset.relative, &text));
        }
        Ok(assets)
    }
}

/// Emit each asset's map as `<dir>/<relative>.map` and point the asset at it.
#[derive(Debug)]
pub struct WriteMaps {
    dir: String,
}

impl WriteMaps {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Stage for WriteMaps {
    fn name(&self) -> &str {
        "sourcemaps-write"
    }

    fn run(&self, assets: Vec<Asset>, _ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        let mut out = Vec::with_capacity(assets.len() * 2);

        for mut asset in assets {
            let Some(map) = asset.source_map.take() else {
                out.push(asset);
                continue;
            };

            let map_relative = format!("{}/{}.map", self.dir.trim_end_matches('/'), asset.relative);
            let json = map
                .to_json(asset.file_name())
                .map_err(|e| PipelineError::stage(self.name(), e))?;

            let url = map_url(&asset.relative, &map_relative);
            let comment = if asset.relative.ends_with(".css") {
                format!("\n/*# sourceMappingURL={url} */\n")
            } else {
                format!("\n//# sourceMappingURL={url}\n")
            };
            asset.contents.extend_from_slice(comment.as_bytes());

            let origin = asset.origin.clone();
            out.push(asset);
            out.push(Asset::new(map_relative, origin, json.into_bytes()));
        }

        Ok(out)
    }
}

/// URL of `target` as seen from the directory holding `from`.
fn map_url(from: &str, target: &str) -> String {
    let depth = from.matches('/').count();
    let mut url = "../".repeat(depth);
    url.push_str(target);
    url
}

/// Write every asset below `dest` (relative to the context root).
///
/// Returns the written paths relative to the project root.
pub fn write_all(
    assets: &[Asset],
    dest: &Path,
    ctx: &StageContext<'_>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::with_capacity(assets.len());

    for asset in assets {
        ctx.cancel.check()?;
        let rel_path = dest.join(&asset.relative);
        let abs = ctx.root.join(&rel_path);
        ctx.fs
            .write(&abs, &asset.contents)
            .map_err(|e| PipelineError::File {
                stage: "dest".to_string(),
                file: rel_path.display().to_string(),
                message: format!("{e:#}"),
            })?;
        debug!(task = %ctx.task, path = %rel_path.display(), bytes = asset.contents.len(), "wrote");
        written.push(rel_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_url_climbs_out_of_nested_directories() {
        assert_eq!(map_url("app.js", "maps/app.js.map"), "maps/app.js.map");
        assert_eq!(map_url("sub/a.css", "maps/sub/a.css.map"), "../maps/sub/a.css.map");
    }
}
