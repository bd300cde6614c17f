// src/transform/concat.rs

use crate::pipeline::sourcemap::SourceMap;
use crate::pipeline::{Asset, PipelineError, Stage, StageContext};

/// Joins every asset, in stream order, into one file.
///
/// Files are separated by a newline; maps are shifted to the line each file
/// starts on. An empty stream stays empty.
#[derive(Debug)]
pub struct Concat {
    file_name: String,
}

impl Concat {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Stage for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn run(&self, assets: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        if assets.is_empty() {
            return Ok(assets);
        }

        let with_maps = assets.iter().any(|a| a.source_map.is_some());
        let mut contents: Vec<u8> = Vec::new();
        let mut map = SourceMap::default();
        let mut line = 0usize;

        for (i, asset) in assets.iter().enumerate() {
            ctx.cancel.check()?;
            if i > 0 {
                contents.push(b'\n');
                line += 1;
            }

            if with_maps {
                match &asset.source_map {
                    Some(m) => map.append(m, line),
                    None => {
                        let text = String::from_utf8_lossy(&asset.contents);
                        map.append(&SourceMap::identity(&asset.relative, &text), line);
                    }
                }
            }

            line += asset.contents.iter().filter(|&&b| b == b'\n').count();
            contents.extend_from_slice(&asset.contents);
        }

        let mut out = Asset::new(self.file_name.clone(), self.file_name.clone(), contents);
        if with_maps {
            out.source_map = Some(map);
        }
        Ok(vec![out])
    }
}
