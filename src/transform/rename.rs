// src/transform/rename.rs

use crate::pipeline::{Asset, StageContext, Transform};

/// Drops the directory part of each asset's path.
#[derive(Debug, Default)]
pub struct Flatten;

impl Transform for Flatten {
    fn name(&self) -> &str {
        "flatten"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        asset.relative = asset.file_name().to_string();
        Ok(vec![asset])
    }
}
