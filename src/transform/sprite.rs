// src/transform/sprite.rs

//! SVG symbol sprite: every icon becomes a `<symbol>` in one file.

use anyhow::{Result, anyhow};

use crate::pipeline::{Asset, PipelineError, Stage, StageContext};
use crate::transform::html::{Node, NodeKind, Tag, tokenize};

const SPRITE_OPEN: &str =
    "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">";

/// Builds `<name>.svg` from all SVG assets in the stream.
#[derive(Debug)]
pub struct SymbolSprite {
    file_name: String,
}

impl SymbolSprite {
    pub fn new(sprite: &str) -> Self {
        Self {
            file_name: format!("{sprite}.svg"),
        }
    }
}

impl Stage for SymbolSprite {
    fn name(&self) -> &str {
        "svg-sprite"
    }

    fn run(&self, assets: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        if assets.is_empty() {
            return Ok(assets);
        }

        let mut out = String::from(SPRITE_OPEN);
        for asset in &assets {
            ctx.cancel.check()?;
            let symbol = asset
                .text()
                .and_then(|svg| symbol(asset.stem(), svg))
                .map_err(|e| PipelineError::File {
                    stage: self.name().to_string(),
                    file: asset.origin.clone(),
                    message: format!("{e:#}"),
                })?;
            out.push_str(&symbol);
        }
        out.push_str("</svg>");

        Ok(vec![Asset::new(
            self.file_name.clone(),
            self.file_name.clone(),
            out.into_bytes(),
        )])
    }
}

/// One `<symbol>` element for the SVG document `svg`.
pub fn symbol(id: &str, svg: &str) -> Result<String> {
    let nodes = tokenize(svg)?;

    let (root_idx, root) = nodes
        .iter()
        .enumerate()
        .find_map(|(i, n)| match &n.kind {
            NodeKind::StartTag(tag) if tag.name.eq_ignore_ascii_case("svg") => Some((i, tag)),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no root <svg> element"))?;

    let view_box = view_box(root).ok_or_else(|| anyhow!("<svg> has neither viewBox nor width/height"))?;

    let mut inner = String::new();
    if !root.self_closing {
        let close = nodes
            .iter()
            .rposition(|n| matches!(n.kind, NodeKind::EndTag(name) if name.eq_ignore_ascii_case("svg")))
            .ok_or_else(|| anyhow!("unclosed <svg> element"))?;
        if close > root_idx {
            for node in &nodes[root_idx + 1..close] {
                push_inner(&mut inner, node);
            }
        }
    }

    Ok(format!(
        "<symbol id=\"{}\" viewBox=\"{}\">{}</symbol>",
        escape_attr(id),
        escape_attr(&view_box),
        inner
    ))
}

fn push_inner(out: &mut String, node: &Node<'_>) {
    match node.kind {
        NodeKind::Comment | NodeKind::Declaration => {}
        NodeKind::Text if node.raw.trim().is_empty() => {}
        _ => out.push_str(node.raw),
    }
}

fn view_box(root: &Tag<'_>) -> Option<String> {
    if let Some(vb) = root.attr("viewBox").and_then(|a| a.unquoted()) {
        return Some(vb.split_ascii_whitespace().collect::<Vec<_>>().join(" "));
    }
    let width = root.attr("width").and_then(|a| a.unquoted()).and_then(length)?;
    let height = root.attr("height").and_then(|a| a.unquoted()).and_then(length)?;
    Some(format!("0 0 {width} {height}"))
}

fn length(value: &str) -> Option<&str> {
    let v = value.trim().trim_end_matches("px");
    v.parse::<f64>().ok().map(|_| v)
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_keeps_inner_markup_and_view_box() {
        let svg = "<?xml version=\"1.0\"?>\n<!-- icon -->\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0  0 24 24\">\n  <path d=\"M0 0h24v24H0z\"/>\n</svg>\n";
        assert_eq!(
            symbol("close", svg).unwrap(),
            "<symbol id=\"close\" viewBox=\"0 0 24 24\"><path d=\"M0 0h24v24H0z\"/></symbol>"
        );
    }

    #[test]
    fn view_box_falls_back_to_dimensions() {
        let svg = "<svg width=\"16px\" height=\"12\"><rect/></svg>";
        assert_eq!(
            symbol("r", svg).unwrap(),
            "<symbol id=\"r\" viewBox=\"0 0 16 12\"><rect/></symbol>"
        );
    }

    #[test]
    fn files_without_svg_root_are_rejected() {
        assert!(symbol("x", "<div>nope</div>").is_err());
    }
}
