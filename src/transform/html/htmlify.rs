// src/transform/html/htmlify.rs

//! Rewrites framework attributes into valid `data-` attributes:
//! `ng-app`, `ng:app`, `ng_app` and `x-ng-app` all become `data-ng-app`.

use anyhow::Context;

use super::{MarkupError, NodeKind, tokenize};
use crate::pipeline::{Asset, StageContext, Transform};

pub fn htmlify(src: &str, prefixes: &[String]) -> Result<String, MarkupError> {
    let nodes = tokenize(src)?;
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for node in &nodes {
        let NodeKind::StartTag(tag) = &node.kind else {
            continue;
        };
        for attr in &tag.attrs {
            if let Some(renamed) = data_name(attr.name, prefixes) {
                edits.push((attr.name_offset, attr.name.len(), renamed));
            }
        }
    }

    let mut out = String::with_capacity(src.len() + edits.len() * 5);
    let mut cursor = 0;
    for (offset, len, replacement) in edits {
        out.push_str(&src[cursor..offset]);
        out.push_str(&replacement);
        cursor = offset + len;
    }
    out.push_str(&src[cursor..]);
    Ok(out)
}

fn data_name(name: &str, prefixes: &[String]) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let bare = lower.strip_prefix("x-").unwrap_or(&lower);

    prefixes.iter().find_map(|prefix| {
        let rest = bare.strip_prefix(prefix.as_str())?;
        let mut chars = rest.chars();
        match chars.next() {
            Some('-' | ':' | '_') if !chars.as_str().is_empty() => {
                Some(format!("data-{prefix}-{}", chars.as_str()))
            }
            _ => None,
        }
    })
}

#[derive(Debug, Clone)]
pub struct Htmlify {
    prefixes: Vec<String>,
}

impl Htmlify {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }
}

impl Transform for Htmlify {
    fn name(&self) -> &str {
        "htmlify"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        let html = htmlify(asset.text()?, &self.prefixes).with_context(|| format!("htmlifying {}", asset.origin))?;
        asset.set_text(html);
        Ok(vec![asset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ng() -> Vec<String> {
        vec!["ng".to_string()]
    }

    #[test]
    fn rewrites_every_spelling() {
        let src = "<html ng-app=\"app\">\n<div ng:controller=\"C\" ng_click=\"go()\" x-ng-show=\"on\" data-ng-if=\"x\" ngx=\"y\">{{a}}</div></html>";
        assert_eq!(
            htmlify(src, &ng()).unwrap(),
            "<html data-ng-app=\"app\">\n<div data-ng-controller=\"C\" data-ng-click=\"go()\" data-ng-show=\"on\" data-ng-if=\"x\" ngx=\"y\">{{a}}</div></html>"
        );
    }

    #[test]
    fn leaves_text_and_scripts_alone() {
        let src = "<p>ng-app</p><script>var s = '<a ng-href=\"x\">';</script>";
        assert_eq!(htmlify(src, &ng()).unwrap(), src);
    }
}
