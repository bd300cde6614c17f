// src/transform/html/minify.rs

//! Whitespace collapsing for HTML templates.

use anyhow::Context;

use super::{MarkupError, Node, NodeKind, tokenize};
use crate::pipeline::{Asset, StageContext, Transform};

/// Elements around which whitespace is significant.
const INLINE_ELEMENTS: [&str; 31] = [
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "button", "cite", "code", "del", "dfn", "em",
    "font", "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "samp", "select",
    "small", "span", "strike", "strong", "sub", "sup",
];

/// Elements whose contents are left exactly as written.
const PRESERVE_ELEMENTS: [&str; 2] = ["pre", "textarea"];

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.iter().any(|n| name.eq_ignore_ascii_case(n))
}

fn is_preserving(name: &str) -> bool {
    PRESERVE_ELEMENTS.iter().any(|n| name.eq_ignore_ascii_case(n))
}

/// Does this neighbour allow whitespace next to it to survive?
fn keeps_space(node: Option<&Node<'_>>) -> bool {
    match node.map(|n| &n.kind) {
        Some(NodeKind::StartTag(tag)) => is_inline(tag.name),
        Some(NodeKind::EndTag(name)) => is_inline(name),
        Some(NodeKind::Text) => true,
        _ => false,
    }
}

pub fn collapse_whitespace(src: &str) -> Result<String, MarkupError> {
    let nodes = tokenize(src)?;
    let mut out = String::with_capacity(src.len());
    let mut preserve_depth = 0usize;

    for (i, node) in nodes.iter().enumerate() {
        match &node.kind {
            NodeKind::StartTag(tag) => {
                if preserve_depth > 0 {
                    out.push_str(node.raw);
                } else {
                    out.push_str(&tag.to_compact());
                }
                if is_preserving(tag.name) && !tag.self_closing {
                    preserve_depth += 1;
                }
            }
            NodeKind::EndTag(name) => {
                if is_preserving(name) {
                    preserve_depth = preserve_depth.saturating_sub(1);
                }
                if preserve_depth > 0 {
                    out.push_str(node.raw);
                } else {
                    out.push_str(&format!("</{name}>"));
                }
            }
            NodeKind::Text if preserve_depth == 0 => {
                let prev = i.checked_sub(1).and_then(|p| nodes.get(p));
                let next = nodes.get(i + 1);
                out.push_str(&collapse_text(node.raw, keeps_space(prev), keeps_space(next)));
            }
            _ => out.push_str(node.raw),
        }
    }

    Ok(out)
}

fn collapse_text(text: &str, keep_leading: bool, keep_trailing: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            in_space = true;
        } else {
            if in_space && (!out.is_empty() || keep_leading) {
                out.push(' ');
            }
            in_space = false;
            out.push(c);
        }
    }

    if in_space {
        // Whitespace-only text survives as one space only between two
        // inline neighbours; trailing space needs an inline follower.
        let keep = if out.is_empty() {
            keep_leading && keep_trailing
        } else {
            keep_trailing
        };
        if keep {
            out.push(' ');
        }
    }
    out
}

/// `collapseWhitespace` as a pipeline transform.
#[derive(Debug, Default)]
pub struct CollapseWhitespace;

impl Transform for CollapseWhitespace {
    fn name(&self) -> &str {
        "htmlmin"
    }

    fn apply(&self, mut asset: Asset, _ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>> {
        let html = collapse_whitespace(asset.text()?).with_context(|| format!("minifying {}", asset.origin))?;
        asset.set_text(html);
        Ok(vec![asset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_around_blocks_and_keeps_inline_gaps() {
        let src = "<div>\n  <p>  Hello   <b>big</b>   <i>world</i>  </p>\n</div>\n";
        assert_eq!(
            collapse_whitespace(src).unwrap(),
            "<div><p>Hello <b>big</b> <i>world</i></p></div>"
        );
    }

    #[test]
    fn preformatted_content_is_untouched() {
        let src = "<div>\n<pre>  a\n   b <b> c </b></pre>\n<textarea>  x  </textarea></div>";
        assert_eq!(
            collapse_whitespace(src).unwrap(),
            "<div><pre>  a\n   b <b> c </b></pre><textarea>  x  </textarea></div>"
        );
    }

    #[test]
    fn comments_and_attributes() {
        let src = "<ul   class=\"nav\"\n    ng-if=\"x\">\n <!-- item -->\n <li>a</li>\n</ul>";
        assert_eq!(
            collapse_whitespace(src).unwrap(),
            "<ul class=\"nav\" ng-if=\"x\"><!-- item --><li>a</li></ul>"
        );
    }
}
