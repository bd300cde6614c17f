// src/transform/ngdocs.rs

//! API documentation from `@ngdoc` comment blocks.
//!
//! Produces `index.html` (items grouped by module and type), one page per
//! item under `api/`, and `api.json` with the parsed items.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use pulldown_cmark::{Parser, html};
use regex::Regex;
use serde::Serialize;

use crate::pipeline::{Asset, PipelineError, Stage, StageContext};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub description: String,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocReturns {
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocItem {
    /// The `@ngdoc` type: `directive`, `service`, `controller`, ...
    pub kind: String,
    pub name: String,
    pub module: Option<String>,
    /// Markdown source of `@description`.
    pub description: String,
    pub params: Vec<DocParam>,
    pub returns: Option<DocReturns>,
    pub example: Option<String>,
    pub requires: Vec<String>,
    /// Project-relative file the block was found in.
    pub source: String,
}

impl DocItem {
    /// Module name, falling back to the `module.` prefix of `name`.
    pub fn module_name(&self) -> &str {
        if let Some(m) = &self.module {
            return m;
        }
        match self.name.split_once('.') {
            Some((module, _)) if !module.is_empty() => module,
            _ => "global",
        }
    }

    pub fn page_name(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        format!("{slug}.html")
    }
}

/// Parse every `@ngdoc` block of one source file.
pub fn parse_file(source: &str, text: &str, blocks: &Regex) -> Vec<DocItem> {
    blocks
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|body| parse_block(source, body.as_str()))
        .collect()
}

fn strip_stars(body: &str) -> Vec<&str> {
    body.lines()
        .map(|line| {
            let t = line.trim_start();
            match t.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => t,
            }
        })
        .collect()
}

fn parse_block(source: &str, body: &str) -> Option<DocItem> {
    let lines = strip_stars(body);

    // Group lines by tag; untagged leading lines belong to the description.
    let mut sections: Vec<(String, String)> = vec![("description".to_string(), String::new())];
    for line in lines {
        if let Some(tagged) = line.trim_start().strip_prefix('@') {
            let (tag, rest) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
            sections.push((tag.to_string(), rest.trim().to_string()));
        } else if let Some((_, text)) = sections.last_mut() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line);
        }
    }

    let mut item = DocItem {
        source: source.to_string(),
        ..DocItem::default()
    };
    let mut is_doc = false;
    let mut description = Vec::new();

    for (tag, value) in sections {
        match tag.as_str() {
            "ngdoc" => {
                is_doc = true;
                item.kind = first_word(&value);
            }
            "name" => item.name = first_word(&value),
            "module" => item.module = Some(first_word(&value)),
            "description" => description.push(value.trim().to_string()),
            "param" => item.params.push(parse_param(&value)),
            "returns" | "return" => {
                let (ty, rest) = split_type(&value);
                item.returns = Some(DocReturns {
                    ty,
                    description: rest.trim().to_string(),
                });
            }
            "example" => item.example = Some(value.trim_matches('\n').to_string()),
            "requires" => item.requires.push(first_word(&value)),
            _ => {}
        }
    }

    if !is_doc || item.name.is_empty() {
        return None;
    }
    item.description = description
        .into_iter()
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(item)
}

fn first_word(value: &str) -> String {
    value.split_whitespace().next().unwrap_or_default().to_string()
}

/// `{Type} rest` -> (Some("Type"), "rest").
fn split_type(value: &str) -> (Option<String>, &str) {
    let value = value.trim_start();
    if let Some(inner) = value.strip_prefix('{') {
        if let Some(end) = inner.find('}') {
            return (Some(inner[..end].to_string()), &inner[end + 1..]);
        }
    }
    (None, value)
}

fn parse_param(value: &str) -> DocParam {
    let (mut ty, rest) = split_type(value);
    let rest = rest.trim_start();
    let (raw_name, description) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

    let mut optional = false;
    let mut name = raw_name.to_string();
    if let Some(inner) = raw_name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        optional = true;
        name = inner.split('=').next().unwrap_or(inner).to_string();
    }
    if let Some(t) = ty.as_mut() {
        if let Some(stripped) = t.strip_suffix('=') {
            optional = true;
            *t = stripped.to_string();
        }
    }

    DocParam {
        name,
        ty,
        description: description.trim().to_string(),
        optional,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn markdown(src: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(src));
    out
}

fn page(title: &str, body: &str, stylesheet_path: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"{stylesheet_path}docs.css\">\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

pub fn render_index(items: &[DocItem]) -> String {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<&DocItem>>> = BTreeMap::new();
    for item in items {
        grouped
            .entry(item.module_name())
            .or_default()
            .entry(item.kind.as_str())
            .or_default()
            .push(item);
    }

    let mut body = String::from("<h1>API Reference</h1>\n");
    for (module, kinds) in grouped {
        let _ = writeln!(body, "<section class=\"module\">\n<h2>{}</h2>", escape(module));
        for (kind, mut entries) in kinds {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            let _ = writeln!(body, "<h3>{}</h3>\n<ul>", escape(kind));
            for item in entries {
                let _ = writeln!(
                    body,
                    "<li><a href=\"api/{}\">{}</a></li>",
                    escape(&item.page_name()),
                    escape(&item.name)
                );
            }
            body.push_str("</ul>\n");
        }
        body.push_str("</section>\n");
    }

    page("API Reference", &body, "")
}

pub fn render_item(item: &DocItem) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1>{} <small>{} in module {}</small></h1>",
        escape(&item.name),
        escape(&item.kind),
        escape(item.module_name())
    );

    if !item.description.is_empty() {
        let _ = writeln!(body, "<div class=\"description\">\n{}</div>", markdown(&item.description));
    }

    if !item.requires.is_empty() {
        body.push_str("<h2>Dependencies</h2>\n<ul>\n");
        for dep in &item.requires {
            let _ = writeln!(body, "<li><code>{}</code></li>", escape(dep));
        }
        body.push_str("</ul>\n");
    }

    if !item.params.is_empty() {
        body.push_str("<h2>Parameters</h2>\n<table>\n<tr><th>Param</th><th>Type</th><th>Details</th></tr>\n");
        for p in &item.params {
            let optional = if p.optional { " <em>(optional)</em>" } else { "" };
            let _ = writeln!(
                body,
                "<tr><td>{}{optional}</td><td>{}</td><td>{}</td></tr>",
                escape(&p.name),
                escape(p.ty.as_deref().unwrap_or("")),
                markdown(&p.description).trim()
            );
        }
        body.push_str("</table>\n");
    }

    if let Some(ret) = &item.returns {
        let _ = writeln!(
            body,
            "<h2>Returns</h2>\n<p><code>{}</code> {}</p>",
            escape(ret.ty.as_deref().unwrap_or("")),
            escape(&ret.description)
        );
    }

    if let Some(example) = &item.example {
        let _ = writeln!(body, "<h2>Example</h2>\n<pre><code>{}</code></pre>", escape(example));
    }

    let _ = writeln!(body, "<p class=\"source\">Defined in <code>{}</code></p>", escape(&item.source));
    page(&item.name, &body, "../")
}

const DOCS_CSS: &str = "body{font-family:sans-serif;max-width:60em;margin:2em auto;padding:0 1em}\
code,pre{background:#f4f4f4}pre{padding:1em;overflow:auto}table{border-collapse:collapse}\
td,th{border:1px solid #ddd;padding:.3em .6em;text-align:left}h1 small{color:#888;font-size:.5em}\n";

/// Collects every documented item in the stream and renders the site.
#[derive(Debug)]
pub struct NgDocs {
    blocks: Regex,
}

const DOC_BLOCK: &str = r"(?s)/\*\*(.*?)\*/";

impl NgDocs {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            blocks: Regex::new(DOC_BLOCK)?,
        })
    }
}

impl Stage for NgDocs {
    fn name(&self) -> &str {
        "ngdocs"
    }

    fn run(&self, assets: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        let mut items = Vec::new();
        for asset in &assets {
            ctx.cancel.check()?;
            let text = asset.text().map_err(|e| PipelineError::File {
                stage: self.name().to_string(),
                file: asset.origin.clone(),
                message: e.to_string(),
            })?;
            items.extend(parse_file(&asset.origin, text, &self.blocks));
        }
        items.sort_by(|a, b| (a.module_name(), &a.name).cmp(&(b.module_name(), &b.name)));

        let json = serde_json::to_string_pretty(&items).map_err(|e| PipelineError::stage(self.name(), e))?;

        let mut out = vec![
            Asset::new("index.html", "index.html", render_index(&items).into_bytes()),
            Asset::new("api.json", "api.json", json.into_bytes()),
            Asset::new("docs.css", "docs.css", DOCS_CSS.as_bytes().to_vec()),
        ];
        for item in &items {
            let name = format!("api/{}", item.page_name());
            out.push(Asset::new(name.clone(), item.source.clone(), render_item(item).into_bytes()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
/**
 * @ngdoc controller
 * @name app.controller:MainCtrl
 * @requires $scope
 * @description
 * The **main** controller.
 *
 * Second paragraph.
 * @param {Object} $scope the scope
 * @param {string=} [title] optional title
 * @returns {void} nothing
 */
function MainCtrl($scope) {}

/** A plain comment without the tag. */
"#;

    fn doc_block_regex() -> Regex {
        Regex::new(DOC_BLOCK).unwrap()
    }

    #[test]
    fn parses_tagged_blocks_only() {
        let items = parse_file("src/app/main.js", SRC, &doc_block_regex());
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.kind, "controller");
        assert_eq!(item.name, "app.controller:MainCtrl");
        assert_eq!(item.module_name(), "app");
        assert_eq!(item.requires, ["$scope"]);
        assert_eq!(item.description, "The **main** controller.\n\nSecond paragraph.");
        assert_eq!(item.params.len(), 2);
        assert!(item.params[1].optional);
        assert_eq!(item.params[1].name, "title");
        assert_eq!(item.params[1].ty.as_deref(), Some("string"));
        assert_eq!(item.returns.as_ref().and_then(|r| r.ty.as_deref()), Some("void"));
    }

    #[test]
    fn index_groups_by_module_and_renders_markdown_pages() {
        let items = parse_file("src/app/main.js", SRC, &doc_block_regex());
        let index = render_index(&items);
        assert!(index.contains("<h2>app</h2>"));
        assert!(index.contains("<h3>controller</h3>"));
        assert!(index.contains("href=\"api/app.controller_MainCtrl.html\""));

        let page = render_item(&items[0]);
        assert!(page.contains("<strong>main</strong>"));
    }
}
