// src/transform/templates.rs

//! Template cache: HTML files pre-registered as a script.

use crate::config::TemplatesSection;
use crate::pipeline::{Asset, PipelineError, Stage, StageContext};

/// Turns a batch of HTML assets into one `$templateCache` registration file.
#[derive(Debug, Clone)]
pub struct TemplateCache {
    module: String,
    prefix: String,
    standalone: bool,
    file_name: String,
}

impl TemplateCache {
    pub fn from_config(section: &TemplatesSection) -> Self {
        Self {
            module: section.module.clone(),
            prefix: section.prefix.clone(),
            standalone: section.standalone,
            file_name: section.file_name.clone(),
        }
    }

    /// Cache key for a template: the prefix plus the bare file name.
    pub fn key(&self, relative: &str) -> String {
        let name = relative.rsplit('/').next().unwrap_or(relative);
        format!("{}{name}", self.prefix)
    }

    /// Generate the registration script for `(key, html)` pairs.
    pub fn render<'a>(&self, templates: impl IntoIterator<Item = (String, &'a str)>) -> String {
        let module = js_string(&self.module);
        let deps = if self.standalone { ", []" } else { "" };

        let mut out = format!(
            "angular.module({module}{deps}).run([\"$templateCache\", function($templateCache) {{"
        );
        for (key, html) in templates {
            out.push_str(&format!(
                "$templateCache.put({},{});\n",
                js_string(&key),
                js_string(html)
            ));
        }
        out.push_str("}]);");
        out
    }
}

impl Stage for TemplateCache {
    fn name(&self) -> &str {
        "template-cache"
    }

    fn run(&self, assets: Vec<Asset>, _ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        if assets.is_empty() {
            return Ok(assets);
        }

        let mut entries = Vec::with_capacity(assets.len());
        for asset in &assets {
            let html = asset.text().map_err(|e| PipelineError::File {
                stage: self.name().to_string(),
                file: asset.origin.clone(),
                message: e.to_string(),
            })?;
            entries.push((self.key(&asset.relative), html));
        }

        let code = self.render(entries);
        Ok(vec![Asset::new(
            self.file_name.clone(),
            self.file_name.clone(),
            code.into_bytes(),
        )])
    }
}

/// Double-quoted JavaScript string literal.
fn js_string(s: &str) -> String {
    // JSON string escaping is valid JS except for the two line separators.
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TemplateCache {
        TemplateCache::from_config(&TemplatesSection::default())
    }

    #[test]
    fn keys_are_prefix_plus_file_name() {
        assert_eq!(cache().key("components/foo/foo.html"), "templates/foo.html");
        assert_eq!(cache().key("bar.html"), "templates/bar.html");
    }

    #[test]
    fn renders_registration_script() {
        let out = cache().render(vec![("templates/a.html".to_string(), "<p class=\"x\">'hi'\n</p>")]);
        assert_eq!(
            out,
            "angular.module(\"templates\").run([\"$templateCache\", function($templateCache) {\
             $templateCache.put(\"templates/a.html\",\"<p class=\\\"x\\\">'hi'\\n</p>\");\n}]);"
        );
    }

    #[test]
    fn standalone_declares_the_module() {
        let mut section = TemplatesSection::default();
        section.standalone = true;
        let out = TemplateCache::from_config(&section).render(Vec::new());
        assert!(out.starts_with("angular.module(\"templates\", []).run("));
    }
}
