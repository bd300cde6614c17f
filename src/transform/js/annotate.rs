// src/transform/js/annotate.rs

//! Dependency-injection annotation for Angular modules.
//!
//! Injectable functions get their parameter names spelled out as strings so
//! that they survive minification:
//!
//! ```text
//! app.controller("Ctrl", function($scope, $http) { .. });
//! app.controller("Ctrl", ["$scope", "$http", function($scope, $http) { .. }]);
//! ```

use std::collections::{BTreeMap, HashSet};

use super::lexer::{LexError, MappedWriter, Token, TokenKind, tokenize};
use crate::pipeline::sourcemap::SourceMap;

/// Methods whose last argument is an injectable function. `config` and
/// `run` take the function alone; the rest take a string name first.
const INJECTABLE_METHODS: [&str; 11] = [
    "controller",
    "service",
    "factory",
    "directive",
    "filter",
    "provider",
    "component",
    "config",
    "run",
    "decorator",
    "animation",
];

pub fn annotate(src: &str, incoming: Option<&SourceMap>, source: &str) -> Result<(String, SourceMap), LexError> {
    let tokens = tokenize(src)?;
    let plan = Annotator::new(&tokens).plan();

    let mut w = MappedWriter::new(incoming, source, src);
    for (i, tok) in tokens.iter().enumerate() {
        if let Some(text) = plan.before.get(&i) {
            w.raw(text);
        }
        if tok.is_significant() {
            w.token(tok, tok.text);
        } else {
            w.raw(tok.text);
        }
        if let Some(text) = plan.after.get(&i) {
            w.raw(text);
        }
    }

    Ok(w.finish())
}

#[derive(Default)]
struct Plan {
    /// Text inserted before a token, keyed by token index.
    before: BTreeMap<usize, String>,
    /// Text inserted after a token, keyed by token index.
    after: BTreeMap<usize, String>,
}

struct Function<'a> {
    /// Index (into the significant list) of the `function` keyword.
    keyword: usize,
    name: Option<&'a str>,
    params: Vec<&'a str>,
    /// Index of the body's closing brace.
    body_end: usize,
}

struct Annotator<'t, 'a> {
    tokens: &'t [Token<'a>],
    sig: Vec<usize>,
    /// Variables bound to `angular.module(..)` in this file.
    modules: HashSet<&'a str>,
    done: HashSet<usize>,
    plan: Plan,
}

impl<'t, 'a> Annotator<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        let sig: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].is_significant()).collect();
        let at = |k: usize| sig.get(k).map(|&i| &tokens[i]);
        let modules = (0..sig.len())
            .filter(|&k| {
                at(k).is_some_and(|t| t.kind == TokenKind::Ident)
                    && at(k + 1).is_some_and(|t| t.is_punct("="))
                    && at(k + 2).is_some_and(|t| t.is_ident("angular"))
                    && at(k + 3).is_some_and(|t| t.is_punct("."))
                    && at(k + 4).is_some_and(|t| t.is_ident("module"))
                    && at(k + 5).is_some_and(|t| t.is_punct("("))
            })
            .filter_map(|k| at(k).map(|t| t.text))
            .collect();
        Self {
            tokens,
            sig,
            modules,
            done: HashSet::new(),
            plan: Plan::default(),
        }
    }

    fn tok(&self, k: usize) -> Option<&'t Token<'a>> {
        let tokens = self.tokens;
        self.sig.get(k).map(|&i| &tokens[i])
    }

    fn plan(mut self) -> Plan {
        for k in 0..self.sig.len() {
            self.injectable_call(k);
            self.directive_controller(k);
            self.explicit_marker(k);
        }
        self.plan
    }

    /// `.controller("Name", function(a) {..})` and friends.
    ///
    /// `.run(fn)` and `.config(fn)` only count on a module: a chain rooted
    /// at `angular.module(..)` or a variable bound to one. Otherwise
    /// `job.run(function(done) {..})` would be rewritten.
    fn injectable_call(&mut self, k: usize) {
        let method = match (self.tok(k), self.tok(k + 1), self.tok(k + 2)) {
            (Some(dot), Some(name), Some(paren))
                if dot.is_punct(".")
                    && name.kind == TokenKind::Ident
                    && INJECTABLE_METHODS.contains(&name.text)
                    && paren.is_punct("(") =>
            {
                name.text
            }
            _ => return,
        };
        let Some(close) = self.matching(k + 2) else {
            return;
        };
        let args = self.argument_starts(k + 2, close);

        let func_arg = match (method, args.as_slice()) {
            ("config" | "run", &[only]) if k > 0 && self.is_module(k - 1) => only,
            ("config" | "run", _) => return,
            (_, &[name, func])
                if func == name + 2 && self.tok(name).is_some_and(|t| t.kind == TokenKind::String) =>
            {
                func
            }
            _ => return,
        };
        if let Some(func) = self.function_at(func_arg) {
            self.wrap(&func);
        }
    }

    /// Whether the expression ending at `end` is an Angular module.
    fn is_module(&self, end: usize) -> bool {
        let mut end = end;
        loop {
            let Some(t) = self.tok(end) else {
                return false;
            };
            if t.kind == TokenKind::Ident {
                let chained = end > 0 && self.tok(end - 1).is_some_and(|p| p.is_punct("."));
                return !chained && self.modules.contains(t.text);
            }
            if !t.is_punct(")") {
                return false;
            }
            let Some(open) = self.matching_backwards(end) else {
                return false;
            };
            if open < 3 || !self.tok(open - 2).is_some_and(|p| p.is_punct(".")) {
                return false;
            }
            if self.tok(open - 1).is_some_and(|m| m.is_ident("module"))
                && self.tok(open - 3).is_some_and(|r| r.is_ident("angular"))
            {
                return true;
            }
            end = open - 3;
        }
    }

    /// `controller: function($scope) {..}` inside a directive definition.
    fn directive_controller(&mut self, k: usize) {
        let is_prop = self.tok(k).is_some_and(|t| t.is_ident("controller"))
            && self.tok(k + 1).is_some_and(|t| t.is_punct(":"));
        if !is_prop {
            return;
        }
        if let Some(func) = self.function_at(k + 2) {
            self.wrap(&func);
        }
    }

    /// A function whose body starts with the `"ngInject"` prologue.
    fn explicit_marker(&mut self, k: usize) {
        let is_marker = self
            .tok(k)
            .is_some_and(|t| t.kind == TokenKind::String && matches!(t.text, "\"ngInject\"" | "'ngInject'"));
        let after_brace = k >= 1 && self.tok(k - 1).is_some_and(|t| t.is_punct("{"));
        if !is_marker || !after_brace || k < 2 {
            return;
        }

        let Some(open_paren) = self.matching_backwards(k - 2) else {
            return;
        };
        let keyword = match self.tok(open_paren.wrapping_sub(1)) {
            Some(t) if t.is_ident("function") => open_paren - 1,
            Some(t) if t.kind == TokenKind::Ident && open_paren >= 2 => {
                if self.tok(open_paren - 2).is_some_and(|t| t.is_ident("function")) {
                    open_paren - 2
                } else {
                    return;
                }
            }
            _ => return,
        };
        let Some(func) = self.function_at(keyword) else {
            return;
        };

        let is_declaration = keyword == 0
            || self
                .tok(keyword - 1)
                .is_some_and(|t| t.is_punct(";") || t.is_punct("}") || t.is_punct("{"));

        match (is_declaration, func.name) {
            (true, Some(name)) => {
                if self.done.insert(func.keyword) {
                    let list = quoted_list(&func.params);
                    self.plan
                        .after
                        .insert(self.sig[func.body_end], format!("\n{name}.$inject = [{list}];"));
                }
            }
            _ => self.wrap(&func),
        }
    }

    fn wrap(&mut self, func: &Function<'a>) {
        if func.params.is_empty() || !self.done.insert(func.keyword) {
            return;
        }
        let list = quoted_list(&func.params);
        self.plan
            .before
            .entry(self.sig[func.keyword])
            .or_default()
            .push_str(&format!("[{list}, "));
        self.plan
            .after
            .entry(self.sig[func.body_end])
            .or_default()
            .insert(0, ']');
    }

    /// Parse `function [name](a, b) { .. }` starting at significant index `k`.
    fn function_at(&self, k: usize) -> Option<Function<'a>> {
        if !self.tok(k)?.is_ident("function") {
            return None;
        }
        let mut cursor = k + 1;
        let mut name = None;
        let next = self.tok(cursor)?;
        if next.kind == TokenKind::Ident {
            name = Some(next.text);
            cursor += 1;
        }
        if !self.tok(cursor)?.is_punct("(") {
            return None;
        }
        cursor += 1;

        let mut params = Vec::new();
        loop {
            let t = self.tok(cursor)?;
            if t.is_punct(")") {
                break;
            }
            if t.kind != TokenKind::Ident {
                // Destructuring or defaults: leave it to the author.
                return None;
            }
            params.push(t.text);
            cursor += 1;
            let sep = self.tok(cursor)?;
            if sep.is_punct(",") {
                cursor += 1;
            } else if !sep.is_punct(")") {
                return None;
            }
        }

        let body_start = cursor + 1;
        if !self.tok(body_start)?.is_punct("{") {
            return None;
        }
        let body_end = self.matching(body_start)?;

        Some(Function {
            keyword: k,
            name,
            params,
            body_end,
        })
    }

    /// Index of the bracket closing the one at `open`.
    fn matching(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for k in open..self.sig.len() {
            let t = self.tok(k)?;
            if t.kind != TokenKind::Punct {
                continue;
            }
            match t.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Index of the bracket opening the one at `close`.
    fn matching_backwards(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for k in (0..=close).rev() {
            let t = self.tok(k)?;
            if t.kind != TokenKind::Punct {
                continue;
            }
            match t.text {
                ")" | "]" | "}" => depth += 1,
                "(" | "[" | "{" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// First token of each top-level argument between `open` and `close`.
    fn argument_starts(&self, open: usize, close: usize) -> Vec<usize> {
        if close == open + 1 {
            return Vec::new();
        }
        let mut depth = 0usize;
        let mut starts = vec![open + 1];
        for k in open + 1..close {
            let Some(t) = self.tok(k) else { break };
            if t.kind != TokenKind::Punct {
                continue;
            }
            match t.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "," if depth == 0 => starts.push(k + 1),
                _ => {}
            }
        }
        starts
    }
}

fn quoted_list(params: &[&str]) -> String {
    params
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(src: &str) -> String {
        annotate(src, None, "app.js").unwrap().0
    }

    #[test]
    fn wraps_injectable_functions() {
        let src = "angular.module('app').controller('Ctrl', function($scope, $http) { go(); });";
        assert_eq!(
            ann(src),
            "angular.module('app').controller('Ctrl', [\"$scope\", \"$http\", function($scope, $http) { go(); }]);"
        );
    }

    #[test]
    fn config_blocks_and_directive_controllers() {
        let src = "var app = angular.module('app', []);\napp.config(function($routeProvider) {});\napp.directive('d', function() { return { controller: function($element) {} }; });";
        let out = ann(src);
        assert!(out.contains("app.config([\"$routeProvider\", function($routeProvider) {}]);"));
        assert!(out.contains("controller: [\"$element\", function($element) {}]"));
        assert!(out.contains("app.directive('d', function() {"));
    }

    #[test]
    fn leaves_annotated_and_parameterless_functions_alone() {
        let src = "app.run(['$rootScope', function($rootScope) {}]);\napp.run(function() {});";
        assert_eq!(ann(src), src);
    }

    #[test]
    fn module_chains_count_for_run_blocks() {
        let src = "angular.module('app').controller('C', function() {}).run(function($rootScope) {});";
        assert!(ann(src).ends_with(".run([\"$rootScope\", function($rootScope) {}]);"));
    }

    #[test]
    fn ordinary_method_calls_are_not_rewritten() {
        for src in [
            "var ok = items.filter(function(item) { return item.ok; });",
            "arr.filter(function(x) {});",
            "x.run(function(d) {});",
            "job.config(function(opts) {});",
            "cache.factory(make, function(a) {});",
            "app.controller('Ctrl', function(a) {}, extra);",
        ] {
            assert_eq!(ann(src), src);
        }
    }

    #[test]
    fn ng_inject_marks_declarations() {
        let src = "function Svc($q) {\n  \"ngInject\";\n}\n";
        assert_eq!(ann(src), "function Svc($q) {\n  \"ngInject\";\n}\nSvc.$inject = [\"$q\"];\n");
    }
}
