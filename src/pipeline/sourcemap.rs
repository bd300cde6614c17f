// src/pipeline/sourcemap.rs

//! Version 3 source maps.
//!
//! Maps are kept decoded (one segment list per generated line) while assets
//! move through the pipeline and are only encoded when written.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Prefix under which sources show up in browser dev tools.
pub const SOURCE_ROOT: &str = "/source/";

/// One mapping from a generated column to an original position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub gen_col: u32,
    pub source: u32,
    pub src_line: u32,
    pub src_col: u32,
}

/// An original position a generated position maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub source: u32,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    /// Segments per generated line, sorted by `gen_col`.
    pub lines: Vec<Vec<Segment>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [Option<String>],
    names: [&'a str; 0],
    mappings: String,
    source_root: &'a str,
}

impl SourceMap {
    /// Each line of `content` maps to the same line of `source`.
    pub fn identity(source: &str, content: &str) -> Self {
        let line_count = content.split('\n').count();
        let lines = (0..line_count as u32)
            .map(|line| {
                vec![Segment {
                    gen_col: 0,
                    source: 0,
                    src_line: line,
                    src_col: 0,
                }]
            })
            .collect();

        Self {
            sources: vec![source.to_string()],
            sources_content: vec![Some(content.to_string())],
            lines,
        }
    }

    /// Every generated line maps to the start of `source`. Used where the
    /// producer reports no positions.
    pub fn file_level(source: &str, content: &str, generated: &str) -> Self {
        let line_count = generated.split('\n').count();
        let lines = (0..line_count)
            .map(|_| {
                vec![Segment {
                    gen_col: 0,
                    source: 0,
                    src_line: 0,
                    src_col: 0,
                }]
            })
            .collect();

        Self {
            sources: vec![source.to_string()],
            sources_content: vec![Some(content.to_string())],
            lines,
        }
    }

    /// Find the original position of a generated position.
    pub fn lookup(&self, line: u32, col: u32) -> Option<Origin> {
        let segments = self.lines.get(line as usize)?;
        let seg = segments.iter().rev().find(|s| s.gen_col <= col)?;
        Some(Origin {
            source: seg.source,
            line: seg.src_line,
            col: seg.src_col + (col - seg.gen_col),
        })
    }

    /// Index of `source`, adding it (with its content) when missing.
    pub fn source_index(&mut self, source: &str, content: Option<&String>) -> u32 {
        if let Some(idx) = self.sources.iter().position(|s| s == source) {
            return idx as u32;
        }
        self.sources.push(source.to_string());
        self.sources_content.push(content.cloned());
        (self.sources.len() - 1) as u32
    }

    /// Place `other` so that its first line lands on generated line
    /// `line_offset` of `self`.
    pub fn append(&mut self, other: &SourceMap, line_offset: usize) {
        let remap: Vec<u32> = other
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| self.source_index(s, other.sources_content.get(i).and_then(|c| c.as_ref())))
            .collect();

        let needed = line_offset + other.lines.len();
        if self.lines.len() < needed {
            self.lines.resize_with(needed, Vec::new);
        }

        for (i, segments) in other.lines.iter().enumerate() {
            let target = &mut self.lines[line_offset + i];
            for seg in segments {
                if let Some(&source) = remap.get(seg.source as usize) {
                    target.push(Segment { source, ..*seg });
                }
            }
            target.sort_by_key(|s| s.gen_col);
        }
    }

    /// Record a segment on generated line `line`.
    pub fn push(&mut self, line: u32, segment: Segment) {
        let line = line as usize;
        if self.lines.len() <= line {
            self.lines.resize_with(line + 1, Vec::new);
        }
        self.lines[line].push(segment);
    }

    /// Base64 VLQ `mappings` string.
    pub fn encode_mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;
        let mut prev_col = 0i64;

        for (i, segments) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let mut prev_gen = 0i64;
            for (j, seg) in segments.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                encode_vlq(seg.gen_col as i64 - prev_gen, &mut out);
                encode_vlq(seg.source as i64 - prev_source, &mut out);
                encode_vlq(seg.src_line as i64 - prev_line, &mut out);
                encode_vlq(seg.src_col as i64 - prev_col, &mut out);
                prev_gen = seg.gen_col as i64;
                prev_source = seg.source as i64;
                prev_line = seg.src_line as i64;
                prev_col = seg.src_col as i64;
            }
        }

        out
    }

    /// Serialize as a v3 JSON document for generated file `file`.
    pub fn to_json(&self, file: &str) -> serde_json::Result<String> {
        serde_json::to_string(&SourceMapJson {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.sources_content,
            names: [],
            mappings: self.encode_mappings(),
            source_root: SOURCE_ROOT,
        })
    }
}

/// Append one base64 VLQ value.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut s = String::new();
        encode_vlq(value, &mut s);
        s
    }

    #[test]
    fn vlq_known_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn identity_map_encodes_one_segment_per_line() {
        let map = SourceMap::identity("a.js", "x\ny\nz");
        assert_eq!(map.encode_mappings(), "AAAA;AACA;AACA");
    }

    #[test]
    fn append_shifts_lines_and_merges_sources() {
        let mut combined = SourceMap::identity("a.js", "a1\na2");
        combined.append(&SourceMap::identity("b.js", "b1"), 2);

        assert_eq!(combined.sources, ["a.js", "b.js"]);
        let origin = combined.lookup(2, 1).unwrap();
        assert_eq!(origin, Origin { source: 1, line: 0, col: 1 });
    }

    #[test]
    fn json_carries_source_root_and_contents() {
        let json = SourceMap::identity("a.js", "x").to_json("a.js").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["sourceRoot"], "/source/");
        assert_eq!(value["sourcesContent"][0], "x");
    }
}
