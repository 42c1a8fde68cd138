//! Line-level source maps.
//!
//! Every generated line of a module body maps column 0 to the same line of
//! the module's original source (clamped to its last line). Lines the
//! emitter adds around module bodies stay unmapped.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [Option<String>],
    names: [&'a str; 0],
    mappings: String,
}

/// Accumulates generated text and, optionally, its line mappings.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    out: String,
    map: Option<MapState>,
}

#[derive(Debug, Default)]
struct MapState {
    sources: Vec<String>,
    contents: Vec<Option<String>>,
    /// One slot per generated line: `(source index, original line)`
    lines: Vec<Option<(u32, u32)>>,
}

impl ChunkWriter {
    pub fn new(source_maps: bool) -> Self {
        Self {
            out: String::new(),
            map: source_maps.then(MapState::default),
        }
    }

    /// Append generated text that has no original counterpart.
    pub fn push(&mut self, text: &str) {
        self.out.push_str(text);
        if let Some(map) = &mut self.map {
            let newlines = text.bytes().filter(|b| *b == b'\n').count();
            map.lines.extend(std::iter::repeat_n(None, newlines));
        }
    }

    /// Append a module body, mapping its lines onto `original`.
    ///
    /// `body` must end with a newline.
    pub fn push_mapped(&mut self, body: &str, source: &str, original: Option<&str>) {
        self.out.push_str(body);
        let Some(map) = &mut self.map else {
            return;
        };
        let newlines = body.bytes().filter(|b| *b == b'\n').count();
        let Some(original) = original else {
            map.lines.extend(std::iter::repeat_n(None, newlines));
            return;
        };

        let index = map.sources.len() as u32;
        map.sources.push(source.to_string());
        map.contents.push(Some(original.to_string()));
        let last = original.lines().count().saturating_sub(1) as u32;
        for line in 0..newlines as u32 {
            map.lines.push(Some((index, line.min(last))));
        }
    }

    /// Replace every `from` with `to`. Neither may span lines, so the line
    /// mappings stay valid.
    pub fn replace(&mut self, from: &str, to: &str) {
        debug_assert!(!from.contains('\n') && !to.contains('\n'));
        if self.out.contains(from) {
            self.out = self.out.replace(from, to);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Finish, returning the text and the map JSON for `file` when enabled.
    pub fn finish(self, file: &str) -> (String, Option<String>) {
        let map = self.map.map(|state| state.to_json(file));
        (self.out, map)
    }
}

impl MapState {
    fn to_json(&self, file: &str) -> String {
        let json = SourceMapJson {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.contents,
            names: [],
            mappings: self.mappings(),
        };
        serde_json::to_string(&json).unwrap_or_default()
    }

    fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;
        for (idx, slot) in self.lines.iter().enumerate() {
            if idx > 0 {
                out.push(';');
            }
            if let Some((source, line)) = slot {
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, *source as i64 - prev_source);
                encode_vlq(&mut out, *line as i64 - prev_line);
                encode_vlq(&mut out, 0);
                prev_source = *source as i64;
                prev_line = *line as i64;
            }
        }
        out
    }
}

/// Base64 VLQ, sign in the lowest bit.
fn encode_vlq(out: &mut String, value: i64) {
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
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    #[test]
    fn vlq_matches_reference_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn maps_body_lines_after_header() {
        let mut writer = ChunkWriter::new(true);
        writer.push("header\n");
        writer.push_mapped("a\nb\n", "src/a.js", Some("a\nb\n"));
        writer.push("footer\n");
        let (text, map) = writer.finish("main.js");
        assert_eq!(text, "header\na\nb\nfooter\n");

        let map: serde_json::Value = serde_json::from_str(&map.unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "src/a.js");
        assert_eq!(map["mappings"], ";AAAA;AACA;");
    }

    #[test]
    fn disabled_writer_has_no_map() {
        let mut writer = ChunkWriter::new(false);
        writer.push_mapped("x\n", "a.js", Some("x"));
        assert_eq!(writer.finish("a.js"), ("x\n".to_string(), None));
    }
}
