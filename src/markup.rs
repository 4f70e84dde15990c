//! Wikitext markup tree for a single line.
//!
//! Only the subset needed for gloss extraction is modelled: text runs,
//! `[[links]]` and `{{templates}}`. Parsing never fails; an opener without a
//! matching closer is kept as plain text.

use memchr::memchr2;
use once_cell::sync::Lazy;
use regex::Regex;

static REF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ref\b[^>]*/>|<ref\b[^>]*>.*?</ref\s*>").unwrap());

static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static FORMAT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:sup|sub|span|small|big|br|i|b|u|s|em|strong|nowiki|abbr|code|div|font|math|chem)(?:\s[^<>]*)?/?>",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Link {
        target: String,
        display: Option<Vec<MarkupNode>>,
    },
    Template(Template),
}

/// One template argument. Unnamed arguments are numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub params: Vec<Param>,
    /// The template exactly as written, braces included.
    pub source: String,
}

impl Template {
    /// Value of the last argument called `name`, as MediaWiki resolves duplicates.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.get(&index.to_string())
    }

    /// Arguments written as `key=value` whose key is not a number.
    pub fn named_params(&self) -> impl Iterator<Item = &Param> {
        self.params
            .iter()
            .filter(|p| p.name.parse::<usize>().is_err())
    }
}

/// Splits one line of markup into nodes.
pub fn parse(raw: &str) -> Vec<MarkupNode> {
    let bytes = raw.as_bytes();
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while let Some(offset) = memchr2(b'{', b'[', &bytes[i..]) {
        let pos = i + offset;
        let open = bytes[pos];
        if bytes.get(pos + 1) != Some(&open) {
            i = pos + 1;
            continue;
        }
        let close = if open == b'{' { b'}' } else { b']' };
        match find_matching_close(bytes, pos, open, close) {
            Some(end) => {
                push_text(&mut nodes, &raw[text_start..pos]);
                let inner = &raw[pos + 2..end];
                let node = if open == b'{' {
                    parse_template(inner, &raw[pos..end + 2])
                } else {
                    parse_link(inner)
                };
                nodes.push(node);
                i = end + 2;
                text_start = i;
            }
            None => i = pos + 2,
        }
    }

    push_text(&mut nodes, &raw[text_start..]);
    nodes
}

fn push_text(nodes: &mut Vec<MarkupNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(MarkupNode::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(MarkupNode::Text(text.to_string()));
    }
}

fn parse_template(inner: &str, source: &str) -> MarkupNode {
    let segments = split_at_depth_zero(inner, b'|');
    let name = segments[0].trim();
    if name.is_empty() {
        return MarkupNode::Text(source.to_string());
    }

    let mut params = Vec::with_capacity(segments.len() - 1);
    let mut next_index = 0usize;
    for segment in &segments[1..] {
        let param = match find_at_depth_zero(segment, b'=') {
            Some(eq) => Param {
                name: segment[..eq].trim().to_string(),
                value: segment[eq + 1..].to_string(),
            },
            None => {
                next_index += 1;
                Param {
                    name: next_index.to_string(),
                    value: segment.to_string(),
                }
            }
        };
        params.push(param);
    }

    MarkupNode::Template(Template {
        name: name.to_string(),
        params,
        source: source.to_string(),
    })
}

fn parse_link(inner: &str) -> MarkupNode {
    let segments = split_at_depth_zero(inner, b'|');
    let target = segments[0].trim().to_string();
    let display = if segments.len() > 1 {
        segments.last().map(|s| parse(s))
    } else {
        None
    };
    MarkupNode::Link { target, display }
}

/// Index of the closing pair that balances the opener at `start`.
pub fn find_matching_close(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == open && bytes[i + 1] == open {
            depth += 1;
            i += 2;
        } else if bytes[i] == close && bytes[i + 1] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// Splits on `sep` outside any nested `{{ }}` or `[[ ]]`.
pub fn split_at_depth_zero(content: &str, sep: u8) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last_split = 0;
    for pos in depth_zero_positions(content, sep) {
        segments.push(&content[last_split..pos]);
        last_split = pos + 1;
    }
    segments.push(&content[last_split..]);
    segments
}

fn find_at_depth_zero(content: &str, sep: u8) -> Option<usize> {
    depth_zero_positions(content, sep).next()
}

fn depth_zero_positions(content: &str, sep: u8) -> impl Iterator<Item = usize> + '_ {
    let bytes = content.as_bytes();
    let mut braces: i32 = 0;
    let mut brackets: i32 = 0;
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            let pair = bytes.get(i + 1) == Some(&bytes[i]);
            match bytes[i] {
                b'{' if pair => {
                    braces += 1;
                    i += 2;
                }
                b'}' if pair => {
                    braces -= 1;
                    i += 2;
                }
                b'[' if pair => {
                    brackets += 1;
                    i += 2;
                }
                b']' if pair => {
                    brackets -= 1;
                    i += 2;
                }
                b if b == sep && braces <= 0 && brackets <= 0 => {
                    i += 1;
                    return Some(i - 1);
                }
                _ => i += 1,
            }
        }
        None
    })
}

/// Joins physical lines so a template spanning a line break becomes one line.
///
/// Lines stay joined (with a single space) while more `{{` than `}}` have
/// been seen; a surplus of closers never carries over to later lines.
pub fn join_template_lines(text: &str) -> String {
    let mut joined = String::with_capacity(text.len());
    let mut level: i64 = 0;
    for (n, line) in text.split('\n').enumerate() {
        if n > 0 {
            joined.push(if level > 0 { ' ' } else { '\n' });
        }
        joined.push_str(line);
        level += line.matches("{{").count() as i64 - line.matches("}}").count() as i64;
        if level < 0 {
            level = 0;
        }
    }
    joined
}

/// Removes references and comments entirely, and formatting tags but not their text.
pub fn strip_html(line: &str) -> String {
    if !line.contains('<') {
        return line.to_string();
    }
    let without_refs = REF_REGEX.replace_all(line, "");
    let without_comments = COMMENT_REGEX.replace_all(&without_refs, "");
    FORMAT_TAG_REGEX
        .replace_all(&without_comments, "")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(node: &MarkupNode) -> &Template {
        match node {
            MarkupNode::Template(t) => t,
            other => panic!("expected template, got {:?}", other),
        }
    }

    #[test]
    fn plain_text_is_one_run() {
        let nodes = parse("just some words, nothing else");
        assert_eq!(
            nodes,
            vec![MarkupNode::Text("just some words, nothing else".to_string())]
        );
    }

    #[test]
    fn text_runs_survive_around_markup() {
        let raw = "to {{lb|en|rare}} [[realize]] (come {{m|en|x}}to) it";
        let text: String = parse(raw)
            .iter()
            .filter_map(|n| match n {
                MarkupNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "to   (come to) it");
    }

    #[test]
    fn template_positional_and_named_params() {
        let nodes = parse("{{female equivalent of|es|hermano|gloss=sister}}");
        let t = template(&nodes[0]);
        assert_eq!(t.name, "female equivalent of");
        assert_eq!(t.positional(1), Some("es"));
        assert_eq!(t.positional(2), Some("hermano"));
        assert_eq!(t.get("gloss"), Some("sister"));
        assert_eq!(t.positional(3), None);
        assert_eq!(t.source, "{{female equivalent of|es|hermano|gloss=sister}}");
    }

    #[test]
    fn explicit_numbered_param_does_not_shift_counter() {
        let nodes = parse("{{l|en|2=cat|dog}}");
        let t = template(&nodes[0]);
        assert_eq!(t.positional(1), Some("en"));
        // `dog` is the second unnamed argument and overrides 2=cat
        assert_eq!(t.positional(2), Some("dog"));
    }

    #[test]
    fn named_params_lists_only_keys() {
        let nodes = parse("{{syn|ru|a|t1=woman|b|q2=informal}}");
        let names: Vec<_> = template(&nodes[0])
            .named_params()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["t1", "q2"]);
    }

    #[test]
    fn nested_templates_stay_in_one_param() {
        let nodes = parse("{{lb|de|with {{m|de|von}}}} [[free]]");
        assert_eq!(nodes.len(), 3);
        let t = template(&nodes[0]);
        assert_eq!(t.positional(2), Some("with {{m|de|von}}"));
    }

    #[test]
    fn pipes_inside_links_do_not_split_params() {
        let nodes = parse("{{form of|ko|honorific|장모||[[mother-in-law]], wife's mother}}");
        let t = template(&nodes[0]);
        assert_eq!(t.positional(4), Some(""));
        assert_eq!(t.positional(5), Some("[[mother-in-law]], wife's mother"));
    }

    #[test]
    fn link_without_pipe_has_no_display() {
        let nodes = parse("[[free]]");
        assert_eq!(
            nodes,
            vec![MarkupNode::Link {
                target: "free".to_string(),
                display: None
            }]
        );
    }

    #[test]
    fn link_display_is_last_segment() {
        let nodes = parse("[[#English|a|test]]");
        match &nodes[0] {
            MarkupNode::Link { target, display } => {
                assert_eq!(target, "#English");
                assert_eq!(
                    display.as_deref(),
                    Some(&[MarkupNode::Text("test".to_string())][..])
                );
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn link_display_may_hold_template() {
        let nodes = parse("[[x|{{gloss|y}}]]");
        match &nodes[0] {
            MarkupNode::Link {
                display: Some(display),
                ..
            } => assert!(matches!(display[0], MarkupNode::Template(_))),
            other => panic!("expected link with display, got {:?}", other),
        }
    }

    #[test]
    fn unclosed_template_is_text() {
        let nodes = parse("{{unclosed|x and [[free]]");
        assert_eq!(nodes[0], MarkupNode::Text("{{unclosed|x and ".to_string()));
        assert!(matches!(nodes[1], MarkupNode::Link { .. }));
    }

    #[test]
    fn stray_closers_are_text() {
        let nodes = parse("a }} b ]] c");
        assert_eq!(nodes, vec![MarkupNode::Text("a }} b ]] c".to_string())]);
    }

    #[test]
    fn empty_template_name_is_text() {
        let nodes = parse("{{ }}");
        assert_eq!(nodes, vec![MarkupNode::Text("{{ }}".to_string())]);
    }

    #[test]
    fn non_ascii_around_markup() {
        let nodes = parse("жена́ {{q|ru}} мать");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2], MarkupNode::Text(" мать".to_string()));
    }

    #[test]
    fn find_matching_close_nested() {
        let text = b"{{outer {{inner}} end}}";
        assert_eq!(find_matching_close(text, 0, b'{', b'}'), Some(21));
    }

    #[test]
    fn split_at_depth_zero_respects_links_and_templates() {
        let result = split_at_depth_zero("a|b={{x|y}}|[[c|d]]", b'|');
        assert_eq!(result, vec!["a", "b={{x|y}}", "[[c|d]]"]);
    }

    #[test]
    fn join_template_lines_basic() {
        assert_eq!(
            join_template_lines("{{test}}\n{{test\ntest}}"),
            "{{test}}\n{{test test}}"
        );
        assert_eq!(
            join_template_lines("{{test}} {{a\nb c d\ne}}"),
            "{{test}} {{a b c d e}}"
        );
    }

    #[test]
    fn join_template_lines_ignores_surplus_closers() {
        assert_eq!(join_template_lines("a }}\nb\nc"), "a }}\nb\nc");
    }

    #[test]
    fn strip_html_removes_refs_with_content() {
        let line = r#"to [[realize]]<ref name="h">{{cite book|title=X}}</ref> now<ref name="h"/>"#;
        assert_eq!(strip_html(line), "to [[realize]] now");
    }

    #[test]
    fn strip_html_keeps_formatting_text() {
        assert_eq!(strip_html("H<sub>2</sub>O<br/>x"), "H2Ox");
        assert_eq!(strip_html("a <!-- hidden --> b"), "a  b");
    }

    #[test]
    fn strip_html_leaves_inline_modifiers() {
        let line = "{{syn|ru|мо́дный<t:fashionable>}} <<c/United States>>";
        assert_eq!(strip_html(line), line);
    }
}
