//! Recursive rendering of a markup tree into gloss text plus side channels.

use crate::config::RELATION_MAX_INDEX;
use crate::diagnostics::Diagnostics;
use crate::markup::{parse, MarkupNode, Template};
use crate::segment::rm_brackets;
use crate::templates::{dispatch, relation_key, Action, ParamKey};
use indexmap::IndexMap;
use tracing::trace;

const SILENT_NAMESPACES: &[&str] = &["category:", "file:", "image:"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderResult {
    /// Inline text as a reader would see it, trimmed
    pub text: String,
    pub unknown_templates: Vec<String>,
    /// Inflection and alternate-form templates waiting for the cross-reference pass
    pub conjugation_refs: Vec<String>,
    pub conjugation_tables: Vec<String>,
    /// Relation key (`syn`, `ant`, ...) to terms in encounter order
    pub relation_terms: IndexMap<String, Vec<String>>,
    pub reverse_translation_refs: Vec<String>,
}

impl RenderResult {
    /// Moves the child's side channels into `self` and hands back its text.
    fn absorb(&mut self, child: RenderResult) -> String {
        self.unknown_templates.extend(child.unknown_templates);
        self.conjugation_refs.extend(child.conjugation_refs);
        self.conjugation_tables.extend(child.conjugation_tables);
        for (key, terms) in child.relation_terms {
            self.relation_terms.entry(key).or_default().extend(terms);
        }
        self.reverse_translation_refs
            .extend(child.reverse_translation_refs);
        child.text
    }
}

pub fn render_markup(raw: &str, diagnostics: &mut Diagnostics) -> RenderResult {
    let nodes = parse(raw);
    render_nodes(&nodes, diagnostics)
}

pub fn render_nodes(nodes: &[MarkupNode], diagnostics: &mut Diagnostics) -> RenderResult {
    let mut result = RenderResult::default();
    let mut text = String::new();

    for node in nodes {
        match node {
            MarkupNode::Text(run) => text.push_str(run),
            MarkupNode::Link { target, display } => {
                if is_silent_link(target) {
                    continue;
                }
                let child = match display {
                    Some(display) if !display.is_empty() => render_nodes(display, diagnostics),
                    _ => render_markup(target, diagnostics),
                };
                text.push_str(&result.absorb(child));
            }
            MarkupNode::Template(template) => {
                render_template(template, &mut result, &mut text, diagnostics)
            }
        }
    }

    result.text = text.trim().to_string();
    result
}

fn is_silent_link(target: &str) -> bool {
    let lower = target.trim_start_matches(':').to_lowercase();
    SILENT_NAMESPACES.iter().any(|ns| lower.starts_with(ns))
}

fn render_template(
    template: &Template,
    result: &mut RenderResult,
    text: &mut String,
    diagnostics: &mut Diagnostics,
) {
    let name = template.name.as_str();
    diagnostics.record_template(name);

    match dispatch(name) {
        Action::Suppress => {}
        Action::Extract(keys) => {
            if let Some(value) = first_present(template, keys) {
                render_param(value, result, text, diagnostics);
            }
        }
        Action::Fraction => {
            if let Some(numerator) = template.positional(1) {
                render_param(numerator, result, text, diagnostics);
            }
            text.push('/');
            if let Some(denominator) = template.positional(2) {
                render_param(denominator, result, text, diagnostics);
            }
        }
        Action::Defer(keys) => {
            match first_present(template, keys).filter(|v| !v.trim().is_empty()) {
                Some(gloss) => render_param(gloss, result, text, diagnostics),
                None => result.conjugation_refs.push(template.source.clone()),
            }
        }
        Action::ConjugationTable => result.conjugation_tables.push(template.source.clone()),
        Action::ReverseTranslation => result
            .reverse_translation_refs
            .push(template.source.clone()),
        Action::Relation => collect_relation_terms(template, result),
        Action::Unknown => {
            trace!(template = name, "Unrecognized template");
            diagnostics.record_unknown(name);
            result.unknown_templates.push(template.source.clone());
        }
    }
}

/// The first key that is present wins, even if its value turns out blank.
fn first_present<'t>(template: &'t Template, keys: &[ParamKey]) -> Option<&'t str> {
    keys.iter().find_map(|key| match key {
        ParamKey::Pos(index) => template.positional(*index),
        ParamKey::Named(name) => template.get(name),
    })
}

fn render_param(
    value: &str,
    result: &mut RenderResult,
    text: &mut String,
    diagnostics: &mut Diagnostics,
) {
    if value.trim().is_empty() {
        return;
    }
    let child = render_markup(value, diagnostics);
    text.push_str(&result.absorb(child));
}

/// Reads terms from argument 2 upward, stopping at the first index with
/// neither a term nor a `tN` gloss.
fn collect_relation_terms(template: &Template, result: &mut RenderResult) {
    let key = relation_key(&template.name);
    for index in 2..RELATION_MAX_INDEX {
        let value = template.positional(index).filter(|v| !v.is_empty());
        if let Some(value) = value {
            let term = rm_brackets(value, &[('<', '>')]);
            let term = term.trim();
            if !term.is_empty() && !term.contains(':') && !term.contains(';') {
                result
                    .relation_terms
                    .entry(key.clone())
                    .or_default()
                    .push(term.to_string());
            }
        }
        if value.is_none() && template.get(&format!("t{}", index)).is_none() {
            break;
        }
    }
}
