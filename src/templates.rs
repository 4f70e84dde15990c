//! Ordered dispatch table for template names.
//!
//! Rules are checked top to bottom and the first match decides how a
//! template renders. Names not matched by any rule fall back to
//! [`Action::Unknown`].

/// Where to look for a template argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Pos(usize),
    Named(&'static str),
}

use ParamKey::{Named, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact(&'static [&'static str]),
    Contains(&'static str),
    EndsWith(&'static str),
    /// Language-prefixed family such as `es-verb form of` or `de-inflected`
    LanguageCoded,
}

impl NameMatch {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(names) => names.contains(&name),
            NameMatch::Contains(needle) => name.contains(needle),
            NameMatch::EndsWith(suffix) => name.ends_with(suffix),
            NameMatch::LanguageCoded => {
                name.chars().count() > 5 && name.chars().nth(2) == Some('-')
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Render nothing, record nothing
    Suppress,
    /// Render the first present argument among the keys
    Extract(&'static [ParamKey]),
    /// Render numerator and denominator joined by `/`
    Fraction,
    /// Render a gloss if one is present, otherwise defer the template to the cross-reference pass
    Defer(&'static [ParamKey]),
    /// Conjugation table to expand later
    ConjugationTable,
    ReverseTranslation,
    /// Collect terms from argument 2 onward into a relation list
    Relation,
    Unknown,
}

pub struct Rule {
    pub matcher: NameMatch,
    pub action: Action,
}

const fn rule(matcher: NameMatch, action: Action) -> Rule {
    Rule { matcher, action }
}

const SUPPRESSED: &[&str] = &[
    // definition requests
    "rfdef", "rfclarify", "rfex",
    // letter entries
    "Latn-def", "Latn-def-lite",
    // labels, qualifiers and other non-definitional context
    "gl", "gloss", "gloss-lite",
    "lb", "lbl", "label", "tlb", "term-label",
    "ng", "n-g", "ngd", "n-g-lite", "non-gloss definition",
    "q", "qf", "qual", "qualifier", "q-lite", "qualifier-lite", "i",
    "c", "C", "topics", "top",
    "given name", "surname",
    "defdate", "+obj", "cln",
    "only used in", "used in phrasal verbs",
    "ja-def", "ja-x", "ko-x",
    "mul-kangxi radical-def",
    "zh-mw", "zh-div",
    "short for",
    "bond credit rating", "taxon",
    // anchors
    "anchor", "senseid", "rfd-sense", "rfv-sense", "sense", "sense-lite",
    // typography
    ",", "ISBN", "...", "nbsp", "mono", "monospace",
    // usage examples and quotations
    "ux", "uxi", "zh-x", "suffixusex", "usex", "th-x", "th-usex", "hi-x",
    "Q", "quote-text", "quote-web", "quote-newsgroup",
    "coi", "†", "zh-obsolete",
    // verb-form templates that never carry an English gloss
    "ca-verb form of", "nl-verb form of",
];

const ALT_FORMS: &[&str] = &[
    "alt of", "altform", "alt form", "alternative form of",
    "nonstandard form of", "standard form of",
    "synonym of", "syn of",
    "abbreviation of", "clipping of",
    "female equivalent of", "femeq",
    "cognate", "cog",
];

const RELATIONS: &[&str] = &[
    "syn", "synonyms", "ant", "antonyms",
    "cot", "coordinate terms",
    "hyper", "hypernyms", "hypo", "hyponyms",
    "holo", "holonyms", "meronyms", "troponyms",
    "impf", "imperfectives", "pf", "perfectives",
    "inline alt forms",
];

const GLOSS_T_2: &[ParamKey] = &[Named("gloss"), Named("t"), Pos(2)];
const GLOSS_2_T: &[ParamKey] = &[Named("gloss"), Pos(2), Named("t")];
const ALT_GLOSS: &[ParamKey] = &[Pos(4), Named("t"), Named("gloss")];
const T_GLOSS: &[ParamKey] = &[Named("t"), Named("gloss")];

pub static RULES: &[Rule] = &[
    rule(NameMatch::Contains("-usex"), Action::Suppress),
    rule(NameMatch::Contains("quote"), Action::Suppress),
    rule(NameMatch::Contains("RQ:"), Action::Suppress),
    rule(NameMatch::Exact(SUPPRESSED), Action::Suppress),
    rule(NameMatch::Exact(&["place", "initialism of"]), Action::Extract(GLOSS_T_2)),
    rule(NameMatch::Exact(&["w", "unsupported"]), Action::Extract(&[Pos(2), Pos(1)])),
    rule(
        NameMatch::Exact(&["m", "mention", "l", "link", "l-lite", "m-lite"]),
        Action::Extract(&[Named("gloss"), Named("t"), Pos(4), Pos(3), Pos(2), Pos(1)]),
    ),
    rule(NameMatch::Exact(&["zh-l"]), Action::Extract(&[Named("gloss"), Named("t")])),
    rule(
        NameMatch::Exact(&["zh-classifier", "th-l", "zh-original", "zh-abbrev"]),
        Action::Extract(GLOSS_2_T),
    ),
    rule(NameMatch::Exact(&["ISO 639", "ISO 3166"]), Action::Extract(&[Pos(3)])),
    rule(NameMatch::Exact(&["vern"]), Action::Extract(&[Pos(1)])),
    rule(NameMatch::Exact(&["taxlink"]), Action::Extract(&[Pos(3), Pos(1)])),
    rule(NameMatch::Exact(&["frac"]), Action::Fraction),
    rule(NameMatch::Exact(&["lang"]), Action::Extract(&[Pos(2)])),
    rule(NameMatch::Exact(&["name translit"]), Action::Extract(&[Pos(3)])),
    rule(NameMatch::Exact(&["hanja form of", "ko-hanja form of"]), Action::Extract(GLOSS_2_T)),
    rule(NameMatch::Exact(ALT_FORMS), Action::Defer(ALT_GLOSS)),
    rule(NameMatch::Exact(&["form of"]), Action::Defer(&[Pos(5), Named("t"), Named("gloss")])),
    rule(NameMatch::LanguageCoded, Action::Defer(T_GLOSS)),
    rule(NameMatch::EndsWith(" of"), Action::Defer(T_GLOSS)),
    rule(NameMatch::EndsWith("-of"), Action::Defer(T_GLOSS)),
    rule(NameMatch::EndsWith("-alt"), Action::Defer(T_GLOSS)),
    rule(NameMatch::Contains("-form-"), Action::Defer(T_GLOSS)),
    rule(
        NameMatch::Exact(&["alternative spelling of", "alt sp", "fr-post-1990"]),
        Action::Defer(T_GLOSS),
    ),
    rule(NameMatch::Contains("-conj"), Action::ConjugationTable),
    rule(
        NameMatch::Exact(&["t", "t+", "tt", "tt+", "t-check", "t-simple"]),
        Action::ReverseTranslation,
    ),
    rule(NameMatch::Exact(RELATIONS), Action::Relation),
];

/// First matching action for a (trimmed) template name.
pub fn dispatch(name: &str) -> Action {
    RULES
        .iter()
        .find(|r| r.matcher.matches(name))
        .map(|r| r.action)
        .unwrap_or(Action::Unknown)
}

/// Relation-list key: first three characters of the lower-cased name, spaces removed.
///
/// Downstream files are named by this key, so `hyper` and `hypo` both land in
/// `hyp`, and `coordinate terms` (`coo`) stays apart from `cot`.
pub fn relation_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .take(3)
        .collect()
}
