/// Section headings at level 3/4 that never name a part of speech.
const NON_CATEGORY_SECTIONS: &[&str] = &["Etymology", "Pronunciation"];

/// Level and inner text of a `==Heading==` line.
///
/// The level is the number of `=` matched pairwise from both ends; a line
/// that is not a heading (or is nothing but `=`) has level 0 and is returned
/// unchanged.
pub fn header_level(line: &str) -> (usize, &str) {
    let trimmed = line.trim_end();
    let bytes = trimmed.as_bytes();
    let mut level = 0;
    while level < bytes.len() && bytes[level] == b'=' && bytes[bytes.len() - 1 - level] == b'=' {
        level += 1;
        if 2 * level > bytes.len() {
            return (0, line);
        }
    }
    if level == 0 {
        return (0, line);
    }
    (level, &trimmed[level..trimmed.len() - level])
}

pub fn normalize_category(label: &str) -> String {
    let label = label.trim().replace('/', "_");
    match label.as_str() {
        "Numeral" => "Number".to_string(),
        "Definitions" | "Kanji" | "Hanji" | "Hanja" => "Noun".to_string(),
        _ => label,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderEvent {
    /// A level-2 heading closed `previous` and opened `language`
    Language {
        previous: Option<String>,
        language: String,
    },
    Category(String),
    /// Etymology or pronunciation heading; the category is left alone
    Subsection(String),
}

/// Current language and part of speech while a page is scanned top to bottom.
#[derive(Debug, Default, Clone)]
pub struct HeaderTracker {
    language: Option<String>,
    category: Option<String>,
}

impl HeaderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn observe(&mut self, line: &str) -> Option<HeaderEvent> {
        let (level, text) = header_level(line);
        match level {
            2 => {
                let language = text.trim().to_string();
                let previous = self.language.replace(language.clone());
                Some(HeaderEvent::Language { previous, language })
            }
            3 | 4 => {
                if NON_CATEGORY_SECTIONS.iter().any(|s| text.contains(s)) {
                    return Some(HeaderEvent::Subsection(text.trim().to_string()));
                }
                let category = normalize_category(text);
                self.category = Some(category.clone());
                Some(HeaderEvent::Category(category))
            }
            _ => None,
        }
    }
}
