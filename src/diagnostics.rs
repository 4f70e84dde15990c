use rustc_hash::FxHashMap;

/// Template-name frequencies gathered while rendering.
///
/// Each page gets its own instance; the driver merges them afterwards, so no
/// counter is shared between threads.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    template_names: FxHashMap<String, u64>,
    unknown_template_names: FxHashMap<String, u64>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_template(&mut self, name: &str) {
        *self.template_names.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn record_unknown(&mut self, name: &str) {
        *self
            .unknown_template_names
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: Diagnostics) {
        for (name, count) in other.template_names {
            *self.template_names.entry(name).or_insert(0) += count;
        }
        for (name, count) in other.unknown_template_names {
            *self.unknown_template_names.entry(name).or_insert(0) += count;
        }
    }

    pub fn template_count(&self, name: &str) -> u64 {
        self.template_names.get(name).copied().unwrap_or(0)
    }

    pub fn unknown_count(&self, name: &str) -> u64 {
        self.unknown_template_names.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.template_names.is_empty()
    }

    /// All template names, most frequent first (ties by name).
    pub fn top_templates(&self) -> Vec<(&str, u64)> {
        sorted_counts(&self.template_names)
    }

    pub fn top_unknown(&self) -> Vec<(&str, u64)> {
        sorted_counts(&self.unknown_template_names)
    }
}

fn sorted_counts(counts: &FxHashMap<String, u64>) -> Vec<(&str, u64)> {
    let mut sorted: Vec<_> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_templates() {
        let mut diag = Diagnostics::new();
        diag.record_template("lb");
        diag.record_template("lb");
        diag.record_template("l");
        assert_eq!(diag.template_count("lb"), 2);
        assert_eq!(diag.template_count("l"), 1);
        assert_eq!(diag.template_count("m"), 0);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = Diagnostics::new();
        a.record_template("lb");
        a.record_unknown("head");
        let mut b = Diagnostics::new();
        b.record_template("lb");
        b.record_unknown("head");
        b.record_unknown("x");
        a.merge(b);
        assert_eq!(a.template_count("lb"), 2);
        assert_eq!(a.unknown_count("head"), 2);
        assert_eq!(a.unknown_count("x"), 1);
    }

    #[test]
    fn top_templates_sorted_by_count_then_name() {
        let mut diag = Diagnostics::new();
        for name in ["b", "a", "c", "c"] {
            diag.record_template(name);
        }
        assert_eq!(diag.top_templates(), vec![("c", 2), ("a", 1), ("b", 1)]);
    }

    #[test]
    fn default_is_empty() {
        let diag = Diagnostics::default();
        assert!(diag.is_empty());
        assert!(diag.top_unknown().is_empty());
    }
}
