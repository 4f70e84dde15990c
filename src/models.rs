#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageType {
    Article,
    Redirect(String),
    Special,
}

#[derive(Debug, Clone)]
pub struct WikiPage {
    pub id: u32,
    pub title: String,
    pub ns: Option<i32>,
    pub timestamp: Option<String>,
    pub page_type: PageType,
    pub text: Option<String>, // None when the reader skips text
}

impl WikiPage {
    /// Dictionary entries live in the main namespace and are never redirects.
    pub fn is_entry(&self) -> bool {
        matches!(self.page_type, PageType::Article) && self.text.is_some()
    }
}
