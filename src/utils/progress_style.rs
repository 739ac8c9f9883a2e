use indicatif::ProgressStyle;

const ONLY_MESSAGE_TEMPLATE: &str = "{spinner} {wide_msg}";
const ITEMS_TEMPLATE: &str = "{spinner} {msg:28} {pos:>6} items [{elapsed}]";
const MILESTONES_TEMPLATE: &str = "{spinner} {msg:28} {wide_bar} {pos:>2}/{len:2}";

pub struct ProgressStyleTemplate;

impl ProgressStyleTemplate {
    pub fn only_message() -> ProgressStyle {
        with_template(ONLY_MESSAGE_TEMPLATE)
    }

    /// Running count of fetched project items.
    pub fn items_counter() -> ProgressStyle {
        with_template(ITEMS_TEMPLATE)
    }

    pub fn milestones_bar() -> ProgressStyle {
        with_template(MILESTONES_TEMPLATE).progress_chars("#>-")
    }
}

fn with_template(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}
