/// User-visible strings baked into generated scripts and default names.
///
/// The core never renders UI text itself; the host hands it a translated
/// table at construction time. `Default` yields the English table.
#[derive(Debug, Clone)]
pub struct Strings {
    /// Default document label.
    pub default_label: String,
    /// Name given to selectors inserted with an empty name.
    pub unnamed_selector: String,
    /// Caption of the exclusive-support checkbox.
    pub exclusive_support: String,
    /// The "nothing selected" entry placed first in every choice list.
    pub none_item: String,
    /// Section name of the selector script in multi-script saves.
    pub selector_section: String,
    /// Section name of the parts-override script in multi-script saves.
    pub overwrite_section: String,
    /// Caption of the character-id field in the parts-override script.
    pub character_id: String,
    /// Template for the auto-generated information line; `{}` receives the
    /// PSD file name.
    pub information_template: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            default_label: "PSD".to_owned(),
            unnamed_selector: "Unnamed Selector".to_owned(),
            exclusive_support: "Exclusive Support".to_owned(),
            none_item: "(None)".to_owned(),
            selector_section: "Selector".to_owned(),
            overwrite_section: "OverwriteSelector".to_owned(),
            character_id: "Character ID".to_owned(),
            information_template: "PSD Layer Selector for {}".to_owned(),
        }
    }
}

impl Strings {
    /// Information line generated when the document has no custom text.
    pub(crate) fn information_for(&self, psd_file_name: &str) -> String {
        self.information_template.replacen("{}", psd_file_name, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn information_template_substitutes_file_name() {
        let strings = Strings::default();
        assert_eq!(
            strings.information_for("face.psd"),
            "PSD Layer Selector for face.psd"
        );
    }
}
