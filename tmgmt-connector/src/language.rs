//! Language code mapping between the local site and the remote service
//!
//! Local language codes (`pt-br`) are first mapped to the remote vocabulary
//! (`PT-BR`). The remote service accepts fewer source variants than target
//! variants, so source languages are additionally collapsed to their base
//! code with [`fix_source_language`]. Target codes are never collapsed.

/// Local to remote language code mappings
const DEFAULT_REMOTE_MAPPINGS: &[(&str, &str)] = &[
    ("ar", "AR"),
    ("bg", "BG"),
    ("cs", "CS"),
    ("da", "DA"),
    ("de", "DE"),
    ("el", "EL"),
    ("en", "EN"),
    ("es", "ES"),
    ("et", "ET"),
    ("fi", "FI"),
    ("fr", "FR"),
    ("hu", "HU"),
    ("id", "ID"),
    ("it", "IT"),
    ("ja", "JA"),
    ("ko", "KO"),
    ("lt", "LT"),
    ("lv", "LV"),
    ("nb", "NB"),
    ("nl", "NL"),
    ("pl", "PL"),
    ("pt-br", "PT-BR"),
    ("pt-pt", "PT-PT"),
    ("ro", "RO"),
    ("ru", "RU"),
    ("sk", "SK"),
    ("sl", "SL"),
    ("sv", "SV"),
    ("tr", "TR"),
    ("uk", "UK"),
    ("zh", "ZH"),
];

/// Remote languages with their labels
const SUPPORTED_REMOTE_LANGUAGES: &[(&str, &str)] = &[
    ("AR", "Arabic"),
    ("BG", "Bulgarian"),
    ("CS", "Czech"),
    ("DA", "Danish"),
    ("DE", "German"),
    ("EL", "Greek"),
    ("EN-GB", "English (British)"),
    ("EN-US", "English (American)"),
    ("EN", "English"),
    ("ES", "Spanish"),
    ("ET", "Estonian"),
    ("FI", "Finnish"),
    ("FR", "French"),
    ("HU", "Hungarian"),
    ("ID", "Indonesian"),
    ("IT", "Italian"),
    ("JA", "Japanese"),
    ("KO", "Korean"),
    ("LT", "Lithuanian"),
    ("LV", "Latvian"),
    ("NB", "Norwegian (Bokmål)"),
    ("NL", "Dutch"),
    ("PL", "Polish"),
    ("PT-PT", "Portuguese (excluding Brazilian Portuguese)"),
    ("PT-BR", "Portuguese (Brazilian)"),
    ("PT", "Portuguese (deprecated, select PT-PT or PT-BR instead)"),
    ("RO", "Romanian"),
    ("RU", "Russian"),
    ("SK", "Slovak"),
    ("SL", "Slovenian"),
    ("SV", "Swedish"),
    ("TR", "Turkish"),
    ("UK", "Ukrainian"),
    ("ZH", "Chinese (simplified)"),
];

/// Collapse regional source variants to the base code the service accepts
///
/// ```ignore
/// assert_eq!(fix_source_language("EN-GB"), "EN");
/// assert_eq!(fix_source_language("FR"), "FR");
/// ```
pub fn fix_source_language(code: &str) -> String {
    match code {
        "EN-GB" | "EN-US" => "EN".to_string(),
        "PT-BR" | "PT-PT" => "PT".to_string(),
        other => other.to_string(),
    }
}

pub fn default_remote_mappings() -> &'static [(&'static str, &'static str)] {
    DEFAULT_REMOTE_MAPPINGS
}

/// Map a local language code to the remote vocabulary
///
/// Unmapped codes pass through unchanged.
pub fn remote_language(local: &str) -> String {
    DEFAULT_REMOTE_MAPPINGS
        .iter()
        .find(|(from, _)| *from == local)
        .map_or_else(|| local.to_string(), |(_, to)| to.to_string())
}

pub fn supported_remote_languages() -> &'static [(&'static str, &'static str)] {
    SUPPORTED_REMOTE_LANGUAGES
}

/// Target languages available for a remote source language
///
/// Any supported language can be translated into any other, so this is the
/// full list minus the source. An unsupported source has no targets.
pub fn supported_target_languages(source: &str) -> Vec<(&'static str, &'static str)> {
    if !SUPPORTED_REMOTE_LANGUAGES
        .iter()
        .any(|(code, _)| *code == source)
    {
        return Vec::new();
    }

    SUPPORTED_REMOTE_LANGUAGES
        .iter()
        .filter(|(code, _)| *code != source)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_source_language_collapses_regional_variants() {
        assert_eq!(fix_source_language("EN-GB"), "EN");
        assert_eq!(fix_source_language("EN-US"), "EN");
        assert_eq!(fix_source_language("PT-BR"), "PT");
        assert_eq!(fix_source_language("PT-PT"), "PT");
    }

    #[test]
    fn test_fix_source_language_passthrough() {
        assert_eq!(fix_source_language("FR"), "FR");
        assert_eq!(fix_source_language("ZH"), "ZH");
        assert_eq!(fix_source_language("xx-unknown"), "xx-unknown");
    }

    #[test]
    fn test_remote_language() {
        assert_eq!(remote_language("pt-br"), "PT-BR");
        assert_eq!(remote_language("de"), "DE");
        assert_eq!(remote_language("tlh"), "tlh");
    }

    #[test]
    fn test_supported_target_languages_removes_source() {
        let targets = supported_target_languages("FR");
        assert_eq!(targets.len(), supported_remote_languages().len() - 1);
        assert!(!targets.iter().any(|(code, _)| *code == "FR"));
        assert!(targets.iter().any(|(code, _)| *code == "EN-GB"));
    }

    #[test]
    fn test_supported_target_languages_unknown_source() {
        assert!(supported_target_languages("XX").is_empty());
    }
}
