use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Languages with a bundled translation file
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr"];

const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");
const FR_RESOURCE: &str = include_str!("../locales/fr/main.ftl");

/// Map a Telegram language code such as `fr-CA` to a supported language
pub fn normalize_language(code: &str) -> &'static str {
    let primary = code.split(['-', '_']).next().unwrap_or("").to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|lang| *lang == primary)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Display name of a supported language
pub fn language_name(code: &str) -> &'static str {
    match normalize_language(code) {
        "fr" => "Français",
        _ => "English",
    }
}

/// Localization manager for the Course Links Bot
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled language
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        bundles.insert("en", Self::create_bundle("en", EN_RESOURCE)?);
        bundles.insert("fr", Self::create_bundle("fr", FR_RESOURCE)?);
        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let langid: LanguageIdentifier = locale.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![langid]);
        // Bidi isolation marks end up verbatim in Telegram messages
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid {locale} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate {locale} messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message, falling back to English for unsupported
    /// languages and for keys the requested language lacks
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let requested = normalize_language(language);
        let candidates = [requested, DEFAULT_LANGUAGE];

        for lang in candidates {
            let Some(bundle) = self.bundles.get(lang) else {
                continue;
            };
            let Some(msg) = bundle.get_message(key) else {
                continue;
            };
            let Some(pattern) = msg.value() else {
                return format!("Missing value for key: {key}");
            };

            let fluent_args = args.map(|args| {
                let mut fluent_args = FluentArgs::new();
                for (k, v) in args {
                    fluent_args.set(*k, FluentValue::from(*v));
                }
                fluent_args
            });

            let mut errors = vec![];
            let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
            if !errors.is_empty() {
                warn!(key, language = lang, ?errors, "Errors while formatting message");
            }
            return value.into_owned();
        }

        format!("Missing translation: {key}")
    }
}

static LOCALIZATION_MANAGER: LazyLock<Option<LocalizationManager>> = LazyLock::new(|| {
    LocalizationManager::new()
        .map_err(|e| tracing::error!(error = %e, "Failed to load translations"))
        .ok()
});

/// Load the translations eagerly so broken resources show up at startup
pub fn init_localization() -> Result<()> {
    match LOCALIZATION_MANAGER.as_ref() {
        Some(_) => Ok(()),
        None => Err(anyhow!("Localization resources failed to load")),
    }
}

/// Convenience function to get a localized message in a language
pub fn t_lang(key: &str, language: Option<&str>) -> String {
    t_args_lang(key, &[], language)
}

/// Convenience function to get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: Option<&str>) -> String {
    let language = language.unwrap_or(DEFAULT_LANGUAGE);
    match LOCALIZATION_MANAGER.as_ref() {
        Some(manager) => {
            let args_map: HashMap<&str, &str> = args.iter().copied().collect();
            let args = (!args_map.is_empty()).then_some(&args_map);
            manager.get_message_in_language(key, language, args)
        }
        None => format!("Missing translation: {key}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("fr"), "fr");
        assert_eq!(normalize_language("fr-CA"), "fr");
        assert_eq!(normalize_language("FR_be"), "fr");
        assert_eq!(normalize_language("de"), "en");
        assert_eq!(normalize_language(""), "en");
    }

    #[test]
    fn test_t_lang_defaults_to_english() {
        assert_eq!(t_lang("favorite-added", None), "Saved to favorites");
        assert_eq!(t_lang("favorite-added", Some("fr")), "Ajouté aux favoris");
    }

    #[test]
    fn test_t_args_lang_substitutes() {
        let text = t_args_lang("search-too-short", &[("min", "2")], Some("en"));
        assert_eq!(text, "Please type at least 2 characters to search.");
    }
}
