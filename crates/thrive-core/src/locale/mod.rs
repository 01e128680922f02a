//! Localization and cultural adaptation.
//!
//! Language detection, per-country formatting conventions and managed content
//! targeting. Everything here is pure: callers pass in the request headers and
//! user settings, nothing is read from the environment.

mod content;
mod cultural;
mod format;

pub use content::select_managed_content;
pub use cultural::{
    BusinessHours, ClockFormat, CulturalAdaptation, CurrencyPosition, DateOrder,
    cultural_adaptation, language_for_country,
};
pub use format::{
    currency_decimals, currency_symbol, format_currency, format_date, format_number, format_time,
    is_business_hours,
};

use serde::Serialize;

/// Fallback language when nothing else matches.
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub rtl: bool,
}

const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", native_name: "English", rtl: false },
    Language { code: "es", name: "Spanish", native_name: "Español", rtl: false },
    Language { code: "fr", name: "French", native_name: "Français", rtl: false },
    Language { code: "de", name: "German", native_name: "Deutsch", rtl: false },
    Language { code: "it", name: "Italian", native_name: "Italiano", rtl: false },
    Language { code: "pt", name: "Portuguese", native_name: "Português", rtl: false },
    Language { code: "nl", name: "Dutch", native_name: "Nederlands", rtl: false },
    Language { code: "ru", name: "Russian", native_name: "Русский", rtl: false },
    Language { code: "ja", name: "Japanese", native_name: "日本語", rtl: false },
    Language { code: "zh", name: "Chinese", native_name: "中文", rtl: false },
    Language { code: "ko", name: "Korean", native_name: "한국어", rtl: false },
    Language { code: "ar", name: "Arabic", native_name: "العربية", rtl: true },
    Language { code: "hi", name: "Hindi", native_name: "हिन्दी", rtl: false },
];

pub fn supported_languages() -> &'static [Language] {
    LANGUAGES
}

/// Looks up a supported language by tag, ignoring region and case (`pt-BR` → `pt`).
pub fn find_language(tag: &str) -> Option<&'static Language> {
    let primary = primary_subtag(tag);
    LANGUAGES.iter().find(|l| l.code == primary)
}

pub fn is_supported_language(tag: &str) -> bool {
    find_language(tag).is_some()
}

fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Picks the response language.
///
/// Priority: explicit user preference, then the `Accept-Language` header
/// (by descending quality), then the country's primary language, then `en`.
/// Unsupported candidates at any step are skipped.
pub fn detect_language(
    preference: Option<&str>,
    accept_language: Option<&str>,
    country: Option<&str>,
) -> &'static str {
    if let Some(lang) = preference.and_then(find_language) {
        return lang.code;
    }

    if let Some(header) = accept_language {
        for tag in parse_accept_language(header) {
            if let Some(lang) = find_language(&tag) {
                return lang.code;
            }
        }
    }

    if let Some(lang) = country
        .and_then(language_for_country)
        .and_then(find_language)
    {
        return lang.code;
    }

    DEFAULT_LANGUAGE
}

/// Parses an `Accept-Language` header into tags ordered by quality.
///
/// Entries with `q=0`, malformed quality values and the `*` wildcard are
/// dropped. Equal qualities keep header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut entries: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let mut quality = 1.0_f32;
            for param in pieces {
                let param = param.trim();
                if let Some(q) = param.strip_prefix("q=").or_else(|| param.strip_prefix("Q=")) {
                    quality = q.trim().parse().ok()?;
                }
            }
            if quality <= 0.0 || quality > 1.0 {
                return None;
            }
            Some((tag.to_string(), quality))
        })
        .collect();

    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(tag, _)| tag).collect()
}
