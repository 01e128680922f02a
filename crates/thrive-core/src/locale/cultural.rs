use serde::Serialize;
use time::Weekday;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    Mdy,
    Dmy,
    Ymd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

/// Where the currency symbol goes relative to the digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyPosition {
    /// `$1.00`; alphabetic symbols still get a space (`CHF 1.00`).
    Prefix,
    /// `R$ 1,00`
    PrefixSpaced,
    /// `1,00 €`
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    pub start_hour: u8,
    pub end_hour: u8,
}

/// Formatting conventions for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalAdaptation {
    pub country_code: String,
    pub language: &'static str,
    pub date_order: DateOrder,
    pub date_separator: char,
    pub clock: ClockFormat,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub currency_code: &'static str,
    pub currency_position: CurrencyPosition,
    #[serde(serialize_with = "serialize_weekday")]
    pub first_day_of_week: Weekday,
    pub business_hours: BusinessHours,
    #[serde(serialize_with = "serialize_weekdays")]
    pub weekend: &'static [Weekday],
}

impl CulturalAdaptation {
    pub fn is_weekend(&self, day: Weekday) -> bool {
        self.weekend.contains(&day)
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "monday",
        Weekday::Tuesday => "tuesday",
        Weekday::Wednesday => "wednesday",
        Weekday::Thursday => "thursday",
        Weekday::Friday => "friday",
        Weekday::Saturday => "saturday",
        Weekday::Sunday => "sunday",
    }
}

fn serialize_weekday<S: serde::Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(weekday_name(*day))
}

fn serialize_weekdays<S: serde::Serializer>(
    days: &&'static [Weekday],
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_seq(days.iter().map(|d| weekday_name(*d)))
}

const SAT_SUN: &[Weekday] = &[Weekday::Saturday, Weekday::Sunday];
const FRI_SAT: &[Weekday] = &[Weekday::Friday, Weekday::Saturday];

struct Row {
    codes: &'static [&'static str],
    language: &'static str,
    date_order: DateOrder,
    date_separator: char,
    clock: ClockFormat,
    decimal: char,
    thousands: char,
    currency: &'static str,
    position: CurrencyPosition,
    first_day: Weekday,
    hours: (u8, u8),
    weekend: &'static [Weekday],
}

use ClockFormat::{TwelveHour as H12, TwentyFourHour as H24};
use CurrencyPosition::{Prefix, PrefixSpaced, Suffix};
use DateOrder::{Dmy, Mdy, Ymd};
use Weekday::{Monday, Sunday};

#[rustfmt::skip]
const TABLE: &[Row] = &[
    Row { codes: &["US"], language: "en", date_order: Mdy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "USD", position: Prefix, first_day: Sunday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["CA"], language: "en", date_order: Ymd, date_separator: '-', clock: H12, decimal: '.', thousands: ',', currency: "CAD", position: Prefix, first_day: Sunday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["GB"], language: "en", date_order: Dmy, date_separator: '/', clock: H24, decimal: '.', thousands: ',', currency: "GBP", position: Prefix, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["IE"], language: "en", date_order: Dmy, date_separator: '/', clock: H24, decimal: '.', thousands: ',', currency: "EUR", position: Prefix, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["AU", "NZ"], language: "en", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "AUD", position: Prefix, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["DE", "AT"], language: "de", date_order: Dmy, date_separator: '.', clock: H24, decimal: ',', thousands: '.', currency: "EUR", position: Suffix, first_day: Monday, hours: (8, 17), weekend: SAT_SUN },
    Row { codes: &["CH"], language: "de", date_order: Dmy, date_separator: '.', clock: H24, decimal: '.', thousands: '\'', currency: "CHF", position: Prefix, first_day: Monday, hours: (8, 17), weekend: SAT_SUN },
    Row { codes: &["FR"], language: "fr", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: ' ', currency: "EUR", position: Suffix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["ES"], language: "es", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: '.', currency: "EUR", position: Suffix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["MX"], language: "es", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "MXN", position: Prefix, first_day: Sunday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["AR"], language: "es", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: '.', currency: "ARS", position: PrefixSpaced, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["IT"], language: "it", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: '.', currency: "EUR", position: Suffix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["PT"], language: "pt", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: ' ', currency: "EUR", position: Suffix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["BR"], language: "pt", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: '.', currency: "BRL", position: PrefixSpaced, first_day: Sunday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["NL"], language: "nl", date_order: Dmy, date_separator: '-', clock: H24, decimal: ',', thousands: '.', currency: "EUR", position: PrefixSpaced, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["BE"], language: "nl", date_order: Dmy, date_separator: '/', clock: H24, decimal: ',', thousands: '.', currency: "EUR", position: Suffix, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["RU"], language: "ru", date_order: Dmy, date_separator: '.', clock: H24, decimal: ',', thousands: ' ', currency: "RUB", position: Suffix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["JP"], language: "ja", date_order: Ymd, date_separator: '/', clock: H24, decimal: '.', thousands: ',', currency: "JPY", position: Prefix, first_day: Sunday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["CN"], language: "zh", date_order: Ymd, date_separator: '/', clock: H24, decimal: '.', thousands: ',', currency: "CNY", position: Prefix, first_day: Monday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["TW"], language: "zh", date_order: Ymd, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "TWD", position: Prefix, first_day: Sunday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["KR"], language: "ko", date_order: Ymd, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "KRW", position: Prefix, first_day: Sunday, hours: (9, 18), weekend: SAT_SUN },
    Row { codes: &["IN"], language: "hi", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "INR", position: Prefix, first_day: Monday, hours: (10, 18), weekend: SAT_SUN },
    Row { codes: &["SA"], language: "ar", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "SAR", position: PrefixSpaced, first_day: Sunday, hours: (9, 17), weekend: FRI_SAT },
    Row { codes: &["AE"], language: "ar", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "AED", position: PrefixSpaced, first_day: Monday, hours: (9, 17), weekend: SAT_SUN },
    Row { codes: &["EG"], language: "ar", date_order: Dmy, date_separator: '/', clock: H12, decimal: '.', thousands: ',', currency: "EGP", position: PrefixSpaced, first_day: Sunday, hours: (9, 17), weekend: FRI_SAT },
];

/// Used for countries missing from the table: US conventions with ISO dates.
const FALLBACK: Row = Row {
    codes: &[],
    language: "en",
    date_order: Ymd,
    date_separator: '-',
    clock: H12,
    decimal: '.',
    thousands: ',',
    currency: "USD",
    position: Prefix,
    first_day: Sunday,
    hours: (9, 17),
    weekend: SAT_SUN,
};

fn find_row(country: &str) -> Option<&'static Row> {
    let code = country.trim();
    TABLE
        .iter()
        .find(|row| row.codes.iter().any(|c| c.eq_ignore_ascii_case(code)))
}

/// Primary language spoken in a country, if the country is known.
pub fn language_for_country(country: &str) -> Option<&'static str> {
    find_row(country).map(|row| row.language)
}

pub fn cultural_adaptation(country: &str) -> CulturalAdaptation {
    let row = find_row(country).unwrap_or(&FALLBACK);
    let mut code = country.trim().to_ascii_uppercase();
    if code.is_empty() {
        code = "US".to_string();
    }
    // NZ shares the AU row but pays in its own dollar.
    let currency = if code == "NZ" { "NZD" } else { row.currency };

    CulturalAdaptation {
        country_code: code,
        language: row.language,
        date_order: row.date_order,
        date_separator: row.date_separator,
        clock: row.clock,
        decimal_separator: row.decimal,
        thousands_separator: row.thousands,
        currency_code: currency,
        currency_position: row.position,
        first_day_of_week: row.first_day,
        business_hours: BusinessHours {
            start_hour: row.hours.0,
            end_hour: row.hours.1,
        },
        weekend: row.weekend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let de = cultural_adaptation("de");
        assert_eq!(de.country_code, "DE");
        assert_eq!(de.decimal_separator, ',');
        assert_eq!(de.currency_position, CurrencyPosition::Suffix);
        assert_eq!(language_for_country(" at "), Some("de"));
    }

    #[test]
    fn unknown_country_falls_back() {
        let zz = cultural_adaptation("ZZ");
        assert_eq!(zz.date_order, DateOrder::Ymd);
        assert_eq!(zz.currency_code, "USD");
        assert_eq!(language_for_country("ZZ"), None);
    }

    #[test]
    fn weekends_differ() {
        assert!(cultural_adaptation("SA").is_weekend(Weekday::Friday));
        assert!(!cultural_adaptation("US").is_weekend(Weekday::Friday));
        assert_eq!(cultural_adaptation("NZ").currency_code, "NZD");
    }

    #[test]
    fn serializes_readable_names() {
        let json = serde_json::to_value(cultural_adaptation("US")).unwrap();
        assert_eq!(json["clock"], "12h");
        assert_eq!(json["dateOrder"], "mdy");
        assert_eq!(json["firstDayOfWeek"], "sunday");
        assert_eq!(json["weekend"], serde_json::json!(["saturday", "sunday"]));
        assert_eq!(json["businessHours"]["startHour"], 9);
    }
}
