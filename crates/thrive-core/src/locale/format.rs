use time::{Date, OffsetDateTime, Time};

use super::cultural::{ClockFormat, CurrencyPosition, DateOrder, cultural_adaptation};

pub fn currency_symbol(currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    let symbol = match code.as_str() {
        "USD" | "MXN" | "CAD" | "AUD" | "NZD" | "ARS" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "BRL" => "R$",
        "KRW" => "₩",
        "RUB" => "₽",
        "TWD" => "NT$",
        _ => return code,
    };
    symbol.to_string()
}

/// Minor-unit digits shown for a currency.
pub fn currency_decimals(currency: &str) -> u8 {
    if ["JPY", "KRW"]
        .iter()
        .any(|c| c.eq_ignore_ascii_case(currency.trim()))
    {
        0
    } else {
        2
    }
}

/// Formats the absolute value of `value` with the given separators.
/// Rounds half away from zero.
fn digits(value: f64, decimals: u8, decimal_sep: char, thousands_sep: char) -> String {
    let decimals = decimals.min(9);
    let scale = 10_u128.pow(u32::from(decimals));
    let scaled = (value.abs() * scale as f64).round();
    let scaled = if scaled >= u128::MAX as f64 {
        u128::MAX
    } else {
        scaled as u128
    };

    let integer = (scaled / scale).to_string();
    let mut out = String::with_capacity(integer.len() + integer.len() / 3 + 12);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push(thousands_sep);
        }
        out.push(ch);
    }

    if decimals > 0 {
        out.push(decimal_sep);
        let fraction = scaled % scale;
        out.push_str(&format!("{:0width$}", fraction, width = decimals as usize));
    }
    out
}

fn is_negative(value: f64, decimals: u8) -> bool {
    // -0.001 rounds to zero and should not print a sign.
    let scale = 10_f64.powi(i32::from(decimals.min(9)));
    value < 0.0 && (value.abs() * scale).round() > 0.0
}

pub fn format_number(value: f64, decimals: u8, country: &str) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let culture = cultural_adaptation(country);
    let body = digits(
        value,
        decimals,
        culture.decimal_separator,
        culture.thousands_separator,
    );
    if is_negative(value, decimals) {
        format!("-{body}")
    } else {
        body
    }
}

/// Formats an amount of money using the country's separators and symbol
/// placement, and the currency's symbol and minor units.
pub fn format_currency(amount: f64, country: &str, currency: &str) -> String {
    let decimals = currency_decimals(currency);
    let symbol = currency_symbol(currency);
    if !amount.is_finite() {
        return format!("{} {}", amount, symbol);
    }

    let culture = cultural_adaptation(country);
    let body = digits(
        amount,
        decimals,
        culture.decimal_separator,
        culture.thousands_separator,
    );
    let sign = if is_negative(amount, decimals) { "-" } else { "" };

    match culture.currency_position {
        CurrencyPosition::Prefix => {
            let spaced = symbol.chars().last().is_some_and(|c| c.is_ascii_alphabetic());
            if spaced {
                format!("{sign}{symbol} {body}")
            } else {
                format!("{sign}{symbol}{body}")
            }
        }
        CurrencyPosition::PrefixSpaced => format!("{sign}{symbol} {body}"),
        CurrencyPosition::Suffix => format!("{sign}{body} {symbol}"),
    }
}

pub fn format_date(date: Date, country: &str) -> String {
    let culture = cultural_adaptation(country);
    let sep = culture.date_separator;
    let (y, m, d) = (date.year(), u8::from(date.month()), date.day());
    match culture.date_order {
        DateOrder::Mdy => format!("{m:02}{sep}{d:02}{sep}{y:04}"),
        DateOrder::Dmy => format!("{d:02}{sep}{m:02}{sep}{y:04}"),
        DateOrder::Ymd => format!("{y:04}{sep}{m:02}{sep}{d:02}"),
    }
}

pub fn format_time(time: Time, country: &str) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    match cultural_adaptation(country).clock {
        ClockFormat::TwentyFourHour => format!("{hour:02}:{minute:02}"),
        ClockFormat::TwelveHour => {
            let suffix = if hour < 12 { "AM" } else { "PM" };
            let h = match hour % 12 {
                0 => 12,
                h => h,
            };
            format!("{h}:{minute:02} {suffix}")
        }
    }
}

/// `local` must already be in the user's offset.
pub fn is_business_hours(local: OffsetDateTime, country: &str) -> bool {
    let culture = cultural_adaptation(country);
    if culture.is_weekend(local.weekday()) {
        return false;
    }
    let hour = local.hour();
    hour >= culture.business_hours.start_hour && hour < culture.business_hours.end_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn currency_by_country() {
        assert_eq!(format_currency(1234.56, "DE", "EUR"), "1.234,56 €");
        assert_eq!(format_currency(1234.56, "US", "USD"), "$1,234.56");
        assert_eq!(format_currency(1234.56, "GB", "GBP"), "£1,234.56");
        assert_eq!(format_currency(1234.56, "BR", "BRL"), "R$ 1.234,56");
        assert_eq!(format_currency(1234.56, "CH", "CHF"), "CHF 1'234.56");
        assert_eq!(format_currency(1234.5, "JP", "JPY"), "¥1,235");
        assert_eq!(format_currency(9.99, "US", "XYZ"), "XYZ 9.99");
    }

    #[test]
    fn currency_sign_and_rounding() {
        assert_eq!(format_currency(-1234.56, "US", "USD"), "-$1,234.56");
        assert_eq!(format_currency(-0.001, "US", "USD"), "$0.00");
        assert_eq!(format_currency(0.125, "US", "USD"), "$0.13");
        assert_eq!(format_currency(1_000_000.0, "FR", "EUR"), "1 000 000,00 €");
    }

    #[test]
    fn numbers() {
        assert_eq!(format_number(1234567.891, 2, "DE"), "1.234.567,89");
        assert_eq!(format_number(999.0, 0, "US"), "999");
        assert_eq!(format_number(-12.5, 1, "US"), "-12.5");
    }

    #[test]
    fn dates() {
        let d = date!(2025 - 01 - 15);
        assert_eq!(format_date(d, "US"), "01/15/2025");
        assert_eq!(format_date(d, "DE"), "15.01.2025");
        assert_eq!(format_date(d, "GB"), "15/01/2025");
        assert_eq!(format_date(d, "NL"), "15-01-2025");
        assert_eq!(format_date(d, "JP"), "2025/01/15");
        assert_eq!(format_date(d, "ZZ"), "2025-01-15");
    }

    #[test]
    fn times() {
        assert_eq!(format_time(time!(15:05), "US"), "3:05 PM");
        assert_eq!(format_time(time!(0:30), "US"), "12:30 AM");
        assert_eq!(format_time(time!(12:00), "US"), "12:00 PM");
        assert_eq!(format_time(time!(15:05), "DE"), "15:05");
    }

    #[test]
    fn business_hours() {
        // 2025-01-15 is a Wednesday, 2025-01-17 a Friday.
        assert!(is_business_hours(datetime!(2025-01-15 10:00 UTC), "US"));
        assert!(!is_business_hours(datetime!(2025-01-15 17:00 UTC), "US"));
        assert!(!is_business_hours(datetime!(2025-01-18 10:00 UTC), "US"));
        assert!(is_business_hours(datetime!(2025-01-17 10:00 UTC), "US"));
        assert!(!is_business_hours(datetime!(2025-01-17 10:00 UTC), "SA"));
        assert!(is_business_hours(datetime!(2025-01-15 8:00 UTC), "DE"));
    }
}
