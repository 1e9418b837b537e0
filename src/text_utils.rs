use std::ops::Index;

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

fn to_int<T: std::str::FromStr>(num_str: &str, date_str: &str) -> Result<T, String> {
    match num_str.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => Err(format!("Error parsing {} from the date {}", num_str, date_str)),
    }
}

/// Parses the date part of a publish date. Accepts `2024-05-01`,
/// `2024-05-01T10:00:00Z` and `2024-05-01 10:00:00`, the time is ignored.
pub fn parse_publish_date(buf: &str) -> Result<NaiveDate, String> {
    lazy_static! {
        static ref DATE_REGEX: Regex = Regex::new(r#"^\s*(\d{4})-(\d{1,2})-(\d{1,2})"#).unwrap();
    }

    let Some(caps) = DATE_REGEX.captures(buf) else {
        return Err(format!("Unable to parse date {}", buf));
    };

    let y: i32 = to_int(caps.index(1), buf)?;
    let m: u32 = to_int(caps.index(2), buf)?;
    let d: u32 = to_int(caps.index(3), buf)?;

    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("Invalid date {}", buf))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> String {
    format_date(&Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish_date() {
        let date = parse_publish_date("2017-09-10").unwrap();
        assert_eq!(format_date(&date), "2017-09-10");

        let date = parse_publish_date("2017-9-1T10:42:32.123Z").unwrap();
        assert_eq!(format_date(&date), "2017-09-01");

        let date = parse_publish_date("2017-09-10 10:42:32").unwrap();
        assert_eq!(format_date(&date), "2017-09-10");
    }

    #[test]
    fn test_parse_invalid_dates() {
        assert!(parse_publish_date("").is_err());
        assert!(parse_publish_date("Unknown").is_err());
        assert!(parse_publish_date("2017-13-40").is_err());
    }
}
