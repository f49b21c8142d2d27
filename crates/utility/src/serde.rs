/// Lists as a single comma separated string, the way list filters travel in
/// url query parameters (`?services=hvac,electrical`).
///
/// Empty segments are skipped. Segments that fail to parse are dropped
/// instead of rejecting the whole parameter, so a shared link with one stale
/// value still opens.
pub mod comma_separated {
    use std::{fmt::Display, str::FromStr};

    pub fn split<T: FromStr>(value: &str) -> Vec<T> {
        value
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .filter_map(|segment| segment.parse().ok())
            .collect()
    }

    pub fn join<'a, T, I>(values: I) -> String
    where
        T: Display + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        values
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
