// Module name shadows the `serde` crate — use `::serde` for the external crate.
use ::serde::Serializer;
use chrono::{DateTime, SecondsFormat, Utc};

/// Format as RFC 3339 UTC with exactly three fractional digits and a `Z`
/// suffix, e.g. `2024-01-01T00:00:00.000Z`.
pub fn rfc3339_ms(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize `DateTime<Utc>` with [`rfc3339_ms`].
pub fn to_rfc3339_ms<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&rfc3339_ms(dt))
}

/// Serialize `Option<DateTime<Utc>>` with [`rfc3339_ms`], `None` as `null`.
pub fn to_rfc3339_ms_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&rfc3339_ms(dt)),
        None => s.serialize_none(),
    }
}
