/// Loads service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-cased
/// env var names (`database_url` ← `DATABASE_URL`). Use `#[serde(default = ...)]`
/// for optional settings.
pub trait Config: Sized + serde::de::DeserializeOwned {
    /// Load from the process environment.
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or cannot be parsed. Call once
    /// at startup.
    fn from_env() -> Self {
        envy::from_env().expect("failed to load config from environment")
    }

    /// Load from an explicit set of `(name, value)` pairs.
    fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
