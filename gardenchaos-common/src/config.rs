use crate::error::Result;
use serde::de::DeserializeOwned;

/// Loads a layered configuration: a base file named `<name>`, optionally
/// overlaid by `<name>.local` if present, then environment variables
/// prefixed `GARDENCHAOS_` (double underscore as path separator, e.g.
/// `GARDENCHAOS_NETWORK__TIMEOUT_SECONDS`), mirroring
/// `MitigationConfig::from_file`'s `config::File` + `config::Environment`
/// layering in the teacher.
pub fn load_layered<T: DeserializeOwned>(name: &str) -> Result<T> {
    let mut builder = config::Config::builder().add_source(config::File::with_name(name));
    let local_overlay = format!("{name}.local");
    if std::path::Path::new(&format!("{local_overlay}.toml")).exists() {
        builder = builder.add_source(config::File::with_name(&local_overlay).required(false));
    }
    let settings = builder
        .add_source(config::Environment::with_prefix("GARDENCHAOS").separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}

/// Resolves the config file base name the same way the teacher's binaries
/// auto-detect an environment: an explicit env var wins, otherwise fall
/// back by `GARDENCHAOS_ENV` (`production`/`development`), defaulting to
/// development.
pub fn config_name(explicit_env_var: &str, default_base: &str) -> String {
    std::env::var(explicit_env_var).unwrap_or_else(|_| match std::env::var("GARDENCHAOS_ENV").as_deref() {
        Ok("production") => format!("{default_base}.prod"),
        _ => format!("{default_base}.dev"),
    })
}
