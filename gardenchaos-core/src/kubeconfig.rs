//! Kubeconfig discovery, ported from `chaosgarden/k8s/__init__.py::to_authenticator`.
//! Order: an inline struct, then inline YAML text, then a file path, then
//! the `KUBECONFIG` environment variable.

use gardenchaos_common::Secret;

/// Where kube client credentials for a target cluster came from.
#[derive(Clone)]
pub enum KubeconfigSource {
    /// An already-parsed kubeconfig document (used internally by the
    /// Gardener resolver; not accepted from untrusted experiment input,
    /// matching the Python original's comment that this form is "not
    /// documented because unsafe if specified in experiment file").
    Inline(Secret<serde_yaml::Value>),
    /// Raw kubeconfig YAML text, e.g. produced in-memory by the Gardener
    /// resolver's `AdminKubeconfigRequest` flow.
    Yaml(Secret<String>),
    /// A path to a kubeconfig file on disk.
    Path(String),
}

/// Secrets that may carry kubeconfig material, mirroring the shape the
/// Python `secrets` mapping is inspected for (`kubeconfig_struct`,
/// `kubeconfig_yaml`, `kubeconfig_path`).
#[derive(Default)]
pub struct KubeconfigSecrets {
    pub kubeconfig_struct: Option<Secret<serde_yaml::Value>>,
    pub kubeconfig_yaml: Option<Secret<String>>,
    pub kubeconfig_path: Option<String>,
}

/// Resolves which kubeconfig source to use, in the documented order. Falls
/// back to the `KUBECONFIG` environment variable if nothing in `secrets`
/// supplies one.
pub fn resolve(secrets: &KubeconfigSecrets) -> Option<KubeconfigSource> {
    if let Some(inline) = &secrets.kubeconfig_struct {
        return Some(KubeconfigSource::Inline(inline.clone()));
    }
    if let Some(yaml) = &secrets.kubeconfig_yaml {
        return Some(KubeconfigSource::Yaml(yaml.clone()));
    }
    if let Some(path) = &secrets.kubeconfig_path {
        return Some(KubeconfigSource::Path(path.clone()));
    }
    std::env::var("KUBECONFIG").ok().map(KubeconfigSource::Path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_inline_struct_over_everything() {
        let secrets = KubeconfigSecrets {
            kubeconfig_struct: Some(Secret::new(serde_yaml::Value::Null)),
            kubeconfig_yaml: Some(Secret::new("yaml".to_string())),
            kubeconfig_path: Some("/tmp/kubeconfig".to_string()),
        };
        assert!(matches!(resolve(&secrets), Some(KubeconfigSource::Inline(_))));
    }

    #[test]
    fn falls_back_to_path_then_env() {
        let secrets = KubeconfigSecrets {
            kubeconfig_path: Some("/tmp/kubeconfig".to_string()),
            ..Default::default()
        };
        assert!(matches!(resolve(&secrets), Some(KubeconfigSource::Path(p)) if p == "/tmp/kubeconfig"));
    }
}
