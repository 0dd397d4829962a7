//! Generation of a minimal skaffold.yaml.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum YamlError {
    /// A skaffold.yaml must list at least one manifest.
    #[error("Manifest path list must not be empty")]
    NoManifests,
}

/// Generates skaffold.yaml contents listing Kubernetes manifest paths.
#[derive(Debug, Clone)]
pub struct SkaffoldYaml {
    manifest_paths: Vec<String>,
}

impl SkaffoldYaml {
    /// Creates a generator over a non-empty list of manifest paths (paths may
    /// include glob patterns).
    pub fn new(
        manifest_paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, YamlError> {
        let manifest_paths: Vec<String> = manifest_paths.into_iter().map(Into::into).collect();
        if manifest_paths.is_empty() {
            return Err(YamlError::NoManifests);
        }
        Ok(Self { manifest_paths })
    }

    /// Generates the skaffold.yaml contents.
    pub fn generate(&self) -> String {
        let mut output = String::from(
            "apiVersion: skaffold/v1alpha2\n\
             kind: Config\n\
             deploy:\n  \
             kubectl:\n    \
             manifests:\n",
        );
        for path in &self.manifest_paths {
            output.push_str("    - ");
            output.push_str(path);
            output.push('\n');
        }
        output
    }
}
