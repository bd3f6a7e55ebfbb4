//! Manifest of declared files
//!
//! ```toml
//! [[file]]
//! name = "motd"
//! path = "out/motd.txt"
//! content = "hello\n"
//! ```

use anyhow::{Context, Result, bail};
use filekit::DesiredState;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default manifest file name
pub const MANIFEST_FILE: &str = "localfile.toml";

/// State file location relative to the manifest directory
pub const STATE_FILE: &str = ".localfile/state.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "file")]
    pub files: Vec<FileDecl>,
}

/// One `[[file]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDecl {
    /// Stable name used to track the file across runs
    pub name: String,
    /// Output path; `~` is expanded and relative paths resolve against the manifest
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sensitive_content: Option<Sensitive>,
}

/// String that never shows up in Debug output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sensitive(pub String);

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<sensitive>")
    }
}

impl Manifest {
    /// Load and validate a manifest
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid manifest format: {}", path.display()))?;
        manifest.validate()?;
        log::debug!(
            "Loaded {} file declarations from {}",
            manifest.files.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Check names are unique and fields are consistent
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for decl in &self.files {
            if decl.name.trim().is_empty() {
                bail!("File declaration with path '{}' has an empty name", decl.path);
            }
            if !seen.insert(decl.name.as_str()) {
                bail!("Duplicate file name '{}'", decl.name);
            }
            if decl.path.trim().is_empty() {
                bail!("File '{}' has an empty path", decl.name);
            }
            if decl.content.is_some() && decl.sensitive_content.is_some() {
                bail!(
                    "File '{}': 'content' conflicts with 'sensitive_content'",
                    decl.name
                );
            }
        }
        Ok(())
    }

    /// Check no two declarations resolve to the same file under `base_dir`
    pub fn validate_paths(&self, base_dir: &Path) -> Result<()> {
        let mut owners: HashMap<PathBuf, &str> = HashMap::new();
        for decl in &self.files {
            let path = resolve_path(base_dir, &decl.path);
            if let Some(other) = owners.insert(path.clone(), &decl.name) {
                bail!(
                    "Files '{}' and '{}' both write {}",
                    other,
                    decl.name,
                    path.display()
                );
            }
        }
        Ok(())
    }

    /// Find a declaration by name
    pub fn find(&self, name: &str) -> Option<&FileDecl> {
        self.files.iter().find(|f| f.name == name)
    }
}

impl FileDecl {
    /// Build the desired state, resolving the path against `base_dir`
    pub fn desired_state(&self, base_dir: &Path) -> DesiredState {
        let mut desired = DesiredState::new(resolve_path(base_dir, &self.path));
        if let Some(content) = &self.content {
            desired = desired.with_content(content.as_bytes());
        }
        if let Some(Sensitive(secret)) = &self.sensitive_content {
            desired = desired.with_sensitive_content(secret.as_bytes());
        }
        desired
    }
}

/// Expand `~` and anchor relative paths at `base_dir`
pub fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// Directory the manifest lives in; relative paths resolve against it
pub fn manifest_dir(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Default state file location for a manifest
pub fn default_state_path(manifest: &Path) -> PathBuf {
    manifest_dir(manifest).join(STATE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<Manifest> {
        let manifest: Manifest = toml::from_str(toml_str)?;
        manifest.validate()?;
        Ok(manifest)
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse(
            r#"
            [[file]]
            name = "motd"
            path = "out/motd.txt"
            content = "hello\n"

            [[file]]
            name = "token"
            path = "/etc/token"
            sensitive_content = "s3cr3t"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.find("motd").unwrap().content.as_deref(), Some("hello\n"));
        let token = manifest.find("token").unwrap();
        assert_eq!(token.sensitive_content, Some(Sensitive("s3cr3t".into())));
        assert!(!format!("{token:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        assert!(parse("").unwrap().files.is_empty());
    }

    #[test]
    fn test_conflicting_content_is_rejected() {
        let err = parse(
            r#"
            [[file]]
            name = "both"
            path = "x"
            content = "A"
            sensitive_content = "B"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn test_duplicate_and_empty_names_are_rejected() {
        let dup = r#"
            [[file]]
            name = "a"
            path = "x"
            [[file]]
            name = "a"
            path = "y"
        "#;
        assert!(parse(dup).unwrap_err().to_string().contains("Duplicate"));

        let empty = r#"
            [[file]]
            name = " "
            path = "x"
        "#;
        assert!(parse(empty).is_err());
    }

    #[test]
    fn test_two_names_on_one_path_are_rejected() {
        let manifest = parse(
            r#"
            [[file]]
            name = "a"
            path = "x.txt"
            content = "A"

            [[file]]
            name = "b"
            path = "./x.txt"
            content = "B"
            "#,
        )
        .unwrap();

        let err = manifest.validate_paths(Path::new("/srv")).unwrap_err();
        assert!(err.to_string().contains("both write /srv/x.txt"));

        // Absolute spelling of the same file collides too
        let manifest = parse(
            r#"
            [[file]]
            name = "a"
            path = "x.txt"
            [[file]]
            name = "b"
            path = "/srv/x.txt"
            "#,
        )
        .unwrap();
        assert!(manifest.validate_paths(Path::new("/srv")).is_err());
        assert!(manifest.validate_paths(Path::new("/other")).is_ok());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: std::result::Result<Manifest, _> = toml::from_str(
            r#"
            [[file]]
            name = "a"
            path = "x"
            file_permission = "0644"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_desired_state_resolves_relative_path() {
        let decl = FileDecl {
            name: "motd".into(),
            path: "out/motd.txt".into(),
            content: Some("hi".into()),
            sensitive_content: None,
        };
        let desired = decl.desired_state(Path::new("/srv/site"));

        assert_eq!(desired.path, PathBuf::from("/srv/site/out/motd.txt"));
        assert_eq!(desired.effective_content(), b"hi");
    }

    #[test]
    fn test_absolute_path_is_kept() {
        assert_eq!(
            resolve_path(Path::new("/srv"), "/etc/motd"),
            PathBuf::from("/etc/motd")
        );
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, "[[file]]\nname = \"a\"\npath = \"a.txt\"\n").unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.files[0].name, "a");
        assert_eq!(default_state_path(&path), temp.path().join(STATE_FILE));

        assert!(Manifest::load(&temp.path().join("missing.toml")).is_err());
    }
}
