use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

// Pipeline selection enum
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Full,
    Learning,
    Testing,
}

impl Pipeline {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Learning => "learning",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Credentials for one Kaggle account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KaggleUser {
    pub username: String,
    pub key: String,
}

// Registry of Kaggle accounts, keyed by a local alias
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UserRegistry {
    pub users: BTreeMap<String, KaggleUser>,
}

impl UserRegistry {
    /// Load the registry from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if it contains invalid JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let json_content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read users file from {path_str}"))?;

        let registry: UserRegistry = serde_json::from_str(&json_content)
            .with_context(|| format!("failed to parse JSON from {path_str}"))?;

        Ok(registry)
    }

    // Look up credentials by alias
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&KaggleUser> {
        self.users.get(alias)
    }

    // Known aliases in sorted order, for error messages
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }
}

fn default_template_path() -> String {
    "remote_training.ipynb".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

// Project-level settings shared by every launch
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectConfig {
    pub notebook_id: String,
    pub git_user: String,
    pub git_repo: String,
    #[serde(default = "default_template_path")]
    pub template_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub dataset_sources: Vec<String>,
    #[serde(default)]
    pub dataset_files: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Load project settings from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid JSON, or
    /// leaves the git remote coordinates empty.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let json_content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read project config from {path_str}"))?;

        let config: ProjectConfig = serde_json::from_str(&json_content)
            .with_context(|| format!("failed to parse JSON from {path_str}"))?;

        // The remote notebook clones the repo, so both coordinates are mandatory
        if config.git_user.is_empty() {
            bail!("git_user must not be empty in {path_str}");
        }
        if config.git_repo.is_empty() {
            bail!("git_repo must not be empty in {path_str}");
        }

        Ok(config)
    }
}

// Values substituted into the notebook, rendered as Python literals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Int(i64),
    Str(String),
    IntList(Vec<u32>),
    StrList(Vec<String>),
    None,
}

// Single-quoted Python string literal
fn quote_py(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(&quote_py(s)),
            Self::IntList(numbers) => {
                let items: Vec<String> = numbers.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::StrList(strings) => {
                let items: Vec<String> = strings.iter().map(|s| quote_py(s)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::None => f.write_str("None"),
        }
    }
}

// Notebook template with !!!name!!! placeholders
#[derive(Debug, Clone)]
pub struct NotebookTemplate {
    content: String,
}

impl NotebookTemplate {
    #[must_use]
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Load a template from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read notebook template from {path_str}"))?;
        Ok(Self { content })
    }

    // Replace every occurrence of the named placeholders; unknown ones stay
    #[must_use]
    pub fn render(&self, values: &[(&str, TemplateValue)]) -> String {
        let mut rendered = self.content.clone();
        for (name, value) in values {
            rendered = rendered.replace(&format!("!!!{name}!!!"), &value.to_string());
        }
        rendered
    }

    // Placeholder names still present after rendering
    #[must_use]
    pub fn unresolved(rendered: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut rest = rendered;
        while let Some(start) = rest.find("!!!") {
            let after = &rest[start + 3..];
            let Some(end) = after.find("!!!") else { break };
            let name = &after[..end];
            if !name.is_empty()
                && !name.contains(char::is_whitespace)
                && !names.iter().any(|known| known.as_str() == name)
            {
                names.push(name.to_string());
            }
            rest = &after[end + 3..];
        }
        names
    }
}

// Kernel descriptor flags are strings in the platform's metadata format
fn flag(on: bool) -> String {
    let value = if on { "true" } else { "false" };
    value.to_string()
}

// kernel-metadata.json contents, as the platform CLI expects them
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KernelMetadata {
    pub id: String,
    pub title: String,
    pub code_file: String,
    pub language: String,
    pub kernel_type: String,
    pub is_private: String,
    pub enable_gpu: String,
    pub enable_tpu: String,
    pub enable_internet: String,
    pub full_pipeline: String,
    pub learning_pipeline: String,
    pub testing_pipeline: String,
    pub dataset_sources: Vec<String>,
    pub competition_sources: Vec<String>,
    pub kernel_sources: Vec<String>,
    pub model_sources: Vec<String>,
}

impl KernelMetadata {
    #[must_use]
    pub fn new(
        username: &str,
        notebook_id: &str,
        experiment_tag: &str,
        pipeline: Pipeline,
        gpu: bool,
        dataset_sources: Vec<String>,
    ) -> Self {
        Self {
            id: format!("{username}/{experiment_tag}"),
            title: notebook_id.to_lowercase(),
            code_file: format!("{notebook_id}.ipynb"),
            language: "python".to_string(),
            kernel_type: "notebook".to_string(),
            is_private: flag(true),
            enable_gpu: flag(gpu),
            enable_tpu: flag(false),
            enable_internet: flag(true),
            full_pipeline: flag(pipeline == Pipeline::Full),
            learning_pipeline: flag(pipeline == Pipeline::Learning),
            testing_pipeline: flag(pipeline == Pipeline::Testing),
            dataset_sources,
            competition_sources: Vec::new(),
            kernel_sources: Vec::new(),
            model_sources: Vec::new(),
        }
    }

    /// Save the descriptor as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or if the JSON
    /// serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();
        let content = serde_json::to_string_pretty(&self)
            .with_context(|| "failed to serialize kernel metadata to JSON")?;

        fs::write(&path, content)
            .with_context(|| format!("failed to write kernel metadata to {path_str}"))?;

        Ok(())
    }
}

// Experiment numbers joined as a zero-padded tag, e.g. [7, 42] -> "00007_00042"
#[must_use]
pub fn experiment_tag(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|n| format!("{n:05}"))
        .collect::<Vec<_>>()
        .join("_")
}
