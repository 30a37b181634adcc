#[cfg(test)]
mod tests {
    use anyhow::Result;
    use remote_training::{
        experiment_tag, KernelMetadata, NotebookTemplate, Pipeline, ProjectConfig, TemplateValue,
        UserRegistry,
    };
    use std::fs;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Helper to build a metadata descriptor with fixed coordinates
    fn create_test_metadata(pipeline: Pipeline, gpu: bool) -> KernelMetadata {
        KernelMetadata::new(
            "alice_kaggle",
            "MyNotebook",
            "00007_00042",
            pipeline,
            gpu,
            vec!["alice_kaggle/training-data".to_string()],
        )
    }

    // Test loading the users file
    #[test]
    fn test_user_registry_from_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        let json_content = r#"
        {
            "users": {
                "bob": {"username": "bob_kaggle", "key": "k2"},
                "alice": {"username": "alice_kaggle", "key": "k1"}
            }
        }
        "#;

        write!(temp_file, "{}", json_content)?;

        let registry = UserRegistry::from_file(temp_file.path())?;

        let alice = registry.get("alice").expect("alice should be present");
        assert_eq!(alice.username, "alice_kaggle");
        assert_eq!(alice.key, "k1");

        // Aliases come back sorted regardless of file order
        assert_eq!(registry.aliases(), vec!["alice", "bob"]);

        Ok(())
    }

    // Test unknown alias lookup and the empty registry
    #[test]
    fn test_user_registry_unknown_alias() {
        let registry = UserRegistry::default();

        assert!(registry.get("nobody").is_none());
        assert!(registry.aliases().is_empty());
    }

    // Test invalid users file content
    #[test]
    fn test_user_registry_invalid_json() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "not valid json")?;

        assert!(UserRegistry::from_file(temp_file.path()).is_err());

        Ok(())
    }

    // Test project config defaults for optional fields
    #[test]
    fn test_project_config_defaults() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        let json_content = r#"
        {
            "notebook_id": "MyNotebook",
            "git_user": "alice",
            "git_repo": "trainer"
        }
        "#;

        write!(temp_file, "{}", json_content)?;

        let config = ProjectConfig::from_file(temp_file.path())?;

        assert_eq!(config.notebook_id, "MyNotebook");
        assert_eq!(config.template_path, "remote_training.ipynb");
        assert_eq!(config.output_dir, "output");
        assert!(config.dataset_sources.is_empty());
        assert!(config.dataset_files.is_none());

        Ok(())
    }

    // Test that the git coordinates are mandatory
    #[test]
    fn test_project_config_requires_git_coordinates() -> Result<()> {
        // Missing git_repo field
        let mut missing = NamedTempFile::new()?;
        write!(
            missing,
            r#"{{"notebook_id": "nb", "git_user": "alice"}}"#
        )?;
        assert!(ProjectConfig::from_file(missing.path()).is_err());

        // Empty git_user value
        let mut empty = NamedTempFile::new()?;
        write!(
            empty,
            r#"{{"notebook_id": "nb", "git_user": "", "git_repo": "trainer"}}"#
        )?;
        let err = ProjectConfig::from_file(empty.path()).unwrap_err();
        assert!(err.to_string().contains("git_user"));

        Ok(())
    }

    // Test experiment tag formatting
    #[test]
    fn test_experiment_tag_formatting() {
        assert_eq!(experiment_tag(&[7]), "00007");
        assert_eq!(experiment_tag(&[7, 42]), "00007_00042");
        assert_eq!(experiment_tag(&[0, 1, 2]), "00000_00001_00002");

        // Numbers wider than the padding are kept intact
        assert_eq!(experiment_tag(&[123_456]), "123456");
    }

    // Test Python literal rendering of template values
    #[test]
    fn test_template_value_literals() {
        assert_eq!(TemplateValue::Int(3).to_string(), "3");
        assert_eq!(TemplateValue::Str("main".to_string()).to_string(), "'main'");
        assert_eq!(TemplateValue::IntList(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(
            TemplateValue::StrList(vec!["a".to_string(), "b".to_string()]).to_string(),
            "['a', 'b']"
        );
        assert_eq!(TemplateValue::None.to_string(), "None");

        // Quotes inside a string stay valid Python
        assert_eq!(
            TemplateValue::Str("it's".to_string()).to_string(),
            "'it\\'s'"
        );
    }

    // Test placeholder substitution across lines and repeats
    #[test]
    fn test_template_render() {
        let template = NotebookTemplate::new(
            "exp = !!!exp!!!\nbranch = !!!branch!!!; repo = !!!git_repo!!!\nprint(!!!branch!!!)\n"
                .to_string(),
        );

        let rendered = template.render(&[
            ("exp", TemplateValue::IntList(vec![7, 42])),
            ("branch", TemplateValue::Str("main".to_string())),
            ("git_repo", TemplateValue::Str("trainer".to_string())),
        ]);

        assert_eq!(
            rendered,
            "exp = [7, 42]\nbranch = 'main'; repo = 'trainer'\nprint('main')\n"
        );
    }

    // Test that unknown placeholders survive rendering untouched
    #[test]
    fn test_template_render_leaves_unknown_placeholders() {
        let template = NotebookTemplate::new("a = !!!exp!!!\nb = !!!mystery!!!\n".to_string());

        let rendered = template.render(&[("exp", TemplateValue::Int(1))]);

        assert_eq!(rendered, "a = 1\nb = !!!mystery!!!\n");
    }

    // Test the unresolved placeholder scan
    #[test]
    fn test_unresolved_placeholder_scan() {
        let rendered = "a = 1\nb = !!!mystery!!!\nc = !!!mystery!!! + !!!other!!!\n";
        assert_eq!(
            NotebookTemplate::unresolved(rendered),
            vec!["mystery", "other"]
        );

        // Fully rendered output reports nothing
        assert!(NotebookTemplate::unresolved("a = 1\nb = [1, 2]\n").is_empty());
    }

    // Test loading a template from disk
    #[test]
    fn test_template_load_from_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "pipeline = !!!pipeline!!!")?;

        let template = NotebookTemplate::load(temp_file.path())?;
        let rendered = template.render(&[(
            "pipeline",
            TemplateValue::Str(Pipeline::Learning.to_string()),
        )]);

        assert_eq!(rendered, "pipeline = 'learning'");

        Ok(())
    }

    // Test the kernel metadata field mapping
    #[test]
    fn test_kernel_metadata_mapping() {
        let metadata = create_test_metadata(Pipeline::Full, true);

        assert_eq!(metadata.id, "alice_kaggle/00007_00042");
        assert_eq!(metadata.title, "mynotebook");
        assert_eq!(metadata.code_file, "MyNotebook.ipynb");
        assert_eq!(metadata.language, "python");
        assert_eq!(metadata.kernel_type, "notebook");
        assert_eq!(metadata.is_private, "true");
        assert_eq!(metadata.enable_internet, "true");
        assert_eq!(metadata.enable_tpu, "false");
        assert_eq!(metadata.enable_gpu, "true");
        assert_eq!(
            metadata.dataset_sources,
            vec!["alice_kaggle/training-data"]
        );
        assert!(metadata.competition_sources.is_empty());
        assert!(metadata.kernel_sources.is_empty());
        assert!(metadata.model_sources.is_empty());

        // Forcing CPU turns off the GPU request
        let cpu_metadata = create_test_metadata(Pipeline::Full, false);
        assert_eq!(cpu_metadata.enable_gpu, "false");
    }

    // Test the pipeline selection flags in the descriptor
    #[test]
    fn test_kernel_metadata_pipeline_flags() {
        let full = create_test_metadata(Pipeline::Full, true);
        assert_eq!(full.full_pipeline, "true");
        assert_eq!(full.learning_pipeline, "false");
        assert_eq!(full.testing_pipeline, "false");

        let learning = create_test_metadata(Pipeline::Learning, true);
        assert_eq!(learning.full_pipeline, "false");
        assert_eq!(learning.learning_pipeline, "true");
        assert_eq!(learning.testing_pipeline, "false");

        let testing = create_test_metadata(Pipeline::Testing, true);
        assert_eq!(testing.testing_pipeline, "true");
    }

    // Test saving and reloading the descriptor
    #[test]
    fn test_kernel_metadata_save() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kernel-metadata.json");

        let metadata = create_test_metadata(Pipeline::Testing, false);
        metadata.save(&path)?;

        let content = fs::read_to_string(&path)?;
        let reloaded: KernelMetadata = serde_json::from_str(&content)?;

        assert_eq!(reloaded.id, metadata.id);
        assert_eq!(reloaded.code_file, metadata.code_file);
        assert_eq!(reloaded.enable_gpu, "false");
        assert_eq!(reloaded.testing_pipeline, "true");
        assert_eq!(reloaded.dataset_sources, metadata.dataset_sources);

        Ok(())
    }
}
