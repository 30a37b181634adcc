use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::system::{extract_output, kernels_output, kernels_push};
use remote_training::{
    experiment_tag, KaggleUser, KernelMetadata, NotebookTemplate, Pipeline, ProjectConfig,
    TemplateValue,
};

// One resolved launch request
pub struct LaunchPlan {
    pub notebook_id: String,
    pub branch: String,
    pub exp: Vec<u32>,
    pub iteration: Vec<u32>,
    pub pipeline: Pipeline,
    pub gpu: bool,
    pub push: bool,
}

// Launcher handles the business logic
pub struct Launcher {
    config: ProjectConfig,
    user: KaggleUser,
}

impl Launcher {
    #[must_use]
    pub fn new(config: ProjectConfig, user: KaggleUser) -> Self {
        Self { config, user }
    }

    // Prepare the kernel directory and optionally push it to the platform
    pub fn launch(&self, plan: &LaunchPlan) -> Result<()> {
        let tag = experiment_tag(&plan.exp);
        let kernel_dir = PathBuf::from(format!("__nb_{}", self.user.username)).join(&tag);
        fs::create_dir_all(&kernel_dir).with_context(|| {
            format!("failed to create kernel directory '{}'", kernel_dir.display())
        })?;

        let notebook_path = kernel_dir.join(format!("{}.ipynb", plan.notebook_id));
        self.prepare_notebook(&notebook_path, plan)?;

        if !notebook_path.exists() {
            bail!("rendered notebook missing at '{}'", notebook_path.display());
        }

        let metadata = KernelMetadata::new(
            &self.user.username,
            &plan.notebook_id,
            &tag,
            plan.pipeline,
            plan.gpu,
            self.config.dataset_sources.clone(),
        );
        metadata.save(kernel_dir.join("kernel-metadata.json"))?;
        println!("prepared kernel at '{}'", kernel_dir.display());

        if plan.push {
            kernels_push(&kernel_dir, &self.user)?;
            println!("kernel pushed as '{}/{}'", self.user.username, tag);
        }

        Ok(())
    }

    // Render the notebook template with the experiment parameters
    fn prepare_notebook(&self, output_path: &Path, plan: &LaunchPlan) -> Result<()> {
        let template = NotebookTemplate::load(&self.config.template_path)?;

        let dataset_files = match &self.config.dataset_files {
            Some(files) => TemplateValue::StrList(files.clone()),
            None => TemplateValue::None,
        };
        let values = [
            ("exp", TemplateValue::IntList(plan.exp.clone())),
            ("iteration", TemplateValue::IntList(plan.iteration.clone())),
            ("branch", TemplateValue::Str(plan.branch.clone())),
            ("git_user", TemplateValue::Str(self.config.git_user.clone())),
            ("git_repo", TemplateValue::Str(self.config.git_repo.clone())),
            (
                "pipeline",
                TemplateValue::Str(plan.pipeline.as_str().to_string()),
            ),
            (
                "output_dir",
                TemplateValue::Str(self.config.output_dir.clone()),
            ),
            ("dataset_files", dataset_files),
        ];

        let rendered = template.render(&values);
        for name in NotebookTemplate::unresolved(&rendered) {
            eprintln!("warning: placeholder '!!!{name}!!!' left unresolved in the notebook");
        }

        fs::write(output_path, rendered).with_context(|| {
            format!("failed to write rendered notebook to '{}'", output_path.display())
        })
    }

    // Fetch finished results into the configured output directory
    pub fn download(&self, notebook_id: &str, exp: &[u32], iteration: &[u32]) -> Result<()> {
        let scratch = PathBuf::from(format!(
            "__tmp_{}_{}",
            experiment_tag(exp),
            experiment_tag(iteration)
        ));
        fs::create_dir_all(&scratch).with_context(|| {
            format!("failed to create scratch directory '{}'", scratch.display())
        })?;

        let kernel_ref = format!("{}/{notebook_id}", self.user.username);
        println!("downloading results for '{kernel_ref}'...");

        let result = kernels_output(&kernel_ref, &scratch, &self.user)
            .and_then(|()| extract_output(&scratch.join("output.tgz"), &self.config.output_dir));

        // Scratch removal failures are not fatal
        if let Err(e) = fs::remove_dir_all(&scratch) {
            eprintln!(
                "warning: failed to remove scratch directory '{}': {e}",
                scratch.display()
            );
        }

        result?;
        println!("results extracted to '{}'", self.config.output_dir);
        Ok(())
    }
}
