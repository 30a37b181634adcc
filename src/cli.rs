use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::exit;

use crate::launcher::{LaunchPlan, Launcher};
use crate::system::git_branch_name;
use remote_training::{Pipeline, ProjectConfig, UserRegistry};

// CLI arguments parsing structure
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Notebook name on Kaggle (defaults to the project config value)
    #[arg(short = 'n', long)]
    pub notebook_id: Option<String>,

    /// Alias of the Kaggle account to use, as listed in the users file
    #[arg(short = 'u', long)]
    pub user: String,

    /// Git branch checked out by the remote notebook (defaults to the current one)
    #[arg(long)]
    pub branch: Option<String>,

    /// Experiment numbers to run
    #[arg(short = 'e', long, required = true, num_args = 1..)]
    pub exp: Vec<u32>,

    /// Iteration numbers to run
    #[arg(short = 'i', long, num_args = 1.., default_values_t = vec![0])]
    pub iteration: Vec<u32>,

    /// Run the full pipeline
    #[arg(long, group = "pipeline")]
    pub full: bool,

    /// Run the learning pipeline only
    #[arg(long, group = "pipeline")]
    pub learning: bool,

    /// Run the testing pipeline only
    #[arg(long, group = "pipeline")]
    pub testing: bool,

    /// Force CPU (do not request a GPU)
    #[arg(long)]
    pub cpu: bool,

    /// Push the prepared kernel to Kaggle
    #[arg(short = 'p', long)]
    pub push: bool,

    /// Download finished results instead of launching
    #[arg(short = 'd', long)]
    pub download: bool,

    /// Project configuration file
    #[arg(long, default_value = "remote-training.json")]
    pub config: PathBuf,

    /// Kaggle users file
    #[arg(long, default_value = "kaggle-users.json")]
    pub users: PathBuf,
}

impl Cli {
    // The pipeline flags are mutually exclusive; launching needs exactly one
    fn pipeline(&self) -> Result<Pipeline> {
        match (self.full, self.learning, self.testing) {
            (true, _, _) => Ok(Pipeline::Full),
            (_, true, _) => Ok(Pipeline::Learning),
            (_, _, true) => Ok(Pipeline::Testing),
            _ => bail!("select a pipeline with --full, --learning or --testing"),
        }
    }
}

// Execute the selected flow
pub fn execute_command(cli: &Cli) -> Result<()> {
    let registry =
        UserRegistry::from_file(&cli.users).context("failed to load the users file")?;

    let Some(user) = registry.get(&cli.user) else {
        eprintln!("error: unknown user alias '{}'", cli.user);
        let aliases = registry.aliases();
        if aliases.is_empty() {
            eprintln!("the users file has no entries");
        } else {
            eprintln!("known aliases: {}", aliases.join(", "));
        }
        exit(1);
    };

    let config =
        ProjectConfig::from_file(&cli.config).context("failed to load the project config")?;
    let notebook_id = cli
        .notebook_id
        .clone()
        .unwrap_or_else(|| config.notebook_id.clone());

    let launcher = Launcher::new(config, user.clone());

    if cli.download {
        return launcher.download(&notebook_id, &cli.exp, &cli.iteration);
    }

    let branch = match &cli.branch {
        Some(branch) => branch.clone(),
        None => git_branch_name()
            .context("failed to resolve the current git branch; pass --branch explicitly")?,
    };

    let plan = LaunchPlan {
        notebook_id,
        branch,
        exp: cli.exp.clone(),
        iteration: cli.iteration.clone(),
        pipeline: cli.pipeline()?,
        gpu: !cli.cpu,
        push: cli.push,
    };
    launcher.launch(&plan)
}
