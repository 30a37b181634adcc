use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

use remote_training::KaggleUser;

// Resolve the branch currently checked out in the working tree
pub fn git_branch_name() -> Result<String> {
    let output = Command::new("git")
        .args(["branch", "--show-current"])
        .output()
        .context("failed to run git branch --show-current")?;

    if !output.status.success() {
        bail!("git branch --show-current exited with status {}", output.status);
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() {
        // Empty output means a detached HEAD
        bail!("could not determine the current git branch");
    }

    Ok(branch)
}

// Platform CLI invocation with the selected account's credentials exported
fn kaggle_command(user: &KaggleUser) -> Command {
    let mut command = Command::new("kaggle");
    command
        .env("KAGGLE_USERNAME", &user.username)
        .env("KAGGLE_KEY", &user.key);
    command
}

// Push a prepared kernel directory to the platform
pub fn kernels_push(kernel_dir: &Path, user: &KaggleUser) -> Result<()> {
    println!("pushing kernel from '{}'...", kernel_dir.display());

    let status = kaggle_command(user)
        .args(["kernels", "push", "-p"])
        .arg(kernel_dir)
        .status()
        .context("failed to run kaggle kernels push")?;

    if !status.success() {
        bail!("kaggle kernels push exited with status {status}");
    }

    Ok(())
}

// Fetch the output bundle of a finished kernel
pub fn kernels_output(kernel_ref: &str, dest: &Path, user: &KaggleUser) -> Result<()> {
    let status = kaggle_command(user)
        .args(["kernels", "output", kernel_ref, "-p"])
        .arg(dest)
        .status()
        .context("failed to run kaggle kernels output")?;

    if !status.success() {
        bail!("kaggle kernels output exited with status {status} for '{kernel_ref}'");
    }

    Ok(())
}

// Unpack a single member of the downloaded output archive into the working tree
pub fn extract_output(archive: &Path, member: &str) -> Result<()> {
    let status = Command::new("tar")
        .arg("-xzf")
        .arg(archive)
        .arg(member)
        .status()
        .context("failed to run tar")?;

    if !status.success() {
        bail!(
            "tar exited with status {status} while extracting '{}'",
            archive.display()
        );
    }

    Ok(())
}
