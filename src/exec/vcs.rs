// src/exec/vcs.rs

//! Release tagging through the version-control CLI.

use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::exec::runner::{run_checked, CommandRunner, CommandSpec};
use crate::pipeline::version::VersionToken;

/// Tag name for a version (`v1.2.3`).
pub fn tag_name(version: &VersionToken) -> String {
    format!("v{version}")
}

/// The fixed command sequence used to publish a version.
///
/// Stage everything, commit with a version-stamped message, create an
/// annotated tag and push tags.
pub fn tag_commands(program: &str, cwd: &Path, version: &VersionToken) -> Vec<CommandSpec> {
    let tag = tag_name(version);
    let base = || CommandSpec::new(program).cwd(cwd);

    vec![
        base().args(["add", "."]),
        base().args(["commit", "-a", "-m"]).arg(format!("Pushing version {version}")),
        base().args(["tag", "-a"]).arg(tag.clone()).arg("-m").arg(format!("Version {version}")),
        base().args(["push", "--tags"]),
    ]
}

/// Run the tagging sequence, stopping at the first command that fails.
pub async fn tag_release(
    runner: &dyn CommandRunner,
    program: &str,
    cwd: &Path,
    version: &VersionToken,
) -> Result<()> {
    for spec in tag_commands(program, cwd, version) {
        run_checked(runner, spec).await?;
    }
    info!(tag = %tag_name(version), "tagged and pushed release");
    Ok(())
}
