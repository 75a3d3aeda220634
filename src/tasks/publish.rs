// src/tasks/publish.rs

use std::sync::Arc;

use tracing::info;

use crate::engine::BuildSession;
use crate::errors::Result;
use crate::exec::vcs::{tag_name, tag_release};

pub(super) async fn tag(session: Arc<BuildSession>) -> Result<()> {
    let version = session.version().await?;
    tag_release(
        session.runner().as_ref(),
        &session.config().vcs.program,
        session.root(),
        &version,
    )
    .await
}

/// Everything happens in the prerequisites; this only reports.
pub(super) async fn release(session: Arc<BuildSession>) -> Result<()> {
    let version = session.version().await?;
    info!(version = %version, tag = %tag_name(&version), "release prepared");
    Ok(())
}
