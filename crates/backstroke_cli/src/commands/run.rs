//! The worker loop: drain the queue, then poll until shut down.

use std::sync::Arc;

use backstroke::github::GitHubClient;
use backstroke::{
    DryRunClient, DryRunMirror, Git2Mirror, GitMirror, HostingClient, OperationWorker, SqlQueue,
    StatusReporter, SyncEngine, connect_and_migrate,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::shutdown::{idle, is_shutdown_requested};

type Collaborators = (Arc<dyn HostingClient>, Arc<dyn GitMirror>);

/// Build the hosting client and git mirror, swapping in logging stand-ins for a dry run.
fn collaborators(
    token: &str,
    dry_run: bool,
) -> Result<Collaborators, Box<dyn std::error::Error>> {
    let github = GitHubClient::new(token)?;
    if dry_run {
        let client: Arc<dyn HostingClient> = Arc::new(DryRunClient::new(github));
        let mirror: Arc<dyn GitMirror> = Arc::new(DryRunMirror);
        return Ok((client, mirror));
    }

    let client: Arc<dyn HostingClient> = Arc::new(github);
    let mirror: Arc<dyn GitMirror> = Arc::new(Git2Mirror::new(Some(token.to_string())));
    Ok((client, mirror))
}

pub(crate) async fn handle_run(
    once: bool,
    dry_run: bool,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = config
        .github_token()
        .ok_or("No GitHub token configured. Set [github] token or BACKSTROKE_GITHUB__TOKEN.")?;
    let dry_run = dry_run || config.worker.dry_run;

    let db = Arc::new(connect_and_migrate(database_url).await?);
    let (client, mirror) = collaborators(&token, dry_run)?;
    let engine = SyncEngine::new(client, mirror, config.quota_gate(), config.engine_config());
    let reporter = StatusReporter::new(Arc::new(config.status_store(db.clone())))
        .with_ttl(config.status_ttl())
        .with_handled_by(config.handled_by());
    let worker = OperationWorker::new(Arc::new(SqlQueue::new(db)), reporter, engine);

    info!(
        handled_by = %config.handled_by(),
        dry_run,
        once,
        poll_ms = config.worker.poll_interval_ms,
        "worker started"
    );

    loop {
        match worker.drain(None, || !is_shutdown_requested()).await {
            Ok(summary) if summary.processed == 0 => debug!("no operations queued"),
            Ok(_) => {}
            Err(e) if once => return Err(e.into()),
            Err(e) => warn!(error = %e, "drain pass failed, retrying on next poll"),
        }

        if once || is_shutdown_requested() {
            break;
        }
        idle(config.poll_interval()).await;
        if is_shutdown_requested() {
            break;
        }
    }

    info!("worker stopped");
    Ok(())
}
