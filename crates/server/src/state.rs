use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use printwizard_core::{
    Config, Credential, JobLifecycleController, RemoteJobService, SanitizedConfig, TokenSession,
};

/// Job controller of one signed-in user.
struct UserJob {
    session: Arc<TokenSession>,
    controller: JobLifecycleController,
    last_seen: Instant,
}

/// Shared application state
pub struct AppState {
    config: Config,
    remote: Arc<dyn RemoteJobService>,
    /// Controllers keyed by the SHA-256 of the user's bearer token.
    jobs: RwLock<HashMap<String, UserJob>>,
}

impl AppState {
    pub fn new(config: Config, remote: Arc<dyn RemoteJobService>) -> Self {
        Self {
            config,
            remote,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Controller for the user holding `token`, created on first use.
    ///
    /// The controller's session always carries the latest token seen.
    /// Sessions idle for longer than `server.session_idle_secs` are dropped
    /// first; a new session beyond `server.max_sessions` displaces the least
    /// recently seen one. Dropped controllers are reset, which stops their
    /// polling.
    pub async fn controller_for(&self, token: &str) -> JobLifecycleController {
        let key = token_key(token);
        let now = Instant::now();

        let (controller, evicted) = {
            let mut jobs = self.jobs.write().await;
            let mut evicted = take_idle(&mut jobs, now, &self.config);

            if !jobs.contains_key(&key) && jobs.len() >= self.config.server.max_sessions {
                let oldest = jobs
                    .iter()
                    .min_by_key(|(_, job)| job.last_seen)
                    .map(|(k, _)| k.clone());
                if let Some(job) = oldest.and_then(|k| jobs.remove(&k)) {
                    debug!("Session limit reached, dropping least recently seen session");
                    evicted.push(job.controller);
                }
            }

            let job = jobs.entry(key).or_insert_with(|| {
                debug!("Creating job controller for new session");
                let session = Arc::new(TokenSession::new(Credential::new(token)));
                let controller = JobLifecycleController::new(
                    Arc::clone(&self.remote),
                    session.clone(),
                    self.config.lifecycle.clone(),
                );
                UserJob {
                    session,
                    controller,
                    last_seen: now,
                }
            });
            job.last_seen = now;
            job.session.set(Credential::new(token)).await;
            (job.controller.clone(), evicted)
        };

        reset_controllers(evicted).await;
        controller
    }

    /// Drop sessions idle past `server.session_idle_secs`.
    ///
    /// Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let evicted = {
            let mut jobs = self.jobs.write().await;
            take_idle(&mut jobs, Instant::now(), &self.config)
        };
        let count = evicted.len();
        reset_controllers(evicted).await;
        if count > 0 {
            info!(count, "Dropped idle sessions");
        }
        count
    }

    /// Number of sessions with a controller.
    pub async fn active_sessions(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Reset every controller, stopping all background polling.
    pub async fn reset_all(&self) {
        let controllers: Vec<JobLifecycleController> = self
            .jobs
            .read()
            .await
            .values()
            .map(|job| job.controller.clone())
            .collect();
        reset_controllers(controllers).await;
    }
}

/// Remove entries not seen within the idle window and return their controllers.
fn take_idle(
    jobs: &mut HashMap<String, UserJob>,
    now: Instant,
    config: &Config,
) -> Vec<JobLifecycleController> {
    let idle = config.server.session_idle();
    let expired: Vec<String> = jobs
        .iter()
        .filter(|(_, job)| now.saturating_duration_since(job.last_seen) > idle)
        .map(|(key, _)| key.clone())
        .collect();

    expired
        .into_iter()
        .filter_map(|key| jobs.remove(&key))
        .map(|job| job.controller)
        .collect()
}

async fn reset_controllers(controllers: Vec<JobLifecycleController>) {
    for controller in controllers {
        controller.reset().await;
    }
}

fn token_key(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
