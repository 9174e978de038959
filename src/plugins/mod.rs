pub mod server;

use std::sync::Arc;

use tokio::{task::JoinSet, time::sleep};

use crate::{prelude::*, state::AppState};

const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Long-running part of the service.
///
/// Anything that can fail for good (sockets, credentials) is acquired when
/// the plugin is constructed, so `start` only ever fails transiently.
#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  /// Runs until the service is done. `Err` and panics are restarted.
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
  restart_delay: Duration,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new(), restart_delay: RESTART_DELAY }
  }

  pub fn restart_delay(mut self, delay: Duration) -> Self {
    self.restart_delay = delay;
    self
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Supervises every registered plugin and returns once all of them have
  /// finished.
  pub async fn run(self, app: Arc<AppState>) {
    let mut services = JoinSet::new();
    for plugin in self.plugins {
      services.spawn(supervise(plugin, app.clone(), self.restart_delay));
    }

    while let Some(done) = services.join_next().await {
      match done {
        Ok((name, restarts)) => {
          info!("Service `{name}` finished after {restarts} restart(s)")
        }
        Err(err) => error!("Supervisor task failed: {err}"),
      }
    }
  }
}

async fn supervise(
  plugin: Arc<dyn Plugin>,
  app: Arc<AppState>,
  delay: Duration,
) -> (&'static str, u32) {
  let name = plugin.name();
  let mut restarts = 0;

  loop {
    debug!("Starting service `{name}`");
    let run = tokio::spawn({
      let plugin = plugin.clone();
      let app = app.clone();
      async move { plugin.start(app).await }
    });

    match run.await {
      Ok(Ok(())) => return (name, restarts),
      Ok(Err(err)) => error!("Service `{name}` failed: {err:#}"),
      Err(err) if err.is_cancelled() => return (name, restarts),
      Err(_) => error!("Service `{name}` panicked"),
    }

    restarts += 1;
    warn!(
      "Restarting service `{name}` in {} (restart #{restarts})",
      humantime::format_duration(delay)
    );
    sleep(delay).await;
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;
  use crate::{entity::setup_test_db, state::Config};

  /// Fails, then panics, then finishes.
  struct Flaky {
    attempts: Arc<AtomicU32>,
  }

  #[async_trait]
  impl Plugin for Flaky {
    fn name(&self) -> &'static str {
      "flaky"
    }

    async fn start(&self, _: Arc<AppState>) -> anyhow::Result<()> {
      match self.attempts.fetch_add(1, Ordering::SeqCst) {
        0 => anyhow::bail!("connection reset"),
        1 => panic!("boom"),
        _ => Ok(()),
      }
    }
  }

  #[tokio::test]
  async fn test_restarts_until_finished() {
    let state =
      AppState::with_connection(setup_test_db().await, Config::default());
    let attempts = Arc::new(AtomicU32::new(0));

    App::new()
      .restart_delay(Duration::from_millis(10))
      .register(Flaky { attempts: attempts.clone() })
      .run(Arc::new(state))
      .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_supervise_reports_restarts() {
    let state =
      AppState::with_connection(setup_test_db().await, Config::default());
    let plugin = Flaky { attempts: Arc::new(AtomicU32::new(0)) };

    let (name, restarts) =
      supervise(Arc::new(plugin), Arc::new(state), Duration::from_millis(1))
        .await;
    assert_eq!((name, restarts), ("flaky", 2));
  }
}
