use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{
    future::{join, join_all},
    TryFutureExt,
};
use slog::{error, info, Logger};
use tokio::{runtime::Runtime, time::sleep};

use primitives::{adapter::Adapter, util::ApiUrl, Config};

use crate::{channel::channel_tick, sentry_interface::all_channels};

#[derive(Clone)]
pub struct Worker<A: Adapter> {
    pub adapter: A,
    pub config: Config,
    pub logger: Logger,
    pub sentry_url: ApiUrl,
}

impl<A: Adapter + 'static> Worker<A> {
    /// Requires an already unlocked [`Adapter`].
    pub fn new(adapter: A, config: Config, logger: Logger, sentry_url: ApiUrl) -> Self {
        Self {
            adapter,
            config,
            logger,
            sentry_url,
        }
    }

    /// Runs a single tick cycle, or ticks forever every `wait_time`.
    pub fn run(self, is_single_tick: bool) -> Result<(), Box<dyn Error>> {
        let rt = Runtime::new()?;

        if is_single_tick {
            rt.block_on(self.all_channels_tick());
        } else {
            rt.block_on(self.infinite());
        }

        Ok(())
    }

    async fn infinite(&self) {
        let shutdown = Arc::new(AtomicBool::new(false));

        {
            let shutdown = shutdown.clone();
            let logger = self.logger.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                info!(logger, "shutdown requested, draining the current cycle");
                shutdown.store(true, Ordering::Relaxed);
            });
        }

        loop {
            let wait_time_future = sleep(Duration::from_millis(self.config.wait_time.into()));

            let _result = join(self.all_channels_tick(), wait_time_future).await;

            if shutdown.load(Ordering::Relaxed) {
                info!(self.logger, "cycle drained, exiting");
                break;
            }
        }
    }

    pub async fn all_channels_tick(&self) {
        let logger = &self.logger;

        let channels =
            match all_channels(&self.sentry_url, self.adapter.whoami(), &self.config).await {
                Ok(channels) => channels,
                Err(err) => {
                    error!(logger, "error listing channels for the tick"; "error" => %err);
                    return;
                }
            };
        let channels_size = channels.len();

        let tick_results = join_all(channels.into_iter().map(|channel| {
            let channel_id = channel.id;

            channel_tick(self.adapter.clone(), &self.config, logger, channel)
                .map_err(move |err| (channel_id, err))
        }))
        .await;

        for (channel_id, channel_err) in tick_results.into_iter().filter_map(Result::err) {
            error!(logger, "error processing channel"; "channelId" => %channel_id, "error" => %channel_err);
        }

        info!(logger, "processed {} channels", channels_size);

        if channels_size >= self.config.max_channels as usize {
            error!(
                logger,
                "WARNING: channel limit cfg.MAX_CHANNELS={} reached", self.config.max_channels
            );
        }
    }
}

/// Resolves on SIGTERM or ctrl-c.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
