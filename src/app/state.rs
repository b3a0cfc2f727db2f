//! Application state shared across routes

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::game::MatchLauncher;
use crate::matchmaking::MatchmakingService;
use crate::util::rate_limit::IpRateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matchmaking: Arc<MatchmakingService>,
    pub limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let limiter = Arc::new(IpRateLimiter::new(
            config.max_conns_per_ip,
            config.messages_per_sec,
            config.trust_proxy,
        ));

        // Rooms are spawned by the launcher as soon as two players pair up
        let launcher = Arc::new(MatchLauncher::new(Duration::from_secs(
            config.game_over_linger_secs,
        )));
        let matchmaking = Arc::new(MatchmakingService::new(launcher, config.max_active_rooms));

        Self {
            config,
            matchmaking,
            limiter,
        }
    }
}
