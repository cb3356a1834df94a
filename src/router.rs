//! Router — per-request destination decision
//!
//! Implements the strangler-fig dispatch order:
//! 1. the movies-service health path always goes to the movies service;
//! 2. movies-prefixed paths are split between monolith and movies service
//!    when gradual migration is enabled, and stay on the monolith otherwise;
//! 3. events-prefixed paths always go to the events service;
//! 4. everything else stays on the monolith.

use crate::config::ProxyConfig;
use crate::policy::SplitPolicy;
use http::Method;
use std::sync::Arc;

/// Path prefix owned by the movies service.
pub const MOVIES_PREFIX: &str = "/api/movies";

/// Movies-service liveness path; always forwarded there, bypassing the split.
pub const MOVIES_HEALTH_PATH: &str = "/api/movies/health";

/// Path prefix owned by the events service (fully migrated).
pub const EVENTS_PREFIX: &str = "/api/events";

/// Destination backend class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// The legacy monolith
    Monolith,
    /// The extracted movies service
    Movies,
    /// The extracted events service
    Events,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monolith => write!(f, "monolith"),
            Self::Movies => write!(f, "movies-service"),
            Self::Events => write!(f, "events-service"),
        }
    }
}

/// The outcome of routing one request. Computed once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    /// Which backend class was chosen
    pub upstream: Upstream,
    /// Base URL of the chosen backend
    pub base_url: String,
    /// The gradual-migration draw, when the split policy was consulted
    pub draw: Option<u8>,
}

/// Router — maps an inbound method/path onto a destination authority
pub struct Router {
    config: Arc<ProxyConfig>,
    policy: Arc<dyn SplitPolicy>,
}

impl Router {
    /// Create a router over the shared configuration and split policy.
    pub fn new(config: Arc<ProxyConfig>, policy: Arc<dyn SplitPolicy>) -> Self {
        Self { config, policy }
    }

    /// Decide the destination for one request.
    ///
    /// Total over all paths: anything not explicitly migrated stays on the
    /// monolith.
    pub fn determine(&self, method: &Method, path: &str) -> RouteDecision {
        if path == MOVIES_HEALTH_PATH {
            return self.decide(Upstream::Movies, None);
        }

        if path.starts_with(MOVIES_PREFIX) {
            if !self.config.gradual_migration {
                return self.decide(Upstream::Monolith, None);
            }

            let draw = self.policy.next_draw();
            let percent = self.config.movies_migration_percent;
            let upstream = if draw < percent {
                Upstream::Movies
            } else {
                Upstream::Monolith
            };
            tracing::info!(
                method = %method,
                path,
                draw,
                percent,
                destination = %upstream,
                "Gradual-migration split"
            );
            return self.decide(upstream, Some(draw));
        }

        if path.starts_with(EVENTS_PREFIX) {
            return self.decide(Upstream::Events, None);
        }

        // Strangler-fig default: unmatched traffic stays on the monolith.
        self.decide(Upstream::Monolith, None)
    }

    fn decide(&self, upstream: Upstream, draw: Option<u8>) -> RouteDecision {
        let base_url = match upstream {
            Upstream::Monolith => &self.config.monolith_url,
            Upstream::Movies => &self.config.movies_service_url,
            Upstream::Events => &self.config.events_service_url,
        };
        RouteDecision {
            upstream,
            base_url: base_url.clone(),
            draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{RandomPolicy, SequencePolicy};

    fn make_router(
        gradual_migration: bool,
        percent: u8,
        policy: Arc<dyn SplitPolicy>,
    ) -> Router {
        let config = ProxyConfig {
            gradual_migration,
            movies_migration_percent: percent,
            ..ProxyConfig::default()
        };
        Router::new(Arc::new(config), policy)
    }

    fn seq(draws: Vec<u8>) -> Arc<dyn SplitPolicy> {
        Arc::new(SequencePolicy::new(draws))
    }

    #[test]
    fn test_movies_stay_on_monolith_when_migration_disabled() {
        let router = make_router(false, 100, seq(vec![0]));
        for path in ["/api/movies", "/api/movies/42", "/api/movies/42/reviews"] {
            let decision = router.determine(&Method::GET, path);
            assert_eq!(decision.upstream, Upstream::Monolith);
            assert!(decision.draw.is_none());
        }
    }

    #[test]
    fn test_percent_zero_always_routes_to_monolith() {
        let draws: Vec<u8> = (0..100).collect();
        let router = make_router(true, 0, seq(draws));
        for _ in 0..100 {
            let decision = router.determine(&Method::GET, "/api/movies/7");
            assert_eq!(decision.upstream, Upstream::Monolith);
        }
    }

    #[test]
    fn test_percent_hundred_always_routes_to_movies() {
        let draws: Vec<u8> = (0..100).collect();
        let router = make_router(true, 100, seq(draws));
        for _ in 0..100 {
            let decision = router.determine(&Method::POST, "/api/movies");
            assert_eq!(decision.upstream, Upstream::Movies);
        }
    }

    #[test]
    fn test_split_boundary_draws() {
        let router = make_router(true, 30, seq(vec![29, 30]));

        let below = router.determine(&Method::GET, "/api/movies/1");
        assert_eq!(below.upstream, Upstream::Movies);
        assert_eq!(below.draw, Some(29));

        let at = router.determine(&Method::GET, "/api/movies/1");
        assert_eq!(at.upstream, Upstream::Monolith);
        assert_eq!(at.draw, Some(30));
    }

    #[test]
    fn test_movies_health_path_bypasses_split() {
        // Percent 0 would otherwise force the monolith
        let router = make_router(true, 0, seq(vec![99]));
        let decision = router.determine(&Method::GET, MOVIES_HEALTH_PATH);
        assert_eq!(decision.upstream, Upstream::Movies);
        assert!(decision.draw.is_none());

        // And with migration disabled entirely
        let router = make_router(false, 0, seq(vec![99]));
        let decision = router.determine(&Method::GET, MOVIES_HEALTH_PATH);
        assert_eq!(decision.upstream, Upstream::Movies);
    }

    #[test]
    fn test_events_prefix_always_routes_to_events_service() {
        let router = make_router(true, 0, seq(vec![0]));
        for path in ["/api/events", "/api/events/movie", "/api/events/health"] {
            let decision = router.determine(&Method::POST, path);
            assert_eq!(decision.upstream, Upstream::Events);
            assert!(decision.draw.is_none());
        }
    }

    #[test]
    fn test_unmatched_paths_fall_back_to_monolith() {
        let router = make_router(true, 100, seq(vec![0]));
        for path in ["/", "/api/users", "/api/moviestars/..", "/anything/else"] {
            let decision = router.determine(&Method::GET, path);
            assert_eq!(decision.upstream, Upstream::Monolith);
            assert!(decision.draw.is_none());
        }
    }

    #[test]
    fn test_decision_carries_configured_base_url() {
        let config = ProxyConfig {
            monolith_url: "http://legacy:1".to_string(),
            movies_service_url: "http://movies:2".to_string(),
            events_service_url: "http://events:3".to_string(),
            gradual_migration: true,
            movies_migration_percent: 100,
            ..ProxyConfig::default()
        };
        let router = Router::new(Arc::new(config), seq(vec![0]));

        assert_eq!(
            router.determine(&Method::GET, "/other").base_url,
            "http://legacy:1"
        );
        assert_eq!(
            router.determine(&Method::GET, "/api/movies/1").base_url,
            "http://movies:2"
        );
        assert_eq!(
            router.determine(&Method::GET, "/api/events/x").base_url,
            "http://events:3"
        );
    }

    #[test]
    fn test_split_fraction_tracks_percent_over_many_trials() {
        let router = make_router(true, 30, Arc::new(RandomPolicy));
        let trials = 10_000;

        let movies = (0..trials)
            .filter(|_| {
                router.determine(&Method::GET, "/api/movies/1").upstream == Upstream::Movies
            })
            .count();

        // ±2 percentage points around 30% — several standard deviations wide
        let fraction = movies as f64 / trials as f64 * 100.0;
        assert!(
            (fraction - 30.0).abs() < 2.0,
            "observed split {:.1}% too far from 30%",
            fraction
        );
    }
}
