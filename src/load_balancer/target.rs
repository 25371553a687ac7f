//! Upstream target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its URL
//! - Hold the liveness flag shared by the health checker and the dispatcher
//!
//! # Design Decisions
//! - Liveness sits behind a reader/writer lock; critical sections only touch one bool
//! - Targets start alive so traffic flows before the first health tick

use std::fmt;
use std::sync::{PoisonError, RwLock};
use url::{Position, Url};

/// A single upstream server the balancer can forward to.
#[derive(Debug)]
pub struct UpstreamTarget {
    url: Url,
    alive: RwLock<bool>,
}

impl UpstreamTarget {
    /// Create a new target, initially considered alive.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            alive: RwLock::new(true),
        }
    }

    /// The immutable base URL of this target.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `host:port` of the target, with the scheme's default port filled in.
    ///
    /// Returns `None` when the URL has no host or no known port.
    pub fn address(&self) -> Option<String> {
        let host = self.url.host_str()?;
        let port = self.url.port_or_known_default()?;
        Some(format!("{}:{}", host, port))
    }

    /// `host[:port]` exactly as written in the URL, used as the forwarding authority.
    pub fn authority(&self) -> &str {
        &self.url[Position::BeforeHost..Position::AfterPort]
    }

    /// Current liveness, read under the shared lock.
    pub fn is_alive(&self) -> bool {
        *self.alive.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite liveness under the exclusive lock.
    ///
    /// Returns the previous value so callers can log transitions.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut guard = self.alive.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, alive)
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
