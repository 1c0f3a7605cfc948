//! [`HealthStatus`]: the ordered severity scale.

use std::fmt;

/// Severity of the worst problem observed since the last reset.
///
/// Variants are declared in increasing severity, so the derived [`Ord`] is the
/// escalation order: `Healthy < Degraded < Critical < Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HealthStatus {
    #[default]
    Healthy,
    /// Some dependency is failing but the core contract still holds.
    Degraded,
    /// Ciphers or token signing are broken.
    Critical,
    /// The process is going away.
    Down,
}

impl HealthStatus {
    /// Whether a load balancer should keep routing traffic here.
    pub fn is_available(self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// HTTP status code a liveness probe should see.
    pub fn http_status(self) -> u16 {
        if self.is_available() {
            200
        } else {
            503
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
            HealthStatus::Down => "down",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(HealthStatus::Healthy < HealthStatus::Degraded);
        assert!(HealthStatus::Degraded < HealthStatus::Critical);
        assert!(HealthStatus::Critical < HealthStatus::Down);
        assert_eq!(HealthStatus::default(), HealthStatus::Healthy);
    }

    #[test]
    fn availability_mapping() {
        assert!(HealthStatus::Healthy.is_available());
        assert!(HealthStatus::Degraded.is_available());
        assert!(!HealthStatus::Critical.is_available());
        assert!(!HealthStatus::Down.is_available());

        assert_eq!(HealthStatus::Healthy.http_status(), 200);
        assert_eq!(HealthStatus::Degraded.http_status(), 200);
        assert_eq!(HealthStatus::Critical.http_status(), 503);
        assert_eq!(HealthStatus::Down.http_status(), 503);
    }

    #[test]
    fn display_is_lowercase_name() {
        assert_eq!(HealthStatus::Critical.to_string(), "critical");
        assert_eq!(HealthStatus::Down.as_str(), "down");
    }
}
