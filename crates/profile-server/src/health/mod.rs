//! Process-wide health status used for load-balancer liveness probing.
//!
//! # Lifecycle
//!
//! 1. `main` constructs one [`HealthEscalator`] at `Healthy` and hands clones
//!    to every component that can observe a failure.
//! 2. Failure sites call [`HealthEscalator::raise`]. Escalation is monotonic: a
//!    problem, once observed, is not hidden by a later successful request.
//! 3. Only an operator resets the status, via the admin endpoint.
//! 4. `GET /api/health` reports [`HealthStatus::is_available`] as 200 or 503.

pub mod escalator;
pub mod status;

pub use escalator::HealthEscalator;
pub use status::HealthStatus;
