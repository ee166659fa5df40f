//! GPU and model bootstrap service.
//!
//! Detail and AI HDR enhancement need a separate system service to set up
//! GPU contexts and models before they run. The dispatcher only brackets
//! façade lifetimes with [`AlgorithmService::connect`] and
//! [`AlgorithmService::disconnect`]; return values are not interpreted.

/// Client of the bootstrap service.
pub trait AlgorithmService: Send + Sync {
    /// Announce a new façade.
    fn connect(&self);

    /// Announce that a façade went away.
    fn disconnect(&self);
}

/// Service client that does nothing. Used when no service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlgorithmService;

impl AlgorithmService for NoopAlgorithmService {
    fn connect(&self) {
        tracing::trace!("algorithm service connect (noop)");
    }

    fn disconnect(&self) {
        tracing::trace!("algorithm service disconnect (noop)");
    }
}
