//! Errors returned by the routing entry point.

use tessera_common::InternalError;
use tessera_noc::{GridLocation, LinkId};

/// A problem that prevents a routing model from being built, or a defect
/// detected while reading a solution back.
///
/// Solver outcomes such as infeasibility are not errors; they are reported
/// through the outcome status.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// A flow endpoint references a router cluster with no placement.
    #[error("flow `{flow}` references router cluster `{cluster}`, which is not placed")]
    UnplacedCluster {
        /// Flow name.
        flow: String,
        /// Cluster name.
        cluster: String,
    },

    /// A cluster is placed on a location with no router tile anchor.
    #[error("router cluster `{cluster}` is placed at {location}, where there is no router")]
    NoRouterAtLocation {
        /// Cluster name.
        cluster: String,
        /// The placement location.
        location: GridLocation,
    },

    /// The bandwidth resolution is not in `1..=MAX_BANDWIDTH_RESOLUTION`.
    #[error("bandwidth resolution must be between 1 and {max}, got {0}", max = crate::MAX_BANDWIDTH_RESOLUTION)]
    InvalidResolution(i64),

    /// The topology's link bandwidth is not positive.
    #[error("link bandwidth must be positive, got {0}")]
    NonPositiveLinkBandwidth(f64),

    /// A flow demands a negative or non-finite bandwidth.
    #[error("flow `{flow}` has invalid bandwidth {bandwidth}")]
    InvalidFlowBandwidth {
        /// Flow name.
        flow: String,
        /// The demanded bandwidth.
        bandwidth: f64,
    },

    /// A link is neither horizontal nor vertical, so geometric progress cannot
    /// be expressed.
    #[error("link {0} is neither horizontal nor vertical")]
    UnclassifiableLink(LinkId),

    /// Objective weights do not fit in 64 bits.
    #[error("objective weights overflow; lower the bandwidth resolution")]
    ObjectiveOverflow,

    /// A defect in model construction or solution extraction.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
