//! # propfit Core Library
//!
//! The operational core of a force-field parameter-fitting pipeline. The
//! heavy numerical work (objective-function evaluation, physical-property
//! estimation, cluster job scheduling) lives in external programs. This
//! library owns everything around them:
//!
//! - **[`restart`]** - Run-directory hygiene: removing stale artifacts of a
//!   previous fit, detecting which iterations of an interrupted fit can be
//!   kept, and renaming log files aside instead of overwriting them.
//! - **[`forcefield`]** - An order-preserving object model for SMIRNOFF
//!   `.offxml` documents and the preprocessing passes applied before a fit
//!   (stale-parameter removal, water-model replacement, tagging parameters
//!   as optimizable).
//! - **[`options`]** - Construction of the estimation options file consumed
//!   by the optimizer's property-estimation integration.
//! - **[`distributed`]** - Worker-resource and queue-backend configuration,
//!   scoped management of the external estimation-server process, and the
//!   blocking optimizer invocation.

pub mod distributed;
pub mod forcefield;
pub mod options;
pub mod restart;
