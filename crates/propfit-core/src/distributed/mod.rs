//! Configuration and process management for a distributed fit.
//!
//! Nothing here schedules work or talks to the queue itself: the backend and
//! server types describe what the external estimation server should do, and
//! the server/optimizer modules manage those external processes as scoped
//! resources.

pub mod backend;
pub mod optimizer;
pub mod resources;
pub mod server;
