//! Extension-manager boundary.
//!
//! The OS service that installs and removes the driver extension is opaque:
//! requests go out, results come back later as delegate callbacks from the
//! service's own scheduling context. This module defines the request trait,
//! the callback shapes, and a mock for tests.

pub mod mock;
pub mod traits;

pub use mock::{ManagerRequest, MockExtensionManager};
pub use traits::{
    ERROR_CODE_SIGNATURE_INVALID, ERROR_EXTENSION_NOT_FOUND, ExtensionManager, ManagerCallback,
    RequestResult,
};
