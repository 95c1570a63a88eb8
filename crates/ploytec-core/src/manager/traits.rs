//! Extension-manager trait and callback shapes.

use std::fmt;

/// Extension-manager error code: the extension bundle was not found.
pub const ERROR_EXTENSION_NOT_FOUND: i32 = 4;

/// Extension-manager error code: the code signature was rejected.
pub const ERROR_CODE_SIGNATURE_INVALID: i32 = 8;

/// Outcome reported by a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResult {
    Completed,
    WillCompleteAfterReboot,
}

/// Asynchronous callback from the extension manager.
///
/// Delivered from the manager's own scheduling context; the session
/// controller funnels these through its serialized queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerCallback {
    /// The request is pending the user's approval.
    NeedsApproval,
    /// The request finished.
    Finished { result: RequestResult },
    /// The request failed with an OS error code (see the constants above).
    Failed { code: i32 },
    /// Properties query result: whether the extension is currently enabled.
    FoundProperties { enabled: bool },
}

impl fmt::Display for ManagerCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerCallback::NeedsApproval => write!(f, "needs_approval"),
            ManagerCallback::Finished { result } => write!(f, "finished({result:?})"),
            ManagerCallback::Failed { code } => write!(f, "failed(code={code})"),
            ManagerCallback::FoundProperties { enabled } => {
                write!(f, "found_properties(enabled={enabled})")
            }
        }
    }
}

/// Abstract interface to the extension-manager service.
///
/// All requests are fire-and-forget: results arrive later as
/// [`ManagerCallback`]s on the session controller's queue. Implementations:
/// platform glue over the real service, or [`super::MockExtensionManager`]
/// for tests.
pub trait ExtensionManager: Send + Sync {
    /// Submit an activation request for the extension with this identifier.
    fn activate(&self, identifier: &str);

    /// Submit a deactivation request.
    fn deactivate(&self, identifier: &str);

    /// Query whether the extension is currently enabled; answered by a
    /// `FoundProperties` callback.
    fn query_properties(&self, identifier: &str);
}
