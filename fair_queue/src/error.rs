use crate::ClassId;

/// Errors raised by the priority-class lifecycle operations on
/// [`crate::FairQueue`].
///
/// Capacity exhaustion is deliberately absent here: a request that cannot be
/// granted capacity is not an error, it is a pending reservation that
/// `dispatch_requests` resolves on a later call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FairQueueError {
    #[error("priority class {0} is already registered")]
    ClassAlreadyRegistered(ClassId),

    #[error("priority class {0} is not registered")]
    ClassNotRegistered(ClassId),

    #[error("priority class {0} cannot be unregistered while its queue is non-empty")]
    ClassNotEmpty(ClassId),
}
