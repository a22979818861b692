//! Execution context the listener runs in
//!
//! Some hosts require a thread to be registered with their runtime before it
//! may call into host code. The dispatcher attaches its worker thread around
//! each delivery through [`ContextAttachment`], which detaches on drop, so
//! early returns and listener errors cannot leave the thread attached.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to attach to execution context: {0}")]
pub struct ContextError(pub String);

/// Host execution context hook
pub trait ExecutionContext: Send + Sync {
    /// Whether the current thread is already attached
    fn is_attached(&self) -> bool;

    fn attach(&self) -> Result<(), ContextError>;

    fn detach(&self);

    fn name(&self) -> &'static str {
        "ExecutionContext"
    }
}

/// Context that owns the dispatcher thread outright; it is always attached
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnedThreadContext;

impl ExecutionContext for OwnedThreadContext {
    fn is_attached(&self) -> bool {
        true
    }

    fn attach(&self) -> Result<(), ContextError> {
        Ok(())
    }

    fn detach(&self) {}

    fn name(&self) -> &'static str {
        "OwnedThreadContext"
    }
}

/// Guard pairing an attach with its detach
///
/// Only detaches if this guard performed the attach; a thread that was
/// already attached stays attached.
pub struct ContextAttachment {
    context: Arc<dyn ExecutionContext>,
    attached_here: bool,
}

impl ContextAttachment {
    pub fn enter(context: Arc<dyn ExecutionContext>) -> Result<Self, ContextError> {
        if context.is_attached() {
            return Ok(Self {
                context,
                attached_here: false,
            });
        }
        context.attach()?;
        Ok(Self {
            context,
            attached_here: true,
        })
    }

    pub fn attached_here(&self) -> bool {
        self.attached_here
    }
}

impl Drop for ContextAttachment {
    fn drop(&mut self) {
        if self.attached_here {
            self.context.detach();
        }
    }
}

impl fmt::Debug for ContextAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAttachment")
            .field("context", &self.context.name())
            .field("attached_here", &self.attached_here)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Context that counts attach/detach calls and can be told to refuse attaching
    #[derive(Default)]
    pub(crate) struct CountingContext {
        pub attached: AtomicBool,
        pub attaches: AtomicUsize,
        pub detaches: AtomicUsize,
        pub refuse: AtomicBool,
    }

    impl ExecutionContext for CountingContext {
        fn is_attached(&self) -> bool {
            self.attached.load(Ordering::SeqCst)
        }

        fn attach(&self) -> Result<(), ContextError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(ContextError("refused".into()));
            }
            self.attaches.fetch_add(1, Ordering::SeqCst);
            self.attached.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn detach(&self) {
            self.detaches.fetch_add(1, Ordering::SeqCst);
            self.attached.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_pairs_attach_and_detach() {
        let ctx = Arc::new(CountingContext::default());
        {
            let guard = ContextAttachment::enter(ctx.clone()).unwrap();
            assert!(guard.attached_here());
            assert!(ctx.is_attached());
        }
        assert!(!ctx.is_attached());
        assert_eq!(ctx.attaches.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.detaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_leaves_existing_attachment_alone() {
        let ctx = Arc::new(CountingContext::default());
        ctx.attached.store(true, Ordering::SeqCst);
        drop(ContextAttachment::enter(ctx.clone()).unwrap());
        assert!(ctx.is_attached());
        assert_eq!(ctx.detaches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_attach_does_not_detach() {
        let ctx = Arc::new(CountingContext::default());
        ctx.refuse.store(true, Ordering::SeqCst);
        assert!(ContextAttachment::enter(ctx.clone()).is_err());
        assert_eq!(ctx.detaches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_owned_thread_context_is_always_attached() {
        let guard = ContextAttachment::enter(Arc::new(OwnedThreadContext)).unwrap();
        assert!(!guard.attached_here());
    }
}
