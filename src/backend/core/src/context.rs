//! Running callables inside an optional ambient application scope.

use std::sync::Arc;
use tracing::trace;

/// Something that can be entered for the duration of a call.
///
/// The scope stays open while the returned guard is alive and closes when the
/// guard is dropped.
pub trait AppContext: Send + Sync {
    type Guard;

    fn enter(&self) -> Self::Guard;
}

/// Wrap `func` so every call runs inside a scope entered from `context`.
///
/// With no context the call goes straight through. The scope is released when
/// the call returns, including when it returns an error or unwinds.
pub fn with_app_context<C, F, A, R>(context: Option<Arc<C>>, func: F) -> impl Fn(A) -> R
where
    C: AppContext + ?Sized,
    F: Fn(A) -> R,
{
    move |args| match context.as_deref() {
        None => func(args),
        Some(context) => {
            trace!("Entering application context");
            let _guard = context.enter();
            func(args)
        }
    }
}
