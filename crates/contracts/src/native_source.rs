//! Native collaborator traits
//!
//! The native SDK is consumed, never implemented, by the core crates.
//! These traits describe the three capabilities the core relies on:
//! event registration, frame generation and coordinate conversion.

use std::sync::Arc;

use crate::{ContractError, Point3D};

/// Native callback type
///
/// The native layer invokes this trampoline for every event of kind `E`.
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type NativeCallback<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Opaque native registration token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(pub u64);

/// Native event source
///
/// Abstracts a single native notification source (e.g. the hand callbacks of
/// a hands generator). Implementations must accept any number of
/// registrations; the core guarantees it registers at most one at a time.
///
/// # Example
///
/// ```ignore
/// let handle = source.register_native(Arc::new(|event| {
///     println!("native event: {:?}", event);
/// }))?;
/// // ... events flow ...
/// source.unregister_native(handle)?;
/// ```
pub trait NativeEventSource<E>: Send + Sync {
    /// Register the trampoline, returning the token used to unregister it
    fn register_native(&self, callback: NativeCallback<E>) -> Result<CallbackHandle, ContractError>;

    /// Unregister a previously registered trampoline
    fn unregister_native(&self, handle: CallbackHandle) -> Result<(), ContractError>;
}

/// Native frame generation
///
/// Fills a caller-provided buffer synchronously. Timing is owned by the
/// thread calling `fill`.
pub trait FrameSource<B>: Send + Sync {
    fn fill(&self, buffer: &mut B) -> Result<(), ContractError>;
}

/// Projective <-> real-world conversion
///
/// Pure: implementations must not have side effects observable by the core.
pub trait CoordinateConverter: Send + Sync {
    fn real_world_to_projective(&self, point: &Point3D) -> Point3D;

    fn projective_to_real_world(&self, point: &Point3D) -> Point3D;
}

impl<C: CoordinateConverter + ?Sized> CoordinateConverter for Arc<C> {
    fn real_world_to_projective(&self, point: &Point3D) -> Point3D {
        (**self).real_world_to_projective(point)
    }

    fn projective_to_real_world(&self, point: &Point3D) -> Point3D {
        (**self).projective_to_real_world(point)
    }
}
