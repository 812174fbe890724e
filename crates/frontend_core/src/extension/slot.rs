//! Typed slot handles.

use std::any::type_name;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Typed reference to one declared extension slot.
///
/// `T` is the capability interface, normally a trait object such as
/// `dyn ThreadsResolver`. Handles are only minted by
/// [`ExtensionRegistryBuilder::declare_slot`](super::ExtensionRegistryBuilder::declare_slot).
pub struct SlotHandle<T: ?Sized> {
    name: &'static str,
    registry_id: u64,
    _capability: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> SlotHandle<T> {
    pub(crate) fn new(name: &'static str, registry_id: u64) -> Self {
        Self {
            name,
            registry_id,
            _capability: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type name of the capability interface.
    pub fn capability(&self) -> &'static str {
        type_name::<T>()
    }

    pub(crate) fn registry_id(&self) -> u64 {
        self.registry_id
    }
}

impl<T: ?Sized> Clone for SlotHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for SlotHandle<T> {}

impl<T: ?Sized> Debug for SlotHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotHandle")
            .field("name", &self.name)
            .field("capability", &self.capability())
            .finish()
    }
}

/// Introspection row for one slot of a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    pub name: &'static str,
    pub capability: &'static str,
    /// Provider that filled the slot, `None` while absent.
    pub provider: Option<&'static str>,
}

impl SlotStatus {
    pub fn is_filled(&self) -> bool {
        self.provider.is_some()
    }
}
