//! Write-phase builder and read-phase registry.
//!
//! # Invariants
//! - Slot names are unique per registry.
//! - A slot holds at most one implementation; a second `register` panics.
//! - Reads are only possible on the frozen [`ExtensionRegistry`], so every
//!   write precedes every read.

use super::slot::{SlotHandle, SlotStatus};
use log::{error, info};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const UNATTRIBUTED_PROVIDER: &str = "unattributed";

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

struct SlotEntry {
    capability: &'static str,
    provider: Option<&'static str>,
    // Always an `Arc<T>` where `T` matches `capability`.
    value: Option<Box<dyn Any + Send + Sync>>,
}

impl SlotEntry {
    fn status(&self, name: &'static str) -> SlotStatus {
        SlotStatus {
            name,
            capability: self.capability,
            provider: self.provider,
        }
    }
}

/// Registration failures. [`ExtensionRegistryBuilder::register`] panics with
/// these; [`ExtensionRegistryBuilder::try_register`] returns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownSlot(&'static str),
    SlotAlreadyFilled {
        slot: &'static str,
        existing: &'static str,
        attempted: &'static str,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSlot(slot) => {
                write!(f, "extension slot `{slot}` was not declared by this registry")
            }
            Self::SlotAlreadyFilled {
                slot,
                existing,
                attempted,
            } => write!(
                f,
                "extension slot `{slot}` already filled by provider `{existing}`; \
                 second registration from `{attempted}`"
            ),
        }
    }
}

impl Error for RegistryError {}

/// Provider failed to build or install its implementations.
#[derive(Debug)]
pub struct ProviderError {
    provider: &'static str,
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        provider: &'static str,
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            provider,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "provider `{}`: {}: {source}", self.provider, self.message),
            None => write!(f, "provider `{}`: {}", self.provider, self.message),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Startup contract for add-on modules.
///
/// `S` is the slot table the core hands to providers. Providers must not
/// depend on the order in which other providers are installed.
pub trait ExtensionProvider<S> {
    /// Stable provider name recorded against the slots it fills.
    fn name(&self) -> &'static str;

    /// Registers exactly one implementation per supplied slot.
    fn install(
        &self,
        registry: &mut ExtensionRegistryBuilder,
        slots: &S,
    ) -> Result<(), ProviderError>;
}

/// Registry in its write phase.
pub struct ExtensionRegistryBuilder {
    id: u64,
    slots: BTreeMap<&'static str, SlotEntry>,
    installing: Option<&'static str>,
}

impl Default for ExtensionRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistryBuilder {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            slots: BTreeMap::new(),
            installing: None,
        }
    }

    /// Declares an empty slot for capability `T`.
    ///
    /// # Panics
    /// When `name` is already declared.
    pub fn declare_slot<T>(&mut self, name: &'static str) -> SlotHandle<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.slots.contains_key(name) {
            panic!("extension slot `{name}` declared twice");
        }
        self.slots.insert(
            name,
            SlotEntry {
                capability: type_name::<T>(),
                provider: None,
                value: None,
            },
        );
        SlotHandle::new(name, self.id)
    }

    /// Fills `handle`'s slot.
    ///
    /// # Panics
    /// When the slot is already filled or `handle` belongs to another registry.
    /// Both mean two modules were linked for one slot or the wiring is wrong;
    /// neither is recoverable at runtime.
    pub fn register<T>(&mut self, handle: &SlotHandle<T>, implementation: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if let Err(err) = self.try_register(handle, implementation) {
            error!(
                "event=slot_register module=extension status=fatal slot={} error={}",
                handle.name(),
                err
            );
            panic!("{err}");
        }
    }

    /// Non-panicking variant of [`register`](Self::register).
    pub fn try_register<T>(
        &mut self,
        handle: &SlotHandle<T>,
        implementation: Arc<T>,
    ) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let attempted = self.installing.unwrap_or(UNATTRIBUTED_PROVIDER);
        let entry = match self.slots.get_mut(handle.name()) {
            Some(entry) if handle.registry_id() == self.id => entry,
            _ => return Err(RegistryError::UnknownSlot(handle.name())),
        };
        if let Some(existing) = entry.provider {
            return Err(RegistryError::SlotAlreadyFilled {
                slot: handle.name(),
                existing,
                attempted,
            });
        }

        entry.value = Some(Box::new(implementation));
        entry.provider = Some(attempted);
        info!(
            "event=slot_register module=extension status=ok slot={} provider={}",
            handle.name(),
            attempted
        );
        Ok(())
    }

    /// Runs one provider's install step, attributing its registrations.
    pub fn install<S, P>(&mut self, provider: &P, slots: &S) -> Result<(), ProviderError>
    where
        P: ExtensionProvider<S> + ?Sized,
    {
        let started_at = Instant::now();
        self.installing = Some(provider.name());
        let result = provider.install(self, slots);
        self.installing = None;

        match &result {
            Ok(()) => info!(
                "event=provider_install module=extension status=ok provider={} duration_ms={}",
                provider.name(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=provider_install module=extension status=error provider={} duration_ms={} error={}",
                provider.name(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Slot table in name order.
    pub fn slots(&self) -> Vec<SlotStatus> {
        self.slots
            .iter()
            .map(|(name, entry)| entry.status(*name))
            .collect()
    }

    /// Ends the write phase.
    pub fn freeze(self) -> ExtensionRegistry {
        let filled = self
            .slots
            .values()
            .filter(|entry| entry.provider.is_some())
            .count();
        info!(
            "event=registry_freeze module=extension status=ok slots={} filled={}",
            self.slots.len(),
            filled
        );
        ExtensionRegistry {
            id: self.id,
            slots: self.slots,
        }
    }
}

impl Debug for ExtensionRegistryBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistryBuilder")
            .field("slots", &self.slots())
            .finish()
    }
}

/// Registry in its read-only phase. Share it with `Arc`.
pub struct ExtensionRegistry {
    id: u64,
    slots: BTreeMap<&'static str, SlotEntry>,
}

impl ExtensionRegistry {
    /// Current implementation for `handle`, or `None` when no provider filled it.
    ///
    /// # Panics
    /// When `handle` was minted by a different registry.
    pub fn get<T>(&self, handle: &SlotHandle<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = match self.slots.get(handle.name()) {
            Some(entry) if handle.registry_id() == self.id => entry,
            _ => panic!("{}", RegistryError::UnknownSlot(handle.name())),
        };
        let value = entry.value.as_ref()?;
        match value.downcast_ref::<Arc<T>>() {
            Some(implementation) => Some(Arc::clone(implementation)),
            None => panic!(
                "extension slot `{}` holds `{}`, not `{}`",
                handle.name(),
                entry.capability,
                type_name::<T>()
            ),
        }
    }

    pub fn is_filled(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .is_some_and(|entry| entry.provider.is_some())
    }

    /// Slot table in name order.
    pub fn slots(&self) -> Vec<SlotStatus> {
        self.slots
            .iter()
            .map(|(name, entry)| entry.status(*name))
            .collect()
    }
}

impl Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("slots", &self.slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ExtensionProvider, ExtensionRegistryBuilder, ProviderError, RegistryError,
        UNATTRIBUTED_PROVIDER,
    };
    use crate::extension::SlotHandle;
    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    trait Counter: Send + Sync {
        fn count(&self) -> usize;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct Fixed(usize);

    impl Counter for Fixed {
        fn count(&self) -> usize {
            self.0
        }
    }

    struct Slots {
        greeter: SlotHandle<dyn Greeter>,
        counter: SlotHandle<dyn Counter>,
    }

    fn declare() -> (ExtensionRegistryBuilder, Slots) {
        let mut builder = ExtensionRegistryBuilder::new();
        let slots = Slots {
            greeter: builder.declare_slot::<dyn Greeter>("Greeter"),
            counter: builder.declare_slot::<dyn Counter>("Counter"),
        };
        (builder, slots)
    }

    struct GreeterProvider;

    impl ExtensionProvider<Slots> for GreeterProvider {
        fn name(&self) -> &'static str {
            "greeter"
        }

        fn install(
            &self,
            registry: &mut ExtensionRegistryBuilder,
            slots: &Slots,
        ) -> Result<(), ProviderError> {
            registry.register(&slots.greeter, Arc::new(English));
            Ok(())
        }
    }

    struct CounterProvider;

    impl ExtensionProvider<Slots> for CounterProvider {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn install(
            &self,
            registry: &mut ExtensionRegistryBuilder,
            slots: &Slots,
        ) -> Result<(), ProviderError> {
            registry.register(&slots.counter, Arc::new(Fixed(3)));
            Ok(())
        }
    }

    #[test]
    fn unfilled_slot_reads_as_absent() {
        let (builder, slots) = declare();
        let registry = builder.freeze();
        assert!(registry.get(&slots.greeter).is_none());
        assert!(!registry.is_filled("Greeter"));
    }

    #[test]
    fn registered_implementation_is_returned() {
        let (mut builder, slots) = declare();
        builder.register(&slots.greeter, Arc::new(English));
        let registry = builder.freeze();

        let greeter = registry.get(&slots.greeter).expect("greeter registered");
        assert_eq!(greeter.greet(), "hello");
        assert!(registry.get(&slots.counter).is_none());
    }

    #[test]
    fn try_register_reports_second_writer() {
        let (mut builder, slots) = declare();
        builder
            .try_register(&slots.greeter, Arc::new(English))
            .expect("first registration");
        let err = builder
            .try_register(&slots.greeter, Arc::new(English))
            .expect_err("second registration must fail");
        assert_eq!(
            err,
            RegistryError::SlotAlreadyFilled {
                slot: "Greeter",
                existing: UNATTRIBUTED_PROVIDER,
                attempted: UNATTRIBUTED_PROVIDER,
            }
        );
    }

    #[test]
    #[should_panic(expected = "already filled")]
    fn register_panics_on_identical_second_registration() {
        let (mut builder, slots) = declare();
        let shared: Arc<dyn Greeter> = Arc::new(English);
        builder.register(&slots.greeter, Arc::clone(&shared));
        builder.register(&slots.greeter, shared);
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn declaring_same_name_twice_panics() {
        let mut builder = ExtensionRegistryBuilder::new();
        let _ = builder.declare_slot::<dyn Greeter>("Greeter");
        let _ = builder.declare_slot::<dyn Counter>("Greeter");
    }

    #[test]
    fn handle_from_another_registry_is_rejected() {
        let (_, foreign) = declare();
        let (mut builder, _) = declare();
        let err = builder
            .try_register(&foreign.greeter, Arc::new(English))
            .expect_err("foreign handle must fail");
        assert_eq!(err, RegistryError::UnknownSlot("Greeter"));
    }

    #[test]
    #[should_panic(expected = "was not declared by this registry")]
    fn get_panics_on_handle_from_another_registry() {
        let (_, foreign) = declare();
        let (mut builder, slots) = declare();
        builder.register(&slots.greeter, Arc::new(English));
        let registry = builder.freeze();
        let _ = registry.get(&foreign.greeter);
    }

    #[test]
    fn provider_order_does_not_change_final_state() {
        let (mut forward, forward_slots) = declare();
        forward
            .install(&GreeterProvider, &forward_slots)
            .expect("greeter");
        forward
            .install(&CounterProvider, &forward_slots)
            .expect("counter");

        let (mut reverse, reverse_slots) = declare();
        reverse
            .install(&CounterProvider, &reverse_slots)
            .expect("counter");
        reverse
            .install(&GreeterProvider, &reverse_slots)
            .expect("greeter");

        let forward = forward.freeze();
        let reverse = reverse.freeze();
        assert_eq!(forward.slots(), reverse.slots());
        assert_eq!(
            forward.get(&forward_slots.counter).map(|c| c.count()),
            reverse.get(&reverse_slots.counter).map(|c| c.count())
        );
    }

    #[test]
    fn install_attributes_registrations_to_provider() {
        let (mut builder, slots) = declare();
        builder.install(&GreeterProvider, &slots).expect("install");
        let status = builder
            .slots()
            .into_iter()
            .find(|slot| slot.name == "Greeter")
            .expect("slot listed");
        assert_eq!(status.provider, Some("greeter"));
        assert!(status.capability.contains("Greeter"));
    }

    #[test]
    fn frozen_registry_is_shareable_across_threads() {
        let (mut builder, slots) = declare();
        builder.register(&slots.counter, Arc::new(Fixed(5)));
        let registry = Arc::new(builder.freeze());
        let handle = slots.counter;

        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.get(&handle).map(|c| c.count()))
        };
        assert_eq!(reader.join().expect("reader thread"), Some(5));
    }
}
