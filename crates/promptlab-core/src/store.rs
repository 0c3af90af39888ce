//! The playground state store.
//!
//! The canonical snapshot lives inside a `tokio::sync::watch` channel. Every
//! mutation runs through `send_if_modified`, which takes the channel's write
//! lock, so mutations are atomic and serialized even when the store is shared
//! across threads. Invalid requests (unknown id, out-of-range index, wrong
//! template kind) never raise; they leave the state untouched and are reported
//! to the optional ignored-operation hook.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::catalog::{DefaultTemplates, TemplateCatalog};
use crate::config::PlaygroundConfig;
use crate::error::{PlaygroundError, Result};
use crate::ids::InstanceIdAllocator;
use crate::models::{
    ChatMessage, InitialProps, InputMode, OperationType, PlaygroundAction, PlaygroundInstance,
    PlaygroundState, PlaygroundTemplate,
};

/// Role of the message appended by [`PlaygroundStore::add_message`].
pub const NEW_MESSAGE_ROLE: &str = "user";
/// Content of the message appended by [`PlaygroundStore::add_message`].
pub const NEW_MESSAGE_CONTENT: &str = "{question}";

type Listener = Arc<dyn Fn(&PlaygroundState) + Send + Sync>;
type IgnoredHook = Arc<dyn Fn(&IgnoredOperation) + Send + Sync>;

/// Handle returned by [`PlaygroundStore::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Why a mutation left the state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IgnoredOperation {
    #[error("add_instance: there is no instance to clone")]
    NoInstances,

    #[error("add_instance: already at the limit of {limit} instances")]
    InstanceLimitReached { limit: usize },

    #[error("delete_instance: no instance with id {id}")]
    InstanceNotFound { id: u64 },

    #[error("delete_instance: instance {id} is the last one")]
    LastInstance { id: u64 },

    #[error("add_message: index {index} out of range for {len} instances")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("add_message: instance {index} does not have a chat template")]
    NotChatTemplate { index: usize },
}

/// Builder for [`PlaygroundStore`].
pub struct PlaygroundStoreBuilder {
    config: PlaygroundConfig,
    ids: InstanceIdAllocator,
    catalog: Arc<dyn TemplateCatalog>,
    initial: InitialProps,
}

impl PlaygroundStoreBuilder {
    pub fn config(mut self, config: PlaygroundConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a dedicated id allocator instead of the process-wide one.
    pub fn ids(mut self, ids: InstanceIdAllocator) -> Self {
        self.ids = ids;
        self
    }

    pub fn catalog(mut self, catalog: impl TemplateCatalog + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn initial_props(mut self, initial: InitialProps) -> Self {
        self.initial = initial;
        self
    }

    /// Validate the initial props and create the store.
    pub fn build(mut self) -> Result<PlaygroundStore> {
        let operation_type = self.initial.operation_type.unwrap_or_default();
        let input_mode = self.initial.input_mode.unwrap_or_default();

        let instances = match self.initial.instances.take() {
            Some(instances) => {
                validate_instances(&instances, operation_type)?;
                if let Some(max_id) = instances.iter().map(|instance| instance.id).max() {
                    self.ids.reserve_through(max_id);
                }
                instances
            }
            None => vec![self.fresh_instance(operation_type)],
        };

        Ok(self.finish(PlaygroundState {
            operation_type,
            input_mode,
            instances,
        }))
    }

    fn fresh_instance(&self, operation_type: OperationType) -> PlaygroundInstance {
        PlaygroundInstance::new(
            self.ids.next_id(),
            self.catalog.default_template(operation_type),
        )
    }

    fn finish(self, state: PlaygroundState) -> PlaygroundStore {
        info!(
            operation_type = %state.operation_type,
            input_mode = %state.input_mode,
            instances = state.instances.len(),
            "PlaygroundStore initialized"
        );

        let (sender, _) = watch::channel(state);
        PlaygroundStore {
            state: sender,
            ids: self.ids,
            catalog: self.catalog,
            config: self.config,
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            ignored_hook: Mutex::new(None),
        }
    }
}

fn validate_instances(instances: &[PlaygroundInstance], operation_type: OperationType) -> Result<()> {
    if instances.is_empty() {
        return Err(PlaygroundError::EmptyInstances);
    }
    let mut seen = HashSet::with_capacity(instances.len());
    for instance in instances {
        if !seen.insert(instance.id) {
            return Err(PlaygroundError::DuplicateInstanceId(instance.id));
        }
        let found = instance.template.operation_type();
        if found != operation_type {
            return Err(PlaygroundError::TemplateMismatch {
                id: instance.id,
                expected: operation_type,
                found,
            });
        }
    }
    Ok(())
}

/// Observable store holding the playground configuration.
pub struct PlaygroundStore {
    state: watch::Sender<PlaygroundState>,
    ids: InstanceIdAllocator,
    catalog: Arc<dyn TemplateCatalog>,
    config: PlaygroundConfig,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    ignored_hook: Mutex<Option<IgnoredHook>>,
}

impl PlaygroundStore {
    /// A store with the default chat instance, default policy and the
    /// process-wide id allocator.
    pub fn new() -> Self {
        let builder = Self::builder();
        let operation_type = OperationType::default();
        let state = PlaygroundState {
            operation_type,
            input_mode: InputMode::default(),
            instances: vec![builder.fresh_instance(operation_type)],
        };
        builder.finish(state)
    }

    pub fn builder() -> PlaygroundStoreBuilder {
        PlaygroundStoreBuilder {
            config: PlaygroundConfig::default(),
            ids: InstanceIdAllocator::global(),
            catalog: Arc::new(DefaultTemplates),
            initial: InitialProps::default(),
        }
    }

    /// Shorthand for `builder().initial_props(initial).build()`.
    pub fn with_initial_props(initial: InitialProps) -> Result<Self> {
        Self::builder().initial_props(initial).build()
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    // ─── Read interface ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> PlaygroundState {
        self.state.borrow().clone()
    }

    pub fn operation_type(&self) -> OperationType {
        self.state.borrow().operation_type
    }

    pub fn input_mode(&self) -> InputMode {
        self.state.borrow().input_mode
    }

    pub fn instance_ids(&self) -> Vec<u64> {
        self.state.borrow().instances.iter().map(|i| i.id).collect()
    }

    /// A receiver that always sees the latest snapshot and is woken on change.
    pub fn subscribe(&self) -> watch::Receiver<PlaygroundState> {
        self.state.subscribe()
    }

    /// Register a callback run synchronously after every state change.
    pub fn on_change(
        &self,
        listener: impl Fn(&PlaygroundState) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Install a hook told about every request the store ignored.
    pub fn on_ignored(&self, hook: impl Fn(&IgnoredOperation) + Send + Sync + 'static) {
        *lock(&self.ignored_hook) = Some(Arc::new(hook));
    }

    // ─── Mutations ───────────────────────────────────────────────────────────
    //
    // Each returns whether the state changed.

    /// Replace all instances with one fresh instance using the default
    /// template for `operation_type`.
    pub fn set_operation_type(&self, operation_type: OperationType) -> bool {
        let template = self.catalog.default_template(operation_type);
        self.mutate("set_operation_type", |state| {
            state.instances = vec![PlaygroundInstance::new(self.ids.next_id(), template)];
            state.operation_type = operation_type;
            Ok(true)
        })
    }

    pub fn set_input_mode(&self, input_mode: InputMode) -> bool {
        self.mutate("set_input_mode", |state| {
            if state.input_mode == input_mode {
                return Ok(false);
            }
            state.input_mode = input_mode;
            Ok(true)
        })
    }

    /// Append a deep copy of the first instance under a new id.
    pub fn add_instance(&self) -> bool {
        let limit = self.config.max_instances;
        self.mutate("add_instance", |state| {
            let Some(first) = state.instances.first() else {
                return Err(IgnoredOperation::NoInstances);
            };
            if state.instances.len() >= limit {
                return Err(IgnoredOperation::InstanceLimitReached { limit });
            }
            let mut instance = first.clone();
            instance.id = self.ids.next_id();
            state.instances.push(instance);
            Ok(true)
        })
    }

    pub fn delete_instance(&self, instance_id: u64) -> bool {
        let keep_last = self.config.keep_last_instance;
        self.mutate("delete_instance", |state| {
            let Some(position) = state.instances.iter().position(|i| i.id == instance_id) else {
                return Err(IgnoredOperation::InstanceNotFound { id: instance_id });
            };
            if keep_last && state.instances.len() == 1 {
                return Err(IgnoredOperation::LastInstance { id: instance_id });
            }
            state.instances.remove(position);
            Ok(true)
        })
    }

    /// Append a `{question}` user message to the chat instance at `index`.
    pub fn add_message(&self, index: usize) -> bool {
        self.mutate("add_message", |state| {
            let len = state.instances.len();
            let Some(instance) = state.instances.get_mut(index) else {
                return Err(IgnoredOperation::IndexOutOfRange { index, len });
            };
            match &mut instance.template {
                PlaygroundTemplate::Chat { messages } => {
                    messages.push(ChatMessage::new(NEW_MESSAGE_ROLE, NEW_MESSAGE_CONTENT));
                    Ok(true)
                }
                PlaygroundTemplate::TextCompletion { .. } => {
                    Err(IgnoredOperation::NotChatTemplate { index })
                }
            }
        })
    }

    /// Dispatch an action to the matching mutation.
    pub fn apply(&self, action: &PlaygroundAction) -> bool {
        match *action {
            PlaygroundAction::SetOperationType { operation_type } => {
                self.set_operation_type(operation_type)
            }
            PlaygroundAction::SetInputMode { input_mode } => self.set_input_mode(input_mode),
            PlaygroundAction::AddInstance => self.add_instance(),
            PlaygroundAction::DeleteInstance { instance_id } => self.delete_instance(instance_id),
            PlaygroundAction::AddMessage { index } => self.add_message(index),
        }
    }

    fn mutate(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut PlaygroundState) -> std::result::Result<bool, IgnoredOperation>,
    ) -> bool {
        let mut ignored = None;
        let mut published = None;
        self.state.send_if_modified(|state| match f(&mut *state) {
            Ok(true) => {
                // Taken under the channel lock, so it is this mutation's result.
                published = Some(state.clone());
                true
            }
            Ok(false) => false,
            Err(reason) => {
                ignored = Some(reason);
                false
            }
        });

        if let Some(reason) = ignored {
            debug!(operation, %reason, "Ignored playground operation");
            let hook = lock(&self.ignored_hook).clone();
            if let Some(hook) = hook {
                hook(&reason);
            }
            return false;
        }
        let Some(snapshot) = published else {
            return false;
        };

        debug!(
            operation,
            operation_type = %snapshot.operation_type,
            input_mode = %snapshot.input_mode,
            instances = snapshot.instances.len(),
            "Playground state updated"
        );
        // Listeners run without any store lock held.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
        true
    }
}

impl Default for PlaygroundStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlaygroundStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaygroundStore")
            .field("state", &*self.state.borrow())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PlaygroundStore {
        PlaygroundStore::builder()
            .ids(InstanceIdAllocator::starting_at(0))
            .build()
            .unwrap()
    }

    #[test]
    fn default_state_has_one_chat_instance() {
        let store = store();
        let state = store.snapshot();
        assert_eq!(state.operation_type, OperationType::Chat);
        assert_eq!(state.input_mode, InputMode::Manual);
        assert_eq!(state.instances.len(), 1);
        assert_eq!(state.instances[0].id, 0);
        assert_eq!(state.instances[0].template.messages().map(|m| m.len()), Some(2));
    }

    #[test]
    fn new_matches_builder_defaults() {
        let plain = PlaygroundStore::new().snapshot();
        let built = PlaygroundStore::builder().build().unwrap().snapshot();
        assert_eq!(plain.operation_type, built.operation_type);
        assert_eq!(plain.input_mode, built.input_mode);
        assert_eq!(plain.instances.len(), 1);
        assert_eq!(plain.instances[0].template, built.instances[0].template);
        assert_eq!(plain.instances[0].tools, built.instances[0].tools);
        assert!(built.instances[0].id > plain.instances[0].id);
    }

    #[test]
    fn set_input_mode_leaves_instances_alone() {
        let store = store();
        let before = store.snapshot().instances;
        assert!(store.set_input_mode(InputMode::Dataset));
        assert_eq!(store.input_mode(), InputMode::Dataset);
        assert_eq!(store.snapshot().instances, before);
        assert!(!store.set_input_mode(InputMode::Dataset));
    }

    #[test]
    fn add_instance_is_capped() {
        let store = store();
        assert!(store.add_instance());
        assert!(!store.add_instance());
        assert_eq!(store.instance_ids(), vec![0, 1]);
    }

    #[test]
    fn last_instance_is_kept_unless_configured_otherwise() {
        let store = store();
        assert!(!store.delete_instance(0));
        assert_eq!(store.instance_ids(), vec![0]);

        let permissive = PlaygroundStore::builder()
            .ids(InstanceIdAllocator::starting_at(0))
            .config(PlaygroundConfig::default().with_keep_last_instance(false))
            .build()
            .unwrap();
        assert!(permissive.delete_instance(0));
        assert!(permissive.snapshot().instances.is_empty());
        assert!(!permissive.add_instance());
        assert!(!permissive.add_message(0));
    }

    #[test]
    fn default_instance_follows_overridden_operation_type() {
        let store = PlaygroundStore::builder()
            .ids(InstanceIdAllocator::starting_at(0))
            .initial_props(InitialProps {
                operation_type: Some(OperationType::TextCompletion),
                ..Default::default()
            })
            .build()
            .unwrap();
        let state = store.snapshot();
        assert_eq!(
            state.instances[0].template,
            PlaygroundTemplate::TextCompletion {
                prompt: "{{question}}".to_string()
            }
        );
    }

    #[test]
    fn initial_instances_are_validated() {
        let chat = DefaultTemplates.default_template(OperationType::Chat);
        let duplicate = InitialProps {
            instances: Some(vec![
                PlaygroundInstance::new(4, chat.clone()),
                PlaygroundInstance::new(4, chat.clone()),
            ]),
            ..Default::default()
        };
        assert!(matches!(
            PlaygroundStore::with_initial_props(duplicate),
            Err(PlaygroundError::DuplicateInstanceId(4))
        ));

        let empty = InitialProps {
            instances: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            PlaygroundStore::with_initial_props(empty),
            Err(PlaygroundError::EmptyInstances)
        ));

        let mismatch = InitialProps {
            operation_type: Some(OperationType::TextCompletion),
            instances: Some(vec![PlaygroundInstance::new(1, chat)]),
            ..Default::default()
        };
        assert!(matches!(
            PlaygroundStore::with_initial_props(mismatch),
            Err(PlaygroundError::TemplateMismatch { id: 1, .. })
        ));
    }

    #[test]
    fn allocator_skips_past_supplied_ids() {
        let ids = InstanceIdAllocator::starting_at(0);
        let store = PlaygroundStore::builder()
            .ids(ids.clone())
            .initial_props(InitialProps {
                instances: Some(vec![PlaygroundInstance::new(
                    41,
                    DefaultTemplates.default_template(OperationType::Chat),
                )]),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert!(store.add_instance());
        assert_eq!(store.instance_ids(), vec![41, 42]);
        assert_eq!(ids.peek(), 43);
    }
}
