//! Ordered registries of user-invocable actions.
//!
//! A registry is generic over the context its callbacks receive. The page
//! action builds one registry per context shape and bundles them in
//! [`Actions`], which routes an [`ActionContext`] to the matching registry.

use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use pageaction_protocol::MessageId;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Future returned by action callbacks.
pub type ActionFuture = BoxFuture<'static, Result<()>>;

/// Boxed action callback.
type Callback<C> = Arc<dyn Fn(C) -> ActionFuture + Send + Sync>;

/// Context for actions on a whole domain group.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainActionContext {
    /// Domain key.
    pub domain: String,
    /// Distinct URLs observed under the domain.
    pub urls: Vec<Url>,
}

/// Context for actions on one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationActionContext {
    /// Notification identity.
    pub message_id: MessageId,
    /// Fingerprinting API name.
    pub api: String,
    /// Full document URL.
    pub url: Url,
    /// Raw call stack.
    pub error_stack: String,
}

/// Context for actions that apply to the whole page action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalActionContext;

/// Any action context. Each variant is served by its own registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionContext {
    /// Page-action wide.
    Global,
    /// One domain group.
    Domain(DomainActionContext),
    /// One notification.
    Notification(NotificationActionContext),
}

/// A named action bound to a callback.
pub struct Action<C> {
    /// Unique key within the registry.
    name: String,
    /// Rendered as an icon button rather than a text button.
    is_icon: bool,
    /// Invoked with the context.
    callback: Callback<C>,
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            is_icon: self.is_icon,
            callback: self.callback.clone(),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("is_icon", &self.is_icon)
            .finish_non_exhaustive()
    }
}

impl<C: Send + 'static> Action<C> {
    /// Bind `callback` under `name`.
    pub fn new<F, Fut>(name: impl Into<String>, is_icon: bool, callback: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            is_icon,
            callback: Arc::new(move |ctx: C| -> ActionFuture { Box::pin(callback(ctx)) }),
        }
    }

    /// Action name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the action renders as an icon.
    pub fn is_icon(&self) -> bool {
        self.is_icon
    }
}

/// Rendering info for one button in a button row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    /// Action name, also the i18n key of its label.
    pub name: String,
    /// Icon or text button.
    pub is_icon: bool,
}

/// Append-only, ordered action registry.
pub struct ActionRegistry<C> {
    /// Scope label used in logs and errors.
    scope: &'static str,
    /// Actions in registration order.
    actions: Vec<Action<C>>,
}

impl<C> fmt::Debug for ActionRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("scope", &self.scope)
            .field("actions", &self.actions)
            .finish()
    }
}

impl<C: Send + 'static> ActionRegistry<C> {
    /// Create an empty registry labelled `scope`.
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            actions: Vec::new(),
        }
    }

    /// Append an action. Names must be non-empty and unique.
    pub fn add_action(&mut self, action: Action<C>) -> Result<()> {
        if action.name.is_empty() {
            return Err(Error::InvalidAction {
                scope: self.scope,
                name: action.name,
                reason: "empty name",
            });
        }
        if self.get(&action.name).is_some() {
            return Err(Error::InvalidAction {
                scope: self.scope,
                name: action.name,
                reason: "duplicate name",
            });
        }
        debug!(scope = self.scope, name = %action.name, "action_registered");
        self.actions.push(action);
        Ok(())
    }

    /// Look up an action by name.
    pub fn get(&self, name: &str) -> Option<&Action<C>> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Buttons to render, in registration order.
    pub fn entries(&self) -> Vec<ActionEntry> {
        self.actions
            .iter()
            .map(|a| ActionEntry {
                name: a.name.clone(),
                is_icon: a.is_icon,
            })
            .collect()
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when no action is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run the action called `name` with `ctx`.
    pub async fn invoke(&self, name: &str, ctx: C) -> Result<()> {
        let callback = self
            .get(name)
            .map(|a| a.callback.clone())
            .ok_or_else(|| Error::UnknownAction {
                scope: self.scope,
                name: name.to_string(),
            })?;
        debug!(scope = self.scope, name, "action_invoke");
        callback(ctx).await
    }
}

/// The three registries of a page action session.
#[derive(Debug)]
pub struct Actions {
    /// Page-action wide actions.
    pub global: ActionRegistry<GlobalActionContext>,
    /// Domain group actions.
    pub domain: ActionRegistry<DomainActionContext>,
    /// Notification actions.
    pub notification: ActionRegistry<NotificationActionContext>,
}

impl Default for Actions {
    fn default() -> Self {
        Self::new()
    }
}

impl Actions {
    /// Create empty registries.
    pub fn new() -> Self {
        Self {
            global: ActionRegistry::new("global"),
            domain: ActionRegistry::new("domain"),
            notification: ActionRegistry::new("notification"),
        }
    }

    /// Dispatch `name` to the registry serving `ctx`.
    pub async fn invoke(&self, name: &str, ctx: ActionContext) -> Result<()> {
        match ctx {
            ActionContext::Global => self.global.invoke(name, GlobalActionContext).await,
            ActionContext::Domain(c) => self.domain.invoke(name, c).await,
            ActionContext::Notification(c) => self.notification.invoke(name, c).await,
        }
    }
}
