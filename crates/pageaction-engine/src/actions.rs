//! Built-in action bindings.
//!
//! Global actions act on the page action as a whole, domain actions persist a
//! remedy for a domain or URL pattern, and notification actions only display
//! details of one notification.

use serde_json::Value;
use settings::{SESSION_WHITELIST, keys};
use tracing::{debug, info};

use crate::{
    Actions, Result, Services,
    disambiguate,
    registry::{Action, DomainActionContext, GlobalActionContext, NotificationActionContext},
    stack::parse_error_stack,
};

/// A persisted remedy for a domain or URL pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remedy {
    /// Stop showing notifications.
    Ignore,
    /// Allow fingerprinting APIs.
    Whitelist,
    /// Allow fingerprinting APIs until the browser session ends.
    SessionWhitelist,
}

impl Remedy {
    /// Action name, also the label key.
    fn action_name(self) -> &'static str {
        match self {
            Self::Ignore => "ignorelist",
            Self::Whitelist => "whitelist",
            Self::SessionWhitelist => "whitelistTemporarily",
        }
    }

    /// Message keys of the choice and prompt texts.
    fn message_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Ignore => ("selectIgnore", "inputIgnoreURL"),
            Self::Whitelist => ("selectWhitelist", "inputWhitelistURL"),
            Self::SessionWhitelist => ("selectSessionWhitelist", "inputSessionWhitelistURL"),
        }
    }

    /// Write the remedy for `target`.
    async fn persist(self, services: &Services, target: &str) -> Result<()> {
        match self {
            Self::Ignore => {
                services
                    .settings
                    .set(keys::SHOW_NOTIFICATIONS, Value::Bool(false), Some(target))
                    .await?
            }
            Self::Whitelist => {
                services
                    .settings
                    .set(keys::BLOCK_MODE, Value::from("allow"), Some(target))
                    .await?
            }
            Self::SessionWhitelist => services.lists.append_to(SESSION_WHITELIST, target).await?,
        }
        Ok(())
    }

    /// Ask for a target, persist, and close the view.
    async fn run(self, services: Services, ctx: DomainActionContext) -> Result<()> {
        let (select_key, input_key) = self.message_keys();
        let select_text = services.messages.get(select_key);
        let input_text = services.messages.get(input_key);
        let target = disambiguate::resolve(
            services.modal.as_ref(),
            &ctx.domain,
            &ctx.urls,
            &select_text,
            &input_text,
        )
        .await;
        match target {
            Some(target) => {
                self.persist(&services, &target).await?;
                info!(action = self.action_name(), target = %target, "remedy_persisted");
            }
            None => debug!(action = self.action_name(), domain = %ctx.domain, "remedy_cancelled"),
        }
        services.view.close()
    }
}

/// Register `showOptions` and `disableNotifications`.
pub fn register_global_actions(actions: &mut Actions, services: &Services) -> Result<()> {
    let view = services.view.clone();
    actions.global.add_action(Action::new(
        "showOptions",
        true,
        move |_ctx: GlobalActionContext| {
            let view = view.clone();
            async move { view.open_options() }
        },
    ))?;

    let s = services.clone();
    actions.global.add_action(Action::new(
        "disableNotifications",
        true,
        move |_ctx: GlobalActionContext| {
            let s = s.clone();
            async move {
                s.settings
                    .set(keys::SHOW_NOTIFICATIONS, Value::Bool(false), None)
                    .await?;
                s.view.close()
            }
        },
    ))?;
    Ok(())
}

/// Register the domain remedies in display order.
pub fn register_domain_actions(actions: &mut Actions, services: &Services) -> Result<()> {
    for remedy in [Remedy::Ignore, Remedy::Whitelist, Remedy::SessionWhitelist] {
        let s = services.clone();
        actions.domain.add_action(Action::new(
            remedy.action_name(),
            true,
            move |ctx: DomainActionContext| remedy.run(s.clone(), ctx),
        ))?;
    }
    Ok(())
}

/// Register `displayFullURL` and `displayCallingStack`.
pub fn register_notification_actions(actions: &mut Actions, services: &Services) -> Result<()> {
    let view = services.view.clone();
    actions.notification.add_action(Action::new(
        "displayFullURL",
        true,
        move |ctx: NotificationActionContext| {
            let view = view.clone();
            async move { view.alert(ctx.url.to_string()) }
        },
    ))?;

    let view = services.view.clone();
    actions.notification.add_action(Action::new(
        "displayCallingStack",
        true,
        move |ctx: NotificationActionContext| {
            let view = view.clone();
            async move { view.alert(parse_error_stack(&ctx.error_stack).to_string()) }
        },
    ))?;
    Ok(())
}

/// Every built-in action, bound to `services`.
pub fn default_actions(services: &Services) -> Result<Actions> {
    let mut actions = Actions::new();
    register_global_actions(&mut actions, services)?;
    register_domain_actions(&mut actions, services)?;
    register_notification_actions(&mut actions, services)?;
    Ok(actions)
}
