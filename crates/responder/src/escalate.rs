//! Handing a conversation back to a human.

use std::sync::Arc;

use {
    partdesk_common::{AdminAlert, AdminNotifier, dispatch_alert},
    tracing::{debug, info, warn},
};

use crate::surface::ChatSurface;

/// Restore the unread flag on the open conversation.
///
/// Tries the list entry's context menu first, then the keyboard shortcut.
pub async fn mark_unread(surface: &dyn ChatSurface, title: &str) -> bool {
    match surface.mark_unread_via_menu(title).await {
        Ok(true) => {
            debug!(title, "marked unread via menu");
            return true;
        },
        Ok(false) => debug!(title, "mark-unread menu item not found"),
        Err(e) => debug!(title, error = %e, "mark-unread menu failed"),
    }
    match surface.mark_unread_via_shortcut().await {
        Ok(()) => {
            debug!(title, "marked unread via shortcut");
            true
        },
        Err(e) => {
            warn!(title, error = %e, "could not mark conversation unread");
            false
        },
    }
}

/// Queue an alert quoting `last_text`. Never waits on delivery.
pub fn notify_admin(notifier: &Arc<dyn AdminNotifier>, title: &str, last_text: &str) {
    let alert = AdminAlert::new(title, last_text);
    info!(title = alert.display_title(), "escalating to admin");
    drop(dispatch_alert(Arc::clone(notifier), alert));
}
