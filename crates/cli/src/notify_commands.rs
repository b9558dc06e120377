//! `partdesk notify-test`: check the admin alert channel end to end.

use {
    anyhow::Result,
    partdesk_common::{AdminAlert, AdminNotifier, LogNotifier},
    partdesk_config::PartdeskConfig,
    partdesk_telegram::TelegramNotifier,
};

pub async fn handle_notify_test(config: &PartdeskConfig, message: &str) -> Result<()> {
    let alert = AdminAlert::new("partdesk", message);

    let Some(telegram) = TelegramNotifier::from_config(&config.telegram) else {
        println!("Telegram is not configured (telegram.token and telegram.admin_chat_id).");
        println!("Alerts are written to the log instead:");
        LogNotifier.notify(&alert).await?;
        return Ok(());
    };

    let username = telegram.verify().await?;
    println!("Bot: @{username}");
    telegram.notify(&alert).await?;
    println!("Test alert sent.");
    Ok(())
}
