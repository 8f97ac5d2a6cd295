//! End-to-end job scenarios against the simulated adapters.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bkpost::adapters::{SimulatedRegistry, SimulatedRunner, SimulatedSender};
use bkpost::config::{AppConfig, MountType, NotificationProvider};
use bkpost::context::AppContext;
use bkpost::core::{DiskState, JobContext, Orchestrator, SendCommand, StorageKind, UnmountOutcome};
use serde_json::json;

struct Harness {
    registry: Arc<SimulatedRegistry>,
    sender: Arc<SimulatedSender>,
    runner: Arc<SimulatedRunner>,
    orchestrator: Orchestrator,
}

fn registry_with_free(disk_free: u64) -> SimulatedRegistry {
    SimulatedRegistry::new()
        .with_object("system.adapter.bkpost.0", json!({"common": {"host": "backup-host"}}))
        .with_state("system.host.backup-host.diskFree", json!({"val": disk_free}))
}

fn harness(config: AppConfig, registry: SimulatedRegistry, runner: SimulatedRunner) -> Harness {
    let registry = Arc::new(registry);
    let sender = Arc::new(SimulatedSender::new());
    let runner = Arc::new(runner);
    let ctx = AppContext::with_adapters(
        config,
        registry.clone(),
        Some(sender.clone()),
        runner.clone(),
    );

    Harness {
        registry,
        sender,
        runner,
        orchestrator: Orchestrator::new(ctx),
    }
}

fn cifs_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.mount.mount = Some("/backups".to_string());
    config.mount.mount_type = MountType::Cifs;
    config.mount.backup_dir = PathBuf::from("/mnt/nas");
    config
}

fn discord_config(target: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.notifications.enabled = true;
    config.notifications.provider = NotificationProvider::Discord;
    config.notifications.discord.instance = Some("discord.0".to_string());
    config.notifications.discord.target = Some(target.to_string());
    config
}

#[tokio::test(start_paused = true)]
async fn test_cifs_unmount_scenario() {
    let h = harness(cifs_config(), registry_with_free(2000), SimulatedRunner::succeeding(""));
    let start = tokio::time::Instant::now();

    let mut job = JobContext::new("scenario-a");
    let outcome = h.orchestrator.unmount(&mut job).await.unwrap();

    assert!(matches!(outcome, UnmountOutcome::Unmounted { .. }));
    let calls = h.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "umount");
    assert_eq!(calls[0].args, vec!["/mnt/nas".to_string()]);
    assert!(calls[0].at - start >= Duration::from_secs(10));
    assert_eq!(job.done(), vec!["umount"]);
    assert!(job.errors().is_empty());
}

#[tokio::test]
async fn test_plenty_of_space_scenario() {
    let h = harness(AppConfig::default(), registry_with_free(2000), SimulatedRunner::succeeding(""));

    let report = h.orchestrator.check_storage().await.unwrap();

    assert_eq!(report.disk_state, DiskState::Ok);
    assert_eq!(report.storage, StorageKind::Local);
    assert!(report.ready);
    assert_eq!(
        h.registry.lookups(),
        vec![
            "system.adapter.bkpost.0".to_string(),
            "system.host.backup-host.diskFree".to_string()
        ]
    );
}

#[tokio::test]
async fn test_low_space_scenario() {
    let h = harness(AppConfig::default(), registry_with_free(300), SimulatedRunner::succeeding(""));

    let report = h.orchestrator.check_storage().await.unwrap();

    assert_eq!(report.disk_state, DiskState::Error);
    assert!(!report.ready);
}

#[tokio::test]
async fn test_discord_target_scenarios() {
    let h = harness(discord_config("123456"), registry_with_free(2000), SimulatedRunner::succeeding(""));
    h.orchestrator.notify("done").await;
    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].command, SendCommand::SendMessage);
    assert_eq!(sent[0].payload["userId"], json!("123456"));

    let h = harness(discord_config("123/456"), registry_with_free(2000), SimulatedRunner::succeeding(""));
    h.orchestrator.notify("done").await;
    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload["serverId"], json!("123"));
    assert_eq!(sent[0].payload["channelId"], json!("456"));

    let h = harness(discord_config("abc"), registry_with_free(2000), SimulatedRunner::succeeding(""));
    h.orchestrator.notify("done").await;
    assert_eq!(h.sender.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_job_success() {
    let mut config = cifs_config();
    config.backup.name = "nightly".to_string();
    config.backup.command = Some("tar czf /mnt/nas/etc.tgz /etc".to_string());
    config.notifications = discord_config("123456").notifications;

    let h = harness(config, registry_with_free(2000), SimulatedRunner::succeeding(""));
    let report = h.orchestrator.run_job().await;

    assert!(report.success);
    assert_eq!(report.done, vec!["storageCheck", "transfer", "umount"]);
    assert!(report.errors.is_empty());

    let calls = h.runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "sh");
    assert_eq!(calls[1].program, "umount");

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].payload["content"],
        json!("Backup:\nBackup \"nightly\" completed successfully.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_unmount_does_not_fail_job() {
    let mut config = cifs_config();
    config.notifications = discord_config("123456").notifications;

    let h = harness(
        config,
        registry_with_free(2000),
        SimulatedRunner::failing(32, "umount: /mnt/nas: target is busy."),
    );
    let report = h.orchestrator.run_job().await;

    assert!(report.success);
    assert!(!report.done.contains(&"umount".to_string()));
    assert!(report.errors["umount"].contains("target is busy"));

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(
        sent[0].payload["content"]
            .as_str()
            .unwrap()
            .contains("completed with warnings")
    );
}

#[tokio::test]
async fn test_low_space_aborts_job_but_notifies() {
    let mut config = cifs_config();
    config.backup.command = Some("true".to_string());
    config.notifications = discord_config("123456").notifications;

    let h = harness(config, registry_with_free(300), SimulatedRunner::succeeding(""));
    let report = h.orchestrator.run_job().await;

    assert!(!report.success);
    assert!(report.errors.contains_key("storageCheck"));
    assert!(h.runner.calls().is_empty());

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].payload["content"].as_str().unwrap().contains("failed"));
}

#[tokio::test]
async fn test_nas_storage_ignores_local_space() {
    let mut config = AppConfig::default();
    config.storage.nas_enabled = true;

    let h = harness(config, registry_with_free(10), SimulatedRunner::succeeding(""));
    let report = h.orchestrator.run_job().await;

    assert!(report.success);
    assert_eq!(report.done, vec!["storageCheck"]);
}

#[tokio::test]
async fn test_unknown_host_proceeds_without_check() {
    let h = harness(AppConfig::default(), SimulatedRegistry::new(), SimulatedRunner::succeeding(""));
    let report = h.orchestrator.run_job().await;

    assert!(report.success);
    assert!(report.done.is_empty());
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_missing_mount_path_is_reported_not_recorded() {
    let mut config = AppConfig::default();
    config.mount.mount_type = MountType::Nfs;

    let h = harness(config, registry_with_free(2000), SimulatedRunner::succeeding(""));
    let report = h.orchestrator.run_job().await;

    assert!(report.success);
    assert_eq!(report.errors["umount"], "NO mount path specified!");
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn test_notifications_disabled_sends_nothing() {
    let mut config = discord_config("123456");
    config.notifications.enabled = false;

    let h = harness(config, registry_with_free(2000), SimulatedRunner::succeeding(""));
    h.orchestrator.run_job().await;

    assert_eq!(h.sender.attempts(), 0);
}
