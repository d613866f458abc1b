use anyhow::Result;
use chrono::{DateTime, Utc};
use varwatch::api;
use varwatch::config::Config;
use varwatch::dashboard::Dashboard;
use varwatch::export::{ExportController, JsonFileExporter};
use varwatch::logging::{self, json_log, obj, v_opt_str, v_str, v_u64, Domain};
use varwatch::theme::ThemeStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let theme = ThemeStore::from_config(&cfg);
    json_log(
        "startup",
        obj(&[
            ("api_root", v_str(&cfg.api_root())),
            ("data_source", v_str(&format!("{:?}", cfg.data_source))),
            ("failure_mode", v_str(&format!("{:?}", cfg.failure_mode))),
            ("stale_guard", v_str(&format!("{:?}", cfg.stale_guard))),
            ("interval_ms", v_u64(cfg.refresh_interval_ms)),
            ("news_limit", v_u64(cfg.news_limit as u64)),
            ("theme", v_str(theme.current().as_str())),
            ("export_dir", v_opt_str(cfg.export_dir.as_deref().and_then(|p| p.to_str()))),
        ]),
    );

    let exporter = cfg
        .export_dir
        .as_ref()
        .map(|dir| ExportController::new(JsonFileExporter::new(dir)));
    let dashboard = Dashboard::new(cfg.clone(), api::build(&cfg));
    let mut revisions = dashboard.subscribe();
    let handle = dashboard.start();

    let mut last_lines: Vec<String> = Vec::new();
    let mut last_export: Option<DateTime<Utc>> = None;
    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                logging::info(Domain::System, "shutdown", obj(&[("reason", v_str("ctrl_c"))]));
                break;
            }
        }

        let view = dashboard.view();
        let lines = view.status_lines();
        if lines != last_lines {
            println!("---");
            for line in &lines {
                println!("{}", line);
            }
            last_lines = lines;
        }

        if let Some(controller) = &exporter {
            let summary_at = dashboard.snapshot().summary.updated_at;
            if summary_at.is_some() && summary_at != last_export {
                last_export = summary_at;
                // Failures are logged and surfaced through the controller's status.
                let _ = controller.export(&view).await;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
