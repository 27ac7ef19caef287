use crate::infra::{build_dashboard_service, connect, parse_period, resolve_settings};
use chrono::Local;
use clap::Args;
use lead_pulse::config::AppConfig;
use lead_pulse::error::AppError;
use lead_pulse::telemetry::{self, LogTarget};
use lead_pulse::workflows::bitrix::SettingsStore;
use lead_pulse::workflows::leads::{DailyTrend, DashboardSnapshot, Period, Stage};

const TOP_OPERATORS: usize = 3;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Reporting period: today, 7days, 30days or 90days
    #[arg(long, value_parser = parse_period, default_value = "today")]
    pub(crate) period: Period,
    /// Number of calendar days in the daily trend
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=90))]
    pub(crate) trend_days: u32,
    /// Skip Bitrix24 and report on generated demo leads
    #[arg(long)]
    pub(crate) demo: bool,
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogTarget::Stderr)?;

    let gateway = if args.demo {
        None
    } else {
        let store = SettingsStore::new(config.crm.settings_path.clone());
        let settings = resolve_settings(&config.crm, &store).await;
        connect(settings.as_ref(), config.crm.request_timeout).map(|(_, client)| client)
    };
    let service = build_dashboard_service(&config.crm, gateway);

    let now = Local::now().naive_local();
    let (snapshot, trend) = tokio::join!(
        service.snapshot(args.period, now),
        service.daily_trend(args.trend_days, now)
    );

    render_snapshot(&snapshot);
    render_trend(&trend);
    Ok(())
}

fn render_snapshot(snapshot: &DashboardSnapshot) {
    println!("Lead dashboard: {}", snapshot.period.label());
    println!(
        "Generated {} from {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M"),
        snapshot.data_source.label()
    );
    if let Some(reason) = &snapshot.demo_reason {
        println!("Warning: showing demo data ({})", reason);
    }

    println!("\nStage totals ({} leads)", snapshot.total_leads);
    for stage in &snapshot.stages {
        println!("- {}: {}", stage.label, stage.count);
    }

    for group in &snapshot.operators_by_stage {
        if group.operators.is_empty() {
            println!("\n{}: no operators", group.label);
            continue;
        }

        println!("\n{}: top operators", group.label);
        for entry in group.operators.iter().take(TOP_OPERATORS) {
            println!(
                "- {} ({}, {}): {} leads, trend {:+}",
                entry.name,
                entry.department,
                entry.status.label(),
                entry.lead_count,
                entry.trend
            );
        }
    }
}

fn render_trend(trend: &DailyTrend) {
    println!("\nDaily trend");
    for day in &trend.days {
        println!(
            "- {}: {} total ({} {}, {} {}, {} {})",
            day.date,
            day.total,
            day.count(Stage::Callback),
            Stage::Callback.label(),
            day.count(Stage::Approval),
            Stage::Approval.label(),
            day.count(Stage::Invited),
            Stage::Invited.label()
        );
    }
}
