use backstroke::github::{GitHubClient, RateLimitInfo};

use crate::commands::{OutputFormat, print_rows};
use crate::config::Config;

/// Show the bot token's core rate limit.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = config
        .github_token()
        .ok_or("No GitHub token configured. Set [github] token or BACKSTROKE_GITHUB__TOKEN.")?;

    let client = GitHubClient::new(&token)?;
    let info = client.rate_limit().await?;
    print_rows(&[RateLimitDisplay::from_info("core", &info)], output)?;
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_info(name: &str, info: &RateLimitInfo) -> Self {
        let used = info.limit.saturating_sub(info.remaining);
        let usage_percent = if info.limit > 0 {
            (used as f64 / info.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_duration = info.reset_at.signed_duration_since(chrono::Utc::now());
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: info.limit.to_string(),
            used: used.to_string(),
            remaining: info.remaining.to_string(),
            usage_percent: format!("{:.1}%", usage_percent),
            reset_at: info.reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }
}

/// Format a duration in a human-readable way.
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn format_duration_handles_seconds_minutes_and_hours() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(120)), "2m");
        assert_eq!(format_duration(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(Duration::seconds(3900)), "1h 5m");
    }

    #[test]
    fn display_derives_usage_from_remaining() {
        let info = RateLimitInfo {
            limit: 5000,
            remaining: 3750,
            reset_at: Utc::now() + Duration::minutes(30),
        };
        let display = RateLimitDisplay::from_info("core", &info);

        assert_eq!(display.used, "1250");
        assert_eq!(display.remaining, "3750");
        assert_eq!(display.usage_percent, "25.0%");
        assert!(display.reset_at.contains("UTC"));
        assert_ne!(display.reset_in, "now");
    }

    #[test]
    fn past_reset_reads_now() {
        let info = RateLimitInfo {
            limit: 60,
            remaining: 0,
            reset_at: Utc::now() - Duration::seconds(5),
        };
        let display = RateLimitDisplay::from_info("core", &info);
        assert_eq!(display.reset_in, "now");
        assert_eq!(display.usage_percent, "100.0%");
    }
}
