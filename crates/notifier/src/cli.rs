use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use notification_services::{
    EmailNotifier, MattermostNotifier, NotificationError, Notifier, TelegramNotifier,
};
use slot_scan::{
    COWIN_API_URL, ClientConfig, DEFAULT_MIN_CAPACITY, DEFAULT_SEARCH_INTERVAL_SECS, SearchRequest,
};

/// Command line of the `covaccine-notifier` binary.
#[derive(Debug, Parser)]
#[command(name = "covaccine-notifier")]
#[command(about = "CoWIN vaccine availability notifier for India")]
#[command(
    long_about = "Polls the CoWIN API for open vaccination sessions near you and sends\n\
    the matching centers over Email, Telegram or Mattermost.\n\n\
    Search for a location either with --pincode or with --state and --district.\n\
    Every flag can also be set through the environment variable shown in --help."
)]
pub struct Cli {
    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub http: HttpArgs,

    #[command(subcommand)]
    pub channel: Channel,
}

/// What to look for.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search appointment for age
    #[arg(short = 'a', long, env = "AGE")]
    pub age: u32,

    /// Search by pin code
    #[arg(short = 'c', long = "pincode", env = "PIN_CODE", value_name = "PIN")]
    pub pin_code: Option<String>,

    /// Search by state name
    #[arg(short = 's', long, env = "STATE_NAME")]
    pub state: Option<String>,

    /// Search by district name, together with --state
    #[arg(short = 'd', long, env = "DISTRICT_NAME")]
    pub district: Option<String>,

    /// Interval to repeat the search, in seconds
    #[arg(
        short = 'i',
        long,
        env = "SEARCH_INTERVAL",
        default_value_t = DEFAULT_SEARCH_INTERVAL_SECS,
        value_name = "SECONDS"
    )]
    pub interval: u64,

    /// Vaccine preference: covishield or covaxin
    #[arg(short = 'v', long, env = "VACCINE")]
    pub vaccine: Option<String>,

    /// Fee preference: free or paid
    #[arg(short = 'f', long, env = "FEE")]
    pub fee: Option<String>,

    /// Minimum number of open slots worth a notification
    #[arg(
        short = 'm',
        long,
        env = "MIN_CAPACITY",
        default_value_t = DEFAULT_MIN_CAPACITY
    )]
    pub min_capacity: u32,

    /// Dose preference: 1 or 2, 0 for either
    #[arg(short = 'o', long, env = "DOSE", default_value_t = 0)]
    pub dose: u8,
}

impl From<SearchArgs> for SearchRequest {
    fn from(args: SearchArgs) -> Self {
        SearchRequest {
            age: args.age,
            pin_code: args.pin_code,
            state: args.state,
            district: args.district,
            vaccine: args.vaccine,
            fee: args.fee,
            dose: args.dose,
            min_capacity: args.min_capacity,
            interval_seconds: args.interval,
        }
    }
}

/// Where and how to reach the CoWIN API.
#[derive(Debug, Args)]
pub struct HttpArgs {
    /// CoWIN API root
    #[arg(
        long,
        env = "COWIN_API_URL",
        default_value = COWIN_API_URL,
        value_name = "URL"
    )]
    pub api_url: String,

    /// HTTP timeout, in seconds
    #[arg(
        long,
        env = "HTTP_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECONDS"
    )]
    pub timeout: u64,
}

impl HttpArgs {
    /// Client settings for these flags; system proxies stay enabled.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            use_system_proxy: true,
        }
    }
}

/// Delivery channel for slot reports.
#[derive(Debug, Subcommand)]
pub enum Channel {
    /// Notify slots availability using Email
    Email {
        /// Email address to send notifications to
        #[arg(short, long, env = "EMAIL_ID")]
        username: String,

        /// Verified SES sender address, defaults to the recipient
        #[arg(long = "from", env = "FROM_EMAIL")]
        from: Option<String>,
    },

    /// Notify slots availability using Telegram
    Telegram {
        /// Telegram username to send notifications to
        #[arg(short, long, env = "TG_USERNAME")]
        username: String,

        /// Telegram bot API token
        #[arg(short, long, env = "TG_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Notify slots availability using Mattermost
    Mattermost {
        /// Mattermost server URL
        #[arg(short = 'l', long, env = "MATTERMOST_URL")]
        url: String,

        /// Mattermost username to send notifications to
        #[arg(short, long, env = "MATTERMOST_USERNAME")]
        username: String,

        /// Mattermost bot access token
        #[arg(short, long, env = "MATTERMOST_TOKEN", hide_env_values = true)]
        token: String,
    },
}

impl Channel {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Email { .. } => "email",
            Channel::Telegram { .. } => "telegram",
            Channel::Mattermost { .. } => "mattermost",
        }
    }

    /// Build the notifier, running each channel's handshake.
    pub async fn connect(&self) -> Result<Arc<dyn Notifier>, NotificationError> {
        let notifier: Arc<dyn Notifier> = match self {
            Channel::Email { username, from } => {
                Arc::new(EmailNotifier::new(username, from.as_deref()).await?)
            }
            Channel::Telegram { username, token } => {
                Arc::new(TelegramNotifier::new(username, token).await?)
            }
            Channel::Mattermost {
                url,
                username,
                token,
            } => Arc::new(MattermostNotifier::new(url, token, username).await?),
        };
        Ok(notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use slot_scan::SearchLocation;

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pin_code_search_with_telegram() {
        let cli = Cli::try_parse_from([
            "covaccine-notifier",
            "-a",
            "30",
            "-c",
            "411001",
            "-v",
            "covishield",
            "-o",
            "1",
            "telegram",
            "-u",
            "someone",
            "-t",
            "123:abc",
        ])
        .unwrap();

        assert_eq!(cli.channel.name(), "telegram");
        assert!(matches!(
            &cli.channel,
            Channel::Telegram { username, token } if username == "someone" && token == "123:abc"
        ));

        let criteria = SearchRequest::from(cli.search).into_criteria().unwrap();
        assert_eq!(criteria.age(), 30);
        assert_eq!(
            criteria.location(),
            &SearchLocation::PinCode("411001".to_string())
        );
    }

    #[test]
    fn test_district_search_with_mattermost() {
        let cli = Cli::try_parse_from([
            "covaccine-notifier",
            "--age",
            "45",
            "--state",
            "Maharashtra",
            "--district",
            "Pune",
            "--interval",
            "120",
            "--min-capacity",
            "3",
            "mattermost",
            "-l",
            "https://chat.example.com",
            "-u",
            "someone",
            "-t",
            "secret",
        ])
        .unwrap();

        assert_eq!(cli.channel.name(), "mattermost");
        assert_eq!(cli.search.interval, 120);
        assert_eq!(cli.search.min_capacity, 3);

        let criteria = SearchRequest::from(cli.search).into_criteria().unwrap();
        assert_eq!(
            criteria.location(),
            &SearchLocation::District {
                state: "Maharashtra".to_string(),
                district: "Pune".to_string(),
            }
        );
        assert_eq!(criteria.interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_email_sender_is_optional() {
        let cli = Cli::try_parse_from([
            "covaccine-notifier",
            "-a",
            "18",
            "-c",
            "560001",
            "email",
            "-u",
            "someone@example.com",
        ])
        .unwrap();

        assert!(matches!(
            &cli.channel,
            Channel::Email { username, from: None } if username == "someone@example.com"
        ));
    }

    #[test]
    fn test_missing_channel_is_rejected() {
        let result = Cli::try_parse_from(["covaccine-notifier", "-a", "30", "-c", "411001"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Cli::try_parse_from([
            "covaccine-notifier",
            "-a",
            "30",
            "-c",
            "411001",
            "--timeout",
            "0",
            "telegram",
            "-u",
            "someone",
            "-t",
            "123:abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_http_args_build_client_config() {
        let http = HttpArgs {
            api_url: "http://localhost:8080/api".to_string(),
            timeout: 5,
        };
        let config = http.client_config();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.use_system_proxy);
    }
}
