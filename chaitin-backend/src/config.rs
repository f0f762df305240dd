use std::env;

use strum::{Display, EnumString};

/// Which mail backend delivers outgoing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EmailBackend {
    /// Real delivery through SMTP (STARTTLS)
    Smtp,
    /// Messages are written to the log instead of being sent
    Console,
    /// Messages are kept in memory (tests)
    Memory,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub backend: EmailBackend,
    pub host: String,
    /// Separate host for non-transactional mail (broadcasts, announcements)
    pub host_broadcasts: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_from: String,
    pub server_email: String,
    pub subject_prefix: String,
    /// Only recipient of dry-run broadcasts
    pub broadcast_preview: String,
    /// Value of the X-PM-Message-Stream header on broadcasts
    pub postmark_stream: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub debug: bool,
    pub project_name: String,
    pub project_name_slug: String,
    pub project_url: String,
    pub canonical_host: String,
    pub admins: Vec<String>,
    pub static_dir: String,
    pub email: EmailConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let debug = env::var("DEBUG").map(|v| v == "1").unwrap_or(false);
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .expect("PORT must be a valid number");

        let canonical_host = env::var("CANONICAL_HOST").unwrap_or_else(|_| {
            if debug {
                format!("localhost:{}", port)
            } else {
                "chaitinschool.org".to_string()
            }
        });

        let backend = match env::var("EMAIL_BACKEND") {
            Ok(value) => value
                .parse()
                .expect("EMAIL_BACKEND must be one of smtp, console, memory"),
            Err(_) if debug => EmailBackend::Console,
            Err(_) => EmailBackend::Smtp,
        };

        Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "./.db/chaitin.db".to_string()),
            debug,
            project_name: var_or("PROJECT_NAME", "Chaitin School"),
            project_name_slug: var_or("PROJECT_NAME_SLUG", "chaitin-school"),
            project_url: var_or("PROJECT_URL", "chaitinschool.org"),
            canonical_host,
            admins: parse_list(&var_or("ADMINS", "x@chaitinschool.org")),
            static_dir: var_or("STATIC_DIR", "./chaitin-backend/static"),
            email: EmailConfig {
                backend,
                host: var_or("EMAIL_HOST", "smtp.postmarkapp.com"),
                host_broadcasts: var_or("EMAIL_HOST_BROADCASTS", "smtp-broadcasts.postmarkapp.com"),
                port: env::var("EMAIL_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .expect("EMAIL_PORT must be a valid number"),
                username: env::var("EMAIL_HOST_USER").ok(),
                password: env::var("EMAIL_HOST_PASSWORD").ok(),
                default_from: var_or("DEFAULT_FROM_EMAIL", "Chaitin School <x@chaitinschool.org>"),
                server_email: var_or("SERVER_EMAIL", "Gregory <server@chaitinschool.org>"),
                subject_prefix: var_or("EMAIL_SUBJECT_PREFIX", "[chaitin] "),
                broadcast_preview: var_or("EMAIL_BROADCAST_PREVIEW", "zf@sirodoht.com"),
                postmark_stream: var_or("EMAIL_POSTMARK_HEADER", "broadcast"),
            },
        }
    }

    /// Scheme prefix used when building absolute links in mail and calendars
    pub fn protocol(&self) -> &'static str {
        if self.debug { "http:" } else { "https:" }
    }

    /// Absolute URL for a site path, e.g. `https://chaitinschool.org/blog/`
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}//{}{}", self.protocol(), self.canonical_host, path)
    }

    /// Settings for tests: debug on, in-memory database and mailer
    pub fn for_tests() -> Self {
        Self {
            port: 8080,
            database_url: ":memory:".to_string(),
            debug: true,
            project_name: "Chaitin School".to_string(),
            project_name_slug: "chaitin-school".to_string(),
            project_url: "chaitinschool.org".to_string(),
            canonical_host: "localhost:8000".to_string(),
            admins: vec!["x@chaitinschool.org".to_string()],
            static_dir: "./static".to_string(),
            email: EmailConfig {
                backend: EmailBackend::Memory,
                host: "localhost".to_string(),
                host_broadcasts: "localhost".to_string(),
                port: 25,
                username: None,
                password: None,
                default_from: "Chaitin School <x@chaitinschool.org>".to_string(),
                server_email: "Gregory <server@chaitinschool.org>".to_string(),
                subject_prefix: "[chaitin] ".to_string(),
                broadcast_preview: "preview@example.com".to_string(),
                postmark_stream: "broadcast".to_string(),
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
