use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebPushConfig {
    /// VAPID public key, base64url.
    pub public_key: String,
    /// VAPID private key, base64url.
    pub private_key: String,
    pub subject: String,
    /// Shared secret for the cron-style webpush endpoints (`x-webpush-secret`).
    pub send_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub webpush: WebPushConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "devforge".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "devforge-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let smtp_user = std::env::var("SMTP_USER")?;
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST")?,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(465),
            pass: std::env::var("SMTP_PASS")?,
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| smtp_user.clone()),
            user: smtp_user,
        };
        let webpush = WebPushConfig {
            public_key: std::env::var("WEBPUSH_PUBLIC_KEY")?,
            private_key: std::env::var("WEBPUSH_PRIVATE_KEY")?,
            subject: std::env::var("WEBPUSH_SUBJECT")
                .unwrap_or_else(|_| "mailto:admin@example.com".into()),
            send_secret: std::env::var("WEBPUSH_SEND_SECRET").ok(),
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            webpush,
        })
    }
}
