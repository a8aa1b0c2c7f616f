use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_id_list, parse_limit,
    parse_session_backend, parse_socket_addr, parse_u16, parse_u64,
};
use super::types::{
    ConfigError, DatabaseSettings, QuizSettings, RedisSettings, RuntimeSettings, SessionSettings,
    Settings, TelegramSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("MATHBOT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config =
            env_optional("MATHBOT_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "mathbot");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "math_bot");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let token =
            env_optional("BOT_TOKEN").or_else(|| env_optional("TG_TOKEN")).unwrap_or_default();
        let poll_timeout_seconds = parse_u64(
            "TELEGRAM_POLL_TIMEOUT_SECONDS",
            env_or_default("TELEGRAM_POLL_TIMEOUT_SECONDS", "30"),
        )?;
        let teacher_ids = parse_id_list("TEACHER_IDS", env_optional("TEACHER_IDS"))?;

        let session_backend = parse_session_backend(env_optional("SESSION_BACKEND"))?;

        let recent_results_limit =
            parse_limit("RECENT_RESULTS_LIMIT", env_or_default("RECENT_RESULTS_LIMIT", "5"))?;
        let broadcast_pick_limit =
            parse_limit("BROADCAST_PICK_LIMIT", env_or_default("BROADCAST_PICK_LIMIT", "5"))?;

        let log_level = env_or_default("MATHBOT_LOG_LEVEL", "info");
        let json =
            env_optional("MATHBOT_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_addr = parse_socket_addr(
            "PROMETHEUS_ADDR",
            env_or_default("PROMETHEUS_ADDR", "0.0.0.0:9000"),
        )?;

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            telegram: TelegramSettings { token, poll_timeout_seconds, teacher_ids },
            session: SessionSettings { backend: session_backend },
            quiz: QuizSettings { recent_results_limit, broadcast_pick_limit },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled, prometheus_addr },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn telegram(&self) -> &TelegramSettings {
        &self.telegram
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn quiz(&self) -> &QuizSettings {
        &self.quiz
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.poll_timeout_seconds > 50 {
            return Err(ConfigError::InvalidValue {
                field: "TELEGRAM_POLL_TIMEOUT_SECONDS",
                value: self.telegram.poll_timeout_seconds.to_string(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.telegram.token.is_empty() {
            return Err(ConfigError::MissingSecret("BOT_TOKEN"));
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.telegram.teacher_ids.is_empty() {
            return Err(ConfigError::MissingValue("TEACHER_IDS"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl RedisSettings {
    pub(crate) fn redis_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!("redis://:{}@{}:{}/{}", self.password, self.host, self.port, self.db)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::core::config::types::{ConfigError, SessionBackend};
    use crate::test_support;

    #[tokio::test]
    async fn load_reads_teacher_ids_and_backend() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("TEACHER_IDS", "100, 200");
        std::env::set_var("SESSION_BACKEND", "redis");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.telegram().teacher_ids, vec![100, 200]);
        assert_eq!(settings.session().backend, SessionBackend::Redis);
        assert_eq!(settings.quiz().recent_results_limit, 5);
        assert_eq!(settings.telegram().poll_timeout_seconds, 30);
    }

    #[tokio::test]
    async fn strict_mode_requires_token() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("MATHBOT_STRICT_CONFIG", "1");
        std::env::remove_var("BOT_TOKEN");

        let err = Settings::load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("BOT_TOKEN")));
    }

    #[tokio::test]
    async fn database_url_is_built_from_parts() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("POSTGRES_USER", "quiz");
        std::env::set_var("POSTGRES_PASSWORD", "secret");
        std::env::set_var("POSTGRES_SERVER", "db");
        std::env::set_var("POSTGRES_PORT", "5433");
        std::env::set_var("POSTGRES_DB", "quizzes");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.database().database_url(), "postgresql://quiz:secret@db:5433/quizzes");
    }
}
