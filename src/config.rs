use std::collections::{BTreeSet, HashMap};
use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state, loaded once at startup and
/// shared immutably through the application state. Everything the route, service,
/// and repository layers need to know about their environment lives here, including
/// the per-resource sort policy for the paginated list endpoints.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and the dev auth bypass.
    pub env: Env,
    // MongoDB connection string.
    pub mongo_uri: String,
    // Database holding the resource collections.
    pub db_name: String,
    // Collection names for the three resource domains.
    pub control_collection: String,
    pub create_collection: String,
    pub consume_collection: String,
    // Port the HTTP listener binds to.
    pub api_port: u16,
    // Secret used to validate incoming JWTs.
    pub jwt_secret: String,
    // Table of permitted sort fields per resource domain.
    pub sort_policy: SortPolicy,
}

/// Env
///
/// Distinguishes local development (pretty logs, header-based auth bypass) from
/// production (JSON logs, mandatory secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// SortPolicy
///
/// The allow-list of sortable fields per resource domain, keyed by domain tag.
/// Expressed as configuration rather than hardcoded at each call site so that a
/// service derived from this template only has to edit one table.
#[derive(Clone, Default)]
pub struct SortPolicy {
    fields: HashMap<String, BTreeSet<String>>,
}

impl SortPolicy {
    /// The standard policy for this template's three domains. Control documents
    /// carry both audit stamps, create documents only the creation stamp, and
    /// consume documents are plain read-only records.
    pub fn standard() -> Self {
        let mut fields = HashMap::new();
        fields.insert(
            "control".to_string(),
            to_set(&[
                "name",
                "description",
                "status",
                "created.at_time",
                "saved.at_time",
            ]),
        );
        fields.insert(
            "create".to_string(),
            to_set(&["name", "description", "status", "created.at_time"]),
        );
        fields.insert("consume".to_string(), to_set(&["name", "description"]));
        Self { fields }
    }

    /// Looks up the allow-list for a domain tag. Unknown tags fall back to an
    /// empty set, which makes every `sort_by` value fail validation rather than
    /// silently exposing arbitrary fields.
    pub fn allowed(&self, resource: &str) -> BTreeSet<String> {
        self.fields.get(resource).cloned().unwrap_or_default()
    }
}

fn to_set(fields: &[&str]) -> BTreeSet<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking instance for test setup, so unit and
    /// integration tests can build application state without touching the
    /// process environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            db_name: "api_template_test".to_string(),
            control_collection: "Control".to_string(),
            create_collection: "Create".to_string(),
            consume_collection: "Consume".to_string(),
            api_port: 8080,
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            sort_policy: SortPolicy::standard(),
        }
    }
}

impl AppConfig {
    /// The canonical startup loader. Reads all parameters from environment
    /// variables and fails fast when a production secret is missing.
    ///
    /// # Panics
    /// Panics if a variable required for the current environment is absent.
    /// Starting with an incomplete production configuration is worse than not
    /// starting at all.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (mongo_uri, jwt_secret) = match env {
            Env::Production => (
                env::var("MONGO_URI").expect("FATAL: MONGO_URI required in production"),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET required in production"),
            ),
            Env::Local => (
                env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "super-secure-test-secret-value-local".to_string()),
            ),
        };

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);

        Self {
            env,
            mongo_uri,
            db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "api_template".to_string()),
            control_collection: env::var("CONTROL_COLLECTION")
                .unwrap_or_else(|_| "Control".to_string()),
            create_collection: env::var("CREATE_COLLECTION")
                .unwrap_or_else(|_| "Create".to_string()),
            consume_collection: env::var("CONSUME_COLLECTION")
                .unwrap_or_else(|_| "Consume".to_string()),
            api_port,
            jwt_secret,
            sort_policy: SortPolicy::standard(),
        }
    }
}
