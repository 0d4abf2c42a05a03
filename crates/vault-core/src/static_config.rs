#[derive(Clone, Debug)]
pub struct StaticConfigItem {
    pub key: &'static str,
    pub env: &'static str,
    pub description: &'static str,
    pub value_type: &'static str,
    pub default_value: &'static str,
}

pub static STATIC_CONFIG_TABLE: &[StaticConfigItem] = &[
    StaticConfigItem {
        key: "admin.username",
        env: "ADMIN_USERNAME",
        description: "Admin login name",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "admin.password",
        env: "ADMIN_PASSWORD",
        description: "Admin login password",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "security.token_secret",
        env: "ADMIN_TOKEN_SECRET",
        description: "HMAC key used to sign admin tokens",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "security.token_ttl_seconds",
        env: "TOKEN_TTL_SECONDS",
        description: "Admin token lifetime in seconds",
        value_type: "number",
        default_value: "28800",
    },
    StaticConfigItem {
        key: "cors.allowed_origin",
        env: "ALLOWED_ORIGIN",
        description: "Origin allowed by CORS (blank means any, development mode only)",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "server.host",
        env: "HOST",
        description: "Listen address",
        value_type: "string",
        default_value: "0.0.0.0",
    },
    StaticConfigItem {
        key: "server.port",
        env: "PORT",
        description: "Listen port",
        value_type: "number",
        default_value: "5000",
    },
    StaticConfigItem {
        key: "storage.data_file",
        env: "DATA_FILE",
        description: "JSON file holding bonds and messages",
        value_type: "string",
        default_value: "bond_data.json",
    },
    StaticConfigItem {
        key: "runtime.mode",
        env: "APP_MODE",
        description: "production or development",
        value_type: "string",
        default_value: "production",
    },
];
