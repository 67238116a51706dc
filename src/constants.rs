pub mod session {
    /// Authenticated admin row id.
    pub const ADMIN_ID: &str = "admin_id";

    pub const CSRF_TOKEN: &str = "_csrf_token";

    pub const CSRF_EXPIRES: &str = "_csrf_token_expires";

    /// Deadline of an email-verified permission access grant.
    pub const PERMISSIONS_ACCESS_EXPIRES: &str = "permissions_access_expires";

    pub const SETTINGS_UNLOCKED_UNTIL: &str = "settings_unlocked_until";

    /// Login code awaiting the second step of a sign-in.
    pub const TWO_FACTOR_CHALLENGE: &str = "_2fa_challenge";
}

pub mod tokens {
    /// Random bytes behind every hex token (CSRF, reset, access).
    pub const TOKEN_BYTES: usize = 32;

    pub const CSRF_TTL_SECONDS: i64 = 3600;

    pub const PASSWORD_RESET_TTL_MINUTES: i64 = 60;

    pub const PERMISSION_ACCESS_TTL_MINUTES: i64 = 15;

    pub const PERMISSION_GRANT_MINUTES: i64 = 5;

    pub const LOGIN_CODE_TTL_MINUTES: i64 = 15;
}

pub mod limits {
    pub const PASSWORD_MIN_LENGTH: usize = 8;

    pub const DEFAULT_AUDIT_LIMIT: u64 = 100;

    pub const MAX_AUDIT_LIMIT: u64 = 500;
}

pub mod metadata {
    pub const METHOD_MANAGEMENT_PIN: &str = "management_pin";

    pub const METHOD_LOGIN_PASSWORD: &str = "login_password";

    pub const METHOD_MISSING: &str = "missing";
}
