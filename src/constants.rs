pub mod groups {

    /// Group every new user joins when it exists.
    pub const USERS: &str = "users";

    pub const DEFAULTS: &[(&str, &str)] = &[("users", "User Group"), ("admin", "Admin Group")];
}

pub mod limits {

    pub const LOGIN_LEN: usize = 80;

    pub const GROUP_NAME_LEN: usize = 80;

    pub const GROUP_DESCRIPTION_LEN: usize = 255;

    /// Long enough for a textual IPv6 address.
    pub const IP_ADDR_LEN: usize = 39;

    pub const MIN_PASSWORD_LEN: usize = 8;

    pub const DEFAULT_HISTORY_LIMIT: u64 = 10;
}

pub mod security {

    pub const DEFAULT_BCRYPT_COST: u32 = 12;

    pub const MIN_BCRYPT_COST: u32 = 4;

    pub const MAX_BCRYPT_COST: u32 = 31;

    /// Recorded when a login happens without a known client address.
    pub const UNKNOWN_IP: &str = "0.0.0.0";
}
