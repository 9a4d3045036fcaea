//! Well-known storage key names (spec.md §6), centralized so identity/
//! group load-and-save code doesn't scatter string literals.

pub const STATIC_PRIVATE_KEY: &str = "static_private_key";
pub const STATIC_PUBLIC_KEY: &str = "static_public_key";
pub const SIGNING_PRIVATE_KEY: &str = "signing_private_key";
pub const SIGNING_PUBLIC_KEY: &str = "signing_public_key";

pub const GROUP_KEY: &str = "group_key";
pub const GROUP_SALT: &str = "group_salt";
pub const GROUP_ID: &str = "group_id";
pub const GROUP_NAME: &str = "group_name";
pub const GROUP_CREATED_AT: &str = "group_created_at";

pub const TRUSTED_PEERS_V1: &str = "trusted_peers_v1";
