mod admin;
mod audit;

pub use admin::{
    cmd_admin_approve, cmd_admin_create, cmd_admin_list, cmd_admin_reset_password,
    cmd_admin_set_pin,
};
pub use audit::cmd_audit;
