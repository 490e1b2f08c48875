pub mod plumbing;

pub use plumbing::{
    cmd_add, cmd_checkout_file, cmd_config, cmd_hash_object, cmd_init, cmd_read_index,
    cmd_write_tree, current_root, ConfigAction,
};
