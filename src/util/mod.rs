mod command;
mod format;
mod path;

pub use command::CommandTemplate;
pub use format::format_elapsed;
pub use path::{VCS_DIRS, is_vcs_dir, relative_to};
