mod args;
mod paths;

pub use args::{Cli, Commands, GeneratorArgs};
pub use paths::{
    is_stdout, project_dir_or_current, resolve_project_dir, scratch_preview_path,
    DEFAULT_PREVIEW_FILE,
};
