use std::path::{Path, PathBuf};

pub const WORKBOARD_DIR: &str = ".workboard";

pub fn workboard_dir(root: &Path) -> PathBuf {
    root.join(WORKBOARD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    workboard_dir(root).join("config.yaml")
}

pub fn board_path(root: &Path) -> PathBuf {
    workboard_dir(root).join("board.yaml")
}

pub fn logs_dir(root: &Path) -> PathBuf {
    workboard_dir(root).join("logs")
}

pub fn log_path(root: &Path, kind: crate::types::AgentKind) -> PathBuf {
    logs_dir(root).join(format!("{}.md", kind.as_str()))
}

pub fn diagnostics_path(root: &Path) -> PathBuf {
    workboard_dir(root).join("diagnostics.log")
}
