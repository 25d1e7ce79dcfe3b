use std::path::PathBuf;

pub fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_pie_path() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_port() -> u16 {
    4000
}

pub fn default_debounce_ms() -> u64 {
    100
}

pub fn default_rebuild_on_controller_change() -> bool {
    true
}
