use std::{
    path::Path,
    sync::{Mutex, MutexGuard, OnceLock},
};

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    prev_asset_dir: Option<String>,
}

impl TestEnvGuard {
    pub fn new(temp_root: &Path) -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let prev_asset_dir = std::env::var("WORKBOARD_ASSET_DIR").ok();

        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            std::env::set_var("WORKBOARD_ASSET_DIR", temp_root);
        }

        Self {
            _lock: lock,
            prev_asset_dir,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            match &self.prev_asset_dir {
                Some(value) => std::env::set_var("WORKBOARD_ASSET_DIR", value),
                None => std::env::remove_var("WORKBOARD_ASSET_DIR"),
            }
        }
    }
}
